//! Fuzz target for the `otpauth://` parser.
//!
//! Feeds arbitrary strings to `uri::parse`; whatever parses must serialize
//! and parse again. Must never panic.
//!
//! # Usage
//!
//! ```sh
//! cd crates/lazyotp-engine
//! cargo +nightly fuzz run otpauth_uri -- -max_len=4096
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(parsed) = lazyotp_engine::uri::parse(s) {
            let cred = parsed.into_hinted_credential();
            let again = lazyotp_engine::uri::serialize(&cred);
            assert!(lazyotp_engine::uri::parse(&again).is_ok());
        }
    }
});
