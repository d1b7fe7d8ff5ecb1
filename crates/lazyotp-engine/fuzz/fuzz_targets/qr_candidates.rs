//! Fuzz target for the QR import resolver.
//!
//! Splits the input on newlines into candidate strings. Must never panic.
//!
//! # Usage
//!
//! ```sh
//! cd crates/lazyotp-engine
//! cargo +nightly fuzz run qr_candidates -- -max_len=8192
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = lazyotp_engine::resolve_candidates(s.lines());
    }
});
