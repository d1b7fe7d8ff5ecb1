#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Property-based tests for the `otpauth://` grammar.

use std::num::NonZeroU32;

use lazyotp_core::{HashAlgorithm, OtpDigits, OtpSecret};
use lazyotp_engine::uri::{parse, serialize};
use lazyotp_engine::{Credential, OtpKind};
use proptest::prelude::*;

fn algorithm_strategy() -> impl Strategy<Value = HashAlgorithm> {
    prop_oneof![
        Just(HashAlgorithm::Sha1),
        Just(HashAlgorithm::Sha256),
        Just(HashAlgorithm::Sha512),
    ]
}

fn kind_strategy() -> impl Strategy<Value = OtpKind> {
    prop_oneof![
        (1u32..=600).prop_map(|p| OtpKind::TimeBased {
            period: NonZeroU32::new(p).unwrap()
        }),
        any::<u64>().prop_map(|counter| OtpKind::CounterBased { counter }),
    ]
}

/// Any non-empty issuer, including outer and inner whitespace.
fn issuer_strategy() -> impl Strategy<Value = Option<String>> {
    proptest::option::of("[A-Za-z0-9.:@&=+%/?# -]{1,16}")
}

prop_compose! {
    fn credential_strategy()(
        name in "[A-Za-z0-9][A-Za-z0-9 ._@:-]{0,23}",
        issuer in issuer_strategy(),
        secret in proptest::collection::vec(any::<u8>(), 1..=64),
        digits in 6i64..=10,
        algorithm in algorithm_strategy(),
        kind in kind_strategy(),
    ) -> Credential {
        Credential {
            name,
            issuer,
            secret: OtpSecret::from_bytes(secret).unwrap(),
            digits: OtpDigits::new(digits).unwrap(),
            algorithm,
            kind,
        }
    }
}

proptest! {
    /// parse(serialize(c)) reproduces every field once bound to c's name.
    #[test]
    fn serialize_then_parse_roundtrips(cred in credential_strategy()) {
        let parsed = parse(&serialize(&cred)).unwrap();
        prop_assert_eq!(parsed.into_credential(cred.name.clone()), cred);
    }

    /// A counter-based credential at counter 7 keeps its counter.
    #[test]
    fn counter_seven_roundtrips(mut cred in credential_strategy()) {
        cred.kind = OtpKind::CounterBased { counter: 7 };
        let parsed = parse(&serialize(&cred)).unwrap();
        prop_assert_eq!(parsed.kind, OtpKind::CounterBased { counter: 7 });
        prop_assert_eq!(parsed.into_credential(cred.name.clone()), cred);
    }

    /// The parser never panics on arbitrary input.
    #[test]
    fn parse_never_panics(input in ".{0,200}") {
        let _ = parse(&input);
    }

    /// Arbitrary query text after a valid prefix never panics either.
    #[test]
    fn parse_never_panics_on_query_noise(query in "[A-Za-z0-9%&=+._~-]{0,80}") {
        let _ = parse(&format!("otpauth://hotp/x?{query}"));
    }
}
