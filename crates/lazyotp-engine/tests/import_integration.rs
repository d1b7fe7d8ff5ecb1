#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Integration tests for QR import and the page messaging contracts.

use lazyotp_engine::{
    fill_request, menu_entries, resolve_candidates, resolve_images, Credential, CredentialStore,
    EngineConfig, EngineError, MemorySubstrate, MenuEntry, OtpKind, Request, ScannedImage,
};

#[test]
fn resolver_skips_noise_and_returns_hint() {
    let hit = resolve_candidates(["not a uri", "otpauth://totp/Foo?secret=JBSWY3DPEHPK3PXP"])
        .expect("second candidate parses");
    assert_eq!(hit.index, 1);
    assert_eq!(hit.suggested_name(), "Foo");
    assert_eq!(hit.parsed.secret.to_base32(), "JBSWY3DPEHPK3PXP");
}

#[test]
fn resolver_prefers_issuer_for_the_hint() {
    let hit = resolve_candidates([
        "otpauth://totp/Example:alice%40example.com?secret=JBSWY3DPEHPK3PXP&issuer=ACME%20Co",
    ])
    .unwrap();
    assert_eq!(hit.suggested_name(), "ACME Co");
    assert_eq!(hit.parsed.label_issuer.as_deref(), Some("Example"));

    let hit =
        resolve_candidates(["otpauth://totp/Example:alice@example.com?secret=JBSWY3DPEHPK3PXP"])
            .unwrap();
    assert_eq!(hit.suggested_name(), "Example");
}

#[test]
fn scanned_page_imports_into_store() {
    let config = EngineConfig::default();
    let images = vec![
        ScannedImage {
            width: 16,
            height: 16,
            decoded: None,
        },
        ScannedImage {
            width: 300,
            height: 300,
            decoded: Some("https://example.com/app".into()),
        },
        ScannedImage {
            width: 256,
            height: 256,
            decoded: Some(
                "otpauth://hotp/Bank?secret=GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ&counter=1".into(),
            ),
        },
    ];

    let hit = resolve_images(&images, &config).unwrap();
    assert_eq!(hit.index, 2);

    let store = CredentialStore::new(MemorySubstrate::new(), config);
    let name = hit.suggested_name().to_owned();
    store.insert(hit.into_credential()).unwrap();

    let stored = store.get(&name).unwrap();
    assert_eq!(stored.kind, OtpKind::CounterBased { counter: 1 });
    assert_eq!(store.generate_code(&name).unwrap(), "287082");
}

#[test]
fn menu_lists_credentials_in_order() {
    let store = CredentialStore::new(MemorySubstrate::new(), EngineConfig::default());
    store.add_manual("Mail", "JBSWY3DPEHPK3PXP").unwrap();
    store.add_manual("Chat", "JBSWY3DPEHPK3PXP").unwrap();

    assert_eq!(
        menu_entries(&store).unwrap(),
        vec![
            MenuEntry {
                id: "Mail".into(),
                title: "Mail".into()
            },
            MenuEntry {
                id: "Chat".into(),
                title: "Chat".into()
            },
        ]
    );
}

#[test]
fn fill_request_wraps_generated_code() {
    let store = CredentialStore::new(MemorySubstrate::new(), EngineConfig::default());
    store
        .insert(Credential::hotp(
            "Bank",
            lazyotp_core::OtpSecret::from_base32("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ").unwrap(),
            0,
        ))
        .unwrap();

    let request = fill_request(&store, "Bank").unwrap();
    assert_eq!(
        serde_json::to_string(&request).unwrap(),
        r#"{"type":"FILL_OTP","code":"755224"}"#
    );
    assert_eq!(
        fill_request(&store, "Missing"),
        Err(EngineError::NotFound("Missing".into()))
    );
    assert!(matches!(request, Request::FillOtp { .. }));
}
