// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use chatgpt_bridge::admission::{fingerprint, FingerprintInputs};
use chatgpt_bridge::marker;
use proptest::prelude::*;

fn arb_request_id() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,40}"
}

fn arb_secret() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9]{8,32}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Marker generation is a pure function of (secret, request_id): same
    /// inputs always produce the same marker, and it always parses back.
    #[test]
    fn marker_is_deterministic_and_well_formed(secret in arb_secret(), rid in arb_request_id()) {
        let a = marker::build_marker(&secret, &rid);
        let b = marker::build_marker(&secret, &rid);
        prop_assert_eq!(&a, &b);
        prop_assert!(marker::ends_with_marker(&a));
        prop_assert!(marker::is_marker_line(&a));
    }

    /// Distinct request ids under the same secret never collide.
    #[test]
    fn marker_differs_across_request_ids(secret in arb_secret(), rid_a in arb_request_id(), rid_b in arb_request_id()) {
        prop_assume!(rid_a != rid_b);
        let a = marker::build_marker(&secret, &rid_a);
        let b = marker::build_marker(&secret, &rid_b);
        prop_assert_ne!(a, b);
    }

    /// Appending a marker always yields a single trailing marker line
    /// regardless of what trailing whitespace the body already had.
    #[test]
    fn append_marker_always_ends_with_exactly_one_marker_line(
        body in "[^\\[\\]\n]{0,200}",
        secret in arb_secret(),
        rid in arb_request_id(),
    ) {
        let marker_line = marker::build_marker(&secret, &rid);
        let appended = marker::append_marker(&body, &marker_line);
        prop_assert!(marker::ends_with_marker(&appended));
        prop_assert_eq!(marker::parse_trailing_marker(&appended), Some(marker_line.as_str()));
    }

    /// The admission fingerprint is a pure function of its inputs: calling
    /// it twice on an equal `FingerprintInputs` always agrees, and any
    /// single differing field changes the result (inputs here are kept
    /// distinct enough that no two fields coincidentally collide).
    #[test]
    fn fingerprint_is_deterministic(
        body in "[^\n]{0,100}",
        mode in "off|sticky|explicit",
        slot in "[a-z]{0,12}",
        conv in "[A-Za-z ]{0,20}",
        strict in any::<bool>(),
    ) {
        let inputs = FingerprintInputs {
            prompt_body_without_marker: &body,
            routing_mode: &mode,
            session_slot: &slot,
            conversation_id: &conv,
            strict_open: strict,
        };
        let a = fingerprint(&inputs);
        let b = fingerprint(&inputs);
        prop_assert_eq!(a, b);
    }

    /// Changing only `strict_open` always changes the fingerprint.
    #[test]
    fn fingerprint_is_sensitive_to_strict_open(body in "[^\n]{0,100}", slot in "[a-z]{0,12}") {
        let lenient = fingerprint(&FingerprintInputs {
            prompt_body_without_marker: &body,
            routing_mode: "sticky",
            session_slot: &slot,
            conversation_id: "",
            strict_open: false,
        });
        let strict = fingerprint(&FingerprintInputs {
            prompt_body_without_marker: &body,
            routing_mode: "sticky",
            session_slot: &slot,
            conversation_id: "",
            strict_open: true,
        });
        prop_assert_ne!(lenient, strict);
    }
}

#[tokio::test]
async fn session_bindings_round_trip_through_a_reopened_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path: PathBuf = dir.path().join("bindings.json");

    {
        let store = chatgpt_bridge::bindings_store::BindingsStore::new(path.clone());
        store.set("slot-a", "Project Alpha").await.expect("set");
        store.set("slot-b", "Project Beta").await.expect("set");
    }

    let reopened = chatgpt_bridge::bindings_store::BindingsStore::new(path);
    assert_eq!(reopened.get("slot-a").await.expect("get"), Some("Project Alpha".to_owned()));
    assert_eq!(reopened.get("slot-b").await.expect("get"), Some("Project Beta".to_owned()));
    assert_eq!(reopened.get("slot-c").await.expect("get"), None);
}

#[test]
fn token_bucket_denies_past_burst_then_refills() {
    let limiter = chatgpt_bridge::limiter::RateLimit::new(600, 2);
    assert!(limiter.check().is_ok());
    assert!(limiter.check().is_ok());
    let denied = limiter.check();
    assert!(denied.is_err());

    std::thread::sleep(std::time::Duration::from_millis(250));
    assert!(limiter.check().is_ok());
}
