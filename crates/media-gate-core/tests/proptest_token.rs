// crates/media-gate-core/tests/proptest_token.rs
// ============================================================================
// Module: Token Property-Based Tests
// Description: Property tests for token parsing and secret comparison.
// Purpose: Detect panics and invariants across wide input ranges.
// ============================================================================

//! Property-based tests for composite-token invariants.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use media_gate_core::KeyId;
use media_gate_core::MAX_TOKEN_BYTES;
use media_gate_core::TOKEN_SEPARATOR;
use media_gate_core::compose_token;
use media_gate_core::generate_key_id;
use media_gate_core::generate_secret;
use media_gate_core::hash_secret;
use media_gate_core::parse_token;
use media_gate_core::secret_matches;
use proptest::prelude::*;

proptest! {
    #[test]
    fn compose_then_parse_roundtrips(
        key_suffix in "[A-Za-z0-9_-]{1,40}",
        secret in "[0-9A-Za-z.=_-]{1,64}",
    ) {
        let key_id = KeyId::new(format!("mgk_{key_suffix}"));
        let token = compose_token(&key_id, &secret);
        let presented = parse_token(&token).unwrap();
        prop_assert_eq!(presented.key_id, key_id);
        prop_assert_eq!(presented.secret, secret);
    }

    #[test]
    fn input_without_separator_never_parses(token in "[A-Za-z0-9_-]{0,100}") {
        prop_assert!(parse_token(&token).is_none());
    }

    #[test]
    fn oversized_input_never_parses(secret in "[a-z]{1,32}") {
        let padding = "k".repeat(MAX_TOKEN_BYTES);
        let token = format!("{padding}{TOKEN_SEPARATOR}{secret}");
        prop_assert!(parse_token(&token).is_none());
    }

    #[test]
    fn empty_parts_never_parse(part in "[A-Za-z0-9_-]{1,40}") {
        let empty_secret = format!("{part}{TOKEN_SEPARATOR}");
        prop_assert!(parse_token(&empty_secret).is_none());
        let empty_key = format!("{TOKEN_SEPARATOR}{part}");
        prop_assert!(parse_token(&empty_key).is_none());
    }

    #[test]
    fn parse_never_panics_on_arbitrary_input(token in ".{0,600}") {
        let _ = parse_token(&token);
    }

    #[test]
    fn secret_matches_only_the_original_secret(
        secret in "[A-Za-z0-9_-]{8,64}",
        other in "[A-Za-z0-9_-]{8,64}",
    ) {
        let stored = hash_secret(&secret);
        prop_assert!(secret_matches(&secret, &stored));
        if other != secret {
            prop_assert!(!secret_matches(&other, &stored));
        }
    }
}

#[test]
fn generated_material_composes_to_a_valid_token() {
    let key_id = generate_key_id();
    let secret = generate_secret();
    let token = compose_token(&key_id, &secret);
    assert!(token.len() <= MAX_TOKEN_BYTES);
    let presented = parse_token(&token).unwrap();
    assert_eq!(presented.key_id, key_id);
    assert_eq!(presented.secret, secret);
}

#[test]
fn generated_key_ids_never_contain_the_separator() {
    for _ in 0..64 {
        let key_id = generate_key_id();
        assert!(!key_id.as_str().contains(TOKEN_SEPARATOR));
    }
}
