use super::test_helpers::{expired_token, token_with_exp, valid_token};
use super::*;

#[test]
fn subject_id_reads_sub_claim() {
    let token = valid_token("alice@example.com");
    assert_eq!(subject_id(&token).as_deref(), Some("alice@example.com"));
}

#[test]
fn subject_id_none_without_jwt() {
    assert!(subject_id(&AuthToken::default()).is_none());
}

#[test]
fn subject_id_none_for_garbage() {
    assert!(subject_id(&AuthToken::new("not-a-jwt")).is_none());
}

#[test]
fn decode_claims_reports_missing_token() {
    let err = decode_claims(&AuthToken::default()).unwrap_err();
    assert!(matches!(err, JwtError::MissingToken));
}

#[test]
fn decode_claims_ignores_signature() {
    let token = valid_token("bob@example.com");
    let claims = decode_claims(&token).unwrap();
    assert_eq!(claims.sub.as_deref(), Some("bob@example.com"));
    assert_eq!(claims.exp, Some(4_102_444_800));
}

#[test]
fn expiry_compares_against_now() {
    let token = token_with_exp("a@x", 1_000);
    assert!(!is_token_expired_at(&token, 999));
    assert!(is_token_expired_at(&token, 1_000));
    assert!(is_token_expired_at(&token, 5_000));
}

#[test]
fn fresh_token_is_not_expired() {
    assert!(!is_token_expired(&valid_token("a@x")));
}

#[test]
fn old_token_is_expired() {
    assert!(is_token_expired(&expired_token("a@x")));
}

#[test]
fn missing_or_garbage_token_counts_as_expired() {
    assert!(is_token_expired(&AuthToken::default()));
    assert!(is_token_expired(&AuthToken::new("a.b.c")));
}
