use chrono::Utc;
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};

use taskflow_api::{
    auth::{AuthError, Claims, TokenAuthority, TokenCodec, TokenError, TokenKind},
    models::user::UserDoc,
    services::refresh_tokens::refresh_token_hash,
};

const SECRET: &str = "integration-test-secret-key";

fn authority() -> TokenAuthority {
    TokenAuthority::new(TokenCodec::new(SECRET), 300, 432_000, 600)
}

fn user() -> UserDoc {
    UserDoc {
        id: ObjectId::new(),
        username: "ada".into(),
        email: "ada@example.com".into(),
        password_hash: "unused".into(),
        created_at: BsonDateTime::now(),
    }
}

#[test]
fn issued_pair_round_trips_with_identity() {
    let authority = authority();
    let user = user();
    let issued = authority.issue_access_pair(&user).unwrap();

    let identity = authority
        .validate(&issued.access_token, Some(TokenKind::Access))
        .unwrap();
    assert_eq!(identity.user_id, user.id.to_hex());
    assert_eq!(identity.username.as_deref(), Some("ada"));
    assert_eq!(identity.email, None);

    let identity = authority
        .validate(&issued.refresh_token, Some(TokenKind::Refresh))
        .unwrap();
    assert_eq!(identity.user_id, user.id.to_hex());

    // expiry is reported so the whitelist record can mirror it
    let now = Utc::now().timestamp();
    assert!(issued.refresh_token_expiry > now + 431_000);
}

#[test]
fn token_kinds_are_not_interchangeable() {
    let authority = authority();
    let user = user();
    let issued = authority.issue_access_pair(&user).unwrap();
    let reset = authority.issue_reset_token(&user).unwrap();

    // an access token replayed at a refresh-validating endpoint
    assert_eq!(
        authority
            .validate(&issued.access_token, Some(TokenKind::Refresh))
            .unwrap_err(),
        AuthError::TypeMismatch
    );
    // and the other way around
    assert_eq!(
        authority
            .validate(&issued.refresh_token, Some(TokenKind::Access))
            .unwrap_err(),
        AuthError::TypeMismatch
    );
    assert_eq!(
        authority
            .validate(&reset, Some(TokenKind::Access))
            .unwrap_err(),
        AuthError::TypeMismatch
    );

    // without an expected kind, any valid token passes
    assert!(authority.validate(&reset, None).is_ok());
}

#[test]
fn reset_token_exposes_verified_email() {
    let authority = authority();
    let user = user();
    let reset = authority.issue_reset_token(&user).unwrap();

    let identity = authority.validate(&reset, Some(TokenKind::Reset)).unwrap();
    assert_eq!(identity.email.as_deref(), Some("ada@example.com"));
    assert_eq!(identity.user_id, user.id.to_hex());
}

#[test]
fn expired_tokens_are_rejected_as_expired() {
    // a TTL in the past makes every issued token already expired
    let authority = TokenAuthority::new(TokenCodec::new(SECRET), -10, -10, -10);
    let issued = authority.issue_access_pair(&user()).unwrap();

    assert_eq!(
        authority
            .validate(&issued.access_token, Some(TokenKind::Access))
            .unwrap_err(),
        AuthError::Expired
    );
}

#[test]
fn foreign_signature_is_rejected() {
    let issued = authority().issue_access_pair(&user()).unwrap();

    let other = TokenAuthority::new(TokenCodec::new("some-other-secret"), 300, 432_000, 600);
    assert_eq!(
        other
            .validate(&issued.access_token, Some(TokenKind::Access))
            .unwrap_err(),
        AuthError::InvalidSignature
    );
}

#[test]
fn garbage_is_malformed_not_internal() {
    let authority = authority();
    assert_eq!(
        authority.validate("garbage", None).unwrap_err(),
        AuthError::Malformed
    );
    assert_eq!(
        authority.validate("", Some(TokenKind::Access)).unwrap_err(),
        AuthError::Malformed
    );
}

#[test]
fn codec_decodes_exactly_what_it_encoded() {
    let codec = TokenCodec::new(SECRET);
    let claims = Claims::Refresh {
        sub: ObjectId::new().to_hex(),
        exp: Utc::now().timestamp() + 60,
    };

    let token = codec.encode(&claims).unwrap();
    assert_eq!(codec.decode(&token).unwrap(), claims);
}

#[test]
fn whitelist_hash_distinguishes_tokens_and_is_stable() {
    // the whitelist sees only hashes; two users rotating at the same moment
    // must never collide, and lookups must recompute the stored hash
    let authority = authority();

    let old = authority.issue_access_pair(&user()).unwrap();
    let replacement = authority.issue_access_pair(&user()).unwrap();

    let old_hash = refresh_token_hash(SECRET, &old.refresh_token);
    let new_hash = refresh_token_hash(SECRET, &replacement.refresh_token);
    assert_ne!(old_hash, new_hash);

    assert_eq!(old_hash, refresh_token_hash(SECRET, &old.refresh_token));
}

#[test]
fn expired_signature_still_checked_before_expiry() {
    // tamper with an expired token: the signature failure wins
    let expired_issuer = TokenAuthority::new(TokenCodec::new(SECRET), -10, -10, -10);
    let issued = expired_issuer.issue_access_pair(&user()).unwrap();

    let sig_start = issued.access_token.rfind('.').unwrap() + 1;
    let mut bytes = issued.access_token.into_bytes();
    bytes[sig_start] = if bytes[sig_start] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(bytes).unwrap();

    let codec = TokenCodec::new(SECRET);
    assert_eq!(codec.decode(&tampered), Err(TokenError::InvalidSignature));
}
