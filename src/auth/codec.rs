use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token payloads, discriminated on the wire by the `type` claim.
///
/// The tag makes replaying one token kind at another kind's endpoint a
/// decode-level type error instead of a forgotten runtime check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Claims {
    #[serde(rename = "access")]
    Access {
        sub: String,
        username: String,
        exp: i64,
    },
    #[serde(rename = "refresh")]
    Refresh { sub: String, exp: i64 },
    #[serde(rename = "reset-password")]
    Reset {
        sub: String,
        email: String,
        exp: i64,
    },
}

impl Claims {
    pub fn kind(&self) -> TokenKind {
        match self {
            Claims::Access { .. } => TokenKind::Access,
            Claims::Refresh { .. } => TokenKind::Refresh,
            Claims::Reset { .. } => TokenKind::Reset,
        }
    }

    pub fn sub(&self) -> &str {
        match self {
            Claims::Access { sub, .. } | Claims::Refresh { sub, .. } | Claims::Reset { sub, .. } => {
                sub
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
    Reset,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::Reset => "reset-password",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("invalid token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token signing failed")]
    Signing,
}

/// Signs and verifies compact `header.payload.signature` tokens.
///
/// The algorithm is pinned to HS256 on both ends; a token claiming any other
/// algorithm fails verification rather than being negotiated.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp <= now must fail, without the default grace period
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|_| TokenError::Signing)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn codec() -> TokenCodec {
        TokenCodec::new("test-secret-key-for-codec-tests")
    }

    fn access_claims(ttl: i64) -> Claims {
        Claims::Access {
            sub: "64f000000000000000000001".into(),
            username: "ada".into(),
            exp: Utc::now().timestamp() + ttl,
        }
    }

    #[test]
    fn round_trips_every_kind() {
        let c = codec();
        let exp = Utc::now().timestamp() + 300;

        for claims in [
            access_claims(300),
            Claims::Refresh {
                sub: "64f000000000000000000001".into(),
                exp,
            },
            Claims::Reset {
                sub: "64f000000000000000000001".into(),
                email: "ada@example.com".into(),
                exp,
            },
        ] {
            let token = c.encode(&claims).unwrap();
            assert_eq!(token.split('.').count(), 3);
            assert_eq!(c.decode(&token).unwrap(), claims);
        }
    }

    #[test]
    fn rejects_tampered_payload() {
        let c = codec();
        let token = c.encode(&access_claims(300)).unwrap();

        let dot = token.find('.').unwrap();
        let mut bytes = token.into_bytes();
        // flip a payload char to a different base64url symbol
        let i = dot + 2;
        bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert_eq!(c.decode(&tampered), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn rejects_tampered_signature() {
        let c = codec();
        let token = c.encode(&access_claims(300)).unwrap();

        let last_dot = token.rfind('.').unwrap();
        let mut bytes = token.into_bytes();
        let i = last_dot + 1;
        bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert_eq!(c.decode(&tampered), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn rejects_wrong_secret_as_invalid_signature() {
        let token = codec().encode(&access_claims(300)).unwrap();
        let other = TokenCodec::new("a-completely-different-secret");
        assert_eq!(other.decode(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn rejects_expired_token_despite_valid_signature() {
        let c = codec();
        let token = c.encode(&access_claims(-10)).unwrap();
        assert_eq!(c.decode(&token), Err(TokenError::Expired));
    }

    #[test]
    fn rejects_garbage_as_malformed() {
        let c = codec();
        assert_eq!(c.decode("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(c.decode("a.b"), Err(TokenError::Malformed));
        assert_eq!(c.decode(""), Err(TokenError::Malformed));
    }
}
