use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts, http::StatusCode, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::Utc;
use thiserror::Error;

use crate::{
    auth::codec::{Claims, TokenCodec, TokenError, TokenKind},
    errors::AppError,
    models::user::UserDoc,
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Incomplete authorization header")]
    MissingHeader,
    #[error("invalid token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("unexpected token type")]
    TypeMismatch,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingHeader | AuthError::Malformed => StatusCode::BAD_REQUEST,
            AuthError::InvalidSignature | AuthError::Expired | AuthError::TypeMismatch => {
                StatusCode::UNAUTHORIZED
            }
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidSignature => AuthError::InvalidSignature,
            TokenError::Expired => AuthError::Expired,
            TokenError::Malformed | TokenError::Signing => AuthError::Malformed,
        }
    }
}

/// The authenticated principal for the remainder of one request.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_token_expiry: i64,
}

/// Issues and validates the three token kinds with their fixed TTLs.
pub struct TokenAuthority {
    codec: TokenCodec,
    access_ttl: i64,
    refresh_ttl: i64,
    reset_ttl: i64,
}

impl TokenAuthority {
    pub fn new(codec: TokenCodec, access_ttl: i64, refresh_ttl: i64, reset_ttl: i64) -> Self {
        Self {
            codec,
            access_ttl,
            refresh_ttl,
            reset_ttl,
        }
    }

    pub fn issue_access_pair(&self, user: &UserDoc) -> Result<IssuedTokens, AppError> {
        let now = Utc::now().timestamp();

        let access = Claims::Access {
            sub: user.id.to_hex(),
            username: user.username.clone(),
            exp: now + self.access_ttl,
        };

        let refresh_token_expiry = now + self.refresh_ttl;
        let refresh = Claims::Refresh {
            sub: user.id.to_hex(),
            exp: refresh_token_expiry,
        };

        Ok(IssuedTokens {
            access_token: self.sign(&access)?,
            refresh_token: self.sign(&refresh)?,
            refresh_token_expiry,
        })
    }

    pub fn issue_reset_token(&self, user: &UserDoc) -> Result<String, AppError> {
        let claims = Claims::Reset {
            sub: user.id.to_hex(),
            email: user.email.clone(),
            exp: Utc::now().timestamp() + self.reset_ttl,
        };
        self.sign(&claims)
    }

    /// Decodes `raw` and, when `expected` is given, enforces the `type` claim.
    pub fn validate(
        &self,
        raw: &str,
        expected: Option<TokenKind>,
    ) -> Result<Identity, AuthError> {
        let claims = self.codec.decode(raw)?;

        if let Some(kind) = expected {
            if claims.kind() != kind {
                return Err(AuthError::TypeMismatch);
            }
        }

        Ok(match claims {
            Claims::Access { sub, username, .. } => Identity {
                user_id: sub,
                username: Some(username),
                email: None,
            },
            Claims::Refresh { sub, .. } => Identity {
                user_id: sub,
                username: None,
                email: None,
            },
            Claims::Reset { sub, email, .. } => Identity {
                user_id: sub,
                username: None,
                email: Some(email),
            },
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        self.codec
            .encode(claims)
            .map_err(|_| AppError::Internal("token signing failed".into()))
    }
}

/// Extracts and validates the `Authorization: Bearer` access token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::MissingHeader)?;

        let identity = state
            .authority
            .validate(bearer.token(), Some(TokenKind::Access))?;

        Ok(Self(identity))
    }
}
