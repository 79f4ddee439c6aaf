use serde::{Deserialize, Serialize};

/// Whitelist record for one refresh token. Only the keyed hash is stored;
/// presence of the record is what makes the token valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenDoc {
    pub token_hash: String,
    pub expires_at: i64,
}
