use chrono::Utc;
use hmac::{Hmac, Mac};
use mongodb::{bson::doc, Collection};
use sha2::Sha256;

use crate::{errors::AppError, models::refresh_token::RefreshTokenDoc};

type HmacSha256 = Hmac<Sha256>;

/// Keyed hash under which a refresh token is whitelisted. The raw token
/// never reaches the database.
pub fn refresh_token_hash(key: &str, token: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(token.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Durable whitelist of currently-valid refresh tokens.
pub struct RefreshTokenStore {
    collection: Collection<RefreshTokenDoc>,
    key: String,
}

impl RefreshTokenStore {
    pub fn new(collection: Collection<RefreshTokenDoc>, key: &str) -> Self {
        Self {
            collection,
            key: key.to_string(),
        }
    }

    pub async fn create(&self, token: &str, expires_at: i64) -> Result<(), AppError> {
        let hash = refresh_token_hash(&self.key, token);
        // upsert keyed on the hash: issuing the same token twice (same sub
        // and exp within one second) must not trip the unique index
        self.collection
            .update_one(
                doc! { "token_hash": &hash },
                doc! { "$set": { "token_hash": hash, "expires_at": expires_at } },
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    pub async fn get_by_token(&self, token: &str) -> Result<Option<RefreshTokenDoc>, AppError> {
        let hash = refresh_token_hash(&self.key, token);
        Ok(self
            .collection
            .find_one(doc! { "token_hash": hash })
            .await?)
    }

    pub async fn delete(&self, token: &str) -> Result<u64, AppError> {
        let hash = refresh_token_hash(&self.key, token);
        let result = self
            .collection
            .delete_one(doc! { "token_hash": hash })
            .await?;
        Ok(result.deleted_count)
    }

    /// Removes records whose expiry has passed. Run from the maintenance
    /// binary, not per-request.
    pub async fn delete_expired(&self) -> Result<u64, AppError> {
        let now = Utc::now().timestamp();
        let result = self
            .collection
            .delete_many(doc! { "expires_at": { "$lt": now } })
            .await?;
        Ok(result.deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_keyed_and_deterministic() {
        let a = refresh_token_hash("secret-a", "tok.en.one");
        let b = refresh_token_hash("secret-a", "tok.en.one");
        let c = refresh_token_hash("secret-b", "tok.en.one");
        let d = refresh_token_hash("secret-a", "tok.en.two");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        // hex-encoded sha256 output
        assert_eq!(a.len(), 64);
    }
}
