//! Out-of-band sweep that removes expired refresh-token records. Meant to
//! run from cron; request handling never waits on it.

use taskflow_api::{
    audit::{AuditSink, TracingAudit},
    config::Config,
    models::refresh_token::RefreshTokenDoc,
    services::refresh_tokens::RefreshTokenStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskflow_api=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::from_env();

    let client = mongodb::Client::with_uri_str(&cfg.mongodb_uri)
        .await
        .expect("mongodb connection");
    let collection = client
        .database(&cfg.db_name)
        .collection::<RefreshTokenDoc>("refresh_tokens");
    let store = RefreshTokenStore::new(collection, &cfg.secret_key);

    let removed = store.delete_expired().await.expect("expiry sweep");

    TracingAudit::new().tokens_swept(removed);
    if removed > 0 {
        tracing::info!(removed, "deleted expired refresh tokens");
    } else {
        tracing::info!("no expired refresh tokens found");
    }
}
