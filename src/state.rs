use std::sync::Arc;

use mongodb::{
    options::{ClientOptions, IndexOptions},
    Client, Collection, IndexModel,
};
use redis::aio::ConnectionManager;

use crate::{
    audit::TracingAudit,
    auth::{codec::TokenCodec, TokenAuthority},
    config::Config,
    errors::AppError,
    models::{quote::QuoteDoc, refresh_token::RefreshTokenDoc, task::TaskDoc, user::UserDoc},
    rate_limit::{RateLimiter, RedisStore},
    services::{mailer::Mailer, refresh_tokens::RefreshTokenStore},
};

pub struct AppState {
    pub cfg: Arc<Config>,
    pub users: Collection<UserDoc>,
    pub tasks: Collection<TaskDoc>,
    pub quotes: Collection<QuoteDoc>,
    pub refresh_tokens: RefreshTokenStore,
    pub authority: TokenAuthority,
    pub limiter: RateLimiter,
    pub mailer: Mailer,
}

impl AppState {
    pub async fn new(cfg: Config) -> Result<Self, AppError> {
        let mut opts = ClientOptions::parse(&cfg.mongodb_uri).await?;
        opts.app_name = Some("taskflow-api".to_string());
        let client = Client::with_options(opts)?;
        let db = client.database(&cfg.db_name);

        let users: Collection<UserDoc> = db.collection("users");
        let tasks: Collection<TaskDoc> = db.collection("tasks");
        let quotes: Collection<QuoteDoc> = db.collection("quotes");
        let refresh_tokens: Collection<RefreshTokenDoc> = db.collection("refresh_tokens");

        for (collection_keys, options) in [
            (mongodb::bson::doc! { "email": 1 }, unique()),
            (mongodb::bson::doc! { "username": 1 }, unique()),
        ] {
            let index = IndexModel::builder()
                .keys(collection_keys)
                .options(options)
                .build();
            let _ = users.create_index(index).await?;
        }

        let hash_index = IndexModel::builder()
            .keys(mongodb::bson::doc! { "token_hash": 1 })
            .options(unique())
            .build();
        let _ = refresh_tokens.create_index(hash_index).await?;

        let user_index = IndexModel::builder()
            .keys(mongodb::bson::doc! { "user_id": 1 })
            .build();
        let _ = tasks.create_index(user_index).await?;

        let redis_client = redis::Client::open(cfg.redis_url.as_str())?;
        let redis_conn = ConnectionManager::new(redis_client).await?;

        let codec = TokenCodec::new(&cfg.secret_key);
        let authority = TokenAuthority::new(
            codec,
            cfg.access_ttl_seconds,
            cfg.refresh_ttl_seconds,
            cfg.reset_ttl_seconds,
        );

        let limiter = RateLimiter::new(
            Arc::new(RedisStore::new(redis_conn)),
            Arc::new(TracingAudit::new()),
        );

        let mailer = Mailer::new(&cfg.mail_host, &cfg.sender_email, &cfg.sender_password);
        let refresh_tokens = RefreshTokenStore::new(refresh_tokens, &cfg.secret_key);

        Ok(Self {
            cfg: Arc::new(cfg),
            users,
            tasks,
            quotes,
            refresh_tokens,
            authority,
            limiter,
            mailer,
        })
    }
}

fn unique() -> IndexOptions {
    IndexOptions::builder().unique(true).build()
}
