fn env_seconds(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Clone, Debug)]
pub struct Config {
    pub mongodb_uri: String,
    pub db_name: String,
    pub redis_url: String,

    pub secret_key: String,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
    pub reset_ttl_seconds: i64,

    pub mail_host: String,
    pub sender_email: String,
    pub sender_password: String,
    pub client_url: String,

    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let mongodb_uri = std::env::var("MONGODB_URI").expect("MONGODB_URI is required");
        let db_name = std::env::var("DB_NAME").unwrap_or_else(|_| "taskflow".to_string());
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let secret_key = std::env::var("SECRET_KEY").expect("SECRET_KEY is required");

        let access_ttl_seconds = env_seconds("ACCESS_TTL_SECONDS", 300);
        let refresh_ttl_seconds = env_seconds("REFRESH_TTL_SECONDS", 5 * 24 * 60 * 60);
        let reset_ttl_seconds = env_seconds("RESET_TTL_SECONDS", 600);

        let mail_host = std::env::var("MAIL_HOST").unwrap_or_default();
        let sender_email = std::env::var("SENDER_EMAIL").unwrap_or_default();
        let sender_password = std::env::var("SENDER_PASSWORD").unwrap_or_default();
        let client_url =
            std::env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            mongodb_uri,
            db_name,
            redis_url,
            secret_key,
            access_ttl_seconds,
            refresh_ttl_seconds,
            reset_ttl_seconds,
            mail_host,
            sender_email,
            sender_password,
            client_url,
            allowed_origins,
        }
    }
}
