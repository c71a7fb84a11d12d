use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint (MinIO, localstack). `None` means AWS proper.
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub max_image_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// SMTP relay; when absent, notifications are only logged.
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub s3: S3Config,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

        let jwt = JwtConfig {
            access_secret: std::env::var("ACCESS_TOKEN_SECRET")
                .context("ACCESS_TOKEN_SECRET is not set")?,
            refresh_secret: std::env::var("REFRESH_TOKEN_SECRET")
                .context("REFRESH_TOKEN_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "postboard".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "postboard-users".into()),
            access_ttl_minutes: env_parse("ACCESS_TOKEN_TTL_MINUTES").unwrap_or(15),
            refresh_ttl_minutes: env_parse("REFRESH_TOKEN_TTL_MINUTES").unwrap_or(60 * 24 * 6),
        };
        anyhow::ensure!(
            jwt.access_secret != jwt.refresh_secret,
            "ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ"
        );

        let s3 = S3Config {
            bucket: std::env::var("AWS_S3_NAME").unwrap_or_else(|_| "postboard-images".into()),
            region: std::env::var("AWS_S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            endpoint: std::env::var("AWS_S3_ENDPOINT").ok(),
            access_key: std::env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_key: std::env::var("AWS_SECRET_ACCESS_KEY").ok(),
            max_image_bytes: env_parse("MAX_IMAGE_BYTES").unwrap_or(1024 * 1024),
        };

        let mail = MailConfig {
            smtp_host: std::env::var("SMTP_HOST").ok().filter(|h| !h.is_empty()),
            smtp_port: env_parse("SMTP_PORT").unwrap_or(587),
            smtp_username: std::env::var("SMTP_USERNAME").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            from: std::env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@postboard.local".into()),
        };

        Ok(Self {
            database_url,
            jwt,
            s3,
            mail,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
