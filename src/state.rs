use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::{
    jwt::JwtKeys, password::Argon2Hasher, repo::PgCredentialStore, services::SessionService,
};
use crate::comments::repo::{CommentStore, PgCommentStore};
use crate::config::AppConfig;
use crate::mailer::{self, Mailer};
use crate::posts::repo::{PgPostStore, PostStore};
use crate::storage::{Storage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub keys: Arc<JwtKeys>,
    pub sessions: Arc<SessionService>,
    pub posts: Arc<dyn PostStore>,
    pub comments: Arc<dyn CommentStore>,
    pub storage: Arc<dyn StorageClient>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = crate::db::connect(&config.database_url).await?;
        let storage = Arc::new(Storage::new(&config.s3).await?) as Arc<dyn StorageClient>;
        let mailer = mailer::from_config(&config.mail)?;

        let keys = Arc::new(JwtKeys::from_config(&config.jwt));
        let sessions = Arc::new(SessionService::new(
            Arc::new(PgCredentialStore::new(db.clone())),
            Arc::new(Argon2Hasher),
            keys.clone(),
        ));

        Ok(Self {
            posts: Arc::new(PgPostStore::new(db.clone())),
            comments: Arc::new(PgCommentStore::new(db.clone())),
            db,
            config,
            keys,
            sessions,
            storage,
            mailer,
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        fakes::with_fakes().0
    }
}
