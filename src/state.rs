use crate::config::AppConfig;
use crate::messages::MessageLog;
use crate::posts::PostRegistry;
use crate::storage::{self, StorageClient};
use crate::users::UserStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
    pub users: Arc<UserStore>,
    pub posts: Arc<PostRegistry>,
    pub messages: MessageLog,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let storage = storage::from_config(&config.storage).await?;
        let messages = MessageLog::connect(&config.database_url).await?;
        Ok(Self::from_parts(config, storage, messages).await)
    }

    /// Loads the users file, then bootstraps the post index against `storage`.
    pub async fn from_parts(
        config: Arc<AppConfig>,
        storage: Arc<dyn StorageClient>,
        messages: MessageLog,
    ) -> Self {
        let users = Arc::new(UserStore::load(&config.users_file));
        let posts = Arc::new(
            PostRegistry::bootstrap(
                &config.posts_file,
                storage.clone(),
                &users,
                config.admin_username.clone(),
            )
            .await,
        );
        tracing::info!(users = users.len(), posts = posts.list().len(), "state ready");
        Self {
            config,
            storage,
            users,
            posts,
            messages,
        }
    }

    /// Fresh state over a temp dir and an in-memory object store.
    #[cfg(test)]
    pub async fn fake() -> (
        tempfile::TempDir,
        Self,
        Arc<crate::storage::fake::MemoryStorage>,
    ) {
        use crate::config::{JwtConfig, StorageConfig};

        let dir = tempfile::tempdir().expect("tempdir");
        let config = Arc::new(AppConfig {
            users_file: dir.path().join("users.json"),
            posts_file: dir.path().join("posts.json"),
            database_url: format!("sqlite://{}", dir.path().join("messages.db").display()),
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            admin_username: "admin".into(),
            default_profile_pic: "/static/default_profile.png".into(),
            storage: StorageConfig::Local {
                upload_dir: dir.path().join("uploads"),
            },
        });
        let fake = Arc::new(crate::storage::fake::MemoryStorage::default());
        let messages = MessageLog::connect(&config.database_url)
            .await
            .expect("message log");
        let state = Self::from_parts(config, fake.clone(), messages).await;
        (dir, state, fake)
    }
}
