use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub enum StorageConfig {
    Local {
        upload_dir: PathBuf,
    },
    S3 {
        bucket: String,
        region: String,
        endpoint: Option<String>,
        access_key: Option<String>,
        secret_key: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub users_file: PathBuf,
    pub posts_file: PathBuf,
    pub database_url: String,
    pub jwt: JwtConfig,
    pub admin_username: String,
    pub default_profile_pic: String,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "picshare".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "picshare-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
        };

        let backend = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".into());
        let storage = match backend.as_str() {
            "local" => StorageConfig::Local {
                upload_dir: env_path("UPLOAD_DIR", "static/uploads"),
            },
            "s3" => StorageConfig::S3 {
                bucket: std::env::var("S3_BUCKET")?,
                region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
                endpoint: std::env::var("S3_ENDPOINT").ok(),
                access_key: std::env::var("S3_ACCESS_KEY").ok(),
                secret_key: std::env::var("S3_SECRET_KEY").ok(),
            },
            other => anyhow::bail!("unknown STORAGE_BACKEND {other:?}, expected \"local\" or \"s3\""),
        };

        Ok(Self {
            users_file: env_path("USERS_FILE", "users.json"),
            posts_file: env_path("POSTS_FILE", "posts.json"),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://messages.db".into()),
            jwt,
            admin_username: std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into()),
            default_profile_pic: std::env::var("DEFAULT_PROFILE_PIC")
                .unwrap_or_else(|_| "/static/default_profile.png".into()),
            storage,
        })
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}
