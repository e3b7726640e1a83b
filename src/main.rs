mod app;
mod auth;
mod config;
mod error;
mod images;
mod jsonfile;
mod messages;
mod posts;
mod state;
mod storage;
mod users;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "picshare=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    // `picshare normalize-users [path]` rewrites a users file and exits
    let mut args = std::env::args().skip(1);
    if args.next().as_deref() == Some("normalize-users") {
        let path = args
            .next()
            .or_else(|| std::env::var("USERS_FILE").ok())
            .unwrap_or_else(|| "users.json".into());
        let count = users::store::normalize_file(std::path::Path::new(&path))?;
        tracing::info!(count, %path, "converted users to the current record format");
        return Ok(());
    }

    let config = AppConfig::from_env()?;
    let app_state = AppState::init(config).await?;
    let app = app::build_app(app_state.clone());
    app::serve(app, app_state).await
}
