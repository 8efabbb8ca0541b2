use std::sync::Arc;

use minibio::{app, config::AppConfig, db, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "minibio=debug,axum=info,tower_http=info".to_string());
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

    let config = match AppConfig::from_env() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration; refusing to start");
            return Err(e);
        }
    };

    let pool = db::connect_lazy(&config.database)?;

    // Run migrations if present
    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }

    let state = AppState::postgres(config, pool.clone());
    app::serve(app::build_app(state)).await?;

    pool.close().await;
    tracing::info!("database pool closed");
    Ok(())
}
