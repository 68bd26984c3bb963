use std::sync::Arc;

use attendance_backend::{
    config::Config,
    db::connection::{create_pool, DbPool},
    routes::build_router,
    state::AppState,
    utils::time::SystemClock,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attendance_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        jwt_secret = %mask_secret(&config.jwt_secret),
        time_zone = %config.time_zone,
        qr_default_expiration_minutes = config.qr_default_expiration_minutes,
        geofence_radius_meters = config.geofence_radius_meters,
        in_memory = config.uses_in_memory_store(),
        "Loaded configuration from environment/.env"
    );

    let state = if config.uses_in_memory_store() {
        tracing::warn!("Using in-memory stores; data is lost on restart");
        AppState::in_memory(config.clone(), Arc::new(SystemClock))
    } else {
        let pool: DbPool = create_pool(&config.database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        AppState::postgres(pool, config.clone())
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
