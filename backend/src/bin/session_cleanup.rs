use attendance_backend::{
    config::Config,
    db::connection::create_pool,
    repositories::{PgSessionRepository, SessionRepository},
};
use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Purges attendance sessions that expired more than
/// `SESSION_RETENTION_DAYS` ago. Attendance rows are kept.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_cleanup=info,attendance_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    if config.uses_in_memory_store() {
        anyhow::bail!("session_cleanup requires a PostgreSQL DATABASE_URL");
    }
    let pool = create_pool(&config.database_url).await?;

    let cutoff = config.retention_cutoff(Utc::now())?;
    let sessions = PgSessionRepository::new(pool.clone());
    let deleted = sessions
        .delete_expired_before(cutoff.timestamp_millis())
        .await?;
    if deleted > 0 {
        tracing::info!("Deleted {} expired attendance sessions", deleted);
    }

    sqlx::query("VACUUM (ANALYZE) attendance_sessions")
        .execute(&pool)
        .await?;

    Ok(())
}
