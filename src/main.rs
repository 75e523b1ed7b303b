use f1_race_api::config::AppConfig;
use f1_race_api::db::clean_expired_sessions;
use f1_race_api::telemetry::{init_tracing, shutdown_telemetry};
use f1_race_api::{connect_pool, init_rocket, Error};
use tracing::{error, info, warn};

#[rocket::main]
async fn main() -> Result<(), Error> {
    let config = AppConfig::load()?;
    init_tracing(&config)?;

    if config.secret_key.is_none() {
        warn!("SECRET_KEY is not set, session cookies will not survive a restart");
    }

    let pool = connect_pool(&config).await?;

    info!("Running database migrations...");
    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        error!("Failed to run migrations: {}", e);
        return Err(e.into());
    }
    info!("Migrations completed successfully");

    match clean_expired_sessions(&pool).await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired sessions", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean expired sessions: {}", e),
    }

    let result = init_rocket(pool, &config).launch().await;

    shutdown_telemetry();

    result?;
    Ok(())
}
