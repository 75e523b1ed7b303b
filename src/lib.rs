#[macro_use]
extern crate rocket;

pub mod api;
pub mod auth;
pub mod config;
pub mod cors;
pub mod db;
pub mod error;
pub mod models;
pub mod telemetry;
pub mod validation;
#[cfg(test)]
mod test;

use api::{
    api_auth_status, api_create_race_result, api_delete_race_result, api_driver_current_team,
    api_driver_standings, api_get_drivers, api_get_race_result, api_get_race_results,
    api_get_races, api_get_teams, api_login, api_logout, api_logout_post, api_race_report,
    api_register, api_season_statistics, api_team_standings, api_update_race_result, health,
    hello,
};
use auth::{
    bad_request_api, internal_error_api, not_found_api, unauthorized_api, unprocessable_api,
    AuthContext,
};
use config::AppConfig;
use cors::{preflight, CorsFairing};
use error::AppError;
use rocket::{figment::Figment, Build, Rocket};
use sqlx::SqlitePool;
use telemetry::TelemetryFairing;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(anyhow::Error),
    #[error("{0}")]
    Figment(rocket::figment::Error),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("Application error: {0}")]
    App(#[from] AppError),
    #[error("{0}")]
    Rocket(Box<rocket::Error>),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Anyhow(value)
    }
}

impl From<rocket::figment::Error> for Error {
    fn from(value: rocket::figment::Error) -> Self {
        Error::Figment(value)
    }
}

impl From<rocket::Error> for Error {
    fn from(value: rocket::Error) -> Self {
        Error::Rocket(Box::new(value))
    }
}

pub async fn connect_pool(config: &AppConfig) -> Result<SqlitePool, Error> {
    info!(database_url = %config.database_url, "Connecting to SQLite database");
    Ok(SqlitePool::connect(&config.database_url).await?)
}

fn figment(config: &AppConfig) -> Figment {
    let figment = rocket::Config::figment();

    match &config.secret_key {
        Some(secret_key) => figment.merge(("secret_key", secret_key.as_str())),
        None => figment,
    }
}

pub fn init_rocket(pool: SqlitePool, config: &AppConfig) -> Rocket<Build> {
    info!("Starting F1 race API");

    rocket::custom(figment(config))
        .manage(pool)
        .manage(AuthContext::from_config(config))
        .mount(
            "/api",
            routes![
                api_register,
                api_login,
                api_logout,
                api_logout_post,
                api_auth_status,
                api_driver_standings,
                api_team_standings,
                api_season_statistics,
                api_race_report,
                api_get_race_results,
                api_get_race_result,
                api_create_race_result,
                api_update_race_result,
                api_delete_race_result,
                api_get_races,
                api_get_drivers,
                api_get_teams,
                api_driver_current_team,
            ],
        )
        .register(
            "/api",
            catchers![
                unauthorized_api,
                bad_request_api,
                not_found_api,
                unprocessable_api,
                internal_error_api,
            ],
        )
        .mount("/api", routes![health, preflight])
        .mount("/", routes![hello])
        .attach(TelemetryFairing)
        .attach(CorsFairing::new(config.cors_allowed_origins.clone()))
}
