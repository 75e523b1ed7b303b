use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

const DEFAULT_DATABASE_URL: &str = "sqlite://f1_database.db?mode=rwc";
const DEFAULT_SESSION_TTL_HOURS: i64 = 24;
/// One year.
const MAX_SESSION_TTL_HOURS: i64 = 24 * 366;
const DEFAULT_ENVIRONMENT: &str = "development";
const PRODUCTION: &str = "production";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    pub otlp_endpoint: String,
    pub honeycomb_api_key: Option<String>,
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub secret_key: Option<String>,
    pub session_ttl_hours: i64,
    pub secure_cookies: bool,
    pub cors_allowed_origins: Vec<String>,
    pub environment: String,
    pub telemetry: Option<TelemetryConfig>,
}

impl AppConfig {
    /// Loads the layered env files and then reads the process environment.
    pub fn load() -> Result<Self> {
        load_environment()?;
        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        let session_ttl_hours = match var("SESSION_TTL_HOURS") {
            Some(raw) => raw
                .parse::<i64>()
                .with_context(|| format!("SESSION_TTL_HOURS is not an integer: {raw:?}"))?,
            None => DEFAULT_SESSION_TTL_HOURS,
        };

        if session_ttl_hours <= 0 {
            bail!("SESSION_TTL_HOURS must be positive, got {session_ttl_hours}");
        }

        if session_ttl_hours > MAX_SESSION_TTL_HOURS {
            bail!(
                "SESSION_TTL_HOURS must be at most {MAX_SESSION_TTL_HOURS}, got {session_ttl_hours}"
            );
        }

        let secure_cookies = match var("SESSION_COOKIE_SECURE") {
            Some(raw) => parse_bool(&raw)
                .with_context(|| format!("SESSION_COOKIE_SECURE is not a boolean: {raw:?}"))?,
            None => false,
        };

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        let telemetry = var("OTEL_EXPORTER_OTLP_ENDPOINT").map(|otlp_endpoint| TelemetryConfig {
            otlp_endpoint,
            honeycomb_api_key: var("HONEYCOMB_API_KEY"),
        });

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            secret_key: var("SECRET_KEY"),
            session_ttl_hours,
            secure_cookies,
            cors_allowed_origins,
            environment: environment_name(),
            telemetry,
        })
    }
}

fn var(key: &str) -> Option<String> {
    dotenvy::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn environment_name() -> String {
    var("APP_ENV").unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn load_environment() -> Result<()> {
    let env_files = if environment_name() == PRODUCTION {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<()> {
    if !Path::new(path).exists() {
        warn!("Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)
        .with_context(|| format!("Failed to load environment file {path}"))?;
    info!("Loaded environment from: {}", path);
    Ok(())
}
