use thiserror::Error;

use crate::app_config::{AppConfig, Environment};

/// Desktop Chrome user agent used for both the HTTP fast path and the browser.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Load configuration for commands that never open the database.
///
/// Same as [`load_app_config`] except `DATABASE_URL` may be absent, in which
/// case `database_url` is left empty.
///
/// # Errors
///
/// Returns `ConfigError` if a value that is present is invalid.
pub fn load_offline_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_offline_app_config(|key| std::env::var(key))
}

fn build_offline_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    build_config(lookup, false)
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    build_config(lookup, true)
}

fn build_config<F>(lookup: F, require_database: bool) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected a boolean, got \"{other}\""),
            }),
        }
    };

    let database_url = if require_database {
        require("DATABASE_URL")?
    } else {
        or_default("DATABASE_URL", "")
    };
    let env = parse_environment(&or_default("QCPRICE_ENV", "development"))?;
    let log_level = or_default("QCPRICE_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("QCPRICE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("QCPRICE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("QCPRICE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let fetch_timeout_secs = parse_u64("QCPRICE_FETCH_TIMEOUT_SECS", "12")?;
    let user_agent = or_default("QCPRICE_USER_AGENT", DEFAULT_USER_AGENT);
    let browser_enabled = parse_bool("QCPRICE_BROWSER_ENABLED", "true")?;
    let browser_nav_timeout_secs = parse_u64("QCPRICE_BROWSER_NAV_TIMEOUT_SECS", "30")?;
    let browser_nav_attempts = parse_u32("QCPRICE_BROWSER_NAV_ATTEMPTS", "3")?;
    let browser_retry_delay_ms = parse_u64("QCPRICE_BROWSER_RETRY_DELAY_MS", "1000")?;
    let browser_wait_ms = parse_u64("QCPRICE_BROWSER_WAIT_MS", "5000")?;
    let search_max_results = parse_usize("QCPRICE_SEARCH_MAX_RESULTS", "5")?;
    let update_cron = or_default("QCPRICE_UPDATE_CRON", "0 0 */6 * * *");

    if browser_nav_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "QCPRICE_BROWSER_NAV_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        fetch_timeout_secs,
        user_agent,
        browser_enabled,
        browser_nav_timeout_secs,
        browser_nav_attempts,
        browser_retry_delay_ms,
        browser_wait_ms,
        search_max_results,
        update_cron,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "QCPRICE_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
