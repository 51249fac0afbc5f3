use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
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
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_url = |var: &str, default: &str| -> Result<String, ConfigError> {
        let raw = or_default(var, default);
        url::Url::parse(&raw).map_err(|e| invalid(var, e.to_string()))?;
        Ok(raw)
    };

    let database_url = lookup("DATABASE_URL").ok().filter(|s| !s.is_empty());
    let env = parse_environment(&or_default("VISTET_ENV", "development"))?;

    let bind_addr = parse_addr("VISTET_BIND_ADDR", "0.0.0.0:8000")?;
    let log_level = or_default("VISTET_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("VISTET_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("VISTET_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("VISTET_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    if db_min_connections > db_max_connections {
        return Err(invalid(
            "VISTET_DB_MIN_CONNECTIONS",
            format!("min ({db_min_connections}) exceeds max ({db_max_connections})"),
        ));
    }

    let storefront_url = parse_url(
        "VISTET_STOREFRONT_URL",
        "https://rehabclo.cl/collections/productos",
    )?;
    let api_base_url = parse_url("VISTET_API_BASE_URL", "http://localhost:8000/api/")?;

    let scraper_request_timeout_secs = parse_u64("VISTET_SCRAPER_REQUEST_TIMEOUT_SECS", "30")?;
    let submit_timeout_secs = parse_u64("VISTET_SUBMIT_TIMEOUT_SECS", "10")?;
    let bulk_submit_timeout_secs = parse_u64("VISTET_BULK_SUBMIT_TIMEOUT_SECS", "30")?;
    let scraper_user_agent =
        or_default("VISTET_SCRAPER_USER_AGENT", "vistet/0.1 (catalog-crawler)");
    let scraper_max_retries = parse_u32("VISTET_SCRAPER_MAX_RETRIES", "3")?;
    let scraper_retry_backoff_base_secs =
        parse_u64("VISTET_SCRAPER_RETRY_BACKOFF_BASE_SECS", "2")?;

    let scraped_store_name =
        or_default("VISTET_SCRAPED_STORE_NAME", crate::DEFAULT_SCRAPED_STORE_NAME)
            .trim()
            .to_string();
    if scraped_store_name.is_empty() {
        return Err(invalid(
            "VISTET_SCRAPED_STORE_NAME",
            "store name must not be blank".to_string(),
        ));
    }

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        storefront_url,
        api_base_url,
        scraper_request_timeout_secs,
        submit_timeout_secs,
        bulk_submit_timeout_secs,
        scraper_user_agent,
        scraper_max_retries,
        scraper_retry_backoff_base_secs,
        scraped_store_name,
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
            var: "VISTET_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
