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
/// Decoupled from the real environment so tests can drive it with a plain
/// `HashMap` lookup.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
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

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        match or_default(var, default).trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got \"{other}\""))),
        }
    };

    let env = parse_environment(&or_default("CREATORHUB_ENV", "development"))?;
    let bind_addr = parse_addr("CREATORHUB_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("CREATORHUB_LOG_LEVEL", "info");

    let search_deadline_ms = parse_u64("CREATORHUB_SEARCH_DEADLINE_MS", "3000")?;
    if search_deadline_ms == 0 {
        return Err(invalid(
            "CREATORHUB_SEARCH_DEADLINE_MS",
            "must be greater than zero".to_string(),
        ));
    }

    let cache_enabled = parse_bool("CREATORHUB_CACHE_ENABLED", "true")?;
    let cache_ttl_secs = parse_u64("CREATORHUB_CACHE_TTL_SECS", "300")?;
    let cache_max_entries = parse_usize("CREATORHUB_CACHE_MAX_ENTRIES", "10000")?;

    let unhealthy_threshold = parse_u32("CREATORHUB_UNHEALTHY_THRESHOLD", "5")?;
    if unhealthy_threshold == 0 {
        return Err(invalid(
            "CREATORHUB_UNHEALTHY_THRESHOLD",
            "must be greater than zero".to_string(),
        ));
    }

    let max_fetch_window = parse_usize("CREATORHUB_MAX_FETCH_WINDOW", "500")?;
    let adapter_timeout_secs = parse_u64("CREATORHUB_ADAPTER_TIMEOUT_SECS", "10")?;
    let user_agent = or_default("CREATORHUB_USER_AGENT", "creatorhub/0.1 (account-search)");

    let tgstat_api_token = optional("TGSTAT_API_TOKEN");
    let tgstat_base_url = or_default("TGSTAT_BASE_URL", "https://api.tgstat.ru");
    let mastodon_base_url = or_default("MASTODON_BASE_URL", "https://mastodon.social");
    let mastodon_access_token = optional("MASTODON_ACCESS_TOKEN");
    let bluesky_base_url = or_default("BLUESKY_BASE_URL", "https://public.api.bsky.app");
    let admin_api_keys = lookup("CREATORHUB_ADMIN_API_KEYS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(ToOwned::to_owned)
        .collect();

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        search_deadline_ms,
        cache_enabled,
        cache_ttl_secs,
        cache_max_entries,
        unhealthy_threshold,
        max_fetch_window,
        adapter_timeout_secs,
        user_agent,
        tgstat_api_token,
        tgstat_base_url,
        mastodon_base_url,
        mastodon_access_token,
        bluesky_base_url,
        admin_api_keys,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for unrecognized values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CREATORHUB_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
