use chrono::FixedOffset;

use crate::app_config::AppConfig;
use crate::ConfigError;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

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
/// Every setting has a default, so an empty environment yields a usable config.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
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

    let parse_i64 = |var: &str, default: &str| -> Result<i64, ConfigError> {
        or_default(var, default)
            .parse::<i64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let handles_path = PathBuf::from(or_default("CPSTATS_HANDLES_PATH", "./config/handles.yaml"));
    let snapshot_path = PathBuf::from(or_default(
        "CPSTATS_SNAPSHOT_PATH",
        "./last_known_counts.json",
    ));
    let stats_path = PathBuf::from(or_default("CPSTATS_STATS_PATH", "./stats.json"));
    let log_level = or_default("CPSTATS_LOG_LEVEL", "info");

    let request_timeout_secs = parse_u64("CPSTATS_REQUEST_TIMEOUT_SECS", "10")?;
    if request_timeout_secs == 0 {
        return Err(invalid(
            "CPSTATS_REQUEST_TIMEOUT_SECS",
            "timeout must be at least one second".to_string(),
        ));
    }
    let user_agent = or_default("CPSTATS_USER_AGENT", DEFAULT_USER_AGENT);
    let max_concurrent_platforms = parse_usize("CPSTATS_MAX_CONCURRENT_PLATFORMS", "6")?.max(1);

    let max_reasonable_count = parse_u32("CPSTATS_MAX_REASONABLE_COUNT", "10000")?;
    if max_reasonable_count < 2 {
        return Err(invalid(
            "CPSTATS_MAX_REASONABLE_COUNT",
            format!("ceiling {max_reasonable_count} leaves no valid count"),
        ));
    }

    let timezone = parse_utc_offset(&or_default("CPSTATS_UTC_OFFSET_MINUTES", "360"))?;
    let slow_fetch_secs = parse_u64("CPSTATS_SLOW_FETCH_SECS", "10")?;
    let stagnant_days = parse_i64("CPSTATS_STAGNANT_DAYS", "90")?;

    Ok(AppConfig {
        handles_path,
        snapshot_path,
        stats_path,
        log_level,
        request_timeout_secs,
        user_agent,
        max_concurrent_platforms,
        max_reasonable_count,
        timezone,
        slow_fetch_secs,
        stagnant_days,
    })
}

/// Parse a signed offset from UTC in minutes into a `FixedOffset`.
fn parse_utc_offset(raw: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar {
        var: "CPSTATS_UTC_OFFSET_MINUTES".to_string(),
        reason,
    };

    let minutes = raw.trim().parse::<i32>().map_err(|e| invalid(e.to_string()))?;
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| invalid(format!("offset {minutes} minutes is out of range")))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
