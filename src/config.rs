//! Configuration management

use std::time::Duration;

use anyhow::{Context, Result};

use crate::defaults::{DEFAULT_DIRECTIONS_TIMEOUT_SECS, DEFAULT_HEURISTIC_SPEED_MPS};
use crate::services::routing::DEFAULT_DIRECTIONS_URL;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// Optional NATS credentials
    pub nats_credentials: Option<(String, String)>,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Google Maps server key; without it "fastest" runs the heuristic
    pub google_maps_key: Option<String>,

    /// Directions endpoint
    pub directions_url: String,

    pub directions_timeout: Duration,

    /// Assumed average driving speed for heuristic durations
    pub heuristic_speed_mps: f64,

    /// Optimization requests admitted per route per window
    pub optimize_rate_limit: usize,
    pub optimize_rate_window: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let nats_url = lookup("NATS_URL").unwrap_or_else(|| "nats://localhost:4222".to_string());

        let nats_credentials = match (lookup("NATS_USER"), lookup("NATS_PASSWORD")) {
            (Some(user), Some(password)) if !user.is_empty() => Some((user, password)),
            _ => None,
        };

        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let google_maps_key = lookup("GOOGLE_MAPS_SERVER_KEY").filter(|k| !k.trim().is_empty());

        let directions_url = lookup("DIRECTIONS_URL").unwrap_or_else(|| DEFAULT_DIRECTIONS_URL.to_string());

        let directions_timeout_secs: u64 = parse_or(&lookup, "DIRECTIONS_TIMEOUT_SECS", DEFAULT_DIRECTIONS_TIMEOUT_SECS)?;
        if directions_timeout_secs == 0 {
            anyhow::bail!("DIRECTIONS_TIMEOUT_SECS must be positive");
        }

        let heuristic_speed_mps: f64 = parse_or(&lookup, "HEURISTIC_SPEED_MPS", DEFAULT_HEURISTIC_SPEED_MPS)?;
        if !(heuristic_speed_mps.is_finite() && heuristic_speed_mps > 0.0) {
            anyhow::bail!("HEURISTIC_SPEED_MPS must be a positive number, got {}", heuristic_speed_mps);
        }

        let optimize_rate_limit: usize = parse_or(&lookup, "OPTIMIZE_RATE_LIMIT", 10)?;
        let optimize_rate_window_secs: u64 = parse_or(&lookup, "OPTIMIZE_RATE_WINDOW_SECS", 60)?;

        Ok(Self {
            nats_url,
            nats_credentials,
            database_url,
            google_maps_key,
            directions_url,
            directions_timeout: Duration::from_secs(directions_timeout_secs),
            heuristic_speed_mps,
            optimize_rate_limit,
            optimize_rate_window: Duration::from_secs(optimize_rate_window_secs),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("DATABASE_URL", "postgres://test")]).unwrap();

        assert_eq!(config.nats_url, "nats://localhost:4222");
        assert!(config.nats_credentials.is_none());
        assert!(config.google_maps_key.is_none());
        assert_eq!(config.directions_url, DEFAULT_DIRECTIONS_URL);
        assert_eq!(config.directions_timeout, Duration::from_secs(5));
        assert_eq!(config.heuristic_speed_mps, 10.0);
        assert_eq!(config.optimize_rate_limit, 10);
        assert_eq!(config.optimize_rate_window, Duration::from_secs(60));
    }

    #[test]
    fn test_database_url_required() {
        assert!(config_from(&[]).is_err());
    }

    #[test]
    fn test_blank_maps_key_disables_provider() {
        let config = config_from(&[("DATABASE_URL", "postgres://test"), ("GOOGLE_MAPS_SERVER_KEY", "  ")]).unwrap();
        assert!(config.google_maps_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://test"),
            ("GOOGLE_MAPS_SERVER_KEY", "abc"),
            ("DIRECTIONS_TIMEOUT_SECS", "2"),
            ("HEURISTIC_SPEED_MPS", "13.9"),
            ("NATS_USER", "worker"),
            ("NATS_PASSWORD", "secret"),
        ])
        .unwrap();

        assert_eq!(config.google_maps_key.as_deref(), Some("abc"));
        assert_eq!(config.directions_timeout, Duration::from_secs(2));
        assert_eq!(config.heuristic_speed_mps, 13.9);
        assert_eq!(
            config.nats_credentials,
            Some(("worker".to_string(), "secret".to_string()))
        );
    }

    #[test]
    fn test_invalid_speed_rejected() {
        for speed in ["0", "-3", "fast", "NaN"] {
            let result = config_from(&[("DATABASE_URL", "postgres://test"), ("HEURISTIC_SPEED_MPS", speed)]);
            assert!(result.is_err(), "speed {:?} should be rejected", speed);
        }
    }
}
