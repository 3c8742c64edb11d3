use std::env;

use chrono::{FixedOffset, Offset, Utc};
use reqwest::Url;

/// Fallback upstream for the `/pollution` proxy rule.
pub const DEFAULT_POLLUTION_UPSTREAM: &str = "http://4.231.99.148:8000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deployment {
    Local,
    Dev,
    Stage,
    Prod,
}

impl Deployment {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Self::Dev,
            "stage" | "staging" => Self::Stage,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Pollution proxy
    pub pollution_upstream_url: Url,
    pub pollution_timeout_seconds: u64,

    // Chart rendering
    pub default_tz_offset_minutes: i32,

    // API settings
    pub api_host: String,
    pub api_port: u16,

    // Rate limiting (proxy routes only)
    pub disable_rate_limiting: bool,
    pub rate_limit_proxy_per_second: u64,
    pub rate_limit_proxy_burst: u32,

    // Logging
    pub log_json: bool,

    // Application metadata
    pub deployment: Deployment,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pollution_upstream_url: Url::parse(DEFAULT_POLLUTION_UPSTREAM)
                .unwrap_or_else(|_| unreachable!("default upstream is a valid URL")),
            pollution_timeout_seconds: 300,
            default_tz_offset_minutes: 0,
            api_host: "0.0.0.0".to_string(),
            api_port: 3000,
            disable_rate_limiting: false,
            rate_limit_proxy_per_second: 10,
            rate_limit_proxy_burst: 60,
            log_json: false,
            deployment: Deployment::Local,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Anything unset falls back to [`Config::default`]. Values that are set
    /// but cannot be understood are rejected rather than silently replaced.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a variable is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let pollution_upstream_url = match env::var("POLLUTION_UPSTREAM_URL") {
            Ok(raw) => parse_upstream(&raw)?,
            Err(_) => defaults.pollution_upstream_url,
        };

        let default_tz_offset_minutes =
            parse_var("DEFAULT_TZ_OFFSET_MINUTES", defaults.default_tz_offset_minutes)?;
        if offset_from_minutes(default_tz_offset_minutes).is_none() {
            return Err(ConfigError::Invalid {
                name: "DEFAULT_TZ_OFFSET_MINUTES",
                value: default_tz_offset_minutes.to_string(),
            });
        }

        Ok(Self {
            // Pollution proxy
            pollution_upstream_url,
            pollution_timeout_seconds: parse_var(
                "POLLUTION_TIMEOUT_SECONDS",
                defaults.pollution_timeout_seconds,
            )?,

            // Chart rendering
            default_tz_offset_minutes,

            // API settings
            api_host: env::var("API_HOST").unwrap_or(defaults.api_host),
            api_port: parse_var("API_PORT", defaults.api_port)?,

            // Rate limiting
            disable_rate_limiting: parse_var(
                "DISABLE_RATE_LIMITING",
                defaults.disable_rate_limiting,
            )?,
            rate_limit_proxy_per_second: parse_var(
                "RATE_LIMIT_PROXY_PER_SECOND",
                defaults.rate_limit_proxy_per_second,
            )?,
            rate_limit_proxy_burst: parse_var(
                "RATE_LIMIT_PROXY_BURST",
                defaults.rate_limit_proxy_burst,
            )?,

            // Logging
            log_json: env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")),

            // Application metadata
            deployment: Deployment::from_str(
                &env::var("DEPLOYMENT").unwrap_or_else(|_| "local".to_string()),
            ),
        })
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    /// Time zone used for calendar dates and labels when the client sends none.
    #[must_use]
    pub fn default_offset(&self) -> FixedOffset {
        offset_from_minutes(self.default_tz_offset_minutes).unwrap_or_else(utc_offset)
    }
}

/// Convert minutes east of UTC into a fixed offset, rejecting anything
/// beyond +/- 24h.
#[must_use]
pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

fn parse_upstream(raw: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::Invalid {
        name: "POLLUTION_UPSTREAM_URL",
        value: raw.to_string(),
    };
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(invalid()),
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_parses_aliases() {
        assert_eq!(Deployment::from_str("Production"), Deployment::Prod);
        assert_eq!(Deployment::from_str("staging"), Deployment::Stage);
        assert_eq!(Deployment::from_str("dev"), Deployment::Dev);
        assert_eq!(Deployment::from_str("anything"), Deployment::Local);
    }

    #[test]
    fn defaults_point_at_pollution_api() {
        let config = Config::default();
        assert_eq!(config.pollution_upstream_url.as_str(), "http://4.231.99.148:8000/");
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.default_offset().local_minus_utc(), 0);
    }

    #[test]
    fn upstream_must_be_http() {
        assert!(parse_upstream("https://api.example.org:8443").is_ok());
        assert!(parse_upstream("ftp://example.org").is_err());
        assert!(parse_upstream("not a url").is_err());
    }

    #[test]
    fn offsets_are_bounded() {
        assert_eq!(offset_from_minutes(60).map(|o| o.local_minus_utc()), Some(3600));
        assert_eq!(offset_from_minutes(-330).map(|o| o.local_minus_utc()), Some(-19_800));
        assert!(offset_from_minutes(24 * 60).is_none());
        assert!(offset_from_minutes(i32::MAX).is_none());
    }
}
