use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::Result;
use dotenvy::dotenv;

use crate::models::{AnalysisOptions, MissingPolicy};

const DEFAULT_MISSING_LABEL: &str = "missing";
/// Beyond this, `10^places` no longer rounds an `f64` meaningfully.
pub const MAX_DECIMAL_PLACES: u32 = 15;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub max_file_size: usize,
    pub max_sessions: u64,
    pub session_ttl_secs: u64,
    pub preview_rows: usize,
    pub decimal_places: u32,
    pub missing_policy: MissingPolicy,
    pub missing_label: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_file_size: default_max_file_size(),
            max_sessions: 256,
            session_ttl_secs: 3600,
            preview_rows: 5,
            decimal_places: 4,
            missing_policy: MissingPolicy::Drop,
            missing_label: DEFAULT_MISSING_LABEL.to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, falling back to defaults
    /// for absent keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let missing_label = lookup("SURVEY_MISSING_LABEL")
            .unwrap_or_else(|| DEFAULT_MISSING_LABEL.to_string());
        let missing_policy = match lookup("SURVEY_MISSING_POLICY") {
            Some(raw) => MissingPolicy::parse(&raw, &missing_label).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid SURVEY_MISSING_POLICY '{}': expected drop or category",
                    raw
                )
            })?,
            None => defaults.missing_policy,
        };

        let max_sessions = parse_var(&lookup, "SURVEY_MAX_SESSIONS", defaults.max_sessions)?;
        if max_sessions == 0 {
            anyhow::bail!("SURVEY_MAX_SESSIONS must be at least 1");
        }

        let decimal_places =
            parse_var(&lookup, "SURVEY_DECIMAL_PLACES", defaults.decimal_places)?;
        if decimal_places > MAX_DECIMAL_PLACES {
            anyhow::bail!(
                "SURVEY_DECIMAL_PLACES must be at most {}, got {}",
                MAX_DECIMAL_PLACES,
                decimal_places
            );
        }

        Ok(Config {
            bind_addr: parse_var(&lookup, "SURVEY_BIND_ADDR", defaults.bind_addr)?,
            max_file_size: parse_var(&lookup, "SURVEY_MAX_FILE_SIZE", defaults.max_file_size)?,
            max_sessions,
            session_ttl_secs: parse_var(
                &lookup,
                "SURVEY_SESSION_TTL_SECS",
                defaults.session_ttl_secs,
            )?,
            preview_rows: parse_var(&lookup, "SURVEY_PREVIEW_ROWS", defaults.preview_rows)?,
            decimal_places,
            missing_policy,
            missing_label,
        })
    }

    /// Options for one analysis; `missing` overrides the configured policy.
    pub fn analysis_options(&self, missing: Option<&str>) -> Option<AnalysisOptions> {
        let missing = match missing {
            Some(raw) => MissingPolicy::parse(raw, &self.missing_label)?,
            None => self.missing_policy.clone(),
        };
        Some(AnalysisOptions { missing })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse {} ('{}'): {}", key, raw, e)),
        None => Ok(default),
    }
}

pub fn load_config() -> Result<Config> {
    let config = Config::new()?;
    tracing::info!(
        "Configuration loaded: bind={}, max_file_size={}B, max_sessions={}, ttl={}s, missing={:?}",
        config.bind_addr,
        config.max_file_size,
        config.max_sessions,
        config.session_ttl_secs,
        config.missing_policy
    );
    Ok(config)
}
