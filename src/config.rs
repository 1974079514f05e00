//! Configuration loader for the `keg-monitor-bridge` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). The keg-specific tunables live in [`KegOptions`],
//! which can also be replaced at runtime through the options route; both paths
//! share the same validation.
use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{canonical_keg_id, parse_f64};

pub const DEFAULT_EMPTY_WEIGHT: f64 = 4.0;
pub const DEFAULT_FULL_WEIGHT: f64 = 19.0;
pub const DEFAULT_POUR_THRESHOLD: f64 = 0.15;
pub const DEFAULT_HISTORY_MAX: usize = 500;

/// Parse an optional environment variable with a default value.
macro_rules! parse_env {
    ($lookup:expr, $var_name:expr, $ty:ty, $default:expr) => {
        $lookup($var_name)
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($lookup:expr, $var_name:expr) => {
        $lookup($var_name)
            .ok_or_else(|| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Validation failures for keg configuration, reported at setup or when the
/// options are replaced at runtime.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("stream URL is required")]
    MissingStreamUrl,

    #[error("invalid stream URL '{url}': {reason}")]
    InvalidStreamUrl { url: String, reason: String },

    #[error("invalid {field}: {reason}")]
    InvalidNumber { field: &'static str, reason: String },

    #[error("invalid per-keg full weight mapping: {0}")]
    InvalidPerKegMap(String),
}

/// Keg tunables that may change while the service runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KegOptions {
    // ---
    /// Weight of an empty keg shell (kg).
    pub empty_weight: f64,

    /// Full weight used when neither device nor override provide one (kg).
    pub default_full_weight: f64,

    /// Minimum weight decrease counted as a pour (kg).
    pub pour_threshold: f64,

    /// Operator overrides of the full weight, keyed by canonical keg id.
    pub per_keg_full: BTreeMap<String, f64>,
}

impl Default for KegOptions {
    fn default() -> Self {
        Self {
            empty_weight: DEFAULT_EMPTY_WEIGHT,
            default_full_weight: DEFAULT_FULL_WEIGHT,
            pour_threshold: DEFAULT_POUR_THRESHOLD,
            per_keg_full: BTreeMap::new(),
        }
    }
}

/// Options as submitted by an operator; the per-keg map is JSON text.
#[derive(Debug, Clone, Deserialize)]
pub struct OptionsForm {
    pub empty_weight: f64,
    pub default_full_weight: f64,
    pub pour_threshold: f64,
    #[serde(default)]
    pub per_keg_full: Option<String>,
}

impl KegOptions {
    /// Validate a submitted options form.
    pub fn from_form(form: OptionsForm) -> Result<Self, ConfigError> {
        // ---
        let options = Self {
            empty_weight: finite("empty_weight", form.empty_weight)?,
            default_full_weight: finite("default_full_weight", form.default_full_weight)?,
            pour_threshold: finite("pour_threshold", form.pour_threshold)?,
            per_keg_full: parse_per_keg_full(form.per_keg_full.as_deref().unwrap_or(""))?,
        };

        if options.pour_threshold < 0.0 {
            return Err(ConfigError::InvalidNumber {
                field: "pour_threshold",
                reason: "must not be negative".to_string(),
            });
        }
        Ok(options)
    }

    /// Full weight configured for `keg_id` when the device does not report one.
    pub fn configured_full_weight(&self, keg_id: &str) -> f64 {
        self.per_keg_full
            .get(keg_id)
            .copied()
            .unwrap_or(self.default_full_weight)
    }
}

fn finite(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::InvalidNumber {
            field,
            reason: format!("{value} is not a finite number"),
        })
    }
}

/// Parse the per-keg full weight mapping (`{"keg id": kg, ...}`).
///
/// Keys are canonicalized like keg ids. Blank text is an empty mapping.
pub fn parse_per_keg_full(text: &str) -> Result<BTreeMap<String, f64>, ConfigError> {
    // ---
    if text.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ConfigError::InvalidPerKegMap(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| ConfigError::InvalidPerKegMap("expected a JSON object".to_string()))?;

    object
        .iter()
        .map(|(keg_id, weight)| {
            parse_f64(weight)
                .map(|kg| (canonical_keg_id(keg_id), kg))
                .ok_or_else(|| {
                    ConfigError::InvalidPerKegMap(format!("'{keg_id}' is not a number: {weight}"))
                })
        })
        .collect()
}

/// Validate the stream URL and return it unchanged.
pub fn validate_stream_url(raw: &str) -> Result<String, ConfigError> {
    // ---
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingStreamUrl);
    }
    reqwest::Url::parse(trimmed).map_err(|e| ConfigError::InvalidStreamUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;
    Ok(trimmed.to_string())
}

/// Strongly typed application configuration.
///
/// The keg options are the startup values; the coordinator owns the live copy.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Streaming feed of the keg device; the REST base is derived from it.
    pub stream_url: String,

    pub options: KegOptions,

    /// Maximum number of pour history entries kept.
    pub history_max: usize,

    pub poll_interval: Duration,
    pub reconnect_delay: Duration,
    pub reset_interval: Duration,

    /// Web-accessible directory receiving history exports.
    pub static_dir: PathBuf,

    pub listen_addr: SocketAddr,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
/// - `KEG_STREAM_URL` – WebSocket URL of the keg device
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `KEG_EMPTY_WEIGHT` (4.0), `KEG_DEFAULT_FULL_WEIGHT` (19.0),
///   `KEG_POUR_THRESHOLD` (0.15), `KEG_PER_KEG_FULL` (JSON object)
/// - `KEG_HISTORY_MAX` (500)
/// - `KEG_POLL_INTERVAL_SECS` (10), `KEG_RECONNECT_DELAY_SECS` (10),
///   `KEG_RESET_INTERVAL_SECS` (86400)
/// - `KEG_STATIC_DIR` (`www`), `KEG_LISTEN_ADDR` (`0.0.0.0:8080`)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    load_from(|name| env::var(name).ok())
}

/// Load configuration through an arbitrary variable lookup.
pub fn load_from<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let db_url = require_env!(lookup, "DATABASE_URL");
    let stream_url = validate_stream_url(&lookup("KEG_STREAM_URL").unwrap_or_default())?;
    let db_pool_max = parse_env!(lookup, "DB_POOL_MAX", u32, 5);

    let form = OptionsForm {
        empty_weight: parse_env!(lookup, "KEG_EMPTY_WEIGHT", f64, DEFAULT_EMPTY_WEIGHT),
        default_full_weight: parse_env!(lookup, "KEG_DEFAULT_FULL_WEIGHT", f64, DEFAULT_FULL_WEIGHT),
        pour_threshold: parse_env!(lookup, "KEG_POUR_THRESHOLD", f64, DEFAULT_POUR_THRESHOLD),
        per_keg_full: lookup("KEG_PER_KEG_FULL"),
    };
    let options = KegOptions::from_form(form)?;

    let history_max = parse_env!(lookup, "KEG_HISTORY_MAX", usize, DEFAULT_HISTORY_MAX);
    if history_max == 0 {
        return Err(anyhow!("Invalid KEG_HISTORY_MAX: must be at least 1"));
    }

    let poll_secs = parse_env!(lookup, "KEG_POLL_INTERVAL_SECS", u64, 10);
    let reconnect_secs = parse_env!(lookup, "KEG_RECONNECT_DELAY_SECS", u64, 10);
    let reset_secs = parse_env!(lookup, "KEG_RESET_INTERVAL_SECS", u64, 24 * 60 * 60);
    let static_dir = PathBuf::from(lookup("KEG_STATIC_DIR").unwrap_or_else(|| "www".into()));
    let listen_addr = parse_env!(
        lookup,
        "KEG_LISTEN_ADDR",
        SocketAddr,
        SocketAddr::from(([0, 0, 0, 0], 8080))
    );

    Ok(Config {
        db_url,
        db_pool_max,
        stream_url,
        options,
        history_max,
        poll_interval: Duration::from_secs(poll_secs.max(1)),
        reconnect_delay: Duration::from_secs(reconnect_secs),
        reset_interval: Duration::from_secs(reset_secs.max(1)),
        static_dir,
        listen_addr,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the database password while showing all other values.
    pub fn log_config(&self) {
        // ---
        let masked_db_url = if let Some(at_pos) = self.db_url.rfind('@') {
            if let Some(colon_pos) = self.db_url[..at_pos].rfind(':') {
                format!(
                    "{}:****{}",
                    &self.db_url[..colon_pos],
                    &self.db_url[at_pos..]
                )
            } else {
                self.db_url.clone()
            }
        } else {
            self.db_url.clone()
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL            : {}", masked_db_url);
        tracing::info!("  DB_POOL_MAX             : {}", self.db_pool_max);
        tracing::info!("  KEG_STREAM_URL          : {}", self.stream_url);
        tracing::info!("  KEG_EMPTY_WEIGHT        : {}", self.options.empty_weight);
        tracing::info!("  KEG_DEFAULT_FULL_WEIGHT : {}", self.options.default_full_weight);
        tracing::info!("  KEG_POUR_THRESHOLD      : {}", self.options.pour_threshold);
        tracing::info!("  KEG_PER_KEG_FULL        : {:?}", self.options.per_keg_full);
        tracing::info!("  KEG_HISTORY_MAX         : {}", self.history_max);
        tracing::info!("  KEG_POLL_INTERVAL       : {:?}", self.poll_interval);
        tracing::info!("  KEG_RESET_INTERVAL      : {:?}", self.reset_interval);
        tracing::info!("  KEG_STATIC_DIR          : {}", self.static_dir.display());
        tracing::info!("  KEG_LISTEN_ADDR         : {}", self.listen_addr);
    }
}
