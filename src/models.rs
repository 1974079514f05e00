//! Data models for the keg pipeline.
//!
//! Raw keg records arrive from the device as loosely-typed JSON. They are
//! mapped onto [`NormalizedReading`] by [`RawKegRecord::to_normalized`], which
//! never fails: every field has an explicit fallback policy.

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---

/// Identifier used when a record carries no usable `id`.
pub const UNKNOWN_KEG_ID: &str = "unknown";

/// Fixed conversion factor from kilograms to US fluid ounces of beer.
pub const KG_TO_OZ: f64 = 35.274;

/// Raw keg record from the REST API or the stream feed.
#[derive(Debug, Clone)]
pub struct RawKegRecord(pub Value);

/// One parsed observation from the external source.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedReading {
    // ---
    pub keg_id: String,
    pub name: String,
    pub weight: f64,
    pub temperature: Option<f64>,
    pub full_weight: Option<f64>,
    pub weight_calibrate: f64,
    pub temperature_calibrate: f64,
}

/// What a numeric field becomes when it is missing or cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Substitute `0.0`.
    Zero,
    /// Leave the field absent.
    Absent,
}

impl Fallback {
    pub fn apply(self, parsed: Option<f64>) -> Option<f64> {
        match self {
            Fallback::Zero => Some(parsed.unwrap_or(0.0)),
            Fallback::Absent => parsed,
        }
    }
}

/// Parse a JSON value as a finite float.
///
/// Accepts JSON numbers, numeric strings (surrounding whitespace ignored) and
/// booleans (`1.0` / `0.0`). Everything else, and any non-finite result,
/// yields `None`.
pub fn parse_f64(value: &Value) -> Option<f64> {
    // ---
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Coerce an optional field according to `policy`.
pub fn coerce_f64(value: Option<&Value>, policy: Fallback) -> Option<f64> {
    policy.apply(value.and_then(parse_f64))
}

/// Canonical keg id: lower-cased, spaces replaced with underscores.
pub fn canonical_keg_id(raw: &str) -> String {
    raw.to_lowercase().replace(' ', "_")
}

/// Round to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl RawKegRecord {
    // ---
    pub fn to_normalized(&self) -> NormalizedReading {
        // ---
        let field = |key: &str| self.0.as_object().and_then(|obj| obj.get(key));

        let keg_id = field("id")
            .and_then(scalar_to_string)
            .map(|id| canonical_keg_id(&id))
            .unwrap_or_else(|| UNKNOWN_KEG_ID.to_string());

        let name = field("name")
            .and_then(scalar_to_string)
            .unwrap_or_else(|| keg_id.clone());

        let full_weight = coerce_f64(field("full_weight"), Fallback::Zero).filter(|fw| *fw > 0.0);

        NormalizedReading {
            name,
            weight: coerce_f64(field("weight"), Fallback::Zero).unwrap_or_default(),
            temperature: coerce_f64(field("temperature"), Fallback::Absent),
            full_weight,
            weight_calibrate: coerce_f64(field("weight_calibrate"), Fallback::Zero)
                .unwrap_or_default(),
            temperature_calibrate: coerce_f64(field("temperature_calibrate"), Fallback::Zero)
                .unwrap_or_default(),
            keg_id,
        }
    }
}

/// Running state for one discovered keg.
#[derive(Debug, Clone, PartialEq)]
pub struct KegRuntimeState {
    // ---
    pub name: String,
    /// Reference point for pour detection (kg).
    pub last_weight: f64,
    pub last_temperature: Option<f64>,
    /// Ounces poured since the last daily reset.
    pub daily_consumed: f64,
    /// Ounces of the most recent pour.
    pub last_pour: f64,
    pub last_pour_time: Option<DateTime<Local>>,
    /// Effective capacity in kg.
    pub full_weight: f64,
    pub weight_calibrate: f64,
    pub temperature_calibrate: f64,
}

/// Read-only snapshot of one keg exposed to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KegDisplayRecord {
    // ---
    pub id: String,
    pub name: String,
    pub weight: f64,
    pub temperature: Option<f64>,
    pub full_weight: f64,
    pub daily_consumed: f64,
    pub last_pour: f64,
    pub last_pour_time: Option<DateTime<Local>>,
    pub fill_percent: f64,
}

/// One detected pour, as stored in the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PourHistoryEntry {
    // ---
    #[serde(with = "history_timestamp")]
    pub timestamp: NaiveDateTime,
    pub keg: String,
    pub pour_oz: f64,
    pub weight_before: f64,
    pub weight_after: f64,
    pub temperature: Option<f64>,
}

/// `YYYY-MM-DD HH:MM:SS` timestamps in the persisted history.
mod history_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
