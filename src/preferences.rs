//! Operator preferences: display units and per-keg configuration.
//!
//! Persisted as one document `{display_units, keg_config}`. Loading is
//! lenient: unknown unit values fall back to the defaults and unreadable
//! per-keg entries are dropped, so a foreign payload never blocks startup.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::round_to;

// ---

const KG_TO_LB: f64 = 2.20462;
const OZ_TO_ML: f64 = 29.5735;
const NAME_MAX_LEN: usize = 64;
const NOTES_MAX_LEN: usize = 255;

#[derive(Debug, Error, PartialEq)]
pub enum PreferenceError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("full weight {value} kg must exceed the empty weight {empty} kg")]
    NotAboveEmpty { value: f64, empty: f64 },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("invalid option '{option}' for {kind}")]
    UnknownOption { kind: &'static str, option: String },

    #[error("unknown keg '{0}'")]
    UnknownKeg(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightUnit {
    #[default]
    #[serde(rename = "kg")]
    Kg,
    #[serde(rename = "lb")]
    Lb,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TempUnit {
    #[default]
    #[serde(rename = "°C")]
    Celsius,
    #[serde(rename = "°F")]
    Fahrenheit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeUnit {
    #[default]
    #[serde(rename = "oz")]
    Oz,
    #[serde(rename = "ml")]
    Ml,
}

/// Which global unit select is being changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Weight,
    Temp,
    Pour,
}

impl UnitKind {
    pub const ALL: [UnitKind; 3] = [UnitKind::Weight, UnitKind::Temp, UnitKind::Pour];

    pub fn key(self) -> &'static str {
        match self {
            UnitKind::Weight => "weight",
            UnitKind::Temp => "temp",
            UnitKind::Pour => "pour",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UnitKind::Weight => "Keg Weight Unit",
            UnitKind::Temp => "Keg Temperature Unit",
            UnitKind::Pour => "Keg Volume Unit",
        }
    }

    pub fn options(self) -> &'static [&'static str] {
        match self {
            UnitKind::Weight => &["kg", "lb"],
            UnitKind::Temp => &["°C", "°F"],
            UnitKind::Pour => &["oz", "ml"],
        }
    }
}

/// Presentation units; internal values stay kg, °C and oz.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayUnits {
    #[serde(default, deserialize_with = "lenient")]
    pub weight: WeightUnit,
    #[serde(default, deserialize_with = "lenient")]
    pub temp: TempUnit,
    #[serde(default, deserialize_with = "lenient")]
    pub pour: VolumeUnit,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn unit_str<T: Serialize>(unit: T) -> String {
    serde_json::to_value(unit)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

impl DisplayUnits {
    /// Currently selected option of one unit select.
    pub fn current(&self, kind: UnitKind) -> String {
        match kind {
            UnitKind::Weight => unit_str(self.weight),
            UnitKind::Temp => unit_str(self.temp),
            UnitKind::Pour => unit_str(self.pour),
        }
    }

    pub fn select(&mut self, kind: UnitKind, option: &str) -> Result<(), PreferenceError> {
        // ---
        let unknown = || PreferenceError::UnknownOption {
            kind: kind.key(),
            option: option.to_string(),
        };
        let value = Value::String(option.to_string());

        match kind {
            UnitKind::Weight => self.weight = serde_json::from_value(value).map_err(|_| unknown())?,
            UnitKind::Temp => self.temp = serde_json::from_value(value).map_err(|_| unknown())?,
            UnitKind::Pour => self.pour = serde_json::from_value(value).map_err(|_| unknown())?,
        }
        Ok(())
    }

    /// Convert a kg value; 2 decimal places.
    pub fn weight_value(&self, kg: f64) -> (f64, &'static str) {
        match self.weight {
            WeightUnit::Kg => (round_to(kg, 2), "kg"),
            WeightUnit::Lb => (round_to(kg * KG_TO_LB, 2), "lb"),
        }
    }

    /// Convert a °C value; 1 decimal place.
    pub fn temperature_value(&self, celsius: f64) -> (f64, &'static str) {
        match self.temp {
            TempUnit::Celsius => (round_to(celsius, 1), "°C"),
            TempUnit::Fahrenheit => (round_to(celsius * 9.0 / 5.0 + 32.0, 1), "°F"),
        }
    }

    /// Convert an oz value; ml are whole numbers.
    pub fn volume_value(&self, oz: f64) -> (f64, &'static str) {
        match self.pour {
            VolumeUnit::Oz => (round_to(oz, 1), "oz"),
            VolumeUnit::Ml => (round_to(oz * OZ_TO_ML, 0), "ml"),
        }
    }
}

/// Operator-maintained values for one keg.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KegConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_calibrate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_calibrate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kegged_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Partial update of a [`KegConfig`].
///
/// A missing field is left unchanged, an explicit `null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KegConfigUpdate {
    #[serde(default, deserialize_with = "double_option")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub full_weight: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub weight_calibrate: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub temperature_calibrate: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub kegged_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub expires_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), PreferenceError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(PreferenceError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn check_len(field: &'static str, text: &str, max: usize) -> Result<(), PreferenceError> {
    if text.chars().count() > max {
        Err(PreferenceError::TooLong { field, max })
    } else {
        Ok(())
    }
}

impl KegConfigUpdate {
    /// Validate every provided field against the entity limits.
    pub fn validate(&self, empty_weight: f64) -> Result<(), PreferenceError> {
        // ---
        if let Some(Some(name)) = &self.name {
            check_len("name", name, NAME_MAX_LEN)?;
        }
        if let Some(Some(notes)) = &self.notes {
            check_len("notes", notes, NOTES_MAX_LEN)?;
        }
        if let Some(Some(full)) = self.full_weight {
            check_range("full_weight", full, 0.0, 100.0)?;
            if full <= empty_weight {
                return Err(PreferenceError::NotAboveEmpty {
                    value: full,
                    empty: empty_weight,
                });
            }
        }
        if let Some(Some(offset)) = self.weight_calibrate {
            check_range("weight_calibrate", offset, -10.0, 10.0)?;
        }
        if let Some(Some(offset)) = self.temperature_calibrate {
            check_range("temperature_calibrate", offset, -10.0, 10.0)?;
        }
        Ok(())
    }
}

impl KegConfig {
    /// Apply an update that already passed [`KegConfigUpdate::validate`].
    pub fn apply(&mut self, update: KegConfigUpdate) {
        // ---
        if let Some(name) = update.name {
            self.name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        }
        if let Some(full) = update.full_weight {
            self.full_weight = full;
        }
        if let Some(offset) = update.weight_calibrate {
            self.weight_calibrate = offset;
        }
        if let Some(offset) = update.temperature_calibrate {
            self.temperature_calibrate = offset;
        }
        if let Some(date) = update.kegged_date {
            self.kegged_date = date;
        }
        if let Some(date) = update.expires_date {
            self.expires_date = date;
        }
        if let Some(notes) = update.notes {
            self.notes = notes.filter(|n| !n.trim().is_empty());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Preferences {
    pub display_units: DisplayUnits,
    pub keg_config: BTreeMap<String, KegConfig>,
}

impl Preferences {
    /// Rebuild preferences from a stored document; non-objects yield defaults.
    pub fn from_stored(stored: Option<&Value>) -> Self {
        // ---
        let Some(object) = stored.and_then(Value::as_object) else {
            if stored.is_some() {
                tracing::warn!("Stored preferences are not an object, using defaults");
            }
            return Self::default();
        };

        let display_units = object
            .get("display_units")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        let keg_config = object
            .get("keg_config")
            .and_then(Value::as_object)
            .map(|kegs| {
                kegs.iter()
                    .filter_map(|(keg_id, cfg)| match serde_json::from_value(cfg.clone()) {
                        Ok(cfg) => Some((keg_id.clone(), cfg)),
                        Err(e) => {
                            tracing::debug!("Dropping stored config for keg '{}': {}", keg_id, e);
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            display_units,
            keg_config,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn keg(&self, keg_id: &str) -> Option<&KegConfig> {
        self.keg_config.get(keg_id)
    }

    pub fn name_override(&self, keg_id: &str) -> Option<&str> {
        self.keg(keg_id).and_then(|cfg| cfg.name.as_deref())
    }
}
