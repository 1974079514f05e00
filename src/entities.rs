//! Entity catalogue exposed to the home-automation host.
//!
//! Every keg contributes sensors (raw and display-unit variants), calibration
//! numbers, a name text and two dates. The instance contributes a device
//! select and three unit selects. Entities carry no state of their own; each
//! value is read from the published [`KegView`] when the catalogue is built.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::coordinator::KegView;
use crate::models::KegDisplayRecord;
use crate::preferences::{DisplayUnits, KegConfig, UnitKind};

// ---

pub const DOMAIN: &str = "beer_keg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Sensor,
    Number,
    Text,
    Date,
    Select,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: &'static str,
    pub model: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub unique_id: String,
    pub platform: Platform,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keg_id: Option<String>,
    pub state: Value,
    pub unit_of_measurement: Option<&'static str>,
    pub icon: Option<&'static str>,
    pub device_class: Option<&'static str>,
    pub state_class: Option<&'static str>,
    pub device: DeviceInfo,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

/// First four characters of a keg id, used in friendly names.
pub fn short_keg_id(keg_id: &str) -> String {
    keg_id.chars().take(4).collect()
}

fn keg_device(instance: &str, keg_id: &str) -> DeviceInfo {
    DeviceInfo {
        identifier: format!("{instance}_{keg_id}"),
        name: format!("Beer Keg {}", short_keg_id(keg_id)),
        manufacturer: "Beer Keg",
        model: "WebSocket + REST",
    }
}

fn settings_device(instance: &str) -> DeviceInfo {
    DeviceInfo {
        identifier: format!("{instance}_settings"),
        name: "Beer Keg Settings".to_string(),
        manufacturer: "Beer Keg",
        model: "WebSocket + REST",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Weight,
    Temperature,
    WeightDisplay,
    TemperatureDisplay,
    FillPercent,
    FillLevel,
    LastPour,
    DailyConsumed,
    LastPourDisplay,
    DailyConsumptionDisplay,
    FullWeight,
    Name,
    Id,
}

impl SensorKind {
    pub const ALL: [SensorKind; 13] = [
        SensorKind::Weight,
        SensorKind::Temperature,
        SensorKind::WeightDisplay,
        SensorKind::TemperatureDisplay,
        SensorKind::FillPercent,
        SensorKind::FillLevel,
        SensorKind::LastPour,
        SensorKind::DailyConsumed,
        SensorKind::LastPourDisplay,
        SensorKind::DailyConsumptionDisplay,
        SensorKind::FullWeight,
        SensorKind::Name,
        SensorKind::Id,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SensorKind::Weight => "weight",
            SensorKind::Temperature => "temperature",
            SensorKind::WeightDisplay => "weight_display",
            SensorKind::TemperatureDisplay => "temperature_display",
            SensorKind::FillPercent => "fill_percent",
            // legacy alias
            SensorKind::FillLevel => "fill_level",
            SensorKind::LastPour => "last_pour",
            SensorKind::DailyConsumed => "daily_consumed",
            SensorKind::LastPourDisplay => "last_pour_display",
            SensorKind::DailyConsumptionDisplay => "daily_consumption_display",
            SensorKind::FullWeight => "full_weight",
            SensorKind::Name => "name",
            SensorKind::Id => "id",
        }
    }

    fn label(self) -> &'static str {
        match self {
            SensorKind::Weight => "Weight",
            SensorKind::Temperature => "Temperature",
            SensorKind::WeightDisplay => "Weight (Display)",
            SensorKind::TemperatureDisplay => "Temperature (Display)",
            SensorKind::FillPercent | SensorKind::FillLevel => "Fill Level",
            SensorKind::LastPour => "Last Pour (oz)",
            SensorKind::DailyConsumed => "Daily Consumption (oz)",
            SensorKind::LastPourDisplay => "Last Pour (Display)",
            SensorKind::DailyConsumptionDisplay => "Daily Consumption (Display)",
            SensorKind::FullWeight => "Full Weight",
            SensorKind::Name => "Name",
            SensorKind::Id => "ID",
        }
    }

    fn icon(self) -> &'static str {
        match self {
            SensorKind::Weight | SensorKind::WeightDisplay => "mdi:scale",
            SensorKind::Temperature | SensorKind::TemperatureDisplay => "mdi:thermometer",
            SensorKind::FillPercent | SensorKind::FillLevel => "mdi:cup",
            SensorKind::LastPour | SensorKind::LastPourDisplay => "mdi:cup-water",
            SensorKind::DailyConsumed | SensorKind::DailyConsumptionDisplay => "mdi:beer",
            SensorKind::FullWeight => "mdi:weight",
            SensorKind::Name => "mdi:barcode",
            SensorKind::Id => "mdi:identifier",
        }
    }

    /// Only the fixed-unit sensors declare a device class, so the host does
    /// not re-convert display values.
    fn device_class(self) -> Option<&'static str> {
        match self {
            SensorKind::Weight | SensorKind::FullWeight => Some("weight"),
            SensorKind::Temperature => Some("temperature"),
            _ => None,
        }
    }

    fn state_class(self) -> Option<&'static str> {
        match self {
            SensorKind::Name | SensorKind::Id => None,
            SensorKind::DailyConsumed | SensorKind::DailyConsumptionDisplay => {
                Some("total_increasing")
            }
            _ => Some("measurement"),
        }
    }

    /// Current value and unit for one keg.
    pub fn value(self, record: &KegDisplayRecord, units: &DisplayUnits) -> (Value, Option<&'static str>) {
        // ---
        let pair = |(v, unit): (f64, &'static str)| (json!(v), Some(unit));

        match self {
            SensorKind::Weight => (json!(record.weight), Some("kg")),
            SensorKind::Temperature => (json!(record.temperature), Some("°C")),
            SensorKind::WeightDisplay => pair(units.weight_value(record.weight)),
            SensorKind::TemperatureDisplay => match record.temperature {
                Some(t) => pair(units.temperature_value(t)),
                None => (Value::Null, Some(units.temperature_value(0.0).1)),
            },
            SensorKind::FillPercent | SensorKind::FillLevel => {
                (json!(record.fill_percent), Some("%"))
            }
            SensorKind::LastPour => (json!(record.last_pour), Some("oz")),
            SensorKind::DailyConsumed => (json!(record.daily_consumed), Some("oz")),
            SensorKind::LastPourDisplay => pair(units.volume_value(record.last_pour)),
            SensorKind::DailyConsumptionDisplay => pair(units.volume_value(record.daily_consumed)),
            SensorKind::FullWeight => (json!(record.full_weight), Some("kg")),
            SensorKind::Name => (json!(record.name), None),
            SensorKind::Id => (json!(record.id), None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    FullWeightKg,
    WeightCalibrate,
    TempCalibrateC,
}

impl NumberKind {
    pub const ALL: [NumberKind; 3] = [
        NumberKind::FullWeightKg,
        NumberKind::WeightCalibrate,
        NumberKind::TempCalibrateC,
    ];

    pub fn key(self) -> &'static str {
        match self {
            NumberKind::FullWeightKg => "full_weight_kg",
            NumberKind::WeightCalibrate => "weight_calibrate",
            NumberKind::TempCalibrateC => "temp_calibrate_c",
        }
    }

    fn label(self) -> &'static str {
        match self {
            NumberKind::FullWeightKg => "Full Weight (kg)",
            NumberKind::WeightCalibrate => "Weight Calibrate",
            NumberKind::TempCalibrateC => "Temp Calibrate (°C)",
        }
    }

    /// `(min, max, step)`
    fn limits(self) -> (f64, f64, f64) {
        match self {
            NumberKind::FullWeightKg => (0.0, 100.0, 0.01),
            NumberKind::WeightCalibrate => (-10.0, 10.0, 0.01),
            NumberKind::TempCalibrateC => (-10.0, 10.0, 0.1),
        }
    }

    fn unit(self) -> &'static str {
        match self {
            NumberKind::FullWeightKg | NumberKind::WeightCalibrate => "kg",
            NumberKind::TempCalibrateC => "°C",
        }
    }

    /// Operator value when set, otherwise the latest device-reported one.
    fn value(self, view: &KegView, keg_id: &str, config: Option<&KegConfig>) -> Option<f64> {
        // ---
        let device = view.calibration.get(keg_id);
        match self {
            NumberKind::FullWeightKg => view.kegs.get(keg_id).map(|r| r.full_weight),
            NumberKind::WeightCalibrate => config
                .and_then(|c| c.weight_calibrate)
                .or(device.map(|d| d.weight)),
            NumberKind::TempCalibrateC => config
                .and_then(|c| c.temperature_calibrate)
                .or(device.map(|d| d.temperature)),
        }
    }
}

/// Build the whole catalogue for one integration instance.
pub fn catalogue(instance: &str, view: &KegView) -> Vec<EntityState> {
    // ---
    let mut entities = settings_entities(instance, view);

    for (keg_id, record) in &view.kegs {
        entities.extend(keg_entities(instance, view, keg_id, record));
    }
    entities
}

fn settings_entities(instance: &str, view: &KegView) -> Vec<EntityState> {
    // ---
    let device = settings_device(instance);
    let keg_ids: Vec<&String> = view.kegs.keys().collect();
    let selected = view
        .selected_device
        .as_ref()
        .filter(|id| view.kegs.contains_key(*id))
        .or_else(|| keg_ids.first().copied());

    let mut attributes = Map::new();
    attributes.insert("options".to_string(), json!(keg_ids));

    let mut entities = vec![EntityState {
        unique_id: format!("{DOMAIN}_{instance}_keg_device"),
        platform: Platform::Select,
        name: "Keg Device".to_string(),
        keg_id: None,
        state: json!(selected),
        unit_of_measurement: None,
        icon: None,
        device_class: None,
        state_class: None,
        device: device.clone(),
        attributes,
    }];

    for kind in UnitKind::ALL {
        let mut attributes = Map::new();
        attributes.insert("options".to_string(), json!(kind.options()));

        entities.push(EntityState {
            unique_id: format!("{DOMAIN}_{instance}_unit_{}", kind.key()),
            platform: Platform::Select,
            name: kind.label().to_string(),
            keg_id: None,
            state: json!(view.preferences.display_units.current(kind)),
            unit_of_measurement: None,
            icon: None,
            device_class: None,
            state_class: None,
            device: device.clone(),
            attributes,
        });
    }
    entities
}

fn keg_entities(
    instance: &str,
    view: &KegView,
    keg_id: &str,
    record: &KegDisplayRecord,
) -> Vec<EntityState> {
    // ---
    let short_id = short_keg_id(keg_id);
    let device = keg_device(instance, keg_id);
    let units = &view.preferences.display_units;
    let config = view.preferences.keg(keg_id);

    let base = |suffix: &str, platform: Platform, name: String, state: Value| EntityState {
        unique_id: format!("{DOMAIN}_{instance}_{keg_id}_{suffix}"),
        platform,
        name,
        keg_id: Some(keg_id.to_string()),
        state,
        unit_of_measurement: None,
        icon: None,
        device_class: None,
        state_class: None,
        device: device.clone(),
        attributes: Map::new(),
    };

    let mut entities = Vec::new();

    for kind in SensorKind::ALL {
        let (state, unit) = kind.value(record, units);
        let mut entity = base(
            kind.key(),
            Platform::Sensor,
            format!("Keg {short_id} {}", kind.label()),
            state,
        );
        entity.unit_of_measurement = unit;
        entity.icon = Some(kind.icon());
        entity.device_class = kind.device_class();
        entity.state_class = kind.state_class();
        entities.push(entity);
    }

    for kind in NumberKind::ALL {
        let (min, max, step) = kind.limits();
        let mut entity = base(
            kind.key(),
            Platform::Number,
            format!("Keg {keg_id} {}", kind.label()),
            json!(kind.value(view, keg_id, config)),
        );
        entity.unit_of_measurement = Some(kind.unit());
        entity.attributes.insert("min".to_string(), json!(min));
        entity.attributes.insert("max".to_string(), json!(max));
        entity.attributes.insert("step".to_string(), json!(step));
        entity.attributes.insert("mode".to_string(), json!("box"));
        entities.push(entity);
    }

    let mut name_text = base(
        "name",
        Platform::Text,
        format!("Keg {short_id} Name"),
        json!(record.name),
    );
    name_text.attributes.insert("min".to_string(), json!(0));
    name_text.attributes.insert("max".to_string(), json!(64));
    // The text entity shares the "name" suffix with the name sensor.
    name_text.unique_id = format!("{DOMAIN}_{instance}_{keg_id}_name_text");
    entities.push(name_text);

    let kegged = config.and_then(|c| c.kegged_date);
    let expires = config.and_then(|c| c.expires_date);
    entities.push(base(
        "kegged_date",
        Platform::Date,
        format!("Keg {short_id} Kegged Date"),
        json!(kegged),
    ));
    entities.push(base(
        "expires_date",
        Platform::Date,
        format!("Keg {short_id} Expiration Date"),
        json!(expires),
    ));

    entities
}
