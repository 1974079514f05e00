//! Pour detection and derived keg metrics.
//!
//! A pour is a drop in measured weight larger than the configured threshold
//! between two consecutive readings of the same keg. Increases (refills, tare,
//! recalibration) are absorbed into the baseline and never count as a pour.

use chrono::{DateTime, Local, Timelike};

use crate::config::KegOptions;
use crate::models::{
    round_to, KegDisplayRecord, KegRuntimeState, NormalizedReading, PourHistoryEntry, KG_TO_OZ,
};

// ---

/// Apply one reading to a keg's running state.
///
/// Returns the history entry when the reading completed a pour. The baseline
/// weight is always moved to the new reading.
pub fn apply_reading(
    state: &mut KegRuntimeState,
    reading: &NormalizedReading,
    options: &KegOptions,
    now: DateTime<Local>,
) -> Option<PourHistoryEntry> {
    // ---
    let prev = state.last_weight;
    let curr = reading.weight;

    state.last_weight = curr;
    state.last_temperature = reading.temperature;
    state.name = reading.name.clone();
    state.weight_calibrate = reading.weight_calibrate;
    state.temperature_calibrate = reading.temperature_calibrate;

    let delta = prev - curr;
    if delta <= options.pour_threshold {
        return None;
    }

    let pour_kg = round_to(delta, 2);
    let pour_oz = round_to(pour_kg * KG_TO_OZ, 1);

    state.last_pour = pour_oz;
    state.last_pour_time = Some(now);
    state.daily_consumed += pour_oz;

    tracing::debug!("Pour {:.1} oz on keg '{}'", pour_oz, reading.keg_id);

    Some(PourHistoryEntry {
        timestamp: now.naive_local().with_nanosecond(0).unwrap_or(now.naive_local()),
        keg: reading.keg_id.clone(),
        pour_oz,
        weight_before: round_to(prev, 2),
        weight_after: round_to(curr, 2),
        temperature: reading.temperature,
    })
}

/// Keg fullness in percent, clamped to `[0, 100]`.
///
/// Zero whenever the full weight does not exceed the empty weight.
pub fn fill_percent(weight: f64, full_weight: f64, empty_weight: f64) -> f64 {
    // ---
    if full_weight <= empty_weight {
        return 0.0;
    }
    let pct = (weight - empty_weight) / (full_weight - empty_weight) * 100.0;
    if pct.is_nan() {
        0.0
    } else {
        pct.clamp(0.0, 100.0)
    }
}

/// Build the observer snapshot for one keg.
///
/// `name_override` is the operator-set name, which wins over the device name.
pub fn display_record(
    keg_id: &str,
    state: &KegRuntimeState,
    options: &KegOptions,
    name_override: Option<&str>,
) -> KegDisplayRecord {
    // ---
    let fill = fill_percent(state.last_weight, state.full_weight, options.empty_weight);

    KegDisplayRecord {
        id: keg_id.to_string(),
        name: name_override.unwrap_or(&state.name).to_string(),
        weight: round_to(state.last_weight, 2),
        temperature: state.last_temperature.map(|t| round_to(t, 1)),
        full_weight: round_to(state.full_weight, 2),
        daily_consumed: round_to(state.daily_consumed, 1),
        last_pour: round_to(state.last_pour, 1),
        last_pour_time: state.last_pour_time,
        fill_percent: round_to(fill, 1),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::RawKegRecord;
    use chrono::TimeZone;
    use serde_json::json;

    fn create_test_state(last_weight: f64) -> KegRuntimeState {
        // ---
        KegRuntimeState {
            name: "k1".to_string(),
            last_weight,
            last_temperature: None,
            daily_consumed: 0.0,
            last_pour: 0.0,
            last_pour_time: None,
            full_weight: 19.0,
            weight_calibrate: 0.0,
            temperature_calibrate: 0.0,
        }
    }

    fn reading_at(weight: f64) -> NormalizedReading {
        RawKegRecord(json!({"id": "k1", "weight": weight, "temperature": 3.44})).to_normalized()
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, 18, 30, 5).unwrap()
    }

    #[test]
    fn test_pour_detected_above_threshold() {
        // ---
        let mut state = create_test_state(19.0);
        let entry = apply_reading(&mut state, &reading_at(18.5), &KegOptions::default(), now())
            .expect("pour expected");

        assert_eq!(entry.pour_oz, 17.6);
        assert_eq!(entry.weight_before, 19.0);
        assert_eq!(entry.weight_after, 18.5);
        assert_eq!(entry.temperature, Some(3.44));
        assert_eq!(entry.keg, "k1");
        assert_eq!(entry.timestamp, now().naive_local());

        assert_eq!(state.last_pour, 17.6);
        assert_eq!(state.daily_consumed, 17.6);
        assert_eq!(state.last_pour_time, Some(now()));
        assert_eq!(state.last_weight, 18.5);
    }

    #[test]
    fn test_small_drop_is_not_a_pour() {
        // ---
        let mut state = create_test_state(19.0);
        let entry = apply_reading(&mut state, &reading_at(18.9), &KegOptions::default(), now());

        assert!(entry.is_none());
        assert_eq!(state.last_pour, 0.0);
        assert_eq!(state.daily_consumed, 0.0);
        assert_eq!(state.last_weight, 18.9);
    }

    #[test]
    fn test_drop_equal_to_threshold_is_not_a_pour() {
        // ---
        let mut options = KegOptions::default();
        options.pour_threshold = 0.5;
        let mut state = create_test_state(19.0);

        assert!(apply_reading(&mut state, &reading_at(18.5), &options, now()).is_none());
    }

    #[test]
    fn test_increase_is_never_a_pour() {
        // ---
        let mut state = create_test_state(19.0);
        state.daily_consumed = 5.0;

        let entry = apply_reading(&mut state, &reading_at(19.5), &KegOptions::default(), now());
        assert!(entry.is_none());
        assert_eq!(state.last_weight, 19.5);
        assert_eq!(state.daily_consumed, 5.0);

        let entry = apply_reading(&mut state, &reading_at(40.0), &KegOptions::default(), now());
        assert!(entry.is_none());
    }

    #[test]
    fn test_consecutive_pours_accumulate() {
        // ---
        let options = KegOptions::default();
        let mut state = create_test_state(19.0);

        apply_reading(&mut state, &reading_at(18.5), &options, now());
        apply_reading(&mut state, &reading_at(18.0), &options, now());

        assert_eq!(state.last_pour, 17.6);
        assert!((state.daily_consumed - 35.2).abs() < 1e-9);
    }

    #[test]
    fn test_fill_percent_bounds() {
        // ---
        assert_eq!(fill_percent(11.5, 19.0, 4.0), 50.0);
        assert_eq!(fill_percent(25.0, 19.0, 4.0), 100.0);
        assert_eq!(fill_percent(2.0, 19.0, 4.0), 0.0);
        assert_eq!(fill_percent(-3.0, 19.0, 4.0), 0.0);

        // Full weight not above empty weight
        assert_eq!(fill_percent(10.0, 4.0, 4.0), 0.0);
        assert_eq!(fill_percent(10.0, 3.0, 4.0), 0.0);
    }

    #[test]
    fn test_display_record_rounding() {
        // ---
        let mut state = create_test_state(12.3456);
        state.last_temperature = Some(3.456);
        state.daily_consumed = 17.64;
        state.last_pour = 8.85;

        let record = display_record("k1", &state, &KegOptions::default(), None);

        assert_eq!(record.weight, 12.35);
        assert_eq!(record.temperature, Some(3.5));
        assert_eq!(record.full_weight, 19.0);
        assert_eq!(record.daily_consumed, 17.6);
        assert_eq!(record.fill_percent, 55.6);
        assert_eq!(record.name, "k1");
    }

    #[test]
    fn test_display_record_name_override() {
        // ---
        let state = create_test_state(10.0);
        let record = display_record("k1", &state, &KegOptions::default(), Some("Stout"));
        assert_eq!(record.name, "Stout");
    }
}
