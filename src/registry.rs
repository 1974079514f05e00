//! In-memory registry of discovered kegs.
//!
//! Kegs are created on first sight and never removed. Iteration is ordered by
//! keg id so sweeps (daily reset, option changes) are deterministic.

use std::collections::BTreeMap;

use crate::config::KegOptions;
use crate::models::{KegRuntimeState, NormalizedReading};

// ---

#[derive(Debug, Default)]
pub struct KegRegistry {
    kegs: BTreeMap<String, KegRuntimeState>,
}

impl KegRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Running state for the reading's keg, created on first sight.
    ///
    /// A new keg resolves its full weight as device-reported, then per-keg
    /// override, then global default. A known keg adopts a newly reported
    /// full weight unless it would not exceed the empty weight.
    pub fn get_or_create(
        &mut self,
        reading: &NormalizedReading,
        options: &KegOptions,
    ) -> &mut KegRuntimeState {
        // ---
        let state = self
            .kegs
            .entry(reading.keg_id.clone())
            .or_insert_with(|| {
                let full_weight = reading
                    .full_weight
                    .unwrap_or_else(|| options.configured_full_weight(&reading.keg_id));
                tracing::info!(
                    "Discovered keg '{}' (full weight {:.2} kg)",
                    reading.keg_id,
                    full_weight
                );

                KegRuntimeState {
                    name: reading.name.clone(),
                    last_weight: reading.weight,
                    last_temperature: reading.temperature,
                    daily_consumed: 0.0,
                    last_pour: 0.0,
                    last_pour_time: None,
                    full_weight,
                    weight_calibrate: reading.weight_calibrate,
                    temperature_calibrate: reading.temperature_calibrate,
                }
            });

        if let Some(reported) = reading.full_weight {
            if reported != state.full_weight {
                if reported > options.empty_weight {
                    tracing::info!(
                        "Keg '{}' full weight recalibrated {:.2} -> {:.2} kg",
                        reading.keg_id,
                        state.full_weight,
                        reported
                    );
                    state.full_weight = reported;
                } else {
                    tracing::debug!(
                        "Ignoring full weight {:.2} kg for keg '{}': not above empty weight",
                        reported,
                        reading.keg_id
                    );
                }
            }
        }

        state
    }

    pub fn get(&self, keg_id: &str) -> Option<&KegRuntimeState> {
        self.kegs.get(keg_id)
    }

    pub fn get_mut(&mut self, keg_id: &str) -> Option<&mut KegRuntimeState> {
        self.kegs.get_mut(keg_id)
    }

    pub fn keg_ids(&self) -> Vec<String> {
        self.kegs.keys().cloned().collect()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut KegRuntimeState)> {
        self.kegs.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.kegs.len()
    }
}
