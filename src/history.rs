//! Bounded pour history.
//!
//! Entries are appended in detection order and evicted oldest-first once the
//! log exceeds its capacity. The whole log is persisted as one JSON array.

use std::collections::VecDeque;

use serde_json::Value;

use crate::models::PourHistoryEntry;

// ---

#[derive(Debug, Clone)]
pub struct HistoryLog {
    // Stored documents are kept as-is so entries written by other versions
    // survive a reload and the next save.
    entries: VecDeque<Value>,
    max_entries: usize,
}

impl HistoryLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Rebuild the log from a stored document.
    ///
    /// A list is reloaded verbatim (then truncated to capacity); anything
    /// else yields an empty log.
    pub fn from_stored(stored: Option<&Value>, max_entries: usize) -> Self {
        // ---
        let mut log = Self::new(max_entries);

        let Some(items) = stored.and_then(Value::as_array) else {
            if stored.is_some() {
                tracing::warn!("Stored pour history is not a list, starting empty");
            }
            return log;
        };

        let foreign = items.iter().filter(|item| parse_entry(item).is_none()).count();
        if foreign > 0 {
            tracing::debug!("{} stored history items are kept but not displayed", foreign);
        }

        log.entries.extend(items.iter().cloned());
        log.truncate();
        log
    }

    /// Append an entry, evicting the oldest ones when over capacity.
    pub fn append(&mut self, entry: PourHistoryEntry) {
        // ---
        match serde_json::to_value(&entry) {
            Ok(value) => {
                self.entries.push_back(value);
                self.truncate();
            }
            Err(e) => tracing::error!("Failed to encode pour record: {}", e),
        }
    }

    fn truncate(&mut self) {
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    /// Number of stored items, including ones that do not parse as entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Typed entries, oldest first; items that do not parse are left out.
    pub fn entries(&self) -> impl Iterator<Item = PourHistoryEntry> + '_ {
        self.entries.iter().filter_map(parse_entry)
    }

    /// The log as a JSON array, oldest entry first.
    pub fn to_value(&self) -> Value {
        Value::Array(self.entries.iter().cloned().collect())
    }
}

fn parse_entry(value: &Value) -> Option<PourHistoryEntry> {
    serde_json::from_value(value.clone()).ok()
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn create_test_entry(n: u32) -> PourHistoryEntry {
        // ---
        PourHistoryEntry {
            timestamp: NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(12, 0, n % 60)
                .unwrap(),
            keg: format!("keg{}", n),
            pour_oz: n as f64,
            weight_before: 19.0,
            weight_after: 18.5,
            temperature: Some(3.5),
        }
    }

    #[test]
    fn test_fifo_eviction() {
        // ---
        let mut log = HistoryLog::new(3);
        for n in 0..5 {
            log.append(create_test_entry(n));
        }

        assert_eq!(log.len(), 3);
        let kegs: Vec<String> = log.entries().map(|e| e.keg).collect();
        assert_eq!(kegs, vec!["keg2", "keg3", "keg4"]);
    }

    #[test]
    fn test_round_trip_preserves_order() {
        // ---
        let mut log = HistoryLog::new(10);
        for n in 0..4 {
            log.append(create_test_entry(n));
        }

        let stored = log.to_value();
        let restored = HistoryLog::from_stored(Some(&stored), 10);

        let original: Vec<_> = log.entries().collect();
        let reloaded: Vec<_> = restored.entries().collect();
        assert_eq!(original, reloaded);
    }

    #[test]
    fn test_non_list_payload_yields_empty_log() {
        // ---
        assert_eq!(HistoryLog::from_stored(Some(&json!({"entries": []})), 10).len(), 0);
        assert_eq!(HistoryLog::from_stored(Some(&json!("garbage")), 10).len(), 0);
        assert_eq!(HistoryLog::from_stored(None, 10).len(), 0);
    }

    #[test]
    fn test_foreign_items_survive_reload_and_append() {
        // ---
        let valid = serde_json::to_value(create_test_entry(1)).unwrap();
        let foreign = json!({
            "timestamp": "2024-12-24T18:00:00",
            "keg": "old",
            "pour_oz": "twelve",
        });
        let stored = json!([valid, foreign.clone(), 7]);

        let mut log = HistoryLog::from_stored(Some(&stored), 10);
        assert_eq!(log.len(), 3);
        assert_eq!(log.entries().count(), 1);

        log.append(create_test_entry(2));
        let saved = log.to_value();
        let saved = saved.as_array().unwrap();
        assert_eq!(saved.len(), 4);
        assert_eq!(saved[1], foreign);
        assert_eq!(saved[2], json!(7));
        assert_eq!(saved[3]["keg"], "keg2");
    }

    #[test]
    fn test_oversized_stored_list_is_truncated() {
        // ---
        let stored = Value::Array(
            (0..6)
                .map(|n| serde_json::to_value(create_test_entry(n)).unwrap())
                .collect(),
        );

        let log = HistoryLog::from_stored(Some(&stored), 4);
        assert_eq!(log.len(), 4);
        assert_eq!(log.entries().next().unwrap().keg, "keg2");
    }
}
