//! Single-writer coordinator for one integration instance.
//!
//! The coordinator task exclusively owns the keg registry, the pour history,
//! the preferences and the live options. Data sources and HTTP handlers talk
//! to it through a [`CoordinatorHandle`], which only enqueues [`Command`]s;
//! readers see the derived [`KegView`] that the coordinator republishes after
//! every mutation.
//!
//! Commands are applied in queue order. Readings from the stream and the poll
//! are not sequenced against each other, so a pour straddling two near
//! simultaneous reports from different sources may be split or absorbed.

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc, oneshot, RwLock},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::config::KegOptions;
use crate::export;
use crate::history::HistoryLog;
use crate::models::{KegDisplayRecord, PourHistoryEntry, RawKegRecord};
use crate::pour;
use crate::preferences::{KegConfigUpdate, PreferenceError, Preferences, UnitKind};
use crate::publisher::{IntegrationEvent, Notification, UpdatePublisher};
use crate::registry::KegRegistry;
use crate::store::{KvStore, HISTORY_KEY, PREFS_KEY};

// ---

const COMMAND_QUEUE: usize = 64;

#[derive(Debug, Error, PartialEq)]
pub enum CoordinatorError {
    #[error("keg coordinator is not running")]
    Stopped,

    #[error(transparent)]
    Preference(#[from] PreferenceError),

    #[error("history export failed: {0}")]
    Export(String),
}

/// Where a batch of records came from; used for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Discovery,
    Stream,
    Poll,
    Refresh,
}

/// Latest device-reported calibration offsets of one keg.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Calibration {
    pub weight: f64,
    pub temperature: f64,
}

/// Read-only state published for observers.
#[derive(Debug, Clone, Default)]
pub struct KegView {
    pub kegs: BTreeMap<String, KegDisplayRecord>,
    pub calibration: BTreeMap<String, Calibration>,
    pub preferences: Preferences,
    pub options: KegOptions,
    pub selected_device: Option<String>,
    pub history: Vec<PourHistoryEntry>,
}

pub enum Command {
    Readings {
        source: Source,
        records: Vec<RawKegRecord>,
        done: Option<oneshot::Sender<usize>>,
    },
    DailyReset,
    SetOptions {
        options: KegOptions,
        done: oneshot::Sender<()>,
    },
    SetDisplayUnit {
        kind: UnitKind,
        option: String,
        reply: oneshot::Sender<Result<(), CoordinatorError>>,
    },
    UpdateKegConfig {
        keg_id: String,
        update: KegConfigUpdate,
        reply: oneshot::Sender<Result<(), CoordinatorError>>,
    },
    SelectDevice {
        keg_id: String,
        reply: oneshot::Sender<Result<(), CoordinatorError>>,
    },
    ExportHistory {
        reply: oneshot::Sender<Result<PathBuf, CoordinatorError>>,
    },
    Shutdown {
        done: oneshot::Sender<()>,
    },
}

/// Cloneable handle used by data sources and routes.
#[derive(Clone)]
pub struct CoordinatorHandle {
    instance_id: Uuid,
    commands: mpsc::Sender<Command>,
    view: Arc<RwLock<KegView>>,
    publisher: UpdatePublisher,
}

impl CoordinatorHandle {
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn publisher(&self) -> &UpdatePublisher {
        &self.publisher
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IntegrationEvent> {
        self.publisher.subscribe()
    }

    /// Snapshot of the published view.
    pub async fn view(&self) -> KegView {
        self.view.read().await.clone()
    }

    pub async fn display(&self, keg_id: &str) -> Option<KegDisplayRecord> {
        self.view.read().await.kegs.get(keg_id).cloned()
    }

    async fn send(&self, command: Command) -> Result<(), CoordinatorError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CoordinatorError::Stopped)
    }

    /// Enqueue records without waiting for them to be applied.
    pub async fn submit(&self, source: Source, records: Vec<RawKegRecord>) -> Result<(), CoordinatorError> {
        self.send(Command::Readings {
            source,
            records,
            done: None,
        })
        .await
    }

    /// Enqueue records and wait until all of them were applied.
    pub async fn process(&self, source: Source, records: Vec<RawKegRecord>) -> Result<usize, CoordinatorError> {
        // ---
        let (tx, rx) = oneshot::channel();
        self.send(Command::Readings {
            source,
            records,
            done: Some(tx),
        })
        .await?;
        rx.await.map_err(|_| CoordinatorError::Stopped)
    }

    pub async fn daily_reset(&self) -> Result<(), CoordinatorError> {
        self.send(Command::DailyReset).await
    }

    pub async fn set_options(&self, options: KegOptions) -> Result<(), CoordinatorError> {
        let (done, rx) = oneshot::channel();
        self.send(Command::SetOptions { options, done }).await?;
        rx.await.map_err(|_| CoordinatorError::Stopped)
    }

    pub async fn set_display_unit(&self, kind: UnitKind, option: String) -> Result<(), CoordinatorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SetDisplayUnit { kind, option, reply }).await?;
        rx.await.map_err(|_| CoordinatorError::Stopped)?
    }

    pub async fn update_keg_config(
        &self,
        keg_id: String,
        update: KegConfigUpdate,
    ) -> Result<(), CoordinatorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::UpdateKegConfig {
            keg_id,
            update,
            reply,
        })
        .await?;
        rx.await.map_err(|_| CoordinatorError::Stopped)?
    }

    pub async fn select_device(&self, keg_id: String) -> Result<(), CoordinatorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SelectDevice { keg_id, reply }).await?;
        rx.await.map_err(|_| CoordinatorError::Stopped)?
    }

    pub async fn export_history(&self) -> Result<PathBuf, CoordinatorError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ExportHistory { reply }).await?;
        rx.await.map_err(|_| CoordinatorError::Stopped)?
    }

    /// Ask the coordinator to flush and stop; waits for the flush.
    pub async fn shutdown(&self) {
        let (done, rx) = oneshot::channel();
        if self.send(Command::Shutdown { done }).await.is_ok() {
            let _ = rx.await;
        }
    }
}

pub struct KegCoordinator {
    instance_id: Uuid,
    options: KegOptions,
    registry: KegRegistry,
    history: HistoryLog,
    preferences: Preferences,
    selected_device: Option<String>,
    store: Arc<dyn KvStore>,
    publisher: UpdatePublisher,
    view: Arc<RwLock<KegView>>,
    static_dir: PathBuf,
}

impl KegCoordinator {
    /// Build a coordinator, restoring history and preferences from `store`.
    ///
    /// Storage read failures are logged and leave the affected part empty.
    pub async fn load(
        store: Arc<dyn KvStore>,
        options: KegOptions,
        history_max: usize,
        static_dir: PathBuf,
    ) -> Self {
        // ---
        let stored_history = store.load(HISTORY_KEY).await.unwrap_or_else(|e| {
            tracing::error!("Failed to load pour history: {:#}", e);
            None
        });
        let history = HistoryLog::from_stored(stored_history.as_ref(), history_max);
        tracing::info!(
            "Loaded {} pour records (keeping at most {})",
            history.len(),
            history.max_entries()
        );

        let stored_prefs = store.load(PREFS_KEY).await.unwrap_or_else(|e| {
            tracing::error!("Failed to load preferences: {:#}", e);
            None
        });
        let preferences = Preferences::from_stored(stored_prefs.as_ref());

        let view = KegView {
            preferences: preferences.clone(),
            options: options.clone(),
            history: history.entries().collect(),
            ..Default::default()
        };

        Self {
            instance_id: Uuid::new_v4(),
            options,
            registry: KegRegistry::new(),
            history,
            preferences,
            selected_device: None,
            store,
            publisher: UpdatePublisher::new(),
            view: Arc::new(RwLock::new(view)),
            static_dir,
        }
    }

    /// Start the coordinator task.
    pub fn spawn(self) -> (CoordinatorHandle, JoinHandle<()>) {
        // ---
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        let handle = CoordinatorHandle {
            instance_id: self.instance_id,
            commands: tx,
            view: self.view.clone(),
            publisher: self.publisher.clone(),
        };
        let task = tokio::spawn(self.run(rx));
        (handle, task)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        // ---
        while let Some(command) = commands.recv().await {
            if let Command::Shutdown { done } = command {
                commands.close();
                self.flush_history().await;
                let _ = done.send(());
                tracing::info!("Keg coordinator stopped");
                return;
            }
            self.handle(command).await;
        }

        // Every handle dropped
        self.flush_history().await;
    }

    async fn handle(&mut self, command: Command) {
        // ---
        match command {
            Command::Readings {
                source,
                records,
                done,
            } => {
                tracing::debug!("Processing {} records from {:?}", records.len(), source);
                let count = records.len();
                for record in &records {
                    self.process_record(record, Local::now()).await;
                }
                if let Some(done) = done {
                    let _ = done.send(count);
                }
            }
            Command::DailyReset => self.daily_reset().await,
            Command::SetOptions { options, done } => {
                self.set_options(options).await;
                let _ = done.send(());
            }
            Command::SetDisplayUnit {
                kind,
                option,
                reply,
            } => {
                let _ = reply.send(self.set_display_unit(kind, &option).await);
            }
            Command::UpdateKegConfig {
                keg_id,
                update,
                reply,
            } => {
                let _ = reply.send(self.update_keg_config(&keg_id, update).await);
            }
            Command::SelectDevice { keg_id, reply } => {
                let _ = reply.send(self.select_device(keg_id).await);
            }
            Command::ExportHistory { reply } => {
                let _ = reply.send(self.export_history().await);
            }
            Command::Shutdown { done } => {
                // Handled by `run`
                let _ = done.send(());
            }
        }
    }

    /// Normalize one record and run it through the pour detector.
    async fn process_record(&mut self, record: &RawKegRecord, now: DateTime<Local>) {
        // ---
        let reading = record.to_normalized();
        let is_new = self.registry.get(&reading.keg_id).is_none();
        let operator_full = self
            .preferences
            .keg(&reading.keg_id)
            .and_then(|cfg| cfg.full_weight);

        let state = self.registry.get_or_create(&reading, &self.options);
        if is_new && reading.full_weight.is_none() {
            if let Some(full) = operator_full {
                state.full_weight = full;
            }
        }

        if let Some(entry) = pour::apply_reading(state, &reading, &self.options, now) {
            self.history.append(entry);
            self.save_history().await;
            self.view.write().await.history = self.history.entries().collect();
        }

        self.refresh_keg(&reading.keg_id).await;
    }

    async fn daily_reset(&mut self) {
        // ---
        for (_, state) in self.registry.iter_mut() {
            state.daily_consumed = 0.0;
        }
        for keg_id in self.registry.keg_ids() {
            self.refresh_keg(&keg_id).await;
        }
        tracing::info!("Daily reset complete for {} kegs", self.registry.len());
    }

    async fn set_options(&mut self, options: KegOptions) {
        // ---
        tracing::info!(
            "Options updated: empty {} kg, default full {} kg, threshold {} kg",
            options.empty_weight,
            options.default_full_weight,
            options.pour_threshold
        );
        self.options = options;
        self.view.write().await.options = self.options.clone();
        self.refresh_all().await;
    }

    async fn set_display_unit(&mut self, kind: UnitKind, option: &str) -> Result<(), CoordinatorError> {
        // ---
        if let Err(e) = self.preferences.display_units.select(kind, option) {
            tracing::warn!("{}", e);
            return Err(e.into());
        }
        self.save_preferences().await;
        self.refresh_all().await;
        Ok(())
    }

    async fn update_keg_config(
        &mut self,
        keg_id: &str,
        update: KegConfigUpdate,
    ) -> Result<(), CoordinatorError> {
        // ---
        if self.registry.get(keg_id).is_none() {
            return Err(PreferenceError::UnknownKeg(keg_id.to_string()).into());
        }
        update.validate(self.options.empty_weight)?;

        // Clearing the operator value falls back to the per-keg override or default
        let new_full = update
            .full_weight
            .map(|full| full.unwrap_or_else(|| self.options.configured_full_weight(keg_id)));
        self.preferences
            .keg_config
            .entry(keg_id.to_string())
            .or_default()
            .apply(update);

        if let (Some(full), Some(state)) = (new_full, self.registry.get_mut(keg_id)) {
            state.full_weight = full;
        }

        self.save_preferences().await;
        self.refresh_keg(keg_id).await;
        Ok(())
    }

    async fn select_device(&mut self, keg_id: String) -> Result<(), CoordinatorError> {
        // ---
        if self.registry.get(&keg_id).is_none() {
            tracing::warn!("Attempt to select unknown keg device: {}", keg_id);
            return Err(PreferenceError::UnknownKeg(keg_id).into());
        }
        self.selected_device = Some(keg_id);
        self.view.write().await.selected_device = self.selected_device.clone();
        Ok(())
    }

    async fn export_history(&mut self) -> Result<PathBuf, CoordinatorError> {
        // ---
        let path = export::write_history(&self.static_dir, &self.history)
            .await
            .map_err(|e| CoordinatorError::Export(format!("{:#}", e)))?;

        self.publisher.notify(Notification {
            title: "Beer Keg Export".to_string(),
            message: format!(
                "Beer Keg history exported.<br><a href=\"{}\" target=\"_blank\">Open</a>",
                export::EXPORT_URL
            ),
        });
        Ok(path)
    }

    /// Rebuild the display record of one keg and notify observers.
    async fn refresh_keg(&self, keg_id: &str) {
        // ---
        let Some(state) = self.registry.get(keg_id) else {
            return;
        };
        let record = pour::display_record(
            keg_id,
            state,
            &self.options,
            self.preferences.name_override(keg_id),
        );
        let calibration = Calibration {
            weight: state.weight_calibrate,
            temperature: state.temperature_calibrate,
        };

        {
            let mut view = self.view.write().await;
            view.kegs.insert(keg_id.to_string(), record);
            view.calibration.insert(keg_id.to_string(), calibration);
            view.preferences = self.preferences.clone();
        }
        self.publisher.keg_updated(keg_id);
    }

    async fn refresh_all(&self) {
        for keg_id in self.registry.keg_ids() {
            self.refresh_keg(&keg_id).await;
        }
        // Preferences must reach the view even before any keg is known
        self.view.write().await.preferences = self.preferences.clone();
    }

    async fn save_history(&self) {
        if let Err(e) = self.store.save(HISTORY_KEY, &self.history.to_value()).await {
            tracing::error!("Failed to persist pour history: {:#}", e);
        }
    }

    async fn flush_history(&self) {
        self.save_history().await;
        tracing::info!("Flushed {} pour records", self.history.len());
    }

    async fn save_preferences(&self) {
        if let Err(e) = self.store.save(PREFS_KEY, &self.preferences.to_value()).await {
            tracing::error!("Failed to persist preferences: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::{json, Value};

    async fn create_test_coordinator(store: MemoryStore, history_max: usize) -> CoordinatorHandle {
        // ---
        let coordinator = KegCoordinator::load(
            Arc::new(store),
            KegOptions::default(),
            history_max,
            std::env::temp_dir(),
        )
        .await;
        coordinator.spawn().0
    }

    fn keg(id: &str, weight: f64) -> RawKegRecord {
        RawKegRecord(json!({"id": id, "weight": weight, "temperature": 3.0}))
    }

    async fn feed(handle: &CoordinatorHandle, records: Vec<RawKegRecord>) {
        handle.process(Source::Stream, records).await.unwrap();
    }

    #[tokio::test]
    async fn test_pour_updates_view_and_history() {
        // ---
        let store = MemoryStore::new();
        let handle = create_test_coordinator(store.clone(), 500).await;

        feed(&handle, vec![keg("K1", 19.0)]).await;
        feed(&handle, vec![keg("K1", 18.5)]).await;

        let record = handle.display("k1").await.unwrap();
        assert_eq!(record.last_pour, 17.6);
        assert_eq!(record.daily_consumed, 17.6);
        assert_eq!(record.weight, 18.5);
        assert_eq!(record.fill_percent, 96.7);

        let stored = store.load(HISTORY_KEY).await.unwrap().unwrap();
        assert_eq!(stored.as_array().unwrap().len(), 1);
        assert_eq!(stored[0]["keg"], "k1");
        assert_eq!(stored[0]["pour_oz"], 17.6);
        assert_eq!(handle.view().await.history.len(), 1);
    }

    #[tokio::test]
    async fn test_no_pour_below_threshold_or_on_increase() {
        // ---
        let store = MemoryStore::new();
        let handle = create_test_coordinator(store.clone(), 500).await;

        feed(&handle, vec![keg("k1", 19.0), keg("k1", 18.9), keg("k1", 19.5)]).await;

        let record = handle.display("k1").await.unwrap();
        assert_eq!(record.weight, 19.5);
        assert_eq!(record.daily_consumed, 0.0);
        assert_eq!(store.load(HISTORY_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_published_per_reading() {
        // ---
        let handle = create_test_coordinator(MemoryStore::new(), 500).await;
        let mut rx = handle.subscribe();

        feed(&handle, vec![keg("k1", 19.0), keg("k2", 10.0)]).await;

        let mut seen = Vec::new();
        while let Ok(IntegrationEvent::KegUpdated { keg_id }) = rx.try_recv() {
            seen.push(keg_id);
        }
        assert_eq!(seen, vec!["k1", "k2"]);
    }

    #[tokio::test]
    async fn test_history_capacity_is_enforced() {
        // ---
        let store = MemoryStore::new();
        let handle = create_test_coordinator(store.clone(), 2).await;

        let weights = [19.0, 18.0, 17.0, 16.0];
        feed(&handle, weights.iter().map(|w| keg("k1", *w)).collect()).await;

        let stored = store.load(HISTORY_KEY).await.unwrap().unwrap();
        let entries = stored.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["weight_before"], 18.0);
        assert_eq!(entries[1]["weight_before"], 17.0);
    }

    #[tokio::test]
    async fn test_daily_reset_zeroes_every_keg() {
        // ---
        let handle = create_test_coordinator(MemoryStore::new(), 500).await;
        feed(&handle, vec![keg("k1", 19.0), keg("k1", 18.0), keg("k2", 12.0), keg("k2", 11.0)]).await;
        assert!(handle.display("k1").await.unwrap().daily_consumed > 0.0);

        let mut rx = handle.subscribe();
        handle.daily_reset().await.unwrap();
        // Barrier: the reset is applied before this empty batch completes
        feed(&handle, vec![]).await;

        let view = handle.view().await;
        assert!(view.kegs.values().all(|r| r.daily_consumed == 0.0));
        // Last pour is kept
        assert_eq!(view.kegs["k1"].last_pour, 35.3);

        let mut updated = Vec::new();
        while let Ok(IntegrationEvent::KegUpdated { keg_id }) = rx.try_recv() {
            updated.push(keg_id);
        }
        assert_eq!(updated, vec!["k1", "k2"]);
    }

    #[tokio::test]
    async fn test_history_restored_from_store() {
        // ---
        let store = MemoryStore::new();
        let entry = json!({
            "timestamp": "2025-06-01 18:30:05",
            "keg": "k1",
            "pour_oz": 12.0,
            "weight_before": 10.0,
            "weight_after": 9.66,
            "temperature": null,
        });
        store.insert(HISTORY_KEY, json!([entry.clone(), entry])).await;

        let handle = create_test_coordinator(store, 500).await;
        assert_eq!(handle.view().await.history.len(), 2);
    }

    #[tokio::test]
    async fn test_unparsed_history_items_are_saved_back() {
        // ---
        let store = MemoryStore::new();
        let legacy = json!({"timestamp": "2024-12-24T18:00:00", "keg": "old", "pour_oz": "n/a"});
        store.insert(HISTORY_KEY, json!([legacy.clone()])).await;

        let handle = create_test_coordinator(store.clone(), 500).await;
        assert!(handle.view().await.history.is_empty());

        feed(&handle, vec![keg("k1", 19.0), keg("k1", 18.0)]).await;

        let stored = store.load(HISTORY_KEY).await.unwrap().unwrap();
        let items = stored.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], legacy);
        assert_eq!(items[1]["keg"], "k1");
        assert_eq!(handle.view().await.history.len(), 1);
    }

    #[tokio::test]
    async fn test_foreign_history_payload_is_discarded() {
        // ---
        let store = MemoryStore::new();
        store.insert(HISTORY_KEY, json!({"not": "a list"})).await;

        let handle = create_test_coordinator(store, 500).await;
        assert!(handle.view().await.history.is_empty());
    }

    #[tokio::test]
    async fn test_options_change_recomputes_fill() {
        // ---
        let handle = create_test_coordinator(MemoryStore::new(), 500).await;
        feed(&handle, vec![keg("k1", 11.5)]).await;
        assert_eq!(handle.display("k1").await.unwrap().fill_percent, 50.0);

        let mut options = KegOptions::default();
        options.empty_weight = 19.0;
        handle.set_options(options).await.unwrap();

        assert_eq!(handle.display("k1").await.unwrap().fill_percent, 0.0);
        assert_eq!(handle.view().await.options.empty_weight, 19.0);
    }

    #[tokio::test]
    async fn test_keg_config_updates_full_weight_and_name() {
        // ---
        let store = MemoryStore::new();
        let handle = create_test_coordinator(store.clone(), 500).await;
        feed(&handle, vec![keg("k1", 11.5)]).await;

        let update: KegConfigUpdate =
            serde_json::from_value(json!({"full_weight": 34.0, "name": "Porter"})).unwrap();
        handle.update_keg_config("k1".to_string(), update).await.unwrap();

        let record = handle.display("k1").await.unwrap();
        assert_eq!(record.full_weight, 34.0);
        assert_eq!(record.name, "Porter");

        let prefs: Value = store.load(PREFS_KEY).await.unwrap().unwrap();
        assert_eq!(prefs["keg_config"]["k1"]["name"], "Porter");
    }

    #[tokio::test]
    async fn test_clearing_full_weight_restores_configured_value() {
        // ---
        let handle = create_test_coordinator(MemoryStore::new(), 500).await;
        feed(&handle, vec![keg("k1", 11.5)]).await;

        let set: KegConfigUpdate = serde_json::from_value(json!({"full_weight": 34.0})).unwrap();
        handle.update_keg_config("k1".to_string(), set).await.unwrap();
        assert_eq!(handle.display("k1").await.unwrap().full_weight, 34.0);

        let clear: KegConfigUpdate = serde_json::from_value(json!({"full_weight": null})).unwrap();
        handle.update_keg_config("k1".to_string(), clear).await.unwrap();

        let view = handle.view().await;
        assert_eq!(view.kegs["k1"].full_weight, 19.0);
        assert_eq!(view.preferences.keg("k1").unwrap().full_weight, None);
    }

    #[tokio::test]
    async fn test_keg_config_for_unknown_keg_is_rejected() {
        // ---
        let handle = create_test_coordinator(MemoryStore::new(), 500).await;
        let result = handle
            .update_keg_config("ghost".to_string(), KegConfigUpdate::default())
            .await;

        assert_eq!(
            result,
            Err(CoordinatorError::Preference(PreferenceError::UnknownKeg(
                "ghost".to_string()
            )))
        );
    }

    #[tokio::test]
    async fn test_display_unit_change_is_persisted() {
        // ---
        let store = MemoryStore::new();
        let handle = create_test_coordinator(store.clone(), 500).await;

        handle
            .set_display_unit(UnitKind::Weight, "lb".to_string())
            .await
            .unwrap();
        let prefs = store.load(PREFS_KEY).await.unwrap().unwrap();
        assert_eq!(prefs["display_units"]["weight"], "lb");

        let err = handle
            .set_display_unit(UnitKind::Weight, "stone".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::Preference(_)));
    }

    #[tokio::test]
    async fn test_shutdown_flushes_history() {
        // ---
        let store = MemoryStore::new();
        let handle = create_test_coordinator(store.clone(), 500).await;

        handle.shutdown().await;

        assert_eq!(store.load(HISTORY_KEY).await.unwrap(), Some(json!([])));
        assert_eq!(handle.daily_reset().await, Err(CoordinatorError::Stopped));
    }
}
