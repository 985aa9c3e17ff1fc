//! Top-level orchestrator wiring C1-C6 together: the locked engine state,
//! the re-post timer task, and the operations the admin HTTP surface and
//! bus ingest call into.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::AlarmManagerConfig;
use crate::definitions::{DefinitionRegistry, UpsertReport};
use crate::model::{Alarm, AlarmDefinition, AlarmMessage, AlarmNotification};
use crate::services::DownstreamEmitter;
use crate::Result;

use super::engine::{Clock, DownstreamEffect, StateEngine, SystemClock};
use super::repost::RepostTimer;
use super::store::AlarmStore;

/// Everything guarded by the single store lock: the active/history lists,
/// the overflow flags, the id counter, and the definition registry. A
/// finer-grained lock per field would also preserve a consistent snapshot
/// per message, but one mutex keeps that guarantee trivial to reason about.
pub struct EngineState {
    pub store: AlarmStore,
    pub definitions: DefinitionRegistry,
}

#[derive(Debug, Clone)]
pub enum AlarmManagerEvent {
    Started,
    Stopped,
    DownstreamError { detail: String },
}

pub struct AlarmManager {
    state: Arc<Mutex<EngineState>>,
    clock: Arc<dyn Clock>,
    emitter: Arc<DownstreamEmitter>,
    repost_period: Duration,
    event_tx: mpsc::UnboundedSender<AlarmManagerEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<AlarmManagerEvent>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl AlarmManager {
    pub fn new(config: &AlarmManagerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &AlarmManagerConfig, clock: Arc<dyn Clock>) -> Self {
        let store = AlarmStore::new(config.controls.max_active_alarms, config.controls.max_alarm_history);
        let definitions = DefinitionRegistry::new();
        let emitter = Arc::new(DownstreamEmitter::new(
            &config.controls.prom_alert_manager,
            &config.controls.noma,
        ));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            state: Arc::new(Mutex::new(EngineState { store, definitions })),
            clock,
            emitter,
            repost_period: Duration::from_millis(config.controls.prom_alert_manager.alert_interval),
            event_tx,
            event_rx: Some(event_rx),
            shutdown_tx,
            shutdown_rx,
            tasks: Vec::new(),
        }
    }

    pub fn events(&mut self) -> Option<mpsc::UnboundedReceiver<AlarmManagerEvent>> {
        self.event_rx.take()
    }

    /// Loads the initial definition set from `DEF_FILE`.
    pub async fn load_definitions<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let mut guard = self.state.lock().await;
        guard.definitions.load(path)
    }

    /// Spawns the re-post timer (C5). Idempotent to call once at startup.
    pub fn start(&mut self) {
        let timer = RepostTimer::new(self.state.clone(), self.emitter.clone(), self.repost_period);
        let shutdown_rx = self.shutdown_rx.clone();
        self.tasks.push(tokio::spawn(timer.run(shutdown_rx)));
        let _ = self.event_tx.send(AlarmManagerEvent::Started);
        info!("alarm manager started");
    }

    /// Signals background tasks to stop and awaits them. Shutdown drops
    /// the in-memory state; there is no graceful drain.
    pub async fn stop(&mut self) {
        self.request_shutdown();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        let _ = self.event_tx.send(AlarmManagerEvent::Stopped);
        info!("alarm manager stopped");
    }

    /// Signals the re-post timer to stop, without requiring exclusive
    /// access. Used by callers that only hold a shared `Arc<AlarmManager>`.
    pub fn request_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// The single entry point for both bus ingest and the admin HTTP
    /// raise/clear routes. Holds the lock for the decision only; downstream
    /// POSTs happen after release.
    pub async fn handle_message(&self, message: AlarmMessage) {
        let (effects, active_len, history_len) = {
            let mut guard = self.state.lock().await;
            let EngineState { store, definitions } = &mut *guard;
            let effects = StateEngine::process(store, definitions, self.clock.as_ref(), message);
            (effects, store.active().len(), store.history().len())
        };
        crate::metrics::ACTIVE_ALARMS.set(active_len as i64);
        crate::metrics::HISTORY_ALARMS.set(history_len as i64);
        self.emit_all(effects).await;
    }

    async fn emit_all(&self, effects: Vec<DownstreamEffect>) {
        for effect in &effects {
            match effect {
                DownstreamEffect::Active(_) => crate::metrics::ALARMS_RAISED_TOTAL.inc(),
                DownstreamEffect::Resolved(_) => crate::metrics::ALARMS_CLEARED_TOTAL.inc(),
            }
        }
        for effect in effects {
            if let Err(err) = self.emitter.emit(&effect).await {
                crate::metrics::DOWNSTREAM_POST_FAILURES_TOTAL.inc();
                error!(error = %err, "downstream emission failed, relying on re-post timer");
                let _ = self.event_tx.send(AlarmManagerEvent::DownstreamError { detail: err.to_string() });
            }
        }
    }

    pub async fn active_alarms(&self) -> Vec<AlarmNotification> {
        self.state.lock().await.store.active().to_vec()
    }

    pub async fn alarm_history(&self) -> Vec<AlarmNotification> {
        self.state.lock().await.store.history().to_vec()
    }

    pub async fn capacities(&self) -> (usize, usize) {
        let guard = self.state.lock().await;
        (guard.store.max_active_alarms(), guard.store.max_alarm_history())
    }

    pub async fn set_capacities(&self, max_active_alarms: usize, max_alarm_history: usize) {
        let mut guard = self.state.lock().await;
        guard.store.set_capacities(max_active_alarms, max_alarm_history);
    }

    pub async fn define(&self, defs: Vec<AlarmDefinition>) -> UpsertReport {
        let mut guard = self.state.lock().await;
        guard.definitions.upsert(defs)
    }

    pub async fn get_definition(&self, alarm_id: i32) -> Option<AlarmDefinition> {
        let guard = self.state.lock().await;
        guard.definitions.get(alarm_id).cloned()
    }

    pub async fn list_definitions(&self) -> Vec<AlarmDefinition> {
        self.state.lock().await.definitions.list()
    }

    pub async fn delete_definition(&self, alarm_id: i32) -> Result<()> {
        let mut guard = self.state.lock().await;
        guard.definitions.delete(alarm_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, Severity};

    fn message(sp: i32, action: Action) -> AlarmMessage {
        AlarmMessage {
            alarm: Alarm {
                managed_object_id: "pod".to_string(),
                application_id: "app".to_string(),
                specific_problem: sp,
                perceived_severity: Severity::Major,
                additional_info: String::new(),
                identifying_info: "eth0".to_string(),
            },
            action,
            alarm_time: 0,
        }
    }

    #[tokio::test]
    async fn handle_message_admits_a_known_alarm() {
        let config = AlarmManagerConfig::default_config();
        let manager = AlarmManager::new(&config);
        manager.define(vec![AlarmDefinition {
            alarm_id: 8004,
            alarm_text: "text".to_string(),
            event_type: "Equipment".to_string(),
            operation_instructions: String::new(),
            raise_delay: 0,
            clear_delay: 0,
            time_to_live: 0,
        }]).await;
        manager.handle_message(message(8004, Action::Raise)).await;
        assert_eq!(manager.active_alarms().await.len(), 1);
    }

    #[tokio::test]
    async fn handle_message_drops_unknown_definition() {
        let config = AlarmManagerConfig::default_config();
        let manager = AlarmManager::new(&config);
        manager.handle_message(message(9999, Action::Raise)).await;
        assert!(manager.active_alarms().await.is_empty());
    }
}
