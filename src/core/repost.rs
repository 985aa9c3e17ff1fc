//! Re-post Timer (C5) — periodically re-emits every active alarm
//! downstream with refreshed timestamps. The sole retry mechanism: there
//! is no per-event retry queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::{debug, warn};

use crate::services::emitter::DownstreamEmitter;

use super::engine::DownstreamEffect;
use super::manager::EngineState;

pub struct RepostTimer {
    state: Arc<Mutex<EngineState>>,
    emitter: Arc<DownstreamEmitter>,
    period: Duration,
}

impl RepostTimer {
    pub fn new(state: Arc<Mutex<EngineState>>, emitter: Arc<DownstreamEmitter>, period: Duration) -> Self {
        Self { state, emitter, period }
    }

    /// Runs until `shutdown` resolves. In-flight POSTs are allowed to
    /// complete up to the HTTP client's own timeout.
    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = interval(self.period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        debug!("re-post timer shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn tick(&self) {
        let snapshot = {
            let guard = self.state.lock().await;
            guard.store.active().to_vec()
        };
        debug!(count = snapshot.len(), "re-post tick");
        for notification in snapshot {
            let effect = DownstreamEffect::Active(notification);
            if let Err(err) = self.emitter.emit(&effect).await {
                warn!(error = %err, "re-post of active alarm failed, next tick will retry");
            }
        }
    }
}
