//! Bus ingest decoder. The real message-bus transport and wire framing are
//! out of scope here; this models the decoded side of it as a channel of
//! `(message_type, payload)` pairs and a single sequential consumer task,
//! matching the "one bus-ingest handler processing decoded messages
//! sequentially" thread in the concurrency model.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::core::AlarmManager;
use crate::model::RawAlarmMessage;

/// Alarm update.
pub const RIC_ALARM_UPDATE: i32 = 13111;
/// Alarm query, reserved — no handler acts on it yet.
pub const RIC_ALARM_QUERY: i32 = 13112;

pub struct BusMessage {
    pub message_type: i32,
    pub payload: Vec<u8>,
}

/// Drains `rx` sequentially, decoding each payload and handing it to
/// `manager`. Runs until the channel's sender side is dropped.
pub async fn run(manager: Arc<AlarmManager>, mut rx: mpsc::Receiver<BusMessage>) {
    while let Some(msg) = rx.recv().await {
        match msg.message_type {
            RIC_ALARM_UPDATE => handle_alarm_update(&manager, &msg.payload).await,
            RIC_ALARM_QUERY => info!("alarm query message received, no handler registered"),
            other => warn!(message_type = other, "unknown bus message type, discarding"),
        }
    }
}

async fn handle_alarm_update(manager: &Arc<AlarmManager>, payload: &[u8]) {
    let raw: RawAlarmMessage = match serde_json::from_slice(payload) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(error = %err, "malformed alarm payload on bus, dropping");
            crate::metrics::ALARMS_DROPPED_TOTAL.inc();
            return;
        }
    };
    match raw.into_message() {
        Ok(message) => manager.handle_message(message).await,
        Err(_) => {
            warn!("bus alarm message missing mandatory fields, dropping");
            crate::metrics::ALARMS_DROPPED_TOTAL.inc();
        }
    }
}
