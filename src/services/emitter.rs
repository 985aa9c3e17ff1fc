//! Downstream Emitter (C6) — translates an alarm state change into a
//! labels/annotations pair and POSTs it to the Alert Manager, with an
//! optional secondary POST to a notification manager.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::{NomaConfig, PromAlertManagerConfig};
use crate::core::DownstreamEffect;
use crate::model::{AlarmNotification, Severity};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStatus {
    Active,
    Resolved,
}

impl AlertStatus {
    fn as_str(self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Resolved => "resolved",
        }
    }
}

#[derive(Debug, Serialize)]
struct PostableAlert {
    labels: serde_json::Value,
    annotations: serde_json::Value,
}

pub struct DownstreamEmitter {
    client: reqwest::Client,
    alertmanager_url: String,
    noma: NomaConfig,
}

impl DownstreamEmitter {
    pub fn new(prom: &PromAlertManagerConfig, noma: &NomaConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client configuration is valid");
        let alertmanager_url = format!("{}://{}{}/alerts", prom.schemes, prom.address, prom.base_url);
        Self {
            client,
            alertmanager_url,
            noma: noma.clone(),
        }
    }

    pub async fn emit(&self, effect: &DownstreamEffect) -> Result<()> {
        let (notification, status) = match effect {
            DownstreamEffect::Active(n) => (n, AlertStatus::Active),
            DownstreamEffect::Resolved(n) => (n, AlertStatus::Resolved),
        };
        self.post_alert(notification, status).await?;
        if self.noma.enabled {
            self.post_noma(notification, status).await?;
        }
        Ok(())
    }

    async fn post_alert(&self, notification: &AlarmNotification, status: AlertStatus) -> Result<()> {
        let alarm = &notification.message.alarm;
        let labels = json!({
            "status": status.as_str(),
            "alertname": notification.alarm_text,
            "severity": alarm.perceived_severity.as_str(),
            "service": format!("{}/{}", alarm.managed_object_id, alarm.application_id),
            "system_name": "RIC",
        });
        let annotations = json!({
            "alarm_id": notification.alarm_id,
            "specific_problem": alarm.specific_problem,
            "event_type": notification.event_type,
            "identifying_info": alarm.identifying_info,
            "additional_info": alarm.additional_info,
            "description": format!("{}:{}", alarm.identifying_info, alarm.additional_info),
            "instructions": notification.operation_instructions,
            "timestamp": format_timestamp(notification.message.alarm_time),
        });
        let payload = vec![PostableAlert { labels, annotations }];

        debug!(url = %self.alertmanager_url, status = status.as_str(), "posting alert");
        let response = self.client.post(&self.alertmanager_url).json(&payload).send().await?;
        if !response.status().is_success() {
            warn!(status = %response.status(), "alert manager rejected the post");
        }
        Ok(())
    }

    async fn post_noma(&self, notification: &AlarmNotification, status: AlertStatus) -> Result<()> {
        let mut body = notification.clone();
        if status == AlertStatus::Resolved {
            body.message.alarm.perceived_severity = Severity::Cleared;
        }
        let url = format!("{}{}", self.noma.host, self.noma.alarm_url);
        debug!(url = %url, "posting to notification manager");
        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            warn!(status = %response.status(), "notification manager rejected the post");
        }
        Ok(())
    }
}

fn format_timestamp(nanos: i64) -> String {
    let secs = nanos.div_euclid(1_000_000_000);
    let nsec = nanos.rem_euclid(1_000_000_000) as u32;
    match Utc.timestamp_opt(secs, nsec).single() {
        Some(dt) => dt.format("%d/%m/%Y, %H:%M:%S").to_string(),
        None => String::new(),
    }
}
