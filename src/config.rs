//! Configuration management for the Alarm Manager.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmManagerConfig {
    pub general: GeneralConfig,
    pub http: HttpConfig,
    pub controls: ControlsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub node_id: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Bind address for the admin HTTP surface.
    pub bind_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlsConfig {
    pub max_active_alarms: usize,
    pub max_alarm_history: usize,
    pub prom_alert_manager: PromAlertManagerConfig,
    pub noma: NomaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromAlertManagerConfig {
    /// `host:port` of the Alert Manager.
    pub address: String,
    pub base_url: String,
    pub schemes: String,
    /// Re-post timer period, milliseconds.
    pub alert_interval: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NomaConfig {
    pub enabled: bool,
    pub host: String,
    pub alarm_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub max_size: u64,
    pub max_files: u32,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
    Full,
}

impl AlarmManagerConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AlarmManagerConfig =
            toml::from_str(&contents).map_err(|e| Error::parse(format!("Invalid TOML: {}", e)))?;
        Ok(config)
    }

    pub fn load_from_env() -> Result<Self> {
        let settings = config::Config::builder().add_source(
            config::Environment::with_prefix("ALARMMGR")
                .separator("_")
                .try_parsing(true),
        );

        let config = settings.build()?;
        let alarm_config = config.try_deserialize()?;
        Ok(alarm_config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.controls.max_active_alarms == 0 {
            return Err(Error::parse("maxActiveAlarms must be greater than zero"));
        }
        if self.controls.max_alarm_history == 0 {
            return Err(Error::parse("maxAlarmHistory must be greater than zero"));
        }
        if self.controls.prom_alert_manager.address.is_empty() {
            return Err(Error::parse("promAlertManager.address must not be empty"));
        }
        if self.controls.prom_alert_manager.alert_interval == 0 {
            return Err(Error::parse("alertInterval must be greater than zero"));
        }
        if self.http.bind_address.is_empty() {
            return Err(Error::parse("http.bind_address must not be empty"));
        }
        Ok(())
    }

    pub fn default_config() -> Self {
        Self {
            general: GeneralConfig {
                node_id: "alarm-manager-1".to_string(),
                description: "RIC Alarm Manager".to_string(),
            },
            http: HttpConfig {
                bind_address: "0.0.0.0:8080".to_string(),
            },
            controls: ControlsConfig {
                max_active_alarms: 5000,
                max_alarm_history: 20000,
                prom_alert_manager: PromAlertManagerConfig {
                    address: "localhost:9093".to_string(),
                    base_url: "/api/v2".to_string(),
                    schemes: "http".to_string(),
                    alert_interval: 5000,
                },
                noma: NomaConfig {
                    enabled: false,
                    host: String::new(),
                    alarm_url: String::new(),
                },
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: None,
                max_size: 100,
                max_files: 5,
                format: LogFormat::Full,
            },
        }
    }
}
