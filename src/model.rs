//! Core data model: alarms, severities, actions, and definitions.
//!
//! Field casing on the wire-facing types mirrors the JSON shape consumed by
//! on-platform applications and the admin HTTP surface: most fields are
//! camelCase, but `AlarmAction`/`AlarmTime` keep their
//! original capitalized names because they are siblings of an embedded
//! `Alarm`, not members of it.

use serde::{Deserialize, Serialize};

/// Reserved specific-problem id for the active-alarm capacity meta-alarm.
pub const ACTIVE_ALARM_EXCEED_MAX_THRESHOLD: i32 = 8008;
/// Reserved specific-problem id for the alarm-history capacity meta-alarm.
pub const ALARM_HISTORY_EXCEED_MAX_THRESHOLD: i32 = 8009;

/// Perceived severity of an alarm. Equality only — ordering is not defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Unspecified,
    Critical,
    Major,
    Minor,
    Warning,
    Cleared,
    Default,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Unspecified
    }
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Unspecified => "UNSPECIFIED",
            Severity::Critical => "CRITICAL",
            Severity::Major => "MAJOR",
            Severity::Minor => "MINOR",
            Severity::Warning => "WARNING",
            Severity::Cleared => "CLEARED",
            Severity::Default => "DEFAULT",
        }
    }
}

/// The action a producer wants performed on an alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Raise,
    Clear,
    Reraise,
    ClearAll,
}

/// The stable identity of an alarm, independent of severity and free-text info.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    pub managed_object_id: String,
    pub application_id: String,
    pub specific_problem: i32,
    pub perceived_severity: Severity,
    #[serde(default)]
    pub additional_info: String,
    #[serde(default)]
    pub identifying_info: String,
}

impl Alarm {
    /// The 4-tuple used by the Matcher (C3) to find a duplicate. Severity and
    /// additionalInfo are deliberately excluded.
    pub fn identity(&self) -> (&str, &str, i32, &str) {
        (
            self.managed_object_id.as_str(),
            self.application_id.as_str(),
            self.specific_problem,
            self.identifying_info.as_str(),
        )
    }
}

/// A validated message ready for the State Engine. Constructed either
/// directly (bus/internal callers) or via [`RawAlarmMessage::into_message`]
/// (HTTP ingestion, which must tolerate missing fields rather than fail to
/// parse).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmMessage {
    #[serde(flatten)]
    pub alarm: Alarm,
    #[serde(rename = "AlarmAction")]
    pub action: Action,
    /// Nanoseconds since epoch, assigned by the producer. Zero means
    /// "assign on receipt".
    #[serde(rename = "AlarmTime", default)]
    pub alarm_time: i64,
}

/// Lenient wire-level representation used only at ingestion boundaries
/// (HTTP admin surface, bus decoder). Unlike [`AlarmMessage`], every field
/// defaults to its zero value instead of failing to deserialize: a missing
/// mandatory field must be a logged no-op, not a 400.
/// Genuinely malformed JSON (bad syntax, wrong types) still fails to parse
/// at the `RawAlarmMessage` stage and is handled as "malformed JSON".
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAlarmMessage {
    #[serde(default)]
    pub managed_object_id: String,
    #[serde(default)]
    pub application_id: String,
    #[serde(default)]
    pub specific_problem: i32,
    #[serde(default)]
    pub perceived_severity: Severity,
    #[serde(default)]
    pub additional_info: String,
    #[serde(default)]
    pub identifying_info: String,
    #[serde(rename = "AlarmAction", default)]
    pub alarm_action: Option<Action>,
    #[serde(rename = "AlarmTime", default)]
    pub alarm_time: i64,
}

impl RawAlarmMessage {
    /// Validates the mandatory fields (managedObjectId/applicationId/action).
    /// `Err` means "log and drop, no mutation" — never a 4xx.
    pub fn into_message(self) -> Result<AlarmMessage, MissingMandatoryFields> {
        let action = self.alarm_action.ok_or(MissingMandatoryFields)?;
        if self.managed_object_id.is_empty() || self.application_id.is_empty() {
            return Err(MissingMandatoryFields);
        }
        Ok(AlarmMessage {
            alarm: Alarm {
                managed_object_id: self.managed_object_id,
                application_id: self.application_id,
                specific_problem: self.specific_problem,
                perceived_severity: self.perceived_severity,
                additional_info: self.additional_info,
                identifying_info: self.identifying_info,
            },
            action,
            alarm_time: self.alarm_time,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MissingMandatoryFields;

/// An admitted alarm, enriched with definition data snapshotted at admission
/// time so later redefinition does not mutate history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmNotification {
    #[serde(flatten)]
    pub message: AlarmMessage,
    /// Dense integer, assigned on first raise; unique and monotonic within
    /// a process lifetime. Never zero for an admitted entry.
    pub alarm_id: u64,
    pub alarm_text: String,
    pub event_type: String,
    /// Snapshotted from the definition's `operationInstructions` at
    /// admission time, same as `alarm_text`/`event_type`.
    #[serde(default)]
    pub operation_instructions: String,
}

impl AlarmNotification {
    pub fn alarm(&self) -> &Alarm {
        &self.message.alarm
    }
}

/// Static metadata about an alarm type, keyed by `specificProblem`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmDefinition {
    /// Equal to the `specificProblem` it describes.
    pub alarm_id: i32,
    pub alarm_text: String,
    pub event_type: String,
    #[serde(default)]
    pub operation_instructions: String,
    /// Reserved; no engine logic reads this.
    #[serde(default)]
    pub raise_delay: i32,
    /// Reserved; no engine logic reads this.
    #[serde(default)]
    pub clear_delay: i32,
    /// Reserved; no engine logic reads this.
    #[serde(default)]
    pub time_to_live: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_round_trips() {
        let json = r#"{
            "managedObjectId":"pod",
            "applicationId":"app",
            "specificProblem":8004,
            "perceivedSeverity":"MAJOR",
            "additionalInfo":"info",
            "identifyingInfo":"eth 0 1",
            "AlarmAction":"RAISE",
            "AlarmTime":1234
        }"#;
        let msg: AlarmMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.alarm.managed_object_id, "pod");
        assert_eq!(msg.action, Action::Raise);
        assert_eq!(msg.alarm_time, 1234);

        let back = serde_json::to_value(&msg).unwrap();
        assert_eq!(back["AlarmAction"], "RAISE");
        assert_eq!(back["managedObjectId"], "pod");
    }

    #[test]
    fn clear_all_serializes_without_underscore() {
        let v = serde_json::to_value(Action::ClearAll).unwrap();
        assert_eq!(v, "CLEARALL");
    }

    #[test]
    fn raw_message_rejects_missing_action() {
        let raw: RawAlarmMessage = serde_json::from_str(
            r#"{"managedObjectId":"pod","applicationId":"app","specificProblem":1}"#,
        )
        .unwrap();
        assert!(raw.into_message().is_err());
    }

    #[test]
    fn raw_message_rejects_missing_mo() {
        let raw = RawAlarmMessage {
            managed_object_id: String::new(),
            application_id: "app".to_string(),
            specific_problem: 1,
            perceived_severity: Severity::Major,
            additional_info: String::new(),
            identifying_info: String::new(),
            alarm_action: Some(Action::Raise),
            alarm_time: 0,
        };
        assert!(raw.into_message().is_err());
    }

    #[test]
    fn raw_message_accepts_well_formed_input() {
        let raw = RawAlarmMessage {
            managed_object_id: "pod".to_string(),
            application_id: "app".to_string(),
            specific_problem: 8004,
            perceived_severity: Severity::Major,
            additional_info: String::new(),
            identifying_info: "eth 0 1".to_string(),
            alarm_action: Some(Action::Raise),
            alarm_time: 0,
        };
        assert!(raw.into_message().is_ok());
    }
}
