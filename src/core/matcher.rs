//! Matcher (C3) — locates an existing active entry by identity key.

use crate::model::{Alarm, AlarmNotification};

/// Linear scan over `active` for the first entry whose identity key
/// matches. O(n); acceptable because `maxActiveAlarms` is bounded in the
/// thousands. A secondary identity->index hash is a natural
/// optimization if that bound is ever raised, as long as it stays
/// consistent with the ordered list on every mutation.
pub fn find_active(active: &[AlarmNotification], alarm: &Alarm) -> Option<usize> {
    let key = alarm.identity();
    active.iter().position(|entry| entry.alarm().identity() == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, AlarmMessage, Severity};

    fn notification(mo: &str, app: &str, sp: i32, ii: &str) -> AlarmNotification {
        AlarmNotification {
            message: AlarmMessage {
                alarm: Alarm {
                    managed_object_id: mo.to_string(),
                    application_id: app.to_string(),
                    specific_problem: sp,
                    perceived_severity: Severity::Major,
                    additional_info: String::new(),
                    identifying_info: ii.to_string(),
                },
                action: Action::Raise,
                alarm_time: 0,
            },
            alarm_id: 1,
            alarm_text: "text".to_string(),
            event_type: "Equipment".to_string(),
            operation_instructions: String::new(),
        }
    }

    #[test]
    fn finds_first_match_by_identity_ignoring_severity() {
        let active = vec![notification("pod", "app", 1, "eth0"), notification("pod", "app", 2, "eth0")];
        let needle = Alarm {
            managed_object_id: "pod".to_string(),
            application_id: "app".to_string(),
            specific_problem: 2,
            perceived_severity: Severity::Critical,
            additional_info: "whatever".to_string(),
            identifying_info: "eth0".to_string(),
        };
        assert_eq!(find_active(&active, &needle), Some(1));
    }

    #[test]
    fn no_match_returns_none() {
        let active = vec![notification("pod", "app", 1, "eth0")];
        let needle = Alarm {
            managed_object_id: "pod".to_string(),
            application_id: "app".to_string(),
            specific_problem: 2,
            perceived_severity: Severity::Major,
            additional_info: String::new(),
            identifying_info: "eth0".to_string(),
        };
        assert_eq!(find_active(&active, &needle), None);
    }
}
