//! State Engine (C4) — applies the decision table for raise/clear/reraise/
//! clear-all. `process` holds the store lock for the whole decision and
//! returns the downstream effects the caller must emit *after* releasing it.

use tracing::{info, warn};

use crate::definitions::DefinitionRegistry;
use crate::model::{
    Action, AlarmMessage, AlarmNotification, Severity, ACTIVE_ALARM_EXCEED_MAX_THRESHOLD,
    ALARM_HISTORY_EXCEED_MAX_THRESHOLD,
};

use super::matcher::find_active;
use super::store::AlarmStore;

/// Injectable time source, so tests can pin alarm timestamps.
pub trait Clock: Send + Sync {
    fn now_nanos(&self) -> i64;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_nanos(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0)
    }
}

/// What happened as a result of processing one message. The caller emits
/// these to C6 only after releasing the store lock.
#[derive(Debug, Clone)]
pub enum DownstreamEffect {
    Active(AlarmNotification),
    Resolved(AlarmNotification),
}

pub struct StateEngine;

impl StateEngine {
    /// Applies one message to `store`/`definitions` and returns the
    /// downstream effects it produced, in order. Empty means "no-op":
    /// unknown definition, duplicate-raise-same-severity, or
    /// clear-of-nonexistent.
    pub fn process(
        store: &mut AlarmStore,
        definitions: &DefinitionRegistry,
        clock: &dyn Clock,
        message: AlarmMessage,
    ) -> Vec<DownstreamEffect> {
        match message.action {
            Action::Raise => Self::process_raise(store, definitions, clock, message),
            Action::Clear => Self::process_clear(store, definitions, clock, message)
                .into_iter()
                .collect(),
            Action::Reraise => {
                // CLEAR followed immediately by RAISE for the same identity;
                // history records both.
                let mut effects = Self::process_clear(store, definitions, clock, message.clone())
                    .into_iter()
                    .collect::<Vec<_>>();
                effects.extend(Self::process_raise(store, definitions, clock, message));
                effects
            }
            Action::ClearAll => Self::process_clear_all(store, definitions, clock, &message),
        }
    }

    fn process_raise(
        store: &mut AlarmStore,
        definitions: &DefinitionRegistry,
        clock: &dyn Clock,
        mut message: AlarmMessage,
    ) -> Vec<DownstreamEffect> {
        let definition = match definitions.get(message.alarm.specific_problem) {
            Some(def) => def,
            None => {
                warn!(
                    specific_problem = message.alarm.specific_problem,
                    "alarm definition not recognized, dropping"
                );
                crate::metrics::ALARMS_DROPPED_TOTAL.inc();
                return Vec::new();
            }
        };

        // Rule 3: duplicate found.
        if let Some(idx) = find_active(store.active(), &message.alarm) {
            let existing_severity = store.active()[idx].message.alarm.perceived_severity;
            if existing_severity == message.alarm.perceived_severity {
                info!("duplicate raise with unchanged severity, suppressing");
                crate::metrics::ALARMS_SUPPRESSED_TOTAL.inc();
                return Vec::new();
            }
            // Severity change: remove without a history append, then fall
            // through to admission below.
            store.remove_active(idx);
        }

        // Rule 6a/6b: capacity meta-alarms, admitted silently (no immediate
        // downstream emission — they surface on the next re-post tick).
        Self::raise_meta_alarm_if_needed(
            store,
            definitions,
            clock,
            ACTIVE_ALARM_EXCEED_MAX_THRESHOLD,
            AlarmStore::active_at_capacity,
            AlarmStore::exceeded_active_on,
            AlarmStore::set_exceeded_active,
        );
        Self::raise_meta_alarm_if_needed(
            store,
            definitions,
            clock,
            ALARM_HISTORY_EXCEED_MAX_THRESHOLD,
            AlarmStore::history_at_capacity,
            AlarmStore::exceeded_history_on,
            AlarmStore::set_exceeded_history,
        );

        if message.alarm_time == 0 {
            message.alarm_time = clock.now_nanos();
        }
        let notification = AlarmNotification {
            alarm_id: store.next_alarm_id(),
            alarm_text: definition.alarm_text.clone(),
            event_type: definition.event_type.clone(),
            operation_instructions: definition.operation_instructions.clone(),
            message,
        };
        store.push_active(notification.clone());
        store.push_history(notification.clone());
        vec![DownstreamEffect::Active(notification)]
    }

    fn process_clear(
        store: &mut AlarmStore,
        definitions: &DefinitionRegistry,
        clock: &dyn Clock,
        message: AlarmMessage,
    ) -> Option<DownstreamEffect> {
        let idx = find_active(store.active(), &message.alarm)?;
        let mut cleared = store.remove_active(idx);
        // Copy alarmId/alarmText/eventType from the active entry onto the
        // incoming message; only severity/additionalInfo
        // may legitimately differ between the clear request and the
        // admitted alarm.
        cleared.message.alarm.perceived_severity = message.alarm.perceived_severity;
        cleared.message.alarm.additional_info = message.alarm.additional_info;
        cleared.message.action = Action::Clear;
        cleared.message.alarm_time = message.alarm_time;
        store.push_history(cleared.clone());

        if Self::is_meta_alarm(cleared.message.alarm.specific_problem) {
            match cleared.message.alarm.specific_problem {
                ACTIVE_ALARM_EXCEED_MAX_THRESHOLD => store.set_exceeded_active(false),
                ALARM_HISTORY_EXCEED_MAX_THRESHOLD => store.set_exceeded_history(false),
                _ => {}
            }
        }

        // Rule 4: a CLEAR appends to history too, so it can push history
        // over capacity just as a RAISE can.
        Self::raise_meta_alarm_if_needed(
            store,
            definitions,
            clock,
            ALARM_HISTORY_EXCEED_MAX_THRESHOLD,
            AlarmStore::history_at_capacity,
            AlarmStore::exceeded_history_on,
            AlarmStore::set_exceeded_history,
        );

        Some(DownstreamEffect::Resolved(cleared))
    }

    /// CLEARALL: one CLEAR per active entry matching the requester's
    /// managedObjectId/applicationId.
    fn process_clear_all(
        store: &mut AlarmStore,
        definitions: &DefinitionRegistry,
        clock: &dyn Clock,
        message: &AlarmMessage,
    ) -> Vec<DownstreamEffect> {
        let targets: Vec<_> = store
            .active()
            .iter()
            .enumerate()
            .filter(|(_, entry)| {
                entry.message.alarm.managed_object_id == message.alarm.managed_object_id
                    && entry.message.alarm.application_id == message.alarm.application_id
            })
            .map(|(_, entry)| entry.message.alarm.clone())
            .collect();

        let mut effects = Vec::with_capacity(targets.len());
        for alarm in targets {
            let clear_message = AlarmMessage {
                alarm,
                action: Action::Clear,
                alarm_time: message.alarm_time,
            };
            if let Some(effect) = Self::process_clear(store, definitions, clock, clear_message) {
                effects.push(effect);
            }
        }
        effects
    }

    fn is_meta_alarm(specific_problem: i32) -> bool {
        specific_problem == ACTIVE_ALARM_EXCEED_MAX_THRESHOLD
            || specific_problem == ALARM_HISTORY_EXCEED_MAX_THRESHOLD
    }

    #[allow(clippy::too_many_arguments)]
    fn raise_meta_alarm_if_needed(
        store: &mut AlarmStore,
        definitions: &DefinitionRegistry,
        clock: &dyn Clock,
        specific_problem: i32,
        at_capacity: fn(&AlarmStore) -> bool,
        exceeded_on: fn(&AlarmStore) -> bool,
        set_exceeded: fn(&mut AlarmStore, bool),
    ) {
        if !at_capacity(store) || exceeded_on(store) {
            return;
        }
        warn!(specific_problem, "capacity threshold exceeded, raising meta-alarm");
        set_exceeded(store, true);
        let Some(definition) = definitions.get(specific_problem) else {
            return;
        };
        let notification = AlarmNotification {
            message: AlarmMessage {
                alarm: crate::model::Alarm {
                    managed_object_id: "RIC".to_string(),
                    application_id: "ALARM-MANAGER".to_string(),
                    specific_problem,
                    perceived_severity: Severity::Warning,
                    additional_info: definition.operation_instructions.clone(),
                    identifying_info: String::new(),
                },
                action: Action::Raise,
                alarm_time: clock.now_nanos(),
            },
            alarm_id: store.next_alarm_id(),
            alarm_text: definition.alarm_text.clone(),
            event_type: definition.event_type.clone(),
            operation_instructions: definition.operation_instructions.clone(),
        };
        store.push_active(notification.clone());
        store.push_history(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Alarm;

    struct FixedClock(i64);
    impl Clock for FixedClock {
        fn now_nanos(&self) -> i64 {
            self.0
        }
    }

    fn registry_with(id: i32) -> DefinitionRegistry {
        let mut reg = DefinitionRegistry::new();
        reg.upsert(vec![crate::model::AlarmDefinition {
            alarm_id: id,
            alarm_text: "RIC ROUTING TABLE DISTRIBUTION FAILED".to_string(),
            event_type: "Equipment".to_string(),
            operation_instructions: String::new(),
            raise_delay: 0,
            clear_delay: 0,
            time_to_live: 0,
        }]);
        reg
    }

    fn raise(sp: i32, sev: Severity, ii: &str) -> AlarmMessage {
        AlarmMessage {
            alarm: Alarm {
                managed_object_id: "pod".to_string(),
                application_id: "app".to_string(),
                specific_problem: sp,
                perceived_severity: sev,
                additional_info: String::new(),
                identifying_info: ii.to_string(),
            },
            action: Action::Raise,
            alarm_time: 0,
        }
    }

    fn clear(sp: i32, sev: Severity, ii: &str) -> AlarmMessage {
        AlarmMessage {
            action: Action::Clear,
            ..raise(sp, sev, ii)
        }
    }

    #[test]
    fn scenario_1_raise_admits_and_emits_active() {
        let mut store = AlarmStore::new(5000, 20000);
        let defs = registry_with(8004);
        let clock = FixedClock(42);
        let effects = StateEngine::process(&mut store, &defs, &clock, raise(8004, Severity::Major, "eth 0 1"));
        assert_eq!(store.active().len(), 1);
        assert_eq!(effects.len(), 1);
        assert!(matches!(effects[0], DownstreamEffect::Active(_)));
    }

    #[test]
    fn scenario_2_idempotent_raise_suppresses_second() {
        let mut store = AlarmStore::new(5000, 20000);
        let defs = registry_with(8004);
        let clock = FixedClock(42);
        StateEngine::process(&mut store, &defs, &clock, raise(8004, Severity::Major, "eth 0 1"));
        let effects = StateEngine::process(&mut store, &defs, &clock, raise(8004, Severity::Major, "eth 0 1"));
        assert_eq!(store.active().len(), 1);
        assert!(effects.is_empty());
    }

    #[test]
    fn scenario_3_clear_after_raise_empties_active_and_doubles_history() {
        let mut store = AlarmStore::new(5000, 20000);
        let defs = registry_with(8004);
        let clock = FixedClock(42);
        StateEngine::process(&mut store, &defs, &clock, raise(8004, Severity::Major, "eth 0 1"));
        let effects = StateEngine::process(&mut store, &defs, &clock, clear(8004, Severity::Major, "eth 0 1"));
        assert_eq!(store.active().len(), 0);
        assert_eq!(store.history().len(), 2);
        assert!(matches!(effects[0], DownstreamEffect::Resolved(_)));
    }

    #[test]
    fn scenario_4_unknown_definition_is_dropped() {
        let mut store = AlarmStore::new(5000, 20000);
        let defs = DefinitionRegistry::new();
        let clock = FixedClock(42);
        let effects = StateEngine::process(&mut store, &defs, &clock, raise(1111, Severity::Major, "x"));
        assert_eq!(store.active().len(), 0);
        assert_eq!(store.history().len(), 0);
        assert!(effects.is_empty());
    }

    #[test]
    fn scenario_5_capacity_meta_alarm_raises_once() {
        let mut store = AlarmStore::new(1, 20000);
        let defs = registry_with(8004);
        let mut defs = defs;
        defs.upsert(vec![crate::model::AlarmDefinition {
            alarm_id: 8005,
            alarm_text: "SECOND".to_string(),
            event_type: "Equipment".to_string(),
            operation_instructions: String::new(),
            raise_delay: 0,
            clear_delay: 0,
            time_to_live: 0,
        }]);
        let clock = FixedClock(42);
        StateEngine::process(&mut store, &defs, &clock, raise(8004, Severity::Major, "eth 0 1"));
        StateEngine::process(&mut store, &defs, &clock, raise(8005, Severity::Major, "eth 0 2"));
        assert_eq!(store.active().len(), 3);
        assert!(store.exceeded_active_on());

        // A further overflow must not re-raise the meta-alarm.
        let before = store.active().len();
        StateEngine::process(
            &mut store,
            &defs,
            &clock,
            raise(8004, Severity::Major, "eth 0 3"),
        );
        assert_eq!(store.active().len(), before + 1);
    }

    #[test]
    fn scenario_6_severity_change_preserves_active_count_and_adds_two_history_rows() {
        let mut store = AlarmStore::new(5000, 20000);
        let defs = registry_with(8004);
        let clock = FixedClock(42);
        StateEngine::process(&mut store, &defs, &clock, raise(8004, Severity::Major, "eth 0 1"));
        let effects = StateEngine::process(&mut store, &defs, &clock, raise(8004, Severity::Critical, "eth 0 1"));
        assert_eq!(store.active().len(), 1);
        assert_eq!(store.active()[0].message.alarm.perceived_severity, Severity::Critical);
        assert_eq!(store.history().len(), 2);
        assert!(matches!(effects[0], DownstreamEffect::Active(_)));
    }

    #[test]
    fn history_capacity_meta_alarm_raises_once_via_clear() {
        let mut store = AlarmStore::new(5000, 2);
        let defs = registry_with(8004);
        let clock = FixedClock(42);
        StateEngine::process(&mut store, &defs, &clock, raise(8004, Severity::Major, "eth 0 1"));
        // history = [raise] (len 1), not yet at capacity.
        assert!(!store.exceeded_history_on());
        let effects = StateEngine::process(&mut store, &defs, &clock, clear(8004, Severity::Major, "eth 0 1"));
        // history = [raise, clear] (len 2): now at capacity, meta-alarm raised.
        assert!(store.exceeded_history_on());
        assert_eq!(store.history().len(), 3);
        assert!(matches!(effects[0], DownstreamEffect::Resolved(_)));

        // A further CLEAR-driven overflow must not re-raise the meta-alarm.
        StateEngine::process(&mut store, &defs, &clock, raise(8004, Severity::Minor, "eth 0 2"));
        let before = store.history().len();
        StateEngine::process(&mut store, &defs, &clock, clear(8004, Severity::Minor, "eth 0 2"));
        assert_eq!(store.history().len(), before + 1);
    }

    #[test]
    fn clear_of_nonexistent_is_a_noop() {
        let mut store = AlarmStore::new(5000, 20000);
        let defs = registry_with(8004);
        let clock = FixedClock(42);
        let effects = StateEngine::process(&mut store, &defs, &clock, clear(8004, Severity::Major, "eth 0 1"));
        assert!(effects.is_empty());
        assert_eq!(store.history().len(), 0);
    }

    #[test]
    fn clear_all_clears_every_matching_active_entry() {
        let mut store = AlarmStore::new(5000, 20000);
        let defs = registry_with(8004);
        let clock = FixedClock(42);
        StateEngine::process(&mut store, &defs, &clock, raise(8004, Severity::Major, "eth 0 1"));
        StateEngine::process(&mut store, &defs, &clock, raise(8004, Severity::Major, "eth 0 2"));
        let clear_all = AlarmMessage {
            action: Action::ClearAll,
            ..raise(8004, Severity::Major, "")
        };
        let effects = StateEngine::process(&mut store, &defs, &clock, clear_all);
        assert_eq!(store.active().len(), 0);
        assert_eq!(effects.len(), 2);
    }
}
