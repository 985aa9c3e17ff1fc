//! Definition Registry (C1) — the mapping from `specificProblem` to
//! `AlarmDefinition`, consulted on every incoming alarm event.

use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

use crate::model::{AlarmDefinition, ACTIVE_ALARM_EXCEED_MAX_THRESHOLD, ALARM_HISTORY_EXCEED_MAX_THRESHOLD};
use crate::{Error, Result};

/// Result of an admin bulk-upsert: ids that were inserted, and ids that
/// already existed and were left untouched — upsert never overwrites.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UpsertReport {
    pub inserted: Vec<i32>,
    pub rejected: Vec<i32>,
}

pub struct DefinitionRegistry {
    defs: HashMap<i32, AlarmDefinition>,
}

impl DefinitionRegistry {
    /// A fresh registry, seeded with the two reserved meta-alarm
    /// definitions. These ids can never be deleted.
    pub fn new() -> Self {
        let mut defs = HashMap::new();
        defs.insert(
            ACTIVE_ALARM_EXCEED_MAX_THRESHOLD,
            AlarmDefinition {
                alarm_id: ACTIVE_ALARM_EXCEED_MAX_THRESHOLD,
                alarm_text: "ACTIVE ALARM COUNT EXCEEDED MAX THRESHOLD".to_string(),
                event_type: "Threshold".to_string(),
                operation_instructions: "Clear alarms or raise the active alarm threshold".to_string(),
                raise_delay: 0,
                clear_delay: 0,
                time_to_live: 0,
            },
        );
        defs.insert(
            ALARM_HISTORY_EXCEED_MAX_THRESHOLD,
            AlarmDefinition {
                alarm_id: ALARM_HISTORY_EXCEED_MAX_THRESHOLD,
                alarm_text: "ALARM HISTORY COUNT EXCEEDED MAX THRESHOLD".to_string(),
                event_type: "Threshold".to_string(),
                operation_instructions: "Clear alarms or raise the alarm history threshold".to_string(),
                raise_delay: 0,
                clear_delay: 0,
                time_to_live: 0,
            },
        );
        Self { defs }
    }

    pub fn is_reserved(id: i32) -> bool {
        id == ACTIVE_ALARM_EXCEED_MAX_THRESHOLD || id == ALARM_HISTORY_EXCEED_MAX_THRESHOLD
    }

    /// Loads definitions from the `DEF_FILE` JSON document at startup.
    /// Duplicate ids within the source are logged and ignored after the
    /// first.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let contents = std::fs::read_to_string(path)?;
        let entries: Vec<AlarmDefinition> = serde_json::from_str(&contents)?;
        let mut loaded = 0;
        for def in entries {
            if Self::is_reserved(def.alarm_id) {
                warn!(alarm_id = def.alarm_id, "ignoring definition file entry that reuses a reserved id");
                continue;
            }
            if self.defs.contains_key(&def.alarm_id) {
                warn!(alarm_id = def.alarm_id, "duplicate alarm id in definition file, ignoring");
                continue;
            }
            self.defs.insert(def.alarm_id, def);
            loaded += 1;
        }
        info!(loaded, "loaded alarm definitions");
        Ok(loaded)
    }

    pub fn get(&self, alarm_id: i32) -> Option<&AlarmDefinition> {
        self.defs.get(&alarm_id)
    }

    /// Inserts new ids, rejects (does not overwrite) ids that already
    /// exist — prevents silent mutation of semantics under a running
    /// workload.
    pub fn upsert(&mut self, new_defs: Vec<AlarmDefinition>) -> UpsertReport {
        let mut report = UpsertReport::default();
        for def in new_defs {
            if self.defs.contains_key(&def.alarm_id) {
                warn!(alarm_id = def.alarm_id, "upsert rejected, id already registered");
                report.rejected.push(def.alarm_id);
                continue;
            }
            report.inserted.push(def.alarm_id);
            self.defs.insert(def.alarm_id, def);
        }
        report
    }

    /// Removes a definition. Already-admitted alarms retain their
    /// snapshotted text/eventType. Reserved meta-alarm ids
    /// cannot be deleted.
    pub fn delete(&mut self, alarm_id: i32) -> Result<()> {
        if Self::is_reserved(alarm_id) {
            return Err(Error::invalid_request("cannot delete a reserved meta-alarm definition"));
        }
        match self.defs.remove(&alarm_id) {
            Some(_) => Ok(()),
            None => Err(Error::not_found(format!("alarm definition {} not found", alarm_id))),
        }
    }

    pub fn list(&self) -> Vec<AlarmDefinition> {
        let mut out: Vec<AlarmDefinition> = self.defs.values().cloned().collect();
        out.sort_by_key(|d| d.alarm_id);
        out
    }
}

impl Default for DefinitionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(id: i32) -> AlarmDefinition {
        AlarmDefinition {
            alarm_id: id,
            alarm_text: format!("alarm {}", id),
            event_type: "Equipment".to_string(),
            operation_instructions: String::new(),
            raise_delay: 0,
            clear_delay: 0,
            time_to_live: 0,
        }
    }

    #[test]
    fn new_registry_seeds_meta_alarms() {
        let registry = DefinitionRegistry::new();
        assert!(registry.get(ACTIVE_ALARM_EXCEED_MAX_THRESHOLD).is_some());
        assert!(registry.get(ALARM_HISTORY_EXCEED_MAX_THRESHOLD).is_some());
    }

    #[test]
    fn upsert_inserts_new_and_rejects_existing() {
        let mut registry = DefinitionRegistry::new();
        let report = registry.upsert(vec![def(8004)]);
        assert_eq!(report.inserted, vec![8004]);
        assert!(report.rejected.is_empty());

        let mutated = AlarmDefinition {
            alarm_text: "mutated".to_string(),
            ..def(8004)
        };
        let report2 = registry.upsert(vec![mutated]);
        assert!(report2.inserted.is_empty());
        assert_eq!(report2.rejected, vec![8004]);
        assert_eq!(registry.get(8004).unwrap().alarm_text, "alarm 8004");
    }

    #[test]
    fn meta_alarm_definitions_cannot_be_deleted() {
        let mut registry = DefinitionRegistry::new();
        assert!(registry.delete(ACTIVE_ALARM_EXCEED_MAX_THRESHOLD).is_err());
    }

    #[test]
    fn delete_removes_non_reserved_definition() {
        let mut registry = DefinitionRegistry::new();
        registry.upsert(vec![def(8004)]);
        assert!(registry.delete(8004).is_ok());
        assert!(registry.get(8004).is_none());
        assert!(registry.delete(8004).is_err());
    }
}
