//! Alarm Store (C2) — the active list and history list, the overflow
//! flags, and the monotonic alarm-id counter. All mutation happens under
//! the single store lock owned by the caller (see [`crate::core::manager`]).

use crate::model::AlarmNotification;

pub struct AlarmStore {
    active: Vec<AlarmNotification>,
    history: Vec<AlarmNotification>,
    max_active_alarms: usize,
    max_alarm_history: usize,
    exceeded_active_on: bool,
    exceeded_history_on: bool,
    next_alarm_id: u64,
}

impl AlarmStore {
    pub fn new(max_active_alarms: usize, max_alarm_history: usize) -> Self {
        Self {
            active: Vec::new(),
            history: Vec::new(),
            max_active_alarms,
            max_alarm_history,
            exceeded_active_on: false,
            exceeded_history_on: false,
            next_alarm_id: 1,
        }
    }

    pub fn active(&self) -> &[AlarmNotification] {
        &self.active
    }

    pub fn history(&self) -> &[AlarmNotification] {
        &self.history
    }

    pub fn max_active_alarms(&self) -> usize {
        self.max_active_alarms
    }

    pub fn max_alarm_history(&self) -> usize {
        self.max_alarm_history
    }

    /// Applies a new capacity. Does not retroactively trim over-limit
    /// lists — overflow rules apply only to subsequent inserts.
    pub fn set_capacities(&mut self, max_active_alarms: usize, max_alarm_history: usize) {
        self.max_active_alarms = max_active_alarms;
        self.max_alarm_history = max_alarm_history;
    }

    pub fn active_at_capacity(&self) -> bool {
        self.active.len() >= self.max_active_alarms
    }

    pub fn history_at_capacity(&self) -> bool {
        self.history.len() >= self.max_alarm_history
    }

    pub fn exceeded_active_on(&self) -> bool {
        self.exceeded_active_on
    }

    pub fn exceeded_history_on(&self) -> bool {
        self.exceeded_history_on
    }

    pub fn set_exceeded_active(&mut self, on: bool) {
        self.exceeded_active_on = on;
    }

    pub fn set_exceeded_history(&mut self, on: bool) {
        self.exceeded_history_on = on;
    }

    /// Assigns the next dense, monotonic alarm id. Never zero, never
    /// reused within a process lifetime.
    pub fn next_alarm_id(&mut self) -> u64 {
        let id = self.next_alarm_id;
        self.next_alarm_id += 1;
        id
    }

    pub fn push_active(&mut self, entry: AlarmNotification) {
        self.active.push(entry);
    }

    pub fn push_history(&mut self, entry: AlarmNotification) {
        self.history.push(entry);
    }

    /// Ordered removal: a shift, not a swap, so readout order stays stable.
    pub fn remove_active(&mut self, index: usize) -> AlarmNotification {
        self.active.remove(index)
    }
}
