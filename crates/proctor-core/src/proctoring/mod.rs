//! Integrity ("proctoring") signals.
//!
//! Counters only ever grow within a session. The severity policy reports a
//! threshold crossing; deciding what to do about it (e.g. disqualification)
//! is left to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Kinds of integrity signals reported by the client.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProctoringKind {
    TabSwitch,
    PasteDetected,
    FullscreenExit,
}

/// Severity reported back to the client for a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Warning,
    FinalWarning,
}

/// Result of recording one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProctoringRecord {
    pub kind: ProctoringKind,
    pub count: u64,
    pub severity: Severity,
}

/// Audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProctoringEvent {
    #[serde(rename = "type")]
    pub kind: ProctoringKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Per-kind monotonically non-decreasing counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProctoringCounters(BTreeMap<ProctoringKind, u64>);

impl ProctoringCounters {
    /// Increments the counter for `kind` and returns the new value.
    pub fn increment(&mut self, kind: ProctoringKind) -> u64 {
        let count = self.0.entry(kind).or_insert(0);
        *count += 1;
        *count
    }

    pub fn get(&self, kind: ProctoringKind) -> u64 {
        self.0.get(&kind).copied().unwrap_or(0)
    }
}

/// Maps an event count to a severity.
///
/// Only tab switches escalate: `1..final_at` is a warning, `>= final_at` a
/// final warning. Paste and fullscreen-exit events are always warnings.
pub fn severity_for(kind: ProctoringKind, count: u64, final_at: u64) -> Severity {
    match kind {
        ProctoringKind::TabSwitch if count >= final_at => Severity::FinalWarning,
        _ => Severity::Warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_tab_switch_thresholds() {
        assert_eq!(severity_for(ProctoringKind::TabSwitch, 1, 3), Severity::Warning);
        assert_eq!(severity_for(ProctoringKind::TabSwitch, 2, 3), Severity::Warning);
        assert_eq!(
            severity_for(ProctoringKind::TabSwitch, 3, 3),
            Severity::FinalWarning
        );
        assert_eq!(
            severity_for(ProctoringKind::TabSwitch, 10, 3),
            Severity::FinalWarning
        );
    }

    #[test]
    fn test_other_kinds_never_escalate() {
        for count in 1..10 {
            assert_eq!(
                severity_for(ProctoringKind::PasteDetected, count, 3),
                Severity::Warning
            );
            assert_eq!(
                severity_for(ProctoringKind::FullscreenExit, count, 3),
                Severity::Warning
            );
        }
    }

    #[test]
    fn test_counters_increment_independently() {
        let mut counters = ProctoringCounters::default();
        assert_eq!(counters.increment(ProctoringKind::TabSwitch), 1);
        assert_eq!(counters.increment(ProctoringKind::TabSwitch), 2);
        assert_eq!(counters.increment(ProctoringKind::PasteDetected), 1);
        assert_eq!(counters.get(ProctoringKind::FullscreenExit), 0);
    }

    #[test]
    fn test_kind_names_match_wire_format() {
        for kind in ProctoringKind::iter() {
            let wire = serde_json::to_value(kind).unwrap();
            assert_eq!(wire, kind.as_ref());
            assert_eq!(ProctoringKind::from_str(kind.as_ref()).unwrap(), kind);
        }
        assert!(ProctoringKind::from_str("copy_detected").is_err());
    }

    #[test]
    fn test_counters_serialize_as_map() {
        let mut counters = ProctoringCounters::default();
        counters.increment(ProctoringKind::TabSwitch);
        let value = serde_json::to_value(&counters).unwrap();
        assert_eq!(value["tab_switch"], 1);
    }
}
