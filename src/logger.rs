// Copyright 2024 the Tectonic Project
// Licensed under the MIT License

//! Structured observation of rule-key computation.
//!
//! A closed set of rule-keying events, observed through a `RuleKeyLogger`
//! that is purely an observer: nothing it does can feed back into the
//! digest being built, so a caller can freely swap a no-op sink for a
//! verbose one without changing what gets hashed.

use serde::{Deserialize, Serialize};
use tectonic_status_base::{tt_note, tt_warning, StatusBackend};

/// A structured event describing one step of rule-key computation.
///
/// Field names mirror the builder operation that produced them, not the
/// internal representation, so that a diagnostic consumer (a log viewer, a
/// test assertion) can reason about the event stream without knowing the
/// builder's internals.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum RuleKeyEvent {
    /// A primitive value was absorbed under a field name.
    AddedValue { field: String, shape: &'static str },
    /// A field name was pushed onto the key-context stack.
    PushKey { field: String },
    /// A null (or absent-Option) value was absorbed.
    NullValue { field: String },
    /// A `SourcePath` (hashing or non-hashing) was absorbed.
    AddedPath { field: String, path: String },
    /// An `ArchiveMemberSourcePath` was absorbed.
    AddedArchiveMember {
        field: String,
        archive: String,
        member: String,
    },
    /// An ordered or unordered map began absorbing its entries.
    PushMap { field: String, len: usize },
    /// A single map entry's key was absorbed.
    PushMapKey { field: String },
    /// A single map entry's value was absorbed.
    PushMapValue { field: String },
    /// A `SourceWithFlags` was absorbed.
    PushSourceWithFlags { field: String, flags: Vec<String> },
    /// An unordered collection was admitted in non-strict mode.
    UnorderedCollectionWarning { field: String },
    /// A `BuildRule`'s rule key was computed and memoized.
    RegisteredRuleKey { target: String, key: String },
}

/// Receives [`RuleKeyEvent`]s as a builder runs.
///
/// Implementations must be side-effect-only: nothing observable through this
/// trait may alter what a builder absorbs into its digest.
pub trait RuleKeyLogger {
    fn log(&mut self, event: RuleKeyEvent);
}

/// The default sink: discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRuleKeyLogger;

impl RuleKeyLogger for NoopRuleKeyLogger {
    fn log(&mut self, _event: RuleKeyEvent) {}
}

/// A sink that collects every event it sees, for diagnosis or testing.
#[derive(Debug, Default)]
pub struct VerboseRuleKeyLogger {
    pub events: Vec<RuleKeyEvent>,
}

impl RuleKeyLogger for VerboseRuleKeyLogger {
    fn log(&mut self, event: RuleKeyEvent) {
        self.events.push(event);
    }
}

impl<'a> RuleKeyLogger for &'a mut dyn RuleKeyLogger {
    fn log(&mut self, event: RuleKeyEvent) {
        (**self).log(event)
    }
}

/// Bridges rule-key events onto a [`StatusBackend`], for builds that want
/// rule-keying diagnostics folded into the same CLI/worker status stream as
/// everything else. Notes on most events; warnings on the one event that
/// flags a real digest-stability hazard.
pub struct StatusBackendLogger<'a> {
    status: &'a mut dyn StatusBackend,
}

impl<'a> StatusBackendLogger<'a> {
    pub fn new(status: &'a mut dyn StatusBackend) -> Self {
        StatusBackendLogger { status }
    }
}

impl<'a> RuleKeyLogger for StatusBackendLogger<'a> {
    fn log(&mut self, event: RuleKeyEvent) {
        match event {
            RuleKeyEvent::UnorderedCollectionWarning { field } => {
                tt_warning!(
                    self.status,
                    "field `{field}`: unordered collection hashed in iteration order"
                );
            }
            RuleKeyEvent::RegisteredRuleKey { target, key } => {
                tt_note!(self.status, "rule key for `{target}`: {key}");
            }
            other => {
                tt_note!(self.status, "{}", serde_json::to_string(&other).unwrap());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_logger_collects_events() {
        let mut logger = VerboseRuleKeyLogger::default();
        logger.log(RuleKeyEvent::NullValue {
            field: "x".to_string(),
        });
        assert_eq!(logger.events.len(), 1);
    }

    #[test]
    fn noop_logger_drops_everything() {
        let mut logger = NoopRuleKeyLogger;
        logger.log(RuleKeyEvent::PushKey {
            field: "x".to_string(),
        });
    }
}
