//! Diagnostics sink.
//!
//! Every periodic component publishes its per-tick outputs through a
//! [`Recorder`].  Keys are slash-separated paths such as
//! `"Vision/Camera0/RobotPosesAccepted"`; a key written twice in one tick
//! keeps the latest value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::RobotError;
use crate::geometry::{Pose2d, Pose3d};

/// A value that can be written to the diagnostics log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum LogValue {
    Bool(bool),
    Number(f64),
    Numbers(Vec<f64>),
    Text(String),
    Poses(Vec<Pose3d>),
    Pose2d(Pose2d),
}

/// A sink for categorised diagnostic outputs.
pub trait Recorder {
    fn record(&mut self, key: &str, value: LogValue);
}

/// Forwards every record to `tracing` at `TRACE` level under the
/// `tickbot::log` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl Recorder for TracingRecorder {
    fn record(&mut self, key: &str, value: LogValue) {
        trace!(target: "tickbot::log", key, value = ?value);
    }
}

/// Keeps the latest value written under each key.
#[derive(Debug, Default, Clone, Serialize)]
pub struct MemoryRecorder {
    entries: BTreeMap<String, LogValue>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&LogValue> {
        self.entries.get(key)
    }

    /// Convenience accessor for pose-array entries; `None` when the key is
    /// missing or holds another kind of value.
    pub fn poses(&self, key: &str) -> Option<&[Pose3d]> {
        match self.entries.get(key) {
            Some(LogValue::Poses(poses)) => Some(poses),
            _ => None,
        }
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.entries.get(key) {
            Some(LogValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Serialise the whole table as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, RobotError> {
        serde_json::to_string_pretty(&self.entries)
            .map_err(|e| RobotError::Config(format!("failed to serialise log table: {e}")))
    }
}

impl Recorder for MemoryRecorder {
    fn record(&mut self, key: &str, value: LogValue) {
        self.entries.insert(key.to_string(), value);
    }
}
