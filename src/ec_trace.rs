//! Trace Files
//!
//! A trace is what a simulation run leaves behind: the global event history
//! plus the final confirmation state of every validator's application. Traces
//! are YAML, in the same spirit as the simulator's scenario files.
//!
//! ```yaml
//! meta:
//!   name: two validators
//! events:
//!   - validator: 1
//!     time: "2018-08-01T00:00:00Z"
//!     exec_interval_ns: 1000000
//!     payload: { type: propose }
//!   - validator: 2
//!     time: "2018-08-01T00:00:05Z"
//!     exec_interval_ns: 2000000
//!     parent: 0
//!     payload: { type: receive, block: 42 }
//! apps:
//!   2: { acked: [42], total_ordered: [42], delivered: [42] }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ec_app::AppSnapshot;
use crate::ec_event::{Event, Payload};
use crate::ec_interface::{BlockHash, HistoryIndex, ValidatorId};
use crate::ec_stats::{Stats, StatsError};

const PAYLOAD_PROPOSE: &str = "propose";
const PAYLOAD_RECEIVE: &str = "receive";

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse trace: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Stats(#[from] StatsError),

    /// Execution interval does not fit `exec_interval_ns`
    #[error("exec interval of event at history index {index} overflows nanoseconds")]
    IntervalOverflow { index: HistoryIndex },
}

/// Payload as written by the producer, before its type is checked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadRecord {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockHash>,
}

/// Event as written by the producer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub validator: ValidatorId,
    pub time: DateTime<Utc>,

    #[serde(default)]
    pub exec_interval_ns: i64,

    #[serde(default)]
    pub parent: Option<HistoryIndex>,

    #[serde(default)]
    pub payload: Option<PayloadRecord>,
}

impl EventRecord {
    /// Check the payload and turn the record into an `Event`
    ///
    /// A missing payload, or a receive without a block, is an unknown event.
    /// A payload type other than propose/receive is an unknown consensus
    /// event type.
    pub fn to_event(&self, index: HistoryIndex) -> Result<Event, StatsError> {
        let record = self
            .payload
            .as_ref()
            .ok_or(StatsError::UnknownEvent { index })?;

        let payload = match record.kind.as_str() {
            PAYLOAD_PROPOSE => Payload::Propose,
            PAYLOAD_RECEIVE => Payload::Receive {
                block: record.block.ok_or(StatsError::UnknownEvent { index })?,
            },
            other => {
                return Err(StatsError::UnknownConsensusEventType {
                    index,
                    kind: other.to_string(),
                })
            }
        };

        Ok(Event {
            validator_id: self.validator,
            time: self.time,
            exec_interval: TimeDelta::nanoseconds(self.exec_interval_ns),
            parent_history_index: self.parent,
            payload,
        })
    }

    /// Record `event`, found at `index` of the history, for writing out
    pub fn from_event(index: HistoryIndex, event: &Event) -> Result<Self, TraceError> {
        let exec_interval_ns = event
            .exec_interval
            .num_nanoseconds()
            .ok_or(TraceError::IntervalOverflow { index })?;

        let payload = match event.payload {
            Payload::Propose => PayloadRecord {
                kind: PAYLOAD_PROPOSE.to_string(),
                block: None,
            },
            Payload::Receive { block } => PayloadRecord {
                kind: PAYLOAD_RECEIVE.to_string(),
                block: Some(block),
            },
        };

        Ok(Self {
            validator: event.validator_id,
            time: event.time,
            exec_interval_ns,
            parent: event.parent_history_index,
            payload: Some(payload),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceMeta {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A complete trace: history plus final application state per validator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceFile {
    #[serde(default)]
    pub meta: TraceMeta,

    pub events: Vec<EventRecord>,

    #[serde(default)]
    pub apps: BTreeMap<ValidatorId, AppSnapshot>,
}

impl TraceFile {
    pub fn new(
        history: &[Event],
        apps: BTreeMap<ValidatorId, AppSnapshot>,
    ) -> Result<Self, TraceError> {
        let events = history
            .iter()
            .enumerate()
            .map(|(index, event)| EventRecord::from_event(index, event))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            meta: TraceMeta::default(),
            events,
            apps,
        })
    }

    pub fn load(path: &Path) -> Result<Self, TraceError> {
        let yaml = fs::read_to_string(path).map_err(|source| TraceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let trace = Self::from_yaml(&yaml)?;
        log::info!(
            "loaded trace {}: {} events, {} apps",
            path.display(),
            trace.events.len(),
            trace.apps.len()
        );
        Ok(trace)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, TraceError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> Result<String, TraceError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Calculate statistics for this trace
    pub fn stats(&self) -> Result<Stats, TraceError> {
        let apps: HashMap<ValidatorId, &AppSnapshot> =
            self.apps.iter().map(|(v, app)| (*v, app)).collect();

        Ok(Stats::from_records(&self.events, &apps)?)
    }
}
