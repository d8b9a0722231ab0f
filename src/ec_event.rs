//! Event Model
//!
//! One `Event` is one causal action by one validator: proposing a block, or
//! receiving a block proposed by someone else. Events live in a single global
//! history and point at their causal predecessor by position in that history.

use chrono::{DateTime, TimeDelta, Utc};

use crate::ec_interface::{BlockHash, HistoryIndex, ValidatorId};

/// What happened
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// Validator proposed a new block
    Propose,
    /// Validator received a block from a peer
    Receive { block: BlockHash },
}

/// A single entry of the global history
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub validator_id: ValidatorId,

    /// Wall-clock instant the event was recorded
    pub time: DateTime<Utc>,

    /// Time the validator spent actively processing this event
    pub exec_interval: TimeDelta,

    /// Causal predecessor in the global history (None for e.g. the first proposal)
    pub parent_history_index: Option<HistoryIndex>,

    pub payload: Payload,
}

impl Event {
    pub fn propose(
        validator_id: ValidatorId,
        time: DateTime<Utc>,
        exec_interval: TimeDelta,
        parent_history_index: Option<HistoryIndex>,
    ) -> Self {
        Self {
            validator_id,
            time,
            exec_interval,
            parent_history_index,
            payload: Payload::Propose,
        }
    }

    pub fn receive(
        validator_id: ValidatorId,
        time: DateTime<Utc>,
        exec_interval: TimeDelta,
        parent_history_index: HistoryIndex,
        block: BlockHash,
    ) -> Self {
        Self {
            validator_id,
            time,
            exec_interval,
            parent_history_index: Some(parent_history_index),
            payload: Payload::Receive { block },
        }
    }

    /// Look up the causal predecessor in `history`
    ///
    /// Returns `None` when there is no parent or the index does not point at
    /// an entry of `history`.
    pub fn parent<'h>(&self, history: &'h [Event]) -> Option<&'h Event> {
        self.parent_history_index.and_then(|i| history.get(i))
    }

    /// Gap between the parent finishing its own work and this event
    ///
    /// The parent's execution interval is subtracted, so what remains is pure
    /// scheduling and propagation delay.
    pub fn latency_since(&self, parent: &Event) -> TimeDelta {
        from_nanos(self.latency_nanos_since(parent))
    }

    /// Same as `latency_since`, in nanoseconds that cannot overflow
    pub fn latency_nanos_since(&self, parent: &Event) -> i128 {
        to_nanos(self.time.signed_duration_since(parent.time)) - to_nanos(parent.exec_interval)
    }
}

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Exact nanosecond count of `delta`
pub fn to_nanos(delta: TimeDelta) -> i128 {
    // subsec_nanos carries the same sign as num_seconds
    delta.num_seconds() as i128 * NANOS_PER_SEC + delta.subsec_nanos() as i128
}

/// Convert back from nanoseconds, saturating outside the `TimeDelta` range
pub fn from_nanos(nanos: i128) -> TimeDelta {
    let secs = nanos.div_euclid(NANOS_PER_SEC);
    let subsec = nanos.rem_euclid(NANOS_PER_SEC) as u32;

    i64::try_from(secs)
        .ok()
        .and_then(|secs| TimeDelta::new(secs, subsec))
        .unwrap_or(if nanos < 0 { TimeDelta::MIN } else { TimeDelta::MAX })
}
