//! Statistics Module
//!
//! Turns a finished event history into latency, throughput and confirmation
//! numbers, per validator and for the whole network.
//!
//! The work happens in three passes over data that is only ever borrowed:
//! 1. every event is accumulated into the global `StatsSet` and into the
//!    `StatsSet` of the validator that recorded it
//! 2. every `StatsSet` is finalized, turning cumulative durations into averages
//! 3. the summary derives the elapsed time of the run and blocks per second

use std::collections::HashMap;

use chrono::TimeDelta;
use indexmap::IndexMap;
use thiserror::Error;

use crate::ec_event::{from_nanos, to_nanos, Event, Payload};
use crate::ec_interface::{BlockHash, ConfirmationOracle, HistoryIndex, ValidatorId};
use crate::ec_trace::EventRecord;

/// Errors when calculating statistics for events
///
/// All of them abort the calculation; no partial result is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    /// Event payload does not have a shape we know how to read
    #[error("unknown event at history index {index}")]
    UnknownEvent { index: HistoryIndex },

    /// Event payload is tagged with a type that is neither propose nor receive
    #[error("unknown consensus event type {kind:?} at history index {index}")]
    UnknownConsensusEventType { index: HistoryIndex, kind: String },

    /// Receive event without a causal predecessor
    #[error("receive event at history index {index} has no parent")]
    MissingParent { index: HistoryIndex },

    /// Parent index out of range or not earlier than the event
    #[error("event at history index {index} has invalid parent {parent}")]
    InvalidParent {
        index: HistoryIndex,
        parent: HistoryIndex,
    },

    /// No confirmation state for a validator that received a block
    #[error("no application state for validator {validator} (history index {index})")]
    MissingOracle {
        index: HistoryIndex,
        validator: ValidatorId,
    },
}

// ============================================================================
// StatsSet
// ============================================================================

/// Cumulative durations collected before finalization, in nanoseconds
///
/// i128 so that neither summing nor spans of centuries can overflow.
#[derive(Debug, Clone, PartialEq, Default)]
struct LatencySums {
    proposing: i128,
    receiving: i128,
    prepare_exec: i128,
    process_exec: i128,
}

/// Accumulated result of a group of related events
/// (ex. all events from one validator, or all events of the network)
///
/// Latencies are `None` until `finalize` runs, and stay `None` when the
/// number of events they are averaged over is zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatsSet {
    pub proposed_block_count: usize,
    pub received_block_count: usize,
    pub strongly_acked_block_count: usize,
    pub total_ordered_block_count: usize,
    pub delivered_block_count: usize,

    /// Gap between consecutive proposals, minus the previous proposal's preparation
    pub proposing_latency: Option<TimeDelta>,

    /// Gap between a proposal and its receipt, minus the proposal's preparation
    pub receiving_latency: Option<TimeDelta>,

    /// Time spent preparing a proposal
    pub prepare_exec_latency: Option<TimeDelta>,

    /// Time spent processing a received block
    pub process_exec_latency: Option<TimeDelta>,

    sums: LatencySums,
}

impl StatsSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate a block proposing event
    ///
    /// `history` is the global history up to, but not including, `event`.
    pub fn on_propose(&mut self, event: &Event, history: &[Event]) -> Result<(), StatsError> {
        // first proposal of a validator has nothing to measure against
        if let Some(parent_index) = event.parent_history_index {
            let parent = history.get(parent_index).ok_or(StatsError::InvalidParent {
                index: history.len(),
                parent: parent_index,
            })?;
            self.sums.proposing += event.latency_nanos_since(parent);
        }
        self.sums.prepare_exec += to_nanos(event.exec_interval);
        self.proposed_block_count += 1;
        Ok(())
    }

    /// Accumulate a block received event
    ///
    /// After the latencies, the block is run through the confirmation funnel:
    /// strongly acked, then total ordered, then delivered. Counting stops at
    /// the first stage the block has not reached, whatever the later stages
    /// of the oracle claim.
    ///
    /// `history` is the global history up to, but not including, `event`.
    pub fn on_receive<O: ConfirmationOracle + ?Sized>(
        &mut self,
        event: &Event,
        block: &BlockHash,
        history: &[Event],
        app: &O,
    ) -> Result<(), StatsError> {
        let parent_index = event.parent_history_index.ok_or(StatsError::MissingParent {
            index: history.len(),
        })?;
        let parent = history.get(parent_index).ok_or(StatsError::InvalidParent {
            index: history.len(),
            parent: parent_index,
        })?;
        self.sums.receiving += event.latency_nanos_since(parent);
        self.sums.process_exec += to_nanos(event.exec_interval);
        self.received_block_count += 1;

        let confirmation = app.check(block);
        if !confirmation.acked {
            return Ok(());
        }
        self.strongly_acked_block_count += 1;

        if !confirmation.total_ordered {
            return Ok(());
        }
        self.total_ordered_block_count += 1;

        if !confirmation.delivered {
            return Ok(());
        }
        self.delivered_block_count += 1;
        Ok(())
    }

    /// Divide the cumulative latencies by their related event count
    ///
    /// `adjustment` is taken off the proposed block count before averaging
    /// proposing latency: every validator's first proposal has no parent, so
    /// it is counted but adds nothing to the sum. Use the number of
    /// validators for the network-wide set and 1 for a single validator.
    pub fn finalize(&mut self, adjustment: usize) {
        let proposed = self.proposed_block_count as i128;
        let received = self.received_block_count as i128;

        self.proposing_latency = average(self.sums.proposing, proposed - adjustment as i128);
        self.receiving_latency = average(self.sums.receiving, received);
        self.prepare_exec_latency = average(self.sums.prepare_exec, proposed);
        self.process_exec_latency = average(self.sums.process_exec, received);
    }
}

// truncates toward zero; None only for a zero count
fn average(sum: i128, count: i128) -> Option<TimeDelta> {
    sum.checked_div(count).map(from_nanos)
}

// ============================================================================
// Stats
// ============================================================================

/// Statistics of a history of events generated by validators
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    /// One set per validator, in order of first appearance in the history
    pub by_validator: IndexMap<ValidatorId, StatsSet>,

    /// Network-wide set
    pub all: StatsSet,

    /// Delivered blocks per second (None when there are no validators or the
    /// run lasted less than a second)
    pub bps: Option<f64>,

    /// Time between the first and the last entry of the history
    pub execution_time: TimeDelta,
}

impl Stats {
    /// Calculate statistics from a history and each validator's application state
    pub fn build<O: ConfirmationOracle>(
        history: &[Event],
        apps: &HashMap<ValidatorId, O>,
    ) -> Result<Self, StatsError> {
        let mut stats = Self {
            by_validator: IndexMap::new(),
            all: StatsSet::new(),
            bps: None,
            execution_time: TimeDelta::zero(),
        };

        stats.calculate(history, apps)?;
        stats.finalize();
        stats.summary(history);

        log::debug!(
            "stats: {} events from {} validators, {} delivered",
            history.len(),
            stats.validator_count(),
            stats.all.delivered_block_count
        );
        Ok(stats)
    }

    /// Decode raw records first, then calculate
    ///
    /// Any record with an unknown payload shape or type fails the whole call.
    pub fn from_records<O: ConfirmationOracle>(
        records: &[EventRecord],
        apps: &HashMap<ValidatorId, O>,
    ) -> Result<Self, StatsError> {
        let history = records
            .iter()
            .enumerate()
            .map(|(index, record)| record.to_event(index))
            .collect::<Result<Vec<_>, _>>()?;

        Self::build(&history, apps)
    }

    fn calculate<O: ConfirmationOracle>(
        &mut self,
        history: &[Event],
        apps: &HashMap<ValidatorId, O>,
    ) -> Result<(), StatsError> {
        for (index, event) in history.iter().enumerate() {
            // the parent must already be part of the history seen so far
            let seen = &history[..index];
            if let Some(parent) = event.parent_history_index {
                if parent >= index {
                    return Err(StatsError::InvalidParent { index, parent });
                }
            }

            match event.payload {
                Payload::Propose => {
                    self.all.on_propose(event, seen)?;
                    self.stats_set_by_validator(event.validator_id)
                        .on_propose(event, seen)?;
                }
                Payload::Receive { block } => {
                    let app = apps
                        .get(&event.validator_id)
                        .ok_or(StatsError::MissingOracle {
                            index,
                            validator: event.validator_id,
                        })?;
                    self.all.on_receive(event, &block, seen, app)?;
                    self.stats_set_by_validator(event.validator_id)
                        .on_receive(event, &block, seen, app)?;
                }
            }
        }
        Ok(())
    }

    fn finalize(&mut self) {
        self.all.finalize(self.by_validator.len());
        for set in self.by_validator.values_mut() {
            set.finalize(1);
        }
    }

    fn stats_set_by_validator(&mut self, validator: ValidatorId) -> &mut StatsSet {
        self.by_validator.entry(validator).or_default()
    }

    // Note: the execution time is a simplification. With more than one
    // producer writing to the history, the latest event is not necessarily
    // the last entry.
    fn summary(&mut self, history: &[Event]) {
        self.execution_time = match (history.first(), history.last()) {
            (Some(first), Some(last)) => last.time.signed_duration_since(first.time),
            _ => TimeDelta::zero(),
        };

        let seconds = self.execution_time.num_seconds();
        self.bps = match self.average_delivered_blocks() {
            Some(delivered) if seconds != 0 => Some(delivered as f64 / seconds as f64),
            _ => None,
        };

        if self.bps.is_none() && !history.is_empty() {
            log::warn!(
                "bps undefined: {} validators over {}s",
                self.validator_count(),
                seconds
            );
        }
    }

    pub fn validator_count(&self) -> usize {
        self.by_validator.len()
    }

    /// Delivered block count averaged over validators, truncated
    pub fn average_delivered_blocks(&self) -> Option<usize> {
        let total: usize = self
            .by_validator
            .values()
            .map(|s| s.delivered_block_count)
            .sum();
        total.checked_div(self.by_validator.len())
    }

    /// Print a summary of the statistics
    pub fn print_summary(&self) {
        println!("\n╔════════════════════════════════════════════════════════╗");
        println!("║        Consensus Simulation Statistics                ║");
        println!("╚════════════════════════════════════════════════════════╝\n");

        println!("Summary:");
        println!("  Validators: {}", self.validator_count());
        println!("  Execution time: {}", format_latency(Some(self.execution_time)));
        match self.bps {
            Some(bps) => println!("  BPS: {:.2}", bps),
            None => println!("  BPS: n/a"),
        }
        println!();

        println!("All validators:");
        print_set(&self.all);

        for (validator, set) in &self.by_validator {
            println!("Validator {:x}:", validator & 0xFFFF);
            print_set(set);
        }
    }
}

fn print_set(set: &StatsSet) {
    println!("  Proposed: {}", set.proposed_block_count);
    println!(
        "  Received: {} (acked: {}, ordered: {}, delivered: {})",
        set.received_block_count,
        set.strongly_acked_block_count,
        set.total_ordered_block_count,
        set.delivered_block_count
    );
    println!(
        "  Latency: proposing={}, receiving={}",
        format_latency(set.proposing_latency),
        format_latency(set.receiving_latency)
    );
    println!(
        "  Exec: prepare={}, process={}",
        format_latency(set.prepare_exec_latency),
        format_latency(set.process_exec_latency)
    );
    println!();
}

fn format_latency(latency: Option<TimeDelta>) -> String {
    match latency {
        Some(d) => match d.num_microseconds() {
            Some(us) => format!("{:.3}ms", us as f64 / 1000.0),
            None => format!("{}s", d.num_seconds()),
        },
        None => "n/a".to_string(),
    }
}
