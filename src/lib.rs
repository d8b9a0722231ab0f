//! # ecStats - Consensus Simulation Statistics
//!
//! Computes performance statistics for a simulated consensus network. The input
//! is the history of events recorded by validators during a run (block
//! proposals and block receipts) plus each validator's application state at
//! the end of the run. The output is per-validator and network-wide latency,
//! throughput and block confirmation numbers.
//!
//! ## Core Components
//!
//! - **Event**: one proposal or receipt, linked to its causal predecessor by
//!   position in the global history
//! - **ConfirmationOracle**: per-validator view of which blocks are strongly
//!   acked, totally ordered and delivered
//! - **StatsSet**: counters and latency averages for one validator or the network
//! - **Stats**: drives the calculation over a full history
//!
//! ## Usage
//!
//! ```
//! use std::collections::HashMap;
//! use chrono::{TimeDelta, TimeZone, Utc};
//! use ec_stats::{AppSnapshot, Event, Stats};
//!
//! let history = vec![
//!     Event::propose(1, Utc.timestamp_nanos(0), TimeDelta::seconds(1), None),
//!     Event::receive(2, Utc.timestamp_nanos(5_000_000_000), TimeDelta::seconds(2), 0, 42),
//! ];
//!
//! let mut app = AppSnapshot::new();
//! app.acked.insert(42);
//! let apps = HashMap::from([(2, app)]);
//!
//! let stats = Stats::build(&history, &apps).unwrap();
//! assert_eq!(stats.all.received_block_count, 1);
//! assert_eq!(stats.all.strongly_acked_block_count, 1);
//! assert_eq!(stats.all.receiving_latency, Some(TimeDelta::seconds(4)));
//! ```
//!
//! Traces written to disk can be loaded with [`TraceFile`]; the
//! `stats_runner` binary does exactly that and prints the summary.

pub mod ec_app;
pub mod ec_event;
pub mod ec_interface;
pub mod ec_stats;
pub mod ec_trace;

// Re-export commonly used types
pub use ec_app::{App, AppSnapshot};
pub use ec_event::{Event, Payload};
pub use ec_interface::{BlockHash, Confirmation, ConfirmationOracle, HistoryIndex, ValidatorId};
pub use ec_stats::{Stats, StatsError, StatsSet};
pub use ec_trace::{EventRecord, PayloadRecord, TraceError, TraceFile};
