// Application-side confirmation state
//
// Each validator's application layer learns about blocks in three steps:
// the block gets strongly acknowledged, then it is placed in the total order,
// then it is delivered. `App` is the live, thread-safe version written by a
// running harness; `AppSnapshot` is the plain data version loaded from trace
// files or taken from an `App` once the harness has stopped.

use hashbrown::HashSet;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::ec_interface::{BlockHash, Confirmation, ConfirmationOracle};

/// Block membership of the three confirmation stages
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSnapshot {
    #[serde(default)]
    pub acked: HashSet<BlockHash>,
    #[serde(default)]
    pub total_ordered: HashSet<BlockHash>,
    #[serde(default)]
    pub delivered: HashSet<BlockHash>,
}

impl AppSnapshot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfirmationOracle for AppSnapshot {
    fn check(&self, block: &BlockHash) -> Confirmation {
        Confirmation {
            acked: self.acked.contains(block),
            total_ordered: self.total_ordered.contains(block),
            delivered: self.delivered.contains(block),
        }
    }
}

/// Live confirmation state shared between validator threads and readers
///
/// All three sets sit behind one lock, so a reader never sees a block that is
/// half way through an update.
#[derive(Debug, Default)]
pub struct App {
    state: RwLock<AppSnapshot>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strongly_acked(&self, block: BlockHash) {
        self.state.write().acked.insert(block);
    }

    pub fn total_ordering_deliver(&self, blocks: &[BlockHash]) {
        self.state
            .write()
            .total_ordered
            .extend(blocks.iter().copied());
    }

    pub fn deliver_block(&self, block: BlockHash) {
        self.state.write().delivered.insert(block);
    }

    /// Run `f` against the current state under a single read lock
    pub fn check_with<R>(&self, f: impl FnOnce(&AppSnapshot) -> R) -> R {
        let state = self.state.read();
        f(&*state)
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> AppSnapshot {
        self.state.read().clone()
    }
}

impl From<AppSnapshot> for App {
    fn from(snapshot: AppSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }
}

impl ConfirmationOracle for App {
    fn check(&self, block: &BlockHash) -> Confirmation {
        self.check_with(|state| state.check(block))
    }
}
