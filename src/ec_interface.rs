// all the same numeric type of some size to allow casting/interop
pub type ValidatorId = u64;
pub type BlockHash = u64;

/// Position of an event in the global history
pub type HistoryIndex = usize;

// ============================================================================
// Confirmation Oracle
// ============================================================================

/// What one validator's application layer knows about a single block
///
/// The three stages are read together, so a `Confirmation` always reflects
/// one consistent state of the application, never a partial update.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Confirmation {
    pub acked: bool,
    pub total_ordered: bool,
    pub delivered: bool,
}

/// Per-validator application state queried while accumulating receive events
///
/// Implementations answer all three membership questions for a block under a
/// single scoped read. The statistics engine never keeps a reference to the
/// oracle between queries and never mutates it.
pub trait ConfirmationOracle {
    fn check(&self, block: &BlockHash) -> Confirmation;
}

impl<T: ConfirmationOracle + ?Sized> ConfirmationOracle for &T {
    fn check(&self, block: &BlockHash) -> Confirmation {
        (**self).check(block)
    }
}
