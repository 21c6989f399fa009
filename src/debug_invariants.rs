//! Opt-in bookkeeping checks for slots and test suites.
//!
//! Checks compile in under `debug_assertions` or either of the
//! `strict-invariants` / `check-invariants` features, and vanish otherwise.

use crate::align_error::DebugAlignError;

/// Structures whose internal bookkeeping can be re-validated on demand.
pub trait DebugInvariants {
    /// Validate invariants and return the first violation found.
    fn validate_invariants(&self) -> Result<(), DebugAlignError>;

    /// Panic with the first violation when invariant checking is compiled in.
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), core::any::type_name::<Self>());
    }
}

/// Run a fallible check and panic with `what` as context on error, but only
/// when invariant checking is compiled in.
#[macro_export]
macro_rules! debug_invariants {
    ($check:expr, $what:expr) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        if let Err(e) = $check {
            panic!("[invariants] {}: {}", $what, e);
        }
    };
}
