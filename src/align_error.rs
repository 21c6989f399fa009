//! DebugAlignError: unified error type for debug-align public APIs
//!
//! Every fallible operation in this crate returns this error. The
//! `MisalignedAddress` variant doubles as the signal a violation handler
//! raises to reject a construction.

use thiserror::Error;

/// Unified error type for alignment checking and placement construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DebugAlignError {
    /// An object of `type_name` was about to be constructed at an address
    /// that is not a multiple of its alignment.
    #[error("misaligned address {address:#x} for `{type_name}` (expected alignment {expected})")]
    MisalignedAddress {
        type_name: &'static str,
        expected: usize,
        address: usize,
    },
    /// An alignment argument was zero or not a power of two.
    #[error("alignment {0} is not a power of two")]
    NotPowerOfTwo(usize),
    /// A slot at `offset` needs `needed` bytes but the buffer only holds `available`.
    #[error("buffer too small: offset {offset} needs {needed} bytes, buffer has {available}")]
    BufferTooSmall {
        offset: usize,
        needed: usize,
        available: usize,
    },
    /// Internal bookkeeping of a slot or test suite is inconsistent.
    #[error("invariant violated: {0}")]
    InvariantViolated(String),
}

impl DebugAlignError {
    /// True for the misalignment signal raised by a rejecting handler.
    pub fn is_misaligned(&self) -> bool {
        matches!(self, DebugAlignError::MisalignedAddress { .. })
    }
}
