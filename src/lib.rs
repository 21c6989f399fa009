#![cfg_attr(docsrs, feature(doc_cfg))]
//! # debug-align
//!
//! debug-align makes alignment bugs in numeric code observable. Most
//! hardware tolerates misaligned accesses with at most a performance
//! penalty, so an object constructed at the wrong address usually goes
//! unnoticed until it meets an architecture that faults. This crate
//! instruments the construction path instead of relying on hardware traps.
//!
//! ## Features
//! - A process-wide, replaceable violated-alignment handler with scoped
//!   [`HandlerGuard`](handler::HandlerGuard) installation
//! - Checked placement construction ([`placement::Slot`]) that consults the
//!   handler before writing to a misaligned address
//! - [`check_alignment_violation`] to assert that default, move and copy
//!   construction at a misaligned address are all caught
//! - [`AlignedNumber`], an over-aligned scalar wrapper with full arithmetic
//! - [`TestSuite`], an accumulating check reporter
//!
//! ## Handler outcomes
//!
//! A handler returns `Err(DebugAlignError::MisalignedAddress { .. })` to
//! reject a construction (nothing is written, nothing needs dropping) or
//! `Ok(())` to let it proceed with unaligned stores. The default handler
//! logs through the `log` facade and rejects.
//!
//! ## Invariant checking
//!
//! Bookkeeping checks (see [`DebugInvariants`]) run in debug builds, or in
//! release builds with the `strict-invariants` or `check-invariants`
//! feature enabled.

pub mod align;
pub mod align_error;
pub mod aligned_number;
pub mod debug_invariants;
pub mod handler;
pub mod placement;
pub mod test_suite;
pub mod violation_check;

pub use aligned_number::AlignedNumber;
pub use debug_invariants::DebugInvariants;
pub use test_suite::TestSuite;
pub use violation_check::{check_alignment_violation, check_alignment_violation_with};

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::align::{
        is_aligned, Align1, Align128, Align16, Align2, Align32, Align4, Align64, Align8, Alignment,
    };
    pub use crate::align_error::DebugAlignError;
    pub use crate::aligned_number::AlignedNumber;
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::handler::{
        check_alignment, default_handler, install_handler, install_shared, rejecting_handler,
        tolerating_handler, violated_alignment, violated_alignment_handler, HandlerGuard,
        ViolatedAlignmentHandler, Violation,
    };
    pub use crate::placement::{misaligned_offset, Placed, Scratch, Slot};
    pub use crate::test_suite::{CheckOutcome, Failure, TestSuite};
    pub use crate::violation_check::{check_alignment_violation, check_alignment_violation_with};
}
