//! Deliberately violate a type's alignment and verify it is caught.
//!
//! [`check_alignment_violation`] places a `T` one byte past a properly
//! aligned address and attempts default, move and copy construction there.
//! Each attempt must be rejected by the violated-alignment handler; an
//! attempt that completes is recorded as a failure in the caller's
//! [`TestSuite`] and the harness moves on to the next attempt.

use core::marker::PhantomData;
use core::mem;

use crate::align::is_aligned;
use crate::handler::{install_shared, rejecting_handler, ViolatedAlignmentHandler};
use crate::placement::{misaligned_offset, Scratch, Slot};
use crate::test_suite::TestSuite;

/// Post-monomorphization guard: the scratch buffer only has room for a
/// misaligned `T` when `T`'s alignment does not exceed its size.
struct FitsScratch<T>(PhantomData<T>);

impl<T> FitsScratch<T> {
    const OK: () = assert!(
        mem::align_of::<T>() <= mem::size_of::<T>(),
        "alignment must not exceed size"
    );
}

/// Check that constructing `T` at a misaligned address is rejected.
///
/// Installs a rejecting handler for the duration of the check, so the
/// outcome does not depend on whichever handler the caller has active.
/// Records four checks in `suite`: the misalignment sanity check, then one
/// each for default, move and copy construction.
pub fn check_alignment_violation<T>(suite: &mut TestSuite)
where
    T: Default + Clone,
{
    check_alignment_violation_with::<T>(suite, rejecting_handler());
}

/// [`check_alignment_violation`] with an explicit handler.
///
/// A handler that does not reject lets every construction complete, and
/// each one is then reported as "misaligned address was not caught".
pub fn check_alignment_violation_with<T>(suite: &mut TestSuite, handler: ViolatedAlignmentHandler)
where
    T: Default + Clone,
{
    let () = FitsScratch::<T>::OK;
    let type_name = core::any::type_name::<T>();
    let _guard = install_shared(handler);

    let mut scratch = Scratch::<T>::new();
    let bytes = scratch.bytes_mut();
    let Some(offset) = misaligned_offset::<T>(bytes) else {
        suite
            .check(false, "misalign address")
            .message(format_args!("no room to misalign {type_name}"));
        return;
    };
    let mut slot = match Slot::<T>::new(bytes, offset) {
        Ok(slot) => slot,
        Err(e) => {
            suite.check(false, "misalign address").message(e);
            return;
        }
    };
    suite
        .check(
            !is_aligned(slot.as_ptr(), mem::align_of::<T>()),
            "misalign address",
        )
        .message(format_args!("could not misalign an address for {type_name}"));

    suite
        .check_rejected(slot.construct_default(), "default construct")
        .message(format_args!("misaligned address was not caught for {type_name}"));

    suite
        .check_rejected(slot.construct(T::default()), "move construct")
        .message(format_args!("misaligned address was not caught for {type_name}"));

    let original = T::default();
    suite
        .check_rejected(slot.construct_clone(&original), "copy construct")
        .message(format_args!("misaligned address was not caught for {type_name}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align_error::DebugAlignError;
    use crate::handler::{install_handler, tolerating_handler, violated_alignment, Violation};
    use serial_test::serial;
    use std::sync::Arc;

    #[test]
    #[serial]
    fn f64_misalignment_is_detected_three_times() {
        let mut t = TestSuite::new("f64");
        check_alignment_violation::<f64>(&mut t);
        assert!(t.good(), "{}", t.report());
        assert_eq!(t.checks(), 4);
    }

    #[test]
    #[serial]
    fn do_nothing_handler_yields_three_failures() {
        let mut t = TestSuite::new("tolerant");
        let ignore = |_: &Violation| -> Result<(), DebugAlignError> { Ok(()) };
        check_alignment_violation_with::<f64>(&mut t, Arc::new(ignore));
        let names: Vec<_> = t.failures().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["default construct", "move construct", "copy construct"]);
        for f in t.failures() {
            assert!(f.message.contains("misaligned address was not caught for f64"));
        }
    }

    #[test]
    #[serial]
    fn callers_handler_is_restored() {
        let _outer = install_handler(|_: &Violation| Ok(()));
        let mut t = TestSuite::unnamed();
        check_alignment_violation::<u32>(&mut t);
        assert!(t.good(), "{}", t.report());
        assert!(violated_alignment(&Violation::of::<u32>(0x1001)).is_ok());
    }

    #[test]
    #[serial]
    fn single_byte_types_cannot_be_misaligned() {
        let mut t = TestSuite::unnamed();
        check_alignment_violation_with::<u8>(&mut t, tolerating_handler());
        // every address is aligned for u8: the sanity check and all three
        // construction checks fail
        assert_eq!(t.failures().len(), 4);
        assert_eq!(t.failures()[0].name, "misalign address");
    }
}
