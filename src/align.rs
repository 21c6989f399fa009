//! Alignment primitives.
//!
//! - [`is_aligned`] tests an address against a power-of-two alignment.
//! - [`aligned_offset`] finds the first properly aligned position inside a
//!   buffer that still leaves room for an object of a given size.
//! - [`Alignment`] and the `AlignN` markers let a type carry an alignment
//!   requirement as a zero-sized field (see [`crate::aligned_number`]).

use crate::align_error::DebugAlignError;

/// Returns `Ok(())` when `align` is a non-zero power of two.
#[inline]
pub fn validate_alignment(align: usize) -> Result<(), DebugAlignError> {
    if align.is_power_of_two() {
        Ok(())
    } else {
        Err(DebugAlignError::NotPowerOfTwo(align))
    }
}

/// True if `ptr` is a multiple of `align`.
///
/// `align` must be a power of two.
///
/// ```rust
/// # use debug_align::align::is_aligned;
/// assert!(is_aligned(16usize as *const u8, 8));
/// assert!(!is_aligned(17usize as *const u8, 8));
/// ```
#[inline]
pub fn is_aligned<P>(ptr: *const P, align: usize) -> bool {
    debug_assert!(align.is_power_of_two(), "alignment {align} is not a power of two");
    (ptr as *const u8 as usize) & (align - 1) == 0
}

/// Offset of the first `align`-aligned address in `[base, base + len)` that
/// leaves at least `size` bytes before the end of the buffer.
///
/// Returns `None` when no such position exists or when `align` is not a
/// power of two.
pub fn aligned_offset(base: *const u8, len: usize, align: usize, size: usize) -> Option<usize> {
    validate_alignment(align).ok()?;
    let addr = base as usize;
    let aligned = addr.checked_add(align - 1)? & !(align - 1);
    let offset = aligned - addr;
    let end = offset.checked_add(size)?;
    (end <= len).then_some(offset)
}

/// A zero-sized marker whose own alignment is [`Alignment::ALIGNMENT`].
///
/// Embedding `[A; 0]` in a `#[repr(C)]` struct raises the struct's alignment
/// to at least `A::ALIGNMENT` without changing its contents.
pub trait Alignment: Copy + Default + core::fmt::Debug + Send + Sync + 'static {
    const ALIGNMENT: usize;
}

macro_rules! alignment_marker {
    ($($name:ident => $n:literal),* $(,)?) => { $(
        #[doc = concat!("Zero-sized marker with ", stringify!($n), "-byte alignment.")]
        #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
        #[repr(align($n))]
        pub struct $name;

        impl Alignment for $name {
            const ALIGNMENT: usize = $n;
        }
    )* };
}

alignment_marker!(
    Align1 => 1,
    Align2 => 2,
    Align4 => 4,
    Align8 => 8,
    Align16 => 16,
    Align32 => 32,
    Align64 => 64,
    Align128 => 128,
);
