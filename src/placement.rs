//! Checked placement construction into raw byte buffers.
//!
//! A [`Slot`] is a typed window at an arbitrary offset inside a buffer of
//! `MaybeUninit<u8>`. Constructing into it first asks
//! [`check_alignment`](crate::handler::check_alignment); on rejection the
//! buffer is left untouched, so there is nothing to destroy. When the
//! handler tolerates the violation the value is stored with an unaligned
//! write and ownership passes to a [`Placed`] handle, which reads and drops
//! it with unaligned accesses.
//!
//! [`Scratch`] provides stack storage large enough to hold a `T` at any
//! offset below `align_of::<T>()`.

use core::fmt;
use core::marker::PhantomData;
use core::mem::{self, MaybeUninit};
use core::ptr::NonNull;

use crate::align::aligned_offset;
use crate::align_error::DebugAlignError;
use crate::debug_invariants::DebugInvariants;
use crate::handler::check_alignment;

/// Stack storage for placing a `T` at a deliberately chosen offset.
///
/// Holds `2 * size_of::<T>()` bytes, which is at least
/// `align_of::<T>() + size_of::<T>()` whenever `align_of::<T>() <= size_of::<T>()`.
pub struct Scratch<T> {
    storage: MaybeUninit<[T; 2]>,
}

impl<T> Scratch<T> {
    pub fn new() -> Self {
        Scratch {
            storage: MaybeUninit::uninit(),
        }
    }

    /// The storage viewed as uninitialized bytes.
    pub fn bytes_mut(&mut self) -> &mut [MaybeUninit<u8>] {
        let len = mem::size_of::<[T; 2]>();
        // SAFETY: the storage is `len` bytes long, and every byte pattern
        // (including uninit) is valid for `MaybeUninit<u8>`.
        unsafe {
            core::slice::from_raw_parts_mut(
                self.storage.as_mut_ptr().cast::<MaybeUninit<u8>>(),
                len,
            )
        }
    }
}

impl<T> Default for Scratch<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Scratch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scratch")
            .field("len", &mem::size_of::<[T; 2]>())
            .finish()
    }
}

/// Offset of the first address in `buf` that is one byte past a
/// `T`-aligned address, with room for a `T` after it.
///
/// Returns `None` when the buffer cannot hold such a slot.
pub fn misaligned_offset<T>(buf: &[MaybeUninit<u8>]) -> Option<usize> {
    let size = mem::size_of::<T>();
    let aligned = aligned_offset(buf.as_ptr().cast(), buf.len(), mem::align_of::<T>(), size + 1)?;
    Some(aligned + 1)
}

/// A place inside a byte buffer where a `T` may be constructed.
pub struct Slot<'buf, T> {
    ptr: NonNull<T>,
    offset: usize,
    available: usize,
    _buf: PhantomData<&'buf mut [MaybeUninit<u8>]>,
}

impl<'buf, T> Slot<'buf, T> {
    /// Borrow `buf` as a slot for `T` starting at `offset`.
    ///
    /// # Errors
    /// `BufferTooSmall` if `offset + size_of::<T>()` exceeds `buf.len()`.
    pub fn new(buf: &'buf mut [MaybeUninit<u8>], offset: usize) -> Result<Self, DebugAlignError> {
        let needed = mem::size_of::<T>();
        let available = buf.len();
        let too_small = DebugAlignError::BufferTooSmall {
            offset,
            needed,
            available,
        };
        let end = offset.checked_add(needed).ok_or_else(|| too_small.clone())?;
        if end > available {
            return Err(too_small);
        }
        // SAFETY: `offset <= end <= buf.len()`, so the pointer stays within
        // (or one past) the borrowed buffer and is non-null.
        let ptr = unsafe { NonNull::new_unchecked(buf.as_mut_ptr().add(offset).cast::<T>()) };
        let slot = Slot {
            ptr,
            offset,
            available,
            _buf: PhantomData,
        };
        slot.debug_assert_invariants();
        Ok(slot)
    }

    /// The address a constructed `T` would occupy.
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Byte offset of the slot inside its buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// True if the slot satisfies `T`'s alignment.
    pub fn is_aligned(&self) -> bool {
        crate::align::is_aligned(self.as_ptr(), mem::align_of::<T>())
    }

    /// Construct `T::default()` in the slot.
    pub fn construct_default(&mut self) -> Result<Placed<'_, T>, DebugAlignError>
    where
        T: Default,
    {
        check_alignment(self.as_ptr())?;
        Ok(self.write(T::default()))
    }

    /// Move `value` into the slot.
    ///
    /// On rejection `value` is dropped here; it never reaches the buffer.
    pub fn construct(&mut self, value: T) -> Result<Placed<'_, T>, DebugAlignError> {
        check_alignment(self.as_ptr())?;
        Ok(self.write(value))
    }

    /// Clone `value` into the slot.
    pub fn construct_clone(&mut self, value: &T) -> Result<Placed<'_, T>, DebugAlignError>
    where
        T: Clone,
    {
        check_alignment(self.as_ptr())?;
        Ok(self.write(value.clone()))
    }

    fn write(&mut self, value: T) -> Placed<'_, T> {
        // SAFETY: `Slot::new` checked that `size_of::<T>()` bytes fit behind
        // `ptr`, and the exclusive borrow on `self` keeps the buffer alive and
        // unaliased while the `Placed` exists.
        unsafe { self.ptr.as_ptr().write_unaligned(value) };
        Placed {
            ptr: self.ptr,
            _slot: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Slot<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("type", &core::any::type_name::<T>())
            .field("offset", &self.offset)
            .field("aligned", &self.is_aligned())
            .finish()
    }
}

impl<T> DebugInvariants for Slot<'_, T> {
    fn validate_invariants(&self) -> Result<(), DebugAlignError> {
        let needed = mem::size_of::<T>();
        match self.offset.checked_add(needed) {
            Some(end) if end <= self.available => Ok(()),
            _ => Err(DebugAlignError::BufferTooSmall {
                offset: self.offset,
                needed,
                available: self.available,
            }),
        }
    }
}

/// A `T` that finished construction inside a [`Slot`].
///
/// Owns the value: dropping the handle runs `T`'s destructor exactly once.
pub struct Placed<'slot, T> {
    ptr: NonNull<T>,
    _slot: PhantomData<&'slot mut T>,
}

impl<T> Placed<'_, T> {
    /// Copy the value out.
    pub fn get(&self) -> T
    where
        T: Copy,
    {
        // SAFETY: the value was fully written by `Slot::write` and is still owned here.
        unsafe { self.ptr.as_ptr().read_unaligned() }
    }

    /// Move the value out, leaving the slot logically empty.
    pub fn into_inner(self) -> T {
        let this = mem::ManuallyDrop::new(self);
        // SAFETY: ownership is transferred to the caller and `Drop` is suppressed.
        unsafe { this.ptr.as_ptr().read_unaligned() }
    }

    /// Where the value lives.
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }
}

impl<T> Drop for Placed<'_, T> {
    fn drop(&mut self) {
        // SAFETY: the value is initialized and owned by this handle; reading
        // it out moves it onto the stack where it is dropped normally.
        drop(unsafe { self.ptr.as_ptr().read_unaligned() });
    }
}

impl<T: fmt::Debug> fmt::Debug for Placed<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // SAFETY: the bitwise copy is only borrowed for formatting and then
        // forgotten, so `T`'s destructor does not run here.
        let copy = mem::ManuallyDrop::new(unsafe { self.ptr.as_ptr().read_unaligned() });
        f.debug_tuple("Placed").field(&*copy).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{install_shared, rejecting_handler, tolerating_handler};
    use serial_test::serial;
    use std::cell::Cell;

    thread_local! {
        static DROPS: Cell<usize> = const { Cell::new(0) };
    }

    #[derive(Clone, Default, Debug)]
    struct Tracked(u64);

    impl Drop for Tracked {
        fn drop(&mut self) {
            DROPS.with(|d| d.set(d.get() + 1));
        }
    }

    fn drops() -> usize {
        DROPS.with(|d| d.get())
    }

    #[test]
    fn scratch_is_large_enough() {
        let mut s = Scratch::<f64>::new();
        let bytes = s.bytes_mut();
        assert!(bytes.len() >= mem::align_of::<f64>() + mem::size_of::<f64>());
        let off = misaligned_offset::<f64>(bytes).expect("room for a misaligned f64");
        assert!(off + mem::size_of::<f64>() <= bytes.len());
    }

    #[test]
    fn slot_rejects_out_of_bounds() {
        let mut s = Scratch::<u32>::new();
        let bytes = s.bytes_mut();
        let len = bytes.len();
        let err = Slot::<u32>::new(bytes, len - 2).unwrap_err();
        assert_eq!(
            err,
            DebugAlignError::BufferTooSmall {
                offset: len - 2,
                needed: 4,
                available: len,
            }
        );
    }

    #[test]
    #[serial]
    fn aligned_slot_constructs() {
        let mut s = Scratch::<u64>::new();
        let mut slot = Slot::<u64>::new(s.bytes_mut(), 0).unwrap();
        assert!(slot.is_aligned());
        let placed = slot.construct(42).unwrap();
        assert_eq!(placed.get(), 42);
    }

    #[test]
    #[serial]
    fn misaligned_slot_is_rejected_without_writing() {
        let _g = install_shared(rejecting_handler());
        let mut s = Scratch::<Tracked>::new();
        let bytes = s.bytes_mut();
        let off = misaligned_offset::<Tracked>(bytes).unwrap();
        let mut slot = Slot::<Tracked>::new(bytes, off).unwrap();
        assert!(!slot.is_aligned());

        let before = drops();
        assert!(slot.construct_default().unwrap_err().is_misaligned());
        // the default value was never created
        assert_eq!(drops(), before);

        let original = Tracked(7);
        assert!(slot.construct_clone(&original).unwrap_err().is_misaligned());
        assert_eq!(drops(), before);

        // the moved-in value comes back out through its normal drop, once
        assert!(slot.construct(Tracked(9)).unwrap_err().is_misaligned());
        assert_eq!(drops(), before + 1);
    }

    #[test]
    #[serial]
    fn tolerated_construction_drops_exactly_once() {
        let _g = install_shared(tolerating_handler());
        let mut s = Scratch::<Tracked>::new();
        let bytes = s.bytes_mut();
        let off = misaligned_offset::<Tracked>(bytes).unwrap();
        let mut slot = Slot::<Tracked>::new(bytes, off).unwrap();

        let before = drops();
        {
            let placed = slot.construct(Tracked(3)).unwrap();
            assert_eq!(format!("{placed:?}"), "Placed(Tracked(3))");
            assert_eq!(drops(), before);
        }
        assert_eq!(drops(), before + 1);

        let placed = slot.construct_default().unwrap();
        let inner = placed.into_inner();
        assert_eq!(inner.0, 0);
        assert_eq!(drops(), before + 1);
        drop(inner);
        assert_eq!(drops(), before + 2);
    }
}
