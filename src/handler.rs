//! The process-wide violated-alignment handler.
//!
//! Whenever a checked construction is about to place an object at an
//! address that does not satisfy its alignment, the active handler receives
//! a [`Violation`] and decides what happens:
//!
//! - `Err(DebugAlignError::MisalignedAddress { .. })` rejects the
//!   construction; nothing is written and no destructor will run.
//! - `Ok(())` tolerates it; the object is written with unaligned stores.
//!
//! Replace the handler with [`install_handler`], which returns a
//! [`HandlerGuard`]. Dropping the guard reinstates the handler that was
//! active before, on normal exit and during unwinding alike. Guards nest
//! with stack discipline: the innermost guard restores first.
//!
//! The handler is shared by the whole process. Install guards from one
//! thread at a time; tests that swap handlers run under `#[serial]`.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::align::is_aligned;
use crate::align_error::DebugAlignError;

/// Everything a handler learns about a misaligned construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Violation {
    /// `core::any::type_name` of the object being constructed.
    pub type_name: &'static str,
    /// Required alignment in bytes.
    pub expected: usize,
    /// Address the object was about to be constructed at.
    pub address: usize,
}

impl Violation {
    /// Describe a construction of `T` at `address`.
    pub fn of<T>(address: usize) -> Self {
        Violation {
            type_name: core::any::type_name::<T>(),
            expected: core::mem::align_of::<T>(),
            address,
        }
    }

    /// The misalignment signal matching this violation.
    pub fn to_error(&self) -> DebugAlignError {
        DebugAlignError::MisalignedAddress {
            type_name: self.type_name,
            expected: self.expected,
            address: self.address,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "address {:#x} not aligned to {} bytes for `{}`",
            self.address, self.expected, self.type_name
        )
    }
}

/// A shareable violated-alignment handler.
pub type ViolatedAlignmentHandler =
    Arc<dyn Fn(&Violation) -> Result<(), DebugAlignError> + Send + Sync>;

static HANDLER: Lazy<RwLock<ViolatedAlignmentHandler>> =
    Lazy::new(|| RwLock::new(default_handler()));

/// Logs the violation at `error` level and rejects the construction.
///
/// This is the handler active when no guard is installed.
pub fn default_handler() -> ViolatedAlignmentHandler {
    Arc::new(|v: &Violation| -> Result<(), DebugAlignError> {
        log::error!("alignment violation: {v}");
        Err(v.to_error())
    })
}

/// Rejects every violation without logging.
pub fn rejecting_handler() -> ViolatedAlignmentHandler {
    Arc::new(|v: &Violation| -> Result<(), DebugAlignError> { Err(v.to_error()) })
}

/// Logs the violation at `warn` level and lets the construction proceed.
pub fn tolerating_handler() -> ViolatedAlignmentHandler {
    Arc::new(|v: &Violation| -> Result<(), DebugAlignError> {
        log::warn!("tolerating alignment violation: {v}");
        Ok(())
    })
}

/// The handler currently in effect.
pub fn violated_alignment_handler() -> ViolatedAlignmentHandler {
    HANDLER.read().clone()
}

/// Swap in `handler` until the returned guard is dropped.
///
/// ```rust
/// # use debug_align::handler::*;
/// {
///     let _guard = install_shared(tolerating_handler());
///     assert!(violated_alignment(&Violation::of::<f64>(0x1001)).is_ok());
/// }
/// assert!(violated_alignment(&Violation::of::<f64>(0x1001)).is_err());
/// ```
#[must_use = "the previous handler is restored as soon as the guard is dropped"]
pub fn install_handler<H>(handler: H) -> HandlerGuard
where
    H: Fn(&Violation) -> Result<(), DebugAlignError> + Send + Sync + 'static,
{
    install_shared(Arc::new(handler))
}

/// [`install_handler`] for an already shared handler.
#[must_use = "the previous handler is restored as soon as the guard is dropped"]
pub fn install_shared(handler: ViolatedAlignmentHandler) -> HandlerGuard {
    let previous = std::mem::replace(&mut *HANDLER.write(), handler);
    log::debug!("violated-alignment handler installed");
    HandlerGuard {
        previous: Some(previous),
        _not_send: PhantomData,
    }
}

/// Report `violation` to the active handler.
///
/// The handler is cloned out of the lock before it runs, so a handler may
/// itself install or query handlers.
pub fn violated_alignment(violation: &Violation) -> Result<(), DebugAlignError> {
    let handler = violated_alignment_handler();
    handler(violation)
}

/// Consult the active handler if `addr` is not suitably aligned for `T`.
#[inline]
pub fn check_alignment<T>(addr: *const T) -> Result<(), DebugAlignError> {
    if is_aligned(addr, core::mem::align_of::<T>()) {
        Ok(())
    } else {
        violated_alignment(&Violation::of::<T>(addr as usize))
    }
}

/// Restores the previously active handler when dropped.
///
/// Cannot be cloned or sent to another thread: exactly one owner is
/// responsible for undoing an installation.
pub struct HandlerGuard {
    previous: Option<ViolatedAlignmentHandler>,
    _not_send: PhantomData<*const ()>,
}

impl fmt::Debug for HandlerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerGuard")
            .field("armed", &self.previous.is_some())
            .finish()
    }
}

impl Drop for HandlerGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            let replaced = std::mem::replace(&mut *HANDLER.write(), previous);
            // the outgoing handler may own state whose drop touches the handler
            drop(replaced);
            log::debug!("violated-alignment handler restored");
        }
    }
}
