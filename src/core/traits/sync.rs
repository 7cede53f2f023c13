//! Interrupt-safe access to state shared between contexts

/// Exclusive or shared access to a value owned by a lock
///
/// The mesh state is touched from the radio interrupt and from the
/// application. Both go through this trait so the lock is always released
/// before any radio or host-stack call.
///
/// ```
/// use rbc_mesh::core::traits::{MockState, SharedState};
/// use rbc_mesh_core::MeshCore;
///
/// let shared = MockState::new(MeshCore::new());
/// assert!(!shared.with(|mesh| mesh.is_initialized()));
/// ```
pub trait SharedState<T> {
    /// Run `f` with a shared borrow
    fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R;

    /// Run `f` with an exclusive borrow
    fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R;
}

/// Borrowed state, e.g. a `static` shared by several owners
impl<T, S: SharedState<T> + ?Sized> SharedState<T> for &S {
    fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        (**self).with(f)
    }

    fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        (**self).with_mut(f)
    }
}

#[cfg(feature = "embassy")]
use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

/// Critical-section guarded cell for target builds
///
/// Every access masks interrupts for the duration of the closure, so the
/// radio interrupt never observes a half-applied update. `new` is const so
/// the mesh can live in a `static`.
#[cfg(feature = "embassy")]
pub struct EmbassyState<T> {
    inner: Mutex<CriticalSectionRawMutex, core::cell::RefCell<T>>,
}

#[cfg(feature = "embassy")]
impl<T> EmbassyState<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(core::cell::RefCell::new(value)),
        }
    }
}

#[cfg(feature = "embassy")]
impl<T> SharedState<T> for EmbassyState<T> {
    fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        self.inner.lock(|cell| f(&cell.borrow()))
    }

    fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }
}

/// Single-threaded stand-in for host tests
///
/// # Panics
///
/// Re-entrant access (calling `with_mut` from inside another closure)
/// panics, which is also how a nested lock would show up on target.
pub struct MockState<T> {
    inner: core::cell::RefCell<T>,
}

impl<T> MockState<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: core::cell::RefCell::new(value),
        }
    }

    /// Unwrap the inner value
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T> SharedState<T> for MockState<T> {
    fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.inner.borrow())
    }

    fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        f(&mut self.inner.borrow_mut())
    }
}
