//! Owned pthread mutex handle.

use std::{fmt, marker::PhantomData, mem::MaybeUninit, panic::Location, ptr::NonNull};

use tracing::warn;

use crate::{
    MutexAttr, MutexError, MutexKind, Status,
    raw::{self, checked_mutex_lock, checked_mutex_trylock, checked_mutex_unlock},
};

/// A `pthread_mutex_t` owned by Rust.
///
/// The OS object is heap-allocated so it never moves after initialization.
/// The handle guards no data of its own; it is meant for code that needs the
/// exact pthread semantics (recursive or error-checking locks).
///
/// Lock failures other than contention go through the failure gate and abort
/// the process, reporting the line that called [`lock`](Self::lock) or
/// [`try_lock`](Self::try_lock).
///
/// # Example
///
/// ```
/// # #[cfg(unix)] {
/// use ptwrap::PthreadMutex;
///
/// let mutex = PthreadMutex::recursive().unwrap();
/// let outer = mutex.lock();
/// let inner = mutex.lock();
/// drop(inner);
/// drop(outer);
/// # }
/// ```
pub struct PthreadMutex {
    raw: NonNull<libc::pthread_mutex_t>,
    kind: MutexKind,
}

// SAFETY: pthread mutexes are designed to be shared between threads, and the
// storage is owned by this handle.
unsafe impl Send for PthreadMutex {}
// SAFETY: see above.
unsafe impl Sync for PthreadMutex {}

fn alloc() -> NonNull<libc::pthread_mutex_t> {
    let slot = Box::new(MaybeUninit::<libc::pthread_mutex_t>::uninit());
    NonNull::from(Box::leak(slot)).cast()
}

/// # Safety
///
/// `raw` must come from [`alloc`] and hold no initialized mutex.
unsafe fn dealloc(raw: NonNull<libc::pthread_mutex_t>) {
    // SAFETY: allocated by `alloc` as a boxed `MaybeUninit`.
    drop(unsafe { Box::from_raw(raw.cast::<MaybeUninit<libc::pthread_mutex_t>>().as_ptr()) });
}

impl PthreadMutex {
    /// Creates an error-checking mutex.
    ///
    /// Aborts if the mutex cannot be initialized.
    #[track_caller]
    #[must_use]
    pub fn new() -> Self {
        let raw = alloc();
        // SAFETY: fresh storage from `alloc`.
        unsafe { raw::checked_mutex_init(Location::caller(), raw.as_ptr(), None) };
        Self {
            raw,
            kind: MutexKind::ErrorCheck,
        }
    }

    /// Creates a mutex configured by `attr`.
    ///
    /// Aborts if the mutex cannot be initialized.
    #[track_caller]
    #[must_use]
    pub fn with_attr(attr: &MutexAttr) -> Self {
        let raw = alloc();
        // SAFETY: fresh storage from `alloc`.
        unsafe { raw::checked_mutex_init(Location::caller(), raw.as_ptr(), Some(attr)) };
        Self {
            raw,
            kind: attr.kind(),
        }
    }

    /// Creates a recursive mutex.
    ///
    /// # Errors
    ///
    /// Returns [`MutexError::Init`] with the pthread result if
    /// initialization fails.
    pub fn recursive() -> Result<Self, MutexError> {
        let raw = alloc();
        // SAFETY: fresh storage from `alloc`.
        let status = unsafe { raw::init_recursive(raw.as_ptr()) };
        if !status.is_success() {
            // SAFETY: initialization failed, nothing to destroy.
            unsafe { dealloc(raw) };
            return Err(MutexError::Init(status));
        }
        Ok(Self {
            raw,
            kind: MutexKind::Recursive,
        })
    }

    /// The kind this mutex was created with.
    #[must_use]
    pub fn kind(&self) -> MutexKind {
        self.kind
    }

    /// Blocks until the lock is acquired.
    ///
    /// On an error-checking mutex, locking again from the owning thread is a
    /// fatal `EDEADLK`.
    #[track_caller]
    pub fn lock(&self) -> PthreadMutexGuard<'_> {
        let location = Location::caller();
        // SAFETY: `self.raw` is initialized for the lifetime of `self`.
        unsafe { checked_mutex_lock(location, self.raw.as_ptr()) };
        PthreadMutexGuard::new(self, location)
    }

    /// Acquires the lock if it is free.
    ///
    /// Returns `None` when the lock is held elsewhere.
    #[track_caller]
    pub fn try_lock(&self) -> Option<PthreadMutexGuard<'_>> {
        let location = Location::caller();
        // SAFETY: `self.raw` is initialized for the lifetime of `self`.
        let status = unsafe { checked_mutex_trylock(location, self.raw.as_ptr()) };
        if status.is_busy() {
            return None;
        }
        Some(PthreadMutexGuard::new(self, location))
    }

    /// Unlocks without going through the failure gate and returns the raw
    /// result.
    ///
    /// Used to release a lock whose guard was passed to [`std::mem::forget`].
    /// On an error-checking mutex, calling this from a thread that does not
    /// hold the lock yields `EPERM`.
    ///
    /// # Safety
    ///
    /// For [`MutexKind::Default`] and [`MutexKind::Normal`] the calling thread
    /// must hold the lock and no live guard may refer to that acquisition.
    pub unsafe fn force_unlock(&self) -> Status {
        // SAFETY: initialized; ownership contract is on the caller.
        Status::from_raw(unsafe { libc::pthread_mutex_unlock(self.raw.as_ptr()) })
    }

    /// Pointer to the underlying OS object, valid as long as `self`.
    #[must_use]
    pub fn as_ptr(&self) -> *mut libc::pthread_mutex_t {
        self.raw.as_ptr()
    }
}

impl Default for PthreadMutex {
    #[track_caller]
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PthreadMutex {
    fn drop(&mut self) {
        // SAFETY: initialized, and `&mut self` rules out live guards.
        let status = Status::from_raw(unsafe { libc::pthread_mutex_destroy(self.raw.as_ptr()) });
        if !status.is_success() {
            // Still locked through a forgotten guard; freeing would pull the
            // storage out from under the OS object.
            warn!(%status, kind = ?self.kind, "leaking pthread mutex that could not be destroyed");
            return;
        }
        // SAFETY: destroyed above.
        unsafe { dealloc(self.raw) };
    }
}

impl fmt::Debug for PthreadMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PthreadMutex")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Holds a [`PthreadMutex`] locked until dropped.
///
/// Not `Send`: pthread requires the unlocking thread to be the owner.
#[must_use = "if unused the mutex will immediately unlock"]
pub struct PthreadMutexGuard<'a> {
    mutex: &'a PthreadMutex,
    location: &'static Location<'static>,
    _not_send: PhantomData<*const ()>,
}

// SAFETY: sharing a guard between threads only exposes `&PthreadMutex`,
// which is `Sync`.
unsafe impl Sync for PthreadMutexGuard<'_> {}

impl<'a> PthreadMutexGuard<'a> {
    fn new(mutex: &'a PthreadMutex, location: &'static Location<'static>) -> Self {
        Self {
            mutex,
            location,
            _not_send: PhantomData,
        }
    }

    /// The mutex this guard holds.
    #[must_use]
    pub fn mutex(&self) -> &'a PthreadMutex {
        self.mutex
    }
}

impl Drop for PthreadMutexGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: the guard proves this thread holds the lock.
        unsafe { checked_mutex_unlock(self.location, self.mutex.raw.as_ptr()) };
    }
}

impl fmt::Debug for PthreadMutexGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PthreadMutexGuard")
            .field("kind", &self.mutex.kind)
            .field("locked_at", &format_args!("{}:{}", self.location.file(), self.location.line()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{mem, sync::mpsc, thread};

    use super::*;

    #[test]
    fn new_is_error_checking() {
        assert_eq!(PthreadMutex::new().kind(), MutexKind::ErrorCheck);
        assert_eq!(PthreadMutex::default().kind(), MutexKind::ErrorCheck);
    }

    #[test]
    fn with_attr_takes_kind_from_attributes() {
        let attr = MutexAttr::with_kind(MutexKind::Normal).unwrap();
        let mutex = PthreadMutex::with_attr(&attr);
        drop(attr);
        assert_eq!(mutex.kind(), MutexKind::Normal);
        let _guard = mutex.lock();
    }

    #[test]
    fn recursive_mutex_relocks_on_owner_thread() {
        let mutex = PthreadMutex::recursive().unwrap();
        assert_eq!(mutex.kind(), MutexKind::Recursive);
        let first = mutex.lock();
        let second = mutex.lock();
        let third = mutex.try_lock();
        assert!(third.is_some());
        drop(third);
        drop(second);
        drop(first);
    }

    #[test]
    fn recursive_mutex_blocks_others_until_fully_released() {
        let mutex = PthreadMutex::recursive().unwrap();
        let contend = || thread::scope(|s| s.spawn(|| mutex.try_lock().is_some()).join().unwrap());

        let first = mutex.lock();
        let second = mutex.lock();
        assert!(!contend());

        drop(second);
        assert!(!contend());

        drop(first);
        assert!(contend());
    }

    #[test]
    fn error_checking_mutex_rejects_foreign_unlock() {
        let mutex = PthreadMutex::new();
        let (locked_tx, locked_rx) = mpsc::channel();
        let (unlocked_tx, unlocked_rx) = mpsc::channel::<()>();

        thread::scope(|s| {
            let owner = &mutex;
            s.spawn(move || {
                mem::forget(owner.lock());
                locked_tx.send(()).unwrap();
                unlocked_rx.recv().unwrap();
                // SAFETY: this thread took the lock above.
                assert_eq!(unsafe { owner.force_unlock() }, Status::SUCCESS);
            });

            locked_rx.recv().unwrap();
            // SAFETY: error-checking mutex, foreign unlock is reported.
            let status = unsafe { mutex.force_unlock() };
            assert_eq!(status, Status::from_raw(libc::EPERM));
            unlocked_tx.send(()).unwrap();
        });

        assert!(mutex.try_lock().is_some());
    }

    #[test]
    fn try_lock_leaves_mutex_locked() {
        let mutex = PthreadMutex::new();
        let guard = mutex.try_lock().expect("free mutex");
        let taken = thread::scope(|s| s.spawn(|| mutex.try_lock().is_some()).join().unwrap());
        assert!(!taken);
        drop(guard);
    }

    #[test]
    fn destroy_reports_busy_while_locked() {
        let mutex = PthreadMutex::new();
        mem::forget(mutex.lock());
        // SAFETY: the mutex is initialized; a failed destroy leaves it intact.
        let status = Status::from_raw(unsafe { libc::pthread_mutex_destroy(mutex.as_ptr()) });
        assert_eq!(status, Status::BUSY);
        // SAFETY: this thread took the lock above and its guard is gone.
        assert_eq!(unsafe { mutex.force_unlock() }, Status::SUCCESS);
    }

    #[test]
    fn dropping_locked_mutex_leaks_instead_of_aborting() {
        let mutex = PthreadMutex::recursive().unwrap();
        mem::forget(mutex.lock());
        mem::forget(mutex.lock());
        drop(mutex);

        let checked = PthreadMutex::new();
        mem::forget(checked.lock());
        drop(checked);
    }

    #[test]
    fn mutex_is_usable_after_move() {
        let mutex = PthreadMutex::recursive().unwrap();
        let moved = vec![mutex];
        let _guard = moved[0].lock();
    }

    #[test]
    fn guard_debug_names_lock_site() {
        let mutex = PthreadMutex::new();
        let guard = mutex.lock();
        let shown = format!("{guard:?}");
        assert!(shown.contains(file!()), "{shown}");
        assert!(shown.contains("ErrorCheck"));
    }
}
