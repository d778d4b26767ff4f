//! Operations on caller-owned `pthread_mutex_t` handles.
//!
//! Storage and lifetime of the handle stay with the caller. Functions named
//! `checked_*` route their result through [`check_at`] and abort on an
//! unexpected failure; [`init_recursive`] is the only one that returns every
//! status to the caller.
//!
//! [`PthreadMutex`](crate::PthreadMutex) wraps these behind a safe,
//! owning API.

use std::panic::Location;

use libc::pthread_mutex_t;

use crate::{MutexAttr, MutexKind, Status, check_at};

/// Initializes `mutex` as a recursive mutex.
///
/// A transient attribute object is created for the call and released before
/// returning, also when initialization fails. If the attribute object cannot
/// be prepared, its status is returned and `mutex` is left untouched.
///
/// # Arguments
///
/// * `mutex` - Caller-owned storage to initialize.
///
/// # Returns
///
/// The result of `pthread_mutex_init`, unchanged. This function never
/// aborts.
///
/// # Safety
///
/// `mutex` must point to writable, suitably aligned storage that is not an
/// initialized mutex and that will not move while the mutex is in use.
pub unsafe fn init_recursive(mutex: *mut pthread_mutex_t) -> Status {
    let attr = match MutexAttr::with_kind(MutexKind::Recursive) {
        Ok(attr) => attr,
        Err(err) => return err.status(),
    };
    // SAFETY: caller upholds the storage contract; `attr` is initialized.
    Status::from_raw(unsafe { libc::pthread_mutex_init(mutex, attr.as_ptr()) })
}

/// Initializes `mutex` with `attr`, or as an error-checking mutex if `attr`
/// is `None`.
///
/// Failures, including failure to build the default attributes, are fatal.
///
/// # Arguments
///
/// * `location` - Call site named in the diagnostic if the gate aborts.
/// * `mutex` - Caller-owned storage to initialize.
/// * `attr` - Attributes to use. With `None` a transient
///   [`MutexKind::ErrorCheck`] attribute object is built and released before
///   returning.
///
/// # Safety
///
/// Same contract as [`init_recursive`].
pub unsafe fn checked_mutex_init(
    location: &Location<'_>,
    mutex: *mut pthread_mutex_t,
    attr: Option<&MutexAttr>,
) -> Status {
    let fallback;
    let attr = match attr {
        Some(attr) => attr,
        None => {
            fallback = match MutexAttr::with_kind(MutexKind::ErrorCheck) {
                Ok(attr) => attr,
                Err(err) => return check_at(location, err.status()),
            };
            &fallback
        }
    };
    // SAFETY: caller upholds the storage contract; `attr` is initialized.
    let status = Status::from_raw(unsafe { libc::pthread_mutex_init(mutex, attr.as_ptr()) });
    check_at(location, status)
}

/// Tries to lock `mutex` without blocking.
///
/// [`Status::BUSY`] is returned as-is without reaching the gate, so
/// contention is never reported as a failure. Any other failure is fatal.
///
/// # Returns
///
/// [`Status::SUCCESS`] with the lock held, or [`Status::BUSY`].
///
/// # Safety
///
/// `mutex` must point to an initialized mutex.
pub unsafe fn checked_mutex_trylock(location: &Location<'_>, mutex: *mut pthread_mutex_t) -> Status {
    // SAFETY: caller guarantees `mutex` is initialized.
    let status = Status::from_raw(unsafe { libc::pthread_mutex_trylock(mutex) });
    if !status.is_busy() {
        check_at(location, status);
    }
    status
}

/// Locks `mutex`, blocking until it is available. Failures are fatal.
///
/// # Safety
///
/// `mutex` must point to an initialized mutex.
pub unsafe fn checked_mutex_lock(location: &Location<'_>, mutex: *mut pthread_mutex_t) -> Status {
    // SAFETY: caller guarantees `mutex` is initialized.
    check_at(location, Status::from_raw(unsafe { libc::pthread_mutex_lock(mutex) }))
}

/// Unlocks `mutex`. Failures are fatal.
///
/// # Safety
///
/// `mutex` must point to an initialized mutex. For kinds other than
/// [`MutexKind::ErrorCheck`] and [`MutexKind::Recursive`] the calling thread
/// must hold the lock.
pub unsafe fn checked_mutex_unlock(location: &Location<'_>, mutex: *mut pthread_mutex_t) -> Status {
    // SAFETY: caller upholds the ownership contract.
    check_at(location, Status::from_raw(unsafe { libc::pthread_mutex_unlock(mutex) }))
}

/// Destroys `mutex`. Failures, such as destroying a locked mutex, are fatal.
///
/// # Safety
///
/// `mutex` must point to an initialized mutex that no thread will use
/// afterwards.
pub unsafe fn checked_mutex_destroy(location: &Location<'_>, mutex: *mut pthread_mutex_t) -> Status {
    // SAFETY: caller guarantees `mutex` is initialized and unused from now on.
    check_at(location, Status::from_raw(unsafe { libc::pthread_mutex_destroy(mutex) }))
}
