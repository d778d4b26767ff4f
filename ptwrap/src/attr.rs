//! Scoped mutex attribute objects.

use std::{ffi::c_int, fmt, mem::MaybeUninit};

use crate::{MutexError, Status};

/// Behavior of a mutex on re-lock and foreign unlock.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum MutexKind {
    /// Platform default. Misuse is undefined.
    #[default]
    Default,
    /// No error checking, no recursion. Re-locking deadlocks.
    Normal,
    /// Re-locking reports `EDEADLK`, unlocking a mutex held by another
    /// thread reports `EPERM`.
    ErrorCheck,
    /// The owning thread may lock again and must unlock as many times.
    Recursive,
}

impl MutexKind {
    fn raw(self) -> c_int {
        match self {
            MutexKind::Default => libc::PTHREAD_MUTEX_DEFAULT,
            MutexKind::Normal => libc::PTHREAD_MUTEX_NORMAL,
            MutexKind::ErrorCheck => libc::PTHREAD_MUTEX_ERRORCHECK,
            MutexKind::Recursive => libc::PTHREAD_MUTEX_RECURSIVE,
        }
    }
}

/// An initialized `pthread_mutexattr_t`, destroyed on drop.
///
/// The attribute object lives on the heap so the pointer handed to
/// `pthread_mutex_init` stays valid however the owner moves it.
pub struct MutexAttr {
    raw: Box<libc::pthread_mutexattr_t>,
    kind: MutexKind,
}

// SAFETY: the attribute object is plain configuration data. It is only
// mutated through `&mut self` and only read by `pthread_mutex_init`.
unsafe impl Send for MutexAttr {}
// SAFETY: see above.
unsafe impl Sync for MutexAttr {}

impl MutexAttr {
    /// Initializes an attribute object with the platform defaults.
    ///
    /// # Errors
    ///
    /// Returns [`MutexError::Attr`] if `pthread_mutexattr_init` fails.
    pub fn new() -> Result<Self, MutexError> {
        let mut raw = Box::new(MaybeUninit::<libc::pthread_mutexattr_t>::uninit());
        // SAFETY: `raw` points to writable storage for one attribute object.
        let status = Status::from_raw(unsafe { libc::pthread_mutexattr_init(raw.as_mut_ptr()) });
        if !status.is_success() {
            return Err(MutexError::Attr(status));
        }
        Ok(Self {
            // SAFETY: initialized by the successful call above.
            raw: unsafe { raw.assume_init() },
            kind: MutexKind::Default,
        })
    }

    /// Initializes an attribute object and sets its mutex kind.
    ///
    /// The object is released again if setting the kind fails.
    ///
    /// # Errors
    ///
    /// Returns [`MutexError::Attr`] if either pthread call fails.
    pub fn with_kind(kind: MutexKind) -> Result<Self, MutexError> {
        let mut attr = Self::new()?;
        attr.set_kind(kind)?;
        Ok(attr)
    }

    /// Sets the mutex kind.
    ///
    /// # Errors
    ///
    /// Returns [`MutexError::Attr`] if `pthread_mutexattr_settype` rejects
    /// the kind.
    pub fn set_kind(&mut self, kind: MutexKind) -> Result<(), MutexError> {
        // SAFETY: `self.raw` is an initialized attribute object.
        let status =
            Status::from_raw(unsafe { libc::pthread_mutexattr_settype(&mut *self.raw, kind.raw()) });
        status.into_result().map_err(MutexError::Attr)?;
        self.kind = kind;
        Ok(())
    }

    /// The kind last set on this object.
    #[must_use]
    pub fn kind(&self) -> MutexKind {
        self.kind
    }

    pub(crate) fn as_ptr(&self) -> *const libc::pthread_mutexattr_t {
        &*self.raw
    }
}

impl Drop for MutexAttr {
    fn drop(&mut self) {
        // SAFETY: initialized in `new` and not destroyed anywhere else.
        unsafe {
            libc::pthread_mutexattr_destroy(&mut *self.raw);
        }
    }
}

impl fmt::Debug for MutexAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutexAttr").field("kind", &self.kind).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_starts_with_default_kind() {
        let attr = MutexAttr::new().unwrap();
        assert_eq!(attr.kind(), MutexKind::Default);
    }

    #[test]
    fn with_kind_records_kind() {
        for kind in [
            MutexKind::Default,
            MutexKind::Normal,
            MutexKind::ErrorCheck,
            MutexKind::Recursive,
        ] {
            let attr = MutexAttr::with_kind(kind).unwrap();
            assert_eq!(attr.kind(), kind);
        }
    }

    #[test]
    fn set_kind_can_change_kind() {
        let mut attr = MutexAttr::with_kind(MutexKind::Recursive).unwrap();
        attr.set_kind(MutexKind::ErrorCheck).unwrap();
        assert_eq!(attr.kind(), MutexKind::ErrorCheck);
    }

    #[test]
    fn debug_shows_kind() {
        let attr = MutexAttr::with_kind(MutexKind::ErrorCheck).unwrap();
        assert_eq!(format!("{attr:?}"), "MutexAttr { kind: ErrorCheck }");
    }
}
