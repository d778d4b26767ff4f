//! Status codes returned by the pthread API.

use std::{
    ffi::{CStr, c_char, c_int},
    fmt, io,
};

/// Result code of a pthread call.
///
/// pthread functions report failure through their return value (an `errno`
/// constant) instead of setting `errno`. `Status` keeps that value as-is so it
/// can be handed back to callers unchanged.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(transparent)]
pub struct Status(c_int);

impl Status {
    /// The call succeeded.
    pub const SUCCESS: Self = Self(0);
    /// A timed wait ran out (`ETIMEDOUT`).
    pub const TIMED_OUT: Self = Self(libc::ETIMEDOUT);
    /// The lock is held by someone else (`EBUSY`).
    pub const BUSY: Self = Self(libc::EBUSY);

    /// Wraps a raw code returned by a pthread function.
    #[inline]
    #[must_use]
    pub const fn from_raw(code: c_int) -> Self {
        Self(code)
    }

    /// The raw code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> c_int {
        self.0
    }

    /// Returns `true` for [`Status::SUCCESS`].
    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` for [`Status::TIMED_OUT`].
    #[inline]
    #[must_use]
    pub const fn is_timed_out(self) -> bool {
        self.0 == libc::ETIMEDOUT
    }

    /// Returns `true` for [`Status::BUSY`].
    #[inline]
    #[must_use]
    pub const fn is_busy(self) -> bool {
        self.0 == libc::EBUSY
    }

    /// Converts into a `Result`, treating anything but success as an error.
    ///
    /// # Errors
    ///
    /// Returns `self` when it is not [`Status::SUCCESS`].
    #[inline]
    pub const fn into_result(self) -> Result<(), Status> {
        if self.is_success() { Ok(()) } else { Err(self) }
    }

    /// Platform description of the code, as produced by `strerror_r`.
    #[must_use]
    pub fn description(self) -> String {
        let mut buf = [0 as c_char; 256];
        // SAFETY: `buf` is writable for `buf.len()` bytes; the XSI variant
        // NUL-terminates the message when it returns 0.
        let rc = unsafe { libc::strerror_r(self.0, buf.as_mut_ptr(), buf.len()) };
        if rc != 0 {
            return format!("Unknown error {}", self.0);
        }
        // SAFETY: NUL-terminated by the successful call above.
        unsafe { CStr::from_ptr(buf.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.description())
    }
}

impl std::error::Error for Status {}

impl From<Status> for io::Error {
    fn from(status: Status) -> Self {
        io::Error::from_raw_os_error(status.0)
    }
}
