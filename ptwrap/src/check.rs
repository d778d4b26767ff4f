//! Failure gate for pthread results.
//!
//! A pthread call that fails with anything other than a timeout means the
//! lock is corrupted or misused (invalid handle, deadlock, owner mismatch,
//! exhaustion mid-run). Continuing past that point is unsound, so the gate
//! reports the call site and aborts the process.

use std::{
    io::{self, Write},
    panic::Location,
    process,
};

use tracing::error;

use crate::Status;

/// Passes `status` through unless it is an unexpected failure.
///
/// [`Status::SUCCESS`] and [`Status::TIMED_OUT`] are returned unchanged.
/// Every other code is fatal: see [`fatal`].
#[inline]
pub fn check_at(location: &Location<'_>, status: Status) -> Status {
    if status.is_success() || status.is_timed_out() {
        return status;
    }
    fatal(location, status)
}

/// [`check_at`] using the caller's location.
#[inline]
#[track_caller]
pub fn check(status: Status) -> Status {
    check_at(Location::caller(), status)
}

/// Reports an unrecoverable pthread failure and aborts.
///
/// Writes one line of the form
/// `<file>:<line>: internal error: pthread result <code> (<description>)`
/// to stderr, then calls [`process::abort`]. Nothing is unwound.
#[cold]
#[inline(never)]
pub fn fatal(location: &Location<'_>, status: Status) -> ! {
    error!(
        file = location.file(),
        line = location.line(),
        code = status.code(),
        "unrecoverable pthread failure"
    );
    // A closed stderr must not turn this into a panic.
    let _ = writeln!(
        io::stderr().lock(),
        "{}:{}: internal error: pthread result {}",
        location.file(),
        location.line(),
        status
    );
    process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_passes_through() {
        assert_eq!(check(Status::SUCCESS), Status::SUCCESS);
    }

    #[test]
    fn timeout_passes_through() {
        assert_eq!(check(Status::TIMED_OUT), Status::TIMED_OUT);
        assert_eq!(
            check_at(Location::caller(), Status::TIMED_OUT),
            Status::TIMED_OUT
        );
    }
}
