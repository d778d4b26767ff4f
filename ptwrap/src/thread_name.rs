//! # Thread names
//!
//! Names the calling thread so it shows up in debuggers, profilers and
//! `top`-like tools. The platform mechanism is fixed at compile time; see
//! [`NamingStrategy`].

use std::ffi::{CString, c_char};

/// How [`set_thread_name`] talks to the platform on this target.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NamingStrategy {
    /// The name is passed through as-is (FreeBSD, OpenBSD, Windows).
    Unbounded,
    /// The platform rejects names longer than `capacity` bytes; those are
    /// cut to `capacity` bytes and applied again (Linux, Android).
    Truncating {
        /// Longest accepted name in bytes, excluding the terminator.
        capacity: usize,
    },
    /// The platform can only name the calling thread and takes no thread
    /// handle (Apple targets).
    SelfOnly,
    /// No naming facility; [`set_thread_name`] does nothing.
    Unavailable,
}

/// The naming strategy compiled in for this target.
#[must_use]
pub const fn naming_strategy() -> NamingStrategy {
    imp::STRATEGY
}

/// Sets the name of the current thread.
///
/// Best effort: a name the platform refuses is logged at debug level and
/// otherwise ignored. A name containing a NUL byte is cut at the first NUL.
///
/// # Arguments
///
/// * `name` - The name to show in debuggers and process monitors.
///
/// # Platform Behavior
///
/// - **Linux, Android**: `pthread_setname_np(pthread_self(), name)`. The
///   kernel keeps 15 bytes plus the terminator; a longer name is rejected
///   with `ERANGE`, so the first 15 bytes are copied into a zeroed buffer and
///   applied once more.
/// - **FreeBSD, OpenBSD**: `pthread_set_name_np(pthread_self(), name)`, name
///   passed through.
/// - **macOS, iOS and other Apple targets**: `pthread_setname_np(name)`,
///   which can only name the calling thread.
/// - **Windows**: `SetThreadDescription` with the UTF-16 form of `name`.
/// - **Other platforms**: No operation is performed.
///
/// [`naming_strategy`] reports which of these was compiled in.
///
/// # Example
///
/// ```
/// use ptwrap::{NamingStrategy, naming_strategy, set_thread_name};
///
/// std::thread::spawn(|| {
///     set_thread_name("audio-decoder-thread");
///     if let NamingStrategy::Truncating { capacity } = naming_strategy() {
///         assert!(capacity < "audio-decoder-thread".len());
///     }
/// })
/// .join()
/// .unwrap();
/// ```
pub fn set_thread_name(name: &str) {
    imp::set_current(name);
}

/// Reads back the OS-visible name of the current thread.
///
/// Returns `None` if the platform call fails.
#[cfg(any(all(target_os = "linux", target_env = "gnu"), target_vendor = "apple"))]
#[must_use]
pub fn current_thread_name() -> Option<String> {
    let mut buf = [0 as c_char; 64];
    // SAFETY: `buf` is writable for its full length; on success the name is
    // NUL-terminated within it.
    let rc = unsafe { libc::pthread_getname_np(libc::pthread_self(), buf.as_mut_ptr(), buf.len()) };
    if rc != 0 {
        return None;
    }
    // SAFETY: NUL-terminated by the successful call above.
    let name = unsafe { std::ffi::CStr::from_ptr(buf.as_ptr()) };
    Some(name.to_string_lossy().into_owned())
}

/// Converts `name` to a C string, stopping at the first NUL.
#[cfg_attr(not(any(unix, test)), allow(dead_code))]
fn c_name(name: &str) -> CString {
    let bytes = name.as_bytes();
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let mut owned = Vec::with_capacity(end + 1);
    owned.extend_from_slice(&bytes[..end]);
    // SAFETY: `owned` has no interior NUL because it stops before the first one.
    unsafe { CString::from_vec_unchecked(owned) }
}

/// Copies at most `N - 1` bytes of `name` into a zeroed buffer, leaving the
/// result NUL-terminated.
#[cfg_attr(not(any(target_os = "linux", target_os = "android", test)), allow(dead_code))]
fn truncated<const N: usize>(name: &[u8]) -> [c_char; N] {
    let mut buf = [0 as c_char; N];
    for (dst, &src) in buf.iter_mut().zip(name.iter().take(N.saturating_sub(1))) {
        *dst = src as c_char;
    }
    buf
}

#[cfg(any(target_os = "linux", target_os = "android"))]
mod imp {
    use tracing::debug;

    use super::{NamingStrategy, c_name, truncated};

    /// Kernel `TASK_COMM_LEN`, terminator included.
    const NAME_BUF_LEN: usize = 16;

    pub(super) const STRATEGY: NamingStrategy = NamingStrategy::Truncating {
        capacity: NAME_BUF_LEN - 1,
    };

    pub(super) fn set_current(name: &str) {
        let cname = c_name(name);
        // SAFETY: `cname` is a valid C string and the handle is this thread.
        let rc = unsafe { libc::pthread_setname_np(libc::pthread_self(), cname.as_ptr()) };
        if rc != libc::ERANGE {
            if rc != 0 {
                debug!(thread_name = name, rc, "pthread_setname_np failed");
            }
            return;
        }

        let short = truncated::<NAME_BUF_LEN>(cname.as_bytes());
        debug!(thread_name = name, limit = NAME_BUF_LEN - 1, "thread name truncated");
        // SAFETY: `short` is NUL-terminated by construction.
        let rc = unsafe { libc::pthread_setname_np(libc::pthread_self(), short.as_ptr()) };
        if rc != 0 {
            debug!(thread_name = name, rc, "pthread_setname_np failed after truncation");
        }
    }
}

#[cfg(any(target_os = "freebsd", target_os = "openbsd"))]
mod imp {
    use super::{NamingStrategy, c_name};

    pub(super) const STRATEGY: NamingStrategy = NamingStrategy::Unbounded;

    pub(super) fn set_current(name: &str) {
        let cname = c_name(name);
        // SAFETY: `cname` is a valid C string and the handle is this thread.
        unsafe { libc::pthread_set_name_np(libc::pthread_self(), cname.as_ptr()) };
    }
}

#[cfg(target_vendor = "apple")]
mod imp {
    use tracing::debug;

    use super::{NamingStrategy, c_name};

    pub(super) const STRATEGY: NamingStrategy = NamingStrategy::SelfOnly;

    pub(super) fn set_current(name: &str) {
        let cname = c_name(name);
        // SAFETY: `cname` is a valid C string; the call names this thread.
        let rc = unsafe { libc::pthread_setname_np(cname.as_ptr()) };
        if rc != 0 {
            debug!(thread_name = name, rc, "pthread_setname_np failed");
        }
    }
}

#[cfg(target_os = "windows")]
mod imp {
    use std::{ffi::OsStr, iter, os::windows::ffi::OsStrExt};

    use tracing::debug;
    use windows::{
        Win32::System::Threading::{GetCurrentThread, SetThreadDescription},
        core::PCWSTR,
    };

    use super::NamingStrategy;

    pub(super) const STRATEGY: NamingStrategy = NamingStrategy::Unbounded;

    pub(super) fn set_current(name: &str) {
        let end = name.find('\0').unwrap_or(name.len());
        let wide: Vec<u16> = OsStr::new(&name[..end])
            .encode_wide()
            .chain(iter::once(0))
            .collect();

        // SAFETY: `wide` is NUL-terminated UTF-16 and outlives the call; the
        // pseudo handle refers to this thread.
        let result = unsafe { SetThreadDescription(GetCurrentThread(), PCWSTR(wide.as_ptr())) };
        if let Err(err) = result {
            debug!(thread_name = name, %err, "SetThreadDescription failed");
        }
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "openbsd",
    target_vendor = "apple",
    target_os = "windows",
)))]
mod imp {
    use super::NamingStrategy;

    pub(super) const STRATEGY: NamingStrategy = NamingStrategy::Unavailable;

    pub(super) fn set_current(_name: &str) {}
}
