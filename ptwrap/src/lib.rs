//! Error-checked pthread mutex helpers and portable thread naming.
//!
//! # Failure gate
//!
//! Every `checked_*` operation and every [`PthreadMutex`] lock passes its
//! pthread result through [`check_at`]. Success and [`Status::TIMED_OUT`]
//! are returned to the caller. Anything else means a corrupted or misused
//! lock: the call site is printed to stderr and the process aborts.
//!
//! ```text
//! src/player.rs:42: internal error: pthread result 35 (Resource deadlock avoided)
//! ```
//!
//! Try-lock contention ([`Status::BUSY`]) is reported back to the caller of
//! [`raw::checked_mutex_trylock`] and [`PthreadMutex::try_lock`] without
//! reaching the gate.
//!
//! # Mutexes
//!
//! [`raw`] works on `pthread_mutex_t` storage owned by the caller.
//! [`PthreadMutex`] owns its storage and hands out RAII guards:
//!
//! ```
//! # #[cfg(unix)] {
//! use ptwrap::PthreadMutex;
//!
//! // Error-checking by default: locking twice from one thread is fatal.
//! let mutex = PthreadMutex::new();
//! {
//!     let _guard = mutex.lock();
//!     assert!(std::thread::scope(|s| s.spawn(|| mutex.try_lock().is_none()).join().unwrap()));
//! }
//! assert!(mutex.try_lock().is_some());
//! # }
//! ```
//!
//! # Thread names
//!
//! [`set_thread_name`] names the calling thread with whatever the platform
//! offers; see [`NamingStrategy`].
//!
//! ```
//! std::thread::spawn(|| ptwrap::set_thread_name("demux")).join().unwrap();
//! ```
#![deny(missing_docs, clippy::unwrap_used)]

mod thread_name;

pub use thread_name::{NamingStrategy, naming_strategy, set_thread_name};

#[cfg(any(all(target_os = "linux", target_env = "gnu"), target_vendor = "apple"))]
pub use thread_name::current_thread_name;

#[cfg(unix)]
mod attr;
#[cfg(unix)]
mod check;
#[cfg(unix)]
mod error;
#[cfg(unix)]
mod mutex;
#[cfg(unix)]
pub mod raw;
#[cfg(unix)]
mod status;

#[cfg(unix)]
pub use attr::{MutexAttr, MutexKind};
#[cfg(unix)]
pub use check::{check, check_at, fatal};
#[cfg(unix)]
pub use error::MutexError;
#[cfg(unix)]
pub use mutex::{PthreadMutex, PthreadMutexGuard};
#[cfg(unix)]
pub use status::Status;
