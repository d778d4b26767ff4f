//! Names a few worker threads and runs them against shared pthread mutexes.
//!
//! Set `RUST_LOG=ptwrap=debug` to see thread name truncation.

use std::thread::{self, JoinHandle};

use tracing::info;

const WORKERS: [&str; 3] = ["demux", "audio-decoder-thread", "video-output"];

fn main() {
    init_tracing();

    info!(strategy = ?ptwrap::naming_strategy(), "thread naming");

    #[cfg(unix)]
    run_workers();

    #[cfg(not(unix))]
    {
        let handles: Vec<_> = WORKERS
            .iter()
            .map(|&name| thread::spawn(move || ptwrap::set_thread_name(name)))
            .collect();
        join_workers(handles);
    }
}

#[cfg(unix)]
fn run_workers() {
    use std::sync::Arc;

    use ptwrap::PthreadMutex;

    let state = match PthreadMutex::recursive() {
        Ok(mutex) => Arc::new(mutex),
        Err(err) => {
            tracing::error!(%err, "cannot create shared lock");
            return;
        }
    };

    let handles: Vec<_> = WORKERS
        .iter()
        .map(|&name| {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                ptwrap::set_thread_name(name);

                let outer = state.lock();
                // Re-entering from the same thread is fine on a recursive lock.
                let inner = state.lock();
                info!(worker = name, os_name = ?visible_name(), "holding shared lock");
                drop(inner);
                drop(outer);

                let scratch = PthreadMutex::new();
                match scratch.try_lock() {
                    Some(_guard) => info!(worker = name, "scratch lock acquired"),
                    None => info!(worker = name, "scratch lock busy"),
                };
            })
        })
        .collect();

    join_workers(handles);
}

/// Joins every worker and returns how many of them panicked.
fn join_workers(handles: Vec<JoinHandle<()>>) -> usize {
    let mut panicked = 0;
    for handle in handles {
        if handle.join().is_err() {
            tracing::warn!("worker panicked");
            panicked += 1;
        }
    }
    panicked
}

#[cfg(any(all(target_os = "linux", target_env = "gnu"), target_vendor = "apple"))]
fn visible_name() -> Option<String> {
    ptwrap::current_thread_name()
}

#[cfg(all(
    unix,
    not(any(all(target_os = "linux", target_env = "gnu"), target_vendor = "apple"))
))]
fn visible_name() -> Option<String> {
    None
}

fn init_tracing() {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => match tracing_subscriber::EnvFilter::try_new("error,ptwrap=debug,example=info") {
            Ok(filter) => filter,
            Err(_) => tracing_subscriber::EnvFilter::new("error"),
        },
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_workers_counts_panicked_threads() {
        let failing: fn() = || panic!("decoder blew up");
        let handles = vec![
            thread::spawn(|| ptwrap::set_thread_name("healthy")),
            thread::spawn(failing),
            thread::spawn(|| {}),
        ];
        assert_eq!(join_workers(handles), 1);
    }
}
