//! Errors of the non-fatal mutex constructors.

use thiserror::Error;

use crate::Status;

/// Failure of one of the non-fatal mutex constructors.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum MutexError {
    /// Creating or configuring the attribute object failed.
    #[error("failed to prepare mutex attributes: pthread result {0}")]
    Attr(Status),
    /// `pthread_mutex_init` failed.
    #[error("failed to initialize mutex: pthread result {0}")]
    Init(Status),
}

impl MutexError {
    /// The pthread result behind the error.
    #[must_use]
    pub fn status(&self) -> Status {
        match *self {
            MutexError::Attr(status) | MutexError::Init(status) => status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_returns_underlying_code() {
        assert_eq!(MutexError::Attr(Status::BUSY).status(), Status::BUSY);
        assert_eq!(MutexError::Init(Status::BUSY).status(), Status::BUSY);
    }

    #[test]
    fn messages_name_stage_and_pthread_result() {
        let busy = format!("pthread result {} (", libc::EBUSY);

        let attr = MutexError::Attr(Status::BUSY).to_string();
        assert!(attr.starts_with("failed to prepare mutex attributes: "), "{attr}");
        assert!(attr.contains(&busy), "{attr}");

        let init = MutexError::Init(Status::BUSY).to_string();
        assert!(init.starts_with("failed to initialize mutex: "), "{init}");
        assert!(init.contains(&busy), "{init}");
        assert!(init.ends_with(&format!("({})", Status::BUSY.description())), "{init}");
    }
}
