// Consistent exit codes for the redraft CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/argument error
//   10 = command rejected (patch blocks failed, nothing to undo, ...)
//   11 = document locked by another writer
//   12 = document not found / nothing active
//   13 = store unreadable or unwritable

use std::process;

use redraft_common::protocol::Notification;
use redraft_engine::StoreError;

/// Machine-readable error codes, shared by stderr JSON and exit-code mapping.
pub mod codes {
    pub const ERROR: &str = "ERROR";
    pub const USAGE: &str = "USAGE";
    pub const COMMAND_REJECTED: &str = "COMMAND_REJECTED";
    pub const DOCUMENT_LOCKED: &str = "DOCUMENT_LOCKED";
    pub const DOCUMENT_NOT_FOUND: &str = "DOCUMENT_NOT_FOUND";
    pub const NO_ACTIVE_DOCUMENT: &str = "NO_ACTIVE_DOCUMENT";
    pub const STORE_FULL: &str = "STORE_FULL";
    pub const STORE_UNREADABLE: &str = "STORE_UNREADABLE";
    pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
}

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    Rejected = 10,
    Locked = 11,
    NotFound = 12,
    Storage = 13,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(rejected) = cause.downcast_ref::<Rejected>() {
                return Self::from_code(rejected.code);
            }
            if let Some(store_err) = cause.downcast_ref::<StoreError>() {
                return match store_err {
                    StoreError::NotFound(_) | StoreError::NoActiveDocument => Self::NotFound,
                    StoreError::CapacityExceeded { .. } => Self::Rejected,
                };
            }
            if cause.downcast_ref::<std::io::Error>().is_some() {
                return Self::Storage;
            }
        }

        let msg = format!("{err:#}");
        if msg.contains("not found") || msg.contains("no document is active") {
            return Self::NotFound;
        }
        if msg.contains("snapshot") {
            return Self::Storage;
        }

        Self::Error
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            codes::USAGE => Self::Usage,
            codes::DOCUMENT_LOCKED => Self::Locked,
            codes::DOCUMENT_NOT_FOUND | codes::NO_ACTIVE_DOCUMENT => Self::NotFound,
            codes::COMMAND_REJECTED | codes::STORE_FULL => Self::Rejected,
            codes::STORE_UNREADABLE => Self::Storage,
            _ => Self::Error,
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}

/// A command the dispatcher answered with a failed notification. Output has
/// already been printed; this only carries the exit status.
#[derive(Debug)]
pub struct Rejected {
    pub code: &'static str,
    pub message: String,
}

impl Rejected {
    pub fn usage(message: impl Into<String>) -> Self {
        Self { code: codes::USAGE, message: message.into() }
    }

    /// The first failed notification decides the code.
    pub fn from_notifications(notifications: &[Notification]) -> Option<Self> {
        let failed = notifications.iter().find(|notification| !notification.success)?;
        let message = failed.error_list().join("\n");
        Some(Self { code: classify_failure(&message), message })
    }
}

impl std::fmt::Display for Rejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for Rejected {}

/// Turns notifications into the command result: `Err` when any failed.
pub fn check_notifications(notifications: &[Notification]) -> anyhow::Result<()> {
    match Rejected::from_notifications(notifications) {
        Some(rejected) => Err(rejected.into()),
        None => Ok(()),
    }
}

fn classify_failure(message: &str) -> &'static str {
    if message.contains("is locked by") {
        codes::DOCUMENT_LOCKED
    } else if message.contains("no document is active") {
        codes::NO_ACTIVE_DOCUMENT
    } else if message.starts_with("document ") && message.contains("not found") {
        codes::DOCUMENT_NOT_FOUND
    } else if message.contains("document limit") {
        codes::STORE_FULL
    } else {
        codes::COMMAND_REJECTED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn exit_code_values() {
        assert_eq!(ExitCode::Success.code(), 0);
        assert_eq!(ExitCode::Error.code(), 1);
        assert_eq!(ExitCode::Usage.code(), 2);
        assert_eq!(ExitCode::Rejected.code(), 10);
        assert_eq!(ExitCode::Locked.code(), 11);
        assert_eq!(ExitCode::NotFound.code(), 12);
        assert_eq!(ExitCode::Storage.code(), 13);
    }

    #[test]
    fn from_code_maps_known_codes() {
        assert_eq!(ExitCode::from_code(codes::DOCUMENT_LOCKED), ExitCode::Locked);
        assert_eq!(ExitCode::from_code(codes::NO_ACTIVE_DOCUMENT), ExitCode::NotFound);
        assert_eq!(ExitCode::from_code(codes::STORE_FULL), ExitCode::Rejected);
        assert_eq!(ExitCode::from_code(codes::USAGE), ExitCode::Usage);
        assert_eq!(ExitCode::from_code("SOMETHING_ELSE"), ExitCode::Error);
    }

    #[test]
    fn store_errors_in_chain() {
        let err = anyhow::Error::new(StoreError::NoActiveDocument).context("undo failed");
        assert_eq!(ExitCode::from_error(&err), ExitCode::NotFound);

        let err = anyhow::Error::new(StoreError::CapacityExceeded { limit: 10 });
        assert_eq!(ExitCode::from_error(&err), ExitCode::Rejected);
    }

    #[test]
    fn io_errors_are_storage_failures() {
        let err = anyhow::Error::new(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "permission denied",
        ));
        assert_eq!(ExitCode::from_error(&err), ExitCode::Storage);
    }

    #[test]
    fn from_error_generic_is_error() {
        let err = anyhow::anyhow!("something went wrong");
        assert_eq!(ExitCode::from_error(&err), ExitCode::Error);
    }

    #[test]
    fn successful_notifications_pass() {
        let notifications = vec![Notification::success(Uuid::new_v4(), "a", "Deleted")];
        assert!(check_notifications(&notifications).is_ok());
    }

    #[test]
    fn first_failure_decides_the_code() {
        let id = Uuid::new_v4();
        let notifications = vec![
            Notification::success(id, "a", "Block 1: replaced 1 line with 1 line at line 1"),
            Notification::failure(Some(id), "b", "document is locked by ai"),
            Notification::failure(None, "c", "no document is active"),
        ];
        let err = check_notifications(&notifications).expect_err("one notification failed");
        assert_eq!(ExitCode::from_error(&err), ExitCode::Locked);

        let rejected =
            Rejected::from_notifications(&[Notification::failure(Some(id), "a", "Nothing to undo")])
                .expect("failed notification");
        assert_eq!(rejected.code, codes::COMMAND_REJECTED);
    }
}
