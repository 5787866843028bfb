//! Error taxonomy for uidrive.
//!
//! All driver, locator, session and executor failures are unified behind
//! [`DriverError`] so that consumers can classify them uniformly:
//! environment-class errors abort an invocation before any action runs,
//! per-action errors abort only the remaining action sequence, and
//! assertion failures are never surfaced through this type at all (they
//! are recorded by the pipeline and only influence the exit status).

use thiserror::Error;

/// Errors that can occur while driving a remote automation session.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The platform identifier is not one of the recognized values.
    #[error("unsupported platform '{0}' (expected ios, android or maccatalyst)")]
    UnsupportedPlatform(String),

    /// The requested action is not available on the selected platform.
    #[error("action '{action}' is not supported on {platform}")]
    UnsupportedAction {
        /// The action name as reported in spans and output.
        action: String,
        /// The platform that lacks the feature.
        platform: String,
    },

    /// No element matched the locator after the full resolution chain
    /// (and, for wait-class actions, the polling deadline).
    #[error("element '{locator}' not found after {waited_ms}ms")]
    ElementNotFound {
        /// The logical identifier that failed to resolve.
        locator: String,
        /// Total time spent resolving, including polling.
        waited_ms: u64,
    },

    /// The remote driver endpoint refused the connection.
    #[error("automation server unreachable at {0}")]
    ServerUnreachable(String),

    /// No booted simulator/emulator or connected device for the platform.
    #[error("no device available: {0}")]
    DeviceNotAvailable(String),

    /// The remote driver rejected the session capabilities.
    #[error("session creation failed: {0}")]
    SessionCreationFailed(String),

    /// The remote server returned a response the client could not interpret.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A wire operation exceeded its deadline.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred (e.g. writing a screenshot artifact).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// Returns true for environment-class failures that abort the entire
    /// invocation before any actions run (distinct exit code from an
    /// assertion or action failure).
    pub fn is_environment(&self) -> bool {
        matches!(
            self,
            DriverError::ServerUnreachable(_)
                | DriverError::DeviceNotAvailable(_)
                | DriverError::SessionCreationFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_classification() {
        assert!(DriverError::ServerUnreachable("http://localhost:4723".into()).is_environment());
        assert!(DriverError::DeviceNotAvailable("no booted simulator".into()).is_environment());
        assert!(DriverError::SessionCreationFailed("caps rejected".into()).is_environment());

        assert!(!DriverError::ElementNotFound { locator: "x".into(), waited_ms: 0 }.is_environment());
        assert!(!DriverError::Timeout.is_environment());
        assert!(!DriverError::Protocol("bad payload".into()).is_environment());
    }

    #[test]
    fn display_includes_context() {
        let err = DriverError::ElementNotFound { locator: "TipSlider".into(), waited_ms: 5000 };
        assert!(err.to_string().contains("TipSlider"));
        assert!(err.to_string().contains("5000"));

        let err = DriverError::UnsupportedAction {
            action: "press-key".into(),
            platform: "ios".into(),
        };
        assert!(err.to_string().contains("press-key"));
        assert!(err.to_string().contains("ios"));
    }
}
