//! Error types for the SOMweb client.
//!
//! Most device calls never surface an error: transport failures are logged and
//! turned into a safe value (`false`, [`DoorStatus::Unknown`](crate::DoorStatus::Unknown),
//! `None`). What is left here are either precondition violations, which are
//! programming errors on the caller's side, or transport failures reported by a
//! [`Transport`](crate::http::Transport) to the client.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the SOMweb client and its transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The client has been closed and can no longer talk to the device.
    #[error("client is closed")]
    Closed,

    /// A state-changing door operation was attempted without a session token.
    #[error("not authenticated: call authenticate() first or supply a token")]
    NotAuthenticated,

    /// The device UDI is not a hexadecimal identifier.
    #[error("invalid SOMweb UDI '{udi}'")]
    InvalidUdi {
        /// The rejected identifier.
        udi: String,
    },

    /// The device URL could not be parsed.
    #[error("invalid SOMweb url '{url}'")]
    InvalidUrl {
        /// The rejected url.
        url: String,
    },

    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),

    /// The request could not be completed.
    #[error("request to {path} failed")]
    Request {
        /// Path relative to the device base url.
        path: String,
        /// The underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    /// The request did not complete within the per-request timeout.
    #[error("request to {path} timed out after {timeout:?}")]
    Timeout {
        /// Path relative to the device base url.
        path: String,
        /// The timeout that was exceeded.
        timeout: Duration,
    },
}

impl Error {
    /// Returns `true` for errors caused by misuse of the client rather than by the
    /// device or the network.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        match self {
            Error::Closed
            | Error::NotAuthenticated
            | Error::InvalidUdi { .. }
            | Error::InvalidUrl { .. } => true,
            Error::Build(_) | Error::Request { .. } | Error::Timeout { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_classification() {
        assert!(Error::Closed.is_precondition());
        assert!(Error::NotAuthenticated.is_precondition());
        assert!(Error::InvalidUdi { udi: "xyz".into() }.is_precondition());

        let err = Error::Timeout {
            path: "/blank.html".into(),
            timeout: Duration::from_secs(30),
        };
        assert!(!err.is_precondition());
    }

    #[test]
    fn test_messages() {
        let err = Error::InvalidUdi { udi: "nope".into() };
        assert_eq!(err.to_string(), "invalid SOMweb UDI 'nope'");

        let err = Error::Timeout {
            path: "/isg/statusDoor.php".into(),
            timeout: Duration::from_secs(2),
        };
        assert_eq!(
            err.to_string(),
            "request to /isg/statusDoor.php timed out after 2s"
        );
    }
}
