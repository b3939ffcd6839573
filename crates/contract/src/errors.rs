//! Error types for the query context.
//!
//! [`RequestError`] is the typed form of "the call could not complete". It is
//! what adapters return; the null-returning entry points collapse it to `None`
//! after logging it. An HTTP error status with a readable JSON body is *not* a
//! [`RequestError`]; it is a normal [`crate::NormalizedResult`].
//!
//! [`CookieError`] is produced by cookie accessors, [`ConfigError`] only at
//! startup.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Request failures
// ---------------------------------------------------------------------------

/// Coarse category of a [`RequestError`], for assertions and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Parse,
    InvalidDescriptor,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Transport => "transport",
            Self::Parse => "parse",
            Self::InvalidDescriptor => "invalid_descriptor",
        })
    }
}

/// Reasons a request produced no [`crate::NormalizedResult`].
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestError {
    /// No response could be obtained.
    ///
    /// Produced by: connection refused, DNS failure, TLS failure, a timeout in
    /// the underlying client, or a cookie accessor that could not be read.
    #[error("Transport failure calling '{endpoint}': {message}")]
    Transport {
        /// Endpoint the request targeted.
        endpoint: String,
        /// Description of the underlying failure.
        message: String,
    },

    /// A response arrived but its body could not be used.
    ///
    /// Produced by: a body that is not valid JSON (including an empty body), or
    /// a JSON body that does not match the type the caller asked for.
    #[error("Unreadable response from '{endpoint}': {message}")]
    Parse {
        /// Endpoint the request targeted.
        endpoint: String,
        /// Status of the response, when one was received.
        status_code: Option<u16>,
        /// Description of the parse or decode failure.
        message: String,
    },

    /// The descriptor was rejected before anything was sent.
    #[error("Invalid request descriptor: {reason}")]
    InvalidDescriptor {
        /// Why the descriptor was rejected.
        reason: String,
    },
}

impl RequestError {
    /// Returns the category of this failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport { .. } => FailureKind::Transport,
            Self::Parse { .. } => FailureKind::Parse,
            Self::InvalidDescriptor { .. } => FailureKind::InvalidDescriptor,
        }
    }
}

// ---------------------------------------------------------------------------
// Cookie accessor failures
// ---------------------------------------------------------------------------

/// Errors raised by a [`crate::CookieAccessor`].
///
/// A missing cookie is not an error; accessors return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum CookieError {
    /// The backing storage could not be read or written.
    #[error("Cookie storage I/O error at '{path}': {source}")]
    Io {
        /// Location of the backing storage.
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The backing storage exists but does not hold a valid cookie map.
    #[error("Cookie storage at '{path}' is corrupt: {message}")]
    Corrupt {
        /// Location of the backing storage.
        path: String,
        /// Description of what is wrong with the content.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Configuration failures
// ---------------------------------------------------------------------------

/// Configuration problems detected at startup.
///
/// The executor is never constructed from an invalid configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting was not supplied.
    #[error("Missing configuration value: {key}")]
    Missing {
        /// Name of the missing setting (usually the environment variable).
        key: String,
    },

    /// A setting was supplied but cannot be used.
    #[error("Invalid configuration value for {key}: {message}")]
    Invalid {
        /// Name of the offending setting.
        key: String,
        /// Description of the problem.
        message: String,
    },
}
