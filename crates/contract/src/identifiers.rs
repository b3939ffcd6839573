//! Newtype identifiers.
//!
//! Endpoints and cookie names are both plain strings on the wire, but mixing
//! them up is always a bug, so each gets a distinct newtype. Empty values are
//! rejected at construction time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// A path relative to the configured backend base URL, query string included
    /// (e.g. `"/api/auth/validate-email?token=abc"`).
    ///
    /// The executor forms the request target by plain concatenation:
    /// `{base_url}{endpoint}`. No normalisation of slashes is performed.
    Endpoint
}

string_id! {
    /// Name of a value held by a cookie accessor.
    CookieName
}

impl CookieName {
    /// Name under which the bearer credential is stored.
    pub const AUTH_TOKEN: &'static str = "auth_token";

    /// The cookie that holds the bearer credential.
    pub fn auth_token() -> Self {
        Self(Self::AUTH_TOKEN.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed, generated locally
// ---------------------------------------------------------------------------

/// Identifies one executed request.
///
/// Generated fresh for every call that reaches the executor; recorded on the
/// request's tracing span and on any invalidation event that the call causes,
/// so a cache purge can be traced back to the mutation behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a new random request identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
