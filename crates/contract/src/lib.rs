//! Request/response contract for the query context.
//!
//! This crate contains every value type, identifier, error type, and port trait
//! shared by the executor, the cookie stores, and the mutation/query contexts.
//! Infrastructure crates implement the traits defined here; they never change
//! the contract.
//!
//! ## Architectural Layer
//!
//! **Contract + port definitions.** This crate has no I/O dependencies.
//! It defines *what* a request and its result look like; adapter crates define
//! *how* they travel over the network or where the token is stored.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`Endpoint`, `CookieName`, `RequestId`) |
//! | [`types`] | `RequestDescriptor`, `RequestBody`, `MultipartForm`, `NormalizedResult` |
//! | [`errors`] | `RequestError`, `CookieError`, `ConfigError` |
//! | [`ports`] | `CookieAccessor` and `RequestExecutor` traits |
//! | [`models`] | Typed response shapes returned by the backend |
//! | [`forms`] | Client-side form validation contracts |

pub mod errors;
pub mod forms;
pub mod identifiers;
pub mod models;
pub mod ports;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{ConfigError, CookieError, FailureKind, RequestError};
pub use forms::{
    FormError, LoginForm, PasswordChange, ProfilePhoto, ProfileUpdate, Registration,
    ValidationEmailRequest,
};
pub use identifiers::{CookieName, Endpoint, RequestId};
pub use models::{
    Activity, EmailDispatch, FruitResult, History, ImageData, LoginResponse, MessageResponse,
    RegistrationResponse, SessionStatus, Statistics, User,
};
pub use ports::{CookieAccessor, RequestExecutor};
pub use types::{
    ContentType, FormPart, HttpMethod, MultipartForm, NormalizedResult, RequestBody,
    RequestDescriptor, Timestamp,
};
