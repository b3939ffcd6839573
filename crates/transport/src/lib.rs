//! HTTP request executor adapter.
//!
//! Implements the [`contract::RequestExecutor`] trait over `reqwest`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** URL construction, header selection, body encoding,
//! cookie replay, and response parsing all live here. Callers see only
//! [`contract::RequestExecutor`] and [`contract::NormalizedResult`].
//!
//! ## Wire format
//!
//! | Content type | `Content-Type` header | Body |
//! |--------------|-----------------------|------|
//! | JSON | `application/json` | JSON text of the body (none when empty) |
//! | Multipart | set by the transport, with boundary | form parts as given |
//!
//! Every request carries `Authorization: Bearer <token>`, with an empty token
//! when none is stored. The client keeps a cookie jar so cookies set by the
//! backend are sent back on later requests.
//!
//! There are no retries. A timeout applies only when one is configured.

mod config;
mod executor;

pub use config::HttpConfig;
pub use executor::HttpRequestExecutor;
