//! Cookie accessor adapters.
//!
//! Implements the [`contract::CookieAccessor`] trait with two backends:
//!
//! - [`MemoryCookieStore`]: a concurrent in-process map. Used by tests and by
//!   long-running processes that receive the token from elsewhere.
//! - [`FileCookieStore`]: a JSON object persisted on disk, so the token
//!   survives between CLI invocations.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Storage details live here. The executor sees only
//! [`contract::CookieAccessor`] and reads the token once per request.
//!
//! An empty stored value is reported as absent: both backends return
//! `Ok(None)` for it.

mod file;
mod memory;

pub use file::FileCookieStore;
pub use memory::MemoryCookieStore;
