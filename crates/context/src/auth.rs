//! Session check and login.

use std::sync::Arc;

use contract::{
    ContentType, CookieAccessor, CookieError, CookieName, Endpoint, FormError, LoginForm,
    LoginResponse, RequestDescriptor, RequestError, RequestExecutor, SessionStatus, User,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::MutationContext;

/// Endpoint that reports whether the bearer token is still valid.
pub const IS_AUTHENTICATED_ENDPOINT: &str = "/api/auth/is-authenticated/";

/// Asks the backend who the current bearer token belongs to.
///
/// The check is a `POST` but changes nothing, so it goes straight to the
/// executor and never triggers invalidation. What to do with an anonymous
/// session (redirect to login, show a banner) is the caller's decision.
#[derive(Clone)]
pub struct SessionService {
    executor: Arc<dyn RequestExecutor>,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService").finish_non_exhaustive()
    }
}

impl SessionService {
    pub fn new(executor: Arc<dyn RequestExecutor>) -> Self {
        Self { executor }
    }

    /// # Errors
    ///
    /// [`RequestError`] when the check could not complete or the reply is not
    /// a session status.
    pub async fn current_session(&self) -> Result<SessionStatus, RequestError> {
        let endpoint = Endpoint::new(IS_AUTHENTICATED_ENDPOINT).ok_or_else(|| {
            RequestError::InvalidDescriptor {
                reason: "empty session endpoint".to_owned(),
            }
        })?;
        // Bodiless, so no Content-Type header is sent.
        let descriptor = RequestDescriptor {
            content_type: ContentType::Multipart,
            ..RequestDescriptor::mutation(endpoint.clone())
        };
        let result = self.executor.execute(descriptor).await?;
        let status: SessionStatus = result.decode(&endpoint)?;
        debug!(is_authenticated = status.is_authenticated, "Session checked");
        Ok(status)
    }

    /// The authenticated user, or `None` when anonymous or when the check failed.
    pub async fn current_user(&self) -> Option<User> {
        match self.current_session().await {
            Ok(status) if status.is_authenticated => status.user,
            Ok(_) => None,
            Err(e) => {
                warn!(kind = %e.kind(), error = %e, "Session check did not complete");
                None
            }
        }
    }
}

/// Failures of [`login`].
#[derive(Debug, Error)]
pub enum LoginError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Request(#[from] RequestError),

    /// The backend accepted the credentials but the token could not be stored.
    #[error("login succeeded but the token was not stored: {0}")]
    Cookie(#[from] CookieError),
}

/// Posts `form` through `mutations` and stores the returned token in `cookies`.
///
/// The reply is returned whatever its status; the token is only stored when
/// the backend accepted the credentials. Like any completed mutation, the call
/// invalidates cached reads.
///
/// # Errors
///
/// [`LoginError`] when the form is incomplete, the call did not complete, or
/// the token could not be persisted.
pub async fn login(
    mutations: &MutationContext,
    cookies: &dyn CookieAccessor,
    form: LoginForm,
) -> Result<LoginResponse, LoginError> {
    let reply: LoginResponse = mutations.try_mutate(form.into_descriptor()?).await?;
    match reply.accepted_token() {
        Some(token) => {
            cookies.set(&CookieName::auth_token(), token.to_owned()).await?;
            info!("Logged in; auth token stored");
        }
        None => debug!(status_code = reply.status_code, "Login rejected"),
    }
    Ok(reply)
}
