//! [`RequestExecutor`] over `reqwest`.
//!
//! One request per call: read the bearer token, pick the body encoding from
//! the descriptor's content type, send, then parse the reply as JSON. A reply
//! of any status that parses is a result; nothing is retried.

use std::sync::Arc;

use async_trait::async_trait;
use contract::{
    ConfigError, ContentType, CookieAccessor, CookieName, FormPart, HttpMethod, MultipartForm,
    NormalizedResult, RequestBody, RequestDescriptor, RequestError, RequestExecutor, RequestId,
};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, info_span, Instrument};

use crate::HttpConfig;

/// Sends descriptors to the backend with bearer authentication.
///
/// Build one per process with [`HttpRequestExecutor::new`] and share it behind
/// an `Arc`; the inner client pools connections and holds the cookie jar.
pub struct HttpRequestExecutor {
    client: Client,
    config: HttpConfig,
    cookies: Arc<dyn CookieAccessor>,
}

impl std::fmt::Debug for HttpRequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequestExecutor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HttpRequestExecutor {
    /// Creates an executor for `config` that reads the bearer token from `cookies`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the HTTP client cannot be built
    /// (e.g. the TLS backend fails to initialise).
    pub fn new(config: HttpConfig, cookies: Arc<dyn CookieAccessor>) -> Result<Self, ConfigError> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .user_agent(config.user_agent());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| ConfigError::Invalid {
            key: "http_client".to_owned(),
            message: e.to_string(),
        })?;

        Ok(Self {
            client,
            config,
            cookies,
        })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    async fn bearer_token(&self, endpoint: &str) -> Result<String, RequestError> {
        let token = self
            .cookies
            .get(&CookieName::auth_token())
            .await
            .map_err(|e| RequestError::Transport {
                endpoint: endpoint.to_owned(),
                message: format!("auth token unavailable: {e}"),
            })?;
        if token.is_none() {
            debug!("No auth token stored; sending an empty bearer credential");
        }
        Ok(token.unwrap_or_default())
    }

    async fn send(&self, descriptor: RequestDescriptor) -> Result<NormalizedResult, RequestError> {
        let endpoint = descriptor.endpoint.to_string();
        let url = format!("{}{}", self.config.base_url(), endpoint);
        let transport = |e: reqwest::Error| RequestError::Transport {
            endpoint: endpoint.clone(),
            message: e.to_string(),
        };

        let token = self.bearer_token(&endpoint).await?;

        let mut request = self
            .client
            .request(method(descriptor.method), url.as_str())
            .header(AUTHORIZATION, format!("Bearer {token}"));

        request = match (descriptor.content_type, descriptor.body) {
            (ContentType::Json, RequestBody::Empty) => {
                request.header(CONTENT_TYPE, ContentType::Json.mime())
            }
            (ContentType::Json, RequestBody::Json(body)) => request
                .header(CONTENT_TYPE, ContentType::Json.mime())
                .body(body.to_string()),
            (ContentType::Multipart, RequestBody::Multipart(form)) => {
                request.multipart(multipart(form).map_err(transport)?)
            }
            (ContentType::Multipart, RequestBody::Empty) => request,
            (content_type, _) => {
                return Err(RequestError::InvalidDescriptor {
                    reason: format!("body does not match content type {}", content_type.mime()),
                })
            }
        };

        debug!(%url, "Sending request");
        let response = request.send().await.map_err(transport)?;
        let status_code = response.status().as_u16();
        let bytes = response.bytes().await.map_err(transport)?;

        let body: Value = serde_json::from_slice(&bytes).map_err(|e| RequestError::Parse {
            endpoint: endpoint.clone(),
            status_code: Some(status_code),
            message: e.to_string(),
        })?;

        debug!(status_code, "Response received");
        Ok(NormalizedResult::new(status_code, body))
    }
}

#[async_trait]
impl RequestExecutor for HttpRequestExecutor {
    async fn execute(&self, descriptor: RequestDescriptor) -> Result<NormalizedResult, RequestError> {
        descriptor.validate()?;

        let span = info_span!(
            "http_request",
            request_id = %RequestId::new_random(),
            method = %descriptor.method,
            endpoint = %descriptor.endpoint,
        );
        let result = self.send(descriptor).instrument(span.clone()).await;
        if let Err(e) = &result {
            span.in_scope(|| debug!(kind = %e.kind(), error = %e, "Request failed"));
        }
        result
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn multipart(form: MultipartForm) -> Result<Form, reqwest::Error> {
    let mut out = Form::new();
    for part in form.into_parts() {
        out = match part {
            FormPart::Text { name, value } => out.text(name, value),
            FormPart::File {
                name,
                file_name,
                mime,
                bytes,
            } => {
                let mut file = Part::bytes(bytes).file_name(file_name);
                if let Some(mime) = mime {
                    file = file.mime_str(&mime)?;
                }
                out.part(name, file)
            }
        };
    }
    Ok(out)
}
