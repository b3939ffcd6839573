//! Request and result value types.
//!
//! A [`RequestDescriptor`] is built fresh by the consumer for every call and
//! consumed once by a [`crate::RequestExecutor`]. The executor hands back a
//! [`NormalizedResult`]: the parsed response body plus the transport status.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Endpoint, RequestError};

// ---------------------------------------------------------------------------
// Method and content type
// ---------------------------------------------------------------------------

/// HTTP verb of a request.
///
/// Reads always use [`HttpMethod::Get`]; mutations use one of the other three
/// and default to [`HttpMethod::Post`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Returns the upper-case verb as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Returns `true` for verbs that change backend state.
    pub fn is_mutation(self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("unsupported HTTP method '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------

/// Declared encoding of the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Body is serialised as JSON text and sent with `Content-Type: application/json`.
    #[default]
    Json,
    /// Body is an opaque form payload; the transport picks the boundary and
    /// sets the header itself.
    Multipart,
}

impl ContentType {
    /// Returns the MIME type this content type stands for.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Multipart => "multipart/form-data",
        }
    }
}

// ---------------------------------------------------------------------------
// Multipart payload
// ---------------------------------------------------------------------------

/// One named part of a [`MultipartForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    /// A plain text field.
    Text {
        /// Field name.
        name: String,
        /// Field value.
        value: String,
    },
    /// A file upload.
    File {
        /// Field name.
        name: String,
        /// File name reported to the backend.
        file_name: String,
        /// MIME type of the file, when known.
        mime: Option<String>,
        /// Raw file content.
        bytes: Vec<u8>,
    },
}

impl FormPart {
    /// Returns the field name of this part.
    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. } | Self::File { name, .. } => name,
        }
    }
}

/// An ordered multipart form payload.
///
/// The executor passes this through to the transport untouched; it is never
/// JSON-serialised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Appends a file field.
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            mime,
            bytes,
        });
        self
    }

    /// Returns the parts in insertion order.
    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// Consumes the form and returns its parts.
    pub fn into_parts(self) -> Vec<FormPart> {
        self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Request descriptor
// ---------------------------------------------------------------------------

/// Body of a request.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    /// No body is sent.
    #[default]
    Empty,
    /// A JSON value, serialised to text by the executor.
    Json(Value),
    /// An opaque multipart payload.
    Multipart(MultipartForm),
}

/// Everything the executor needs to issue one request.
///
/// Built per call, consumed once. Use [`RequestDescriptor::mutation`] or
/// [`RequestDescriptor::query`] and the builder methods; setting a body also
/// sets the matching [`ContentType`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub endpoint: Endpoint,
    pub method: HttpMethod,
    pub content_type: ContentType,
    pub body: RequestBody,
}

impl RequestDescriptor {
    /// A state-changing call: `POST`, JSON, no body yet.
    pub fn mutation(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            method: HttpMethod::Post,
            content_type: ContentType::Json,
            body: RequestBody::Empty,
        }
    }

    /// A read: `GET`, JSON, never a body.
    pub fn query(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            method: HttpMethod::Get,
            content_type: ContentType::Json,
            body: RequestBody::Empty,
        }
    }

    /// Overrides the HTTP method.
    #[must_use]
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.content_type = ContentType::Json;
        self.body = RequestBody::Json(body);
        self
    }

    /// Serialises `body` and sets it as the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidDescriptor`] if `body` cannot be
    /// represented as JSON (e.g. a map with non-string keys).
    pub fn serialize<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, RequestError> {
        let value = serde_json::to_value(body).map_err(|e| RequestError::InvalidDescriptor {
            reason: format!("body is not JSON-serialisable: {e}"),
        })?;
        Ok(self.json(value))
    }

    /// Sets a multipart body.
    #[must_use]
    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.content_type = ContentType::Multipart;
        self.body = RequestBody::Multipart(form);
        self
    }

    /// Checks that the content type and body agree.
    ///
    /// A multipart content type must carry an opaque form (or nothing); a JSON
    /// content type must never carry a form.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidDescriptor`] on a mismatch.
    pub fn validate(&self) -> Result<(), RequestError> {
        match (self.content_type, &self.body) {
            (ContentType::Json, RequestBody::Multipart(_)) => Err(RequestError::InvalidDescriptor {
                reason: "multipart body declared with JSON content type".to_owned(),
            }),
            (ContentType::Multipart, RequestBody::Json(_)) => Err(RequestError::InvalidDescriptor {
                reason: "JSON body declared with multipart content type".to_owned(),
            }),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalized result
// ---------------------------------------------------------------------------

/// Name of the field that carries the transport status in a normalised body.
pub const STATUS_CODE_FIELD: &str = "status_code";

/// Parsed response body plus the HTTP status it arrived with.
///
/// The executor returns this for every response it could read and parse,
/// whatever the status class: a `403` with a JSON error body is a
/// `NormalizedResult`, not an error. Callers inspect [`Self::status_code`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResult {
    pub status_code: u16,
    pub body: Value,
}

impl NormalizedResult {
    pub fn new(status_code: u16, body: Value) -> Self {
        Self { status_code, body }
    }

    /// Returns `true` when the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// The conventional `message` field of a backend reply, if present.
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }

    /// The conventional `error` field of a backend error reply, if present.
    pub fn error(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }

    /// Merges the status into the body.
    ///
    /// Object bodies gain a numeric `status_code` key (replacing any the
    /// backend sent). Any other JSON value is wrapped as
    /// `{"data": <body>, "status_code": <n>}`.
    pub fn into_value(self) -> Value {
        let mut map = match self.body {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("data".to_owned(), other);
                map
            }
        };
        map.insert(STATUS_CODE_FIELD.to_owned(), Value::from(self.status_code));
        Value::Object(map)
    }

    /// Deserialises the merged value into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Parse`] if the merged value does not match `T`.
    pub fn decode<T: DeserializeOwned>(self, endpoint: &Endpoint) -> Result<T, RequestError> {
        let status_code = self.status_code;
        serde_json::from_value(self.into_value()).map_err(|e| RequestError::Parse {
            endpoint: endpoint.to_string(),
            status_code: Some(status_code),
            message: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
