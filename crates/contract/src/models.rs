//! Typed response shapes returned by the backend.
//!
//! These are conveniences for callers of the typed entry points; the executor
//! itself never enforces a schema. Every shape that is decoded from a
//! normalised result can read `status_code`, which the executor merges into
//! the body.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A user account as returned by the authentication endpoints.
///
/// Fields the backend adds beyond the known ones are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub prenom: String,
    pub nom_famille: String,
    pub email: String,
    #[serde(default)]
    pub numero_telephone: Option<String>,
    /// URL of the current profile photo.
    #[serde(default)]
    pub photo_profile: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// First letter of the first name followed by first letter of the family name.
    pub fn initials(&self) -> String {
        self.prenom
            .chars()
            .take(1)
            .chain(self.nom_famille.chars().take(1))
            .collect()
    }
}

/// Reply of the `is-authenticated` check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub is_authenticated: bool,
    #[serde(default)]
    pub user: Option<User>,
}

/// Reply of the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub status: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    pub status_code: u16,
}

impl LoginResponse {
    /// The session token, when the backend accepted the credentials.
    pub fn accepted_token(&self) -> Option<&str> {
        if self.status_code != 200 || self.status == Some(false) {
            return None;
        }
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Generic replies
// ---------------------------------------------------------------------------

/// The `{message?, error?}` shape most mutation endpoints reply with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    pub status_code: u16,
}

/// Outcome of sending a validation email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDispatch {
    pub to: String,
    pub is_sent: bool,
}

/// Reply of registration and "resend validation email" endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub email: Option<EmailDispatch>,
    pub status_code: u16,
}

impl RegistrationResponse {
    /// `true` when the call succeeded and the email actually went out.
    pub fn email_sent(&self) -> bool {
        self.status_code == 200 && self.email.as_ref().is_some_and(|e| e.is_sent)
    }
}

// ---------------------------------------------------------------------------
// Activity timeline
// ---------------------------------------------------------------------------

/// One fruit kind detected in an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FruitResult {
    pub quantity: String,
    pub fruit_name: String,
}

/// An uploaded image and what was recognised in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    pub img_id: String,
    pub image_url: String,
    #[serde(default)]
    pub fruits: Vec<FruitResult>,
}

/// One upload batch in the user's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    pub id_historique: String,
    pub description: String,
    pub nbre_total_img: u32,
    /// Upload date as formatted by the backend.
    pub date_televersement: String,
    pub id_utilisateur: String,
    #[serde(default)]
    pub images: Vec<ImageData>,
}

/// Aggregate counters shown above the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_images: u64,
    pub total_fruits: u64,
    pub moyenne_fruits_images: f64,
}

/// Reply of the activity endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub histories: Vec<History>,
    pub stats: Statistics,
}
