//! Client-side form validation contracts.
//!
//! Each form checks only what the client can check on its own (blank fields,
//! matching confirmation) and then turns itself into a [`RequestDescriptor`].
//! Password policy and email format are decided by the backend.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use serde_json::json;
use url::form_urlencoded;

use crate::{Endpoint, MultipartForm, RequestDescriptor, RequestError};

/// Validation failures detected before a form is submitted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormError {
    /// A required field is empty or whitespace only.
    #[error("Field '{0}' must not be blank")]
    Blank(&'static str),

    /// A password and its confirmation differ.
    #[error("Password and confirmation do not match")]
    Mismatch,

    /// The form is valid but could not be turned into a request.
    #[error(transparent)]
    Request(#[from] RequestError),
}

fn require(field: &'static str, value: &str) -> Result<(), FormError> {
    if value.trim().is_empty() {
        Err(FormError::Blank(field))
    } else {
        Ok(())
    }
}

fn endpoint(path: &str) -> Result<Endpoint, FormError> {
    Endpoint::new(path).ok_or_else(|| {
        FormError::Request(RequestError::InvalidDescriptor {
            reason: "empty endpoint".to_owned(),
        })
    })
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

/// Credentials posted to the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub mot_de_passe: String,
}

impl LoginForm {
    pub const ENDPOINT: &'static str = "/api/auth/login";

    pub fn validate(&self) -> Result<(), FormError> {
        require("email", &self.email)?;
        require("mot_de_passe", &self.mot_de_passe)
    }

    /// Validates the form and builds the login mutation.
    pub fn into_descriptor(self) -> Result<RequestDescriptor, FormError> {
        self.validate()?;
        Ok(RequestDescriptor::mutation(endpoint(Self::ENDPOINT)?).serialize(&self)?)
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Sign-up form, submitted as multipart.
///
/// `confirm_mot_de_passe` is checked locally and never sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    pub nom_famille: String,
    pub prenom: String,
    pub email: String,
    pub numero_telephone: String,
    pub mot_de_passe: String,
    pub confirm_mot_de_passe: String,
}

impl Registration {
    pub const ENDPOINT: &'static str = "/api/auth/register";

    pub fn validate(&self) -> Result<(), FormError> {
        require("nom_famille", &self.nom_famille)?;
        require("prenom", &self.prenom)?;
        require("email", &self.email)?;
        require("mot_de_passe", &self.mot_de_passe)?;
        if self.mot_de_passe != self.confirm_mot_de_passe {
            return Err(FormError::Mismatch);
        }
        Ok(())
    }

    pub fn into_multipart(self) -> MultipartForm {
        MultipartForm::new()
            .text("nom_famille", self.nom_famille)
            .text("prenom", self.prenom)
            .text("email", self.email)
            .text("numero_telephone", self.numero_telephone)
            .text("mot_de_passe", self.mot_de_passe)
    }

    pub fn into_descriptor(self) -> Result<RequestDescriptor, FormError> {
        self.validate()?;
        Ok(RequestDescriptor::mutation(endpoint(Self::ENDPOINT)?).multipart(self.into_multipart()))
    }
}

/// Asks the backend to send (again) the account validation email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationEmailRequest {
    pub email: String,
}

impl ValidationEmailRequest {
    pub const ENDPOINT: &'static str = "/api/auth/send-validation-email";

    pub fn validate(&self) -> Result<(), FormError> {
        require("email", &self.email)
    }

    /// The address travels in the query string, percent-encoded; the body is `{}`.
    pub fn into_descriptor(self) -> Result<RequestDescriptor, FormError> {
        self.validate()?;
        let email: String = form_urlencoded::byte_serialize(self.email.trim().as_bytes()).collect();
        let path = format!("{}?email={email}", Self::ENDPOINT);
        Ok(RequestDescriptor::mutation(endpoint(&path)?).json(json!({})))
    }
}

// ---------------------------------------------------------------------------
// Password change
// ---------------------------------------------------------------------------

/// Payload of the password change dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordChange {
    pub nouveau_de_passe: String,
    pub mot_de_passe_actuel: String,
    pub confirm_new_password: String,
}

impl PasswordChange {
    pub const ENDPOINT: &'static str = "/api/auth/update-password";

    /// Every field must be non-blank, and the new password must equal its
    /// confirmation.
    pub fn validate(&self) -> Result<(), FormError> {
        require("nouveau_de_passe", &self.nouveau_de_passe)?;
        require("mot_de_passe_actuel", &self.mot_de_passe_actuel)?;
        require("confirm_new_password", &self.confirm_new_password)?;
        if self.nouveau_de_passe != self.confirm_new_password {
            return Err(FormError::Mismatch);
        }
        Ok(())
    }

    pub fn into_descriptor(self) -> Result<RequestDescriptor, FormError> {
        self.validate()?;
        Ok(RequestDescriptor::mutation(endpoint(Self::ENDPOINT)?).serialize(&self)?)
    }
}

// ---------------------------------------------------------------------------
// Profile update
// ---------------------------------------------------------------------------

/// Profile photo sent with a profile update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfilePhoto {
    /// A newly chosen file.
    Upload {
        file_name: String,
        mime: Option<String>,
        bytes: Vec<u8>,
    },
    /// Keep the current photo; its URL (possibly empty) is sent as text.
    Existing(String),
}

/// Profile fields submitted as a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub nom_famille: String,
    pub prenom: String,
    pub numero_telephone: String,
    pub photo: ProfilePhoto,
}

impl ProfileUpdate {
    pub const ENDPOINT: &'static str = "/api/auth/update-profile/";

    pub fn validate(&self) -> Result<(), FormError> {
        require("nom_famille", &self.nom_famille)?;
        require("prenom", &self.prenom)
    }

    /// Builds the form parts in the order the backend expects.
    pub fn into_multipart(self) -> MultipartForm {
        let form = MultipartForm::new()
            .text("nom_famille", self.nom_famille)
            .text("prenom", self.prenom)
            .text("numero_telephone", self.numero_telephone);
        match self.photo {
            ProfilePhoto::Upload {
                file_name,
                mime,
                bytes,
            } => form.file("photo_profile", file_name, mime, bytes),
            ProfilePhoto::Existing(url) => form.text("photo_profile", url),
        }
    }

    pub fn into_descriptor(self) -> Result<RequestDescriptor, FormError> {
        self.validate()?;
        Ok(RequestDescriptor::mutation(endpoint(Self::ENDPOINT)?).multipart(self.into_multipart()))
    }
}
