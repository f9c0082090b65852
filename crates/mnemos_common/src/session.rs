//! Signed-in session - bearer token and a small user-context record
//!
//! The session is an explicit value handed to the request layer. Nothing in
//! the request path reads storage on its own; only [`SessionStore`] touches
//! disk, and only when the caller asks it to.

use crate::error::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Role assumed when the backend does not send one
pub const DEFAULT_ROLE: &str = "clinician";

/// Minimum password length accepted by the sign-in form
pub const MIN_PASSWORD_LEN: usize = 6;

/// Who is signed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub email: String,
    pub role: String,
}

/// Token plus user context for the current client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<UserContext>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(token: impl Into<String>, user: UserContext) -> Self {
        Self {
            token: Some(token.into()),
            user: Some(user),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&UserContext> {
        self.user.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.token.is_some()
    }

    /// Value for the `Authorization` header, if signed in
    pub fn authorization_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }

    pub fn clear(&mut self) {
        self.token = None;
        self.user = None;
    }
}

/// Credentials typed into the sign-in form
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Per-field form errors, keyed by field name ("email", "password")
pub type FieldErrors = BTreeMap<&'static str, String>;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"\S+@\S+\.\S+").expect("static email regex"))
}

/// Validate the sign-in form before anything is sent
pub fn validate_credentials(credentials: &Credentials) -> FieldErrors {
    let mut errors = FieldErrors::new();

    let email = credentials.email.trim();
    if email.is_empty() {
        errors.insert("email", "Email is required".to_string());
    } else if !email_pattern().is_match(email) {
        errors.insert("email", "Please enter a valid email address".to_string());
    }

    if credentials.password.is_empty() {
        errors.insert("password", "Password is required".to_string());
    } else if credentials.password.chars().count() < MIN_PASSWORD_LEN {
        errors.insert(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        );
    }

    errors
}

/// File-backed persistence for [`SessionContext`]
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default state location
    pub fn default_location() -> Self {
        Self::new(crate::paths::session_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the session; a missing or unreadable file is an empty session
    pub fn load(&self) -> SessionContext {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, session: &SessionContext) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(session)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Remove the session file; already gone is fine
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
