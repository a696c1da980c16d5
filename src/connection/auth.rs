//! Credential handling and the authentication message body.

use crate::error::TransportError;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Secure credentials container.
///
/// This struct ensures credentials are never accidentally logged or displayed.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: Arc<SecureString>,
}

impl Credentials {
    /// Create new credentials.
    pub fn new(username: String, password: String) -> Self {
        Self {
            username,
            password: Arc::new(SecureString::new(password)),
        }
    }

    /// Get the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Get the password (for internal use only).
    pub(crate) fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credentials(username: {})", self.username)
    }
}

/// Password bytes, wiped on drop and never displayed.
struct SecureString(Zeroizing<String>);

impl SecureString {
    fn new(s: String) -> Self {
        Self(Zeroizing::new(s))
    }

    fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureString(<redacted>)")
    }
}

/// Body of the `auth` message sent in answer to the server's challenge.
#[derive(Serialize)]
pub struct AuthRequest<'a> {
    pub db: &'a str,
    pub user: &'a str,
    pub password: &'a str,
}

impl<'a> AuthRequest<'a> {
    /// Build the request for a database and set of credentials.
    pub fn new(database: &'a str, credentials: &'a Credentials) -> Self {
        Self {
            db: database,
            user: credentials.username(),
            password: credentials.password(),
        }
    }

    /// Encode as the JSON message body.
    pub fn to_body(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Debug for AuthRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRequest")
            .field("db", &self.db)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}
