//! Authentication for orchestrator, execution and artifact requests
//!
//! The execution and artifact APIs take HTTP Basic credentials (username or email plus
//! password); the orchestrator API server takes a bearer token.

use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::RequestBuilder;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

/// Username/password pair for HTTP Basic authentication
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Username or account email
    #[serde(alias = "email")]
    pub username: String,
    /// Password
    pub password: String,
}

impl Credentials {
    /// Create a new credential pair
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Value of the `Authorization` header for these credentials
    pub fn basic_auth_header(&self) -> String {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {}", encoded)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How a request to a remote collaborator is authenticated
#[derive(Clone, Debug, Default)]
pub enum AuthContext {
    /// No authentication header
    #[default]
    None,
    /// HTTP Basic authentication
    Basic(Credentials),
    /// Bearer token authentication
    Bearer(String),
}

impl AuthContext {
    /// Build a context from an optional bearer token
    pub fn bearer(token: Option<&str>) -> Self {
        match token {
            Some(t) if !t.is_empty() => AuthContext::Bearer(t.to_string()),
            _ => AuthContext::None,
        }
    }

    /// Build a context from optional Basic credentials
    pub fn basic(credentials: Option<&Credentials>) -> Self {
        credentials
            .cloned()
            .map_or(AuthContext::None, AuthContext::Basic)
    }

    /// Header value for this context, if any
    pub fn header_value(&self) -> Option<String> {
        match self {
            AuthContext::None => None,
            AuthContext::Basic(creds) => Some(creds.basic_auth_header()),
            AuthContext::Bearer(token) => Some(format!("Bearer {}", token)),
        }
    }

    /// Attach the authorization header to a request
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self.header_value() {
            Some(value) => request.header(AUTHORIZATION, value),
            None => request,
        }
    }
}
