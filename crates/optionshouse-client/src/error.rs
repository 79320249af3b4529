//! Error types for the OptionsHouse client.

use serde_json::Value;
use thiserror::Error;


/// Broad category of a client error.
///
/// The session's retry protocol only looks at this tag: an [`ErrorKind::Auth`]
/// failure triggers one re-authentication, everything else is returned as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport, encoding, or envelope failure. Never retried.
    Generic,
    /// Business error reported by the API.
    Api,
    /// The API rejected the auth token.
    Auth,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generic => write!(f, "generic"),
            Self::Api => write!(f, "api"),
            Self::Auth => write!(f, "auth"),
        }
    }
}

/// Client error types.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Form encoding of the request body failed.
    #[error("form encoding error: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request or response envelope has the wrong shape.
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Server answered with a non-200 status or a non-JSON body.
    #[error("unexpected response ({status}): {body}")]
    UnexpectedResponse {
        /// HTTP status code.
        status: u16,
        /// Response headers, rendered as `name: value` lines.
        headers: String,
        /// Raw response body.
        body: String,
    },

    /// Login succeeded at the HTTP level but no auth token came back.
    #[error("login response did not contain an auth token")]
    MissingToken,

    /// No connection could be held for the request.
    #[error("Connection closed")]
    ConnectionClosed,

    /// API returned business errors.
    #[error("API error: {}", render(.errors))]
    Api {
        /// Error entries as returned by the server.
        errors: Vec<Value>,
    },

    /// API rejected the auth token.
    #[error("authentication error: {}", render(.errors))]
    Auth {
        /// Error entries as returned by the server.
        errors: Vec<Value>,
    },
}

impl Error {
    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Api { .. } => ErrorKind::Api,
            _ => ErrorKind::Generic,
        }
    }

    /// True when the server rejected the auth token.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }

    /// True for any server-reported error, auth failures included.
    #[must_use]
    pub fn is_api(&self) -> bool {
        matches!(self.kind(), ErrorKind::Api | ErrorKind::Auth)
    }

    /// Error entries reported by the server, if any.
    #[must_use]
    pub fn errors(&self) -> &[Value] {
        match self {
            Self::Api { errors } | Self::Auth { errors } => errors,
            _ => &[],
        }
    }
}

fn render(errors: &[Value]) -> String {
    Value::Array(errors.to_vec()).to_string()
}
