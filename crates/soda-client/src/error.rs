//! Error types for the SODA client.

use std::fmt;

/// Boxed source error carried by transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of a [`SodaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorDomain {
    /// The request never produced a response (DNS, TLS, timeout, reset).
    Network,
    /// The response body was not JSON, or had an unrecognized shape.
    Decode,
    /// The server answered with a well-formed error payload.
    Api,
    /// The request could not be built locally.
    Request,
}

impl ErrorDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorDomain::Network => "network",
            ErrorDomain::Decode => "decode",
            ErrorDomain::Api => "api",
            ErrorDomain::Request => "request",
        }
    }
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur when querying a SODA endpoint.
#[derive(Debug, thiserror::Error)]
pub enum SodaError {
    /// HTTP transport error (connection, DNS, TLS, timeout, etc.)
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Response body is not valid JSON, or its shape is not a dataset
    #[error("Decode error: {message}")]
    Decode {
        message: String,
        /// Excerpt of the offending body, if there was one
        body: Option<String>,
    },

    /// Server returned an `error` + `message` payload
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status of the response carrying the payload
        status: Option<u16>,
        /// The raw error payload
        detail: serde_json::Value,
    },

    /// A row lookup returned no rows
    #[error("Row not found: {row_id} in dataset {dataset}")]
    RowNotFound { dataset: String, row_id: String },

    /// URL could not be assembled
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SodaError {
    /// Build a network error from any transport failure.
    pub fn network<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SodaError::Network {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }

    /// Build a decode error, keeping a bounded excerpt of the body.
    pub fn decode(message: impl Into<String>, body: Option<&[u8]>) -> Self {
        SodaError::Decode {
            message: message.into(),
            body: body.map(body_excerpt),
        }
    }

    /// Which of the broad failure classes this error belongs to.
    pub fn domain(&self) -> ErrorDomain {
        match self {
            SodaError::Network { .. } => ErrorDomain::Network,
            SodaError::Decode { .. } => ErrorDomain::Decode,
            SodaError::Api { .. } | SodaError::RowNotFound { .. } => ErrorDomain::Api,
            SodaError::InvalidUrl(_) | SodaError::Config(_) => ErrorDomain::Request,
        }
    }

    /// Structured server payload, for API errors.
    pub fn detail(&self) -> Option<&serde_json::Value> {
        match self {
            SodaError::Api { detail, .. } => Some(detail),
            _ => None,
        }
    }

    /// Returns true if this error means the requested row does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SodaError::RowNotFound { .. })
    }
}

impl From<reqwest::Error> for SodaError {
    fn from(err: reqwest::Error) -> Self {
        SodaError::network(err)
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, SodaError>;

const BODY_EXCERPT_LIMIT: usize = 512;

fn body_excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= BODY_EXCERPT_LIMIT {
        return text.into_owned();
    }
    let mut end = BODY_EXCERPT_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
