//! Error types for modelchat.
//!
//! Every fallible operation in the crate returns [`Error`].  The variants follow the failure
//! modes of a streaming chat session: a missing or rejected credential, a bad parameter or
//! model name, a corrupt stream frame, a non-success HTTP status, and connection failures.

use std::error;
use std::fmt;
use std::io;
use std::str::Utf8Error;
use std::sync::Arc;

/// The main error type for modelchat.
#[derive(Clone, Debug)]
pub enum Error {
    /// Missing or rejected credential.
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// A parameter, model name, or request field failed validation.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },

    /// A stream frame could not be decoded.
    Parse {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The server answered with a non-success status.
    Server {
        /// HTTP status code.
        status_code: u16,
        /// Human-readable error message.
        message: String,
        /// Raw response body, kept for diagnostics.
        body: String,
    },

    /// Connection-level failure, before or during the response body.
    Transport {
        /// Human-readable error message.
        message: String,
        /// Underlying cause.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The request timed out.
    Timeout {
        /// Human-readable error message.
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// The exchange was aborted by the user.
    Abort {
        /// Human-readable error message.
        message: String,
    },

    /// I/O error.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// A URL parsing or manipulation error.
    Url {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<url::ParseError>,
    },
}

impl Error {
    /// Creates a new authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Error::Authentication {
            message: message.into(),
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Creates a new parse error.
    pub fn parse(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Parse {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new server error.
    pub fn server(status_code: u16, message: impl Into<String>, body: impl Into<String>) -> Self {
        Error::Server {
            status_code,
            message: message.into(),
            body: body.into(),
        }
    }

    /// Creates a new transport error.
    pub fn transport(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Transport {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new abort error.
    pub fn abort(message: impl Into<String>) -> Self {
        Error::Abort {
            message: message.into(),
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new URL error.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// Returns true if this error is related to authentication.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication { .. })
    }

    /// Returns true if this error is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns true if this error came from a corrupt stream frame.
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse { .. })
    }

    /// Returns true if this error is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Server { .. })
    }

    /// Returns true if this error is a connection-level failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. } | Error::Timeout { .. })
    }

    /// Returns true if this error is an abort.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Abort { .. })
    }

    /// Returns the parameter named by a validation error, if any.
    pub fn param(&self) -> Option<&str> {
        match self {
            Error::Validation { param, .. } => param.as_deref(),
            _ => None,
        }
    }

    /// Returns the status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Server { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Authentication { message } => {
                write!(f, "Authentication error: {message}")
            }
            Error::Validation { message, param } => {
                if let Some(param) = param {
                    write!(f, "Validation error: {message} (parameter: {param})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
            Error::Parse { message, .. } => {
                write!(f, "Parse error: {message}")
            }
            Error::Server {
                status_code,
                message,
                body,
            } => {
                if body.is_empty() {
                    write!(f, "Server error ({status_code}): {message}")
                } else {
                    write!(f, "Server error ({status_code}): {message}\n{body}")
                }
            }
            Error::Transport { message, .. } => {
                write!(f, "Transport error: {message}")
            }
            Error::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: {message} ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: {message}")
                }
            }
            Error::Abort { message } => {
                write!(f, "Request aborted: {message}")
            }
            Error::Io { message, .. } => {
                write!(f, "I/O error: {message}")
            }
            Error::Url { message, .. } => {
                write!(f, "URL error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Parse { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Transport { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::parse(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

impl From<Utf8Error> for Error {
    fn from(err: Utf8Error) -> Self {
        Error::parse(format!("Invalid UTF-8 in stream: {err}"), Some(Box::new(err)))
    }
}

/// A specialized Result type for modelchat operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_names_param() {
        let err = Error::validation("malformed value 'hot'", Some("temperature".to_string()));
        assert_eq!(
            err.to_string(),
            "Validation error: malformed value 'hot' (parameter: temperature)"
        );
        assert_eq!(err.param(), Some("temperature"));
        assert!(err.is_validation());
    }

    #[test]
    fn server_error_carries_body() {
        let err = Error::server(503, "unexpected response from the server", "overloaded");
        assert_eq!(err.status_code(), Some(503));
        assert!(err.is_server_error());
        assert!(err.to_string().contains("overloaded"));
    }

    #[test]
    fn json_errors_become_parse_errors() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(err.is_parse());
        assert!(error::Error::source(&err).is_some());
    }

    #[test]
    fn invalid_utf8_becomes_parse_error() {
        let bytes = [b'o', 0xff, b'k'];
        let err: Error = std::str::from_utf8(&bytes).unwrap_err().into();
        assert!(err.is_parse());
        assert!(err.to_string().contains("Invalid UTF-8"));
    }

    #[test]
    fn timeouts_count_as_transport() {
        assert!(Error::timeout("slow", Some(1.0)).is_transport());
        assert!(!Error::abort("stop").is_transport());
    }
}
