//! Error types for courier.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use derive_more::{Display, Error, From};

use crate::HttpHeaders;

// ============================================================================
// Descriptor Errors
// ============================================================================

/// Malformed declarative metadata.
///
/// Raised when a service declaration is compiled, never while a call is in
/// flight. An interface that fails to compile cannot be used at all.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum DescriptorError {
    /// The method carries no HTTP verb.
    #[display("method {method} declares no HTTP verb")]
    MissingVerb {
        /// Method name.
        method: String,
    },

    /// The method carries more than one HTTP verb.
    #[display("method {method} declares more than one HTTP verb")]
    DuplicateVerb {
        /// Method name.
        method: String,
    },

    /// Two methods share a name.
    #[display("method {method} is declared more than once")]
    DuplicateMethod {
        /// Method name.
        method: String,
    },

    /// A template placeholder is not bound by any parameter.
    #[display("method {method}: placeholder {{{placeholder}}} in '{template}' is not bound to a parameter")]
    UnboundPlaceholder {
        /// Method name.
        method: String,
        /// Placeholder name, without braces.
        placeholder: String,
        /// Template the placeholder appears in.
        template: String,
    },

    /// Two parameters claim the same placeholder.
    #[display("method {method}: placeholder {{{placeholder}}} is claimed by more than one parameter")]
    DuplicatePlaceholder {
        /// Method name.
        method: String,
        /// Placeholder name, without braces.
        placeholder: String,
    },

    /// A parameter binds a placeholder the template does not contain.
    #[display("method {method}: parameter {index} binds {{{placeholder}}}, which '{template}' does not contain")]
    UnknownPlaceholder {
        /// Method name.
        method: String,
        /// Argument index of the parameter.
        index: usize,
        /// Placeholder name, without braces.
        placeholder: String,
        /// Template searched.
        template: String,
    },

    /// More than one parameter is bound to the request body.
    #[display("method {method}: more than one parameter is bound to the request body")]
    DuplicateBody {
        /// Method name.
        method: String,
    },

    /// A static header has an invalid name or value.
    #[display("method {method}: invalid static header '{name}': {reason}")]
    InvalidHeader {
        /// Method name.
        method: String,
        /// Header name as declared.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A template contains an unterminated or empty placeholder.
    #[display("malformed template '{template}': {reason}")]
    MalformedTemplate {
        /// Template source.
        template: String,
        /// What is wrong with it.
        reason: String,
    },
}

// ============================================================================
// Unexpected Response
// ============================================================================

/// Typed error payload decoded into the caller-declared exception type.
#[derive(Clone)]
struct TypedBody {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl fmt::Debug for TypedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedBody")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// A response whose status is outside the method's expected set.
///
/// Carries the raw body bytes, the body decoded as a structural mapping when
/// it parses, the body decoded into the caller-declared exception payload type
/// when one is configured, and the decode failure if decoding went wrong.
#[derive(Debug)]
pub struct UnexpectedResponse {
    status: u16,
    headers: HttpHeaders,
    raw: Bytes,
    mapping: Option<serde_json::Value>,
    typed: Option<TypedBody>,
    decode_error: Option<Box<Error>>,
}

impl UnexpectedResponse {
    /// Creates an unexpected response with only its raw body.
    #[must_use]
    pub fn new(status: u16, headers: HttpHeaders, raw: Bytes) -> Self {
        Self {
            status,
            headers,
            raw,
            mapping: None,
            typed: None,
            decode_error: None,
        }
    }

    /// Attach the body decoded as a structural mapping.
    #[must_use]
    pub fn with_mapping(mut self, mapping: serde_json::Value) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// Attach the body decoded into the declared exception payload type.
    #[must_use]
    pub fn with_typed_body(
        mut self,
        type_name: &'static str,
        value: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        self.typed = Some(TypedBody { type_name, value });
        self
    }

    /// Attach the failure that prevented the body from being decoded.
    #[must_use]
    pub fn with_decode_error(mut self, error: Error) -> Self {
        self.decode_error = Some(Box::new(error));
        self
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    /// Raw response body, as captured.
    #[must_use]
    pub fn raw_body(&self) -> &Bytes {
        &self.raw
    }

    /// Body decoded as a structural mapping, if it parsed.
    #[must_use]
    pub fn mapping(&self) -> Option<&serde_json::Value> {
        self.mapping.as_ref()
    }

    /// Body decoded into the declared exception payload type `T`.
    ///
    /// Returns `None` if no payload type was declared, decoding failed, or
    /// `T` is not the declared type.
    #[must_use]
    pub fn body<T: Any>(&self) -> Option<&T> {
        self.typed.as_ref()?.value.downcast_ref::<T>()
    }

    /// Name of the declared exception payload type, if the body decoded into it.
    #[must_use]
    pub fn body_type(&self) -> Option<&'static str> {
        self.typed.as_ref().map(|typed| typed.type_name)
    }

    /// Why the body could not be decoded, if it could not.
    #[must_use]
    pub fn decode_error(&self) -> Option<&Error> {
        self.decode_error.as_deref()
    }
}

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for courier operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Malformed service declaration.
    #[display("invalid service declaration: {_0}")]
    #[from]
    Descriptor(DescriptorError),

    /// The method's declared return type is not supported.
    #[display("{return_type} is not a supported return type for method {method}")]
    #[from(skip)]
    InvalidReturnType {
        /// Fully qualified declared return type.
        return_type: String,
        /// Fully qualified method signature.
        method: String,
    },

    /// The service declares no method with this name.
    #[display("{interface} declares no method named {method}")]
    #[from(skip)]
    UnknownMethod {
        /// Interface name.
        interface: String,
        /// Requested method name.
        method: String,
    },

    /// A blocking call was made on an asynchronous method, or the reverse,
    /// or a payload was requested as another type than the declared one.
    #[display("method {method} returns {declared} and cannot be called as {requested}")]
    #[from(skip)]
    ShapeMismatch {
        /// Method signature.
        method: String,
        /// Declared return shape or payload type.
        declared: &'static str,
        /// Calling convention or payload type used.
        requested: &'static str,
    },

    /// A call outcome was read as a different kind than it holds.
    #[display("expected a {expected} outcome, got {actual}")]
    #[from(skip)]
    OutcomeMismatch {
        /// Kind asked for.
        expected: &'static str,
        /// Kind held.
        actual: &'static str,
    },

    /// A call-time argument does not fit its declared role.
    #[display("argument {index} of {method}: {reason}")]
    #[from(skip)]
    Argument {
        /// Method signature.
        method: String,
        /// Argument index.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// Response status outside the expected set (default exception type).
    #[display("unexpected response status {}", _0.status())]
    #[from(skip)]
    UnexpectedStatus(#[error(not(source))] Box<UnexpectedResponse>),

    /// Response status outside the expected set (caller-declared exception type).
    #[display("service error (status {}, body type {})", _0.status(), _0.body_type().unwrap_or("undecoded"))]
    #[from(skip)]
    ServiceError(#[error(not(source))] Box<UnexpectedResponse>),

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// The call was cancelled before the transport completed.
    #[display("call cancelled")]
    #[from(skip)]
    Cancelled,

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// Body serialization error.
    #[display("serialization error: {_0}")]
    #[from(skip)]
    Serialization(#[error(not(source))] String),

    /// Body deserialization error with path context.
    #[display("deserialization error at '{path}': {message}")]
    #[from(skip)]
    Deserialization {
        /// Path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// The execution runtime could not run the call.
    #[display("runtime error: {_0}")]
    #[from(skip)]
    Runtime(#[error(not(source))] String),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create a deserialization error with path context.
    #[must_use]
    pub fn deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Deserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a runtime error.
    #[must_use]
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime(message.into())
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if the call was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if the transport failed (connection, TLS or timeout).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Tls(_) | Self::Timeout)
    }

    /// The unexpected response, for either exception type.
    #[must_use]
    pub fn response(&self) -> Option<&UnexpectedResponse> {
        match self {
            Self::UnexpectedStatus(response) | Self::ServiceError(response) => Some(response),
            _ => None,
        }
    }

    /// Returns the HTTP status code if the response was unexpected.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.response().map(UnexpectedResponse::status)
    }

    /// Returns `true` if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }

    /// Returns `true` if this is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| (500..600).contains(&s))
    }

    /// Returns the raw response body if the response was unexpected.
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        self.response().map(UnexpectedResponse::raw_body)
    }

    /// Try to decode the unexpected response body as JSON.
    ///
    /// Returns `None` if there is no body or this is not a response error.
    pub fn decode_body<T: serde::de::DeserializeOwned>(&self) -> Option<Result<T>> {
        self.body()
            .filter(|body| !body.is_empty())
            .map(|body| crate::from_json(body))
    }
}
