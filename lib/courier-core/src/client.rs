//! Transport collaborator trait.
//!
//! [`HttpClient`] is the only suspension point of an invocation: the engine
//! builds a [`Request`], hands it over, and classifies whatever comes back.
//! Implement it directly to plug in a custom transport or a test double.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;

use crate::{ByteStream, Request, Response, Result};

/// Core HTTP client trait.
///
/// Implementations report connection, TLS and timeout failures through
/// [`crate::Error`]; the engine surfaces them unchanged and never retries.
///
/// # Example
///
/// ```ignore
/// use courier_core::{ByteStream, HttpClient, HttpHeaders, Request, Response, Result};
/// use bytes::Bytes;
///
/// struct Canned(&'static str);
///
/// impl HttpClient for Canned {
///     async fn execute(&self, _request: Request<Bytes>) -> Result<Response<ByteStream>> {
///         let body = ByteStream::from_bytes(Bytes::from_static(self.0.as_bytes()));
///         Ok(Response::new(200, HttpHeaders::new(), body))
///     }
/// }
/// ```
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request and return the response with its body unread.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason:
    /// - Network errors
    /// - TLS errors
    /// - Timeouts
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<ByteStream>>> + Send;
}

impl<C: HttpClient> HttpClient for Arc<C> {
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<ByteStream>>> + Send {
        (**self).execute(request)
    }
}

impl<C: HttpClient> HttpClient for &C {
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<ByteStream>>> + Send {
        (**self).execute(request)
    }
}
