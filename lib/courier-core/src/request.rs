//! HTTP request building.
//!
//! Use [`Request::builder`] to construct requests with headers, extensions and bodies.
//!
//! # Example
//!
//! ```
//! use courier_core::{Method, Request};
//! use bytes::Bytes;
//!
//! let url = "https://api.example.com".parse().expect("url");
//! let request = Request::<Bytes>::builder(Method::Get, url)
//!     .header("Accept", "application/json")
//!     .build()
//!     .expect("request");
//! assert_eq!(request.header("accept"), Some("application/json"));
//! ```

use bytes::Bytes;
use http::Extensions;

use crate::{Error, HttpHeaders, Method, Result};

/// An HTTP request with method, URL, headers, optional body and extensions.
#[derive(Debug, Clone)]
pub struct Request<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HttpHeaders,
    body: Option<B>,
    extensions: Extensions,
}

/// The parts of a [`Request`], as returned by [`Request::into_parts`].
pub type RequestParts<B> = (Method, url::Url, HttpHeaders, Option<B>, Extensions);

impl<B> Request<B> {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: url::Url) -> RequestBuilder<B> {
        RequestBuilder::new(method, url)
    }

    /// Reassemble a request from its parts.
    #[must_use]
    pub fn from_parts(
        method: Method,
        url: url::Url,
        headers: HttpHeaders,
        body: Option<B>,
        extensions: Extensions,
    ) -> Self {
        Self {
            method,
            url,
            headers,
            body,
            extensions,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HttpHeaders {
        &mut self.headers
    }

    /// First header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    /// Request extensions (e.g. [`crate::Operation`]).
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Mutable access to extensions.
    #[must_use]
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Consume into (method, url, headers, body, extensions).
    #[must_use]
    pub fn into_parts(self) -> RequestParts<B> {
        (
            self.method,
            self.url,
            self.headers,
            self.body,
            self.extensions,
        )
    }
}

/// Builder for constructing [`Request`] instances.
///
/// Header errors are deferred: the first invalid header is reported by
/// [`build`](Self::build).
#[derive(Debug)]
pub struct RequestBuilder<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HttpHeaders,
    body: Option<B>,
    extensions: Extensions,
    error: Option<Error>,
}

impl<B> RequestBuilder<B> {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HttpHeaders::new(),
            body: None,
            extensions: Extensions::new(),
            error: None,
        }
    }

    /// Sets a header, replacing any previous value.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.error.is_none()
            && let Err(e) = self.headers.set(name, value)
        {
            self.error = Some(e);
        }
        self
    }

    /// Replace all headers.
    #[must_use]
    pub fn headers(mut self, headers: HttpHeaders) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: B) -> Self {
        self.body = Some(body);
        self
    }

    /// Insert a typed extension.
    #[must_use]
    pub fn extension<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }

    /// Builds the [`Request`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if any header was invalid.
    pub fn build(self) -> Result<Request<B>> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            extensions: self.extensions,
        })
    }
}
