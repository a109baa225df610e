//! HTTP response handling.
//!
//! [`Response`] provides access to status, headers, and body. Transports hand
//! back a [`Response<ByteStream>`]; [`Response::collect`] buffers it.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use futures_util::StreamExt;

use crate::HttpHeaders;

// ============================================================================
// Byte Stream
// ============================================================================

type BoxedChunks = Pin<Box<dyn Stream<Item = crate::Result<Bytes>> + Send>>;

/// A single-pass stream of body chunks, not buffered into memory.
///
/// The underlying transport resource is released exactly once: when the
/// stream yields its last chunk, or when [`close`](Self::close) is called,
/// whichever happens first. Closing twice is a no-op.
pub struct ByteStream {
    inner: Option<BoxedChunks>,
}

impl ByteStream {
    /// Wrap a stream of chunks.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = crate::Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: Some(Box::pin(stream)),
        }
    }

    /// A stream yielding `bytes` once.
    #[must_use]
    pub fn from_bytes(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            return Self::empty();
        }
        Self::new(futures_util::stream::once(async move { Ok(bytes) }))
    }

    /// An already exhausted stream.
    #[must_use]
    pub const fn empty() -> Self {
        Self { inner: None }
    }

    /// Release the underlying resource without reading further.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            tracing::trace!("byte stream closed before end");
        }
    }

    /// Returns `true` once the stream is exhausted or closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Read the remaining chunks into one buffer.
    ///
    /// # Errors
    ///
    /// Returns the first chunk error.
    pub async fn collect(mut self) -> crate::Result<Bytes> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = self.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }
}

impl Stream for ByteStream {
    type Item = crate::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let Some(inner) = self.inner.as_mut() else {
            return Poll::Ready(None);
        };
        let polled = inner.as_mut().poll_next(cx);
        if let Poll::Ready(None) = polled {
            self.inner = None;
        }
        polled
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Default for ByteStream {
    fn default() -> Self {
        Self::empty()
    }
}

// ============================================================================
// Response
// ============================================================================

/// HTTP response with status, headers, and body.
#[derive(Debug, Clone)]
pub struct Response<B = Bytes> {
    status: u16,
    headers: HttpHeaders,
    body: B,
}

impl<B> Response<B> {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, headers: HttpHeaders, body: B) -> Self {
        Self {
            status,
            headers,
            body,
        }
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

    /// First header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &B {
        &self.body
    }

    /// Consume into body.
    #[must_use]
    pub fn into_body(self) -> B {
        self.body
    }

    /// Consume into (status, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (u16, HttpHeaders, B) {
        (self.status, self.headers, self.body)
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }

    /// Transform the body with a function.
    pub fn map_body<F, B2>(self, f: F) -> Response<B2>
    where
        F: FnOnce(B) -> B2,
    {
        Response {
            status: self.status,
            headers: self.headers,
            body: f(self.body),
        }
    }
}

impl Response<ByteStream> {
    /// Buffer the entire body.
    ///
    /// # Errors
    ///
    /// Returns an error if reading any chunk fails.
    pub async fn collect(self) -> crate::Result<Response<Bytes>> {
        let body = self.body.collect().await?;
        Ok(Response::new(self.status, self.headers, body))
    }
}

impl Response<Bytes> {
    /// Deserialize the response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        crate::from_json(&self.body)
    }

    /// Get the response body as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid UTF-8.
    pub fn text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use assert2::{check, let_assert};

    use super::*;

    fn json_headers() -> HttpHeaders {
        HttpHeaders::from_pairs([("Content-Type", "application/json")]).expect("valid")
    }

    #[test]
    fn response_basic() {
        let response = Response::new(200, json_headers(), Bytes::from(r#"{"id":1}"#));

        check!(response.status() == 200);
        check!(response.header("content-type") == Some("application/json"));
        check!(response.is_success());
        check!(!response.is_client_error());
        check!(!response.is_server_error());
    }

    #[test]
    fn response_json() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct User {
            id: u64,
            name: String,
        }

        let body = Bytes::from(r#"{"id":1,"name":"test"}"#);
        let response = Response::new(200, HttpHeaders::new(), body);

        let user: User = response.json().expect("deserialize");
        check!(
            user == User {
                id: 1,
                name: "test".to_string()
            }
        );
    }

    #[test]
    fn response_map_body() {
        let response = Response::new(200, HttpHeaders::new(), Bytes::from("test"));
        let mapped = response.map_body(|b| b.len());

        check!(mapped.status() == 200);
        check!(*mapped.body() == 4);
    }

    #[tokio::test]
    async fn byte_stream_collects_chunks() {
        let chunks = vec![Ok(Bytes::from("ab")), Ok(Bytes::from("cd"))];
        let stream = ByteStream::new(futures_util::stream::iter(chunks));
        let response = Response::new(200, HttpHeaders::new(), stream);

        let response = response.collect().await.expect("collect");
        check!(response.body().as_ref() == b"abcd");
    }

    #[tokio::test]
    async fn byte_stream_propagates_chunk_error() {
        let chunks = vec![Ok(Bytes::from("ab")), Err(crate::Error::connection("reset"))];
        let stream = ByteStream::new(futures_util::stream::iter(chunks));
        let_assert!(Err(crate::Error::Connection(_)) = stream.collect().await);
    }

    #[tokio::test]
    async fn byte_stream_releases_on_end() {
        let mut stream = ByteStream::from_bytes(Bytes::from_static(b"xy"));
        check!(!stream.is_closed());
        let_assert!(Some(Ok(chunk)) = stream.next().await);
        check!(chunk.as_ref() == b"xy");
        check!(stream.next().await.is_none());
        check!(stream.is_closed());
        check!(stream.next().await.is_none());
    }

    #[test]
    fn byte_stream_close_is_idempotent() {
        struct Guard(Arc<AtomicBool>);
        impl Drop for Guard {
            fn drop(&mut self) {
                check!(!self.0.swap(true, Ordering::SeqCst));
            }
        }

        let released = Arc::new(AtomicBool::new(false));
        let guard = Guard(Arc::clone(&released));
        let mut stream = ByteStream::new(futures_util::stream::once(async move {
            let _guard = guard;
            Ok(Bytes::new())
        }));

        stream.close();
        check!(released.load(Ordering::SeqCst));
        stream.close();
        check!(stream.is_closed());
    }

    #[test]
    fn empty_byte_stream_is_closed() {
        check!(ByteStream::from_bytes(Bytes::new()).is_closed());
        check!(ByteStream::default().is_closed());
    }
}
