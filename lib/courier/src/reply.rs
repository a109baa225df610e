//! Results of blocking calls.

use std::fmt;
use std::io::{self, Read};

use bytes::{Buf, Bytes};
use futures_util::StreamExt;

use crate::runtime::Executor;
use crate::{ByteStream, Error, Outcome, Result};

/// Result of a blocking call, shaped by the method's return shape.
#[derive(Debug)]
pub enum Reply<T> {
    /// Decoded payload.
    Value(T),
    /// Raw body bytes.
    Raw(Bytes),
    /// No value.
    Void,
    /// Live body, readable with [`std::io::Read`].
    Stream(BlockingStream),
}

impl<T> Reply<T> {
    pub(crate) fn from_outcome(outcome: Outcome<T>, executor: Executor) -> Self {
        match outcome {
            Outcome::Value(value) => Self::Value(value),
            Outcome::Raw(bytes) => Self::Raw(bytes),
            Outcome::Void => Self::Void,
            Outcome::Stream(stream) => Self::Stream(BlockingStream::new(stream, executor)),
        }
    }

    /// Kind name, for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Raw(_) => "raw",
            Self::Void => "void",
            Self::Stream(_) => "stream",
        }
    }

    /// Returns `true` if the call completed with no value.
    #[must_use]
    pub const fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    /// The decoded payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutcomeMismatch`] for any other reply.
    pub fn into_value(self) -> Result<T> {
        match self {
            Self::Value(value) => Ok(value),
            other => Err(other.mismatch("value")),
        }
    }

    /// The raw body bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutcomeMismatch`] for any other reply.
    pub fn into_raw(self) -> Result<Bytes> {
        match self {
            Self::Raw(bytes) => Ok(bytes),
            other => Err(other.mismatch("raw")),
        }
    }

    /// The readable body stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutcomeMismatch`] for any other reply.
    pub fn into_stream(self) -> Result<BlockingStream> {
        match self {
            Self::Stream(stream) => Ok(stream),
            other => Err(other.mismatch("stream")),
        }
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::OutcomeMismatch {
            expected,
            actual: self.kind(),
        }
    }
}

/// A response body read synchronously.
///
/// Each [`read`](Read::read) blocks until the next chunk arrives; `Ok(0)`
/// marks the end of the body. The connection is released when the body is
/// exhausted, on [`close`](Self::close), or on drop.
pub struct BlockingStream {
    stream: ByteStream,
    pending: Bytes,
    executor: Executor,
}

impl BlockingStream {
    pub(crate) fn new(stream: ByteStream, executor: Executor) -> Self {
        Self {
            stream,
            pending: Bytes::new(),
            executor,
        }
    }

    /// Stop reading and release the connection. Closing twice is a no-op.
    pub fn close(&mut self) {
        self.pending.clear();
        self.stream.close();
    }

    /// Returns `true` once the body is exhausted or closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pending.is_empty() && self.stream.is_closed()
    }
}

impl Read for BlockingStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pending.is_empty() {
            let next = self
                .executor
                .block_on(self.stream.next())
                .map_err(io::Error::other)?;
            match next {
                Some(Ok(chunk)) => self.pending = chunk,
                Some(Err(e)) => return Err(io::Error::other(e)),
                None => return Ok(0),
            }
        }

        let count = buf.len().min(self.pending.len());
        for (dst, src) in buf.iter_mut().zip(self.pending.iter()) {
            *dst = *src;
        }
        self.pending.advance(count);
        Ok(count)
    }
}

impl fmt::Debug for BlockingStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingStream")
            .field("pending", &self.pending.len())
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}
