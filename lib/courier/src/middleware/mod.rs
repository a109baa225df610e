//! Tower middleware layers for the courier HTTP transport.
//!
//! Layers wrap [`crate::HyperClient`]'s inner service through
//! [`crate::HyperClientBuilder::layer`]. Each one observes a
//! [`crate::Request`] and the unread [`crate::Response`]; the engine attaches
//! an [`crate::Operation`] extension so layers can tell which declared method
//! a request belongs to.
//!
//! # Available Layers
//!
//! - [`LoggingLayer`] - Logs requests/responses using `tracing`
//!
//! # Example
//!
//! ```ignore
//! use courier::HyperClient;
//! use courier::middleware::LoggingLayer;
//!
//! let client = HyperClient::builder()
//!     .layer(LoggingLayer::debug())
//!     .build();
//! ```

mod logging;

pub use logging::{LogLevel, Logging, LoggingLayer};

// Re-export tower's builder for ad-hoc composition
pub use tower::ServiceBuilder;
