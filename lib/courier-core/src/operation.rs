//! Operation metadata for middleware access.

use std::fmt;
use std::sync::Arc;

/// Identifies the service method a request was built for.
///
/// The engine stores this in the request extensions so that middleware can
/// log the declared method and path template (e.g. `anything/{path}`) rather
/// than the resolved URL.
///
/// # Example
///
/// ```ignore
/// // In middleware
/// if let Some(op) = request.extensions().get::<Operation>() {
///     tracing::info!(operation = %op, template = op.path_template());
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operation {
    interface: Arc<str>,
    method: Arc<str>,
    path_template: Arc<str>,
}

impl Operation {
    /// Create operation metadata.
    #[must_use]
    pub fn new(interface: &str, method: &str, path_template: &str) -> Self {
        Self {
            interface: Arc::from(interface),
            method: Arc::from(method),
            path_template: Arc::from(path_template),
        }
    }

    /// Interface name.
    #[must_use]
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Relative path template as declared.
    #[must_use]
    pub fn path_template(&self) -> &str {
        &self.path_template
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.interface, self.method)
    }
}
