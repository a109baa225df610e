//! Call-time arguments.

use std::fmt;

use bytes::Bytes;

/// One positional argument of a service call.
pub enum Arg {
    /// A value in its string form (path, query, header, raw-string body).
    Text(String),
    /// Raw bytes (raw-bytes body).
    Bytes(Bytes),
    /// An object for the serializer (serializable body).
    Object(Box<dyn erased_serde::Serialize + Send + Sync>),
    /// An optional argument left out.
    Absent,
}

impl Arg {
    /// Kind name, for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Object(_) => "object",
            Self::Absent => "absent",
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Object(_) => f.write_str("Object(..)"),
            Self::Absent => f.write_str("Absent"),
        }
    }
}

/// Positional arguments for one call, in declaration order.
///
/// # Example
///
/// ```
/// use courier_core::Args;
///
/// let args = Args::new()
///     .arg("httpbin")
///     .optional(None::<u32>)
///     .object(vec![1, 2, 3]);
/// assert_eq!(args.len(), 3);
/// ```
#[derive(Debug, Default)]
pub struct Args {
    values: Vec<Arg>,
}

impl Args {
    /// No arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value by its string form.
    #[must_use]
    pub fn arg(mut self, value: impl fmt::Display) -> Self {
        self.values.push(Arg::Text(value.to_string()));
        self
    }

    /// Append raw bytes.
    #[must_use]
    pub fn bytes(mut self, value: impl Into<Bytes>) -> Self {
        self.values.push(Arg::Bytes(value.into()));
        self
    }

    /// Append an object to be encoded by the serializer.
    #[must_use]
    pub fn object<T>(mut self, value: T) -> Self
    where
        T: serde::Serialize + Send + Sync + 'static,
    {
        self.values.push(Arg::Object(Box::new(value)));
        self
    }

    /// Append an optional value; `None` leaves the argument out.
    #[must_use]
    pub fn optional(mut self, value: Option<impl fmt::Display>) -> Self {
        self.values
            .push(value.map_or(Arg::Absent, |v| Arg::Text(v.to_string())));
        self
    }

    /// Append an already built argument.
    #[must_use]
    pub fn push(mut self, value: Arg) -> Self {
        self.values.push(value);
        self
    }

    /// Argument at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.values.get(index)
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<Arg> for Args {
    fn from_iter<I: IntoIterator<Item = Arg>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
