//! Case-insensitive header multimap.

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::encoding::{join_header_values, split_header_value};
use crate::{Error, Result};

/// HTTP headers keyed case-insensitively, with multi-value access.
///
/// A header may hold several values, either as repeated entries or folded into
/// one comma-separated value. [`value`](Self::value) folds; [`values`](Self::values)
/// unfolds.
///
/// # Example
///
/// ```
/// use courier_core::HttpHeaders;
///
/// let mut headers = HttpHeaders::new();
/// headers.set("My-Header", "My,Header,Value").expect("valid header");
///
/// assert_eq!(headers.value("my-header").as_deref(), Some("My,Header,Value"));
/// assert_eq!(headers.values("MY-HEADER"), vec!["My", "Header", "Value"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    inner: HeaderMap,
}

impl HttpHeaders {
    /// Creates an empty header set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build headers from name/value pairs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for an invalid header name or value.
    pub fn from_pairs<I, N, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: AsRef<str>,
    {
        let mut headers = Self::new();
        for (name, value) in pairs {
            headers.append(name.as_ref(), value.as_ref())?;
        }
        Ok(headers)
    }

    /// Replace every value of `name` with `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for an invalid header name or value.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let (name, value) = parse(name, value)?;
        self.inner.insert(name, value);
        Ok(())
    }

    /// Add `value` to `name`, keeping existing values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for an invalid header name or value.
    pub fn append(&mut self, name: &str, value: &str) -> Result<()> {
        let (name, value) = parse(name, value)?;
        self.inner.append(name, value);
        Ok(())
    }

    /// Remove every value of `name`.
    pub fn remove(&mut self, name: &str) {
        self.inner.remove(name);
    }

    /// First value of `name`, if it is valid UTF-8.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(name).and_then(|v| v.to_str().ok())
    }

    /// All values of `name` folded into one, joined by `,`.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<String> {
        let mut values = self
            .inner
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .peekable();
        values.peek()?;
        Some(join_header_values(values))
    }

    /// All values of `name`, each entry split on `,`.
    #[must_use]
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.inner
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(split_header_value)
            .collect()
    }

    /// Returns `true` if `name` has at least one value.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Iterate over `(name, value)` entries; repeated headers appear repeatedly.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .iter()
            .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?)))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Borrow as an [`http::HeaderMap`].
    #[must_use]
    pub fn as_header_map(&self) -> &HeaderMap {
        &self.inner
    }

    /// Convert into an [`http::HeaderMap`].
    #[must_use]
    pub fn into_header_map(self) -> HeaderMap {
        self.inner
    }
}

impl From<HeaderMap> for HttpHeaders {
    fn from(inner: HeaderMap) -> Self {
        Self { inner }
    }
}

/// Headers from a structural mapping such as `{"Accept": "a,b", "X-Id": 7}`.
///
/// Non-string scalars are rendered as JSON; entries that are not valid
/// headers are skipped.
impl From<&serde_json::Map<String, serde_json::Value>> for HttpHeaders {
    fn from(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut headers = Self::new();
        for (name, value) in map {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if let Ok((name, value)) = parse(name, &value) {
                headers.inner.append(name, value);
            }
        }
        headers
    }
}

fn parse(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::try_from(name)
        .map_err(|e| Error::invalid_request(format!("invalid header name '{name}': {e}")))?;
    let header_value = HeaderValue::try_from(value)
        .map_err(|e| Error::invalid_request(format!("invalid value for header '{name}': {e}")))?;
    Ok((header_name, header_value))
}
