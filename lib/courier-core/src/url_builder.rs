//! Absolute URL assembly from host and path templates.

use std::collections::HashMap;

use url::Url;

use crate::encoding::{HOST, PATH_SEGMENT, QUERY_COMPONENT, normalize_encoded, percent_encode};
use crate::{Error, Result, Template};

#[derive(Debug, Clone)]
struct Value {
    text: String,
    encoded: bool,
}

impl Value {
    fn render(&self, set: &'static percent_encoding::AsciiSet) -> String {
        if self.encoded {
            normalize_encoded(&self.text).into_owned()
        } else {
            percent_encode(&self.text, set)
        }
    }
}

/// Builds an absolute URL from a host template, a path template and
/// call-time values.
///
/// Host placeholders are substituted before path placeholders. Query
/// parameters are appended in the order they were added.
///
/// # Example
///
/// ```
/// use courier_core::{Template, UrlBuilder};
///
/// let host = Template::parse("http://{hostName}.org").expect("host");
/// let path = Template::parse("anything/{path}").expect("path");
/// let url = UrlBuilder::new(&host, &path)
///     .host_param("hostName", "httpbin", false)
///     .path_param("path", "with path+param", false)
///     .query_param("a", "A%20Z", false)
///     .build()
///     .expect("url");
///
/// assert_eq!(url.as_str(), "http://httpbin.org/anything/with%20path+param?a=A%2520Z");
/// ```
#[derive(Debug, Clone)]
pub struct UrlBuilder<'t> {
    host: &'t Template,
    path: &'t Template,
    host_params: HashMap<String, Value>,
    path_params: HashMap<String, Value>,
    query: Vec<(String, Value)>,
}

impl<'t> UrlBuilder<'t> {
    /// Creates a builder over the two templates.
    #[must_use]
    pub fn new(host: &'t Template, path: &'t Template) -> Self {
        Self {
            host,
            path,
            host_params: HashMap::new(),
            path_params: HashMap::new(),
            query: Vec::new(),
        }
    }

    /// Bind a host placeholder.
    #[must_use]
    pub fn host_param(mut self, name: &str, value: impl Into<String>, encoded: bool) -> Self {
        self.host_params.insert(
            name.to_string(),
            Value {
                text: value.into(),
                encoded,
            },
        );
        self
    }

    /// Bind a path placeholder.
    #[must_use]
    pub fn path_param(mut self, name: &str, value: impl Into<String>, encoded: bool) -> Self {
        self.path_params.insert(
            name.to_string(),
            Value {
                text: value.into(),
                encoded,
            },
        );
        self
    }

    /// Append a query parameter.
    ///
    /// An unencoded value is encoded even if it already holds escapes, so
    /// `A%20Z` becomes `A%2520Z`.
    #[must_use]
    pub fn query_param(mut self, name: &str, value: impl Into<String>, encoded: bool) -> Self {
        self.query.push((
            name.to_string(),
            Value {
                text: value.into(),
                encoded,
            },
        ));
        self
    }

    /// Assemble and parse the URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if a placeholder has no value, or
    /// [`Error::InvalidUrl`] if the result is not an absolute URL.
    pub fn build(self) -> Result<Url> {
        let host = self.host.render(|name| {
            lookup(&self.host_params, name, self.host).map(|value| value.render(HOST))
        })?;
        let path = self.path.render(|name| {
            lookup(&self.path_params, name, self.path).map(|value| value.render(PATH_SEGMENT))
        })?;

        let mut url = join(&host, &path);
        let mut separator = if url.contains('?') { '&' } else { '?' };
        for (name, value) in &self.query {
            url.push(separator);
            url.push_str(&percent_encode(name, QUERY_COMPONENT));
            url.push('=');
            url.push_str(&value.render(QUERY_COMPONENT));
            separator = '&';
        }

        tracing::trace!(url = %url, "built request URL");
        Ok(Url::parse(&url)?)
    }
}

fn lookup<'a>(params: &'a HashMap<String, Value>, name: &str, template: &Template) -> Result<&'a Value> {
    params.get(name).ok_or_else(|| {
        Error::invalid_request(format!("no value for placeholder {{{name}}} in '{template}'"))
    })
}

fn join(host: &str, path: &str) -> String {
    if path.is_empty() {
        return host.to_string();
    }
    let host = host.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{host}/{path}")
}
