//! Host and path templates with `{name}` placeholders.

use std::fmt;

use crate::DescriptorError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Part {
    Literal(String),
    Placeholder(String),
}

/// A parsed URL template such as `http://{hostName}.org` or `anything/{path}`.
///
/// The original text is kept so that middleware can log the pattern rather
/// than the resolved URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Template {
    source: String,
    parts: Vec<Part>,
}

impl Template {
    /// Parse a template.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::MalformedTemplate`] for an unterminated `{`,
    /// a stray `}` or an empty placeholder name.
    pub fn parse(source: impl Into<String>) -> Result<Self, DescriptorError> {
        let source = source.into();
        let malformed = |reason: &str| DescriptorError::MalformedTemplate {
            template: source.clone(),
            reason: reason.to_string(),
        };

        let mut parts = Vec::new();
        let mut rest = source.as_str();
        while !rest.is_empty() {
            let Some(open) = rest.find('{') else {
                if rest.contains('}') {
                    return Err(malformed("'}' without matching '{'"));
                }
                parts.push(Part::Literal(rest.to_string()));
                break;
            };
            let (literal, tail) = rest.split_at(open);
            if literal.contains('}') {
                return Err(malformed("'}' without matching '{'"));
            }
            if !literal.is_empty() {
                parts.push(Part::Literal(literal.to_string()));
            }
            let tail = tail.strip_prefix('{').unwrap_or(tail);
            let Some(close) = tail.find('}') else {
                return Err(malformed("unterminated placeholder"));
            };
            let (name, after) = tail.split_at(close);
            if name.is_empty() {
                return Err(malformed("empty placeholder name"));
            }
            if name.contains('{') {
                return Err(malformed("nested '{' in placeholder"));
            }
            parts.push(Part::Placeholder(name.to_string()));
            rest = after.strip_prefix('}').unwrap_or(after);
        }

        Ok(Self { source, parts })
    }

    /// Template text as declared.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names, in order of appearance. Repeats are kept.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            Part::Placeholder(name) => Some(name.as_str()),
            Part::Literal(_) => None,
        })
    }

    /// Returns `true` if the template contains `{name}`.
    #[must_use]
    pub fn has_placeholder(&self, name: &str) -> bool {
        self.placeholders().any(|p| p == name)
    }

    /// Substitute every placeholder with the value `lookup` returns for it.
    ///
    /// `lookup` is responsible for any encoding; literals are copied verbatim.
    ///
    /// # Errors
    ///
    /// Propagates the first error `lookup` returns.
    pub fn render<E>(&self, mut lookup: impl FnMut(&str) -> Result<String, E>) -> Result<String, E> {
        let mut out = String::with_capacity(self.source.len());
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Placeholder(name) => out.push_str(&lookup(name)?),
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl AsRef<str> for Template {
    fn as_ref(&self) -> &str {
        &self.source
    }
}
