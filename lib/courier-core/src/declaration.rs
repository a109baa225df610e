//! Declarative service metadata.
//!
//! A service is declared once, as plain data, and compiled into a
//! [`crate::ServiceDescriptor`] on first use.
//!
//! # Example
//!
//! ```
//! use courier_core::{MethodDeclaration, Param, ReturnForm, ServiceDeclaration, ServiceInterface};
//!
//! struct HttpBin;
//!
//! impl ServiceInterface for HttpBin {
//!     fn declaration() -> ServiceDeclaration {
//!         ServiceDeclaration::new("http://{hostName}.org")
//!             .method(
//!                 MethodDeclaration::get("get_anything", "anything/{path}")
//!                     .param::<&str>(Param::host("hostName"))
//!                     .param::<&str>(Param::path("path").encoded())
//!                     .expected_responses([200])
//!                     .returns::<serde_json::Value>(ReturnForm::Payload),
//!             )
//!     }
//! }
//! ```

use std::any::{Any, type_name};
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::descriptor::{ContentKind, ExceptionType};
use crate::{Method, Result};

/// A type with a declared HTTP service surface.
pub trait ServiceInterface: 'static {
    /// The service's declarative metadata.
    fn declaration() -> ServiceDeclaration;
}

/// Declarative metadata for a whole service.
#[derive(Debug, Clone)]
pub struct ServiceDeclaration {
    pub(crate) host: String,
    pub(crate) methods: Vec<MethodDeclaration>,
}

impl ServiceDeclaration {
    /// A service reached through `host`, which may hold `{name}` placeholders.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            methods: Vec::new(),
        }
    }

    /// Declare a method.
    #[must_use]
    pub fn method(mut self, method: MethodDeclaration) -> Self {
        self.methods.push(method);
        self
    }
}

/// Where a parameter goes in the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamRole {
    /// Substituted into the host template.
    Host(String),
    /// Substituted into the relative path template.
    Path(String),
    /// Appended as a query parameter.
    Query(String),
    /// Sent as a header.
    Header(String),
    /// Sent as the request body.
    Body(ContentKind),
}

/// A declared parameter role, with its `encoded` flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub(crate) role: ParamRole,
    pub(crate) encoded: bool,
}

impl Param {
    const fn new(role: ParamRole) -> Self {
        Self {
            role,
            encoded: false,
        }
    }

    /// Host template placeholder.
    #[must_use]
    pub fn host(name: impl Into<String>) -> Self {
        Self::new(ParamRole::Host(name.into()))
    }

    /// Path template placeholder.
    #[must_use]
    pub fn path(name: impl Into<String>) -> Self {
        Self::new(ParamRole::Path(name.into()))
    }

    /// Query parameter.
    #[must_use]
    pub fn query(name: impl Into<String>) -> Self {
        Self::new(ParamRole::Query(name.into()))
    }

    /// Header parameter.
    #[must_use]
    pub fn header(name: impl Into<String>) -> Self {
        Self::new(ParamRole::Header(name.into()))
    }

    /// Request body.
    #[must_use]
    pub const fn body(kind: ContentKind) -> Self {
        Self::new(ParamRole::Body(kind))
    }

    /// The argument is already percent-encoded.
    #[must_use]
    pub const fn encoded(mut self) -> Self {
        self.encoded = true;
        self
    }
}

/// Structure of a declared return type.
///
/// The descriptor compiler classifies it into a [`crate::ReturnShape`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnForm {
    /// A payload decoded by the serializer.
    Payload,
    /// The raw body bytes.
    Raw,
    /// Nothing.
    Unit,
    /// A live byte stream over the body.
    ByteStream,
    /// A single-value asynchronous wrapper.
    Single(Box<ReturnForm>),
    /// A payload-less asynchronous completion signal.
    Completion,
    /// A multi-element asynchronous sequence.
    Sequence(Box<ReturnForm>),
}

impl ReturnForm {
    /// Single-value asynchronous wrapper around `inner`.
    #[must_use]
    pub fn single(inner: Self) -> Self {
        Self::Single(Box::new(inner))
    }

    /// Multi-element asynchronous sequence of `inner`.
    #[must_use]
    pub fn sequence(inner: Self) -> Self {
        Self::Sequence(Box::new(inner))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ParamDeclaration {
    pub(crate) param: Param,
    pub(crate) type_name: &'static str,
}

/// Declarative metadata for one method.
#[derive(Debug, Clone)]
pub struct MethodDeclaration {
    pub(crate) name: String,
    pub(crate) verbs: Vec<(Method, String)>,
    pub(crate) params: Vec<ParamDeclaration>,
    pub(crate) static_headers: Vec<(String, String)>,
    pub(crate) expected: Vec<u16>,
    pub(crate) unexpected: Option<ExceptionType>,
    pub(crate) return_type: &'static str,
    pub(crate) return_form: ReturnForm,
}

macro_rules! verb_constructor {
    ($(#[$doc:meta] $fn_name:ident => $method:ident),* $(,)?) => {
        $(
            #[$doc]
            #[must_use]
            pub fn $fn_name(name: impl Into<String>, path: impl Into<String>) -> Self {
                Self::new(name).verb(Method::$method, path)
            }
        )*
    };
}

impl MethodDeclaration {
    /// A method with no verb yet; it returns unit.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            verbs: Vec::new(),
            params: Vec::new(),
            static_headers: Vec::new(),
            expected: Vec::new(),
            unexpected: None,
            return_type: type_name::<()>(),
            return_form: ReturnForm::Unit,
        }
    }

    verb_constructor! {
        /// A `GET` method.
        get => Get,
        /// A `PUT` method.
        put => Put,
        /// A `POST` method.
        post => Post,
        /// A `PATCH` method.
        patch => Patch,
        /// A `DELETE` method.
        delete => Delete,
        /// A `HEAD` method.
        head => Head,
    }

    /// Attach an HTTP verb and relative path template.
    ///
    /// Attaching more than one is rejected when the service is compiled.
    #[must_use]
    pub fn verb(mut self, method: Method, path: impl Into<String>) -> Self {
        self.verbs.push((method, path.into()));
        self
    }

    /// Declare the next positional parameter, of type `T`.
    #[must_use]
    pub fn param<T: ?Sized>(mut self, param: Param) -> Self {
        self.params.push(ParamDeclaration {
            param,
            type_name: type_name::<T>(),
        });
        self
    }

    /// Send a literal header on every call.
    #[must_use]
    pub fn static_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.static_headers.push((name.into(), value.into()));
        self
    }

    /// Status codes that count as success. Without any, every 2xx does.
    #[must_use]
    pub fn expected_responses(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.expected.extend(codes);
        self
    }

    /// Decode unexpected response bodies into `E`.
    #[must_use]
    pub fn unexpected_response_type<E>(mut self) -> Self
    where
        E: DeserializeOwned + Send + Sync + 'static,
    {
        self.unexpected = Some(ExceptionType {
            type_name: type_name::<E>(),
            decode: decode_exception::<E>,
        });
        self
    }

    /// Declare the return type `R` and its structure.
    #[must_use]
    pub fn returns<R: ?Sized>(mut self, form: ReturnForm) -> Self {
        self.return_type = type_name::<R>();
        self.return_form = form;
        self
    }
}

fn decode_exception<E>(mapping: &serde_json::Value) -> Result<Arc<dyn Any + Send + Sync>>
where
    E: DeserializeOwned + Send + Sync + 'static,
{
    let value: E = serde_path_to_error::deserialize(mapping)
        .map_err(|e| crate::Error::deserialization(e.path().to_string(), e.inner().to_string()))?;
    Ok(Arc::new(value))
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;

    #[test]
    fn verb_constructors() {
        let method = MethodDeclaration::head("head_anything", "anything");
        check!(method.verbs == vec![(Method::Head, "anything".to_string())]);
        check!(method.return_form == ReturnForm::Unit);
        check!(method.return_type == "()");
    }

    #[test]
    fn params_capture_type_names() {
        let method = MethodDeclaration::get("get", "anything/{path}")
            .param::<str>(Param::path("path").encoded())
            .param::<u32>(Param::query("page"));

        check!(method.params.len() == 2);
        check!(method.params[0].type_name == "str");
        check!(method.params[0].param.encoded);
        check!(method.params[1].type_name == "u32");
        check!(!method.params[1].param.encoded);
    }

    #[test]
    fn exception_type_decodes_mapping() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Problem {
            data: String,
        }

        let method = MethodDeclaration::get("get", "status/404").unexpected_response_type::<Problem>();
        let exception = method.unexpected.expect("declared");
        check!(exception.type_name.ends_with("Problem"));

        let value = (exception.decode)(&serde_json::json!({ "data": "x" })).expect("decode");
        check!(value.downcast_ref::<Problem>() == Some(&Problem { data: "x".into() }));

        check!((exception.decode)(&serde_json::json!([1, 2])).is_err());
    }
}
