//! Compiled, immutable service descriptors.
//!
//! [`compile`] validates a [`ServiceDeclaration`] once and produces the
//! descriptor the engine consults on every call. All structural mistakes
//! (missing verbs, unbound placeholders, two bodies) are reported here, never
//! while a call is in flight.

use std::any::Any;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::declaration::{MethodDeclaration, ParamDeclaration, ParamRole, ReturnForm};
use crate::{DescriptorError, HttpHeaders, Method, Operation, Result, ServiceDeclaration, Template};

// ============================================================================
// Bindings
// ============================================================================

/// How a request body argument is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// Bytes passed through verbatim (`application/octet-stream`).
    RawBytes,
    /// A string passed through verbatim (`text/plain`).
    RawString,
    /// An object encoded by the serializer.
    Serializable,
}

/// A host, path, query or header parameter bound to an argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBinding {
    /// Placeholder or parameter name.
    pub name: String,
    /// Argument index.
    pub index: usize,
    /// The argument is already percent-encoded.
    pub encoded: bool,
}

/// The argument sent as request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyBinding {
    /// Argument index.
    pub index: usize,
    /// How the argument is sent.
    pub kind: ContentKind,
}

/// A caller-declared payload type for unexpected responses.
#[derive(Clone, Copy)]
pub struct ExceptionType {
    pub(crate) type_name: &'static str,
    pub(crate) decode: fn(&serde_json::Value) -> Result<Arc<dyn Any + Send + Sync>>,
}

impl ExceptionType {
    /// Name of the payload type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Decode a structural mapping into the payload type.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Deserialization`] if the mapping does not fit.
    pub fn decode(&self, mapping: &serde_json::Value) -> Result<Arc<dyn Any + Send + Sync>> {
        (self.decode)(mapping)
    }
}

impl fmt::Debug for ExceptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExceptionType").field(&self.type_name).finish()
    }
}

/// Exception shape raised for a status outside the expected set.
#[derive(Debug, Clone, Copy, Default)]
pub enum UnexpectedResponseType {
    /// [`crate::Error::UnexpectedStatus`], carrying a structural mapping.
    #[default]
    Default,
    /// [`crate::Error::ServiceError`], carrying the declared payload type.
    Declared(ExceptionType),
}

// ============================================================================
// Return Shape
// ============================================================================

/// How a successful body is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Payload {
    /// Decoded by the serializer.
    Decoded,
    /// Raw bytes.
    Raw,
}

/// Classification of a declared return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReturnShape {
    /// Blocking call returning a value.
    Value(Payload),
    /// Blocking call returning nothing.
    Void,
    /// Blocking call returning a live byte stream.
    Stream,
    /// Asynchronous handle resolving to a value.
    AsyncValue(Payload),
    /// Asynchronous handle resolving with no value.
    AsyncVoidSignal,
    /// Asynchronous handle resolving to a live byte stream.
    AsyncStream,
    /// Unsupported return type.
    Invalid {
        /// Declared return type.
        return_type: String,
        /// Fully qualified method signature.
        method: String,
    },
}

impl ReturnShape {
    fn classify(form: &ReturnForm, return_type: &str, signature: &str) -> Self {
        match form {
            ReturnForm::Payload => Self::Value(Payload::Decoded),
            ReturnForm::Raw => Self::Value(Payload::Raw),
            ReturnForm::Unit => Self::Void,
            ReturnForm::ByteStream => Self::Stream,
            ReturnForm::Completion => Self::AsyncVoidSignal,
            ReturnForm::Single(inner) => match inner.as_ref() {
                ReturnForm::Payload => Self::AsyncValue(Payload::Decoded),
                ReturnForm::Raw => Self::AsyncValue(Payload::Raw),
                ReturnForm::Unit => Self::AsyncVoidSignal,
                ReturnForm::ByteStream => Self::AsyncStream,
                _ => Self::invalid(return_type, signature),
            },
            ReturnForm::Sequence(_) => Self::invalid(return_type, signature),
        }
    }

    fn invalid(return_type: &str, signature: &str) -> Self {
        Self::Invalid {
            return_type: return_type.to_string(),
            method: signature.to_string(),
        }
    }

    /// Returns `true` for the shapes delivered through an asynchronous handle.
    #[must_use]
    pub const fn is_async(&self) -> bool {
        matches!(
            self,
            Self::AsyncValue(_) | Self::AsyncVoidSignal | Self::AsyncStream
        )
    }

    /// Returns `true` for the unsupported shape.
    #[must_use]
    pub const fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }

    /// Shape name, for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Void => "void",
            Self::Stream => "stream",
            Self::AsyncValue(_) => "async-value",
            Self::AsyncVoidSignal => "async-void-signal",
            Self::AsyncStream => "async-stream",
            Self::Invalid { .. } => "invalid",
        }
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// The compiled wire contract of one method.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    name: String,
    signature: String,
    http_method: Method,
    path: Template,
    host_params: Vec<ParamBinding>,
    path_params: Vec<ParamBinding>,
    query_params: Vec<ParamBinding>,
    header_params: Vec<ParamBinding>,
    body: Option<BodyBinding>,
    static_headers: HttpHeaders,
    expected: BTreeSet<u16>,
    unexpected_response: UnexpectedResponseType,
    return_type: &'static str,
    return_shape: ReturnShape,
    operation: Operation,
}

impl MethodDescriptor {
    /// Method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully qualified signature, e.g. `my_crate::Service.get(&str)`.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// HTTP verb.
    #[must_use]
    pub const fn http_method(&self) -> Method {
        self.http_method
    }

    /// Relative path template.
    #[must_use]
    pub fn path(&self) -> &Template {
        &self.path
    }

    /// Host template parameters.
    #[must_use]
    pub fn host_params(&self) -> &[ParamBinding] {
        &self.host_params
    }

    /// Path template parameters.
    #[must_use]
    pub fn path_params(&self) -> &[ParamBinding] {
        &self.path_params
    }

    /// Query parameters, in declaration order.
    #[must_use]
    pub fn query_params(&self) -> &[ParamBinding] {
        &self.query_params
    }

    /// Header parameters.
    #[must_use]
    pub fn header_params(&self) -> &[ParamBinding] {
        &self.header_params
    }

    /// Body parameter.
    #[must_use]
    pub const fn body(&self) -> Option<BodyBinding> {
        self.body
    }

    /// Headers sent on every call.
    #[must_use]
    pub fn static_headers(&self) -> &HttpHeaders {
        &self.static_headers
    }

    /// Expected status codes; empty means any 2xx.
    #[must_use]
    pub fn expected_status_codes(&self) -> &BTreeSet<u16> {
        &self.expected
    }

    /// Exception shape for unexpected statuses.
    #[must_use]
    pub const fn unexpected_response(&self) -> UnexpectedResponseType {
        self.unexpected_response
    }

    /// Declared return type name, as given to `returns::<R>`.
    #[must_use]
    pub const fn return_type(&self) -> &'static str {
        self.return_type
    }

    /// Return shape.
    #[must_use]
    pub fn return_shape(&self) -> &ReturnShape {
        &self.return_shape
    }

    /// Request extension identifying this method.
    #[must_use]
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Returns `true` if `status` counts as success.
    #[must_use]
    pub fn accepts(&self, status: u16) -> bool {
        if self.expected.is_empty() {
            (200..300).contains(&status)
        } else {
            self.expected.contains(&status)
        }
    }
}

/// The compiled wire contract of a whole service.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    interface: String,
    host: Template,
    methods: Vec<MethodDescriptor>,
}

impl ServiceDescriptor {
    /// Interface name.
    #[must_use]
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Host template.
    #[must_use]
    pub fn host(&self) -> &Template {
        &self.host
    }

    /// Method by name.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Methods, in declaration order.
    #[must_use]
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Compile a service declaration.
///
/// Pure and deterministic: compiling the same declaration twice yields equal
/// descriptors.
///
/// # Errors
///
/// Returns a [`DescriptorError`] for any structural mistake in the
/// declaration. Unsupported return types are not errors here; they compile
/// to [`ReturnShape::Invalid`] and fail when the method is called.
pub fn compile(
    interface: &str,
    declaration: &ServiceDeclaration,
) -> std::result::Result<ServiceDescriptor, DescriptorError> {
    let host = Template::parse(declaration.host.as_str())?;
    let mut names = HashSet::new();
    let mut methods = Vec::with_capacity(declaration.methods.len());
    for method in &declaration.methods {
        if !names.insert(method.name.as_str()) {
            return Err(DescriptorError::DuplicateMethod {
                method: method.name.clone(),
            });
        }
        methods.push(compile_method(interface, &host, method)?);
    }

    tracing::debug!(interface, methods = methods.len(), "compiled service descriptor");
    Ok(ServiceDescriptor {
        interface: interface.to_string(),
        host,
        methods,
    })
}

#[derive(Default)]
struct Bindings {
    host: Vec<ParamBinding>,
    path: Vec<ParamBinding>,
    query: Vec<ParamBinding>,
    header: Vec<ParamBinding>,
    body: Option<BodyBinding>,
}

fn compile_method(
    interface: &str,
    host: &Template,
    declaration: &MethodDeclaration,
) -> std::result::Result<MethodDescriptor, DescriptorError> {
    let name = declaration.name.as_str();
    let (http_method, path) = match declaration.verbs.as_slice() {
        [] => {
            return Err(DescriptorError::MissingVerb {
                method: name.to_string(),
            });
        }
        [(method, path)] => (*method, Template::parse(path.as_str())?),
        _ => {
            return Err(DescriptorError::DuplicateVerb {
                method: name.to_string(),
            });
        }
    };

    let bindings = bind_params(name, host, &path, &declaration.params)?;
    check_all_bound(name, host, &bindings.host)?;
    check_all_bound(name, &path, &bindings.path)?;

    let mut static_headers = HttpHeaders::new();
    for (header, value) in &declaration.static_headers {
        static_headers
            .append(header, value)
            .map_err(|e| DescriptorError::InvalidHeader {
                method: name.to_string(),
                name: header.clone(),
                reason: e.to_string(),
            })?;
    }

    let signature = signature(interface, name, &declaration.params);
    let return_shape =
        ReturnShape::classify(&declaration.return_form, declaration.return_type, &signature);
    if return_shape.is_invalid() {
        tracing::debug!(method = %signature, return_type = declaration.return_type, "unsupported return type");
    }

    Ok(MethodDescriptor {
        operation: Operation::new(interface, name, path.as_str()),
        name: name.to_string(),
        signature,
        http_method,
        path,
        host_params: bindings.host,
        path_params: bindings.path,
        query_params: bindings.query,
        header_params: bindings.header,
        body: bindings.body,
        static_headers,
        expected: declaration.expected.iter().copied().collect(),
        unexpected_response: declaration
            .unexpected
            .map_or(UnexpectedResponseType::Default, UnexpectedResponseType::Declared),
        return_type: declaration.return_type,
        return_shape,
    })
}

fn bind_params(
    method: &str,
    host: &Template,
    path: &Template,
    params: &[ParamDeclaration],
) -> std::result::Result<Bindings, DescriptorError> {
    let mut bindings = Bindings::default();
    for (index, declared) in params.iter().enumerate() {
        let encoded = declared.param.encoded;
        let binding = |name: &str| ParamBinding {
            name: name.to_string(),
            index,
            encoded,
        };
        match &declared.param.role {
            ParamRole::Host(name) => {
                claim(method, index, name, host, &bindings.host)?;
                bindings.host.push(binding(name));
            }
            ParamRole::Path(name) => {
                claim(method, index, name, path, &bindings.path)?;
                bindings.path.push(binding(name));
            }
            ParamRole::Query(name) => bindings.query.push(binding(name)),
            ParamRole::Header(name) => bindings.header.push(binding(name)),
            ParamRole::Body(kind) => {
                if bindings.body.is_some() {
                    return Err(DescriptorError::DuplicateBody {
                        method: method.to_string(),
                    });
                }
                bindings.body = Some(BodyBinding { index, kind: *kind });
            }
        }
    }
    Ok(bindings)
}

fn claim(
    method: &str,
    index: usize,
    placeholder: &str,
    template: &Template,
    claimed: &[ParamBinding],
) -> std::result::Result<(), DescriptorError> {
    if !template.has_placeholder(placeholder) {
        return Err(DescriptorError::UnknownPlaceholder {
            method: method.to_string(),
            index,
            placeholder: placeholder.to_string(),
            template: template.to_string(),
        });
    }
    if claimed.iter().any(|b| b.name == placeholder) {
        return Err(DescriptorError::DuplicatePlaceholder {
            method: method.to_string(),
            placeholder: placeholder.to_string(),
        });
    }
    Ok(())
}

fn check_all_bound(
    method: &str,
    template: &Template,
    bound: &[ParamBinding],
) -> std::result::Result<(), DescriptorError> {
    match template
        .placeholders()
        .find(|placeholder| !bound.iter().any(|b| b.name == *placeholder))
    {
        Some(placeholder) => Err(DescriptorError::UnboundPlaceholder {
            method: method.to_string(),
            placeholder: placeholder.to_string(),
            template: template.to_string(),
        }),
        None => Ok(()),
    }
}

fn signature(interface: &str, method: &str, params: &[ParamDeclaration]) -> String {
    let types: Vec<&str> = params.iter().map(|p| p.type_name).collect();
    format!("{interface}.{method}({})", types.join(", "))
}
