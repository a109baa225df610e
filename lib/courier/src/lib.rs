//! Declarative HTTP client for Rust.
//!
//! Declare a service once, as metadata on a marker type, and call its methods
//! by name. The declaration is compiled into a cached descriptor on first use;
//! each call builds the URL, headers and body from its arguments, sends the
//! request through a [`HyperClient`] (or any [`HttpClient`]), and maps the
//! response to a typed value or a typed error.
//!
//! # Example
//!
//! ```ignore
//! use courier::prelude::*;
//!
//! #[derive(Debug, Default, Deserialize)]
//! pub struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! struct UserApi;
//!
//! impl ServiceInterface for UserApi {
//!     fn declaration() -> ServiceDeclaration {
//!         ServiceDeclaration::new("https://api.example.com")
//!             .method(
//!                 MethodDeclaration::get("get_user", "users/{id}")
//!                     .param::<u64>(Param::path("id"))
//!                     .expected_responses([200])
//!                     .returns::<User>(ReturnForm::Payload),
//!             )
//!             .method(
//!                 MethodDeclaration::get("get_user_later", "users/{id}")
//!                     .param::<u64>(Param::path("id"))
//!                     .returns::<User>(ReturnForm::single(ReturnForm::Payload)),
//!             )
//!     }
//! }
//!
//! let proxy = RestProxy::<UserApi, _>::new(HyperClient::new(), JsonSerializer)?;
//!
//! // blocking
//! let user: User = proxy.call("get_user", Args::new().arg(42))?.into_value()?;
//!
//! // async
//! let user: User = proxy.call_async("get_user_later", Args::new().arg(42)).await?.into_value()?;
//! ```

mod call;
mod client;
mod config;
mod connector;
pub mod middleware;
pub mod prelude;
mod proxy;
mod reply;
mod runtime;

pub use call::Call;
pub use client::{BoxedService, HyperClient, HyperClientBuilder, ServiceFuture};
pub use config::{ClientConfig, ClientConfigBuilder, ProxyConfig, ProxyConfigBuilder};
pub use proxy::RestProxy;
pub use reply::{BlockingStream, Reply};

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use courier_core::{
    Arg, Args, BodyBinding, ByteStream, ContentKind, ContentType, DescriptorError, Error,
    ExceptionType, HttpClient, HttpHeaders, JsonSerializer, Method, MethodDeclaration,
    MethodDescriptor, Operation, Outcome, Param, ParamBinding, ParamRole, Payload, Request,
    RequestBuilder, Response, Result, ReturnForm, ReturnShape, Serializer, ServiceDeclaration,
    ServiceDescriptor, ServiceInterface, Template, UnexpectedResponse, UnexpectedResponseType,
    UrlBuilder, compile, descriptor, encoding, from_json, invoke, to_json,
};

// Re-export http types for status codes and headers
pub use courier_core::{StatusCode, header};
