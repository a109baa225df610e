//! Core types for the courier declarative HTTP client.
//!
//! This crate holds the transport-agnostic engine:
//! - [`ServiceInterface`], [`ServiceDeclaration`], [`MethodDeclaration`] - declarative metadata
//! - [`compile`] and [`descriptor`] - the descriptor compiler and its process-wide cache
//! - [`invoke`] - the invocation engine, producing an [`Outcome`]
//! - [`UrlBuilder`], [`Template`] and [`encoding`] - URL assembly and percent-encoding
//! - [`HttpHeaders`] - case-insensitive header multimap
//! - [`Request`], [`Response`] and [`ByteStream`] - wire value objects
//! - [`HttpClient`] - the transport collaborator trait
//! - [`Serializer`] and [`JsonSerializer`] - the serializer collaborator
//! - [`Error`], [`DescriptorError`] and [`Result`] - error handling
//! - [`StatusCode`] - HTTP status codes (re-exported from `http` crate)
//! - [`header`] - HTTP header names (re-exported from `http` crate)

mod args;
mod cache;
mod client;
mod declaration;
mod descriptor;
pub mod encoding;
mod engine;
mod error;
mod headers;
mod method;
mod operation;
pub mod prelude;
mod request;
mod response;
mod serializer;
mod template;
mod url_builder;

pub use args::{Arg, Args};
pub use cache::descriptor;
pub use client::HttpClient;
pub use declaration::{
    MethodDeclaration, Param, ParamRole, ReturnForm, ServiceDeclaration, ServiceInterface,
};
pub use descriptor::{
    BodyBinding, ContentKind, ExceptionType, MethodDescriptor, ParamBinding, Payload,
    ReturnShape, ServiceDescriptor, UnexpectedResponseType, compile,
};
pub use engine::{Outcome, invoke};
pub use error::{DescriptorError, Error, Result, UnexpectedResponse};
pub use headers::HttpHeaders;
pub use method::Method;
pub use operation::Operation;
pub use request::{Request, RequestBuilder, RequestParts};
pub use response::{ByteStream, Response};
pub use serializer::{ContentType, JsonSerializer, Serializer, from_json, to_json};
pub use template::Template;
pub use url_builder::UrlBuilder;

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
