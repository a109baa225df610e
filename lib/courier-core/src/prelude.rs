//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions
//! for easy glob importing:
//!
//! ```ignore
//! use courier_core::prelude::*;
//! ```

pub use crate::{
    Args, ByteStream, ContentKind, Error, HttpClient, HttpHeaders, JsonSerializer, Method,
    MethodDeclaration, Outcome, Param, Request, Response, Result, ReturnForm, Serializer,
    ServiceDeclaration, ServiceInterface,
};
