//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions
//! for easy glob importing:
//!
//! ```ignore
//! use courier::prelude::*;
//! ```

pub use crate::{
    Args, BlockingStream, Call, ClientConfig, Error, HttpClient, HttpHeaders, HyperClient,
    JsonSerializer, Method, MethodDeclaration, Outcome, Param, ProxyConfig, Reply, Result,
    RestProxy, ReturnForm, ServiceDeclaration, ServiceInterface, StatusCode, header,
};
pub use serde::{Deserialize, Serialize};
