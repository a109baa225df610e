//! The calling surface of a declared service.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::runtime::Handle;

use crate::call::Call;
use crate::reply::Reply;
use crate::runtime::{self, Executor};
use crate::{
    Args, Error, HttpClient, JsonSerializer, Outcome, ProxyConfig, Result, ReturnShape,
    Serializer, ServiceDescriptor, ServiceInterface, invoke,
};

struct Inner<C, Z> {
    client: C,
    serializer: Z,
    service: Arc<ServiceDescriptor>,
}

/// Client for the service declared by `S`.
///
/// Every call runs the same asynchronous invocation on the proxy's runtime.
/// [`call`](Self::call) blocks on it for methods with a synchronous return
/// shape, [`call_async`](Self::call_async) hands back a [`Call`] for methods
/// with an asynchronous one. Cloning is cheap and clones share the client.
///
/// # Example
///
/// ```ignore
/// use courier::prelude::*;
///
/// struct Echo;
///
/// impl ServiceInterface for Echo {
///     fn declaration() -> ServiceDeclaration {
///         ServiceDeclaration::new("https://httpbin.org").method(
///             MethodDeclaration::get("status", "status/{code}")
///                 .param::<u16>(Param::path("code"))
///                 .returns::<()>(ReturnForm::Unit),
///         )
///     }
/// }
///
/// let proxy = RestProxy::<Echo, _>::new(HyperClient::new(), JsonSerializer)?;
/// proxy.call::<()>("status", Args::new().arg(204))?;
/// ```
pub struct RestProxy<S, C, Z = JsonSerializer> {
    inner: Arc<Inner<C, Z>>,
    executor: Executor,
    _service: PhantomData<fn() -> S>,
}

impl<S, C, Z> RestProxy<S, C, Z>
where
    S: ServiceInterface,
    C: HttpClient + 'static,
    Z: Serializer,
{
    /// Create a proxy running on the process-wide runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Descriptor`] if `S` is malformed, or
    /// [`Error::Runtime`] if the shared runtime cannot start.
    pub fn new(client: C, serializer: Z) -> Result<Self> {
        Self::build(client, serializer, Executor::shared()?)
    }

    /// Create a proxy with its own runtime, shut down when the last clone drops.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_config(client: C, serializer: Z, config: &ProxyConfig) -> Result<Self> {
        Self::build(client, serializer, Executor::owned(config)?)
    }

    /// Create a proxy running on a caller-owned runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Descriptor`] if `S` is malformed.
    pub fn with_handle(client: C, serializer: Z, handle: Handle) -> Result<Self> {
        Self::build(client, serializer, Executor::from_handle(handle))
    }

    fn build(client: C, serializer: Z, executor: Executor) -> Result<Self> {
        let service = courier_core::descriptor::<S>()?;
        tracing::debug!(
            interface = service.interface(),
            methods = service.methods().len(),
            "proxy ready"
        );
        Ok(Self {
            inner: Arc::new(Inner {
                client,
                serializer,
                service,
            }),
            executor,
            _service: PhantomData,
        })
    }

    /// The compiled descriptor of `S`.
    #[must_use]
    pub fn descriptor(&self) -> &Arc<ServiceDescriptor> {
        &self.inner.service
    }

    /// Invoke `method` on the current task, whatever its return shape.
    ///
    /// # Errors
    ///
    /// See [`courier_core::invoke`].
    pub async fn send<T>(&self, method: &str, args: Args) -> Result<Outcome<T>>
    where
        T: DeserializeOwned + Default,
    {
        let inner = &self.inner;
        invoke(&inner.client, &inner.serializer, &inner.service, method, args).await
    }

    /// Invoke a method with a synchronous return shape and block until it completes.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidReturnType`] if the method's return type is unsupported.
    /// - [`Error::ShapeMismatch`] if the method returns an asynchronous handle.
    /// - [`Error::Runtime`] if called from inside an async runtime.
    /// - Any error of the invocation itself.
    pub fn call<T>(&self, method: &str, args: Args) -> Result<Reply<T>>
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        let shape = self.shape(method)?;
        if let ReturnShape::Invalid {
            return_type,
            method,
        } = shape
        {
            return Err(Error::InvalidReturnType {
                return_type: return_type.clone(),
                method: method.clone(),
            });
        }
        if shape.is_async() {
            return Err(self.mismatch(method, shape, "a blocking call"));
        }
        if !Executor::can_block() {
            return Err(runtime::blocking_refused());
        }

        let outcome = self.spawn(method, args).wait()?;
        Ok(Reply::from_outcome(outcome, self.executor.clone()))
    }

    /// Invoke a method with an asynchronous return shape.
    ///
    /// Returns immediately; failures, including an unsupported or
    /// synchronous return shape, are delivered through the handle.
    pub fn call_async<T>(&self, method: &str, args: Args) -> Call<T>
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        match self.shape(method) {
            Ok(shape) if !shape.is_async() && !shape.is_invalid() => {
                let error = self.mismatch(method, shape, "an async call");
                Call::failed(&self.executor, error)
            }
            Err(error) => Call::failed(&self.executor, error),
            Ok(_) => self.spawn(method, args),
        }
    }

    fn spawn<T>(&self, method: &str, args: Args) -> Call<T>
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let method = method.to_string();
        Call::spawn(&self.executor, async move {
            invoke(&inner.client, &inner.serializer, &inner.service, &method, args).await
        })
    }

    fn shape(&self, method: &str) -> Result<&ReturnShape> {
        let service = &self.inner.service;
        service
            .method(method)
            .map(|descriptor| descriptor.return_shape())
            .ok_or_else(|| Error::UnknownMethod {
                interface: service.interface().to_string(),
                method: method.to_string(),
            })
    }

    fn mismatch(&self, method: &str, shape: &ReturnShape, requested: &'static str) -> Error {
        let method = self
            .inner
            .service
            .method(method)
            .map_or_else(|| method.to_string(), |d| d.signature().to_string());
        Error::ShapeMismatch {
            method,
            declared: shape.name(),
            requested,
        }
    }
}

impl<S, C, Z> Clone for RestProxy<S, C, Z> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            executor: self.executor.clone(),
            _service: PhantomData,
        }
    }
}

impl<S, C, Z> fmt::Debug for RestProxy<S, C, Z> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestProxy")
            .field("interface", &self.inner.service.interface())
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}
