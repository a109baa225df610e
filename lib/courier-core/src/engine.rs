//! The invocation engine.
//!
//! [`invoke`] drives one call through `Building → Dispatched → Classified →
//! Completed | Failed`. It is the single asynchronous primitive every calling
//! convention runs through, and it suspends only while the transport runs.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::{Instrument, debug, info_span, trace};

use crate::descriptor::{
    BodyBinding, ContentKind, MethodDescriptor, ParamBinding, Payload, ReturnShape,
    UnexpectedResponseType,
};
use crate::{
    Arg, Args, ByteStream, Error, HttpClient, HttpHeaders, Request, Response, Result, Serializer,
    ServiceDescriptor, UnexpectedResponse, UrlBuilder, header,
};

/// The completed result of a call, shaped by the method's return shape.
#[derive(Debug)]
pub enum Outcome<T> {
    /// Decoded payload.
    Value(T),
    /// Raw body bytes.
    Raw(Bytes),
    /// No value.
    Void,
    /// Live, unbuffered body.
    Stream(ByteStream),
}

impl<T> Outcome<T> {
    /// Kind name, for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::Raw(_) => "raw",
            Self::Void => "void",
            Self::Stream(_) => "stream",
        }
    }

    /// Returns `true` if the call completed with no value.
    #[must_use]
    pub const fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    /// The decoded payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutcomeMismatch`] for any other outcome.
    pub fn into_value(self) -> Result<T> {
        match self {
            Self::Value(value) => Ok(value),
            other => Err(other.mismatch("value")),
        }
    }

    /// The raw body bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutcomeMismatch`] for any other outcome.
    pub fn into_raw(self) -> Result<Bytes> {
        match self {
            Self::Raw(bytes) => Ok(bytes),
            other => Err(other.mismatch("raw")),
        }
    }

    /// The live body stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutcomeMismatch`] for any other outcome.
    pub fn into_stream(self) -> Result<ByteStream> {
        match self {
            Self::Stream(stream) => Ok(stream),
            other => Err(other.mismatch("stream")),
        }
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::OutcomeMismatch {
            expected,
            actual: self.kind(),
        }
    }
}

/// Invoke `method` of `service` with `args`.
///
/// `T` is the declared payload type; methods returning raw bytes, a stream
/// or nothing may use `()`. A `HEAD` call or an empty success body yields
/// `T::default()`.
///
/// # Errors
///
/// - [`Error::UnknownMethod`] if the service declares no such method.
/// - [`Error::InvalidReturnType`] if the method's return type is unsupported.
/// - [`Error::ShapeMismatch`] if `T` is not the declared payload type.
/// - [`Error::Argument`] if an argument does not fit its parameter.
/// - Transport errors, unchanged.
/// - [`Error::UnexpectedStatus`] or [`Error::ServiceError`] for a status
///   outside the expected set.
/// - [`Error::Deserialization`] if a success body does not decode into `T`.
pub async fn invoke<C, Z, T>(
    client: &C,
    serializer: &Z,
    service: &ServiceDescriptor,
    method: &str,
    args: Args,
) -> Result<Outcome<T>>
where
    C: HttpClient,
    Z: Serializer,
    T: DeserializeOwned + Default,
{
    let descriptor = service
        .method(method)
        .ok_or_else(|| Error::UnknownMethod {
            interface: service.interface().to_string(),
            method: method.to_string(),
        })?;
    let span = info_span!("invoke", interface = service.interface(), method);

    async move {
        if let ReturnShape::Invalid {
            return_type,
            method,
        } = descriptor.return_shape()
        {
            return Err(Error::InvalidReturnType {
                return_type: return_type.clone(),
                method: method.clone(),
            });
        }
        check_payload_type::<T>(descriptor)?;

        let request = build_request(serializer, service, descriptor, &args)?;
        debug!(method = %request.method(), url = %request.url(), "request built");

        let response = client.execute(request).await?;
        let status = response.status();
        debug!(status, "response received");

        if !descriptor.accepts(status) {
            trace!(status, expected = ?descriptor.expected_status_codes(), "unexpected status");
            return Err(unexpected(serializer, descriptor, response).await);
        }
        complete(serializer, descriptor, response).await
    }
    .instrument(span)
    .await
}

fn check_payload_type<T>(descriptor: &MethodDescriptor) -> Result<()> {
    let decoded = matches!(
        descriptor.return_shape(),
        ReturnShape::Value(Payload::Decoded) | ReturnShape::AsyncValue(Payload::Decoded)
    );
    let requested = std::any::type_name::<T>();
    if decoded && requested != descriptor.return_type() {
        return Err(Error::ShapeMismatch {
            method: descriptor.signature().to_string(),
            declared: descriptor.return_type(),
            requested,
        });
    }
    Ok(())
}

// ============================================================================
// Building
// ============================================================================

fn build_request<Z: Serializer>(
    serializer: &Z,
    service: &ServiceDescriptor,
    descriptor: &MethodDescriptor,
    args: &Args,
) -> Result<Request<Bytes>> {
    let mut url = UrlBuilder::new(service.host(), descriptor.path());
    for binding in descriptor.host_params() {
        let value = required_text(descriptor, binding, args)?;
        url = url.host_param(&binding.name, value, binding.encoded);
    }
    for binding in descriptor.path_params() {
        let value = required_text(descriptor, binding, args)?;
        url = url.path_param(&binding.name, value, binding.encoded);
    }
    for binding in descriptor.query_params() {
        if let Some(value) = optional_text(descriptor, binding, args)? {
            url = url.query_param(&binding.name, value, binding.encoded);
        }
    }
    let url = url.build()?;

    let mut headers = descriptor.static_headers().clone();
    for binding in descriptor.header_params() {
        if let Some(value) = optional_text(descriptor, binding, args)? {
            headers
                .set(&binding.name, value.trim())
                .map_err(|e| argument(descriptor, binding.index, e.to_string()))?;
        }
    }

    let body = match descriptor.body() {
        Some(binding) => encode_body(serializer, descriptor, binding, args, &mut headers)?,
        None => None,
    };

    let mut builder = Request::builder(descriptor.http_method(), url)
        .headers(headers)
        .extension(descriptor.operation().clone());
    if let Some(body) = body {
        builder = builder.body(body);
    }
    builder.build()
}

fn argument(descriptor: &MethodDescriptor, index: usize, reason: impl Into<String>) -> Error {
    Error::Argument {
        method: descriptor.signature().to_string(),
        index,
        reason: reason.into(),
    }
}

fn arg_at<'a>(descriptor: &MethodDescriptor, index: usize, args: &'a Args) -> Result<&'a Arg> {
    args.get(index).ok_or_else(|| {
        argument(
            descriptor,
            index,
            format!("missing argument, {} given", args.len()),
        )
    })
}

fn optional_text<'a>(
    descriptor: &MethodDescriptor,
    binding: &ParamBinding,
    args: &'a Args,
) -> Result<Option<&'a str>> {
    match arg_at(descriptor, binding.index, args)? {
        Arg::Text(text) => Ok(Some(text)),
        Arg::Absent => Ok(None),
        other => Err(argument(
            descriptor,
            binding.index,
            format!("'{}' needs a text value, got {}", binding.name, other.kind()),
        )),
    }
}

fn required_text<'a>(
    descriptor: &MethodDescriptor,
    binding: &ParamBinding,
    args: &'a Args,
) -> Result<&'a str> {
    optional_text(descriptor, binding, args)?.ok_or_else(|| {
        argument(
            descriptor,
            binding.index,
            format!("'{}' is required", binding.name),
        )
    })
}

fn encode_body<Z: Serializer>(
    serializer: &Z,
    descriptor: &MethodDescriptor,
    binding: BodyBinding,
    args: &Args,
    headers: &mut HttpHeaders,
) -> Result<Option<Bytes>> {
    let arg = arg_at(descriptor, binding.index, args)?;
    let body = match (binding.kind, arg) {
        (_, Arg::Absent) => return Ok(None),
        (ContentKind::RawBytes | ContentKind::RawString, Arg::Bytes(bytes)) => bytes.clone(),
        (ContentKind::RawBytes | ContentKind::RawString, Arg::Text(text)) => {
            Bytes::from(text.clone())
        }
        (ContentKind::Serializable, Arg::Object(object)) => serializer.encode(object.as_ref())?,
        (ContentKind::Serializable, Arg::Text(text)) => serializer.encode(text)?,
        (kind, other) => {
            return Err(argument(
                descriptor,
                binding.index,
                format!("a {kind:?} body cannot be built from {}", other.kind()),
            ));
        }
    };

    if !headers.contains(header::CONTENT_TYPE.as_str()) {
        let content_type = match binding.kind {
            ContentKind::RawBytes => crate::ContentType::OctetStream,
            ContentKind::RawString => crate::ContentType::PlainText,
            ContentKind::Serializable => serializer.content_type(),
        };
        headers.set(header::CONTENT_TYPE.as_str(), content_type.as_str())?;
    }
    Ok(Some(body))
}

// ============================================================================
// Classification
// ============================================================================

async fn unexpected<Z: Serializer>(
    serializer: &Z,
    descriptor: &MethodDescriptor,
    response: Response<ByteStream>,
) -> Error {
    let (status, headers, body) = response.into_parts();
    let mut captured = match body.collect().await {
        Ok(raw) => decode_error_body(serializer, descriptor, UnexpectedResponse::new(status, headers, raw)),
        Err(read_error) => {
            UnexpectedResponse::new(status, headers, Bytes::new()).with_decode_error(read_error)
        }
    };

    match descriptor.unexpected_response() {
        UnexpectedResponseType::Default => Error::UnexpectedStatus(Box::new(captured)),
        UnexpectedResponseType::Declared(exception) => {
            if captured.body_type().is_none() && captured.decode_error().is_none() {
                captured = captured.with_decode_error(Error::deserialization(
                    "",
                    format!("empty body cannot decode into {}", exception.type_name()),
                ));
            }
            Error::ServiceError(Box::new(captured))
        }
    }
}

/// Best-effort decode of an error body: a decode failure is attached, never raised.
fn decode_error_body<Z: Serializer>(
    serializer: &Z,
    descriptor: &MethodDescriptor,
    captured: UnexpectedResponse,
) -> UnexpectedResponse {
    if captured.raw_body().is_empty() {
        return captured;
    }
    let mapping = match serializer.decode::<serde_json::Value>(captured.raw_body()) {
        Ok(mapping) => mapping,
        Err(e) => return captured.with_decode_error(e),
    };

    let captured = match descriptor.unexpected_response() {
        UnexpectedResponseType::Default => captured,
        UnexpectedResponseType::Declared(exception) => match exception.decode(&mapping) {
            Ok(value) => captured.with_typed_body(exception.type_name(), value),
            Err(e) => captured.with_decode_error(e),
        },
    };
    captured.with_mapping(mapping)
}

// ============================================================================
// Completion
// ============================================================================

async fn complete<Z, T>(
    serializer: &Z,
    descriptor: &MethodDescriptor,
    response: Response<ByteStream>,
) -> Result<Outcome<T>>
where
    Z: Serializer,
    T: DeserializeOwned + Default,
{
    let mut body = response.into_body();
    match descriptor.return_shape() {
        ReturnShape::Void | ReturnShape::AsyncVoidSignal => {
            body.collect().await?;
            Ok(Outcome::Void)
        }
        ReturnShape::Stream | ReturnShape::AsyncStream => Ok(Outcome::Stream(body)),
        ReturnShape::Value(Payload::Raw) | ReturnShape::AsyncValue(Payload::Raw) => {
            Ok(Outcome::Raw(body.collect().await?))
        }
        ReturnShape::Value(Payload::Decoded) | ReturnShape::AsyncValue(Payload::Decoded) => {
            if !descriptor.http_method().has_response_body() {
                body.close();
                return Ok(Outcome::Value(T::default()));
            }
            let bytes = body.collect().await?;
            if bytes.is_empty() {
                return Ok(Outcome::Value(T::default()));
            }
            serializer.decode(&bytes).map(Outcome::Value)
        }
        ReturnShape::Invalid {
            return_type,
            method,
        } => Err(Error::InvalidReturnType {
            return_type: return_type.clone(),
            method: method.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert2::{check, let_assert};

    use super::*;
    use crate::{
        ContentKind, JsonSerializer, Method, MethodDeclaration, Param, ReturnForm,
        ServiceDeclaration, compile,
    };

    /// Records the request and answers with a canned response.
    struct Canned {
        status: u16,
        body: &'static str,
        seen: Mutex<Option<Request<Bytes>>>,
    }

    impl Canned {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                seen: Mutex::new(None),
            }
        }

        fn seen(&self) -> Request<Bytes> {
            self.seen.lock().expect("lock").take().expect("a request")
        }
    }

    impl HttpClient for Canned {
        async fn execute(&self, request: Request<Bytes>) -> Result<Response<ByteStream>> {
            *self.seen.lock().expect("lock") = Some(request);
            let body = ByteStream::from_bytes(Bytes::from_static(self.body.as_bytes()));
            Ok(Response::new(self.status, HttpHeaders::new(), body))
        }
    }

    #[derive(Debug, Default, PartialEq, serde::Deserialize)]
    struct Echo {
        data: String,
    }

    fn service() -> ServiceDescriptor {
        let declaration = ServiceDeclaration::new("http://{hostName}.org")
            .method(
                MethodDeclaration::get("get_anything", "anything/{path}")
                    .param::<&str>(Param::host("hostName"))
                    .param::<&str>(Param::path("path"))
                    .param::<Option<&str>>(Param::query("q"))
                    .param::<Option<&str>>(Param::header("X-Trace"))
                    .static_header("X-Trace", "static")
                    .expected_responses([200])
                    .returns::<Echo>(ReturnForm::Payload),
            )
            .method(
                MethodDeclaration::put("put", "put")
                    .param::<&str>(Param::host("hostName"))
                    .param::<u32>(Param::body(ContentKind::Serializable))
                    .returns::<Echo>(ReturnForm::Payload),
            )
            .method(
                MethodDeclaration::put("put_text", "put")
                    .param::<&str>(Param::host("hostName"))
                    .param::<String>(Param::body(ContentKind::RawString))
                    .static_header("Content-Type", "application/custom"),
            )
            .method(
                MethodDeclaration::head("head", "anything")
                    .param::<&str>(Param::host("hostName"))
                    .returns::<Echo>(ReturnForm::Payload),
            )
            .method(
                MethodDeclaration::get("bytes", "bytes/4")
                    .param::<&str>(Param::host("hostName"))
                    .returns::<Vec<u8>>(ReturnForm::Raw),
            )
            .method(
                MethodDeclaration::get("sequence", "anything")
                    .param::<&str>(Param::host("hostName"))
                    .returns::<Vec<Echo>>(ReturnForm::sequence(ReturnForm::Payload)),
            );
        compile("tests::HttpBin", &declaration).expect("compile")
    }

    #[tokio::test]
    async fn builds_url_and_headers() {
        let client = Canned::new(200, r#"{"data":"ok"}"#);
        let args = Args::new()
            .arg("httpbin")
            .arg("with path")
            .optional(Some("A%20Z"))
            .optional(Some("  per-call  "));

        let outcome = invoke::<_, _, Echo>(&client, &JsonSerializer, &service(), "get_anything", args)
            .await
            .expect("invoke");
        check!(outcome.into_value().expect("value") == Echo { data: "ok".into() });

        let request = client.seen();
        check!(request.method() == Method::Get);
        check!(request.url().as_str() == "http://httpbin.org/anything/with%20path?q=A%2520Z");
        check!(request.header("x-trace") == Some("per-call"));
        let_assert!(Some(op) = request.extensions().get::<crate::Operation>());
        check!(op.path_template() == "anything/{path}");
    }

    #[tokio::test]
    async fn absent_optionals_are_omitted() {
        let client = Canned::new(200, r#"{"data":""}"#);
        let args = Args::new()
            .arg("httpbin")
            .arg("p")
            .optional(None::<&str>)
            .optional(None::<&str>);

        invoke::<_, _, Echo>(&client, &JsonSerializer, &service(), "get_anything", args)
            .await
            .expect("invoke");
        let request = client.seen();
        check!(request.url().query().is_none());
        check!(request.header("x-trace") == Some("static"));
    }

    #[tokio::test]
    async fn absent_path_argument_is_an_error() {
        let client = Canned::new(200, "");
        let args = Args::new().arg("httpbin").optional(None::<&str>).optional(None::<&str>);
        let result =
            invoke::<_, _, Echo>(&client, &JsonSerializer, &service(), "get_anything", args).await;
        let_assert!(Err(Error::Argument { index, reason, .. }) = result);
        check!(index == 1);
        check!(reason.contains("required"));
    }

    #[tokio::test]
    async fn serializable_body_gets_serializer_content_type() {
        let client = Canned::new(200, r#"{"data":"42"}"#);
        let args = Args::new().arg("httpbin").object(42_u32);
        let outcome = invoke::<_, _, Echo>(&client, &JsonSerializer, &service(), "put", args)
            .await
            .expect("invoke");
        check!(outcome.into_value().expect("value").data == "42");

        let request = client.seen();
        check!(request.body().map(Bytes::as_ref) == Some(&b"42"[..]));
        check!(request.header("content-type") == Some("application/json"));
    }

    #[tokio::test]
    async fn static_content_type_wins() {
        let client = Canned::new(200, "");
        let args = Args::new().arg("httpbin").arg("hello");
        let outcome = invoke::<_, _, ()>(&client, &JsonSerializer, &service(), "put_text", args)
            .await
            .expect("invoke");
        check!(outcome.is_void());

        let request = client.seen();
        check!(request.body().map(Bytes::as_ref) == Some(&b"hello"[..]));
        check!(request.header("content-type") == Some("application/custom"));
    }

    #[tokio::test]
    async fn raw_body_rejects_objects() {
        let client = Canned::new(200, "");
        let args = Args::new().arg("httpbin").object(vec![1, 2]);
        let result = invoke::<_, _, ()>(&client, &JsonSerializer, &service(), "put_text", args).await;
        let_assert!(Err(Error::Argument { .. }) = result);
    }

    #[tokio::test]
    async fn head_yields_default_value() {
        let client = Canned::new(200, "ignored");
        let args = Args::new().arg("httpbin");
        let outcome = invoke::<_, _, Echo>(&client, &JsonSerializer, &service(), "head", args)
            .await
            .expect("invoke");
        check!(outcome.into_value().expect("value") == Echo::default());
    }

    #[tokio::test]
    async fn raw_payload_is_not_decoded() {
        let client = Canned::new(200, "\u{1}\u{2}\u{3}\u{4}");
        let args = Args::new().arg("httpbin");
        let outcome = invoke::<_, _, ()>(&client, &JsonSerializer, &service(), "bytes", args)
            .await
            .expect("invoke");
        check!(outcome.into_raw().expect("raw").as_ref() == [1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn unexpected_status_keeps_mapping_and_raw_body() {
        let client = Canned::new(404, r#"{"data":"missing"}"#);
        let args = Args::new()
            .arg("httpbin")
            .arg("x")
            .optional(None::<&str>)
            .optional(None::<&str>);
        let result =
            invoke::<_, _, Echo>(&client, &JsonSerializer, &service(), "get_anything", args).await;
        let_assert!(Err(Error::UnexpectedStatus(response)) = result);
        check!(response.status() == 404);
        let_assert!(Some(mapping) = response.mapping());
        check!(mapping["data"] == "missing");
    }

    #[tokio::test]
    async fn undecodable_error_body_is_attached() {
        let client = Canned::new(500, "<html>oops</html>");
        let args = Args::new()
            .arg("httpbin")
            .arg("x")
            .optional(None::<&str>)
            .optional(None::<&str>);
        let result =
            invoke::<_, _, Echo>(&client, &JsonSerializer, &service(), "get_anything", args).await;
        let_assert!(Err(Error::UnexpectedStatus(response)) = result);
        check!(response.mapping().is_none());
        check!(response.raw_body().as_ref() == b"<html>oops</html>");
        let_assert!(Some(Error::Deserialization { .. }) = response.decode_error());
    }

    #[tokio::test]
    async fn undecodable_success_body_is_fatal() {
        let client = Canned::new(200, "not json");
        let args = Args::new().arg("httpbin").object(1_u32);
        let result = invoke::<_, _, Echo>(&client, &JsonSerializer, &service(), "put", args).await;
        let_assert!(Err(Error::Deserialization { .. }) = result);
    }

    #[tokio::test]
    async fn invalid_return_type_fails_before_dispatch() {
        let client = Canned::new(200, "");
        let args = Args::new().arg("httpbin");
        let result =
            invoke::<_, _, ()>(&client, &JsonSerializer, &service(), "sequence", args).await;
        let_assert!(Err(Error::InvalidReturnType { method, .. }) = result);
        check!(method == "tests::HttpBin.sequence(&str)");
        check!(client.seen.lock().expect("lock").is_none());
    }

    #[tokio::test]
    async fn payload_type_must_match_declaration() {
        let client = Canned::new(200, r#"{"data":"ok"}"#);
        let args = Args::new()
            .arg("httpbin")
            .arg("x")
            .optional(None::<&str>)
            .optional(None::<&str>);
        let result =
            invoke::<_, _, String>(&client, &JsonSerializer, &service(), "get_anything", args)
                .await;
        let_assert!(
            Err(Error::ShapeMismatch {
                method,
                declared,
                requested,
            }) = result
        );
        check!(method.starts_with("tests::HttpBin.get_anything(&str, &str"));
        check!(declared == std::any::type_name::<Echo>());
        check!(requested == std::any::type_name::<String>());
        check!(client.seen.lock().expect("lock").is_none());
    }

    #[tokio::test]
    async fn unknown_method() {
        let client = Canned::new(200, "");
        let result =
            invoke::<_, _, ()>(&client, &JsonSerializer, &service(), "nope", Args::new()).await;
        let_assert!(Err(Error::UnknownMethod { method, .. }) = result);
        check!(method == "nope");
    }

    #[test]
    fn outcome_mismatch() {
        let outcome: Outcome<()> = Outcome::Void;
        let_assert!(Err(Error::OutcomeMismatch { expected, actual }) = outcome.into_raw());
        check!(expected == "raw");
        check!(actual == "void");
    }
}
