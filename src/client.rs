//! Authenticated API calls with a one-shot token refresh.
//!
//! [`ApiClient::request`] drives every call through an explicit [`CallState`] machine:
//!
//! ```text
//! Send(initial) -> Evaluate --2xx--------------------------------> Done
//!                          --401 + token attached--> Refresh --> Send(retry) -> Evaluate -> Done
//!                          --anything else--------------------------------------------> failure
//! ```
//!
//! Only the initial attempt may transition to `Refresh`, so a call performs at most one refresh
//! and at most one retry. Concurrent calls are not coordinated; each one that hits a 401 refreshes
//! on its own.

pub mod refresh;

pub use refresh::*;

// crates.io
use ::http::{
	HeaderValue, Method, StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::{TokenKey, TokenSecret},
	config::ClientConfig,
	error::ConfigError,
	http::{ApiHttpClient, HttpRequest, HttpResponse},
	obs::{self, CallSpan, Operation, Outcome, trace_debug},
	store::TokenStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestHttpClient>;

/// Payload attached to an outbound request.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
	/// No body; the request still advertises a JSON content type.
	#[default]
	Empty,
	/// Structured body, encoded as JSON with `Content-Type: application/json`.
	Json(Json),
	/// Binary or multipart body sent byte-for-byte; the client never sets a content type of its
	/// own for it.
	Raw {
		/// Body bytes.
		bytes: Vec<u8>,
		/// Content type supplied by the caller (for multipart this carries the boundary).
		content_type: Option<HeaderValue>,
	},
}
impl RequestBody {
	/// Encodes any serializable value as a JSON body.
	pub fn json<T>(value: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		Ok(Self::Json(serde_json::to_value(value).map_err(ConfigError::from)?))
	}

	/// Wraps raw bytes with an optional caller-provided content type.
	pub fn raw(bytes: impl Into<Vec<u8>>, content_type: Option<HeaderValue>) -> Self {
		Self::Raw { bytes: bytes.into(), content_type }
	}

	fn content_type(&self) -> Option<HeaderValue> {
		match self {
			Self::Empty | Self::Json(_) => Some(HeaderValue::from_static("application/json")),
			Self::Raw { content_type, .. } => content_type.clone(),
		}
	}

	fn to_bytes(&self) -> Result<Vec<u8>> {
		match self {
			Self::Empty => Ok(Vec::new()),
			Self::Json(value) => Ok(serde_json::to_vec(value).map_err(ConfigError::from)?),
			Self::Raw { bytes, .. } => Ok(bytes.clone()),
		}
	}
}

/// Which send of a logical call is in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempt {
	/// First send, with whatever access token was stored.
	Initial,
	/// The single resend after a successful refresh.
	Retry,
}
impl Attempt {
	/// Decides what follows a response with `status`.
	///
	/// `authenticated` reports whether this attempt carried a bearer token.
	pub fn next(self, status: StatusCode, authenticated: bool) -> Transition {
		if status.is_success() {
			Transition::Complete
		} else if status == StatusCode::UNAUTHORIZED && authenticated && self == Attempt::Initial {
			Transition::Refresh
		} else {
			Transition::Fail
		}
	}
}

/// Outcome of evaluating one response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
	/// Terminal success; decode the body.
	Complete,
	/// Refresh the access token, then retry once.
	Refresh,
	/// Terminal failure; report status and payload.
	Fail,
}

/// States of a single logical call.
#[derive(Debug)]
pub enum CallState {
	/// Build and send the request with `access` (if any).
	Send {
		/// Which send this is.
		attempt: Attempt,
		/// Access token to attach.
		access: Option<TokenSecret>,
	},
	/// Inspect a response.
	Evaluate {
		/// Which send produced the response.
		attempt: Attempt,
		/// Whether the send carried a bearer token.
		authenticated: bool,
		/// Response to evaluate.
		response: HttpResponse,
	},
	/// Obtain a new access token.
	Refresh,
	/// Terminal: the call produced a 2xx response.
	Done(HttpResponse),
}

/// Issues authenticated calls against the attendance API.
///
/// The client owns the HTTP transport, the token store, and the endpoint configuration. Session,
/// event, and attendance helpers live in [`crate::session`] and [`crate::api`] as further
/// `impl` blocks on this type.
#[derive(Clone)]
pub struct ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// HTTP client wrapper used for every outbound request.
	pub http_client: Arc<C>,
	/// Token store holding the access/refresh pair.
	pub store: Arc<dyn TokenStore>,
	/// Endpoint configuration.
	pub config: ClientConfig,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
}
impl<C> ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_http_client(
		store: Arc<dyn TokenStore>,
		config: ClientConfig,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self { http_client: http_client.into(), store, config, refresh_metrics: Default::default() }
	}

	/// Reads the access token, treating an empty value as absent.
	pub(crate) async fn stored_access_token(&self) -> Result<Option<TokenSecret>> {
		Ok(self.store.get(TokenKey::AccessToken).await?.filter(|token| !token.expose().is_empty()))
	}

	/// Performs `method` on `<base>/api<endpoint>` and decodes the JSON body.
	///
	/// An empty 2xx body decodes to [`Json::Null`].
	pub async fn request(&self, endpoint: &str, method: Method, body: RequestBody) -> Result<Json> {
		self.request_as(endpoint, method, body).await
	}

	/// Like [`ApiClient::request`] but decodes the body into `T`.
	pub async fn request_as<T>(
		&self,
		endpoint: &str,
		method: Method,
		body: RequestBody,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		const OPERATION: Operation = Operation::Request;

		let span = CallSpan::new(OPERATION, "request");

		obs::record_call_outcome(OPERATION, Outcome::Attempt);

		let result = span
			.instrument(async move {
				let response = self.call(endpoint, &method, &body).await?;

				decode_json(&response)
			})
			.await;

		obs::record_call_outcome(OPERATION, Outcome::of(&result));

		result
	}

	/// `GET` helper decoding into `T`.
	pub async fn get<T>(&self, endpoint: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.request_as(endpoint, Method::GET, RequestBody::Empty).await
	}

	/// `POST` helper encoding `body` as JSON and decoding the response into `T`.
	pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		self.request_as(endpoint, Method::POST, RequestBody::json(body)?).await
	}

	/// Runs the call state machine and returns the terminal 2xx response.
	pub async fn call(
		&self,
		endpoint: &str,
		method: &Method,
		body: &RequestBody,
	) -> Result<HttpResponse> {
		let url = self.config.api_url(endpoint)?;
		let access = self.stored_access_token().await?;
		let mut state = CallState::Send { attempt: Attempt::Initial, access };

		loop {
			state = match state {
				CallState::Send { attempt, access } => {
					let request = build_request(&url, method, body, access.as_ref())?;
					let response = self.http_client.execute(request).await?;

					CallState::Evaluate { attempt, authenticated: access.is_some(), response }
				},
				CallState::Evaluate { attempt, authenticated, response } =>
					match attempt.next(response.status(), authenticated) {
						Transition::Complete => CallState::Done(response),
						Transition::Refresh => {
							trace_debug!(endpoint, "Access token rejected; refreshing.");

							CallState::Refresh
						},
						Transition::Fail => return Err(server_error(&response)),
					},
				CallState::Refresh => {
					let access = self.refresh_access_token().await?;

					trace_debug!(endpoint, "Retrying with refreshed access token.");

					CallState::Send { attempt: Attempt::Retry, access: Some(access) }
				},
				CallState::Done(response) => return Ok(response),
			};
		}
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestHttpClient> {
	/// Creates a client backed by a default reqwest transport.
	pub fn new(store: Arc<dyn TokenStore>, config: ClientConfig) -> Self {
		Self::with_http_client(store, config, ReqwestHttpClient::default())
	}
}
impl<C> Debug for ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("config", &self.config)
			.field("refresh_metrics", &self.refresh_metrics)
			.finish()
	}
}

pub(crate) fn build_request(
	url: &Url,
	method: &Method,
	body: &RequestBody,
	access: Option<&TokenSecret>,
) -> Result<HttpRequest> {
	let mut builder = ::http::Request::builder().method(method.clone()).uri(url.as_str());

	if let Some(content_type) = body.content_type() {
		builder = builder.header(CONTENT_TYPE, content_type);
	}
	if let Some(token) = access {
		let mut value = HeaderValue::try_from(token.bearer()).map_err(ConfigError::from)?;

		value.set_sensitive(true);

		builder = builder.header(AUTHORIZATION, value);
	}

	Ok(builder.body(body.to_bytes()?).map_err(ConfigError::from)?)
}

/// Decodes a 2xx body, treating an empty body as JSON `null`.
pub(crate) fn decode_json<T>(response: &HttpResponse) -> Result<T>
where
	T: DeserializeOwned,
{
	let body = response.body();
	let bytes: &[u8] =
		if body.iter().all(u8::is_ascii_whitespace) { b"null" } else { body.as_slice() };
	let mut deserializer = serde_json::Deserializer::from_slice(bytes);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::Decode { status: response.status().as_u16(), source })
}

/// Maps a non-2xx response, decoding its body best-effort.
pub(crate) fn server_error(response: &HttpResponse) -> Error {
	let payload = serde_json::from_slice::<Json>(response.body())
		.unwrap_or_else(|_| Json::Object(Default::default()));

	Error::Server { status: response.status().as_u16(), payload }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn response(status: u16, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() = StatusCode::from_u16(status).expect("Fixture status is valid.");

		response
	}

	#[test]
	fn only_the_initial_authenticated_attempt_may_refresh() {
		let unauthorized = StatusCode::UNAUTHORIZED;

		assert_eq!(Attempt::Initial.next(unauthorized, true), Transition::Refresh);
		assert_eq!(Attempt::Initial.next(unauthorized, false), Transition::Fail);
		assert_eq!(Attempt::Retry.next(unauthorized, true), Transition::Fail);
		assert_eq!(Attempt::Initial.next(StatusCode::FORBIDDEN, true), Transition::Fail);
		assert_eq!(Attempt::Retry.next(StatusCode::CREATED, true), Transition::Complete);
		assert_eq!(Attempt::Initial.next(StatusCode::NO_CONTENT, false), Transition::Complete);
	}

	#[test]
	fn json_bodies_get_a_json_content_type_and_bearer() {
		let url = Url::parse("https://api.example.edu/api/attendance/")
			.expect("Fixture URL should parse.");
		let body = RequestBody::Json(serde_json::json!({ "event_id": 3 }));
		let request = build_request(&url, &Method::POST, &body, Some(&TokenSecret::new("tok")))
			.expect("Request should build.");

		assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
		assert_eq!(request.headers()[AUTHORIZATION], "Bearer tok");
		assert!(request.headers()[AUTHORIZATION].is_sensitive());
		assert_eq!(request.body().as_slice(), br#"{"event_id":3}"#);
	}

	#[test]
	fn raw_bodies_pass_through_untouched() {
		let url = Url::parse("https://api.example.edu/api/events/import/")
			.expect("Fixture URL should parse.");
		let bytes = b"--xyz\r\nContent-Disposition: form-data; name=\"file\"\r\n\r\n{}\r\n--xyz--";
		let body = RequestBody::raw(
			bytes.to_vec(),
			Some(HeaderValue::from_static("multipart/form-data; boundary=xyz")),
		);
		let request =
			build_request(&url, &Method::POST, &body, None).expect("Request should build.");

		assert_eq!(request.headers()[CONTENT_TYPE], "multipart/form-data; boundary=xyz");
		assert!(request.headers().get(AUTHORIZATION).is_none());
		assert_eq!(request.body().as_slice(), bytes.as_slice());

		let bare = RequestBody::raw(b"\x00\x01".to_vec(), None);
		let request =
			build_request(&url, &Method::PUT, &bare, None).expect("Request should build.");

		assert!(request.headers().get(CONTENT_TYPE).is_none());
	}

	#[test]
	fn error_payloads_decode_best_effort() {
		let err = server_error(&response(400, r#"{"error":"Evento no encontrado"}"#));

		assert!(matches!(&err, Error::Server { status: 400, .. }));
		assert_eq!(err.user_message("x"), "Evento no encontrado");

		let err = server_error(&response(502, "<html>Bad Gateway</html>"));

		match err {
			Error::Server { status, payload } => {
				assert_eq!(status, 502);
				assert_eq!(payload, serde_json::json!({}));
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn success_bodies_decode_with_paths() {
		let value: Json = decode_json(&response(204, "")).expect("Empty bodies decode to null.");

		assert_eq!(value, Json::Null);

		#[derive(Debug, Deserialize)]
		struct Stats {
			#[allow(dead_code)]
			total_events: u32,
		}

		let err = decode_json::<Stats>(&response(200, r#"{"total_events":"many"}"#))
			.expect_err("Mistyped fields should fail to decode.");

		match err {
			Error::Decode { status, source } => {
				assert_eq!(status, 200);
				assert_eq!(source.path().to_string(), "total_events");
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}
}
