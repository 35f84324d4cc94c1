//! Client-level error types shared across the request pipeline, session helpers, and stores.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Token storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration or request-construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS); not distinguished further.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// A 401 could not be recovered through the refresh endpoint; stored tokens were cleared.
	#[error("Session expired; sign in again.")]
	AuthExpired,
	/// A 401 arrived but no refresh token was stored; stored tokens were cleared.
	#[error("No refresh token is available.")]
	NoRefreshToken,
	/// The API answered with a non-2xx status that was not recovered by a refresh.
	#[error("API responded with HTTP {status}.")]
	Server {
		/// HTTP status code.
		status: u16,
		/// Best-effort decoded error body; an empty object when the body was not JSON.
		payload: Json,
	},
	/// A 2xx body did not match the expected JSON shape.
	#[error("Response body for HTTP {status} could not be decoded.")]
	Decode {
		/// HTTP status code of the response being decoded.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl Error {
	/// Returns `true` when callers should send the user back through login.
	pub fn requires_reauthentication(&self) -> bool {
		matches!(self, Self::AuthExpired | Self::NoRefreshToken)
	}

	/// HTTP status carried by the error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Server { status, .. } | Self::Decode { status, .. } => Some(*status),
			Self::AuthExpired | Self::NoRefreshToken => Some(401),
			_ => None,
		}
	}

	/// Server-provided error payload, if the error came from an API response.
	pub fn payload(&self) -> Option<&Json> {
		match self {
			Self::Server { payload, .. } => Some(payload),
			_ => None,
		}
	}

	/// Message suitable for display: the payload's `error` string when the server sent one,
	/// otherwise `fallback`.
	pub fn user_message<'a>(&'a self, fallback: &'a str) -> &'a str {
		self.payload()
			.and_then(|payload| payload.get("error"))
			.and_then(Json::as_str)
			.unwrap_or(fallback)
	}
}

/// Configuration and request-construction failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] ::http::Error),
	/// Client configuration failed validation.
	#[error(transparent)]
	Client(#[from] crate::config::ClientConfigError),
	/// Endpoint could not be joined onto the base URL.
	#[error("Endpoint `{endpoint}` does not form a valid URL.")]
	InvalidEndpoint {
		/// Endpoint path supplied by the caller.
		endpoint: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Stored access token cannot be used as a header value.
	#[error("Access token contains characters that are not valid in an HTTP header.")]
	InvalidAccessToken(#[from] ::http::header::InvalidHeaderValue),
	/// Request body could not be serialized into JSON.
	#[error("Request body could not be encoded as JSON.")]
	RequestEncode(#[from] serde_json::Error),
	/// Account number failed validation.
	#[error(transparent)]
	AccountNumber(#[from] crate::auth::AccountNumberError),
	/// A required request field was blank.
	#[error("Field `{field}` is required.")]
	MissingField {
		/// Name of the blank field.
		field: &'static str,
	},
	/// The local UTC offset could not be determined.
	#[error("The local UTC offset could not be determined.")]
	IndeterminateOffset(#[from] time::error::IndeterminateOffset),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
