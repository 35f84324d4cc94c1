//! Client configuration: where the API lives and which paths it exposes.

// self
use crate::{_prelude::*, error::ConfigError};

/// Errors raised while constructing or validating a [`ClientConfig`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ClientConfigError {
	/// Base URL must use HTTP or HTTPS.
	#[error("The base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Base URL must not carry a query string or fragment.
	#[error("The base URL must not contain a query or fragment: {url}.")]
	BaseUrlHasQuery {
		/// Base URL that failed validation.
		url: String,
	},
	/// Paths must be absolute.
	#[error("The {which} path must start with `/`: {path}.")]
	RelativePath {
		/// Which configured path failed validation.
		which: &'static str,
		/// Path that failed validation.
		path: String,
	},
}

/// Validated client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Origin (and optional mount path) every request is issued against.
	pub base_url: Url,
	/// Prefix inserted between the base URL and generic API endpoints.
	pub api_prefix: String,
	/// Path of the token refresh endpoint, relative to the base URL (outside the API prefix).
	pub refresh_path: String,
}
impl ClientConfig {
	/// Default prefix for generic API endpoints.
	pub const DEFAULT_API_PREFIX: &'static str = "/api";
	/// Default path of the token refresh endpoint.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/auth/token/refresh/";

	/// Returns a builder seeded with the provided base URL and default paths.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Resolves `<base><api_prefix><endpoint>`; `endpoint` may carry a query string.
	pub fn api_url(&self, endpoint: &str) -> Result<Url> {
		self.join(&format!("{}{}", self.api_prefix, ensure_leading_slash(endpoint)))
	}

	/// Resolves the token refresh endpoint.
	pub fn refresh_url(&self) -> Result<Url> {
		self.join(&self.refresh_path)
	}

	fn join(&self, path: &str) -> Result<Url> {
		let raw = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);

		Url::parse(&raw)
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: path.to_owned(), source })
			.map_err(Into::into)
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Base URL for the deployment.
	pub base_url: Url,
	/// Prefix for generic API endpoints.
	pub api_prefix: String,
	/// Token refresh endpoint path.
	pub refresh_path: String,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with the provided base URL.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			api_prefix: ClientConfig::DEFAULT_API_PREFIX.into(),
			refresh_path: ClientConfig::DEFAULT_REFRESH_PATH.into(),
		}
	}

	/// Overrides the API prefix. An empty prefix mounts endpoints directly on the base URL.
	pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.api_prefix = prefix.into();

		self
	}

	/// Overrides the token refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Validates the configuration.
	pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ClientConfigError::UnsupportedScheme { url: self.base_url.to_string() });
		}
		if self.base_url.query().is_some() || self.base_url.fragment().is_some() {
			return Err(ClientConfigError::BaseUrlHasQuery { url: self.base_url.to_string() });
		}
		if !self.api_prefix.is_empty() && !self.api_prefix.starts_with('/') {
			return Err(ClientConfigError::RelativePath { which: "api", path: self.api_prefix });
		}
		if !self.refresh_path.starts_with('/') {
			return Err(ClientConfigError::RelativePath {
				which: "refresh",
				path: self.refresh_path,
			});
		}

		let api_prefix = self.api_prefix.trim_end_matches('/').to_owned();

		Ok(ClientConfig { base_url: self.base_url, api_prefix, refresh_path: self.refresh_path })
	}
}

fn ensure_leading_slash(endpoint: &str) -> std::borrow::Cow<'_, str> {
	if endpoint.starts_with('/') { endpoint.into() } else { format!("/{endpoint}").into() }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse fixture URL.")
	}

	#[test]
	fn api_urls_keep_trailing_slashes_and_queries() {
		let config = ClientConfig::builder(url("https://asistencia.example.edu"))
			.build()
			.expect("Default configuration should be valid.");

		assert_eq!(
			config.api_url("/events/").expect("Events endpoint should resolve.").as_str(),
			"https://asistencia.example.edu/api/events/",
		);
		assert_eq!(
			config
				.api_url("/events/external/search/?q=ana%20lopez")
				.expect("Search endpoint should resolve.")
				.as_str(),
			"https://asistencia.example.edu/api/events/external/search/?q=ana%20lopez",
		);
		assert_eq!(
			config.refresh_url().expect("Refresh endpoint should resolve.").as_str(),
			"https://asistencia.example.edu/auth/token/refresh/",
		);
	}

	#[test]
	fn mounted_base_urls_keep_their_path() {
		let config = ClientConfig::builder(url("http://localhost:8080/mac/"))
			.api_prefix("/api/")
			.build()
			.expect("Mounted configuration should be valid.");

		assert_eq!(
			config.api_url("attendance/recent/").expect("Recent endpoint should resolve.").as_str(),
			"http://localhost:8080/mac/api/attendance/recent/",
		);
	}

	#[test]
	fn builder_rejects_bad_inputs() {
		let err = ClientConfig::builder(url("ftp://example.com"))
			.build()
			.expect_err("Non-HTTP schemes should be rejected.");

		assert!(matches!(err, ClientConfigError::UnsupportedScheme { .. }));

		let err = ClientConfig::builder(url("https://example.com/?tenant=1"))
			.build()
			.expect_err("Base URLs with queries should be rejected.");

		assert!(matches!(err, ClientConfigError::BaseUrlHasQuery { .. }));

		let err = ClientConfig::builder(url("https://example.com"))
			.refresh_path("auth/token/refresh/")
			.build()
			.expect_err("Relative refresh paths should be rejected.");

		assert_eq!(
			err,
			ClientConfigError::RelativePath { which: "refresh", path: "auth/token/refresh/".into() }
		);
	}
}
