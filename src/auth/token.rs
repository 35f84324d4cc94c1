//! Token secrets, the access/refresh pair, and the fixed keys they are stored under.

// self
use crate::_prelude::*;

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Formats the secret as an `Authorization` header value.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.0)
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl From<&str> for TokenSecret {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl From<String> for TokenSecret {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Access + refresh credentials issued at login, in the server's `{ access, refresh }` shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
	/// Short-lived bearer credential.
	#[serde(rename = "access")]
	pub access_token: TokenSecret,
	/// Long-lived credential exchanged for new access tokens.
	#[serde(rename = "refresh")]
	pub refresh_token: TokenSecret,
}
impl TokenPair {
	/// Builds a pair from raw strings.
	pub fn new(access: impl Into<TokenSecret>, refresh: impl Into<TokenSecret>) -> Self {
		Self { access_token: access.into(), refresh_token: refresh.into() }
	}
}

/// Fixed storage keys for the two persisted tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKey {
	/// Key holding the access token.
	AccessToken,
	/// Key holding the refresh token.
	RefreshToken,
}
impl TokenKey {
	/// Both keys, access first.
	pub const ALL: [Self; 2] = [Self::AccessToken, Self::RefreshToken];

	/// Returns the stable storage key name.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenKey::AccessToken => "access_token",
			TokenKey::RefreshToken => "refresh_token",
		}
	}
}
impl Display for TokenKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert_eq!(secret.bearer(), "Bearer super-secret");
	}

	#[test]
	fn token_pair_reads_server_field_names() {
		let pair: TokenPair = serde_json::from_str(r#"{"access":"a-1","refresh":"r-1"}"#)
			.expect("Login token payload should deserialize.");

		assert_eq!(pair, TokenPair::new("a-1", "r-1"));
	}

	#[test]
	fn token_keys_serialize_to_storage_names() {
		for key in TokenKey::ALL {
			let encoded =
				serde_json::to_string(&key).expect("Token key should serialize to JSON.");

			assert_eq!(encoded, format!("\"{}\"", key.as_str()));
		}
	}
}
