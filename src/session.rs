//! Login and logout: the only places the token pair is created or deliberately discarded.

// self
use crate::{
	_prelude::*,
	auth::{AccountNumber, AccountNumberError, EXTERNAL_USERNAME_PREFIX, TokenPair},
	client::ApiClient,
	error::ConfigError,
	http::ApiHttpClient,
	obs::{self, CallSpan, Operation, Outcome},
	store::TokenStore,
};

/// Profile attached to an authenticated user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	/// Account number, for students.
	#[serde(default)]
	pub account_number: Option<String>,
	/// Role label (`student`, `assistant`, ...).
	#[serde(default)]
	pub user_type: Option<String>,
	/// Display name.
	#[serde(default)]
	pub full_name: Option<String>,
}

/// User returned by the login endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
	/// Server identifier, when provided.
	#[serde(default)]
	pub id: Option<u64>,
	/// Login name; external users are `ext_<account>`.
	pub username: String,
	/// Profile details, when provided.
	#[serde(default)]
	pub profile: Option<UserProfile>,
}
impl AuthenticatedUser {
	/// Returns `true` for external (non-student) attendees.
	pub fn is_external(&self) -> bool {
		self.username.starts_with(EXTERNAL_USERNAME_PREFIX)
	}

	/// Which attendee endpoints apply to this user.
	pub fn attendee_kind(&self) -> AttendeeKind {
		if self.is_external() { AttendeeKind::External } else { AttendeeKind::Student }
	}

	/// Account number used for the user's own attendance and stats queries.
	///
	/// External users carry it in their username; students in their profile.
	pub fn account_number(&self) -> Result<AccountNumber, AccountNumberError> {
		if self.is_external() {
			return AccountNumber::from_external_username(&self.username);
		}

		self.profile
			.as_ref()
			.and_then(|profile| profile.account_number.as_deref())
			.ok_or(AccountNumberError::Empty)
			.and_then(AccountNumber::new)
	}
}

/// Attendee category, selecting between student and external-user endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendeeKind {
	/// Enrolled student.
	Student,
	/// Externally registered attendee.
	External,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
	account_number: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
	user: AuthenticatedUser,
	#[serde(deserialize_with = "non_empty_pair")]
	tokens: TokenPair,
}

fn non_empty_pair<'de, D>(deserializer: D) -> Result<TokenPair, D::Error>
where
	D: serde::Deserializer<'de>,
{
	let pair = TokenPair::deserialize(deserializer)?;

	if pair.access_token.expose().is_empty() || pair.refresh_token.expose().is_empty() {
		return Err(<D::Error as serde::de::Error>::custom("Token pair contains an empty token."));
	}

	Ok(pair)
}

impl<C> ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Logs in with a 7-digit account number, storing the issued token pair.
	pub async fn login(&self, account_number: &str) -> Result<AuthenticatedUser> {
		const OPERATION: Operation = Operation::Login;

		let span = CallSpan::new(OPERATION, "login");

		obs::record_call_outcome(OPERATION, Outcome::Attempt);

		let result = span
			.instrument(async move {
				let account = AccountNumber::for_login(account_number).map_err(ConfigError::from)?;
				let response: LoginResponse = self
					.post("/auth/login/", &LoginRequest { account_number: &account })
					.await?;

				<dyn TokenStore>::save_pair(self.store.as_ref(), response.tokens).await?;

				Ok(response.user)
			})
			.await;

		obs::record_call_outcome(OPERATION, Outcome::of(&result));

		result
	}

	/// Forgets the stored token pair.
	pub async fn logout(&self) -> Result<()> {
		const OPERATION: Operation = Operation::Logout;

		obs::record_call_outcome(OPERATION, Outcome::Attempt);

		let result = <dyn TokenStore>::clear_all(self.store.as_ref()).await.map_err(Error::from);

		obs::record_call_outcome(OPERATION, Outcome::of(&result));

		result
	}

	/// Returns `true` while a non-empty access token is stored.
	pub async fn is_authenticated(&self) -> Result<bool> {
		Ok(self.stored_access_token().await?.is_some())
	}
}
