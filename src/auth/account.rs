//! Validated account numbers used for login, attendance registration, and external users.

// std
use std::ops::Deref;
// self
use crate::_prelude::*;

/// Username prefix the server assigns to external (non-student) attendees.
pub const EXTERNAL_USERNAME_PREFIX: &str = "ext_";

const LOGIN_DIGITS: usize = 7;
const ATTENDEE_DIGITS: usize = 8;
const ACCOUNT_MAX_LEN: usize = 16;

/// Error returned when account number validation fails.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AccountNumberError {
	/// The value was empty or whitespace.
	#[error("Account number cannot be empty.")]
	Empty,
	/// The value contains something other than ASCII digits.
	#[error("Account number must contain digits only.")]
	NonDigit,
	/// The value has the wrong number of digits for its use.
	#[error("Account number must have exactly {expected} digits, got {actual}.")]
	WrongLength {
		/// Required number of digits.
		expected: usize,
		/// Digits supplied.
		actual: usize,
	},
	/// The value exceeds the generic maximum length.
	#[error("Account number exceeds {max} digits.")]
	TooLong {
		/// Maximum allowed digits.
		max: usize,
	},
	/// A username did not carry the external-user prefix.
	#[error("Username is not an external-user username.")]
	NotExternal,
}

/// Digits-only account number.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);
impl AccountNumber {
	/// Accepts any non-empty digit string of at most 16 characters.
	pub fn new(value: impl AsRef<str>) -> Result<Self, AccountNumberError> {
		let view = value.as_ref().trim();

		validate_digits(view)?;

		if view.len() > ACCOUNT_MAX_LEN {
			return Err(AccountNumberError::TooLong { max: ACCOUNT_MAX_LEN });
		}

		Ok(Self(view.to_owned()))
	}

	/// Accepts the 7-digit numbers used on the login screen.
	pub fn for_login(value: impl AsRef<str>) -> Result<Self, AccountNumberError> {
		Self::with_length(value.as_ref(), LOGIN_DIGITS)
	}

	/// Accepts the 8-digit numbers scanned at registration desks and given to external users.
	pub fn for_attendee(value: impl AsRef<str>) -> Result<Self, AccountNumberError> {
		Self::with_length(value.as_ref(), ATTENDEE_DIGITS)
	}

	/// Recovers the account number from an `ext_<digits>` username.
	pub fn from_external_username(username: &str) -> Result<Self, AccountNumberError> {
		username
			.strip_prefix(EXTERNAL_USERNAME_PREFIX)
			.ok_or(AccountNumberError::NotExternal)
			.and_then(Self::new)
	}

	fn with_length(value: &str, expected: usize) -> Result<Self, AccountNumberError> {
		let view = value.trim();

		validate_digits(view)?;

		if view.len() != expected {
			return Err(AccountNumberError::WrongLength { expected, actual: view.len() });
		}

		Ok(Self(view.to_owned()))
	}
}
impl Deref for AccountNumber {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for AccountNumber {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<AccountNumber> for String {
	fn from(value: AccountNumber) -> Self {
		value.0
	}
}
impl TryFrom<String> for AccountNumber {
	type Error = AccountNumberError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl Debug for AccountNumber {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "AccountNumber({})", self.0)
	}
}
impl Display for AccountNumber {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for AccountNumber {
	type Err = AccountNumberError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_digits(view: &str) -> Result<(), AccountNumberError> {
	if view.is_empty() {
		return Err(AccountNumberError::Empty);
	}
	if !view.bytes().all(|b| b.is_ascii_digit()) {
		return Err(AccountNumberError::NonDigit);
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn login_numbers_need_seven_digits() {
		assert!(AccountNumber::for_login("3141592").is_ok());
		assert_eq!(
			AccountNumber::for_login("31415926"),
			Err(AccountNumberError::WrongLength { expected: 7, actual: 8 })
		);
		assert_eq!(AccountNumber::for_login("31415a2"), Err(AccountNumberError::NonDigit));
		assert_eq!(AccountNumber::for_login("   "), Err(AccountNumberError::Empty));
	}

	#[test]
	fn attendee_numbers_need_eight_digits() {
		let account = AccountNumber::for_attendee(" 42424242 ")
			.expect("Surrounding whitespace should be ignored.");

		assert_eq!(account.as_ref(), "42424242");
		assert!(AccountNumber::for_attendee("4242424").is_err());
	}

	#[test]
	fn external_usernames_strip_their_prefix() {
		let account = AccountNumber::from_external_username("ext_90001234")
			.expect("External usernames should yield their account number.");

		assert_eq!(account.to_string(), "90001234");
		assert_eq!(
			AccountNumber::from_external_username("student_1"),
			Err(AccountNumberError::NotExternal)
		);
	}

	#[test]
	fn deserialization_validates() {
		let parsed: AccountNumber =
			serde_json::from_str("\"1234567\"").expect("Digit strings should deserialize.");

		assert_eq!(&*parsed, "1234567");
		assert!(serde_json::from_str::<AccountNumber>("\"12-34\"").is_err());
	}
}
