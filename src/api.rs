//! Typed endpoints of the attendance API: events, attendance registration, and external users.

// self
use crate::{
	_prelude::*,
	auth::AccountNumber,
	client::ApiClient,
	error::ConfigError,
	http::ApiHttpClient,
	obs::{self, CallSpan, Operation, Outcome, trace_debug},
	session::AttendeeKind,
	window::{self, Clock, Event, RegistrationWindowConfig, SystemConfig},
};

/// List payload that may or may not be paginated.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
	/// Paginated envelope; only `results` is kept.
	Page {
		/// Items on this page.
		results: Vec<T>,
	},
	/// Bare JSON array.
	Bare(Vec<T>),
}
impl<T> Listing<T> {
	/// Returns the listed items.
	pub fn into_items(self) -> Vec<T> {
		match self {
			Self::Page { results } | Self::Bare(results) => results,
		}
	}
}

/// Confirmation returned after registering an attendance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationReceipt {
	/// Human-readable confirmation.
	pub message: String,
	/// Identifier of the stored attendance.
	#[serde(default)]
	pub attendance_id: Option<u64>,
	/// Title of the event the attendance was recorded for.
	#[serde(default)]
	pub event: Option<String>,
	/// Name of the staff member who registered it.
	#[serde(default)]
	pub registered_by: Option<String>,
	/// `student` or `external`.
	#[serde(default)]
	pub attendee_type: Option<String>,
}

/// Row of the recent-attendance feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentAttendance {
	/// Student or external user name.
	pub attendee_name: String,
	/// Event title.
	pub event_title: String,
	/// Registration time of day as sent by the server (`HH:MM`).
	pub timestamp: String,
}

/// One of the signed-in attendee's own attendances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
	/// Attendance identifier.
	pub id: u64,
	/// Identifier of the attended event.
	pub event: u64,
	/// Title of the attended event.
	pub event_title: String,
	/// Date of the attended event.
	#[serde(with = "window::wall_date")]
	pub event_date: Date,
	/// Local registration instant.
	#[serde(with = "wall_timestamp")]
	pub timestamp: PrimitiveDateTime,
}

/// Attendance statistics for one attendee.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttendanceStats {
	/// Events the attendee could have attended.
	pub total_events: u64,
	/// Events the attendee attended.
	pub attended_events: u64,
	/// Attendance ratio in percent.
	pub attendance_percentage: f64,
}

/// External (non-student) attendee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalUser {
	/// Server identifier, when provided.
	#[serde(default)]
	pub id: Option<u64>,
	/// Eight-digit account number.
	pub account_number: String,
	/// Display name.
	pub full_name: String,
	/// Approval status, when provided.
	#[serde(default)]
	pub status: Option<String>,
}

/// Result of an external-user search.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSearch {
	/// Total number of matches.
	#[serde(default)]
	pub count: u64,
	/// Matching users.
	#[serde(default)]
	pub results: Vec<ExternalUser>,
}

#[derive(Debug, Serialize)]
struct AttendanceRequest<'a> {
	event_id: u64,
	account_number: &'a str,
	registration_method: &'static str,
}

#[derive(Debug, Serialize)]
struct ExternalUserRequest<'a> {
	account_number: &'a str,
	full_name: &'a str,
}

impl<C> ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Lists every event, unwrapping a paginated envelope when present.
	pub async fn events(&self) -> Result<Vec<Event>> {
		Ok(self.get::<Listing<Event>>("/events/").await?.into_items())
	}

	/// Fetches the registration-window configuration.
	///
	/// Server, decode, and transport failures fall back to the default window; authentication,
	/// storage, and configuration failures propagate.
	pub async fn system_config(&self) -> Result<RegistrationWindowConfig> {
		match self.get::<Option<SystemConfig>>("/auth/system-config/").await {
			Ok(config) => Ok(config.unwrap_or_default().resolve()),
			Err(Error::Server { .. } | Error::Decode { .. } | Error::Transport(_)) => {
				trace_debug!("System config unavailable; using the default window.");

				Ok(RegistrationWindowConfig::default())
			},
			Err(e) => Err(e),
		}
	}

	/// Events open for attendance registration at `clock`'s current instant.
	pub async fn active_events(&self, clock: &dyn Clock) -> Result<Vec<Event>> {
		const OPERATION: Operation = Operation::ActiveEvents;

		let span = CallSpan::new(OPERATION, "active_events");

		obs::record_call_outcome(OPERATION, Outcome::Attempt);

		let result = span
			.instrument(async move {
				let config = self.system_config().await?;
				let events = self.events().await?;

				Ok(window::filter_active(events, config, clock.now()))
			})
			.await;

		obs::record_call_outcome(OPERATION, Outcome::of(&result));

		result
	}

	/// Registers a manual attendance for an 8-digit account number.
	pub async fn register_attendance(
		&self,
		event_id: u64,
		account_number: &str,
	) -> Result<RegistrationReceipt> {
		let account = AccountNumber::for_attendee(account_number).map_err(ConfigError::from)?;
		let body =
			AttendanceRequest { event_id, account_number: &account, registration_method: "manual" };

		self.post("/attendance/", &body).await
	}

	/// The latest attendances registered by anyone.
	pub async fn recent_attendances(&self) -> Result<Vec<RecentAttendance>> {
		Ok(self.get::<Listing<RecentAttendance>>("/attendance/recent/").await?.into_items())
	}

	/// Attendances recorded for `account`.
	pub async fn my_attendances(
		&self,
		account: &AccountNumber,
		kind: AttendeeKind,
	) -> Result<Vec<AttendanceRecord>> {
		let endpoint = attendee_endpoint(kind, "my", account);

		Ok(self.get::<Listing<AttendanceRecord>>(&endpoint).await?.into_items())
	}

	/// Attendance statistics for `account`.
	pub async fn student_stats(
		&self,
		account: &AccountNumber,
		kind: AttendeeKind,
	) -> Result<AttendanceStats> {
		self.get(&attendee_endpoint(kind, "stats", account)).await
	}

	/// Creates an external user with an 8-digit account number and a non-blank name.
	pub async fn register_external_user(
		&self,
		account_number: &str,
		full_name: &str,
	) -> Result<ExternalUser> {
		let account = AccountNumber::for_attendee(account_number).map_err(ConfigError::from)?;
		let full_name = full_name.trim();

		if full_name.is_empty() {
			return Err(ConfigError::MissingField { field: "full_name" }.into());
		}

		self.post(
			"/events/external/register/",
			&ExternalUserRequest { account_number: &account, full_name },
		)
		.await
	}

	/// Searches external users; a blank query returns no results without calling the API.
	pub async fn search_external_users(&self, query: &str) -> Result<ExternalSearch> {
		let query = query.trim();

		if query.is_empty() {
			return Ok(ExternalSearch::default());
		}

		let encoded = url::form_urlencoded::byte_serialize(query.as_bytes()).collect::<String>();

		self.get(&format!("/events/external/search/?q={encoded}")).await
	}
}

fn attendee_endpoint(kind: AttendeeKind, view: &str, account: &AccountNumber) -> String {
	let scope = match kind {
		AttendeeKind::Student => "",
		AttendeeKind::External => "external/",
	};

	format!("/attendance/{scope}{view}/?account_number={account}")
}

time::serde::format_description!(
	wall_timestamp,
	PrimitiveDateTime,
	"[year]-[month]-[day] [hour]:[minute]:[second]"
);

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::{date, datetime};
	// self
	use super::*;

	#[test]
	fn listings_accept_pages_and_bare_arrays() {
		let page: Listing<u64> = serde_json::from_str(r#"{"count":2,"next":null,"results":[4,5]}"#)
			.expect("Paginated listing should decode.");
		let bare: Listing<u64> =
			serde_json::from_str("[6]").expect("Bare listing should decode.");

		assert_eq!(page.into_items(), vec![4, 5]);
		assert_eq!(bare.into_items(), vec![6]);
	}

	#[test]
	fn attendee_endpoints_follow_kind() {
		let account = AccountNumber::new("12345678").expect("Fixture account is valid.");

		assert_eq!(
			attendee_endpoint(AttendeeKind::Student, "my", &account),
			"/attendance/my/?account_number=12345678"
		);
		assert_eq!(
			attendee_endpoint(AttendeeKind::External, "stats", &account),
			"/attendance/external/stats/?account_number=12345678"
		);
	}

	#[test]
	fn attendance_records_decode_server_formats() {
		let payload = r#"[{
			"id": 11,
			"event": 3,
			"event_title": "Congreso de Finanzas",
			"event_date": "2025-10-21",
			"timestamp": "2025-10-21 09:57:12"
		}]"#;
		let records = serde_json::from_str::<Listing<AttendanceRecord>>(payload)
			.expect("Attendance records should decode.")
			.into_items();

		assert_eq!(records[0].event_date, date!(2025 - 10 - 21));
		assert_eq!(records[0].timestamp, datetime!(2025-10-21 09:57:12));
		assert_eq!(
			serde_json::to_value(&records[0]).expect("Record should encode.")["timestamp"],
			"2025-10-21 09:57:12"
		);
	}

	#[test]
	fn receipts_tolerate_sparse_payloads() {
		let receipt: RegistrationReceipt =
			serde_json::from_str(r#"{"message":"Asistencia registrada para Ana"}"#)
				.expect("Sparse receipt should decode.");

		assert_eq!(receipt.message, "Asistencia registrada para Ana");
		assert_eq!(receipt.attendance_id, None);
	}
}
