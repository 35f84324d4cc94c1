//! Registration-window eligibility for events.
//!
//! An event is open for attendance registration when it is dated today (local) and the current
//! local instant lies in the closed interval `[start - minutes_before_event,
//! start + minutes_after_start]`. The window is anchored to the start time even for long events,
//! and an event from another day is never active, whatever the arithmetic says.
//!
//! All computations use wall-clock [`PrimitiveDateTime`] values; [`LocalClock`] is where the UTC
//! offset gets applied.

// crates.io
use time::{format_description::BorrowedFormatItem, macros::format_description};
// self
use crate::_prelude::*;

const TIME_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[hour]:[minute]:[second]");
const TIME_FORMAT_SUBSECOND: &[BorrowedFormatItem<'_>] =
	format_description!("[hour]:[minute]:[second].[subsecond]");
const TIME_FORMAT_SHORT: &[BorrowedFormatItem<'_>] = format_description!("[hour]:[minute]");

/// Server-owned event, read-only on the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
	/// Server identifier.
	pub id: u64,
	/// Display title.
	pub title: String,
	/// Calendar date the event takes place on.
	#[serde(with = "wall_date")]
	pub date: Date,
	/// Local start time.
	#[serde(with = "wall_time")]
	pub start_time: Time,
	/// Local end time.
	#[serde(with = "wall_time")]
	pub end_time: Time,
	/// Free-form description.
	#[serde(default)]
	pub description: Option<String>,
	/// Room or venue.
	#[serde(default)]
	pub location: Option<String>,
	/// Presenter name.
	#[serde(default)]
	pub speaker: Option<String>,
	/// Delivery mode (for example in-person or online).
	#[serde(default)]
	pub modality: Option<String>,
}
impl Event {
	/// Local instant the event starts at.
	pub fn starts_at(&self) -> PrimitiveDateTime {
		PrimitiveDateTime::new(self.date, self.start_time)
	}

	/// Local instant the event ends at.
	pub fn ends_at(&self) -> PrimitiveDateTime {
		PrimitiveDateTime::new(self.date, self.end_time)
	}
}

/// Lead and grace time around an event's start, in minutes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationWindowConfig {
	/// How early registration opens.
	pub minutes_before_event: u32,
	/// How long after the start registration stays open.
	pub minutes_after_start: u32,
}
impl RegistrationWindowConfig {
	/// Lead time used when the server does not provide one.
	pub const DEFAULT_MINUTES_BEFORE_EVENT: u32 = 10;
	/// Grace time used when the server does not provide one.
	pub const DEFAULT_MINUTES_AFTER_START: u32 = 25;

	/// Builds a config from explicit values.
	pub const fn new(minutes_before_event: u32, minutes_after_start: u32) -> Self {
		Self { minutes_before_event, minutes_after_start }
	}

	/// Registration window for `event`, or `None` if the bounds fall outside the representable
	/// date range.
	pub fn window_for(&self, event: &Event) -> Option<RegistrationWindow> {
		let start = event.starts_at();
		let opens_at =
			start.checked_sub(Duration::minutes(i64::from(self.minutes_before_event)))?;
		let closes_at = start.checked_add(Duration::minutes(i64::from(self.minutes_after_start)))?;

		Some(RegistrationWindow { date: event.date, opens_at, closes_at })
	}
}
impl Default for RegistrationWindowConfig {
	fn default() -> Self {
		Self::new(Self::DEFAULT_MINUTES_BEFORE_EVENT, Self::DEFAULT_MINUTES_AFTER_START)
	}
}
impl From<SystemConfig> for RegistrationWindowConfig {
	fn from(value: SystemConfig) -> Self {
		value.resolve()
	}
}

/// Raw `/auth/system-config/` payload; either field may be absent or null.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
	/// Configured lead time, if any.
	#[serde(default)]
	pub minutes_before_event: Option<u32>,
	/// Configured grace time, if any.
	#[serde(default)]
	pub minutes_after_start: Option<u32>,
}
impl SystemConfig {
	/// Substitutes 10 and 25 minutes for missing fields.
	pub fn resolve(&self) -> RegistrationWindowConfig {
		RegistrationWindowConfig::new(
			self.minutes_before_event
				.unwrap_or(RegistrationWindowConfig::DEFAULT_MINUTES_BEFORE_EVENT),
			self.minutes_after_start
				.unwrap_or(RegistrationWindowConfig::DEFAULT_MINUTES_AFTER_START),
		)
	}
}

/// Closed interval during which attendance for one event is accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistrationWindow {
	/// Calendar date of the event the window belongs to.
	pub date: Date,
	/// First instant registration is accepted.
	pub opens_at: PrimitiveDateTime,
	/// Last instant registration is accepted.
	pub closes_at: PrimitiveDateTime,
}
impl RegistrationWindow {
	/// Returns `true` when `now` is on the event's date and inside the window, both edges
	/// inclusive.
	pub fn is_open_at(&self, now: PrimitiveDateTime) -> bool {
		self.date == now.date() && self.opens_at <= now && now <= self.closes_at
	}
}

/// Source of the current local wall-clock instant.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current local date and time.
	fn now(&self) -> PrimitiveDateTime;
}

/// Clock that reads the system time and shifts it by a fixed UTC offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalClock {
	offset: UtcOffset,
}
impl LocalClock {
	/// Uses the host's current UTC offset.
	///
	/// On Unix the offset can only be read while the process is single-threaded, so this fails
	/// inside a multi-threaded Tokio runtime. Detect once in a synchronous `main`, before any
	/// runtime or thread exists, and move the (`Copy`) clock into the async code:
	///
	/// ```no_run
	/// use attendance_client::window::LocalClock;
	///
	/// fn main() -> Result<(), Box<dyn std::error::Error>> {
	/// 	let clock = LocalClock::detect()?;
	///
	/// 	tokio::runtime::Runtime::new()?.block_on(async move {
	/// 		let _ = clock;
	/// 	});
	///
	/// 	Ok(())
	/// }
	/// ```
	///
	/// Where detection is impossible, supply the offset with [`LocalClock::with_offset`].
	pub fn detect() -> Result<Self> {
		let offset = UtcOffset::current_local_offset().map_err(crate::error::ConfigError::from)?;

		Ok(Self { offset })
	}

	/// Uses a fixed, caller-provided UTC offset.
	pub const fn with_offset(offset: UtcOffset) -> Self {
		Self { offset }
	}

	/// Offset applied to the system time.
	pub const fn offset(&self) -> UtcOffset {
		self.offset
	}
}
impl Clock for LocalClock {
	fn now(&self) -> PrimitiveDateTime {
		let now = OffsetDateTime::now_utc().to_offset(self.offset);

		PrimitiveDateTime::new(now.date(), now.time())
	}
}

/// Clock frozen at one instant; for tests and replays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(pub PrimitiveDateTime);
impl Clock for FixedClock {
	fn now(&self) -> PrimitiveDateTime {
		self.0
	}
}

/// Keeps the events open for registration at `now`, preserving input order.
pub fn filter_active<I>(
	events: I,
	config: RegistrationWindowConfig,
	now: PrimitiveDateTime,
) -> Vec<Event>
where
	I: IntoIterator<Item = Event>,
{
	events
		.into_iter()
		.filter(|event| config.window_for(event).is_some_and(|window| window.is_open_at(now)))
		.collect()
}

/// [`filter_active`] with `now` read from `clock`.
pub fn filter_active_at<I>(
	events: I,
	config: RegistrationWindowConfig,
	clock: &dyn Clock,
) -> Vec<Event>
where
	I: IntoIterator<Item = Event>,
{
	filter_active(events, config, clock.now())
}

/// Keeps the events that have not ended yet (`date + end_time` strictly after `now`).
pub fn filter_upcoming<I>(events: I, now: PrimitiveDateTime) -> Vec<Event>
where
	I: IntoIterator<Item = Event>,
{
	events.into_iter().filter(|event| event.ends_at() > now).collect()
}

/// Keeps the events whose id appears in `attended_event_ids`.
pub fn filter_attended<I, A>(events: I, attended_event_ids: A) -> Vec<Event>
where
	I: IntoIterator<Item = Event>,
	A: IntoIterator<Item = u64>,
{
	let attended = attended_event_ids.into_iter().collect::<std::collections::HashSet<_>>();

	events.into_iter().filter(|event| attended.contains(&event.id)).collect()
}

time::serde::format_description!(pub(crate) wall_date, Date, "[year]-[month]-[day]");

mod wall_time {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use super::*;

	pub fn serialize<S>(value: &Time, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let raw = value.format(TIME_FORMAT).map_err(<S::Error as serde::ser::Error>::custom)?;

		serializer.serialize_str(&raw)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Time, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		super::parse_time(&raw).map_err(<D::Error as serde::de::Error>::custom)
	}
}

/// Parses `HH:MM`, `HH:MM:SS`, or `HH:MM:SS.ffffff`.
fn parse_time(raw: &str) -> Result<Time, time::error::Parse> {
	let format = match raw.matches(':').count() {
		1 => TIME_FORMAT_SHORT,
		_ if raw.contains('.') => TIME_FORMAT_SUBSECOND,
		_ => TIME_FORMAT,
	};

	Time::parse(raw, format)
}
