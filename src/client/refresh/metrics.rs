// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for access-token refreshes issued by one client.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	forced_logouts: AtomicU64,
}
impl RefreshMetrics {
	/// Returns the number of refreshes started.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of refreshes that stored a new access token.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of refreshes that failed for any reason.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns how many failed refreshes cleared the stored tokens.
	pub fn forced_logouts(&self) -> u64 {
		self.forced_logouts.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_forced_logout(&self) {
		self.forced_logouts.fetch_add(1, Ordering::Relaxed);
	}
}
