//! Sliding-window attempt counter keyed by client identifier.
//!
//! Each limiter owns its own map; two limiters built with the same parameters
//! never see each other's records. The window is anchored to the most recent
//! attempt, so repeated attempts keep pushing the expiry out.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Millisecond time source. Must never go backwards.
pub trait Clock: Send + Sync {
	fn now_ms(&self) -> u64;
}

/// Milliseconds elapsed since the clock was created.
pub struct MonotonicClock {
	origin: Instant,
}

impl MonotonicClock {
	pub fn new() -> Self {
		Self { origin: Instant::now() }
	}
}

impl Default for MonotonicClock {
	fn default() -> Self {
		Self::new()
	}
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub fn saturating_millis(d: Duration) -> u64 {
	u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Clock for MonotonicClock {
	fn now_ms(&self) -> u64 {
		saturating_millis(self.origin.elapsed())
	}
}

/// Clock that only moves when told to. Used by tests.
#[derive(Default)]
pub struct ManualClock {
	now: AtomicU64,
}

impl ManualClock {
	pub fn new(start_ms: u64) -> Self {
		Self { now: AtomicU64::new(start_ms) }
	}
	pub fn advance(&self, by: Duration) {
		let by = saturating_millis(by);
		let _ = self.now.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| Some(now.saturating_add(by)));
	}
	pub fn set(&self, ms: u64) {
		self.now.store(ms, Ordering::SeqCst);
	}
}

impl Clock for ManualClock {
	fn now_ms(&self) -> u64 {
		self.now.load(Ordering::SeqCst)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptRecord {
	pub count: u32,
	pub last_attempt_ms: u64,
}

pub struct RateLimiter {
	records: DashMap<String, AttemptRecord>,
	max_attempts: u32,
	window_ms: u64,
	clock: Arc<dyn Clock>,
}

impl RateLimiter {
	/// Windows longer than `u64::MAX` milliseconds are clamped to that.
	///
	/// # Panics
	/// If `max_attempts` is zero or `window` is shorter than one millisecond.
	pub fn new(max_attempts: u32, window: Duration) -> Self {
		Self::with_clock(max_attempts, window, Arc::new(MonotonicClock::new()))
	}

	pub fn with_clock(max_attempts: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
		assert!(max_attempts > 0, "max_attempts must be positive");
		let window_ms = saturating_millis(window);
		assert!(window_ms > 0, "window must be at least one millisecond");
		Self { records: DashMap::new(), max_attempts, window_ms, clock }
	}

	pub fn max_attempts(&self) -> u32 {
		self.max_attempts
	}

	pub fn window(&self) -> Duration {
		Duration::from_millis(self.window_ms)
	}

	fn expired(&self, record: &AttemptRecord, now: u64) -> bool {
		now.saturating_sub(record.last_attempt_ms) > self.window_ms
	}

	/// True once `max_attempts` attempts have been recorded inside the window.
	/// Drops the record if its window has lapsed; never counts an attempt.
	pub fn is_limited(&self, identifier: &str) -> bool {
		debug_assert!(!identifier.is_empty(), "empty client identifier");
		let now = self.clock.now_ms();
		match self.records.get(identifier) {
			None => return false,
			Some(record) if !self.expired(&record, now) => return record.count >= self.max_attempts,
			Some(_) => {}
		}
		// Read guard is gone here. Re-checked under the write lock since a
		// concurrent attempt may have refreshed the record in between.
		self.records.remove_if(identifier, |_, record| self.expired(record, now));
		false
	}

	pub fn record_attempt(&self, identifier: &str) {
		debug_assert!(!identifier.is_empty(), "empty client identifier");
		let now = self.clock.now_ms();
		let fresh = AttemptRecord { count: 1, last_attempt_ms: now };
		match self.records.entry(identifier.to_string()) {
			Entry::Vacant(entry) => {
				entry.insert(fresh);
			}
			Entry::Occupied(mut entry) => {
				if self.expired(entry.get(), now) {
					entry.insert(fresh);
				} else {
					let record = entry.get_mut();
					record.count = record.count.saturating_add(1);
					record.last_attempt_ms = now;
				}
			}
		}
	}

	pub fn clear_attempts(&self, identifier: &str) {
		self.records.remove(identifier);
	}

	/// Removes every record whose window has lapsed. Returns how many were dropped.
	pub fn sweep_expired(&self) -> usize {
		let now = self.clock.now_ms();
		let mut dropped = 0;
		self.records.retain(|_, record| {
			let keep = !self.expired(record, now);
			if !keep {
				dropped += 1;
			}
			keep
		});
		dropped
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	#[cfg(test)]
	fn record(&self, identifier: &str) -> Option<AttemptRecord> {
		self.records.get(identifier).map(|r| *r)
	}
}
