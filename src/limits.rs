use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::rate_limit::{Clock, MonotonicClock, RateLimiter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitSettings {
	pub max_attempts: u32,
	pub window: Duration,
}

impl LimitSettings {
	pub const ADMIN_LOGIN: Self = Self { max_attempts: 5, window: Duration::from_secs(15 * 60) };
	pub const CONTACT: Self = Self { max_attempts: 3, window: Duration::from_secs(60 * 60) };
	pub const NEWSLETTER: Self = Self { max_attempts: 5, window: Duration::from_secs(60 * 60) };
	pub const QUIZ: Self = Self { max_attempts: 10, window: Duration::from_secs(5 * 60) };

	fn build(&self, clock: Arc<dyn Clock>) -> RateLimiter {
		RateLimiter::with_clock(self.max_attempts, self.window, clock)
	}
}

/// One limiter per protected call site. Built once at startup and handed to
/// Rocket as managed state.
pub struct Limiters {
	pub admin_login: RateLimiter,
	pub contact: RateLimiter,
	pub newsletter: RateLimiter,
	pub quiz: RateLimiter,
}

impl Limiters {
	pub fn from_settings(settings: &Settings) -> Self {
		Self::with_clock(settings, Arc::new(MonotonicClock::new()))
	}

	pub fn with_clock(settings: &Settings, clock: Arc<dyn Clock>) -> Self {
		Self {
			admin_login: settings.admin_login.build(clock.clone()),
			contact: settings.contact.build(clock.clone()),
			newsletter: settings.newsletter.build(clock.clone()),
			quiz: settings.quiz.build(clock),
		}
	}

	fn all(&self) -> [(&'static str, &RateLimiter); 4] {
		[
			("admin_login", &self.admin_login),
			("contact", &self.contact),
			("newsletter", &self.newsletter),
			("quiz", &self.quiz),
		]
	}

	pub fn sweep_expired(&self) -> usize {
		let mut dropped = 0;
		for (name, limiter) in self.all() {
			let n = limiter.sweep_expired();
			if n > 0 {
				tracing::debug!(limiter = name, dropped = n, remaining = limiter.len(), "swept expired attempt records");
			}
			dropped += n;
		}
		dropped
	}
}

/// Periodically drops lapsed records so identifiers that stop calling do not
/// stay in memory forever.
pub fn spawn_sweeper(limiters: Arc<Limiters>, every: Duration) -> tokio::task::JoinHandle<()> {
	tokio::spawn(async move {
		let mut interval = tokio::time::interval(every);
		interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
		loop {
			interval.tick().await;
			limiters.sweep_expired();
		}
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::rate_limit::ManualClock;

	#[test]
	fn call_sites_do_not_share_state() {
		let limiters = Limiters::from_settings(&Settings::default());
		for _ in 0..3 {
			limiters.contact.record_attempt("1.2.3.4");
		}
		assert!(limiters.contact.is_limited("1.2.3.4"));
		assert!(!limiters.newsletter.is_limited("1.2.3.4"));
		assert!(!limiters.admin_login.is_limited("1.2.3.4"));
		assert!(!limiters.quiz.is_limited("1.2.3.4"));
	}

	#[test]
	fn defaults_match_call_site_profiles() {
		let limiters = Limiters::from_settings(&Settings::default());
		assert_eq!(limiters.admin_login.max_attempts(), 5);
		assert_eq!(limiters.admin_login.window(), Duration::from_secs(900));
		assert_eq!(limiters.contact.max_attempts(), 3);
		assert_eq!(limiters.contact.window(), Duration::from_secs(3600));
		assert_eq!(limiters.quiz.max_attempts(), 10);
		assert_eq!(limiters.quiz.window(), Duration::from_secs(300));
	}

	#[test]
	fn sweep_covers_every_limiter() {
		let clock = Arc::new(ManualClock::new(0));
		let limiters = Limiters::with_clock(&Settings::default(), clock.clone());
		limiters.quiz.record_attempt("a");
		limiters.admin_login.record_attempt("a");
		clock.advance(Duration::from_secs(301));
		assert_eq!(limiters.sweep_expired(), 1);
		clock.advance(Duration::from_secs(600));
		assert_eq!(limiters.sweep_expired(), 1);
		assert!(limiters.admin_login.is_empty());
	}

	#[tokio::test]
	async fn sweeper_runs_on_interval() {
		let clock = Arc::new(ManualClock::new(0));
		let limiters = Arc::new(Limiters::with_clock(&Settings::default(), clock.clone()));
		limiters.quiz.record_attempt("a");
		clock.advance(Duration::from_secs(301));

		let handle = spawn_sweeper(limiters.clone(), Duration::from_millis(10));
		tokio::time::sleep(Duration::from_millis(50)).await;
		assert!(limiters.quiz.is_empty());
		handle.abort();
	}
}
