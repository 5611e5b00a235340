use std::path::PathBuf;
use std::time::Duration;

use crate::errors::{AppError, AppResult};
use crate::limits::LimitSettings;

#[derive(Debug, Clone)]
pub struct Settings {
	pub admin_password: String,
	pub jwt_secret: String,
	pub db_path: PathBuf,
	/// `None` disables the background sweep.
	pub sweep_interval: Option<Duration>,
	pub admin_login: LimitSettings,
	pub contact: LimitSettings,
	pub newsletter: LimitSettings,
	pub quiz: LimitSettings,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			admin_password: String::new(),
			jwt_secret: "dev-secret".into(),
			db_path: PathBuf::from("./storefront.sqlite"),
			sweep_interval: Some(Duration::from_secs(300)),
			admin_login: LimitSettings::ADMIN_LOGIN,
			contact: LimitSettings::CONTACT,
			newsletter: LimitSettings::NEWSLETTER,
			quiz: LimitSettings::QUIZ,
		}
	}
}

impl Settings {
	pub fn from_env() -> AppResult<Self> {
		let defaults = Self::default();
		let sweep_secs = env_u64("RATE_LIMIT_SWEEP_SECS", 300);
		Ok(Self {
			admin_password: std::env::var("ADMIN_PASSWORD").unwrap_or_default(),
			jwt_secret: std::env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
			db_path: std::env::var("STOREFRONT_DB_PATH").map(PathBuf::from).unwrap_or(defaults.db_path),
			sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
			admin_login: limit_from_env("ADMIN_LOGIN", defaults.admin_login)?,
			contact: limit_from_env("CONTACT", defaults.contact)?,
			newsletter: limit_from_env("NEWSLETTER", defaults.newsletter)?,
			quiz: limit_from_env("QUIZ", defaults.quiz)?,
		})
	}
}

fn env_u64(key: &str, default: u64) -> u64 {
	match std::env::var(key) {
		Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
			tracing::warn!(key, value = %raw, default, "ignoring unparsable setting");
			default
		}),
		Err(_) => default,
	}
}

/// Largest window whose length in milliseconds still fits a u64.
const MAX_WINDOW_SECS: u64 = u64::MAX / 1_000;

fn limit_from_env(prefix: &str, default: LimitSettings) -> AppResult<LimitSettings> {
	let max_key = format!("{prefix}_MAX_ATTEMPTS");
	let window_key = format!("{prefix}_WINDOW_SECS");
	let max_attempts = env_u64(&max_key, default.max_attempts as u64);
	let window_secs = env_u64(&window_key, default.window.as_secs());
	if max_attempts == 0 || max_attempts > u32::MAX as u64 {
		return Err(AppError::Config(format!("{max_key} must be between 1 and {}", u32::MAX)));
	}
	if window_secs == 0 || window_secs > MAX_WINDOW_SECS {
		return Err(AppError::Config(format!("{window_key} must be between 1 and {MAX_WINDOW_SECS}")));
	}
	Ok(LimitSettings { max_attempts: max_attempts as u32, window: Duration::from_secs(window_secs) })
}

#[cfg(test)]
mod tests {
	use super::*;

	// Each test owns a distinct prefix so parallel tests never race on the same variable.
	#[test]
	fn limit_defaults_when_unset() {
		let got = limit_from_env("CFGTEST_UNSET", LimitSettings::QUIZ).unwrap();
		assert_eq!(got, LimitSettings::QUIZ);
	}

	#[test]
	fn limit_reads_overrides() {
		std::env::set_var("CFGTEST_OVERRIDE_MAX_ATTEMPTS", "7");
		std::env::set_var("CFGTEST_OVERRIDE_WINDOW_SECS", "42");
		let got = limit_from_env("CFGTEST_OVERRIDE", LimitSettings::CONTACT).unwrap();
		assert_eq!(got, LimitSettings { max_attempts: 7, window: Duration::from_secs(42) });
	}

	#[test]
	fn unparsable_value_keeps_default() {
		std::env::set_var("CFGTEST_GARBAGE_MAX_ATTEMPTS", "lots");
		let got = limit_from_env("CFGTEST_GARBAGE", LimitSettings::ADMIN_LOGIN).unwrap();
		assert_eq!(got.max_attempts, 5);
	}

	#[test]
	fn zero_is_rejected() {
		std::env::set_var("CFGTEST_ZERO_WINDOW_SECS", "0");
		let err = limit_from_env("CFGTEST_ZERO", LimitSettings::NEWSLETTER).unwrap_err();
		assert!(matches!(err, AppError::Config(_)));
	}

	#[test]
	fn window_too_long_for_milliseconds_is_rejected() {
		std::env::set_var("CFGTEST_HUGE_WINDOW_SECS", "18446744073709552");
		let err = limit_from_env("CFGTEST_HUGE", LimitSettings::QUIZ).unwrap_err();
		assert!(matches!(err, AppError::Config(_)));

		std::env::set_var("CFGTEST_EDGE_WINDOW_SECS", MAX_WINDOW_SECS.to_string());
		let got = limit_from_env("CFGTEST_EDGE", LimitSettings::QUIZ).unwrap();
		assert_eq!(got.window, Duration::from_secs(MAX_WINDOW_SECS));
	}
}
