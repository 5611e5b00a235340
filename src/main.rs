use dotenvy::dotenv;
use shuttle_runtime::SecretStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_guard::build_rocket;
use storefront_guard::config::Settings;

#[shuttle_runtime::main]
async fn rocket(#[shuttle_runtime::Secrets] secrets: SecretStore) -> shuttle_rocket::ShuttleRocket {
	// try_init: Shuttle may already have installed a global subscriber
	let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,rocket=info".into());
	tracing_subscriber::registry()
		.with(tracing_subscriber::EnvFilter::new(env_filter))
		.with(tracing_subscriber::fmt::layer())
		.try_init()
		.ok();

	// Local .env first, Shuttle secrets override
	dotenv().ok();
	load_secrets_to_env(&secrets);

	let settings = Settings::from_env().map_err(anyhow::Error::from)?;
	tracing::info!(
		admin_login = ?settings.admin_login,
		contact = ?settings.contact,
		newsletter = ?settings.newsletter,
		quiz = ?settings.quiz,
		"rate limits configured"
	);
	let rocket = build_rocket(settings).map_err(anyhow::Error::from)?;
	Ok(rocket.into())
}

fn load_secrets_to_env(secrets: &SecretStore) {
	for key in [
		"ADMIN_PASSWORD",
		"JWT_SECRET",
		"STOREFRONT_DB_PATH",
		"RATE_LIMIT_SWEEP_SECS",
		"ADMIN_LOGIN_MAX_ATTEMPTS",
		"ADMIN_LOGIN_WINDOW_SECS",
		"CONTACT_MAX_ATTEMPTS",
		"CONTACT_WINDOW_SECS",
		"NEWSLETTER_MAX_ATTEMPTS",
		"NEWSLETTER_WINDOW_SECS",
		"QUIZ_MAX_ATTEMPTS",
		"QUIZ_WINDOW_SECS",
	] {
		if let Some(val) = secrets.get(key) {
			std::env::set_var(key, val);
		}
	}
}
