#![allow(clippy::result_large_err)]

#[macro_use]
extern crate rocket;

pub mod auth;
pub mod client_id;
pub mod config;
pub mod db;
pub mod errors;
pub mod limits;
pub mod models;
pub mod rate_limit;
pub mod routes;

use std::sync::Arc;

use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedHeaders, AllowedMethods, AllowedOrigins, CorsOptions};

use crate::config::Settings;
use crate::db::DbState;
use crate::errors::{AppError, AppResult};
use crate::limits::{spawn_sweeper, Limiters};
use crate::routes::mount_routes;

pub fn build_rocket(settings: Settings) -> AppResult<Rocket<Build>> {
	let db = DbState::initialize(&settings.db_path)?;
	let limiters = Arc::new(Limiters::from_settings(&settings));
	assemble(settings, db, limiters)
}

/// Wires already-built state into Rocket. Tests use this to inject limiters
/// driven by a manual clock.
pub fn assemble(settings: Settings, db: DbState, limiters: Arc<Limiters>) -> AppResult<Rocket<Build>> {
	if settings.admin_password.is_empty() {
		tracing::warn!("ADMIN_PASSWORD is not set; admin login will reject every attempt");
	}
	let sweeper = settings.sweep_interval.map(|every| {
		let limiters = limiters.clone();
		AdHoc::on_liftoff("Rate limit sweeper", move |_| {
			let limiters = limiters.clone();
			Box::pin(async move {
				tracing::info!(every_secs = every.as_secs(), "starting rate limit sweeper");
				spawn_sweeper(limiters, every);
			})
		})
	});

	let mut rocket = rocket::build()
		.manage(db)
		.manage(limiters)
		.manage(settings)
		.attach(build_cors()?)
		.mount("/api/v1", mount_routes());
	if let Some(fairing) = sweeper {
		rocket = rocket.attach(fairing);
	}
	Ok(rocket)
}

fn build_cors() -> AppResult<rocket_cors::Cors> {
	let allowed_origins = AllowedOrigins::all();
	let allowed_methods: AllowedMethods = [
		rocket::http::Method::Get,
		rocket::http::Method::Post,
		rocket::http::Method::Options,
	]
	.into_iter()
	.map(From::from)
	.collect();

	CorsOptions {
		allowed_origins,
		allowed_methods,
		allowed_headers: AllowedHeaders::all(),
		allow_credentials: false,
		..Default::default()
	}
	.to_cors()
	.map_err(|e| AppError::Config(format!("cors: {e}")))
}
