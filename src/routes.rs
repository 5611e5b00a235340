use std::sync::Arc;

use rocket::http::Status;
use rocket::serde::json::{self, Json};
use rocket::{Route, State};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{issue_admin_token, password_matches, AuthUser};
use crate::client_id::ClientId;
use crate::config::Settings;
use crate::db::DbState;
use crate::errors::{AppError, AppResult};
use crate::limits::Limiters;
use crate::models::{looks_like_email, now_iso, ContactMessage, QuizSubmission, Subscriber};
use crate::rate_limit::RateLimiter;

const LOGIN_LIMITED: &str = "Too many login attempts. Please try again later.";
const CONTACT_LIMITED: &str = "Too many messages sent. Please try again later.";
const NEWSLETTER_LIMITED: &str = "Too many signup attempts. Please try again later.";
const QUIZ_LIMITED: &str = "Too many quiz submissions. Please try again in a few minutes.";

const MAX_MESSAGE_LEN: usize = 5_000;
const MAX_QUIZ_ANSWERS: usize = 50;

/// Deny if the caller is over the limit, otherwise count this attempt.
fn admit(limiter: &RateLimiter, client: &ClientId, site: &'static str, message: &'static str) -> AppResult<()> {
	if limiter.is_limited(client.as_str()) {
		tracing::warn!(site, client = client.as_str(), "rate limit exceeded");
		return Err(AppError::TooManyRequests(message));
	}
	limiter.record_attempt(client.as_str());
	Ok(())
}

/// Parse failures surface only after `admit`, so malformed bodies are still counted.
fn payload<'r, T>(body: Result<Json<T>, json::Error<'r>>) -> AppResult<T> {
	body.map(Json::into_inner).map_err(|e| AppError::BadRequest(format!("malformed body: {e}")))
}

fn required(field: &str, value: &str) -> AppResult<String> {
	let value = value.trim();
	if value.is_empty() {
		return Err(AppError::BadRequest(format!("{field} is required")));
	}
	Ok(value.to_string())
}

fn email_field(value: &str) -> AppResult<String> {
	let email = required("email", value)?;
	if !looks_like_email(&email) {
		return Err(AppError::BadRequest("email is invalid".into()));
	}
	Ok(email.to_lowercase())
}

#[get("/health")]
pub fn health() -> Json<serde_json::Value> {
	Json(json!({"status": "ok", "ts": now_iso()}))
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
	#[serde(default)]
	user: Option<String>,
	#[serde(default)]
	password: String,
}

#[post("/admin/login", data = "<body>")]
pub fn admin_login(
	client: ClientId,
	limiters: &State<Arc<Limiters>>,
	settings: &State<Settings>,
	body: Result<Json<LoginBody>, json::Error<'_>>,
) -> AppResult<Json<serde_json::Value>> {
	let limiter = &limiters.admin_login;
	admit(limiter, &client, "admin_login", LOGIN_LIMITED)?;
	let body = payload(body)?;
	if !password_matches(&body.password, &settings.admin_password) {
		tracing::info!(client = client.as_str(), "admin login rejected");
		return Err(AppError::Unauthorized);
	}
	limiter.clear_attempts(client.as_str());
	let sub = body.user.as_deref().map(str::trim).filter(|u| !u.is_empty()).unwrap_or("ops");
	let token = issue_admin_token(sub, &settings.jwt_secret)?;
	tracing::info!(client = client.as_str(), user = sub, "admin login accepted");
	Ok(Json(json!({"token": token})))
}

#[derive(Debug, Deserialize)]
pub struct ContactBody {
	#[serde(default)]
	name: String,
	#[serde(default)]
	email: String,
	#[serde(default)]
	message: String,
}

#[post("/contact", data = "<body>")]
pub fn submit_contact(
	client: ClientId,
	limiters: &State<Arc<Limiters>>,
	db: &State<DbState>,
	body: Result<Json<ContactBody>, json::Error<'_>>,
) -> AppResult<(Status, Json<ContactMessage>)> {
	admit(&limiters.contact, &client, "contact", CONTACT_LIMITED)?;
	let body = payload(body)?;
	let name = required("name", &body.name)?;
	let email = email_field(&body.email)?;
	let message = required("message", &body.message)?;
	if message.chars().count() > MAX_MESSAGE_LEN {
		return Err(AppError::BadRequest(format!("message exceeds {MAX_MESSAGE_LEN} characters")));
	}
	let saved = db.insert_contact_message(&name, &email, &message, client.as_str())?;
	tracing::info!(id = %saved.id, "contact message stored");
	Ok((Status::Created, Json(saved)))
}

#[derive(Debug, Deserialize)]
pub struct NewsletterBody {
	#[serde(default)]
	email: String,
}

#[post("/newsletter", data = "<body>")]
pub fn newsletter_signup(
	client: ClientId,
	limiters: &State<Arc<Limiters>>,
	db: &State<DbState>,
	body: Result<Json<NewsletterBody>, json::Error<'_>>,
) -> AppResult<(Status, Json<Subscriber>)> {
	admit(&limiters.newsletter, &client, "newsletter", NEWSLETTER_LIMITED)?;
	let body = payload(body)?;
	let email = email_field(&body.email)?;
	let sub = db.upsert_subscriber(&email)?;
	Ok((Status::Created, Json(sub)))
}

#[derive(Debug, Deserialize)]
pub struct QuizBody {
	#[serde(default)]
	email: Option<String>,
	#[serde(default)]
	answers: serde_json::Map<String, serde_json::Value>,
}

#[post("/quiz", data = "<body>")]
pub fn submit_quiz(
	client: ClientId,
	limiters: &State<Arc<Limiters>>,
	db: &State<DbState>,
	body: Result<Json<QuizBody>, json::Error<'_>>,
) -> AppResult<(Status, Json<QuizSubmission>)> {
	admit(&limiters.quiz, &client, "quiz", QUIZ_LIMITED)?;
	let body = payload(body)?;
	if body.answers.is_empty() {
		return Err(AppError::BadRequest("answers are required".into()));
	}
	if body.answers.len() > MAX_QUIZ_ANSWERS {
		return Err(AppError::BadRequest(format!("at most {MAX_QUIZ_ANSWERS} answers allowed")));
	}
	let email = match body.email.as_deref().map(str::trim) {
		Some(e) if !e.is_empty() => Some(email_field(e)?),
		_ => None,
	};
	let saved = db.insert_quiz_submission(email.as_deref(), &body.answers)?;
	Ok((Status::Created, Json(saved)))
}

#[get("/admin/contact-messages?<limit>")]
pub fn list_contact_messages(
	user: AuthUser,
	db: &State<DbState>,
	limit: Option<usize>,
) -> AppResult<Json<Vec<ContactMessage>>> {
	user.require_admin()?;
	let limit = limit.unwrap_or(100).min(500);
	Ok(Json(db.list_contact_messages(limit)?))
}

pub fn mount_routes() -> Vec<Route> {
	routes![
		health,
		admin_login,
		submit_contact,
		newsletter_signup,
		submit_quiz,
		list_contact_messages,
	]
}
