use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{FromRequest, Outcome as RequestOutcome, Request};

use crate::config::Settings;
use crate::errors::{AppError, AppResult};
use crate::models::Claims;

const TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
	Admin,
	Reader,
}

#[derive(Debug)]
pub struct AuthUser {
	pub subject: String,
	pub role: Role,
}

pub fn issue_admin_token(subject: &str, secret: &str) -> AppResult<String> {
	let exp = (time::OffsetDateTime::now_utc().unix_timestamp() + TOKEN_TTL_SECS) as usize;
	let claims = Claims { sub: subject.to_string(), role: "admin".into(), exp };
	Ok(encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))?)
}

fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
	let mut validation = Validation::new(Algorithm::HS256);
	validation.validate_exp = true;
	let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
	Ok(data.claims)
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
	type Error = AppError;
	async fn from_request(req: &'r Request<'_>) -> RequestOutcome<Self, Self::Error> {
		let Some(settings) = req.rocket().state::<Settings>() else {
			return Outcome::Error((Status::InternalServerError, AppError::Config("settings not managed".into())));
		};
		let auth = req.headers().get_one("Authorization");
		if let Some(bearer) = auth.and_then(|h| h.strip_prefix("Bearer ")) {
			return match decode_token(bearer, &settings.jwt_secret) {
				Ok(claims) => {
					let role = match claims.role.as_str() {
						"admin" | "Admin" => Role::Admin,
						_ => Role::Reader,
					};
					Outcome::Success(AuthUser { subject: claims.sub, role })
				}
				Err(_) => Outcome::Error((Status::Unauthorized, AppError::Unauthorized)),
			};
		}
		Outcome::Success(AuthUser { subject: "public".into(), role: Role::Reader })
	}
}

impl AuthUser {
	pub fn require_admin(&self) -> AppResult<()> {
		if self.role != Role::Admin {
			return Err(AppError::Forbidden);
		}
		Ok(())
	}
}

/// Byte comparison that does not stop at the first mismatch.
pub fn password_matches(provided: &str, expected: &str) -> bool {
	if expected.is_empty() || provided.len() != expected.len() {
		return false;
	}
	provided
		.bytes()
		.zip(expected.bytes())
		.fold(0u8, |acc, (a, b)| acc | (a ^ b))
		== 0
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn token_round_trips() {
		let token = issue_admin_token("ops", "s3cret").unwrap();
		let claims = decode_token(&token, "s3cret").unwrap();
		assert_eq!(claims.sub, "ops");
		assert_eq!(claims.role, "admin");
		assert!(decode_token(&token, "other").is_err());
	}

	#[test]
	fn empty_expected_password_never_matches() {
		assert!(!password_matches("", ""));
		assert!(!password_matches("anything", ""));
		assert!(password_matches("hunter2", "hunter2"));
		assert!(!password_matches("hunter3", "hunter2"));
		assert!(!password_matches("hunter", "hunter2"));
	}
}
