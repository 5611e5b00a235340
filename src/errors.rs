use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{Responder, Response};
use rocket::serde::json::json;
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
	#[error("not found")]
	NotFound,
	#[error("unauthorized")]
	Unauthorized,
	#[error("forbidden")]
	Forbidden,
	/// Limiter denial. Retryable, never a validation or server failure.
	#[error("{0}")]
	TooManyRequests(&'static str),
	#[error("bad request: {0}")]
	BadRequest(String),
	#[error("invalid configuration: {0}")]
	Config(String),
	#[error(transparent)]
	Sqlite(#[from] r2d2_sqlite::rusqlite::Error),
	#[error(transparent)]
	Jwt(#[from] jsonwebtoken::errors::Error),
	#[error(transparent)]
	Json(#[from] serde_json::Error),
	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl AppError {
	pub fn status(&self) -> Status {
		match self {
			AppError::NotFound => Status::NotFound,
			AppError::Unauthorized => Status::Unauthorized,
			AppError::Forbidden => Status::Forbidden,
			AppError::TooManyRequests(_) => Status::TooManyRequests,
			AppError::BadRequest(_) => Status::BadRequest,
			AppError::Config(_) => Status::InternalServerError,
			AppError::Sqlite(_) => Status::InternalServerError,
			AppError::Jwt(_) => Status::Unauthorized,
			AppError::Json(_) => Status::BadRequest,
			AppError::Anyhow(_) => Status::InternalServerError,
		}
	}
}

impl<'r> Responder<'r, 'static> for AppError {
	fn respond_to(self, _req: &'r Request<'_>) -> Result<Response<'static>, Status> {
		let status = self.status();
		if status.code >= 500 {
			tracing::error!(error = %self, "request failed");
		}
		let body = json!({
			"error": self.to_string(),
			"code": status.code,
		});
		Response::build()
			.status(status)
			.sized_body(None, Cursor::new(body.to_string()))
			.header(rocket::http::ContentType::JSON)
			.ok()
	}
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn denial_is_its_own_status() {
		let err = AppError::TooManyRequests("slow down");
		assert_eq!(err.status(), Status::TooManyRequests);
		assert_eq!(err.to_string(), "slow down");
		assert_ne!(AppError::BadRequest("x".into()).status(), Status::TooManyRequests);
	}
}
