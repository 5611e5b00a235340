use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub fn now_iso() -> String {
	OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_else(|_| "".into())
}

pub fn new_id() -> String {
	Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessage {
	pub id: String,
	pub name: String,
	pub email: String,
	pub message: String,
	pub client: String,
	pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
	pub email: String,
	pub subscribed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSubmission {
	pub id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	pub answers: serde_json::Map<String, serde_json::Value>,
	pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
	pub sub: String,
	pub role: String,
	pub exp: usize,
}

/// Loose shape check: one `@` with something on both sides and a dot in the domain.
pub fn looks_like_email(s: &str) -> bool {
	let s = s.trim();
	match s.split_once('@') {
		Some((local, domain)) => {
			!local.is_empty()
				&& !domain.contains('@')
				&& domain.contains('.')
				&& !domain.starts_with('.')
				&& !domain.ends_with('.')
				&& !s.chars().any(char::is_whitespace)
		}
		None => false,
	}
}

#[cfg(test)]
mod tests {
	use super::looks_like_email;

	#[test]
	fn email_shape() {
		assert!(looks_like_email("jo@example.com"));
		assert!(looks_like_email("  jo+tag@mail.example.co.uk "));
		assert!(!looks_like_email("jo@localhost"));
		assert!(!looks_like_email("@example.com"));
		assert!(!looks_like_email("jo@@example.com"));
		assert!(!looks_like_email("jo example@example.com"));
		assert!(!looks_like_email("jo@example."));
	}
}
