//! Client identifier used to key the rate limiters.
//!
//! The forwarding headers are taken at face value. Deployments must sit behind a
//! reverse proxy that overwrites `X-Forwarded-For` / `X-Real-IP`; otherwise a client
//! can pick its own bucket.

use rocket::request::{FromRequest, Outcome, Request};
use std::convert::Infallible;

pub const FORWARDED_FOR: &str = "X-Forwarded-For";
pub const REAL_IP: &str = "X-Real-IP";
pub const UNKNOWN_CLIENT: &str = "unknown";

/// forwarded-for (first hop) -> real-ip -> "unknown"
pub fn client_identifier(forwarded_for: Option<&str>, real_ip: Option<&str>) -> String {
	let first_hop = forwarded_for
		.and_then(|v| v.split(',').next())
		.map(str::trim)
		.filter(|v| !v.is_empty());
	if let Some(ip) = first_hop {
		return ip.to_string();
	}
	real_ip
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.unwrap_or(UNKNOWN_CLIENT)
		.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl ClientId {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientId {
	type Error = Infallible;
	async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
		let headers = req.headers();
		Outcome::Success(ClientId(client_identifier(
			headers.get_one(FORWARDED_FOR),
			headers.get_one(REAL_IP),
		)))
	}
}
