use std::path::Path;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use r2d2_sqlite::rusqlite::params;

use crate::errors::{AppError, AppResult};
use crate::models::{new_id, now_iso, ContactMessage, QuizSubmission, Subscriber};

#[derive(Clone)]
pub struct DbState {
	pool: Pool<SqliteConnectionManager>,
}

impl DbState {
	pub fn initialize(path: &Path) -> AppResult<Self> {
		let manager = SqliteConnectionManager::file(path).with_init(|c| {
			c.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;")
		});
		let pool = Pool::builder().max_size(8).build(manager).map_err(|e| AppError::Anyhow(e.into()))?;
		let state = Self { pool };
		state.migrate()?;
		Ok(state)
	}

	fn conn(&self) -> AppResult<PooledConnection<SqliteConnectionManager>> {
		self.pool.get().map_err(|e| AppError::Anyhow(e.into()))
	}

	fn migrate(&self) -> AppResult<()> {
		let conn = self.conn()?;
		conn.execute_batch(
			"CREATE TABLE IF NOT EXISTS contact_messages (
				id TEXT PRIMARY KEY,
				name TEXT NOT NULL,
				email TEXT NOT NULL,
				message TEXT NOT NULL,
				client TEXT NOT NULL,
				created_at TEXT NOT NULL
			);
			CREATE TABLE IF NOT EXISTS subscribers (
				email TEXT PRIMARY KEY,
				subscribed_at TEXT NOT NULL
			);
			CREATE TABLE IF NOT EXISTS quiz_submissions (
				id TEXT PRIMARY KEY,
				email TEXT,
				answers TEXT NOT NULL, -- JSON object
				created_at TEXT NOT NULL
			);",
		)?;
		Ok(())
	}

	pub fn insert_contact_message(&self, name: &str, email: &str, message: &str, client: &str) -> AppResult<ContactMessage> {
		let msg = ContactMessage {
			id: new_id(),
			name: name.to_string(),
			email: email.to_string(),
			message: message.to_string(),
			client: client.to_string(),
			created_at: now_iso(),
		};
		let conn = self.conn()?;
		conn.execute(
			"INSERT INTO contact_messages (id, name, email, message, client, created_at) VALUES (?, ?, ?, ?, ?, ?)",
			params![msg.id, msg.name, msg.email, msg.message, msg.client, msg.created_at],
		)?;
		Ok(msg)
	}

	pub fn list_contact_messages(&self, limit: usize) -> AppResult<Vec<ContactMessage>> {
		let conn = self.conn()?;
		let mut stmt = conn.prepare(
			"SELECT id, name, email, message, client, created_at FROM contact_messages ORDER BY rowid DESC LIMIT ?",
		)?;
		let rows = stmt.query_map(params![limit as i64], |r| {
			Ok(ContactMessage {
				id: r.get(0)?,
				name: r.get(1)?,
				email: r.get(2)?,
				message: r.get(3)?,
				client: r.get(4)?,
				created_at: r.get(5)?,
			})
		})?;
		Ok(rows.filter_map(Result::ok).collect())
	}

	/// Re-subscribing keeps the original timestamp.
	pub fn upsert_subscriber(&self, email: &str) -> AppResult<Subscriber> {
		let conn = self.conn()?;
		conn.execute(
			"INSERT INTO subscribers (email, subscribed_at) VALUES (?, ?) ON CONFLICT(email) DO NOTHING",
			params![email, now_iso()],
		)?;
		let sub = conn.query_row(
			"SELECT email, subscribed_at FROM subscribers WHERE email = ?",
			params![email],
			|r| Ok(Subscriber { email: r.get(0)?, subscribed_at: r.get(1)? }),
		)?;
		Ok(sub)
	}

	pub fn insert_quiz_submission(
		&self,
		email: Option<&str>,
		answers: &serde_json::Map<String, serde_json::Value>,
	) -> AppResult<QuizSubmission> {
		let submission = QuizSubmission {
			id: new_id(),
			email: email.map(str::to_string),
			answers: answers.clone(),
			created_at: now_iso(),
		};
		let conn = self.conn()?;
		conn.execute(
			"INSERT INTO quiz_submissions (id, email, answers, created_at) VALUES (?, ?, ?, ?)",
			params![
				submission.id,
				submission.email,
				serde_json::to_string(&submission.answers)?,
				submission.created_at
			],
		)?;
		Ok(submission)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn temp_db() -> (DbState, std::path::PathBuf) {
		let path = std::env::temp_dir().join(format!("storefront-db-{}.sqlite", new_id()));
		(DbState::initialize(&path).unwrap(), path)
	}

	#[test]
	fn contact_messages_round_trip_newest_first() {
		let (db, path) = temp_db();
		db.insert_contact_message("Ana", "ana@example.com", "first", "1.1.1.1").unwrap();
		db.insert_contact_message("Bo", "bo@example.com", "second", "unknown").unwrap();
		let msgs = db.list_contact_messages(10).unwrap();
		assert_eq!(msgs.len(), 2);
		assert_eq!(msgs[0].message, "second");
		assert_eq!(db.list_contact_messages(1).unwrap().len(), 1);
		let _ = std::fs::remove_file(path);
	}

	#[test]
	fn resubscribe_is_idempotent() {
		let (db, path) = temp_db();
		let first = db.upsert_subscriber("jo@example.com").unwrap();
		let again = db.upsert_subscriber("jo@example.com").unwrap();
		assert_eq!(first.subscribed_at, again.subscribed_at);
		let _ = std::fs::remove_file(path);
	}
}
