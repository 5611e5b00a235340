use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "storefront_smoke")]
#[command(about = "Smoke test for a running storefront guard deployment", long_about = None)]
struct Opts {
	#[arg(long, default_value = "http://127.0.0.1:8000")]
	base: String,
	/// Forwarded-for value to use, so repeated runs land in a fresh bucket
	#[arg(long, default_value = "203.0.113.250")]
	client: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let opts = Opts::parse();
	let base = opts.base.trim_end_matches('/');
	let client = reqwest::Client::new();

	println!("[1/3] GET /health");
	let r = client.get(format!("{}/api/v1/health", base)).send().await?;
	println!("  status: {}", r.status());
	anyhow::ensure!(r.status().is_success(), "health failed");

	println!("[2/3] POST /admin/login with a wrong password");
	let r = client
		.post(format!("{}/api/v1/admin/login", base))
		.header("X-Forwarded-For", &opts.client)
		.json(&serde_json::json!({"user": "smoke", "password": "definitely-wrong"}))
		.send()
		.await?;
	println!("  status: {}", r.status());
	// 429 is fine if the bucket is already full from an earlier run
	anyhow::ensure!(
		r.status() == reqwest::StatusCode::UNAUTHORIZED || r.status() == reqwest::StatusCode::TOO_MANY_REQUESTS,
		"login unexpected status"
	);

	println!("[3/3] GET /admin/contact-messages without a token");
	let r = client.get(format!("{}/api/v1/admin/contact-messages", base)).send().await?;
	println!("  status: {}", r.status());
	anyhow::ensure!(r.status() == reqwest::StatusCode::FORBIDDEN, "admin listing should be forbidden");

	println!("OK");
	Ok(())
}
