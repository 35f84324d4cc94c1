//! Logs an assistant in with a file-backed token store, survives one expired access token while
//! registering an attendance, and prints the recent-attendance feed.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use attendance_client::{
	_preludet::test_reqwest_http_client,
	client::ApiClient,
	config::ClientConfig,
	store::{FileStore, TokenStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/login/");
			then.status(200).json_body(serde_json::json!({
				"user": {
					"id": 12,
					"username": "1234567",
					"profile": {
						"account_number": "1234567",
						"user_type": "assistant",
						"full_name": "Marta Ruiz",
					},
				},
				"tokens": { "access": "stale-access", "refresh": "demo-refresh" },
			}));
		})
		.await;
	let stale_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/attendance/")
				.header("authorization", "Bearer stale-access");
			then.status(401).json_body(serde_json::json!({ "detail": "Token expired" }));
		})
		.await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token/refresh/");
			then.status(200).json_body(serde_json::json!({ "access": "fresh-access" }));
		})
		.await;
	let register_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/attendance/")
				.header("authorization", "Bearer fresh-access");
			then.status(201).json_body(serde_json::json!({
				"message": "Asistencia registrada para Ana López",
				"attendance_id": 88,
				"event": "Foro de Finanzas Públicas",
				"registered_by": "Marta Ruiz",
				"attendee_type": "student",
			}));
		})
		.await;
	let recent_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/attendance/recent/");
			then.status(200).json_body(serde_json::json!([
				{
					"attendee_name": "Ana López",
					"event_title": "Foro de Finanzas Públicas",
					"timestamp": "09:58",
				},
			]));
		})
		.await;
	let path = std::env::temp_dir().join("attendance-client-demo").join("tokens.json");
	let store: Arc<dyn TokenStore> = Arc::new(FileStore::open(&path)?);
	let config = ClientConfig::builder(Url::parse(&server.base_url())?).build()?;
	let client = ApiClient::with_http_client(store, config, test_reqwest_http_client());
	let user = client.login("1234567").await?;

	println!("Signed in as {} ({}).", user.username, path.display());

	let receipt = client.register_attendance(1, "31415926").await?;

	println!("{}", receipt.message);

	for row in client.recent_attendances().await? {
		println!("{} {} {}", row.timestamp, row.attendee_name, row.event_title);
	}

	println!("Refreshes: {}.", client.refresh_metrics.successes());

	client.logout().await?;

	login_mock.assert_async().await;
	stale_mock.assert_async().await;
	refresh_mock.assert_async().await;
	register_mock.assert_async().await;
	recent_mock.assert_async().await;

	Ok(())
}
