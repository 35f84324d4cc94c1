//! Lists the events open for attendance registration right now, against a mock API whose
//! schedule is generated around the local clock.
//!
//! The UTC offset is detected in a synchronous `main` while the process is still
//! single-threaded; the Tokio runtime is built afterwards.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use time::{Duration, macros::format_description};
use tokio::runtime::Runtime;
use url::Url;
// self
use attendance_client::{
	_preludet::test_reqwest_http_client,
	auth::{TokenKey, TokenSecret},
	client::ApiClient,
	config::ClientConfig,
	store::MemoryStore,
	window::{Clock, LocalClock},
};

fn main() -> Result<()> {
	// Must run before any other thread exists.
	let clock = LocalClock::detect()?;

	color_eyre::install()?;

	Runtime::new()?.block_on(run(clock))
}

async fn run(clock: LocalClock) -> Result<()> {
	let now = clock.now();
	let time_format = format_description!("[hour]:[minute]:[second]");
	let slot = |minutes: i64| (now + Duration::minutes(minutes)).time().format(time_format);
	let events = serde_json::json!({
		"count": 3,
		"results": [
			{
				"id": 1,
				"title": "Foro de Finanzas Públicas",
				"date": now.date().to_string(),
				"start_time": slot(5)?,
				"end_time": slot(65)?,
				"location": "Auditorio 1",
			},
			{
				"id": 2,
				"title": "Taller de Auditoría",
				"date": now.date().to_string(),
				"start_time": slot(-40)?,
				"end_time": slot(20)?,
				"location": "Aula 12",
			},
			{
				"id": 3,
				"title": "Conferencia de Contabilidad",
				"date": now.date().to_string(),
				"start_time": slot(-20)?,
				"end_time": slot(40)?,
				"location": "Auditorio 2",
			},
		],
	});
	let server = MockServer::start_async().await;
	let config_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/auth/system-config/");
			then.status(200).json_body(serde_json::json!({ "minutes_before_event": 10 }));
		})
		.await;
	let events_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/events/").header("authorization", "Bearer demo-access");
			then.status(200).json_body(events);
		})
		.await;
	let store = MemoryStore::with_tokens([
		(TokenKey::AccessToken, TokenSecret::new("demo-access")),
		(TokenKey::RefreshToken, TokenSecret::new("demo-refresh")),
	]);
	let config = ClientConfig::builder(Url::parse(&server.base_url())?).build()?;
	let client = ApiClient::with_http_client(Arc::new(store), config, test_reqwest_http_client());
	let active = client.active_events(&clock).await?;

	println!("Local time: {now} (UTC{}).", clock.offset());

	for event in &active {
		println!("Open for registration: #{} {} at {}.", event.id, event.title, event.start_time);
	}

	config_mock.assert_async().await;
	events_mock.assert_async().await;

	Ok(())
}
