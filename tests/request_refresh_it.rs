#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use attendance_client::{
	_preludet::*,
	auth::{TokenKey, TokenSecret},
	client::RequestBody,
	http_types::Method,
	store::{MemoryStore, TokenStore},
};

async fn seed(store: &MemoryStore, access: Option<&str>, refresh: Option<&str>) {
	for (key, value) in [(TokenKey::AccessToken, access), (TokenKey::RefreshToken, refresh)] {
		if let Some(value) = value {
			store
				.set(key, TokenSecret::new(value))
				.await
				.expect("Seeding the store should succeed.");
		}
	}
}

#[tokio::test]
async fn successful_calls_never_refresh() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url());

	seed(&store, Some("access-ok"), Some("refresh-ok")).await;

	let events = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/events/").header("authorization", "Bearer access-ok");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token/refresh/");
			then.status(200).body(r#"{"access":"unused"}"#);
		})
		.await;
	let value = client
		.request("/events/", Method::GET, RequestBody::Empty)
		.await
		.expect("Authorized call should succeed.");

	assert_eq!(value, Json::Array(Vec::new()));

	events.assert_async().await;
	refresh.assert_hits_async(0).await;

	assert_eq!(client.refresh_metrics.attempts(), 0);
}

#[tokio::test]
async fn expired_access_token_is_refreshed_and_call_retried_once() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url());

	seed(&store, Some("access-old"), Some("refresh-1")).await;

	let rejected = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/attendance/recent/")
				.header("authorization", "Bearer access-old");
			then.status(401).body(r#"{"detail":"Given token not valid for any token type"}"#);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/token/refresh/")
				.header("content-type", "application/json")
				.json_body(serde_json::json!({ "refresh": "refresh-1" }));
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access":"access-new"}"#);
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/attendance/recent/")
				.header("authorization", "Bearer access-new");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(serde_json::json!([
					{ "attendee_name": "Ana López", "event_title": "Foro", "timestamp": "09:58" },
				]));
		})
		.await;
	let recent = client.recent_attendances().await.expect("Retried call should succeed.");

	rejected.assert_hits_async(1).await;
	refresh.assert_hits_async(1).await;
	accepted.assert_hits_async(1).await;

	assert_eq!(recent.len(), 1);
	assert_eq!(recent[0].attendee_name, "Ana López");
	assert_eq!(store.peek(TokenKey::AccessToken), Some(TokenSecret::new("access-new")));
	assert_eq!(store.peek(TokenKey::RefreshToken), Some(TokenSecret::new("refresh-1")));
	assert_eq!((client.refresh_metrics.attempts(), client.refresh_metrics.successes()), (1, 1));
}

#[tokio::test]
async fn unauthenticated_401_is_terminal() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url());

	seed(&store, None, Some("refresh-orphan")).await;

	let events = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/events/");
			then.status(401).body(r#"{"error":"Credenciales no proporcionadas"}"#);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token/refresh/");
			then.status(200).body(r#"{"access":"unused"}"#);
		})
		.await;
	let err = client.events().await.expect_err("A 401 without a token should fail.");

	events.assert_hits_async(1).await;
	refresh.assert_hits_async(0).await;

	assert!(matches!(err, Error::Server { status: 401, .. }));
	assert_eq!(err.user_message("Error de conexión"), "Credenciales no proporcionadas");
	assert_eq!(store.peek(TokenKey::RefreshToken), Some(TokenSecret::new("refresh-orphan")));
}

#[tokio::test]
async fn retry_rejection_does_not_refresh_again() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url());

	seed(&store, Some("access-old"), Some("refresh-1")).await;

	let events = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/events/");
			then.status(401).body("{}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token/refresh/");
			then.status(200).body(r#"{"access":"access-still-bad"}"#);
		})
		.await;
	let err = client.events().await.expect_err("A rejected retry should fail.");

	events.assert_hits_async(2).await;
	refresh.assert_hits_async(1).await;

	assert!(matches!(err, Error::Server { status: 401, .. }));
	assert!(!err.requires_reauthentication());
	assert_eq!(store.peek(TokenKey::AccessToken), Some(TokenSecret::new("access-still-bad")));
}

#[tokio::test]
async fn rejected_refresh_clears_tokens_and_expires_session() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url());

	seed(&store, Some("access-old"), Some("refresh-revoked")).await;

	let events = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/events/");
			then.status(401).body("{}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token/refresh/");
			then.status(401).body(r#"{"detail":"Token is blacklisted"}"#);
		})
		.await;
	let err = client.events().await.expect_err("A rejected refresh should fail.");

	events.assert_hits_async(1).await;
	refresh.assert_hits_async(1).await;

	assert!(matches!(err, Error::AuthExpired));
	assert!(err.requires_reauthentication());
	assert!(store.is_empty());
	assert_eq!(client.refresh_metrics.forced_logouts(), 1);
	assert!(!client.is_authenticated().await.expect("Store lookup should succeed."));
}

#[tokio::test]
async fn missing_refresh_token_clears_access_token() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url());

	seed(&store, Some("access-old"), None).await;

	let events = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/events/");
			then.status(401).body("{}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token/refresh/");
			then.status(200).body(r#"{"access":"unused"}"#);
		})
		.await;
	let err = client.events().await.expect_err("A 401 without a refresh token should fail.");

	events.assert_hits_async(1).await;
	refresh.assert_hits_async(0).await;

	assert!(matches!(err, Error::NoRefreshToken));
	assert!(store.is_empty());
}

#[tokio::test]
async fn server_errors_carry_status_and_payload() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url());

	seed(&store, Some("access-ok"), Some("refresh-ok")).await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/attendance/");
			then.status(400).body(
				r#"{"error":"El estudiante ya tiene asistencia registrada para este evento"}"#,
			);
		})
		.await;

	let err = client
		.register_attendance(3, "12345678")
		.await
		.expect_err("Duplicate attendance should be rejected.");

	assert_eq!(err.status(), Some(400));
	assert_eq!(
		err.user_message("Error de conexión"),
		"El estudiante ya tiene asistencia registrada para este evento"
	);
	assert_eq!(store.peek(TokenKey::AccessToken), Some(TokenSecret::new("access-ok")));
}
