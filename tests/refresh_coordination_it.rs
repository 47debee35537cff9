mod common;

// std
use std::sync::Arc;
// crates.io
use serde_json::Value;
// self
use bearer_broker::{
	client::{RefreshCoordinator, RequestDescriptor},
	error::{ConfigError, Error},
	store::{
		KeyValueStore, MemoryStore,
		tokens::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY},
	},
};
use common::*;

#[tokio::test]
async fn concurrent_unauthorized_calls_share_one_refresh() {
	let api = Arc::new(expiring_api());
	let (client, store) = client(api.clone());

	seed(&client, "old", "r1").await;

	let (a, b, c) = tokio::join!(
		client.get::<Value>(ME_PATH),
		client.get::<Value>(ME_PATH),
		client.get::<Value>(ME_PATH),
	);

	for result in [a, b, c] {
		let payload = result.expect("Every caller should succeed after the shared refresh.");

		assert_eq!(payload["email"], "ops@example.com");
	}

	assert_eq!(api.calls_to(REFRESH_PATH), 1);
	assert_eq!(api.calls_to(ME_PATH), 6);
	assert_eq!(
		store.get(ACCESS_TOKEN_KEY).await.expect("Memory store reads should not fail."),
		Some("new123".into())
	);
	assert_eq!(
		store.get(REFRESH_TOKEN_KEY).await.expect("Memory store reads should not fail."),
		Some("r1".into())
	);

	let replayed = api
		.requests_to(ME_PATH)
		.iter()
		.filter(|r| bearer(r) == Some("Bearer new123"))
		.count();

	assert_eq!(replayed, 3);
	assert!(!client.coordinator().is_refreshing());
	assert_eq!(client.coordinator().pending(), 0);
	assert_eq!(client.coordinator().generation(), 1);
	assert_eq!(client.coordinator().metrics().attempts(), 1);
	assert_eq!(client.coordinator().metrics().coalesced(), 2);
}

#[tokio::test]
async fn refresh_request_carries_refresh_token_without_bearer() {
	let api = Arc::new(expiring_api());
	let (client, _) = client(api.clone());

	seed(&client, "old", "r1").await;
	client.get::<Value>(ME_PATH).await.expect("Call should succeed after refresh.");

	let refresh = api.requests_to(REFRESH_PATH).pop().expect("Refresh should have been sent.");
	let body: Value = serde_json::from_slice(refresh.body.as_deref().unwrap_or_default())
		.expect("Refresh body should be JSON.");

	assert_eq!(body, serde_json::json!({ "refreshToken": "r1" }));
	assert_eq!(bearer(&refresh), None);
}

#[tokio::test]
async fn valid_token_makes_exactly_one_call() {
	let api = Arc::new(expiring_api());
	let (client, _) = client(api.clone());

	seed(&client, "new123", "r1").await;
	client.get::<Value>(ME_PATH).await.expect("Valid token should be accepted.");

	assert_eq!(api.requests().len(), 1);
	assert_eq!(client.coordinator().metrics().attempts(), 0);
}

#[tokio::test]
async fn non_unauthorized_failures_skip_refresh() {
	let api = Arc::new(ScriptedApi::new(|_| {
		json(500, serde_json::json!({ "message": "db down" })).with_status_text("Internal Server Error")
	}));
	let (client, _) = client(api.clone());

	seed(&client, "old", "r1").await;

	let err = client.dashboard("7").await.expect_err("500 should surface to the caller.");

	assert!(matches!(&err, Error::Api { status: 500, .. }));
	assert_eq!(err.failure().message, "db down");
	assert_eq!(api.calls_to(REFRESH_PATH), 0);
	assert_eq!(api.calls_to("/dashboard/7"), 1);
}

#[tokio::test]
async fn missing_refresh_token_expires_session_without_exchange() {
	let api = Arc::new(expiring_api());
	let (client, store) = client(api.clone());

	client.tokens().save_access_token(&"old".into()).await;

	let err = client.get::<Value>(ME_PATH).await.expect_err("Session should be expired.");

	assert!(err.is_session_expired());
	assert_eq!(err.status(), 401);
	assert_eq!(api.calls_to(REFRESH_PATH), 0);
	assert!(store.is_empty());
}

#[tokio::test]
async fn rejected_refresh_clears_tokens_for_every_waiter() {
	let api = Arc::new(
		ScriptedApi::new(|request| match request.url.path() {
			REFRESH_PATH => json(401, serde_json::json!({ "message": "Refresh token revoked" })),
			_ => unauthorized(),
		})
		.with_latency(REFRESH_PATH, std::time::Duration::from_millis(50)),
	);
	let (client, store) = client(api.clone());

	seed(&client, "old", "r1").await;

	let (a, b) = tokio::join!(client.get::<Value>(ME_PATH), client.get::<Value>(ME_PATH));

	for result in [a, b] {
		let err = result.expect_err("Every caller should observe the expired session.");

		assert!(err.is_session_expired());
		assert!(err.message().contains("Refresh token revoked"));
	}

	assert_eq!(api.calls_to(REFRESH_PATH), 1);
	assert_eq!(api.calls_to(ME_PATH), 2);
	assert!(store.is_empty());
	assert!(!client.has_session().await);
	assert_eq!(client.coordinator().metrics().failures(), 1);
}

#[tokio::test]
async fn malformed_refresh_response_expires_session() {
	let api = Arc::new(ScriptedApi::new(|request| match request.url.path() {
		REFRESH_PATH => json(200, serde_json::json!({ "token": "new123" })),
		_ => unauthorized(),
	}));
	let (client, store) = client(api.clone());

	seed(&client, "old", "r1").await;

	let err = client.get::<Value>(ME_PATH).await.expect_err("Session should be expired.");

	assert!(err.is_session_expired());
	assert!(err.message().contains("did not carry an access token"));
	assert!(store.is_empty());
}

#[tokio::test]
async fn unauthorized_replay_is_final() {
	let api = Arc::new(ScriptedApi::new(|request| match request.url.path() {
		REFRESH_PATH => json(200, serde_json::json!({ "accessToken": "new123" })),
		_ => unauthorized(),
	}));
	let (client, store) = client(api.clone());

	seed(&client, "old", "r1").await;

	let err = client.get::<Value>(ME_PATH).await.expect_err("Replay should fail again.");

	assert!(err.is_unauthorized());
	assert_eq!(api.calls_to(REFRESH_PATH), 1);
	assert_eq!(api.calls_to(ME_PATH), 2);
	assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn unauthorized_refresh_path_is_not_recovered() {
	let api = Arc::new(ScriptedApi::new(|_| unauthorized()));
	let (client, store) = client(api.clone());

	seed(&client, "old", "r1").await;

	let err = client
		.call(RequestDescriptor::post(REFRESH_PATH).with_body(serde_json::json!({})))
		.await
		.expect_err("401 from the refresh endpoint should surface as is.");

	assert!(err.is_unauthorized());
	assert_eq!(api.requests().len(), 1);
	assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn later_expiry_starts_a_new_episode() {
	let api = Arc::new(expiring_api());
	let (client, _) = client(api.clone());

	seed(&client, "old", "r1").await;
	client.get::<Value>(ME_PATH).await.expect("First call should refresh.");
	client.tokens().save_access_token(&"old".into()).await;
	client.get::<Value>(ME_PATH).await.expect("Second call should refresh again.");

	assert_eq!(api.calls_to(REFRESH_PATH), 2);
	assert_eq!(client.coordinator().generation(), 2);
}

#[tokio::test]
async fn separate_clients_refresh_independently_unless_shared() {
	let api = Arc::new(expiring_api());
	let store = MemoryStore::default();
	let first = client_with_store(api.clone(), store.clone());
	let second = client_with_store(api.clone(), store.clone());

	seed(&first, "old", "r1").await;

	let (a, b) = tokio::join!(first.get::<Value>(ME_PATH), second.get::<Value>(ME_PATH));

	a.expect("First client should recover.");
	b.expect("Second client should recover.");
	assert_eq!(api.calls_to(REFRESH_PATH), 2);

	let shared = Arc::new(RefreshCoordinator::new());
	let first = client_with_store(api.clone(), store.clone()).with_coordinator(shared.clone());
	let second = client_with_store(api.clone(), store.clone()).with_coordinator(shared.clone());

	seed(&first, "old", "r1").await;

	let (a, b) = tokio::join!(first.get::<Value>(ME_PATH), second.get::<Value>(ME_PATH));

	a.expect("First client should recover.");
	b.expect("Second client should recover.");
	assert_eq!(api.calls_to(REFRESH_PATH), 3);
	assert_eq!(shared.metrics().attempts(), 1);
}

#[tokio::test]
async fn caller_authorization_header_is_replaced() {
	let api = Arc::new(ScriptedApi::new(|_| json(200, serde_json::json!({ "ok": true }))));
	let (client, _) = client(api.clone());

	client
		.call(RequestDescriptor::get("/status").with_header("Authorization", "Bearer forged"))
		.await
		.expect("Anonymous call should succeed.");
	seed(&client, "a1", "r1").await;
	client
		.call(RequestDescriptor::get("/status").with_header("Authorization", "Bearer forged"))
		.await
		.expect("Authenticated call should succeed.");

	let sent = api.requests();

	assert_eq!(bearer(&sent[0]), None);
	assert_eq!(bearer(&sent[1]), Some("Bearer a1"));
}

#[tokio::test]
async fn paths_leaving_the_api_origin_are_never_sent() {
	let api = Arc::new(ScriptedApi::new(|_| json(200, serde_json::json!({ "ok": true }))));
	let (client, _) = client(api.clone());

	seed(&client, "secret-access", "r1").await;

	for path in ["@evil.example/steal", ".evil.example/steal"] {
		let err = client
			.call(RequestDescriptor::get(path))
			.await
			.expect_err("Path changing the host should be refused.");

		assert!(matches!(err, Error::Config(ConfigError::ForeignPath { .. })), "{path}: {err:?}");
		assert_eq!(err.status(), 400);
	}

	assert!(api.requests().is_empty());
}
