//! Demonstrates logging in, then riding through an access-token expiry: the dashboard call hits
//! a 401, the client refreshes once, and the call is replayed with the new token.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use bearer_broker::{
	client::AuthenticatedClient,
	config::ClientConfig,
	flows::{LoginCredentials, LoginOutcome},
	store::{KeyValueStore, MemoryStore},
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/sessions/initiate");
			then.status(200).json_body(
				json!({ "status": "completed", "accessToken": "demo-a1", "refreshToken": "demo-r1" }),
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/sessions/me");
			then.status(200).json_body(json!({ "id": 1, "email": "demo@example.com" }));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/dashboard/acme").header("authorization", "Bearer demo-a1");
			then.status(401).json_body(json!({ "message": "Token expired" }));
		})
		.await;

	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/sessions/refresh");
			then.status(200).json_body(json!({ "accessToken": "demo-a2" }));
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/dashboard/acme").header("authorization", "Bearer demo-a2");
			then.status(200).json_body(json!({ "routers": 12, "offline": 1 }));
		})
		.await;

	let config = ClientConfig::builder(Url::parse(&server.base_url())?).build()?;
	let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::default());
	let client = AuthenticatedClient::with_reqwest(config, store);

	if let LoginOutcome::Completed { user, .. } =
		client.login(&LoginCredentials::new("demo@example.com", "demo-password")).await?
	{
		println!("Signed in as {}.", user.email);
	}

	let dashboard = client.dashboard("acme").await?;

	println!("Dashboard after transparent refresh: {dashboard}.");

	refresh_mock.assert_async().await;

	Ok(())
}
