//! Demonstrates application-only (client credentials) access: the client obtains a token on
//! first use, then walks a subreddit Listing page by page against a local mock of Reddit.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde::Deserialize;
use url::Url;
// self
use reddit_http::{
	auth::ClientCredentials,
	client::RedditHttpClient,
	config::ClientConfig,
	http::ReqwestTransport,
	paginate::{ListingFetcher, Paginator},
};

#[derive(Debug, Deserialize)]
struct Submission {
	name: String,
	title: String,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/access_token");
			then.status(200).header("content-type", "application/json").body(
				r#"{"access_token":"demo-access","token_type":"bearer","expires_in":3600,"scope":"*"}"#,
			);
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/r/rust/new").query_param("after", "t3_2");
			then.status(200).header("content-type", "application/json").body(
				r#"{"kind":"Listing","data":{"after":null,"before":"t3_3","children":[{"kind":"t3","data":{"name":"t3_3","title":"Third"}}]}}"#,
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/r/rust/new");
			then.status(200).header("content-type", "application/json").body(
				r#"{"kind":"Listing","data":{"after":"t3_2","before":null,"children":[{"kind":"t3","data":{"name":"t3_1","title":"First"}},{"kind":"t3","data":{"name":"t3_2","title":"Second"}}]}}"#,
			);
		})
		.await;

	let config = ClientConfig::builder("demo:reddit-http-read-only:v0.1.0 (by /u/example)")
		.allow_insecure_endpoints(true)
		.base_url(Url::parse(&server.url("/"))?)
		.token_url(Url::parse(&server.url("/api/v1/access_token"))?)
		.build()?;
	let client = RedditHttpClient::builder(
		config,
		ClientCredentials::confidential("demo-client", "demo-secret"),
		Arc::new(ReqwestTransport::new()?),
	)
	.build()?;
	let mut listing =
		Paginator::<_, Submission>::new(ListingFetcher::new(&client, "/r/rust/new")).with_limit(2);

	while listing.next_available() {
		for item in listing.next_result().await? {
			println!("{} {}", item.data.name, item.data.title);
		}
	}

	println!("Fetched {} submissions; rate limit: {:?}", listing.count(), client.rate_limit());

	token_mock.assert_calls_async(1).await;

	Ok(())
}
