// std
use std::time::Duration;
// crates.io
use httpmock::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
// self
use timetree_app::{
	api::{
		ACCEPT_MEDIA_TYPE, ApiClient, ApiMethod, CallContext, CancelToken, Destination,
		ErrorEnvelope, RateLimit,
	},
	error::Error,
	http::ReqwestHttpClient,
	url::Url,
};

#[derive(Debug, Serialize)]
struct EventQuery {
	days: u8,
	timezone: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	include: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct NewEvent {
	title: &'static str,
	all_day: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EventEnvelope {
	data: Option<serde_json::Value>,
	#[serde(flatten)]
	error: Option<ErrorEnvelope>,
}

fn build_api(server: &MockServer) -> ApiClient<ReqwestHttpClient> {
	ApiClient::new()
		.expect("Default client should build.")
		.with_origin(Url::parse(&server.base_url()).expect("Mock server URL should parse."))
		.expect("Mock server origin should be accepted.")
}

#[tokio::test]
async fn get_sends_body_as_query_and_parses_rate_limit() {
	let server = MockServer::start_async().await;
	let api = build_api(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/calendars/abc/upcoming_events")
				.query_param("days", "3")
				.query_param("timezone", "Asia/Tokyo")
				.query_param_missing("include")
				.header("accept", ACCEPT_MEDIA_TYPE)
				.header("authorization", "Bearer installation-token");
			then.status(200)
				.header("content-type", "application/json")
				.header("X-RateLimit-Limit", "30")
				.header("X-RateLimit-Remaining", "29")
				.header("X-RateLimit-Reset", "1700000000")
				.body(r#"{"data":[]}"#);
		})
		.await;
	let query = EventQuery { days: 3, timezone: "Asia/Tokyo", include: None };
	let request = api
		.new_request(
			ApiMethod::Get,
			"/calendars/abc/upcoming_events",
			Some("installation-token"),
			Some(&query),
		)
		.expect("GET request should build.");
	let (envelope, response) = api
		.execute_json::<EventEnvelope>(&CallContext::background(), request)
		.await
		.expect("GET should succeed.");

	mock.assert_async().await;

	assert!(response.is_success());
	assert_eq!(envelope.data, Some(json!([])));
	assert!(envelope.error.is_none());
	assert_eq!(response.rate_limit(), RateLimit { limit: 30, remaining: 29, reset: 1_700_000_000 });
}

#[tokio::test]
async fn post_sends_body_as_json() {
	let server = MockServer::start_async().await;
	let api = build_api(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/calendars/abc/events")
				.header("content-type", "application/json")
				.json_body(json!({ "title": "Standup", "all_day": false }));
			then.status(201).header("content-type", "application/json").body(r#"{"data":{}}"#);
		})
		.await;
	let body = NewEvent { title: "Standup", all_day: false };
	let request = api
		.new_request(ApiMethod::Post, "/calendars/abc/events", Some("tok"), Some(&body))
		.expect("POST request should build.");
	let (envelope, response) = api
		.execute_json::<EventEnvelope>(&CallContext::background(), request)
		.await
		.expect("POST should succeed.");

	mock.assert_async().await;

	assert_eq!(response.status.as_u16(), 201);
	assert_eq!(envelope.data, Some(json!({})));
}

#[tokio::test]
async fn no_content_leaves_destination_untouched() {
	let server = MockServer::start_async().await;
	let api = build_api(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/calendars/abc/events/evt");
			then.status(204);
		})
		.await;
	let request = api
		.new_request::<()>(ApiMethod::Delete, "/calendars/abc/events/evt", Some("tok"), None)
		.expect("DELETE request should build.");
	let mut target = EventEnvelope { data: Some(json!("sentinel")), error: None };
	let response = api
		.execute(&CallContext::background(), request, Destination::Json(&mut target))
		.await
		.expect("Empty bodies must not fail decoding.");

	mock.assert_async().await;

	assert_eq!(response.status.as_u16(), 204);
	assert_eq!(target.data, Some(json!("sentinel")));
}

#[tokio::test]
async fn raw_destination_receives_verbatim_bytes() {
	let server = MockServer::start_async().await;
	let api = build_api(&server);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/export");
			then.status(200).header("content-type", "text/csv").body("id,title\n1,Standup\n");
		})
		.await;

	let request = api
		.new_request::<()>(ApiMethod::Get, "/export", None, None)
		.expect("GET request should build.");
	let mut sink = Vec::new();

	api.execute::<()>(&CallContext::background(), request, Destination::Raw(&mut sink))
		.await
		.expect("Raw execution should succeed.");

	assert_eq!(sink, b"id,title\n1,Standup\n");
}

#[tokio::test]
async fn service_errors_arrive_in_band() {
	let server = MockServer::start_async().await;
	let api = build_api(&server);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/calendars/missing");
			then.status(404).header("content-type", "application/problem+json").body(
				r#"{"type":"https://developers.timetreeapp.com/en/docs/api#client-failure","status":404,"title":"Not Found"}"#,
			);
		})
		.await;

	let request = api
		.new_request::<()>(ApiMethod::Get, "/calendars/missing", Some("tok"), None)
		.expect("GET request should build.");
	let (envelope, response) = api
		.execute_json::<EventEnvelope>(&CallContext::background(), request)
		.await
		.expect("Non-2xx statuses are not transport errors.");

	assert!(!response.is_success());
	assert_eq!(response.status.as_u16(), 404);
	assert!(envelope.data.is_none());
	assert_eq!(envelope.error.map(|e| e.to_string()), Some("404 Not Found".into()));
}

#[tokio::test]
async fn invalid_json_reports_decode_error_with_status() {
	let server = MockServer::start_async().await;
	let api = build_api(&server);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/user");
			then.status(502).body("<html>Bad Gateway</html>");
		})
		.await;

	let request = api
		.new_request::<()>(ApiMethod::Get, "/user", Some("tok"), None)
		.expect("GET request should build.");
	let err = api
		.execute_json::<EventEnvelope>(&CallContext::background(), request)
		.await
		.expect_err("Non-JSON bodies must fail decoding.");

	assert!(matches!(err, Error::Decode { status: 502, .. }));
}

#[tokio::test]
async fn deadline_interrupts_slow_response() {
	let server = MockServer::start_async().await;
	let api = build_api(&server);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/slow");
			then.status(200).delay(Duration::from_secs(2)).body("{}");
		})
		.await;

	let request = api
		.new_request::<()>(ApiMethod::Get, "/slow", None, None)
		.expect("GET request should build.");
	let ctx = CallContext::background().with_timeout(Duration::from_millis(50));
	let err = api
		.execute::<()>(&ctx, request, Destination::Discard)
		.await
		.expect_err("Deadline should interrupt the call.");

	assert!(matches!(err, Error::DeadlineExceeded));
}

#[tokio::test]
async fn cancellation_interrupts_slow_response() {
	let server = MockServer::start_async().await;
	let api = build_api(&server);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/slow");
			then.status(200).delay(Duration::from_secs(2)).body("{}");
		})
		.await;

	let request = api
		.new_request::<()>(ApiMethod::Get, "/slow", None, None)
		.expect("GET request should build.");
	let token = CancelToken::new();
	let ctx = CallContext::background().with_cancellation(token.clone());
	let canceller = async {
		tokio::time::sleep(Duration::from_millis(50)).await;
		token.cancel();
	};
	let (result, _) =
		tokio::join!(api.execute::<()>(&ctx, request, Destination::Discard), canceller);

	assert!(matches!(result, Err(Error::Cancelled)));
}

#[tokio::test]
async fn one_client_serves_overlapping_calls() {
	let server = MockServer::start_async().await;
	let api = build_api(&server);
	let first = server
		.mock_async(|when, then| {
			when.method(GET).path("/calendars/one");
			then.status(200).delay(Duration::from_millis(100)).body(r#"{"data":1}"#);
		})
		.await;
	let second = server
		.mock_async(|when, then| {
			when.method(GET).path("/calendars/two");
			then.status(200).delay(Duration::from_millis(100)).body(r#"{"data":2}"#);
		})
		.await;
	let ctx = CallContext::background();
	let call = |path: &'static str| {
		let api = api.clone();
		let ctx = ctx.clone();

		async move {
			let request = api
				.new_request::<()>(ApiMethod::Get, path, Some("tok"), None)
				.expect("GET request should build.");

			api.execute_json::<EventEnvelope>(&ctx, request).await
		}
	};
	let (one, two) = tokio::join!(call("/calendars/one"), call("/calendars/two"));
	let (one, _) = one.expect("First concurrent call should succeed.");
	let (two, _) = two.expect("Second concurrent call should succeed.");

	first.assert_async().await;
	second.assert_async().await;

	assert_eq!(one.data, Some(json!(1)));
	assert_eq!(two.data, Some(json!(2)));
}
