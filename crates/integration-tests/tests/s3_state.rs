//! Integration tests for the slash-command webhook with state kept in S3.
//!
//! A second mock server stands in for an S3-compatible endpoint, addressed
//! path-style the way `S3_ENDPOINT` configures it.

use pickem_bot::commands::{FAILURE, NO_EXCLUDED};
use pickem_bot::config::{S3Config, StaticCredentials};
use pickem_bot::store::{LocationStore, StateLocation};
use pickem_core::{ChannelId, UserId, codec};
use pickem_integration_tests::{CHANNEL, TestBot};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STATE_URL: &str = "s3://pickem-state/teams/state.json";
const OBJECT_PATH: &str = "/pickem-state/teams/state.json";

async fn s3_bot(s3: &MockServer) -> TestBot {
    let config = S3Config {
        credentials: Some(StaticCredentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: SecretString::from("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"),
            session_token: None,
        }),
        region: "us-east-1".to_string(),
        endpoint: Some(s3.uri().parse().expect("mock server uri")),
    };
    let location: StateLocation = STATE_URL.parse().expect("valid state url");
    let store = LocationStore::open(&location, Some(&config))
        .await
        .expect("open S3 store");
    TestBot::with_store(store).await
}

/// Bodies of every `PutObject` the mock received.
async fn put_bodies(s3: &MockServer) -> Vec<Vec<u8>> {
    s3.received_requests()
        .await
        .expect("request recording is enabled")
        .into_iter()
        .filter(|request| request.method.as_str() == "PUT")
        .map(|request| request.body)
        .collect()
}

// =============================================================================
// S3 State Tests
// =============================================================================

#[tokio::test]
async fn test_missing_object_starts_empty() {
    let s3 = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&s3)
        .await;

    let bot = s3_bot(&s3).await;
    assert_eq!(bot.ephemeral("exclude").await, NO_EXCLUDED);
    assert_eq!(bot.ephemeral("sample_size").await, "sample_size is: 1");
    assert!(put_bodies(&s3).await.is_empty(), "reads must not write");
}

#[tokio::test]
async fn test_include_writes_signed_object() {
    let s3 = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "channelId": CHANNEL,
            "sampleSize": 2,
            "excludedUsers": ["U1", "U2"],
            "pickedUsers": {}
        }])))
        .mount(&s3)
        .await;
    Mock::given(method("PUT"))
        .and(path(OBJECT_PATH))
        .and(header_exists("authorization"))
        .and(header_exists("x-amz-date"))
        .and(header_exists("x-amz-content-sha256"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&s3)
        .await;

    let bot = s3_bot(&s3).await;
    bot.expect_announcement("amy included <@U1>").await;
    bot.silent("include <@U1>").await;

    let bodies = put_bodies(&s3).await;
    let [written] = bodies.as_slice() else {
        panic!("expected one PutObject, got {}", bodies.len());
    };
    let state = codec::decode(written).expect("written object decodes");
    let channel = state
        .channel(&ChannelId::new(CHANNEL))
        .expect("channel kept");

    assert!(!channel.is_excluded(&UserId::new("U1")));
    assert!(channel.is_excluded(&UserId::new("U2")));
    assert_eq!(channel.sample_size().get(), 2);
}

#[tokio::test]
async fn test_unreadable_object_replies_error() {
    let s3 = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("<Error>AccessDenied</Error>"))
        .mount(&s3)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&s3)
        .await;

    let bot = s3_bot(&s3).await;
    bot.expect_no_announcement().await;

    assert_eq!(bot.ephemeral("exclude <@U1>").await, FAILURE);
}

#[tokio::test]
async fn test_rejected_write_replies_error() {
    let s3 = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&s3)
        .await;
    Mock::given(method("PUT"))
        .and(path(OBJECT_PATH))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_string("<Error><Code>AccessDenied</Code></Error>"),
        )
        .mount(&s3)
        .await;

    let bot = s3_bot(&s3).await;
    bot.expect_no_announcement().await;

    assert_eq!(bot.ephemeral("sample_size 4").await, FAILURE);
}
