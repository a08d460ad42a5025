use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;

use pp_reconcile::price_key;
use pp_schemas::{Collection, InitState, Price};
use pp_store::{RealtimeStore, RestRealtimeStore, StoreError};

#[tokio::test]
async fn init_then_history_append_puts_under_price_key_and_time() {
    let server = MockServer::start_async().await;
    let root = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/.json")
                .query_param("shallow", "true")
                .query_param("auth", "secret-token");
            then.status(200).json_body(json!({"brands": true}));
        })
        .await;

    let price = Price::new("1234", "E10", 179.9, 1_718_400_000);
    let path = format!("/prices/{}/1718400000.json", price_key(&price));
    let put = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path(path.as_str())
                .query_param("auth", "secret-token")
                .json_body(price.to_document());
            then.status(200).json_body(price.to_document());
        })
        .await;

    let mut store = RestRealtimeStore::new(
        server.base_url(),
        Some("secret-token".to_string()),
        Duration::from_secs(5),
    )
    .unwrap();
    store.init().await.unwrap();
    store.append_price_history(&price).await.unwrap();

    root.assert_async().await;
    put.assert_async().await;
}

#[tokio::test]
async fn hash_document_is_wrapped() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/.json");
            then.status(200).body("null");
        })
        .await;
    let put = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/hash/brands.json")
                .json_body(json!({"hash": "abc"}));
            then.status(200).body("{}");
        })
        .await;

    let mut store = RestRealtimeStore::new(server.base_url(), None, Duration::from_secs(5)).unwrap();
    store.init().await.unwrap();
    store
        .write_aggregate_hash(Collection::Brands, "abc")
        .await
        .unwrap();

    put.assert_async().await;
}

#[tokio::test]
async fn rejected_credentials_fail_init() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/.json");
            then.status(401).json_body(json!({"error": "Permission denied"}));
        })
        .await;

    let mut store =
        RestRealtimeStore::new(server.base_url(), Some("bad".into()), Duration::from_secs(5))
            .unwrap();
    let err = store.init().await.unwrap_err();

    assert!(matches!(err, StoreError::Connect(_)));
    assert!(err.to_string().contains("Permission denied"));
    assert!(matches!(store.state(), InitState::Failed(_)));
}

#[tokio::test]
async fn writes_before_init_are_skipped() {
    let server = MockServer::start_async().await;
    let put = server
        .mock_async(|when, then| {
            when.method(PUT);
            then.status(200);
        })
        .await;

    let store = RestRealtimeStore::new(server.base_url(), None, Duration::from_secs(5)).unwrap();
    store
        .put_document(Collection::Brands, "Shell", &json!({"name": "Shell"}))
        .await
        .unwrap();

    put.assert_hits_async(0).await;
}
