//! End-to-end tests for the album sales read endpoint
//!
//! Sales rows enter the store through ingestion, not HTTP, so these tests
//! seed the store directly and exercise the read aggregate.

mod common;

use common::{seed_album_sale, TestClient, TestServer, ALBUM_1_ID, ALBUM_2_ID};
use reqwest::StatusCode;

// 2025-05-01T00:00:00+00:00
const MAY_FIRST: i64 = 1746057600;

// =============================================================================
// GET /v1/stats/albums/{id}/sales
// =============================================================================

#[tokio::test]
async fn test_album_sales_empty() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.get_album_sales(ALBUM_1_ID, &[]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["album_id"].as_str().unwrap(), ALBUM_1_ID);
    assert_eq!(body["orders"].as_u64().unwrap(), 0);
    assert_eq!(body["sales"].as_u64().unwrap(), 0);
    assert!(body["last_purchase"].is_null());
    // Revenue only appears when asked for
    assert!(body.get("revenue").is_none());
}

#[tokio::test]
async fn test_album_sales_summary() {
    let server = TestServer::spawn().await;
    seed_album_sale(server.stats_store.as_ref(), ALBUM_1_ID, 3, 2997, MAY_FIRST, false).unwrap();
    seed_album_sale(
        server.stats_store.as_ref(),
        ALBUM_1_ID,
        1,
        999,
        MAY_FIRST + 3600,
        false,
    )
    .unwrap();
    // A different album stays out of the rollup
    seed_album_sale(server.stats_store.as_ref(), ALBUM_2_ID, 5, 4995, MAY_FIRST, false).unwrap();

    let client = TestClient::authenticated(server.base_url.clone()).await;
    let body: serde_json::Value = client
        .get_album_sales(ALBUM_1_ID, &[])
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(body["orders"].as_u64().unwrap(), 2);
    assert_eq!(body["sales"].as_u64().unwrap(), 4);
    assert_eq!(
        body["last_purchase"].as_str().unwrap(),
        "2025-05-01T01:00:00+00:00"
    );
}

#[tokio::test]
async fn test_refunds_excluded_by_default() {
    let server = TestServer::spawn().await;
    seed_album_sale(server.stats_store.as_ref(), ALBUM_1_ID, 2, 1998, MAY_FIRST, false).unwrap();
    seed_album_sale(
        server.stats_store.as_ref(),
        ALBUM_1_ID,
        1,
        999,
        MAY_FIRST + 60,
        true,
    )
    .unwrap();

    let client = TestClient::authenticated(server.base_url.clone()).await;

    let body: serde_json::Value = client
        .get_album_sales(ALBUM_1_ID, &[])
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["orders"].as_u64().unwrap(), 1);
    assert_eq!(body["sales"].as_u64().unwrap(), 2);

    let body: serde_json::Value = client
        .get_album_sales(ALBUM_1_ID, &[("include_refunds", "1")])
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["orders"].as_u64().unwrap(), 2);
    assert_eq!(body["sales"].as_u64().unwrap(), 3);
}

#[tokio::test]
async fn test_revenue_formatting() {
    let server = TestServer::spawn().await;
    seed_album_sale(server.stats_store.as_ref(), ALBUM_1_ID, 1, 1250, MAY_FIRST, false).unwrap();
    seed_album_sale(
        server.stats_store.as_ref(),
        ALBUM_1_ID,
        1,
        5,
        MAY_FIRST + 60,
        false,
    )
    .unwrap();

    let client = TestClient::authenticated(server.base_url.clone()).await;
    let body: serde_json::Value = client
        .get_album_sales(ALBUM_1_ID, &[("revenue", "true")])
        .await
        .json()
        .await
        .unwrap();

    // Cents render fixed-precision, never floating point
    assert_eq!(body["revenue"].as_str().unwrap(), "12.55");
}

#[tokio::test]
async fn test_sales_window() {
    let server = TestServer::spawn().await;
    seed_album_sale(server.stats_store.as_ref(), ALBUM_1_ID, 1, 999, MAY_FIRST, false).unwrap();
    seed_album_sale(
        server.stats_store.as_ref(),
        ALBUM_1_ID,
        1,
        999,
        MAY_FIRST + 30 * 86400,
        false,
    )
    .unwrap();

    let client = TestClient::authenticated(server.base_url.clone()).await;
    let body: serde_json::Value = client
        .get_album_sales(ALBUM_1_ID, &[("from", "2025-05-01"), ("to", "2025-05-02")])
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(body["orders"].as_u64().unwrap(), 1);
    assert_eq!(
        body["last_purchase"].as_str().unwrap(),
        "2025-05-01T00:00:00+00:00"
    );
}
