mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn polling_falls_back_to_pending() -> Result<()> {
    let server = common::ensure_server().await?;

    // No gateway key is configured for the test server, so the lookup fails
    let res = reqwest::get(server.url("/orders/check-status/bill_does_not_exist")).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let headers = res.headers().clone();
    let cache = headers
        .get("cache-control")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cache.contains("no-store"), "cache-control: {}", cache);
    assert_eq!(headers.get("pragma").and_then(|v| v.to_str().ok()), Some("no-cache"));
    assert_eq!(headers.get("expires").and_then(|v| v.to_str().ok()), Some("0"));

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body, json!({ "status": "PENDING" }));
    Ok(())
}

#[tokio::test]
async fn webhook_acknowledges_other_events() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/orders/webhook/abacatepay"))
        .json(&json!({ "event": "billing.created", "data": { "id": "bill_1", "status": "PENDING" } }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(server.url("/orders/webhook/abacatepay"))
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn webhook_failures_are_server_errors() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    // A paid notification needs the database, which the test server cannot reach
    let res = client
        .post(server.url("/orders/webhook/abacatepay"))
        .json(&json!({ "event": "billing.paid", "data": { "id": "bill_1", "status": "PAID" } }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    Ok(())
}
