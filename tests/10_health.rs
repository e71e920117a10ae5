mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn root_reports_online() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(server.url("/")).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["status"], "online");
    assert!(body["timestamp"].is_string());
    Ok(())
}

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(server.url("/health")).await?;

    // We consider OK or SERVICE_UNAVAILABLE acceptable as a basic liveness check
    assert!(
        res.status() == StatusCode::OK || res.status() == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status: {}",
        res.status()
    );

    let body = res.json::<serde_json::Value>().await?;
    assert!(body["data"]["status"] == "ok" || body["data"]["status"] == "degraded");
    Ok(())
}

#[tokio::test]
async fn churches_come_from_configuration() -> Result<()> {
    let server = common::ensure_server().await?;

    let churches = reqwest::get(server.url("/config/churches"))
        .await?
        .json::<Vec<String>>()
        .await?;
    assert_eq!(churches, vec!["Ibmg Sede", "Ibmg Caldas", "Outra"]);
    Ok(())
}

#[tokio::test]
async fn unknown_routes_are_not_found() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(server.url("/api/data/users")).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
