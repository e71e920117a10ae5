use anyhow::Result;
use ekklesia_api::payment::{
    AbacatePayClient, BillingProduct, BillingRequest, CustomerRequest, PaymentError, PaymentGateway,
};
use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;

fn client(server: &MockServer) -> AbacatePayClient {
    AbacatePayClient::new(&server.url("/v1"), "test-key", Duration::from_secs(5)).unwrap()
}

fn customer() -> CustomerRequest {
    CustomerRequest {
        name: "Ana Souza".into(),
        email: "ana@x.com".into(),
        cellphone: "61999990000".into(),
        tax_id: "52998224725".into(),
    }
}

#[tokio::test]
async fn creates_customer_with_bearer_token() -> Result<()> {
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/customer/create")
                .header("authorization", "Bearer test-key")
                .json_body_partial(r#"{ "email": "ana@x.com", "taxId": "52998224725", "cellphone": "61999990000" }"#);
            then.status(200)
                .json_body(json!({ "data": { "id": "cust_abc" }, "error": null }));
        })
        .await;

    let id = client(&server).create_customer(&customer()).await?;
    assert_eq!(id, "cust_abc");
    create.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn existing_customer_is_found_after_rejection() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/customer/create");
            then.status(422)
                .json_body(json!({ "data": null, "error": "Customer already exists" }));
        })
        .await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/customer/list");
            then.status(200).json_body(json!({
                "data": [
                    { "id": "cust_other", "metadata": { "email": "bob@x.com", "taxId": "11144477735" } },
                    { "id": "cust_ana", "metadata": { "email": "ANA@x.com", "taxId": "52998224725" } }
                ],
                "error": null
            }));
        })
        .await;

    let id = client(&server).ensure_customer(&customer()).await?;
    assert_eq!(id.as_deref(), Some("cust_ana"));
    list.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn creates_pix_billing_in_cents() -> Result<()> {
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/billing/create")
                .json_body_partial(
                    r#"{
                        "frequency": "ONE_TIME",
                        "methods": ["PIX"],
                        "customerId": "cust_ana",
                        "products": [{ "externalId": "p1", "name": "Camiseta", "quantity": 2, "price": 6990 }]
                    }"#,
                );
            then.status(200).json_body(json!({
                "data": {
                    "id": "bill_123",
                    "url": "https://pay.example/bill_123",
                    "pix": { "code": "00020126580014br.gov.bcb.pix" }
                },
                "error": null
            }));
        })
        .await;

    let request = BillingRequest::pix(
        "cust_ana".into(),
        vec![BillingProduct {
            external_id: "p1".into(),
            name: "Camiseta".into(),
            quantity: 2,
            price: 6990,
        }],
        "https://example.org/return".into(),
        "https://example.org/done".into(),
    );
    let billing = client(&server).create_billing(&request).await?;
    assert_eq!(billing.id, "bill_123");
    assert_eq!(billing.copy_paste().as_deref(), Some("00020126580014br.gov.bcb.pix"));
    create.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn billing_status_is_read_from_list() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/billing/list").query_param("id", "bill_123");
            then.status(200).json_body(json!({
                "data": [
                    { "id": "bill_999", "status": "PENDING" },
                    { "id": "bill_123", "status": "paid" }
                ],
                "error": null
            }));
        })
        .await;

    let status = client(&server).find_billing("bill_123").await?.expect("billing");
    assert_eq!(status.id, "bill_123");
    assert!(status.is_settled());
    Ok(())
}

#[tokio::test]
async fn server_errors_surface_as_status() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/billing/list");
            then.status(500).body("upstream down");
        })
        .await;

    let err = client(&server).find_billing("bill_123").await.unwrap_err();
    assert!(matches!(err, PaymentError::Status { status: 500, ref body } if body == "upstream down"));
    Ok(())
}
