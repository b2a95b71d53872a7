mod common;

use axum::http::StatusCode;
use common::test_app;
use serde_json::json;

#[tokio::test]
async fn create_applies_defaults_and_token_user() {
    let harness = test_app();
    let token = harness.login("42").await;

    let (status, tx) = harness
        .send(
            "POST",
            "/transactions",
            Some(&token),
            Some(json!({
                "store_id": 3,
                "total_amount": 25.0,
                "final_amount": 25.0,
                "payment_method": "PIX",
                "gateway_provider": "MERCADO_PAGO",
                "gateway_transaction_id": "mp-1001"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tx["user_id"], 42);
    assert_eq!(tx["discount_amount"], 0.0);
    assert_eq!(tx["status"], "PENDING");
    assert_eq!(tx["payment_method"], "PIX");
    assert!(tx["created_at"].is_string());
    assert!(tx["updated_at"].is_null());
}

#[tokio::test]
async fn missing_required_amounts_are_rejected() {
    let harness = test_app();
    let token = harness.login("42").await;

    for (body, field) in [
        (json!({"final_amount": 10.0}), "total_amount"),
        (json!({"total_amount": 10.0}), "final_amount"),
    ] {
        let (status, response) = harness
            .send("POST", "/transactions", Some(&token), Some(body))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let detail = response["detail"].as_str().expect("JSON error body");
        assert!(detail.contains(field), "{detail}");
    }

    let (_, list) = harness.send("GET", "/transactions", Some(&token), None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn discount_must_balance_final_amount() {
    let harness = test_app();
    let token = harness.login("42").await;

    let (status, body) = harness
        .send(
            "POST",
            "/transactions",
            Some(&token),
            Some(json!({"total_amount": 100.0, "discount_amount": 15.0, "final_amount": 90.0})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("final_amount"));

    let (status, tx) = harness
        .send(
            "POST",
            "/transactions",
            Some(&token),
            Some(json!({"total_amount": 100.0, "discount_amount": 15.0, "final_amount": 85.0})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tx["discount_amount"], 15.0);
}

#[tokio::test]
async fn duplicate_gateway_transaction_id_conflicts() {
    let harness = test_app();
    let token = harness.login("42").await;
    let charge = json!({
        "total_amount": 12.0,
        "final_amount": 12.0,
        "gateway_provider": "PAGARME",
        "gateway_transaction_id": "pgm-77"
    });

    let (status, _) = harness
        .send("POST", "/transactions", Some(&token), Some(charge.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = harness
        .send("POST", "/transactions", Some(&token), Some(charge))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"], "gateway transaction already recorded: pgm-77");
}

#[tokio::test]
async fn status_update_and_listing() {
    let harness = test_app();
    let token = harness.login("42").await;

    let mut ids = Vec::new();
    for gateway_id in ["mp-a", "mp-b"] {
        let (_, tx) = harness
            .send(
                "POST",
                "/transactions",
                Some(&token),
                Some(json!({
                    "total_amount": 10.0,
                    "final_amount": 10.0,
                    "gateway_transaction_id": gateway_id
                })),
            )
            .await;
        ids.push(tx["id"].as_i64().unwrap());
    }

    let (status, paid) = harness
        .send(
            "PATCH",
            &format!("/transactions/{}/status", ids[0]),
            Some(&token),
            Some(json!({"status": "PAID", "metadata_payload": {"status": "approved", "id": 991}})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "PAID");
    assert!(paid["updated_at"].is_string());
    assert_eq!(paid["metadata_payload"]["id"], 991);

    let (status, _) = harness
        .send(
            "PATCH",
            &format!("/transactions/{}/status", ids[0]),
            Some(&token),
            Some(json!({"status": "SETTLED"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, pending) = harness
        .send("GET", "/transactions?status=PENDING", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["id"], ids[1]);

    let (status, fetched) = harness
        .send("GET", &format!("/transactions/{}", ids[0]), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "PAID");

    let (status, _) = harness
        .send("GET", "/transactions/9999", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_query_and_path_render_json_errors() {
    let harness = test_app();
    let token = harness.login("42").await;

    let (status, body) = harness
        .send("GET", "/transactions?status=paid", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());

    let (status, body) = harness
        .send("GET", "/transactions/abc", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());

    let (status, body) = harness
        .send("GET", "/transactions?limit=0", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "invalid limit: must be at least 1");
}

#[tokio::test]
async fn repeated_idempotency_key_conflicts() {
    let harness = test_app();
    let token = harness.login("42").await;
    let charge = json!({"total_amount": 40.0, "final_amount": 40.0});

    let (status, _) = harness
        .send_with_headers(
            "POST",
            "/transactions",
            Some(&token),
            &[("X-Idempotency-Key", "cart-9001")],
            Some(charge.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = harness
        .send_with_headers(
            "POST",
            "/transactions",
            Some(&token),
            &[("X-Idempotency-Key", "cart-9001")],
            Some(charge.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"], "Request already processed or in progress");

    // The body field is honoured when no header is sent.
    let mut with_body_key = charge.clone();
    with_body_key["idempotencyKey"] = json!("cart-9001");
    let (status, _) = harness
        .send("POST", "/transactions", Some(&token), Some(with_body_key))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, list) = harness.send("GET", "/transactions", Some(&token), None).await;
    assert_eq!(list.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn rejected_create_releases_idempotency_key() {
    let harness = test_app();
    let token = harness.login("42").await;
    let key = [("X-Idempotency-Key", "cart-retry")];

    let (status, _) = harness
        .send_with_headers(
            "POST",
            "/transactions",
            Some(&token),
            &key,
            Some(json!({"total_amount": 40.0, "final_amount": 30.0})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = harness
        .send_with_headers(
            "POST",
            "/transactions",
            Some(&token),
            &key,
            Some(json!({"total_amount": 40.0, "final_amount": 40.0})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}
