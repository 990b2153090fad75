//! Shipment lifecycle through the HTTP API.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::{Value, json};

use pacande_core::Role;
use pacande_integration_tests::TestApp;

fn order(product: &str, quantity: i64) -> Value {
    json!({
        "direccionEnvio": "Calle 10 # 20-30, Medellín",
        "productos": [{ "producto": product, "cantidad": quantity }],
        "costoEnvio": 10000,
        "telefono": "3001234567",
    })
}

#[tokio::test]
async fn test_create_prices_from_catalog() {
    let app = TestApp::new();
    let (user_id, token) = app.account(Role::User).await;
    let product = app.create_product("Balón", 100_000).await;

    let response = app
        .post("/api/shipments", Some(&token), order(&product.to_string(), 2))
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    assert_eq!(response.body["total"], json!(210_000.0));
    assert_eq!(response.body["estado"], "pendiente");
    assert_eq!(response.body["cliente"], json!(user_id.to_string()));
    assert_eq!(response.body["productos"][0]["nombre"], "Balón");
    assert_eq!(response.body["productos"][0]["cantidad"], 2);
}

#[tokio::test]
async fn test_client_total_is_ignored() {
    let app = TestApp::new();
    let (_, token) = app.account(Role::User).await;
    let product = app.create_product("Termo", 40_000).await;

    let mut body = order(&product.to_string(), 1);
    body["total"] = json!(1);
    body["productos"][0]["precio"] = json!(1);

    let response = app.post("/api/shipments", Some(&token), body).await;

    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    assert_eq!(response.body["total"], json!(50_000.0));
}

#[tokio::test]
async fn test_empty_products_rejected_and_nothing_stored() {
    let app = TestApp::new();
    let (_, token) = app.account(Role::User).await;

    let response = app
        .post(
            "/api/shipments",
            Some(&token),
            json!({
                "direccionEnvio": "Calle 1",
                "productos": [],
                "costoEnvio": 10000,
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_field(), Some("productos"));
    assert_eq!(app.shipment_count().await, 0);
}

#[tokio::test]
async fn test_unknown_product_rejected() {
    let app = TestApp::new();
    let (_, token) = app.account(Role::User).await;

    let response = app
        .post(
            "/api/shipments",
            Some(&token),
            order("00000000-0000-4000-8000-000000000000", 1),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_field(), Some("productos[0].producto"));
    assert_eq!(app.shipment_count().await, 0);
}

#[tokio::test]
async fn test_user_cannot_create_for_someone_else() {
    let app = TestApp::new();
    let (_, token) = app.account(Role::User).await;
    let (other, _) = app.account(Role::User).await;
    let product = app.create_product("Termo", 40_000).await;

    let mut body = order(&product.to_string(), 1);
    body["cliente"] = json!(other.to_string());

    let response = app.post("/api/shipments", Some(&token), body).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(app.shipment_count().await, 0);
}

#[tokio::test]
async fn test_admin_creates_for_client() {
    let app = TestApp::new();
    let (_, admin) = app.account(Role::Admin).await;
    let (client, _) = app.account(Role::User).await;
    let product = app.create_product("Termo", 40_000).await;

    let mut body = order(&product.to_string(), 1);
    body["cliente"] = json!(client.to_string());

    let response = app.post("/api/shipments", Some(&admin), body).await;

    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    assert_eq!(response.body["cliente"], json!(client.to_string()));
}

#[tokio::test]
async fn test_user_listing_is_scoped_to_self() {
    let app = TestApp::new();
    let (_, alice) = app.account(Role::User).await;
    let (bob_id, bob) = app.account(Role::User).await;
    let product = app.create_product("Termo", 40_000).await;

    for token in [&alice, &bob, &bob] {
        let response = app
            .post("/api/shipments", Some(token), order(&product.to_string(), 1))
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let response = app
        .get(&format!("/api/shipments?cliente={bob_id}"), Some(&alice))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let listed = response.body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_ne!(listed[0]["cliente"], json!(bob_id.to_string()));
}

#[tokio::test]
async fn test_admin_listing_filters_by_client() {
    let app = TestApp::new();
    let (_, admin) = app.account(Role::Admin).await;
    let (_, alice) = app.account(Role::User).await;
    let (bob_id, bob) = app.account(Role::User).await;
    let product = app.create_product("Termo", 40_000).await;

    for token in [&alice, &bob] {
        app.post("/api/shipments", Some(token), order(&product.to_string(), 1))
            .await;
    }

    let all = app.get("/api/shipments", Some(&admin)).await;
    assert_eq!(all.body.as_array().unwrap().len(), 2);

    let filtered = app
        .get(&format!("/api/shipments?cliente={bob_id}"), Some(&admin))
        .await;
    let listed = filtered.body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["cliente"], json!(bob_id.to_string()));
}

#[tokio::test]
async fn test_reading_someone_elses_shipment_is_forbidden() {
    let app = TestApp::new();
    let (_, alice) = app.account(Role::User).await;
    let (_, bob) = app.account(Role::User).await;
    let product = app.create_product("Termo", 40_000).await;

    let created = app
        .post("/api/shipments", Some(&alice), order(&product.to_string(), 1))
        .await;
    let id = created.body["id"].as_str().unwrap();

    let own = app.get(&format!("/api/shipments/{id}"), Some(&alice)).await;
    assert_eq!(own.status, StatusCode::OK);

    let other = app.get(&format!("/api/shipments/{id}"), Some(&bob)).await;
    assert_eq!(other.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_and_malformed_ids() {
    let app = TestApp::new();
    let (_, token) = app.account(Role::Admin).await;

    let missing = app
        .get(
            "/api/shipments/00000000-0000-4000-8000-000000000000",
            Some(&token),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let malformed = app.get("/api/shipments/not-an-id", Some(&token)).await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert_eq!(malformed.error_field(), Some("id"));
}

#[tokio::test]
async fn test_status_lifecycle() {
    let app = TestApp::new();
    let (_, user) = app.account(Role::User).await;
    let (_, admin) = app.account(Role::Admin).await;
    let product = app.create_product("Termo", 40_000).await;

    let created = app
        .post("/api/shipments", Some(&user), order(&product.to_string(), 1))
        .await;
    let uri = format!("/api/shipments/{}", created.body["id"].as_str().unwrap());

    let by_user = app
        .put(&uri, Some(&user), json!({ "estado": "enviado" }))
        .await;
    assert_eq!(by_user.status, StatusCode::FORBIDDEN);

    let shipped = app
        .put(&uri, Some(&admin), json!({ "estado": "enviado" }))
        .await;
    assert_eq!(shipped.status, StatusCode::OK, "{:?}", shipped.body);
    assert_eq!(shipped.body["estado"], "enviado");

    let delivered = app
        .put(&uri, Some(&admin), json!({ "estado": "entregado" }))
        .await;
    assert_eq!(delivered.body["estado"], "entregado");

    for next in ["cancelado", "pendiente", "enviado"] {
        let response = app.put(&uri, Some(&admin), json!({ "estado": next })).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{next}");
        assert_eq!(response.error_field(), Some("estado"));
    }

    let unchanged = app.get(&uri, Some(&admin)).await;
    assert_eq!(unchanged.body["estado"], "entregado");
}

#[tokio::test]
async fn test_unknown_status_rejected() {
    let app = TestApp::new();
    let (_, user) = app.account(Role::User).await;
    let (_, admin) = app.account(Role::Admin).await;
    let product = app.create_product("Termo", 40_000).await;

    let created = app
        .post("/api/shipments", Some(&user), order(&product.to_string(), 1))
        .await;
    let uri = format!("/api/shipments/{}", created.body["id"].as_str().unwrap());

    let response = app
        .put(&uri, Some(&admin), json!({ "estado": "perdido" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_field(), Some("estado"));
}

#[tokio::test]
async fn test_delete_requires_admin() {
    let app = TestApp::new();
    let (_, user) = app.account(Role::User).await;
    let (_, admin) = app.account(Role::Admin).await;
    let product = app.create_product("Termo", 40_000).await;

    let created = app
        .post("/api/shipments", Some(&user), order(&product.to_string(), 1))
        .await;
    let uri = format!("/api/shipments/{}", created.body["id"].as_str().unwrap());

    assert_eq!(app.delete(&uri, Some(&user)).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.shipment_count().await, 1);

    assert_eq!(app.delete(&uri, Some(&admin)).await.status, StatusCode::NO_CONTENT);
    assert_eq!(app.shipment_count().await, 0);
    assert_eq!(app.get(&uri, Some(&admin)).await.status, StatusCode::NOT_FOUND);
}
