//! Account administration and step-up confirmation.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use pacande_core::Role;
use pacande_integration_tests::{TEST_PASSWORD, TestApp};

#[tokio::test]
async fn test_admin_cannot_delete_admin() {
    let app = TestApp::new();
    let (_, admin) = app.account(Role::Admin).await;
    let (other_admin, _) = app.account(Role::Admin).await;

    let response = app
        .delete(
            &format!("/api/admin/eliminar-usuario/{other_admin}"),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let (_, superadmin) = app.account(Role::SuperAdmin).await;
    let still_there = app
        .get(&format!("/api/admin/usuarios/{other_admin}"), Some(&superadmin))
        .await;
    assert_eq!(still_there.status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_deletes_user() {
    let app = TestApp::new();
    let (_, admin) = app.account(Role::Admin).await;
    let (user, _) = app.account(Role::User).await;

    let response = app
        .delete(&format!("/api/admin/eliminar-usuario/{user}"), Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["mensaje"], "Usuario eliminado correctamente");

    let gone = app
        .get(&format!("/api/admin/usuarios/{user}"), Some(&admin))
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_cannot_reach_admin_routes() {
    let app = TestApp::new();
    let (_, user) = app.account(Role::User).await;

    let response = app.get("/api/admin/usuarios", Some(&user)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let anonymous = app.get("/api/admin/usuarios", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_listing_shows_only_customers() {
    let app = TestApp::new();
    let (_, admin) = app.account(Role::Admin).await;
    app.account(Role::User).await;
    app.account(Role::User).await;
    app.account(Role::SuperAdmin).await;

    let response = app.get("/api/admin/usuarios", Some(&admin)).await;
    let listed = response.body.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|user| user["rol"] == "Usuario"));
}

#[tokio::test]
async fn test_superadmin_listing_shows_everyone() {
    let app = TestApp::new();
    let (_, superadmin) = app.account(Role::SuperAdmin).await;
    app.account(Role::Admin).await;
    app.account(Role::User).await;

    let response = app.get("/api/admin/usuarios", Some(&superadmin)).await;
    assert_eq!(response.body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_verify_password() {
    let app = TestApp::new();
    let (_, superadmin) = app.account(Role::SuperAdmin).await;

    let ok = app
        .post(
            "/api/admin/verify-password",
            Some(&superadmin),
            json!({ "contraseña": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK, "{:?}", ok.body);
    assert_eq!(ok.body["valid"], true);

    let wrong = app
        .post(
            "/api/admin/verify-password",
            Some(&superadmin),
            json!({ "contraseña": "otra-clave-123" }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::OK, "{:?}", wrong.body);
    assert_eq!(wrong.body["valid"], false);
}

#[tokio::test]
async fn test_mismatched_password_grants_nothing() {
    let app = TestApp::new();
    let (_, superadmin) = app.account(Role::SuperAdmin).await;
    let (target, _) = app.account(Role::User).await;

    app.post(
        "/api/admin/verify-password",
        Some(&superadmin),
        json!({ "contraseña": "otra-clave-123" }),
    )
    .await;

    let response = app
        .delete(
            &format!("/api/admin/superadmin/eliminar-usuario/{target}"),
            Some(&superadmin),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_superadmin_edit_requires_step_up() {
    let app = TestApp::new();
    let (_, superadmin) = app.account(Role::SuperAdmin).await;
    let (target, _) = app.account(Role::User).await;
    let uri = format!("/api/admin/superadmin/usuarios/{target}");

    let without = app
        .put(&uri, Some(&superadmin), json!({ "rol": "Admin" }))
        .await;
    assert_eq!(without.status, StatusCode::BAD_REQUEST);

    app.post(
        "/api/admin/verify-password",
        Some(&superadmin),
        json!({ "contraseña": TEST_PASSWORD }),
    )
    .await;

    let promoted = app
        .put(&uri, Some(&superadmin), json!({ "rol": "Admin" }))
        .await;
    assert_eq!(promoted.status, StatusCode::OK, "{:?}", promoted.body);
    assert_eq!(promoted.body["rol"], "Admin");

    // The grant was spent on the previous edit.
    let again = app
        .put(&uri, Some(&superadmin), json!({ "nombre": "Otro" }))
        .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_cannot_change_roles() {
    let app = TestApp::new();
    let (_, admin) = app.account(Role::Admin).await;
    let (target, _) = app.account(Role::User).await;

    let response = app
        .put(
            &format!("/api/admin/usuarios/{target}"),
            Some(&admin),
            json!({ "rol": "Admin" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_edits_customer_name() {
    let app = TestApp::new();
    let (_, admin) = app.account(Role::Admin).await;
    let (target, _) = app.account(Role::User).await;

    let response = app
        .put(
            &format!("/api/admin/usuarios/{target}"),
            Some(&admin),
            json!({ "nombre": "Camila", "contraseña": "" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["nombre"], "Camila");
}

#[tokio::test]
async fn test_invalid_role_rejected() {
    let app = TestApp::new();
    let (_, superadmin) = app.account(Role::SuperAdmin).await;
    let (target, _) = app.account(Role::User).await;

    let response = app
        .put(
            &format!("/api/admin/superadmin/usuarios/{target}"),
            Some(&superadmin),
            json!({ "rol": "Rey" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_field(), Some("rol"));
}

#[tokio::test]
async fn test_superadmin_cannot_delete_self() {
    let app = TestApp::new();
    let (me, superadmin) = app.account(Role::SuperAdmin).await;

    let response = app
        .delete(
            &format!("/api/admin/superadmin/eliminar-usuario/{me}"),
            Some(&superadmin),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_superadmin_deletes_admin_after_step_up() {
    let app = TestApp::new();
    let (_, superadmin) = app.account(Role::SuperAdmin).await;
    let (admin, _) = app.account(Role::Admin).await;
    let uri = format!("/api/admin/superadmin/eliminar-usuario/{admin}");

    assert_eq!(
        app.delete(&uri, Some(&superadmin)).await.status,
        StatusCode::BAD_REQUEST
    );

    app.post(
        "/api/admin/verify-password",
        Some(&superadmin),
        json!({ "contraseña": TEST_PASSWORD }),
    )
    .await;

    assert_eq!(app.delete(&uri, Some(&superadmin)).await.status, StatusCode::OK);
}
