//! Registration, login and profile management.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::{Value, json};

use pacande_core::Role;
use pacande_integration_tests::{TEST_PASSWORD, TestApp};

fn registration(email: &str) -> Value {
    json!({
        "nombre": "Laura Gómez",
        "correo": email,
        "contraseña": "una-clave-segura",
    })
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();

    let live = app.get("/health", None).await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body, json!("ok"));

    assert_eq!(app.get("/health/ready", None).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_login_profile() {
    let app = TestApp::new();

    let registered = app
        .post("/api/auth/registro", None, registration("laura@pacande.test"))
        .await;
    assert_eq!(registered.status, StatusCode::CREATED, "{:?}", registered.body);
    assert_eq!(registered.body["rol"], "Usuario");
    assert!(registered.body.get("password_hash").is_none());

    let login = app
        .post(
            "/api/auth/login",
            None,
            json!({ "correo": "LAURA@pacande.test", "contrasena": "una-clave-segura" }),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK, "{:?}", login.body);
    assert_eq!(login.body["usuario"]["correo"], "laura@pacande.test");
    assert!(login.body["expiresAt"].is_string());
    let token = login.body["token"].as_str().unwrap();

    let profile = app.get("/api/auth/perfil", Some(token)).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["nombre"], "Laura Gómez");
    assert_eq!(profile.body["id"], registered.body["id"]);
}

#[tokio::test]
async fn test_register_never_grants_privileges() {
    let app = TestApp::new();

    let mut body = registration("colado@pacande.test");
    body["rol"] = json!("Superadmin");

    let response = app.post("/api/auth/registro", None, body).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_field(), Some("body"));
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let app = TestApp::new();

    app.post("/api/auth/registro", None, registration("dup@pacande.test"))
        .await;
    let again = app
        .post("/api/auth/registro", None, registration("Dup@Pacande.test"))
        .await;

    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.error_field(), Some("correo"));
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::new();

    let bad_email = app
        .post("/api/auth/registro", None, registration("no-es-correo"))
        .await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad_email.error_field(), Some("correo"));

    let short = app
        .post(
            "/api/auth/registro",
            None,
            json!({ "nombre": "Ana", "correo": "ana@pacande.test", "contraseña": "corta" }),
        )
        .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
    assert_eq!(short.error_field(), Some("contraseña"));
}

#[tokio::test]
async fn test_wrong_password_rejected() {
    let app = TestApp::new();
    app.create_account("Ana", "ana@pacande.test", Role::User)
        .await;

    let response = app
        .post(
            "/api/auth/login",
            None,
            json!({ "correo": "ana@pacande.test", "contraseña": "equivocada" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let unknown = app
        .post(
            "/api/auth/login",
            None,
            json!({ "correo": "nadie@pacande.test", "contraseña": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown.body["error"], response.body["error"]);
}

#[tokio::test]
async fn test_missing_or_bad_token() {
    let app = TestApp::new();

    assert_eq!(
        app.get("/api/auth/perfil", None).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.get("/api/auth/perfil", Some("not.a.token")).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_token_of_deleted_account_rejected() {
    let app = TestApp::new();
    let (_, admin) = app.account(Role::Admin).await;
    let (user, token) = app.account(Role::User).await;

    app.delete(&format!("/api/admin/eliminar-usuario/{user}"), Some(&admin))
        .await;

    assert_eq!(
        app.get("/api/auth/perfil", Some(&token)).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_update_profile() {
    let app = TestApp::new();
    let (_, token) = app.account(Role::User).await;

    let response = app
        .put(
            "/api/auth/actualizar",
            Some(&token),
            json!({ "nombre": "Nuevo Nombre", "profilePicture": "/uploads/yo.png" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["nombre"], "Nuevo Nombre");
    assert_eq!(response.body["profilePicture"], "/uploads/yo.png");
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::new();
    app.create_account("Ana", "ana@pacande.test", Role::User)
        .await;
    let token = app.login("ana@pacande.test", TEST_PASSWORD).await;

    let wrong = app
        .put(
            "/api/auth/cambiar-contrasena",
            Some(&token),
            json!({ "contrasenaActual": "equivocada", "nuevaContrasena": "otra-clave-larga" }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);

    let changed = app
        .put(
            "/api/auth/cambiar-contrasena",
            Some(&token),
            json!({ "contrasenaActual": TEST_PASSWORD, "nuevaContrasena": "otra-clave-larga" }),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK, "{:?}", changed.body);

    app.login("ana@pacande.test", "otra-clave-larga").await;
}
