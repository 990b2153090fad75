//! Integration test harness for the Pacandé API.
//!
//! Tests drive the full axum router in-process with
//! `tower::ServiceExt::oneshot` over in-memory stores, so no database or
//! running server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pacande-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use pacande_core::pricing::ShippingPolicy;
use pacande_core::{Email, ProductId, Role, UserId};
use pacande_storefront::config::{AuthConfig, Environment, StorefrontConfig};
use pacande_storefront::db::{ProductStore, Stores, UserStore};
use pacande_storefront::models::{NewUser, ProductDraft};
use pacande_storefront::services::auth::hash_password;
use pacande_storefront::state::AppState;

/// Password given to every account created by [`TestApp::account`].
pub const TEST_PASSWORD: &str = "clave-de-prueba-123";

/// Configuration suitable for in-process tests.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://unused"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        environment: Environment::Development,
        auth: AuthConfig {
            jwt_secret: SecretString::from("Xk9#mQ2$vL7@pR4!nW8^tY3&bZ6*cF1%"),
            token_ttl: Duration::from_secs(2 * 60 * 60),
            step_up_ttl: Duration::from_secs(300),
        },
        cors_origins: vec!["http://localhost:5173".to_owned()],
        shipping: ShippingPolicy::default(),
        payment_approval_rate: 1.0,
        cart_idle: Duration::from_secs(60 * 60),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A decoded API response.
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// JSON body, or `Null` for an empty body.
    pub body: Value,
}

impl TestResponse {
    /// The `field` of a validation error, if any.
    #[must_use]
    pub fn error_field(&self) -> Option<&str> {
        self.body.get("field").and_then(Value::as_str)
    }
}

/// The application under test with direct access to its stores.
pub struct TestApp {
    /// Shared state, for reaching into stores.
    pub state: AppState,
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// Fresh app over empty in-memory stores.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Fresh app with a custom configuration.
    #[must_use]
    pub fn with_config(config: StorefrontConfig) -> Self {
        let state = AppState::with_stores(config, Stores::in_memory());
        let router = pacande_storefront::app(state.clone());
        Self { state, router }
    }

    /// Send a request and decode the JSON response.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        TestResponse { status, body }
    }

    /// `GET uri`.
    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    /// `POST uri` with a JSON body.
    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// `PUT uri` with a JSON body.
    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    /// `DELETE uri`.
    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Create an account directly in the store with [`TEST_PASSWORD`].
    pub async fn create_account(&self, name: &str, email: &str, role: Role) -> UserId {
        let user = self
            .state
            .stores()
            .users
            .create(NewUser {
                name: name.to_owned(),
                email: Email::parse(email).unwrap(),
                password_hash: hash_password(TEST_PASSWORD).unwrap(),
                role,
            })
            .await
            .unwrap();
        user.id
    }

    /// Log in through the API and return the bearer token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post(
                "/api/auth/login",
                None,
                serde_json::json!({ "correo": email, "contraseña": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {:?}", response.body);
        response.body["token"].as_str().unwrap().to_owned()
    }

    /// Create an account with a unique email and log it in.
    pub async fn account(&self, role: Role) -> (UserId, String) {
        let email = format!("{}-{}@pacande.test", role.as_str().to_lowercase(), uuid::Uuid::new_v4());
        let id = self.create_account(role.as_str(), &email, role).await;
        let token = self.login(&email, TEST_PASSWORD).await;
        (id, token)
    }

    /// Add a product to the catalog directly in the store.
    pub async fn create_product(&self, name: &str, price: i64) -> ProductId {
        let product = self
            .state
            .stores()
            .products
            .create(ProductDraft {
                name: name.to_owned(),
                description: String::new(),
                price: Decimal::from(price),
                category: "Deporte".to_owned(),
                subcategory: None,
                image_url: None,
                discount: None,
            })
            .await
            .unwrap();
        product.id
    }

    /// Number of shipments currently stored, across all clients.
    pub async fn shipment_count(&self) -> usize {
        self.state
            .shipments()
            .list(
                &pacande_core::access::Actor::new(UserId::generate(), Role::SuperAdmin),
                None,
            )
            .collect()
            .await
            .unwrap()
            .len()
    }
}
