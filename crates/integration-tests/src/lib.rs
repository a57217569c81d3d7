//! Integration tests for the ServiceFlow console.
//!
//! Each test boots the real console router on an ephemeral port and points
//! it at a [`wiremock`] server standing in for the ServiceFlow API.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p serviceflow-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;

use reqwest::{Client, Response, redirect::Policy};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use serviceflow_console::config::ConsoleConfig;
use serviceflow_console::state::AppState;

/// Token handed out by the mocked login endpoint.
pub const TEST_TOKEN: &str = "test-token";

pub const TEST_EMAIL: &str = "ana@acme.io";
pub const TEST_PASSWORD: &str = "secreto";

/// A running console plus the mocked API behind it.
pub struct TestContext {
    pub api: MockServer,
    pub client: Client,
    pub addr: SocketAddr,
}

impl TestContext {
    /// Start a mock API and a console wired to it.
    ///
    /// The mock already answers `/auth/login/` and `/auth/me/`.
    pub async fn new() -> Self {
        let api = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": TEST_TOKEN, "token_type": "bearer"})),
            )
            .mount(&api)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/auth/me/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(admin_user()))
            .mount(&api)
            .await;

        let api_base = format!("{}/api/v1", api.uri());
        let static_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../console/static").to_string();
        let config = ConsoleConfig::from_lookup(|key| match key {
            "CONSOLE_BASE_URL" => Some("http://127.0.0.1".to_string()),
            "SERVICEFLOW_API_BASE" => Some(api_base.clone()),
            "CONSOLE_CACHE_TTL_SECS" => Some("5".to_string()),
            "CONSOLE_STATIC_DIR" => Some(static_dir.clone()),
            _ => None,
        })
        .unwrap();

        let state = AppState::new(config).unwrap();
        let app = serviceflow_console::app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .unwrap();

        Self { api, client, addr }
    }

    /// Absolute console URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// Log in through the console and keep the session cookie.
    pub async fn login(&self) {
        let response = self
            .post_form(
                "/auth/login",
                &[("email", TEST_EMAIL), ("password", TEST_PASSWORD)],
            )
            .await;
        assert_eq!(location(&response), "/");
    }
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &Response) -> String {
    assert!(
        response.status().is_redirection(),
        "expected a redirect, got {}",
        response.status()
    );
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// The logged-in admin returned by `/auth/me/`.
#[must_use]
pub fn admin_user() -> Value {
    json!({
        "id": 1,
        "email": TEST_EMAIL,
        "full_name": "Ana Ruiz",
        "role": "admin",
        "company_id": 4,
        "is_active": true,
        "can_view_all_companies": true
    })
}

#[must_use]
pub fn tech_user(id: i64, name: &str, company_id: i64) -> Value {
    json!({
        "id": id,
        "email": format!("tech{id}@acme.io"),
        "full_name": name,
        "role": "tech",
        "company_id": company_id,
        "is_active": true,
        "can_view_all_companies": false
    })
}

#[must_use]
pub fn ticket(id: i64, title: &str, status: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "La impresora de la planta 2 no imprime",
        "status": status,
        "priority": "high",
        "created_at": "2026-03-02T09:15:00Z",
        "updated_at": null,
        "assignee_id": null,
        "requester_id": 1,
        "company_id": 4
    })
}

#[must_use]
pub fn companies() -> Value {
    json!([{"id": 4, "name": "Acme"}, {"id": 5, "name": "Globex"}])
}
