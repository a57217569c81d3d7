//! Appearance, features, email delivery and templates.

use serde_json::json;
use serviceflow_integration_tests::{TEST_EMAIL, TestContext, location};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

fn email_config() -> serde_json::Value {
    json!({
        "provider": "smtp",
        "from_email": "soporte@acme.io",
        "smtp_host": "smtp.acme.io",
        "smtp_port": 2525,
        "smtp_user": "soporte",
        "has_smtp_pass": true,
        "has_mailjet_keys": false
    })
}

async fn mount_config(ctx: &TestContext) {
    Mock::given(method("GET"))
        .and(path("/api/v1/system/email-config/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(email_config()))
        .mount(&ctx.api)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/system/email/templates/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "templates": {
                "ticket_created": {"subject": "Nuevo ticket", "body": "Hola"}
            }
        })))
        .mount(&ctx.api)
        .await;
}

#[tokio::test]
async fn test_config_page_renders_backend_settings() {
    let ctx = TestContext::new().await;
    ctx.login().await;
    mount_config(&ctx).await;

    let response = ctx.get("/system/config").await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("smtp.acme.io"));
    assert!(body.contains("2525"));
    assert!(body.contains("name=\"subject:ticket_created\""));
    assert!(body.contains(&format!("value=\"{TEST_EMAIL}\"")));
}

#[tokio::test]
async fn test_config_page_survives_backend_failure() {
    let ctx = TestContext::new().await;
    ctx.login().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/system/email-config/"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "Forbidden"})))
        .mount(&ctx.api)
        .await;

    let response = ctx.get("/system/config").await;

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("No se pudo cargar la configuración de correo"));
    assert!(body.contains("No se pudieron cargar las plantillas"));
}

#[tokio::test]
async fn test_appearance_is_kept_in_session() {
    let ctx = TestContext::new().await;
    ctx.login().await;
    mount_config(&ctx).await;

    let response = ctx
        .post_form(
            "/system/config/appearance",
            &[("dark_mode", "on"), ("theme", "green-fresh")],
        )
        .await;
    assert!(location(&response).starts_with("/system/config?success="));

    let body = ctx.get("/system/config").await.text().await.unwrap();
    assert!(body.contains("data-theme=\"green-fresh\" class=\"dark\""));
}

#[tokio::test]
async fn test_unknown_theme_rejected() {
    let ctx = TestContext::new().await;
    ctx.login().await;

    let response = ctx
        .post_form("/system/config/appearance", &[("theme", "neon")])
        .await;

    assert!(location(&response).starts_with("/system/config?error="));
}

#[tokio::test]
async fn test_save_email_defaults_port() {
    let ctx = TestContext::new().await;
    ctx.login().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/system/email-config/"))
        .and(body_partial_json(json!({
            "provider": "smtp",
            "smtp_host": "smtp.acme.io",
            "smtp_port": 587
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(email_config()))
        .expect(1)
        .mount(&ctx.api)
        .await;

    let response = ctx
        .post_form(
            "/system/config/email",
            &[
                ("provider", "smtp"),
                ("from_email", "soporte@acme.io"),
                ("smtp_host", " smtp.acme.io "),
                ("smtp_port", ""),
                ("smtp_user", "soporte"),
                ("smtp_pass", ""),
            ],
        )
        .await;

    assert!(location(&response).starts_with("/system/config?success="));
    let requests = ctx.api.received_requests().await.unwrap();
    let put = requests
        .iter()
        .find(|r| r.method.as_str() == "PUT")
        .unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&put.body).unwrap();
    assert!(sent.get("smtp_pass").is_none());
}

#[tokio::test]
async fn test_save_email_forbidden() {
    let ctx = TestContext::new().await;
    ctx.login().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/system/email-config/"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "Superadmin only"})))
        .mount(&ctx.api)
        .await;

    let response = ctx
        .post_form("/system/config/email", &[("provider", "console")])
        .await;

    assert!(location(&response).starts_with("/system/config?error="));
}

#[tokio::test]
async fn test_save_templates() {
    let ctx = TestContext::new().await;
    ctx.login().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/system/email/templates/"))
        .and(body_partial_json(json!({
            "templates": {"ticket_created": {"subject": "Ticket nuevo", "body": "Hola {name}"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "templates": {"ticket_created": {"subject": "Ticket nuevo", "body": "Hola {name}"}}
        })))
        .expect(1)
        .mount(&ctx.api)
        .await;

    let response = ctx
        .post_form(
            "/system/config/templates",
            &[
                ("subject:ticket_created", "Ticket nuevo"),
                ("body:ticket_created", "Hola {name}"),
            ],
        )
        .await;

    assert!(location(&response).starts_with("/system/config?success="));
}

#[tokio::test]
async fn test_send_test_email_reports_backend_failure() {
    let ctx = TestContext::new().await;
    ctx.login().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/system/email/test/"))
        .and(body_partial_json(json!({"to": TEST_EMAIL})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": false})))
        .expect(1)
        .mount(&ctx.api)
        .await;

    let response = ctx
        .post_form(
            "/system/config/email/test",
            &[("to", TEST_EMAIL), ("subject", ""), ("body", "")],
        )
        .await;

    assert!(location(&response).starts_with("/system/config?error="));
}
