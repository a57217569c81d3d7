//! System configuration route handlers.
//!
//! Appearance and feature toggles live in the session. Email delivery
//! settings and notification templates are stored by the backend.

use std::collections::BTreeMap;

use askama::Template;
use axum::{
    Form, Router,
    extract::{Query, State},
    response::{Html, Redirect},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use serviceflow_core::{Email, EmailProvider};

use crate::api::ApiError;
use crate::api::types::{
    EmailConfigIn, EmailConfigOut, EmailTemplate, EmailTemplates, TestEmailRequest,
};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireLogin, save_preferences};
use crate::models::{Preferences, THEMES};
use crate::state::AppState;

use super::{Flash, FlashQuery, Layout, SelectOption, checkbox, flash_url, non_blank, render};

const CONFIG_PATH: &str = "/system/config";

/// Default SMTP submission port.
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Placeholder shown for a secret the backend already stores.
const STORED_SECRET: &str = "********";

pub const DEFAULT_TEST_SUBJECT: &str = "Prueba de correo - ServiceFlow";
pub const DEFAULT_TEST_BODY: &str = "Este es un correo de prueba de ServiceFlow.";

// =============================================================================
// Templates
// =============================================================================

/// A theme radio button.
#[derive(Debug, Clone)]
pub struct ThemeOption {
    pub id: &'static str,
    pub label: &'static str,
    pub accent: &'static str,
    pub selected: bool,
}

/// Email configuration form state.
#[derive(Debug, Clone)]
pub struct EmailFormView {
    pub provider_options: Vec<SelectOption>,
    pub from_email: String,
    pub smtp_host: String,
    pub smtp_port: String,
    pub smtp_user: String,
    pub smtp_pass_placeholder: &'static str,
    pub mailjet_placeholder: &'static str,
}

impl From<&EmailConfigOut> for EmailFormView {
    fn from(config: &EmailConfigOut) -> Self {
        Self {
            provider_options: EmailProvider::ALL
                .iter()
                .map(|p| SelectOption::new(p.as_str(), p.label(), *p == config.provider))
                .collect(),
            from_email: config.from_email.clone().unwrap_or_default(),
            smtp_host: config.smtp_host.clone().unwrap_or_default(),
            smtp_port: config.smtp_port.unwrap_or(DEFAULT_SMTP_PORT).to_string(),
            smtp_user: config.smtp_user.clone().unwrap_or_default(),
            smtp_pass_placeholder: if config.has_smtp_pass { STORED_SECRET } else { "" },
            mailjet_placeholder: if config.has_mailjet_keys { STORED_SECRET } else { "" },
        }
    }
}

/// One editable notification template.
#[derive(Debug, Clone)]
pub struct TemplateView {
    pub name: String,
    pub subject: String,
    pub body: String,
}

/// System configuration template.
#[derive(Template)]
#[template(path = "system/config.html")]
pub struct SystemConfigTemplate {
    pub layout: Layout,
    pub dark_mode: bool,
    pub themes: Vec<ThemeOption>,
    pub hardware_requests: bool,
    pub auto_assign: bool,
    pub email: EmailFormView,
    pub email_unavailable: bool,
    pub templates: Vec<TemplateView>,
    pub templates_unavailable: bool,
    pub test_to: String,
    pub test_subject: &'static str,
    pub test_body: &'static str,
}

// =============================================================================
// Forms
// =============================================================================

/// Appearance form data.
#[derive(Debug, Deserialize)]
pub struct AppearanceForm {
    pub dark_mode: Option<String>,
    #[serde(default)]
    pub theme: String,
}

/// Feature toggles form data.
#[derive(Debug, Deserialize)]
pub struct FeaturesForm {
    pub hardware_requests: Option<String>,
    pub auto_assign: Option<String>,
}

/// Email configuration form data.
///
/// Secret fields are only forwarded when filled in, so a blank field keeps
/// the value stored by the backend.
#[derive(Debug, Default, Deserialize)]
pub struct EmailConfigForm {
    #[serde(default)]
    pub provider: String,
    pub from_email: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<String>,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub mailjet_api_key: Option<String>,
    pub mailjet_api_secret: Option<String>,
}

impl EmailConfigForm {
    /// Validate into the API payload.
    ///
    /// # Errors
    ///
    /// Returns a user-facing message for an unknown provider, malformed
    /// sender address or port.
    pub fn into_payload(self) -> Result<EmailConfigIn, &'static str> {
        let provider = self
            .provider
            .trim()
            .parse::<EmailProvider>()
            .map_err(|_| "Proveedor de correo no válido.")?;

        let from_email = match non_blank(self.from_email.as_deref()) {
            Some(raw) => Some(
                Email::parse(&raw)
                    .map_err(|_| "El correo remitente no es válido.")?
                    .into_inner(),
            ),
            None => None,
        };

        let smtp_port = match non_blank(self.smtp_port.as_deref()) {
            Some(raw) => raw
                .parse::<u16>()
                .ok()
                .filter(|p| *p > 0)
                .ok_or("El puerto SMTP no es válido.")?,
            None => DEFAULT_SMTP_PORT,
        };

        // Secrets are sent verbatim (no trimming) when present.
        let secret = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        Ok(EmailConfigIn {
            provider,
            from_email,
            smtp_host: non_blank(self.smtp_host.as_deref()),
            smtp_port: Some(smtp_port),
            smtp_user: non_blank(self.smtp_user.as_deref()),
            smtp_pass: secret(self.smtp_pass),
            mailjet_api_key: secret(self.mailjet_api_key),
            mailjet_api_secret: secret(self.mailjet_api_secret),
        })
    }
}

/// Test email form data.
#[derive(Debug, Deserialize)]
pub struct TestEmailForm {
    #[serde(default)]
    pub to: String,
    pub subject: Option<String>,
    pub body: Option<String>,
}

/// Collect `subject:<name>` / `body:<name>` form fields into templates.
fn templates_from_fields(fields: Vec<(String, String)>) -> EmailTemplates {
    let mut templates: BTreeMap<String, EmailTemplate> = BTreeMap::new();
    for (key, value) in fields {
        if let Some(name) = key.strip_prefix("subject:") {
            templates.entry(name.to_string()).or_default().subject = value;
        } else if let Some(name) = key.strip_prefix("body:") {
            templates.entry(name.to_string()).or_default().body = value;
        }
    }
    EmailTemplates { templates }
}

fn back(kind: Flash, message: &str) -> Redirect {
    Redirect::to(&flash_url(CONFIG_PATH, kind, message))
}

// =============================================================================
// Handlers
// =============================================================================

/// Build the system router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/system/config", get(config_page))
        .route("/system/config/appearance", post(save_appearance))
        .route("/system/config/features", post(save_features))
        .route("/system/config/email", post(save_email))
        .route("/system/config/templates", post(save_templates))
        .route("/system/config/email/test", post(send_test_email))
}

/// Render the configuration page.
///
/// GET /system/config
#[instrument(skip(state, viewer, flash), fields(user_id = %viewer.user.id))]
async fn config_page(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    let creds = &viewer.credentials;
    let (email_config, templates) = tokio::join!(
        state.api().email_config(creds),
        state.api().email_templates(creds),
    );

    let (email_config, email_unavailable) = match email_config {
        Ok(config) => (config, false),
        Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized.into()),
        Err(e) => {
            warn!(error = %e, "Failed to load email configuration");
            (EmailConfigOut::default(), true)
        }
    };
    let (templates, templates_unavailable) = match templates {
        Ok(t) => (t, false),
        Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized.into()),
        Err(e) => {
            warn!(error = %e, "Failed to load email templates");
            (EmailTemplates::default(), true)
        }
    };

    let prefs = &viewer.preferences;
    let current_theme = prefs.theme_id();
    let template = SystemConfigTemplate {
        dark_mode: prefs.dark_mode,
        themes: THEMES
            .iter()
            .map(|t| ThemeOption {
                id: t.id,
                label: t.label,
                accent: t.accent,
                selected: t.id == current_theme,
            })
            .collect(),
        hardware_requests: prefs.hardware_requests,
        auto_assign: prefs.auto_assign,
        email: EmailFormView::from(&email_config),
        email_unavailable,
        templates: templates
            .templates
            .into_iter()
            .map(|(name, t)| TemplateView {
                name,
                subject: t.subject,
                body: t.body,
            })
            .collect(),
        templates_unavailable,
        test_to: viewer.user.email.clone(),
        test_subject: DEFAULT_TEST_SUBJECT,
        test_body: DEFAULT_TEST_BODY,
        layout: Layout::new(&viewer, CONFIG_PATH, flash),
    };

    Ok(render(&template))
}

/// Save dark mode and theme.
///
/// POST /system/config/appearance
#[instrument(skip(session, viewer, form))]
async fn save_appearance(
    session: Session,
    RequireLogin(viewer): RequireLogin,
    Form(form): Form<AppearanceForm>,
) -> Result<Redirect, AppError> {
    let Some(theme) = Preferences::find_theme(form.theme.trim()) else {
        return Ok(back(Flash::Error, "Tema no válido."));
    };

    let preferences = Preferences {
        dark_mode: checkbox(form.dark_mode.as_deref()),
        theme: theme.id.to_string(),
        ..viewer.preferences
    };
    save_preferences(&session, &preferences).await?;

    Ok(back(Flash::Success, "Apariencia actualizada."))
}

/// Save feature toggles.
///
/// POST /system/config/features
#[instrument(skip(session, viewer, form))]
async fn save_features(
    session: Session,
    RequireLogin(viewer): RequireLogin,
    Form(form): Form<FeaturesForm>,
) -> Result<Redirect, AppError> {
    let preferences = Preferences {
        hardware_requests: checkbox(form.hardware_requests.as_deref()),
        auto_assign: checkbox(form.auto_assign.as_deref()),
        ..viewer.preferences
    };
    save_preferences(&session, &preferences).await?;

    Ok(back(Flash::Success, "Funciones actualizadas."))
}

/// Save email delivery settings.
///
/// POST /system/config/email
#[instrument(skip(state, viewer, form), fields(user_id = %viewer.user.id))]
async fn save_email(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Form(form): Form<EmailConfigForm>,
) -> Result<Redirect, AppError> {
    let payload = match form.into_payload() {
        Ok(p) => p,
        Err(message) => return Ok(back(Flash::Error, message)),
    };

    match state
        .api()
        .save_email_config(&viewer.credentials, &payload)
        .await
    {
        Ok(saved) => {
            info!(provider = %saved.provider, "Email configuration saved");
            Ok(back(Flash::Success, "Configuración de correo guardada."))
        }
        Err(ApiError::Forbidden(_)) => Ok(back(
            Flash::Error,
            "Solo un superadministrador puede cambiar la configuración de correo.",
        )),
        Err(ApiError::Status { detail, .. }) => Ok(back(
            Flash::Error,
            &format!("No se pudo guardar la configuración: {detail}"),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Save notification templates.
///
/// POST /system/config/templates
#[instrument(skip(state, viewer, fields), fields(user_id = %viewer.user.id))]
async fn save_templates(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Redirect, AppError> {
    let templates = templates_from_fields(fields);
    if templates.templates.is_empty() {
        return Ok(back(Flash::Error, "No hay plantillas que guardar."));
    }

    match state
        .api()
        .save_email_templates(&viewer.credentials, &templates)
        .await
    {
        Ok(saved) => {
            info!(count = saved.templates.len(), "Email templates saved");
            Ok(back(Flash::Success, "Plantillas guardadas."))
        }
        Err(ApiError::Forbidden(_)) => Ok(back(
            Flash::Error,
            "No tienes permiso para editar las plantillas.",
        )),
        Err(e) => Err(e.into()),
    }
}

/// Send a test email.
///
/// POST /system/config/email/test
#[instrument(skip(state, viewer, form), fields(user_id = %viewer.user.id))]
async fn send_test_email(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Form(form): Form<TestEmailForm>,
) -> Result<Redirect, AppError> {
    if form.to.trim().is_empty() {
        return Ok(back(Flash::Error, "Indica un destinatario."));
    }
    let Ok(to) = Email::parse(&form.to) else {
        return Ok(back(Flash::Error, "El destinatario no es un correo válido."));
    };

    let request = TestEmailRequest {
        to: to.into_inner(),
        subject: non_blank(form.subject.as_deref())
            .unwrap_or_else(|| DEFAULT_TEST_SUBJECT.to_string()),
        body: non_blank(form.body.as_deref()).unwrap_or_else(|| DEFAULT_TEST_BODY.to_string()),
    };

    match state
        .api()
        .send_test_email(&viewer.credentials, &request)
        .await
    {
        Ok(true) => Ok(back(
            Flash::Success,
            &format!("Correo de prueba enviado a {}.", request.to),
        )),
        Ok(false) => {
            warn!(to = %request.to, "Backend reported test email failure");
            Ok(back(
                Flash::Error,
                "El servidor no pudo enviar el correo de prueba. Revisa la configuración.",
            ))
        }
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized.into()),
        Err(e) => {
            warn!(error = %e, "Test email request failed");
            Ok(back(
                Flash::Error,
                "Error al enviar el correo de prueba. Inténtalo de nuevo.",
            ))
        }
    }
}
