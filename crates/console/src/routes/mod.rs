//! HTTP route handlers for the console.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                  - Dashboard
//!
//! # Auth
//! GET  /auth/login                        - Login form
//! POST /auth/login                        - Exchange credentials for a token
//! POST /auth/logout                       - Clear the session
//!
//! # Tickets
//! GET  /tickets                           - Filterable list (+ tenant switch)
//! POST /tickets                           - Quick create
//! GET  /tickets/new                       - Full create form
//! GET  /tickets/{id}                      - Detail view
//! POST /tickets/{id}/assign               - Assign
//! POST /tickets/{id}/unassign             - Clear assignee
//! GET  /tickets/{id}/delete               - Delete confirmation
//! POST /tickets/{id}/delete               - Delete
//! POST /tickets/{id}/comments             - Add comment
//! POST /tickets/{id}/worklogs/start       - Start work timer
//! POST /tickets/{id}/worklogs/stop        - Stop work timer
//! POST /tickets/{id}/resolve              - Resolve with notes
//! POST /tickets/{id}/attachments          - Upload attachment
//!
//! # Technicians
//! GET  /techs                             - Technician cards
//! GET  /techs/{id}                        - Technician detail
//! GET  /techs/{id}/delete                 - Delete confirmation
//! POST /techs/{id}/delete                 - Delete
//!
//! # System
//! GET  /system/config                     - Configuration page
//! POST /system/config/appearance          - Dark mode and theme
//! POST /system/config/features            - Feature toggles
//! POST /system/config/email               - Email provider settings
//! POST /system/config/templates           - Email templates
//! POST /system/config/email/test          - Send a test email
//! ```
//!
//! Blocking notices become flash messages carried in `?success=` and
//! `?error=` on the redirect target.

pub mod auth;
pub mod dashboard;
pub mod system;
pub mod techs;
pub mod tickets;

use askama::Template;
use axum::{Router, response::Html};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use serviceflow_core::text::initials;

use crate::api::ApiError;
use crate::error::AppError;
use crate::filters;
use crate::middleware::Viewer;
use crate::state::AppState;

/// Build the console router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(tickets::router())
        .merge(techs::router())
        .merge(system::router())
}

// =============================================================================
// Flash messages
// =============================================================================

/// Kind of one-shot notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    Success,
    Error,
}

impl Flash {
    const fn param(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Flash messages read back from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlashQuery {
    pub success: Option<String>,
    pub error: Option<String>,
}

/// Append a flash message to `path`.
#[must_use]
pub fn flash_url(path: &str, kind: Flash, message: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(message.as_bytes()).collect();
    let sep = if path.contains('?') { '&' } else { '?' };
    format!("{path}{sep}{}={encoded}", kind.param())
}

/// Accept a form-supplied redirect target only when it is a local path.
#[must_use]
pub fn safe_return_to(candidate: Option<&str>, fallback: &str) -> String {
    match candidate.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => fallback.to_string(),
    }
}

// =============================================================================
// Layout
// =============================================================================

/// Data every page's shell needs: navigation, user badge, theme and flash.
#[derive(Debug, Clone)]
pub struct Layout {
    pub user_name: String,
    pub user_email: String,
    pub user_initials: String,
    pub role_label: &'static str,
    pub is_admin: bool,
    pub current_path: String,
    pub theme: String,
    pub dark_mode: bool,
    pub success: Option<String>,
    pub error: Option<String>,
}

impl Layout {
    #[must_use]
    pub fn new(viewer: &Viewer, current_path: &str, flash: FlashQuery) -> Self {
        let name = viewer.user.display_name();
        Self {
            user_name: name.to_string(),
            user_email: viewer.user.email.clone(),
            user_initials: initials(name),
            role_label: viewer.user.role.label(),
            is_admin: viewer.user.role.is_admin(),
            current_path: current_path.to_string(),
            theme: viewer.preferences.theme_id().to_string(),
            dark_mode: viewer.preferences.dark_mode,
            success: flash.success.filter(|s| !s.is_empty()),
            error: flash.error.filter(|s| !s.is_empty()),
        }
    }

    /// CSS class for a navigation link.
    #[must_use]
    pub fn nav_class(&self, prefix: &str) -> &'static str {
        let active = if prefix == "/" {
            self.current_path == "/"
        } else {
            self.current_path.starts_with(prefix)
        };
        if active { "nav-link active" } else { "nav-link" }
    }
}

// =============================================================================
// Shared views
// =============================================================================

/// Destructive-action confirmation page.
#[derive(Template)]
#[template(path = "confirm.html")]
pub struct ConfirmTemplate {
    pub layout: Layout,
    pub heading: String,
    pub message: String,
    pub action: String,
    pub confirm_label: &'static str,
    pub cancel_href: String,
}

/// An `<option>` of a select box.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            selected,
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Use a secondary list read, degrading to empty on failure.
///
/// An expired token still aborts the page.
///
/// # Errors
///
/// Returns `AppError::Api(ApiError::Unauthorized)` when the token expired.
pub fn or_empty<T>(result: Result<Vec<T>, ApiError>, what: &str) -> Result<Vec<T>, AppError> {
    match result {
        Ok(items) => Ok(items),
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized.into()),
        Err(e) => {
            tracing::warn!(error = %e, what, "Secondary read failed, rendering without it");
            Ok(Vec::new())
        }
    }
}

/// Render a template, logging failures.
pub fn render<T: Template>(template: &T) -> Html<String> {
    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {}", e);
        "Internal Server Error".to_string()
    }))
}

/// Timestamp as shown in lists and detail pages.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%d/%m/%Y %H:%M").to_string()
}

/// Trimmed, non-empty form value.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

/// HTML checkbox semantics: present means checked.
#[must_use]
pub fn checkbox(value: Option<&str>) -> bool {
    matches!(value, Some("on" | "true" | "1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_url_encodes() {
        assert_eq!(
            flash_url("/tickets", Flash::Success, "Ticket creado"),
            "/tickets?success=Ticket+creado"
        );
        assert_eq!(
            flash_url("/tickets?status=open", Flash::Error, "¿Qué?"),
            "/tickets?status=open&error=%C2%BFQu%C3%A9%3F"
        );
    }

    #[test]
    fn test_safe_return_to() {
        assert_eq!(safe_return_to(Some("/tickets/4"), "/"), "/tickets/4");
        assert_eq!(safe_return_to(Some("//evil.example"), "/"), "/");
        assert_eq!(safe_return_to(Some("https://evil.example"), "/"), "/");
        assert_eq!(safe_return_to(None, "/tickets"), "/tickets");
    }

    #[test]
    fn test_checkbox_and_non_blank() {
        assert!(checkbox(Some("on")));
        assert!(!checkbox(None));
        assert_eq!(non_blank(Some("  hola ")), Some("hola".to_string()));
        assert_eq!(non_blank(Some("   ")), None);
    }
}
