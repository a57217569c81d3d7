//! Unified error handling for the console.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use thiserror::Error;

use serviceflow_core::UserId;

use crate::api::ApiError;
use crate::middleware::auth::LOGIN_PATH;
use crate::routes::{Flash, flash_url};

/// Response extension telling the session middleware to drop the session.
#[derive(Debug, Clone, Copy)]
pub struct SessionExpired;

/// Application-level error type for the console.
#[derive(Debug, Error)]
pub enum AppError {
    /// ServiceFlow API call failed.
    #[error("ServiceFlow error: {0}")]
    Api(#[from] ApiError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Standalone error page.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub title: &'static str,
    pub message: String,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Api(ApiError::Unauthorized) => StatusCode::SEE_OTHER,
            Self::Api(ApiError::NotFound(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Api(ApiError::Forbidden(_)) => StatusCode::FORBIDDEN,
            Self::Api(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Api(ApiError::Request(_) | ApiError::Status { .. } | ApiError::Decode(_))
                | Self::Session(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Api(ApiError::Unauthorized)) {
            tracing::info!("ServiceFlow rejected the session token, logging out");
            let mut response = Redirect::to(&flash_url(
                LOGIN_PATH,
                Flash::Error,
                "Tu sesión ha expirado. Inicia sesión de nuevo.",
            ))
            .into_response();
            response.extensions_mut().insert(SessionExpired);
            return response;
        }

        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Console request error"
            );
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let (title, message) = match &self {
            Self::Api(ApiError::NotFound(_)) | Self::NotFound(_) => (
                "No encontrado",
                "El recurso solicitado no existe.".to_string(),
            ),
            Self::Api(ApiError::Forbidden(detail)) => ("Acceso denegado", detail.clone()),
            Self::Api(_) => (
                "Servicio no disponible",
                "No se pudo contactar con ServiceFlow. Inténtalo de nuevo.".to_string(),
            ),
            Self::BadRequest(detail) => ("Solicitud no válida", detail.clone()),
            Self::Session(_) => (
                "Error interno",
                "Se produjo un error inesperado.".to_string(),
            ),
        };

        let page = ErrorTemplate {
            status: status.as_u16(),
            title,
            message,
        };
        let body = page.render().unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to render error page");
            page.message.clone()
        });

        (status, Html(body)).into_response()
    }
}

/// Tag the current request's Sentry scope with the logged-in user.
///
/// Each request runs on its own hub, so this is called per request by the
/// login extractor.
pub fn set_sentry_user(user_id: UserId, email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use axum::http::header;

    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("ticket 12".to_string());
        assert_eq!(err.to_string(), "Not found: ticket 12");

        let err = AppError::BadRequest("missing title".to_string());
        assert_eq!(err.to_string(), "Bad request: missing title");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Api(ApiError::NotFound("x".to_string()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Api(ApiError::Forbidden("x".to_string()))),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Api(ApiError::Status {
                status: 500,
                detail: "boom".to_string()
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Api(ApiError::Request("refused".to_string()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::BadRequest("x".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_unauthorized_redirects_and_expires_session() {
        let response = AppError::Api(ApiError::Unauthorized).into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers().get(header::LOCATION);
        assert!(location.is_some_and(|l| l.to_str().is_ok_and(|l| l.starts_with("/auth/login?error="))));
        assert!(response.extensions().get::<SessionExpired>().is_some());
    }
}
