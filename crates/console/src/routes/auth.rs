//! Authentication route handlers.
//!
//! The console holds no credentials of its own: logging in exchanges the
//! user's email and password for a ServiceFlow bearer token, which is kept
//! in the server-side session together with the `/auth/me` profile.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use serviceflow_core::Email;

use crate::api::{ApiCredentials, ApiError};
use crate::error::AppError;
use crate::middleware::auth::LOGIN_PATH;
use crate::middleware::{end_session, start_session};
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

use super::{Flash, FlashQuery, flash_url, render};

/// Login page template.
#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login_page).post(login))
        .route("/auth/logout", post(logout))
}

/// Display the login page.
///
/// GET /auth/login
async fn login_page(session: Session, Query(flash): Query<FlashQuery>) -> Response {
    let logged_in = session
        .get::<String>(session_keys::AUTH_TOKEN)
        .await
        .ok()
        .flatten()
        .is_some();
    if logged_in {
        return Redirect::to("/").into_response();
    }

    render(&LoginTemplate {
        error: flash.error,
        success: flash.success,
    })
    .into_response()
}

/// Exchange credentials for a token and open a session.
///
/// POST /auth/login
#[instrument(skip(state, session, form), fields(email = %form.email))]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let Ok(email) = Email::parse(&form.email) else {
        return Ok(login_error("Introduce un correo electrónico válido."));
    };
    if form.password.is_empty() {
        return Ok(login_error("Introduce tu contraseña."));
    }

    let token = match state.api().login(email.as_str(), &form.password).await {
        Ok(token) => token,
        Err(
            ApiError::Unauthorized
            | ApiError::Forbidden(_)
            | ApiError::Status {
                status: 400 | 422, ..
            },
        ) => {
            warn!("Login rejected");
            return Ok(login_error("Credenciales incorrectas."));
        }
        Err(e) => return Err(e.into()),
    };

    let credentials = ApiCredentials::new(Some(token.clone()), None);
    let user = CurrentUser::from(state.api().me(&credentials).await?);

    start_session(&session, &token, &user).await?;
    info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok(Redirect::to("/").into_response())
}

/// Clear the session.
///
/// POST /auth/logout
#[instrument(skip(session))]
async fn logout(session: Session) -> Result<Redirect, AppError> {
    end_session(&session).await?;
    Ok(Redirect::to(&flash_url(
        LOGIN_PATH,
        Flash::Success,
        "Sesión cerrada.",
    )))
}

fn login_error(message: &str) -> Response {
    Redirect::to(&flash_url(LOGIN_PATH, Flash::Error, message)).into_response()
}
