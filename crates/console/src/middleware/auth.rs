//! Authentication extractor and session helpers.
//!
//! The session holds the API bearer token, the logged-in user, the selected
//! tenant and the user's preferences. Handlers receive all of it through
//! [`RequireLogin`].

use axum::{
    extract::{FromRequestParts, Request},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use secrecy::{ExposeSecret, SecretString};
use tower_sessions::Session;
use tracing::warn;

use serviceflow_core::CompanyId;

use crate::api::ApiCredentials;
use crate::error::{SessionExpired, set_sentry_user};
use crate::models::{CurrentUser, Preferences, session_keys};

/// Path of the login page.
pub const LOGIN_PATH: &str = "/auth/login";

/// Everything a handler needs to act on behalf of the logged-in user.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub user: CurrentUser,
    pub credentials: ApiCredentials,
    pub preferences: Preferences,
}

impl Viewer {
    /// The selected tenant, if any.
    #[must_use]
    pub const fn company_id(&self) -> Option<CompanyId> {
        self.credentials.company_id
    }
}

/// Extractor that requires a logged-in user.
///
/// Redirects to the login page when the session has no token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireLogin(viewer): RequireLogin) -> impl IntoResponse {
///     format!("Hola, {}", viewer.user.display_name())
/// }
/// ```
pub struct RequireLogin(pub Viewer);

/// Error returned when a login is required.
#[derive(Debug)]
pub enum LoginRejection {
    /// No token in the session.
    RedirectToLogin,
    /// The session layer is not installed on this route.
    MissingSession,
}

impl IntoResponse for LoginRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::MissingSession => {
                tracing::error!("Session layer missing for authenticated route");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl<S> FromRequestParts<S> for RequireLogin
where
    S: Send + Sync,
{
    type Rejection = LoginRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(LoginRejection::MissingSession)?;

        let token: String = session
            .get(session_keys::AUTH_TOKEN)
            .await
            .ok()
            .flatten()
            .ok_or(LoginRejection::RedirectToLogin)?;

        let user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or(LoginRejection::RedirectToLogin)?;

        let company_id: Option<CompanyId> =
            session.get(session_keys::COMPANY_ID).await.ok().flatten();

        let preferences: Preferences = session
            .get(session_keys::PREFERENCES)
            .await
            .ok()
            .flatten()
            .unwrap_or_default();

        set_sentry_user(user.id, &user.email);

        Ok(Self(Viewer {
            user,
            credentials: ApiCredentials::new(Some(SecretString::from(token)), company_id),
            preferences,
        }))
    }
}

/// Store a fresh login in the session.
///
/// The session id is cycled to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn start_session(
    session: &Session,
    token: &SecretString,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session
        .insert(session_keys::AUTH_TOKEN, token.expose_secret())
        .await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Forget everything about the current session (logout).
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn end_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

/// Select a tenant, or clear the selection with `None`.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_company(
    session: &Session,
    company_id: Option<CompanyId>,
) -> Result<(), tower_sessions::session::Error> {
    match company_id {
        Some(id) => session.insert(session_keys::COMPANY_ID, id).await,
        None => {
            session
                .remove::<CompanyId>(session_keys::COMPANY_ID)
                .await?;
            Ok(())
        }
    }
}

/// Persist preferences.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_preferences(
    session: &Session,
    preferences: &Preferences,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::PREFERENCES, preferences).await
}

/// Flush the session when a handler reported that the API token expired.
///
/// Must run inside the session layer.
pub async fn expire_on_unauthorized(session: Session, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if response.extensions().get::<SessionExpired>().is_some() {
        if let Err(e) = session.flush().await {
            warn!(error = %e, "Failed to flush expired session");
        }
    }
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request as HttpRequest, header},
        routing::get,
    };
    use serviceflow_core::{UserId, UserRole};
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use super::*;

    fn user() -> CurrentUser {
        CurrentUser {
            id: UserId::new(1),
            email: "ana@acme.io".to_string(),
            full_name: Some("Ana Ruiz".to_string()),
            role: UserRole::Admin,
            company_id: None,
            can_view_all_companies: true,
        }
    }

    fn app() -> Router {
        Router::new()
            .route(
                "/login",
                get(|session: Session| async move {
                    let token = SecretString::from("tok".to_string());
                    start_session(&session, &token, &user()).await.unwrap();
                    set_company(&session, Some(CompanyId::new(4))).await.unwrap();
                    "logged in"
                }),
            )
            .route(
                "/whoami",
                get(|RequireLogin(viewer): RequireLogin| async move {
                    format!(
                        "{}|{:?}|{}",
                        viewer.user.display_name(),
                        viewer.company_id(),
                        viewer.preferences.theme
                    )
                }),
            )
            .route(
                "/report",
                get(|RequireLogin(_viewer): RequireLogin| async {
                    sentry::capture_message("ticket list failed", sentry::Level::Error);
                    "reported"
                }),
            )
            .route(
                "/expired",
                get(|| async {
                    let mut response = StatusCode::SEE_OTHER.into_response();
                    response.extensions_mut().insert(SessionExpired);
                    response
                }),
            )
            .layer(axum::middleware::from_fn(expire_on_unauthorized))
            .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false))
    }

    fn get_with_cookie(uri: &str, cookie: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn session_cookie(response: &Response) -> String {
        let raw = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        raw.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_redirects_without_session() {
        let response = app().oneshot(get_with_cookie("/whoami", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), LOGIN_PATH);
    }

    #[tokio::test]
    async fn test_viewer_loaded_from_session() {
        let app = app();
        let login = app
            .clone()
            .oneshot(get_with_cookie("/login", None))
            .await
            .unwrap();
        let cookie = session_cookie(&login);

        let response = app
            .oneshot(get_with_cookie("/whoami", Some(&cookie)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Ana Ruiz|Some(CompanyId(4))|apple-blue");
    }

    #[test]
    fn test_viewer_tags_sentry_events() {
        let events = sentry::test::with_captured_events(|| {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap()
                .block_on(async {
                    let app = app();
                    let login = app
                        .clone()
                        .oneshot(get_with_cookie("/login", None))
                        .await
                        .unwrap();
                    let cookie = session_cookie(&login);

                    app.oneshot(get_with_cookie("/report", Some(&cookie)))
                        .await
                        .unwrap();
                });
        });

        assert_eq!(events.len(), 1);
        let user = events[0].user.as_ref().unwrap();
        assert_eq!(user.id.as_deref(), Some("1"));
        assert_eq!(user.email.as_deref(), Some("ana@acme.io"));
    }

    #[tokio::test]
    async fn test_expired_marker_flushes_session() {
        let app = app();
        let login = app
            .clone()
            .oneshot(get_with_cookie("/login", None))
            .await
            .unwrap();
        let cookie = session_cookie(&login);

        app.clone()
            .oneshot(get_with_cookie("/expired", Some(&cookie)))
            .await
            .unwrap();

        let response = app
            .oneshot(get_with_cookie("/whoami", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
}
