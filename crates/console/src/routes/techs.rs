//! Technician management route handlers.

use askama::Template;
use axum::{
    Router,
    extract::{Path, Query, State},
    response::{Html, Redirect},
    routing::get,
};
use tracing::{info, instrument};

use serviceflow_core::UserId;
use serviceflow_core::text::initials;

use crate::api::types::{Company, User};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireLogin;
use crate::state::AppState;

use super::tickets::company_name;
use super::{ConfirmTemplate, Flash, FlashQuery, Layout, flash_url, or_empty, render};

/// Role filter for the technicians list.
const TECH_ROLE: &str = "tech";

/// Seconds between automatic reloads of the technicians page.
pub const REFRESH_SECS: u32 = 30;

/// Placeholder for credentials the console never sees.
const MASKED_PASSWORD: &str = "••••••••";

/// One technician card.
#[derive(Debug, Clone)]
pub struct TechCard {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub initials: String,
    pub masked_password: &'static str,
    pub company: String,
    pub is_active: bool,
    pub scope_label: &'static str,
    pub role_label: &'static str,
}

impl TechCard {
    fn new(user: &User, companies: &[Company]) -> Self {
        let name = user.display_name();
        Self {
            id: user.id.get(),
            name: name.to_string(),
            email: user.email.clone(),
            initials: initials(name),
            masked_password: MASKED_PASSWORD,
            company: user
                .company_id
                .map_or_else(|| "Sin empresa".to_string(), |id| company_name(companies, id)),
            is_active: user.is_active,
            scope_label: if user.can_view_all_companies {
                "Visión global"
            } else {
                "Solo su empresa"
            },
            role_label: user.role.label(),
        }
    }
}

/// Technicians list template.
#[derive(Template)]
#[template(path = "techs/index.html")]
pub struct TechListTemplate {
    pub layout: Layout,
    pub techs: Vec<TechCard>,
    pub refresh_secs: u32,
}

/// Technician detail template.
#[derive(Template)]
#[template(path = "techs/show.html")]
pub struct TechDetailTemplate {
    pub layout: Layout,
    pub tech: TechCard,
}

/// Build the technicians router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/techs", get(index))
        .route("/techs/{id}", get(show))
        .route("/techs/{id}/delete", get(confirm_delete).post(delete))
}

async fn load_techs(
    state: &AppState,
    viewer: &crate::middleware::Viewer,
) -> Result<(Vec<User>, Vec<Company>), AppError> {
    let creds = &viewer.credentials;
    let (techs, companies) = tokio::join!(
        state.api().list_users(creds, Some(TECH_ROLE)),
        state.api().list_companies(creds),
    );
    Ok((techs?, or_empty(companies, "companies")?))
}

async fn find_tech(
    state: &AppState,
    viewer: &crate::middleware::Viewer,
    id: UserId,
) -> Result<TechCard, AppError> {
    let (techs, companies) = load_techs(state, viewer).await?;
    techs
        .iter()
        .find(|u| u.id == id)
        .map(|u| TechCard::new(u, &companies))
        .ok_or_else(|| AppError::NotFound(format!("technician {id}")))
}

/// Render the technician cards.
///
/// GET /techs
#[instrument(skip(state, viewer, flash), fields(user_id = %viewer.user.id))]
async fn index(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    let (techs, companies) = load_techs(&state, &viewer).await?;

    Ok(render(&TechListTemplate {
        layout: Layout::new(&viewer, "/techs", flash),
        techs: techs.iter().map(|u| TechCard::new(u, &companies)).collect(),
        refresh_secs: REFRESH_SECS,
    }))
}

/// Render one technician.
///
/// GET /techs/{id}
#[instrument(skip(state, viewer, flash))]
async fn show(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Path(id): Path<UserId>,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    let tech = find_tech(&state, &viewer, id).await?;

    Ok(render(&TechDetailTemplate {
        layout: Layout::new(&viewer, "/techs", flash),
        tech,
    }))
}

/// Ask before deleting.
///
/// GET /techs/{id}/delete
#[instrument(skip(state, viewer))]
async fn confirm_delete(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Path(id): Path<UserId>,
) -> Result<Html<String>, AppError> {
    let tech = find_tech(&state, &viewer, id).await?;

    Ok(render(&ConfirmTemplate {
        layout: Layout::new(&viewer, "/techs", FlashQuery::default()),
        heading: format!("¿Eliminar a {}?", tech.name),
        message: format!(
            "La cuenta {} dejará de tener acceso a ServiceFlow.",
            tech.email
        ),
        action: format!("/techs/{id}/delete"),
        confirm_label: "Eliminar técnico",
        cancel_href: "/techs".to_string(),
    }))
}

/// Delete a technician.
///
/// POST /techs/{id}/delete
#[instrument(skip(state, viewer), fields(user_id = %viewer.user.id))]
async fn delete(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Path(id): Path<UserId>,
) -> Result<Redirect, AppError> {
    state.api().delete_user(&viewer.credentials, id).await?;
    info!(tech_id = %id, "Technician deleted");

    Ok(Redirect::to(&flash_url(
        "/techs",
        Flash::Success,
        "Técnico eliminado.",
    )))
}
