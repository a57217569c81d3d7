//! Ticket detail page and the actions posted from it.

use askama::Template;
use axum::{
    Form,
    extract::{Multipart, Path, Query, State},
    response::{Html, Redirect},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use serviceflow_core::TicketId;
use serviceflow_core::worklog::{WorkInterval, format_hhmm, has_active_work, minutes_worked};

use crate::api::types::{Comment, NewComment, User, Worklog};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireLogin;
use crate::routes::{
    Flash, FlashQuery, Layout, SelectOption, checkbox, flash_url, format_timestamp, or_empty,
    render,
};
use crate::state::AppState;

use super::{BadgeView, assignee_options, company_name, user_name};

// =============================================================================
// Templates
// =============================================================================

/// Ticket header and metadata.
#[derive(Debug, Clone)]
pub struct TicketView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: BadgeView,
    pub priority: BadgeView,
    pub is_closed: bool,
    pub company: String,
    pub requester: String,
    pub created_at: String,
    pub updated_at: String,
    pub has_assignee: bool,
}

/// One comment in the thread.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub author: String,
    pub created_at: String,
    pub body: String,
    pub is_public: bool,
}

/// Time control panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkView {
    /// Worked time as `HH:MM`.
    pub hhmm: String,
    /// Worked time in whole seconds, seed for the client-side ticker.
    pub seconds: i64,
    /// Whether an interval is open.
    pub active: bool,
}

impl WorkView {
    fn from_worklogs(worklogs: &[Worklog], now: chrono::DateTime<Utc>) -> Self {
        let intervals: Vec<WorkInterval> = worklogs.iter().map(WorkInterval::from).collect();
        let millis: i64 = intervals.iter().map(|i| i.elapsed_ms(now)).sum();
        Self {
            hhmm: format_hhmm(minutes_worked(&intervals, now)),
            seconds: millis / 1000,
            active: has_active_work(&intervals),
        }
    }
}

/// Ticket detail template.
#[derive(Template)]
#[template(path = "tickets/show.html")]
pub struct TicketDetailTemplate {
    pub layout: Layout,
    pub ticket: TicketView,
    pub assignees: Vec<SelectOption>,
    pub work: WorkView,
    pub comments: Vec<CommentView>,
}

// =============================================================================
// Forms
// =============================================================================

/// Comment form data. An unchecked `is_public` box is absent.
#[derive(Debug, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub body: String,
    pub is_public: Option<String>,
}

/// Resolution form data.
#[derive(Debug, Deserialize)]
pub struct ResolveForm {
    #[serde(default)]
    pub resolution_notes: String,
}

fn detail_path(id: TicketId) -> String {
    format!("/tickets/{id}")
}

fn comment_author(users: &[User], comment: &Comment) -> String {
    user_name(users, comment.user_id).unwrap_or_else(|| "Usuario".to_string())
}

// =============================================================================
// Handlers
// =============================================================================

/// Render the ticket detail page.
///
/// GET /tickets/{id}
#[instrument(skip(state, viewer, flash), fields(user_id = %viewer.user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Path(id): Path<TicketId>,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    let creds = &viewer.credentials;
    let api = state.api();
    let (ticket, comments, worklogs, users, companies) = tokio::join!(
        api.get_ticket(creds, id),
        api.list_comments(creds, id),
        api.list_worklogs(creds, id),
        api.list_users(creds, None),
        api.list_companies(creds),
    );
    let ticket = ticket?;
    let comments = or_empty(comments, "comments")?;
    let worklogs = or_empty(worklogs, "worklogs")?;
    let users = or_empty(users, "users")?;
    let companies = or_empty(companies, "companies")?;

    let view = TicketView {
        id: ticket.id.get(),
        title: ticket.title.clone(),
        description: ticket.description.clone().unwrap_or_default(),
        status: BadgeView::from(&ticket.status),
        priority: BadgeView::from(&ticket.priority),
        is_closed: ticket.status.is_closed(),
        company: company_name(&companies, ticket.company_id),
        requester: user_name(&users, ticket.requester_id)
            .unwrap_or_else(|| format!("Usuario #{}", ticket.requester_id)),
        created_at: format_timestamp(&ticket.created_at),
        updated_at: ticket
            .updated_at
            .as_ref()
            .map_or_else(|| "Sin actualizar".to_string(), format_timestamp),
        has_assignee: ticket.assignee_id.is_some(),
    };

    let comments = comments
        .iter()
        .map(|c| CommentView {
            author: comment_author(&users, c),
            created_at: format_timestamp(&c.created_at),
            body: c.body.clone(),
            is_public: c.is_public,
        })
        .collect();

    let template = TicketDetailTemplate {
        layout: Layout::new(&viewer, "/tickets", flash),
        ticket: view,
        assignees: assignee_options(&users, ticket.assignee_id),
        work: WorkView::from_worklogs(&worklogs, Utc::now()),
        comments,
    };

    Ok(render(&template))
}

/// Add a comment.
///
/// POST /tickets/{id}/comments
#[instrument(skip(state, viewer, form), fields(user_id = %viewer.user.id))]
pub async fn add_comment(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Path(id): Path<TicketId>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect, AppError> {
    let body = form.body.trim();
    if body.is_empty() {
        return Ok(Redirect::to(&flash_url(
            &detail_path(id),
            Flash::Error,
            "El comentario no puede estar vacío.",
        )));
    }

    let comment = NewComment {
        body: body.to_string(),
        is_public: checkbox(form.is_public.as_deref()),
    };
    state
        .api()
        .add_comment(&viewer.credentials, id, &comment)
        .await?;
    info!(ticket_id = %id, is_public = comment.is_public, "Comment added");

    Ok(Redirect::to(&flash_url(
        &detail_path(id),
        Flash::Success,
        "Comentario publicado.",
    )))
}

/// Start the work timer. Failures are logged and otherwise ignored.
///
/// POST /tickets/{id}/worklogs/start
#[instrument(skip(state, viewer), fields(user_id = %viewer.user.id))]
pub async fn start_work(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Path(id): Path<TicketId>,
) -> Redirect {
    if let Err(e) = state.api().start_work(&viewer.credentials, id).await {
        warn!(ticket_id = %id, error = %e, "Failed to start work");
    }
    Redirect::to(&detail_path(id))
}

/// Stop the work timer. Failures are logged and otherwise ignored.
///
/// POST /tickets/{id}/worklogs/stop
#[instrument(skip(state, viewer), fields(user_id = %viewer.user.id))]
pub async fn stop_work(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Path(id): Path<TicketId>,
) -> Redirect {
    if let Err(e) = state.api().stop_work(&viewer.credentials, id).await {
        warn!(ticket_id = %id, error = %e, "Failed to stop work");
    }
    Redirect::to(&detail_path(id))
}

/// Resolve a ticket. Notes are required.
///
/// POST /tickets/{id}/resolve
#[instrument(skip(state, viewer, form), fields(user_id = %viewer.user.id))]
pub async fn resolve(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Path(id): Path<TicketId>,
    Form(form): Form<ResolveForm>,
) -> Result<Redirect, AppError> {
    let notes = form.resolution_notes.trim();
    if notes.is_empty() {
        return Ok(Redirect::to(&flash_url(
            &detail_path(id),
            Flash::Error,
            "Escribe las notas de resolución.",
        )));
    }

    state
        .api()
        .resolve_ticket(&viewer.credentials, id, notes)
        .await?;
    info!(ticket_id = %id, "Ticket resolved");

    Ok(Redirect::to(&flash_url(
        &detail_path(id),
        Flash::Success,
        "Ticket resuelto.",
    )))
}

/// Forward an uploaded file to the API.
///
/// POST /tickets/{id}/attachments
#[instrument(skip(state, viewer, multipart), fields(user_id = %viewer.user.id))]
pub async fn upload_attachment(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Path(id): Path<TicketId>,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .filter(|n| !n.is_empty())
            .unwrap_or("adjunto")
            .to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        if !bytes.is_empty() {
            upload = Some((file_name, content_type, bytes.to_vec()));
        }
        break;
    }

    let Some((file_name, content_type, bytes)) = upload else {
        return Ok(Redirect::to(&flash_url(
            &detail_path(id),
            Flash::Error,
            "Selecciona un archivo.",
        )));
    };

    state
        .api()
        .upload_attachment(&viewer.credentials, id, &file_name, &content_type, bytes)
        .await?;
    info!(ticket_id = %id, file_name = %file_name, "Attachment uploaded");

    Ok(Redirect::to(&flash_url(
        &detail_path(id),
        Flash::Success,
        "Archivo adjuntado.",
    )))
}
