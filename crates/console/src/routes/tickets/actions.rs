//! Ticket assignment and deletion.

use axum::{
    Form,
    extract::{Path, State},
    response::{Html, Redirect},
};
use serde::Deserialize;
use tracing::{info, instrument};

use serviceflow_core::{TicketId, UserId};

use crate::api::types::TicketPatch;
use crate::error::AppError;
use crate::middleware::RequireLogin;
use crate::routes::{
    ConfirmTemplate, Flash, FlashQuery, Layout, flash_url, render, safe_return_to,
};
use crate::state::AppState;

/// Assignment form data.
#[derive(Debug, Deserialize)]
pub struct AssignForm {
    pub assignee_id: Option<String>,
    pub return_to: Option<String>,
}

/// Form carrying only the redirect target.
#[derive(Debug, Default, Deserialize)]
pub struct ReturnForm {
    pub return_to: Option<String>,
}

fn back(return_to: Option<&str>, id: TicketId) -> String {
    safe_return_to(return_to, &format!("/tickets/{id}"))
}

/// Assign a ticket. An empty selection is ignored.
///
/// POST /tickets/{id}/assign
#[instrument(skip(state, viewer, form), fields(user_id = %viewer.user.id))]
pub async fn assign(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Path(id): Path<TicketId>,
    Form(form): Form<AssignForm>,
) -> Result<Redirect, AppError> {
    let target = back(form.return_to.as_deref(), id);

    let raw = form.assignee_id.as_deref().map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Ok(Redirect::to(&target));
    }
    let Ok(assignee) = raw.parse::<UserId>() else {
        return Ok(Redirect::to(&flash_url(
            &target,
            Flash::Error,
            "Técnico no válido.",
        )));
    };

    state
        .api()
        .update_ticket(&viewer.credentials, id, &TicketPatch::assign(assignee))
        .await?;
    info!(ticket_id = %id, assignee = %assignee, "Ticket assigned");

    Ok(Redirect::to(&flash_url(&target, Flash::Success, "Ticket asignado.")))
}

/// Clear a ticket's assignee.
///
/// POST /tickets/{id}/unassign
#[instrument(skip(state, viewer, form), fields(user_id = %viewer.user.id))]
pub async fn unassign(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Path(id): Path<TicketId>,
    Form(form): Form<ReturnForm>,
) -> Result<Redirect, AppError> {
    state
        .api()
        .update_ticket(&viewer.credentials, id, &TicketPatch::unassign())
        .await?;
    info!(ticket_id = %id, "Ticket unassigned");

    Ok(Redirect::to(&flash_url(
        &back(form.return_to.as_deref(), id),
        Flash::Success,
        "Ticket sin asignar.",
    )))
}

/// Ask before deleting.
///
/// GET /tickets/{id}/delete
#[instrument(skip(state, viewer))]
pub async fn confirm_delete(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Path(id): Path<TicketId>,
) -> Result<Html<String>, AppError> {
    let ticket = state.api().get_ticket(&viewer.credentials, id).await?;

    Ok(render(&ConfirmTemplate {
        layout: Layout::new(&viewer, "/tickets", FlashQuery::default()),
        heading: format!("¿Eliminar el ticket #{id}?"),
        message: format!(
            "\"{}\" se eliminará definitivamente junto con sus comentarios y tiempos.",
            ticket.title
        ),
        action: format!("/tickets/{id}/delete"),
        confirm_label: "Eliminar",
        cancel_href: format!("/tickets/{id}"),
    }))
}

/// Delete a ticket.
///
/// POST /tickets/{id}/delete
#[instrument(skip(state, viewer), fields(user_id = %viewer.user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Path(id): Path<TicketId>,
) -> Result<Redirect, AppError> {
    state.api().delete_ticket(&viewer.credentials, id).await?;
    info!(ticket_id = %id, "Ticket deleted");

    Ok(Redirect::to(&flash_url(
        "/tickets",
        Flash::Success,
        &format!("Ticket #{id} eliminado."),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_defaults_to_detail() {
        assert_eq!(back(None, TicketId::new(4)), "/tickets/4");
        assert_eq!(back(Some("/tickets?status=open"), TicketId::new(4)), "/tickets?status=open");
        assert_eq!(back(Some("http://evil"), TicketId::new(4)), "/tickets/4");
    }
}
