//! Ticket list, tenant switch and creation.

use askama::Template;
use axum::{
    Form,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use serviceflow_core::text::{DEFAULT_EXCERPT_LEN, excerpt};
use serviceflow_core::{CompanyId, TicketPriority};

use crate::api::CacheKind;
use crate::api::types::{NewTicket, Ticket, TicketFilter};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireLogin, set_company};
use crate::routes::{
    Flash, FlashQuery, Layout, SelectOption, flash_url, format_timestamp, non_blank, or_empty,
    render, safe_return_to,
};
use crate::state::AppState;

use super::{BadgeView, assignee_options, company_name, priority_options, status_options};

// =============================================================================
// Templates
// =============================================================================

/// One row of the ticket table.
#[derive(Debug, Clone)]
pub struct TicketRow {
    pub id: i64,
    pub title: String,
    pub excerpt: String,
    pub status: BadgeView,
    pub priority: BadgeView,
    pub company: String,
    pub has_assignee: bool,
    pub assignees: Vec<SelectOption>,
    pub created_at: String,
}

/// Ticket list template.
#[derive(Template)]
#[template(path = "tickets/index.html")]
pub struct TicketListTemplate {
    pub layout: Layout,
    pub tickets: Vec<TicketRow>,
    pub status_options: Vec<SelectOption>,
    pub priority_options: Vec<SelectOption>,
    pub company_options: Vec<SelectOption>,
    pub new_priority_options: Vec<SelectOption>,
    pub search: String,
    pub return_to: String,
}

/// Full create form template.
#[derive(Template)]
#[template(path = "tickets/new.html")]
pub struct NewTicketTemplate {
    pub layout: Layout,
    pub priority_options: Vec<SelectOption>,
}

// =============================================================================
// Query & form types
// =============================================================================

/// List filters. A present `company` switches the session tenant.
#[derive(Debug, Default, Deserialize)]
pub struct TicketListQuery {
    pub company: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub q: Option<String>,
}

impl TicketListQuery {
    fn filter(&self) -> TicketFilter {
        TicketFilter::new(
            self.status.as_deref(),
            self.priority.as_deref(),
            self.q.as_deref(),
        )
    }
}

/// Quick and full create form data.
#[derive(Debug, Deserialize)]
pub struct CreateTicketForm {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub return_to: Option<String>,
}

impl CreateTicketForm {
    /// Validate into an API payload.
    fn into_new_ticket(self) -> Result<NewTicket, &'static str> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err("El título es obligatorio.");
        }
        Ok(NewTicket {
            title: title.to_string(),
            description: self.description.unwrap_or_default().trim().to_string(),
            priority: non_blank(self.priority.as_deref()).map(TicketPriority::from),
        })
    }
}

/// Parse the `company` query value: blank clears the tenant.
fn parse_company(raw: &str) -> Result<Option<CompanyId>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<CompanyId>()
        .map(Some)
        .map_err(|_| AppError::BadRequest(format!("Empresa no válida: {raw}")))
}

/// Path back to the list with the current filters, without flash params.
fn list_path(filter: &TicketFilter) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if let Some(status) = &filter.status {
        query.append_pair("status", status);
    }
    if let Some(priority) = &filter.priority {
        query.append_pair("priority", priority);
    }
    if let Some(search) = &filter.search {
        query.append_pair("q", search);
    }
    let query = query.finish();
    if query.is_empty() {
        "/tickets".to_string()
    } else {
        format!("/tickets?{query}")
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Render the ticket list.
///
/// GET /tickets
#[instrument(skip(state, session, viewer, flash), fields(user_id = %viewer.user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireLogin(mut viewer): RequireLogin,
    Query(query): Query<TicketListQuery>,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    if let Some(raw) = query.company.as_deref() {
        let company = parse_company(raw)?;
        if company != viewer.company_id() {
            set_company(&session, company).await?;
            state.api().cache().invalidate(&[
                CacheKind::Tickets,
                CacheKind::Companies,
                CacheKind::Users,
            ]);
            info!(company = ?company, "Switched tenant");
            viewer.credentials.company_id = company;
        }
    }

    let filter = query.filter();
    let creds = &viewer.credentials;
    let (tickets, companies, users) = tokio::join!(
        state.api().list_tickets(creds, &filter),
        state.api().list_companies(creds),
        state.api().list_users(creds, None),
    );
    let tickets = tickets?;
    let companies = or_empty(companies, "companies")?;
    let users = or_empty(users, "users")?;

    let rows = tickets
        .iter()
        .map(|t| row(t, &companies, &users))
        .collect();

    let selected_company = viewer.company_id();
    let company_options = std::iter::once(SelectOption::new(
        "",
        "Todas las empresas",
        selected_company.is_none(),
    ))
    .chain(companies.iter().map(|c| {
        SelectOption::new(c.id.to_string(), c.name.clone(), Some(c.id) == selected_company)
    }))
    .collect();

    let template = TicketListTemplate {
        layout: Layout::new(&viewer, "/tickets", flash),
        tickets: rows,
        status_options: status_options(filter.status.as_deref()),
        priority_options: priority_options(filter.priority.as_deref(), Some("Todas")),
        company_options,
        new_priority_options: priority_options(Some("normal"), None),
        search: filter.search.clone().unwrap_or_default(),
        return_to: list_path(&filter),
    };

    Ok(render(&template))
}

fn row(
    ticket: &Ticket,
    companies: &[crate::api::types::Company],
    users: &[crate::api::types::User],
) -> TicketRow {
    TicketRow {
        id: ticket.id.get(),
        title: ticket.title.clone(),
        excerpt: excerpt(ticket.description.as_deref(), DEFAULT_EXCERPT_LEN),
        status: BadgeView::from(&ticket.status),
        priority: BadgeView::from(&ticket.priority),
        company: company_name(companies, ticket.company_id),
        has_assignee: ticket.assignee_id.is_some(),
        assignees: assignee_options(users, ticket.assignee_id),
        created_at: format_timestamp(&ticket.created_at),
    }
}

/// Render the full create form.
///
/// GET /tickets/new
#[instrument(skip(viewer, flash))]
pub async fn new_form(
    RequireLogin(viewer): RequireLogin,
    Query(flash): Query<FlashQuery>,
) -> Html<String> {
    render(&NewTicketTemplate {
        layout: Layout::new(&viewer, "/tickets", flash),
        priority_options: priority_options(Some("normal"), None),
    })
}

/// Create a ticket.
///
/// POST /tickets
///
/// With `return_to` (quick create on the list) the user is sent back there;
/// otherwise to the new ticket's page.
#[instrument(skip(state, viewer, form), fields(user_id = %viewer.user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireLogin(viewer): RequireLogin,
    Form(form): Form<CreateTicketForm>,
) -> Result<Response, AppError> {
    let return_to = form
        .return_to
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| safe_return_to(Some(s), "/tickets"));
    let error_target = return_to.clone().unwrap_or_else(|| "/tickets/new".to_string());

    let new_ticket = match form.into_new_ticket() {
        Ok(t) => t,
        Err(message) => {
            return Ok(Redirect::to(&flash_url(&error_target, Flash::Error, message)).into_response());
        }
    };

    let created = state
        .api()
        .create_ticket(&viewer.credentials, &new_ticket)
        .await?;
    info!(ticket_id = %created.id, "Ticket created");

    let target = return_to.unwrap_or_else(|| format!("/tickets/{}", created.id));
    Ok(Redirect::to(&flash_url(
        &target,
        Flash::Success,
        &format!("Ticket #{} creado.", created.id),
    ))
    .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(title: &str, priority: Option<&str>) -> CreateTicketForm {
        CreateTicketForm {
            title: title.to_string(),
            description: Some("  detalle \n".to_string()),
            priority: priority.map(ToOwned::to_owned),
            return_to: None,
        }
    }

    #[test]
    fn test_blank_title_rejected() {
        assert!(form("   ", None).into_new_ticket().is_err());
    }

    #[test]
    fn test_create_payload_trims_and_skips_blank_priority() {
        let ticket = form(" Impresora ", Some("")).into_new_ticket().unwrap();
        assert_eq!(ticket.title, "Impresora");
        assert_eq!(ticket.description, "detalle");
        assert!(ticket.priority.is_none());

        let ticket = form("VPN", Some("urgent")).into_new_ticket().unwrap();
        assert_eq!(ticket.priority, Some(TicketPriority::Urgent));
    }

    #[test]
    fn test_parse_company() {
        assert_eq!(parse_company("").unwrap(), None);
        assert_eq!(parse_company(" 3 ").unwrap(), Some(CompanyId::new(3)));
        assert!(parse_company("acme").is_err());
    }

    #[test]
    fn test_list_path_keeps_filters() {
        assert_eq!(list_path(&TicketFilter::default()), "/tickets");
        let filter = TicketFilter::new(Some("open"), None, Some("red caída"));
        assert_eq!(list_path(&filter), "/tickets?status=open&q=red+ca%C3%ADda");
    }
}
