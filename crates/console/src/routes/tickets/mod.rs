//! Ticket route handlers.
//!
//! - `list`: filterable list, tenant switch and creation
//! - `actions`: assignment and deletion
//! - `detail`: detail page, comments, work timer, resolution, attachments

pub mod actions;
pub mod detail;
pub mod list;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use serviceflow_core::{CompanyId, TicketPriority, TicketStatus, UserId};

use crate::api::types::{Company, User};
use crate::state::AppState;

use super::SelectOption;

/// Largest attachment accepted by the console.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Build the tickets router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tickets", get(list::index).post(list::create))
        .route("/tickets/new", get(list::new_form))
        .route("/tickets/{id}", get(detail::show))
        .route("/tickets/{id}/assign", post(actions::assign))
        .route("/tickets/{id}/unassign", post(actions::unassign))
        .route(
            "/tickets/{id}/delete",
            get(actions::confirm_delete).post(actions::delete),
        )
        .route("/tickets/{id}/comments", post(detail::add_comment))
        .route("/tickets/{id}/worklogs/start", post(detail::start_work))
        .route("/tickets/{id}/worklogs/stop", post(detail::stop_work))
        .route("/tickets/{id}/resolve", post(detail::resolve))
        .route(
            "/tickets/{id}/attachments",
            post(detail::upload_attachment).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
}

/// A status or priority pill.
#[derive(Debug, Clone)]
pub struct BadgeView {
    pub label: String,
    pub class: &'static str,
}

impl From<&TicketStatus> for BadgeView {
    fn from(status: &TicketStatus) -> Self {
        Self {
            label: status.label().to_string(),
            class: status.badge().css_class(),
        }
    }
}

impl From<&TicketPriority> for BadgeView {
    fn from(priority: &TicketPriority) -> Self {
        Self {
            label: priority.label().to_string(),
            class: priority.badge().css_class(),
        }
    }
}

/// Tenant name, falling back to the numeric id.
#[must_use]
pub fn company_name(companies: &[Company], id: CompanyId) -> String {
    companies
        .iter()
        .find(|c| c.id == id)
        .map_or_else(|| id.to_string(), |c| c.name.clone())
}

/// User name for display, or `None` when the user is not in `users`.
#[must_use]
pub fn user_name(users: &[User], id: UserId) -> Option<String> {
    users
        .iter()
        .find(|u| u.id == id)
        .map(|u| u.display_name().to_string())
}

/// Options for an assignee selector. Inactive users stay listed so a ticket
/// held by a deactivated technician still shows its assignee.
#[must_use]
pub fn assignee_options(users: &[User], selected: Option<UserId>) -> Vec<SelectOption> {
    users
        .iter()
        .map(|u| {
            let label = if u.is_active {
                u.display_name().to_string()
            } else {
                format!("{} (inactivo)", u.display_name())
            };
            SelectOption::new(u.id.to_string(), label, Some(u.id) == selected)
        })
        .collect()
}

/// Status filter options; the empty value means "all".
#[must_use]
pub fn status_options(selected: Option<&str>) -> Vec<SelectOption> {
    std::iter::once(SelectOption::new("", "Todos", selected.is_none()))
        .chain(TicketStatus::ALL.iter().map(|s| {
            SelectOption::new(s.as_str(), s.filter_label(), selected == Some(s.as_str()))
        }))
        .collect()
}

/// Priority options. `any_label` adds a leading empty option.
#[must_use]
pub fn priority_options(selected: Option<&str>, any_label: Option<&str>) -> Vec<SelectOption> {
    any_label
        .map(|label| SelectOption::new("", label, selected.is_none()))
        .into_iter()
        .chain(TicketPriority::ALL.iter().map(|p| {
            SelectOption::new(p.as_str(), p.label(), selected == Some(p.as_str()))
        }))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serviceflow_core::UserRole;

    use super::*;

    fn user(id: i64, name: Option<&str>, active: bool) -> User {
        User {
            id: UserId::new(id),
            email: format!("u{id}@acme.io"),
            full_name: name.map(ToOwned::to_owned),
            role: UserRole::Tech,
            company_id: None,
            is_active: active,
            can_view_all_companies: false,
        }
    }

    #[test]
    fn test_company_name_falls_back_to_id() {
        let companies = vec![Company {
            id: CompanyId::new(1),
            name: "Acme".to_string(),
        }];
        assert_eq!(company_name(&companies, CompanyId::new(1)), "Acme");
        assert_eq!(company_name(&companies, CompanyId::new(7)), "7");
    }

    #[test]
    fn test_assignee_options_mark_selected_and_flag_inactive() {
        let users = vec![
            user(1, Some("Ana"), true),
            user(2, None, true),
            user(3, Some("Baja"), false),
        ];
        let options = assignee_options(&users, Some(UserId::new(2)));

        assert_eq!(options.len(), 3);
        assert!(!options[0].selected);
        assert!(options[1].selected);
        assert_eq!(options[1].label, "u2@acme.io");
        assert_eq!(options[2].label, "Baja (inactivo)");
    }

    #[test]
    fn test_inactive_assignee_stays_selected() {
        let users = vec![user(3, Some("Baja"), false)];
        let options = assignee_options(&users, Some(UserId::new(3)));

        assert_eq!(options.len(), 1);
        assert!(options[0].selected);
        assert_eq!(options[0].value, "3");
    }

    #[test]
    fn test_status_options_default_to_all() {
        let options = status_options(None);
        assert_eq!(options.len(), 5);
        assert!(options[0].selected);

        let options = status_options(Some("paused"));
        assert!(options.iter().any(|o| o.value == "paused" && o.selected));
    }

    #[test]
    fn test_priority_options_without_any() {
        let options = priority_options(Some("high"), None);
        assert_eq!(options.len(), 4);
        assert!(options.iter().any(|o| o.value == "high" && o.selected));
    }
}
