//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use serviceflow_core::{CompanyId, UserId, UserRole};

use crate::api::types::User;

/// Session-stored identity of the logged-in user.
///
/// Loaded once from `/auth/me` at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub company_id: Option<CompanyId>,
    pub can_view_all_companies: bool,
}

impl CurrentUser {
    /// Full name when set, otherwise the email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        serviceflow_core::text::display_name(self.full_name.as_deref(), &self.email)
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            company_id: user.company_id,
            can_view_all_companies: user.can_view_all_companies,
        }
    }
}

/// Session keys.
pub mod keys {
    /// Bearer token for the ServiceFlow API.
    pub const AUTH_TOKEN: &str = "auth_token";

    /// Selected tenant, absent for "all companies".
    pub const COMPANY_ID: &str = "company_id";

    /// The logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Appearance and feature toggles.
    pub const PREFERENCES: &str = "preferences";
}
