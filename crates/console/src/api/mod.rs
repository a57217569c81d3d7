//! ServiceFlow REST API client.
//!
//! # Architecture
//!
//! - The backend is the source of truth; the console keeps no copy beyond
//!   the short-lived [`ResponseCache`]
//! - Every request carries the session's bearer token and, when a tenant is
//!   selected, the `X-Company-Id` header
//! - Paths are normalised to a trailing slash because the backend answers
//!   slash-less paths with a 307 redirect that drops `Authorization`
//! - No retries: failures surface to the handler as [`ApiError`]
//!
//! # Example
//!
//! ```rust,ignore
//! let client = ServiceFlowClient::new(&config.api, config.cache_ttl)?;
//! let creds = ApiCredentials::new(Some(token), Some(CompanyId::new(3)));
//!
//! let tickets = client.list_tickets(&creds, &TicketFilter::new(Some("open"), None, None)).await?;
//! client.update_ticket(&creds, tickets[0].id, &TicketPatch::unassign()).await?;
//! ```

pub mod cache;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use serviceflow_core::{CompanyId, TicketId, UserId};

use crate::config::ApiConfig;

pub use cache::{CacheKind, CacheValue, ResponseCache};
use types::{
    Comment, Company, DashboardOverview, EmailConfigIn, EmailConfigOut, EmailTemplates,
    LoginRequest, NewComment, NewTicket, ResolveTicket, TestEmailRequest, TestEmailResponse,
    Ticket, TicketFilter, TicketPatch, TokenResponse, User, Worklog,
};

/// Header carrying the selected tenant.
pub const COMPANY_HEADER: &str = "X-Company-Id";

/// Errors that can occur when talking to the ServiceFlow API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connection refused, timeout, TLS).
    #[error("ServiceFlow request failed: {0}")]
    Request(String),

    /// The token is missing, expired or revoked.
    #[error("Not authenticated with ServiceFlow")]
    Unauthorized,

    /// The user may not perform this action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The resource does not exist (or is outside the tenant).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("ServiceFlow returned {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The response body did not match the expected shape.
    #[error("Unexpected ServiceFlow response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Per-request identity, taken from the console session.
#[derive(Debug, Clone, Default)]
pub struct ApiCredentials {
    pub token: Option<SecretString>,
    pub company_id: Option<CompanyId>,
}

impl ApiCredentials {
    #[must_use]
    pub const fn new(token: Option<SecretString>, company_id: Option<CompanyId>) -> Self {
        Self { token, company_id }
    }

    /// Credentials for unauthenticated calls (login).
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            token: None,
            company_id: None,
        }
    }
}

/// Append a trailing slash unless the path already has one or carries a
/// query string.
///
/// ```
/// use serviceflow_console::api::normalize_path;
///
/// assert_eq!(normalize_path("/tickets"), "/tickets/");
/// assert_eq!(normalize_path("/tickets/123/"), "/tickets/123/");
/// assert_eq!(normalize_path("/search?q=vpn"), "/search?q=vpn");
/// ```
#[must_use]
pub fn normalize_path(path: &str) -> String {
    if path.contains('?') || path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

/// Client for the ServiceFlow REST API.
#[derive(Clone)]
pub struct ServiceFlowClient {
    inner: Arc<ServiceFlowClientInner>,
}

struct ServiceFlowClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: ResponseCache,
}

impl std::fmt::Debug for ServiceFlowClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceFlowClient")
            .field("base_url", &self.inner.base_url)
            .field("cache", &self.inner.cache)
            .finish_non_exhaustive()
    }
}

impl ServiceFlowClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Request` if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig, cache_ttl: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("serviceflow-console/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ServiceFlowClientInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                cache: ResponseCache::new(cache_ttl),
            }),
        })
    }

    /// The read cache shared by all requests.
    #[must_use]
    pub fn cache(&self) -> &ResponseCache {
        &self.inner.cache
    }

    /// Absolute URL for `path` with optional query pairs.
    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}{}", self.inner.base_url, normalize_path(path)))
            .map_err(|e| ApiError::Request(format!("invalid URL for {path}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Start a request with auth and tenant headers applied.
    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        creds: &ApiCredentials,
    ) -> Result<RequestBuilder, ApiError> {
        let mut builder = self.inner.client.request(method, self.url(path, query)?);
        if let Some(token) = &creds.token {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(company) = creds.company_id {
            builder = builder.header(COMPANY_HEADER, company.to_string());
        }
        Ok(builder)
    }

    /// Send and decode a JSON response.
    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = check_status(builder.send().await?).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Send and discard the response body.
    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        check_status(builder.send().await?).await?;
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        creds: &ApiCredentials,
    ) -> Result<T, ApiError> {
        self.send_json(self.request(Method::GET, path, query, creds)?)
            .await
    }

    async fn write_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        creds: &ApiCredentials,
    ) -> Result<T, ApiError> {
        self.send_json(self.request(method, path, &[], creds)?.json(body))
            .await
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Whether the API root answers at all.
    pub async fn ping(&self) -> bool {
        match self.inner.client.get(&self.inner.base_url).send().await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "ServiceFlow API unreachable");
                false
            }
        }
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Exchange credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for bad credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<SecretString, ApiError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let token: TokenResponse = self
            .write_json(Method::POST, "/auth/login", &body, &ApiCredentials::anonymous())
            .await?;
        debug!(token_type = ?token.token_type, "Logged in to ServiceFlow");
        Ok(SecretString::from(token.access_token))
    }

    /// The authenticated user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` when the token is no longer valid.
    #[instrument(skip(self, creds))]
    pub async fn me(&self, creds: &ApiCredentials) -> Result<User, ApiError> {
        let key = ResponseCache::key(CacheKind::Me, creds, "");
        if let Some(CacheValue::Me(user)) = self.cache().get(&key).await {
            return Ok(*user);
        }
        let user: User = self.get_json("/auth/me", &[], creds).await?;
        self.cache()
            .insert(key, CacheValue::Me(Box::new(user.clone())))
            .await;
        Ok(user)
    }

    // =========================================================================
    // Dashboard
    // =========================================================================

    /// KPI and chart data for the dashboard.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, creds))]
    pub async fn dashboard_overview(
        &self,
        creds: &ApiCredentials,
    ) -> Result<DashboardOverview, ApiError> {
        let key = ResponseCache::key(CacheKind::Overview, creds, "");
        if let Some(CacheValue::Overview(overview)) = self.cache().get(&key).await {
            return Ok(*overview);
        }
        let overview: DashboardOverview = self.get_json("/dashboard/overview", &[], creds).await?;
        self.cache()
            .insert(key, CacheValue::Overview(Box::new(overview.clone())))
            .await;
        Ok(overview)
    }

    // =========================================================================
    // Tickets
    // =========================================================================

    /// Tickets visible to the user, filtered server-side.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, creds))]
    pub async fn list_tickets(
        &self,
        creds: &ApiCredentials,
        filter: &TicketFilter,
    ) -> Result<Vec<Ticket>, ApiError> {
        let key = ResponseCache::key(CacheKind::Tickets, creds, &filter.cache_fragment());
        if let Some(CacheValue::Tickets(tickets)) = self.cache().get(&key).await {
            return Ok(tickets);
        }

        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(status) = filter.status.as_deref() {
            query.push(("status", status));
        }
        if let Some(priority) = filter.priority.as_deref() {
            query.push(("priority", priority));
        }
        if let Some(search) = filter.search.as_deref() {
            query.push(("q", search));
        }

        let tickets: Vec<Ticket> = self.get_json("/tickets", &query, creds).await?;
        self.cache()
            .insert(key, CacheValue::Tickets(tickets.clone()))
            .await;
        Ok(tickets)
    }

    /// A single ticket.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the ticket does not exist.
    #[instrument(skip(self, creds))]
    pub async fn get_ticket(&self, creds: &ApiCredentials, id: TicketId) -> Result<Ticket, ApiError> {
        let key = ResponseCache::key(CacheKind::Ticket, creds, &id.to_string());
        if let Some(CacheValue::Ticket(ticket)) = self.cache().get(&key).await {
            return Ok(*ticket);
        }
        let ticket: Ticket = self.get_json(&format!("/tickets/{id}"), &[], creds).await?;
        self.cache()
            .insert(key, CacheValue::Ticket(Box::new(ticket.clone())))
            .await;
        Ok(ticket)
    }

    /// Create a ticket.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend rejects the ticket.
    #[instrument(skip(self, creds, ticket), fields(title = %ticket.title))]
    pub async fn create_ticket(
        &self,
        creds: &ApiCredentials,
        ticket: &NewTicket,
    ) -> Result<Ticket, ApiError> {
        let created: Ticket = self
            .write_json(Method::POST, "/tickets", ticket, creds)
            .await?;
        self.cache().invalidate(&[CacheKind::Tickets, CacheKind::Overview]);
        Ok(created)
    }

    /// Partially update a ticket (assignment, status, priority).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the update fails.
    #[instrument(skip(self, creds, patch))]
    pub async fn update_ticket(
        &self,
        creds: &ApiCredentials,
        id: TicketId,
        patch: &TicketPatch,
    ) -> Result<Ticket, ApiError> {
        let updated: Ticket = self
            .write_json(Method::PATCH, &format!("/tickets/{id}"), patch, creds)
            .await?;
        self.cache().invalidate(&[CacheKind::Tickets, CacheKind::Overview]);
        self.cache().invalidate_ticket(id, &[CacheKind::Ticket]);
        Ok(updated)
    }

    /// Delete a ticket.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the deletion fails.
    #[instrument(skip(self, creds))]
    pub async fn delete_ticket(&self, creds: &ApiCredentials, id: TicketId) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::DELETE, &format!("/tickets/{id}"), &[], creds)?)
            .await?;
        self.cache().invalidate(&[CacheKind::Tickets, CacheKind::Overview]);
        self.cache().invalidate_ticket(
            id,
            &[CacheKind::Ticket, CacheKind::Comments, CacheKind::Worklogs],
        );
        Ok(())
    }

    /// Comments on a ticket, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, creds))]
    pub async fn list_comments(
        &self,
        creds: &ApiCredentials,
        id: TicketId,
    ) -> Result<Vec<Comment>, ApiError> {
        let key = ResponseCache::key(CacheKind::Comments, creds, &id.to_string());
        if let Some(CacheValue::Comments(comments)) = self.cache().get(&key).await {
            return Ok(comments);
        }
        let comments: Vec<Comment> = self
            .get_json(&format!("/tickets/{id}/comments"), &[], creds)
            .await?;
        self.cache()
            .insert(key, CacheValue::Comments(comments.clone()))
            .await;
        Ok(comments)
    }

    /// Add a comment to a ticket.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, creds, comment), fields(is_public = comment.is_public))]
    pub async fn add_comment(
        &self,
        creds: &ApiCredentials,
        id: TicketId,
        comment: &NewComment,
    ) -> Result<Comment, ApiError> {
        let created: Comment = self
            .write_json(Method::POST, &format!("/tickets/{id}/comments"), comment, creds)
            .await?;
        self.cache().invalidate_ticket(id, &[CacheKind::Comments]);
        Ok(created)
    }

    /// The current user's work intervals on a ticket.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, creds))]
    pub async fn list_worklogs(
        &self,
        creds: &ApiCredentials,
        id: TicketId,
    ) -> Result<Vec<Worklog>, ApiError> {
        let key = ResponseCache::key(CacheKind::Worklogs, creds, &id.to_string());
        if let Some(CacheValue::Worklogs(worklogs)) = self.cache().get(&key).await {
            return Ok(worklogs);
        }
        let worklogs: Vec<Worklog> = self
            .get_json(&format!("/tickets/{id}/worklogs"), &[], creds)
            .await?;
        self.cache()
            .insert(key, CacheValue::Worklogs(worklogs.clone()))
            .await;
        Ok(worklogs)
    }

    /// Open a work interval on a ticket.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend refuses (e.g. work already running).
    #[instrument(skip(self, creds))]
    pub async fn start_work(&self, creds: &ApiCredentials, id: TicketId) -> Result<(), ApiError> {
        self.worklog_action(creds, id, "start").await
    }

    /// Close the open work interval on a ticket.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend refuses (e.g. nothing running).
    #[instrument(skip(self, creds))]
    pub async fn stop_work(&self, creds: &ApiCredentials, id: TicketId) -> Result<(), ApiError> {
        self.worklog_action(creds, id, "stop").await
    }

    async fn worklog_action(
        &self,
        creds: &ApiCredentials,
        id: TicketId,
        action: &str,
    ) -> Result<(), ApiError> {
        let result = self
            .send_empty(self.request(
                Method::POST,
                &format!("/tickets/{id}/worklogs/{action}"),
                &[],
                creds,
            )?)
            .await;
        // The interval list is stale whether or not the call succeeded.
        self.cache().invalidate_ticket(id, &[CacheKind::Worklogs]);
        result
    }

    /// Resolve a ticket with closing notes.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, creds, notes))]
    pub async fn resolve_ticket(
        &self,
        creds: &ApiCredentials,
        id: TicketId,
        notes: &str,
    ) -> Result<(), ApiError> {
        let body = ResolveTicket {
            resolution_notes: notes.to_string(),
        };
        self.send_empty(
            self.request(Method::POST, &format!("/tickets/{id}/resolve"), &[], creds)?
                .json(&body),
        )
        .await?;
        self.cache().invalidate(&[CacheKind::Tickets, CacheKind::Overview]);
        self.cache()
            .invalidate_ticket(id, &[CacheKind::Ticket, CacheKind::Worklogs]);
        Ok(())
    }

    /// Upload a file attachment to a ticket.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the content type is invalid or the upload fails.
    #[instrument(skip(self, creds, bytes), fields(size = bytes.len()))]
    pub async fn upload_attachment(
        &self,
        creds: &ApiCredentials,
        id: TicketId,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| ApiError::Request(format!("invalid content type: {e}")))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        self.send_empty(
            self.request(Method::POST, &format!("/tickets/{id}/attachments"), &[], creds)?
                .multipart(form),
        )
        .await?;
        self.cache().invalidate_ticket(id, &[CacheKind::Ticket]);
        Ok(())
    }

    // =========================================================================
    // Users & companies
    // =========================================================================

    /// Users in the current tenant, optionally restricted to one role.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, creds))]
    pub async fn list_users(
        &self,
        creds: &ApiCredentials,
        role_filter: Option<&str>,
    ) -> Result<Vec<User>, ApiError> {
        let kind = if role_filter == Some("tech") {
            CacheKind::Techs
        } else {
            CacheKind::Users
        };
        let key = ResponseCache::key(kind, creds, role_filter.unwrap_or(""));
        if let Some(CacheValue::Users(users)) = self.cache().get(&key).await {
            return Ok(users);
        }

        let query: Vec<(&str, &str)> = role_filter
            .map(|role| vec![("role_filter", role)])
            .unwrap_or_default();
        let users: Vec<User> = self.get_json("/users", &query, creds).await?;
        self.cache()
            .insert(key, CacheValue::Users(users.clone()))
            .await;
        Ok(users)
    }

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the deletion fails.
    #[instrument(skip(self, creds))]
    pub async fn delete_user(&self, creds: &ApiCredentials, id: UserId) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::DELETE, &format!("/users/{id}"), &[], creds)?)
            .await?;
        self.cache()
            .invalidate(&[CacheKind::Users, CacheKind::Techs, CacheKind::Overview]);
        Ok(())
    }

    /// Tenants visible to the user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, creds))]
    pub async fn list_companies(&self, creds: &ApiCredentials) -> Result<Vec<Company>, ApiError> {
        let key = ResponseCache::key(CacheKind::Companies, creds, "");
        if let Some(CacheValue::Companies(companies)) = self.cache().get(&key).await {
            return Ok(companies);
        }
        let companies: Vec<Company> = self.get_json("/companies", &[], creds).await?;
        self.cache()
            .insert(key, CacheValue::Companies(companies.clone()))
            .await;
        Ok(companies)
    }

    // =========================================================================
    // System settings
    // =========================================================================

    /// Current email delivery settings.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, creds))]
    pub async fn email_config(&self, creds: &ApiCredentials) -> Result<EmailConfigOut, ApiError> {
        let key = ResponseCache::key(CacheKind::EmailConfig, creds, "");
        if let Some(CacheValue::EmailConfig(config)) = self.cache().get(&key).await {
            return Ok(*config);
        }
        let config: EmailConfigOut = self.get_json("/system/email-config", &[], creds).await?;
        self.cache()
            .insert(key, CacheValue::EmailConfig(Box::new(config.clone())))
            .await;
        Ok(config)
    }

    /// Replace email delivery settings (superadmin only).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` for non-superadmins.
    #[instrument(skip(self, creds, config), fields(provider = %config.provider))]
    pub async fn save_email_config(
        &self,
        creds: &ApiCredentials,
        config: &EmailConfigIn,
    ) -> Result<EmailConfigOut, ApiError> {
        let saved: EmailConfigOut = self
            .write_json(Method::PUT, "/system/email-config", config, creds)
            .await?;
        self.cache().invalidate(&[CacheKind::EmailConfig]);
        Ok(saved)
    }

    /// Notification email templates.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, creds))]
    pub async fn email_templates(&self, creds: &ApiCredentials) -> Result<EmailTemplates, ApiError> {
        let key = ResponseCache::key(CacheKind::EmailTemplates, creds, "");
        if let Some(CacheValue::EmailTemplates(templates)) = self.cache().get(&key).await {
            return Ok(templates);
        }
        let templates: EmailTemplates = self.get_json("/system/email/templates", &[], creds).await?;
        self.cache()
            .insert(key, CacheValue::EmailTemplates(templates.clone()))
            .await;
        Ok(templates)
    }

    /// Replace notification email templates.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self, creds, templates), fields(count = templates.templates.len()))]
    pub async fn save_email_templates(
        &self,
        creds: &ApiCredentials,
        templates: &EmailTemplates,
    ) -> Result<EmailTemplates, ApiError> {
        let saved: EmailTemplates = self
            .write_json(Method::PUT, "/system/email/templates", templates, creds)
            .await?;
        self.cache().invalidate(&[CacheKind::EmailTemplates]);
        Ok(saved)
    }

    /// Ask the backend to send a test email with the current settings.
    ///
    /// Returns the backend's `ok` flag.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request itself fails.
    #[instrument(skip(self, creds, request), fields(to = %request.to))]
    pub async fn send_test_email(
        &self,
        creds: &ApiCredentials,
        request: &TestEmailRequest,
    ) -> Result<bool, ApiError> {
        let response: TestEmailResponse = self
            .write_json(Method::POST, "/system/email/test", request, creds)
            .await?;
        Ok(response.ok)
    }
}

/// Map non-success responses to [`ApiError`].
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = error_detail(&body);
    debug!(status = status.as_u16(), detail = %detail, "ServiceFlow error response");

    Err(match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::FORBIDDEN => ApiError::Forbidden(detail),
        StatusCode::NOT_FOUND => ApiError::NotFound(detail),
        _ => ApiError::Status {
            status: status.as_u16(),
            detail,
        },
    })
}

/// Extract a readable message from an error body.
///
/// The backend answers `{"detail": "..."}`, or a list of validation errors
/// with `msg` fields for 422s. Anything else is returned verbatim.
fn error_detail(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    match value.get("detail") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
            .collect::<Vec<_>>()
            .join("; "),
        Some(other) => other.to_string(),
        None => body.trim().to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> ServiceFlowClient {
        let config = ApiConfig::new(&format!("{}/api/v1", server.uri())).unwrap();
        ServiceFlowClient::new(&config, Duration::from_secs(30)).unwrap()
    }

    fn creds() -> ApiCredentials {
        ApiCredentials::new(
            Some(SecretString::from("tok-123".to_string())),
            Some(CompanyId::new(9)),
        )
    }

    fn ticket_json(id: i64) -> serde_json::Value {
        json!({
            "id": id,
            "title": "Impresora sin conexión",
            "description": "No imprime desde ayer",
            "status": "open",
            "priority": "high",
            "created_at": "2025-03-10T09:00:00Z",
            "updated_at": null,
            "assignee_id": null,
            "requester_id": 4,
            "company_id": 9
        })
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/tickets"), "/tickets/");
        assert_eq!(normalize_path("/tickets/"), "/tickets/");
        assert_eq!(normalize_path("/tickets/12"), "/tickets/12/");
        assert_eq!(normalize_path("/search?q=x"), "/search?q=x");
    }

    #[test]
    fn test_error_detail() {
        assert_eq!(error_detail(r#"{"detail":"Ticket not found"}"#), "Ticket not found");
        assert_eq!(
            error_detail(r#"{"detail":[{"msg":"field required"},{"msg":"too short"}]}"#),
            "field required; too short"
        );
        assert_eq!(error_detail("Bad Gateway\n"), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_requests_carry_token_tenant_and_trailing_slash() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/tickets/"))
            .and(header("authorization", "Bearer tok-123"))
            .and(header("x-company-id", "9"))
            .and(query_param("status", "open"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([ticket_json(1)])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let filter = TicketFilter::new(Some("open"), Some(""), None);
        let tickets = client.list_tickets(&creds(), &filter).await.unwrap();

        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].id, TicketId::new(1));
    }

    #[tokio::test]
    async fn test_empty_filters_are_not_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/tickets/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .list_tickets(&creds(), &TicketFilter::default())
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.query().is_none());
    }

    #[tokio::test]
    async fn test_list_reads_are_cached_until_mutation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/tickets/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([ticket_json(1)])))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/api/v1/tickets/1/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ticket_json(1)))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let filter = TicketFilter::default();
        client.list_tickets(&creds(), &filter).await.unwrap();
        client.list_tickets(&creds(), &filter).await.unwrap();

        client
            .update_ticket(&creds(), TicketId::new(1), &TicketPatch::assign(UserId::new(3)))
            .await
            .unwrap();
        client.cache().sync().await;
        client.list_tickets(&creds(), &filter).await.unwrap();
    }

    #[tokio::test]
    async fn test_unassign_sends_null() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/v1/tickets/5/"))
            .and(body_json(json!({"assignee_id": null})))
            .respond_with(ResponseTemplate::new(200).set_body_json(ticket_json(5)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .update_ticket(&creds(), TicketId::new(5), &TicketPatch::unassign())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/auth/me/"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/tickets/77/"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"detail": "Ticket not found"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/v1/system/email-config/"))
            .respond_with(ResponseTemplate::new(422).set_body_json(
                json!({"detail": [{"msg": "string does not match regex"}]}),
            ))
            .mount(&server)
            .await;

        let client = client_for(&server);

        assert!(matches!(client.me(&creds()).await, Err(ApiError::Unauthorized)));
        assert!(matches!(
            client.get_ticket(&creds(), TicketId::new(77)).await,
            Err(ApiError::NotFound(ref d)) if d == "Ticket not found"
        ));
        assert!(matches!(
            client.save_email_config(&creds(), &EmailConfigIn::default()).await,
            Err(ApiError::Status { status: 422, ref detail }) if detail == "string does not match regex"
        ));
    }

    #[tokio::test]
    async fn test_login_is_anonymous() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login/"))
            .and(body_json(json!({"email": "ana@acme.io", "password": "pw"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "new-token", "token_type": "bearer"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let token = client.login("ana@acme.io", "pw").await.unwrap();
        assert_eq!(token.expose_secret(), "new-token");

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
        assert!(requests[0].headers.get("x-company-id").is_none());
    }

    #[tokio::test]
    async fn test_techs_use_role_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users/"))
            .and(query_param("role_filter", "tech"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 3,
                "email": "tech@acme.io",
                "full_name": "Luis Pérez",
                "role": "tech",
                "company_id": 9,
                "is_active": true,
                "can_view_all_companies": false
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let techs = client.list_users(&creds(), Some("tech")).await.unwrap();
        assert_eq!(techs[0].display_name(), "Luis Pérez");
    }

    #[tokio::test]
    async fn test_worklog_failure_still_invalidates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/tickets/2/worklogs/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/tickets/2/worklogs/start/"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"detail": "already running"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.list_worklogs(&creds(), TicketId::new(2)).await.unwrap();
        assert!(client.start_work(&creds(), TicketId::new(2)).await.is_err());
        client.cache().sync().await;
        client.list_worklogs(&creds(), TicketId::new(2)).await.unwrap();
    }
}
