//! ServiceFlow API data transfer objects.
//!
//! Field names mirror the JSON the backend sends. The console never holds an
//! authoritative copy of any of these; they live for one render or until the
//! cache drops them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use serviceflow_core::worklog::WorkInterval;
use serviceflow_core::{
    CommentId, CompanyId, EmailProvider, TicketId, TicketPriority, TicketStatus, UserId, UserRole,
    WorklogId,
};

/// Timestamp decoding that accepts RFC 3339 and offset-less ISO 8601.
///
/// Naive `datetime` columns come back without an offset; they are read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, de::Error};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| raw.parse::<NaiveDateTime>().ok().map(|n| n.and_utc()))
    }

    fn parse_or_err<E: Error>(raw: &str) -> Result<DateTime<Utc>, E> {
        parse(raw).ok_or_else(|| E::custom(format!("invalid timestamp '{raw}'")))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        parse_or_err(&String::deserialize(deserializer)?)
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .as_deref()
            .map(parse_or_err)
            .transpose()
    }
}

// =============================================================================
// Tickets
// =============================================================================

/// A helpdesk ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignee_id: Option<UserId>,
    pub requester_id: UserId,
    pub company_id: CompanyId,
}

/// Query filters for the ticket list. Empty values are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct TicketFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(rename = "q", skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl TicketFilter {
    /// Build a filter, dropping blank values.
    #[must_use]
    pub fn new(status: Option<&str>, priority: Option<&str>, search: Option<&str>) -> Self {
        let keep = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
        };
        Self {
            status: keep(status),
            priority: keep(priority),
            search: keep(search),
        }
    }

    /// Stable text form used in cache keys.
    #[must_use]
    pub fn cache_fragment(&self) -> String {
        format!(
            "s={}&p={}&q={}",
            self.status.as_deref().unwrap_or(""),
            self.priority.as_deref().unwrap_or(""),
            self.search.as_deref().unwrap_or("")
        )
    }
}

/// Body of `POST /tickets`.
#[derive(Debug, Clone, Serialize)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TicketPriority>,
}

/// Body of `PATCH /tickets/{id}`.
///
/// `assignee_id` is double-wrapped so that "leave alone" (outer `None`) and
/// "unassign" (`Some(None)`, serialised as `null`) stay distinct.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TicketPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Option<UserId>>,
}

impl TicketPatch {
    /// Patch that assigns the ticket to `user`.
    #[must_use]
    pub fn assign(user: UserId) -> Self {
        Self {
            assignee_id: Some(Some(user)),
        }
    }

    /// Patch that clears the assignee.
    #[must_use]
    pub fn unassign() -> Self {
        Self {
            assignee_id: Some(None),
        }
    }
}

/// A comment on a ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub user_id: UserId,
    pub body: String,
    pub is_public: bool,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /tickets/{id}/comments`.
#[derive(Debug, Clone, Serialize)]
pub struct NewComment {
    pub body: String,
    pub is_public: bool,
}

/// A work interval on a ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worklog {
    pub id: WorklogId,
    pub user_id: UserId,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub started_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<&Worklog> for WorkInterval {
    fn from(wl: &Worklog) -> Self {
        Self {
            started_at: wl.started_at,
            ended_at: wl.ended_at,
        }
    }
}

/// Body of `POST /tickets/{id}/resolve`.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveTicket {
    pub resolution_notes: String,
}

// =============================================================================
// Users & companies
// =============================================================================

/// A ServiceFlow user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: UserRole,
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub can_view_all_companies: bool,
}

impl User {
    /// Full name when set, otherwise the email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        serviceflow_core::text::display_name(self.full_name.as_deref(), &self.email)
    }
}

const fn default_true() -> bool {
    true
}

/// A tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
}

/// Response of `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// =============================================================================
// Dashboard
// =============================================================================

/// Headline counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Kpis {
    pub total: u64,
    pub open: u64,
    pub in_progress: u64,
    pub closed: u64,
    /// SLA compliance as a fraction in `0.0..=1.0`.
    pub sla: f64,
}

/// One point of the resolution-time trend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    pub label: String,
    pub avg_hours: f64,
}

/// Response of `GET /dashboard/overview`.
///
/// Maps use `BTreeMap` so series render in a stable order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardOverview {
    pub kpis: Kpis,
    #[serde(default)]
    pub by_status: BTreeMap<String, u64>,
    #[serde(default)]
    pub by_priority: BTreeMap<String, u64>,
    #[serde(default)]
    pub resolution_trend: Vec<TrendPoint>,
    #[serde(default)]
    pub tech_performance: BTreeMap<String, u64>,
}

// =============================================================================
// System settings
// =============================================================================

/// Response of `GET /system/email-config`. Secrets are reported only as flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailConfigOut {
    pub provider: EmailProvider,
    #[serde(default)]
    pub from_email: Option<String>,
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default)]
    pub smtp_port: Option<u16>,
    #[serde(default)]
    pub smtp_user: Option<String>,
    #[serde(default)]
    pub has_smtp_pass: bool,
    #[serde(default)]
    pub has_mailjet_keys: bool,
}

/// Body of `PUT /system/email-config`.
///
/// Absent secrets are omitted so the backend keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmailConfigIn {
    pub provider: EmailProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp_pass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mailjet_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mailjet_api_secret: Option<String>,
}

/// Subject and body of one notification template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTemplate {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

/// Body and response of `GET/PUT /system/email/templates`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTemplates {
    #[serde(default)]
    pub templates: BTreeMap<String, EmailTemplate>,
}

/// Body of `POST /system/email/test`.
#[derive(Debug, Clone, Serialize)]
pub struct TestEmailRequest {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Response of `POST /system/email/test`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestEmailResponse {
    #[serde(default)]
    pub ok: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_unassign_serializes_null() {
        let body = serde_json::to_value(TicketPatch::unassign()).unwrap();
        assert_eq!(body, json!({"assignee_id": null}));
    }

    #[test]
    fn test_assign_serializes_id() {
        let body = serde_json::to_value(TicketPatch::assign(UserId::new(7))).unwrap();
        assert_eq!(body, json!({"assignee_id": 7}));
    }

    #[test]
    fn test_ticket_filter_drops_blanks() {
        let filter = TicketFilter::new(Some(""), Some("high"), Some("  "));
        assert_eq!(serde_json::to_value(&filter).unwrap(), json!({"priority": "high"}));
    }

    #[test]
    fn test_ticket_filter_renames_search() {
        let filter = TicketFilter::new(None, None, Some("printer"));
        assert_eq!(serde_json::to_value(&filter).unwrap(), json!({"q": "printer"}));
    }

    #[test]
    fn test_ticket_decodes_minimal_payload() {
        let ticket: Ticket = serde_json::from_value(json!({
            "id": 1,
            "title": "VPN caída",
            "status": "open",
            "priority": "urgent",
            "created_at": "2025-03-10T09:00:00Z",
            "requester_id": 4,
            "company_id": 2
        }))
        .unwrap();

        assert_eq!(ticket.status, TicketStatus::Open);
        assert!(ticket.assignee_id.is_none());
        assert!(ticket.updated_at.is_none());
    }

    #[test]
    fn test_naive_timestamps_read_as_utc() {
        let ticket: Ticket = serde_json::from_value(json!({
            "id": 1,
            "title": "VPN caída",
            "status": "open",
            "priority": "urgent",
            "created_at": "2025-03-10T09:00:00.123456",
            "updated_at": "2025-03-10T10:30:00",
            "requester_id": 4,
            "company_id": 2
        }))
        .unwrap();

        assert_eq!(
            ticket.created_at.to_rfc3339(),
            "2025-03-10T09:00:00.123456+00:00"
        );
        assert_eq!(
            ticket.updated_at.unwrap().to_rfc3339(),
            "2025-03-10T10:30:00+00:00"
        );
    }

    #[test]
    fn test_worklog_mixes_offset_and_naive_timestamps() {
        let worklog: Worklog = serde_json::from_value(json!({
            "id": 3,
            "user_id": 7,
            "started_at": "2025-03-10T11:00:00+02:00",
            "ended_at": "2025-03-10T09:45:00"
        }))
        .unwrap();

        let interval = WorkInterval::from(&worklog);
        assert_eq!(
            (interval.ended_at.unwrap() - interval.started_at).num_minutes(),
            45
        );

        let open: Worklog = serde_json::from_value(json!({
            "id": 4,
            "user_id": 7,
            "started_at": "2025-03-10T09:00:00",
            "ended_at": null
        }))
        .unwrap();
        assert!(open.ended_at.is_none());
    }

    #[test]
    fn test_comment_rejects_garbage_timestamp() {
        let result = serde_json::from_value::<Comment>(json!({
            "id": 1,
            "user_id": 7,
            "body": "hola",
            "is_public": true,
            "created_at": "ayer"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_email_config_in_omits_blank_secrets() {
        let body = serde_json::to_value(EmailConfigIn {
            provider: EmailProvider::Smtp,
            smtp_host: Some("smtp.example.com".to_string()),
            smtp_port: Some(587),
            ..EmailConfigIn::default()
        })
        .unwrap();

        assert_eq!(
            body,
            json!({"provider": "smtp", "smtp_host": "smtp.example.com", "smtp_port": 587})
        );
    }

    #[test]
    fn test_dashboard_overview_defaults_missing_series() {
        let overview: DashboardOverview = serde_json::from_value(json!({
            "kpis": {"total": 10, "open": 4, "in_progress": 3, "closed": 3, "sla": 0.87}
        }))
        .unwrap();
        assert!(overview.by_status.is_empty());
        assert!(overview.resolution_trend.is_empty());
    }
}
