//! Status and classification enums for ServiceFlow resources.
//!
//! Ticket status, priority and user role arrive from the backend as plain
//! strings. Values outside the known set decode into an `Other` variant so a
//! new backend state never breaks a whole listing.

use serde::{Deserialize, Serialize};

/// Badge colours used by the console templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BadgeColor {
    Slate,
    Green,
    Yellow,
    Red,
    Blue,
    Purple,
}

impl BadgeColor {
    /// CSS classes for a pill badge of this colour.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Slate => "bg-slate-100 text-slate-700",
            Self::Green => "bg-green-100 text-green-700",
            Self::Yellow => "bg-yellow-100 text-yellow-800",
            Self::Red => "bg-red-100 text-red-700",
            Self::Blue => "bg-blue-100 text-blue-700",
            Self::Purple => "bg-purple-100 text-purple-700",
        }
    }

    /// CSS class for a chart bar fill of this colour.
    #[must_use]
    pub const fn bar_class(self) -> &'static str {
        match self {
            Self::Slate => "bar-slate",
            Self::Green => "bar-green",
            Self::Yellow => "bar-yellow",
            Self::Red => "bar-red",
            Self::Blue => "bar-blue",
            Self::Purple => "bar-purple",
        }
    }
}

/// Ticket lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TicketStatus {
    Open,
    InProgress,
    Paused,
    Closed,
    /// A status this console does not know about.
    Other(String),
}

impl TicketStatus {
    /// The known statuses, in filter-dropdown order.
    pub const ALL: [Self; 4] = [Self::Open, Self::InProgress, Self::Paused, Self::Closed];

    /// Wire value sent to and received from the API.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Paused => "paused",
            Self::Closed => "closed",
            Self::Other(s) => s,
        }
    }

    /// Singular display label.
    ///
    /// Unknown statuses render as resolved, matching how the list view has
    /// always treated anything past `paused`.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Open => "Abierto",
            Self::InProgress => "En Progreso",
            Self::Paused => "Pausado",
            Self::Closed | Self::Other(_) => "Resuelto",
        }
    }

    /// Label for a status series key. Unknown keys are kept as received so
    /// distinct backend statuses stay distinguishable.
    #[must_use]
    pub fn chart_label(&self) -> &str {
        match self {
            Self::Other(s) => s,
            known => known.label(),
        }
    }

    /// Plural label used in the status filter.
    #[must_use]
    pub const fn filter_label(&self) -> &'static str {
        match self {
            Self::Open => "Abiertos",
            Self::InProgress => "En Progreso",
            Self::Paused => "Pausados",
            Self::Closed | Self::Other(_) => "Resueltos",
        }
    }

    /// Badge colour.
    #[must_use]
    pub const fn badge(&self) -> BadgeColor {
        match self {
            Self::Open => BadgeColor::Blue,
            Self::InProgress => BadgeColor::Yellow,
            Self::Paused => BadgeColor::Purple,
            Self::Closed => BadgeColor::Green,
            Self::Other(_) => BadgeColor::Slate,
        }
    }

    /// Whether the ticket is closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl From<String> for TicketStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "open" => Self::Open,
            "in_progress" => Self::InProgress,
            "paused" => Self::Paused,
            "closed" => Self::Closed,
            _ => Self::Other(s),
        }
    }
}

impl From<TicketStatus> for String {
    fn from(status: TicketStatus) -> Self {
        match status {
            TicketStatus::Other(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket priority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TicketPriority {
    Low,
    Normal,
    High,
    Urgent,
    Other(String),
}

impl TicketPriority {
    /// The known priorities, lowest first.
    pub const ALL: [Self; 4] = [Self::Low, Self::Normal, Self::High, Self::Urgent];

    /// Wire value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
            Self::Other(s) => s,
        }
    }

    /// Display label.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Low => "Baja",
            Self::Normal => "Media",
            Self::High => "Alta",
            Self::Urgent => "Urgente",
            Self::Other(s) => s,
        }
    }

    /// Badge colour.
    #[must_use]
    pub const fn badge(&self) -> BadgeColor {
        match self {
            Self::Urgent => BadgeColor::Red,
            Self::High => BadgeColor::Yellow,
            Self::Low => BadgeColor::Slate,
            Self::Normal | Self::Other(_) => BadgeColor::Blue,
        }
    }
}

impl From<String> for TicketPriority {
    fn from(s: String) -> Self {
        match s.as_str() {
            "low" => Self::Low,
            "normal" => Self::Normal,
            "high" => Self::High,
            "urgent" => Self::Urgent,
            _ => Self::Other(s),
        }
    }
}

impl From<TicketPriority> for String {
    fn from(priority: TicketPriority) -> Self {
        match priority {
            TicketPriority::Other(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User role within a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserRole {
    /// Platform-wide administrator; the only role allowed to edit email settings.
    SuperAdmin,
    Admin,
    Tech,
    User,
    Other(String),
}

impl UserRole {
    /// Wire value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::SuperAdmin => "superadmin",
            Self::Admin => "admin",
            Self::Tech => "tech",
            Self::User => "user",
            Self::Other(s) => s,
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "Superadmin",
            Self::Admin => "Administrador",
            Self::Tech => "Técnico",
            Self::User | Self::Other(_) => "Usuario",
        }
    }

    /// Whether the role may send test emails (superadmin and admin).
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Admin)
    }
}

impl From<String> for UserRole {
    fn from(s: String) -> Self {
        match s.as_str() {
            "superadmin" => Self::SuperAdmin,
            "admin" => Self::Admin,
            "tech" => Self::Tech,
            "user" => Self::User,
            _ => Self::Other(s),
        }
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Other(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound email delivery provider configured on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    Smtp,
    #[default]
    Mailjet,
    Console,
    Disabled,
}

impl EmailProvider {
    /// All providers, in the order the configuration form lists them.
    pub const ALL: [Self; 4] = [Self::Mailjet, Self::Smtp, Self::Console, Self::Disabled];

    /// Wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Smtp => "smtp",
            Self::Mailjet => "mailjet",
            Self::Console => "console",
            Self::Disabled => "disabled",
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Mailjet => "Mailjet (recomendado)",
            Self::Smtp => "SMTP",
            Self::Console => "Consola (debug)",
            Self::Disabled => "Deshabilitado",
        }
    }
}

impl std::fmt::Display for EmailProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EmailProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "smtp" => Ok(Self::Smtp),
            "mailjet" => Ok(Self::Mailjet),
            "console" => Ok(Self::Console),
            "disabled" => Ok(Self::Disabled),
            _ => Err(format!("invalid email provider: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_status_decodes_known_values() {
        let status: TicketStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(status, TicketStatus::InProgress);
        assert_eq!(status.label(), "En Progreso");
        assert_eq!(status.badge(), BadgeColor::Yellow);
    }

    #[test]
    fn test_ticket_status_keeps_unknown_values() {
        let status: TicketStatus = serde_json::from_str("\"waiting_vendor\"").unwrap();
        assert_eq!(status, TicketStatus::Other("waiting_vendor".to_string()));
        assert_eq!(status.label(), "Resuelto");
        assert_eq!(status.badge(), BadgeColor::Slate);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"waiting_vendor\"");
    }

    #[test]
    fn test_chart_label_keeps_unknown_keys() {
        assert_eq!(TicketStatus::Closed.chart_label(), "Resuelto");
        assert_eq!(
            TicketStatus::from("cancelled".to_string()).chart_label(),
            "cancelled"
        );
    }

    #[test]
    fn test_paused_is_purple() {
        assert_eq!(TicketStatus::Paused.badge(), BadgeColor::Purple);
        assert_eq!(TicketStatus::Paused.filter_label(), "Pausados");
    }

    #[test]
    fn test_priority_badges() {
        assert_eq!(TicketPriority::Urgent.badge(), BadgeColor::Red);
        assert_eq!(TicketPriority::High.badge(), BadgeColor::Yellow);
        assert_eq!(TicketPriority::Low.badge(), BadgeColor::Slate);
        assert_eq!(TicketPriority::Normal.badge(), BadgeColor::Blue);
        assert_eq!(
            TicketPriority::from("critical".to_string()).badge(),
            BadgeColor::Blue
        );
    }

    #[test]
    fn test_priority_normal_is_labelled_media() {
        assert_eq!(TicketPriority::Normal.label(), "Media");
    }

    #[test]
    fn test_user_role_roundtrip() {
        let role: UserRole = serde_json::from_str("\"superadmin\"").unwrap();
        assert_eq!(role, UserRole::SuperAdmin);
        assert!(role.is_admin());
        assert!(!UserRole::Tech.is_admin());
        assert_eq!(serde_json::to_string(&UserRole::Tech).unwrap(), "\"tech\"");
    }

    #[test]
    fn test_email_provider_parse() {
        assert_eq!("smtp".parse::<EmailProvider>().unwrap(), EmailProvider::Smtp);
        assert!("sendgrid".parse::<EmailProvider>().is_err());
        assert_eq!(EmailProvider::default(), EmailProvider::Mailjet);
    }

    #[test]
    fn test_email_provider_serde() {
        let json = serde_json::to_string(&EmailProvider::Console).unwrap();
        assert_eq!(json, "\"console\"");
        let back: EmailProvider = serde_json::from_str("\"disabled\"").unwrap();
        assert_eq!(back, EmailProvider::Disabled);
    }
}
