//! Short-lived cache of API reads.
//!
//! Keys have the form `<kind>:<scope>:<detail>`. The scope is a digest of the
//! bearer token and tenant id, so two users (or one user looking at two
//! tenants) never see each other's entries. Mutations invalidate by kind
//! across every scope, since the backend state changed for everyone.

use std::time::Duration;

use moka::future::Cache;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use tracing::warn;

use serviceflow_core::TicketId;

use super::ApiCredentials;
use super::types::{
    Comment, Company, DashboardOverview, EmailConfigOut, EmailTemplates, Ticket, User, Worklog,
};

/// Resource families that can be cached and invalidated together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Me,
    Overview,
    Tickets,
    Ticket,
    Comments,
    Worklogs,
    Users,
    Techs,
    Companies,
    EmailConfig,
    EmailTemplates,
}

impl CacheKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Me => "me",
            Self::Overview => "overview",
            Self::Tickets => "tickets",
            Self::Ticket => "ticket",
            Self::Comments => "comments",
            Self::Worklogs => "worklogs",
            Self::Users => "users",
            Self::Techs => "techs",
            Self::Companies => "companies",
            Self::EmailConfig => "email-config",
            Self::EmailTemplates => "email-templates",
        }
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Me(Box<User>),
    Overview(Box<DashboardOverview>),
    Tickets(Vec<Ticket>),
    Ticket(Box<Ticket>),
    Comments(Vec<Comment>),
    Worklogs(Vec<Worklog>),
    Users(Vec<User>),
    Companies(Vec<Company>),
    EmailConfig(Box<EmailConfigOut>),
    EmailTemplates(EmailTemplates),
}

/// Scoped response cache.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Cache<String, CacheValue>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

impl ResponseCache {
    /// Create a cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .support_invalidation_closures()
            .build();
        Self { inner }
    }

    /// Build the key for `kind` as seen through `creds`.
    #[must_use]
    pub fn key(kind: CacheKind, creds: &ApiCredentials, detail: &str) -> String {
        format!("{}:{}:{detail}", kind.as_str(), scope(creds))
    }

    /// Look up a cached value.
    pub async fn get(&self, key: &str) -> Option<CacheValue> {
        self.inner.get(key).await
    }

    /// Store a value.
    pub async fn insert(&self, key: String, value: CacheValue) {
        self.inner.insert(key, value).await;
    }

    /// Drop every entry of the given kinds, in every scope.
    pub fn invalidate(&self, kinds: &[CacheKind]) {
        let prefixes: Vec<String> = kinds.iter().map(|k| format!("{}:", k.as_str())).collect();
        if let Err(e) = self
            .inner
            .invalidate_entries_if(move |key, _| prefixes.iter().any(|p| key.starts_with(p)))
        {
            warn!(error = %e, "Failed to register cache invalidation");
        }
    }

    /// Drop everything cached for one ticket (detail, comments, worklogs).
    pub fn invalidate_ticket(&self, id: TicketId, kinds: &[CacheKind]) {
        let prefixes: Vec<String> = kinds.iter().map(|k| format!("{}:", k.as_str())).collect();
        let suffix = format!(":{id}");
        if let Err(e) = self.inner.invalidate_entries_if(move |key, _| {
            key.ends_with(&suffix) && prefixes.iter().any(|p| key.starts_with(p))
        }) {
            warn!(error = %e, "Failed to register cache invalidation");
        }
    }

    /// Apply pending invalidations. Tests call this before asserting.
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }
}

/// Digest of token and tenant that partitions cache entries.
fn scope(creds: &ApiCredentials) -> String {
    let mut hasher = Sha256::new();
    if let Some(token) = &creds.token {
        hasher.update(token.expose_secret().as_bytes());
    }
    hasher.update(b"|");
    if let Some(company) = creds.company_id {
        hasher.update(company.to_string().as_bytes());
    }
    let digest = hex::encode(hasher.finalize());
    digest.get(..16).unwrap_or(&digest).to_string()
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use serviceflow_core::CompanyId;

    use super::*;

    fn creds(token: &str, company: Option<i64>) -> ApiCredentials {
        ApiCredentials {
            token: Some(SecretString::from(token.to_string())),
            company_id: company.map(CompanyId::new),
        }
    }

    #[test]
    fn test_key_scopes_by_token_and_tenant() {
        let a = ResponseCache::key(CacheKind::Tickets, &creds("tok-a", Some(1)), "");
        let b = ResponseCache::key(CacheKind::Tickets, &creds("tok-b", Some(1)), "");
        let c = ResponseCache::key(CacheKind::Tickets, &creds("tok-a", Some(2)), "");
        let a_again = ResponseCache::key(CacheKind::Tickets, &creds("tok-a", Some(1)), "");

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, a_again);
        assert!(a.starts_with("tickets:"));
    }

    #[test]
    fn test_key_does_not_leak_token() {
        let key = ResponseCache::key(CacheKind::Me, &creds("very-secret-token", None), "");
        assert!(!key.contains("very-secret-token"));
    }

    #[tokio::test]
    async fn test_invalidate_by_kind() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let c = creds("tok", None);
        let tickets_key = ResponseCache::key(CacheKind::Tickets, &c, "s=&p=&q=");
        let companies_key = ResponseCache::key(CacheKind::Companies, &c, "");

        cache.insert(tickets_key.clone(), CacheValue::Tickets(vec![])).await;
        cache.insert(companies_key.clone(), CacheValue::Companies(vec![])).await;

        cache.invalidate(&[CacheKind::Tickets]);
        cache.sync().await;

        assert!(cache.get(&tickets_key).await.is_none());
        assert!(cache.get(&companies_key).await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_ticket_only_touches_that_ticket() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let c = creds("tok", None);
        let one = ResponseCache::key(CacheKind::Comments, &c, "1");
        let eleven = ResponseCache::key(CacheKind::Comments, &c, "11");

        cache.insert(one.clone(), CacheValue::Comments(vec![])).await;
        cache.insert(eleven.clone(), CacheValue::Comments(vec![])).await;

        cache.invalidate_ticket(TicketId::new(1), &[CacheKind::Comments]);
        cache.sync().await;

        assert!(cache.get(&one).await.is_none());
        assert!(cache.get(&eleven).await.is_some());
    }
}
