//! Shared request state.

use std::sync::Arc;

use tempmail_core::{
    ApiKeyRepository, AttachmentRepository, Database, DomainConfig, InboxGate, InboxLockRepository,
    Mailroom, MessageRepository,
};

use crate::config::Settings;

/// Everything a handler needs. Cloned per request; all clones share one pool.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Database handle, used by the health check.
    pub db: Database,
    /// Messages and listings.
    pub messages: MessageRepository,
    /// Attachment metadata.
    pub attachments: AttachmentRepository,
    /// Inbox lock records.
    pub locks: InboxLockRepository,
    /// Password gate for locked inboxes.
    pub gate: InboxGate,
    /// API keys.
    pub api_keys: ApiKeyRepository,
    /// Inbound mail.
    pub mailroom: Mailroom,
    /// Served domains.
    pub domains: Arc<DomainConfig>,
    /// Page size used when a listing does not ask for one.
    pub default_page_size: u32,
    /// Key guarding the admin routes.
    pub master_key: Option<Arc<str>>,
}

impl AppState {
    /// Wire repositories over `db` according to `settings`.
    #[must_use]
    pub fn new(db: Database, settings: &Settings) -> Self {
        let domains = DomainConfig::new(settings.domains.iter().cloned());
        let messages = MessageRepository::new(&db).with_max_page_size(settings.max_page_size);
        let locks = InboxLockRepository::new(&db);
        let mailroom = Mailroom::new(messages.clone(), domains.clone())
            .with_retention_days(settings.retention_days);

        Self {
            attachments: AttachmentRepository::new(&db),
            gate: InboxGate::new(locks.clone()),
            api_keys: ApiKeyRepository::new(&db),
            domains: Arc::new(domains),
            default_page_size: settings.default_page_size,
            master_key: settings
                .master_key
                .as_deref()
                .filter(|key| !key.is_empty())
                .map(Arc::from),
            messages,
            locks,
            mailroom,
            db,
        }
    }
}
