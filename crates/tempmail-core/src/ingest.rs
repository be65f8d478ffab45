//! Accepting inbound mail.
//!
//! MIME parsing happens upstream; the mailroom receives already-decoded
//! fields, assigns an identifier and retention, and stores the message.

use serde::Deserialize;
use tracing::{debug, info};

use crate::message::{Message, MessageRepository};
use crate::secret::generate_id;
use crate::{DomainConfig, EmailAddress, Error, Result};

/// Default retention of received mail, in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// A parsed inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMail {
    /// Envelope sender.
    pub from: String,
    /// Envelope recipient.
    pub to: String,
    /// Subject line.
    #[serde(default)]
    pub subject: Option<String>,
    /// HTML body.
    #[serde(default)]
    pub html: Option<String>,
    /// Plain text body.
    #[serde(default)]
    pub text: Option<String>,
}

/// Stores inbound mail for the served domains.
#[derive(Debug, Clone)]
pub struct Mailroom {
    messages: MessageRepository,
    domains: DomainConfig,
    retention_secs: i64,
}

impl Mailroom {
    /// Create a mailroom with the default retention.
    #[must_use]
    pub fn new(messages: MessageRepository, domains: DomainConfig) -> Self {
        Self {
            messages,
            domains,
            retention_secs: i64::from(DEFAULT_RETENTION_DAYS) * SECONDS_PER_DAY,
        }
    }

    /// Keep received mail for `days` days.
    #[must_use]
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_secs = i64::from(days) * SECONDS_PER_DAY;
        self
    }

    /// Store one inbound message received at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the recipient is malformed,
    /// [`Error::UnsupportedDomain`] if its domain is not served here, or a
    /// database error if the insert fails.
    pub async fn receive(&self, mail: IncomingMail, now: i64) -> Result<Message> {
        let recipient = EmailAddress::parse(&mail.to)?;
        if !self.domains.supports(&recipient) {
            debug!("Rejecting mail for {recipient}");
            return Err(Error::UnsupportedDomain(recipient.domain().to_string()));
        }
        let from = mail.from.trim();
        if from.is_empty() {
            return Err(Error::invalid_argument("sender address is required"));
        }

        let message = Message {
            id: generate_id(),
            from_address: from.to_string(),
            to_address: recipient.as_str().to_string(),
            subject: non_blank(mail.subject),
            received_at: now,
            expires_at: Some(now.saturating_add(self.retention_secs)),
            html_content: non_blank(mail.html),
            text_content: non_blank(mail.text),
            has_attachments: false,
            attachment_count: 0,
        };
        self.messages.insert(&message).await?;

        info!("Received message {} for {recipient}", message.id);
        Ok(message)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
