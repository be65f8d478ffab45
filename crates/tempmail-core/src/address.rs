//! Recipient addresses and the set of served domains.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A normalized email address (trimmed, lowercased, syntactically valid).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parse and normalize an address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the address is empty or malformed.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(Error::invalid_argument("email address is required"));
        }
        if !is_valid_email(&normalized) {
            return Err(Error::invalid_argument(format!(
                "invalid email address: {normalized}"
            )));
        }
        Ok(Self(normalized))
    }

    /// Wrap a value read back from the store, which was normalized on write.
    pub(crate) const fn from_stored(address: String) -> Self {
        Self(address)
    }

    /// The full address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part after `@`.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for EmailAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Basic email validation.
fn is_valid_email(email: &str) -> bool {
    // Must contain exactly one @
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || local.chars().any(char::is_whitespace) {
        return false;
    }

    // Domain must contain at least one dot and not be empty
    if domain.is_empty() || !domain.contains('.') {
        return false;
    }

    // Domain parts must not be empty
    !domain
        .split('.')
        .any(|p| p.is_empty() || p.chars().any(|c| !(c.is_ascii_alphanumeric() || c == '-')))
}

/// A domain this deployment receives mail for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Who operates the domain.
    pub owner: String,
    /// The domain name, lowercase.
    pub domain: String,
}

/// Immutable set of served domains, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct DomainConfig {
    domains: Vec<Domain>,
}

impl DomainConfig {
    /// Build the configuration, normalizing and de-duplicating names.
    #[must_use]
    pub fn new(domains: impl IntoIterator<Item = Domain>) -> Self {
        let mut normalized: Vec<Domain> = Vec::new();
        for mut domain in domains {
            domain.domain = domain.domain.trim().to_lowercase();
            if domain.domain.is_empty() || normalized.iter().any(|d| d.domain == domain.domain) {
                continue;
            }
            normalized.push(domain);
        }
        Self {
            domains: normalized,
        }
    }

    /// Returns true if mail for `address` is accepted here.
    #[must_use]
    pub fn supports(&self, address: &EmailAddress) -> bool {
        self.domains.iter().any(|d| d.domain == address.domain())
    }

    /// Served domain names, in configuration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(|d| d.domain.as_str())
    }
}
