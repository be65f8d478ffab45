//! API keys: the credentials that call the REST API and own inbox locks.

mod model;
mod repository;

pub use model::{ApiKey, ApiKeyId, IssuedApiKey, MAX_EXPIRY_DAYS, MAX_NAME_LENGTH};
pub use repository::ApiKeyRepository;
