//! Attachment metadata.

mod model;
mod repository;

pub use model::Attachment;
pub use repository::AttachmentRepository;
