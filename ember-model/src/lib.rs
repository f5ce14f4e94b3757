//! Core data model definitions shared across Ember crates.

pub mod engagement;
pub mod error;
pub mod ids;
pub mod media;
pub mod sequence;

// Intentionally curated re-exports for downstream consumers.
pub use engagement::{Comment, EngagementCounts};
pub use error::{ModelError, Result as ModelResult};
pub use ids::{AuthorId, CommentId, StoryId, UserId};
pub use media::{MediaItem, MediaKind};
pub use sequence::{AuthorGroup, Sequence};
