//! Ephemeral story media items.
//!
//! A [`MediaItem`] is one post inside an author's story. Items are immutable
//! for the duration of a viewing session: deletion removes the item from its
//! [`crate::sequence::AuthorGroup`], it is never edited in place.

use crate::error::ModelError;
use crate::ids::{AuthorId, StoryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of media a story item carries.
///
/// The distinction matters for playback: images are displayed for a fixed
/// dwell duration while videos report their own position/duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MediaKind {
    /// A still image, optionally with an attached audio track that extends
    /// its dwell time.
    Image { has_audio: bool },
    /// A video clip with an intrinsic duration.
    Video,
}

impl MediaKind {
    pub fn is_video(&self) -> bool {
        matches!(self, MediaKind::Video)
    }
}

/// One ephemeral post as loaded from the story service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: StoryId,
    pub author_id: AuthorId,
    pub kind: MediaKind,
    /// Remote URI the media is downloaded from; also the media cache key.
    pub remote_uri: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl MediaItem {
    pub fn new(
        author_id: AuthorId,
        kind: MediaKind,
        remote_uri: impl Into<String>,
    ) -> Self {
        Self {
            id: StoryId::new(),
            author_id,
            kind,
            remote_uri: remote_uri.into(),
            created_at: Utc::now(),
            caption: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Check that the item is playable: the remote URI must be an absolute
    /// URL, since it doubles as the media cache key.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.remote_uri.is_empty() || !self.remote_uri.contains("://") {
            return Err(ModelError::InvalidMedia(format!(
                "item {} has no usable remote URI",
                self.id
            )));
        }
        Ok(())
    }
}
