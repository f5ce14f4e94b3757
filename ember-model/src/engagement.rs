//! Engagement data as read from the story service.

use crate::ids::{AuthorId, CommentId, StoryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-authoritative counters for one story item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCounts {
    pub like_count: u64,
    pub comment_count: u64,
}

/// One comment on a story item. `parent_id` is set for threaded replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub story_id: StoryId,
    pub author_id: AuthorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
