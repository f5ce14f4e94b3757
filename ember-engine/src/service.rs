//! Remote story-service collaborator.

use async_trait::async_trait;
use ember_model::{AuthorId, Comment, CommentId, EngagementCounts, MediaItem, StoryId, UserId};

use crate::error::Result;

/// How a viewing session sources its sequence: the global story feed, or a
/// single author's stories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryFilter {
    GlobalFeed,
    Author(AuthorId),
}

/// The remote table-and-auth data service, shape only.
///
/// Everything the engine needs from the backend goes through this trait so
/// tests can run against a fake and the HTTP client stays swappable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoryService: Send + Sync {
    /// Stories with author metadata attached, newest author activity first.
    async fn list_stories(&self, filter: StoryFilter) -> Result<Vec<MediaItem>>;

    async fn engagement_counts(&self, story_id: StoryId) -> Result<EngagementCounts>;

    async fn my_like_state(&self, story_id: StoryId, user_id: UserId) -> Result<bool>;

    async fn my_follow_state(&self, author_id: AuthorId, user_id: UserId) -> Result<bool>;

    async fn toggle_like(&self, story_id: StoryId, user_id: UserId) -> Result<()>;

    async fn toggle_follow(&self, author_id: AuthorId, user_id: UserId) -> Result<()>;

    async fn record_view(&self, story_id: StoryId, user_id: UserId) -> Result<()>;

    async fn soft_delete_story(&self, story_id: StoryId) -> Result<()>;

    async fn list_comments(&self, story_id: StoryId) -> Result<Vec<Comment>>;

    async fn post_comment(
        &self,
        story_id: StoryId,
        parent_id: Option<CommentId>,
        text: String,
    ) -> Result<Comment>;
}
