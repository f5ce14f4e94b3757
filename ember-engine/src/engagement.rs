//! Optimistic engagement state.
//!
//! Per-item overlay of server-confirmed counters (likes, follow state) that
//! applies user actions instantly and reconciles with the story service in
//! the background. Every action follows the same five-step protocol:
//!
//! 1. read the current local value (zero default if never primed),
//! 2. apply the flipped state synchronously, before any suspension point,
//! 3. persist the toggle against the service,
//! 4. on success, re-fetch the authoritative value and *replace* the local
//!    one (never merge — this closes races with other sessions and devices),
//! 5. on failure, revert to the exact pre-action snapshot and surface the
//!    error to the caller.
//!
//! The store is an explicitly constructed per-session singleton; the overlay
//! is mutated only through its own operations.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use ember_model::{AuthorId, Comment, CommentId, StoryId, UserId};
use parking_lot::Mutex;

use crate::error::Result;
use crate::events::{EngineEvent, EngineEventBus};
use crate::service::StoryService;

/// Merged local view of an item's engagement state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngagementOverlay {
    pub liked_by_me: bool,
    pub like_count: u64,
    pub followed_author: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LikeState {
    liked: bool,
    count: u64,
}

/// Run one optimistic mutation.
///
/// `write` is invoked for the optimistic apply, the authoritative
/// replacement, and the rollback, so observers see every overlay change.
/// A persist that succeeds but whose reconcile read fails keeps the
/// optimistic value: the toggle did land, and the next authoritative read
/// replaces the count anyway.
pub(crate) async fn run_optimistic<T, P, R, Rf>(
    read: impl Fn() -> T,
    write: impl Fn(T),
    apply: impl FnOnce(&T) -> T,
    persist: P,
    reconcile: R,
) -> Result<T>
where
    T: Clone,
    P: Future<Output = Result<()>>,
    R: FnOnce() -> Rf,
    Rf: Future<Output = Result<T>>,
{
    let before = read();
    let optimistic = apply(&before);
    write(optimistic.clone());

    match persist.await {
        Ok(()) => match reconcile().await {
            Ok(authoritative) => {
                write(authoritative.clone());
                Ok(authoritative)
            }
            Err(err) => {
                log::warn!("[Engagement] reconcile read failed, keeping optimistic value: {err}");
                Ok(optimistic)
            }
        },
        Err(err) => {
            write(before);
            Err(err)
        }
    }
}

pub struct EngagementStore {
    service: Arc<dyn StoryService>,
    events: EngineEventBus,
    user_id: UserId,
    likes: Mutex<HashMap<StoryId, LikeState>>,
    follows: Mutex<HashMap<AuthorId, bool>>,
}

impl std::fmt::Debug for EngagementStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngagementStore")
            .field("user_id", &self.user_id)
            .field("likes", &self.likes.lock().len())
            .field("follows", &self.follows.lock().len())
            .finish()
    }
}

impl EngagementStore {
    pub fn new(service: Arc<dyn StoryService>, events: EngineEventBus, user_id: UserId) -> Self {
        Self {
            service,
            events,
            user_id,
            likes: Mutex::new(HashMap::new()),
            follows: Mutex::new(HashMap::new()),
        }
    }

    /// The current merged view for an item. Unprimed entries read as zero.
    pub fn overlay(&self, story_id: StoryId, author_id: AuthorId) -> EngagementOverlay {
        let like = self.like_state(story_id);
        let followed_author = self.follows.lock().get(&author_id).copied().unwrap_or(false);
        EngagementOverlay {
            liked_by_me: like.liked,
            like_count: like.count,
            followed_author,
        }
    }

    /// Authoritative read of all three engagement facets for a freshly
    /// settled item; replaces whatever was there.
    pub async fn refresh(&self, story_id: StoryId, author_id: AuthorId) -> Result<()> {
        let counts = self.service.engagement_counts(story_id).await?;
        let liked = self.service.my_like_state(story_id, self.user_id).await?;
        let followed = self
            .service
            .my_follow_state(author_id, self.user_id)
            .await?;

        self.set_like_state(
            story_id,
            LikeState {
                liked,
                count: counts.like_count,
            },
        );
        self.follows.lock().insert(author_id, followed);
        self.events.publish(EngineEvent::EngagementUpdated(story_id));
        Ok(())
    }

    /// `author_id` is the item's author, so the returned overlay carries the
    /// live follow state alongside the settled like.
    pub async fn toggle_like(
        &self,
        story_id: StoryId,
        author_id: AuthorId,
    ) -> Result<EngagementOverlay> {
        let service = Arc::clone(&self.service);
        let user_id = self.user_id;

        run_optimistic(
            || self.like_state(story_id),
            |state| {
                self.set_like_state(story_id, state);
                self.events.publish(EngineEvent::EngagementUpdated(story_id));
            },
            |before| LikeState {
                liked: !before.liked,
                count: if before.liked {
                    before.count.saturating_sub(1)
                } else {
                    before.count + 1
                },
            },
            async { service.toggle_like(story_id, user_id).await },
            || async {
                let counts = service.engagement_counts(story_id).await?;
                let liked = service.my_like_state(story_id, user_id).await?;
                Ok(LikeState {
                    liked,
                    count: counts.like_count,
                })
            },
        )
        .await?;

        Ok(self.overlay(story_id, author_id))
    }

    /// `story_id` is the item the toggle was issued from, used only for the
    /// change notification.
    pub async fn toggle_follow(&self, author_id: AuthorId, story_id: StoryId) -> Result<bool> {
        let service = Arc::clone(&self.service);
        let user_id = self.user_id;

        let followed = run_optimistic(
            || self.follows.lock().get(&author_id).copied().unwrap_or(false),
            |followed| {
                self.follows.lock().insert(author_id, followed);
                self.events.publish(EngineEvent::EngagementUpdated(story_id));
            },
            |before| !before,
            async { service.toggle_follow(author_id, user_id).await },
            || async { service.my_follow_state(author_id, user_id).await },
        )
        .await?;

        Ok(followed)
    }

    /// Post a comment, then re-fetch the authoritative comment list rather
    /// than patching it in locally.
    pub async fn post_comment(
        &self,
        story_id: StoryId,
        parent_id: Option<CommentId>,
        text: String,
    ) -> Result<Vec<Comment>> {
        let posted = self
            .service
            .post_comment(story_id, parent_id, text)
            .await;
        let refreshed = self.service.list_comments(story_id).await;
        self.events.publish(EngineEvent::EngagementUpdated(story_id));

        match posted {
            Ok(_) => refreshed,
            Err(err) => Err(err),
        }
    }

    fn like_state(&self, story_id: StoryId) -> LikeState {
        self.likes.lock().get(&story_id).copied().unwrap_or_default()
    }

    fn set_like_state(&self, story_id: StoryId, state: LikeState) {
        self.likes.lock().insert(story_id, state);
    }
}
