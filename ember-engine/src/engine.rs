//! The playback engine facade.
//!
//! Wires the navigation cursor, playback timer, media cache, prefetch
//! scheduler, and engagement store into the single surface the two story
//! viewers (per-author and global feed) consume. The screens differ only in
//! how they source their [`Sequence`] and how they render; everything
//! stateful lives here.
//!
//! Threading model: all engine state sits behind one mutex and every
//! operation is short and non-blocking while holding it. Downloads, service
//! confirmations, and view tracking run as detached tasks and re-enter
//! through their own handles, so an abandoned viewer never cancels work
//! whose results are worth caching.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use ember_model::{AuthorId, Comment, CommentId, MediaItem, Sequence, StoryId, UserId};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};

use crate::cache::MediaCache;
use crate::config::EngineConfig;
use crate::cursor::{Cursor, NavCursor, NavEffect};
use crate::engagement::{EngagementOverlay, EngagementStore};
use crate::error::{EngineError, Result};
use crate::events::{EngineEvent, EngineEventBus};
use crate::fetch::MediaFetcher;
use crate::gesture::{GestureIntent, GestureRouter};
use crate::prefetch::PrefetchScheduler;
use crate::service::{StoryFilter, StoryService};
use crate::timer::{PlaybackProgress, PlaybackTimer};

/// Everything the engine needs injected. No ambient globals: tests build a
/// fresh set per case.
pub struct EngineDeps {
    pub service: Arc<dyn StoryService>,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub user_id: UserId,
    pub config: EngineConfig,
}

impl std::fmt::Debug for EngineDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineDeps")
            .field("user_id", &self.user_id)
            .field("config", &self.config)
            .finish()
    }
}

/// Fetch and group a sequence for one of the two viewer screens. Feed rows
/// without a usable media URI are dropped rather than failing the load.
pub async fn load_sequence(service: &dyn StoryService, filter: StoryFilter) -> Result<Sequence> {
    let items = service.list_stories(filter).await?;
    let items = items
        .into_iter()
        .filter(|item| match item.validate() {
            Ok(()) => true,
            Err(err) => {
                log::warn!("[Engine] dropping unplayable story item: {err}");
                false
            }
        })
        .collect();
    Ok(Sequence::from_items(items))
}

enum SettleKind {
    Item,
    Group,
}

struct Inner {
    cursor: NavCursor,
    timer: PlaybackTimer,
    prefetch: PrefetchScheduler,
    viewed: HashSet<StoryId>,
    closed: bool,
    config: EngineConfig,
    service: Arc<dyn StoryService>,
    engagement: Arc<EngagementStore>,
    events: EngineEventBus,
    user_id: UserId,
}

pub struct Engine {
    inner: Arc<Mutex<Inner>>,
    events: EngineEventBus,
    engagement: Arc<EngagementStore>,
    cache: Arc<MediaCache>,
    service: Arc<dyn StoryService>,
    gestures: GestureRouter,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Engine {
    /// Construct the state machine over a loaded sequence.
    ///
    /// An empty sequence closes immediately. With `initial_author` set the
    /// cursor settles directly on that author's first item, bypassing any
    /// transition animation. Must be called within a tokio runtime.
    pub fn open(
        sequence: Sequence,
        deps: EngineDeps,
        initial_author: Option<AuthorId>,
    ) -> Result<Engine> {
        sequence
            .validate()
            .map_err(|err| EngineError::Internal(err.to_string()))?;

        let events = EngineEventBus::new(64);
        let cache = Arc::new(MediaCache::new(
            deps.config.cache_root.clone(),
            Arc::clone(&deps.fetcher),
        )?);
        let engagement = Arc::new(EngagementStore::new(
            Arc::clone(&deps.service),
            events.clone(),
            deps.user_id,
        ));
        let prefetch = PrefetchScheduler::new(Arc::clone(&cache), deps.config.clone());

        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let timer = PlaybackTimer::new(fired_tx);

        let mut cursor = NavCursor::new(sequence);
        if let Some(author_id) = initial_author
            && let Some(group_index) = cursor.sequence().group_position(&author_id)
        {
            cursor.jump_to_group(group_index);
        }

        let inner = Arc::new(Mutex::new(Inner {
            cursor,
            timer,
            prefetch,
            viewed: HashSet::new(),
            closed: false,
            config: deps.config,
            service: Arc::clone(&deps.service),
            engagement: Arc::clone(&engagement),
            events: events.clone(),
            user_id: deps.user_id,
        }));

        {
            let mut guard = inner.lock();
            match guard.cursor.position() {
                Some(position) => settle(&mut guard, position, SettleKind::Item),
                None => {
                    // Empty sequence: terminal from the start, no item event.
                    guard.closed = true;
                    guard.events.publish(EngineEvent::Closed);
                }
            }
        }

        spawn_timer_loop(Arc::downgrade(&inner), fired_rx);

        Ok(Engine {
            inner,
            events,
            engagement,
            cache,
            service: deps.service,
            gestures: GestureRouter::default(),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn is_locked(&self) -> bool {
        self.inner.lock().cursor.is_locked()
    }

    pub fn current_item(&self) -> Option<MediaItem> {
        self.inner.lock().cursor.current_item().cloned()
    }

    pub fn current_progress(&self) -> PlaybackProgress {
        self.inner.lock().timer.progress()
    }

    /// The media cache, for the renderer's `resolve`-then-fallback lookups.
    pub fn cache(&self) -> &Arc<MediaCache> {
        &self.cache
    }

    /// Advance one item (manual skip or tap). Dropped while a transition is
    /// locked; a [`NavEffect::Blocked`] return is the caller's
    /// advance-blocked signal.
    pub fn advance(&self) -> NavEffect {
        let mut inner = self.inner.lock();
        if inner.closed {
            return NavEffect::Blocked;
        }
        let effect = inner.cursor.advance_item();
        apply_nav(&mut inner, effect)
    }

    pub fn retreat(&self) -> NavEffect {
        let mut inner = self.inner.lock();
        if inner.closed {
            return NavEffect::Blocked;
        }
        let effect = inner.cursor.retreat_item();
        apply_nav(&mut inner, effect)
    }

    /// Feed a completed drag gesture. Horizontal swipes switch author
    /// groups, a downward swipe dismisses the viewer.
    pub fn handle_drag(&self, dx: f32, dy: f32) -> NavEffect {
        match self.gestures.classify(dx, dy) {
            GestureIntent::NextGroup => {
                let mut inner = self.inner.lock();
                if inner.closed {
                    return NavEffect::Blocked;
                }
                let effect = inner.cursor.advance_group();
                apply_nav(&mut inner, effect)
            }
            GestureIntent::PreviousGroup => {
                let mut inner = self.inner.lock();
                if inner.closed {
                    return NavEffect::Blocked;
                }
                let effect = inner.cursor.retreat_group();
                apply_nav(&mut inner, effect)
            }
            GestureIntent::Dismiss => {
                self.dismiss();
                NavEffect::Closed
            }
            GestureIntent::None => NavEffect::Blocked,
        }
    }

    /// Animation-completion callback; the only way a group transition
    /// settles and the navigation lock clears.
    pub fn complete_transition(&self) -> NavEffect {
        let mut inner = self.inner.lock();
        if inner.closed {
            return NavEffect::Blocked;
        }
        let effect = inner.cursor.complete_transition();
        apply_nav(&mut inner, effect)
    }

    pub fn pause(&self) {
        self.inner.lock().timer.pause();
    }

    pub fn resume(&self) {
        self.inner.lock().timer.resume();
    }

    /// Close the viewer (navigation away, dismiss gesture).
    pub fn dismiss(&self) {
        let mut inner = self.inner.lock();
        if !inner.closed {
            close(&mut inner);
        }
    }

    /// Position report from the video backend. Completion advances exactly
    /// once, no matter how many duplicate reports arrive.
    pub fn report_video_progress(&self, position: f64, duration: f64) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        if inner.timer.report_video_progress(position, duration) {
            let effect = inner.cursor.advance_item();
            apply_nav(&mut inner, effect);
        }
    }

    /// Unrecoverable media error on the current item: degrade by skipping
    /// forward, exactly as if playback completed naturally.
    pub fn report_media_error(&self) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        log::warn!("[Engine] media error on current item, skipping forward");
        let effect = inner.cursor.advance_item();
        apply_nav(&mut inner, effect);
    }

    /// Engagement overlay for the current item (zero default until the
    /// background refresh lands).
    pub fn engagement(&self) -> Option<EngagementOverlay> {
        let item = self.current_item()?;
        Some(self.engagement.overlay(item.id, item.author_id))
    }

    pub fn engagement_for(&self, story_id: StoryId, author_id: AuthorId) -> EngagementOverlay {
        self.engagement.overlay(story_id, author_id)
    }

    /// Toggle the like on the current item; optimistic per the store's
    /// protocol, resolving once the confirmation settles.
    pub async fn like(&self) -> Result<EngagementOverlay> {
        let item = self.require_current()?;
        self.engagement.toggle_like(item.id, item.author_id).await
    }

    /// Toggle following the current item's author.
    pub async fn follow(&self) -> Result<bool> {
        let item = self.require_current()?;
        self.engagement.toggle_follow(item.author_id, item.id).await
    }

    /// Post a comment on the current item; returns the re-fetched
    /// authoritative comment list.
    pub async fn comment(&self, text: String, parent_id: Option<CommentId>) -> Result<Vec<Comment>> {
        let item = self.require_current()?;
        self.engagement.post_comment(item.id, parent_id, text).await
    }

    /// Soft-delete the current item on the server, then remove it locally
    /// once the confirmation lands. The viewer stays interactive while the
    /// confirmation is in flight, so removal targets the snapshotted id,
    /// wherever that item sits by then. `Ok(None)` means the cursor had
    /// already moved off the deleted item and playback simply continues.
    pub async fn delete_current(&self) -> Result<Option<NavEffect>> {
        let story_id = {
            let mut inner = self.inner.lock();
            inner.timer.pause();
            inner.cursor.current_item().map(|item| item.id)
        }
        .ok_or(EngineError::Internal("no current item".into()))?;

        match self.service.soft_delete_story(story_id).await {
            // An item already gone server-side still comes out of the
            // sequence; the outcome the user asked for holds either way.
            Ok(()) | Err(EngineError::ItemGone(_)) => {
                let mut inner = self.inner.lock();
                if inner.closed {
                    inner.cursor.delete_item(&story_id);
                    return Ok(None);
                }
                match inner.cursor.delete_item(&story_id) {
                    Some(effect) => Ok(Some(apply_nav(&mut inner, effect))),
                    None => {
                        inner.timer.resume();
                        Ok(None)
                    }
                }
            }
            Err(err) => {
                self.inner.lock().timer.resume();
                Err(err)
            }
        }
    }

    fn require_current(&self) -> Result<MediaItem> {
        self.current_item()
            .ok_or(EngineError::Internal("no current item".into()))
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Release the playback handle; background downloads and
        // confirmations keep running on their own tasks.
        self.inner.lock().timer.stop();
    }
}

/// Map a cursor effect onto timer/prefetch/event side effects.
fn apply_nav(inner: &mut Inner, effect: NavEffect) -> NavEffect {
    match effect {
        NavEffect::ItemChanged(cursor) => settle(inner, cursor, SettleKind::Item),
        NavEffect::GroupChanged(cursor) => settle(inner, cursor, SettleKind::Group),
        NavEffect::TransitionStarted { from, to, direction } => {
            inner.timer.stop();
            inner.events.publish(EngineEvent::TransitionStarted { from, to, direction });
        }
        NavEffect::Closed => close(inner),
        NavEffect::Blocked => {
            log::debug!("[Engine] navigation dropped (locked or terminal)");
        }
    }
    effect
}

fn settle(inner: &mut Inner, cursor: Cursor, kind: SettleKind) {
    let Some(item) = inner.cursor.current_item().cloned() else {
        close(inner);
        return;
    };

    inner.timer.start(&item, &inner.config);

    // View tracking: at most once per item per session, fire and forget.
    if inner.viewed.insert(item.id) {
        let service = Arc::clone(&inner.service);
        let user_id = inner.user_id;
        let story_id = item.id;
        tokio::spawn(async move {
            if let Err(err) = service.record_view(story_id, user_id).await {
                log::warn!("[Engine] view tracking failed story={} err={}", story_id, err);
            }
        });
    }

    inner.prefetch.warm(inner.cursor.sequence(), cursor);

    let event = match kind {
        SettleKind::Item => EngineEvent::ItemChanged {
            cursor,
            story_id: item.id,
        },
        SettleKind::Group => EngineEvent::GroupChanged {
            cursor,
            author_id: item.author_id,
        },
    };
    inner.events.publish(event);

    let engagement = Arc::clone(&inner.engagement);
    let (story_id, author_id) = (item.id, item.author_id);
    tokio::spawn(async move {
        if let Err(err) = engagement.refresh(story_id, author_id).await {
            log::debug!(
                "[Engine] engagement refresh failed story={} err={}",
                story_id,
                err
            );
        }
    });
}

fn close(inner: &mut Inner) {
    inner.timer.stop();
    inner.closed = true;
    inner.events.publish(EngineEvent::Closed);
}

/// Drives timer completions into navigation. Holds only a weak handle so
/// dropping the engine tears the loop down once the timer's sender goes.
fn spawn_timer_loop(inner: Weak<Mutex<Inner>>, mut fired_rx: mpsc::UnboundedReceiver<u64>) {
    tokio::spawn(async move {
        while let Some(generation) = fired_rx.recv().await {
            let Some(inner) = inner.upgrade() else {
                break;
            };
            let mut guard = inner.lock();
            if guard.closed || !guard.timer.acknowledge(generation) {
                continue;
            }
            let effect = guard.cursor.advance_item();
            apply_nav(&mut guard, effect);
        }
    });
}
