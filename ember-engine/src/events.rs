//! In-process event fan-out.
//!
//! Lightweight broadcast bus that carries engine notifications to however
//! many screen-layer observers are subscribed. Publishing never fails: with
//! no subscribers the event is simply dropped.

use ember_model::{AuthorId, StoryId};
use tokio::sync::broadcast;

use crate::cursor::{Cursor, Direction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Settled on a new item within the same author group.
    ItemChanged { cursor: Cursor, story_id: StoryId },
    /// A group switch began; the animation layer runs it and reports back
    /// through `complete_transition`, which clears the navigation lock.
    TransitionStarted {
        from: Cursor,
        to: Cursor,
        direction: Direction,
    },
    /// Settled on a different author group.
    GroupChanged { cursor: Cursor, author_id: AuthorId },
    /// The viewer session ended (terminal cursor or dismissal).
    Closed,
    /// The engagement overlay for an item changed (optimistic apply,
    /// confirmation, or rollback).
    EngagementUpdated(StoryId),
}

#[derive(Debug, Clone)]
pub struct EngineEventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EngineEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: EngineEvent) {
        let _ = self.sender.send(event);
    }
}
