//! Story playback & engagement engine.
//!
//! One shared engine behind the two story viewers (per-author and global
//! feed): it sequences an ordered collection of ephemeral media items across
//! authors, auto-advances playback on a timer, prefetches and disk-caches
//! upcoming media, and keeps optimistic local state for likes and follows
//! with rollback on failure.
//!
//! Screens own rendering, animation, and gesture recognition; the engine
//! owns every stateful decision in between. See [`engine::Engine`] for the
//! surface the screens consume.

pub mod cache;
pub mod client;
pub mod config;
pub mod cursor;
pub mod engagement;
pub mod engine;
pub mod error;
pub mod events;
pub mod fetch;
pub mod gesture;
pub mod prefetch;
pub mod service;
pub mod timer;

pub use cache::MediaCache;
pub use client::HttpStoryService;
pub use config::EngineConfig;
pub use cursor::{Cursor, CursorState, Direction, NavCursor, NavEffect};
pub use engagement::{EngagementOverlay, EngagementStore};
pub use engine::{Engine, EngineDeps, load_sequence};
pub use error::{EngineError, Result};
pub use events::{EngineEvent, EngineEventBus};
pub use fetch::{HttpMediaFetcher, MediaFetcher};
pub use gesture::{GestureIntent, GestureRouter};
pub use prefetch::{PrefetchScheduler, prefetch_window};
pub use service::{StoryFilter, StoryService};
pub use timer::{PlaybackProgress, PlaybackTimer};
