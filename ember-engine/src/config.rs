use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for playback and prefetch.
///
/// Constructed explicitly and passed into [`crate::engine::Engine::open`];
/// there is no ambient global configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Display duration for a plain image item.
    pub image_dwell: Duration,
    /// Display duration for an image item with an attached audio track.
    pub audio_image_dwell: Duration,
    /// Items to warm per upcoming author group.
    pub prefetch_items_per_group: usize,
    /// Upcoming author groups to warm beyond the current one.
    pub prefetch_group_lookahead: usize,
    /// Root directory for the on-disk media cache.
    pub cache_root: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            image_dwell: Duration::from_secs(6),
            audio_image_dwell: Duration::from_secs(15),
            prefetch_items_per_group: 2,
            prefetch_group_lookahead: 2,
            cache_root: default_cache_root(),
        }
    }
}

fn default_cache_root() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "ember", "ember-engine") {
        proj_dirs.cache_dir().join("story-media")
    } else {
        std::env::temp_dir().join("ember-story-media")
    }
}
