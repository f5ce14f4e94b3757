//! Per-item playback countdown.
//!
//! Images run on a real countdown (fixed dwell, longer when the image
//! carries an audio track). Videos never get an independent clock: the
//! timer's progress mirrors the position/duration the media backend reports,
//! so it stays correct under seeks and rate changes.
//!
//! Completion is delivered as a generation-stamped message; the engine must
//! [`PlaybackTimer::acknowledge`] it before acting. A stale generation (the
//! timer was restarted or stopped in the meantime) or a duplicate signal for
//! an already-completed item is rejected, which makes advance-on-completion
//! idempotent even when a video "finished" event races the countdown.

use std::time::Duration;

use ember_model::{MediaItem, MediaKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::EngineConfig;

/// Playback progress as a clamped `[0, 1]` ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackProgress(f32);

impl PlaybackProgress {
    pub fn new(progress: f32) -> Self {
        PlaybackProgress(progress.clamp(0.0, 1.0))
    }

    pub fn as_ratio(&self) -> f32 {
        self.0
    }

    pub fn is_complete(&self) -> bool {
        self.0 >= 1.0
    }
}

#[derive(Debug)]
enum Mode {
    Idle,
    Image {
        total: Duration,
        elapsed: Duration,
        /// Set while counting; `None` while paused.
        resumed_at: Option<Instant>,
    },
    Video {
        position: f64,
        duration: f64,
    },
}

#[derive(Debug)]
pub struct PlaybackTimer {
    fired_tx: mpsc::UnboundedSender<u64>,
    generation: u64,
    completed: bool,
    mode: Mode,
    task: Option<JoinHandle<()>>,
}

impl PlaybackTimer {
    /// `fired_tx` carries the generation of an image countdown that ran to
    /// the end of its dwell; the engine validates it with [`acknowledge`].
    ///
    /// [`acknowledge`]: PlaybackTimer::acknowledge
    pub fn new(fired_tx: mpsc::UnboundedSender<u64>) -> Self {
        Self {
            fired_tx,
            generation: 0,
            completed: false,
            mode: Mode::Idle,
            task: None,
        }
    }

    /// Reset progress to zero and begin counting for `item`.
    pub fn start(&mut self, item: &MediaItem, config: &EngineConfig) {
        self.abort_countdown();
        self.generation = self.generation.wrapping_add(1);
        self.completed = false;

        match item.kind {
            MediaKind::Image { has_audio } => {
                let total = if has_audio {
                    config.audio_image_dwell
                } else {
                    config.image_dwell
                };
                self.mode = Mode::Image {
                    total,
                    elapsed: Duration::ZERO,
                    resumed_at: Some(Instant::now()),
                };
                self.spawn_countdown(total);
            }
            MediaKind::Video => {
                // Position reports drive everything; nothing to schedule.
                self.mode = Mode::Video {
                    position: 0.0,
                    duration: 0.0,
                };
            }
        }
        log::debug!(
            "[PlaybackTimer] started item={} generation={}",
            item.id,
            self.generation
        );
    }

    /// Suspend the countdown without resetting progress.
    pub fn pause(&mut self) {
        self.abort_countdown();
        if let Mode::Image { elapsed, resumed_at, .. } = &mut self.mode
            && let Some(at) = resumed_at.take()
        {
            *elapsed += at.elapsed();
        }
    }

    /// Continue a paused countdown from where it left off.
    pub fn resume(&mut self) {
        if self.completed {
            return;
        }
        if let Mode::Image { total, elapsed, resumed_at } = &mut self.mode
            && resumed_at.is_none()
        {
            *resumed_at = Some(Instant::now());
            let remaining = total.saturating_sub(*elapsed);
            self.spawn_countdown(remaining);
        }
    }

    /// Cancel and discard the in-flight countdown.
    pub fn stop(&mut self) {
        self.abort_countdown();
        self.generation = self.generation.wrapping_add(1);
        self.completed = false;
        self.mode = Mode::Idle;
    }

    /// Validate a completion signal. Returns true exactly once per started
    /// item; stale generations and duplicates return false.
    pub fn acknowledge(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.completed {
            return false;
        }
        if matches!(self.mode, Mode::Idle) {
            return false;
        }
        self.completed = true;
        true
    }

    /// Feed a video position report. Returns true when the report completes
    /// the item (first time only); the engine then advances.
    pub fn report_video_progress(&mut self, position: f64, duration: f64) -> bool {
        let Mode::Video { position: pos, duration: dur } = &mut self.mode else {
            return false;
        };
        *pos = position;
        *dur = duration;
        if duration > 0.0 && position >= duration && !self.completed {
            self.completed = true;
            return true;
        }
        false
    }

    pub fn progress(&self) -> PlaybackProgress {
        match &self.mode {
            Mode::Idle => PlaybackProgress::new(0.0),
            Mode::Image { total, elapsed, resumed_at } => {
                if self.completed {
                    return PlaybackProgress::new(1.0);
                }
                let mut run = *elapsed;
                if let Some(at) = resumed_at {
                    run += at.elapsed();
                }
                PlaybackProgress::new(run.as_secs_f32() / total.as_secs_f32().max(f32::EPSILON))
            }
            Mode::Video { position, duration } => {
                if *duration <= 0.0 {
                    PlaybackProgress::new(0.0)
                } else {
                    PlaybackProgress::new((*position / *duration) as f32)
                }
            }
        }
    }

    fn spawn_countdown(&mut self, remaining: Duration) {
        let generation = self.generation;
        let tx = self.fired_tx.clone();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            let _ = tx.send(generation);
        }));
    }

    fn abort_countdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PlaybackTimer {
    fn drop(&mut self) {
        self.abort_countdown();
    }
}
