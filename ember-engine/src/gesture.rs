//! Drag gesture classification.
//!
//! The rendering layer reports a completed drag as a raw `(dx, dy)` offset;
//! this router turns it into a discrete navigation intent. Horizontal drags
//! switch authors, vertical drags dismiss the viewer, anything under the
//! travel threshold is ignored.

/// Discrete intent extracted from a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureIntent {
    /// Swipe toward the next author group.
    NextGroup,
    /// Swipe toward the previous author group.
    PreviousGroup,
    /// Downward swipe; close the viewer.
    Dismiss,
    /// Too short or too ambiguous to act on.
    None,
}

#[derive(Debug, Clone, Copy)]
pub struct GestureRouter {
    /// Minimum travel in logical pixels before a drag counts as a swipe.
    pub min_travel: f32,
}

impl Default for GestureRouter {
    fn default() -> Self {
        Self { min_travel: 60.0 }
    }
}

impl GestureRouter {
    /// Classify by dominant axis. `dx > 0` is a rightward drag (previous
    /// group), `dy > 0` is downward (dismiss); upward drags are ignored.
    pub fn classify(&self, dx: f32, dy: f32) -> GestureIntent {
        if dx.abs() >= dy.abs() {
            if dx <= -self.min_travel {
                GestureIntent::NextGroup
            } else if dx >= self.min_travel {
                GestureIntent::PreviousGroup
            } else {
                GestureIntent::None
            }
        } else if dy >= self.min_travel {
            GestureIntent::Dismiss
        } else {
            GestureIntent::None
        }
    }
}
