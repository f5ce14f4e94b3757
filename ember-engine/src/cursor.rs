//! Navigation cursor state machine.
//!
//! Tracks the current position inside a [`Sequence`] as a two-level index
//! (author group, item within group) plus an explicit transition lock. Item
//! moves inside a group settle immediately; group-to-group moves enter a
//! [`CursorState::Transitioning`] state that only settles when the rendering
//! layer reports its animation finished via
//! [`NavCursor::complete_transition`]. Any navigation request that arrives
//! while a transition is in flight is dropped, not queued, so rapid gesture
//! or timer input can never compound into multi-step skips.

use ember_model::{MediaItem, Sequence, StoryId};

/// Settled position: `group_index` into the sequence, `item_index` into that
/// group. Both are always in range while the cursor is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub group_index: usize,
    pub item_index: usize,
}

/// Direction of an in-flight group-to-group transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Settled on a valid item.
    Idle(Cursor),
    /// Group switch animation in flight; navigation is locked.
    Transitioning {
        from: Cursor,
        to: Cursor,
        direction: Direction,
    },
    /// No more groups in the requested direction; the viewer is done.
    Terminal,
}

/// What the caller must do after a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEffect {
    /// Settled on a new item within the same group.
    ItemChanged(Cursor),
    /// Entered a group transition; the animation layer must run it and then
    /// call [`NavCursor::complete_transition`].
    TransitionStarted {
        from: Cursor,
        to: Cursor,
        direction: Direction,
    },
    /// A transition (or deletion) settled on a different group.
    GroupChanged(Cursor),
    /// Walked off either end of the sequence; close the viewer.
    Closed,
    /// Request dropped: cursor is locked or already terminal.
    Blocked,
}

/// The navigation state machine over a viewing-session sequence.
///
/// Owns the sequence for the session so deletion and bounds checks stay in
/// one place; the engine reads items through it.
#[derive(Debug)]
pub struct NavCursor {
    sequence: Sequence,
    state: CursorState,
}

impl NavCursor {
    /// An empty sequence resolves to `Terminal` immediately without ever
    /// settling on an item.
    pub fn new(sequence: Sequence) -> Self {
        let state = if sequence.is_empty() {
            CursorState::Terminal
        } else {
            CursorState::Idle(Cursor {
                group_index: 0,
                item_index: 0,
            })
        };
        Self { sequence, state }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, CursorState::Terminal)
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, CursorState::Transitioning { .. })
    }

    /// The settled cursor, if any.
    pub fn position(&self) -> Option<Cursor> {
        match self.state {
            CursorState::Idle(cursor) => Some(cursor),
            _ => None,
        }
    }

    /// The item the cursor is settled on, if any.
    pub fn current_item(&self) -> Option<&MediaItem> {
        let cursor = self.position()?;
        self.sequence.item_at(cursor.group_index, cursor.item_index)
    }

    /// Advance one item, spilling into the next group at a group boundary.
    pub fn advance_item(&mut self) -> NavEffect {
        let Some(cursor) = self.settled_or_blocked() else {
            return NavEffect::Blocked;
        };
        let group_len = self.sequence.groups[cursor.group_index].len();
        if cursor.item_index + 1 < group_len {
            let next = Cursor {
                group_index: cursor.group_index,
                item_index: cursor.item_index + 1,
            };
            self.state = CursorState::Idle(next);
            NavEffect::ItemChanged(next)
        } else {
            self.advance_group()
        }
    }

    /// Begin a forward group transition, or close at the end of the sequence.
    pub fn advance_group(&mut self) -> NavEffect {
        let Some(cursor) = self.settled_or_blocked() else {
            return NavEffect::Blocked;
        };
        if cursor.group_index + 1 < self.sequence.len() {
            let to = Cursor {
                group_index: cursor.group_index + 1,
                item_index: 0,
            };
            self.state = CursorState::Transitioning {
                from: cursor,
                to,
                direction: Direction::Forward,
            };
            NavEffect::TransitionStarted {
                from: cursor,
                to,
                direction: Direction::Forward,
            }
        } else {
            self.state = CursorState::Terminal;
            NavEffect::Closed
        }
    }

    /// Retreat one item, spilling into the previous group at a boundary.
    /// Retreating past the first item of the first group closes the viewer.
    pub fn retreat_item(&mut self) -> NavEffect {
        let Some(cursor) = self.settled_or_blocked() else {
            return NavEffect::Blocked;
        };
        if cursor.item_index > 0 {
            let prev = Cursor {
                group_index: cursor.group_index,
                item_index: cursor.item_index - 1,
            };
            self.state = CursorState::Idle(prev);
            NavEffect::ItemChanged(prev)
        } else {
            self.retreat_group()
        }
    }

    /// Begin a backward group transition, or close at the front.
    pub fn retreat_group(&mut self) -> NavEffect {
        let Some(cursor) = self.settled_or_blocked() else {
            return NavEffect::Blocked;
        };
        if cursor.group_index > 0 {
            let to = Cursor {
                group_index: cursor.group_index - 1,
                item_index: 0,
            };
            self.state = CursorState::Transitioning {
                from: cursor,
                to,
                direction: Direction::Backward,
            };
            NavEffect::TransitionStarted {
                from: cursor,
                to,
                direction: Direction::Backward,
            }
        } else {
            self.state = CursorState::Terminal;
            NavEffect::Closed
        }
    }

    /// Settle directly on the first item of an author's group, bypassing any
    /// transition. Used when the viewer opens targeting a specific author.
    pub fn jump_to_group(&mut self, group_index: usize) -> NavEffect {
        if self.is_locked() || group_index >= self.sequence.len() {
            return NavEffect::Blocked;
        }
        let cursor = Cursor {
            group_index,
            item_index: 0,
        };
        self.state = CursorState::Idle(cursor);
        NavEffect::ItemChanged(cursor)
    }

    /// The only way a transition settles. Called by the animation layer's
    /// completion callback; ignored in any other state.
    pub fn complete_transition(&mut self) -> NavEffect {
        match self.state {
            CursorState::Transitioning { to, .. } => {
                self.state = CursorState::Idle(to);
                NavEffect::GroupChanged(to)
            }
            _ => NavEffect::Blocked,
        }
    }

    /// Remove an item by id wherever it lives and re-point the cursor.
    ///
    /// Deletion is confirmed against the server while the viewer stays
    /// interactive, so by the time the confirmation lands the cursor may
    /// have moved on or the item may already be gone. When the deleted item
    /// is the current one this re-settles immediately (next item, next
    /// group, or closed) and returns the effect; otherwise the cursor keeps
    /// pointing at the item it was on, with indices shifted as needed, and
    /// `None` is returned. Unknown ids are a no-op.
    pub fn delete_item(&mut self, story_id: &StoryId) -> Option<NavEffect> {
        let (group_index, item_index) = self.locate(story_id)?;

        if let CursorState::Idle(cursor) = self.state
            && cursor.group_index == group_index
            && cursor.item_index == item_index
        {
            return Some(self.remove_and_resettle(cursor, story_id));
        }

        let groups_before = self.sequence.len();
        self.sequence.remove_item(story_id);
        let group_dropped = self.sequence.len() != groups_before;

        match &mut self.state {
            CursorState::Idle(cursor) => {
                shift_after_removal(cursor, group_index, item_index, group_dropped);
            }
            // Both endpoints shift so the pending settle still lands where
            // the animation is headed.
            CursorState::Transitioning { from, to, .. } => {
                shift_after_removal(from, group_index, item_index, group_dropped);
                shift_after_removal(to, group_index, item_index, group_dropped);
            }
            CursorState::Terminal => {}
        }
        None
    }

    fn locate(&self, story_id: &StoryId) -> Option<(usize, usize)> {
        for (group_index, group) in self.sequence.groups.iter().enumerate() {
            if let Some(item_index) = group.items.iter().position(|item| &item.id == story_id) {
                return Some((group_index, item_index));
            }
        }
        None
    }

    fn remove_and_resettle(&mut self, cursor: Cursor, story_id: &StoryId) -> NavEffect {
        let groups_before = self.sequence.len();
        self.sequence.remove_item(story_id);

        if self.sequence.len() == groups_before {
            let group_len = self.sequence.groups[cursor.group_index].len();
            if cursor.item_index < group_len {
                // The successor slid into the deleted slot.
                let next = Cursor {
                    group_index: cursor.group_index,
                    item_index: cursor.item_index,
                };
                self.state = CursorState::Idle(next);
                return NavEffect::ItemChanged(next);
            }
            // Deleted the last item of a surviving group: fall through to
            // the next group without an animation.
            return self.settle_on_group(cursor.group_index + 1);
        }

        // The emptied group is already gone; its successor slid into place.
        self.settle_on_group(cursor.group_index)
    }

    fn settle_on_group(&mut self, group_index: usize) -> NavEffect {
        if group_index < self.sequence.len() {
            let cursor = Cursor {
                group_index,
                item_index: 0,
            };
            self.state = CursorState::Idle(cursor);
            NavEffect::GroupChanged(cursor)
        } else {
            self.state = CursorState::Terminal;
            NavEffect::Closed
        }
    }

    fn settled_or_blocked(&self) -> Option<Cursor> {
        match self.state {
            CursorState::Idle(cursor) => Some(cursor),
            CursorState::Transitioning { .. } | CursorState::Terminal => None,
        }
    }
}

fn shift_after_removal(
    cursor: &mut Cursor,
    removed_group: usize,
    removed_item: usize,
    group_dropped: bool,
) {
    if group_dropped {
        if removed_group < cursor.group_index {
            cursor.group_index -= 1;
        }
    } else if removed_group == cursor.group_index && removed_item < cursor.item_index {
        cursor.item_index -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_model::{AuthorGroup, AuthorId, MediaItem, MediaKind};

    fn current_id(nav: &NavCursor) -> StoryId {
        nav.current_item().unwrap().id
    }

    fn group(n_items: usize) -> AuthorGroup {
        let author = AuthorId::new();
        let items = (0..n_items)
            .map(|i| {
                MediaItem::new(
                    author,
                    MediaKind::Image { has_audio: false },
                    format!("https://cdn.example.com/{author}/{i}.jpg"),
                )
            })
            .collect();
        AuthorGroup { author_id: author, items }
    }

    fn cursor_over(shape: &[usize]) -> NavCursor {
        NavCursor::new(Sequence::new(shape.iter().map(|&n| group(n)).collect()))
    }

    fn settle(nav: &mut NavCursor, effect: NavEffect) -> NavEffect {
        match effect {
            NavEffect::TransitionStarted { .. } => nav.complete_transition(),
            other => other,
        }
    }

    #[test]
    fn empty_sequence_is_terminal_at_construction() {
        let nav = cursor_over(&[]);
        assert!(nav.is_terminal());
        assert!(nav.current_item().is_none());
    }

    #[test]
    fn advance_walks_every_item_exactly_once_then_closes() {
        let shape = [1usize, 3, 2];
        let mut nav = cursor_over(&shape);
        let total: usize = shape.iter().sum();

        let mut seen = vec![nav.current_item().unwrap().id];
        for _ in 0..total - 1 {
            let effect = nav.advance_item();
            let effect = settle(&mut nav, effect);
            assert!(matches!(
                effect,
                NavEffect::ItemChanged(_) | NavEffect::GroupChanged(_)
            ));
            seen.push(nav.current_item().unwrap().id);
        }
        assert_eq!(nav.advance_item(), NavEffect::Closed);
        assert!(nav.is_terminal());

        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), total, "an item was revisited or skipped");
    }

    #[test]
    fn advance_then_retreat_is_identity_at_interior_positions() {
        let mut nav = cursor_over(&[3]);
        let effect = nav.advance_item();
        settle(&mut nav, effect);
        let before = nav.position().unwrap();

        let effect = nav.retreat_item();
        settle(&mut nav, effect);
        let effect = nav.advance_item();
        settle(&mut nav, effect);

        assert_eq!(nav.position().unwrap(), before);
    }

    #[test]
    fn group_boundary_enters_transition_and_resets_item_index() {
        let mut nav = cursor_over(&[2, 2]);
        nav.advance_item();
        match nav.advance_item() {
            NavEffect::TransitionStarted { from, to, direction } => {
                assert_eq!(from, Cursor { group_index: 0, item_index: 1 });
                assert_eq!(to, Cursor { group_index: 1, item_index: 0 });
                assert_eq!(direction, Direction::Forward);
            }
            other => panic!("expected transition, got {other:?}"),
        }
        assert!(nav.is_locked());
        assert_eq!(
            nav.complete_transition(),
            NavEffect::GroupChanged(Cursor { group_index: 1, item_index: 0 })
        );
    }

    #[test]
    fn requests_while_locked_are_dropped_not_queued() {
        let mut nav = cursor_over(&[1, 1, 1]);
        nav.advance_item();
        assert!(nav.is_locked());

        for _ in 0..10 {
            assert_eq!(nav.advance_item(), NavEffect::Blocked);
            assert_eq!(nav.retreat_item(), NavEffect::Blocked);
        }

        // The eventual settled position is as if none of those were issued.
        nav.complete_transition();
        assert_eq!(
            nav.position().unwrap(),
            Cursor { group_index: 1, item_index: 0 }
        );
    }

    #[test]
    fn retreating_past_first_item_closes() {
        let mut nav = cursor_over(&[2, 1]);
        assert_eq!(nav.retreat_item(), NavEffect::Closed);
        assert!(nav.is_terminal());
    }

    #[test]
    fn retreat_at_group_boundary_goes_to_previous_group() {
        let mut nav = cursor_over(&[2, 2]);
        nav.advance_item();
        let effect = nav.advance_item();
        settle(&mut nav, effect);

        match nav.retreat_item() {
            NavEffect::TransitionStarted { to, direction, .. } => {
                assert_eq!(to.group_index, 0);
                assert_eq!(direction, Direction::Backward);
            }
            other => panic!("expected transition, got {other:?}"),
        }
    }

    #[test]
    fn navigation_after_terminal_is_blocked() {
        let mut nav = cursor_over(&[1]);
        assert_eq!(nav.advance_item(), NavEffect::Closed);
        assert_eq!(nav.advance_item(), NavEffect::Blocked);
        assert_eq!(nav.retreat_item(), NavEffect::Blocked);
    }

    #[test]
    fn jump_to_group_settles_without_transition() {
        let mut nav = cursor_over(&[2, 3]);
        assert_eq!(
            nav.jump_to_group(1),
            NavEffect::ItemChanged(Cursor { group_index: 1, item_index: 0 })
        );
        assert!(!nav.is_locked());
        assert_eq!(nav.jump_to_group(7), NavEffect::Blocked);
    }

    #[test]
    fn delete_mid_group_shows_successor_at_same_index() {
        let mut nav = cursor_over(&[3]);
        let target = current_id(&nav);
        let successor = nav.sequence().groups[0].items[1].id;
        assert_eq!(
            nav.delete_item(&target),
            Some(NavEffect::ItemChanged(Cursor { group_index: 0, item_index: 0 }))
        );
        assert_eq!(nav.current_item().unwrap().id, successor);
        assert_eq!(nav.sequence().groups[0].len(), 2);
    }

    #[test]
    fn delete_last_item_of_group_falls_to_next_group() {
        let mut nav = cursor_over(&[2, 1]);
        nav.advance_item();
        let target = current_id(&nav);

        assert_eq!(
            nav.delete_item(&target),
            Some(NavEffect::GroupChanged(Cursor { group_index: 1, item_index: 0 }))
        );
    }

    #[test]
    fn delete_only_item_of_only_group_closes() {
        let mut nav = cursor_over(&[1]);
        let target = current_id(&nav);
        assert_eq!(nav.delete_item(&target), Some(NavEffect::Closed));
        assert!(nav.is_terminal());
        assert!(nav.sequence().is_empty());
    }

    #[test]
    fn delete_emptied_group_settles_on_sliding_successor() {
        let mut nav = cursor_over(&[1, 2]);
        let target = current_id(&nav);
        assert_eq!(
            nav.delete_item(&target),
            Some(NavEffect::GroupChanged(Cursor { group_index: 0, item_index: 0 }))
        );
        assert_eq!(nav.sequence().len(), 1);
    }

    #[test]
    fn delete_behind_the_cursor_keeps_the_current_item() {
        let mut nav = cursor_over(&[3]);
        let first = nav.sequence().groups[0].items[0].id;
        nav.advance_item();
        let current = current_id(&nav);

        assert_eq!(nav.delete_item(&first), None);
        assert_eq!(current_id(&nav), current);
        assert_eq!(
            nav.position().unwrap(),
            Cursor { group_index: 0, item_index: 0 }
        );
        assert_eq!(nav.delete_item(&first), None, "repeat delete is a no-op");
    }

    #[test]
    fn delete_emptying_an_earlier_group_shifts_the_group_index() {
        let mut nav = cursor_over(&[1, 2]);
        let earlier = nav.sequence().groups[0].items[0].id;
        let effect = nav.advance_item();
        settle(&mut nav, effect);
        let current = current_id(&nav);

        assert_eq!(nav.delete_item(&earlier), None);
        assert_eq!(current_id(&nav), current);
        assert_eq!(
            nav.position().unwrap(),
            Cursor { group_index: 0, item_index: 0 }
        );
    }

    #[test]
    fn delete_during_a_transition_shifts_the_pending_settle() {
        let mut nav = cursor_over(&[2, 2]);
        let behind = nav.sequence().groups[0].items[0].id;
        let destination = nav.sequence().groups[1].items[0].id;
        nav.advance_item();
        nav.advance_item();
        assert!(nav.is_locked());

        assert_eq!(nav.delete_item(&behind), None);
        assert!(nav.is_locked());
        assert_eq!(
            nav.complete_transition(),
            NavEffect::GroupChanged(Cursor { group_index: 1, item_index: 0 })
        );
        assert_eq!(current_id(&nav), destination);
    }
}
