//! Author groups and the viewing-session sequence.
//!
//! A [`Sequence`] is the full ordered list of [`AuthorGroup`]s loaded for one
//! viewing session. Ordering is stable for the life of the session: deleting
//! an item mutates only the owning group (and removes the group once it is
//! empty), it never triggers a re-sort.

use crate::error::ModelError;
use crate::ids::{AuthorId, StoryId};
use crate::media::MediaItem;
use serde::{Deserialize, Serialize};

/// All story items belonging to one author, ordered oldest to newest.
///
/// A group is non-empty while it is present in an active [`Sequence`]; a
/// group whose last item is removed is dropped from the sequence entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorGroup {
    pub author_id: AuthorId,
    pub items: Vec<MediaItem>,
}

impl AuthorGroup {
    pub fn new(author_id: AuthorId, mut items: Vec<MediaItem>) -> Self {
        items.sort_by_key(|item| item.created_at);
        Self { author_id, items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The ordered list of author groups for a viewing session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub groups: Vec<AuthorGroup>,
}

impl Sequence {
    pub fn new(groups: Vec<AuthorGroup>) -> Self {
        Self { groups }
    }

    /// Group a flat, already-ranked item list by author.
    ///
    /// Author order is first-seen order (the story service returns items
    /// newest-author-activity-first); items within each group are re-sorted
    /// oldest to newest.
    pub fn from_items(items: Vec<MediaItem>) -> Self {
        let mut groups: Vec<AuthorGroup> = Vec::new();
        for item in items {
            match groups.iter_mut().find(|g| g.author_id == item.author_id) {
                Some(group) => group.items.push(item),
                None => groups.push(AuthorGroup {
                    author_id: item.author_id,
                    items: vec![item],
                }),
            }
        }
        for group in &mut groups {
            group.items.sort_by_key(|item| item.created_at);
        }
        Self { groups }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of items across all groups.
    pub fn total_items(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }

    /// Index of the group belonging to `author_id`, if loaded.
    pub fn group_position(&self, author_id: &AuthorId) -> Option<usize> {
        self.groups.iter().position(|g| &g.author_id == author_id)
    }

    pub fn item_at(&self, group_index: usize, item_index: usize) -> Option<&MediaItem> {
        self.groups.get(group_index)?.items.get(item_index)
    }

    /// Check the session invariant that every group holds at least one item.
    /// Sequences built through [`Sequence::from_items`] hold this by
    /// construction; hand-assembled ones are checked at the engine boundary.
    pub fn validate(&self) -> crate::error::Result<()> {
        for group in &self.groups {
            if group.is_empty() {
                return Err(ModelError::EmptyGroup(group.author_id.to_string()));
            }
        }
        Ok(())
    }

    /// Remove one item wherever it lives; drops the owning group if that
    /// empties it. Returns true if anything was removed.
    pub fn remove_item(&mut self, story_id: &StoryId) -> bool {
        for group in &mut self.groups {
            let before = group.items.len();
            group.items.retain(|item| &item.id != story_id);
            if group.items.len() != before {
                self.groups.retain(|g| !g.items.is_empty());
                return true;
            }
        }
        false
    }
}
