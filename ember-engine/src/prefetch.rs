//! Prefetch scheduling.
//!
//! On every cursor settle the engine asks the scheduler to warm the upcoming
//! window: the rest of the current group plus the head of the next few
//! groups. Warming is fire-and-forget; duplicate windows across settles cost
//! nothing because the media cache dedupes by URI and in-flight download.

use std::sync::Arc;

use ember_model::Sequence;

use crate::cache::MediaCache;
use crate::config::EngineConfig;
use crate::cursor::Cursor;

/// Compute the prefetch window for a settled cursor position.
///
/// Returns remote URIs in priority order: current item first, then the rest
/// of the current group, then the first `prefetch_items_per_group` items of
/// each of the next `prefetch_group_lookahead` groups.
pub fn prefetch_window(
    sequence: &Sequence,
    cursor: Cursor,
    config: &EngineConfig,
) -> Vec<String> {
    let mut uris = Vec::new();

    if let Some(group) = sequence.groups.get(cursor.group_index) {
        for item in group.items.iter().skip(cursor.item_index) {
            uris.push(item.remote_uri.clone());
        }
    }

    let next_groups = sequence
        .groups
        .iter()
        .skip(cursor.group_index + 1)
        .take(config.prefetch_group_lookahead);
    for group in next_groups {
        for item in group.items.iter().take(config.prefetch_items_per_group) {
            uris.push(item.remote_uri.clone());
        }
    }

    uris
}

#[derive(Debug, Clone)]
pub struct PrefetchScheduler {
    cache: Arc<MediaCache>,
    config: EngineConfig,
}

impl PrefetchScheduler {
    pub fn new(cache: Arc<MediaCache>, config: EngineConfig) -> Self {
        Self { cache, config }
    }

    /// Issue `ensure` calls for the whole window without awaiting any of
    /// them. Failures are logged by the cache and retried on a later settle.
    pub fn warm(&self, sequence: &Sequence, cursor: Cursor) {
        let window = prefetch_window(sequence, cursor, &self.config);
        log::debug!(
            "[Prefetch] warming {} items from group={} item={}",
            window.len(),
            cursor.group_index,
            cursor.item_index
        );
        for uri in window {
            let cache = Arc::clone(&self.cache);
            tokio::spawn(async move {
                let _ = cache.ensure(&uri).await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_model::{AuthorGroup, AuthorId, MediaItem, MediaKind};

    fn group(label: &str, n_items: usize) -> AuthorGroup {
        let author = AuthorId::new();
        let items = (0..n_items)
            .map(|i| {
                MediaItem::new(
                    author,
                    MediaKind::Image { has_audio: false },
                    format!("https://cdn.example.com/{label}/{i}.jpg"),
                )
            })
            .collect();
        AuthorGroup { author_id: author, items }
    }

    fn uri(label: &str, i: usize) -> String {
        format!("https://cdn.example.com/{label}/{i}.jpg")
    }

    #[test]
    fn window_covers_rest_of_group_and_heads_of_next_groups() {
        let sequence = Sequence::new(vec![
            group("a", 4),
            group("b", 3),
            group("c", 3),
            group("d", 3),
        ]);
        let config = EngineConfig::default();
        let cursor = Cursor { group_index: 0, item_index: 2 };

        let window = prefetch_window(&sequence, cursor, &config);
        assert_eq!(
            window,
            vec![
                uri("a", 2),
                uri("a", 3),
                uri("b", 0),
                uri("b", 1),
                uri("c", 0),
                uri("c", 1),
            ],
            "d is beyond the group lookahead"
        );
    }

    #[test]
    fn window_at_last_group_has_no_lookahead() {
        let sequence = Sequence::new(vec![group("a", 2)]);
        let config = EngineConfig::default();
        let cursor = Cursor { group_index: 0, item_index: 1 };

        let window = prefetch_window(&sequence, cursor, &config);
        assert_eq!(window, vec![uri("a", 1)]);
    }

    #[test]
    fn short_groups_contribute_what_they_have() {
        let sequence = Sequence::new(vec![group("a", 1), group("b", 1)]);
        let config = EngineConfig::default();
        let cursor = Cursor { group_index: 0, item_index: 0 };

        let window = prefetch_window(&sequence, cursor, &config);
        assert_eq!(window, vec![uri("a", 0), uri("b", 0)]);
    }
}
