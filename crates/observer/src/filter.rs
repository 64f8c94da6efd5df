// SPDX-License-Identifier: MIT

//! Per-item review filters (spec §4.5): author-class and actionability
//! heuristics, composed by the caller rather than hardcoded into the
//! poll loop.

use crate::source::ReviewItem;

/// A composable admission check over a review item. Several filters are
/// ANDed together by [`allow_all`] — an item must clear every one to be
/// considered actionable.
pub trait ReviewFilter: Send + Sync {
    fn allow(&self, item: &ReviewItem) -> bool;
}

/// Rejects items authored by a bot account.
pub struct BotFilter;

impl ReviewFilter for BotFilter {
    fn allow(&self, item: &ReviewItem) -> bool {
        !item.is_bot
    }
}

/// Requires at least one configured keyword to appear (case-insensitive)
/// in the item's title or body — the "is this actually actionable"
/// heuristic.
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

impl ReviewFilter for KeywordFilter {
    fn allow(&self, item: &ReviewItem) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let haystack = format!("{} {}", item.title, item.body).to_lowercase();
        self.keywords.iter().any(|kw| haystack.contains(kw.as_str()))
    }
}

pub fn allow_all(filters: &[Box<dyn ReviewFilter>], item: &ReviewItem) -> bool {
    filters.iter().all(|f| f.allow(item))
}
