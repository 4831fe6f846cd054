//! Deletion-aware filtering of query results.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;

use futures_util::future::join_all;
use tracing::debug;

use crate::event::{Event, TagName, KIND_DELETION};
use crate::filter::Filter;
use crate::pool::EventSource;
use crate::subscribe::QueryOptions;

/// Removes events that their own author has tombstoned.
///
/// A tombstone only ever applies to events signed by the same key, so one
/// author cannot hide another author's content.
pub struct TombstoneResolver<'a, S: EventSource + ?Sized> {
    source: &'a S,
    budget: Duration,
    limit: Option<usize>,
}

impl<'a, S: EventSource + ?Sized> TombstoneResolver<'a, S> {
    pub fn new(source: &'a S, budget: Duration) -> Self {
        Self {
            source,
            budget,
            limit: None,
        }
    }

    /// Cap the number of tombstones requested per author.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Drop every event of `events` targeted by a tombstone of its author.
    pub async fn exclude_deleted(&self, events: Vec<Event>) -> Vec<Event> {
        let authors: BTreeSet<&str> = events.iter().map(|ev| ev.pubkey.as_str()).collect();
        if authors.is_empty() {
            return events;
        }
        let lookups = authors.into_iter().map(|author| async move {
            let mut filter = Filter::kinds([KIND_DELETION]).authors([author]);
            filter.limit = self.limit;
            let tombstones = self
                .source
                .fetch(vec![filter], QueryOptions::within(self.budget))
                .await;
            (author.to_string(), deleted_targets(author, &tombstones))
        });
        let deleted: HashMap<String, HashSet<String>> = join_all(lookups).await.into_iter().collect();

        let before = events.len();
        let kept: Vec<Event> = events
            .into_iter()
            .filter(|ev| {
                !deleted
                    .get(&ev.pubkey)
                    .is_some_and(|ids| ids.contains(&ev.id))
            })
            .collect();
        debug!(removed = before - kept.len(), "tombstones applied");
        kept
    }
}

/// Ids named by `author`'s own tombstones among `tombstones`.
pub fn deleted_targets(author: &str, tombstones: &[Event]) -> HashSet<String> {
    tombstones
        .iter()
        .filter(|ev| ev.kind == KIND_DELETION && ev.pubkey == author)
        .flat_map(|ev| ev.tag_values(TagName::Event).map(str::to_string))
        .collect()
}
