//! Subscription filters shared by the relay wire format and local re-validation.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::event::Event;

/// Nostr `REQ` filter.
///
/// Serializes to the NIP-01 object shape, e.g.
/// `{"kinds":[1],"authors":["ab.."],"#t":["blueorb","question"],"limit":50}`.
/// The same value evaluates the predicate locally via [`Filter::matches`],
/// since relays do not reliably honor compound tag constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// Event kinds; empty means any kind.
    pub kinds: Vec<u32>,
    /// Restrict to specific authors.
    pub authors: Option<Vec<String>>,
    /// Tag constraints keyed by tag name without the `#` prefix.
    pub tags: BTreeMap<String, Vec<String>>,
    /// Lower bound for `created_at`.
    pub since: Option<u64>,
    /// Upper bound for `created_at`.
    pub until: Option<u64>,
    /// Maximum number of stored events a relay should return.
    pub limit: Option<usize>,
}

impl Filter {
    pub fn kinds(kinds: impl IntoIterator<Item = u32>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn authors(mut self, authors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.authors = Some(authors.into_iter().map(Into::into).collect());
        self
    }

    /// Add (or extend) a tag constraint such as `t` or `subject`.
    pub fn tag(mut self, name: &str, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let name = name.trim_start_matches('#').to_string();
        self.tags
            .entry(name)
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when `ev` satisfies every constraint of this filter.
    ///
    /// A tag constraint holds when the event carries at least one tag with that
    /// name whose first value is in the set; multiple tag keys are ANDed.
    pub fn matches(&self, ev: &Event) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&ev.kind) {
            return false;
        }
        if let Some(authors) = &self.authors {
            if !authors.iter().any(|a| a == &ev.pubkey) {
                return false;
            }
        }
        if self.since.is_some_and(|s| ev.created_at < s)
            || self.until.is_some_and(|u| ev.created_at > u)
        {
            return false;
        }
        self.tags.iter().all(|(name, values)| {
            ev.tags.iter().any(|tag| match tag.0.as_slice() {
                [n, v, ..] => n == name && values.iter().any(|want| want == v),
                _ => false,
            })
        })
    }

    /// Convert into the JSON object sent in `REQ` messages.
    pub fn to_json(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if !self.kinds.is_empty() {
            map.insert(
                "kinds".into(),
                Value::Array(self.kinds.iter().map(|k| Value::Number((*k).into())).collect()),
            );
        }
        if let Some(authors) = &self.authors {
            map.insert(
                "authors".into(),
                Value::Array(authors.iter().cloned().map(Value::String).collect()),
            );
        }
        for (tag, values) in &self.tags {
            if values.is_empty() {
                continue;
            }
            map.insert(
                format!("#{tag}"),
                Value::Array(values.iter().cloned().map(Value::String).collect()),
            );
        }
        if let Some(since) = self.since {
            map.insert("since".into(), Value::Number(since.into()));
        }
        if let Some(until) = self.until {
            map.insert("until".into(), Value::Number(until.into()));
        }
        if let Some(limit) = self.limit {
            map.insert("limit".into(), Value::Number((limit as u64).into()));
        }
        map
    }

    /// Parse a NIP-01 filter object. Unknown keys are ignored.
    pub fn from_value(val: &Value) -> Self {
        let strings = |v: &Value| -> Vec<String> {
            v.as_array()
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_str().map(|s| s.to_string()))
                        .collect()
                })
                .unwrap_or_default()
        };
        let kinds = val
            .get("kinds")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_u64().and_then(|u| u32::try_from(u).ok()))
                    .collect()
            })
            .unwrap_or_default();
        let authors = val.get("authors").map(strings);
        let tags = val
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| k.strip_prefix('#').map(|name| (name.to_string(), strings(v))))
                    .collect()
            })
            .unwrap_or_default();
        Filter {
            kinds,
            authors,
            tags,
            since: val.get("since").and_then(|v| v.as_u64()),
            until: val.get("until").and_then(|v| v.as_u64()),
            limit: val
                .get("limit")
                .and_then(|v| v.as_u64())
                .map(|v| v as usize),
        }
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
