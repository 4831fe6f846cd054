//! Projection of raw relay events into community views.
//!
//! Every relay result is treated as untrusted: events are re-checked against
//! the request predicate, ordered newest first and only then truncated.

use std::cmp::Reverse;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::builder::{PostType, EDIT_MARKER};
use crate::event::{Event, TagName, KIND_TEXT};
use crate::filter::Filter;

/// Identity metadata carried by kind-0 events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub role: String,
}

/// Constraints a community event must satisfy to appear in a view.
#[derive(Debug, Clone)]
pub struct Predicate {
    pub scope: String,
    pub post_type: PostType,
    pub subject: Option<String>,
    pub role: Option<String>,
    pub parent_id: Option<String>,
    pub author: Option<String>,
}

impl Predicate {
    pub fn new(scope: impl Into<String>, post_type: PostType) -> Self {
        Self {
            scope: scope.into(),
            post_type,
            subject: None,
            role: None,
            parent_id: None,
            author: None,
        }
    }

    pub fn subject(mut self, subject: Option<String>) -> Self {
        self.subject = subject.filter(|s| !s.is_empty());
        self
    }

    pub fn role(mut self, role: Option<String>) -> Self {
        self.role = role.filter(|r| !r.is_empty());
        self
    }

    pub fn parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn author(mut self, author: Option<String>) -> Self {
        self.author = author.filter(|a| !a.is_empty());
        self
    }

    /// Relay filter for this predicate.
    ///
    /// `#t` lists scope and type as alternatives, so relays return a superset
    /// that [`Predicate::matches`] narrows down.
    pub fn relay_filter(&self, limit: usize) -> Filter {
        let mut filter = Filter::kinds([KIND_TEXT])
            .tag("t", [self.scope.clone(), self.post_type.as_str().to_string()])
            .limit(limit);
        if let Some(subject) = &self.subject {
            filter = filter.tag("subject", [subject.clone()]);
        }
        if let Some(role) = &self.role {
            filter = filter.tag("role", [role.clone()]);
        }
        if let Some(parent) = &self.parent_id {
            filter = filter.tag("e", [parent.clone()]);
        }
        if let Some(author) = &self.author {
            filter = filter.authors([author.clone()]);
        }
        filter
    }

    /// Local re-validation of a relay result.
    pub fn matches(&self, ev: &Event) -> bool {
        ev.kind == KIND_TEXT
            && ev.has_tag(TagName::Topic, &self.scope)
            && ev.has_tag(TagName::Topic, self.post_type.as_str())
            && self
                .subject
                .as_deref()
                .map_or(true, |s| ev.has_tag(TagName::Subject, s))
            && self
                .role
                .as_deref()
                .map_or(true, |r| ev.has_tag(TagName::Role, r))
            && self
                .parent_id
                .as_deref()
                .map_or(true, |p| ev.has_tag(TagName::Event, p))
            && self.author.as_deref().map_or(true, |a| ev.pubkey == a)
    }
}

/// Drop non-matching events and order the rest newest first.
///
/// Ties keep their arrival order.
pub fn revalidate(events: Vec<Event>, predicate: &Predicate) -> Vec<Event> {
    let mut kept: Vec<Event> = events
        .into_iter()
        .filter(|ev| predicate.matches(ev))
        .collect();
    sort_newest_first(&mut kept);
    kept
}

pub fn sort_newest_first(events: &mut [Event]) {
    events.sort_by_key(|ev| Reverse(ev.created_at));
}

/// A question as shown to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub id: String,
    pub pubkey: String,
    pub created_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub event: Event,
}

impl Question {
    pub fn from_event(ev: Event) -> Self {
        let (title, body) = split_title(&ev.content);
        Self {
            id: ev.id.clone(),
            pubkey: ev.pubkey.clone(),
            created_at: ev.created_at,
            title,
            body,
            subject: ev.first_tag_value(TagName::Subject).map(str::to_string),
            role: ev.first_tag_value(TagName::Role).map(str::to_string),
            event: ev,
        }
    }
}

/// A reply (or reply edit) as shown to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub id: String,
    pub pubkey: String,
    pub created_at: u64,
    pub content: String,
    /// Question (or, for edits, reply) this event points at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub is_edit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_of: Option<String>,
    /// Set when an edit by the same author is part of the same result.
    pub edited: bool,
    pub event: Event,
}

impl Reply {
    fn from_event(ev: Event) -> Self {
        let is_edit = ev.has_tag(TagName::Topic, EDIT_MARKER);
        let target = ev.first_tag_value(TagName::Event).map(str::to_string);
        Self {
            id: ev.id.clone(),
            pubkey: ev.pubkey.clone(),
            created_at: ev.created_at,
            content: ev.content.clone(),
            parent_id: target.clone(),
            role: ev.first_tag_value(TagName::Role).map(str::to_string),
            is_edit,
            edit_of: target.filter(|_| is_edit),
            edited: false,
            event: ev,
        }
    }
}

pub fn project_questions(events: Vec<Event>) -> Vec<Question> {
    events.into_iter().map(Question::from_event).collect()
}

/// Map replies to views and flag originals that have a same-author edit.
pub fn project_replies(events: Vec<Event>) -> Vec<Reply> {
    let mut replies: Vec<Reply> = events.into_iter().map(Reply::from_event).collect();
    let edited: HashSet<(String, String)> = replies
        .iter()
        .filter_map(|r| {
            r.edit_of
                .as_ref()
                .map(|target| (r.pubkey.clone(), target.clone()))
        })
        .collect();
    for reply in &mut replies {
        reply.edited = edited.contains(&(reply.pubkey.clone(), reply.id.clone()));
    }
    replies
}

/// Split `**title**\n\nbody` content back into its parts.
pub fn split_title(content: &str) -> (Option<String>, String) {
    let parsed = content.strip_prefix("**").and_then(|rest| {
        let (title, body) = rest.split_once("**\n\n")?;
        (!title.is_empty() && !title.contains('\n')).then(|| (title, body))
    });
    match parsed {
        Some((title, body)) => (Some(title.to_string()), body.to_string()),
        None => (None, content.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Tag;

    fn post(id: &str, pubkey: &str, created_at: u64, tags: Vec<Tag>) -> Event {
        Event {
            id: id.into(),
            pubkey: pubkey.into(),
            kind: KIND_TEXT,
            created_at,
            tags,
            content: format!("content of {id}"),
            sig: String::new(),
        }
    }

    fn question(id: &str, created_at: u64, subject: Option<&str>) -> Event {
        let mut tags = vec![Tag::topic("blueorb"), Tag::topic("question")];
        if let Some(s) = subject {
            tags.push(Tag::subject(s));
        }
        post(id, "alice", created_at, tags)
    }

    #[test]
    fn relay_filter_shape() {
        let p = Predicate::new("blueorb", PostType::Question).subject(Some("math".into()));
        let json = serde_json::to_value(p.relay_filter(100)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kinds": [1],
                "#t": ["blueorb", "question"],
                "#subject": ["math"],
                "limit": 100
            })
        );
    }

    #[test]
    fn revalidation_requires_scope_and_type() {
        let p = Predicate::new("blueorb", PostType::Question);
        let events = vec![
            question("q1", 5, None),
            post("other-scope", "alice", 6, vec![Tag::topic("elsewhere"), Tag::topic("question")]),
            post("reply", "alice", 7, vec![Tag::topic("blueorb"), Tag::topic("reply")]),
        ];
        let kept = revalidate(events, &p);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "q1");
    }

    #[test]
    fn subject_filter_keeps_newest_first() {
        let p = Predicate::new("blueorb", PostType::Question).subject(Some("math".into()));
        let events = vec![
            question("a", 1, Some("math")),
            question("b", 2, None),
            question("c", 3, Some("math")),
            question("d", 4, Some("art")),
            question("e", 5, None),
        ];
        let ids: Vec<_> = revalidate(events, &p).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[test]
    fn ties_keep_arrival_order() {
        let p = Predicate::new("blueorb", PostType::Question);
        let events = vec![question("x", 7, None), question("y", 7, None), question("z", 9, None)];
        let ids: Vec<_> = revalidate(events, &p).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["z", "x", "y"]);
    }

    #[test]
    fn author_and_parent_constraints() {
        let reply_tags = || vec![Tag::event("q1"), Tag::topic("blueorb"), Tag::topic("reply")];
        let p = Predicate::new("blueorb", PostType::Reply)
            .parent("q1")
            .author(Some("bob".into()));
        assert!(p.matches(&post("r1", "bob", 1, reply_tags())));
        assert!(!p.matches(&post("r2", "carol", 1, reply_tags())));
        let wrong_parent = vec![Tag::event("q2"), Tag::topic("blueorb"), Tag::topic("reply")];
        assert!(!p.matches(&post("r3", "bob", 1, wrong_parent)));
    }

    #[test]
    fn title_split() {
        assert_eq!(
            split_title("**Limits**\n\nWhat is a limit?"),
            (Some("Limits".into()), "What is a limit?".into())
        );
        assert_eq!(split_title("plain body"), (None, "plain body".into()));
        assert_eq!(split_title("**bold** text"), (None, "**bold** text".into()));
    }

    #[test]
    fn question_view_reads_tags() {
        let mut ev = question("q1", 3, Some("math"));
        ev.tags.push(Tag::role("student"));
        ev.content = "**Limits**\n\nbody".into();
        let view = Question::from_event(ev);
        assert_eq!(view.title.as_deref(), Some("Limits"));
        assert_eq!(view.body, "body");
        assert_eq!(view.subject.as_deref(), Some("math"));
        assert_eq!(view.role.as_deref(), Some("student"));
    }

    #[test]
    fn edits_flag_same_author_originals() {
        let original = post("r1", "bob", 1, vec![Tag::event("q1"), Tag::topic("reply")]);
        let other = post("r2", "carol", 2, vec![Tag::event("q1"), Tag::topic("reply")]);
        let edit = post(
            "r1-edit",
            "bob",
            3,
            vec![Tag::event("r1"), Tag::topic("reply"), Tag::topic("edit")],
        );
        let forged = post(
            "r2-edit",
            "mallory",
            4,
            vec![Tag::event("r2"), Tag::topic("reply"), Tag::topic("edit")],
        );
        let views = project_replies(vec![original, other, edit, forged]);
        assert!(views[0].edited);
        assert!(!views[1].edited);
        assert!(views[2].is_edit);
        assert_eq!(views[2].edit_of.as_deref(), Some("r1"));
        assert!(!views[0].is_edit);
        assert_eq!(views[0].edit_of, None);
    }
}
