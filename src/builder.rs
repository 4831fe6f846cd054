//! Construction of canonical signed events.
//!
//! [`PostDraft`] carries the semantic inputs of a question, reply or edit and
//! is validated before any key material is touched. [`EventBuilder`] turns a
//! kind, content and tags into a signed event.

use std::time::{SystemTime, UNIX_EPOCH};

use secp256k1::{Message, Secp256k1};

use crate::error::{Error, Result};
use crate::event::{event_hash, Event, Tag, TagName, KIND_DELETION, KIND_METADATA, KIND_TEXT};
use crate::identity::Keys;
use crate::view::Profile;

pub const MIN_CONTENT_CHARS: usize = 3;
pub const MAX_CONTENT_CHARS: usize = 10_000;
pub const MAX_TITLE_CHARS: usize = 200;

/// `t` value marking an edit of an earlier reply.
pub const EDIT_MARKER: &str = "edit";

/// Type marker carried in a `t` tag next to the community scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostType {
    Question,
    Reply,
}

impl PostType {
    pub fn as_str(self) -> &'static str {
        match self {
            PostType::Question => "question",
            PostType::Reply => "reply",
        }
    }
}

/// Semantic inputs for a content event.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub scope: String,
    pub post_type: PostType,
    pub content: String,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub role: Option<String>,
    /// Question a reply answers.
    pub parent_id: Option<String>,
    /// Reply an edit supersedes.
    pub edit_of: Option<String>,
    /// Caller tags appended after the structured ones.
    pub extra_tags: Vec<Tag>,
}

impl PostDraft {
    pub fn question(scope: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            post_type: PostType::Question,
            content: content.into(),
            title: None,
            subject: None,
            role: None,
            parent_id: None,
            edit_of: None,
            extra_tags: vec![],
        }
    }

    pub fn reply(
        scope: impl Into<String>,
        parent_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            post_type: PostType::Reply,
            parent_id: Some(parent_id.into()),
            ..Self::question(scope, content)
        }
    }

    pub fn edit(
        scope: impl Into<String>,
        reply_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            post_type: PostType::Reply,
            edit_of: Some(reply_id.into()),
            ..Self::question(scope, content)
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = non_empty(title);
        self
    }

    pub fn with_subject(mut self, subject: Option<String>) -> Self {
        self.subject = non_empty(subject);
        self
    }

    pub fn with_role(mut self, role: Option<String>) -> Self {
        self.role = non_empty(role);
        self
    }

    pub fn with_extra_tags(mut self, tags: Vec<Tag>) -> Self {
        self.extra_tags = tags;
        self
    }

    /// Size and shape checks. Runs before any cryptographic work.
    pub fn validate(&self) -> Result<()> {
        if self.scope.trim().is_empty() {
            return Err(Error::Validation("Missing community scope".into()));
        }
        let chars = self.content.chars().count();
        if chars < MIN_CONTENT_CHARS {
            return Err(Error::Validation("Content too short".into()));
        }
        if chars > MAX_CONTENT_CHARS {
            return Err(Error::Validation(
                "Content too long. Maximum 10,000 characters.".into(),
            ));
        }
        if let Some(title) = &self.title {
            if title.chars().count() > MAX_TITLE_CHARS {
                return Err(Error::Validation(
                    "Title too long. Maximum 200 characters.".into(),
                ));
            }
        }
        match self.post_type {
            PostType::Question if self.parent_id.is_some() || self.edit_of.is_some() => {
                return Err(Error::Validation("Questions cannot reference events".into()));
            }
            PostType::Reply if self.parent_id.is_none() && self.edit_of.is_none() => {
                return Err(Error::Validation("Missing parentId".into()));
            }
            PostType::Reply if self.parent_id.is_some() && self.edit_of.is_some() => {
                return Err(Error::Validation("Edits reference the reply only".into()));
            }
            _ => {}
        }
        Ok(())
    }

    /// Content as published; a title is folded in as a bold first line.
    pub fn body(&self) -> String {
        match &self.title {
            Some(title) => format!("**{title}**\n\n{}", self.content),
            None => self.content.clone(),
        }
    }

    fn tags(&self, author: &str) -> Vec<Tag> {
        let mut tags = vec![];
        if let Some(target) = self.parent_id.as_ref().or(self.edit_of.as_ref()) {
            tags.push(Tag::event(target.clone()));
        }
        tags.push(Tag::topic(self.scope.clone()));
        tags.push(Tag::topic(self.post_type.as_str()));
        if self.edit_of.is_some() {
            tags.push(Tag::topic(EDIT_MARKER));
        }
        if let Some(subject) = &self.subject {
            tags.push(Tag::subject(subject.clone()));
        }
        if let Some(role) = &self.role {
            tags.push(Tag::role(role.clone()));
        }
        tags.push(Tag::pubkey(author));
        // Author keys come from the secret only.
        tags.extend(
            self.extra_tags
                .iter()
                .filter(|t| t.0.len() >= 2 && t.name() != TagName::Pubkey)
                .cloned(),
        );
        tags
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Low-level event assembly and signing.
pub struct EventBuilder {
    kind: u32,
    content: String,
    tags: Vec<Tag>,
    created_at: Option<u64>,
}

impl EventBuilder {
    pub fn new(kind: u32, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            tags: vec![],
            created_at: None,
        }
    }

    pub fn tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Override the creation time (defaults to now).
    pub fn created_at(mut self, ts: u64) -> Self {
        self.created_at = Some(ts);
        self
    }

    /// Hash and sign with `keys`.
    pub fn sign(self, keys: &Keys) -> Result<Event> {
        let created_at = self.created_at.unwrap_or_else(unix_now);
        let pubkey = keys.public_hex().to_string();
        let hash = event_hash(&pubkey, created_at, self.kind, &self.tags, &self.content)?;
        let secp = Secp256k1::signing_only();
        let msg = Message::from_digest_slice(&hash)?;
        let sig = secp.sign_schnorr_no_aux_rand(&msg, keys.keypair());
        Ok(Event {
            id: hex::encode(hash),
            pubkey,
            kind: self.kind,
            created_at,
            tags: self.tags,
            content: self.content,
            sig: hex::encode(sig.as_ref()),
        })
    }

    /// Build a question, reply or edit from a validated draft.
    pub fn post(draft: &PostDraft, secret: &str) -> Result<Event> {
        draft.validate()?;
        let keys = Keys::from_secret_hex(secret)?;
        let tags = draft.tags(keys.public_hex());
        EventBuilder::new(KIND_TEXT, draft.body()).tags(tags).sign(&keys)
    }

    /// Build a tombstone naming `targets`.
    pub fn tombstone(targets: &[String], secret: &str) -> Result<Event> {
        if targets.is_empty() || targets.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::Validation("Missing eventId".into()));
        }
        let keys = Keys::from_secret_hex(secret)?;
        EventBuilder::new(KIND_DELETION, "")
            .tags(targets.iter().map(|id| Tag::event(id.clone())))
            .sign(&keys)
    }

    /// Build an identity-metadata event.
    pub fn profile(profile: &Profile, secret: &str) -> Result<Event> {
        let keys = Keys::from_secret_hex(secret)?;
        let content = serde_json::to_string(profile)?;
        EventBuilder::new(KIND_METADATA, content).sign(&keys)
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
