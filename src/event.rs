//! Nostr event model.

use secp256k1::{schnorr::Signature, Message, Secp256k1, XOnlyPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Identity metadata (profile) events.
pub const KIND_METADATA: u32 = 0;
/// Content events: questions, replies and edits.
pub const KIND_TEXT: u32 = 1;
/// Tombstones naming events their author wants removed.
pub const KIND_DELETION: u32 = 5;

/// Tag names this crate interprets. Anything else is carried verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagName {
    /// `t` – scope or type marker (community scope, `question`, `reply`, `edit`).
    Topic,
    /// `subject` – topical category.
    Subject,
    /// `role` – the author's declared role at post time.
    Role,
    /// `p` – author public key embedded for discovery.
    Pubkey,
    /// `e` – reference to another event id.
    Event,
    /// Unrecognized name; never interpreted.
    Other,
}

impl TagName {
    /// Wire name of a recognized tag.
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            TagName::Topic => Some("t"),
            TagName::Subject => Some("subject"),
            TagName::Role => Some("role"),
            TagName::Pubkey => Some("p"),
            TagName::Event => Some("e"),
            TagName::Other => None,
        }
    }

    fn parse(name: &str) -> Self {
        match name {
            "t" => TagName::Topic,
            "subject" => TagName::Subject,
            "role" => TagName::Role,
            "p" => TagName::Pubkey,
            "e" => TagName::Event,
            _ => TagName::Other,
        }
    }
}

/// Wrapper for a Nostr tag expressed as an array of strings.
///
/// The first element is the tag name and the following elements hold its
/// values, e.g. `["t", "question"]` or `["e", "<event id>"]`. Tags are stored
/// verbatim so custom tags survive a round trip unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag(pub Vec<String>);

impl Tag {
    /// Build a two-element tag.
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Tag(vec![name.to_string(), value.into()])
    }

    pub fn topic(value: impl Into<String>) -> Self {
        Tag::new("t", value)
    }

    pub fn subject(value: impl Into<String>) -> Self {
        Tag::new("subject", value)
    }

    pub fn role(value: impl Into<String>) -> Self {
        Tag::new("role", value)
    }

    pub fn pubkey(value: impl Into<String>) -> Self {
        Tag::new("p", value)
    }

    pub fn event(value: impl Into<String>) -> Self {
        Tag::new("e", value)
    }

    /// Raw name as it appears on the wire.
    pub fn raw_name(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Recognized name of this tag.
    pub fn name(&self) -> TagName {
        self.raw_name().map_or(TagName::Other, TagName::parse)
    }

    /// First value after the name.
    pub fn value(&self) -> Option<&str> {
        self.0.get(1).map(String::as_str)
    }

    /// True when the tag is named `name` and its first value equals `value`.
    pub fn is(&self, name: TagName, value: &str) -> bool {
        self.name() == name && name != TagName::Other && self.value() == Some(value)
    }
}

/// Core Nostr event as exchanged with relays.
///
/// ```json
/// {
///   "id": "aa11...",
///   "pubkey": "79be...",
///   "kind": 1,
///   "created_at": 1700000000,
///   "tags": [["t", "blueorb"], ["t", "question"], ["subject", "math"]],
///   "content": "How do I factor x^2 - 1?",
///   "sig": "deadbeef..."
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    /// Event identifier (hex of SHA-256 hash).
    pub id: String,
    /// Author public key (x-only, hex).
    pub pubkey: String,
    /// Kind number, e.g. `1` or `5`.
    pub kind: u32,
    /// Unix timestamp of creation.
    pub created_at: u64,
    /// Ordered tags.
    pub tags: Vec<Tag>,
    /// Event content body.
    pub content: String,
    /// Schnorr signature over the event hash.
    pub sig: String,
}

impl Event {
    /// True when any tag named `name` has `value` as its first value.
    pub fn has_tag(&self, name: TagName, value: &str) -> bool {
        self.tags.iter().any(|t| t.is(name, value))
    }

    /// First values of every tag named `name`, in tag order.
    pub fn tag_values(&self, name: TagName) -> impl Iterator<Item = &str> + '_ {
        self.tags
            .iter()
            .filter(move |t| name != TagName::Other && t.name() == name)
            .filter_map(Tag::value)
    }

    /// First value of the first tag named `name`.
    pub fn first_tag_value(&self, name: TagName) -> Option<&str> {
        self.tag_values(name).next()
    }

    /// Recompute the id from the five hashed fields.
    pub fn compute_id(&self) -> Result<String> {
        let hash = event_hash(&self.pubkey, self.created_at, self.kind, &self.tags, &self.content)?;
        Ok(hex::encode(hash))
    }

    /// Verify the event's id and Schnorr signature.
    pub fn verify(&self) -> Result<()> {
        let hash = event_hash(&self.pubkey, self.created_at, self.kind, &self.tags, &self.content)?;
        if hex::encode(hash) != self.id {
            return Err(Error::InvalidEvent("id mismatch".into()));
        }
        let sig = Signature::from_slice(&hex::decode(&self.sig)?)?;
        let pk = XOnlyPublicKey::from_slice(&hex::decode(&self.pubkey)?)?;
        let secp = Secp256k1::verification_only();
        let msg = Message::from_digest_slice(&hash)?;
        secp.verify_schnorr(&sig, &msg, &pk)?;
        Ok(())
    }
}

/// Canonical NIP-01 hash: SHA-256 of `[0, pubkey, created_at, kind, tags, content]`.
pub fn event_hash(
    pubkey: &str,
    created_at: u64,
    kind: u32,
    tags: &[Tag],
    content: &str,
) -> Result<[u8; 32]> {
    let arr = serde_json::json!([0, pubkey, created_at, kind, tags, content]);
    let data = serde_json::to_vec(&arr)?;
    Ok(Sha256::digest(&data).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tags() -> Vec<Tag> {
        vec![
            Tag::topic("blueorb"),
            Tag::topic("question"),
            Tag::subject("math"),
            Tag(vec!["client".into(), "x".into(), "y".into()]),
        ]
    }

    #[test]
    fn tags_serialize_as_plain_arrays() {
        let json = serde_json::to_string(&sample_tags()).unwrap();
        assert_eq!(
            json,
            r#"[["t","blueorb"],["t","question"],["subject","math"],["client","x","y"]]"#
        );
        let back: Vec<Tag> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample_tags());
    }

    #[test]
    fn unknown_tags_are_opaque() {
        let tag = Tag(vec!["client".into(), "x".into()]);
        assert_eq!(tag.name(), TagName::Other);
        assert_eq!(tag.raw_name(), Some("client"));
        assert!(!tag.is(TagName::Other, "x"));
        let ev = Event {
            id: String::new(),
            pubkey: String::new(),
            kind: KIND_TEXT,
            created_at: 0,
            tags: vec![tag],
            content: String::new(),
            sig: String::new(),
        };
        assert_eq!(ev.tag_values(TagName::Other).count(), 0);
    }

    #[test]
    fn tag_lookup_helpers() {
        let ev = Event {
            id: String::new(),
            pubkey: String::new(),
            kind: KIND_TEXT,
            created_at: 0,
            tags: sample_tags(),
            content: String::new(),
            sig: String::new(),
        };
        assert!(ev.has_tag(TagName::Topic, "question"));
        assert!(!ev.has_tag(TagName::Topic, "reply"));
        assert_eq!(
            ev.tag_values(TagName::Topic).collect::<Vec<_>>(),
            vec!["blueorb", "question"]
        );
        assert_eq!(ev.first_tag_value(TagName::Subject), Some("math"));
        assert_eq!(ev.first_tag_value(TagName::Role), None);
    }

    #[test]
    fn hash_matches_reference_serialization() {
        let tags = vec![Tag::topic("news")];
        let hash = event_hash("ab", 1, 1, &tags, "hi\n\"there\"").unwrap();
        let expected = Sha256::digest(br#"[0,"ab",1,1,[["t","news"]],"hi\n\"there\""]"#);
        assert_eq!(hex::encode(hash), hex::encode(expected));
    }

    #[test]
    fn hash_changes_with_every_field() {
        let tags = sample_tags();
        let base = event_hash("ab", 10, 1, &tags, "body").unwrap();
        assert_eq!(base, event_hash("ab", 10, 1, &tags, "body").unwrap());
        assert_ne!(base, event_hash("ac", 10, 1, &tags, "body").unwrap());
        assert_ne!(base, event_hash("ab", 11, 1, &tags, "body").unwrap());
        assert_ne!(base, event_hash("ab", 10, 5, &tags, "body").unwrap());
        assert_ne!(base, event_hash("ab", 10, 1, &tags[1..], "body").unwrap());
        assert_ne!(base, event_hash("ab", 10, 1, &tags, "body!").unwrap());
    }

    #[test]
    fn verify_rejects_id_mismatch() {
        let ev = Event {
            id: "ff".repeat(32),
            pubkey: "00".repeat(32),
            kind: KIND_TEXT,
            created_at: 1,
            tags: vec![],
            content: String::new(),
            sig: String::new(),
        };
        assert!(matches!(ev.verify(), Err(Error::InvalidEvent(_))));
    }
}
