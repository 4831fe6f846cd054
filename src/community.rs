//! Community operations: the write path (moderate, build, publish) and the
//! read path (query, re-validate, apply tombstones, project).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{stream, StreamExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::builder::{unix_now, EventBuilder, PostDraft, PostType, EDIT_MARKER};
use crate::error::{Error, Result};
use crate::event::{Event, Tag, TagName, KIND_METADATA, KIND_TEXT};
use crate::filter::Filter;
use crate::identity::{derive_public, ensure_ownership};
use crate::moderation::moderate;
use crate::pool::{EventSource, RelayPool};
use crate::publish::PublishOutcome;
use crate::subscribe::QueryOptions;
use crate::tombstone::TombstoneResolver;
use crate::view::{self, Predicate, Profile, Question, Reply};

const DEFAULT_ROLE_QUESTION: &str = "student";
const DEFAULT_ROLE_REPLY: &str = "teacher";
const DEFAULT_FEED_LIMIT: usize = 50;
const MAX_FEED_LIMIT: usize = 500;
const LIST_LIMIT: usize = 50;
const AUTHOR_REPLIES_LIMIT: usize = 100;
const BULK_LIMIT: usize = 1000;
const PROBE_LIMIT: usize = 10;
const CLEAR_CONCURRENCY: usize = 8;

/// Per-operation time budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub publish: Duration,
    pub query: Duration,
    pub feed: Duration,
    pub tombstone: Duration,
    pub stats: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            publish: Duration::from_millis(3000),
            query: Duration::from_millis(3000),
            feed: Duration::from_millis(10_000),
            tombstone: Duration::from_millis(2000),
            stats: Duration::from_millis(5000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommunityConfig {
    /// Value of the `t` tag every community event carries.
    pub scope: String,
    pub relays: Vec<String>,
    pub tor_socks: Option<String>,
    pub verify_sig: bool,
    pub timeouts: Timeouts,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    #[serde(default)]
    pub nsec: String,
    pub title: Option<String>,
    pub subject: Option<String>,
    #[serde(default)]
    pub content: String,
    pub role: Option<String>,
    /// Declared author; must match the key derived from `nsec`.
    pub pubkey: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReply {
    #[serde(default)]
    pub nsec: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub parent_id: String,
    pub role: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub pubkey: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditReply {
    #[serde(default)]
    pub nsec: String,
    #[serde(default)]
    pub reply_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    #[serde(default)]
    pub nsec: String,
    #[serde(default)]
    pub event_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedQuery {
    pub subject: Option<String>,
    pub role: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileSync {
    #[serde(default)]
    pub npub: String,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub nsec: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileSource {
    Cache,
    Relay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileRecord {
    pub pubkey: String,
    #[serde(flatten)]
    pub profile: Profile,
    pub updated_at: u64,
    pub source: ProfileSource,
}

/// Counts reported by [`Community::clear_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    pub total_found: usize,
    pub deleted: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommunityStats {
    pub questions: usize,
    pub replies: usize,
    pub active_users: usize,
    pub last_updated: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayProbe {
    pub relays: Vec<String>,
    pub events_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<Event>,
}

/// The community service shared by the HTTP API and the CLI.
pub struct Community {
    config: CommunityConfig,
    pool: RwLock<Option<Arc<RelayPool>>>,
    profiles: RwLock<HashMap<String, ProfileRecord>>,
}

impl Community {
    /// Create the service. Relays are not contacted until first use.
    pub fn new(config: CommunityConfig) -> Self {
        Self {
            config,
            pool: RwLock::new(None),
            profiles: RwLock::new(HashMap::new()),
        }
    }

    pub fn scope(&self) -> &str {
        &self.config.scope
    }

    pub fn timeouts(&self) -> Timeouts {
        self.config.timeouts
    }

    /// Current relay context, created on first use.
    pub fn pool(&self) -> Result<Arc<RelayPool>> {
        if let Some(pool) = self.pool.read().as_ref() {
            return Ok(pool.clone());
        }
        let mut slot = self.pool.write();
        if let Some(pool) = slot.as_ref() {
            return Ok(pool.clone());
        }
        let pool = Arc::new(RelayPool::new(
            self.config.relays.clone(),
            self.config.tor_socks.clone(),
            self.config.verify_sig,
        )?);
        info!(relays = ?pool.relays(), "relay pool ready");
        *slot = Some(pool.clone());
        Ok(pool)
    }

    /// Swap in a new relay set. Operations already running keep the old one.
    pub fn reconfigure(&self, relays: Vec<String>) -> Result<()> {
        let pool = Arc::new(RelayPool::new(
            relays,
            self.config.tor_socks.clone(),
            self.config.verify_sig,
        )?);
        info!(relays = ?pool.relays(), "relay pool replaced");
        *self.pool.write() = Some(pool);
        Ok(())
    }

    pub fn relays(&self) -> Vec<String> {
        match self.pool.read().as_ref() {
            Some(pool) => pool.relays().to_vec(),
            None => self.config.relays.clone(),
        }
    }

    pub async fn create_question(&self, req: NewQuestion) -> Result<PublishOutcome> {
        require(&[req.nsec.as_str(), req.content.as_str()])?;
        moderate(&req.content).into_result()?;
        let role = req.role.or_else(|| Some(DEFAULT_ROLE_QUESTION.into()));
        let draft = PostDraft::question(self.scope(), req.content)
            .with_title(req.title)
            .with_subject(req.subject)
            .with_role(role);
        draft.validate()?;
        ensure_ownership(&req.nsec, req.pubkey.as_deref())?;
        let event = EventBuilder::post(&draft, &req.nsec)?;
        self.publish("question", event).await
    }

    pub async fn list_questions(
        &self,
        subject: Option<String>,
        author: Option<String>,
    ) -> Result<Vec<Question>> {
        let predicate = Predicate::new(self.scope(), PostType::Question)
            .subject(subject)
            .author(author);
        let events = self
            .read_view(&predicate, LIST_LIMIT, LIST_LIMIT, self.config.timeouts.query)
            .await?;
        Ok(view::project_questions(events))
    }

    /// Newest questions, optionally narrowed by subject and role.
    pub async fn feed(&self, query: FeedQuery) -> Result<Vec<Question>> {
        let limit = query
            .limit
            .unwrap_or(DEFAULT_FEED_LIMIT)
            .clamp(1, MAX_FEED_LIMIT);
        let predicate = Predicate::new(self.scope(), PostType::Question)
            .subject(query.subject)
            .role(query.role);
        // Over-fetch since relays return a superset and some may be deleted.
        let events = self
            .read_view(&predicate, limit * 2, limit, self.config.timeouts.feed)
            .await?;
        Ok(view::project_questions(events))
    }

    pub async fn create_reply(&self, req: NewReply) -> Result<PublishOutcome> {
        require(&[req.nsec.as_str(), req.content.as_str(), req.parent_id.as_str()])?;
        moderate(&req.content).into_result()?;
        let role = req.role.or_else(|| Some(DEFAULT_ROLE_REPLY.into()));
        let draft = PostDraft::reply(self.scope(), req.parent_id, req.content)
            .with_role(role)
            .with_extra_tags(req.tags);
        draft.validate()?;
        ensure_ownership(&req.nsec, req.pubkey.as_deref())?;
        let event = EventBuilder::post(&draft, &req.nsec)?;
        self.publish("reply", event).await
    }

    /// Replies to `parent_id` together with any edits of those replies.
    pub async fn list_replies(&self, parent_id: &str) -> Result<Vec<Reply>> {
        require(&[parent_id]).map_err(|_| Error::Validation("Missing parentId".into()))?;
        let predicate = Predicate::new(self.scope(), PostType::Reply).parent(parent_id);
        let mut events = self
            .read_view(&predicate, LIST_LIMIT, LIST_LIMIT, self.config.timeouts.query)
            .await?;
        if !events.is_empty() {
            let authors: HashMap<String, String> = events
                .iter()
                .map(|ev| (ev.id.clone(), ev.pubkey.clone()))
                .collect();
            let edits = self.fetch_edits(&authors).await?;
            events.extend(edits.into_iter().filter(|ev| !authors.contains_key(&ev.id)));
            view::sort_newest_first(&mut events);
        }
        Ok(view::project_replies(events))
    }

    /// Edits of the replies in `authors` (reply id to author) made by the
    /// reply's own author.
    async fn fetch_edits(&self, authors: &HashMap<String, String>) -> Result<Vec<Event>> {
        let pool = self.pool()?;
        let filter = Filter::kinds([KIND_TEXT])
            .tag("e", authors.keys().cloned())
            .tag("t", [EDIT_MARKER])
            .limit(LIST_LIMIT);
        let edits: Vec<Event> = pool
            .fetch(vec![filter.clone()], QueryOptions::within(self.config.timeouts.query))
            .await
            .into_iter()
            .filter(|ev| {
                filter.matches(ev)
                    && ev.has_tag(TagName::Topic, self.scope())
                    && ev.has_tag(TagName::Topic, PostType::Reply.as_str())
                    && is_own_edit(ev, authors)
            })
            .collect();
        Ok(
            TombstoneResolver::new(pool.as_ref(), self.config.timeouts.tombstone)
                .exclude_deleted(edits)
                .await,
        )
    }

    pub async fn list_replies_by_author(&self, author: &str) -> Result<Vec<Reply>> {
        require(&[author]).map_err(|_| Error::Validation("Missing author".into()))?;
        let predicate =
            Predicate::new(self.scope(), PostType::Reply).author(Some(author.to_string()));
        let events = self
            .read_view(
                &predicate,
                AUTHOR_REPLIES_LIMIT,
                AUTHOR_REPLIES_LIMIT,
                self.config.timeouts.query,
            )
            .await?;
        Ok(view::project_replies(events))
    }

    /// Publish a new reply event superseding `reply_id`; the original stays.
    pub async fn edit_reply(&self, req: EditReply) -> Result<PublishOutcome> {
        require(&[req.nsec.as_str(), req.reply_id.as_str(), req.content.as_str()])?;
        moderate(&req.content).into_result()?;
        let draft =
            PostDraft::edit(self.scope(), req.reply_id, req.content).with_extra_tags(req.tags);
        draft.validate()?;
        let event = EventBuilder::post(&draft, &req.nsec)?;
        self.publish("edit", event).await
    }

    pub async fn delete(&self, req: DeleteRequest) -> Result<PublishOutcome> {
        require(&[req.nsec.as_str(), req.event_id.as_str()])?;
        let event = EventBuilder::tombstone(&[req.event_id], &req.nsec)?;
        self.publish("tombstone", event).await
    }

    /// Tombstone every scoped content event the caller has authored.
    pub async fn clear_all(&self, nsec: &str) -> Result<ClearReport> {
        require(&[nsec])?;
        let author = derive_public(nsec)?;
        let pool = self.pool()?;
        let filter = Filter::kinds([KIND_TEXT])
            .authors([author.clone()])
            .tag("t", [self.scope().to_string()])
            .limit(BULK_LIMIT);
        let mine: Vec<Event> = pool
            .fetch(vec![filter.clone()], QueryOptions::within(self.config.timeouts.stats))
            .await
            .into_iter()
            .filter(|ev| filter.matches(ev))
            .collect();
        let mut report = ClearReport {
            total_found: mine.len(),
            ..ClearReport::default()
        };
        if mine.is_empty() {
            return Ok(report);
        }
        let tombstones = mine
            .iter()
            .map(|ev| EventBuilder::tombstone(&[ev.id.clone()], nsec))
            .collect::<Result<Vec<_>>>()?;
        let budget = self.config.timeouts.publish;
        let results: Vec<Result<PublishOutcome>> = stream::iter(tombstones)
            .map(|tombstone| {
                let pool = pool.clone();
                async move { pool.publish(&tombstone, budget).await }
            })
            .buffer_unordered(CLEAR_CONCURRENCY)
            .collect()
            .await;
        for result in results {
            match result {
                Ok(_) => report.deleted += 1,
                Err(e) => {
                    warn!(author = %author, error = %e, "tombstone failed");
                    report.failed += 1;
                }
            }
        }
        info!(
            author = %author,
            found = report.total_found,
            deleted = report.deleted,
            failed = report.failed,
            "cleared events"
        );
        Ok(report)
    }

    /// Record profile fields locally. Nothing is published.
    pub fn sync_profile(&self, req: ProfileSync) -> Result<ProfileRecord> {
        require(&[req.npub.as_str()]).map_err(|_| Error::Validation("Missing npub".into()))?;
        let record = ProfileRecord {
            pubkey: req.npub.trim().to_lowercase(),
            profile: Profile {
                name: req.username.unwrap_or_default(),
                about: req.bio.unwrap_or_default(),
                role: req.role.unwrap_or_default(),
            },
            updated_at: unix_now(),
            source: ProfileSource::Cache,
        };
        self.profiles
            .write()
            .insert(record.pubkey.clone(), record.clone());
        debug!(pubkey = %record.pubkey, "profile cached");
        Ok(record)
    }

    /// Publish identity metadata and remember it locally.
    pub async fn publish_profile(&self, req: ProfileUpdate) -> Result<PublishOutcome> {
        require(&[req.nsec.as_str()])?;
        let pubkey = derive_public(&req.nsec)?;
        let profile = Profile {
            name: req.name,
            about: req.about,
            role: req.role,
        };
        let event = EventBuilder::profile(&profile, &req.nsec)?;
        let outcome = self.publish("profile", event).await?;
        self.profiles.write().insert(
            pubkey.clone(),
            ProfileRecord {
                pubkey,
                profile,
                updated_at: unix_now(),
                source: ProfileSource::Cache,
            },
        );
        Ok(outcome)
    }

    /// Cached profile for `pubkey`, else the newest metadata event on relays.
    pub async fn fetch_profile(&self, pubkey: &str) -> Result<Option<ProfileRecord>> {
        require(&[pubkey]).map_err(|_| Error::Validation("Missing pubkey".into()))?;
        let pubkey = pubkey.trim().to_lowercase();
        let cached = self.profiles.read().get(&pubkey).cloned();
        if cached.is_some() {
            return Ok(cached);
        }
        let pool = self.pool()?;
        let filter = Filter::kinds([KIND_METADATA])
            .authors([pubkey.clone()])
            .limit(1);
        let opts = QueryOptions::within(self.config.timeouts.query).close_on_eose();
        let newest = pool
            .fetch(vec![filter.clone()], opts)
            .await
            .into_iter()
            .filter(|ev| filter.matches(ev))
            .max_by_key(|ev| ev.created_at);
        let Some(ev) = newest else {
            return Ok(None);
        };
        match serde_json::from_str::<Profile>(&ev.content) {
            Ok(profile) => Ok(Some(ProfileRecord {
                pubkey,
                profile,
                updated_at: ev.created_at,
                source: ProfileSource::Relay,
            })),
            Err(e) => {
                debug!(id = %ev.id, error = %e, "unreadable profile metadata");
                Ok(None)
            }
        }
    }

    /// Question, reply and author counts over the scope.
    pub async fn stats(&self) -> Result<CommunityStats> {
        let pool = self.pool()?;
        let budget = self.config.timeouts.stats;
        let questions = Predicate::new(self.scope(), PostType::Question);
        let replies = Predicate::new(self.scope(), PostType::Reply);
        let (q_events, r_events) = tokio::join!(
            pool.fetch(
                vec![questions.relay_filter(BULK_LIMIT)],
                QueryOptions::within(budget)
            ),
            pool.fetch(
                vec![replies.relay_filter(BULK_LIMIT)],
                QueryOptions::within(budget)
            ),
        );
        let q_events = view::revalidate(q_events, &questions);
        let r_events = view::revalidate(r_events, &replies);
        let authors: HashSet<&str> = q_events
            .iter()
            .chain(r_events.iter())
            .map(|ev| ev.pubkey.as_str())
            .collect();
        Ok(CommunityStats {
            questions: q_events.len(),
            replies: r_events.len(),
            active_users: authors.len(),
            last_updated: unix_now(),
        })
    }

    /// Check that scoped events are visible on the configured relays.
    pub async fn probe(&self) -> Result<RelayProbe> {
        let pool = self.pool()?;
        let filter = Filter::kinds([KIND_TEXT])
            .tag("t", [self.scope().to_string()])
            .limit(PROBE_LIMIT);
        let opts = QueryOptions::within(self.config.timeouts.query).close_on_eose();
        let mut events: Vec<Event> = pool
            .fetch(vec![filter.clone()], opts)
            .await
            .into_iter()
            .filter(|ev| filter.matches(ev))
            .collect();
        view::sort_newest_first(&mut events);
        info!(found = events.len(), "relay probe finished");
        Ok(RelayProbe {
            relays: pool.relays().to_vec(),
            events_found: events.len(),
            sample: events.into_iter().next(),
        })
    }

    async fn publish(&self, what: &str, event: Event) -> Result<PublishOutcome> {
        let pool = self.pool()?;
        info!(kind = what, id = %event.id, author = %event.pubkey, "publishing");
        pool.publish(&event, self.config.timeouts.publish).await
    }

    /// Query, re-validate, drop tombstoned events and truncate to `keep`.
    async fn read_view(
        &self,
        predicate: &Predicate,
        fetch_limit: usize,
        keep: usize,
        budget: Duration,
    ) -> Result<Vec<Event>> {
        let pool = self.pool()?;
        let received = pool
            .fetch(
                vec![predicate.relay_filter(fetch_limit)],
                QueryOptions::within(budget),
            )
            .await;
        let total = received.len();
        let matching = view::revalidate(received, predicate);
        let mut events = TombstoneResolver::new(pool.as_ref(), self.config.timeouts.tombstone)
            .exclude_deleted(matching)
            .await;
        events.truncate(keep);
        debug!(received = total, kept = events.len(), "view assembled");
        Ok(events)
    }
}

fn require(fields: &[&str]) -> Result<()> {
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(Error::Validation("Missing required fields".into()));
    }
    Ok(())
}

/// True when `edit` targets a known reply written by the same author.
fn is_own_edit(edit: &Event, authors: &HashMap<String, String>) -> bool {
    edit.first_tag_value(TagName::Event)
        .and_then(|target| authors.get(target))
        .is_some_and(|author| *author == edit.pubkey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::generate_keypair;

    fn community() -> Community {
        Community::new(CommunityConfig {
            scope: "blueorb".into(),
            relays: vec!["ws://127.0.0.1:9".into()],
            tor_socks: None,
            verify_sig: true,
            timeouts: Timeouts::default(),
        })
    }

    #[tokio::test]
    async fn missing_fields_fail_before_network() {
        let c = community();
        let err = c.create_question(NewQuestion::default()).await.unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg == "Missing required fields"));
        let err = c
            .create_reply(NewReply {
                nsec: "00".into(),
                content: "hello".into(),
                ..NewReply::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn moderation_runs_before_signing() {
        let c = community();
        let err = c
            .create_question(NewQuestion {
                nsec: "not-a-key".into(),
                content: "aaaaaaaaaaaaa".into(),
                ..NewQuestion::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Moderation(_)));
    }

    #[tokio::test]
    async fn declared_author_must_own_the_secret() {
        let c = community();
        let signer = generate_keypair();
        let other = generate_keypair();
        let err = c
            .create_question(NewQuestion {
                nsec: signer.nsec,
                content: "What is a derivative?".into(),
                pubkey: Some(other.npub),
                ..NewQuestion::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::KeyMismatch));
    }

    #[tokio::test]
    async fn invalid_secret_is_reported() {
        let c = community();
        let err = c
            .delete(DeleteRequest {
                nsec: "zz".into(),
                event_id: "abc".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSecret));
    }

    #[test]
    fn pool_is_lazy_and_replaced_wholesale() {
        let c = community();
        assert_eq!(c.relays(), vec!["ws://127.0.0.1:9".to_string()]);
        let first = c.pool().unwrap();
        assert!(Arc::ptr_eq(&first, &c.pool().unwrap()));
        c.reconfigure(vec!["ws://127.0.0.1:10".into()]).unwrap();
        let second = c.pool().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.relays(), ["ws://127.0.0.1:9"]);
        assert_eq!(c.relays(), vec!["ws://127.0.0.1:10".to_string()]);
        assert!(c.reconfigure(vec![]).is_err());
        assert_eq!(c.relays(), vec!["ws://127.0.0.1:10".to_string()]);
    }

    #[tokio::test]
    async fn profile_sync_is_served_from_cache() {
        let c = community();
        let keys = generate_keypair();
        let record = c
            .sync_profile(ProfileSync {
                npub: keys.npub.to_uppercase(),
                username: Some("ada".into()),
                bio: None,
                role: Some("teacher".into()),
            })
            .unwrap();
        assert_eq!(record.pubkey, keys.npub);
        let fetched = c.fetch_profile(&keys.npub).await.unwrap().unwrap();
        assert_eq!(fetched.profile.name, "ada");
        assert_eq!(fetched.source, ProfileSource::Cache);
        assert!(matches!(
            c.sync_profile(ProfileSync::default()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn edits_count_only_from_the_reply_author() {
        let edit = |pubkey: &str, target: &str| Event {
            id: format!("edit-{pubkey}"),
            pubkey: pubkey.into(),
            kind: KIND_TEXT,
            created_at: 1,
            tags: vec![Tag::event(target), Tag::topic(EDIT_MARKER)],
            content: "revised".into(),
            sig: String::new(),
        };
        let authors = HashMap::from([("r1".to_string(), "bob".to_string())]);
        assert!(is_own_edit(&edit("bob", "r1"), &authors));
        assert!(!is_own_edit(&edit("mallory", "r1"), &authors));
        assert!(!is_own_edit(&edit("bob", "r2"), &authors));
    }

    #[test]
    fn profile_record_flattens_fields() {
        let record = ProfileRecord {
            pubkey: "pk".into(),
            profile: Profile {
                name: "ada".into(),
                about: "math".into(),
                role: "teacher".into(),
            },
            updated_at: 7,
            source: ProfileSource::Relay,
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            serde_json::json!({
                "pubkey": "pk",
                "name": "ada",
                "about": "math",
                "role": "teacher",
                "updated_at": 7,
                "source": "relay"
            })
        );
    }
}
