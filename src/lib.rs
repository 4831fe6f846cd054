//! Community questions and answers over Nostr relays.
//!
//! Relays are untrusted, append-only stores. Writes race a signed event to
//! every relay and settle on the first answer; reads collect from every relay
//! within a time budget, re-check what came back, drop events their author has
//! tombstoned and order the rest newest first.

pub mod api;
pub mod builder;
pub mod community;
pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod identity;
pub mod moderation;
pub mod pool;
pub mod publish;
pub mod subscribe;
pub mod tombstone;
pub mod view;

pub use builder::{EventBuilder, PostDraft, PostType};
pub use community::{Community, CommunityConfig, Timeouts};
pub use error::{Error, Result};
pub use event::{Event, Tag, TagName};
pub use filter::Filter;
pub use pool::{EventSource, RelayPool};
pub use publish::PublishOutcome;
pub use subscribe::{QueryOptions, StopHandle, Subscription};
