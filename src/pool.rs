//! Relay client context: the endpoint set and how to reach it.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_socks::tcp::Socks5Stream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{client_async_tls, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::{Error, Result};
use crate::event::Event;
use crate::filter::Filter;
use crate::publish::{self, PublishOutcome};
use crate::subscribe::{self, QueryOptions, Subscription};

/// Blanket trait for boxed async read/write streams.
pub trait AsyncReadWrite: AsyncRead + AsyncWrite {}
impl<T: AsyncRead + AsyncWrite> AsyncReadWrite for T {}

/// An open relay connection, plain or TLS, direct or proxied.
pub type RelayStream = WebSocketStream<MaybeTlsStream<Box<dyn AsyncReadWrite + Unpin + Send>>>;

/// Immutable relay client context.
///
/// Built once from configuration and shared; a different relay set means a
/// new pool, so in-flight operations keep the endpoints they started with.
#[derive(Debug, Clone)]
pub struct RelayPool {
    relays: Vec<String>,
    tor_socks: Option<String>,
    verify_sig: bool,
}

impl RelayPool {
    /// Validate and deduplicate `relays` (order preserved).
    pub fn new(relays: Vec<String>, tor_socks: Option<String>, verify_sig: bool) -> Result<Self> {
        let mut unique: Vec<String> = Vec::with_capacity(relays.len());
        for relay in relays {
            let relay = relay.trim().to_string();
            if relay.is_empty() || unique.contains(&relay) {
                continue;
            }
            let url = Url::parse(&relay)?;
            if !matches!(url.scheme(), "ws" | "wss") || url.host_str().is_none() {
                return Err(Error::Validation(format!("unsupported relay url: {relay}")));
            }
            unique.push(relay);
        }
        if unique.is_empty() {
            return Err(Error::Validation("no relays configured".into()));
        }
        Ok(Self {
            relays: unique,
            tor_socks,
            verify_sig,
        })
    }

    pub fn relays(&self) -> &[String] {
        &self.relays
    }

    pub fn verify_sig(&self) -> bool {
        self.verify_sig
    }

    /// Race `event` to every relay; see [`publish::publish`].
    pub async fn publish(&self, event: &Event, budget: Duration) -> Result<PublishOutcome> {
        publish::publish(self, event, budget).await
    }

    /// Open a subscription on every relay; see [`subscribe::subscribe`].
    pub fn subscribe(&self, filters: Vec<Filter>, opts: QueryOptions) -> Subscription {
        subscribe::subscribe(self, filters, opts)
    }

    /// Establish a WebSocket connection, optionally via a SOCKS5 proxy.
    pub(crate) async fn connect(&self, relay: &str) -> Result<RelayStream> {
        let url = Url::parse(relay)?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::Validation(format!("missing host in {relay}")))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| Error::Validation(format!("missing port in {relay}")))?;
        let req = relay.into_client_request()?;
        let stream: Box<dyn AsyncReadWrite + Unpin + Send> = match &self.tor_socks {
            Some(proxy) => Box::new(Socks5Stream::connect(proxy.as_str(), (host, port)).await?),
            None => Box::new(TcpStream::connect((host, port)).await?),
        };
        let (ws, _) = client_async_tls(req, stream).await?;
        Ok(ws)
    }
}

/// Read access to relay events, the seam between network and projection.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Collect events matching any of `filters` within the query options.
    async fn fetch(&self, filters: Vec<Filter>, opts: QueryOptions) -> Vec<Event>;
}

#[async_trait]
impl EventSource for RelayPool {
    async fn fetch(&self, filters: Vec<Filter>, opts: QueryOptions) -> Vec<Event> {
        self.subscribe(filters, opts).collect().await
    }
}

/// Messages a relay sends to clients.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayMessage {
    Event { sub_id: String, event: Box<Event> },
    Ok { event_id: String, accepted: bool, message: String },
    Eose(String),
    Closed { sub_id: String, message: String },
    Notice(String),
}

impl RelayMessage {
    /// Parse a relay frame; unknown or malformed frames yield `None`.
    pub fn parse(txt: &str) -> Option<Self> {
        let val: Value = serde_json::from_str(txt).ok()?;
        let arr = val.as_array()?;
        let text = |i: usize| arr.get(i).and_then(|v| v.as_str()).map(str::to_string);
        match arr.first()?.as_str()? {
            "EVENT" => {
                let event = serde_json::from_value::<Event>(arr.get(2)?.clone()).ok()?;
                Some(RelayMessage::Event {
                    sub_id: text(1)?,
                    event: Box::new(event),
                })
            }
            "OK" => Some(RelayMessage::Ok {
                event_id: text(1)?,
                accepted: arr.get(2)?.as_bool()?,
                message: text(3).unwrap_or_default(),
            }),
            "EOSE" => Some(RelayMessage::Eose(text(1)?)),
            "CLOSED" => Some(RelayMessage::Closed {
                sub_id: text(1)?,
                message: text(2).unwrap_or_default(),
            }),
            "NOTICE" => Some(RelayMessage::Notice(text(1).unwrap_or_default())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_dedupes_and_validates() {
        let pool = RelayPool::new(
            vec![
                "ws://a.example".into(),
                " ws://a.example ".into(),
                "wss://b.example".into(),
                String::new(),
            ],
            None,
            true,
        )
        .unwrap();
        assert_eq!(pool.relays(), ["ws://a.example", "wss://b.example"]);

        assert!(matches!(
            RelayPool::new(vec!["https://a.example".into()], None, true),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            RelayPool::new(vec![], None, true),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            RelayPool::new(vec!["not a url".into()], None, true),
            Err(Error::Url(_))
        ));
    }

    #[test]
    fn parses_relay_frames() {
        assert_eq!(
            RelayMessage::parse(r#"["OK","abc",false,"blocked: spam"]"#),
            Some(RelayMessage::Ok {
                event_id: "abc".into(),
                accepted: false,
                message: "blocked: spam".into()
            })
        );
        assert_eq!(
            RelayMessage::parse(r#"["EOSE","sub1"]"#),
            Some(RelayMessage::Eose("sub1".into()))
        );
        assert_eq!(
            RelayMessage::parse(r#"["NOTICE","slow down"]"#),
            Some(RelayMessage::Notice("slow down".into()))
        );
        let ev = r#"["EVENT","sub1",{"id":"aa","pubkey":"pp","created_at":1,"kind":1,"tags":[["t","x"]],"content":"hi","sig":"ss"}]"#;
        match RelayMessage::parse(ev) {
            Some(RelayMessage::Event { sub_id, event }) => {
                assert_eq!(sub_id, "sub1");
                assert_eq!(event.content, "hi");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_frames_are_ignored() {
        assert_eq!(RelayMessage::parse("not json"), None);
        assert_eq!(RelayMessage::parse(r#"{"EOSE":1}"#), None);
        assert_eq!(RelayMessage::parse(r#"["AUTH","challenge"]"#), None);
        assert_eq!(RelayMessage::parse(r#"["EVENT","sub1",{"id":1}]"#), None);
        assert_eq!(RelayMessage::parse(r#"["OK","abc"]"#), None);
    }
}
