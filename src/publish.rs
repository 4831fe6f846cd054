//! Publishing with a quorum of one.
//!
//! An event is sent to every relay at once. The first decisive answer wins:
//! an acceptance confirms the publish, an explicit refusal fails it. Silence
//! until the budget runs out is reported as an ambiguous success.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, timeout_at, Instant};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::event::Event;
use crate::pool::{RelayMessage, RelayPool};

/// Result of a publish race that was not refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    pub ok: bool,
    pub id: String,
    /// Relay whose acceptance confirmed the publish.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay: Option<String>,
    /// No relay answered before the budget ran out.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub timeout: bool,
}

impl PublishOutcome {
    fn confirmed(id: &str, relay: String) -> Self {
        Self {
            ok: true,
            id: id.to_string(),
            relay: Some(relay),
            timeout: false,
        }
    }

    fn ambiguous(id: &str) -> Self {
        Self {
            ok: true,
            id: id.to_string(),
            relay: None,
            timeout: true,
        }
    }

    /// True when a relay acknowledged the event.
    pub fn is_confirmed(&self) -> bool {
        !self.timeout
    }
}

#[derive(Debug)]
enum Ack {
    Accepted(String),
    Rejected { relay: String, reason: String },
    Silent(String),
}

/// Send `event` to every relay of `pool` and resolve on the first decisive
/// answer or when `budget` elapses.
///
/// The race runs on its own task; dropping the returned future leaves it to
/// finish in the background.
pub async fn publish(pool: &RelayPool, event: &Event, budget: Duration) -> Result<PublishOutcome> {
    let race = tokio::spawn(race(pool.clone(), event.clone(), budget));
    race.await?
}

async fn race(pool: RelayPool, event: Event, budget: Duration) -> Result<PublishOutcome> {
    let deadline = Instant::now() + budget;
    let (tx, mut rx) = mpsc::channel(pool.relays().len());
    for relay in pool.relays() {
        tokio::spawn(send_to_relay(
            pool.clone(),
            relay.clone(),
            event.clone(),
            deadline,
            tx.clone(),
        ));
    }
    drop(tx);

    let timer = sleep_until(deadline);
    tokio::pin!(timer);
    loop {
        tokio::select! {
            biased;
            ack = rx.recv() => match ack {
                Some(Ack::Accepted(relay)) => {
                    info!(id = %event.id, relay = %relay, "event accepted");
                    return Ok(PublishOutcome::confirmed(&event.id, relay));
                }
                Some(Ack::Rejected { relay, reason }) => {
                    warn!(id = %event.id, relay = %relay, reason = %reason, "event rejected");
                    return Err(Error::RelayRejected { relay, reason });
                }
                Some(Ack::Silent(relay)) => {
                    debug!(id = %event.id, relay = %relay, "relay finished without answer");
                }
                None => {
                    // Every relay went quiet; the outcome is only known at the budget.
                    debug!(id = %event.id, "no relay feedback, waiting out the budget");
                    (&mut timer).await;
                    info!(id = %event.id, budget_ms = budget.as_millis() as u64, "publish timed out");
                    return Ok(PublishOutcome::ambiguous(&event.id));
                }
            },
            _ = &mut timer => {
                info!(id = %event.id, budget_ms = budget.as_millis() as u64, "publish timed out");
                return Ok(PublishOutcome::ambiguous(&event.id));
            }
        }
    }
}

async fn send_to_relay(
    pool: RelayPool,
    relay: String,
    event: Event,
    deadline: Instant,
    tx: mpsc::Sender<Ack>,
) {
    let ack = match timeout_at(deadline, exchange(&pool, &relay, &event)).await {
        Err(_) => return,
        Ok(Ok(Some((true, _)))) => Ack::Accepted(relay),
        Ok(Ok(Some((false, reason)))) => Ack::Rejected { relay, reason },
        Ok(Ok(None)) => Ack::Silent(relay),
        Ok(Err(e)) => {
            warn!(relay = %relay, error = %e, "publish connection failed");
            Ack::Silent(relay)
        }
    };
    // The race may already be decided.
    let _ = tx.send(ack).await;
}

/// Send one `EVENT` frame and wait for the matching `OK`.
async fn exchange(pool: &RelayPool, relay: &str, event: &Event) -> Result<Option<(bool, String)>> {
    let mut ws = pool.connect(relay).await?;
    ws.send(Message::Text(json!(["EVENT", event]).to_string()))
        .await?;
    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Text(txt) => match RelayMessage::parse(&txt) {
                Some(RelayMessage::Ok {
                    event_id,
                    accepted,
                    message,
                }) if event_id == event.id => {
                    let _ = ws.close(None).await;
                    return Ok(Some((accepted, message)));
                }
                Some(RelayMessage::Notice(notice)) => {
                    debug!(relay = %relay, notice = %notice, "relay notice");
                }
                _ => {}
            },
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(None)
}
