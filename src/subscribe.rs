//! Bounded multi-relay queries.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, timeout_at, Instant};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::event::Event;
use crate::filter::Filter;
use crate::pool::{RelayMessage, RelayPool};

const CHANNEL_CAPACITY: usize = 256;

/// How long a query may run and when a relay counts as done.
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    pub budget: Duration,
    /// Treat `EOSE` as the end of a relay's contribution.
    pub close_on_eose: bool,
}

impl QueryOptions {
    pub fn within(budget: Duration) -> Self {
        Self {
            budget,
            close_on_eose: false,
        }
    }

    pub fn close_on_eose(mut self) -> Self {
        self.close_on_eose = true;
        self
    }
}

/// Ends a running subscription early. Cloneable across tasks.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// One-shot, deduplicated stream of events from every relay of a pool.
///
/// Ends at the deadline, when stopped, or once every relay connection has
/// finished. Relays receive `CLOSE` when it ends or is dropped.
pub struct Subscription {
    rx: mpsc::Receiver<Event>,
    stop: StopHandle,
    stopped: watch::Receiver<bool>,
    deadline: Instant,
    seen: HashSet<String>,
    done: bool,
}

impl Subscription {
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Next unseen event, or `None` once the subscription has ended.
    ///
    /// Events that reached the subscription before it ended are still
    /// yielded afterwards, so a slow consumer sees the full result.
    pub async fn next(&mut self) -> Option<Event> {
        while !self.done {
            tokio::select! {
                biased;
                _ = self.stopped.changed() => self.finish(),
                _ = sleep_until(self.deadline) => self.finish(),
                ev = self.rx.recv() => match ev {
                    Some(ev) => {
                        if self.seen.insert(ev.id.clone()) {
                            return Some(ev);
                        }
                    }
                    None => self.finish(),
                },
            }
        }
        while let Ok(ev) = self.rx.try_recv() {
            if self.seen.insert(ev.id.clone()) {
                return Some(ev);
            }
        }
        None
    }

    /// Drain the subscription in arrival order.
    pub async fn collect(mut self) -> Vec<Event> {
        let mut events = vec![];
        while let Some(ev) = self.next().await {
            events.push(ev);
        }
        events
    }

    fn finish(&mut self) {
        self.done = true;
        self.stop.stop();
        // Relay tasks blocked on a full channel fail their send and move on to CLOSE.
        self.rx.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop.stop();
    }
}

/// Open `filters` on every relay of `pool` for at most `opts.budget`.
pub fn subscribe(pool: &RelayPool, filters: Vec<Filter>, opts: QueryOptions) -> Subscription {
    let deadline = Instant::now() + opts.budget;
    let sub_id = format!("stoa-{}", hex::encode(rand::random::<[u8; 6]>()));
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (stop_tx, stopped) = watch::channel(false);
    let filters = Arc::new(filters);
    for relay in pool.relays() {
        tokio::spawn(collect_from_relay(
            pool.clone(),
            relay.clone(),
            RelayQuery {
                sub_id: sub_id.clone(),
                filters: filters.clone(),
                close_on_eose: opts.close_on_eose,
                deadline,
            },
            tx.clone(),
            stopped.clone(),
        ));
    }
    Subscription {
        rx,
        stop: StopHandle {
            tx: Arc::new(stop_tx),
        },
        stopped,
        deadline,
        seen: HashSet::new(),
        done: false,
    }
}

struct RelayQuery {
    sub_id: String,
    filters: Arc<Vec<Filter>>,
    close_on_eose: bool,
    deadline: Instant,
}

impl RelayQuery {
    fn req_frame(&self) -> String {
        let mut frame = vec![json!("REQ"), json!(self.sub_id)];
        frame.extend(self.filters.iter().map(|f| Value::Object(f.to_json())));
        Value::Array(frame).to_string()
    }
}

async fn collect_from_relay(
    pool: RelayPool,
    relay: String,
    query: RelayQuery,
    tx: mpsc::Sender<Event>,
    mut stopped: watch::Receiver<bool>,
) {
    let mut ws = match timeout_at(query.deadline, pool.connect(&relay)).await {
        Ok(Ok(ws)) => ws,
        Ok(Err(e)) => {
            warn!(relay = %relay, error = %e, "query connection failed");
            return;
        }
        Err(_) => {
            debug!(relay = %relay, "query connection timed out");
            return;
        }
    };
    if let Err(e) = ws.send(Message::Text(query.req_frame())).await {
        warn!(relay = %relay, error = %e, "failed to send REQ");
        return;
    }

    let mut forwarded = 0usize;
    let mut rejected = 0usize;
    let timer = sleep_until(query.deadline);
    tokio::pin!(timer);
    loop {
        tokio::select! {
            _ = &mut timer => break,
            _ = stopped.changed() => break,
            msg = ws.next() => match msg {
                Some(Ok(Message::Text(txt))) => match RelayMessage::parse(&txt) {
                    Some(RelayMessage::Event { sub_id, event }) if sub_id == query.sub_id => {
                        if pool.verify_sig() {
                            if let Err(e) = event.verify() {
                                debug!(relay = %relay, id = %event.id, error = %e, "dropping invalid event");
                                rejected += 1;
                                continue;
                            }
                        }
                        if tx.send(*event).await.is_err() {
                            break;
                        }
                        forwarded += 1;
                    }
                    Some(RelayMessage::Eose(sub_id)) if sub_id == query.sub_id => {
                        if query.close_on_eose {
                            break;
                        }
                    }
                    Some(RelayMessage::Closed { sub_id, message }) if sub_id == query.sub_id => {
                        debug!(relay = %relay, reason = %message, "subscription closed by relay");
                        return;
                    }
                    Some(RelayMessage::Notice(notice)) => {
                        debug!(relay = %relay, notice = %notice, "relay notice");
                    }
                    _ => {}
                },
                Some(Ok(Message::Close(_))) | None => {
                    debug!(relay = %relay, forwarded, "relay closed connection");
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(relay = %relay, error = %e, "query connection error");
                    return;
                }
            }
        }
    }
    debug!(relay = %relay, forwarded, rejected, "closing subscription");
    let close = json!(["CLOSE", query.sub_id]).to_string();
    let _ = ws.send(Message::Text(close)).await;
    let _ = ws.close(None).await;
}
