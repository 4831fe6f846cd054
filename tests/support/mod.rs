//! In-process NIP-01 relay for integration tests.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use stoa::{Event, Filter};

/// How the relay answers `EVENT` frames.
#[derive(Debug, Clone, Copy)]
pub enum Ack {
    /// Store the event and answer `OK true`.
    Accept,
    /// Store the event and answer `OK true` after a delay.
    AcceptAfter(Duration),
    /// Answer `OK false` with the given reason.
    Reject(&'static str),
    /// Answer `OK false` after a delay.
    RejectAfter(Duration, &'static str),
    /// Store the event but never answer.
    Silent,
}

struct RelayState {
    ack: Ack,
    /// Ignore tag constraints in `REQ` filters, like relays that do not index them.
    loose: bool,
    events: Mutex<Vec<Event>>,
    frames: Mutex<Vec<String>>,
}

pub struct StubRelay {
    addr: SocketAddr,
    state: Arc<RelayState>,
    handle: tokio::task::JoinHandle<()>,
}

impl StubRelay {
    pub async fn spawn(ack: Ack) -> Self {
        Self::start(ack, false).await
    }

    /// A relay that answers tag-filtered requests with a superset.
    pub async fn spawn_loose(ack: Ack) -> Self {
        Self::start(ack, true).await
    }

    async fn start(ack: Ack, loose: bool) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(RelayState {
            ack,
            loose,
            events: Mutex::new(vec![]),
            frames: Mutex::new(vec![]),
        });
        let app = Router::new()
            .route("/", get(handler))
            .with_state(state.clone());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app.into_make_service()).await.unwrap();
        });
        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn insert(&self, ev: Event) {
        self.state.events.lock().push(ev);
    }

    pub fn stored(&self) -> Vec<Event> {
        self.state.events.lock().clone()
    }

    /// Raw text frames received from clients.
    pub fn frames(&self) -> Vec<String> {
        self.state.frames.lock().clone()
    }
}

impl Drop for StubRelay {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handler(ws: WebSocketUpgrade, State(state): State<Arc<RelayState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| async move { process(socket, state).await })
}

async fn process(mut socket: WebSocket, state: Arc<RelayState>) {
    while let Some(Ok(msg)) = socket.next().await {
        let Message::Text(txt) = msg else { continue };
        state.frames.lock().push(txt.clone());
        let Ok(Value::Array(arr)) = serde_json::from_str::<Value>(&txt) else {
            continue;
        };
        match arr.first().and_then(|v| v.as_str()) {
            Some("REQ") if arr.len() >= 3 => {
                let sub = arr[1].as_str().unwrap_or_default().to_string();
                let filters: Vec<Filter> = arr[2..]
                    .iter()
                    .map(Filter::from_value)
                    .map(|mut f| {
                        if state.loose {
                            f.tags.clear();
                        }
                        f
                    })
                    .collect();
                let matching: Vec<Event> = state
                    .events
                    .lock()
                    .iter()
                    .filter(|ev| filters.iter().any(|f| f.matches(ev)))
                    .cloned()
                    .collect();
                for ev in matching {
                    let frame = json!(["EVENT", sub, ev]);
                    let _ = socket.send(Message::Text(frame.to_string())).await;
                }
                let eose = json!(["EOSE", sub]);
                let _ = socket.send(Message::Text(eose.to_string())).await;
            }
            Some("EVENT") if arr.len() >= 2 => {
                let Ok(ev) = serde_json::from_value::<Event>(arr[1].clone()) else {
                    continue;
                };
                let id = ev.id.clone();
                let ok = match state.ack {
                    Ack::Accept => {
                        state.events.lock().push(ev);
                        json!(["OK", id, true, ""])
                    }
                    Ack::AcceptAfter(delay) => {
                        tokio::time::sleep(delay).await;
                        state.events.lock().push(ev);
                        json!(["OK", id, true, ""])
                    }
                    Ack::Reject(reason) => json!(["OK", id, false, reason]),
                    Ack::RejectAfter(delay, reason) => {
                        tokio::time::sleep(delay).await;
                        json!(["OK", id, false, reason])
                    }
                    Ack::Silent => {
                        state.events.lock().push(ev);
                        continue;
                    }
                };
                let _ = socket.send(Message::Text(ok.to_string())).await;
            }
            _ => {}
        }
    }
}
