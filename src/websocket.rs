/// WebSocket session and shared server state
use actix::prelude::*;
use actix_web_actors::ws;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::engine::QueryEngine;
use crate::messages::{ClientMessage, ServerMessage};
use crate::store::{CellStore, MemoryStore};
use crate::view::ViewStore;

/// How often heartbeat pings are sent
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
/// How long before lack of client response causes a timeout
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared state for all HTTP handlers and WebSocket sessions
pub struct AppState {
    pub engine: QueryEngine<MemoryStore>,
    pub views: ViewStore,
    subscribers: Mutex<HashMap<String, Vec<Addr<GridWebSocket>>>>,
}

impl AppState {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            engine: QueryEngine::with_config(MemoryStore::new(), config),
            views: ViewStore::new(),
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe a WebSocket connection to a table
    pub fn subscribe(&self, table_id: &str, addr: Addr<GridWebSocket>) {
        match self.subscribers.lock() {
            Ok(mut subscribers) => subscribers
                .entry(table_id.to_string())
                .or_default()
                .push(addr),
            Err(_) => log::error!("subscriber registry lock poisoned"),
        }
    }

    pub fn unsubscribe(&self, table_id: &str, addr: &Addr<GridWebSocket>) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            if let Some(addrs) = subscribers.get_mut(table_id) {
                addrs.retain(|a| a != addr);
            }
        }
    }

    /// Send a change notification to every subscriber of its table
    pub fn broadcast(&self, msg: ServerMessage) {
        let Some(table_id) = msg.table_id() else {
            return;
        };
        let Ok(mut subscribers) = self.subscribers.lock() else {
            log::error!("subscriber registry lock poisoned");
            return;
        };
        if let Some(addrs) = subscribers.get_mut(table_id) {
            addrs.retain(|addr| addr.connected());
            for addr in addrs.iter() {
                addr.do_send(BroadcastMessage(msg.clone()));
            }
        }
    }
}

/// Message to broadcast to clients
#[derive(Message)]
#[rtype(result = "()")]
struct BroadcastMessage(ServerMessage);

/// WebSocket connection actor
pub struct GridWebSocket {
    hb: Instant,
    state: actix_web::web::Data<AppState>,
    subscribed_table: Option<String>,
}

impl GridWebSocket {
    pub fn new(state: actix_web::web::Data<AppState>) -> Self {
        Self {
            hb: Instant::now(),
            state,
            subscribed_table: None,
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                log::info!("websocket client heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn send(ctx: &mut ws::WebsocketContext<Self>, msg: &ServerMessage) {
        match serde_json::to_string(msg) {
            Ok(text) => ctx.text(text),
            Err(err) => log::error!("failed to encode server message: {}", err),
        }
    }

    fn handle_client_message(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match msg {
            ClientMessage::Subscribe { table_id } => {
                match self.state.engine.store().has_table(&table_id) {
                    Ok(true) => {}
                    Ok(false) => {
                        let message = format!("table not found: {}", table_id);
                        Self::send(ctx, &ServerMessage::Error { message });
                        return;
                    }
                    Err(err) => {
                        Self::send(ctx, &ServerMessage::Error { message: err.to_string() });
                        return;
                    }
                }
                if let Some(previous) = self.subscribed_table.take() {
                    self.state.unsubscribe(&previous, &ctx.address());
                }
                self.state.subscribe(&table_id, ctx.address());
                self.subscribed_table = Some(table_id.clone());
                Self::send(ctx, &ServerMessage::Subscribed { table_id });
            }

            ClientMessage::Unsubscribe { table_id } => {
                self.state.unsubscribe(&table_id, &ctx.address());
                if self.subscribed_table.as_deref() == Some(table_id.as_str()) {
                    self.subscribed_table = None;
                }
                Self::send(ctx, &ServerMessage::Unsubscribed { table_id });
            }

            ClientMessage::Query { request } => {
                let reply = match self.state.engine.query(&request) {
                    Ok(response) => ServerMessage::QueryResult { response },
                    Err(err) => ServerMessage::Error {
                        message: err.to_string(),
                    },
                };
                Self::send(ctx, &reply);
            }
        }
    }
}

impl Actor for GridWebSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);
    }

    fn stopped(&mut self, ctx: &mut Self::Context) {
        if let Some(table_id) = self.subscribed_table.take() {
            self.state.unsubscribe(&table_id, &ctx.address());
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for GridWebSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => self.handle_client_message(client_msg, ctx),
                Err(e) => Self::send(
                    ctx,
                    &ServerMessage::Error {
                        message: format!("Invalid message format: {}", e),
                    },
                ),
            },
            Ok(ws::Message::Binary(_)) => {
                log::warn!("unexpected binary websocket message");
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            _ => ctx.stop(),
        }
    }
}

impl Handler<BroadcastMessage> for GridWebSocket {
    type Result = ();

    fn handle(&mut self, msg: BroadcastMessage, ctx: &mut Self::Context) {
        Self::send(ctx, &msg.0);
    }
}
