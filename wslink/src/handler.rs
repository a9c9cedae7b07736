//!
//! Protocol Handler (spec §4.5, component C5): owns the connection
//! table on a route, dispatches inbound RPC per the rules in spec §4.5,
//! and relays publishes to matching sessions.
//!

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock};

use ahash::AHashMap;
use async_trait::async_trait;
use serde_json::{json, Value};
use workflow_core::channel::Sender;
use workflow_log::*;
use workflow_websocket::server::{
    Message, Result as WsResult, WebSocketHandler, WebSocketReceiver, WebSocketSender, WebSocketSink,
};

use crate::argument::Argument;
use crate::attachments::{extract_bytes, send_with_attachments};
use crate::error::ErrorCode;
use crate::id::{generate_client_id, ClientId};
use crate::messages::{WireMessage, ATTACHMENT_METHOD, HELLO_METHOD, SYSTEM_ID_PREFIX, WSLINK_VERSION};
use crate::publish::{PublishManager, PublishTarget};
use crate::registry::{HandlerContext, MethodRegistry, Protocol};
use crate::server::ShutdownTimer;
use crate::session::{ClientSession, ConnectionState};

/// WebSocket processor for one route: builds the Function Map on first
/// connect, holds the connection table, and dispatches every inbound
/// frame (spec §4.5).
pub struct WslinkHandler {
    protocol: Arc<dyn Protocol>,
    publish: Arc<PublishManager>,
    registry: OnceLock<MethodRegistry>,
    connections: Mutex<AHashMap<ClientId, Arc<ClientSession>>>,
    stop: Sender<()>,
    shutdown_timer: Arc<ShutdownTimer>,
    timeout: std::time::Duration,
}

impl WslinkHandler {
    pub fn new(
        protocol: Arc<dyn Protocol>,
        publish: Arc<PublishManager>,
        stop: Sender<()>,
        shutdown_timer: Arc<ShutdownTimer>,
        timeout: std::time::Duration,
    ) -> Arc<Self> {
        Arc::new(WslinkHandler {
            protocol,
            publish,
            registry: OnceLock::new(),
            connections: Mutex::new(AHashMap::new()),
            stop,
            shutdown_timer,
            timeout,
        })
    }

    /// Secret checked by `wslink.hello`; only the top-level protocol
    /// object's secret is consulted (spec §4.5 rule 2).
    fn secret(&self) -> String {
        self.protocol.secret()
    }

    fn context(&self) -> HandlerContext {
        HandlerContext::new(self.publish.clone(), self.stop.clone())
    }

    /// Build the Function Map from the server protocol object plus
    /// every link protocol it declares (spec §4.2). Idempotent: only
    /// the first caller's build is retained (spec §4.4 "onConnect...
    /// idempotent registry build on first call").
    fn build_registry(&self) -> MethodRegistry {
        let ctx = self.context();
        let mut registry = MethodRegistry::new();

        let mut objects = vec![self.protocol.clone()];
        objects.extend(self.protocol.clone().link_protocols());

        for object in objects {
            object.clone().init(&ctx);
            object.register(&mut registry);
        }
        registry
    }

    fn registry(&self) -> &MethodRegistry {
        self.registry.get_or_init(|| self.build_registry())
    }

    /// Close every open connection with `GOING_AWAY` (spec §4.6, and
    /// exposed standalone per spec §9 supplemented feature
    /// `disconnectClients`).
    pub async fn disconnect_all(&self) {
        let sessions: Vec<_> = self.connections.lock().unwrap().values().cloned().collect();
        for session in sessions {
            session.set_state(ConnectionState::Closing);
            let close = tungstenite::protocol::CloseFrame {
                code: tungstenite::protocol::frame::coding::CloseCode::Away,
                reason: "Server shutdown".into(),
            };
            if let Err(err) = session.sink.send(Message::Close(Some(close))) {
                log_trace!("disconnect_all: send to {} failed: {}", session.client_id, err);
            }
        }
    }

    fn connection_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    async fn dispatch(self: &Arc<Self>, session: Arc<ClientSession>, msg: WireMessage) {
        let Some(id) = msg.id.clone() else {
            if msg.method.as_deref() == Some(ATTACHMENT_METHOD) {
                if let Some(args) = &msg.args {
                    let keys: Vec<String> = args
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect();
                    session.push_attachment_keys(keys);
                }
            }
            return;
        };

        if let Some(system) = id.strip_prefix(SYSTEM_ID_PREFIX) {
            let _ = system;
            self.dispatch_system(&session, id, msg).await;
            return;
        }

        self.dispatch_rpc(session, id, msg);
    }

    async fn dispatch_system(&self, session: &Arc<ClientSession>, id: String, msg: WireMessage) {
        if msg.method.as_deref() != Some(HELLO_METHOD) {
            self.reply(session, WireMessage::reply_error(
                id,
                ErrorCode::METHOD_NOT_FOUND,
                "Unknown system method called",
                None,
            ))
            .await;
            return;
        }

        let secret_matches = msg
            .args
            .as_ref()
            .and_then(|args| args.first())
            .and_then(|v| v.get("secret"))
            .and_then(Value::as_str)
            .map(|provided| provided == self.secret())
            .unwrap_or(false);

        let reply = if secret_matches {
            WireMessage::reply_result(id, json!({ "clientID": format!("c{}", session.client_id) }))
        } else {
            WireMessage::reply_error(id, ErrorCode::AUTHENTICATION_ERROR, "Authentication failed", None)
        };
        self.reply(session, reply).await;
    }

    fn dispatch_rpc(self: &Arc<Self>, session: Arc<ClientSession>, id: String, msg: WireMessage) {
        let method_name = msg.method.clone().unwrap_or_default();
        let method = self.registry().get(&method_name);

        let Some(method) = method else {
            let handler = self.clone();
            let data = json!(method_name);
            tokio::spawn(async move {
                handler
                    .reply(
                        &session,
                        WireMessage::reply_error(id, ErrorCode::METHOD_NOT_FOUND, "Unregistered method called", Some(data)),
                    )
                    .await;
            });
            return;
        };

        let args: Vec<Argument> = msg
            .args
            .unwrap_or_default()
            .iter()
            .map(Argument::from)
            .map(|arg| session.substitute(arg))
            .collect();
        let kwargs: AHashMap<String, Argument> = msg
            .kwargs
            .unwrap_or_default()
            .iter()
            .map(|(k, v)| (k.clone(), session.substitute(Argument::from(v))))
            .collect();

        // Per spec §5: the read loop must not block on the invocation,
        // so every RPC call runs as its own task.
        let handler = self.clone();
        tokio::spawn(async move {
            let reply = match method(args, kwargs).await {
                Ok(value) => handler.reply_with_result(id, method_name, value),
                Err(err) => WireMessage::reply_error(
                    id,
                    ErrorCode::EXCEPTION_ERROR,
                    "Exception raised",
                    Some(json!({
                        "method": method_name,
                        "exception": err.message,
                        "trace": err.message,
                    })),
                ),
            };
            handler.reply(&session, reply).await;
        });
    }

    fn reply_with_result(&self, id: String, method_name: String, value: Argument) -> WireMessage {
        let value = extract_bytes(value, &self.publish.attachments);
        match value.to_value() {
            Some(json_value) => WireMessage::reply_result(id, json_value),
            None => WireMessage::reply_error(
                id,
                ErrorCode::RESULT_SERIALIZE_ERROR,
                "Method result cannot be serialized",
                Some(json!(method_name)),
            ),
        }
    }

    async fn reply(&self, session: &ClientSession, message: WireMessage) {
        if let Err(err) = send_with_attachments(&session.sink, &self.publish.attachments, message).await {
            log_trace!("reply send to {} failed: {}", session.client_id, err);
        }
    }
}

#[async_trait]
impl PublishTarget for WslinkHandler {
    async fn deliver(&self, topic: String, data: Argument, client_id: Option<ClientId>) {
        let sessions: Vec<Arc<ClientSession>> = match client_id {
            Some(id) => self
                .connections
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .into_iter()
                .collect(),
            None => self.connections.lock().unwrap().values().cloned().collect(),
        };

        let data = extract_bytes(data, &self.publish.attachments);
        let Some(json_value) = data.to_value() else {
            log_trace!("publish to {}: payload could not be serialized, dropped", topic);
            return;
        };

        for session in sessions {
            let message = WireMessage {
                wslink: WSLINK_VERSION.to_string(),
                ..WireMessage::publish(topic.clone(), json_value.clone())
            };
            if let Err(err) = send_with_attachments(&session.sink, &self.publish.attachments, message).await {
                log_trace!("publish send to {} failed: {}", session.client_id, err);
            }
        }
    }
}

#[async_trait]
impl WebSocketHandler for WslinkHandler {
    type Context = Arc<ClientSession>;

    async fn connect(self: &Arc<Self>, _peer: &SocketAddr) -> WsResult<()> {
        // Idempotent registry build + shutdown-timer cancellation both
        // happen here, ahead of connection-table insertion in
        // `handshake` (spec §4.4 CONNECTING -> OPEN).
        self.registry();
        self.shutdown_timer.cancel();
        Ok(())
    }

    async fn disconnect(self: &Arc<Self>, ctx: Self::Context, _result: WsResult<()>) {
        ctx.set_state(ConnectionState::Closed);
        self.connections.lock().unwrap().remove(&ctx.client_id);
        if self.connection_count() == 0 {
            self.shutdown_timer.arm(self.timeout, self.stop.clone());
        }
    }

    async fn handshake(
        self: &Arc<Self>,
        _peer: &SocketAddr,
        _sender: &mut WebSocketSender,
        _receiver: &mut WebSocketReceiver,
        sink: &WebSocketSink,
    ) -> WsResult<Self::Context> {
        let client_id = generate_client_id();
        let session = Arc::new(ClientSession::new(client_id.clone(), sink.clone()));
        session.set_state(ConnectionState::Open);
        self.connections.lock().unwrap().insert(client_id, session.clone());
        Ok(session)
    }

    async fn message(self: &Arc<Self>, ctx: &Self::Context, msg: Message, _sink: &WebSocketSink) -> WsResult<()> {
        match msg {
            Message::Text(text) => {
                if let Ok(wire) = serde_json::from_str::<WireMessage>(&text) {
                    self.dispatch(ctx.clone(), wire).await;
                }
                // Malformed inbound JSON is silently dropped (spec §7).
            }
            Message::Binary(data) => ctx.accept_binary(data),
            Message::Close(_) => {}
            _ => {}
        }
        Ok(())
    }
}

impl WslinkHandler {
    pub fn has_connections(&self) -> bool {
        self.connection_count() > 0
    }
}
