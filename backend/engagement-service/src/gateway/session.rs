//! WebSocket session lifecycle for the fan-out gateway.
//!
//! Connection state machine: Connecting -> Authenticated -> Subscribed* ->
//! Disconnected. Authentication happens in the upgrade handler before the
//! actor starts; a rejected credential terminates the connection with no
//! state retained. Once the actor stops, the connection is removed from
//! every room it joined and from the actor index.

use actix::{Actor, ActorContext, AsyncContext, Handler, Message as ActixMessage, StreamHandler};
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use event_schema::{ActorId, VideoId};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::{info, warn};

use super::auth::CredentialVerifier;
use super::messages::{WsClientMessage, WsServerMessage};
use super::{ConnectionId, RoomRegistry};

/// Shared state for the gateway routes
#[derive(Clone)]
pub struct GatewayState {
    pub registry: RoomRegistry,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub heartbeat: Duration,
    pub client_timeout: Duration,
}

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

// Registry broadcasts arrive over the connection's channel and are relayed
// into the actor through this message.
#[derive(ActixMessage)]
#[rtype(result = "()")]
struct OutboundText(String);

pub struct WsSession {
    connection_id: ConnectionId,
    actor_id: ActorId,
    registry: RoomRegistry,
    rooms: HashSet<VideoId>,
    sender: UnboundedSender<String>,
    hb: Instant,
    heartbeat: Duration,
    client_timeout: Duration,
}

impl WsSession {
    fn new(
        actor_id: ActorId,
        registry: RoomRegistry,
        sender: UnboundedSender<String>,
        heartbeat: Duration,
        client_timeout: Duration,
    ) -> Self {
        Self {
            connection_id: ConnectionId::new(),
            actor_id,
            registry,
            rooms: HashSet::new(),
            sender,
            hb: Instant::now(),
            heartbeat,
            client_timeout,
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(self.heartbeat, |act, ctx| {
            if Instant::now().duration_since(act.hb) > act.client_timeout {
                warn!(
                    connection_id = %act.connection_id.as_uuid(),
                    actor_id = %act.actor_id,
                    "WebSocket heartbeat failed, disconnecting"
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn send_message(&self, ctx: &mut ws::WebsocketContext<Self>, message: &WsServerMessage) {
        match serde_json::to_string(message) {
            Ok(payload) => ctx.text(payload),
            Err(err) => warn!(error = %err, "Failed to serialize gateway message"),
        }
    }

    fn handle_client_message(
        &mut self,
        message: WsClientMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) {
        match message {
            WsClientMessage::Subscribe { video_id } => {
                let video = VideoId::from(video_id);
                self.registry
                    .subscribe(video, self.connection_id, self.sender.clone());
                self.rooms.insert(video);
                self.send_message(ctx, &WsServerMessage::Subscribed { video_id: video });
            }
            WsClientMessage::Unsubscribe { video_id } => {
                let video = VideoId::from(video_id);
                self.registry.unsubscribe(video, self.connection_id);
                self.rooms.remove(&video);
                self.send_message(ctx, &WsServerMessage::Unsubscribed { video_id: video });
            }
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(
            connection_id = %self.connection_id.as_uuid(),
            actor_id = %self.actor_id,
            "WebSocket session started"
        );

        self.registry
            .register_connection(self.connection_id, self.actor_id, self.sender.clone());
        self.hb(ctx);
        self.send_message(
            ctx,
            &WsServerMessage::Connected {
                connection_id: self.connection_id.as_uuid(),
            },
        );
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!(
            connection_id = %self.connection_id.as_uuid(),
            actor_id = %self.actor_id,
            rooms = self.rooms.len(),
            "WebSocket session stopped"
        );

        self.registry
            .remove_connection(self.connection_id, self.actor_id);
    }
}

impl Handler<OutboundText> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: OutboundText, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<WsClientMessage>(&text) {
                Ok(message) => self.handle_client_message(message, ctx),
                Err(err) => {
                    warn!(
                        connection_id = %self.connection_id.as_uuid(),
                        error = %err,
                        "Failed to parse WS message"
                    );
                    self.send_message(
                        ctx,
                        &WsServerMessage::Error {
                            code: "BAD_MESSAGE".to_string(),
                            message: "expected subscribe/unsubscribe".to_string(),
                        },
                    );
                }
            },
            Ok(ws::Message::Binary(_)) => {
                warn!("Binary WebSocket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                info!(
                    connection_id = %self.connection_id.as_uuid(),
                    "WebSocket close message received: {:?}",
                    reason
                );
                ctx.stop();
            }
            _ => {}
        }
    }
}

fn bearer_token(params: &WsParams, req: &HttpRequest) -> Option<String> {
    params.token.clone().or_else(|| {
        req.headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    })
}

/// WebSocket upgrade handler.
///
/// Verifies the bearer credential through the auth collaborator before the
/// session actor exists; on failure the connection goes straight from
/// Connecting to Disconnected with a 401 and no partial state.
#[get("/ws")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<GatewayState>,
    query: web::Query<WsParams>,
) -> Result<HttpResponse, Error> {
    let params = query.into_inner();

    let Some(token) = bearer_token(&params, &req) else {
        warn!("WebSocket connection rejected: no bearer credential provided");
        return Ok(HttpResponse::Unauthorized().finish());
    };

    let actor_id = match state.verifier.verify(&token).await {
        Ok(actor_id) => actor_id,
        Err(err) => {
            warn!(error = %err, "WebSocket connection rejected: credential verification failed");
            return Ok(HttpResponse::Unauthorized().finish());
        }
    };

    let (tx, mut rx) = unbounded_channel::<String>();
    let session = WsSession::new(
        actor_id,
        state.registry.clone(),
        tx,
        state.heartbeat,
        state.client_timeout,
    );

    let (addr, resp) = ws::WsResponseBuilder::new(session, &req, stream).start_with_addr()?;

    // Relay registry broadcasts from this connection's channel into the
    // session actor; ends when the registry drops the sender side.
    tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            addr.do_send(OutboundText(payload));
        }
    });

    Ok(resp)
}
