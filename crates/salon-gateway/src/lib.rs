//! # salon-gateway
//!
//! Real-time WebSocket gateway for the booking backend. Handles:
//! - Client connections with token authentication
//! - The `appointments` room fed by the API's broadcast channel
//! - Heartbeat/keepalive
//!
//! Staff and admin sessions see every appointment event, or only one branch's
//! when they identify with a `branch_id`. Customer sessions only see events
//! about appointments they own.

pub mod session;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use salon_common::{
    auth::{ACCESS_TOKEN, validate_token},
    gateway_event::{APPOINTMENTS_ROOM, GatewayEvent},
    models::Role,
};
use salon_db::repository::users;
use serde::{Deserialize, Serialize};
use session::SessionManager;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

/// Client heartbeat interval announced in `Hello`, in milliseconds.
pub const HEARTBEAT_INTERVAL_MS: u64 = 45_000;

/// Gateway state.
#[derive(Clone)]
pub struct GatewayState {
    /// Appointment events published by the API after each commit.
    pub broadcast: broadcast::Sender<GatewayEvent>,
    pub db: salon_db::Database,
    pub sessions: Arc<SessionManager>,
}

impl GatewayState {
    /// Create a GatewayState sharing the API's broadcast sender.
    pub fn with_broadcast(
        db: salon_db::Database,
        broadcast: broadcast::Sender<GatewayEvent>,
    ) -> Self {
        Self {
            broadcast,
            db,
            sessions: Arc::new(SessionManager::new()),
        }
    }
}

/// Gateway opcodes — what the client and server send to each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum GatewayMessage {
    /// Server → Client: sent on connect, prompts `Identify`
    Hello { heartbeat_interval: u64 },

    /// Client → Server: Authenticate with access token, optionally following
    /// a single branch (staff only)
    Identify {
        token: String,
        #[serde(default)]
        branch_id: Option<Uuid>,
    },

    /// Server → Client: Identified and joined the room
    Ready {
        session_id: String,
        room: String,
        role: Role,
    },

    /// Client → Server: Keepalive ping
    Heartbeat { timestamp: i64 },

    /// Server → Client: Heartbeat acknowledged
    HeartbeatAck { timestamp: i64 },

    /// Server → Client: An appointment event occurred
    Dispatch {
        event: String,
        data: serde_json::Value,
    },

    /// Server → Client: Token rejected, must re-identify
    InvalidSession,
}

impl GatewayMessage {
    fn into_frame(self) -> Option<Message> {
        match serde_json::to_string(&self) {
            Ok(text) => Some(Message::Text(text.into())),
            Err(e) => {
                tracing::warn!("Failed to encode gateway frame: {e}");
                None
            }
        }
    }
}

/// Who is listening on a session, decided at `Identify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    /// Staff and admin: every event in the room, or one branch's
    Staff { branch_id: Option<Uuid> },
    /// Customer: only events owned by this user profile
    Customer { user_id: Option<Uuid> },
}

impl Viewer {
    pub fn allows(&self, event: &GatewayEvent) -> bool {
        match self {
            Viewer::Staff { branch_id } => {
                branch_id.is_none() || event.branch_id == *branch_id
            }
            Viewer::Customer { user_id } => {
                user_id.is_some() && event.owner_user_id == *user_id
            }
        }
    }

    /// Branch a staff session is narrowed to, if any.
    pub fn branch_filter(&self) -> Option<Uuid> {
        match self {
            Viewer::Staff { branch_id } => *branch_id,
            Viewer::Customer { .. } => None,
        }
    }
}

/// Build the gateway WebSocket router.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/gateway", get(ws_handler))
        .with_state(Arc::new(state))
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<GatewayState>>) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

/// Resolve an access token into a viewer.
async fn identify(
    state: &GatewayState,
    token: &str,
    branch_id: Option<Uuid>,
) -> Option<(Uuid, Role, Viewer)> {
    let config = salon_common::config::get();
    let claims = validate_token(token, &config.auth.jwt_secret).ok()?;
    if claims.token_type != ACCESS_TOKEN {
        return None;
    }
    let account_id = claims.sub.parse::<Uuid>().ok()?;

    let viewer = if claims.role.is_staff() {
        Viewer::Staff { branch_id }
    } else {
        let profile = users::find_by_auth_id(&state.db.pg, account_id)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(%account_id, "Profile lookup failed: {e}");
                None
            });
        Viewer::Customer {
            user_id: profile.map(|p| p.id),
        }
    };

    Some((account_id, claims.role, viewer))
}

/// Handle a single WebSocket connection.
async fn handle_connection(socket: WebSocket, state: Arc<GatewayState>) {
    let (mut sender, mut receiver) = socket.split();

    let session_id = Uuid::now_v7().to_string();

    // Direct-send channel: receive loop → sender task (Ready, HeartbeatAck, ...)
    let (direct_tx, mut direct_rx) = tokio::sync::mpsc::channel::<GatewayMessage>(64);

    // None until the session identifies; the sender task forwards nothing before that
    let viewer: Arc<RwLock<Option<Viewer>>> = Arc::new(RwLock::new(None));

    // Subscribe to broadcast BEFORE spawning tasks so we don't miss events
    let mut broadcast_rx = state.broadcast.subscribe();

    let hello = GatewayMessage::Hello {
        heartbeat_interval: HEARTBEAT_INTERVAL_MS,
    };
    let Some(frame) = hello.into_frame() else {
        return;
    };
    if sender.send(frame).await.is_err() {
        return;
    }

    // ── Sender task ──────────────────────────────────────────────────────────
    // Merges room events (filtered per viewer) and direct replies onto the
    // single WebSocket sender.
    let viewer_for_send = viewer.clone();
    let send_session = session_id.clone();

    let send_task = tokio::spawn(async move {
        loop {
            let outgoing = tokio::select! {
                received = broadcast_rx.recv() => match received {
                    Ok(event) => {
                        let Some(v) = *viewer_for_send.read().await else { continue };
                        if !v.allows(&event) {
                            continue;
                        }
                        GatewayMessage::Dispatch {
                            event: event.event_type.to_string(),
                            data: event.data,
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(session = %send_session, skipped, "Gateway session lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                direct = direct_rx.recv() => match direct {
                    Some(msg) => msg,
                    None => break,
                },
            };

            let Some(frame) = outgoing.into_frame() else { continue };
            if sender.send(frame).await.is_err() {
                break;
            }
        }
    });

    // ── Receive loop ─────────────────────────────────────────────────────────
    let mut identified = false;

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                let Ok(gateway_msg) = serde_json::from_str::<GatewayMessage>(&text) else {
                    continue;
                };
                match gateway_msg {
                    GatewayMessage::Identify { token, branch_id } => {
                        match identify(&state, &token, branch_id).await {
                            Some((account_id, role, v)) => {
                                *viewer.write().await = Some(v);
                                if !identified {
                                    state
                                        .sessions
                                        .register(session_id.clone(), account_id, role)
                                        .await;
                                    identified = true;
                                }

                                let _ = direct_tx
                                    .send(GatewayMessage::Ready {
                                        session_id: session_id.clone(),
                                        room: APPOINTMENTS_ROOM.to_string(),
                                        role,
                                    })
                                    .await;

                                tracing::info!(
                                    session = %session_id,
                                    %account_id,
                                    role = role.as_str(),
                                    following_branch = ?v.branch_filter(),
                                    "Gateway session joined {APPOINTMENTS_ROOM}"
                                );
                            }
                            None => {
                                let _ = direct_tx.send(GatewayMessage::InvalidSession).await;
                            }
                        }
                    }

                    GatewayMessage::Heartbeat { .. } => {
                        state.sessions.touch(&session_id).await;
                        let _ = direct_tx
                            .send(GatewayMessage::HeartbeatAck {
                                timestamp: chrono::Utc::now().timestamp_millis(),
                            })
                            .await;
                    }

                    _ => {}
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    // ── Cleanup ───────────────────────────────────────────────────────────────
    state.sessions.remove(&session_id).await;
    send_task.abort();
    tracing::info!(session = %session_id, "Client disconnected from gateway");
}

#[cfg(test)]
mod tests {
    use super::*;
    use salon_common::gateway_event::AppointmentEventKind;

    fn event(owner: Option<Uuid>) -> GatewayEvent {
        event_at(Uuid::from_u128(9), owner)
    }

    fn event_at(branch_id: Uuid, owner: Option<Uuid>) -> GatewayEvent {
        GatewayEvent::appointment(
            AppointmentEventKind::AppointmentUpdated,
            serde_json::json!({ "id": Uuid::nil() }),
            branch_id,
            owner,
        )
    }

    #[test]
    fn staff_see_everything() {
        let staff = Viewer::Staff { branch_id: None };
        assert!(staff.allows(&event(None)));
        assert!(staff.allows(&event(Some(Uuid::from_u128(1)))));
    }

    #[test]
    fn staff_can_follow_one_branch() {
        let front_desk = Uuid::from_u128(9);
        let staff = Viewer::Staff {
            branch_id: Some(front_desk),
        };
        assert!(staff.allows(&event_at(front_desk, None)));
        assert!(!staff.allows(&event_at(Uuid::from_u128(10), None)));
        assert_eq!(staff.branch_filter(), Some(front_desk));
    }

    #[test]
    fn customers_only_see_their_own() {
        let me = Uuid::from_u128(1);
        let viewer = Viewer::Customer { user_id: Some(me) };
        assert!(viewer.allows(&event(Some(me))));
        assert!(!viewer.allows(&event(Some(Uuid::from_u128(2)))));
        assert!(!viewer.allows(&event(None)));
    }

    #[test]
    fn customer_without_profile_sees_nothing() {
        let viewer = Viewer::Customer { user_id: None };
        assert!(!viewer.allows(&event(None)));
    }

    #[test]
    fn frames_use_op_and_d() {
        let msg = GatewayMessage::Dispatch {
            event: AppointmentEventKind::NewAppointment.to_string(),
            data: serde_json::json!({ "slot_number": 3 }),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["op"], "Dispatch");
        assert_eq!(value["d"]["event"], "new_appointment");
        assert_eq!(value["d"]["data"]["slot_number"], 3);

        let identify: GatewayMessage =
            serde_json::from_str(r#"{"op":"Identify","d":{"token":"abc"}}"#).unwrap();
        assert!(matches!(
            identify,
            GatewayMessage::Identify { token, branch_id: None } if token == "abc"
        ));

        let branch = Uuid::from_u128(7);
        let narrowed: GatewayMessage = serde_json::from_str(&format!(
            r#"{{"op":"Identify","d":{{"token":"abc","branch_id":"{branch}"}}}}"#
        ))
        .unwrap();
        assert!(matches!(
            narrowed,
            GatewayMessage::Identify { branch_id: Some(b), .. } if b == branch
        ));
    }
}
