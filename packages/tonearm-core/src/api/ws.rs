//! WebSocket handler for the declaring-client bridge.
//!
//! A declaring client connects here to push its media hierarchy and receive
//! real-time events: structural change notifications and browse selections.
//! Incoming messages are JSON envelopes tagged by `type`; outgoing traffic
//! is either a direct reply or a fanned-out [`BroadcastEvent`].

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::api::AppState;
use crate::browse::NowPlaying;
use crate::model::{
    validate_batch, MediaItemInput, MediaItemPatch, MediaTree, ValidatedNode, ValidationError,
};
use crate::store::HierarchySnapshot;

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket Message Types
// ─────────────────────────────────────────────────────────────────────────────

/// Incoming WebSocket message envelope.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
enum WsIncoming {
    Heartbeat,
    SetMediaItems { payload: MediaTree },
    PushMediaItem { payload: PushPayload },
    DeleteMediaItem { payload: DeletePayload },
    UpdateMediaItem { payload: MediaItemPatch },
    UpdateMediaItems { payload: BatchPayload },
    GetHierarchy,
}

/// Request payload for appending one item under a parent.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushPayload {
    parent_id: String,
    item: MediaItemInput,
}

/// Request payload for deleting an item by id.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeletePayload {
    item_id: String,
}

/// Request payload for a batch merge/replace of a parent's children.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchPayload {
    parent_id: String,
    items: Vec<MediaItemInput>,
    #[serde(default)]
    replace: bool,
}

/// Outgoing WebSocket messages.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
enum WsOutgoing {
    HeartbeatAck,
    Error {
        message: String,
    },
    /// Payload validation failed; carries every field issue found.
    ValidationFailed {
        payload: ValidationError,
    },
    InitialState {
        payload: InitialStatePayload,
    },
    Hierarchy {
        payload: HierarchySnapshot,
    },
}

/// Payload sent once on connect: the full hierarchy plus session state.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InitialStatePayload {
    hierarchy: HierarchySnapshot,
    now_playing: Option<NowPlaying>,
}

impl WsOutgoing {
    /// Serializes the message to a WebSocket text message.
    fn to_message(&self) -> Option<Message> {
        serde_json::to_string(self)
            .ok()
            .map(|s| Message::Text(s.into()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket Message Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Registers an http(s) icon URI with the artwork resolver, so browse
/// clients can fetch a locally cached copy. Non-remote URIs are ignored.
fn register_icon(state: &AppState, icon: &str) {
    if icon.starts_with("http://") || icon.starts_with("https://") {
        state.artwork.register(icon);
    }
}

/// Registers every http(s) icon in a validated subtree.
fn register_icons(state: &AppState, nodes: &[ValidatedNode]) {
    for node in nodes {
        if let Some(icon) = &node.item.icon {
            register_icon(state, icon);
        }
        register_icons(state, &node.children);
    }
}

/// Handles a SET_MEDIA_ITEMS message: replaces the whole hierarchy.
fn handle_set_media_items(state: &AppState, tree: MediaTree) -> Result<(), ValidationError> {
    let validated = tree.validate()?;
    register_icons(state, &validated.root);
    state.store.set_tree(&validated);
    Ok(())
}

/// Handles a PUSH_MEDIA_ITEM message: appends one child, nested children
/// becoming that child's own children list.
fn handle_push_media_item(state: &AppState, payload: PushPayload) -> Result<(), ValidationError> {
    let node = payload.item.validate()?;
    register_icons(state, std::slice::from_ref(&node));
    let children = node.children;
    let item_id = node.item.id.clone();
    state.store.insert(&payload.parent_id, node.item);
    if !children.is_empty() {
        state.store.batch_update(&item_id, children, true);
    }
    Ok(())
}

/// Handles an UPDATE_MEDIA_ITEM message: partial merge onto one item.
///
/// A patch can introduce a new icon, so the merged item's icon is put
/// through the same registration path as full payloads.
fn handle_update_media_item(
    state: &AppState,
    patch: MediaItemPatch,
) -> Result<(), ValidationError> {
    state.store.apply_patch(&patch)?;
    if let Some(item) = state.store.get(&patch.id) {
        if let Some(icon) = &item.icon {
            register_icon(state, icon);
        }
    }
    Ok(())
}

/// Handles an UPDATE_MEDIA_ITEMS message: batch merge/replace.
fn handle_update_media_items(state: &AppState, payload: BatchPayload) -> Result<(), ValidationError> {
    let nodes = validate_batch(&payload.items)?;
    register_icons(state, &nodes);
    state
        .store
        .batch_update(&payload.parent_id, nodes, payload.replace);
    Ok(())
}

/// Maps a mutation outcome to an optional outgoing message.
///
/// Success is quiet (the resulting hierarchy event reaches the client via
/// the broadcast fan-out); failures are reported directly.
fn mutation_reply(result: Result<(), ValidationError>) -> Option<Message> {
    match result {
        Ok(()) => None,
        Err(err) => WsOutgoing::ValidationFailed { payload: err }.to_message(),
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Main WebSocket connection handler.
async fn handle_ws(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut broadcast_rx = state.broadcast_tx.subscribe();
    let mut last_activity = Instant::now();

    // Register connection for tracking and force-close capability
    let conn_guard = state.ws_manager.register();
    let cancel_token = conn_guard.cancel_token().clone();

    log::info!("[WS] New connection established: {}", conn_guard.id());

    // Send the current hierarchy immediately on connect, so a reconnecting
    // client does not have to re-declare an unchanged tree.
    let initial = WsOutgoing::InitialState {
        payload: InitialStatePayload {
            hierarchy: state.store.snapshot(),
            now_playing: state.browse.now_playing(),
        },
    };
    if let Some(msg) = initial.to_message() {
        if sender.send(msg).await.is_err() {
            log::warn!("[WS] Failed to send initial state, client disconnected");
            return;
        }
    }

    let (check_interval, timeout) = {
        let config = state.config.read();
        (
            Duration::from_secs(config.bridge.heartbeat_check_interval_secs),
            Duration::from_secs(config.bridge.heartbeat_timeout_secs),
        )
    };

    // Use interval instead of sleep to reduce timer allocations and prevent
    // drift. Delay mode skips missed ticks rather than bursting to catch up.
    let mut heartbeat_interval = tokio::time::interval(check_interval);
    heartbeat_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            // Handle force-close request
            _ = cancel_token.cancelled() => {
                log::info!("[WS] Connection force-closed: {}", conn_guard.id());
                break;
            }
            // Handle incoming messages from the client
            msg = receiver.next() => {
                last_activity = Instant::now();
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<WsIncoming>(&text) {
                            Ok(WsIncoming::Heartbeat) => WsOutgoing::HeartbeatAck.to_message(),
                            Ok(WsIncoming::SetMediaItems { payload }) => {
                                mutation_reply(handle_set_media_items(&state, payload))
                            }
                            Ok(WsIncoming::PushMediaItem { payload }) => {
                                mutation_reply(handle_push_media_item(&state, payload))
                            }
                            Ok(WsIncoming::DeleteMediaItem { payload }) => {
                                state.store.delete(&payload.item_id);
                                None
                            }
                            Ok(WsIncoming::UpdateMediaItem { payload }) => {
                                mutation_reply(handle_update_media_item(&state, payload))
                            }
                            Ok(WsIncoming::UpdateMediaItems { payload }) => {
                                mutation_reply(handle_update_media_items(&state, payload))
                            }
                            Ok(WsIncoming::GetHierarchy) => WsOutgoing::Hierarchy {
                                payload: state.store.snapshot(),
                            }
                            .to_message(),
                            Err(e) => {
                                log::debug!("[WS] Unparseable message: {e}");
                                WsOutgoing::Error {
                                    message: format!("unrecognized message: {e}"),
                                }
                                .to_message()
                            }
                        };
                        if let Some(msg) = reply {
                            let _ = sender.send(msg).await;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            // Fan out broadcasted events (hierarchy changes, selections)
            Ok(event) = broadcast_rx.recv() => {
                if let Ok(json) = serde_json::to_string(&event) {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }
            // Heartbeat timeout check
            _ = heartbeat_interval.tick() => {
                if last_activity.elapsed() > timeout {
                    log::warn!("[WS] Heartbeat timeout on {}", conn_guard.id());
                    break;
                }
            }
        }
    }

    // ConnectionGuard Drop impl handles unregistration
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Config;
    use serde_json::json;

    fn state() -> AppState {
        AppState::wire(Config::default())
    }

    fn tree_payload() -> MediaTree {
        serde_json::from_value(json!({
            "id": "root",
            "root": [{
                "id": "A",
                "playableOrBrowsable": "BROWSABLE",
                "icon": "https://cdn.example.com/a.png",
                "children": [
                    {"id": "A1", "playableOrBrowsable": "PLAYABLE"},
                ],
            }],
        }))
        .unwrap()
    }

    #[test]
    fn incoming_envelopes_deserialize() {
        let msg: WsIncoming = serde_json::from_value(json!({
            "type": "PUSH_MEDIA_ITEM",
            "payload": {
                "parentId": "root",
                "item": {"id": "B", "playableOrBrowsable": "PLAYABLE"},
            },
        }))
        .unwrap();
        assert!(matches!(msg, WsIncoming::PushMediaItem { .. }));

        let msg: WsIncoming = serde_json::from_value(json!({"type": "HEARTBEAT"})).unwrap();
        assert!(matches!(msg, WsIncoming::Heartbeat));
    }

    #[test]
    fn set_media_items_replaces_hierarchy_and_registers_icons() {
        let state = state();
        handle_set_media_items(&state, tree_payload()).unwrap();

        assert_eq!(state.store.root_id().as_deref(), Some("root"));
        assert_eq!(state.store.children("A").len(), 1);
        assert!(state
            .artwork
            .remote_uri(&crate::artwork::ArtworkResolver::cache_key(
                "https://cdn.example.com/a.png"
            ))
            .is_some());
    }

    #[test]
    fn set_media_items_rejects_invalid_payload_with_all_issues() {
        let state = state();
        let tree: MediaTree = serde_json::from_value(json!({
            "id": "root",
            "root": [
                {"id": "A"},
                {"playableOrBrowsable": "PLAYABLE"},
            ],
        }))
        .unwrap();

        let err = handle_set_media_items(&state, tree).unwrap_err();
        assert_eq!(err.issues.len(), 2);
        // Nothing was written
        assert!(state.store.root_id().is_none());
    }

    #[test]
    fn push_media_item_adds_nested_children_under_the_item() {
        let state = state();
        handle_set_media_items(&state, tree_payload()).unwrap();

        let payload: PushPayload = serde_json::from_value(json!({
            "parentId": "root",
            "item": {
                "id": "B",
                "playableOrBrowsable": "BROWSABLE",
                "children": [{"id": "B1", "playableOrBrowsable": "PLAYABLE"}],
            },
        }))
        .unwrap();
        handle_push_media_item(&state, payload).unwrap();

        let root_ids: Vec<_> = state
            .store
            .children("root")
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(root_ids, vec!["A", "B"]);
        assert_eq!(state.store.children("B").len(), 1);
    }

    #[test]
    fn update_media_item_registers_patched_icon() {
        let state = state();
        handle_set_media_items(&state, tree_payload()).unwrap();

        let patch: MediaItemPatch = serde_json::from_value(json!({
            "id": "A1",
            "icon": "https://cdn.example.com/new.png",
        }))
        .unwrap();
        handle_update_media_item(&state, patch).unwrap();

        let updated = state.store.get("A1").unwrap();
        assert_eq!(updated.icon.as_deref(), Some("https://cdn.example.com/new.png"));
        assert!(state
            .artwork
            .remote_uri(&crate::artwork::ArtworkResolver::cache_key(
                "https://cdn.example.com/new.png"
            ))
            .is_some());
    }

    #[test]
    fn update_media_items_merges_by_default() {
        let state = state();
        handle_set_media_items(&state, tree_payload()).unwrap();

        let payload: BatchPayload = serde_json::from_value(json!({
            "parentId": "A",
            "items": [
                {"id": "A1", "title": "renamed", "playableOrBrowsable": "PLAYABLE"},
                {"id": "A2", "playableOrBrowsable": "PLAYABLE"},
            ],
        }))
        .unwrap();
        assert!(!payload.replace);
        handle_update_media_items(&state, payload).unwrap();

        let children = state.store.children("A");
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].title.as_deref(), Some("renamed"));
    }

    #[test]
    fn mutation_reply_is_quiet_on_success() {
        assert!(mutation_reply(Ok(())).is_none());
        let err = ValidationError {
            issues: vec![crate::model::FieldIssue {
                path: "item.id".into(),
                message: "missing required field".into(),
            }],
        };
        assert!(mutation_reply(Err(err)).is_some());
    }

    #[test]
    fn outgoing_messages_use_screaming_snake_tags() {
        let msg = WsOutgoing::HeartbeatAck.to_message().unwrap();
        match msg {
            Message::Text(text) => assert!(text.contains("HEARTBEAT_ACK")),
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
