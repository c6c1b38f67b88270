//! HTTP/WebSocket API layer.
//!
//! This module contains thin handlers that delegate to the store and
//! services. It provides the router construction and server startup
//! functionality.

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::artwork::ArtworkResolver;
use crate::browse::BrowseService;
use crate::events::{BroadcastEvent, BroadcastEventBridge};
use crate::state::Config;
use crate::store::HierarchyStore;

pub mod http;
pub mod ws;
pub mod ws_connection;

pub use ws_connection::WsConnectionManager;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),

    /// No available ports in the specified range.
    #[error("No available ports in range {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },
}

/// Shared application state for the API layer.
///
/// This is a thin wrapper that holds references to services.
/// All business logic lives in the services themselves.
#[derive(Clone)]
pub struct AppState {
    /// The hierarchy store, sole owner of the browse tree.
    pub store: Arc<HierarchyStore>,
    /// Read-side browse adapter.
    pub browse: Arc<BrowseService>,
    /// Remote artwork fetch and cache.
    pub artwork: Arc<ArtworkResolver>,
    /// Broadcast channel sender for real-time events.
    pub broadcast_tx: broadcast::Sender<BroadcastEvent>,
    /// Event bridge for emitting events to WebSocket clients.
    pub event_bridge: Arc<BroadcastEventBridge>,
    /// Manages WebSocket connections.
    pub ws_manager: Arc<WsConnectionManager>,
    /// Application configuration.
    pub config: Arc<RwLock<Config>>,
}

/// Builder for constructing an `AppState`.
#[derive(Default)]
pub struct AppStateBuilder {
    store: Option<Arc<HierarchyStore>>,
    browse: Option<Arc<BrowseService>>,
    artwork: Option<Arc<ArtworkResolver>>,
    broadcast_tx: Option<broadcast::Sender<BroadcastEvent>>,
    event_bridge: Option<Arc<BroadcastEventBridge>>,
    ws_manager: Option<Arc<WsConnectionManager>>,
    config: Option<Arc<RwLock<Config>>>,
}

impl AppStateBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the hierarchy store.
    pub fn store(mut self, store: Arc<HierarchyStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the browse service.
    pub fn browse(mut self, browse: Arc<BrowseService>) -> Self {
        self.browse = Some(browse);
        self
    }

    /// Sets the artwork resolver.
    pub fn artwork(mut self, artwork: Arc<ArtworkResolver>) -> Self {
        self.artwork = Some(artwork);
        self
    }

    /// Sets the broadcast sender.
    pub fn broadcast_tx(mut self, tx: broadcast::Sender<BroadcastEvent>) -> Self {
        self.broadcast_tx = Some(tx);
        self
    }

    /// Sets the event bridge.
    pub fn event_bridge(mut self, bridge: Arc<BroadcastEventBridge>) -> Self {
        self.event_bridge = Some(bridge);
        self
    }

    /// Sets the WebSocket connection manager.
    pub fn ws_manager(mut self, manager: Arc<WsConnectionManager>) -> Self {
        self.ws_manager = Some(manager);
        self
    }

    /// Sets the configuration.
    pub fn config(mut self, config: Arc<RwLock<Config>>) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the `AppState`, panicking if required fields are missing.
    pub fn build(self) -> AppState {
        AppState {
            store: self.store.expect("store is required"),
            browse: self.browse.expect("browse is required"),
            artwork: self.artwork.expect("artwork is required"),
            broadcast_tx: self.broadcast_tx.expect("broadcast_tx is required"),
            event_bridge: self.event_bridge.expect("event_bridge is required"),
            ws_manager: self.ws_manager.expect("ws_manager is required"),
            config: self.config.expect("config is required"),
        }
    }
}

impl AppState {
    /// Creates a new builder for constructing an `AppState`.
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    /// Wires a complete state from a validated configuration.
    ///
    /// The store, browse adapter and resolver all share one event bridge,
    /// so every structural change and selection reaches every subscriber.
    pub fn wire(config: Config) -> AppState {
        let bridge = Arc::new(BroadcastEventBridge::new(config.bridge.broadcast_capacity));
        let store = Arc::new(HierarchyStore::new(bridge.clone()));
        let browse = Arc::new(BrowseService::new(store.clone(), bridge.clone()));
        let artwork = Arc::new(ArtworkResolver::with_timeout(
            std::time::Duration::from_secs(config.artwork_fetch_timeout_secs),
        ));
        AppState::builder()
            .store(store)
            .browse(browse)
            .artwork(artwork)
            .broadcast_tx(bridge.sender().clone())
            .event_bridge(bridge)
            .ws_manager(Arc::new(WsConnectionManager::new()))
            .config(Arc::new(RwLock::new(config)))
            .build()
    }
}

async fn find_available_port(
    start: u16,
    end: u16,
) -> Result<(u16, tokio::net::TcpListener), ServerError> {
    for port in start..=end {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => return Ok((port, listener)),
            Err(_) => continue,
        }
    }
    Err(ServerError::NoAvailablePort { start, end })
}

/// Starts the HTTP server on the configured or auto-discovered port.
pub async fn start_server(state: AppState) -> Result<(), ServerError> {
    let preferred_port = state.config.read().preferred_port;
    let (port, listener) = if preferred_port > 0 {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], preferred_port));
        (preferred_port, tokio::net::TcpListener::bind(&addr).await?)
    } else {
        find_available_port(48400, 48410).await?
    };

    log::info!("Server listening on http://0.0.0.0:{}", port);
    let app = http::create_router(state);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn find_available_port_returns_a_bound_listener() {
        let (port, listener) = find_available_port(48400, 48410).await.unwrap();
        assert_eq!(listener.local_addr().unwrap().port(), port);
    }

    #[test]
    fn wire_builds_a_complete_state() {
        let state = AppState::wire(Config::default());
        assert_eq!(state.ws_manager.connection_count(), 0);
        assert!(state.store.root_id().is_none());
    }
}
