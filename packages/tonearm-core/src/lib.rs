//! Tonearm Core - shared library for the Tonearm media hierarchy bridge.
//!
//! This crate provides the core functionality for Tonearm, a service that
//! lets a declaring client publish a browsable media hierarchy over a
//! JSON/WebSocket bridge and lets browse clients (head units, external UIs)
//! read it over HTTP, receiving playback selections back as events.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`model`]: Media item model and payload validation
//! - [`store`]: The in-memory hierarchy store (parent id → ordered children)
//! - [`browse`]: Read-side adapter answering root/children/selection queries
//! - [`events`]: Event system for real-time client communication
//! - [`artwork`]: Remote icon fetch and cache
//! - [`state`]: Core application state and configuration
//! - [`api`]: HTTP/WebSocket surface
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! [`EventEmitter`](events::EventEmitter) decouples the store and browse
//! adapter from transport; the default [`BroadcastEventBridge`] fans events
//! out to every connected WebSocket client.

#![warn(clippy::all)]

pub mod api;
pub mod artwork;
pub mod browse;
pub mod error;
pub mod events;
pub mod model;
pub mod state;
pub mod store;

// Re-export commonly used types at the crate root
pub use artwork::{ArtworkResolver, CachedArtwork};
pub use browse::{BrowseService, BrowserRoot, NowPlaying, SelectionOutcome};
pub use error::{ErrorCode, TonearmError, TonearmResult};
pub use events::{
    BroadcastEvent, BroadcastEventBridge, EventEmitter, HierarchyEvent, LoggingEventEmitter,
    NoopEventEmitter, SelectionEvent,
};
pub use model::{
    Classification, ContentStyle, ExtraValue, FieldIssue, MediaItem, MediaItemInput,
    MediaItemPatch, MediaTree, ValidatedNode, ValidatedTree, ValidationError,
};
pub use state::{BridgeConfig, Config};
pub use store::{HierarchySnapshot, HierarchyStore, ParentEntry};

// Re-export API types
pub use api::{start_server, AppState, AppStateBuilder, ServerError, WsConnectionManager};
