//! Event system for real-time client communication.
//!
//! This module provides:
//! - [`EventEmitter`] trait for domain services to emit events
//! - [`BroadcastEventBridge`] for WebSocket transport
//! - Event types for the two domains (hierarchy structure, browse selection)
//!
//! The `HierarchyEvent` type is defined in [`crate::store`] and re-exported here.

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

// Re-export HierarchyEvent from the store for convenience
pub use crate::store::HierarchyEvent;

use serde::Serialize;

use crate::model::MediaItem;

/// Events broadcast to clients.
///
/// This enum categorizes all real-time events that can be sent to connected
/// clients. Each category has its own inner event type with specific variants.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum BroadcastEvent {
    /// Structural changes to the browse hierarchy.
    Hierarchy(HierarchyEvent),

    /// Selections made by a connected media browser.
    Selection(SelectionEvent),
}

/// Events raised when a media browser interacts with the hierarchy.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionEvent {
    /// A playable item was selected for playback.
    ItemSelected {
        /// The full item as currently stored.
        item: MediaItem,
    },
    /// A browsable node was opened for navigation.
    BrowsableSelected {
        #[serde(rename = "mediaId")]
        media_id: String,
        #[serde(rename = "playableOrBrowsable")]
        classification: crate::model::Classification,
    },
    /// Playback was requested for an id that is not in the hierarchy.
    UnknownItemSelected {
        #[serde(rename = "mediaId")]
        media_id: String,
    },
}

// From implementations for converting inner events to BroadcastEvent
impl From<HierarchyEvent> for BroadcastEvent {
    fn from(event: HierarchyEvent) -> Self {
        BroadcastEvent::Hierarchy(event)
    }
}

impl From<SelectionEvent> for BroadcastEvent {
    fn from(event: SelectionEvent) -> Self {
        BroadcastEvent::Selection(event)
    }
}
