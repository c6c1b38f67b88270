//! Event emitter abstraction for decoupling the store from transport.
//!
//! The store and browse adapter depend on the [`EventEmitter`] trait rather
//! than concrete broadcast channels, enabling testing and alternative
//! transport implementations.

use super::{HierarchyEvent, SelectionEvent};

/// Trait for emitting domain events without knowledge of transport.
///
/// Services use this trait to emit events, decoupling them from the
/// specifics of how events are delivered to clients.
///
/// # Example
///
/// ```ignore
/// struct MyService {
///     emitter: Arc<dyn EventEmitter>,
/// }
///
/// impl MyService {
///     fn do_something(&self) {
///         self.emitter.emit_selection(SelectionEvent::ItemSelected { .. });
///     }
/// }
/// ```
pub trait EventEmitter: Send + Sync {
    /// Emits a hierarchy structure event.
    fn emit_hierarchy(&self, event: HierarchyEvent);

    /// Emits a browse selection event.
    fn emit_selection(&self, event: SelectionEvent);
}

/// No-op emitter for tests or store usage without a transport attached.
///
/// Events are silently discarded.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_hierarchy(&self, _event: HierarchyEvent) {
        // No-op
    }

    fn emit_selection(&self, _event: SelectionEvent) {
        // No-op
    }
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level. Useful for debugging event flow
/// or in development environments.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_hierarchy(&self, event: HierarchyEvent) {
        tracing::debug!(?event, "hierarchy_event");
    }

    fn emit_selection(&self, event: SelectionEvent) {
        tracing::debug!(?event, "selection_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Test emitter that counts events.
    struct CountingEventEmitter {
        hierarchy_count: AtomicUsize,
        selection_count: AtomicUsize,
    }

    impl CountingEventEmitter {
        fn new() -> Self {
            Self {
                hierarchy_count: AtomicUsize::new(0),
                selection_count: AtomicUsize::new(0),
            }
        }
    }

    impl EventEmitter for CountingEventEmitter {
        fn emit_hierarchy(&self, _event: HierarchyEvent) {
            self.hierarchy_count.fetch_add(1, Ordering::SeqCst);
        }

        fn emit_selection(&self, _event: SelectionEvent) {
            self.selection_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn counting_emitter_tracks_events() {
        let emitter = Arc::new(CountingEventEmitter::new());

        emitter.emit_hierarchy(HierarchyEvent::ChildrenChanged {
            parent_id: "root".to_string(),
        });
        emitter.emit_hierarchy(HierarchyEvent::Replaced { root_id: None });
        emitter.emit_selection(SelectionEvent::UnknownItemSelected {
            media_id: "missing".to_string(),
        });

        assert_eq!(emitter.hierarchy_count.load(Ordering::SeqCst), 2);
        assert_eq!(emitter.selection_count.load(Ordering::SeqCst), 1);
    }
}
