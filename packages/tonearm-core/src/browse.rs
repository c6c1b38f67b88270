//! Browse service adapter: the read-side consumer of the hierarchy store.
//!
//! Sits between a connected media browser (head unit, external UI) and the
//! store. Answers "what is the root" and "what are the children of X", and
//! turns selection callbacks into [`SelectionEvent`]s that flow back to the
//! declaring client over the event bridge.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::events::{EventEmitter, SelectionEvent};
use crate::model::{Classification, MediaItem};
use crate::store::HierarchyStore;

/// The browsing entry point handed to a connecting browser.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserRoot {
    pub root_id: String,
}

/// Now-playing session metadata, set when a playable item is selected.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "subTitle", skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl NowPlaying {
    fn from_item(item: &MediaItem) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            subtitle: item.subtitle.clone(),
            icon: item.icon.clone(),
        }
    }
}

/// Outcome of a selection callback, mirrored to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionOutcome {
    Played,
    Browsed,
    NotFound,
}

/// Read-side adapter over the hierarchy store.
pub struct BrowseService {
    store: Arc<HierarchyStore>,
    emitter: Arc<dyn EventEmitter>,
    now_playing: RwLock<Option<NowPlaying>>,
}

impl BrowseService {
    pub fn new(store: Arc<HierarchyStore>, emitter: Arc<dyn EventEmitter>) -> Self {
        Self {
            store,
            emitter,
            now_playing: RwLock::new(None),
        }
    }

    /// Returns the browsing root, or `None` while no hierarchy is declared.
    ///
    /// A browser connecting before the declaring client has pushed a tree
    /// gets no root rather than an empty one.
    pub fn root(&self) -> Option<BrowserRoot> {
        let root_id = self.store.root_id()?;
        log::debug!("[Browse] root requested, serving {root_id:?}");
        Some(BrowserRoot { root_id })
    }

    /// Returns the children of a parent, empty when the parent is unknown.
    /// Never fails.
    pub fn load_children(&self, parent_id: &str) -> Vec<MediaItem> {
        self.store.children(parent_id)
    }

    /// Handles a selection callback from the browser.
    ///
    /// A playable item is reported with its full payload (extras and
    /// classification included); a browsable node is reported by id and
    /// classification only. An unknown id is reported as such instead of
    /// being dropped, so the declaring client can diagnose stale UIs.
    pub fn select(&self, media_id: &str) -> SelectionOutcome {
        match self.store.get(media_id) {
            Some(item) => match item.classification {
                Classification::Playable => {
                    log::info!("[Browse] playable item selected: {media_id}");
                    *self.now_playing.write() = Some(NowPlaying::from_item(&item));
                    self.emitter
                        .emit_selection(SelectionEvent::ItemSelected { item });
                    SelectionOutcome::Played
                }
                Classification::Browsable => {
                    log::debug!("[Browse] browsable node selected: {media_id}");
                    self.emitter.emit_selection(SelectionEvent::BrowsableSelected {
                        media_id: media_id.to_string(),
                        classification: Classification::Browsable,
                    });
                    SelectionOutcome::Browsed
                }
            },
            None => {
                log::warn!("[Browse] selection for unknown id: {media_id}");
                self.emitter
                    .emit_selection(SelectionEvent::UnknownItemSelected {
                        media_id: media_id.to_string(),
                    });
                SelectionOutcome::NotFound
            }
        }
    }

    /// Returns the now-playing session metadata, if any item has been
    /// played this session.
    pub fn now_playing(&self) -> Option<NowPlaying> {
        self.now_playing.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{HierarchyEvent, SelectionEvent};
    use crate::model::MediaItemInput;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingEmitter {
        selections: Mutex<Vec<SelectionEvent>>,
    }

    impl EventEmitter for RecordingEmitter {
        fn emit_hierarchy(&self, _event: HierarchyEvent) {}

        fn emit_selection(&self, event: SelectionEvent) {
            self.selections.lock().push(event);
        }
    }

    fn item(id: &str, classification: &str) -> crate::model::MediaItem {
        let input: MediaItemInput =
            serde_json::from_value(json!({"id": id, "playableOrBrowsable": classification}))
                .unwrap();
        input.validate().unwrap().item
    }

    fn service() -> (BrowseService, Arc<RecordingEmitter>) {
        let emitter = Arc::new(RecordingEmitter::default());
        let store = Arc::new(HierarchyStore::new(emitter.clone()));
        store.set_hierarchy(
            vec![
                (
                    "root".into(),
                    vec![item("song", "PLAYABLE"), item("album", "BROWSABLE")],
                ),
                ("album".into(), vec![item("track", "PLAYABLE")]),
            ],
            Some("root".into()),
        );
        (BrowseService::new(store, emitter.clone()), emitter)
    }

    #[test]
    fn root_is_none_before_any_hierarchy() {
        let emitter = Arc::new(RecordingEmitter::default());
        let store = Arc::new(HierarchyStore::new(emitter.clone()));
        let service = BrowseService::new(store, emitter);
        assert!(service.root().is_none());
    }

    #[test]
    fn root_reflects_the_store() {
        let (service, _) = service();
        assert_eq!(service.root().unwrap().root_id, "root");
    }

    #[test]
    fn load_children_of_unknown_parent_is_empty() {
        let (service, _) = service();
        assert!(service.load_children("nope").is_empty());
    }

    #[test]
    fn selecting_a_playable_item_emits_the_full_item() {
        let (service, emitter) = service();
        assert_eq!(service.select("song"), SelectionOutcome::Played);

        let selections = emitter.selections.lock();
        match selections.as_slice() {
            [SelectionEvent::ItemSelected { item }] => assert_eq!(item.id, "song"),
            other => panic!("unexpected selections: {other:?}"),
        }
    }

    #[test]
    fn selecting_a_playable_item_updates_now_playing() {
        let (service, _) = service();
        assert!(service.now_playing().is_none());

        service.select("song");
        assert_eq!(service.now_playing().unwrap().id, "song");

        // Browsable selections leave the session untouched.
        service.select("album");
        assert_eq!(service.now_playing().unwrap().id, "song");
    }

    #[test]
    fn selecting_a_browsable_node_emits_id_and_classification() {
        let (service, emitter) = service();
        assert_eq!(service.select("album"), SelectionOutcome::Browsed);

        let selections = emitter.selections.lock();
        match selections.as_slice() {
            [SelectionEvent::BrowsableSelected {
                media_id,
                classification,
            }] => {
                assert_eq!(media_id, "album");
                assert_eq!(*classification, Classification::Browsable);
            }
            other => panic!("unexpected selections: {other:?}"),
        }
    }

    #[test]
    fn selecting_an_unknown_id_is_reported_not_dropped() {
        let (service, emitter) = service();
        assert_eq!(service.select("ghost"), SelectionOutcome::NotFound);

        let selections = emitter.selections.lock();
        assert!(matches!(
            selections.as_slice(),
            [SelectionEvent::UnknownItemSelected { .. }]
        ));
    }
}
