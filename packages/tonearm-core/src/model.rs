//! Media item model and payload validation.
//!
//! Incoming bridge payloads arrive as loosely shaped JSON records
//! ([`MediaItemInput`], [`MediaTree`]). Validation converts them into the
//! typed [`MediaItem`] record, collecting every missing or invalid field of
//! the whole subtree into a single [`ValidationError`] instead of failing on
//! the first bad field.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Whether an item is a playable leaf or a browsable node with children.
///
/// Wire rule: the discriminator string `"PLAYABLE"` classifies as playable;
/// any other string classifies as browsable; a missing discriminator is a
/// validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Playable,
    Browsable,
}

impl Classification {
    /// Classifies a discriminator string.
    fn from_wire(value: &str) -> Self {
        if value == "PLAYABLE" {
            Classification::Playable
        } else {
            Classification::Browsable
        }
    }
}

/// Display style hint for how a browse client should render items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContentStyle {
    #[serde(rename = "CONTENT_STYLE_LIST_ITEM")]
    ListItem,
    #[serde(rename = "CONTENT_STYLE_GRID_ITEM")]
    GridItem,
    #[serde(rename = "CONTENT_STYLE_CATEGORY_LIST_ITEM")]
    CategoryListItem,
    #[serde(rename = "CONTENT_STYLE_CATEGORY_GRID_ITEM")]
    CategoryGridItem,
}

impl ContentStyle {
    /// Parses a `CONTENT_STYLE_*` wire string. Unknown strings are rejected
    /// so typos surface at validation time rather than being shipped as a
    /// meaningless style.
    fn from_wire(value: &str) -> Option<Self> {
        match value {
            "CONTENT_STYLE_LIST_ITEM" => Some(ContentStyle::ListItem),
            "CONTENT_STYLE_GRID_ITEM" => Some(ContentStyle::GridItem),
            "CONTENT_STYLE_CATEGORY_LIST_ITEM" => Some(ContentStyle::CategoryListItem),
            "CONTENT_STYLE_CATEGORY_GRID_ITEM" => Some(ContentStyle::CategoryGridItem),
            _ => None,
        }
    }
}

/// A primitive value in an item's open extras mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ExtraValue {
    /// Converts a JSON value, rejecting arrays, objects and null.
    fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(ExtraValue::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(ExtraValue::Int(i))
                } else {
                    n.as_f64().map(ExtraValue::Float)
                }
            }
            serde_json::Value::String(s) => Some(ExtraValue::Str(s.clone())),
            _ => None,
        }
    }
}

/// An immutable media item: a uniquely identified node in the browse tree.
///
/// Constructed once per incoming payload entry and replaced wholesale on
/// update; fields are never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    /// Unique id across the entire hierarchy (lookup-by-id assumes at most
    /// one match).
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "subTitle", skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Icon URI. For http(s) URIs the API layer serves a locally cached
    /// copy; other schemes pass through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browsable_style: Option<ContentStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playable_style: Option<ContentStyle>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub extras: HashMap<String, ExtraValue>,
    #[serde(rename = "playableOrBrowsable")]
    pub classification: Classification,
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

/// One missing or invalid field, with a path into the payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    /// Path into the payload, e.g. `root[0].children[1].playableOrBrowsable`.
    pub path: String,
    pub message: String,
}

/// Structured validation error carrying every issue found in a payload.
#[derive(Debug, Clone, Error, Serialize)]
#[error("invalid media item payload: {}", self.summary())]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    fn summary(&self) -> String {
        self.issues
            .iter()
            .map(|i| format!("{}: {}", i.path, i.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Collects field issues while walking a payload tree.
#[derive(Default)]
struct IssueCollector {
    issues: Vec<FieldIssue>,
}

impl IssueCollector {
    fn push(&mut self, path: &str, message: impl Into<String>) {
        self.issues.push(FieldIssue {
            path: path.to_string(),
            message: message.into(),
        });
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                issues: self.issues,
            })
        }
    }
}

/// Raw wire-shaped media item record, including nested children.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItemInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "subTitle", default)]
    pub sub_title: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub group_title: Option<String>,
    #[serde(default)]
    pub browsable_style: Option<String>,
    #[serde(default)]
    pub playable_style: Option<String>,
    #[serde(default)]
    pub extras: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub playable_or_browsable: Option<String>,
    #[serde(default)]
    pub children: Option<Vec<MediaItemInput>>,
}

/// A validated media item together with its validated children subtree.
#[derive(Debug, Clone)]
pub struct ValidatedNode {
    pub item: MediaItem,
    pub children: Vec<ValidatedNode>,
}

impl MediaItemInput {
    /// Validates this record and its children recursively.
    ///
    /// All issues in the subtree are collected; the result is `Err` if any
    /// field anywhere in the subtree is missing or invalid.
    pub fn validate(&self) -> Result<ValidatedNode, ValidationError> {
        let mut collector = IssueCollector::default();
        let node = self.validate_at("item", &mut collector);
        collector.finish()?;
        // No issues collected implies every field resolved.
        Ok(node.expect("validation produced no node without issues"))
    }

    fn validate_at(&self, path: &str, collector: &mut IssueCollector) -> Option<ValidatedNode> {
        let id = match &self.id {
            Some(id) if !id.is_empty() => Some(id.clone()),
            Some(_) => {
                collector.push(&format!("{path}.id"), "must not be empty");
                None
            }
            None => {
                collector.push(&format!("{path}.id"), "missing required field");
                None
            }
        };

        let classification = match &self.playable_or_browsable {
            Some(value) => Some(Classification::from_wire(value)),
            None => {
                collector.push(
                    &format!("{path}.playableOrBrowsable"),
                    "missing required field",
                );
                None
            }
        };

        let browsable_style =
            validate_style(&self.browsable_style, &format!("{path}.browsableStyle"), collector);
        let playable_style =
            validate_style(&self.playable_style, &format!("{path}.playableStyle"), collector);
        let extras = validate_extras(&self.extras, path, collector);

        let children = self
            .children
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .enumerate()
            .filter_map(|(i, child)| {
                child.validate_at(&format!("{path}.children[{i}]"), collector)
            })
            .collect();

        Some(ValidatedNode {
            item: MediaItem {
                id: id?,
                title: self.title.clone(),
                subtitle: self.sub_title.clone(),
                icon: self.icon.clone(),
                group_title: self.group_title.clone(),
                browsable_style,
                playable_style,
                extras,
                classification: classification?,
            },
            children,
        })
    }
}

fn validate_style(
    raw: &Option<String>,
    path: &str,
    collector: &mut IssueCollector,
) -> Option<ContentStyle> {
    match raw {
        Some(value) => match ContentStyle::from_wire(value) {
            Some(style) => Some(style),
            None => {
                collector.push(path, format!("unknown content style {value:?}"));
                None
            }
        },
        None => None,
    }
}

fn validate_extras(
    raw: &Option<HashMap<String, serde_json::Value>>,
    path: &str,
    collector: &mut IssueCollector,
) -> HashMap<String, ExtraValue> {
    let mut extras = HashMap::new();
    if let Some(map) = raw {
        for (key, value) in map {
            match ExtraValue::from_json(value) {
                Some(v) => {
                    extras.insert(key.clone(), v);
                }
                None => collector.push(
                    &format!("{path}.extras.{key}"),
                    "must be a string, number or boolean",
                ),
            }
        }
    }
    extras
}

/// Validates a batch of wire records, collecting issues across all of them.
pub fn validate_batch(items: &[MediaItemInput]) -> Result<Vec<ValidatedNode>, ValidationError> {
    let mut collector = IssueCollector::default();
    let nodes: Vec<ValidatedNode> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| item.validate_at(&format!("items[{i}]"), &mut collector))
        .collect();
    collector.finish()?;
    Ok(nodes)
}

// ─────────────────────────────────────────────────────────────────────────────
// Whole-tree payload
// ─────────────────────────────────────────────────────────────────────────────

/// Whole-hierarchy payload: a root id plus the top-level items.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaTree {
    /// The root id the browse service hands out.
    pub id: String,
    /// Top-level items; their nested children become further parents.
    pub root: Vec<MediaItemInput>,
}

/// A fully validated hierarchy payload.
#[derive(Debug, Clone)]
pub struct ValidatedTree {
    pub root_id: String,
    pub root: Vec<ValidatedNode>,
}

impl MediaTree {
    /// Validates the whole tree, collecting all issues across every node.
    pub fn validate(&self) -> Result<ValidatedTree, ValidationError> {
        let mut collector = IssueCollector::default();
        if self.id.is_empty() {
            collector.push("id", "must not be empty");
        }
        let root: Vec<ValidatedNode> = self
            .root
            .iter()
            .enumerate()
            .filter_map(|(i, item)| item.validate_at(&format!("root[{i}]"), &mut collector))
            .collect();
        collector.finish()?;
        Ok(ValidatedTree {
            root_id: self.id.clone(),
            root,
        })
    }
}

impl ValidatedTree {
    /// Flattens the tree into parent-id → children entries.
    ///
    /// Top-level items are keyed under the root id; each node with children
    /// becomes a parent keyed by its own id. Entry order is
    /// first-encountered order, root first.
    pub fn flatten(&self) -> Vec<(String, Vec<MediaItem>)> {
        let mut entries: Vec<(String, Vec<MediaItem>)> = Vec::new();
        let mut queue: Vec<(&str, &[ValidatedNode])> = vec![(&self.root_id, &self.root)];
        while let Some((parent_id, nodes)) = queue.pop() {
            let children: Vec<MediaItem> = nodes.iter().map(|n| n.item.clone()).collect();
            entries.push((parent_id.to_string(), children));
            // Depth-first, reversed so siblings keep payload order.
            for node in nodes.iter().rev() {
                if !node.children.is_empty() {
                    queue.push((&node.item.id, &node.children));
                }
            }
        }
        entries
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Partial updates
// ─────────────────────────────────────────────────────────────────────────────

/// Partial update for an existing item, located by id.
///
/// Every field other than `id` is optional; unspecified fields retain the
/// prior value when the patch is applied.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItemPatch {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "subTitle", default)]
    pub sub_title: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub group_title: Option<String>,
    #[serde(default)]
    pub browsable_style: Option<String>,
    #[serde(default)]
    pub playable_style: Option<String>,
    #[serde(default)]
    pub extras: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub playable_or_browsable: Option<String>,
}

impl MediaItemPatch {
    /// Merges this patch onto an existing item, producing the replacement.
    ///
    /// Provided fields are validated the same way as full payloads; the
    /// extras mapping, when provided, replaces the prior mapping wholesale.
    pub fn apply(&self, existing: &MediaItem) -> Result<MediaItem, ValidationError> {
        let mut collector = IssueCollector::default();
        let browsable_style = match &self.browsable_style {
            Some(_) => validate_style(&self.browsable_style, "item.browsableStyle", &mut collector),
            None => existing.browsable_style,
        };
        let playable_style = match &self.playable_style {
            Some(_) => validate_style(&self.playable_style, "item.playableStyle", &mut collector),
            None => existing.playable_style,
        };
        let extras = match &self.extras {
            Some(_) => validate_extras(&self.extras, "item", &mut collector),
            None => existing.extras.clone(),
        };
        collector.finish()?;

        Ok(MediaItem {
            id: existing.id.clone(),
            title: self.title.clone().or_else(|| existing.title.clone()),
            subtitle: self.sub_title.clone().or_else(|| existing.subtitle.clone()),
            icon: self.icon.clone().or_else(|| existing.icon.clone()),
            group_title: self
                .group_title
                .clone()
                .or_else(|| existing.group_title.clone()),
            browsable_style,
            playable_style,
            extras,
            classification: self
                .playable_or_browsable
                .as_deref()
                .map(Classification::from_wire)
                .unwrap_or(existing.classification),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(value: serde_json::Value) -> MediaItemInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn playable_string_classifies_as_playable() {
        let node = input(json!({"id": "a", "playableOrBrowsable": "PLAYABLE"}))
            .validate()
            .unwrap();
        assert_eq!(node.item.classification, Classification::Playable);
    }

    #[test]
    fn any_other_string_classifies_as_browsable() {
        for value in ["BROWSABLE", "playable", "whatever"] {
            let node = input(json!({"id": "a", "playableOrBrowsable": value}))
                .validate()
                .unwrap();
            assert_eq!(node.item.classification, Classification::Browsable);
        }
    }

    #[test]
    fn missing_discriminator_is_a_validation_error() {
        let err = input(json!({"id": "a"})).validate().unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].path, "item.playableOrBrowsable");
    }

    #[test]
    fn all_issues_in_a_subtree_are_collected() {
        let err = input(json!({
            "id": "a",
            "playableOrBrowsable": "BROWSABLE",
            "browsableStyle": "CONTENT_STYLE_SPIRAL",
            "children": [
                {"title": "no id or discriminator"},
            ],
        }))
        .validate()
        .unwrap_err();

        let paths: Vec<&str> = err.issues.iter().map(|i| i.path.as_str()).collect();
        assert!(paths.contains(&"item.browsableStyle"));
        assert!(paths.contains(&"item.children[0].id"));
        assert!(paths.contains(&"item.children[0].playableOrBrowsable"));
    }

    #[test]
    fn extras_accept_primitives_and_reject_structures() {
        let node = input(json!({
            "id": "a",
            "playableOrBrowsable": "PLAYABLE",
            "extras": {"media_url": "https://x/y.mp3", "bitrate": 320, "live": true},
        }))
        .validate()
        .unwrap();
        assert_eq!(
            node.item.extras.get("media_url"),
            Some(&ExtraValue::Str("https://x/y.mp3".into()))
        );
        assert_eq!(node.item.extras.get("bitrate"), Some(&ExtraValue::Int(320)));
        assert_eq!(node.item.extras.get("live"), Some(&ExtraValue::Bool(true)));

        let err = input(json!({
            "id": "a",
            "playableOrBrowsable": "PLAYABLE",
            "extras": {"nested": {"not": "allowed"}},
        }))
        .validate()
        .unwrap_err();
        assert_eq!(err.issues[0].path, "item.extras.nested");
    }

    #[test]
    fn content_styles_parse_from_wire_strings() {
        let node = input(json!({
            "id": "a",
            "playableOrBrowsable": "BROWSABLE",
            "browsableStyle": "CONTENT_STYLE_GRID_ITEM",
            "playableStyle": "CONTENT_STYLE_CATEGORY_LIST_ITEM",
        }))
        .validate()
        .unwrap();
        assert_eq!(node.item.browsable_style, Some(ContentStyle::GridItem));
        assert_eq!(
            node.item.playable_style,
            Some(ContentStyle::CategoryListItem)
        );
    }

    #[test]
    fn tree_flattens_with_root_first_and_nested_parents() {
        let tree: MediaTree = serde_json::from_value(json!({
            "id": "root",
            "root": [
                {"id": "A", "playableOrBrowsable": "BROWSABLE", "children": [
                    {"id": "A1", "playableOrBrowsable": "PLAYABLE"},
                    {"id": "A2", "playableOrBrowsable": "PLAYABLE"},
                ]},
                {"id": "B", "playableOrBrowsable": "PLAYABLE"},
            ],
        }))
        .unwrap();

        let entries = tree.validate().unwrap().flatten();
        assert_eq!(entries[0].0, "root");
        assert_eq!(
            entries[0].1.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
            vec!["A", "B"]
        );
        assert_eq!(entries[1].0, "A");
        assert_eq!(
            entries[1].1.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
            vec!["A1", "A2"]
        );
    }

    #[test]
    fn patch_keeps_unspecified_fields() {
        let existing = input(json!({
            "id": "a",
            "title": "Old title",
            "subTitle": "Old subtitle",
            "playableOrBrowsable": "PLAYABLE",
        }))
        .validate()
        .unwrap()
        .item;

        let patch: MediaItemPatch =
            serde_json::from_value(json!({"id": "a", "title": "New title"})).unwrap();
        let updated = patch.apply(&existing).unwrap();

        assert_eq!(updated.title.as_deref(), Some("New title"));
        assert_eq!(updated.subtitle.as_deref(), Some("Old subtitle"));
        assert_eq!(updated.classification, Classification::Playable);
    }

    #[test]
    fn patch_with_bad_style_is_rejected() {
        let existing = input(json!({"id": "a", "playableOrBrowsable": "PLAYABLE"}))
            .validate()
            .unwrap()
            .item;
        let patch: MediaItemPatch =
            serde_json::from_value(json!({"id": "a", "browsableStyle": "CONTENT_STYLE_NOPE"}))
                .unwrap();
        assert!(patch.apply(&existing).is_err());
    }

    #[test]
    fn item_serializes_with_wire_field_names() {
        let node = input(json!({
            "id": "a",
            "title": "T",
            "subTitle": "S",
            "groupTitle": "G",
            "playableOrBrowsable": "PLAYABLE",
        }))
        .validate()
        .unwrap();

        let json = serde_json::to_value(&node.item).unwrap();
        assert_eq!(json["subTitle"], "S");
        assert_eq!(json["groupTitle"], "G");
        assert_eq!(json["playableOrBrowsable"], "PLAYABLE");
        assert!(json.get("extras").is_none());
    }
}
