//! # Updates
//!
//! Two entry points replace a node's state after user edits:
//!
//! - [`FormNode::update_value`] applies one tagged [`Update`] to the node
//!   itself: set, append, replace or remove one field, or merge an overlay
//!   patch.
//! - [`FormNode::update_in`] resolves a dotted path, applies a payload at the
//!   addressed node, and substitutes each rebuilt child back into its parent
//!   with `update_value`, so every level is re-validated on the way up.
//!
//! Every update ends with a non-forced validation and a fresh flat view.
//!
//! ## Touched Tracking
//!
//! Setting an object field marks it touched when it was already touched, the
//! new value is truthy, or the new value differs from the field's initial
//! raw value. Clearing a field that started filled therefore surfaces its
//! `required` error.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use formtree_core::{ErrorSet, FieldPath, FormError};

use crate::node::FormNode;
use crate::schema::FormSchema;
use crate::state::{FieldValue, FormState, ValueRef, Values};

/// Which field of a node an update addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKey {
    /// Add a new element at the end of a list node.
    Append,
    /// A list element by position.
    Index(usize),
    /// An object field by name. On a list node the name must be numeric.
    Name(String),
}

impl From<&str> for FieldKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for FieldKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for FieldKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// An incoming sub-state merged shallowly into a node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayPatch {
    /// Fields to set; existing fields not named here are kept.
    pub values: Option<BTreeMap<String, FieldValue>>,
    /// Touched flags to set.
    pub touched: Option<BTreeMap<String, bool>>,
    /// Errors merged in after re-validation.
    pub errors: Option<ErrorSet>,
}

impl OverlayPatch {
    /// A patch setting the fields of a raw JSON object as scalars.
    pub fn from_values(raw: &Value) -> Self {
        let values = match Values::from_raw_object(raw) {
            Values::Object(map) => Some(map),
            Values::List(_) => None,
        };
        Self {
            values,
            ..Self::default()
        }
    }
}

impl From<FormState> for OverlayPatch {
    fn from(state: FormState) -> Self {
        let values = match state.values {
            Values::Object(map) => Some(map),
            Values::List(_) => None,
        };
        Self {
            values,
            touched: Some(state.touched),
            errors: None,
        }
    }
}

/// A single update applied by [`FormNode::update_value`].
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Set, append, replace or remove one field.
    ///
    /// On a list node a `null` scalar at an index removes that element. With
    /// `merge` the value is merged into the existing child instead of
    /// replacing it.
    SetField {
        key: FieldKey,
        value: FieldValue,
        merge: bool,
    },
    /// Merge a sub-state into this node.
    MergeOverlay(OverlayPatch),
}

impl Update {
    /// Set `key` to `value`, replacing what is there.
    pub fn set(key: impl Into<FieldKey>, value: impl Into<FieldValue>) -> Self {
        Self::SetField {
            key: key.into(),
            value: value.into(),
            merge: false,
        }
    }

    /// Append an element parsed from `value` to a list node.
    pub fn append(value: impl Into<FieldValue>) -> Self {
        Self::SetField {
            key: FieldKey::Append,
            value: value.into(),
            merge: false,
        }
    }

    /// Remove the list element at `index`.
    pub fn remove(index: usize) -> Self {
        Self::set(index, Value::Null)
    }

    /// Replace the list element at `index`.
    pub fn replace(index: usize, value: impl Into<FieldValue>) -> Self {
        Self::set(index, value)
    }

    /// Merge `value` into the child at `key`.
    pub fn merge_into(key: impl Into<FieldKey>, value: impl Into<FieldValue>) -> Self {
        Self::SetField {
            key: key.into(),
            value: value.into(),
            merge: true,
        }
    }

    /// Merge an overlay patch.
    pub fn overlay(patch: OverlayPatch) -> Self {
        Self::MergeOverlay(patch)
    }
}

impl FormNode {
    /// Apply one update, then re-validate and recompute the flat view.
    pub fn update_value(&mut self, update: Update) -> Result<(), FormError> {
        match update {
            Update::SetField { key, value, merge } => {
                if self.state.values.is_list() {
                    self.set_element(key, value, merge)?;
                } else {
                    self.set_field(key, value, merge)?;
                }
                self.validate(false);
            }
            Update::MergeOverlay(patch) => {
                let OverlayPatch {
                    values,
                    touched,
                    errors,
                } = patch;
                if let Some(values) = values {
                    match &mut self.state.values {
                        Values::Object(map) => map.extend(values),
                        Values::List(_) => {
                            return Err(FormError::ShapeMismatch {
                                path: FieldPath::root().to_string(),
                                expected: "object",
                                found: "list",
                            })
                        }
                    }
                }
                if let Some(touched) = touched {
                    self.state.touched.extend(touched);
                }
                self.validate(false);
                if let Some(errors) = errors {
                    self.state.errors = ErrorSet::merge(&self.state.errors, &errors);
                }
                debug!(form = self.schema.name(), "merged overlay patch");
            }
        }
        self.refresh_flat();
        Ok(())
    }

    fn set_element(&mut self, key: FieldKey, value: FieldValue, merge: bool) -> Result<(), FormError> {
        let child_schema = self.element_schema()?;
        let index = match key {
            FieldKey::Append => {
                let child = match value {
                    FieldValue::Node(state) => state,
                    FieldValue::Scalar(raw) => {
                        let mut sub = FormNode::new(child_schema);
                        sub.parse(&raw, false);
                        sub.into_state()
                    }
                };
                if let Values::List(items) = &mut self.state.values {
                    items.push(child);
                }
                return Ok(());
            }
            FieldKey::Index(index) => index,
            FieldKey::Name(name) => name.parse::<usize>().map_err(|_| FormError::InvalidIndex {
                path: FieldPath::root().to_string(),
                segment: name.clone(),
            })?,
        };

        let Values::List(items) = &mut self.state.values else {
            return Ok(());
        };
        if index >= items.len() {
            debug!(
                form = self.schema.name(),
                index,
                len = items.len(),
                "list index out of range; update ignored"
            );
            return Ok(());
        }

        if value.is_null() {
            items.remove(index);
            return Ok(());
        }

        let child = if merge {
            merge_child(&child_schema, items[index].clone(), value, &FieldPath::parse(&index.to_string()))?
        } else {
            match value {
                FieldValue::Node(state) => state,
                FieldValue::Scalar(raw) => {
                    let mut sub = FormNode::new(child_schema);
                    sub.parse(&raw, false);
                    sub.into_state()
                }
            }
        };
        items[index] = child;
        Ok(())
    }

    fn set_field(&mut self, key: FieldKey, value: FieldValue, merge: bool) -> Result<(), FormError> {
        let name = match key {
            FieldKey::Name(name) => name,
            FieldKey::Index(index) => index.to_string(),
            FieldKey::Append => {
                return Err(FormError::ShapeMismatch {
                    path: FieldPath::root().to_string(),
                    expected: "list",
                    found: "object",
                })
            }
        };

        let value = match (merge, self.state.values.child(&name), self.schema.nested_schema(&name)) {
            (true, Some(ValueRef::Node(existing)), Some(child_schema)) => FieldValue::Node(merge_child(
                child_schema,
                existing.clone(),
                value,
                &FieldPath::parse(&name),
            )?),
            (false, _, Some(child_schema)) => match value {
                FieldValue::Scalar(raw) => {
                    let mut sub = FormNode::new(Arc::clone(child_schema));
                    sub.parse(&raw, false);
                    FieldValue::Node(sub.into_state())
                }
                node @ FieldValue::Node(_) => node,
            },
            _ => value,
        };

        let touched = self.state.is_touched(&name)
            || value.is_truthy()
            || value.differs_from(self.state.initial.get(&name));
        if let Values::Object(map) = &mut self.state.values {
            map.insert(name.clone(), value);
        }
        self.state.touched.insert(name, touched);
        Ok(())
    }

    fn element_schema(&self) -> Result<Arc<FormSchema>, FormError> {
        self.schema
            .list_child()
            .cloned()
            .ok_or_else(|| FormError::ShapeMismatch {
                path: FieldPath::root().to_string(),
                expected: "list",
                found: "object",
            })
    }

    // ── Path-addressed updates ───────────────────────────────────────

    /// Apply `payload` at the node addressed by `path`.
    ///
    /// At the addressed node, a mapping payload applies one update per key
    /// (keys containing dots address deeper nodes) and an array payload
    /// against a list node appends each element. A path ending at a scalar
    /// field sets that field to the payload.
    pub fn update_in(&mut self, payload: &Value, path: impl Into<FieldPath>) -> Result<(), FormError> {
        let path = path.into();
        self.apply_in(payload, &path, &FieldPath::root())?;
        debug!(form = self.schema.name(), path = %path, "applied nested update");
        Ok(())
    }

    fn apply_in(&mut self, payload: &Value, path: &FieldPath, at: &FieldPath) -> Result<(), FormError> {
        match path.split_first() {
            None => self.apply_terminal(payload, at),
            Some((head, rest)) => self.apply_child(head, payload, &rest, &at.child(head)),
        }
    }

    fn apply_terminal(&mut self, payload: &Value, at: &FieldPath) -> Result<(), FormError> {
        match payload {
            Value::Object(entries) => {
                for (key, value) in entries {
                    let key_path = FieldPath::parse(key);
                    match key_path.split_first() {
                        None => continue,
                        Some((head, rest)) if !rest.is_root() => {
                            self.apply_child(head, value, &rest, &at.child(head))?
                        }
                        Some((head, _)) => self.apply_key(head, value, at)?,
                    }
                }
                self.refresh_flat();
                Ok(())
            }
            Value::Array(items) if self.state.values.is_list() => {
                for item in items {
                    self.update_value(Update::append(item.clone()))?;
                }
                Ok(())
            }
            _ => Err(FormError::invalid_payload(
                at.to_string(),
                format!(
                    "a {} node accepts a mapping{}",
                    self.state.values.shape(),
                    if self.state.values.is_list() { " or an array" } else { "" }
                ),
            )),
        }
    }

    fn apply_key(&mut self, key: &str, value: &Value, at: &FieldPath) -> Result<(), FormError> {
        if self.state.values.is_list() {
            let index = key.parse::<usize>().map_err(|_| FormError::InvalidIndex {
                path: at.child(key).to_string(),
                segment: key.to_string(),
            })?;
            if value.is_null() {
                return self.update_value(Update::remove(index));
            }
            return self.apply_child(key, value, &FieldPath::root(), &at.child(key));
        }

        let descends = self.schema.nested_schema(key).is_some() && (value.is_object() || value.is_array());
        if descends {
            self.apply_child(key, value, &FieldPath::root(), &at.child(key))
        } else {
            self.update_value(Update::set(key, value.clone()))
        }
    }

    fn apply_child(
        &mut self,
        head: &str,
        payload: &Value,
        rest: &FieldPath,
        at: &FieldPath,
    ) -> Result<(), FormError> {
        if self.state.values.is_list() {
            let index = head.parse::<usize>().map_err(|_| FormError::InvalidIndex {
                path: at.to_string(),
                segment: head.to_string(),
            })?;
            let existing = self
                .state
                .values
                .as_list()
                .and_then(|items| items.get(index))
                .cloned()
                .ok_or_else(|| FormError::path_not_found(at.to_string()))?;
            let mut sub = FormNode::with_state(self.element_schema()?, existing);
            sub.apply_in(payload, rest, at)?;
            return self.update_value(Update::replace(index, sub.into_state()));
        }

        if let Some(child_schema) = self.schema.nested_schema(head).cloned() {
            let existing = match self.state.values.child(head).and_then(|v| v.as_node()) {
                Some(state) => state.clone(),
                None => {
                    let mut fresh = FormNode::new(Arc::clone(&child_schema));
                    fresh.parse(&Value::Null, false);
                    fresh.into_state()
                }
            };
            let mut sub = FormNode::with_state(child_schema, existing);
            sub.apply_in(payload, rest, at)?;
            return self.update_value(Update::set(head, sub.into_state()));
        }

        if rest.is_root() {
            return self.update_value(Update::set(head, payload.clone()));
        }

        Err(FormError::NotNested {
            field: head.to_string(),
            path: at.join(rest).to_string(),
        })
    }
}

fn merge_child(
    schema: &Arc<FormSchema>,
    existing: FormState,
    incoming: FieldValue,
    at: &FieldPath,
) -> Result<FormState, FormError> {
    let mut sub = FormNode::with_state(Arc::clone(schema), existing);
    match incoming {
        FieldValue::Scalar(raw) => sub.apply_terminal(&raw, at)?,
        FieldValue::Node(state) => sub.update_value(Update::overlay(OverlayPatch::from(state)))?,
    }
    Ok(sub.into_state())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{required, REQUIRED_MESSAGE};
    use formtree_core::{ErrorEntry, Severity};
    use serde_json::json;

    fn person() -> Arc<FormSchema> {
        FormSchema::builder("Person").rule("name", required()).build()
    }

    fn people() -> Arc<FormSchema> {
        FormSchema::list_builder("People", person()).build()
    }

    fn movie() -> Arc<FormSchema> {
        FormSchema::builder("Movie")
            .rule("title", required())
            .nested("director", person())
            .nested("actors", people())
            .build()
    }

    #[test]
    fn test_clearing_required_field_reports_error() {
        let schema = FormSchema::builder("Required").rule("f0", required()).build();
        let mut node = FormNode::new(schema);
        node.parse(&json!({"f0": "v0"}), false);
        assert!(node.errors().is_empty());
        node.update_value(Update::set("f0", json!(""))).unwrap();
        assert_eq!(node.errors().count(Severity::Error), 1);
        assert_eq!(
            node.errors().errors_for("f0"),
            &[ErrorEntry::new(Severity::Error, REQUIRED_MESSAGE)]
        );
        assert!(node.is_touched("f0"));
    }

    #[test]
    fn test_setting_initial_falsy_value_stays_untouched() {
        let schema = FormSchema::builder("Required").rule("f0", required()).build();
        let mut node = FormNode::new(schema);
        node.parse(&json!({"f0": ""}), false);
        node.update_value(Update::set("f0", json!(""))).unwrap();
        assert!(!node.is_touched("f0"));
        assert!(node.errors().is_empty());
    }

    #[test]
    fn test_update_recomputes_flat() {
        let mut node = FormNode::new(movie());
        node.parse(&json!({"title": "Alien"}), false);
        node.update_value(Update::set("title", json!("Aliens"))).unwrap();
        assert_eq!(node.flat()["title"], json!("Aliens"));
    }

    #[test]
    fn test_append_then_remove_restores_list() {
        let mut node = FormNode::new(people());
        node.parse(&json!([{"name": "a"}]), false);
        let before = node.state().clone();
        node.update_value(Update::append(json!({"name": "b"}))).unwrap();
        assert_eq!(node.flat(), &json!([{"name": "a"}, {"name": "b"}]));
        node.update_value(Update::remove(1)).unwrap();
        assert_eq!(node.state().values, before.values);
        assert_eq!(node.flat(), &before.flat);
    }

    #[test]
    fn test_remove_shifts_later_elements() {
        let mut node = FormNode::new(people());
        node.parse(&json!([{"name": "a"}, {"name": "b"}, {"name": "c"}]), false);
        node.update_value(Update::remove(0)).unwrap();
        assert_eq!(node.flat(), &json!([{"name": "b"}, {"name": "c"}]));
    }

    #[test]
    fn test_out_of_range_index_is_ignored() {
        let mut node = FormNode::new(people());
        node.parse(&json!([{"name": "a"}]), false);
        let before = node.state().clone();
        node.update_value(Update::remove(5)).unwrap();
        node.update_value(Update::replace(5, json!({"name": "z"}))).unwrap();
        assert_eq!(node.state(), &before);
    }

    #[test]
    fn test_non_numeric_list_key_is_rejected() {
        let mut node = FormNode::new(people());
        node.parse(&json!([]), false);
        let err = node.update_value(Update::set("first", json!({}))).unwrap_err();
        assert!(matches!(err, FormError::InvalidIndex { .. }));
    }

    #[test]
    fn test_append_to_object_is_rejected() {
        let mut node = FormNode::new(person());
        node.parse(&json!({}), false);
        let err = node.update_value(Update::append(json!({}))).unwrap_err();
        assert!(matches!(err, FormError::ShapeMismatch { expected: "list", .. }));
    }

    #[test]
    fn test_merge_into_list_element() {
        let schema = FormSchema::list_builder(
            "Rows",
            FormSchema::builder("Row").build(),
        )
        .build();
        let mut node = FormNode::new(schema);
        node.parse(&json!([{"a": 1, "b": 2}]), false);
        node.update_value(Update::merge_into(0usize, json!({"b": 3}))).unwrap();
        assert_eq!(node.flat(), &json!([{"a": 1, "b": 3}]));
        node.update_value(Update::replace(0, json!({"c": 4}))).unwrap();
        assert_eq!(node.flat(), &json!([{"c": 4}]));
    }

    #[test]
    fn test_appended_element_errors_roll_up() {
        let mut node = FormNode::new(movie());
        node.parse(&json!({"title": "Alien"}), false);
        node.update_in(&json!([{"name": ""}]), "actors").unwrap();
        // The element is freshly parsed: nothing is touched, nothing counted.
        assert!(node.errors().is_empty());
        node.update_in(&json!("Ripley"), "actors.0.name").unwrap();
        node.update_in(&json!(""), "actors.0.name").unwrap();
        assert_eq!(node.errors().count(Severity::Error), 1);
        let actors = node.state().node_at(&FieldPath::parse("actors")).unwrap();
        assert_eq!(actors.errors.count(Severity::Error), 1);
    }

    #[test]
    fn test_update_in_nested_object() {
        let mut node = FormNode::new(movie());
        node.parse(&json!({"director": {"name": "Ridley"}}), false);
        node.update_in(&json!({"name": ""}), "director").unwrap();
        assert_eq!(node.flat()["director"], json!({"name": ""}));
        let director = node.state().node_at(&FieldPath::parse("director")).unwrap();
        assert!(director.is_touched("name"));
        assert_eq!(director.errors.count(Severity::Error), 1);
        assert_eq!(node.errors().count(Severity::Error), 1);
    }

    #[test]
    fn test_raw_value_at_nested_key_becomes_child_state() {
        let mut node = FormNode::new(movie());
        node.parse(&json!({"title": "Alien", "director": {"name": "a"}}), false);
        node.update_value(Update::set("director", json!({"name": ""}))).unwrap();
        assert!(matches!(
            node.state().values.child("director"),
            Some(ValueRef::Node(_))
        ));
        assert_eq!(node.flat()["director"], json!({"name": ""}));

        node.validate(true);
        assert_eq!(node.errors().count(Severity::Error), 1);
        let director = node.state().node_at(&FieldPath::parse("director")).unwrap();
        assert_eq!(
            director.errors.errors_for("name"),
            &[ErrorEntry::new(Severity::Error, REQUIRED_MESSAGE)]
        );
    }

    #[test]
    fn test_update_in_dotted_keys() {
        let mut node = FormNode::new(movie());
        node.parse(&json!({"actors": [{"name": "a"}]}), false);
        node.update_in(&json!({"title": "Alien", "actors.0.name": "b", "director.name": "c"}), "")
            .unwrap();
        assert_eq!(
            node.flat(),
            &json!({"title": "Alien", "director": {"name": "c"}, "actors": [{"name": "b"}]})
        );
    }

    #[test]
    fn test_update_in_pre_split_path() {
        let mut node = FormNode::new(movie());
        node.parse(&json!({"actors": [{"name": "a"}]}), false);
        node.update_in(&json!("z"), vec!["actors", "0", "name"]).unwrap();
        assert_eq!(
            node.get_value("actors.0.name").and_then(|v| v.as_scalar()),
            Some(&json!("z"))
        );
    }

    #[test]
    fn test_update_in_removes_by_null_index() {
        let mut node = FormNode::new(movie());
        node.parse(&json!({"actors": [{"name": "a"}, {"name": "b"}]}), false);
        node.update_in(&json!({"0": null}), "actors").unwrap();
        assert_eq!(node.flat()["actors"], json!([{"name": "b"}]));
    }

    #[test]
    fn test_update_in_reports_structural_errors() {
        let mut node = FormNode::new(movie());
        node.parse(&json!({"actors": []}), false);
        assert!(matches!(
            node.update_in(&json!("x"), "actors.3.name"),
            Err(FormError::PathNotFound { .. })
        ));
        assert!(matches!(
            node.update_in(&json!("x"), "actors.lead.name"),
            Err(FormError::InvalidIndex { .. })
        ));
        assert!(matches!(
            node.update_in(&json!("x"), "title.sub"),
            Err(FormError::NotNested { .. })
        ));
        assert!(matches!(
            node.update_in(&json!("x"), "director"),
            Err(FormError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_overlay_patch_merges_shallowly() {
        let mut node = FormNode::new(FormSchema::builder("Plain").build());
        node.parse(&json!({"a": 1}), false);
        node.update_value(Update::overlay(OverlayPatch::from_values(&json!({"b": 2}))))
            .unwrap();
        assert_eq!(node.flat(), &json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_overlay_patch_errors_are_merged_after_validation() {
        let schema = FormSchema::builder("Required").rule("f0", required()).build();
        let mut node = FormNode::new(schema);
        node.parse(&json!({}), false);
        let mut supplied = ErrorSet::new();
        supplied.form.push(ErrorEntry::new(Severity::Warning, "server says hi"));
        supplied.counts.insert(Severity::Warning, 1);
        let patch = OverlayPatch {
            touched: Some(BTreeMap::from([("f0".to_string(), true)])),
            errors: Some(supplied),
            ..OverlayPatch::default()
        };
        node.update_value(Update::overlay(patch)).unwrap();
        assert_eq!(node.errors().count(Severity::Error), 1);
        assert_eq!(node.errors().count(Severity::Warning), 1);
        assert_eq!(node.errors().form.len(), 1);
    }
}
