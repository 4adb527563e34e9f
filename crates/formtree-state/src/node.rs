//! # Form Nodes
//!
//! A [`FormNode`] binds a [`FormSchema`] to a [`FormState`] and owns the
//! engine's operations: [`parse`](FormNode::parse) turns raw input into a
//! normalized state tree, [`validate`](FormNode::validate) runs the
//! validation cascade, and the update operations in [`crate::update`]
//! replace the held state with a new one.
//!
//! ## Validation Cascade
//!
//! 1. With `force`, every child (list element or nested field) is rebuilt as
//!    a node and force-validated, and its new state substituted back.
//! 2. Field rules run for touched fields only. Under `force` every queried
//!    field reports touched and is durably marked touched, so errors surfaced
//!    by a forced pass stay visible after later edits.
//! 3. The whole-form rule runs.
//! 4. Each `multi` overlay validates the same state; its errors are merged in.
//! 5. Child counts roll up: all list elements, or the declared nested fields.
//!
//! The accumulator lives for exactly one pass; the finished [`ErrorSet`]
//! replaces the previous one, so counts are never incrementally stale.

use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use formtree_core::{ErrorAccumulator, ErrorSet, FieldPath, Severity};

use crate::render;
use crate::schema::{Composition, FormSchema};
use crate::state::{FieldValue, FormState, ValueRef, Values};

/// A schema-bound form instance holding one state tree.
#[derive(Debug, Clone)]
pub struct FormNode {
    pub(crate) schema: Arc<FormSchema>,
    pub(crate) state: FormState,
    pub(crate) force: bool,
}

impl FormNode {
    /// A node with an empty state of the schema's shape.
    pub fn new(schema: Arc<FormSchema>) -> Self {
        let state = FormState::empty(schema.is_list());
        Self {
            schema,
            state,
            force: false,
        }
    }

    /// A node over an existing state.
    ///
    /// An empty state of the wrong shape is replaced by an empty state of the
    /// schema's shape.
    pub fn with_state(schema: Arc<FormSchema>, state: FormState) -> Self {
        let state = if state.values.is_list() != schema.is_list() && state.values.is_empty() {
            FormState {
                values: Values::empty(schema.is_list()),
                ..state
            }
        } else {
            state
        };
        Self {
            schema,
            state,
            force: false,
        }
    }

    /// The bound schema.
    pub fn schema(&self) -> &Arc<FormSchema> {
        &self.schema
    }

    /// The current state.
    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// Consume the node, keeping its state.
    pub fn into_state(self) -> FormState {
        self.state
    }

    /// The current error set.
    pub fn errors(&self) -> &ErrorSet {
        &self.state.errors
    }

    /// The current flat view.
    pub fn flat(&self) -> &Value {
        &self.state.flat
    }

    // ── Parse ────────────────────────────────────────────────────────

    /// Normalize `raw` into this node's state and validate it.
    ///
    /// Re-parsing a populated node merges into the existing values: list
    /// elements are appended, object fields are overwritten key by key.
    pub fn parse(&mut self, raw: &Value, force: bool) -> &FormState {
        let schema = Arc::clone(&self.schema);
        let existing = std::mem::take(&mut self.state.values);

        let mut values = match schema.composition() {
            Composition::ListOf(child) => {
                let mut items = match existing {
                    Values::List(items) => items,
                    Values::Object(_) => Vec::new(),
                };
                for element in raw.as_array().into_iter().flatten() {
                    let mut sub = FormNode::new(Arc::clone(child));
                    sub.parse(element, force);
                    items.push(sub.into_state());
                }
                Values::List(items)
            }
            composition => {
                let mut map = match existing {
                    Values::Object(map) => map,
                    Values::List(_) => Default::default(),
                };
                if let Some(obj) = raw.as_object() {
                    for (field, value) in obj {
                        // Child states parsed by a sibling overlay stay in place.
                        let holds_node = matches!(map.get(field), Some(FieldValue::Node(_)));
                        if schema.allows(field) && !holds_node {
                            map.insert(field.clone(), FieldValue::Scalar(value.clone()));
                        }
                    }
                }
                if let Composition::ObjectOf(nested) = composition {
                    for (field, sub_schema) in nested {
                        let sub_raw = match schema.initial_hook(field) {
                            Some(hook) => hook(raw),
                            None => raw.get(field).cloned().unwrap_or(Value::Null),
                        };
                        let mut sub = FormNode::new(Arc::clone(sub_schema));
                        sub.parse(&sub_raw, force);
                        map.insert(field.clone(), FieldValue::Node(sub.into_state()));
                    }
                }
                Values::Object(map)
            }
        };

        if let Some(hook) = schema.parse_values_hook() {
            values = hook(values);
        }

        self.state.values = values;
        self.state.touched.clear();
        self.state.initial = if raw.is_null() {
            FormState::empty(schema.is_list()).initial
        } else {
            raw.clone()
        };

        for overlay in schema.multi() {
            let mut sub = FormNode::with_state(Arc::clone(overlay), self.state.clone());
            sub.parse(raw, force);
            self.state = sub.into_state();
        }

        self.refresh_flat();
        self.validate(force)
    }

    // ── Validate ─────────────────────────────────────────────────────

    /// Run the validation cascade and store the resulting errors.
    pub fn validate(&mut self, force: bool) -> &FormState {
        self.force = force;
        let schema = Arc::clone(&self.schema);

        if force {
            self.force_children(&schema);
        }

        let mut errors = ErrorAccumulator::new();

        for (field, rules) in schema.field_validators() {
            if !self.check_touched(field) {
                continue;
            }
            for rule in rules {
                rule.check(&mut errors, field, self);
            }
        }

        if let Some(rule) = schema.form_validator() {
            rule.check(&mut errors, self);
        }

        for overlay in schema.multi() {
            let mut sub = FormNode::with_state(Arc::clone(overlay), self.state.clone());
            sub.validate(force);
            errors.merge_in(&sub.state.errors);
            let sub_state = sub.into_state();
            self.state.values = sub_state.values;
            self.state.touched = sub_state.touched;
        }

        match &self.state.values {
            Values::List(items) => {
                for item in items {
                    errors.add_counts(&item.errors.counts);
                }
            }
            Values::Object(map) => {
                for (field, _) in schema.nested() {
                    if let Some(FieldValue::Node(child)) = map.get(field) {
                        errors.add_counts(&child.errors.counts);
                    }
                }
            }
        }

        self.state.errors = errors.finish();
        trace!(
            form = schema.name(),
            force,
            errors = self.state.errors.count(Severity::Error),
            warnings = self.state.errors.count(Severity::Warning),
            "validated form"
        );
        &self.state
    }

    fn force_children(&mut self, schema: &FormSchema) {
        match &mut self.state.values {
            Values::List(items) => {
                let Some(child_schema) = schema.list_child() else {
                    return;
                };
                for item in items.iter_mut() {
                    let mut sub = FormNode::with_state(Arc::clone(child_schema), std::mem::take(item));
                    sub.validate(true);
                    *item = sub.into_state();
                }
            }
            Values::Object(map) => {
                for (field, child_schema) in schema.nested() {
                    if let Some(FieldValue::Node(child)) = map.get_mut(field) {
                        let mut sub =
                            FormNode::with_state(Arc::clone(child_schema), std::mem::take(child));
                        sub.validate(true);
                        *child = sub.into_state();
                    }
                }
            }
        }
    }

    /// Touched check used by the validation pass. Under force it marks the
    /// field touched on its owning state and reports true.
    fn check_touched(&mut self, field: &str) -> bool {
        let path = FieldPath::parse(field);
        let force = self.force;
        let Some((owner, last)) = path.split_last() else {
            return force;
        };
        match self.state.node_at_mut(&owner) {
            Some(state) => {
                if force {
                    state.touched.insert(last.to_string(), true);
                }
                state.is_touched(last)
            }
            None => force,
        }
    }

    pub(crate) fn refresh_flat(&mut self) {
        self.state.flat = render::flatten(&self.schema, &self.state.values);
    }

    // ── Lookup ───────────────────────────────────────────────────────

    /// Whatever lives at a dotted path; the empty path yields the whole state.
    pub fn get_value(&self, path: impl Into<FieldPath>) -> Option<ValueRef<'_>> {
        self.state.get(&path.into())
    }

    /// The node's values.
    pub fn get_values(&self) -> &Values {
        &self.state.values
    }

    /// The state owning the last segment of `path`, and that segment.
    pub fn lookup_form(&self, path: impl Into<FieldPath>) -> Option<(&FormState, String)> {
        let path = path.into();
        let (state, last) = self.state.lookup(&path)?;
        Some((state, last.to_string()))
    }

    /// Whether the field at `path` has been touched.
    ///
    /// While a forced validation is in effect every field reports touched.
    pub fn is_touched(&self, path: impl Into<FieldPath>) -> bool {
        if self.force {
            return true;
        }
        let path = path.into();
        self.state
            .lookup(&path)
            .is_some_and(|(state, last)| state.is_touched(last))
    }

    /// True when no error-severity message is counted anywhere in the tree.
    pub fn is_valid(&self) -> bool {
        self.state.errors.is_valid()
    }
}
