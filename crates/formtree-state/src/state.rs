//! # Form State Trees
//!
//! A [`FormState`] is the persistent value produced and consumed by a
//! [`FormNode`](crate::FormNode). It is never mutated in place by the
//! engine's public operations: each parse or update yields a replacement.
//!
//! ## Shape
//!
//! ```text
//! FormState
//! ├── values   Values::Object { field → Scalar(json) | Node(FormState) }
//! │            Values::List   [FormState, ...]
//! ├── touched  { field → bool }
//! ├── errors   ErrorSet { fields, form, counts }
//! ├── initial  raw input of the last parse
//! └── flat     denormalized JSON projection of values
//! ```
//!
//! Serialized with serde, a state is the JSON object
//! `{values, touched, errors, initial, flat}`; nested states appear inline
//! where their field lives.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use formtree_core::{is_nil, is_truthy, ErrorSet, FieldPath};

// ─── Field values ────────────────────────────────────────────────────

/// The value held by one field of an object-shaped state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A nested child state (object or list composition).
    Node(FormState),
    /// A plain raw value.
    Scalar(Value),
}

impl FieldValue {
    /// Borrow as a [`ValueRef`].
    pub fn as_value_ref(&self) -> ValueRef<'_> {
        match self {
            Self::Node(state) => ValueRef::Node(state),
            Self::Scalar(value) => ValueRef::Scalar(value),
        }
    }

    /// The scalar, if this is not a nested state.
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Node(_) => None,
        }
    }

    /// The nested state, if any.
    pub fn as_node(&self) -> Option<&FormState> {
        match self {
            Self::Node(state) => Some(state),
            Self::Scalar(_) => None,
        }
    }

    /// True for a scalar `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Value::Null))
    }

    /// Loose truthiness. Nested states are always truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Node(_) => true,
            Self::Scalar(value) => is_truthy(value),
        }
    }

    /// Whether this value differs from the recorded initial raw value.
    ///
    /// A missing initial value compares as `null`. Nested states always
    /// differ, since an initial value is raw.
    pub fn differs_from(&self, initial: Option<&Value>) -> bool {
        match self {
            Self::Node(_) => true,
            Self::Scalar(value) => value != initial.unwrap_or(&Value::Null),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        Self::Scalar(value)
    }
}

impl From<FormState> for FieldValue {
    fn from(state: FormState) -> Self {
        Self::Node(state)
    }
}

/// A borrowed view of whatever lives at a path: a raw value or a state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueRef<'a> {
    /// A raw value.
    Scalar(&'a Value),
    /// A nested state (object field or list element).
    Node(&'a FormState),
}

impl<'a> ValueRef<'a> {
    /// The raw value, if this is a scalar.
    pub fn as_scalar(&self) -> Option<&'a Value> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Node(_) => None,
        }
    }

    /// The state, if this is a nested node.
    pub fn as_node(&self) -> Option<&'a FormState> {
        match self {
            Self::Node(state) => Some(state),
            Self::Scalar(_) => None,
        }
    }

    /// Nil check: `null` and `""` are nil; nested states never are.
    pub fn is_nil(&self) -> bool {
        match self {
            Self::Scalar(value) => is_nil(Some(value)),
            Self::Node(_) => false,
        }
    }

    /// An owned JSON rendition: the scalar itself, or the node's flat view.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(value) => (*value).clone(),
            Self::Node(state) => state.flat.clone(),
        }
    }
}

// ─── Values ──────────────────────────────────────────────────────────

/// The `values` of a state: keyed fields, or an ordered list of child states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Values {
    /// List composition: one state per element.
    List(Vec<FormState>),
    /// Object composition or a leaf form.
    Object(BTreeMap<String, FieldValue>),
}

impl Default for Values {
    fn default() -> Self {
        Self::Object(BTreeMap::new())
    }
}

impl Values {
    /// Empty values of the given shape.
    pub fn empty(list: bool) -> Self {
        if list {
            Self::List(Vec::new())
        } else {
            Self::default()
        }
    }

    /// Build object values from a raw JSON object; non-objects yield `{}`.
    pub fn from_raw_object(raw: &Value) -> Self {
        let map = raw
            .as_object()
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| (k.clone(), FieldValue::Scalar(v.clone())))
                    .collect()
            })
            .unwrap_or_default();
        Self::Object(map)
    }

    /// True for list composition.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Shape name used in error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::Object(_) => "object",
        }
    }

    /// Number of fields or elements.
    pub fn len(&self) -> usize {
        match self {
            Self::List(items) => items.len(),
            Self::Object(map) => map.len(),
        }
    }

    /// True when there are no fields or elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The keyed fields, if object-shaped.
    pub fn as_object(&self) -> Option<&BTreeMap<String, FieldValue>> {
        match self {
            Self::Object(map) => Some(map),
            Self::List(_) => None,
        }
    }

    /// The child states, if list-shaped.
    pub fn as_list(&self) -> Option<&[FormState]> {
        match self {
            Self::List(items) => Some(items),
            Self::Object(_) => None,
        }
    }

    /// Look up a direct child by key or index.
    pub fn child(&self, segment: &str) -> Option<ValueRef<'_>> {
        match self {
            Self::Object(map) => map.get(segment).map(FieldValue::as_value_ref),
            Self::List(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .map(ValueRef::Node),
        }
    }

    /// Plain JSON rendition without state wrappers: scalars as-is,
    /// nested states replaced by their own `to_json`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::List(items) => Value::Array(items.iter().map(|s| s.values.to_json()).collect()),
            Self::Object(map) => {
                let obj: Map<String, Value> = map
                    .iter()
                    .map(|(k, v)| {
                        let json = match v {
                            FieldValue::Scalar(value) => value.clone(),
                            FieldValue::Node(state) => state.values.to_json(),
                        };
                        (k.clone(), json)
                    })
                    .collect();
                Value::Object(obj)
            }
        }
    }
}

// ─── FormState ───────────────────────────────────────────────────────

/// The state tree of one form node.
///
/// All keys are always populated; `initial` and `flat` default to `{}` for
/// object-shaped states and `[]` for list-shaped ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    /// Field values or list elements.
    pub values: Values,
    /// Which fields the user has interacted with.
    pub touched: BTreeMap<String, bool>,
    /// Errors of this node and, in `counts`, of all descendants.
    pub errors: ErrorSet,
    /// Raw input of the last parse.
    #[serde(default = "empty_object")]
    pub initial: Value,
    /// Denormalized projection of `values`.
    #[serde(default = "empty_object")]
    pub flat: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl Default for FormState {
    fn default() -> Self {
        Self::empty(false)
    }
}

impl FormState {
    /// An empty state of the given shape.
    pub fn empty(list: bool) -> Self {
        let blank = if list {
            Value::Array(Vec::new())
        } else {
            empty_object()
        };
        Self {
            values: Values::empty(list),
            touched: BTreeMap::new(),
            errors: ErrorSet::new(),
            initial: blank.clone(),
            flat: blank,
        }
    }

    /// Touched flag of a direct field; absent means untouched.
    pub fn is_touched(&self, field: &str) -> bool {
        self.touched.get(field).copied().unwrap_or(false)
    }

    /// The state at `path`, walking object fields and list indices.
    pub fn node_at(&self, path: &FieldPath) -> Option<&FormState> {
        let mut state = self;
        for segment in path.segments() {
            state = state.values.child(segment)?.as_node()?;
        }
        Some(state)
    }

    /// Mutable variant of [`FormState::node_at`].
    pub fn node_at_mut(&mut self, path: &FieldPath) -> Option<&mut FormState> {
        let mut state = self;
        for segment in path.segments() {
            state = match &mut state.values {
                Values::Object(map) => match map.get_mut(segment.as_str()) {
                    Some(FieldValue::Node(child)) => child,
                    _ => return None,
                },
                Values::List(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            };
        }
        Some(state)
    }

    /// Resolve `path` to its owning state and final segment.
    ///
    /// Returns `None` for the empty path or when an intermediate segment
    /// does not lead to a nested state.
    pub fn lookup<'p>(&self, path: &'p FieldPath) -> Option<(&FormState, &'p str)> {
        let (owner, last) = path.split_last()?;
        Some((self.node_at(&owner)?, last))
    }

    /// Whatever lives at `path`. The empty path yields this state itself.
    pub fn get(&self, path: &FieldPath) -> Option<ValueRef<'_>> {
        match path.split_last() {
            None => Some(ValueRef::Node(self)),
            Some((owner, last)) => self.node_at(&owner)?.values.child(last),
        }
    }
}
