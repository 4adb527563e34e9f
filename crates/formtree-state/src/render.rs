//! # Flat Views
//!
//! `flat` is the denormalized projection of a node's values that hosts use
//! for simple key/value access:
//!
//! - list nodes render to an array of their elements' flat views;
//! - object nodes copy their (allow-listed) raw fields and fold in each
//!   child's flat view, by default under the child's own key.
//!
//! A schema's render hook replaces the default fold for one field. The
//! [`spread`] hook, paired with the [`pass_through`] initial hook, makes a
//! sub-form share its parent's namespace (see `FormSchemaBuilder::inline`).

use serde_json::{Map, Value};

use crate::schema::FormSchema;
use crate::state::{FieldValue, Values};

/// Compute the flat view of `values` under `schema`.
pub fn flatten(schema: &FormSchema, values: &Values) -> Value {
    match values {
        Values::List(items) => Value::Array(items.iter().map(|item| item.flat.clone()).collect()),
        Values::Object(map) => {
            let mut flat = Map::new();
            for (field, value) in map {
                if let FieldValue::Scalar(raw) = value {
                    if schema.allows(field) {
                        flat.insert(field.clone(), raw.clone());
                    }
                }
            }
            for (field, value) in map {
                if let FieldValue::Node(child) = value {
                    match schema.render_hook(field) {
                        Some(hook) => hook(&mut flat, field, &child.flat),
                        None => {
                            flat.insert(field.clone(), child.flat.clone());
                        }
                    }
                }
            }
            Value::Object(flat)
        }
    }
}

/// Initial hook handing the parent's whole raw input to the child.
pub fn pass_through(raw: &Value) -> Value {
    raw.clone()
}

/// Render hook spreading a child's flat mapping into the parent's.
///
/// A non-object child view is stored under `field` instead.
pub fn spread(flat: &mut Map<String, Value>, field: &str, child: &Value) {
    match child {
        Value::Object(entries) => {
            for (k, v) in entries {
                flat.insert(k.clone(), v.clone());
            }
        }
        other => {
            flat.insert(field.to_string(), other.clone());
        }
    }
}
