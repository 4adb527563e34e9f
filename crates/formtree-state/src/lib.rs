//! # formtree-state — Recursive Immutable Form State
//!
//! A form is described by a [`FormSchema`] and instantiated as a
//! [`FormNode`], which holds one [`FormState`] tree:
//!
//! ```text
//! raw JSON ──parse──▶ FormState { values, touched, errors, initial, flat }
//!                          │
//!      update_value / update_in ──▶ new FormState (re-validated, re-flattened)
//! ```
//!
//! ## Modules
//!
//! - **Schemas** (`schema.rs`): field and form validators, tagged
//!   composition (leaf, keyed children, homogeneous list), `multi` overlays,
//!   allow-lists, and initial/render/parse-values hooks. Typestate builder.
//!
//! - **States** (`state.rs`): the serializable state tree and path lookup.
//!
//! - **Nodes** (`node.rs`): parse and the touched-gated validation cascade
//!   with error roll-up.
//!
//! - **Updates** (`update.rs`): tagged single-field updates, overlay merges,
//!   and path-addressed nested updates.
//!
//! - **Rules** (`rules.rs`): rule traits and the `required` /
//!   `empty_warning` nil checks.
//!
//! - **Flat views** (`render.rs`): the denormalized projection of values.
//!
//! - **Wizards** (`wizard.rs`): page navigation gated on validation.
//!
//! ## Example
//!
//! ```
//! use formtree_state::{required, FormNode, FormSchema, Severity, Update};
//! use serde_json::json;
//!
//! let schema = FormSchema::builder("Required").rule("f0", required()).build();
//! let mut node = FormNode::new(schema);
//! node.parse(&json!({"f0": "v0"}), false);
//! node.update_value(Update::set("f0", json!(""))).unwrap();
//! assert_eq!(node.errors().count(Severity::Error), 1);
//! ```

pub mod node;
pub mod render;
pub mod rules;
pub mod schema;
pub mod state;
pub mod update;
pub mod wizard;

// ─── Engine re-exports ──────────────────────────────────────────────

pub use node::FormNode;
pub use schema::{Composition, FormSchema, FormSchemaBuilder, ListShape, ObjectShape};
pub use state::{FieldValue, FormState, ValueRef, Values};
pub use update::{FieldKey, OverlayPatch, Update};

// ─── Rule re-exports ────────────────────────────────────────────────

pub use rules::{empty_warning, required, FieldRule, FormRule, Message, MissingValue, REQUIRED_MESSAGE};

// ─── Wizard re-exports ──────────────────────────────────────────────

pub use wizard::{PageOutcome, Wizard, WizardError};

// ─── Core re-exports ────────────────────────────────────────────────

pub use formtree_core::{ErrorAccumulator, ErrorEntry, ErrorSet, FieldPath, FormError, Severity};
