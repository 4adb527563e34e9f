//! # formtree-schema — Declarative Form Descriptors
//!
//! Loads named form declarations from YAML or JSON and resolves them into
//! the shared [`FormSchema`](formtree_state::FormSchema) trees that
//! `formtree-state` instantiates.
//!
//! ## Validation (`validate`)
//!
//! Every document is checked against the embedded
//! `schemas/form-descriptor.schema.json` before deserialization. Violations
//! are reported together, each with its instance path.
//!
//! ## Descriptors (`descriptor`)
//!
//! [`DescriptorSet`] holds a validated document whose reference graph has
//! been checked: unknown references and reference cycles are rejected at
//! load time. [`DescriptorSet::build`] resolves one form; rules are the
//! built-in `required` and `empty_warning` checks with optional messages.
//!
//! ## Crate Policy
//!
//! - Descriptors configure structure and built-in rules only. Custom rules
//!   and hooks are attached in code with the `FormSchema` builder.
//! - Loading is a trust boundary: a document that fails the schema is never
//!   partially applied.

pub mod descriptor;
pub mod validate;

pub use descriptor::{
    DescriptorDocument, DescriptorError, DescriptorSet, FormDescriptor, NestedRef, RuleDescriptor,
    RuleKind,
};
pub use validate::{DescriptorValidator, Violation, Violations, DESCRIPTOR_SCHEMA, DESCRIPTOR_SCHEMA_NAME};
