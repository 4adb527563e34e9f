//! # formtree-core — Foundational Types for formtree
//!
//! This crate is the leaf of the formtree workspace. It defines the value
//! types shared by the form-state engine (`formtree-state`) and the
//! descriptor loader (`formtree-schema`); it depends on nothing internal.
//!
//! ## Contents
//!
//! 1. **Severities and error sets.** [`Severity`], [`ErrorEntry`] and the
//!    immutable [`ErrorSet`] carried by every form state, plus the scoped
//!    [`ErrorAccumulator`] builder that one validation pass fills in.
//!
//! 2. **Field paths.** [`FieldPath`] parses dotted addresses such as
//!    `actors.0.name` into segments for lookup and path-addressed updates.
//!
//! 3. **Value predicates.** [`is_nil`] and [`is_truthy`] define what "empty"
//!    and "set" mean for raw JSON form values.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `formtree-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod accumulator;
pub mod error;
pub mod path;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use accumulator::{ErrorAccumulator, ErrorEntry, ErrorSet, Severity};
pub use error::FormError;
pub use path::FieldPath;
pub use value::{is_nil, is_truthy};
