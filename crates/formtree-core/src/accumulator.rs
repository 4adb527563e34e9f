//! # Error Sets and the Validation Accumulator
//!
//! Every form state carries an [`ErrorSet`]: errors attached to individual
//! fields, errors attached to the form as a whole, and per-severity counts.
//! The counts include everything reachable from the node, so a parent can
//! tell whether any descendant is invalid without walking the tree.
//!
//! An [`ErrorSet`] is built by an [`ErrorAccumulator`]. The accumulator is
//! created fresh for one validation pass, mutated by the rules that run in
//! that pass, and consumed by [`ErrorAccumulator::finish`].
//!
//! ## Merge Semantics
//!
//! [`ErrorSet::merge`] combines two finished sets:
//!
//! - `fields`: key-wise union; on a key conflict the right-hand list
//!   replaces the left-hand one (lists are not concatenated).
//! - `form`: left-hand entries followed by right-hand entries.
//! - `counts`: severity-wise sum.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ─── Severity ────────────────────────────────────────────────────────

/// The kind of a validation message.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocking: the form is invalid.
    #[default]
    Error,
    /// Advisory: counted, but never makes the form invalid.
    Warning,
}

impl Severity {
    /// Lowercase name used in serialized counts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Entries ─────────────────────────────────────────────────────────

/// A single validation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Severity of the message. Serialized as `type`.
    #[serde(rename = "type")]
    pub severity: Severity,
    /// Human-readable message. May be empty.
    pub message: String,
}

impl ErrorEntry {
    /// Create an entry.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

// ─── ErrorSet ────────────────────────────────────────────────────────

/// The finished, immutable error collection of one form node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSet {
    /// Field-scoped messages in the order they were added.
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<ErrorEntry>>,
    /// Form-scoped messages in the order they were added.
    #[serde(default)]
    pub form: Vec<ErrorEntry>,
    /// Number of messages per severity, including all descendants.
    #[serde(default)]
    pub counts: BTreeMap<Severity, usize>,
}

impl ErrorSet {
    /// An empty error set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Combine two error sets.
    ///
    /// See the module documentation for the exact semantics; in short,
    /// field lists from `b` overwrite those from `a`, form lists are
    /// concatenated and counts are summed.
    pub fn merge(a: &ErrorSet, b: &ErrorSet) -> ErrorSet {
        let mut acc = ErrorAccumulator::from_set(a.clone());
        acc.merge_in(b);
        acc.finish()
    }

    /// Count for one severity; zero when absent.
    pub fn count(&self, severity: Severity) -> usize {
        self.counts.get(&severity).copied().unwrap_or(0)
    }

    /// Messages recorded against `field`.
    pub fn errors_for(&self, field: &str) -> &[ErrorEntry] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when no message of any severity is counted.
    pub fn is_empty(&self) -> bool {
        self.counts.values().all(|&n| n == 0)
    }

    /// True when no error-severity message is counted. Warnings are ignored.
    pub fn is_valid(&self) -> bool {
        self.count(Severity::Error) == 0
    }
}

// ─── ErrorAccumulator ────────────────────────────────────────────────

/// Builder for an [`ErrorSet`], scoped to a single validation pass.
#[derive(Debug, Default)]
pub struct ErrorAccumulator {
    errors: ErrorSet,
}

impl ErrorAccumulator {
    /// Start an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue accumulating on top of an existing set.
    pub fn from_set(errors: ErrorSet) -> Self {
        Self { errors }
    }

    /// Add a message to a field.
    pub fn add_field_error(
        &mut self,
        field: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) {
        self.errors
            .fields
            .entry(field.into())
            .or_default()
            .push(ErrorEntry::new(severity, message));
        self.add_count(severity, 1);
    }

    /// Add a message to the form as a whole.
    pub fn add_form_error(&mut self, message: impl Into<String>, severity: Severity) {
        self.errors.form.push(ErrorEntry::new(severity, message));
        self.add_count(severity, 1);
    }

    /// Add `n` to the count of `severity` without recording a message.
    ///
    /// Used to roll descendant counts up into a parent.
    pub fn add_count(&mut self, severity: Severity, n: usize) {
        if n == 0 {
            return;
        }
        *self.errors.counts.entry(severity).or_insert(0) += n;
    }

    /// Add every count from `counts`.
    pub fn add_counts(&mut self, counts: &BTreeMap<Severity, usize>) {
        for (&severity, &n) in counts {
            self.add_count(severity, n);
        }
    }

    /// Merge a finished set into this accumulator with [`ErrorSet::merge`] semantics.
    pub fn merge_in(&mut self, other: &ErrorSet) {
        for (field, entries) in &other.fields {
            self.errors.fields.insert(field.clone(), entries.clone());
        }
        self.errors.form.extend(other.form.iter().cloned());
        self.add_counts(&other.counts);
    }

    /// Read access to what has been accumulated so far.
    pub fn current(&self) -> &ErrorSet {
        &self.errors
    }

    /// Consume the accumulator and return the finished set.
    pub fn finish(self) -> ErrorSet {
        self.errors
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn severity() -> impl Strategy<Value = Severity> {
        prop_oneof![Just(Severity::Error), Just(Severity::Warning)]
    }

    fn error_set() -> impl Strategy<Value = ErrorSet> {
        (
            prop::collection::vec(("[a-c]", "[a-z]{0,4}", severity()), 0..6),
            prop::collection::vec(("[a-z]{0,4}", severity()), 0..4),
        )
            .prop_map(|(fields, form)| {
                let mut acc = ErrorAccumulator::new();
                for (field, message, severity) in fields {
                    acc.add_field_error(field, message, severity);
                }
                for (message, severity) in form {
                    acc.add_form_error(message, severity);
                }
                acc.finish()
            })
    }

    proptest! {
        /// Counts are a severity-wise sum, so merging is associative on counts.
        #[test]
        fn merge_counts_associative(a in error_set(), b in error_set(), c in error_set()) {
            let left = ErrorSet::merge(&ErrorSet::merge(&a, &b), &c);
            let right = ErrorSet::merge(&a, &ErrorSet::merge(&b, &c));
            prop_assert_eq!(left.counts, right.counts);
        }

        /// Form lists are concatenated in argument order.
        #[test]
        fn merge_form_concatenates(a in error_set(), b in error_set()) {
            let merged = ErrorSet::merge(&a, &b);
            let mut expected = a.form.clone();
            expected.extend(b.form.iter().cloned());
            prop_assert_eq!(merged.form, expected);
        }

        /// Counts always equal the sum of both inputs.
        #[test]
        fn merge_counts_sum(a in error_set(), b in error_set()) {
            let merged = ErrorSet::merge(&a, &b);
            for severity in [Severity::Error, Severity::Warning] {
                prop_assert_eq!(merged.count(severity), a.count(severity) + b.count(severity));
            }
        }
    }
}
