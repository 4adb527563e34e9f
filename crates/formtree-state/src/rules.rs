//! # Validation Rules
//!
//! A field rule inspects one field of a [`FormNode`] and records messages in
//! the pass's [`ErrorAccumulator`]. A form rule inspects the node as a whole
//! and usually records form-scoped messages, e.g. cross-field consistency
//! checks that read a sibling through a dotted path.
//!
//! Both traits are implemented for closures of the matching shape, so user
//! rules are usually plain closures. Rules never fail: invalid input is
//! reported through the accumulator.
//!
//! Two built-in field rules check for nil values (missing, `null`, `""`):
//!
//! | Rule              | Severity  | Default message            |
//! |-------------------|-----------|----------------------------|
//! | [`required`]      | `error`   | [`REQUIRED_MESSAGE`]       |
//! | [`empty_warning`] | `warning` | none (empty message)       |

use std::fmt;
use std::sync::Arc;

use formtree_core::{ErrorAccumulator, Severity};

use crate::node::FormNode;

/// Default message of [`required`].
pub const REQUIRED_MESSAGE: &str = "This field is required.";

// ─── Traits ──────────────────────────────────────────────────────────

/// A validator for one field.
pub trait FieldRule: Send + Sync {
    /// Check `field` on `node`, recording failures in `errors`.
    fn check(&self, errors: &mut ErrorAccumulator, field: &str, node: &FormNode);
}

impl<F> FieldRule for F
where
    F: Fn(&mut ErrorAccumulator, &str, &FormNode) + Send + Sync,
{
    fn check(&self, errors: &mut ErrorAccumulator, field: &str, node: &FormNode) {
        self(errors, field, node)
    }
}

/// A whole-form validator.
pub trait FormRule: Send + Sync {
    /// Check `node`, recording failures in `errors`.
    fn check(&self, errors: &mut ErrorAccumulator, node: &FormNode);
}

impl<F> FormRule for F
where
    F: Fn(&mut ErrorAccumulator, &FormNode) + Send + Sync,
{
    fn check(&self, errors: &mut ErrorAccumulator, node: &FormNode) {
        self(errors, node)
    }
}

// ─── Messages ────────────────────────────────────────────────────────

type MessageFn = dyn Fn(&str, &FormNode) -> String + Send + Sync;

/// A rule's message: literal text, or computed from the field name and node.
///
/// Dynamic messages are only evaluated when the rule fails.
#[derive(Clone)]
pub enum Message {
    /// Literal text.
    Text(String),
    /// Computed on failure.
    Dynamic(Arc<MessageFn>),
}

impl Message {
    /// A message computed from the failing field and its node.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&str, &FormNode) -> String + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(f))
    }

    /// Produce the message text.
    pub fn render(&self, field: &str, node: &FormNode) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Dynamic(f) => f(field, node),
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

// ─── Built-in nil checks ─────────────────────────────────────────────

/// Field rule recording a message when the field is nil.
///
/// Built by [`required`] or [`empty_warning`].
#[derive(Debug, Clone)]
pub struct MissingValue {
    severity: Severity,
    message: Option<Message>,
    default_message: &'static str,
}

impl MissingValue {
    /// Replace the message. An empty message keeps the default.
    pub fn with_message(mut self, message: impl Into<Message>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Severity recorded on failure.
    pub fn severity(&self) -> Severity {
        self.severity
    }
}

impl FieldRule for MissingValue {
    fn check(&self, errors: &mut ErrorAccumulator, field: &str, node: &FormNode) {
        let missing = node.get_value(field).map_or(true, |v| v.is_nil());
        if !missing {
            return;
        }
        let message = self
            .message
            .as_ref()
            .map(|message| message.render(field, node))
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| self.default_message.to_string());
        errors.add_field_error(field, message, self.severity);
    }
}

/// The field must not be nil; records an `error`.
pub fn required() -> MissingValue {
    MissingValue {
        severity: Severity::Error,
        message: None,
        default_message: REQUIRED_MESSAGE,
    }
}

/// The field should not be nil; records a `warning`.
///
/// Without [`MissingValue::with_message`] the warning's message is empty.
pub fn empty_warning() -> MissingValue {
    MissingValue {
        severity: Severity::Warning,
        message: None,
        default_message: "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FormSchema;
    use formtree_core::ErrorEntry;
    use serde_json::json;

    fn node_with(raw: serde_json::Value) -> FormNode {
        let mut node = FormNode::new(FormSchema::builder("Plain").build());
        node.parse(&raw, false);
        node
    }

    #[test]
    fn test_required_passes_when_value_present() {
        let node = node_with(json!({"f0": "v0"}));
        let mut errors = ErrorAccumulator::new();
        required().with_message("m0").check(&mut errors, "f0", &node);
        assert!(errors.finish().fields.get("f0").is_none());
    }

    #[test]
    fn test_required_uses_provided_message() {
        let node = node_with(json!({}));
        let mut errors = ErrorAccumulator::new();
        required().with_message("m0").check(&mut errors, "f0", &node);
        assert_eq!(
            errors.finish().errors_for("f0"),
            &[ErrorEntry::new(Severity::Error, "m0")]
        );
    }

    #[test]
    fn test_required_calls_function_for_message() {
        let node = node_with(json!({"f0": ""}));
        let mut errors = ErrorAccumulator::new();
        required()
            .with_message(Message::dynamic(|field, _node| format!("{field} is missing")))
            .check(&mut errors, "f0", &node);
        assert_eq!(
            errors.finish().errors_for("f0"),
            &[ErrorEntry::new(Severity::Error, "f0 is missing")]
        );
    }

    #[test]
    fn test_required_uses_default_message() {
        let node = node_with(json!({"f0": null}));
        let mut errors = ErrorAccumulator::new();
        required().check(&mut errors, "f0", &node);
        assert_eq!(
            errors.finish().errors_for("f0"),
            &[ErrorEntry::new(Severity::Error, REQUIRED_MESSAGE)]
        );
    }

    #[test]
    fn test_required_empty_message_falls_back_to_default() {
        let node = node_with(json!({}));
        let mut errors = ErrorAccumulator::new();
        required().with_message("").check(&mut errors, "f0", &node);
        assert_eq!(
            errors.finish().errors_for("f0"),
            &[ErrorEntry::new(Severity::Error, REQUIRED_MESSAGE)]
        );
    }

    #[test]
    fn test_required_accepts_falsy_non_nil_values() {
        let node = node_with(json!({"zero": 0, "no": false}));
        let mut errors = ErrorAccumulator::new();
        required().check(&mut errors, "zero", &node);
        required().check(&mut errors, "no", &node);
        assert!(errors.finish().is_empty());
    }

    #[test]
    fn test_empty_warning_passes_when_value_present() {
        let node = node_with(json!({"f0": "v0"}));
        let mut errors = ErrorAccumulator::new();
        empty_warning().with_message("m0").check(&mut errors, "f0", &node);
        assert!(errors.finish().is_empty());
    }

    #[test]
    fn test_empty_warning_uses_provided_message() {
        let node = node_with(json!({}));
        let mut errors = ErrorAccumulator::new();
        empty_warning().with_message("m0").check(&mut errors, "f0", &node);
        assert_eq!(
            errors.finish().errors_for("f0"),
            &[ErrorEntry::new(Severity::Warning, "m0")]
        );
    }

    #[test]
    fn test_empty_warning_without_message_is_empty() {
        let node = node_with(json!({}));
        let mut errors = ErrorAccumulator::new();
        empty_warning().check(&mut errors, "f0", &node);
        let errors = errors.finish();
        assert_eq!(errors.errors_for("f0"), &[ErrorEntry::new(Severity::Warning, "")]);
        assert_eq!(errors.count(Severity::Warning), 1);
    }

    #[test]
    fn test_closure_is_a_field_rule() {
        let rule = |errors: &mut ErrorAccumulator, field: &str, node: &FormNode| {
            if node.get_value(field).and_then(|v| v.as_scalar()) == Some(&json!("bad")) {
                errors.add_field_error(field, "bad value", Severity::Error);
            }
        };
        let node = node_with(json!({"f0": "bad"}));
        let mut errors = ErrorAccumulator::new();
        FieldRule::check(&rule, &mut errors, "f0", &node);
        assert_eq!(errors.finish().count(Severity::Error), 1);
    }
}
