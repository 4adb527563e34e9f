//! # Form Descriptors
//!
//! A descriptor document declares named forms:
//!
//! ```yaml
//! forms:
//!   Person:
//!     fields:
//!       name: [required]
//!   Movie:
//!     fields:
//!       title: [{required: "Title please"}]
//!       note: [{empty_warning: "Consider a note"}]
//!     nested:
//!       director: Person      # child form under `director`
//!       actors: [Person]      # list of Person under `actors`
//!     inline:
//!       address: Address      # child sharing Movie's namespace
//!     multi: [Rating]         # overlay on the same values
//!     allow: [title, year]
//!   Cast:
//!     list_of: Person         # the form itself is a list
//! ```
//!
//! Loading validates the document against `form-descriptor.schema.json`,
//! deserializes it, and checks the reference graph: every referenced form
//! must exist and no form may reach itself. [`DescriptorSet::build`] then
//! resolves a name into an [`Arc<FormSchema>`]; forms referenced more than
//! once within one build share a single schema.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use formtree_state::{empty_warning, required, FormSchema, FormSchemaBuilder, MissingValue};

use crate::validate::{DescriptorValidator, Violations, DESCRIPTOR_SCHEMA_NAME};

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised while loading or building descriptors.
#[derive(Error, Debug)]
pub enum DescriptorError {
    /// The document could not be read or parsed.
    #[error("cannot load descriptors from '{source_name}': {reason}")]
    Load {
        /// File path or a label for in-memory input.
        source_name: String,
        /// Why loading failed.
        reason: String,
    },

    /// The document does not conform to the descriptor schema.
    #[error("descriptors in '{source_name}' violate {schema}:\n{violations}")]
    Invalid {
        /// File path or a label for in-memory input.
        source_name: String,
        /// Schema filename.
        schema: &'static str,
        /// Every violation found.
        violations: Violations,
    },

    /// A form references a form that is not declared.
    #[error("form '{referenced_by}' references unknown form '{name}'")]
    UnknownReference {
        /// The missing form.
        name: String,
        /// The form holding the reference.
        referenced_by: String,
    },

    /// A requested form is not declared.
    #[error("unknown form '{name}'")]
    UnknownForm {
        /// The requested name.
        name: String,
    },

    /// Forms reference each other in a loop.
    #[error("form reference cycle: {}", .chain.join(" -> "))]
    Cycle {
        /// The loop, starting and ending with the same form.
        chain: Vec<String>,
    },

    /// The embedded descriptor schema could not be compiled.
    #[error("validator build error for form-descriptor.schema.json: {reason}")]
    ValidatorBuild {
        /// Reason reported by the validator.
        reason: String,
    },
}

// ─── Document types ──────────────────────────────────────────────────

/// Built-in rule names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// [`formtree_state::required`].
    Required,
    /// [`formtree_state::empty_warning`].
    EmptyWarning,
}

impl RuleKind {
    /// The rule, with an optional message override.
    pub fn to_rule(self, message: Option<&str>) -> MissingValue {
        let rule = match self {
            Self::Required => required(),
            Self::EmptyWarning => empty_warning(),
        };
        match message {
            Some(message) => rule.with_message(message),
            None => rule,
        }
    }
}

/// One entry of a field's rule list: `required` or `{required: "msg"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleDescriptor {
    /// The rule with its default message.
    Bare(RuleKind),
    /// The rule with a custom message.
    WithMessage(BTreeMap<RuleKind, String>),
}

impl RuleDescriptor {
    /// The rules this entry stands for.
    pub fn rules(&self) -> Vec<MissingValue> {
        match self {
            Self::Bare(kind) => vec![kind.to_rule(None)],
            Self::WithMessage(map) => map
                .iter()
                .map(|(kind, message)| kind.to_rule(Some(message)))
                .collect(),
        }
    }
}

/// A nested child reference: `Person`, or `[Person]` for a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NestedRef {
    /// A single child form.
    One(String),
    /// A list of child forms.
    List([String; 1]),
}

impl NestedRef {
    /// The referenced form name.
    pub fn target(&self) -> &str {
        match self {
            Self::One(name) => name,
            Self::List([name]) => name,
        }
    }
}

/// One declared form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormDescriptor {
    /// Rules per field, applied in order.
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<RuleDescriptor>>,
    /// Child forms stored under their own key.
    #[serde(default)]
    pub nested: BTreeMap<String, NestedRef>,
    /// Child forms sharing this form's namespace.
    #[serde(default)]
    pub inline: BTreeMap<String, String>,
    /// Makes this form a list of the named form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_of: Option<String>,
    /// Overlay forms.
    #[serde(default)]
    pub multi: Vec<String>,
    /// Allow-list of raw fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow: Option<Vec<String>>,
}

impl FormDescriptor {
    /// Every form name this form references, in declaration order.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.list_of
            .as_deref()
            .into_iter()
            .chain(self.nested.values().map(NestedRef::target))
            .chain(self.inline.values().map(String::as_str))
            .chain(self.multi.iter().map(String::as_str))
    }
}

/// A whole descriptor document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DescriptorDocument {
    /// Forms by name.
    pub forms: BTreeMap<String, FormDescriptor>,
}

// ─── DescriptorSet ───────────────────────────────────────────────────

/// A validated descriptor document, ready to build schemas from.
#[derive(Debug, Clone)]
pub struct DescriptorSet {
    source_name: String,
    document: DescriptorDocument,
}

impl DescriptorSet {
    /// Load descriptors from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self, DescriptorError> {
        Self::parse_yaml(content, "<yaml>")
    }

    /// Load descriptors from JSON text.
    pub fn from_json_str(content: &str) -> Result<Self, DescriptorError> {
        Self::parse_json(content, "<json>")
    }

    /// Load descriptors from a file. `.yaml` and `.yml` files are read as
    /// YAML, anything else as JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DescriptorError> {
        let path = path.as_ref();
        let source_name = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| DescriptorError::Load {
            source_name: source_name.clone(),
            reason: format!("cannot read file: {e}"),
        })?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "yaml" | "yml" => Self::parse_yaml(&content, &source_name),
            _ => Self::parse_json(&content, &source_name),
        }
    }

    /// Load descriptors from an already-parsed JSON value.
    pub fn from_value(value: Value, source_name: &str) -> Result<Self, DescriptorError> {
        let validator = DescriptorValidator::new()?;
        validator
            .validate(&value)
            .map_err(|violations| DescriptorError::Invalid {
                source_name: source_name.to_string(),
                schema: DESCRIPTOR_SCHEMA_NAME,
                violations,
            })?;

        let document: DescriptorDocument =
            serde_json::from_value(value).map_err(|e| DescriptorError::Load {
                source_name: source_name.to_string(),
                reason: format!("invalid descriptor: {e}"),
            })?;

        check_references(&document)?;
        check_cycles(&document)?;

        info!(
            source = source_name,
            forms = document.forms.len(),
            "loaded form descriptors"
        );
        Ok(Self {
            source_name: source_name.to_string(),
            document,
        })
    }

    fn parse_yaml(content: &str, source_name: &str) -> Result<Self, DescriptorError> {
        let value: Value = serde_yaml::from_str(content).map_err(|e| DescriptorError::Load {
            source_name: source_name.to_string(),
            reason: format!("invalid YAML: {e}"),
        })?;
        Self::from_value(value, source_name)
    }

    fn parse_json(content: &str, source_name: &str) -> Result<Self, DescriptorError> {
        let value: Value = serde_json::from_str(content).map_err(|e| DescriptorError::Load {
            source_name: source_name.to_string(),
            reason: format!("invalid JSON: {e}"),
        })?;
        Self::from_value(value, source_name)
    }

    /// Where the descriptors came from.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// The parsed document.
    pub fn document(&self) -> &DescriptorDocument {
        &self.document
    }

    /// Declared form names, sorted.
    pub fn form_names(&self) -> Vec<&str> {
        self.document.forms.keys().map(String::as_str).collect()
    }

    /// The descriptor of one form.
    pub fn descriptor(&self, name: &str) -> Option<&FormDescriptor> {
        self.document.forms.get(name)
    }

    /// Number of declared forms.
    pub fn len(&self) -> usize {
        self.document.forms.len()
    }

    /// True when no forms are declared.
    pub fn is_empty(&self) -> bool {
        self.document.forms.is_empty()
    }

    /// Build the schema of one form.
    pub fn build(&self, name: &str) -> Result<Arc<FormSchema>, DescriptorError> {
        let mut built = BTreeMap::new();
        self.build_form(name, &mut built)
    }

    /// Build every declared form, sharing schemas between references.
    pub fn build_all(&self) -> Result<BTreeMap<String, Arc<FormSchema>>, DescriptorError> {
        let mut built = BTreeMap::new();
        for name in self.document.forms.keys() {
            self.build_form(name, &mut built)?;
        }
        built.retain(|name, _| self.document.forms.contains_key(name));
        Ok(built)
    }

    fn build_form(
        &self,
        name: &str,
        built: &mut BTreeMap<String, Arc<FormSchema>>,
    ) -> Result<Arc<FormSchema>, DescriptorError> {
        if let Some(schema) = built.get(name) {
            return Ok(Arc::clone(schema));
        }
        let form = self
            .document
            .forms
            .get(name)
            .ok_or_else(|| DescriptorError::UnknownForm {
                name: name.to_string(),
            })?;

        let schema = match &form.list_of {
            Some(child) => {
                let child = self.build_form(child, built)?;
                let builder = FormSchema::list_builder(name, child);
                self.finish(builder, form, built)?
            }
            None => {
                let mut builder = FormSchema::builder(name);
                for (field, nested) in &form.nested {
                    let child = match nested {
                        NestedRef::One(target) => self.build_form(target, built)?,
                        NestedRef::List([target]) => self.build_list(target, built)?,
                    };
                    builder = builder.nested(field.as_str(), child);
                }
                for (field, target) in &form.inline {
                    builder = builder.inline(field.as_str(), self.build_form(target, built)?);
                }
                if let Some(allow) = &form.allow {
                    builder = builder.allow(allow.iter().cloned());
                }
                self.finish(builder, form, built)?
            }
        };

        debug!(form = name, composition = ?schema.composition(), "built form schema");
        built.insert(name.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    fn build_list(
        &self,
        target: &str,
        built: &mut BTreeMap<String, Arc<FormSchema>>,
    ) -> Result<Arc<FormSchema>, DescriptorError> {
        let list_name = format!("{target}[]");
        if let Some(schema) = built.get(&list_name) {
            return Ok(Arc::clone(schema));
        }
        let child = self.build_form(target, built)?;
        let schema = FormSchema::list_builder(list_name.as_str(), child).build();
        built.insert(list_name, Arc::clone(&schema));
        Ok(schema)
    }

    fn finish<S>(
        &self,
        mut builder: FormSchemaBuilder<S>,
        form: &FormDescriptor,
        built: &mut BTreeMap<String, Arc<FormSchema>>,
    ) -> Result<Arc<FormSchema>, DescriptorError> {
        for (field, entries) in &form.fields {
            for entry in entries {
                for rule in entry.rules() {
                    builder = builder.rule(field.as_str(), rule);
                }
            }
        }
        for overlay in &form.multi {
            builder = builder.multi(self.build_form(overlay, built)?);
        }
        Ok(builder.build())
    }
}

// ─── Reference graph checks ──────────────────────────────────────────

fn check_references(document: &DescriptorDocument) -> Result<(), DescriptorError> {
    for (name, form) in &document.forms {
        for target in form.references() {
            if !document.forms.contains_key(target) {
                return Err(DescriptorError::UnknownReference {
                    name: target.to_string(),
                    referenced_by: name.clone(),
                });
            }
        }
    }
    Ok(())
}

fn check_cycles(document: &DescriptorDocument) -> Result<(), DescriptorError> {
    let mut done = BTreeSet::new();
    for name in document.forms.keys() {
        let mut stack = Vec::new();
        visit(document, name, &mut stack, &mut done)?;
    }
    Ok(())
}

fn visit<'a>(
    document: &'a DescriptorDocument,
    name: &'a str,
    stack: &mut Vec<&'a str>,
    done: &mut BTreeSet<&'a str>,
) -> Result<(), DescriptorError> {
    if done.contains(name) {
        return Ok(());
    }
    if let Some(start) = stack.iter().position(|n| *n == name) {
        let mut chain: Vec<String> = stack[start..].iter().map(|n| n.to_string()).collect();
        chain.push(name.to_string());
        return Err(DescriptorError::Cycle { chain });
    }
    let Some(form) = document.forms.get(name) else {
        return Ok(());
    };
    stack.push(name);
    for target in form.references() {
        visit(document, target, stack, done)?;
    }
    stack.pop();
    done.insert(name);
    Ok(())
}
