//! # Descriptor Validation
//!
//! Descriptor documents are checked against the embedded
//! `form-descriptor.schema.json` (Draft 2020-12) before they are
//! deserialized. A failing document is rejected with every violation,
//! each carrying its instance path and schema path.
//!
//! YAML documents are deserialized straight into JSON values; descriptors
//! only use the JSON-compatible subset of YAML.

use std::fmt;

use jsonschema::Validator;
use serde_json::Value;

use crate::descriptor::DescriptorError;

/// Filename of the embedded descriptor schema.
pub const DESCRIPTOR_SCHEMA_NAME: &str = "form-descriptor.schema.json";

/// The descriptor schema source.
pub const DESCRIPTOR_SCHEMA: &str = include_str!("../schemas/form-descriptor.schema.json");

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer to the violating value in the document.
    pub instance_path: String,
    /// JSON Pointer to the schema keyword that failed.
    pub schema_path: String,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// All violations found in one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations {
    violations: Vec<Violation>,
}

impl Violations {
    /// Number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// True when there are none.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// The violations in reporting order.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// Compiled validator for descriptor documents.
pub struct DescriptorValidator {
    validator: Validator,
}

impl fmt::Debug for DescriptorValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorValidator")
            .field("schema", &DESCRIPTOR_SCHEMA_NAME)
            .finish()
    }
}

impl DescriptorValidator {
    /// Compile the embedded descriptor schema.
    ///
    /// Fails only if the embedded schema itself is broken.
    pub fn new() -> Result<Self, DescriptorError> {
        let schema: Value =
            serde_json::from_str(DESCRIPTOR_SCHEMA).map_err(|e| DescriptorError::ValidatorBuild {
                reason: format!("schema is not valid JSON: {e}"),
            })?;
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft202012);
        let validator = opts.build(&schema).map_err(|e| DescriptorError::ValidatorBuild {
            reason: e.to_string(),
        })?;
        Ok(Self { validator })
    }

    /// Check a document, collecting every violation.
    pub fn validate(&self, instance: &Value) -> Result<(), Violations> {
        let violations: Vec<Violation> = self
            .validator
            .iter_errors(instance)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(Violations { violations })
        }
    }
}
