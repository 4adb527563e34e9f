//! # Form Schemas
//!
//! A [`FormSchema`] declares one form shape: field validators, an optional
//! whole-form validator, how children are composed, overlay schemas, and
//! value-shaping hooks. Schemas are immutable and shared behind [`Arc`].
//!
//! ## Composition
//!
//! Composition is an explicit tagged variant fixed when the schema is built:
//!
//! - [`Composition::Leaf`]: a flat object of raw fields.
//! - [`Composition::ObjectOf`]: some fields hold child forms of other schemas.
//! - [`Composition::ListOf`]: the node is a homogeneous list of one schema.
//!
//! Independently, `multi` lists overlay schemas that share this node's value
//! namespace. Each overlay parses and validates the same values; their error
//! sets are merged into this node's.
//!
//! ## Building
//!
//! The builder is typestate-encoded: [`FormSchema::builder`] yields an
//! object-shaped builder with `nested`, `inline`, `allow` and the hook
//! methods; [`FormSchema::list_builder`] yields a list-shaped builder that
//! has none of those. A list schema with keyed children cannot be written.
//!
//! ```
//! use formtree_state::{rules::required, FormSchema};
//!
//! let person = FormSchema::builder("Person").rule("name", required()).build();
//! let people = FormSchema::list_builder("People", person.clone()).build();
//! let movie = FormSchema::builder("Movie")
//!     .rule("title", required())
//!     .nested("director", person)
//!     .nested("actors", people)
//!     .build();
//! assert!(movie.nested_schema("actors").unwrap().is_list());
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Map, Value};

use formtree_core::ErrorAccumulator;

use crate::node::FormNode;
use crate::render;
use crate::rules::{FieldRule, FormRule};
use crate::state::Values;

/// Extracts a child's raw input from the parent's whole raw input.
pub type InitialHook = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Folds a child's flat view into the parent's flat mapping under `field`.
pub type RenderHook = Arc<dyn Fn(&mut Map<String, Value>, &str, &Value) + Send + Sync>;

/// Post-processes a node's values after parsing.
pub type ParseValuesHook = Arc<dyn Fn(Values) -> Values + Send + Sync>;

/// How a node's children are structured.
#[derive(Clone)]
pub enum Composition {
    /// No child forms.
    Leaf,
    /// Keyed child forms.
    ObjectOf(BTreeMap<String, Arc<FormSchema>>),
    /// A list of child forms sharing one schema.
    ListOf(Arc<FormSchema>),
}

impl fmt::Debug for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf => f.write_str("Leaf"),
            Self::ObjectOf(nested) => f
                .debug_map()
                .entries(nested.iter().map(|(k, s)| (k, s.name())))
                .finish(),
            Self::ListOf(child) => write!(f, "ListOf({})", child.name()),
        }
    }
}

/// The declarative shape of one form.
pub struct FormSchema {
    name: String,
    field_validators: BTreeMap<String, Vec<Arc<dyn FieldRule>>>,
    form_validator: Option<Arc<dyn FormRule>>,
    composition: Composition,
    multi: Vec<Arc<FormSchema>>,
    fields: Option<BTreeSet<String>>,
    initial_hooks: BTreeMap<String, InitialHook>,
    render_hooks: BTreeMap<String, RenderHook>,
    parse_values: Option<ParseValuesHook>,
}

impl fmt::Debug for FormSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormSchema")
            .field("name", &self.name)
            .field(
                "field_validators",
                &self
                    .field_validators
                    .iter()
                    .map(|(k, v)| (k, v.len()))
                    .collect::<BTreeMap<_, _>>(),
            )
            .field("form_validator", &self.form_validator.is_some())
            .field("composition", &self.composition)
            .field(
                "multi",
                &self.multi.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl FormSchema {
    /// Start an object-shaped schema.
    pub fn builder(name: impl Into<String>) -> FormSchemaBuilder<ObjectShape> {
        FormSchemaBuilder::new(name.into(), None)
    }

    /// Start a list-shaped schema whose elements follow `child`.
    pub fn list_builder(
        name: impl Into<String>,
        child: Arc<FormSchema>,
    ) -> FormSchemaBuilder<ListShape> {
        FormSchemaBuilder::new(name.into(), Some(child))
    }

    /// Schema name, used in logs and diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How children are composed.
    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    /// True for list composition.
    pub fn is_list(&self) -> bool {
        matches!(self.composition, Composition::ListOf(_))
    }

    /// The element schema of a list composition.
    pub fn list_child(&self) -> Option<&Arc<FormSchema>> {
        match &self.composition {
            Composition::ListOf(child) => Some(child),
            _ => None,
        }
    }

    /// Keyed child schemas declared directly on this schema.
    pub fn nested(&self) -> impl Iterator<Item = (&String, &Arc<FormSchema>)> {
        let nested = match &self.composition {
            Composition::ObjectOf(nested) => Some(nested),
            _ => None,
        };
        nested.into_iter().flat_map(|n| n.iter())
    }

    /// The child schema declared for `field` on this schema or any overlay.
    pub fn nested_schema(&self, field: &str) -> Option<&Arc<FormSchema>> {
        if let Composition::ObjectOf(nested) = &self.composition {
            if let Some(schema) = nested.get(field) {
                return Some(schema);
            }
        }
        self.multi.iter().find_map(|overlay| overlay.nested_schema(field))
    }

    /// Field validators in field-name order; rules per field in declaration order.
    pub fn field_validators(&self) -> &BTreeMap<String, Vec<Arc<dyn FieldRule>>> {
        &self.field_validators
    }

    /// The whole-form validator, if any.
    pub fn form_validator(&self) -> Option<&Arc<dyn FormRule>> {
        self.form_validator.as_ref()
    }

    /// Overlay schemas in declaration order.
    pub fn multi(&self) -> &[Arc<FormSchema>] {
        &self.multi
    }

    /// Whether `field` survives the allow-list (always, without one).
    pub fn allows(&self, field: &str) -> bool {
        self.fields.as_ref().map_or(true, |f| f.contains(field))
    }

    /// The allow-list, if any.
    pub fn allowed_fields(&self) -> Option<&BTreeSet<String>> {
        self.fields.as_ref()
    }

    /// Extraction hook for `field`.
    pub fn initial_hook(&self, field: &str) -> Option<&InitialHook> {
        self.initial_hooks.get(field)
    }

    /// Recomposition hook for `field` on this schema or any overlay.
    pub fn render_hook(&self, field: &str) -> Option<&RenderHook> {
        self.render_hooks
            .get(field)
            .or_else(|| self.multi.iter().find_map(|overlay| overlay.render_hook(field)))
    }

    /// Post-parse hook.
    pub fn parse_values_hook(&self) -> Option<&ParseValuesHook> {
        self.parse_values.as_ref()
    }
}

// ─── Builder ─────────────────────────────────────────────────────────

/// Marker type: the schema under construction is object-shaped.
#[derive(Debug)]
pub struct ObjectShape;

/// Marker type: the schema under construction is list-shaped.
#[derive(Debug)]
pub struct ListShape;

/// Builder for [`FormSchema`]. See the module documentation.
pub struct FormSchemaBuilder<S> {
    schema: FormSchema,
    nested: BTreeMap<String, Arc<FormSchema>>,
    _shape: PhantomData<S>,
}

impl<S> FormSchemaBuilder<S> {
    fn new(name: String, list_child: Option<Arc<FormSchema>>) -> Self {
        let composition = match list_child {
            Some(child) => Composition::ListOf(child),
            None => Composition::Leaf,
        };
        Self {
            schema: FormSchema {
                name,
                field_validators: BTreeMap::new(),
                form_validator: None,
                composition,
                multi: Vec::new(),
                fields: None,
                initial_hooks: BTreeMap::new(),
                render_hooks: BTreeMap::new(),
                parse_values: None,
            },
            nested: BTreeMap::new(),
            _shape: PhantomData,
        }
    }

    /// Append a rule to `field`'s validators.
    pub fn rule(mut self, field: impl Into<String>, rule: impl FieldRule + 'static) -> Self {
        self.schema
            .field_validators
            .entry(field.into())
            .or_default()
            .push(Arc::new(rule));
        self
    }

    /// Append a closure rule to `field`'s validators.
    pub fn check<F>(self, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut ErrorAccumulator, &str, &FormNode) + Send + Sync + 'static,
    {
        self.rule(field, f)
    }

    /// Set the whole-form validator.
    pub fn form_rule<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ErrorAccumulator, &FormNode) + Send + Sync + 'static,
    {
        self.schema.form_validator = Some(Arc::new(f));
        self
    }

    /// Add an overlay schema sharing this node's value namespace.
    pub fn multi(mut self, overlay: Arc<FormSchema>) -> Self {
        self.schema.multi.push(overlay);
        self
    }

    /// Set the post-parse values hook.
    pub fn parse_values<F>(mut self, f: F) -> Self
    where
        F: Fn(Values) -> Values + Send + Sync + 'static,
    {
        self.schema.parse_values = Some(Arc::new(f));
        self
    }

    /// Finish the schema.
    pub fn build(self) -> Arc<FormSchema> {
        let mut schema = self.schema;
        if !self.nested.is_empty() {
            schema.composition = Composition::ObjectOf(self.nested);
        }
        Arc::new(schema)
    }
}

impl FormSchemaBuilder<ObjectShape> {
    /// Declare `field` as a child form of `schema`.
    ///
    /// By default the child parses `raw[field]` and its flat view is stored
    /// under `field` in the parent's flat view.
    pub fn nested(mut self, field: impl Into<String>, schema: Arc<FormSchema>) -> Self {
        self.nested.insert(field.into(), schema);
        self
    }

    /// Declare `field` as a child form sharing the parent's namespace.
    ///
    /// The child parses the parent's whole raw input, and its flat view is
    /// spread into the parent's flat view instead of nesting under `field`.
    pub fn inline(self, field: impl Into<String>, schema: Arc<FormSchema>) -> Self {
        let field = field.into();
        self.nested(field.clone(), schema)
            .initial(field.clone(), render::pass_through)
            .render(field, render::spread)
    }

    /// Only keep these fields when parsing and flattening.
    pub fn allow<I, T>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.schema.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Set the extraction hook for child `field`.
    pub fn initial<F>(mut self, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.schema.initial_hooks.insert(field.into(), Arc::new(f));
        self
    }

    /// Set the recomposition hook for child `field`.
    pub fn render<F>(mut self, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut Map<String, Value>, &str, &Value) + Send + Sync + 'static,
    {
        self.schema.render_hooks.insert(field.into(), Arc::new(f));
        self
    }
}
