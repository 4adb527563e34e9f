//! Property tests for parse, list updates and overlay merges.

use std::sync::Arc;

use formtree_state::{required, FormNode, FormSchema, OverlayPatch, Update};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn person() -> Arc<FormSchema> {
    FormSchema::builder("Person").rule("name", required()).build()
}

fn movie() -> Arc<FormSchema> {
    FormSchema::builder("Movie")
        .rule("title", required())
        .nested("director", person())
        .nested("actors", FormSchema::list_builder("People", person()).build())
        .build()
}

fn name() -> impl Strategy<Value = Value> {
    prop_oneof![Just(Value::Null), "[a-zA-Z ]{0,12}".prop_map(Value::String)]
}

fn person_raw() -> impl Strategy<Value = Value> {
    name().prop_map(|name| json!({"name": name}))
}

fn movie_raw() -> impl Strategy<Value = Value> {
    (
        name(),
        person_raw(),
        prop::collection::vec(person_raw(), 0..5),
        prop::collection::btree_map("[a-z]{1,6}", any::<i32>().prop_map(Value::from), 0..4),
    )
        .prop_map(|(title, director, actors, extra)| {
            let mut obj: Map<String, Value> = extra.into_iter().collect();
            obj.insert("title".to_string(), title);
            obj.insert("director".to_string(), director);
            obj.insert("actors".to_string(), Value::Array(actors));
            Value::Object(obj)
        })
}

proptest! {
    /// Parsing a flat view yields the same flat view.
    #[test]
    fn parse_is_idempotent_on_flat(raw in movie_raw(), force in any::<bool>()) {
        let mut first = FormNode::new(movie());
        first.parse(&raw, force);
        let flat = first.flat().clone();

        let mut second = FormNode::new(movie());
        second.parse(&flat, force);
        prop_assert_eq!(second.flat(), &flat);
        prop_assert_eq!(second.errors(), first.errors());
    }

    /// Appending an element and removing it again restores the list.
    #[test]
    fn append_then_remove_restores_list(
        items in prop::collection::vec(person_raw(), 0..6),
        extra in person_raw(),
    ) {
        let mut node = FormNode::new(FormSchema::list_builder("People", person()).build());
        node.parse(&Value::Array(items.clone()), false);
        let before = node.state().clone();

        node.update_value(Update::append(extra)).unwrap();
        prop_assert_eq!(node.get_values().len(), items.len() + 1);
        node.update_value(Update::remove(items.len())).unwrap();

        prop_assert_eq!(node.state(), &before);
    }

    /// Overlays with disjoint keys accumulate.
    #[test]
    fn overlays_accumulate(
        left in prop::collection::btree_map("a[a-z]{0,4}", any::<i32>().prop_map(Value::from), 0..4),
        right in prop::collection::btree_map("b[a-z]{0,4}", any::<i32>().prop_map(Value::from), 0..4),
    ) {
        let mut node = FormNode::new(FormSchema::builder("Plain").build());
        node.parse(&json!({}), false);
        let left: Map<String, Value> = left.into_iter().collect();
        let right: Map<String, Value> = right.into_iter().collect();
        node.update_value(Update::overlay(OverlayPatch::from_values(&Value::Object(left.clone())))).unwrap();
        node.update_value(Update::overlay(OverlayPatch::from_values(&Value::Object(right.clone())))).unwrap();

        let mut expected = left;
        expected.extend(right);
        prop_assert_eq!(node.flat(), &Value::Object(expected));
    }
}
