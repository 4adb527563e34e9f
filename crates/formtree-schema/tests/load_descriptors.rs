//! Integration test: load descriptor fixtures from disk, build schemas, and
//! run them through the form-state engine.

use std::path::PathBuf;

use formtree_schema::{DescriptorError, DescriptorSet};
use formtree_state::{ErrorEntry, FieldPath, FormNode, Severity, REQUIRED_MESSAGE};
use serde_json::json;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_yaml_fixture_builds_every_form() {
    let set = DescriptorSet::from_path(fixture("movies.yaml")).unwrap();
    assert_eq!(
        set.form_names(),
        vec!["Address", "Cast", "Movie", "Person", "Rating"]
    );
    let all = set.build_all().unwrap();
    assert_eq!(all.len(), 5);
    assert!(all["Cast"].is_list());
    assert_eq!(all["Movie"].multi().len(), 1);
}

#[test]
fn test_movie_parses_and_flattens() {
    let set = DescriptorSet::from_path(fixture("movies.yaml")).unwrap();
    let mut node = FormNode::new(set.build("Movie").unwrap());
    node.parse(
        &json!({
            "title": "Alien",
            "year": 1979,
            "stars": 5,
            "director": {"name": "Ridley"},
            "actors": [{"name": "Sigourney"}],
            "street": "Stage 4",
            "city": "Shepperton",
            "junk": true
        }),
        false,
    );
    assert_eq!(
        node.flat(),
        &json!({
            "title": "Alien",
            "year": 1979,
            "director": {"name": "Ridley"},
            "actors": [{"name": "Sigourney"}],
            "street": "Stage 4",
            "city": "Shepperton"
        })
    );
    assert!(node.errors().is_empty());
}

#[test]
fn test_forced_validation_uses_descriptor_messages() {
    let set = DescriptorSet::from_path(fixture("movies.yaml")).unwrap();
    let mut node = FormNode::new(set.build("Movie").unwrap());
    node.parse(&json!({}), true);

    let errors = node.errors();
    // title, director.name, stars (from the Rating overlay)
    assert_eq!(errors.count(Severity::Error), 3);
    // year, studio street
    assert_eq!(errors.count(Severity::Warning), 2);
    assert_eq!(
        errors.errors_for("year"),
        &[ErrorEntry::new(Severity::Warning, "Year helps searching")]
    );
    assert_eq!(
        errors.errors_for("stars"),
        &[ErrorEntry::new(Severity::Error, REQUIRED_MESSAGE)]
    );
    let director = node.state().node_at(&FieldPath::parse("director")).unwrap();
    assert_eq!(
        director.errors.errors_for("name"),
        &[ErrorEntry::new(Severity::Error, "Name please")]
    );
}

#[test]
fn test_json_fixture_builds_list_form() {
    let set = DescriptorSet::from_path(fixture("people.json")).unwrap();
    let mut team = FormNode::new(set.build("Team").unwrap());
    team.parse(&json!([{"name": "Ann", "email": "ann@example.com"}, {}]), true);
    assert_eq!(team.errors().count(Severity::Error), 1);
    assert_eq!(team.errors().count(Severity::Warning), 1);
}

#[test]
fn test_from_path_dispatches_on_extension() {
    let dir = tempfile::tempdir().unwrap();
    let yml = dir.path().join("forms.yml");
    std::fs::write(&yml, "forms:\n  Note:\n    fields:\n      body: [required]\n").unwrap();
    let set = DescriptorSet::from_path(&yml).unwrap();
    assert_eq!(set.form_names(), vec!["Note"]);
    assert_eq!(set.source_name(), yml.display().to_string());

    let json = dir.path().join("forms.json");
    std::fs::write(&json, "forms:\n  Note: {}\n").unwrap();
    assert!(matches!(
        DescriptorSet::from_path(&json),
        Err(DescriptorError::Load { .. })
    ));
}

#[test]
fn test_invalid_file_reports_source_and_paths() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    std::fs::write(&path, "forms:\n  Movie:\n    nested:\n      actors: [Person, Person]\n").unwrap();
    let err = DescriptorSet::from_path(&path).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("broken.yaml"), "{message}");
    assert!(message.contains("/forms/Movie/nested/actors"), "{message}");
}

#[test]
fn test_missing_file_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        DescriptorSet::from_path(dir.path().join("absent.yaml")),
        Err(DescriptorError::Load { .. })
    ));
}
