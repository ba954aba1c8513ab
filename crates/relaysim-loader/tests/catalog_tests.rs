use std::fs;

use relaysim_ir::{AssertStep, Scenario, Step};
use relaysim_loader::{validate_scenario, LoadError, ScenarioCatalog, ValidationError};
use tempfile::TempDir;

const ACTIVATE_JSON: &str = include_str!("../../relaysim-ir/tests/fixtures/activate.json");
const ACTIVATE_TOML: &str = include_str!("../../relaysim-ir/tests/fixtures/activate.toml");
const LEGACY_JSON: &str = include_str!("../../relaysim-ir/tests/fixtures/temperature_fault.json");
const FAULT_JSON: &str = include_str!("../../relaysim-ir/tests/fixtures/fault_injection.json");

fn catalog_with(files: &[(&str, &str)]) -> (TempDir, ScenarioCatalog) {
    let dir = TempDir::new().unwrap();
    for (name, contents) in files {
        fs::write(dir.path().join(name), contents).unwrap();
    }
    let catalog = ScenarioCatalog::new(dir.path());
    (dir, catalog)
}

#[test]
fn test_load_by_bare_name() {
    let (_dir, catalog) = catalog_with(&[("activate.json", ACTIVATE_JSON)]);
    let scenario = catalog.load("activate").unwrap();
    assert_eq!(scenario.name, "Basic Activation Test");
    assert_eq!(scenario.steps.len(), 6);
}

#[test]
fn test_load_prefers_json_over_toml() {
    let (_dir, catalog) = catalog_with(&[
        ("activate.json", ACTIVATE_JSON),
        ("activate.toml", ACTIVATE_TOML),
    ]);
    assert_eq!(catalog.load("activate").unwrap().steps.len(), 6);
    assert_eq!(catalog.load("activate.toml").unwrap().steps.len(), 4);
}

#[test]
fn test_load_legacy_list_uses_file_stem() {
    let (_dir, catalog) = catalog_with(&[("temperature_fault.json", LEGACY_JSON)]);
    let scenario = catalog.load("temperature_fault").unwrap();
    assert_eq!(scenario.name, "temperature_fault");
    assert_eq!(scenario.description, "");
}

#[test]
fn test_load_missing_scenario() {
    let (_dir, catalog) = catalog_with(&[]);
    let err = catalog.load("nope").unwrap_err();
    assert!(matches!(err, LoadError::NotFound { .. }));
    assert!(err.to_string().starts_with("Scenario file not found"));
}

#[test]
fn test_load_rejects_names_outside_directory() {
    let outer = TempDir::new().unwrap();
    fs::write(outer.path().join("secret.json"), ACTIVATE_JSON).unwrap();
    let catalog = ScenarioCatalog::new(outer.path().join("scenarios"));
    fs::create_dir(catalog.dir()).unwrap();

    let absolute = outer.path().join("secret.json");
    for name in [
        "../secret",
        "../secret.json",
        "nested/activate",
        "nested\\activate",
        "..",
        ".",
        "",
        absolute.to_str().unwrap(),
    ] {
        match catalog.load(name) {
            Err(LoadError::InvalidName { name: rejected }) => assert_eq!(rejected, name),
            other => panic!("expected InvalidName for {name:?}, got {other:?}"),
        }
    }
}

#[test]
fn test_load_rejects_unparseable_file() {
    let (_dir, catalog) = catalog_with(&[("broken.json", "{ not json")]);
    assert!(matches!(
        catalog.load("broken"),
        Err(LoadError::Parse { .. })
    ));
}

#[test]
fn test_load_rejects_assert_without_operator() {
    let json = r#"{"name": "vacuous", "steps": [{"step": "assert", "register": "voltage"}]}"#;
    let (_dir, catalog) = catalog_with(&[("vacuous.json", json)]);
    match catalog.load("vacuous") {
        Err(LoadError::Invalid { errors, .. }) => {
            assert_eq!(
                errors,
                vec![ValidationError::MissingAssertOperator {
                    index: 0,
                    register: "voltage".to_string()
                }]
            );
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn test_list_sorted_and_skips_invalid() {
    let (_dir, catalog) = catalog_with(&[
        ("fault_injection.json", FAULT_JSON),
        ("activate.toml", ACTIVATE_TOML),
        ("broken.json", "[1, 2"),
        ("notes.txt", "not a scenario"),
    ]);
    let listed = catalog.list();
    let filenames: Vec<&str> = listed.iter().map(|s| s.filename.as_str()).collect();
    assert_eq!(filenames, vec!["activate.toml", "fault_injection.json"]);
    assert_eq!(listed[1].name, "Fault Injection Test");
    assert!(!listed[1].description.is_empty());
}

#[test]
fn test_list_missing_directory_is_empty() {
    let dir = TempDir::new().unwrap();
    let catalog = ScenarioCatalog::new(dir.path().join("absent"));
    assert!(catalog.list().is_empty());
}

#[test]
fn test_validate_file() {
    let (dir, catalog) = catalog_with(&[
        ("good.json", ACTIVATE_JSON),
        ("bad.json", r#"{"steps": [{"step": "dance"}]}"#),
    ]);
    assert!(catalog.validate_file(dir.path().join("good.json")));
    assert!(!catalog.validate_file(dir.path().join("bad.json")));
    assert!(!catalog.validate_file(dir.path().join("missing.json")));
}

#[test]
fn test_validation_collects_every_problem() {
    let scenario = Scenario::new(
        "bad",
        vec![
            Step::write("", 1.0),
            Step::from(AssertStep::on("voltage")),
            Step::command(""),
            Step::from(AssertStep::on("voltage").in_range(130, 110.0)),
            Step::from(AssertStep::on("state").in_range("A", "B")),
        ],
    );
    let errors = validate_scenario(&scenario).unwrap_err();
    let indices: Vec<usize> = errors.iter().map(ValidationError::index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert!(errors[3].to_string().contains("min (130) > max (110.0)"));
}

#[test]
fn test_empty_scenario_is_valid() {
    assert!(validate_scenario(&Scenario::new("empty", vec![])).is_ok());
}
