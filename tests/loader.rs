use std::fs::write;
use tempfile::tempdir;

use vinaya_notes::loader::{load_dataset, LoadError};

fn write_valid_artifacts(dir: &std::path::Path) {
    write(
        dir.join("manifest.json"),
        r#"[
            {"uid": "pli-tv-bu-vb-pc", "title": "Pācittiya", "order": 0},
            {"uid": "pli-tv-bu-vb-pc1", "title": "Pācittiya 1", "chapter": "pli-tv-bu-vb-pc", "order": 0},
            {"uid": "pli-tv-bu-vb-pc2", "title": "Pācittiya 2", "chapter": "pli-tv-bu-vb-pc", "order": 1}
        ]"#,
    )
    .unwrap();
    write(
        dir.join("glossary.json"),
        r#"{"upajjhāya": "preceptor", "pācittiya": "an offense entailing confession"}"#,
    )
    .unwrap();
    write(
        dir.join("vibhanga.json"),
        r#"[
            {"uid": "pli-tv-bu-vb-pc1", "body": "If a monk lies, see [[pli-tv-bu-vb-pc2]]."},
            {"uid": "pli-tv-bu-vb-pc2", "title": "On abuse", "body": "Abuse is an offense.", "refs": ["pli-tv-bu-vb-pc1"]}
        ]"#,
    )
    .unwrap();
}

#[test]
fn loads_all_three_collections_without_dropping_records() {
    let dir = tempdir().unwrap();
    write_valid_artifacts(dir.path());

    let dataset = load_dataset(dir.path()).expect("dataset should load");

    assert_eq!(dataset.manifest.len(), 3);
    assert_eq!(dataset.glossary.len(), 2);
    assert_eq!(dataset.sections.len(), 2);

    let entry = &dataset.manifest[1];
    assert_eq!(entry.uid, "pli-tv-bu-vb-pc1");
    assert_eq!(entry.title, "Pācittiya 1");
    assert_eq!(entry.chapter.as_deref(), Some("pli-tv-bu-vb-pc"));

    let gloss = dataset.glossary.get("upajjhāya").expect("term present");
    assert_eq!(gloss.gloss, "preceptor");

    // Optional fields default rather than fail.
    assert_eq!(dataset.sections[0].title, None);
    assert!(dataset.sections[0].refs.is_empty());
    assert_eq!(dataset.sections[1].refs, vec!["pli-tv-bu-vb-pc1"]);
}

#[test]
fn missing_artifact_is_fatal_and_names_the_source() {
    let dir = tempdir().unwrap();
    write_valid_artifacts(dir.path());
    std::fs::remove_file(dir.path().join("glossary.json")).unwrap();

    let err = load_dataset(dir.path()).unwrap_err();
    assert!(matches!(err, LoadError::Missing { artifact: "glossary.json", .. }));
    assert!(err.to_string().contains("glossary.json"), "got: {err}");
}

#[test]
fn malformed_artifact_is_fatal_and_names_the_source() {
    let dir = tempdir().unwrap();
    write_valid_artifacts(dir.path());
    write(dir.path().join("vibhanga.json"), "not json {{{{").unwrap();

    let err = load_dataset(dir.path()).unwrap_err();
    assert!(matches!(err, LoadError::Parse { artifact: "vibhanga.json", .. }));
    assert!(err.to_string().contains("vibhanga.json"), "got: {err}");
}

#[test]
fn record_level_type_error_fails_the_whole_artifact() {
    let dir = tempdir().unwrap();
    write_valid_artifacts(dir.path());
    // Second record is missing its body: no silent drop allowed.
    write(
        dir.path().join("vibhanga.json"),
        r#"[{"uid": "a", "body": "ok"}, {"uid": "b"}]"#,
    )
    .unwrap();

    let err = load_dataset(dir.path()).unwrap_err();
    assert!(matches!(err, LoadError::Parse { artifact: "vibhanga.json", .. }));
}
