//! CLI round-trip: build benchmark sets from fixture files on disk, then
//! score predictions with the evaluator binary.

use std::fs;
use std::process::Command;

use serde_json::json;

fn write(path: &std::path::Path, contents: String) {
    fs::write(path, contents).unwrap();
}

fn fixture_files(dir: &std::path::Path) {
    let catalog = json!({
        "P106": {"label": "occupation"},
        "P69": {"label": "educated at"},
        "Q100": {"label": "basketball player", "aliases": ["basketball player"],
                 "entity_types": ["Q28640"]},
        "Q103": {"label": "Jazz Conservatory", "aliases": ["Jazz Conservatory"],
                 "entity_types": ["Q3918"]},
        "Q1": {"label": "Jordan", "aliases": ["Jordan"], "entity_types": ["Q5"],
               "popularity": 100.0,
               "relations": {"P106": [{"type": "entity", "id": "Q100"}]}},
        "Q2": {"label": "Jordan", "aliases": ["Jordan"], "entity_types": ["Q5"],
               "popularity": 10.0,
               "relations": {"P69": [{"type": "entity", "id": "Q103"}]}},
    });
    write(&dir.join("catalog.json"), catalog.to_string());

    let corpus = [
        json!({"entity_id": "Q1", "document_id": "10", "title": "Jordan (athlete)",
               "text": "Jordan is a basketball player who won six championships"}),
        json!({"entity_id": "Q2", "document_id": "20", "title": "Jordan (musician)",
               "text": "Jordan studied at the Jazz Conservatory and sings"}),
    ]
    .map(|v| v.to_string())
    .join("\n");
    write(&dir.join("corpus.jsonl"), corpus);

    write(
        &dir.join("properties.json"),
        json!({"Q5": ["P106", "P69"]}).to_string(),
    );
    write(
        &dir.join("qa_templates.json"),
        json!({
            "P106": {"all": ["What does $entity do for a living?"]},
            "P69": {"all": ["Where was $entity educated?"]},
        })
        .to_string(),
    );
    write(
        &dir.join("fc_templates.json"),
        json!({
            "P106": ["$entity is a $object."],
            "P69": ["$entity was educated at $object."],
        })
        .to_string(),
    );
}

#[test]
fn test_build_then_evaluate() {
    let dir = tempfile::tempdir().unwrap();
    fixture_files(dir.path());
    let out_dir = dir.path().join("out");

    let status = Command::new(env!("CARGO_BIN_EXE_namesake"))
        .args(["build", "--quiet"])
        .arg("--catalog")
        .arg(dir.path().join("catalog.json"))
        .arg("--corpus")
        .arg(dir.path().join("corpus.jsonl"))
        .arg("--properties")
        .arg(dir.path().join("properties.json"))
        .arg("--qa-templates")
        .arg(dir.path().join("qa_templates.json"))
        .arg("--fc-templates")
        .arg(dir.path().join("fc_templates.json"))
        .arg("--out-dir")
        .arg(&out_dir)
        .status()
        .unwrap();
    assert!(status.success());

    let gold_path = out_dir.join("qa/benchmark_sets.jsonl");
    let gold = fs::read_to_string(&gold_path).unwrap();
    assert!(!gold.trim().is_empty());

    // Predict every instance's own gold provenance.
    let mut predictions = Vec::new();
    for line in gold.lines() {
        let set: serde_json::Value = serde_json::from_str(line).unwrap();
        for entity in set["entities"].as_object().unwrap().values() {
            for query in entity["queries"].as_array().unwrap() {
                predictions.push(
                    json!({"id": query["id"],
                           "output": {"provenance": query["output"]["provenance"]}})
                    .to_string(),
                );
            }
        }
    }
    assert_eq!(predictions.len(), 2);
    let predictions_path = dir.path().join("predictions.jsonl");
    write(&predictions_path, predictions.join("\n"));

    let output = Command::new(env!("CARGO_BIN_EXE_namesake-eval"))
        .arg("-a")
        .arg(&gold_path)
        .arg("-p")
        .arg(&predictions_path)
        .args(["-k", "1"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["accuracy"], 100.0);
    assert_eq!(report["consistency"], 100.0);
    assert_eq!(report["head"]["accuracy"], 100.0);
    assert_eq!(report["tail"]["accuracy"], 100.0);
}

#[test]
fn test_evaluator_writes_metrics_files() {
    let dir = tempfile::tempdir().unwrap();

    let gold = json!({
        "name": "Jordan",
        "entities": {
            "Q1": {"is_head": true, "popularity": 100.0, "articles": [],
                   "queries": [{"id": "f1=a", "input": "q",
                                "output": {"answer": ["x"],
                                           "provenance": [{"document_id": "10", "title": ""}],
                                           "meta": {"values": ["x"], "additional_values": []}},
                                "meta": {"pid": "P106"}}]},
            "Q2": {"is_head": false, "popularity": 10.0, "articles": [],
                   "queries": [{"id": "f2=a", "input": "q",
                                "output": {"answer": ["y"],
                                           "provenance": [{"document_id": "20", "title": ""}],
                                           "meta": {"values": ["y"], "additional_values": []}},
                                "meta": {"pid": "P69"}}]},
        }
    });
    let gold_path = dir.path().join("gold.jsonl");
    write(&gold_path, gold.to_string());

    let predictions = [
        json!({"id": "f1=a", "output": {"provenance": [{"document_id": "10", "title": ""}]}}),
        json!({"id": "f2=a", "output": {"provenance": [{"document_id": "10", "title": ""}]}}),
    ]
    .map(|v| v.to_string())
    .join("\n");
    let predictions_path = dir.path().join("predictions.jsonl");
    write(&predictions_path, predictions);

    let status = Command::new(env!("CARGO_BIN_EXE_namesake-eval"))
        .arg("-a")
        .arg(&gold_path)
        .arg("-p")
        .arg(&predictions_path)
        .args(["-k", "1"])
        .arg("-m")
        .arg(dir.path())
        .status()
        .unwrap();
    assert!(status.success());

    let metrics: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("metrics@1.json")).unwrap())
            .unwrap();
    assert_eq!(metrics["accuracy"], 50.0);
    assert_eq!(metrics["consistency"], 0.0);

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("raw_metrics@1.json")).unwrap())
            .unwrap();
    assert_eq!(raw["accuracy"]["f1=a"], 1);
    assert_eq!(raw["accuracy"]["f2=a"], 0);
}

#[test]
fn test_missing_input_fails_with_nonzero_exit() {
    let output = Command::new(env!("CARGO_BIN_EXE_namesake-eval"))
        .args(["-a", "/nonexistent/gold.jsonl", "-p", "/nonexistent/pred.jsonl"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(!output.stderr.is_empty());
}
