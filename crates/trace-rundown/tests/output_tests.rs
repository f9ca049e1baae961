use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::NamedTempFile;
use trace_rundown::aggregator::CorrelationEngine;
use trace_rundown::output::validate_path;
use trace_rundown::output::{
    model_to_string, read_model, render_terminal_summary, to_enhanced_trace,
    write_enhanced_trace, write_model,
};
use trace_rundown::parser::{normalize_payload, OutputModel};
use trace_rundown::utils::{ModelError, OutputError};

fn sample_trace() -> Value {
    json!({
        "metadata": { "source": "DevTools" },
        "traceEvents": [
            {
                "cat": "disabled-by-default-devtools.target-rundown",
                "name": "ScriptCompiled", "ph": "X", "pid": 100, "tid": 1, "ts": 1.0,
                "args": { "data": {
                    "frame": "F1", "frameType": "page", "url": "https://example.com/",
                    "isolate": "iso1", "v8context": "ctx-abc", "scriptId": 1
                } }
            },
            {
                "cat": "disabled-by-default-devtools.v8-source-rundown",
                "name": "ScriptCatchup", "ph": "X", "pid": 100, "tid": 1, "ts": 2.0,
                "args": { "data": {
                    "isolate": "iso1", "executionContextId": 7, "scriptId": 1,
                    "startLine": 0, "startColumn": 0, "endLine": 0, "endColumn": 14,
                    "hash": "h", "isModule": false, "hasSourceUrl": false,
                    "url": "https://example.com/app.js"
                } }
            },
            {
                "cat": "disabled-by-default-devtools.v8-source-rundown-sources",
                "name": "ScriptCatchup", "ph": "X", "pid": 100, "tid": 1, "ts": 3.0,
                "args": { "data": {
                    "isolate": "iso1", "scriptId": 1, "sourceText": "console.log(1)", "length": 14
                } }
            }
        ]
    })
}

fn create_test_model() -> OutputModel {
    let mut engine = CorrelationEngine::new();
    engine.ingest_json(&sample_trace()).unwrap();
    engine.finalize()
}

#[test]
fn test_write_and_read_model() {
    let model = create_test_model();
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path();

    // Write
    write_model(&model, path).unwrap();

    // Read back
    let loaded = read_model(path).unwrap();

    assert_eq!(loaded, model);
}

#[test]
fn test_model_json_field_names() {
    let model = create_test_model();
    let value: Value = serde_json::from_str(&model_to_string(&model).unwrap()).unwrap();

    assert_eq!(value["executionContexts"][0]["v8Context"], "ctx-abc");
    assert_eq!(value["executionContexts"][0]["id"], 7);
    assert_eq!(value["scripts"][0]["executionContextId"], 7);
    assert_eq!(value["scripts"][0]["sourceText"], "console.log(1)");
    assert_eq!(value["scripts"][0]["auxData"]["frameId"], "F1");
    assert_eq!(value["targets"][0]["type"], "page");
}

#[test]
fn test_read_model_rejects_duplicate_targets() {
    let model = create_test_model();
    let mut value = serde_json::to_value(&model).unwrap();
    let target = value["targets"][0].clone();
    value["targets"].as_array_mut().unwrap().push(target);

    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), value.to_string()).unwrap();

    match read_model(temp_file.path()) {
        Err(OutputError::InvalidModel(ModelError::DuplicateKey { kind, key })) => {
            assert_eq!(kind, "target");
            assert_eq!(key, "F1");
        }
        other => panic!("expected duplicate key error, got {:?}", other),
    }
}

#[test]
fn test_read_model_rejects_duplicate_scripts() {
    let model = create_test_model();
    let mut value = serde_json::to_value(&model).unwrap();
    let script = value["scripts"][0].clone();
    value["scripts"].as_array_mut().unwrap().push(script);

    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), value.to_string()).unwrap();

    let err = read_model(temp_file.path()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid model: cannot insert, already exists: script id = 1@iso1"
    );
}

#[test]
fn test_validate_output_path_empty() {
    let result = validate_path(Path::new(""));
    assert!(result.is_err());
}

#[test]
fn test_validate_output_path_directory() {
    // Try to write to a directory path
    let temp_dir = tempfile::tempdir().unwrap();
    let result = validate_path(temp_dir.path());
    assert!(result.is_err());
}

#[test]
fn test_write_creates_parent_dirs() {
    let temp_dir = tempfile::tempdir().unwrap();
    let nested_path = temp_dir.path().join("nested/dirs/model.json");

    let model = create_test_model();
    write_model(&model, &nested_path).unwrap();

    assert!(nested_path.exists());
}

#[test]
fn test_enhanced_trace_carries_payload() {
    let raw_trace = sample_trace();
    let model = create_test_model();
    let payload = normalize_payload(&raw_trace).unwrap();
    let enhanced = to_enhanced_trace(&model, Some(payload));

    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("enhanced.json");
    write_enhanced_trace(&enhanced, &path).unwrap();

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["enhancedTracesMetadata"]["version"], "1");
    assert!(written["enhancedTracesMetadata"]["generatedAt"].is_string());
    assert_eq!(written["scripts"][0]["scriptId"], 1);
    assert!(written.get("worklets").is_none());
    assert_eq!(written["payload"]["traceEvents"], raw_trace["traceEvents"]);
    assert_eq!(written["payload"]["metadata"], raw_trace["metadata"]);
}

#[test]
fn test_enhanced_trace_can_be_reanalyzed() {
    let raw_trace = sample_trace();
    let model = create_test_model();
    let enhanced = to_enhanced_trace(&model, Some(normalize_payload(&raw_trace).unwrap()));

    let mut engine = CorrelationEngine::new();
    engine
        .ingest_json(&serde_json::to_value(&enhanced).unwrap())
        .unwrap();

    assert_eq!(engine.finalize(), model);
}

#[test]
fn test_stripped_model_keeps_lengths() {
    let model = create_test_model().without_source_text();

    assert_eq!(model.scripts()[0].source_text, None);
    assert_eq!(model.scripts()[0].length, Some(14));
}

#[test]
fn test_terminal_summary_mentions_counts() {
    colored::control::set_override(false);

    let mut engine = CorrelationEngine::new();
    engine.ingest_json(&sample_trace()).unwrap();
    let summary = render_terminal_summary(&engine.finalize(), engine.stats());

    assert!(summary.contains("Events:   3 read, 3 recognized, 0 skipped"));
    assert!(summary.contains("Context ids resolved: 1/1"));
    assert!(summary.contains("Scripts with source: 1/1"));
    assert!(summary.contains("F1 (pid 100) 1 contexts, 1 scripts"));
}
