// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use assert_cmd::Command;
use serde_json::json;
use std::{fs, path::Path};
use tempfile::TempDir;

fn rectangle(label: &str, x: f64, y: f64, w: f64, h: f64) -> serde_json::Value {
    json!({
        "label": label,
        "points": [[x, y], [x + w, y], [x + w, y + h], [x, y + h]],
        "shape_type": "polygon"
    })
}

fn write_shapes(path: &Path, shapes: Vec<serde_json::Value>) {
    fs::write(path, json!({ "shapes": shapes }).to_string()).unwrap();
}

/// Unit square reference and its two halves as test regions.
fn split_pair(dir: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
    let reference = dir.path().join("reference.json");
    let test = dir.path().join("test.json");
    write_shapes(&reference, vec![rectangle("text", 0.0, 0.0, 1.0, 1.0)]);
    write_shapes(
        &test,
        vec![
            rectangle("text", 0.0, 0.0, 0.5, 1.0),
            rectangle("text", 0.5, 0.0, 0.5, 1.0),
        ],
    );
    (reference, test)
}

/// Rows of a tab-separated report keyed by header name.
fn read_report(path: &Path) -> Vec<std::collections::HashMap<String, String>> {
    let text = fs::read_to_string(path).unwrap();
    let mut lines = text.lines();
    let header: Vec<String> = lines
        .next()
        .unwrap()
        .split('\t')
        .map(str::to_string)
        .collect();
    lines
        .map(|line| {
            header
                .iter()
                .cloned()
                .zip(line.split('\t').map(str::to_string))
                .collect()
        })
        .collect()
}

#[test]
fn test_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("segeval")?;
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicates::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn test_evaluate_split() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let (reference, test) = split_pair(&dir);
    let report = dir.path().join("report.tsv");

    let mut cmd = Command::cargo_bin("segeval")?;
    cmd.arg("evaluate")
        .arg(&reference)
        .arg(&test)
        .args(["-t", "0.4", "-o"])
        .arg(&report);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("SEGMENTATION EVALUATION"))
        .stdout(predicates::str::contains("║ Document:     reference"))
        .stdout(predicates::str::contains("Region accuracy:      0.0%"));

    let rows = read_report(&report);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["scope"], "document");
    assert_eq!(rows[0]["split"], "1");
    assert_eq!(rows[0]["test_split"], "2");
    assert_eq!(rows[0]["false_detection"], "0");
    assert_eq!(rows[1]["scope"], "corpus");
    Ok(())
}

#[test]
fn test_evaluate_sweep() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let (reference, test) = split_pair(&dir);
    let report = dir.path().join("sweep.tsv");

    let mut cmd = Command::cargo_bin("segeval")?;
    cmd.arg("evaluate")
        .arg(&reference)
        .arg(&test)
        .args(["--sweep", "0.4:0.6:0.2", "--output"])
        .arg(&report);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains(
            "threshold\tregion_accuracy\tfalse_detection_rate",
        ))
        .stdout(predicates::str::contains("0.6\t0.0000\t1.0000"));

    let rows = read_report(&report);
    let documents: Vec<_> = rows.iter().filter(|r| r["scope"] == "document").collect();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0]["threshold"], "0.4");
    assert_eq!(documents[0]["split"], "1");
    assert_eq!(documents[1]["threshold"], "0.6");
    assert_eq!(documents[1]["missed"], "1");
    assert_eq!(documents[1]["false_detection"], "2");
    Ok(())
}

#[test]
fn test_evaluate_smaller_rule_from_config() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let (reference, test) = split_pair(&dir);
    let config = dir.path().join("segeval.toml");
    fs::write(&config, "rule = \"smaller\"\nthresholds = [0.6]\n")?;
    let report = dir.path().join("report.tsv");

    let mut cmd = Command::cargo_bin("segeval")?;
    cmd.arg("--config")
        .arg(&config)
        .arg("evaluate")
        .arg(&reference)
        .arg(&test)
        .arg("-o")
        .arg(&report);
    cmd.assert().success();

    let rows = read_report(&report);
    assert_eq!(rows[0]["threshold"], "0.6");
    assert_eq!(rows[0]["split"], "1");
    Ok(())
}

#[test]
fn test_evaluate_label_restriction() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let reference = dir.path().join("reference.json");
    let test = dir.path().join("test.json");
    write_shapes(
        &reference,
        vec![
            rectangle("text", 0.0, 0.0, 10.0, 10.0),
            rectangle("figure", 20.0, 0.0, 10.0, 10.0),
        ],
    );
    write_shapes(&test, vec![rectangle("figure", 20.0, 0.0, 10.0, 10.0)]);
    let report = dir.path().join("report.tsv");

    let mut cmd = Command::cargo_bin("segeval")?;
    cmd.arg("evaluate")
        .arg(&reference)
        .arg(&test)
        .args(["-l", "figure", "-o"])
        .arg(&report);
    cmd.assert().success();

    let rows = read_report(&report);
    assert_eq!(rows[0]["reference_regions"], "1");
    assert_eq!(rows[0]["correct"], "1");
    assert_eq!(rows[0]["region_accuracy"], "1.0");
    Ok(())
}

#[test]
fn test_evaluate_reports_excluded_region() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let reference = dir.path().join("reference.json");
    let test = dir.path().join("test.json");
    write_shapes(
        &reference,
        vec![
            rectangle("text", 0.0, 0.0, 10.0, 10.0),
            json!({"label": "text", "points": [[0, 0], [4, 4], [4, 0], [0, 2]]}),
        ],
    );
    write_shapes(&test, vec![rectangle("text", 0.0, 0.0, 10.0, 10.0)]);

    let mut cmd = Command::cargo_bin("segeval")?;
    cmd.arg("evaluate").arg(&reference).arg(&test);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("Warnings:     1"))
        .stdout(predicates::str::contains("cross each other"));
    Ok(())
}

#[test]
fn test_invalid_threshold_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let (reference, test) = split_pair(&dir);

    let mut cmd = Command::cargo_bin("segeval")?;
    cmd.arg("evaluate")
        .arg(&reference)
        .arg(&test)
        .args(["-t", "1.5"]);
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("InvalidThreshold"));
    Ok(())
}

#[test]
fn test_unsupported_format_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let (reference, _) = split_pair(&dir);
    let test = dir.path().join("test.txt");
    fs::write(&test, "0 0 1 1")?;

    let mut cmd = Command::cargo_bin("segeval")?;
    cmd.arg("evaluate").arg(&reference).arg(&test);
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("UnsupportedFormat"));
    Ok(())
}

#[test]
fn test_batch_corpus() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let reference_dir = dir.path().join("reference");
    let test_dir = dir.path().join("test");
    fs::create_dir_all(&reference_dir)?;
    fs::create_dir_all(&test_dir)?;

    // page-1 matches exactly, page-2 is split, page-3 has no test file.
    write_shapes(
        &reference_dir.join("page-1.json"),
        vec![rectangle("text", 0.0, 0.0, 10.0, 10.0)],
    );
    write_shapes(
        &test_dir.join("page-1.json"),
        vec![rectangle("text", 0.0, 0.0, 10.0, 10.0)],
    );
    write_shapes(
        &reference_dir.join("page-2.json"),
        vec![rectangle("text", 0.0, 0.0, 10.0, 10.0)],
    );
    write_shapes(
        &test_dir.join("page-2.json"),
        vec![
            rectangle("text", 0.0, 0.0, 5.0, 10.0),
            rectangle("text", 5.0, 0.0, 5.0, 10.0),
        ],
    );
    write_shapes(
        &reference_dir.join("page-3.json"),
        vec![rectangle("text", 0.0, 0.0, 10.0, 10.0)],
    );
    let report = dir.path().join("batch.tsv");

    let mut cmd = Command::cargo_bin("segeval")?;
    cmd.arg("batch")
        .arg(&reference_dir)
        .arg(&test_dir)
        .args(["-t", "0.4", "-o"])
        .arg(&report);
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("CORPUS EVALUATION"))
        .stdout(predicates::str::contains("║ Documents:    3"));

    let rows = read_report(&report);
    let documents: Vec<&str> = rows
        .iter()
        .filter(|r| r["scope"] == "document")
        .map(|r| r["document"].as_str())
        .collect();
    assert_eq!(documents, vec!["page-1", "page-2", "page-3"]);

    let corpus = rows.iter().find(|r| r["scope"] == "corpus").unwrap();
    assert_eq!(corpus["documents"], "3");
    assert_eq!(corpus["reference_regions"], "3");
    assert_eq!(corpus["correct"], "1");
    assert_eq!(corpus["split"], "1");
    assert_eq!(corpus["missed"], "1");
    Ok(())
}

#[test]
fn test_batch_coco_files() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let reference_dir = dir.path().join("reference");
    let test_dir = dir.path().join("test");
    fs::create_dir_all(&reference_dir)?;
    fs::create_dir_all(&test_dir)?;

    let coco = |bbox: [f64; 4]| {
        json!({
            "images": [
                {"id": 1, "file_name": "a.png", "width": 100, "height": 100},
                {"id": 2, "file_name": "b.png", "width": 100, "height": 100}
            ],
            "categories": [{"id": 1, "name": "text"}],
            "annotations": [
                {"id": 1, "image_id": 1, "category_id": 1, "bbox": [0, 0, 10, 10]},
                {"id": 2, "image_id": 2, "category_id": 1, "bbox": bbox}
            ]
        })
        .to_string()
    };
    fs::write(reference_dir.join("instances.json"), coco([0.0, 0.0, 10.0, 10.0]))?;
    fs::write(test_dir.join("instances.json"), coco([50.0, 50.0, 10.0, 10.0]))?;
    let report = dir.path().join("coco.tsv");

    let mut cmd = Command::cargo_bin("segeval")?;
    cmd.arg("batch")
        .arg(&reference_dir)
        .arg(&test_dir)
        .arg("-o")
        .arg(&report);
    cmd.assert().success();

    let rows = read_report(&report);
    let corpus = rows.iter().find(|r| r["scope"] == "corpus").unwrap();
    assert_eq!(corpus["documents"], "2");
    assert_eq!(corpus["correct"], "1");
    assert_eq!(corpus["missed"], "1");
    assert_eq!(corpus["false_detection"], "1");
    Ok(())
}

#[test]
fn test_batch_duplicate_document_names_fail() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let reference_dir = dir.path().join("reference");
    let test_dir = dir.path().join("test");
    fs::create_dir_all(&reference_dir)?;
    fs::create_dir_all(test_dir.join("run-a"))?;
    fs::create_dir_all(test_dir.join("run-b"))?;

    for name in ["page-1.json", "page-2.json"] {
        write_shapes(
            &reference_dir.join(name),
            vec![rectangle("text", 0.0, 0.0, 10.0, 10.0)],
        );
    }
    // Same stem in two subdirectories of the test tree.
    for sub in ["run-a", "run-b"] {
        write_shapes(
            &test_dir.join(sub).join("page-1.json"),
            vec![rectangle("text", 0.0, 0.0, 10.0, 10.0)],
        );
    }

    let mut cmd = Command::cargo_bin("segeval")?;
    cmd.arg("batch").arg(&reference_dir).arg(&test_dir);
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("duplicate test document names: page-1"));
    Ok(())
}

#[test]
fn test_evaluate_lif_label_types() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let reference = dir.path().join("coins.lif");
    let test = dir.path().join("detected.lif");
    write_shapes(
        &reference,
        vec![
            rectangle("ca101", 0.0, 0.0, 10.0, 10.0),
            rectangle("t101", 20.0, 0.0, 10.0, 5.0),
        ],
    );
    write_shapes(
        &test,
        vec![
            rectangle("cr7", 0.0, 0.0, 10.0, 10.0),
            rectangle("t3", 20.0, 0.0, 10.0, 5.0),
        ],
    );
    let report = dir.path().join("report.tsv");

    let mut cmd = Command::cargo_bin("segeval")?;
    cmd.arg("evaluate")
        .arg(&reference)
        .arg(&test)
        .args(["-l", "text", "-o"])
        .arg(&report);
    cmd.assert().success();

    let rows = read_report(&report);
    assert_eq!(rows[0]["reference_regions"], "1");
    assert_eq!(rows[0]["test_regions"], "1");
    assert_eq!(rows[0]["correct"], "1");
    Ok(())
}

#[test]
fn test_evaluate_catinfo_boxes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let reference = dir.path().join("cat_info.xml");
    fs::write(
        &reference,
        r#"<coins><coin>
            <image face="avert" x="0" y="0" w="10" h="10" id="1"/>
            <label x="20" y="0" w="10" h="5" id="2"/>
        </coin></coins>"#,
    )?;
    let test = dir.path().join("detected.json");
    write_shapes(&test, vec![rectangle("coin", 0.0, 0.0, 10.0, 10.0)]);
    let report = dir.path().join("report.tsv");

    let mut cmd = Command::cargo_bin("segeval")?;
    cmd.arg("evaluate")
        .arg(&reference)
        .arg(&test)
        .arg("-o")
        .arg(&report);
    cmd.assert().success();

    let rows = read_report(&report);
    assert_eq!(rows[0]["reference_regions"], "2");
    assert_eq!(rows[0]["correct"], "1");
    assert_eq!(rows[0]["missed"], "1");
    Ok(())
}
