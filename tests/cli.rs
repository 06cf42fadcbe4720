use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn cli_shows_help() {
    let mut cmd = Command::cargo_bin("makstat").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("makstat"));
}

#[test]
fn get_from_input_file_saves_csv_and_plots() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cube.json");
    let out = dir.path().join("rows.csv");
    let plot = dir.path().join("chart.svg");

    let sample = serde_json::json!({
        "label": "Добиток по региони",
        "id": ["Региони", "Добиток"],
        "size": [2, 2],
        "value": [120.0, 80.0, 300.0, 50.0],
        "dimension": {
            "Региони": {"category": {
                "index": {"MK001": 0, "MK002": 1},
                "label": {"MK001": "Вардарски", "MK002": "Пелагониски"}
            }},
            "Добиток": {"category": {
                "index": {"01": 0, "02": 1},
                "label": {"01": "Говеда", "02": "Овци"}
            }}
        }
    });
    std::fs::write(&input, serde_json::to_string(&sample).unwrap()).unwrap();

    let mut cmd = Command::cargo_bin("makstat").unwrap();
    cmd.args([
        "get",
        "--input",
        input.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
        "--plot",
        plot.to_str().unwrap(),
        "--kind",
        "treemap",
        "--x-dim",
        "Региони",
        "--series-dim",
        "Добиток",
        "--stats",
        "--stats-by",
        "Добиток",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("count=2"));

    assert!(out.exists());
    assert!(plot.exists());
    let csv_text = std::fs::read_to_string(&out).unwrap();
    assert!(csv_text.starts_with("Региони,Добиток,value"));
}

#[test]
fn get_without_table_or_input_fails() {
    let mut cmd = Command::cargo_bin("makstat").unwrap();
    cmd.arg("get");
    cmd.assert().failure();
}

// Live test (opt-in): cargo test --features online
#[cfg(feature = "online")]
#[test]
fn fetch_online_livestock() {
    let mut cmd = Command::cargo_bin("makstat").unwrap();
    cmd.args([
        "get",
        "--table",
        "MakStat/Zemjodelstvo/Dobitok/175_ZemBroj_Reg_Dobitok_ml.px",
        "--stats",
    ]);
    cmd.assert().success();
}
