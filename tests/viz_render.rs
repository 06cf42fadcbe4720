use std::fs;
use std::path::PathBuf;
use makstat_rs::cube::Cube;
use makstat_rs::models::Dataset;
use makstat_rs::viz::{self, ChartKind, ChartSpec, LegendMode};

fn sample_cube() -> Cube {
    let v = serde_json::json!({
        "label": "Добиток по региони",
        "id": ["Региони", "Година", "Добиток"],
        "size": [2, 2, 2],
        "value": [120.0, 80.0, 110.0, 95.0, 300.0, 50.0, 280.0, null],
        "dimension": {
            "Региони": {"category": {
                "index": {"MK001": 0, "MK002": 1},
                "label": {"MK001": "Вардарски", "MK002": "Пелагониски"}
            }},
            "Година": {"category": {
                "index": {"2022": 0, "2023": 1},
                "label": {"2022": "2022", "2023": "2023"}
            }},
            "Добиток": {"category": {
                "index": {"01": 0, "02": 1},
                "label": {"01": "Говеда", "02": "Овци"}
            }}
        },
        "role": {"time": ["Година"]}
    });
    Cube::from_dataset(Dataset::from_json(v).unwrap()).unwrap()
}

fn write_and_check<F: Fn(&PathBuf)>(maker: F, name: &str, ext: &str) {
    let tmp = std::env::temp_dir();
    let path: PathBuf = tmp.join(format!("makstat_viz_{}.{}", name, ext));
    maker(&path);
    let meta = fs::metadata(&path).expect("file created");
    assert!(meta.len() > 0, "chart has content");
    fs::remove_file(&path).ok();
}

#[test]
fn bar_chart_produces_file() {
    let cube = sample_cube();
    let spec = ChartSpec::new(ChartKind::Bar, "Региони")
        .fix("Година", "2023")
        .title("Добиток по региони, 2023")
        .locale("mk");
    write_and_check(
        |p| viz::render_chart(&cube, &spec, p, 800, 480).unwrap(),
        "bar",
        "svg",
    );
}

#[test]
fn line_chart_legend_modes_produce_files() {
    let cube = sample_cube();
    for (i, mode) in [LegendMode::Inside, LegendMode::Right, LegendMode::Bottom]
        .iter()
        .enumerate()
    {
        let spec = ChartSpec::new(ChartKind::Line, "Година")
            .series_dim("Добиток")
            .fix("Региони", "MK001")
            .legend(*mode);
        write_and_check(
            |p| viz::render_chart(&cube, &spec, p, 800, 480).unwrap(),
            &format!("line{}", i),
            "svg",
        );
    }
}

#[test]
fn heatmap_produces_file() {
    let cube = sample_cube();
    let spec = ChartSpec::new(ChartKind::Heatmap, "Региони")
        .series_dim("Добиток")
        .fix("Година", "2022");
    write_and_check(
        |p| viz::render_chart(&cube, &spec, p, 800, 480).unwrap(),
        "heatmap",
        "svg",
    );
}

#[test]
fn treemap_produces_file() {
    let cube = sample_cube();
    let spec = ChartSpec::new(ChartKind::Treemap, "Региони")
        .series_dim("Добиток")
        .fix("Година", "2023")
        .locale("mk");
    write_and_check(
        |p| viz::render_chart(&cube, &spec, p, 860, 500).unwrap(),
        "treemap",
        "svg",
    );
}

#[test]
fn flow_produces_file() {
    let cube = sample_cube();
    let spec = ChartSpec::new(ChartKind::Flow, "Региони")
        .series_dim("Добиток")
        .fix("Година", "2023");
    write_and_check(
        |p| viz::render_chart(&cube, &spec, p, 960, 480).unwrap(),
        "flow",
        "svg",
    );
}

#[test]
fn png_backend_works() {
    let cube = sample_cube();
    let spec = ChartSpec::new(ChartKind::Bar, "Добиток").fix("Година", "2022");
    write_and_check(
        |p| viz::render_chart(&cube, &spec, p, 640, 400).unwrap(),
        "bar",
        "png",
    );
}

#[test]
fn heatmap_without_series_dim_is_error() {
    let cube = sample_cube();
    let spec = ChartSpec::new(ChartKind::Heatmap, "Региони");
    let tmp = std::env::temp_dir().join("makstat_viz_invalid.svg");
    assert!(viz::render_chart(&cube, &spec, &tmp, 800, 480).is_err());
}

#[test]
fn unknown_dimension_is_error() {
    let cube = sample_cube();
    let spec = ChartSpec::new(ChartKind::Bar, "Нема");
    let tmp = std::env::temp_dir().join("makstat_viz_invalid2.svg");
    assert!(viz::render_chart(&cube, &spec, &tmp, 800, 480).is_err());
}
