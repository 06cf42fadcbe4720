use makstat_rs::cube::{Cube, CubeError, compute_strides, flat_index};
use makstat_rs::models::Dataset;

/// The worked example: Region(2) × Year(1) × Type(2), values [10, 20, 30, 40].
fn sample_cube() -> Cube {
    let v = serde_json::json!({
        "label": "Livestock",
        "id": ["Region", "Year", "Type"],
        "size": [2, 1, 2],
        "value": [10.0, 20.0, 30.0, 40.0],
        "dimension": {
            "Region": {"category": {
                "index": {"N": 0, "S": 1},
                "label": {"N": "North", "S": "South"}
            }},
            "Year": {"category": {
                "index": {"2023": 0},
                "label": {"2023": "2023"}
            }},
            "Type": {"category": {
                "index": {"C": 0, "S": 1},
                "label": {"C": "Cattle", "S": "Sheep"}
            }}
        }
    });
    Cube::from_dataset(Dataset::from_json(v).unwrap()).unwrap()
}

#[test]
fn strides_are_last_dimension_fastest() {
    assert_eq!(compute_strides(&[2, 1, 2]), vec![2, 2, 1]);
    assert_eq!(compute_strides(&[4, 3, 2]), vec![6, 2, 1]);
    assert_eq!(compute_strides(&[7]), vec![1]);
    assert_eq!(compute_strides(&[]), Vec::<usize>::new());
}

#[test]
fn first_stride_spans_the_value_array() {
    let sizes = [4usize, 3, 2];
    let strides = compute_strides(&sizes);
    // The dimension with the largest stride spans the whole array.
    assert_eq!(strides[0] * sizes[0], sizes.iter().product::<usize>());
}

#[test]
fn flat_index_is_injective_and_bounded() {
    let sizes = [3usize, 2, 4];
    let strides = compute_strides(&sizes);
    let mut seen = std::collections::HashSet::new();
    let mut max = 0;
    for i in 0..sizes[0] {
        for j in 0..sizes[1] {
            for k in 0..sizes[2] {
                let idx = flat_index(&[i, j, k], &strides);
                assert!(seen.insert(idx), "duplicate flat index {}", idx);
                max = max.max(idx);
            }
        }
    }
    assert_eq!(seen.len(), sizes.iter().product::<usize>());
    assert_eq!(max, sizes.iter().product::<usize>() - 1);
}

#[test]
fn rows_enumerate_the_full_cartesian_product() {
    let cube = sample_cube();
    let rows = cube.rows();
    assert_eq!(rows.len(), 4);

    let flat: Vec<(String, String, String, Option<f64>)> = rows
        .iter()
        .map(|r| {
            (
                r.label_for("Region").unwrap().to_string(),
                r.label_for("Year").unwrap().to_string(),
                r.label_for("Type").unwrap().to_string(),
                r.value,
            )
        })
        .collect();
    assert_eq!(
        flat,
        vec![
            ("North".into(), "2023".into(), "Cattle".into(), Some(10.0)),
            ("North".into(), "2023".into(), "Sheep".into(), Some(20.0)),
            ("South".into(), "2023".into(), "Cattle".into(), Some(30.0)),
            ("South".into(), "2023".into(), "Sheep".into(), Some(40.0)),
        ]
    );
}

#[test]
fn out_of_range_lookup_is_absent_not_a_panic() {
    let cube = sample_cube();
    assert_eq!(cube.value_at(&[0, 0, 0]), Some(10.0));
    assert_eq!(cube.value_at(&[1, 0, 1]), Some(40.0));
    // Beyond a dimension's size, or with the wrong arity: absent.
    assert_eq!(cube.value_at(&[5, 0, 0]), None);
    assert_eq!(cube.value_at(&[0, 0, 9]), None);
    assert_eq!(cube.value_at(&[0, 0]), None);
}

#[test]
fn rows_where_pins_dimensions() {
    let cube = sample_cube();
    let rows = cube.rows_where(&[("Region", "S")]).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.label_for("Region") == Some("South")));
    assert_eq!(rows[0].value, Some(30.0));
    assert_eq!(rows[1].value, Some(40.0));

    assert!(matches!(
        cube.rows_where(&[("Nope", "x")]),
        Err(CubeError::UnknownDimension(_))
    ));
    assert!(matches!(
        cube.rows_where(&[("Region", "nope")]),
        Err(CubeError::UnknownCategory { .. })
    ));
}

#[test]
fn validation_rejects_inconsistent_datasets() {
    // Value array shorter than the size product.
    let short = serde_json::json!({
        "id": ["A"], "size": [3], "value": [1.0],
        "dimension": {"A": {"category": {
            "index": {"x": 0, "y": 1, "z": 2},
            "label": {"x": "X", "y": "Y", "z": "Z"}
        }}}
    });
    assert!(matches!(
        Cube::from_dataset(Dataset::from_json(short).unwrap()),
        Err(CubeError::ValueLengthMismatch {
            actual: 1,
            expected: 3
        })
    ));

    // Category indices with a hole are not a dense permutation.
    let holey = serde_json::json!({
        "id": ["A"], "size": [2], "value": [1.0, 2.0],
        "dimension": {"A": {"category": {
            "index": {"x": 0, "y": 2},
            "label": {"x": "X", "y": "Y"}
        }}}
    });
    assert!(matches!(
        Cube::from_dataset(Dataset::from_json(holey).unwrap()),
        Err(CubeError::SparseIndex { .. })
    ));

    // Declared size disagrees with the category count.
    let mismatched = serde_json::json!({
        "id": ["A"], "size": [3], "value": [1.0, 2.0, 3.0],
        "dimension": {"A": {"category": {
            "index": {"x": 0, "y": 1},
            "label": {"x": "X", "y": "Y"}
        }}}
    });
    assert!(matches!(
        Cube::from_dataset(Dataset::from_json(mismatched).unwrap()),
        Err(CubeError::CategorySizeMismatch { .. })
    ));

    // A dimension listed in `id` but missing from `dimension` would slip
    // through positional trust; the validator names it.
    let missing = serde_json::json!({
        "id": ["A", "B"], "size": [1, 1], "value": [1.0],
        "dimension": {"A": {"category": {"index": {"x": 0}, "label": {"x": "X"}}}}
    });
    assert!(matches!(
        Cube::from_dataset(Dataset::from_json(missing).unwrap()),
        Err(CubeError::MissingDimension(d)) if d == "B"
    ));
}

#[test]
fn null_values_survive_tabular_flattening() {
    let v = serde_json::json!({
        "id": ["A"], "size": [2], "value": [null, 3.5],
        "dimension": {"A": {"category": {
            "index": {"x": 0, "y": 1},
            "label": {"x": "X", "y": "Y"}
        }}}
    });
    let cube = Cube::from_dataset(Dataset::from_json(v).unwrap()).unwrap();
    let rows = cube.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].value, None);
    assert_eq!(rows[1].value, Some(3.5));
}
