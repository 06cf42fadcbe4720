use makstat_rs::cube::{Cube, CubeError};
use makstat_rs::hierarchy::{HierarchyNode, build_hierarchy};
use makstat_rs::models::Dataset;

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
fn grouped_hierarchy_preserves_sums() {
    let cube = sample_cube();
    let tree = build_hierarchy(&cube, "Livestock", &[], &["Region", "Type"]).unwrap();

    assert_eq!(tree.name, "Livestock");
    assert_eq!(tree.total(), 100.0);
    assert_eq!(tree.children.len(), 2);

    let north = &tree.children[0];
    assert_eq!(north.name, "North");
    assert_eq!(north.total(), 30.0);
    let south = &tree.children[1];
    assert_eq!(south.name, "South");
    assert_eq!(south.total(), 70.0);

    // Leaves carry the per-type values under each region.
    assert_eq!(north.children[0].name, "Cattle");
    assert_eq!(north.children[0].value, Some(10.0));
    assert_eq!(south.children[1].name, "Sheep");
    assert_eq!(south.children[1].value, Some(40.0));
    assert_eq!(tree.leaf_count(), 4);
}

#[test]
fn fixed_selector_slices_before_grouping() {
    let cube = sample_cube();
    let tree = build_hierarchy(&cube, "root", &[("Region", "S")], &["Type"]).unwrap();
    assert_eq!(tree.total(), 70.0);
    assert_eq!(tree.children.len(), 2);
    assert_eq!(tree.children[0].value, Some(30.0));
}

#[test]
fn grouping_less_dims_aggregates_by_sum() {
    let cube = sample_cube();
    // Grouping only by Region folds the Type rows into one leaf each.
    let tree = build_hierarchy(&cube, "root", &[], &["Region"]).unwrap();
    assert_eq!(tree.children.len(), 2);
    assert_eq!(tree.children[0].value, Some(30.0));
    assert_eq!(tree.children[1].value, Some(70.0));
    assert_eq!(tree.total(), 100.0);
}

#[test]
fn flat_hierarchy_joins_labels() {
    let cube = sample_cube();
    let tree = build_hierarchy(&cube, "root", &[], &[]).unwrap();
    assert_eq!(tree.children.len(), 4);
    assert_eq!(tree.children[0].name, "North, 2023, Cattle");
    assert_eq!(tree.total(), 100.0);
}

#[test]
fn non_positive_leaves_are_pruned() {
    let v = serde_json::json!({
        "id": ["Region", "Type"],
        "size": [2, 2],
        "value": [5.0, null, 0.0, -2.0],
        "dimension": {
            "Region": {"category": {
                "index": {"N": 0, "S": 1},
                "label": {"N": "North", "S": "South"}
            }},
            "Type": {"category": {
                "index": {"C": 0, "S": 1},
                "label": {"C": "Cattle", "S": "Sheep"}
            }}
        }
    });
    let cube = Cube::from_dataset(Dataset::from_json(v).unwrap()).unwrap();
    let tree = build_hierarchy(&cube, "root", &[], &["Region", "Type"]).unwrap();

    // North keeps its single positive leaf; South vanishes entirely.
    assert_eq!(tree.children.len(), 1);
    assert_eq!(tree.children[0].name, "North");
    assert_eq!(tree.children[0].children.len(), 1);
    assert_eq!(tree.total(), 5.0);

    // Sum preservation against the filtered rows.
    let kept: f64 = cube
        .rows()
        .iter()
        .filter_map(|r| r.value)
        .filter(|v| *v > 0.0)
        .sum();
    assert_eq!(tree.total(), kept);
}

#[test]
fn unknown_grouping_dimension_is_an_error() {
    let cube = sample_cube();
    assert!(matches!(
        build_hierarchy(&cube, "root", &[], &["Nope"]),
        Err(CubeError::UnknownDimension(_))
    ));
}

#[test]
fn hierarchy_serializes_without_empty_members() {
    let node = HierarchyNode::branch("root", vec![HierarchyNode::leaf("a", 1.0)]);
    let text = serde_json::to_string(&node).unwrap();
    // Branches have no value, leaves have no children.
    assert_eq!(text, r#"{"name":"root","children":[{"name":"a","value":1.0}]}"#);
}
