//! Build nested name/value/children trees from flattened rows, for treemap
//! and flow rendering or JSON export.

use crate::cube::{Cube, CubeError, Row};
use serde::Serialize;

/// A node of the hierarchy: branches carry children, leaves carry a value.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HierarchyNode {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    pub fn leaf(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
            children: Vec::new(),
        }
    }

    pub fn branch(name: impl Into<String>, children: Vec<HierarchyNode>) -> Self {
        Self {
            name: name.into(),
            value: None,
            children,
        }
    }

    /// Aggregate of the subtree: the sum of all leaf values.
    pub fn total(&self) -> f64 {
        if self.children.is_empty() {
            self.value.unwrap_or(0.0)
        } else {
            self.children.iter().map(HierarchyNode::total).sum()
        }
    }

    /// Number of leaves in the subtree.
    pub fn leaf_count(&self) -> usize {
        if self.children.is_empty() {
            1
        } else {
            self.children.iter().map(HierarchyNode::leaf_count).sum()
        }
    }
}

/// Partition a cube into a nested hierarchy.
///
/// `fixed` pins dimensions to a single category (e.g. a chosen year);
/// `groups` lists the dimension codes to nest by, outermost first. Null
/// values are coerced to 0 and rows with a non-positive resolved value are
/// dropped, so every leaf is positive and groups left with no qualifying
/// leaves are pruned. Rows not distinguished by the grouping dimensions
/// aggregate by summation.
///
/// With an empty `groups`, each surviving row becomes one leaf named by its
/// joined category labels (the flat treemap shape).
pub fn build_hierarchy(
    cube: &Cube,
    root_name: &str,
    fixed: &[(&str, &str)],
    groups: &[&str],
) -> Result<HierarchyNode, CubeError> {
    for g in groups {
        if cube.axis(g).is_none() {
            return Err(CubeError::UnknownDimension((*g).to_string()));
        }
    }
    let rows = cube.rows_where(fixed)?;
    let kept: Vec<&Row> = rows
        .iter()
        .filter(|r| r.value.unwrap_or(0.0) > 0.0)
        .collect();

    let children = if groups.is_empty() {
        kept.iter()
            .map(|r| {
                let name = r
                    .coords
                    .iter()
                    .map(|c| c.label.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                HierarchyNode::leaf(name, r.value.unwrap_or(0.0))
            })
            .collect()
    } else {
        partition(&kept, groups)
    };

    Ok(HierarchyNode::branch(root_name, children))
}

/// Group rows by the label of the first dimension in `groups`, preserving
/// first-seen order (category-index order), and recurse on the rest.
fn partition(rows: &[&Row], groups: &[&str]) -> Vec<HierarchyNode> {
    let Some((dim, rest)) = groups.split_first() else {
        return Vec::new();
    };

    let mut grouped: Vec<(String, Vec<&Row>)> = Vec::new();
    for r in rows {
        let Some(label) = r.label_for(dim) else {
            continue;
        };
        match grouped.iter_mut().find(|(l, _)| l == label) {
            Some((_, bucket)) => bucket.push(r),
            None => grouped.push((label.to_string(), vec![r])),
        }
    }

    grouped
        .into_iter()
        .filter_map(|(label, bucket)| {
            if rest.is_empty() {
                let v: f64 = bucket.iter().map(|r| r.value.unwrap_or(0.0)).sum();
                (v > 0.0).then(|| HierarchyNode::leaf(label, v))
            } else {
                let children = partition(&bucket, rest);
                (!children.is_empty()).then(|| HierarchyNode::branch(label, children))
            }
        })
        .collect()
}
