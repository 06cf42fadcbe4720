use crate::cube::Row;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Grouping key: one category of the chosen dimension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub dimension: String,
    pub category: String,
}

/// Summary statistics for a group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub key: GroupKey,
    pub count: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

/// Compute grouped statistics over one dimension's categories.
///
/// Rows lacking the dimension are skipped; rows with a null value count as
/// missing. Categories whose rows are all missing still get a summary.
pub fn grouped_summary(rows: &[Row], dimension: &str) -> Vec<Summary> {
    let mut groups: BTreeMap<GroupKey, Vec<f64>> = BTreeMap::new();
    let mut missing: BTreeMap<GroupKey, usize> = BTreeMap::new();
    for r in rows {
        let Some(label) = r.label_for(dimension) else {
            continue;
        };
        let key = GroupKey {
            dimension: dimension.to_string(),
            category: label.to_string(),
        };
        match r.value {
            Some(v) => groups.entry(key).or_default().push(v),
            None => *missing.entry(key).or_default() += 1,
        }
    }

    let mut keys: Vec<GroupKey> = groups.keys().cloned().collect();
    for key in missing.keys() {
        if !groups.contains_key(key) {
            keys.push(key.clone());
        }
    }
    keys.sort();

    let mut out = Vec::with_capacity(keys.len());
    for key in keys {
        let mut vals = groups.remove(&key).unwrap_or_default();
        vals.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let count = vals.len();
        let min = vals.first().cloned();
        let max = vals.last().cloned();
        let mean = if count > 0 {
            Some(vals.iter().copied().sum::<f64>() / count as f64)
        } else {
            None
        };
        let median = if count == 0 {
            None
        } else if count % 2 == 1 {
            Some(vals[count / 2])
        } else {
            Some((vals[count / 2 - 1] + vals[count / 2]) / 2.0)
        };
        let miss = missing.get(&key).cloned().unwrap_or(0);
        out.push(Summary {
            key,
            count,
            missing: miss,
            min,
            max,
            mean,
            median,
        });
    }
    out
}
