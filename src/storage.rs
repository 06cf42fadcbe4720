use crate::cube::Row;
use crate::hierarchy::HierarchyNode;
use anyhow::{Result, bail};
use csv::WriterBuilder;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Save flattened rows as CSV with header: one column per dimension plus
/// `value`. Null values stay empty cells; all rows are kept, zeros included.
pub fn save_csv<P: AsRef<Path>>(rows: &[Row], path: P) -> Result<()> {
    let Some(first) = rows.first() else {
        bail!("no rows to save");
    };
    let mut wtr = WriterBuilder::new().from_path(path)?;
    let mut header: Vec<&str> = first.coords.iter().map(|c| c.dimension.as_str()).collect();
    header.push("value");
    wtr.write_record(&header)?;
    for r in rows {
        let mut record: Vec<String> = r.coords.iter().map(|c| c.label.clone()).collect();
        record.push(r.value.map(|v| v.to_string()).unwrap_or_default());
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save flattened rows as pretty JSON array.
pub fn save_json<P: AsRef<Path>>(rows: &[Row], path: P) -> Result<()> {
    let mut f = File::create(path)?;
    let s = serde_json::to_string_pretty(rows)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

/// Save a hierarchy as pretty JSON (the name/value/children shape treemap
/// and sankey consumers expect).
pub fn save_hierarchy_json<P: AsRef<Path>>(node: &HierarchyNode, path: P) -> Result<()> {
    let mut f = File::create(path)?;
    let s = serde_json::to_string_pretty(node)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::Coord;
    use tempfile::tempdir;

    fn row(region: &str, value: Option<f64>) -> Row {
        Row {
            coords: vec![Coord {
                dimension: "Регион".into(),
                code: region.into(),
                label: region.into(),
            }],
            value,
        }
    }

    #[test]
    fn write_csv_and_json() {
        let dir = tempdir().unwrap();
        let csvp = dir.path().join("x.csv");
        let jsonp = dir.path().join("x.json");
        let rows = vec![row("Пелагониски", Some(1.23)), row("Скопски", None)];
        save_csv(&rows, &csvp).unwrap();
        save_json(&rows, &jsonp).unwrap();
        let csv_text = std::fs::read_to_string(&csvp).unwrap();
        assert!(csv_text.starts_with("Регион,value"));
        assert!(csv_text.contains("Пелагониски,1.23"));
        assert!(jsonp.exists());
    }

    #[test]
    fn empty_rows_is_error() {
        let dir = tempdir().unwrap();
        assert!(save_csv(&[], dir.path().join("x.csv")).is_err());
    }

    #[test]
    fn write_hierarchy() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("tree.json");
        let node = HierarchyNode::branch(
            "Добиток",
            vec![HierarchyNode::leaf("Говеда", 10.0)],
        );
        save_hierarchy_json(&node, &p).unwrap();
        let text = std::fs::read_to_string(&p).unwrap();
        assert!(text.contains("Говеда"));
        assert!(!text.contains("children\": []"));
    }
}
