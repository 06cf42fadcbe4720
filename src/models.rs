use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Structural errors raised while normalizing a JSON-stat response.
///
/// These are boundary errors: a dataset that fails here is never handed to the
/// cube flattener.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("response is not a JSON object")]
    NotAnObject,
    #[error("missing `{0}` in JSON-stat response")]
    MissingField(&'static str),
    #[error("dimension `{0}` listed in `id` has no entry under `dimension`")]
    MissingDimension(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// The `category.index` member of a JSON-stat dimension.
///
/// PxWeb serializes this as an object (`{ code: position }`); other JSON-stat
/// producers use an array of codes in position order. Accept both.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CategoryIndex {
    Map(HashMap<String, usize>),
    List(Vec<String>),
}

/// Category codes and labels of one dimension.
#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    pub index: Option<CategoryIndex>,
    pub label: Option<HashMap<String, String>>,
}

/// One categorical axis of the cube (e.g. Region, Year).
#[derive(Debug, Clone, Deserialize)]
pub struct Dimension {
    pub label: Option<String>,
    pub category: Category,
}

/// Optional dimension roles (`time`, `geo`, `metric`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Role {
    pub time: Option<Vec<String>>,
    pub geo: Option<Vec<String>>,
    pub metric: Option<Vec<String>>,
}

/// The `value` member: either a dense row-major array with nulls for missing
/// observations, or a sparse object keyed by stringified flat index.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Values {
    Dense(Vec<Option<f64>>),
    Sparse(HashMap<String, Option<f64>>),
}

impl Values {
    /// Normalize to a dense array of `len` cells. A dense array is returned
    /// as-is (length mismatches are the cube validator's call to make); a
    /// sparse map fills unmentioned cells with `None`.
    pub fn densify(self, len: usize) -> Vec<Option<f64>> {
        match self {
            Values::Dense(v) => v,
            Values::Sparse(map) => {
                let mut out = vec![None; len];
                for (key, v) in map {
                    if let Ok(i) = key.parse::<usize>()
                        && i < len
                    {
                        out[i] = v;
                    }
                }
                out
            }
        }
    }
}

/// A JSON-stat dataset, normalized to the 2.0 shape (`id`/`size`/`value` at
/// the top level regardless of which version the producer spoke).
#[derive(Debug, Clone, Deserialize)]
pub struct Dataset {
    pub label: Option<String>,
    pub source: Option<String>,
    pub updated: Option<String>,
    pub id: Vec<String>,
    pub size: Vec<usize>,
    pub value: Values,
    pub dimension: HashMap<String, Dimension>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl Dataset {
    /// Parse a JSON-stat response.
    ///
    /// Accepts both JSON-stat 2.0 (`class: "dataset"`, top-level `id`/`size`)
    /// and the legacy 1.x bundle (`{ "dataset": { "dimension": { "id": [...],
    /// "size": [...], ... }, "value": [...] } }`) that older PxWeb exports
    /// still use. Missing structural members fail fast with a descriptive
    /// error rather than a generic serde message.
    pub fn from_json(v: Value) -> Result<Self, ParseError> {
        let obj = v.as_object().ok_or(ParseError::NotAnObject)?;
        if let Some(legacy) = obj.get("dataset") {
            return Self::from_legacy(legacy);
        }
        if !obj.contains_key("dimension") {
            return Err(ParseError::MissingField("dimension"));
        }
        if !obj.contains_key("id") {
            return Err(ParseError::MissingField("id"));
        }
        if !obj.contains_key("size") {
            return Err(ParseError::MissingField("size"));
        }
        if !obj.contains_key("value") {
            return Err(ParseError::MissingField("value"));
        }
        Ok(serde_json::from_value(v)?)
    }

    /// Lift a legacy 1.x `dataset` object into the 2.0 shape.
    fn from_legacy(ds: &Value) -> Result<Self, ParseError> {
        let obj = ds.as_object().ok_or(ParseError::NotAnObject)?;
        let dim_obj = obj
            .get("dimension")
            .and_then(Value::as_object)
            .ok_or(ParseError::MissingField("dimension"))?;

        let id: Vec<String> = serde_json::from_value(
            dim_obj
                .get("id")
                .cloned()
                .ok_or(ParseError::MissingField("id"))?,
        )?;
        let size: Vec<usize> = serde_json::from_value(
            dim_obj
                .get("size")
                .cloned()
                .ok_or(ParseError::MissingField("size"))?,
        )?;
        let value: Values = serde_json::from_value(
            obj.get("value")
                .cloned()
                .ok_or(ParseError::MissingField("value"))?,
        )?;
        let role: Option<Role> = dim_obj
            .get("role")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?;

        let mut dimension = HashMap::with_capacity(id.len());
        for code in &id {
            let d = dim_obj
                .get(code)
                .cloned()
                .ok_or_else(|| ParseError::MissingDimension(code.clone()))?;
            dimension.insert(code.clone(), serde_json::from_value(d)?);
        }

        Ok(Dataset {
            label: obj.get("label").and_then(Value::as_str).map(String::from),
            source: obj.get("source").and_then(Value::as_str).map(String::from),
            updated: obj.get("updated").and_then(Value::as_str).map(String::from),
            id,
            size,
            value,
            dimension,
            role,
        })
    }

    /// The `updated` timestamp, if present and RFC 3339 formatted.
    pub fn updated_time(&self) -> Option<chrono::DateTime<chrono::FixedOffset>> {
        self.updated
            .as_deref()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
    }
}

/// Table metadata returned by a GET on a PxWeb table URL.
#[derive(Debug, Clone, Deserialize)]
pub struct TableMeta {
    pub title: String,
    pub variables: Vec<Variable>,
}

/// One selectable variable (dimension) of a PxWeb table.
#[derive(Debug, Clone, Deserialize)]
pub struct Variable {
    pub code: String,
    pub text: String,
    pub values: Vec<String>,
    #[serde(rename = "valueTexts")]
    pub value_texts: Vec<String>,
    #[serde(default)]
    pub time: bool,
    #[serde(default)]
    pub elimination: bool,
}
