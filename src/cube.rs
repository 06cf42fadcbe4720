//! The cube flattener: turns a validated JSON-stat dataset into labeled rows.
//!
//! A cube is a flat row-major value array addressed by per-dimension strides
//! (last dimension fastest). Everything here is a pure, synchronous transform
//! over in-memory arrays; it is safe to call repeatedly for the same input.

use crate::models::{CategoryIndex, Dataset};
use ahash::AHashMap;
use serde::Serialize;
use thiserror::Error;

/// Validation errors raised when a dataset cannot be used as a cube.
#[derive(Debug, Error)]
pub enum CubeError {
    #[error("dimension `{0}` listed in `id` has no entry under `dimension`")]
    MissingDimension(String),
    #[error("`id` has {id} entries but `size` has {size}")]
    DimensionCountMismatch { id: usize, size: usize },
    #[error("dimension `{code}` declares {declared} categories but `size` says {expected}")]
    CategorySizeMismatch {
        code: String,
        declared: usize,
        expected: usize,
    },
    #[error("dimension `{code}` has neither a category index nor a single labeled category")]
    MissingIndex { code: String },
    #[error("dimension `{code}` category indices are not a dense permutation of 0..{size}")]
    SparseIndex { code: String, size: usize },
    #[error("value array has {actual} cells, expected {expected} (product of dimension sizes)")]
    ValueLengthMismatch { actual: usize, expected: usize },
    #[error("unknown dimension `{0}`")]
    UnknownDimension(String),
    #[error("dimension `{dimension}` has no category `{category}`")]
    UnknownCategory { dimension: String, category: String },
}

/// One category of a dimension: machine code plus human label.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryRef {
    pub code: String,
    pub label: String,
}

/// An ordered, validated view of one dimension.
#[derive(Debug, Clone)]
pub struct DimensionAxis {
    pub code: String,
    pub label: String,
    /// Categories in index order (the order the value array is laid out in).
    pub categories: Vec<CategoryRef>,
    positions: AHashMap<String, usize>,
}

impl DimensionAxis {
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Position of a category code along this axis.
    pub fn position(&self, category_code: &str) -> Option<usize> {
        self.positions.get(category_code).copied()
    }
}

/// One flattened observation: a coordinate per dimension plus the value.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Row {
    pub coords: Vec<Coord>,
    pub value: Option<f64>,
}

/// A row's position along one dimension.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Coord {
    pub dimension: String,
    pub code: String,
    pub label: String,
}

impl Row {
    /// The category label this row has for the given dimension code.
    pub fn label_for(&self, dimension_code: &str) -> Option<&str> {
        self.coords
            .iter()
            .find(|c| c.dimension == dimension_code)
            .map(|c| c.label.as_str())
    }

    /// The category code this row has for the given dimension code.
    pub fn code_for(&self, dimension_code: &str) -> Option<&str> {
        self.coords
            .iter()
            .find(|c| c.dimension == dimension_code)
            .map(|c| c.code.as_str())
    }
}

/// Per-dimension strides for a row-major layout, last dimension fastest:
/// `stride[last] = 1`, `stride[i] = stride[i+1] * size[i+1]`.
pub fn compute_strides(sizes: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; sizes.len()];
    for i in (0..sizes.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * sizes[i + 1];
    }
    strides
}

/// Flat-array address of one category-index combination.
pub fn flat_index(indices: &[usize], strides: &[usize]) -> usize {
    indices.iter().zip(strides).map(|(i, s)| i * s).sum()
}

/// A validated multidimensional dataset ready for flattening.
#[derive(Debug, Clone)]
pub struct Cube {
    label: Option<String>,
    source: Option<String>,
    axes: Vec<DimensionAxis>,
    strides: Vec<usize>,
    values: Vec<Option<f64>>,
}

impl Cube {
    /// Validate a dataset and build the cube.
    ///
    /// The declared dimension order is checked, not trusted: every `id` entry
    /// must have a dimension object, each dimension's category count must
    /// match `size`, category indices must be a dense permutation of
    /// `[0, size)`, and the value array length must equal the product of the
    /// sizes.
    pub fn from_dataset(ds: Dataset) -> Result<Self, CubeError> {
        if ds.id.len() != ds.size.len() {
            return Err(CubeError::DimensionCountMismatch {
                id: ds.id.len(),
                size: ds.size.len(),
            });
        }

        let expected: usize = ds.size.iter().product();
        let values = ds.value.densify(expected);
        if values.len() != expected {
            return Err(CubeError::ValueLengthMismatch {
                actual: values.len(),
                expected,
            });
        }

        let mut axes = Vec::with_capacity(ds.id.len());
        for (code, &size) in ds.id.iter().zip(&ds.size) {
            let dim = ds
                .dimension
                .get(code)
                .ok_or_else(|| CubeError::MissingDimension(code.clone()))?;
            let codes = ordered_codes(code, &dim.category.index, dim.category.label.as_ref())?;
            if codes.len() != size {
                return Err(CubeError::CategorySizeMismatch {
                    code: code.clone(),
                    declared: codes.len(),
                    expected: size,
                });
            }
            let labels = dim.category.label.as_ref();
            let categories: Vec<CategoryRef> = codes
                .into_iter()
                .map(|c| {
                    let label = labels
                        .and_then(|m| m.get(&c))
                        .cloned()
                        .unwrap_or_else(|| c.clone());
                    CategoryRef { code: c, label }
                })
                .collect();
            let positions: AHashMap<String, usize> = categories
                .iter()
                .enumerate()
                .map(|(i, c)| (c.code.clone(), i))
                .collect();
            axes.push(DimensionAxis {
                code: code.clone(),
                label: dim.label.clone().unwrap_or_else(|| code.clone()),
                categories,
                positions,
            });
        }

        let strides = compute_strides(&ds.size);
        Ok(Cube {
            label: ds.label,
            source: ds.source,
            axes,
            strides,
            values,
        })
    }

    /// Dataset label, if the producer supplied one.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Dimension axes in declared (`id`) order.
    pub fn axes(&self) -> &[DimensionAxis] {
        &self.axes
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Number of cells in the value array.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Axis lookup by dimension code.
    pub fn axis(&self, code: &str) -> Option<&DimensionAxis> {
        self.axes.iter().find(|a| a.code == code)
    }

    fn axis_position(&self, code: &str) -> Option<usize> {
        self.axes.iter().position(|a| a.code == code)
    }

    /// Resolve one category-index combination to its value.
    ///
    /// Out-of-range indices resolve to "value absent" (`None`), never a
    /// panic; consumers that need a number coerce to 0.
    pub fn value_at(&self, indices: &[usize]) -> Option<f64> {
        if indices.len() != self.axes.len() {
            return None;
        }
        for (i, axis) in indices.iter().zip(&self.axes) {
            if *i >= axis.len() {
                return None;
            }
        }
        self.values
            .get(flat_index(indices, &self.strides))
            .copied()
            .flatten()
    }

    /// Flatten the full Cartesian product of all dimension categories, in
    /// declared dimension order and category-index order. Produces exactly
    /// `Π size[d]` rows; null values are preserved.
    pub fn rows(&self) -> Vec<Row> {
        let candidates: Vec<Vec<usize>> =
            self.axes.iter().map(|a| (0..a.len()).collect()).collect();
        self.emit_rows(&candidates)
    }

    /// Flatten with some dimensions pinned to a category code (the fixed
    /// selector role, e.g. a chosen year). Unknown dimensions or categories
    /// are errors; the remaining dimensions iterate as in [`Cube::rows`].
    pub fn rows_where(&self, fixed: &[(&str, &str)]) -> Result<Vec<Row>, CubeError> {
        let mut candidates: Vec<Vec<usize>> =
            self.axes.iter().map(|a| (0..a.len()).collect()).collect();
        for (dim, category) in fixed {
            let pos = self
                .axis_position(dim)
                .ok_or_else(|| CubeError::UnknownDimension((*dim).to_string()))?;
            let idx = self.axes[pos].position(category).ok_or_else(|| {
                CubeError::UnknownCategory {
                    dimension: (*dim).to_string(),
                    category: (*category).to_string(),
                }
            })?;
            candidates[pos] = vec![idx];
        }
        Ok(self.emit_rows(&candidates))
    }

    fn emit_rows(&self, candidates: &[Vec<usize>]) -> Vec<Row> {
        let total: usize = candidates.iter().map(|c| c.len()).product();
        let mut out = Vec::with_capacity(total);
        if candidates.iter().any(|c| c.is_empty()) {
            return out;
        }
        let mut odometer = vec![0usize; candidates.len()];
        loop {
            let indices: Vec<usize> = odometer
                .iter()
                .zip(candidates)
                .map(|(&k, c)| c[k])
                .collect();
            let coords = indices
                .iter()
                .zip(&self.axes)
                .map(|(&i, axis)| {
                    let cat = &axis.categories[i];
                    Coord {
                        dimension: axis.code.clone(),
                        code: cat.code.clone(),
                        label: cat.label.clone(),
                    }
                })
                .collect();
            out.push(Row {
                coords,
                value: self.value_at(&indices),
            });

            // Advance the odometer, last dimension fastest.
            let mut d = candidates.len();
            loop {
                if d == 0 {
                    return out;
                }
                d -= 1;
                odometer[d] += 1;
                if odometer[d] < candidates[d].len() {
                    break;
                }
                odometer[d] = 0;
            }
        }
    }
}

/// Category codes of one dimension in index order.
fn ordered_codes(
    dim_code: &str,
    index: &Option<CategoryIndex>,
    labels: Option<&std::collections::HashMap<String, String>>,
) -> Result<Vec<String>, CubeError> {
    match index {
        Some(CategoryIndex::List(codes)) => Ok(codes.clone()),
        Some(CategoryIndex::Map(map)) => {
            let n = map.len();
            let mut slots: Vec<Option<String>> = vec![None; n];
            for (code, &pos) in map {
                if pos >= n || slots[pos].is_some() {
                    return Err(CubeError::SparseIndex {
                        code: dim_code.to_string(),
                        size: n,
                    });
                }
                slots[pos] = Some(code.clone());
            }
            // All slots filled: the indices are a dense permutation of 0..n.
            Ok(slots.into_iter().flatten().collect())
        }
        None => {
            // JSON-stat allows omitting the index for single-category
            // dimensions; anything else is malformed.
            match labels {
                Some(m) if m.len() == 1 => Ok(m.keys().cloned().collect()),
                _ => Err(CubeError::MissingIndex {
                    code: dim_code.to_string(),
                }),
            }
        }
    }
}
