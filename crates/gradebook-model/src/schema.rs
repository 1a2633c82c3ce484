use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::row::RawRow;
use crate::value::GradeValue;

/// Errors that can occur when constructing a [`CourseSchema`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("course id cannot be empty")]
    EmptyCourseId,
    #[error("duplicate column id '{col_id}'")]
    DuplicateColId { col_id: String },
    #[error("duplicate column index {col_index} (columns '{first}' and '{second}')")]
    DuplicateColIndex {
        col_index: u32,
        first: String,
        second: String,
    },
    #[error("schema has no id column")]
    NoIdColumn,
    #[error("schema has multiple id columns ('{first}' and '{second}')")]
    MultipleIdColumns { first: String, second: String },
    #[error("calc column '{col_id}' references unknown column '{input}'")]
    UnknownFormulaInput { col_id: String, input: String },
    #[error("calc column '{col_id}' references calc column '{input}' at a later position")]
    ForwardCalcReference { col_id: String, input: String },
}

/// One weighted input of a [`Formula::WeightedSum`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weight {
    pub col: String,
    pub weight: f64,
}

/// One grading bucket of a [`Formula::Bucket`]: values at or above
/// `min` (and below any higher bucket) map to `grade`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cutoff {
    pub min: f64,
    pub grade: String,
}

/// Schema-declared computation for a calc column.
///
/// Formulas are data, not code: the derivation engine matches on this
/// enum exhaustively, so adding a variant is a compile-checked change
/// at every evaluation site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "fn", rename_all = "snake_case")]
pub enum Formula {
    /// Copy another column's value unchanged.
    Identity { col: String },
    /// Numeric mean over the named columns, optionally dropping the
    /// lowest `drop_lowest` values first.
    Average {
        cols: Vec<String>,
        #[serde(default)]
        drop_lowest: usize,
    },
    /// Sum of `value * weight` over the named columns.
    WeightedSum { weights: Vec<Weight> },
    /// Map another column's numeric value into a labeled bucket; the
    /// highest cutoff at or below the value wins.
    Bucket { col: String, cutoffs: Vec<Cutoff> },
}

impl Formula {
    /// Column ids this formula reads.
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            Formula::Identity { col } => vec![col.as_str()],
            Formula::Average { cols, .. } => cols.iter().map(String::as_str).collect(),
            Formula::WeightedSum { weights } => {
                weights.iter().map(|w| w.col.as_str()).collect()
            }
            Formula::Bucket { col, .. } => vec![col.as_str()],
        }
    }
}

/// Column kind plus its kind-specific payload.
///
/// A closed set: validation and derivation match on this exhaustively,
/// so every code path handling columns covers all four kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColKind {
    /// The row-identifying column (exactly one per schema).
    Id,
    /// Informational text (names, sections, emails).
    Info,
    /// Directly entered numeric score with inclusive bounds.
    Score { min: f64, max: f64 },
    /// Derived column; never directly writable.
    Calc { formula: Formula },
}

impl ColKind {
    pub fn is_calc(&self) -> bool {
        matches!(self, ColKind::Calc { .. })
    }

    pub fn is_id(&self) -> bool {
        matches!(self, ColKind::Id)
    }
}

/// Immutable definition of one grade-table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub col_id: String,
    /// Human-readable header, used only by presentation layers.
    pub name: String,
    /// Display/storage position; every emitted row lists its fields in
    /// ascending `col_index` order.
    pub col_index: u32,
    #[serde(flatten)]
    pub kind: ColKind,
}

/// Static per-course description of valid columns and their
/// constraints. Supplied at startup and read-only thereafter.
///
/// Columns are held in ascending `col_index` order; construction
/// validates id uniqueness, index uniqueness, the presence of exactly
/// one id column, and that calc formulas only reference known columns
/// at earlier positions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSchema {
    course_id: String,
    name: String,
    cols: Vec<ColumnSpec>,
    #[serde(skip)]
    by_id: HashMap<String, usize>,
    #[serde(skip)]
    row_id_col: String,
}

impl CourseSchema {
    pub fn new(
        course_id: impl Into<String>,
        name: impl Into<String>,
        mut cols: Vec<ColumnSpec>,
    ) -> Result<Self, SchemaError> {
        let course_id = course_id.into();
        if course_id.trim().is_empty() {
            return Err(SchemaError::EmptyCourseId);
        }
        cols.sort_by_key(|c| c.col_index);

        let mut by_id = HashMap::with_capacity(cols.len());
        let mut row_id_col: Option<&ColumnSpec> = None;
        for (i, col) in cols.iter().enumerate() {
            if by_id.insert(col.col_id.clone(), i).is_some() {
                return Err(SchemaError::DuplicateColId {
                    col_id: col.col_id.clone(),
                });
            }
            if let Some(prev) = cols[..i].iter().find(|p| p.col_index == col.col_index) {
                return Err(SchemaError::DuplicateColIndex {
                    col_index: col.col_index,
                    first: prev.col_id.clone(),
                    second: col.col_id.clone(),
                });
            }
            if col.kind.is_id() {
                if let Some(first) = row_id_col {
                    return Err(SchemaError::MultipleIdColumns {
                        first: first.col_id.clone(),
                        second: col.col_id.clone(),
                    });
                }
                row_id_col = Some(col);
            }
        }
        let row_id_col = row_id_col.ok_or(SchemaError::NoIdColumn)?.col_id.clone();

        // Calc formulas may read earlier calc columns (derivation runs
        // in col_index order) but never later ones.
        for col in &cols {
            let ColKind::Calc { formula } = &col.kind else {
                continue;
            };
            for input in formula.inputs() {
                let Some(&input_pos) = by_id.get(input) else {
                    return Err(SchemaError::UnknownFormulaInput {
                        col_id: col.col_id.clone(),
                        input: input.to_string(),
                    });
                };
                let input_col = &cols[input_pos];
                if input_col.kind.is_calc() && input_col.col_index >= col.col_index {
                    return Err(SchemaError::ForwardCalcReference {
                        col_id: col.col_id.clone(),
                        input: input.to_string(),
                    });
                }
            }
        }

        Ok(Self {
            course_id,
            name: name.into(),
            cols,
            by_id,
            row_id_col,
        })
    }

    pub fn course_id(&self) -> &str {
        &self.course_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All columns in ascending `col_index` order.
    pub fn cols(&self) -> &[ColumnSpec] {
        &self.cols
    }

    pub fn col(&self, col_id: &str) -> Option<&ColumnSpec> {
        self.by_id.get(col_id).map(|&i| &self.cols[i])
    }

    /// The designated row-identifying column.
    pub fn row_id_col(&self) -> &str {
        &self.row_id_col
    }

    /// Calc columns in ascending `col_index` order.
    pub fn calc_cols(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.cols.iter().filter(|c| c.kind.is_calc())
    }

    /// Build a row from `pairs` with fields sorted into this schema's
    /// `col_index` order. Callers validate column ids beforehand;
    /// unknown ids sort last in id order to keep the result total.
    pub fn ordered_row(&self, mut pairs: Vec<(String, GradeValue)>) -> RawRow {
        pairs.sort_by(|(a, _), (b, _)| {
            let ka = self.col(a).map(|c| c.col_index);
            let kb = self.col(b).map(|c| c.col_index);
            match (ka, kb) {
                (Some(ia), Some(ib)) => ia.cmp(&ib),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.cmp(b),
            }
        });
        RawRow::from_pairs(pairs)
    }
}

impl<'de> Deserialize<'de> for CourseSchema {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct SchemaDoc {
            course_id: String,
            name: String,
            cols: Vec<ColumnSpec>,
        }

        let doc = SchemaDoc::deserialize(deserializer)?;
        CourseSchema::new(doc.course_id, doc.name, doc.cols).map_err(serde::de::Error::custom)
    }
}

/// The startup-loaded, read-only set of recognized course schemas.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    courses: HashMap<String, Arc<CourseSchema>>,
}

impl SchemaRegistry {
    pub fn new(schemas: impl IntoIterator<Item = CourseSchema>) -> Self {
        let courses = schemas
            .into_iter()
            .map(|s| (s.course_id().to_string(), Arc::new(s)))
            .collect();
        Self { courses }
    }

    /// Parse a registry from a JSON array of course schemas.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let schemas: Vec<CourseSchema> = serde_json::from_str(json)?;
        Ok(Self::new(schemas))
    }

    pub fn get(&self, course_id: &str) -> Option<&Arc<CourseSchema>> {
        self.courses.get(course_id)
    }

    pub fn contains(&self, course_id: &str) -> bool {
        self.courses.contains_key(course_id)
    }

    pub fn course_ids(&self) -> impl Iterator<Item = &str> {
        self.courses.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}
