use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::errors::{ErrorAccumulator, ErrorKind, GradeErrors, TableResult};
use crate::row::{Patches, RawRow, RawTable};
use crate::schema::{ColKind, CourseSchema};
use crate::value::GradeValue;

/// Immutable snapshot of one course's current grade data.
///
/// Every mutating operation validates its arguments, accumulates any
/// violations across the whole batch, and on success returns a *new*
/// table sharing the schema; the receiver is never altered. A course
/// that has never been written starts as the empty table.
///
/// Invariants held by construction:
/// - every row's field set equals the active column set exactly;
/// - every row lists its fields in ascending schema `col_index` order;
/// - a row's id-column value is unique and equals its storage key;
/// - rows keep first-insertion order across all reads.
#[derive(Debug, Clone)]
pub struct GradesTable {
    schema: Arc<CourseSchema>,
    /// Columns currently materialized. Empty means "not yet
    /// established": the first upserted row adopts its own columns.
    active: BTreeSet<String>,
    rows: Vec<RawRow>,
    /// Row id -> position in `rows`.
    index: HashMap<String, usize>,
}

impl GradesTable {
    /// The empty table for a course: no active columns, no rows.
    pub fn empty(schema: Arc<CourseSchema>) -> Self {
        Self {
            schema,
            active: BTreeSet::new(),
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Reconstruct a table from persisted raw data, running the same
    /// validation as live upserts so a corrupt document can never
    /// produce an invariant-violating table.
    pub fn from_raw(schema: Arc<CourseSchema>, raw: RawTable) -> TableResult<Self> {
        let empty = Self::empty(schema);
        if raw.is_empty() {
            return Ok(empty);
        }
        empty.upsert_rows(raw)
    }

    pub fn schema(&self) -> &Arc<CourseSchema> {
        &self.schema
    }

    /// Active column ids (iteration order is id order; emitted rows
    /// order columns by schema `col_index`).
    pub fn active_col_ids(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(String::as_str)
    }

    pub fn rows(&self) -> impl Iterator<Item = &RawRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_row(&self, row_id: &str) -> bool {
        self.index.contains_key(row_id)
    }

    /// Add an empty column to the table.
    ///
    /// Errors (`BAD_ARG`): `col_id` is unknown to the schema, already
    /// active, or a calc column.
    pub fn add_column(&self, col_id: &str) -> TableResult<Self> {
        self.add_columns(&[col_id])
    }

    /// Add several empty columns at once; violations accumulate across
    /// the whole batch.
    pub fn add_columns<S: AsRef<str>>(&self, col_ids: &[S]) -> TableResult<Self> {
        let mut acc = ErrorAccumulator::new();
        let mut added: BTreeSet<String> = BTreeSet::new();
        for col_id in col_ids {
            let col_id = col_id.as_ref();
            let Some(spec) = self.schema.col(col_id) else {
                acc.add(ErrorKind::BadArg, format!("unknown column {col_id}"));
                continue;
            };
            if self.active.contains(col_id) || !added.insert(col_id.to_string()) {
                acc.add(
                    ErrorKind::BadArg,
                    format!("column {col_id} already in table"),
                );
                continue;
            }
            if spec.kind.is_calc() {
                acc.add(
                    ErrorKind::BadArg,
                    format!("calc column {col_id} cannot be added directly"),
                );
            }
        }
        acc.finish()?;

        let mut active = self.active.clone();
        active.extend(added.iter().cloned());
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut pairs = row.to_pairs();
                for col_id in &added {
                    pairs.push((col_id.clone(), GradeValue::Empty));
                }
                self.schema.ordered_row(pairs)
            })
            .collect();

        Ok(Self {
            schema: Arc::clone(&self.schema),
            active,
            rows,
            index: self.index.clone(),
        })
    }

    /// Insert `row` or replace the existing row with the same id.
    ///
    /// Errors: `BAD_ARG` for unknown/calc/extra/missing columns or a
    /// missing id value; `RANGE` for a score value outside its bounds.
    pub fn upsert_row(&self, row: RawRow) -> TableResult<Self> {
        self.upsert_rows(vec![row])
    }

    /// Upsert zero or more rows, collecting violations across the
    /// entire batch rather than failing on the first.
    ///
    /// If the table has no active columns yet, the first row's own
    /// columns establish the active set for the whole batch.
    pub fn upsert_rows(&self, rows: Vec<RawRow>) -> TableResult<Self> {
        let active: BTreeSet<String> = if self.active.is_empty() {
            match rows.first() {
                Some(first) => first.col_ids().map(str::to_string).collect(),
                None => return Ok(self.clone()),
            }
        } else {
            self.active.clone()
        };

        let mut acc = ErrorAccumulator::new();
        let mut validated: Vec<(String, RawRow)> = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(row_id) = self.validate_row(row, &active, &mut acc) {
                validated.push((row_id, self.schema.ordered_row(row.to_pairs())));
            }
        }
        acc.finish()?;

        let mut next = Self {
            schema: Arc::clone(&self.schema),
            active,
            rows: self.rows.clone(),
            index: self.index.clone(),
        };
        for (row_id, row) in validated {
            match next.index.get(&row_id) {
                Some(&pos) => next.rows[pos] = row,
                None => {
                    next.index.insert(row_id, next.rows.len());
                    next.rows.push(row);
                }
            }
        }
        Ok(next)
    }

    /// Validate one row against the active column set, pushing every
    /// violation into `acc`. Returns the row's id value when the row
    /// is well-formed enough to be applied.
    fn validate_row(
        &self,
        row: &RawRow,
        active: &BTreeSet<String>,
        acc: &mut ErrorAccumulator,
    ) -> Option<String> {
        let before = acc.len();

        let mut seen: HashSet<&str> = HashSet::with_capacity(row.len());
        let extra: Vec<&str> = row
            .col_ids()
            .filter(|id| !active.contains(*id))
            .collect();
        if !extra.is_empty() {
            acc.add(
                ErrorKind::BadArg,
                format!("new columns {}", extra.join(", ")),
            );
        }
        let missing: Vec<&str> = active
            .iter()
            .map(String::as_str)
            .filter(|id| row.get(id).is_none())
            .collect();
        if !missing.is_empty() {
            acc.add(
                ErrorKind::BadArg,
                format!("missing columns {}", missing.join(", ")),
            );
        }

        let mut row_id: Option<String> = None;
        for (col_id, value) in row.iter() {
            if !seen.insert(col_id) {
                acc.add(
                    ErrorKind::BadArg,
                    format!("duplicate column {col_id} in row"),
                );
                continue;
            }
            let Some(spec) = self.schema.col(col_id) else {
                acc.add(ErrorKind::BadArg, format!("unknown column {col_id}"));
                continue;
            };
            match &spec.kind {
                ColKind::Id => {
                    if let GradeValue::Str(s) = value {
                        row_id = Some(s.clone());
                    }
                }
                ColKind::Info => {}
                ColKind::Score { min, max } => {
                    check_score(col_id, value, *min, *max, acc);
                }
                ColKind::Calc { .. } => {
                    acc.add(
                        ErrorKind::BadArg,
                        format!("attempt to add data for calculated column {col_id}"),
                    );
                }
            }
        }

        if row_id.is_none() {
            acc.add(
                ErrorKind::BadArg,
                format!("no entry for ID column {}", self.schema.row_id_col()),
            );
        }

        // A row only applies when it contributed no errors at all.
        if acc.len() > before {
            return None;
        }
        row_id
    }

    /// Apply partial edits to existing rows' existing columns.
    ///
    /// Errors accumulate across all entries: `BAD_ARG` for a missing
    /// row, an inactive column, the id column, or a calc column;
    /// `RANGE` for an out-of-bounds score value. On success only the
    /// named fields of the named rows change.
    pub fn patch(&self, patches: &Patches) -> TableResult<Self> {
        let mut acc = ErrorAccumulator::new();
        for (row_id, cols) in patches {
            if !self.index.contains_key(row_id) {
                acc.add(
                    ErrorKind::BadArg,
                    format!("row {row_id} does not exist in table"),
                );
                continue;
            }
            for (col_id, value) in cols {
                if !self.active.contains(col_id) {
                    acc.add(
                        ErrorKind::BadArg,
                        format!("column {col_id} is not in table"),
                    );
                    continue;
                }
                // Active columns are schema-validated on entry.
                let spec = self
                    .schema
                    .col(col_id)
                    .expect("active column missing from schema");
                match &spec.kind {
                    ColKind::Id => {
                        acc.add(
                            ErrorKind::BadArg,
                            format!("cannot patch ID column {col_id}"),
                        );
                    }
                    ColKind::Calc { .. } => {
                        acc.add(
                            ErrorKind::BadArg,
                            format!("cannot patch calculated column {col_id}"),
                        );
                    }
                    ColKind::Score { min, max } => {
                        check_score(col_id, value, *min, *max, &mut acc);
                    }
                    ColKind::Info => {}
                }
            }
        }
        acc.finish()?;

        let mut rows = self.rows.clone();
        for (row_id, cols) in patches {
            let pos = self.index[row_id.as_str()];
            for (col_id, value) in cols {
                rows[pos].set(col_id.clone(), value.clone());
            }
        }

        Ok(Self {
            schema: Arc::clone(&self.schema),
            active: self.active.clone(),
            rows,
            index: self.index.clone(),
        })
    }

    /// All raw rows: columns in `col_index` order, rows in
    /// first-insertion order.
    pub fn raw_table(&self) -> RawTable {
        self.rows.clone()
    }

    /// One raw row by id. Errors with `NOT_FOUND` if absent.
    pub fn raw_row(&self, row_id: &str) -> TableResult<RawRow> {
        match self.index.get(row_id) {
            Some(&pos) => Ok(self.rows[pos].clone()),
            None => Err(GradeErrors::single(
                ErrorKind::NotFound,
                format!("unknown row id {row_id}"),
            )),
        }
    }
}

fn check_score(col_id: &str, value: &GradeValue, min: f64, max: f64, acc: &mut ErrorAccumulator) {
    match value {
        // Empty is the state of a freshly added column; it stays legal
        // until real data arrives.
        GradeValue::Empty => {}
        GradeValue::Num(v) => {
            if *v < min || *v > max {
                acc.add(
                    ErrorKind::Range,
                    format!("{col_id} value {v} out of range [{min}, {max}]"),
                );
            }
        }
        GradeValue::Str(s) => {
            acc.add(
                ErrorKind::BadArg,
                format!("{col_id} value '{s}' is not a number"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples;

    fn table() -> GradesTable {
        GradesTable::empty(Arc::new(samples::mini_course()))
    }

    fn row(id: &str, hw1: f64) -> RawRow {
        RawRow::from_pairs([
            ("id".to_string(), GradeValue::from(id)),
            ("hw1".to_string(), GradeValue::Num(hw1)),
        ])
    }

    #[test]
    fn first_upsert_establishes_active_columns() {
        let t = table().upsert_row(row("s1", 85.0)).unwrap();
        let active: Vec<_> = t.active_col_ids().collect();
        assert_eq!(active, ["hw1", "id"]);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn upsert_replaces_row_with_same_id() {
        let t = table().upsert_row(row("s1", 85.0)).unwrap();
        let t = t.upsert_row(row("s1", 90.0)).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(
            t.raw_row("s1").unwrap().get("hw1"),
            Some(&GradeValue::Num(90.0))
        );
    }

    #[test]
    fn upsert_does_not_mutate_receiver() {
        let t0 = table().upsert_row(row("s1", 85.0)).unwrap();
        let _t1 = t0.upsert_row(row("s2", 70.0)).unwrap();
        assert_eq!(t0.len(), 1);
        assert!(!t0.has_row("s2"));
    }

    #[test]
    fn batch_upsert_accumulates_errors_from_all_rows() {
        let bad1 = RawRow::from_pairs([("id", GradeValue::from("s1")), ("hw1", 150.0.into())]);
        let bad2 = RawRow::from_pairs([("id", GradeValue::Empty), ("hw1", 80.0.into())]);
        let errs = table().upsert_rows(vec![bad1, bad2]).unwrap_err();
        assert!(errs.contains(ErrorKind::Range));
        assert!(errs.contains(ErrorKind::BadArg));
    }

    #[test]
    fn calc_column_is_not_writable() {
        let bad = RawRow::from_pairs([
            ("id", GradeValue::from("s1")),
            ("hw1", 80.0.into()),
            ("avg", 99.0.into()),
        ]);
        let errs = table().upsert_row(bad).unwrap_err();
        assert!(errs.contains(ErrorKind::BadArg));
    }

    #[test]
    fn add_column_then_upsert_requires_it() {
        let t = GradesTable::empty(Arc::new(samples::langs_course()));
        let t = t
            .upsert_row(RawRow::from_pairs([
                ("studentId", GradeValue::from("s1")),
                ("hw1", 85.0.into()),
            ]))
            .unwrap()
            .add_column("hw2")
            .unwrap();
        // Existing row gained an empty cell for the new column.
        let r = t.raw_row("s1").unwrap();
        assert_eq!(r.get("hw2"), Some(&GradeValue::Empty));
        // A row without the new column is now short.
        let errs = t
            .upsert_row(RawRow::from_pairs([
                ("studentId", GradeValue::from("s2")),
                ("hw1", 70.0.into()),
            ]))
            .unwrap_err();
        assert!(errs.contains(ErrorKind::BadArg));
    }

    #[test]
    fn add_columns_rejects_dups_within_batch() {
        let errs = table().add_columns(&["hw1", "hw1"]).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(errs.contains(ErrorKind::BadArg));
    }

    #[test]
    fn raw_row_missing_is_not_found() {
        let errs = table().raw_row("nope").unwrap_err();
        assert!(errs.contains(ErrorKind::NotFound));
    }
}
