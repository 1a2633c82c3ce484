use gradebook_model::{ColKind, CourseSchema, GradesTable, RawRow, RawTable, TableResult};

use crate::eval::eval;

/// Compute the full row for `row`: every calc column of `schema`
/// evaluated and merged at its `col_index` position.
///
/// Calc columns evaluate in ascending `col_index` order, so a formula
/// may read calc columns earlier in the schema (e.g. a letter grade
/// bucketed from a weighted total). The source row is not mutated.
pub fn derive_row(row: &RawRow, schema: &CourseSchema) -> RawRow {
    let mut working = row.clone();
    for col in schema.calc_cols() {
        if let ColKind::Calc { formula } = &col.kind {
            let value = eval(formula, &working);
            working.set(col.col_id.clone(), value);
        }
    }
    schema.ordered_row(working.into_pairs())
}

/// The full table: raw rows plus computed calc columns, recomputed on
/// every call and never persisted. Row order matches the raw table.
pub fn full_table(table: &GradesTable) -> RawTable {
    let schema = table.schema();
    table.rows().map(|row| derive_row(row, schema)).collect()
}

/// One full row by id. Errors with `NOT_FOUND` if the row is absent.
pub fn full_row(table: &GradesTable, row_id: &str) -> TableResult<RawRow> {
    let raw = table.raw_row(row_id)?;
    Ok(derive_row(&raw, table.schema()))
}
