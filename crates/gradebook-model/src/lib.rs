//! `gradebook-model` defines the core in-memory grade-table data model.
//!
//! The crate is intentionally self-contained so it can be reused by:
//! - the derivation engine (calc-column evaluation)
//! - the persistence layer (document reconstruction and replacement)
//! - API/UI boundaries via `serde` (JSON-safe schema)
//!
//! The centerpiece is [`GradesTable`], an immutable, schema-validated
//! snapshot of one course's data: every mutating operation returns a
//! fresh table and accumulates all validation errors across a batch
//! instead of failing on the first.

mod errors;
mod row;
pub mod samples;
mod schema;
mod table;
mod value;

pub use errors::{ErrorAccumulator, ErrorKind, GradeError, GradeErrors, TableResult};
pub use row::{Patches, RawRow, RawTable};
pub use schema::{
    ColKind, ColumnSpec, CourseSchema, Cutoff, Formula, SchemaError, SchemaRegistry, Weight,
};
pub use table::GradesTable;
pub use value::GradeValue;
