//! SQLite-backed durable storage for course grade tables.
//!
//! This crate is the surface consumers talk to. It exposes:
//! - idempotent schema creation on open
//! - [`GradesStore`]: per-course read-modify-write operations over a
//!   single-document-per-course store
//! - re-exports of the model types and the engine's full-table reads,
//!   so API handlers need only this crate
//!
//! Each operation performs at most one read and, on success, one
//! wholesale document replace; there is no cross-call locking (see the
//! [`GradesStore`] docs for the lost-update caveat).

mod schema;
mod store;

pub use store::{GradesDoc, GradesStore, StorageError};

pub use gradebook_engine::{derive_row, full_row, full_table};
pub use gradebook_model::{
    ColKind, ColumnSpec, CourseSchema, Cutoff, ErrorKind, Formula, GradeError, GradeErrors,
    GradeValue, GradesTable, Patches, RawRow, RawTable, SchemaError, SchemaRegistry, TableResult,
    Weight,
};
