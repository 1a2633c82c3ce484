use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gradebook_model::{
    CourseSchema, ErrorKind, GradeErrors, GradesTable, Patches, RawRow, RawTable, SchemaRegistry,
    TableResult,
};

use crate::schema;

/// Backing-store failure, converted to a single `DB` error entry at
/// the public boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StorageError> for GradeErrors {
    fn from(err: StorageError) -> Self {
        GradeErrors::single(ErrorKind::Db, err.to_string())
    }
}

/// Persisted document shape for one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradesDoc {
    pub course_id: String,
    pub raw_table: RawTable,
}

/// Durable per-course grade storage.
///
/// Every mutating operation is a read-modify-write sequence: validate
/// the course id against the schema registry (no I/O on failure), read
/// the persisted raw table (absence is the empty table), reconstruct
/// an immutable [`GradesTable`], apply the requested transformation,
/// and on success replace the persisted document wholesale. A failed
/// transformation writes nothing and propagates the identical error
/// set.
///
/// No concurrency token is carried between the read and the write, so
/// the sequence is not linearizable: two writers racing on the same
/// course id resolve as last-write-wins, silently discarding the
/// earlier update. Each individual write is still atomic at the
/// document level.
#[derive(Debug, Clone)]
pub struct GradesStore {
    conn: Arc<Mutex<Connection>>,
    registry: SchemaRegistry,
}

impl GradesStore {
    pub fn open_path(path: impl AsRef<Path>, registry: SchemaRegistry) -> TableResult<Self> {
        let conn = Connection::open(path).map_err(StorageError::from)?;
        Self::with_conn(conn, registry)
    }

    pub fn open_in_memory(registry: SchemaRegistry) -> TableResult<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        Self::with_conn(conn, registry)
    }

    fn with_conn(conn: Connection, registry: SchemaRegistry) -> TableResult<Self> {
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(StorageError::from)?;
        schema::init(&conn).map_err(StorageError::from)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            registry,
        })
    }

    /// The course schemas this store recognizes.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("storage mutex poisoned")
    }

    fn schema_for(&self, course_id: &str) -> TableResult<Arc<CourseSchema>> {
        self.registry.get(course_id).cloned().ok_or_else(|| {
            GradeErrors::single(ErrorKind::BadArg, format!("unknown course id {course_id}"))
        })
    }

    /// Set `course_id`'s grades to `raw_table` outright, replacing
    /// whatever was stored. The data runs through full table
    /// validation first; nothing is written if it fails.
    pub fn load(&self, course_id: &str, raw_table: RawTable) -> TableResult<GradesTable> {
        let schema = self.schema_for(course_id)?;
        let table = GradesTable::from_raw(schema, raw_table)?;
        self.write_table(&table)?;
        Ok(table)
    }

    /// Read-only: the current table for `course_id`; a course that was
    /// never written reads as the empty table.
    pub fn get_grades(&self, course_id: &str) -> TableResult<GradesTable> {
        let schema = self.schema_for(course_id)?;
        self.read_table(schema)
    }

    /// Insert or replace one row.
    pub fn upsert_row(&self, course_id: &str, row: RawRow) -> TableResult<GradesTable> {
        self.upsert_rows(course_id, vec![row])
    }

    /// Insert or replace zero or more rows; detects errors across all
    /// of them before writing anything.
    pub fn upsert_rows(&self, course_id: &str, rows: Vec<RawRow>) -> TableResult<GradesTable> {
        self.modify(course_id, |table| table.upsert_rows(rows))
    }

    /// Add an empty column to the stored table.
    pub fn add_column(&self, course_id: &str, col_id: &str) -> TableResult<GradesTable> {
        self.modify(course_id, |table| table.add_column(col_id))
    }

    /// Add several empty columns; violations accumulate across all.
    pub fn add_columns<S: AsRef<str>>(
        &self,
        course_id: &str,
        col_ids: &[S],
    ) -> TableResult<GradesTable> {
        self.modify(course_id, |table| table.add_columns(col_ids))
    }

    /// Apply partial edits to existing rows' existing columns.
    pub fn patch(&self, course_id: &str, patches: &Patches) -> TableResult<GradesTable> {
        self.modify(course_id, |table| table.patch(patches))
    }

    /// Remove all persisted course documents (maintenance/test path);
    /// returns how many were removed.
    pub fn clear(&self) -> TableResult<usize> {
        let removed = self
            .conn()
            .execute("DELETE FROM grades", [])
            .map_err(StorageError::from)?;
        Ok(removed)
    }

    /// The read-modify-write protocol shared by every mutating
    /// operation.
    fn modify<F>(&self, course_id: &str, op: F) -> TableResult<GradesTable>
    where
        F: FnOnce(&GradesTable) -> TableResult<GradesTable>,
    {
        let schema = self.schema_for(course_id)?;
        let current = self.read_table(schema)?;
        let next = op(&current)?;
        self.write_table(&next)?;
        Ok(next)
    }

    fn read_table(&self, schema: Arc<CourseSchema>) -> TableResult<GradesTable> {
        let doc = self.find_one(schema.course_id())?;
        match doc {
            Some(doc) => GradesTable::from_raw(schema, doc.raw_table),
            None => Ok(GradesTable::empty(schema)),
        }
    }

    fn write_table(&self, table: &GradesTable) -> Result<(), StorageError> {
        let doc = GradesDoc {
            course_id: table.schema().course_id().to_string(),
            raw_table: table.raw_table(),
        };
        self.upsert_replace(&doc)
    }

    /// find-one primitive: the stored document for `course_id`, if any.
    fn find_one(&self, course_id: &str) -> Result<Option<GradesDoc>, StorageError> {
        let conn = self.conn();
        let value: Option<serde_json::Value> = conn
            .query_row(
                "SELECT doc FROM grades WHERE course_id = ?1",
                params![course_id],
                |r| r.get(0),
            )
            .optional()?;
        match value {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// upsert-replace primitive: insert the document or overwrite the
    /// previous one wholesale.
    fn upsert_replace(&self, doc: &GradesDoc) -> Result<(), StorageError> {
        let value = serde_json::to_value(doc)?;
        self.conn().execute(
            r#"
            INSERT INTO grades (course_id, doc) VALUES (?1, ?2)
            ON CONFLICT(course_id) DO UPDATE SET doc = excluded.doc
            "#,
            params![doc.course_id, value],
        )?;
        Ok(())
    }
}
