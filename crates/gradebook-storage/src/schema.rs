use rusqlite::Connection;

/// Idempotent schema setup, run on every open.
///
/// The store is a document store in shape: one row per course holding
/// the whole raw table as a JSON document, replaced wholesale on every
/// successful write.
pub(crate) fn init(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS grades (
          course_id TEXT PRIMARY KEY,
          doc JSON NOT NULL
        );
        "#,
    )?;
    Ok(())
}
