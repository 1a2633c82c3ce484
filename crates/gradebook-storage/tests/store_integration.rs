use std::collections::BTreeMap;

use gradebook_model::samples;
use gradebook_storage::{ErrorKind, GradeValue, GradesStore, Patches, RawRow};
use pretty_assertions::assert_eq;

fn store() -> GradesStore {
    GradesStore::open_in_memory(samples::registry()).expect("open store")
}

fn mini_row(id: &str, hw1: f64) -> RawRow {
    RawRow::from_pairs([("id", GradeValue::from(id)), ("hw1", hw1.into())])
}

fn one_patch(row_id: &str, col_id: &str, value: impl Into<GradeValue>) -> Patches {
    let mut cols = BTreeMap::new();
    cols.insert(col_id.to_string(), value.into());
    let mut patches = BTreeMap::new();
    patches.insert(row_id.to_string(), cols);
    patches
}

#[test]
fn unknown_course_id_is_bad_arg_with_no_side_effects() {
    let store = store();
    let errs = store.get_grades("cs999").unwrap_err();
    assert!(errs.contains(ErrorKind::BadArg));

    let errs = store.upsert_row("cs999", mini_row("s1", 80.0)).unwrap_err();
    assert!(errs.contains(ErrorKind::BadArg));
}

#[test]
fn unseen_course_reads_as_empty_table() {
    let store = store();
    let table = store.get_grades("mini").expect("read empty course");
    assert!(table.is_empty());
    assert_eq!(table.active_col_ids().count(), 0);
}

#[test]
fn upsert_persists_across_reads() {
    let store = store();
    store.upsert_row("mini", mini_row("s1", 85.0)).unwrap();
    store.upsert_row("mini", mini_row("s2", 70.0)).unwrap();

    let table = store.get_grades("mini").unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(
        table.raw_row("s1").unwrap(),
        RawRow::from_pairs([("id", GradeValue::from("s1")), ("hw1", 85.0.into())])
    );
}

#[test]
fn failed_validation_leaves_stored_state_untouched() {
    let store = store();
    store.upsert_row("mini", mini_row("s1", 85.0)).unwrap();

    // Out-of-range score aborts before the write step.
    let errs = store.upsert_row("mini", mini_row("s2", 500.0)).unwrap_err();
    assert!(errs.contains(ErrorKind::Range));

    let table = store.get_grades("mini").unwrap();
    assert_eq!(table.len(), 1);
    assert!(!table.has_row("s2"));
}

#[test]
fn patch_round_trips_through_the_store() {
    let store = store();
    store.upsert_row("mini", mini_row("s1", 85.0)).unwrap();

    let table = store.patch("mini", &one_patch("s1", "hw1", 95.0)).unwrap();
    assert_eq!(
        table.raw_row("s1").unwrap().get("hw1"),
        Some(&GradeValue::Num(95.0))
    );

    // The returned table matches what a fresh read sees.
    let reread = store.get_grades("mini").unwrap();
    assert_eq!(reread.raw_table(), table.raw_table());
}

#[test]
fn add_column_persists_empty_cells() {
    let store = store();
    store
        .upsert_row(
            "langs",
            RawRow::from_pairs([
                ("studentId", GradeValue::from("s1")),
                ("hw1", 80.0.into()),
            ]),
        )
        .unwrap();
    store.add_columns("langs", &["hw2", "section"]).unwrap();

    let table = store.get_grades("langs").unwrap();
    let row = table.raw_row("s1").unwrap();
    let ids: Vec<_> = row.col_ids().collect();
    assert_eq!(ids, ["studentId", "section", "hw1", "hw2"]);
    assert_eq!(row.get("hw2"), Some(&GradeValue::Empty));
}

#[test]
fn load_replaces_the_whole_document() {
    let store = store();
    store.upsert_row("mini", mini_row("s1", 85.0)).unwrap();

    store
        .load("mini", vec![mini_row("s9", 40.0)])
        .expect("load replacement table");

    let table = store.get_grades("mini").unwrap();
    assert_eq!(table.len(), 1);
    assert!(table.has_row("s9"));
    assert!(!table.has_row("s1"));
}

#[test]
fn load_validates_before_writing() {
    let store = store();
    store.upsert_row("mini", mini_row("s1", 85.0)).unwrap();

    let errs = store
        .load("mini", vec![mini_row("s2", -5.0)])
        .unwrap_err();
    assert!(errs.contains(ErrorKind::Range));

    let table = store.get_grades("mini").unwrap();
    assert!(table.has_row("s1"));
}

#[test]
fn clear_removes_every_course_document() {
    let store = store();
    store.upsert_row("mini", mini_row("s1", 85.0)).unwrap();
    store
        .upsert_row(
            "langs",
            RawRow::from_pairs([
                ("studentId", GradeValue::from("s1")),
                ("hw1", 80.0.into()),
            ]),
        )
        .unwrap();

    assert_eq!(store.clear().unwrap(), 2);
    assert!(store.get_grades("mini").unwrap().is_empty());
    assert_eq!(store.clear().unwrap(), 0);
}

#[test]
fn full_table_reads_compose_with_the_store() {
    let store = store();
    store.upsert_row("mini", mini_row("s1", 85.0)).unwrap();

    let table = store.get_grades("mini").unwrap();
    let full = gradebook_storage::full_table(&table);
    assert_eq!(
        full,
        vec![RawRow::from_pairs([
            ("id", GradeValue::from("s1")),
            ("hw1", 85.0.into()),
            ("avg", 85.0.into()),
        ])]
    );
}

// Documents the accepted lost-update anomaly of the baseline design:
// with no version token between read and write, two writers that both
// read before either writes resolve as last-write-wins.
#[test]
fn concurrent_wholesale_writes_lose_the_earlier_update() {
    let store = store();

    // Both writers observe the same (empty) persisted state...
    let seen_by_a = store.get_grades("mini").unwrap();
    let seen_by_b = store.get_grades("mini").unwrap();

    // ...and each derives its own successor table.
    let a = seen_by_a.upsert_row(mini_row("sA", 80.0)).unwrap();
    let b = seen_by_b.upsert_row(mini_row("sB", 90.0)).unwrap();

    // Writer A commits first, writer B second.
    store.load("mini", a.raw_table()).unwrap();
    store.load("mini", b.raw_table()).unwrap();

    // B's wholesale replace silently discarded A's row.
    let table = store.get_grades("mini").unwrap();
    assert!(table.has_row("sB"));
    assert!(!table.has_row("sA"));
}
