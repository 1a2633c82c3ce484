use std::collections::BTreeMap;
use std::sync::Arc;

use gradebook_engine::{full_row, full_table};
use gradebook_model::{samples, ErrorKind, GradeValue, GradesTable, RawRow};
use pretty_assertions::assert_eq;

#[test]
fn identity_calc_scenario() {
    // Schema: id, hw1 (score 0..100), avg (calc = identity(hw1)).
    let table = GradesTable::empty(Arc::new(samples::mini_course()));

    let table = table
        .upsert_row(RawRow::from_pairs([
            ("id", GradeValue::from("s1")),
            ("hw1", 85.0.into()),
        ]))
        .unwrap();

    let raw = table.raw_table();
    assert_eq!(
        raw,
        vec![RawRow::from_pairs([
            ("id", GradeValue::from("s1")),
            ("hw1", 85.0.into()),
        ])]
    );

    // An out-of-range patch fails with RANGE and changes nothing.
    let mut patches = BTreeMap::new();
    patches.insert("s1".to_string(), {
        let mut c = BTreeMap::new();
        c.insert("hw1".to_string(), GradeValue::Num(150.0));
        c
    });
    let errs = table.patch(&patches).unwrap_err();
    assert!(errs.contains(ErrorKind::Range));

    let full = full_table(&table);
    assert_eq!(
        full,
        vec![RawRow::from_pairs([
            ("id", GradeValue::from("s1")),
            ("hw1", 85.0.into()),
            ("avg", 85.0.into()),
        ])]
    );
}

#[test]
fn chained_calcs_evaluate_in_schema_order() {
    let table = GradesTable::empty(Arc::new(samples::langs_course()));
    let table = table
        .upsert_row(RawRow::from_pairs([
            ("studentId", GradeValue::from("s1")),
            ("lastName", GradeValue::from("Curie")),
            ("firstName", GradeValue::from("Marie")),
            ("section", GradeValue::from("A")),
            ("hw1", 100.0.into()),
            ("hw2", 90.0.into()),
            ("hw3", 50.0.into()),
            ("prj1", 50.0.into()),
            ("prj2", 40.0.into()),
        ]))
        .unwrap();

    let row = full_row(&table, "s1").unwrap();

    // hwAvg drops the lowest of {100, 90, 50}.
    assert_eq!(row.get("hwAvg"), Some(&GradeValue::Num(95.0)));
    assert_eq!(row.get("prjAvg"), Some(&GradeValue::Num(45.0)));
    // total = 0.4 * hwAvg + 1.2 * prjAvg = 38 + 54.
    assert_eq!(row.get("total"), Some(&GradeValue::Num(92.0)));
    // grade buckets the total, which itself is a calc column.
    assert_eq!(row.get("grade"), Some(&GradeValue::Str("A".to_string())));

    // Full rows list every schema column, in schema order.
    let ids: Vec<_> = row.col_ids().collect();
    assert_eq!(
        ids,
        [
            "studentId",
            "lastName",
            "firstName",
            "section",
            "hw1",
            "hw2",
            "hw3",
            "prj1",
            "prj2",
            "hwAvg",
            "prjAvg",
            "total",
            "grade"
        ]
    );
}

#[test]
fn full_table_is_recomputed_per_read() {
    let table = GradesTable::empty(Arc::new(samples::mini_course()));
    let t1 = table
        .upsert_row(RawRow::from_pairs([
            ("id", GradeValue::from("s1")),
            ("hw1", 60.0.into()),
        ]))
        .unwrap();

    let mut patches = BTreeMap::new();
    patches.insert("s1".to_string(), {
        let mut c = BTreeMap::new();
        c.insert("hw1".to_string(), GradeValue::Num(70.0));
        c
    });
    let t2 = t1.patch(&patches).unwrap();

    assert_eq!(full_table(&t1)[0].get("avg"), Some(&GradeValue::Num(60.0)));
    assert_eq!(full_table(&t2)[0].get("avg"), Some(&GradeValue::Num(70.0)));
}
