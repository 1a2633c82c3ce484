//! Example course schemas used by tests across the workspace.
//!
//! These mirror the kind of course configuration the system is fed at
//! startup: an id column, a few info columns, bounded score columns,
//! and calc columns for averages and letter grades.

use crate::schema::{ColKind, ColumnSpec, CourseSchema, Cutoff, Formula, SchemaRegistry, Weight};

fn col(col_id: &str, name: &str, col_index: u32, kind: ColKind) -> ColumnSpec {
    ColumnSpec {
        col_id: col_id.to_string(),
        name: name.to_string(),
        col_index,
        kind,
    }
}

/// Smallest useful schema: an id, one score, one identity calc.
pub fn mini_course() -> CourseSchema {
    CourseSchema::new(
        "mini",
        "Mini Course",
        vec![
            col("id", "Student ID", 0, ColKind::Id),
            col("hw1", "Homework 1", 1, ColKind::Score { min: 0.0, max: 100.0 }),
            col(
                "avg",
                "Average",
                2,
                ColKind::Calc {
                    formula: Formula::Identity {
                        col: "hw1".to_string(),
                    },
                },
            ),
        ],
    )
    .expect("mini course schema is valid")
}

/// A realistic course: info columns, homework and project scores,
/// chained averages, a weighted total, and a letter grade.
pub fn langs_course() -> CourseSchema {
    let avg = |cols: &[&str], drop_lowest: usize| Formula::Average {
        cols: cols.iter().map(|c| c.to_string()).collect(),
        drop_lowest,
    };
    let weight = |c: &str, w: f64| Weight {
        col: c.to_string(),
        weight: w,
    };
    let cutoff = |min: f64, grade: &str| Cutoff {
        min,
        grade: grade.to_string(),
    };

    CourseSchema::new(
        "langs",
        "Programming Languages",
        vec![
            col("studentId", "Student ID", 0, ColKind::Id),
            col("lastName", "Last Name", 1, ColKind::Info),
            col("firstName", "First Name", 2, ColKind::Info),
            col("section", "Section", 3, ColKind::Info),
            col("hw1", "Homework 1", 4, ColKind::Score { min: 0.0, max: 100.0 }),
            col("hw2", "Homework 2", 5, ColKind::Score { min: 0.0, max: 100.0 }),
            col("hw3", "Homework 3", 6, ColKind::Score { min: 0.0, max: 100.0 }),
            col("prj1", "Project 1", 7, ColKind::Score { min: 0.0, max: 50.0 }),
            col("prj2", "Project 2", 8, ColKind::Score { min: 0.0, max: 50.0 }),
            col(
                "hwAvg",
                "Homework Average",
                9,
                ColKind::Calc {
                    formula: avg(&["hw1", "hw2", "hw3"], 1),
                },
            ),
            col(
                "prjAvg",
                "Project Average",
                10,
                ColKind::Calc {
                    formula: avg(&["prj1", "prj2"], 0),
                },
            ),
            col(
                "total",
                "Course Total",
                11,
                ColKind::Calc {
                    formula: Formula::WeightedSum {
                        weights: vec![weight("hwAvg", 0.4), weight("prjAvg", 1.2)],
                    },
                },
            ),
            col(
                "grade",
                "Grade",
                12,
                ColKind::Calc {
                    formula: Formula::Bucket {
                        col: "total".to_string(),
                        cutoffs: vec![
                            cutoff(90.0, "A"),
                            cutoff(80.0, "B"),
                            cutoff(70.0, "C"),
                            cutoff(60.0, "D"),
                            cutoff(0.0, "F"),
                        ],
                    },
                },
            ),
        ],
    )
    .expect("langs course schema is valid")
}

/// Registry holding every sample course.
pub fn registry() -> SchemaRegistry {
    SchemaRegistry::new([mini_course(), langs_course()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_construct_and_register() {
        let reg = registry();
        assert_eq!(reg.len(), 2);
        assert!(reg.contains("mini"));
        assert_eq!(reg.get("langs").unwrap().row_id_col(), "studentId");
        assert!(reg.get("cs999").is_none());
    }

    #[test]
    fn sample_schema_json_round_trips() {
        let schema = langs_course();
        let json = serde_json::to_string(&schema).unwrap();
        let back: CourseSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }
}
