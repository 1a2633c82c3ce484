use gradebook_model::{Cutoff, Formula, GradeValue, RawRow};

/// Evaluate `formula` against the current values of `row`.
///
/// Pure: the row is never mutated. Missing or non-numeric inputs to
/// numeric formulas count as 0 (a blank homework is a zero, not an
/// error); a [`Formula::Bucket`] over a non-numeric source yields
/// [`GradeValue::Empty`].
pub fn eval(formula: &Formula, row: &RawRow) -> GradeValue {
    match formula {
        Formula::Identity { col } => row.get(col).cloned().unwrap_or(GradeValue::Empty),
        Formula::Average { cols, drop_lowest } => {
            let mut values: Vec<f64> = cols.iter().map(|c| num(row, c)).collect();
            values.sort_by(|a, b| a.total_cmp(b));
            let kept = &values[(*drop_lowest).min(values.len())..];
            if kept.is_empty() {
                return GradeValue::Num(0.0);
            }
            GradeValue::Num(kept.iter().sum::<f64>() / kept.len() as f64)
        }
        Formula::WeightedSum { weights } => GradeValue::Num(
            weights
                .iter()
                .map(|w| num(row, &w.col) * w.weight)
                .sum(),
        ),
        Formula::Bucket { col, cutoffs } => {
            let Some(value) = row.get(col).and_then(GradeValue::as_num) else {
                return GradeValue::Empty;
            };
            // Highest cutoff at or below the value wins; a value below
            // every cutoff falls into the lowest bucket.
            let mut best: Option<&Cutoff> = None;
            let mut lowest: Option<&Cutoff> = None;
            for cutoff in cutoffs {
                if value >= cutoff.min && best.map_or(true, |b| cutoff.min > b.min) {
                    best = Some(cutoff);
                }
                if lowest.map_or(true, |l| cutoff.min < l.min) {
                    lowest = Some(cutoff);
                }
            }
            match best.or(lowest) {
                Some(c) => GradeValue::Str(c.grade.clone()),
                None => GradeValue::Empty,
            }
        }
    }
}

fn num(row: &RawRow, col_id: &str) -> f64 {
    row.get(col_id).and_then(GradeValue::as_num).unwrap_or(0.0)
}
