//! Missing-value handling and standard scaling over datasets

use tracing::debug;

use crate::dataset::{Column, Dataset};
use crate::stats::{mean, median, population_std, present_values};
use crate::Result;

/// Fill missing values with the column median
///
/// Absent or non-numeric columns are skipped; an all-missing column stays
/// missing.
pub fn fill_missing_median<S: AsRef<str>>(dataset: &Dataset, columns: &[S]) -> Result<Dataset> {
    let mut out = dataset.clone();

    for name in columns.iter().map(AsRef::as_ref) {
        let Some(values) = dataset.column(name).and_then(Column::as_numeric) else {
            continue;
        };
        let Some(med) = median(&present_values(values)) else {
            continue;
        };
        let filled = values.iter().map(|v| Some(v.unwrap_or(med)));
        out.set_column(name, Column::from_options(filled))?;
        debug!(column = name, median = med, "filled missing values");
    }

    Ok(out)
}

/// Drop sparse columns, then every row that still has a missing value
///
/// A column is dropped when its missing ratio is strictly above `threshold`.
pub fn drop_missing(dataset: &Dataset, threshold: f64) -> Result<Dataset> {
    let n_rows = dataset.n_rows();
    let mut sparse = Vec::new();

    if n_rows > 0 {
        for name in dataset.column_names() {
            let column = dataset.require(name)?;
            if column.null_count() as f64 / n_rows as f64 > threshold {
                sparse.push(name.to_string());
            }
        }
    }

    let kept = dataset.drop_columns(&sparse);
    if kept.n_columns() == 0 {
        return Ok(kept);
    }

    let columns: Vec<&Column> = kept
        .column_names()
        .into_iter()
        .filter_map(|name| kept.column(name))
        .collect();
    let keep: Vec<bool> = (0..n_rows)
        .map(|row| columns.iter().all(|c| c.is_null(row) == Some(false)))
        .collect();

    let out = kept.filter_rows(&keep)?;
    debug!(
        dropped_columns = sparse.len(),
        dropped_rows = n_rows - out.n_rows(),
        "dropped missing data"
    );
    Ok(out)
}

/// Scale numeric columns to zero mean and unit population variance
///
/// Columns with zero or undefined spread are left as they are; missing
/// values stay missing.
pub fn normalize_data<S: AsRef<str>>(dataset: &Dataset, columns: &[S]) -> Result<Dataset> {
    let mut out = dataset.clone();

    for name in columns.iter().map(AsRef::as_ref) {
        let Some(values) = dataset.column(name).and_then(Column::as_numeric) else {
            continue;
        };
        let present = present_values(values);
        let (Some(mu), Some(sigma)) = (mean(&present), population_std(&present)) else {
            continue;
        };
        if sigma == 0.0 || !sigma.is_finite() {
            debug!(column = name, "zero spread, not scaled");
            continue;
        }
        let scaled = values.iter().map(|v| v.map(|x| (x - mu) / sigma));
        out.set_column(name, Column::from_options(scaled))?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_columns(
            "sample",
            vec![
                ("a", Column::from_options(vec![Some(1.0), None, Some(3.0), Some(10.0)])),
                ("b", Column::from_options(vec![None, None, None, Some(4.0)])),
                ("c", Column::text(["p", "q", "r", "s"])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_fill_missing_median() {
        let out = fill_missing_median(&sample(), &["a", "c", "absent"]).unwrap();
        assert_eq!(
            out.numeric("a").unwrap(),
            &[Some(1.0), Some(3.0), Some(3.0), Some(10.0)]
        );
        // untouched
        assert_eq!(out.numeric("b").unwrap(), sample().numeric("b").unwrap());
    }

    #[test]
    fn test_drop_missing_threshold() {
        let out = drop_missing(&sample(), 0.5).unwrap();
        // b is 75% missing and goes; row 1 still misses a
        assert_eq!(out.column_names(), vec!["a", "c"]);
        assert_eq!(out.numeric("a").unwrap(), &[Some(1.0), Some(3.0), Some(10.0)]);

        // ratio equal to the threshold is kept
        let out = drop_missing(&sample(), 0.75).unwrap();
        assert_eq!(out.n_columns(), 3);
        assert_eq!(out.n_rows(), 1);
    }

    #[test]
    fn test_drop_missing_empty_dataset() {
        let out = drop_missing(&Dataset::new("empty"), 0.5).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_normalize_data() {
        let ds = Dataset::from_columns(
            "n",
            vec![
                ("x", Column::from_options(vec![Some(1.0), Some(3.0), None])),
                ("k", Column::numeric([2.0, 2.0, 2.0])),
            ],
        )
        .unwrap();
        let out = normalize_data(&ds, &["x", "k"]).unwrap();
        assert_eq!(out.numeric("x").unwrap(), &[Some(-1.0), Some(1.0), None]);
        assert_eq!(out.numeric("k").unwrap(), ds.numeric("k").unwrap());
    }
}
