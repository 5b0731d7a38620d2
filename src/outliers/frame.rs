//! Column-wise outlier handling over whole datasets

use tracing::debug;

use super::{winsorize_series, OutlierMethod, RemovalRule};
use crate::dataset::{Column, Dataset};
use crate::utils::AnalysisError;
use crate::Result;

/// Substring identifying flag columns when no explicit set is given
pub const FLAG_MARKER: &str = "outlier";

/// Names of the flag columns produced by one or more flagging calls
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlagColumnSet(Vec<String>);

impl FlagColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    /// Add a name, ignoring duplicates
    pub fn push(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.contains(&name) {
            self.0.push(name);
        }
    }

    /// Union with another set, keeping first-seen order
    pub fn merge(mut self, other: &FlagColumnSet) -> Self {
        for name in &other.0 {
            self.push(name.clone());
        }
        self
    }

    /// Boolean columns whose name contains [`FLAG_MARKER`]
    ///
    /// This ties removal to the `{column}_outlier_*` naming used by
    /// [`flag_outliers_dataset`]; prefer passing the returned set explicitly.
    pub fn detect(dataset: &Dataset) -> Self {
        dataset
            .column_names()
            .into_iter()
            .filter(|name| name.contains(FLAG_MARKER))
            .filter(|name| dataset.column(name).and_then(Column::as_boolean).is_some())
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for FlagColumnSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = FlagColumnSet::new();
        for name in iter {
            set.push(name);
        }
        set
    }
}

impl<'a> IntoIterator for &'a FlagColumnSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Result of a flagging call: the new dataset plus the names it added
#[derive(Debug, Clone)]
pub struct Flagged {
    pub dataset: Dataset,
    pub flag_columns: FlagColumnSet,
}

fn select_columns(dataset: &Dataset, columns: Option<&[&str]>) -> Result<Vec<String>> {
    match columns {
        Some(names) => {
            dataset.require_all(names)?;
            Ok(names.iter().map(|n| n.to_string()).collect())
        }
        None => Ok(dataset.numeric_column_names()),
    }
}

/// Append one boolean flag column per numeric column
///
/// # Arguments
/// * `columns` - Columns to examine; `None` selects every numeric column.
///   Non-numeric names are skipped, absent names fail with `ColumnNotFound`
/// * `method` - Detection method and parameters
/// * `flag_suffix` - Overrides the method's default suffix
///
/// # Returns
/// A new dataset with `{column}_{suffix}` columns appended (or replaced when
/// already present) and the set of names written. The input is untouched.
pub fn flag_outliers_dataset(
    dataset: &Dataset,
    columns: Option<&[&str]>,
    method: OutlierMethod,
    flag_suffix: Option<&str>,
) -> Result<Flagged> {
    let selected = select_columns(dataset, columns)?;
    let suffix = flag_suffix.unwrap_or(method.default_suffix());

    let mut out = dataset.clone();
    let mut flag_columns = FlagColumnSet::new();

    for name in &selected {
        let Some(values) = dataset.column(name).and_then(Column::as_numeric) else {
            debug!(column = %name, "skipping non-numeric column");
            continue;
        };

        let mask = method.detect(values);
        let flag_name = format!("{}_{}", name, suffix);
        debug!(
            column = %name,
            %method,
            flagged = mask.count(),
            rows = mask.len(),
            "flagged outliers"
        );

        out.set_column(flag_name.clone(), Column::boolean(mask.into_vec()))?;
        flag_columns.push(flag_name);
    }

    Ok(Flagged {
        dataset: out,
        flag_columns,
    })
}

/// Drop rows marked by flag columns
///
/// # Arguments
/// * `flag_columns` - Boolean columns to combine; `None` falls back to
///   [`FlagColumnSet::detect`]
/// * `how` - `Any` drops a row if any flag is set, `All` only if every flag is set
///
/// # Returns
/// A new dataset with the retained rows and the original column set. An
/// empty flag selection returns an unchanged copy. Missing flag values count
/// as not set.
pub fn remove_outliers_dataset(
    dataset: &Dataset,
    flag_columns: Option<&FlagColumnSet>,
    how: RemovalRule,
) -> Result<Dataset> {
    let selected = match flag_columns {
        Some(set) => {
            dataset.require_all(set.names())?;
            set.clone()
        }
        None => FlagColumnSet::detect(dataset),
    };

    if selected.is_empty() {
        debug!("no flag columns selected, nothing removed");
        return Ok(dataset.clone());
    }

    let flags = selected
        .names()
        .iter()
        .map(|name| {
            let column = dataset.require(name)?;
            column.as_boolean().ok_or_else(|| {
                AnalysisError::invalid(format!(
                    "flag column '{}' is {}, expected boolean",
                    name,
                    column.dtype()
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let keep: Vec<bool> = (0..dataset.n_rows())
        .map(|row| !how.drops(flags.iter().map(|f| f[row].unwrap_or(false))))
        .collect();

    let out = dataset.filter_rows(&keep)?;
    debug!(
        %how,
        flags = selected.len(),
        removed = dataset.n_rows() - out.n_rows(),
        kept = out.n_rows(),
        "removed flagged rows"
    );
    Ok(out)
}

/// Winsorize each selected numeric column independently
///
/// `None` selects every numeric column; non-numeric names are left as is,
/// absent names fail with `ColumnNotFound`.
pub fn winsorize_dataset(
    dataset: &Dataset,
    columns: Option<&[&str]>,
    lower: f64,
    upper: f64,
) -> Result<Dataset> {
    let selected = select_columns(dataset, columns)?;
    let mut out = dataset.clone();

    for name in &selected {
        let Some(values) = dataset.column(name).and_then(Column::as_numeric) else {
            continue;
        };
        out.set_column(name.as_str(), Column::Numeric(winsorize_series(values, lower, upper)))?;
        debug!(column = %name, lower, upper, "winsorized column");
    }

    Ok(out)
}
