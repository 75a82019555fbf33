//! Feature preprocessing fitted on the training slice.
//!
//! Numeric columns are imputed with the training median and standardized;
//! categorical columns are one-hot encoded with an extra column for values
//! never seen during fitting.

use ndarray::Array2;
use ronda_features::FeatureKind;
use ronda_traits::stats::{MIN_STD_THRESHOLD, mean, median, sample_std};
use ronda_traits::{FeatureMap, FeatureValue, Result, RondaError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Level that absorbs missing and unseen categories.
pub const UNKNOWN_LEVEL: &str = "__unknown__";

/// A named input column and its value type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumn {
    /// Feature name.
    pub name: String,
    /// Value type.
    pub kind: FeatureKind,
}

impl FeatureColumn {
    /// Create a column description.
    pub fn new(name: impl Into<String>, kind: FeatureKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct NumericTransform {
    name: String,
    median: f64,
    mean: f64,
    std: f64,
    scaled: bool,
}

impl NumericTransform {
    fn fit(name: &str, rows: &[&FeatureMap]) -> Self {
        let present: Vec<f64> = rows
            .iter()
            .filter_map(|row| row.get(name).and_then(FeatureValue::as_f64))
            .filter(|v| v.is_finite())
            .collect();
        let median = median(&present).unwrap_or(0.0);

        let imputed: Vec<f64> = rows.iter().map(|row| numeric(row, name).unwrap_or(median)).collect();
        let mean = mean(&imputed).unwrap_or(0.0);
        let std = sample_std(&imputed).unwrap_or(0.0);

        Self {
            name: name.to_string(),
            median,
            mean,
            std,
            scaled: std > MIN_STD_THRESHOLD,
        }
    }

    fn apply(&self, row: &FeatureMap) -> f64 {
        let v = numeric(row, &self.name).unwrap_or(self.median);
        if self.scaled {
            (v - self.mean) / self.std
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct OneHotEncoder {
    name: String,
    levels: Vec<String>,
}

impl OneHotEncoder {
    fn fit(name: &str, rows: &[&FeatureMap]) -> Self {
        let levels: BTreeSet<String> = rows.iter().filter_map(|row| label(row, name)).collect();
        Self {
            name: name.to_string(),
            levels: levels.into_iter().collect(),
        }
    }

    /// Output width, including the unknown column.
    fn width(&self) -> usize {
        self.levels.len() + 1
    }

    /// Column offset of the row's level, the unknown column when unseen.
    fn position(&self, row: &FeatureMap) -> usize {
        label(row, &self.name)
            .and_then(|l| self.levels.binary_search(&l).ok())
            .unwrap_or(self.levels.len())
    }

    fn output_names(&self) -> impl Iterator<Item = String> + '_ {
        self.levels
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(UNKNOWN_LEVEL))
            .map(move |level| format!("{}={level}", self.name))
    }
}

fn numeric(row: &FeatureMap, name: &str) -> Option<f64> {
    row.get(name)
        .and_then(FeatureValue::as_f64)
        .filter(|v| v.is_finite())
}

fn label(row: &FeatureMap, name: &str) -> Option<String> {
    match row.get(name)? {
        FeatureValue::Categorical(s) if !s.is_empty() => Some(s.clone()),
        FeatureValue::Categorical(_) => None,
        FeatureValue::Numeric(v) => v.map(|x| x.to_string()),
    }
}

/// Fitted column transform producing the design matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    columns: Vec<FeatureColumn>,
    numeric: Vec<NumericTransform>,
    categorical: Vec<OneHotEncoder>,
}

impl Preprocessor {
    /// Learn medians, scales and category levels from training rows.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::Model`] if there are no rows or no columns.
    pub fn fit(columns: &[FeatureColumn], rows: &[&FeatureMap]) -> Result<Self> {
        if rows.is_empty() {
            return Err(RondaError::Model("cannot fit preprocessing on zero rows".into()));
        }
        if columns.is_empty() {
            return Err(RondaError::Model("no feature columns selected".into()));
        }

        let numeric = columns
            .iter()
            .filter(|c| c.kind == FeatureKind::Numeric)
            .map(|c| NumericTransform::fit(&c.name, rows))
            .collect();
        let categorical = columns
            .iter()
            .filter(|c| c.kind == FeatureKind::Categorical)
            .map(|c| OneHotEncoder::fit(&c.name, rows))
            .collect();

        Ok(Self {
            columns: columns.to_vec(),
            numeric,
            categorical,
        })
    }

    /// Build the design matrix for `rows`.
    pub fn transform(&self, rows: &[&FeatureMap]) -> Array2<f64> {
        let width = self.n_outputs();
        let n_numeric = self.numeric.len();
        let mut x = Array2::<f64>::zeros((rows.len(), width));

        for (i, row) in rows.iter().enumerate() {
            for (j, t) in self.numeric.iter().enumerate() {
                x[[i, j]] = t.apply(row);
            }
            let mut offset = n_numeric;
            for encoder in &self.categorical {
                x[[i, offset + encoder.position(row)]] = 1.0;
                offset += encoder.width();
            }
        }
        x
    }

    /// Width of the design matrix.
    pub fn n_outputs(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(OneHotEncoder::width).sum::<usize>()
    }

    /// Input columns in the order they were given.
    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    /// Design-matrix column names: numeric names, then `feature=level`.
    pub fn output_names(&self) -> Vec<String> {
        self.numeric
            .iter()
            .map(|t| t.name.clone())
            .chain(self.categorical.iter().flat_map(OneHotEncoder::output_names))
            .collect()
    }

    /// Source feature of every design-matrix column.
    pub fn output_sources(&self) -> Vec<&str> {
        self.numeric
            .iter()
            .map(|t| t.name.as_str())
            .chain(
                self.categorical
                    .iter()
                    .flat_map(|e| std::iter::repeat_n(e.name.as_str(), e.width())),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(views: Option<f64>, lang: &str) -> FeatureMap {
        let mut map = FeatureMap::new();
        map.insert("duration_seconds".into(), FeatureValue::Numeric(views));
        map.insert("language".into(), FeatureValue::Categorical(lang.into()));
        map
    }

    fn columns() -> Vec<FeatureColumn> {
        vec![
            FeatureColumn::new("duration_seconds", FeatureKind::Numeric),
            FeatureColumn::new("language", FeatureKind::Categorical),
        ]
    }

    #[test]
    fn test_median_imputation_and_scaling() {
        let rows = [row(Some(1.0), "en"), row(Some(3.0), "en"), row(None, "es")];
        let refs: Vec<&FeatureMap> = rows.iter().collect();
        let pre = Preprocessor::fit(&columns(), &refs).unwrap();
        let x = pre.transform(&refs);

        // Imputed column is [1, 3, 2]: mean 2, sample std 1.
        assert_eq!(x[[0, 0]], -1.0);
        assert_eq!(x[[1, 0]], 1.0);
        assert_eq!(x[[2, 0]], 0.0);
    }

    #[test]
    fn test_one_hot_with_unknown_column() {
        let rows = [row(Some(1.0), "en"), row(Some(2.0), "es")];
        let refs: Vec<&FeatureMap> = rows.iter().collect();
        let pre = Preprocessor::fit(&columns(), &refs).unwrap();

        assert_eq!(
            pre.output_names(),
            vec![
                "duration_seconds",
                "language=en",
                "language=es",
                "language=__unknown__"
            ]
        );
        assert_eq!(
            pre.output_sources(),
            vec!["duration_seconds", "language", "language", "language"]
        );

        let unseen = row(Some(1.0), "fr");
        let x = pre.transform(&[&rows[0], &unseen]);
        assert_eq!(x.row(0).to_vec()[1..], [1.0, 0.0, 0.0]);
        assert_eq!(x.row(1).to_vec()[1..], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let rows = [row(Some(5.0), "en"), row(Some(5.0), "en")];
        let refs: Vec<&FeatureMap> = rows.iter().collect();
        let pre = Preprocessor::fit(&columns(), &refs).unwrap();
        let x = pre.transform(&[&row(Some(100.0), "en")]);
        assert_eq!(x[[0, 0]], 0.0);
    }

    #[test]
    fn test_all_missing_column() {
        let rows = [row(None, "en"), row(None, "en")];
        let refs: Vec<&FeatureMap> = rows.iter().collect();
        let pre = Preprocessor::fit(&columns(), &refs).unwrap();
        let x = pre.transform(&refs);
        assert!(x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_fit_requires_rows() {
        assert!(Preprocessor::fit(&columns(), &[]).is_err());
        let rows = [row(None, "en")];
        let refs: Vec<&FeatureMap> = rows.iter().collect();
        assert!(Preprocessor::fit(&[], &refs).is_err());
    }
}
