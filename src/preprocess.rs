use crate::schema::{Cell, FeatureRow};
use anyhow::{bail, Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnTransform {
    Numeric {
        column: String,
        #[serde(default)]
        mean: f64,
        #[serde(default = "unit_scale")]
        scale: f64,
    },
    OneHot {
        column: String,
        categories: Vec<String>,
    },
}

fn unit_scale() -> f64 {
    1.0
}

impl ColumnTransform {
    pub fn column(&self) -> &str {
        match self {
            ColumnTransform::Numeric { column, .. } | ColumnTransform::OneHot { column, .. } => column,
        }
    }

    fn width(&self) -> usize {
        match self {
            ColumnTransform::Numeric { .. } => 1,
            ColumnTransform::OneHot { categories, .. } => categories.len(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct Preprocessor {
    transforms: Vec<ColumnTransform>,
}

impl Preprocessor {
    pub fn new(transforms: Vec<ColumnTransform>) -> Result<Self> {
        let pre = Self { transforms };
        pre.validate()?;
        Ok(pre)
    }

    /// Reject exports that could never transform a row.
    pub fn validate(&self) -> Result<()> {
        if self.transforms.is_empty() {
            bail!("preprocessor has no columns");
        }
        for t in &self.transforms {
            match t {
                ColumnTransform::Numeric { column, scale, .. } => {
                    if !scale.is_finite() || *scale == 0.0 {
                        bail!("column {column:?} has invalid scale {scale}");
                    }
                }
                ColumnTransform::OneHot { column, categories } => {
                    if categories.is_empty() {
                        bail!("column {column:?} has no categories");
                    }
                }
            }
        }
        Ok(())
    }

    pub fn input_columns(&self) -> impl Iterator<Item = &str> {
        self.transforms.iter().map(ColumnTransform::column)
    }

    pub fn n_features(&self) -> usize {
        self.transforms.iter().map(ColumnTransform::width).sum()
    }

    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.n_features());
        for t in &self.transforms {
            match t {
                ColumnTransform::Numeric { column, .. } => names.push(format!("num__{column}")),
                ColumnTransform::OneHot { column, categories } => {
                    names.extend(categories.iter().map(|cat| format!("cat__{column}_{cat}")));
                }
            }
        }
        names
    }

    pub fn transform(&self, row: &FeatureRow) -> Result<Vec<f64>> {
        let mut out = Vec::with_capacity(self.n_features());
        for t in &self.transforms {
            let column = t.column();
            let cell = row
                .get(column)
                .with_context(|| format!("input is missing column {column:?}"))?;
            match t {
                ColumnTransform::Numeric { mean, scale, .. } => {
                    let v = cell
                        .as_f64()
                        .with_context(|| format!("column {column:?} expects a number, got {cell}"))?;
                    out.push((v - mean) / scale);
                }
                ColumnTransform::OneHot { categories, .. } => {
                    let value = category_key(cell);
                    let hit = categories
                        .iter()
                        .position(|c| *c == value)
                        .with_context(|| format!("unknown category {value:?} for column {column:?}"))?;
                    out.extend((0..categories.len()).map(|i| if i == hit { 1.0 } else { 0.0 }));
                }
            }
        }
        Ok(out)
    }
}

fn category_key(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => s.clone(),
        other => other.to_string(),
    }
}
