use crate::classes::ObesityClass;
use crate::error::{ClassError, ReportError};
use crate::model::Introspect;
use crate::schema::{Cell, FeatureRow, Field};
use parking_lot::Mutex;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const TARGET_COLUMNS: [&str; 2] = ["Obesity", "NObeyesdad"];

/// Columns that leak the target and were excluded from training.
const DROPPED_COLUMNS: [&str; 2] = ["Weight", "Height"];

pub const DEFAULT_TOP_FEATURES: usize = 10;
pub const DEFAULT_GRID_RESOLUTION: usize = 20;

/// Historical subjects, with columns renamed to the pipeline's names.
#[derive(Debug, Clone)]
pub struct Dataset {
    rows: Vec<FeatureRow>,
    targets: Vec<String>,
}

enum Slot {
    Feature(String),
    Target,
    Skip,
}

fn slot_for(header: &str) -> Slot {
    let header = header.trim();
    if TARGET_COLUMNS.contains(&header) {
        Slot::Target
    } else if DROPPED_COLUMNS.contains(&header) {
        Slot::Skip
    } else if header == "family_history_with_overweight" {
        Slot::Feature(Field::FamilyHistory.column().to_string())
    } else if let Some(field) = Field::from_dataset_column(header) {
        Slot::Feature(field.column().to_string())
    } else {
        Slot::Feature(header.to_string())
    }
}

impl Dataset {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| ReportError::Dataset(format!("{}: {e}", path.display())))?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ReportError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut slots: Vec<Slot> = rdr.headers()?.iter().map(slot_for).collect();
        // one target per row; later target columns are ignored
        let mut has_target = false;
        for slot in slots.iter_mut() {
            if matches!(slot, Slot::Target) {
                if has_target {
                    *slot = Slot::Skip;
                }
                has_target = true;
            }
        }
        if !has_target {
            return Err(ReportError::Dataset(format!(
                "no target column (expected one of {TARGET_COLUMNS:?})"
            )));
        }

        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let mut row = FeatureRow::new();
            for (slot, raw) in slots.iter().zip(record.iter()) {
                match slot {
                    Slot::Feature(name) => row.push(name.clone(), Cell::parse(raw)),
                    Slot::Target => targets.push(raw.trim().to_string()),
                    Slot::Skip => {}
                }
            }
            rows.push(row);
        }

        tracing::info!("loaded reference dataset: {} rows", rows.len());
        Ok(Self { rows, targets })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }
}

// ---------- Report outputs ----------

#[derive(Debug, Clone, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassCount {
    pub class_index: i64,
    pub code: &'static str,
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassDistribution {
    pub total: usize,
    pub classes: Vec<ClassCount>,
    /// Rows whose target label is not in the class table.
    pub unrecognized: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartialDependence {
    pub feature: String,
    pub target_class: i64,
    pub target_label: &'static str,
    pub grid: Vec<f64>,
    pub average: Vec<f64>,
    /// Dataset rows the preprocessor could not transform.
    pub skipped_rows: usize,
}

// ---------- Reporter ----------

pub struct Reporter {
    model: Arc<dyn Introspect>,
    dataset_path: Option<PathBuf>,
    dataset: Mutex<Option<Arc<Dataset>>>,
}

impl Reporter {
    pub fn new(model: Arc<dyn Introspect>, dataset_path: Option<PathBuf>) -> Self {
        Self {
            model,
            dataset_path,
            dataset: Mutex::new(None),
        }
    }

    pub fn with_dataset(model: Arc<dyn Introspect>, dataset: Dataset) -> Self {
        Self {
            model,
            dataset_path: None,
            dataset: Mutex::new(Some(Arc::new(dataset))),
        }
    }

    /// Load the dataset on first call and reuse it afterwards.
    pub fn dataset(&self) -> Result<Arc<Dataset>, ReportError> {
        let mut slot = self.dataset.lock();
        if let Some(ds) = slot.as_ref() {
            return Ok(ds.clone());
        }
        let path = self
            .dataset_path
            .as_ref()
            .ok_or_else(|| ReportError::Dataset("no dataset path configured".into()))?;
        let ds = Arc::new(Dataset::from_path(path)?);
        *slot = Some(ds.clone());
        Ok(ds)
    }

    pub fn has_dataset(&self) -> bool {
        self.dataset_path.is_some() || self.dataset.lock().is_some()
    }

    /// Most influential transformed features, strongest first.
    pub fn feature_importance(&self, top_n: usize) -> Result<Vec<FeatureImportance>, ReportError> {
        let importances = self
            .model
            .feature_importances()
            .ok_or(ReportError::Unsupported("feature importances"))?;
        let mut out: Vec<FeatureImportance> = self
            .model
            .feature_names()
            .into_iter()
            .zip(importances.iter().copied())
            .map(|(feature, importance)| FeatureImportance { feature, importance })
            .collect();
        out.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        out.truncate(top_n);
        Ok(out)
    }

    pub fn class_distribution(&self) -> Result<ClassDistribution, ReportError> {
        let ds = self.dataset()?;
        let mut counts = [0usize; ObesityClass::COUNT];
        let mut unrecognized = 0;
        for target in ds.targets() {
            match ObesityClass::from_code(target) {
                Some(class) => counts[class as usize] += 1,
                None => unrecognized += 1,
            }
        }
        Ok(ClassDistribution {
            total: ds.targets().len(),
            classes: ObesityClass::ALL
                .iter()
                .map(|c| ClassCount {
                    class_index: c.index(),
                    code: c.code(),
                    label: c.display_label(),
                    count: counts[*c as usize],
                })
                .collect(),
            unrecognized,
        })
    }

    /// Average predicted probability of `target` while one transformed
    /// feature is swept over a grid and every other feature keeps its
    /// dataset value.
    pub fn partial_dependence(
        &self,
        feature: &str,
        target: ObesityClass,
        grid_resolution: usize,
    ) -> Result<PartialDependence, ReportError> {
        let fi = self
            .model
            .feature_names()
            .iter()
            .position(|name| name == feature)
            .ok_or_else(|| ReportError::UnknownFeature(feature.to_string()))?;
        let slot = self
            .model
            .classes()
            .iter()
            .position(|&c| c == target.index())
            .ok_or(ClassError::UnknownIndex(target.index()))?;

        let ds = self.dataset()?;
        let mut matrix = Vec::with_capacity(ds.len());
        let mut skipped_rows = 0;
        for row in ds.rows() {
            match self.model.transform(row) {
                Ok(x) => matrix.push(x),
                Err(err) => {
                    tracing::debug!("skipping dataset row: {err:#}");
                    skipped_rows += 1;
                }
            }
        }
        if skipped_rows > 0 {
            tracing::warn!("{skipped_rows} dataset rows could not be transformed");
        }
        if matrix.is_empty() {
            return Err(ReportError::Dataset("no usable rows".into()));
        }

        let column: Vec<f64> = matrix.iter().map(|x| x[fi]).collect();
        let grid = grid_values(&column, grid_resolution.max(2));

        let mut average = Vec::with_capacity(grid.len());
        for &v in &grid {
            let mut sum = 0.0;
            for x in &matrix {
                let mut x = x.clone();
                x[fi] = v;
                let p = self.model.predict_proba(&x).map_err(ReportError::Model)?;
                sum += p[slot];
            }
            average.push(sum / matrix.len() as f64);
        }

        Ok(PartialDependence {
            feature: feature.to_string(),
            target_class: target.index(),
            target_label: target.display_label(),
            grid,
            average,
            skipped_rows,
        })
    }

    pub fn default_dependence_features() -> [String; 2] {
        [
            format!("num__{}", Field::PhysicalActivity.column()),
            format!("num__{}", Field::Vegetables.column()),
        ]
    }
}

/// Unique values when there are few of them, otherwise an evenly spaced
/// grid between the 5th and 95th percentiles.
fn grid_values(values: &[f64], resolution: usize) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);

    let mut unique = sorted.clone();
    unique.dedup();
    if unique.len() <= resolution {
        return unique;
    }

    let lo = percentile(&sorted, 0.05);
    let hi = percentile(&sorted, 0.95);
    let step = (hi - lo) / (resolution - 1) as f64;
    (0..resolution).map(|i| lo + step * i as f64).collect()
}

fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
