use crate::preprocess::Preprocessor;
use crate::schema::FeatureRow;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

/// Anything that can score a single named-column row.
///
/// The adapter never looks past this method, so tests can stand in a fake.
pub trait Pipeline: Send + Sync {
    fn predict(&self, row: &FeatureRow) -> Result<i64>;
}

/// Model internals used by the explanatory reports.
pub trait Introspect: Send + Sync {
    fn feature_names(&self) -> Vec<String>;
    fn feature_importances(&self) -> Option<&[f64]>;
    /// Apply the fitted preprocessing step to a raw row.
    fn transform(&self, row: &FeatureRow) -> Result<Vec<f64>>;
    /// Class probabilities for an already transformed feature vector.
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>>;
    fn classes(&self) -> &[i64];
}

#[derive(Debug, Deserialize)]
struct TreeJson {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    /// Per-node class weights; only leaves are read.
    value: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct ForestJson {
    preprocessor: Preprocessor,
    classes: Vec<i64>,
    trees: Vec<TreeJson>,
    #[serde(default)]
    feature_importances: Option<Vec<f64>>,
}

#[derive(Debug)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf(Vec<f64>),
}

#[derive(Debug)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_json(t: TreeJson, n_features: usize, n_classes: usize) -> Result<Self> {
        let n = t.children_left.len();
        if n == 0 {
            bail!("tree has no nodes");
        }
        if [t.children_right.len(), t.feature.len(), t.threshold.len(), t.value.len()]
            .iter()
            .any(|&len| len != n)
        {
            bail!("tree node arrays have different lengths");
        }

        let child = |idx: i64, at: usize| -> Result<usize> {
            match usize::try_from(idx) {
                Ok(c) if c < n && c > at => Ok(c),
                _ => bail!("node {at} has invalid child {idx}"),
            }
        };

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            if t.children_left[i] < 0 {
                let weights = &t.value[i];
                if weights.len() != n_classes {
                    bail!("leaf {i} has {} class weights, expected {n_classes}", weights.len());
                }
                let total: f64 = weights.iter().sum();
                if !(total > 0.0) {
                    bail!("leaf {i} has no weight");
                }
                nodes.push(Node::Leaf(weights.iter().map(|w| w / total).collect()));
            } else {
                let feature = usize::try_from(t.feature[i])
                    .ok()
                    .filter(|&f| f < n_features)
                    .with_context(|| format!("node {i} splits on unknown feature {}", t.feature[i]))?;
                nodes.push(Node::Split {
                    feature,
                    threshold: t.threshold[i],
                    left: child(t.children_left[i], i)?,
                    right: child(t.children_right[i], i)?,
                });
            }
        }
        Ok(Self { nodes })
    }

    fn leaf(&self, x: &[f64]) -> &[f64] {
        // children always point forward, so this terminates
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => at = if x[*feature] <= *threshold { *left } else { *right },
                Node::Leaf(p) => return p,
            }
        }
    }
}

/// Random forest exported as JSON, together with its fitted preprocessor.
#[derive(Debug)]
pub struct ForestPipeline {
    preprocessor: Preprocessor,
    classes: Vec<i64>,
    trees: Vec<Tree>,
    feature_importances: Option<Vec<f64>>,
}

impl ForestPipeline {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let txt = fs::read_to_string(path)
            .with_context(|| format!("failed to read model at {}", path.display()))?;
        Self::from_json_str(&txt).with_context(|| format!("failed to load model {}", path.display()))
    }

    pub fn from_json_str(txt: &str) -> Result<Self> {
        let raw: ForestJson = serde_json::from_str(txt).context("failed to parse model JSON")?;
        raw.preprocessor.validate()?;

        let n_features = raw.preprocessor.n_features();
        let n_classes = raw.classes.len();
        if n_classes == 0 {
            bail!("model declares no classes");
        }
        if raw.trees.is_empty() {
            bail!("model has no trees");
        }
        if let Some(imp) = &raw.feature_importances {
            if imp.len() != n_features {
                bail!(
                    "feature_importances has {} entries, preprocessor emits {n_features} features",
                    imp.len()
                );
            }
        }

        let trees = raw
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| {
                Tree::from_json(t, n_features, n_classes).with_context(|| format!("tree {i}"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            preprocessor: raw.preprocessor,
            classes: raw.classes,
            trees,
            feature_importances: raw.feature_importances,
        })
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }
}

/// Index of the largest probability; ties go to the first, as argmax does.
pub fn argmax(p: &[f64]) -> Option<usize> {
    p.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

impl Introspect for ForestPipeline {
    fn feature_names(&self) -> Vec<String> {
        self.preprocessor.feature_names()
    }

    fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }

    fn transform(&self, row: &FeatureRow) -> Result<Vec<f64>> {
        self.preprocessor.transform(row)
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>> {
        let n_features = self.preprocessor.n_features();
        if x.len() != n_features {
            bail!("feature length mismatch: got {}, expected {n_features}", x.len());
        }
        let mut acc = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (a, p) in acc.iter_mut().zip(tree.leaf(x)) {
                *a += p;
            }
        }
        let n = self.trees.len() as f64;
        acc.iter_mut().for_each(|a| *a /= n);
        Ok(acc)
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }
}

impl Pipeline for ForestPipeline {
    fn predict(&self, row: &FeatureRow) -> Result<i64> {
        let x = self.preprocessor.transform(row)?;
        let proba = self.predict_proba(&x)?;
        let best = argmax(&proba).context("model produced no probabilities")?;
        Ok(self.classes[best])
    }
}
