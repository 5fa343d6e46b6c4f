use crate::model::Pipeline;
use crate::preprocess::Preprocessor;
use crate::schema::FeatureRow;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};
use tch::{kind::Kind, CModule, Device, Tensor};

#[derive(Deserialize)]
struct MetaJson {
    preprocessor: Preprocessor,
    in_dim: Option<usize>,
}

pub struct TorchPipeline {
    model: CModule,
    device: Device,
    preprocessor: Preprocessor,
    in_dim: usize,
    pub n_classes: i64,
}

impl TorchPipeline {
    pub fn new(model_path: &str, meta_path: &str) -> Result<Self> {
        let device = Device::Cpu;

        // meta.json carries the fitted preprocessing step and input width
        let meta_txt = fs::read_to_string(Path::new(meta_path))
            .with_context(|| format!("failed to read meta at {}", meta_path))?;
        let meta: MetaJson =
            serde_json::from_str(&meta_txt).with_context(|| "failed to parse meta.json")?;
        meta.preprocessor.validate()?;

        let in_dim = meta.in_dim.unwrap_or_else(|| meta.preprocessor.n_features());
        if in_dim != meta.preprocessor.n_features() {
            bail!(
                "meta.in_dim ({}) != preprocessor width ({})",
                in_dim,
                meta.preprocessor.n_features()
            );
        }

        let model = CModule::load_on_device(model_path, device)
            .with_context(|| format!("failed to load TorchScript {}", model_path))?;

        // Probe output shape with a dummy forward, expect [B=1, C]
        let dummy = Tensor::zeros([1, in_dim as i64], (Kind::Float, device));
        let t = model.forward_ts(&[dummy])?;
        let sz = t.size();
        if sz.len() != 2 || sz[0] != 1 {
            bail!("unexpected model output size: {:?}", sz);
        }

        Ok(Self {
            model,
            device,
            preprocessor: meta.preprocessor,
            in_dim,
            n_classes: sz[1],
        })
    }

    pub fn class_count(&self) -> usize {
        self.n_classes as usize
    }
}

impl Pipeline for TorchPipeline {
    fn predict(&self, row: &FeatureRow) -> Result<i64> {
        let x: Vec<f32> = self
            .preprocessor
            .transform(row)?
            .into_iter()
            .map(|v| v as f32)
            .collect();
        if x.len() != self.in_dim {
            bail!("feature length mismatch: got {}, expected {}", x.len(), self.in_dim);
        }

        let input = Tensor::from_slice(&x)
            .reshape([1, self.in_dim as i64])
            .to_device(self.device);

        // Forward: [1, C] logits
        let logits = self.model.forward_ts(&[input])?;
        let idx = logits.argmax(1, false).int64_value(&[0]);
        Ok(idx)
    }
}
