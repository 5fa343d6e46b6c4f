use anyhow::{bail, Context, Result};
use obesity_predictor::{
    build_record,
    collector::{AnswerValue, Answers},
    config::{Config, ModelKind},
    model::{Introspect, Pipeline},
    schema::{Field, FieldKind},
    AppState, Codec, ForestPipeline, InferenceAdapter, ObesityClass, Reporter,
};
use std::sync::Arc;

// ---------- Startup checks ----------

/// Lowest legal answer for every field; used to probe the model at startup.
fn minimal_answers(codec: &Codec) -> Result<Answers> {
    let mut answers = Answers::new();
    for field in Field::ALL {
        let value: AnswerValue = match field.kind() {
            FieldKind::Continuous { min, .. } => min.into(),
            FieldKind::Ordinal { min, .. } => min.into(),
            _ => codec
                .labels(field)?
                .first()
                .copied()
                .with_context(|| format!("no options for {field}"))?
                .into(),
        };
        answers.insert(field.key().to_string(), value);
    }
    Ok(answers)
}

fn check_class_count(n: usize) -> Result<()> {
    if n != ObesityClass::COUNT {
        bail!(
            "model emits {} classes but the class table has {}",
            n,
            ObesityClass::COUNT
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = Config::from_env()?;
    let model_path = cfg.model_path()?.clone();
    let codec = Arc::new(Codec::standard()?);

    let (pipeline, introspect): (Arc<dyn Pipeline>, Option<Arc<dyn Introspect>>) = match cfg.model_kind {
        ModelKind::Forest => {
            let forest = Arc::new(ForestPipeline::load(&model_path)?);
            check_class_count(forest.class_count())?;
            tracing::info!(
                "loaded forest {} ({} trees, {} features)",
                model_path.display(),
                forest.tree_count(),
                forest.preprocessor().n_features()
            );
            let pipeline: Arc<dyn Pipeline> = forest.clone();
            let introspect: Arc<dyn Introspect> = forest;
            (pipeline, Some(introspect))
        }
        #[cfg(feature = "torch")]
        ModelKind::Torch => {
            let meta_path = cfg.meta_path.as_ref().context("META_PATH not set")?;
            let torch = obesity_predictor::torch::TorchPipeline::new(
                &model_path.to_string_lossy(),
                &meta_path.to_string_lossy(),
            )?;
            check_class_count(torch.class_count())?;
            tracing::info!("loaded TorchScript {}", model_path.display());
            (Arc::new(torch), None)
        }
        #[cfg(not(feature = "torch"))]
        ModelKind::Torch => bail!("MODEL_KIND=torch needs a build with the `torch` feature"),
    };

    let adapter = InferenceAdapter::new(pipeline).with_prediction_logging(cfg.log_predictions);

    // Warmup to make sure the artifact accepts our column contract
    let probe = build_record(&codec, &minimal_answers(&codec)?)?;
    adapter.warmup(&probe).context("model rejected the warmup record")?;

    let reporter = match introspect {
        Some(model) => {
            if cfg.dataset_path.is_none() {
                tracing::warn!("DATASET_PATH not set; dataset reports disabled");
            }
            Some(Arc::new(Reporter::new(model, cfg.dataset_path.clone())))
        }
        None => {
            tracing::warn!("model backend has no introspection; reports disabled");
            None
        }
    };

    let state = AppState {
        codec,
        adapter: Arc::new(adapter),
        reporter,
    };
    let app = obesity_predictor::build_router(state);

    let addr = cfg.socket_addr();
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
