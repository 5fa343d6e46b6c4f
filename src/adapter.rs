use crate::classes::PredictionResult;
use crate::collector::SurveyResponse;
use crate::error::InferenceError;
use crate::model::Pipeline;
use anyhow::anyhow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

pub struct InferenceAdapter {
    pipeline: Arc<dyn Pipeline>,
    log_predictions: bool,
}

impl InferenceAdapter {
    pub fn new(pipeline: Arc<dyn Pipeline>) -> Self {
        Self {
            pipeline,
            log_predictions: false,
        }
    }

    /// Log every scored row at info level.
    pub fn with_prediction_logging(mut self, enabled: bool) -> Self {
        self.log_predictions = enabled;
        self
    }

    /// Score one record. Any pipeline failure, including a panic inside the
    /// backend or an index outside the class table, becomes a single
    /// `InferenceError`; no result is produced in that case.
    pub fn predict(&self, record: &SurveyResponse) -> Result<PredictionResult, InferenceError> {
        let row = record.to_row();
        if self.log_predictions {
            tracing::info!("scoring {}", record.summary());
        }

        let index = panic::catch_unwind(AssertUnwindSafe(|| self.pipeline.predict(&row)))
            .map_err(|payload| InferenceError::new(anyhow!("pipeline panicked: {}", panic_message(&*payload))))?
            .map_err(InferenceError::new)?;

        let result = PredictionResult::from_index(index).map_err(InferenceError::new)?;
        tracing::debug!(
            class_index = result.class_index(),
            tier = %result.tier(),
            "prediction ok"
        );
        Ok(result)
    }

    /// Probe the pipeline once at startup with a known-good record.
    pub fn warmup(&self, record: &SurveyResponse) -> Result<PredictionResult, InferenceError> {
        let result = self.predict(record)?;
        tracing::info!("warmup prediction ok (class {})", result.class_index());
        Ok(result)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
