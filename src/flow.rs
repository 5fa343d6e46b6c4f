use crate::adapter::InferenceAdapter;
use crate::classes::PredictionResult;
use crate::codec::Codec;
use crate::collector::{build_record, Answers};
use crate::error::{InferenceError, ValidationError};
use serde::Serialize;

// Idle -> Validating -> Ready -> Predicting -> Predicted, and every path
// ends back in Idle. A failed submission needs a fresh `submit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Idle,
    Validating,
    Ready,
    Predicting,
    Predicted,
}

#[derive(Debug)]
pub enum Outcome {
    Rejected(ValidationError),
    Failed(InferenceError),
    Predicted(PredictionResult),
}

impl Outcome {
    pub fn prediction(&self) -> Option<&PredictionResult> {
        match self {
            Outcome::Predicted(p) => Some(p),
            _ => None,
        }
    }
}

pub struct SubmissionFlow<'a> {
    codec: &'a Codec,
    adapter: &'a InferenceAdapter,
    state: FlowState,
    history: Vec<FlowState>,
}

impl<'a> SubmissionFlow<'a> {
    pub fn new(codec: &'a Codec, adapter: &'a InferenceAdapter) -> Self {
        Self {
            codec,
            adapter,
            state: FlowState::Idle,
            history: vec![FlowState::Idle],
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Every state visited so far, starting with `Idle`.
    pub fn history(&self) -> &[FlowState] {
        &self.history
    }

    fn enter(&mut self, next: FlowState) {
        tracing::debug!(from = ?self.state, to = ?next, "submission transition");
        self.state = next;
        self.history.push(next);
    }

    /// Validate and score one set of answers, then return to `Idle`.
    pub fn submit(&mut self, answers: &Answers) -> Outcome {
        self.enter(FlowState::Validating);
        let record = match build_record(self.codec, answers) {
            Ok(record) => record,
            Err(err) => {
                tracing::info!("submission rejected: {err}");
                self.enter(FlowState::Idle);
                return Outcome::Rejected(err);
            }
        };

        self.enter(FlowState::Ready);
        self.enter(FlowState::Predicting);
        let outcome = match self.adapter.predict(&record) {
            Ok(result) => {
                self.enter(FlowState::Predicted);
                Outcome::Predicted(result)
            }
            Err(err) => {
                tracing::error!("{err}");
                Outcome::Failed(err)
            }
        };
        self.enter(FlowState::Idle);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::tests::FixedPipeline;
    use crate::collector::tests::sample_answers;
    use crate::model::Pipeline;
    use crate::schema::FeatureRow;
    use std::sync::Arc;
    use super::FlowState::*;

    struct Broken;

    impl Pipeline for Broken {
        fn predict(&self, _row: &FeatureRow) -> anyhow::Result<i64> {
            anyhow::bail!("model unavailable")
        }
    }

    #[test]
    fn successful_submission_visits_every_state() {
        let codec = Codec::standard().unwrap();
        let adapter = InferenceAdapter::new(Arc::new(FixedPipeline::new(5)));
        let mut flow = SubmissionFlow::new(&codec, &adapter);

        let outcome = flow.submit(&sample_answers());
        assert_eq!(outcome.prediction().map(|p| p.class_index()), Some(5));
        assert_eq!(flow.history(), &[Idle, Validating, Ready, Predicting, Predicted, Idle]);
        assert_eq!(flow.state(), Idle);
    }

    #[test]
    fn validation_error_never_reaches_the_model() {
        let codec = Codec::standard().unwrap();
        let pipeline = Arc::new(FixedPipeline::new(1));
        let adapter = InferenceAdapter::new(pipeline.clone());
        let mut flow = SubmissionFlow::new(&codec, &adapter);

        let mut answers = sample_answers();
        answers.insert("age".into(), 0i64.into());
        let outcome = flow.submit(&answers);

        assert!(matches!(outcome, Outcome::Rejected(ref e) if e.field == "age"));
        assert_eq!(flow.history(), &[Idle, Validating, Idle]);
        assert_eq!(pipeline.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn inference_error_returns_to_idle_without_retry() {
        let codec = Codec::standard().unwrap();
        let adapter = InferenceAdapter::new(Arc::new(Broken));
        let mut flow = SubmissionFlow::new(&codec, &adapter);

        let outcome = flow.submit(&sample_answers());
        assert!(matches!(outcome, Outcome::Failed(_)));
        assert_eq!(flow.history(), &[Idle, Validating, Ready, Predicting, Idle]);
    }
}
