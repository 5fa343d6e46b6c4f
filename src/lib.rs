pub mod adapter;
pub mod api;
pub mod classes;
pub mod codec;
pub mod collector;
pub mod config;
pub mod error;
pub mod flow;
pub mod model;
pub mod preprocess;
pub mod reporter;
pub mod schema;
#[cfg(feature = "torch")]
pub mod torch;
pub mod types;

pub use adapter::InferenceAdapter;
pub use api::{build_router, AppState};
pub use classes::{ObesityClass, PredictionResult, SeverityTier};
pub use codec::{Codec, RawCode};
pub use collector::{answers_from_json, build_record, AnswerValue, Answers, SurveyResponse};
pub use error::{ClassError, CodecError, InferenceError, ReportError, ValidationError};
pub use model::{ForestPipeline, Introspect, Pipeline};
pub use reporter::{Dataset, Reporter};
pub use schema::{Cell, FeatureRow, Field, FieldKind};
