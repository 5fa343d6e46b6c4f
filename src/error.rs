use crate::schema::Field;
use thiserror::Error;

/// Label table lookups. With correct tables these indicate a programming
/// or configuration fault and are fatal to the request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("unknown label {label:?} for field {field}")]
    UnknownLabel { field: Field, label: String },

    #[error("unknown code {code} for field {field}")]
    UnknownCode { field: Field, code: String },

    #[error("field {0} has no label mapping")]
    Unmapped(Field),

    #[error("label table for {field} is not injective: {entry:?} appears twice")]
    Ambiguous { field: Field, entry: String },
}

/// Bad or out-of-range user input. Recoverable by re-entry.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid value for {field}: {reason}")]
pub struct ValidationError {
    /// Answer key that failed.
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClassError {
    #[error("class index {0} is outside the model's class table")]
    UnknownIndex(i64),
}

/// The model call failed. Never retried automatically.
#[derive(Debug, Error)]
#[error("prediction failed: {source:#}")]
pub struct InferenceError {
    #[source]
    source: anyhow::Error,
}

impl InferenceError {
    pub fn new(source: impl Into<anyhow::Error>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn cause(&self) -> &anyhow::Error {
        &self.source
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("reference dataset unavailable: {0}")]
    Dataset(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("unknown feature {0:?}")]
    UnknownFeature(String),

    #[error("model does not expose {0}")]
    Unsupported(&'static str),

    #[error(transparent)]
    Class(#[from] ClassError),

    #[error("model evaluation failed: {0:#}")]
    Model(anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}
