use crate::classes::PredictionResult;
use crate::codec::{Codec, RawCode};
use crate::schema::{Field, FieldKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PredictionOut {
    pub t: i64,
    pub class_index: i64,
    pub code: String,
    pub label: String,
    pub tier: String,
    pub guidance: String,
    pub warning: bool,
}

impl PredictionOut {
    pub fn new(result: &PredictionResult, t: i64) -> Self {
        let tier = result.tier();
        Self {
            t,
            class_index: result.class_index(),
            code: result.code().to_string(),
            label: result.label().to_string(),
            tier: tier.as_str().to_string(),
            guidance: tier.guidance().to_string(),
            warning: tier.is_warning(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OptionOut {
    pub label: &'static str,
    pub code: RawCode,
}

/// One form field as a UI needs it to render the input.
#[derive(Debug, Serialize)]
pub struct FieldOut {
    pub key: &'static str,
    pub column: &'static str,
    pub prompt: &'static str,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub options: Vec<OptionOut>,
}

impl FieldOut {
    pub fn describe(codec: &Codec, field: Field) -> Self {
        let options: Vec<OptionOut> = codec
            .entries(field)
            .map(|entries| {
                entries
                    .iter()
                    .map(|&(label, code)| OptionOut { label, code })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            key: field.key(),
            column: field.column(),
            prompt: field.prompt(),
            kind: field.kind(),
            options,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthOut {
    pub status: &'static str,
    pub version: &'static str,
    pub reporter: bool,
    pub dataset: bool,
}
