use crate::codec::{Codec, RawCode};
use crate::error::ValidationError;
use crate::schema::{Cell, FeatureRow, Field, FieldKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A submitted answer: either a display label / raw code, or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Number(f64),
    Text(String),
}

impl From<&str> for AnswerValue {
    fn from(s: &str) -> Self {
        AnswerValue::Text(s.to_string())
    }
}

impl From<f64> for AnswerValue {
    fn from(v: f64) -> Self {
        AnswerValue::Number(v)
    }
}

impl From<i64> for AnswerValue {
    fn from(v: i64) -> Self {
        AnswerValue::Number(v as f64)
    }
}

pub type Answers = HashMap<String, AnswerValue>;

/// Read answers out of a JSON object. Values that are neither text nor a
/// number are rejected, naming the earliest such field in schema order.
pub fn answers_from_json(body: &Map<String, Value>) -> Result<Answers, ValidationError> {
    let mut answers = Answers::with_capacity(body.len());
    let mut rejected: Vec<&str> = Vec::new();
    for (key, value) in body {
        let answer = match value {
            Value::String(s) => Some(AnswerValue::Text(s.clone())),
            Value::Number(n) => n.as_f64().map(AnswerValue::Number),
            _ => None,
        };
        match answer {
            Some(answer) => {
                answers.insert(key.clone(), answer);
            }
            None => rejected.push(key),
        }
    }

    let first = rejected.into_iter().min_by_key(|key| {
        let rank = Field::from_key(key).map_or(Field::ALL.len(), |f| f as usize);
        (rank, *key)
    });
    match first {
        Some(key) => Err(ValidationError::new(key, "expected a text option or a number")),
        None => Ok(answers),
    }
}

/// One validated submission, in pipeline column order.
///
/// Only [`build_record`] creates these; the cells cannot be changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyResponse {
    cells: Vec<Cell>,
}

impl SurveyResponse {
    pub fn get(&self, field: Field) -> &Cell {
        &self.cells[field as usize]
    }

    /// Named single-row table for the pipeline.
    pub fn to_row(&self) -> FeatureRow {
        let mut row = FeatureRow::new();
        for (field, cell) in Field::ALL.iter().zip(&self.cells) {
            row.push(field.column(), cell.clone());
        }
        row
    }

    pub fn summary(&self) -> String {
        Field::ALL
            .iter()
            .zip(&self.cells)
            .map(|(field, cell)| format!("{}={}", field.key(), cell))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Validate every answer and build the record. The first failing field in
/// schema order is reported; unknown keys are rejected after that.
pub fn build_record(codec: &Codec, answers: &Answers) -> Result<SurveyResponse, ValidationError> {
    let mut cells = Vec::with_capacity(Field::ALL.len());
    for field in Field::ALL {
        let value = answers
            .get(field.key())
            .ok_or_else(|| ValidationError::new(field.key(), "missing answer"))?;
        cells.push(collect_field(codec, field, value)?);
    }

    let mut unknown: Vec<&String> = answers
        .keys()
        .filter(|key| Field::from_key(key).is_none())
        .collect();
    unknown.sort();
    if let Some(key) = unknown.first() {
        return Err(ValidationError::new(key.as_str(), "not a survey field"));
    }

    Ok(SurveyResponse { cells })
}

fn collect_field(codec: &Codec, field: Field, value: &AnswerValue) -> Result<Cell, ValidationError> {
    match field.kind() {
        FieldKind::Binary | FieldKind::Categorical | FieldKind::Frequency => {
            textual(codec, field, value)
        }
        FieldKind::Ordinal { min, max } => ordinal(codec, field, value, min, max).map(Cell::Int),
        FieldKind::Continuous { min, max } => continuous(field, value, min, max).map(Cell::Real),
    }
}

fn textual(codec: &Codec, field: Field, value: &AnswerValue) -> Result<Cell, ValidationError> {
    let AnswerValue::Text(text) = value else {
        return Err(ValidationError::new(field.key(), "expected a text option"));
    };
    match codec.encode(field, text) {
        Ok(code) => Ok(code.to_cell()),
        Err(err) => codec
            .raw_text_code(field, text)
            .map(RawCode::to_cell)
            .ok_or_else(|| ValidationError::new(field.key(), err.to_string())),
    }
}

fn ordinal(
    codec: &Codec,
    field: Field,
    value: &AnswerValue,
    min: i64,
    max: i64,
) -> Result<i64, ValidationError> {
    let v = match value {
        AnswerValue::Number(n) => integral(field, *n)?,
        AnswerValue::Text(text) => match codec.encode(field, text) {
            Ok(RawCode::Int(v)) => v,
            Ok(RawCode::Text(_)) => {
                return Err(ValidationError::new(field.key(), "label does not map to a number"))
            }
            Err(err) => match text.trim().parse::<f64>() {
                Ok(n) => integral(field, n)?,
                Err(_) => return Err(ValidationError::new(field.key(), err.to_string())),
            },
        },
    };

    if v < min || v > max {
        return Err(ValidationError::new(
            field.key(),
            format!("{v} is outside {min}..={max}"),
        ));
    }
    Ok(v)
}

fn integral(field: Field, n: f64) -> Result<i64, ValidationError> {
    if !n.is_finite() || n.fract() != 0.0 {
        return Err(ValidationError::new(field.key(), format!("{n} is not a whole number")));
    }
    Ok(n as i64)
}

fn continuous(field: Field, value: &AnswerValue, min: f64, max: f64) -> Result<f64, ValidationError> {
    let n = match value {
        AnswerValue::Number(n) => *n,
        AnswerValue::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| ValidationError::new(field.key(), format!("{text:?} is not a number")))?,
    };
    if !n.is_finite() || n < min || n > max {
        return Err(ValidationError::new(
            field.key(),
            format!("{n} is outside {min}..={max}"),
        ));
    }
    Ok(n)
}
