use crate::error::CodecError;
use crate::schema::{Cell, Field};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Raw value the pipeline was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum RawCode {
    Text(&'static str),
    Int(i64),
}

impl RawCode {
    pub fn to_cell(self) -> Cell {
        match self {
            RawCode::Text(s) => Cell::Text(s.to_string()),
            RawCode::Int(v) => Cell::Int(v),
        }
    }
}

impl fmt::Display for RawCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawCode::Text(s) => write!(f, "{s:?}"),
            RawCode::Int(v) => write!(f, "{v}"),
        }
    }
}

type Table = &'static [(&'static str, RawCode)];

const GENDER: Table = &[
    ("Masculino", RawCode::Text("Male")),
    ("Feminino", RawCode::Text("Female")),
];

const YES_NO: Table = &[("Sim", RawCode::Text("yes")), ("Não", RawCode::Text("no"))];

const FREQUENCY: Table = &[
    ("Nunca", RawCode::Text("no")),
    ("Às vezes", RawCode::Text("Sometimes")),
    ("Frequentemente", RawCode::Text("Frequently")),
    ("Sempre", RawCode::Text("Always")),
];

const TRANSPORT: Table = &[
    ("Automóvel", RawCode::Text("Automobile")),
    ("Moto", RawCode::Text("Motorbike")),
    ("Bicicleta", RawCode::Text("Bike")),
    ("Transporte público", RawCode::Text("Public_Transportation")),
    ("A pé", RawCode::Text("Walking")),
];

const VEGETABLES: Table = &[
    ("Raramente", RawCode::Int(1)),
    ("Às vezes", RawCode::Int(2)),
    ("Sempre", RawCode::Int(3)),
];

const MEALS: Table = &[
    ("Uma a duas", RawCode::Int(1)),
    ("Três", RawCode::Int(2)),
    ("Mais de três", RawCode::Int(3)),
];

const WATER: Table = &[
    ("Menos de 1 litro", RawCode::Int(1)),
    ("Entre 1 e 2 litros", RawCode::Int(2)),
    ("Mais de 2 litros", RawCode::Int(3)),
];

const ACTIVITY: Table = &[
    ("Nenhuma", RawCode::Int(0)),
    ("1 a 2 dias", RawCode::Int(1)),
    ("2 a 4 dias", RawCode::Int(2)),
    ("4 a 5 dias", RawCode::Int(3)),
];

const SCREEN_TIME: Table = &[
    ("Nenhum", RawCode::Int(0)),
    ("Até 2 horas", RawCode::Int(1)),
    ("3 a 5 horas", RawCode::Int(2)),
    ("Mais de 5 horas", RawCode::Int(3)),
];

fn table_for(field: Field) -> Option<Table> {
    match field {
        Field::Gender => Some(GENDER),
        Field::Age => None,
        Field::FamilyHistory | Field::HighCalorieFood | Field::Smokes | Field::Alcohol => Some(YES_NO),
        Field::Snacking | Field::Sedentary => Some(FREQUENCY),
        Field::Transport => Some(TRANSPORT),
        Field::Vegetables => Some(VEGETABLES),
        Field::MealsPerDay => Some(MEALS),
        Field::WaterIntake => Some(WATER),
        Field::PhysicalActivity => Some(ACTIVITY),
        Field::ScreenTime => Some(SCREEN_TIME),
    }
}

#[derive(Debug)]
pub struct LabelMapping {
    entries: Table,
    by_label: HashMap<&'static str, RawCode>,
    by_text_code: HashMap<&'static str, &'static str>,
    by_int_code: HashMap<i64, &'static str>,
}

impl LabelMapping {
    fn build(field: Field, entries: Table) -> Result<Self, CodecError> {
        let mut by_label = HashMap::with_capacity(entries.len());
        let mut by_text_code = HashMap::new();
        let mut by_int_code = HashMap::new();

        for &(label, code) in entries {
            if by_label.insert(label, code).is_some() {
                return Err(CodecError::Ambiguous {
                    field,
                    entry: label.to_string(),
                });
            }
            let duplicate = match code {
                RawCode::Text(s) => by_text_code.insert(s, label).is_some(),
                RawCode::Int(v) => by_int_code.insert(v, label).is_some(),
            };
            if duplicate {
                return Err(CodecError::Ambiguous {
                    field,
                    entry: code.to_string(),
                });
            }
        }

        Ok(Self {
            entries,
            by_label,
            by_text_code,
            by_int_code,
        })
    }

    pub fn entries(&self) -> &'static [(&'static str, RawCode)] {
        self.entries
    }
}

/// Process-wide label tables, built once at startup and shared read-only.
#[derive(Debug)]
pub struct Codec {
    mappings: HashMap<Field, LabelMapping>,
}

impl Codec {
    /// Build the survey's label tables, rejecting any table that is not injective.
    pub fn standard() -> Result<Self, CodecError> {
        let mut mappings = HashMap::new();
        for field in Field::ALL {
            if let Some(table) = table_for(field) {
                mappings.insert(field, LabelMapping::build(field, table)?);
            }
        }
        Ok(Self { mappings })
    }

    fn mapping(&self, field: Field) -> Result<&LabelMapping, CodecError> {
        self.mappings.get(&field).ok_or(CodecError::Unmapped(field))
    }

    pub fn encode(&self, field: Field, display_label: &str) -> Result<RawCode, CodecError> {
        self.mapping(field)?
            .by_label
            .get(display_label)
            .copied()
            .ok_or_else(|| CodecError::UnknownLabel {
                field,
                label: display_label.to_string(),
            })
    }

    pub fn decode(&self, field: Field, code: &RawCode) -> Result<&'static str, CodecError> {
        let mapping = self.mapping(field)?;
        let label = match code {
            RawCode::Text(s) => mapping.by_text_code.get(s),
            RawCode::Int(v) => mapping.by_int_code.get(v),
        };
        label.copied().ok_or_else(|| CodecError::UnknownCode {
            field,
            code: code.to_string(),
        })
    }

    /// Resolve user-supplied text that is already a raw code.
    pub fn raw_text_code(&self, field: Field, text: &str) -> Option<RawCode> {
        let mapping = self.mappings.get(&field)?;
        mapping
            .by_text_code
            .get_key_value(text)
            .map(|(code, _)| RawCode::Text(*code))
    }

    pub fn labels(&self, field: Field) -> Result<Vec<&'static str>, CodecError> {
        Ok(self.mapping(field)?.entries().iter().map(|(label, _)| *label).collect())
    }

    pub fn entries(&self, field: Field) -> Result<&'static [(&'static str, RawCode)], CodecError> {
        Ok(self.mapping(field)?.entries())
    }
}
