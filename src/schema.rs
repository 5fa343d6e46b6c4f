use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Gender,
    Age,
    FamilyHistory,
    HighCalorieFood,
    Vegetables,
    MealsPerDay,
    Snacking,
    Smokes,
    WaterIntake,
    Alcohol,
    PhysicalActivity,
    ScreenTime,
    Sedentary,
    Transport,
}

/// How a field's value is typed and bounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Binary,
    Categorical,
    Frequency,
    Ordinal { min: i64, max: i64 },
    Continuous { min: f64, max: f64 },
}

impl FieldKind {
    pub fn is_textual(&self) -> bool {
        matches!(self, FieldKind::Binary | FieldKind::Categorical | FieldKind::Frequency)
    }
}

pub const AGE_MIN: f64 = 1.0;
pub const AGE_MAX: f64 = 120.0;

impl Field {
    /// Every field in pipeline column order.
    pub const ALL: [Field; 14] = [
        Field::Gender,
        Field::Age,
        Field::FamilyHistory,
        Field::HighCalorieFood,
        Field::Vegetables,
        Field::MealsPerDay,
        Field::Snacking,
        Field::Smokes,
        Field::WaterIntake,
        Field::Alcohol,
        Field::PhysicalActivity,
        Field::ScreenTime,
        Field::Sedentary,
        Field::Transport,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Field::Gender => "gender",
            Field::Age => "age",
            Field::FamilyHistory => "family_history",
            Field::HighCalorieFood => "high_calorie_food",
            Field::Vegetables => "vegetables",
            Field::MealsPerDay => "meals_per_day",
            Field::Snacking => "snacking",
            Field::Smokes => "smokes",
            Field::WaterIntake => "water_intake",
            Field::Alcohol => "alcohol",
            Field::PhysicalActivity => "physical_activity",
            Field::ScreenTime => "screen_time",
            Field::Sedentary => "sedentary",
            Field::Transport => "transport",
        }
    }

    /// Column name baked into the fitted preprocessing step.
    pub fn column(self) -> &'static str {
        match self {
            Field::Gender => "Gender",
            Field::Age => "Age",
            Field::FamilyHistory => "family_history",
            Field::HighCalorieFood => "Consumo de alimentos com alto teor calórico",
            Field::Vegetables => "Frequência de consumo de vegetais",
            Field::MealsPerDay => "Número de refeições por dia",
            Field::Snacking => "Consumo de alimentos entre as refeições",
            Field::Smokes => "Fuma",
            Field::WaterIntake => "Consumo de água diário",
            Field::Alcohol => "Consumo de bebidas alcoólicas",
            Field::PhysicalActivity => "Frequência de atividade física",
            Field::ScreenTime => "Tempo gasto em atividades físicas",
            Field::Sedentary => "Tempo gasto em atividades sedentárias",
            Field::Transport => "Meio de transporte utilizado",
        }
    }

    /// Header of this field in the raw reference dataset.
    pub fn dataset_column(self) -> &'static str {
        match self {
            Field::Gender => "Gender",
            Field::Age => "Age",
            Field::FamilyHistory => "family_history",
            Field::HighCalorieFood => "FAVC",
            Field::Vegetables => "FCVC",
            Field::MealsPerDay => "NCP",
            Field::Snacking => "CAEC",
            Field::Smokes => "SMOKE",
            Field::WaterIntake => "CH2O",
            Field::Alcohol => "SCC",
            Field::PhysicalActivity => "FAF",
            Field::ScreenTime => "TUE",
            Field::Sedentary => "CALC",
            Field::Transport => "MTRANS",
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            Field::Gender => "Gênero",
            Field::Age => "Idade",
            Field::FamilyHistory => "Histórico familiar de sobrepeso",
            Field::HighCalorieFood => "Consumo frequente de alimentos calóricos",
            Field::Vegetables => "Consumo frequente de vegetais (1-3)",
            Field::MealsPerDay => "Número de refeições por dia (1-3)",
            Field::Snacking => "Consumo de alimentos entre as refeições",
            Field::Smokes => "Fuma",
            Field::WaterIntake => "Consumo de água diário (1-3)",
            Field::Alcohol => "Consumo de bebidas alcoólicas",
            Field::PhysicalActivity => "Frequência de atividade física (0-3)",
            Field::ScreenTime => "Tempo gasto em atividades físicas (0-3)",
            Field::Sedentary => "Frequência em atividades sedentárias",
            Field::Transport => "Meio de transporte utilizado",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Gender | Field::Transport => FieldKind::Categorical,
            Field::Age => FieldKind::Continuous { min: AGE_MIN, max: AGE_MAX },
            Field::FamilyHistory | Field::HighCalorieFood | Field::Smokes | Field::Alcohol => {
                FieldKind::Binary
            }
            Field::Snacking | Field::Sedentary => FieldKind::Frequency,
            Field::Vegetables | Field::MealsPerDay | Field::WaterIntake => {
                FieldKind::Ordinal { min: 1, max: 3 }
            }
            Field::PhysicalActivity | Field::ScreenTime => FieldKind::Ordinal { min: 0, max: 3 },
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.key() == key)
    }

    pub fn from_dataset_column(header: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.dataset_column() == header)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Int(i64),
    Real(f64),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Real(v) => Some(*v),
            Cell::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a raw CSV cell, preferring numbers.
    pub fn parse(raw: &str) -> Cell {
        let raw = raw.trim();
        if let Ok(v) = raw.parse::<i64>() {
            Cell::Int(v)
        } else if let Ok(v) = raw.parse::<f64>() {
            Cell::Real(v)
        } else {
            Cell::Text(raw.to_string())
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Real(v) => write!(f, "{v}"),
        }
    }
}

/// Single-row table with named columns, as handed to a pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FeatureRow {
    columns: Vec<(String, Cell)>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, cell: Cell) {
        self.columns.push((column.into(), cell));
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.columns.iter().find(|(name, _)| name == column).map(|(_, c)| c)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }
}
