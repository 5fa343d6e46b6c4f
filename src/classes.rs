use crate::error::ClassError;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum SeverityTier {
    Low,
    Moderate,
    High,
}

impl SeverityTier {
    pub fn as_str(self) -> &'static str {
        match self {
            SeverityTier::Low => "low",
            SeverityTier::Moderate => "moderate",
            SeverityTier::High => "high",
        }
    }

    pub fn guidance(self) -> &'static str {
        match self {
            SeverityTier::Low => "Nível de obesidade baixo. Mantenha um estilo de vida saudável!",
            SeverityTier::Moderate => {
                "Nível de obesidade moderado. Considere adotar hábitos mais saudáveis."
            }
            SeverityTier::High => {
                "Recomenda-se consultar um profissional de saúde para orientação adequada."
            }
        }
    }

    /// High results are surfaced as a warning rather than information.
    pub fn is_warning(self) -> bool {
        self == SeverityTier::High
    }
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output classes, ordered by the index the pipeline emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ObesityClass {
    InsufficientWeight = 0,
    NormalWeight = 1,
    OverweightLevelI = 2,
    OverweightLevelII = 3,
    ObesityTypeI = 4,
    ObesityTypeII = 5,
    ObesityTypeIII = 6,
}

impl ObesityClass {
    pub const ALL: [ObesityClass; 7] = [
        ObesityClass::InsufficientWeight,
        ObesityClass::NormalWeight,
        ObesityClass::OverweightLevelI,
        ObesityClass::OverweightLevelII,
        ObesityClass::ObesityTypeI,
        ObesityClass::ObesityTypeII,
        ObesityClass::ObesityTypeIII,
    ];

    /// Number of classes the pipeline must be able to emit.
    pub const COUNT: usize = Self::ALL.len();

    pub fn from_index(index: i64) -> Result<Self, ClassError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(ClassError::UnknownIndex(index))
    }

    pub fn index(self) -> i64 {
        self as i64
    }

    pub fn tier(self) -> SeverityTier {
        match self {
            ObesityClass::InsufficientWeight
            | ObesityClass::NormalWeight
            | ObesityClass::OverweightLevelI => SeverityTier::Low,
            ObesityClass::OverweightLevelII => SeverityTier::Moderate,
            ObesityClass::ObesityTypeI | ObesityClass::ObesityTypeII | ObesityClass::ObesityTypeIII => {
                SeverityTier::High
            }
        }
    }

    /// Label used in the reference dataset's target column.
    pub fn code(self) -> &'static str {
        match self {
            ObesityClass::InsufficientWeight => "Insufficient_Weight",
            ObesityClass::NormalWeight => "Normal_Weight",
            ObesityClass::OverweightLevelI => "Overweight_Level_I",
            ObesityClass::OverweightLevelII => "Overweight_Level_II",
            ObesityClass::ObesityTypeI => "Obesity_Type_I",
            ObesityClass::ObesityTypeII => "Obesity_Type_II",
            ObesityClass::ObesityTypeIII => "Obesity_Type_III",
        }
    }

    pub fn display_label(self) -> &'static str {
        match self {
            ObesityClass::InsufficientWeight => "Peso insuficiente",
            ObesityClass::NormalWeight => "Peso normal",
            ObesityClass::OverweightLevelI => "Sobrepeso nível I",
            ObesityClass::OverweightLevelII => "Sobrepeso nível II",
            ObesityClass::ObesityTypeI => "Obesidade tipo I",
            ObesityClass::ObesityTypeII => "Obesidade tipo II",
            ObesityClass::ObesityTypeIII => "Obesidade tipo III",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code.trim())
    }
}

impl fmt::Display for ObesityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_label())
    }
}

/// A successful prediction, fully resolved through the class table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionResult {
    class: ObesityClass,
}

impl PredictionResult {
    pub fn from_index(index: i64) -> Result<Self, ClassError> {
        ObesityClass::from_index(index).map(|class| Self { class })
    }

    pub fn class(&self) -> ObesityClass {
        self.class
    }

    pub fn class_index(&self) -> i64 {
        self.class.index()
    }

    pub fn tier(&self) -> SeverityTier {
        self.class.tier()
    }

    pub fn label(&self) -> &'static str {
        self.class.display_label()
    }

    pub fn code(&self) -> &'static str {
        self.class.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_class_index() {
        for i in 0..=2 {
            assert_eq!(ObesityClass::from_index(i).unwrap().tier(), SeverityTier::Low);
        }
        assert_eq!(ObesityClass::from_index(3).unwrap().tier(), SeverityTier::Moderate);
        for i in 4..=6 {
            assert_eq!(ObesityClass::from_index(i).unwrap().tier(), SeverityTier::High);
        }
    }

    #[test]
    fn out_of_range_indices_fail() {
        for i in [-1, 7, 42, i64::MIN, i64::MAX] {
            assert_eq!(ObesityClass::from_index(i), Err(ClassError::UnknownIndex(i)));
        }
    }

    #[test]
    fn table_is_total_and_ordered() {
        assert_eq!(ObesityClass::COUNT, 7);
        for (i, class) in ObesityClass::ALL.iter().enumerate() {
            assert_eq!(class.index(), i as i64);
            assert!(!class.display_label().is_empty());
            assert_eq!(ObesityClass::from_code(class.code()), Some(*class));
        }
    }

    #[test]
    fn prediction_result_resolves_labels() {
        let result = PredictionResult::from_index(6).unwrap();
        assert_eq!(result.class(), ObesityClass::ObesityTypeIII);
        assert_eq!(result.label(), "Obesidade tipo III");
        assert_eq!(result.code(), "Obesity_Type_III");
        assert!(result.tier().is_warning());
    }
}
