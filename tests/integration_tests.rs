/// End-to-end tests: form answers -> record -> forest artifact -> result.
///
/// Run with: cargo test --test integration_tests -- --nocapture
use obesity_predictor::flow::{Outcome, SubmissionFlow};
use obesity_predictor::model::Introspect;
use obesity_predictor::{
    build_record, AnswerValue, Answers, Codec, Dataset, Field, ForestPipeline, InferenceAdapter,
    ObesityClass, Pipeline, ReportError, Reporter, SeverityTier,
};
use std::sync::Arc;

const FOREST: &str = include_str!("fixtures/forest_small.json");
const DATASET: &str = include_str!("fixtures/obesity_sample.csv");

fn answers(pairs: &[(&str, AnswerValue)]) -> Answers {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn reference_answers() -> Answers {
    answers(&[
        ("gender", "Female".into()),
        ("age", 30i64.into()),
        ("family_history", "yes".into()),
        ("high_calorie_food", "no".into()),
        ("vegetables", 3i64.into()),
        ("meals_per_day", 3i64.into()),
        ("snacking", "Sometimes".into()),
        ("smokes", "no".into()),
        ("water_intake", 2i64.into()),
        ("alcohol", "no".into()),
        ("physical_activity", 1i64.into()),
        ("screen_time", 1i64.into()),
        ("sedentary", "Sometimes".into()),
        ("transport", "Walking".into()),
    ])
}

/// Every field at its lowest legal value, entered through display labels.
fn minimal_answers() -> Answers {
    answers(&[
        ("gender", "Masculino".into()),
        ("age", 1i64.into()),
        ("family_history", "Não".into()),
        ("high_calorie_food", "Não".into()),
        ("vegetables", 1i64.into()),
        ("meals_per_day", 1i64.into()),
        ("snacking", "Nunca".into()),
        ("smokes", "Não".into()),
        ("water_intake", 1i64.into()),
        ("alcohol", "Não".into()),
        ("physical_activity", 0i64.into()),
        ("screen_time", 0i64.into()),
        ("sedentary", "Nunca".into()),
        ("transport", "Automóvel".into()),
    ])
}

fn forest() -> Arc<ForestPipeline> {
    Arc::new(ForestPipeline::from_json_str(FOREST).expect("fixture model loads"))
}

#[test]
fn test_fixture_matches_class_table() {
    let forest = forest();
    assert_eq!(forest.class_count(), ObesityClass::COUNT);
    assert_eq!(forest.preprocessor().n_features(), 29);
    let columns: Vec<&str> = forest.preprocessor().input_columns().collect();
    let expected: Vec<&str> = Field::ALL.iter().map(|f| f.column()).collect();
    assert_eq!(columns, expected);
}

#[test]
fn test_reference_record_is_deterministic() {
    let codec = Codec::standard().unwrap();
    let adapter = InferenceAdapter::new(forest());
    let record = build_record(&codec, &reference_answers()).unwrap();

    let first = adapter.predict(&record).unwrap();
    for _ in 0..10 {
        assert_eq!(adapter.predict(&record).unwrap(), first);
    }
    assert_eq!(first.class(), ObesityClass::ObesityTypeIII);
    assert_eq!(first.tier(), SeverityTier::High);
    println!("✓ reference record -> {} ({})", first.label(), first.tier());
}

#[test]
fn test_minimal_form_end_to_end() {
    let codec = Codec::standard().unwrap();
    let adapter = InferenceAdapter::new(forest());
    let mut flow = SubmissionFlow::new(&codec, &adapter);

    match flow.submit(&minimal_answers()) {
        Outcome::Predicted(result) => {
            assert!(!result.label().is_empty());
            assert_eq!(result.class(), ObesityClass::NormalWeight);
            assert_eq!(result.tier(), SeverityTier::Low);
        }
        other => panic!("expected a prediction, got {other:?}"),
    }
}

#[test]
fn test_schema_mismatch_surfaces_one_inference_error() {
    // Same trees, but the preprocessor expects an untranslated column name.
    let renamed = FOREST.replace("\"Fuma\"", "\"SMOKE\"");
    let adapter = InferenceAdapter::new(Arc::new(ForestPipeline::from_json_str(&renamed).unwrap()));
    let codec = Codec::standard().unwrap();
    let record = build_record(&codec, &reference_answers()).unwrap();

    let err = adapter.predict(&record).unwrap_err();
    assert!(err.to_string().contains("SMOKE"), "{err}");
}

#[test]
fn test_unknown_category_is_an_inference_error() {
    let narrowed = FOREST.replace("\"Walking\"", "\"Skateboard\"");
    let forest = ForestPipeline::from_json_str(&narrowed).unwrap();
    let codec = Codec::standard().unwrap();
    let record = build_record(&codec, &reference_answers()).unwrap();

    assert!(forest.predict(&record.to_row()).is_err());
    assert!(InferenceAdapter::new(Arc::new(forest)).predict(&record).is_err());
}

#[test]
fn test_reports_over_sample_dataset() {
    let model = forest();
    let dataset = Dataset::from_reader(DATASET.as_bytes()).unwrap();
    assert_eq!(dataset.len(), 20);
    let reporter = Reporter::with_dataset(model.clone(), dataset);

    let top = reporter.feature_importance(3).unwrap();
    let names: Vec<&str> = top.iter().map(|f| f.feature.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "num__Age",
            "num__Frequência de atividade física",
            "num__Frequência de consumo de vegetais"
        ]
    );

    let dist = reporter.class_distribution().unwrap();
    assert_eq!(dist.total, 20);
    assert_eq!(dist.unrecognized, 0);
    let counts: Vec<usize> = dist.classes.iter().map(|c| c.count).collect();
    assert_eq!(counts, vec![1, 11, 1, 3, 2, 0, 2]);

    for feature in Reporter::default_dependence_features() {
        let pd = reporter
            .partial_dependence(&feature, ObesityClass::ObesityTypeIII, 20)
            .unwrap();
        assert_eq!(pd.skipped_rows, 0);
        assert_eq!(pd.grid.len(), pd.average.len());
        assert!(!pd.grid.is_empty());
        assert!(pd.average.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(model.feature_names().contains(&pd.feature));
    }
}

#[test]
fn test_unknown_feature_is_reported() {
    let reporter = Reporter::with_dataset(forest(), Dataset::from_reader(DATASET.as_bytes()).unwrap());
    assert!(reporter
        .partial_dependence("num__FAF", ObesityClass::ObesityTypeIII, 10)
        .is_err());
}

#[test]
fn test_dataset_is_loaded_once_from_path() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/obesity_sample.csv");
    let reporter = Reporter::new(forest(), Some(path));
    assert!(reporter.has_dataset());

    let first = reporter.dataset().unwrap();
    let second = reporter.dataset().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.len(), 20);
    assert_eq!(reporter.class_distribution().unwrap().total, 20);
}

#[test]
fn test_missing_dataset_is_a_dataset_error() {
    let reporter = Reporter::new(forest(), None);
    assert!(!reporter.has_dataset());
    assert!(matches!(reporter.dataset(), Err(ReportError::Dataset(_))));

    let reporter = Reporter::new(forest(), Some("tests/fixtures/does_not_exist.csv".into()));
    assert!(matches!(reporter.class_distribution(), Err(ReportError::Dataset(_))));
}
