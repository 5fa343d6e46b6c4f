use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use obesity_predictor::{
    build_router, AppState, Codec, Dataset, ForestPipeline, InferenceAdapter, Pipeline, Reporter,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

const FOREST: &str = include_str!("fixtures/forest_small.json");
const DATASET: &str = include_str!("fixtures/obesity_sample.csv");

fn setup_app(with_reporter: bool) -> axum::Router {
    app_with_forest(FOREST, with_reporter)
}

fn app_with_forest(forest_json: &str, with_reporter: bool) -> axum::Router {
    let forest = Arc::new(ForestPipeline::from_json_str(forest_json).expect("fixture model loads"));
    let reporter = with_reporter.then(|| {
        let dataset = Dataset::from_reader(DATASET.as_bytes()).expect("fixture dataset loads");
        Arc::new(Reporter::with_dataset(forest.clone(), dataset))
    });
    let pipeline: Arc<dyn Pipeline> = forest;
    build_router(AppState {
        codec: Arc::new(Codec::standard().unwrap()),
        adapter: Arc::new(InferenceAdapter::new(pipeline)),
        reporter,
    })
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn reference_form() -> Value {
    json!({
        "gender": "Female",
        "age": 30,
        "family_history": "yes",
        "high_calorie_food": "no",
        "vegetables": 3,
        "meals_per_day": 3,
        "snacking": "Sometimes",
        "smokes": "no",
        "water_intake": 2,
        "alcohol": "no",
        "physical_activity": 1,
        "screen_time": 1,
        "sedentary": "Sometimes",
        "transport": "Walking"
    })
}

#[tokio::test]
async fn test_health() {
    let response = setup_app(false).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["reporter"], false);
    assert_eq!(body["dataset"], false);
}

#[tokio::test]
async fn test_schema_lists_every_field_in_column_order() {
    let response = setup_app(false).oneshot(get("/schema")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    let fields = body.as_array().unwrap();
    assert_eq!(fields.len(), 14);
    assert_eq!(fields[0]["column"], "Gender");
    assert_eq!(fields[1]["kind"], "continuous");
    assert_eq!(fields[1]["options"].as_array().unwrap().len(), 0);
    assert_eq!(fields[13]["options"].as_array().unwrap().len(), 5);
    assert_eq!(fields[10]["min"], 0);
    assert_eq!(fields[10]["max"], 3);
}

#[tokio::test]
async fn test_predict_reference_form() {
    let response = setup_app(false)
        .oneshot(post_json("/predict", &reference_form()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["class_index"], 6);
    assert_eq!(body["code"], "Obesity_Type_III");
    assert_eq!(body["tier"], "high");
    assert_eq!(body["warning"], true);
    assert!(body["guidance"].as_str().unwrap().contains("profissional de saúde"));
}

#[tokio::test]
async fn test_predict_rejects_out_of_range_age() {
    let mut form = reference_form();
    form["age"] = json!(121);
    let response = setup_app(false).oneshot(post_json("/predict", &form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["field"], "age");
}

#[tokio::test]
async fn test_predict_rejects_non_scalar_answers_by_field() {
    let mut form = reference_form();
    form["age"] = Value::Null;
    let response = setup_app(false).oneshot(post_json("/predict", &form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["field"], "age");

    let mut form = reference_form();
    form["smokes"] = json!(true);
    let response = setup_app(false).oneshot(post_json("/predict", &form)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["field"], "smokes");
}

#[tokio::test]
async fn test_predict_rejects_non_object_body_as_json() {
    let response = setup_app(false)
        .oneshot(post_json("/predict", &json!([1, 2, 3])))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
    let body = extract_json(response.into_body()).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_predict_model_failure_is_bad_gateway() {
    // preprocessor expects an untranslated column the record never carries
    let renamed = FOREST.replace("\"Fuma\"", "\"SMOKE\"");
    let response = app_with_forest(&renamed, false)
        .oneshot(post_json("/predict", &reference_form()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("SMOKE"));
    assert!(body["message"].is_string());
    assert!(body.get("class_index").is_none());
}

#[tokio::test]
async fn test_reports_unavailable_without_reporter() {
    let response = setup_app(false)
        .oneshot(get("/report/importance"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_importance_and_distribution() {
    let app = setup_app(true);

    let response = app.clone().oneshot(get("/report/importance?top=2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["feature"], "num__Age");

    let response = app.oneshot(get("/report/distribution")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 20);
    assert_eq!(body["classes"][1]["count"], 11);
}

#[tokio::test]
async fn test_partial_dependence_defaults_and_errors() {
    let app = setup_app(true);

    let response = app.clone().oneshot(get("/report/partial-dependence")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["target_class"], 6);

    let response = app
        .clone()
        .oneshot(get("/report/partial-dependence?target=9"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get("/report/partial-dependence?feature=num__FAF"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
