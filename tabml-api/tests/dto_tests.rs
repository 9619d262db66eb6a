use rstest::rstest;
use serde_json::json;
use tabml_api::*;
use tabml_core::{Algorithm, ArtifactRef, GeneratedApi, ModelId, TaskType};
use uuid::Uuid;
use validator::Validate;

#[rstest]
#[case("", false)]
#[case("churn", true)]
#[case(&"x".repeat(256), false)]
fn test_create_model_name_bounds(#[case] name: &str, #[case] valid: bool) {
    let request = CreateModelRequest {
        name: name.to_string(),
        description: None,
    };
    assert_eq!(request.validate().is_ok(), valid);
}

#[test]
fn test_train_request_requires_features() {
    let request: TrainRequest = serde_json::from_value(json!({
        "task": "regression",
        "target_column": "price",
        "feature_columns": [],
    }))
    .unwrap();
    assert!(request.validate().is_err());
}

#[test]
fn test_train_request_rejects_target_as_feature() {
    let request: TrainRequest = serde_json::from_value(json!({
        "task": "regression",
        "target_column": "price",
        "feature_columns": ["area", "price"],
    }))
    .unwrap();
    assert!(request.validate().is_err());
}

#[test]
fn test_create_api_body_parses_algorithm() {
    let body: CreateApiBody = serde_json::from_value(json!({
        "model_id": Uuid::new_v4(),
        "name": "prices",
        "algorithm": "random_forest_regressor",
    }))
    .unwrap();
    assert!(body.validate().is_ok());
    assert_eq!(body.algorithm, Some(Algorithm::RandomForestRegressor));
}

#[test]
fn test_pagination_defaults_and_bounds() {
    let pagination = PaginationQuery::default();
    assert_eq!(pagination.limit(), DEFAULT_PAGE_SIZE);
    assert_eq!(pagination.offset(), 0);

    let too_big = PaginationQuery {
        limit: Some(101),
        offset: None,
    };
    assert!(too_big.validate().is_err());
}

#[test]
fn test_api_response_exposes_version_and_endpoint() {
    let model_id = ModelId::new();
    let api = GeneratedApi::new(
        model_id,
        "prices".to_string(),
        None,
        TaskType::Regression,
        ArtifactRef {
            model_id,
            algorithm: Algorithm::Ridge,
            version: 7,
            path: "artifacts/x/ridge_v7.json".to_string(),
        },
        vec!["area".to_string()],
        "price".to_string(),
    );

    let response = ApiResponse::from(api.clone());
    assert_eq!(response.version, "v7");
    assert_eq!(response.algorithm, Algorithm::Ridge);
    assert_eq!(response.endpoint, format!("/apis/{}/predict", api.id));
    assert_eq!(response.success_rate, None);
}
