pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::lookup::handlers as lookup;
use crate::projection::handlers as projection;
use crate::session::handlers as session;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Lookup API (selection widgets)
        .route("/api/v1/lookup/institutions", get(lookup::handle_institutions))
        .route("/api/v1/lookup/fields", get(lookup::handle_fields))
        .route("/api/v1/lookup/areas", get(lookup::handle_areas))
        .route("/api/v1/lookup/occupations", get(lookup::handle_occupations))
        .route("/api/v1/lookup/wage", get(lookup::handle_wage))
        .route("/api/v1/models", get(projection::handle_list_models))
        // Sessions
        .route("/api/v1/sessions", post(session::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(session::handle_get_session).delete(session::handle_delete_session),
        )
        // Projection stages
        .route(
            "/api/v1/sessions/:id/explanation",
            post(projection::handle_explanation),
        )
        .route("/api/v1/sessions/:id/chart", post(projection::handle_chart))
        .route("/api/v1/sessions/:id/plans", post(projection::handle_plans))
        .route(
            "/api/v1/sessions/:id/preferences/next",
            post(projection::handle_next_question),
        )
        .route(
            "/api/v1/sessions/:id/revision",
            post(projection::handle_revision),
        )
        .route(
            "/api/v1/sessions/:id/transition",
            post(projection::handle_transition),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::{CompletionProvider, Config, DEFAULT_MODEL};
    use crate::llm_client::testing::ScriptedClient;
    use crate::llm_client::{CompletionError, ModelCatalog};
    use crate::lookup::fixtures::tables;
    use crate::output_log::OutputLog;
    use crate::projection::models::ImpactPairing;
    use crate::projection::parser::fixtures::{chart_text, revision_text};
    use crate::session::SessionStore;

    fn test_config(dir: &tempfile::TempDir) -> Config {
        Config {
            provider: CompletionProvider::Anthropic,
            api_key: "test-key".to_string(),
            completion_base_url: None,
            default_model: DEFAULT_MODEL.to_string(),
            max_tokens: 1000,
            temperature: 0.5,
            education_table_path: String::new(),
            wage_table_path: String::new(),
            output_log_path: dir.path().join("output.txt").display().to_string(),
            impact_pairing: ImpactPairing::Truncate,
            session_ttl_secs: 3600,
            port: 0,
            rust_log: "debug".to_string(),
        }
    }

    fn test_app(client: ScriptedClient) -> (Router, Arc<ScriptedClient>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let client = Arc::new(client);
        let state = AppState {
            lookup: Arc::new(tables()),
            completion: client.clone(),
            sessions: SessionStore::new(Duration::from_secs(config.session_ttl_secs)),
            output_log: OutputLog::new(&config.output_log_path),
            models: ModelCatalog::for_provider(config.provider, config.default_model.clone()),
            config,
        };
        (build_router(state), client, dir)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn new_session(app: &Router) -> String {
        let (status, body) = send(app, "POST", "/api/v1/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().unwrap().to_string()
    }

    fn selections_body() -> Value {
        json!({
            "institution": "University of California-Berkeley",
            "field": "Computer Science",
            "area": "San Francisco-Oakland-Hayward, CA",
            "occupation": "Software Developers",
            "zipcode": "94704",
            "bedrooms": 2
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _, _dir) = test_app(ScriptedClient::new());
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "projection-api");
    }

    #[tokio::test]
    async fn test_lookup_routes() {
        let (app, _, _dir) = test_app(ScriptedClient::new());

        let (status, body) = send(
            &app,
            "GET",
            "/api/v1/lookup/fields?institution=University%20of%20California-Berkeley",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["choices"], json!(["Computer Science", "Economics"]));

        let (status, body) = send(
            &app,
            "GET",
            "/api/v1/lookup/wage?area=San%20Diego-Carlsbad%2C%20CA&occupation=Actors",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["formatted"], "N/A");
    }

    #[tokio::test]
    async fn test_models_route_lists_default() {
        let (app, _, _dir) = test_app(ScriptedClient::new());
        let (status, body) = send(&app, "GET", "/api/v1/models", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["default_model"], DEFAULT_MODEL);
        assert!(!body["choices"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let (app, _, _dir) = test_app(ScriptedClient::new());
        let (status, body) = send(
            &app,
            "GET",
            "/api/v1/sessions/6f1c2a7e-0b9d-4a51-9f62-3f8e2d1c0a11",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_chart_before_explanation_is_409() {
        let (app, client, _dir) = test_app(ScriptedClient::new());
        let id = new_session(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/chart"),
            Some(json!({})),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "STAGE_NOT_READY");
        assert_eq!(client.prompt_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_model_is_rejected() {
        let (app, _, _dir) = test_app(ScriptedClient::new());
        let id = new_session(&app).await;
        let mut body = selections_body();
        body["model"] = json!("not-a-model");

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/explanation"),
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_bad_json_bodies_use_error_envelope() {
        let (app, client, _dir) = test_app(ScriptedClient::new());
        let id = new_session(&app).await;

        let malformed = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/sessions/{id}/explanation"))
            .header("content-type", "application/json")
            .body(Body::from("{\"institution\": "))
            .unwrap();
        let response = app.clone().oneshot(malformed).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, body) =
            send(&app, "POST", &format!("/api/v1/sessions/{id}/chart"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(!body["error"]["message"].as_str().unwrap().is_empty());
        assert_eq!(client.prompt_count(), 0);
    }

    #[tokio::test]
    async fn test_completion_failure_keeps_explanation() {
        let client = ScriptedClient::new()
            .respond("1. EDUCATION COSTS\n- Annual tuition: 14312")
            .fail(CompletionError::Quota("rate limited".into()));
        let (app, _, _dir) = test_app(client);
        let id = new_session(&app).await;
        let uri = format!("/api/v1/sessions/{id}/explanation");

        let (status, _) = send(&app, "POST", &uri, Some(selections_body())).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, "POST", &uri, Some(selections_body())).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "COMPLETION_FAILURE");

        let (_, snapshot) = send(&app, "GET", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(
            snapshot["explanation"],
            "1. EDUCATION COSTS\n- Annual tuition: 14312"
        );
    }

    #[tokio::test]
    async fn test_full_flow_through_revision() {
        let client = ScriptedClient::new()
            .respond("1. EDUCATION COSTS\n- Annual tuition: 14312")
            .respond(chart_text())
            .respond(revision_text());
        let (app, client, _dir) = test_app(client);
        let id = new_session(&app).await;
        let base = format!("/api/v1/sessions/{id}");

        let (status, body) = send(
            &app,
            "POST",
            &format!("{base}/explanation"),
            Some(selections_body()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["salary"], "$165,320.00");

        let (status, body) = send(&app, "POST", &format!("{base}/chart"), Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["projection"]["series"].as_array().unwrap().len(), 15);

        let (status, body) = send(&app, "POST", &format!("{base}/preferences/next"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["step"], 1);
        assert_eq!(body["question"]["key"], "pet");

        let (status, body) = send(
            &app,
            "POST",
            &format!("{base}/revision"),
            Some(json!({ "answer": "a dog" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["responses_history"].as_array().unwrap().len(), 1);
        assert_eq!(body["rendered"]["impact"].as_array().unwrap().len(), 2);
        assert_eq!(client.prompt_count(), 3);

        let (status, _) = send(&app, "DELETE", &base, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &base, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
