pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::report::handlers as report;
use crate::state::AppState;
use crate::wizard::handlers as wizard;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/analysis/options", get(wizard::handle_options))
        // Wizard sessions
        .route(
            "/api/v1/analysis/sessions",
            post(wizard::handle_create_session),
        )
        .route(
            "/api/v1/analysis/sessions/:id",
            get(wizard::handle_get_session).delete(wizard::handle_delete_session),
        )
        .route(
            "/api/v1/analysis/sessions/:id/asset",
            put(wizard::handle_update_asset),
        )
        .route(
            "/api/v1/analysis/sessions/:id/configuration",
            put(wizard::handle_update_configuration),
        )
        .route(
            "/api/v1/analysis/sessions/:id/advance",
            post(wizard::handle_advance),
        )
        .route(
            "/api/v1/analysis/sessions/:id/back",
            post(wizard::handle_back),
        )
        .route(
            "/api/v1/analysis/sessions/:id/location",
            post(wizard::handle_location),
        )
        .route(
            "/api/v1/analysis/sessions/:id/analyze",
            post(wizard::handle_analyze),
        )
        .route(
            "/api/v1/analysis/sessions/:id/reset",
            post(wizard::handle_reset),
        )
        // Lead-gated export
        .route(
            "/api/v1/analysis/sessions/:id/report",
            post(report::handle_report),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::llm_client::{AnalysisModel, Completion, CompletionRequest, LlmError};
    use crate::relay::{LeadRelay, RelayError};
    use crate::report::lead::RelayMessage;
    use crate::wizard::models::{GeoPoint, GroundingSource, MapsReference};
    use crate::wizard::prompts::PromptVariant;
    use crate::wizard::session::SessionStore;

    const CASTELLANA_RESPONSE: &str =
        "Texto narrativo.\nSEMAFORO_RIESGOS:Olas de Calor=Alto,Inundaciones=Bajo,Sequías=Medio";

    enum Outcome {
        Text(&'static str),
        MissingKey,
        ServerError,
    }

    /// Returns a fixed outcome and remembers every request it received.
    struct CannedModel {
        outcome: Outcome,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl AnalysisModel for CannedModel {
        async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
            self.requests.lock().unwrap().push(request);
            match self.outcome {
                Outcome::Text(text) => Ok(Completion {
                    text: text.to_string(),
                    sources: vec![GroundingSource {
                        maps: Some(MapsReference {
                            uri: "https://maps.google.com/?cid=93".to_string(),
                            title: "Paseo de la Castellana, 93".to_string(),
                        }),
                    }],
                }),
                Outcome::MissingKey => Err(LlmError::MissingApiKey),
                Outcome::ServerError => Err(LlmError::Api {
                    status: 500,
                    message: "INTERNAL".to_string(),
                }),
            }
        }
    }

    struct RecordingRelay {
        fail: bool,
        sent: Mutex<Vec<RelayMessage>>,
    }

    #[async_trait]
    impl LeadRelay for RecordingRelay {
        async fn send(&self, message: &RelayMessage) -> Result<(), RelayError> {
            self.sent.lock().unwrap().push(message.clone());
            if self.fail {
                Err(RelayError::Rejected {
                    status: 400,
                    message: "The Public Key is invalid".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    struct Harness {
        app: Router,
        model: Arc<CannedModel>,
        relay: Arc<RecordingRelay>,
    }

    fn harness(outcome: Outcome, relay_fails: bool) -> Harness {
        let model = Arc::new(CannedModel {
            outcome,
            requests: Mutex::new(Vec::new()),
        });
        let relay = Arc::new(RecordingRelay {
            fail: relay_fails,
            sent: Mutex::new(Vec::new()),
        });
        let config = Config {
            gemini_api_key: None,
            relay: None,
            prompt_variant: PromptVariant::StrategicBrief,
            session_ttl_minutes: 60,
            cors_allowed_origin: None,
            port: 0,
            rust_log: "info".to_string(),
        };
        let state = AppState {
            config,
            model: model.clone(),
            relay: relay.clone(),
            sessions: SessionStore::new(60),
        };
        Harness {
            app: build_router(state),
            model,
            relay,
        }
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, bytes.to_vec())
    }

    async fn call_json(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, _, bytes) = call(app, method, uri, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn new_session(app: &Router) -> String {
        let (status, view) = call_json(app, Method::POST, "/api/v1/analysis/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        view["id"].as_str().unwrap().to_string()
    }

    /// Drives a fresh session with default form values to the result step.
    async fn session_with_result(app: &Router) -> String {
        let id = new_session(app).await;
        let base = format!("/api/v1/analysis/sessions/{id}");
        let (status, _) = call_json(app, Method::POST, &format!("{base}/advance"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call_json(app, Method::POST, &format!("{base}/analyze"), None).await;
        assert_eq!(status, StatusCode::OK);
        id
    }

    fn lead(consent: bool) -> Value {
        json!({
            "name": "Lucía Gómez",
            "email": "lucia@example.com",
            "phone": "600000000",
            "company": "Inmobiliaria Norte",
            "role": "Dirección General",
            "sector": "Oficinas",
            "interest": "Plan de Descarbonización (CRREM)",
            "consent": consent
        })
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness(Outcome::Text(CASTELLANA_RESPONSE), false);
        let (status, body) = call_json(&h.app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "resilience-api");
    }

    #[tokio::test]
    async fn test_options_lists_choices_and_defaults() {
        let h = harness(Outcome::Text(CASTELLANA_RESPONSE), false);
        let (status, body) = call_json(&h.app, Method::GET, "/api/v1/analysis/options", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["assetTypes"].as_array().unwrap().len(), 5);
        assert_eq!(body["analysisTypes"].as_array().unwrap().len(), 4);
        assert_eq!(body["defaults"]["address"], "Paseo de la Castellana, 93");
        assert_eq!(body["activePromptVariant"], "strategic_brief");
    }

    #[tokio::test]
    async fn test_castellana_analysis_end_to_end() {
        let h = harness(Outcome::Text(CASTELLANA_RESPONSE), false);
        let id = new_session(&h.app).await;
        let base = format!("/api/v1/analysis/sessions/{id}");

        let (status, view) = call_json(&h.app, Method::GET, &base, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["stepIndex"], 1);
        assert_eq!(view["form"]["postalCode"], "28046");
        assert_eq!(view["form"]["assetType"], "Oficinas");
        assert!(view.get("result").is_none());

        let (_, view) = call_json(&h.app, Method::POST, &format!("{base}/advance"), None).await;
        assert_eq!(view["step"], "configureAnalysis");

        let (status, view) = call_json(&h.app, Method::POST, &format!("{base}/analyze"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["stepIndex"], 3);
        assert_eq!(view["loading"], false);
        assert_eq!(view["editable"], false);

        let result = &view["result"];
        assert_eq!(result["analysisText"], "Texto narrativo.");
        let risks = result["risks"].as_array().unwrap();
        let color_of = |hazard: &str| {
            risks
                .iter()
                .find(|r| r["hazard"] == hazard)
                .map(|r| r["color"].as_str().unwrap().to_string())
                .unwrap()
        };
        assert_eq!(color_of("Olas de Calor"), "red");
        assert_eq!(color_of("Inundaciones"), "green");
        assert_eq!(color_of("Sequías"), "yellow");
        assert_eq!(result["verifiedLocation"]["title"], "Paseo de la Castellana, 93");
        assert_eq!(result["callToAction"]["target"], "contact");

        let requests = h.model.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0]
            .prompt
            .contains("Paseo de la Castellana, 93, 28046, España"));
    }

    #[tokio::test]
    async fn test_analyze_from_step_one_conflicts() {
        let h = harness(Outcome::Text(CASTELLANA_RESPONSE), false);
        let id = new_session(&h.app).await;
        let (status, body) = call_json(
            &h.app,
            Method::POST,
            &format!("/api/v1/analysis/sessions/{id}/analyze"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
        assert!(h.model.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_is_recoverable() {
        let h = harness(Outcome::MissingKey, false);
        let id = new_session(&h.app).await;
        let base = format!("/api/v1/analysis/sessions/{id}");
        call_json(&h.app, Method::POST, &format!("{base}/advance"), None).await;

        let (status, body) = call_json(&h.app, Method::POST, &format!("{base}/analyze"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "API_KEY_REQUIRED");

        let (_, view) = call_json(&h.app, Method::GET, &base, None).await;
        assert_eq!(view["stepIndex"], 2);
        assert_eq!(view["loading"], false);
        assert_eq!(view["editable"], true);
    }

    #[tokio::test]
    async fn test_model_failure_is_reported_without_retry() {
        let h = harness(Outcome::ServerError, false);
        let id = new_session(&h.app).await;
        let base = format!("/api/v1/analysis/sessions/{id}");
        call_json(&h.app, Method::POST, &format!("{base}/advance"), None).await;

        let (status, body) = call_json(&h.app, Method::POST, &format!("{base}/analyze"), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "ANALYSIS_FAILED");
        assert_eq!(h.model.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_step_gated_edits() {
        let h = harness(Outcome::Text(CASTELLANA_RESPONSE), false);
        let id = new_session(&h.app).await;
        let base = format!("/api/v1/analysis/sessions/{id}");

        let (status, _) = call_json(
            &h.app,
            Method::PUT,
            &format!("{base}/configuration"),
            Some(json!({ "gla": "20000" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, view) = call_json(
            &h.app,
            Method::PUT,
            &format!("{base}/asset"),
            Some(json!({
                "address": "Avenida Diagonal, 640",
                "postalCode": "08017",
                "assetType": "Data Center"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["form"]["assetType"], "Data Center");

        call_json(&h.app, Method::POST, &format!("{base}/advance"), None).await;
        let (status, body) = call_json(
            &h.app,
            Method::PUT,
            &format!("{base}/configuration"),
            Some(json!({ "pue": "uno coma dos" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (_, view) = call_json(&h.app, Method::POST, &format!("{base}/back"), None).await;
        assert_eq!(view["stepIndex"], 1);
        assert_eq!(view["form"]["address"], "Avenida Diagonal, 640");
    }

    #[tokio::test]
    async fn test_reset_returns_to_step_one_keeping_form() {
        let h = harness(Outcome::Text(CASTELLANA_RESPONSE), false);
        let id = session_with_result(&h.app).await;
        let (status, view) = call_json(
            &h.app,
            Method::POST,
            &format!("/api/v1/analysis/sessions/{id}/reset"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["stepIndex"], 1);
        assert!(view.get("result").is_none());
        assert_eq!(view["form"]["postalCode"], "28046");
    }

    #[tokio::test]
    async fn test_location_is_recorded_once_and_sent_to_model() {
        let h = harness(Outcome::Text(CASTELLANA_RESPONSE), false);
        let id = new_session(&h.app).await;
        let base = format!("/api/v1/analysis/sessions/{id}");

        let (_, body) = call_json(
            &h.app,
            Method::POST,
            &format!("{base}/location"),
            Some(json!({ "latitude": 40.45, "longitude": -3.69 })),
        )
        .await;
        assert_eq!(body["recorded"], true);
        let (status, body) = call_json(
            &h.app,
            Method::POST,
            &format!("{base}/location"),
            Some(json!({ "latitude": 41.38, "longitude": 2.17 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recorded"], false);

        call_json(&h.app, Method::POST, &format!("{base}/advance"), None).await;
        call_json(&h.app, Method::POST, &format!("{base}/analyze"), None).await;
        let requests = h.model.requests.lock().unwrap();
        assert_eq!(
            requests[0].location,
            Some(GeoPoint {
                latitude: 40.45,
                longitude: -3.69
            })
        );
    }

    #[tokio::test]
    async fn test_report_without_consent_never_reaches_relay() {
        let h = harness(Outcome::Text(CASTELLANA_RESPONSE), false);
        let id = session_with_result(&h.app).await;
        let (status, body) = call_json(
            &h.app,
            Method::POST,
            &format!("/api/v1/analysis/sessions/{id}/report"),
            Some(lead(false)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(h.relay.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_relay_still_returns_pdf() {
        let h = harness(Outcome::Text(CASTELLANA_RESPONSE), true);
        let id = session_with_result(&h.app).await;
        let (status, headers, bytes) = call(
            &h.app,
            Method::POST,
            &format!("/api/v1/analysis/sessions/{id}/report"),
            Some(lead(true)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"informe-resiliencia-28046-paseo-de-la-castellana-93.pdf\""
        );
        assert!(bytes.starts_with(b"%PDF"));

        let sent = h.relay.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].email, "lucia@example.com");
        assert!(sent[0].message.contains("Olas de Calor: ALTO"));
    }

    #[tokio::test]
    async fn test_report_requires_a_result() {
        let h = harness(Outcome::Text(CASTELLANA_RESPONSE), false);
        let id = new_session(&h.app).await;
        let (status, _) = call_json(
            &h.app,
            Method::POST,
            &format!("/api/v1/analysis/sessions/{id}/report"),
            Some(lead(true)),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(h.relay.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_and_deleted_sessions() {
        let h = harness(Outcome::Text(CASTELLANA_RESPONSE), false);
        let (status, body) = call_json(
            &h.app,
            Method::GET,
            "/api/v1/analysis/sessions/4f1c2b8e-0000-4000-8000-000000000000",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let id = new_session(&h.app).await;
        let uri = format!("/api/v1/analysis/sessions/{id}");
        let (status, _) = call_json(&h.app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call_json(&h.app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
