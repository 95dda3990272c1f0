use std::{sync::Arc, time::Instant};

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;

use jobtrack_core::{
    ApplicationId, ApplicationInput, ApplicationRecord, ApplicationService, ApplicationStore,
    MonthlyCount, Summary, TimelineEntry,
};

use crate::problem::ProblemResponse;
use crate::telemetry;

type ApiResult<T> = Result<Json<T>, ProblemResponse>;

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    service: Arc<ApplicationService<dyn ApplicationStore>>,
}

impl AppState {
    pub fn new(metrics: PrometheusHandle, store: Arc<dyn ApplicationStore>) -> Self {
        Self {
            metrics,
            service: Arc::new(ApplicationService::new(store)),
        }
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn service(&self) -> &ApplicationService<dyn ApplicationStore> {
        &self.service
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/applications", get(list_applications).post(create_application))
        .route("/applications/counts", get(summary_counts))
        .route("/applications/counts/months", get(monthly_counts))
        .route(
            "/applications/:id",
            get(get_application)
                .put(update_application)
                .delete(delete_application),
        )
        .route("/timeline", post(timeline))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> Response {
    let body = telemetry::render_metrics(state.metrics());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        Body::from(body),
    )
        .into_response()
}

async fn list_applications(State(state): State<AppState>) -> ApiResult<Vec<ApplicationRecord>> {
    Ok(Json(state.service().list_all().await?))
}

async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApplicationRecord> {
    Ok(Json(state.service().get_by_id(&ApplicationId(id)).await?))
}

async fn summary_counts(State(state): State<AppState>) -> ApiResult<Summary> {
    let started = Instant::now();
    let result = state.service().compute_summary().await;
    telemetry::record_stats("summary", result.is_ok(), started.elapsed());
    Ok(Json(result?))
}

async fn monthly_counts(State(state): State<AppState>) -> ApiResult<Vec<MonthlyCount>> {
    let started = Instant::now();
    let result = state.service().compute_monthly_histogram().await;
    telemetry::record_stats("monthly", result.is_ok(), started.elapsed());
    Ok(Json(result?))
}

async fn create_application(
    State(state): State<AppState>,
    payload: Result<Json<ApplicationInput>, JsonRejection>,
) -> ApiResult<ApplicationRecord> {
    let Json(input) = payload.inspect_err(|_| telemetry::record_mutation("create", false))?;
    let result = state.service().create_application(input).await;
    telemetry::record_mutation("create", result.is_ok());
    Ok(Json(result?))
}

async fn update_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ApplicationInput>, JsonRejection>,
) -> ApiResult<ApplicationRecord> {
    let Json(input) = payload.inspect_err(|_| telemetry::record_mutation("update", false))?;
    let result = state
        .service()
        .update_application(&ApplicationId(id), input)
        .await;
    telemetry::record_mutation("update", result.is_ok());
    Ok(Json(result?))
}

async fn delete_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApplicationId> {
    let result = state.service().delete_application(&ApplicationId(id)).await;
    telemetry::record_mutation("delete", result.is_ok());
    Ok(Json(result?))
}

async fn timeline(
    State(state): State<AppState>,
    payload: Result<Json<Vec<Option<DateTime<Utc>>>>, JsonRejection>,
) -> ApiResult<Vec<TimelineEntry>> {
    let Json(dates) = payload?;
    Ok(Json(state.service().build_timeline(&dates)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, Request};
    use http_body_util::BodyExt;
    use jobtrack_core::InMemoryStore;
    use jobtrack_storage::Database;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn memory_state() -> AppState {
        let metrics = telemetry::init_metrics().expect("metrics init");
        AppState::new(metrics, Arc::new(InMemoryStore::new()))
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app
            .clone()
            .oneshot(request)
            .await
            .expect("handler should respond");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should read")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    fn application(company: &str, location: &str, status: &str, submitted: Option<&str>) -> Value {
        json!({
            "company": company,
            "position": "Software Engineer",
            "location": location,
            "status": status,
            "dateSubmitted": submitted,
        })
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let app = app_router(memory_state());
        let (status, _) = send(&app, Method::GET, "/healthz", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_exports_build_info() {
        let app = app_router(memory_state());

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        let collected = response.into_body().collect().await.expect("body should read");
        let body = String::from_utf8(collected.to_bytes().to_vec()).expect("utf-8");
        assert!(body.contains("app_build_info"));
        assert!(body.contains("app_uptime_seconds"));
    }

    #[tokio::test]
    async fn lists_undated_applications_first() {
        let app = app_router(memory_state());
        for payload in [
            application("A", "Remote", "Applied", Some("2024-01-01T00:00:00Z")),
            application("B", "Remote", "Applied", None),
            application("C", "Remote", "Applied", Some("2024-06-01T00:00:00Z")),
        ] {
            let (status, _) = send(&app, Method::POST, "/applications", Some(payload)).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(&app, Method::GET, "/applications", None).await;
        assert_eq!(status, StatusCode::OK);
        let companies: Vec<_> = body
            .as_array()
            .expect("array body")
            .iter()
            .map(|record| record["company"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(companies, ["B", "C", "A"]);
    }

    #[tokio::test]
    async fn create_with_blank_company_is_a_validation_problem() {
        let app = app_router(memory_state());
        let (status, body) = send(
            &app,
            Method::POST,
            "/applications",
            Some(application("  ", "Remote", "Applied", None)),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["type"], "validation");

        let (_, listed) = send(&app, Method::GET, "/applications", None).await;
        assert_eq!(listed, json!([]));
    }

    async fn send_raw(
        app: &Router,
        method: Method,
        uri: &str,
        content_type: Option<&str>,
        body: &str,
    ) -> (StatusCode, Option<String>, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let response = app
            .clone()
            .oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
            .expect("handler should respond");
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should read")
            .to_bytes();
        (status, content_type, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn malformed_bodies_are_validation_problems() {
        let app = app_router(memory_state());
        let cases = [
            (Method::POST, "/applications", Some("application/json"), r#"{"company":123}"#),
            (Method::POST, "/applications", Some("application/json"), "{not json"),
            (Method::POST, "/applications", None, r#"{"company":"Acme"}"#),
            (Method::PUT, "/applications/some-id", Some("application/json"), "42"),
            (Method::POST, "/timeline", Some("application/json"), r#"["yesterday"]"#),
        ];

        for (method, uri, content_type, body) in cases {
            let (status, content_type, problem) =
                send_raw(&app, method, uri, content_type, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {body}");
            assert_eq!(content_type.as_deref(), Some("application/problem+json"));
            assert_eq!(problem["type"], "validation");
        }

        let (_, listed) = send(&app, Method::GET, "/applications", None).await;
        assert_eq!(listed, json!([]));
    }

    #[tokio::test]
    async fn update_get_and_delete_round_trip() {
        let app = app_router(memory_state());
        let (_, created) = send(
            &app,
            Method::POST,
            "/applications",
            Some(application("Acme", "Remote", "Applied", None)),
        )
        .await;
        let id = created["id"].as_str().expect("id").to_string();
        let uri = format!("/applications/{id}");

        let (status, updated) = send(
            &app,
            Method::PUT,
            &uri,
            Some(application("Acme", "Houston", "Interview Scheduled", None)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["id"], id.as_str());
        assert_eq!(updated["status"], "Interview Scheduled");

        let (status, fetched) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, updated);

        let (status, deleted) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted, json!(id));

        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["type"], "not_found");
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let app = app_router(memory_state());
        let (status, body) = send(
            &app,
            Method::PUT,
            "/applications/does-not-exist",
            Some(application("Acme", "Remote", "Applied", None)),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["type"], "not_found");
    }

    #[tokio::test]
    async fn counts_and_months_over_sqlite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("app.db").display());
        let database = Database::connect(&url, 5).await.expect("connect");
        database.run_migrations().await.expect("migrations");
        let metrics = telemetry::init_metrics().expect("metrics init");
        let app = app_router(AppState::new(metrics, Arc::new(database.applications())));

        for payload in [
            application("A", "Houston, TX", "Offer Received", Some("2024-03-02T10:00:00Z")),
            application("B", "Remote", "Interview Scheduled", Some("2024-03-20T10:00:00Z")),
            application("C", "Remote", "Offer Received", Some("2024-04-01T10:00:00Z")),
            application("D", "Austin", "Applied", None),
        ] {
            let (status, _) = send(&app, Method::POST, "/applications", Some(payload)).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, counts) = send(&app, Method::GET, "/applications/counts", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            counts,
            json!({
                "submittedCount": 3,
                "interviewCount": 1,
                "offerCount": 2,
                "remoteCount": 2,
                "houstonCount": 1,
            })
        );

        let (status, months) = send(&app, Method::GET, "/applications/counts/months", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            months,
            json!([
                { "year": 2024, "month": 3, "count": 2 },
                { "year": 2024, "month": 4, "count": 1 },
            ])
        );
    }

    #[tokio::test]
    async fn timeline_pairs_dates_with_stages() {
        let app = app_router(memory_state());
        let (status, body) = send(
            &app,
            Method::POST,
            "/timeline",
            Some(json!(["2024-01-05T00:00:00Z", null, "2024-01-19T00:00:00Z"])),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().expect("array body");
        assert_eq!(entries.len(), 7);
        assert_eq!(entries[0]["activity"], "Date Submitted");
        assert_eq!(entries[0]["date"], "2024-01-05T00:00:00Z");
        assert!(entries[1]["date"].is_null());
        assert_eq!(entries[2]["activity"], "1st Interview");
        assert!(entries[6]["date"].is_null());
    }
}
