use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;

use placement_mailer::Mailer;
use placement_storage::Database;

use crate::auth::TokenService;
use crate::workflow::{Clock, PlacementService};
use crate::{api, telemetry};

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    storage: Database,
    clock: Clock,
    service: PlacementService,
    tokens: TokenService,
}

impl AppState {
    pub fn new(
        metrics: PrometheusHandle,
        storage: Database,
        mailer: Mailer,
        tokens: TokenService,
    ) -> Self {
        let clock: Clock = Arc::new(Utc::now);
        let service = PlacementService::new(storage.clone(), mailer, clock.clone());
        Self {
            metrics,
            storage,
            clock,
            service,
            tokens,
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock.clone();
        self.service = PlacementService::new(
            self.storage.clone(),
            self.service.mailer().clone(),
            clock,
        );
        self
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn storage(&self) -> &Database {
        &self.storage
    }

    pub fn service(&self) -> &PlacementService {
        &self.service
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/accounts", post(api::register))
        .route("/account", put(api::update_account))
        .route("/profile", get(api::profile))
        .route("/profile/student", put(api::update_student_profile))
        .route("/profile/company", put(api::update_company_profile))
        .route("/notifications", get(api::notifications))
        .route("/notifications/:id/read", post(api::mark_notification_read))
        .route("/categories", get(api::categories).post(api::create_category))
        .route("/jobs", get(api::jobs).post(api::post_job))
        .route("/jobs/manage", get(api::manage_jobs))
        .route("/jobs/:id", get(api::job_detail).put(api::update_job))
        .route("/jobs/:id/applications", post(api::apply))
        .route("/applications", get(api::applications))
        .route("/applications/:id/status", put(api::update_application_status))
        .route("/applications/:id/interviews", post(api::schedule_interview))
        .route("/interviews", get(api::interviews))
        .route("/interviews/:id", put(api::update_interview))
        .route("/dashboard", get(api::dashboard))
        .route("/statistics", get(api::statistics))
        .route("/statistics/:department", put(api::upsert_statistics))
        .route("/seasons", post(api::create_season))
        .route("/announcements", post(api::post_announcement))
        .route("/events", post(api::create_event))
        .with_state(state)
}

async fn healthz(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").execute(state.storage().pool()).await {
        Ok(_) => StatusCode::OK,
        Err(err) => {
            tracing::error!(stage = "app", error = %err, "health check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use placement_mailer::Outbox;

    use crate::workflow::test_support::fixed_now;

    struct TestApp {
        router: Router,
        outbox: Outbox,
        _dir: TempDir,
    }

    async fn setup() -> TestApp {
        let metrics = telemetry::init_metrics().expect("metrics init");
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("router.db").display());
        let database = Database::connect(&url).await.expect("connect");
        database.run_migrations().await.expect("migrations");

        let outbox = Outbox::default();
        let state = AppState::new(
            metrics,
            database,
            Mailer::Outbox(outbox.clone()),
            TokenService::new(b"test-secret", 3600),
        )
        .with_clock(Arc::new(fixed_now));
        TestApp {
            router: app_router(state),
            outbox,
            _dir: dir,
        }
    }

    impl TestApp {
        async fn call(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut request = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => request
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string())),
                None => request.body(Body::empty()),
            }
            .unwrap();

            let response = self
                .router
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

        async fn register(&self, username: &str, role: &str) -> String {
            let (status, body) = self
                .call(
                    "POST",
                    "/accounts",
                    None,
                    Some(json!({
                        "username": username,
                        "email": format!("{username}@example.edu"),
                        "role": role,
                        "first_name": username,
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "register {username}: {body}");
            body["token"].as_str().expect("token").to_string()
        }
    }

    fn job() -> Value {
        json!({
            "title": "Backend Engineer",
            "job_type": "full_time",
            "description": "Build and run services",
            "location": "Hyderabad",
            "application_deadline": "2026-10-17",
            "positions_available": 2
        })
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let app = setup().await;
        let (status, _) = app.call("GET", "/healthz", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_exports_build_info() {
        let app = setup().await;
        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        let collected = response
            .into_body()
            .collect()
            .await
            .expect("body should read");
        let body = String::from_utf8(collected.to_bytes().to_vec()).expect("utf-8");
        assert!(body.contains("app_build_info"));
        assert!(body.contains("app_uptime_seconds"));
    }

    #[tokio::test]
    async fn registration_token_opens_the_profile() {
        let app = setup().await;
        let token = app.register("ravi", "student").await;

        let (status, body) = app.call("GET", "/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["account"]["username"], "ravi");
        assert!(body["student"]["roll_number"]
            .as_str()
            .expect("roll number")
            .starts_with("TEMP"));

        let (status, body) = app.call("GET", "/notifications", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["unread"], 1);
    }

    #[tokio::test]
    async fn requests_without_a_valid_token_are_unauthenticated() {
        let app = setup().await;
        let (status, body) = app.call("GET", "/dashboard", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["type"], "unauthenticated");

        let (status, _) = app.call("GET", "/dashboard", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn problem_bodies_carry_field_errors() {
        let app = setup().await;
        let (status, body) = app
            .call(
                "POST",
                "/accounts",
                None,
                Some(json!({"username": "", "email": "nope", "role": "student"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["type"], "validation_failed");
        let fields: Vec<&str> = body["errors"]
            .as_array()
            .expect("errors")
            .iter()
            .filter_map(|e| e["field"].as_str())
            .collect();
        assert!(fields.contains(&"username"));
        assert!(fields.contains(&"email"));

        let (status, body) = app
            .call("POST", "/accounts", None, Some(json!({"username": "ravi"})))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["type"], "invalid_body");
    }

    #[tokio::test]
    async fn students_cannot_post_jobs() {
        let app = setup().await;
        let token = app.register("ravi", "student").await;
        let (status, body) = app.call("POST", "/jobs", Some(&token), Some(job())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["type"], "forbidden");
    }

    #[tokio::test]
    async fn apply_then_select_end_to_end() {
        let app = setup().await;
        let officer = app.register("meera", "officer").await;
        let company = app.register("acme", "company").await;
        let student = app.register("ravi", "student").await;

        let (status, posted) = app.call("POST", "/jobs", Some(&company), Some(job())).await;
        assert_eq!(status, StatusCode::CREATED);
        let job_id = posted["id"].as_i64().expect("job id");

        let apply_uri = format!("/jobs/{job_id}/applications");
        let letter = json!({"cover_letter": "I build things."});
        let (status, application) = app
            .call("POST", &apply_uri, Some(&student), Some(letter.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(application["status"], "applied");
        let application_id = application["id"].as_i64().expect("application id");

        let (status, body) = app.call("POST", &apply_uri, Some(&student), Some(letter)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["errors"][0]["field"], "job");

        let (_, detail) = app
            .call("GET", &format!("/jobs/{job_id}"), Some(&student), None)
            .await;
        assert_eq!(detail["has_applied"], true);
        assert_eq!(detail["company_name"], "acme's Company");

        let (status, updated) = app
            .call(
                "PUT",
                &format!("/applications/{application_id}/status"),
                Some(&officer),
                Some(json!({"status": "selected"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "selected");

        let (_, feed) = app.call("GET", "/notifications", Some(&student), None).await;
        assert_eq!(
            feed["notifications"][0]["message"],
            "Your application for Backend Engineer has been updated from applied to selected."
        );

        let emails = app.outbox.messages_to("ravi@example.edu").await;
        let subjects: Vec<&str> = emails.iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(
            subjects,
            vec![
                "Job Application Submitted Successfully",
                "Congratulations! You Are Selected"
            ]
        );

        let (_, listed) = app.call("GET", "/applications", Some(&student), None).await;
        assert_eq!(listed.as_array().expect("list").len(), 1);
    }

    #[tokio::test]
    async fn interview_scheduling_validates_venue_and_shortlists() {
        let app = setup().await;
        let company = app.register("acme", "company").await;
        let student = app.register("ravi", "student").await;
        let (_, posted) = app.call("POST", "/jobs", Some(&company), Some(job())).await;
        let job_id = posted["id"].as_i64().expect("job id");
        let (_, application) = app
            .call(
                "POST",
                &format!("/jobs/{job_id}/applications"),
                Some(&student),
                Some(json!({})),
            )
            .await;
        let uri = format!(
            "/applications/{}/interviews",
            application["id"].as_i64().expect("application id")
        );

        let (status, body) = app
            .call(
                "POST",
                &uri,
                Some(&company),
                Some(json!({"date_time": "2026-10-20T10:00:00Z", "interview_type": "online"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"][0]["field"], "meeting_link");

        let (status, interview) = app
            .call(
                "POST",
                &uri,
                Some(&company),
                Some(json!({
                    "date_time": "2026-10-20T10:00:00Z",
                    "interview_type": "in_person",
                    "location": "Block C, Room 12"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(interview["status"], "scheduled");

        let (_, listed) = app.call("GET", "/applications", Some(&company), None).await;
        assert_eq!(listed[0]["status"], "shortlisted");

        let (_, upcoming) = app.call("GET", "/interviews", Some(&student), None).await;
        assert_eq!(upcoming.as_array().expect("list").len(), 1);
        let (_, past) = app
            .call("GET", "/interviews?when=past", Some(&student), None)
            .await;
        assert!(past.as_array().expect("list").is_empty());
    }

    #[tokio::test]
    async fn dashboard_dispatches_on_role() {
        let app = setup().await;
        let officer = app.register("meera", "officer").await;
        let company = app.register("acme", "company").await;

        let (status, board) = app.call("GET", "/dashboard", Some(&officer), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(board["role"], "officer");
        assert_eq!(board["totals"]["companies"], 1);

        let (_, board) = app.call("GET", "/dashboard", Some(&company), None).await;
        assert_eq!(board["role"], "company");
        assert_eq!(board["job_count"], 0);
    }
}
