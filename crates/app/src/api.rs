//! JSON handlers. Each one authenticates, delegates to the workflow layer and
//! maps failures to problem responses.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};

use placement_core::inputs::{
    AccountUpdate, AnnouncementDraft, CategoryDraft, CompanyProfileUpdate, EventDraft,
    InterviewDraft, InterviewPatch, JobPostingDraft, NewAccount, NewApplication, SeasonDraft,
    StatisticsDraft, StatusUpdate, StudentProfileUpdate,
};
use placement_core::types::{Account, ApplicationStatus, InterviewStatus};

use crate::auth::authenticate;
use crate::problem::ProblemResponse;
use crate::router::AppState;
use crate::workflow::{JobQuery, When};

type ApiResult<T> = Result<T, ProblemResponse>;
type JsonBody<T> = Result<Json<T>, JsonRejection>;

/// Unwraps a JSON body, turning extractor rejections into problem responses.
fn payload<T>(body: JsonBody<T>) -> ApiResult<T> {
    body.map(|Json(value)| value).map_err(|rejection| {
        counter!("api_requests_rejected_total", "kind" => "invalid_body").increment(1);
        ProblemResponse::new(rejection.status(), "invalid_body", rejection.body_text())
    })
}

fn created<T: Serialize>(value: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(value))
}

#[derive(Debug, Serialize)]
struct Registration {
    account: Account,
    token: String,
    expires_at: chrono::DateTime<chrono::Utc>,
}

pub async fn register(
    State(state): State<AppState>,
    body: JsonBody<NewAccount>,
) -> ApiResult<impl IntoResponse> {
    let account = state.service().register(payload(body)?).await?;
    let issued = state.tokens().issue(&account, state.now()).map_err(|err| {
        tracing::error!(stage = "auth", error = %err, "failed to issue token");
        ProblemResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "failed to issue token",
        )
    })?;
    Ok(created(Registration {
        account,
        token: issued.token,
        expires_at: issued.expires_at,
    }))
}

pub async fn profile(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(Json(state.service().profile(actor).await?))
}

pub async fn update_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: JsonBody<AccountUpdate>,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(Json(state.service().update_account(actor, payload(body)?).await?))
}

pub async fn update_student_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: JsonBody<StudentProfileUpdate>,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(Json(
        state
            .service()
            .update_student_profile(actor, payload(body)?)
            .await?,
    ))
}

pub async fn update_company_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: JsonBody<CompanyProfileUpdate>,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(Json(
        state
            .service()
            .update_company_profile(actor, payload(body)?)
            .await?,
    ))
}

pub async fn notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(Json(state.service().notifications(actor).await?))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(notification_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(Json(
        state
            .service()
            .mark_notification_read(actor, notification_id)
            .await?,
    ))
}

pub async fn categories(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    authenticate(&state, &headers).await?;
    Ok(Json(state.service().categories().await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: JsonBody<CategoryDraft>,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(created(
        state.service().create_category(actor, payload(body)?).await?,
    ))
}

pub async fn jobs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<JobQuery>,
) -> ApiResult<impl IntoResponse> {
    authenticate(&state, &headers).await?;
    Ok(Json(state.service().jobs(query).await?))
}

pub async fn post_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: JsonBody<JobPostingDraft>,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(created(state.service().post_job(actor, payload(body)?).await?))
}

pub async fn manage_jobs(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(Json(state.service().manage_jobs(actor).await?))
}

pub async fn job_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(job_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(Json(state.service().job_detail(actor, job_id).await?))
}

pub async fn update_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(job_id): Path<i64>,
    body: JsonBody<JobPostingDraft>,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(Json(
        state
            .service()
            .update_job(actor, job_id, payload(body)?)
            .await?,
    ))
}

pub async fn apply(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(job_id): Path<i64>,
    body: JsonBody<NewApplication>,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(created(
        state.service().apply(actor, job_id, payload(body)?).await?,
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationQuery {
    status: Option<ApplicationStatus>,
}

pub async fn applications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ApplicationQuery>,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(Json(state.service().applications(actor, query.status).await?))
}

pub async fn update_application_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(application_id): Path<i64>,
    body: JsonBody<StatusUpdate>,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    let update = payload(body)?;
    Ok(Json(
        state
            .service()
            .update_application_status(actor, application_id, update.status)
            .await?,
    ))
}

pub async fn schedule_interview(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(application_id): Path<i64>,
    body: JsonBody<InterviewDraft>,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(created(
        state
            .service()
            .schedule_interview(actor, application_id, payload(body)?)
            .await?,
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct InterviewQuery {
    status: Option<InterviewStatus>,
    #[serde(default)]
    when: When,
}

pub async fn interviews(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<InterviewQuery>,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(Json(
        state
            .service()
            .interviews(actor, query.status, query.when)
            .await?,
    ))
}

pub async fn update_interview(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(interview_id): Path<i64>,
    body: JsonBody<InterviewPatch>,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(Json(
        state
            .service()
            .update_interview(actor, interview_id, payload(body)?)
            .await?,
    ))
}

pub async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(Json(state.service().dashboard(actor).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct StatisticsQuery {
    season: Option<i64>,
}

pub async fn statistics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<StatisticsQuery>,
) -> ApiResult<impl IntoResponse> {
    authenticate(&state, &headers).await?;
    Ok(Json(state.service().statistics(query.season).await?))
}

pub async fn create_season(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: JsonBody<SeasonDraft>,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(created(
        state.service().create_season(actor, payload(body)?).await?,
    ))
}

pub async fn upsert_statistics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(department): Path<String>,
    body: JsonBody<StatisticsDraft>,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(Json(
        state
            .service()
            .upsert_statistics(actor, &department, payload(body)?)
            .await?,
    ))
}

pub async fn post_announcement(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: JsonBody<AnnouncementDraft>,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(created(
        state
            .service()
            .post_announcement(actor, payload(body)?)
            .await?,
    ))
}

pub async fn create_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: JsonBody<EventDraft>,
) -> ApiResult<impl IntoResponse> {
    let actor = authenticate(&state, &headers).await?;
    Ok(created(state.service().create_event(actor, payload(body)?).await?))
}
