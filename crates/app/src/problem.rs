use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::Serialize;
use tracing::{error, warn};

use placement_core::FieldError;

use crate::workflow::WorkflowError;

#[derive(Debug, Serialize)]
struct ProblemDetails {
    #[serde(rename = "type")]
    problem_type: &'static str,
    title: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

/// RFC 7807 error body.
#[derive(Debug)]
pub struct ProblemResponse {
    status: StatusCode,
    body: ProblemDetails,
}

impl ProblemResponse {
    pub fn new<S: Into<String>>(status: StatusCode, problem_type: &'static str, detail: S) -> Self {
        Self {
            status,
            body: ProblemDetails {
                problem_type,
                title: status.canonical_reason().unwrap_or("error"),
                detail: detail.into(),
                errors: Vec::new(),
            },
        }
    }

    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.body.errors = errors;
        self
    }
}

impl From<WorkflowError> for ProblemResponse {
    fn from(err: WorkflowError) -> Self {
        let detail = err.to_string();
        let problem = match err {
            WorkflowError::Unauthenticated(_) => {
                ProblemResponse::new(StatusCode::UNAUTHORIZED, "unauthenticated", detail)
            }
            WorkflowError::Unauthorized(_) => {
                ProblemResponse::new(StatusCode::FORBIDDEN, "forbidden", detail)
            }
            WorkflowError::NotFound(_) => {
                ProblemResponse::new(StatusCode::NOT_FOUND, "not_found", detail)
            }
            WorkflowError::ValidationFailed(errors) => ProblemResponse::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_failed",
                "one or more fields are invalid",
            )
            .with_errors(errors.errors().to_vec()),
            WorkflowError::Conflict { field, message } => {
                ProblemResponse::new(StatusCode::CONFLICT, "conflict", message).with_errors(vec![
                    FieldError {
                        field,
                        message: message.to_string(),
                    },
                ])
            }
            WorkflowError::Storage(err) => {
                error!(stage = "storage", error = %err, "request failed on storage");
                return ProblemResponse::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error",
                );
            }
        };

        counter!("api_requests_rejected_total", "kind" => problem.body.problem_type).increment(1);
        warn!(
            stage = "api",
            kind = problem.body.problem_type,
            status = problem.status.as_u16(),
            detail = %problem.body.detail,
            "request rejected"
        );
        problem
    }
}

impl IntoResponse for ProblemResponse {
    fn into_response(self) -> Response {
        let mut response = Json(self.body).into_response();
        *response.status_mut() = self.status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}
