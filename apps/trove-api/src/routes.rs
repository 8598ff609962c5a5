use axum::{
	Json, Router,
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use crate::state::AppState;
use trove_domain::session::{Session, Turn};
use trove_service::{Error, RetrievalOutcome, RetrievalResult, RetrieveRequest};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/retrieve", post(retrieve))
		.route("/v1/sessions/{session_id}", get(get_session))
		.route("/v1/sessions/{session_id}/turns", post(append_turn))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RetrieveResponse {
	Found(Box<RetrievalResult>),
	Empty { status: &'static str },
}

async fn retrieve(
	State(state): State<AppState>,
	Json(payload): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, ApiError> {
	let response = match state.service.retrieve_with_deadline(payload).await? {
		RetrievalOutcome::Found(result) => RetrieveResponse::Found(Box::new(result)),
		RetrievalOutcome::NoCandidates => RetrieveResponse::Empty { status: "no_candidates" },
	};

	Ok(Json(response))
}

async fn get_session(
	State(state): State<AppState>,
	Path(session_id): Path<String>,
) -> Result<Json<Session>, ApiError> {
	Ok(Json(state.service.get_session(&session_id).await?))
}

async fn append_turn(
	State(state): State<AppState>,
	Path(session_id): Path<String>,
	Json(turn): Json<Turn>,
) -> Result<Json<Session>, ApiError> {
	Ok(Json(state.service.append_turn(&session_id, &turn).await?))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: &'static str,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: &'static str,
	message: String,
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let (status, error_code) = match &err {
			Error::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
			Error::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
			_ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
		};

		if status.is_server_error() {
			tracing::error!(error = %err, "Request failed.");
		}

		Self { status, error_code, message: err.to_string() }
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
