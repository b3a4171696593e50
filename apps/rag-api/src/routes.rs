use axum::{
	Json, Router,
	extract::State,
	http::{HeaderMap, StatusCode, header},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use crate::state::AppState;
use rag_domain::Chunk;
use rag_service::{AnswerOutput, AnswerRequest, Error};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/rag/ask", post(ask))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
	pub answer: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub chunks: Option<Vec<Chunk>>,
}
impl From<AnswerOutput> for AskResponse {
	fn from(output: AnswerOutput) -> Self {
		match output {
			AnswerOutput::Plain(answer) => Self { answer, chunks: None },
			AnswerOutput::Traced(trace) =>
				Self { answer: trace.answer, chunks: Some(trace.chunks) },
		}
	}
}

async fn ask(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<AnswerRequest>,
) -> Result<Json<AskResponse>, ApiError> {
	authorize(&state, &headers)?;

	let output = state.service.answer(payload).await?;

	Ok(Json(output.into()))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
	let Some(expected) = state.auth_token.as_deref() else {
		return Ok(());
	};
	let presented = headers
		.get(header::AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.strip_prefix("Bearer "));

	if presented == Some(expected) {
		Ok(())
	} else {
		Err(json_error(
			StatusCode::UNAUTHORIZED,
			"unauthorized",
			"Missing or invalid bearer token.",
		))
	}
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError { status, error_code: code.to_string(), message: message.into() }
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let (status, code) = match &err {
			Error::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
			Error::UnsupportedFormat { .. } => (StatusCode::BAD_REQUEST, "unsupported_format"),
			Error::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
			Error::Embedding(_) => (StatusCode::BAD_GATEWAY, "embedding_failed"),
			Error::Generation { .. } => (StatusCode::BAD_GATEWAY, "generation_failed"),
			Error::Rerank { .. } => (StatusCode::BAD_GATEWAY, "rerank_failed"),
			Error::CapabilityUnavailable { .. } =>
				(StatusCode::BAD_GATEWAY, "capability_unavailable"),
			Error::Store { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
			_ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
		};

		if status.is_server_error() {
			tracing::error!(error = %err, error_code = code, "Request failed.");
		}

		json_error(status, code, err.to_string())
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
