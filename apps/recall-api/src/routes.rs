use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use recall_domain::TagType;
use recall_service::{Error as ServiceError, IngestedNote, QueryAnswer};
use recall_storage::{AttachedTag, Note, Tag};

use crate::state::AppState;

const DEFAULT_LIST_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct NoteBody {
	pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryBody {
	pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct AddTagBody {
	pub name: String,
	#[serde(rename = "type", default = "default_tag_type")]
	pub tag_type: String,
	pub value: Option<String>,
	pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
	pub limit: Option<u32>,
	pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TagSearchParams {
	#[serde(default)]
	pub q: String,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/notes", get(list_notes).post(create_note))
		.route("/v1/notes/{note_id}", get(get_note).put(update_note).delete(delete_note))
		.route("/v1/notes/{note_id}/tags", get(note_tags).post(add_note_tag))
		.route("/v1/query", post(query))
		.route("/v1/tags", get(search_tags))
		.route("/v1/tags/{name}/notes", get(notes_for_tag))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn create_note(
	State(state): State<AppState>,
	Json(body): Json<NoteBody>,
) -> Result<(StatusCode, Json<IngestedNote>), ApiError> {
	let ingested = state.service.ingest_note(&body.text).await?;

	Ok((StatusCode::CREATED, Json(ingested)))
}

async fn list_notes(
	State(state): State<AppState>,
	Query(params): Query<ListParams>,
) -> Result<Json<Vec<Note>>, ApiError> {
	let notes = state
		.service
		.list_notes(params.limit.unwrap_or(DEFAULT_LIST_LIMIT), params.offset.unwrap_or(0))
		.await?;

	Ok(Json(notes))
}

async fn get_note(
	State(state): State<AppState>,
	Path(note_id): Path<i64>,
) -> Result<Json<Note>, ApiError> {
	Ok(Json(state.service.get_note(note_id).await?))
}

async fn update_note(
	State(state): State<AppState>,
	Path(note_id): Path<i64>,
	Json(body): Json<NoteBody>,
) -> Result<Json<IngestedNote>, ApiError> {
	Ok(Json(state.service.update_note(note_id, &body.text).await?))
}

async fn delete_note(
	State(state): State<AppState>,
	Path(note_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
	state.service.delete_note(note_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn note_tags(
	State(state): State<AppState>,
	Path(note_id): Path<i64>,
) -> Result<Json<Vec<AttachedTag>>, ApiError> {
	Ok(Json(state.service.tags_for_note(note_id).await?))
}

async fn add_note_tag(
	State(state): State<AppState>,
	Path(note_id): Path<i64>,
	Json(body): Json<AddTagBody>,
) -> Result<(StatusCode, Json<AttachedTag>), ApiError> {
	let tag_type = body.tag_type.parse::<TagType>().map_err(|err| {
		ApiError::new(StatusCode::BAD_REQUEST, "invalid_request", err.to_string())
	})?;
	let attached = state
		.service
		.add_tag_to_note(
			note_id,
			&body.name,
			tag_type,
			body.value.as_deref(),
			body.metadata.as_ref(),
		)
		.await?;

	Ok((StatusCode::CREATED, Json(attached)))
}

async fn query(
	State(state): State<AppState>,
	Json(body): Json<QueryBody>,
) -> Result<Json<QueryAnswer>, ApiError> {
	Ok(Json(state.service.answer_query(&body.query).await?))
}

async fn search_tags(
	State(state): State<AppState>,
	Query(params): Query<TagSearchParams>,
) -> Result<Json<Vec<Tag>>, ApiError> {
	Ok(Json(state.service.find_tags(&params.q).await?))
}

async fn notes_for_tag(
	State(state): State<AppState>,
	Path(name): Path<String>,
) -> Result<Json<Vec<Note>>, ApiError> {
	Ok(Json(state.service.entries_for_tag_name(&name).await?))
}

fn default_tag_type() -> String {
	TagType::Entity.as_str().to_string()
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
impl ApiError {
	fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
		Self { status, error_code, message: message.into() }
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let (status, code) = match &err {
			ServiceError::ParseFailure { .. } =>
				(StatusCode::UNPROCESSABLE_ENTITY, "parse_failure"),
			ServiceError::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
			ServiceError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
			ServiceError::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
			ServiceError::DependencyUnavailable { .. } =>
				(StatusCode::SERVICE_UNAVAILABLE, "dependency_unavailable"),
			ServiceError::Storage { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
		};

		if status.is_server_error() {
			tracing::error!(error = %err, "Request failed.");
		}

		Self::new(status, code, err.to_string())
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
