use crate::{
    error::{ApiError, ErrorEnvelope},
    repository::{NewStudent, WriteOutcome},
    state::AppState,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;

const NOT_FOUND: &str = "Student not found";

// Mounted with full paths: the trailing-slash collection route is kept for old clients.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/students", get(list_students).post(create_student))
        .route("/students/", get(list_students).post(create_student))
        .route(
            "/students/{student_id}",
            get(get_student).put(update_student).delete(delete_student),
        )
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

// Unknown students answer 200 with an error envelope, matching the predict contract.
fn not_found() -> Response {
    Json(ErrorEnvelope::new(NOT_FOUND)).into_response()
}

fn validate(student: &NewStudent) -> Result<(), ApiError> {
    if student.name.trim().is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }
    Ok(())
}

fn written(outcome: WriteOutcome) -> Result<Response, ApiError> {
    match outcome {
        WriteOutcome::Written(model) => Ok(Json(model).into_response()),
        WriteOutcome::NotFound => Ok(not_found()),
        WriteOutcome::Duplicate(student_id) => Err(ApiError::conflict(format!(
            "student_id {} already exists",
            student_id
        ))),
    }
}

#[tracing::instrument(name = "GET /students", skip(state))]
pub async fn list_students(State(state): State<AppState>) -> Result<Response, ApiError> {
    let students = state.students.list().await?;
    Ok(Json(students).into_response())
}

#[tracing::instrument(name = "GET /students/{student_id}", skip(state))]
pub async fn get_student(
    State(state): State<AppState>,
    Path(student_id): Path<i32>,
) -> Result<Response, ApiError> {
    Ok(match state.students.find(student_id).await? {
        Some(student) => Json(student).into_response(),
        None => not_found(),
    })
}

#[tracing::instrument(name = "POST /students", skip(state))]
pub async fn create_student(
    State(state): State<AppState>,
    Json(student): Json<NewStudent>,
) -> Result<Response, ApiError> {
    validate(&student)?;
    written(state.students.create(student).await?)
}

#[tracing::instrument(name = "PUT /students/{student_id}", skip(state))]
pub async fn update_student(
    State(state): State<AppState>,
    Path(student_id): Path<i32>,
    Json(student): Json<NewStudent>,
) -> Result<Response, ApiError> {
    validate(&student)?;
    written(state.students.update(student_id, student).await?)
}

#[tracing::instrument(name = "DELETE /students/{student_id}", skip(state))]
pub async fn delete_student(
    State(state): State<AppState>,
    Path(student_id): Path<i32>,
) -> Result<Response, ApiError> {
    if !state.students.delete(student_id).await? {
        return Ok(not_found());
    }
    Ok(Json(MessageResponse {
        message: "Student deleted",
    })
    .into_response())
}
