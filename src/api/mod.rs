use axum::Json;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query};
use axum::http::{HeaderMap, header};
use axum::routing::{patch, post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::mirror::PendingOperation;
use crate::models::*;
use crate::notes;
use crate::session::SessionState;
use crate::spillover::StorageReference;
use crate::state::AppState;

const UPLOAD_BODY_LIMIT: usize = 64 * 1024 * 1024;

#[derive(Deserialize)]
struct OwnerParams {
    owner: String,
}

#[derive(Deserialize)]
struct ResolveParams {
    reference: String,
}

#[derive(Deserialize)]
struct CompleteItemRequest {
    completed: bool,
}

#[derive(Deserialize)]
struct NoteBody {
    text: String,
}

#[derive(Deserialize)]
struct DeckQueryParams {
    course_id: Option<String>,
}

#[derive(Deserialize)]
struct AuthStateChange {
    user: Option<AuthUser>,
}

#[derive(Serialize)]
struct UploadResponse {
    reference: StorageReference,
    spilled: bool,
}

#[derive(Serialize)]
struct ResolveResponse {
    content: String,
}

#[derive(Serialize)]
struct GcResponse {
    removed: usize,
}

#[derive(Serialize)]
struct NoteResponse {
    course_id: String,
    text: String,
}

#[derive(Serialize)]
struct PendingResponse {
    courses: Vec<PendingOperation>,
    tasks: Vec<PendingOperation>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/join", post(join_class))
        .route("/courses/{id}", get(get_course).patch(update_course))
        .route("/courses/{id}/modules", put(replace_modules))
        .route(
            "/courses/{id}/discussions",
            put(replace_discussions).post(post_discussion),
        )
        .route("/courses/{id}/events", post(add_calendar_event))
        .route("/courses/{id}/submissions", post(submit_assignment))
        .route("/courses/{id}/submissions/grade", patch(grade_submission))
        .route(
            "/courses/{id}/items/{item_id}/complete",
            patch(toggle_item_complete),
        )
        .route("/courses/{id}/note", get(get_note).put(save_note))
        .route(
            "/files",
            post(upload_file).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/files/resolve", get(resolve_file))
        .route("/files/gc", post(collect_garbage))
        .route("/pending", get(list_pending))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", patch(move_task).delete(delete_task))
        .route("/flashcards", get(list_decks).post(create_deck))
        .route("/session", get(session_state).post(auth_state_changed))
        .route("/session/register", post(register))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_courses(State(state): State<AppState>) -> Json<Vec<CourseRecord>> {
    Json(state.mirror.courses().await)
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CourseRecord>, AppError> {
    let course = state.mirror.get(&id).await.ok_or(AppError::NotFound)?;
    Ok(Json(course))
}

async fn create_course(
    State(state): State<AppState>,
    Json(req): Json<NewCourseRequest>,
) -> Result<(StatusCode, Json<CourseRecord>), AppError> {
    let course = state.mirror.create_course(req).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCourseRequest>,
) -> Result<Json<CourseRecord>, AppError> {
    Ok(Json(state.mirror.update_course(&id, req).await?))
}

async fn replace_modules(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(modules): Json<Vec<Module>>,
) -> Result<Json<CourseRecord>, AppError> {
    Ok(Json(state.mirror.replace_modules(&id, modules).await?))
}

async fn replace_discussions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(discussions): Json<Vec<DiscussionMessage>>,
) -> Result<Json<CourseRecord>, AppError> {
    Ok(Json(state.mirror.replace_discussions(&id, discussions).await?))
}

async fn post_discussion(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(msg): Json<NewDiscussionMessage>,
) -> Result<Json<CourseRecord>, AppError> {
    Ok(Json(state.mirror.post_discussion(&id, msg).await?))
}

async fn add_calendar_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(event): Json<NewCalendarEvent>,
) -> Result<Json<CourseRecord>, AppError> {
    Ok(Json(state.mirror.add_calendar_event(&id, event).await?))
}

async fn submit_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SubmitAssignmentRequest>,
) -> Result<Json<CourseRecord>, AppError> {
    Ok(Json(state.mirror.submit_assignment(&id, req).await?))
}

async fn grade_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<GradeSubmissionRequest>,
) -> Result<Json<CourseRecord>, AppError> {
    Ok(Json(state.mirror.grade_submission(&id, req).await?))
}

async fn toggle_item_complete(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, String)>,
    Json(req): Json<CompleteItemRequest>,
) -> Result<Json<CourseRecord>, AppError> {
    Ok(Json(
        state
            .mirror
            .toggle_item_complete(&id, &item_id, req.completed)
            .await?,
    ))
}

async fn join_class(
    State(state): State<AppState>,
    Json(req): Json<JoinClassRequest>,
) -> Result<Json<CourseRecord>, AppError> {
    Ok(Json(state.mirror.join_class(req).await?))
}

async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NoteResponse>, AppError> {
    let text = notes::get_note(state.kv.as_ref(), &id).await?;
    Ok(Json(NoteResponse { course_id: id, text }))
}

async fn save_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<NoteBody>,
) -> Result<StatusCode, AppError> {
    if !state.mirror.contains(&id).await {
        return Err(AppError::NotFound);
    }
    notes::save_note(state.kv.as_ref(), &id, &body.text).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    if body.is_empty() {
        return Err(AppError::BadRequest("empty upload".to_string()));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let reference = state.codec.store_file(&body, content_type).await?;
    let spilled = reference.local_key().is_some();
    Ok((StatusCode::CREATED, Json(UploadResponse { reference, spilled })))
}

async fn resolve_file(
    State(state): State<AppState>,
    Query(params): Query<ResolveParams>,
) -> Json<ResolveResponse> {
    let content = state.codec.resolve(&params.reference).await;
    Json(ResolveResponse { content })
}

async fn collect_garbage(State(state): State<AppState>) -> Result<Json<GcResponse>, AppError> {
    let live = state.mirror.live_content_refs().await;
    let removed = state
        .codec
        .collect_garbage(live.iter().map(String::as_str))
        .await?;
    Ok(Json(GcResponse { removed }))
}

async fn list_pending(State(state): State<AppState>) -> Json<PendingResponse> {
    Json(PendingResponse {
        courses: state.mirror.pending().await,
        tasks: state.tasks.pending().await,
    })
}

async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<OwnerParams>,
) -> Json<Vec<TaskDocument>> {
    Json(state.tasks.list(&params.owner).await)
}

async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<NewTaskRequest>,
) -> Result<(StatusCode, Json<TaskDocument>), AppError> {
    let task = state.tasks.create(req).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn move_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MoveTaskRequest>,
) -> Result<Json<TaskDocument>, AppError> {
    Ok(Json(state.tasks.move_to(&req.owner_id, &id, req.status).await?))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<OwnerParams>,
) -> Result<StatusCode, AppError> {
    state.tasks.delete(&params.owner, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_decks(
    State(state): State<AppState>,
    Query(params): Query<DeckQueryParams>,
) -> Json<Vec<FlashcardDeck>> {
    let decks = match params.course_id {
        Some(course_id) => state.flashcards.for_course(&course_id).await,
        None => state.flashcards.list().await,
    };
    Json(decks)
}

async fn create_deck(
    State(state): State<AppState>,
    Json(req): Json<NewDeckRequest>,
) -> Result<(StatusCode, Json<FlashcardDeck>), AppError> {
    let course_known = match &req.course_id {
        Some(id) => state.mirror.contains(id).await,
        None => true,
    };
    let deck = state.flashcards.add_deck(req, course_known).await?;
    Ok((StatusCode::CREATED, Json(deck)))
}

async fn session_state(State(state): State<AppState>) -> Json<SessionState> {
    Json(state.session.state().await)
}

async fn auth_state_changed(
    State(state): State<AppState>,
    Json(change): Json<AuthStateChange>,
) -> Result<Json<SessionState>, AppError> {
    Ok(Json(state.session.on_auth_state_changed(change.user).await?))
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<SessionState>, AppError> {
    Ok(Json(state.session.register(req).await?))
}
