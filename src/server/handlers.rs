//! Route handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tracing::info;

use super::error::{check_content, check_title, limits, ApiError};
use super::AppState;
use crate::cache::{refresh_cache, NoteHit};
use crate::entity::{Lesson, NewNote, Note, NoteTag};
use crate::import::{LessonImport, LessonMeta};
use crate::lesson::{LessonRepo, LessonSave};
use crate::notes::{NoteRepo, NoteUpdate, TagRepo};
use crate::search::{parse_query, search_notes, SearchFilter};
use crate::sync::{extract_class_info, extract_vocabulary, SyncOutcome};
use crate::template::{generate_note_template, TemplateParams};

type ApiResult<T> = Result<T, ApiError>;

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ============================================================================
// Lessons
// ============================================================================

/// Save a lesson and sync every note linked to it
pub async fn save_lesson(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut body): Json<Value>,
) -> ApiResult<Json<SyncOutcome>> {
    let Some(object) = body.as_object_mut() else {
        return Err(ApiError::BadRequest("lesson body must be a JSON object".to_string()));
    };
    match object.get("id").and_then(Value::as_str) {
        Some(body_id) if body_id != id => {
            return Err(ApiError::BadRequest(format!(
                "lesson id '{}' does not match path '{}'",
                body_id, id
            )));
        }
        _ => {
            object.insert("id".to_string(), Value::String(id));
        }
    }

    let lesson: Lesson = serde_json::from_value(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid lesson: {}", e)))?;
    check_title(&lesson.title)?;

    let store = state.store.lock().await;
    let saved = LessonRepo::new(&*store).save(lesson)?;
    store.save()?;
    info!(
        lesson_id = %saved.lesson.id,
        updated = saved.sync.updated_count(),
        "lesson saved"
    );

    Ok(Json(saved.sync))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub id: String,
    pub topic_id: Option<String>,
    #[serde(alias = "topic")]
    pub topic_name: Option<String>,
    pub level: Option<String>,
    pub date: Option<String>,
    pub series_info: Option<String>,
    pub lesson: LessonImport,
}

pub async fn import_lesson(
    State(state): State<AppState>,
    Json(req): Json<ImportRequest>,
) -> ApiResult<(StatusCode, Json<LessonSave>)> {
    let issues = req.lesson.validate();
    if !issues.is_empty() {
        return Err(ApiError::InvalidImport(issues));
    }

    let meta = LessonMeta {
        date: req.date,
        topic_id: req.topic_id,
        topic_name: req.topic_name,
        level: req.level,
        series_info: req.series_info,
    };
    let lesson = req.lesson.into_lesson(&req.id, meta);

    let store = state.store.lock().await;
    let saved = LessonRepo::new(&*store).save(lesson)?;
    store.save()?;

    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn get_lesson(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Lesson>> {
    let store = state.store.lock().await;
    Ok(Json(LessonRepo::new(&*store).get(&id)?))
}

/// Markdown note template prefilled from a lesson
pub async fn lesson_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<String> {
    let store = state.store.lock().await;
    let lesson = LessonRepo::new(&*store).get(&id)?;
    let params = TemplateParams::from_class_info(
        &extract_class_info(&lesson),
        &extract_vocabulary(&lesson),
    );
    Ok(generate_note_template(&params))
}

// ============================================================================
// Notes
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct NoteQuery {
    #[serde(default)]
    pub q: String,
    pub topic: Option<String>,
    /// Comma-separated tag IDs; a note matches if it has any of them
    pub tags: Option<String>,
    pub limit: Option<usize>,
}

impl NoteQuery {
    fn filter(&self) -> (String, SearchFilter) {
        let (text, inline) = parse_query(&self.q);
        let explicit = SearchFilter {
            topic_id: self.topic.clone().filter(|t| !t.is_empty()),
            tag_ids: self
                .tags
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
        };
        (text, inline.merge(explicit))
    }
}

/// A user's notes, newest first, narrowed by text, topic and tags
pub async fn list_notes(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(query): Query<NoteQuery>,
) -> ApiResult<Json<Vec<Note>>> {
    let (text, filter) = query.filter();
    let store = state.store.lock().await;
    let notes = NoteRepo::new(&*store).list_for_user(&user)?;

    Ok(Json(
        search_notes(&notes, &text, &filter)
            .into_iter()
            .cloned()
            .collect(),
    ))
}

/// Ranked search hits with snippets, served from the SQLite cache
pub async fn search(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Query(query): Query<NoteQuery>,
) -> ApiResult<Json<Vec<NoteHit>>> {
    let (text, filter) = query.filter();
    let limit = query
        .limit
        .unwrap_or(state.search_limit)
        .clamp(1, limits::MAX_SEARCH_LIMIT);

    let store = state.store.lock().await;
    let cache = state.cache.lock().await;
    refresh_cache(&store, &cache)?;

    Ok(Json(cache.search_notes(&user, &text, &filter, Some(limit))?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub lesson_id: Option<String>,
    pub topic_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub async fn create_note(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(req): Json<CreateNoteRequest>,
) -> ApiResult<(StatusCode, Json<Note>)> {
    if let Some(title) = &req.title {
        check_title(title)?;
    }
    if let Some(content) = &req.content {
        check_content(content)?;
    }

    let store = state.store.lock().await;
    let note = NoteRepo::new(&*store).create(NewNote {
        user_id: user,
        lesson_id: req.lesson_id,
        topic_id: req.topic_id,
        title: req.title,
        content: req.content,
        tags: req.tags,
    })?;
    store.save()?;

    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn get_note(
    State(state): State<AppState>,
    Path((user, id)): Path<(String, String)>,
) -> ApiResult<Json<Note>> {
    let store = state.store.lock().await;
    Ok(Json(NoteRepo::new(&*store).resolve(&user, &id)?))
}

/// `null` clears a field, absence leaves it alone
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub topic_id: Option<Option<String>>,
    #[serde(default)]
    pub add_tags: Vec<String>,
    #[serde(default)]
    pub remove_tags: Vec<String>,
}

pub async fn update_note(
    State(state): State<AppState>,
    Path((user, id)): Path<(String, String)>,
    Json(req): Json<UpdateNoteRequest>,
) -> ApiResult<Json<Note>> {
    if let Some(title) = &req.title {
        check_title(title)?;
    }
    if let Some(content) = &req.content {
        check_content(content)?;
    }

    let store = state.store.lock().await;
    let repo = NoteRepo::new(&*store);
    let note = repo.resolve(&user, &id)?;
    let updated = repo.update(
        &user,
        &note.id,
        NoteUpdate {
            title: req.title,
            content: req.content,
            topic_id: req.topic_id,
            add_tags: req.add_tags,
            remove_tags: req.remove_tags,
        },
    )?;
    store.save()?;

    Ok(Json(updated))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path((user, id)): Path<(String, String)>,
) -> ApiResult<Json<Note>> {
    let store = state.store.lock().await;
    let repo = NoteRepo::new(&*store);
    let note = repo.resolve(&user, &id)?;
    let deleted = repo.delete(&user, &note.id)?;
    store.save()?;

    Ok(Json(deleted))
}

// ============================================================================
// Tags
// ============================================================================

pub async fn list_tags(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> ApiResult<Json<Vec<NoteTag>>> {
    let store = state.store.lock().await;
    Ok(Json(TagRepo::new(&*store).list(&user)?))
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    pub color: Option<String>,
}

pub async fn create_tag(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Json(req): Json<CreateTagRequest>,
) -> ApiResult<(StatusCode, Json<NoteTag>)> {
    let store = state.store.lock().await;
    let tag = TagRepo::new(&*store).create(&user, &req.name, req.color)?;
    store.save()?;

    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    Path((user, id)): Path<(String, String)>,
) -> ApiResult<Json<NoteTag>> {
    let store = state.store.lock().await;
    let repo = TagRepo::new(&*store);
    let tag = repo.resolve(&user, &id)?;
    let deleted = repo.delete(&user, &tag.id)?;
    store.save()?;

    Ok(Json(deleted))
}
