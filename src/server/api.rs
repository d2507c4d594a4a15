use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sitecraft_common::{Fragment, Message};
use tokio_util::sync::CancellationToken;

use crate::chat::{ConversationState, TurnOutcome};
use crate::context::AppContext;
use crate::errors::{ChatError, PatchError, RefineError, StoreError, VideoError};
use crate::patch::{self, Patch, PatchOutcome};
use crate::preview::{ClickAction, ClickTarget, Preview, render_document};
use crate::region;
use crate::refine::{ComposedPrompt, RefinementPayload, compose_prompt};
use crate::store::{Project, ProjectStore};
use crate::video::{DownloadRequest, MetadataRequest};

pub type SharedState = Arc<AppContext>;

// ── Request / response types ──────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct ChatMessageRequest {
    pub message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineRequest {
    #[serde(flatten)]
    pub payload: RefinementPayload,
    pub source_image_url: String,
}

/// A chat turn and whether it reached the store.
#[derive(Serialize)]
pub struct ChatTurnResponse {
    #[serde(flatten)]
    pub outcome: TurnOutcome,
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Deserialize)]
pub struct MoveFragmentRequest {
    /// Zero-based destination index.
    pub to: usize,
}

/// Edit applied to the element a click selects.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SelectionEdit {
    SaveInline { html: String },
    Remove,
    ChooseImage { url: String },
}

impl SelectionEdit {
    fn name(&self) -> &'static str {
        match self {
            SelectionEdit::SaveInline { .. } => "save_inline",
            SelectionEdit::Remove => "remove",
            SelectionEdit::ChooseImage { .. } => "choose_image",
        }
    }
}

#[derive(Deserialize)]
pub struct EditSelectionRequest {
    pub target: ClickTarget,
    #[serde(flatten)]
    pub edit: SelectionEdit,
}

#[derive(Serialize)]
pub struct RefineResponse {
    pub payload: RefinementPayload,
    pub composed: ComposedPrompt,
}

/// Project as shown to clients: markers filtered from the transcript.
#[derive(Serialize)]
pub struct ProjectView {
    pub id: String,
    pub name: String,
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
    pub fragments: Vec<Fragment>,
    pub messages: Vec<Message>,
    pub state: ConversationState,
}

impl From<&Project> for ProjectView {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            revision: project.revision,
            updated_at: project.updated_at,
            fragments: project.page.fragments().to_vec(),
            messages: project.transcript.visible().cloned().collect(),
            state: ConversationState::from_transcript(&project.transcript),
        }
    }
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ProjectNotFound { .. } => ApiError::NotFound(e.to_string()),
            StoreError::RevisionConflict { .. } => ApiError::Conflict(e.to_string()),
            StoreError::Io { .. } | StoreError::Serde(_) => {
                tracing::error!(error = %e, "store failure");
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::EmptyMessage => ApiError::BadRequest(e.to_string()),
            ChatError::Store(inner) => inner.into(),
            ChatError::Other(inner) => ApiError::Internal(inner.to_string()),
        }
    }
}

impl From<PatchError> for ApiError {
    fn from(e: PatchError) -> Self {
        match e {
            PatchError::ElementNotFound { .. } => ApiError::NotFound(e.to_string()),
            PatchError::NotAnImage { .. } => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<RefineError> for ApiError {
    fn from(e: RefineError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<VideoError> for ApiError {
    fn from(e: VideoError) -> Self {
        let message = e.user_message();
        match e {
            VideoError::MediaNotFound { .. } => ApiError::NotFound(message),
            _ if e.is_client_error() => ApiError::BadRequest(message),
            _ => {
                tracing::error!(error = %e, "video tool failure");
                ApiError::Internal(message)
            }
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/{id}", get(get_project))
        .route("/api/projects/{id}/chat", post(chat))
        .route("/api/projects/{id}/patch", post(apply_patch))
        .route("/api/projects/{id}/preview", get(preview))
        .route("/api/projects/{id}/select", post(select_element))
        .route("/api/projects/{id}/edit", post(edit_selection))
        .route("/api/projects/{id}/fragments/{fid}", delete(remove_fragment))
        .route("/api/projects/{id}/fragments/{fid}/move", post(move_fragment))
        .route("/api/video/metadata", post(video_metadata))
        .route("/api/video/download", post(video_download))
        .route("/api/refine/payload", post(refine_payload))
        .route("/health", get(health_check))
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Run a synchronous store operation off the async workers.
async fn with_store<T, F>(store: &ProjectStore, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(ProjectStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || f(store))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

async fn load_project(state: &SharedState, id: &str) -> Result<Project, ApiError> {
    let id = id.to_string();
    with_store(&state.store, move |store| store.load(&id)).await
}

/// 404 before any lock is taken for an unknown id.
async fn ensure_project(state: &SharedState, id: &str) -> Result<(), ApiError> {
    let id = id.to_string();
    with_store(&state.store, move |store| {
        if store.exists(&id) {
            Ok(())
        } else {
            Err(StoreError::ProjectNotFound { id })
        }
    })
    .await
}

async fn save_project(state: &SharedState, mut project: Project) -> Result<Project, ApiError> {
    with_store(&state.store, move |store| {
        store.save(&mut project)?;
        Ok(project)
    })
    .await
}

fn patch_response(outcome: &PatchOutcome, project: &Project) -> serde_json::Value {
    serde_json::json!({
        "fragment_id": outcome.fragment_id,
        "fragment_index": outcome.fragment_index,
        "revision": project.revision,
    })
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn list_projects(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let projects = with_store(&state.store, |store| store.list()).await?;
    Ok(Json(projects))
}

async fn create_project(
    State(state): State<SharedState>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".into()));
    }
    let project = with_store(&state.store, move |store| store.create(&name)).await?;
    Ok((StatusCode::CREATED, Json(ProjectView::from(&project))))
}

async fn get_project(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let project = load_project(&state, &id).await?;
    Ok(Json(ProjectView::from(&project)))
}

async fn chat(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<ChatMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_project(&state, &id).await?;
    let _turn = state.lock_project(&id).await;

    let project = load_project(&state, &id).await?;
    let mut session = state.session(project);
    let outcome = session.send(&req.message, &CancellationToken::new()).await?;
    // Another writer won the race: the client must reload before retrying
    let warning = match session.take_save_error() {
        Some(e @ StoreError::RevisionConflict { .. }) => return Err(e.into()),
        Some(e) => Some(e.to_string()),
        None => None,
    };
    Ok(Json(ChatTurnResponse {
        saved: warning.is_none() && outcome != TurnOutcome::Cancelled,
        warning,
        outcome,
    }))
}

async fn apply_patch(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(patch): Json<Patch>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_project(&state, &id).await?;
    let _turn = state.lock_project(&id).await;

    let mut project = load_project(&state, &id).await?;
    let outcome = patch::apply(&mut project.page, &patch)?;
    let project = save_project(&state, project).await?;
    Ok(Json(patch_response(&outcome, &project)))
}

/// What a click on `target` opens: the image bank, the inline editor, or
/// nothing.
async fn select_element(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(target): Json<ClickTarget>,
) -> Result<impl IntoResponse, ApiError> {
    let project = load_project(&state, &id).await?;
    let mut preview = Preview::new(project.page, state.config.toml.preview.lang.clone());
    Ok(Json(preview.click(&target)))
}

/// Select `target` and apply an inline save, removal or image choice to it.
async fn edit_selection(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<EditSelectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_project(&state, &id).await?;
    let _turn = state.lock_project(&id).await;

    let mut project = load_project(&state, &id).await?;
    let mut preview = Preview::new(project.page, state.config.toml.preview.lang.clone());
    let action = preview.click(&req.target);
    let edited = match (&action, &req.edit) {
        (ClickAction::Cleared, _) => {
            return Err(ApiError::BadRequest("Elemento não editável".into()));
        }
        (ClickAction::EditInline(_), SelectionEdit::SaveInline { html }) => preview.save_inline(html),
        (ClickAction::OpenImageBank(_), SelectionEdit::ChooseImage { url }) => {
            preview.choose_image(url)
        }
        (_, SelectionEdit::Remove) => preview.remove_selected(),
        (_, edit) => {
            return Err(ApiError::BadRequest(format!(
                "'{}' does not apply to this element",
                edit.name()
            )));
        }
    }?;
    let Some(outcome) = edited else {
        return Err(ApiError::BadRequest("Nenhum elemento selecionado".into()));
    };

    project.page = preview.into_page();
    let project = save_project(&state, project).await?;
    Ok(Json(patch_response(&outcome, &project)))
}

async fn remove_fragment(
    State(state): State<SharedState>,
    Path((id, fragment_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_project(&state, &id).await?;
    let _turn = state.lock_project(&id).await;

    let mut project = load_project(&state, &id).await?;
    let removed = project
        .page
        .remove_fragment(&fragment_id)
        .ok_or_else(|| ApiError::NotFound(format!("Fragment {} not found", fragment_id)))?;
    let project = save_project(&state, project).await?;
    tracing::info!(project = %project.id, fragment = %removed.id, "fragment removed");
    Ok(Json(ProjectView::from(&project)))
}

async fn move_fragment(
    State(state): State<SharedState>,
    Path((id, fragment_id)): Path<(String, String)>,
    Json(req): Json<MoveFragmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_project(&state, &id).await?;
    let _turn = state.lock_project(&id).await;

    let mut project = load_project(&state, &id).await?;
    let from = project
        .page
        .fragments()
        .iter()
        .position(|f| f.id == fragment_id)
        .ok_or_else(|| ApiError::NotFound(format!("Fragment {} not found", fragment_id)))?;
    if !project.page.move_fragment(from, req.to) {
        return Err(ApiError::BadRequest(format!(
            "Position {} is out of range (0..{})",
            req.to,
            project.page.len()
        )));
    }
    let project = save_project(&state, project).await?;
    Ok(Json(ProjectView::from(&project)))
}

async fn preview(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let project = load_project(&state, &id).await?;
    Ok(Html(render_document(
        &project.page,
        &state.config.toml.preview.lang,
    )))
}

async fn video_metadata(
    State(state): State<SharedState>,
    Json(req): Json<MetadataRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.video.metadata(&req).await?))
}

async fn video_download(
    State(state): State<SharedState>,
    Json(req): Json<DownloadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.video.download(&req).await?))
}

async fn refine_payload(Json(req): Json<RefineRequest>) -> Result<impl IntoResponse, ApiError> {
    let source = req.source_image_url.trim().to_string();
    if source.is_empty() {
        return Err(ApiError::BadRequest("sourceImageUrl is required".into()));
    }
    if !region::is_remote_source(&source) {
        return Err(ApiError::BadRequest(
            "sourceImageUrl must be a data: or http(s) URL".into(),
        ));
    }
    let mut payload = req.payload.validated()?;
    payload
        .attach_region_crop(&source)
        .await
        .map_err(RefineError::from)?;
    let composed = compose_prompt(&payload, &source);
    Ok(Json(RefineResponse { payload, composed }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SitecraftConfig;
    use crate::provider::mock::ScriptedProvider;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use sitecraft_common::AssistantReply;
    use tempfile::{TempDir, tempdir};
    use tower::ServiceExt;

    fn test_state(replies: Vec<AssistantReply>) -> (SharedState, TempDir) {
        state_with(ScriptedProvider::new(replies.into_iter().map(Ok).collect()))
    }

    fn state_with(provider: ScriptedProvider) -> (SharedState, TempDir) {
        let dir = tempdir().unwrap();
        let config = SitecraftConfig::new(dir.path().to_path_buf()).unwrap();
        (Arc::new(AppContext::with_provider(config, Arc::new(provider))), dir)
    }

    fn delete(uri: &str) -> Request<Body> {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn app(state: &SharedState) -> Router {
        api_router().with_state(state.clone())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn seeded(state: &SharedState) -> String {
        let mut project = state.store.create("Academia").unwrap();
        project.page.push(Fragment::new(
            "hero",
            r#"<section data-id="hero"><h1 data-id="title" data-type="heading">Treine</h1></section>"#,
        ));
        state.store.save(&mut project).unwrap();
        project.id
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _dir) = test_state(vec![]);
        let resp = app(&state).oneshot(get("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_then_list_projects() {
        let (state, _dir) = test_state(vec![]);
        let resp = app(&state)
            .oneshot(post_json("/api/projects", serde_json::json!({"name": "Academia"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        assert_eq!(created["name"], "Academia");
        assert_eq!(created["revision"], 1);
        assert_eq!(created["messages"].as_array().unwrap().len(), 1);

        let resp = app(&state).oneshot(get("/api/projects")).await.unwrap();
        let list = body_json(resp).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_project_name_is_rejected() {
        let (state, _dir) = test_state(vec![]);
        let resp = app(&state)
            .oneshot(post_json("/api/projects", serde_json::json!({"name": "  "})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_project_is_404() {
        let (state, _dir) = test_state(vec![]);
        let resp = app(&state)
            .oneshot(get("/api/projects/00000000-0000-0000-0000-000000000000"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_json(resp).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_chat_turn_plans_and_hides_markers() {
        let (state, _dir) = test_state(vec![AssistantReply::message("Plano: hero, preços")]);
        let id = state.store.create("Academia").unwrap().id;

        let resp = app(&state)
            .oneshot(post_json(
                &format!("/api/projects/{}/chat", id),
                serde_json::json!({"message": "Quero uma landing page de academia"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let outcome = body_json(resp).await;
        assert_eq!(outcome["status"], "planned");
        assert_eq!(outcome["plan"], "Plano: hero, preços");
        assert_eq!(outcome["saved"], true);
        assert!(outcome.get("warning").is_none());

        let view = body_json(
            app(&state)
                .oneshot(get(&format!("/api/projects/{}", id)))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(view["state"]["proposed"], true);
        let messages = view["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m["content"] != "__ARCH_PROPOSED__"));
    }

    #[tokio::test]
    async fn test_empty_chat_message_is_400() {
        let (state, _dir) = test_state(vec![]);
        let id = state.store.create("p").unwrap().id;
        let resp = app(&state)
            .oneshot(post_json(
                &format!("/api/projects/{}/chat", id),
                serde_json::json!({"message": "   "}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_patch_replace_and_missing_id() {
        let (state, _dir) = test_state(vec![]);
        let id = seeded(&state);

        let resp = app(&state)
            .oneshot(post_json(
                &format!("/api/projects/{}/patch", id),
                serde_json::json!({"op": "replace", "data_id": "title", "html": "Força"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["revision"], 3);
        assert!(state.store.load(&id).unwrap().page.fragments()[0].html.contains("Força"));

        let resp = app(&state)
            .oneshot(post_json(
                &format!("/api/projects/{}/patch", id),
                serde_json::json!({"op": "remove", "data_id": "ghost"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(state.store.load(&id).unwrap().revision, 3);
    }

    #[tokio::test]
    async fn test_preview_is_html_document() {
        let (state, _dir) = test_state(vec![]);
        let id = seeded(&state);
        let resp = app(&state)
            .oneshot(get(&format!("/api/projects/{}/preview", id)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/html"));
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains(r#"<div id="root"><section data-id="hero">"#));
    }

    #[tokio::test]
    async fn test_video_metadata_requires_url() {
        let (state, _dir) = test_state(vec![]);
        let resp = app(&state)
            .oneshot(post_json("/api/video/metadata", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(resp).await["error"],
            "URL do vídeo ou media_id é obrigatório"
        );
    }

    #[tokio::test]
    async fn test_video_download_unknown_media_is_404() {
        let (state, _dir) = test_state(vec![]);
        let resp = app(&state)
            .oneshot(post_json(
                "/api/video/download",
                serde_json::json!({"media_id": "nope"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["error"], "Mídia não encontrada");
    }

    #[tokio::test]
    async fn test_refine_payload_composes_prompt() {
        let (state, _dir) = test_state(vec![]);
        let resp = app(&state)
            .oneshot(post_json(
                "/api/refine/payload",
                serde_json::json!({
                    "instruction": "  troque o fundo  ",
                    "referenceImageUrl": "https://img/ref.png",
                    "sourceImageUrl": "https://img/src.png"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["payload"]["instruction"], "troque o fundo");
        assert_eq!(
            body["composed"]["image_urls"],
            serde_json::json!(["https://img/src.png", "https://img/ref.png"])
        );
    }

    #[tokio::test]
    async fn test_refine_payload_rejects_empty_instruction() {
        let (state, _dir) = test_state(vec![]);
        let resp = app(&state)
            .oneshot(post_json(
                "/api/refine/payload",
                serde_json::json!({"instruction": " ", "sourceImageUrl": "https://img/src.png"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "instruction é obrigatória");
    }

    #[tokio::test]
    async fn test_chat_overtaken_by_another_writer_is_409() {
        let (state, _dir) = state_with(
            ScriptedProvider::new(vec![Ok(AssistantReply::message("Plano"))])
                .with_delay(std::time::Duration::from_millis(400)),
        );
        let id = state.store.create("Academia").unwrap().id;

        let pending = tokio::spawn(app(&state).oneshot(post_json(
            &format!("/api/projects/{}/chat", id),
            serde_json::json!({"message": "Quero uma landing page"}),
        )));
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        let mut other = state.store.load(&id).unwrap();
        state.store.save(&mut other).unwrap();

        let resp = pending.await.unwrap().unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert!(body_json(resp).await["error"].as_str().unwrap().contains("changed concurrently"));

        let stored = state.store.load(&id).unwrap();
        assert!(!ConversationState::from_transcript(&stored.transcript).proposed);
    }

    #[tokio::test]
    async fn test_unknown_project_takes_no_lock() {
        let (state, _dir) = test_state(vec![]);
        for uri in ["/api/projects/ghost/chat", "/api/projects/ghost/patch"] {
            let resp = app(&state)
                .oneshot(post_json(
                    uri,
                    serde_json::json!({"message": "oi", "op": "remove", "data_id": "x"}),
                ))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        }
        assert_eq!(state.locked_projects(), 0);

        let id = seeded(&state);
        app(&state)
            .oneshot(post_json(
                &format!("/api/projects/{}/patch", id),
                serde_json::json!({"op": "replace", "data_id": "title", "html": "Oi"}),
            ))
            .await
            .unwrap();
        assert_eq!(state.locked_projects(), 0);
    }

    #[tokio::test]
    async fn test_fragments_can_be_removed_and_moved() {
        let (state, _dir) = test_state(vec![]);
        let id = seeded(&state);
        let mut project = state.store.load(&id).unwrap();
        let second = project.page.push(Fragment::new("preços", "<section>P</section>")).id.clone();
        let third = project.page.push(Fragment::new("rodapé", "<footer>F</footer>")).id.clone();
        state.store.save(&mut project).unwrap();

        let resp = app(&state)
            .oneshot(post_json(
                &format!("/api/projects/{}/fragments/{}/move", id, third),
                serde_json::json!({"to": 0}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let view = body_json(resp).await;
        assert_eq!(view["fragments"][0]["id"], third.as_str());

        let resp = app(&state)
            .oneshot(post_json(
                &format!("/api/projects/{}/fragments/{}/move", id, third),
                serde_json::json!({"to": 7}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = app(&state)
            .oneshot(delete(&format!("/api/projects/{}/fragments/{}", id, second)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let stored = state.store.load(&id).unwrap();
        assert_eq!(stored.page.len(), 2);
        assert!(stored.page.get(&second).is_none());

        let resp = app(&state)
            .oneshot(delete(&format!("/api/projects/{}/fragments/{}", id, second)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_select_then_edit_inline() {
        let (state, _dir) = test_state(vec![]);
        let id = seeded(&state);

        let resp = app(&state)
            .oneshot(post_json(
                &format!("/api/projects/{}/select", id),
                serde_json::json!({"data_id": "title"}),
            ))
            .await
            .unwrap();
        let action = body_json(resp).await;
        assert_eq!(action["action"], "edit_inline");
        assert_eq!(action["element"]["content"], "Treine");

        let resp = app(&state)
            .oneshot(post_json(
                &format!("/api/projects/{}/select", id),
                serde_json::json!({"data_id": "hero"}),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["action"], "cleared");

        let resp = app(&state)
            .oneshot(post_json(
                &format!("/api/projects/{}/edit", id),
                serde_json::json!({
                    "target": {"data_id": "title"},
                    "op": "save_inline",
                    "html": "Treine <b>forte</b>"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let stored = state.store.load(&id).unwrap();
        assert!(stored.page.fragments()[0].html.contains("Treine <b>forte</b>"));
        assert!(!stored.page.fragments()[0].html.contains("selected-element"));

        let resp = app(&state)
            .oneshot(post_json(
                &format!("/api/projects/{}/edit", id),
                serde_json::json!({
                    "target": {"data_id": "title"},
                    "op": "choose_image",
                    "url": "https://img/x.png"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_video_url_options_are_rejected() {
        let (state, _dir) = test_state(vec![]);
        let resp = app(&state)
            .oneshot(post_json(
                "/api/video/metadata",
                serde_json::json!({"video_url": "--exec=touch /tmp/x"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(resp).await["error"],
            "URL do vídeo inválida: use um endereço http(s)"
        );
    }

    #[tokio::test]
    async fn test_refine_payload_refuses_server_paths() {
        let (state, dir) = test_state(vec![]);
        let path = dir.path().join("secret.png");
        image::RgbaImage::new(4, 4).save(&path).unwrap();

        let resp = app(&state)
            .oneshot(post_json(
                "/api/refine/payload",
                serde_json::json!({
                    "instruction": "troque",
                    "region": {"x": 0.0, "y": 0.0, "width": 0.5, "height": 0.5},
                    "sourceImageUrl": path.to_str().unwrap()
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let error = body_json(resp).await["error"].as_str().unwrap().to_string();
        assert!(error.contains("data: or http(s)"));
    }
}
