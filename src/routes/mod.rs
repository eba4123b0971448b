//! API routes

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::QuickTemplate;
use crate::conversation::{ChatSession, Conversation, ConversationType, Message};
use crate::core::{
    AnalyticsReport, ChatEngine, ChatError, ChatRequest, ChatResponse, Dashboard, Statistics,
    StorageError,
};
use crate::export;
use crate::providers::GenerationError;
use crate::AppState;

type ApiResult<T> = Result<T, (StatusCode, String)>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    model_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive search over titles and messages
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub title: String,
    pub messages: Vec<Message>,
    #[serde(rename = "type", default)]
    pub conversation_type: ConversationType,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveResponse {
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub struct DraftExportRequest {
    #[serde(default)]
    pub title: Option<String>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
    pub session: ChatSession,
}

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ConversationTypeInfo {
    #[serde(rename = "type")]
    conversation_type: ConversationType,
    label: &'static str,
}

#[derive(Debug, Serialize)]
struct TemplatesResponse {
    conversation_types: Vec<ConversationTypeInfo>,
    templates: Vec<QuickTemplate>,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        model_configured: state.chat_engine.is_some(),
        model: state
            .chat_engine
            .as_ref()
            .map(|engine| engine.client().model().to_string()),
    })
}

async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<Conversation>> {
    let mut conversations = match (query.q.as_deref().map(str::trim), query.limit) {
        (Some(q), _) if !q.is_empty() => state.store.search(q).await,
        (_, Some(limit)) => return Json(state.store.recent(limit).await),
        _ => state.store.list_all().await,
    };
    crate::core::sort_newest_first(&mut conversations);
    if let Some(limit) = query.limit {
        conversations.truncate(limit);
    }
    Json(conversations)
}

async fn save_conversation(
    State(state): State<AppState>,
    Json(request): Json<SaveRequest>,
) -> ApiResult<(StatusCode, Json<SaveResponse>)> {
    let id = state
        .store
        .save(request.title.trim(), request.messages, request.conversation_type)
        .await
        .map_err(storage_error)?;

    Ok((StatusCode::CREATED, Json(SaveResponse { id })))
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Conversation>> {
    find(&state, id).await.map(Json)
}

/// Resume a stored conversation in a new chat session
async fn resume_session(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<ChatSession>> {
    let conversation = find(&state, id).await?;
    Ok(Json(ChatSession::from_conversation(&conversation)))
}

async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    state.store.delete(id).await.map_err(storage_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn export_markdown(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult<Response> {
    let conversation = find(&state, id).await?;
    Ok(markdown_response(&conversation))
}

async fn export_pdf(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult<Response> {
    let conversation = find(&state, id).await?;
    Ok(pdf_response(&conversation))
}

async fn export_draft_markdown(Json(request): Json<DraftExportRequest>) -> Response {
    markdown_response(&export::draft(request.title, request.messages, Utc::now()))
}

async fn export_draft_pdf(Json(request): Json<DraftExportRequest>) -> Response {
    pdf_response(&export::draft(request.title, request.messages, Utc::now()))
}

async fn stats(State(state): State<AppState>) -> Json<Statistics> {
    Json(state.store.stats().await)
}

async fn analytics(State(state): State<AppState>) -> Json<Dashboard> {
    Json(Dashboard::build(&state.store.list_all().await, Utc::now()))
}

async fn analytics_report(State(state): State<AppState>) -> Response {
    let now = Utc::now();
    let report = AnalyticsReport::build(state.store.list_all().await, now);
    let filename = format!(
        "aiconverse_analytics_{}.json",
        now.with_timezone(&Local).format("%Y%m%d")
    );

    (
        [(header::CONTENT_DISPOSITION, attachment(&filename))],
        Json(report),
    )
        .into_response()
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let engine = engine(&state)?;
    let response = engine.chat(request).await.map_err(|e| match e {
        ChatError::EmptyMessage | ChatError::Generation(GenerationError::UnsupportedImage(_)) => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        ChatError::Generation(_) => (StatusCode::BAD_GATEWAY, e.to_string()),
    })?;
    if !response.is_success() {
        tracing::warn!("Chat turn returned an error reply");
    }
    Ok(Json(response))
}

async fn suggestions(
    State(state): State<AppState>,
    Json(request): Json<SuggestionRequest>,
) -> ApiResult<Json<SuggestionResponse>> {
    let engine = engine(&state)?;
    Ok(Json(SuggestionResponse {
        suggestions: engine.suggestions(&request.session).await,
    }))
}

async fn templates(State(state): State<AppState>) -> Json<TemplatesResponse> {
    Json(TemplatesResponse {
        conversation_types: ConversationType::ALL
            .iter()
            .map(|kind| ConversationTypeInfo {
                conversation_type: *kind,
                label: kind.label(),
            })
            .collect(),
        templates: state.templates.as_ref().clone(),
    })
}

async fn find(state: &AppState, id: u64) -> ApiResult<Conversation> {
    state
        .store
        .get(id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Conversation {} not found", id)))
}

fn engine(state: &AppState) -> ApiResult<&Arc<ChatEngine>> {
    state.chat_engine.as_ref().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "Model client not configured: set GOOGLE_API_KEY".to_string(),
        )
    })
}

fn storage_error(e: StorageError) -> (StatusCode, String) {
    if let StorageError::Invalid(_) = e {
        return (StatusCode::BAD_REQUEST, e.to_string());
    }
    tracing::error!("Storage error: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn attachment(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", filename)
}

fn markdown_response(conversation: &Conversation) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, attachment("conversation.md")),
        ],
        export::to_markdown(conversation),
    )
        .into_response()
}

fn pdf_response(conversation: &Conversation) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, attachment("conversation.pdf")),
        ],
        export::to_pdf(conversation),
    )
        .into_response()
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/v1/status", get(status))
        .route("/v1/conversations", get(list_conversations).post(save_conversation))
        .route(
            "/v1/conversations/:id",
            get(get_conversation).delete(delete_conversation),
        )
        .route("/v1/conversations/:id/session", get(resume_session))
        .route("/v1/conversations/:id/export/markdown", get(export_markdown))
        .route("/v1/conversations/:id/export/pdf", get(export_pdf))
        .route("/v1/export/markdown", post(export_draft_markdown))
        .route("/v1/export/pdf", post(export_draft_pdf))
        .route("/v1/stats", get(stats))
        .route("/v1/analytics", get(analytics))
        .route("/v1/analytics/report", get(analytics_report))
        .route("/v1/chat", post(chat))
        .route("/v1/suggestions", post(suggestions))
        .route("/v1/templates", get(templates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::config::prompts::builtin_templates;
    use crate::core::ConversationStore;
    use crate::providers::client::tests::ScriptedBackend;
    use crate::providers::ModelClient;

    async fn test_state(engine: Option<Arc<ChatEngine>>) -> (TempDir, AppState) {
        let dir = TempDir::new().unwrap();
        let store = ConversationStore::new(dir.path());
        store.initialize().await.unwrap();
        let state = AppState {
            store,
            chat_engine: engine,
            templates: Arc::new(builtin_templates()),
        };
        (dir, state)
    }

    fn scripted_engine(replies: Vec<Result<String, GenerationError>>) -> Arc<ChatEngine> {
        let client = ModelClient::new(ScriptedBackend::new(replies));
        Arc::new(ChatEngine::new(Arc::new(client)))
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router()
            .with_state(state.clone())
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_save_search_delete_flow() {
        let (_dir, state) = test_state(None).await;

        let (status, body) = send(
            &state,
            post_json(
                "/v1/conversations",
                json!({
                    "title": "Rust async",
                    "messages": [{"role": "user", "content": "What is Tokio?"}],
                    "type": "technical"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let saved: SaveResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(saved.id, 1);

        let (_, body) = send(&state, get_req("/v1/conversations?q=tokio")).await;
        let found: Vec<Conversation> = serde_json::from_slice(&body).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].conversation_type, ConversationType::Technical);

        let (status, _) = send(
            &state,
            Request::builder()
                .method("DELETE")
                .uri("/v1/conversations/1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&state, get_req("/v1/conversations/1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_limit_and_resume() {
        let (_dir, state) = test_state(None).await;
        for title in ["first", "second", "third"] {
            state
                .store
                .save(title, vec![Message::user(title)], ConversationType::Creative)
                .await
                .unwrap();
        }

        let (_, body) = send(&state, get_req("/v1/conversations?limit=2")).await;
        let recent: Vec<Conversation> = serde_json::from_slice(&body).unwrap();
        assert_eq!(recent.len(), 2);

        let (status, body) = send(&state, get_req("/v1/conversations/2/session")).await;
        assert_eq!(status, StatusCode::OK);
        let session: ChatSession = serde_json::from_slice(&body).unwrap();
        assert_eq!(session.conversation_type, ConversationType::Creative);
        assert_eq!(session.messages, vec![Message::user("second")]);

        let (status, _) = send(&state, get_req("/v1/conversations/42/session")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rejects_blank_title() {
        let (_dir, state) = test_state(None).await;
        let (status, _) = send(
            &state,
            post_json("/v1/conversations", json!({"title": "  ", "messages": []})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(state.store.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_exports() {
        let (_dir, state) = test_state(None).await;
        state
            .store
            .save("Notes", vec![Message::user("hello")], ConversationType::General)
            .await
            .unwrap();

        let (status, body) = send(&state, get_req("/v1/conversations/1/export/markdown")).await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("# Notes\n\n"));
        assert!(text.contains("**You**: hello"));

        let (status, body) = send(&state, get_req("/v1/conversations/1/export/pdf")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with(b"%PDF-1.4"));

        let (status, _) = send(&state, get_req("/v1/conversations/9/export/pdf")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &state,
            post_json(
                "/v1/export/markdown",
                json!({"messages": [{"role": "assistant", "content": "draft"}]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("# Chat - "));
        assert!(text.contains("**AI Assistant**: draft"));
    }

    #[tokio::test]
    async fn test_stats_on_empty_store() {
        let (_dir, state) = test_state(None).await;
        let (status, body) = send(&state, get_req("/v1/stats")).await;
        assert_eq!(status, StatusCode::OK);

        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["total_conversations"], 0);
        assert_eq!(value["avg_messages_per_conversation"], 0.0);
        assert_eq!(value["type_distribution"], json!({}));
    }

    #[tokio::test]
    async fn test_chat_unconfigured() {
        let (_dir, state) = test_state(None).await;

        let (_, body) = send(&state, get_req("/v1/status")).await;
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["model_configured"], false);

        let (status, _) = send(&state, post_json("/v1/chat", json!({"message": "hi"}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let engine = scripted_engine(vec![Ok("Hello!".into())]);
        let (_dir, state) = test_state(Some(engine)).await;

        let (status, body) = send(
            &state,
            post_json(
                "/v1/chat",
                json!({"message": "hi", "session": {"conversation_type": "casual"}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["reply"], "Hello!");
        assert_eq!(value["session"]["messages"].as_array().unwrap().len(), 2);
        assert_eq!(value["session"]["conversation_type"], "casual");
        assert_eq!(value["suggestions"].as_array().unwrap().len(), 3);
        assert!(value.get("error").is_none());
    }

    #[tokio::test]
    async fn test_templates() {
        let (_dir, state) = test_state(None).await;
        let (_, body) = send(&state, get_req("/v1/templates")).await;
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["conversation_types"].as_array().unwrap().len(), 5);
        assert_eq!(value["conversation_types"][0]["type"], "general");
        assert_eq!(value["templates"].as_array().unwrap().len(), 5);
    }
}
