//! HTTP route handlers for the chat relay API.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{any, get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::agent::{AgentReply, AnalysisType};
use crate::conversation::{ConversationId, ConversationSession, MessageDraft, SessionPatch};
use crate::workflow::{
    AnalysisWorkflowOutput, AnalysisWorkflowParams, ConversationWorkflowOutput,
    ConversationWorkflowParams,
};

use super::error::ApiError;
use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/chat", post(chat))
        .route("/api/workflow/chat", post(workflow_chat))
        .route("/api/conversations", get(list_conversations))
        .route("/api/conversation", any(missing_conversation_id))
        .route("/api/conversation/", any(missing_conversation_id))
        .route(
            "/api/conversation/{id}",
            get(get_conversation)
                .post(append_message)
                .put(patch_conversation)
                .delete(delete_conversation),
        )
        .route("/api/conversation/{id}/title", post(generate_title))
        .route("/api/analyze", post(analyze))
        .with_state(state)
}

/// Decode a JSON body whatever its `Content-Type` says.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    Ok(serde_json::from_slice(body)?)
}

/// Health check endpoint.
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "chat-relay",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.model_name,
    }))
}

/// Chat request body, shared by the direct and workflow chat paths.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The user's message.
    pub message: Option<String>,
    /// Conversation to continue or start.
    pub conversation_id: Option<String>,
}

impl ChatRequest {
    fn into_parts(self) -> Result<(ConversationId, String), ApiError> {
        match (self.message, self.conversation_id) {
            (Some(message), Some(id)) if !message.trim().is_empty() && !id.trim().is_empty() => {
                Ok((ConversationId::parse(id)?, message))
            }
            _ => Err(ApiError::BadRequest(
                "Missing message or conversationId".to_string(),
            )),
        }
    }
}

/// Handle chat requests.
async fn chat(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<AgentReply>, ApiError> {
    let request: ChatRequest = parse_body(&body)?;
    let (id, message) = request.into_parts()?;

    let reply = state.relay.relay(id, &message).await.map_err(ApiError::chat)?;
    Ok(Json(reply))
}

/// Handle chat requests through the step workflow.
async fn workflow_chat(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ConversationWorkflowOutput>, ApiError> {
    let request: ChatRequest = parse_body(&body)?;
    let (conversation_id, user_message) = request.into_parts()?;

    let output = state
        .chat_workflow
        .start(&ConversationWorkflowParams {
            conversation_id,
            user_message,
        })
        .await
        .map_err(ApiError::chat)?;
    Ok(Json(output))
}

/// Conversation list response.
#[derive(Debug, Serialize)]
pub struct ConversationList {
    /// Sessions, most recently updated first.
    pub conversations: Vec<ConversationSession>,
}

async fn list_conversations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConversationList>, ApiError> {
    let conversations = state.store.list().await?;
    Ok(Json(ConversationList { conversations }))
}

async fn missing_conversation_id() -> ApiError {
    ApiError::BadRequest("Missing conversation ID".to_string())
}

async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConversationSession>, ApiError> {
    let id = ConversationId::parse(id)?;
    Ok(Json(state.store.get_or_create(id).await?))
}

/// Append request body.
#[derive(Debug, Deserialize)]
pub struct AppendRequest {
    /// Message to append; caller timestamps are ignored.
    pub message: Option<MessageDraft>,
}

async fn append_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ConversationSession>, ApiError> {
    let id = ConversationId::parse(id)?;
    let request: AppendRequest = parse_body(&body)?;
    let draft = request
        .message
        .ok_or_else(|| ApiError::BadRequest("Missing message".to_string()))?;

    let _lane = state.lanes.acquire(&id).await;
    Ok(Json(state.store.append(id, draft).await?))
}

async fn patch_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ConversationSession>, ApiError> {
    let id = ConversationId::parse(id)?;
    let patch: SessionPatch = parse_body(&body)?;

    let _lane = state.lanes.acquire(&id).await;
    Ok(Json(state.store.patch(id, patch).await?))
}

async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = ConversationId::parse(id)?;

    let _lane = state.lanes.acquire(&id).await;
    state.store.remove(id.clone()).await?;
    tracing::info!("Conversation {id} deleted");
    Ok(Json(json!({ "success": true, "conversationId": id })))
}

/// Title response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleResponse {
    /// Conversation the title was stored on.
    pub conversation_id: ConversationId,
    /// Generated title.
    pub title: String,
}

async fn generate_title(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TitleResponse>, ApiError> {
    let id = ConversationId::parse(id)?;

    let _lane = state.lanes.acquire(&id).await;
    let session = state.store.get_or_create(id.clone()).await?;
    let title = state.agent.generate_title(&session.messages).await;
    state
        .store
        .patch(id.clone(), SessionPatch::title(title.clone()))
        .await?;

    Ok(Json(TitleResponse {
        conversation_id: id,
        title,
    }))
}

/// Analysis request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Conversation to analyze.
    pub conversation_id: Option<String>,
    /// One of `sentiment`, `summary`, `topics`.
    pub analysis_type: Option<String>,
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<AnalysisWorkflowOutput>, ApiError> {
    let request: AnalyzeRequest = parse_body(&body)?;
    let (Some(raw_id), Some(raw_type)) = (request.conversation_id, request.analysis_type) else {
        return Err(ApiError::BadRequest(
            "Missing conversationId or analysisType".to_string(),
        ));
    };
    let conversation_id = ConversationId::parse(raw_id)?;
    let analysis_type: AnalysisType = raw_type.parse()?;

    let output = state
        .analysis_workflow
        .start(&AnalysisWorkflowParams {
            conversation_id,
            analysis_type,
        })
        .await
        .map_err(ApiError::analysis)?;
    Ok(Json(output))
}
