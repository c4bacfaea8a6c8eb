//! # Handlers HTTP
//!
//! | Handler | Método | Retorno |
//! |---------|--------|---------|
//! | `index` | GET `/` | HTML completo (Maud) |
//! | `model_status` | GET `/status` | JSON `{ready}` |
//! | `chat` | POST `/api/chat` | JSON `ChatResponse` |
//! | `create_session` | POST `/api/session` | JSON `{session_id}` |
//! | `session_history` | GET `/api/session/{id}/history` | JSON `[Exchange]` |
//!
//! ## Turno de Chat
//!
//! ```text
//! JSON ──► campos presentes? (400 com o nome do campo)
//!      ──► valida sessão (401) ──► valida mensagem (400)
//!      ──► traduz para inglês (se language != "en", spawn_blocking)
//!      ──► engine.process_message   (tokio::spawn)
//!      ──► traduz de volta ──► anexa à transcrição ──► ChatResponse
//! ```

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Html;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::state::AppState;
use super::templates;
use crate::core::{Intent, UserContext};
use crate::crisis::CrisisResources;
use crate::store::{is_valid_session_id, Exchange};
use crate::translate::{is_english, translate_or_pass, Translator};

/// Campos opcionais na desserialização para que a ausência vire um 400
/// apontando o campo, e não um erro genérico de corpo.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Recorte do contexto devolvido ao cliente.
#[derive(Debug, Serialize)]
pub struct ContextView {
    pub interaction_count: u64,
    pub identified_themes: Vec<String>,
    pub crisis_mode: bool,
    pub previous_intent: Option<Intent>,
}

impl From<&UserContext> for ContextView {
    fn from(ctx: &UserContext) -> Self {
        Self {
            interaction_count: ctx.interaction_count,
            identified_themes: ctx.identified_themes.iter().cloned().collect(),
            crisis_mode: ctx.crisis_mode,
            previous_intent: ctx.previous_intent,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub context: ContextView,
    /// `"urgent"` em turnos de crise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<CrisisResources>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    /// `true` quando os modelos terminaram de carregar.
    pub ready: bool,
    pub tracked_users: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Serialize)]
pub struct SessionCreated {
    pub session_id: String,
}

pub async fn index() -> Html<String> {
    Html(templates::chat_page().into_string())
}

pub async fn model_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        ready: state.engine.models_ready(),
        tracked_users: state.engine.tracked_users(),
    })
}

/// POST `/api/chat`: um turno completo de conversa.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::Input {
        field: "body",
        reason: e.body_text(),
    })?;

    let session_id = req.session_id.ok_or_else(|| missing("session_id"))?;
    let user_message = req.message.ok_or_else(|| missing("message"))?;

    if !is_valid_session_id(&session_id) {
        tracing::debug!(session_id = %session_id, "Sessão rejeitada");
        return Err(ApiError::Session);
    }
    if user_message.trim().is_empty() {
        return Err(ApiError::Input {
            field: "message",
            reason: "must not be empty".to_string(),
        });
    }

    let user_id = req
        .user_id
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| session_id.clone());
    let language = req.language.unwrap_or_else(|| "en".to_string());

    let engine = state.engine.clone();
    let translator = state.translator.clone();
    let turn_user = user_id.clone();
    let inbound = user_message.clone();
    // task própria: pânico no pipeline vira 500 em vez de derrubar a conexão
    let (outcome, message) = tokio::spawn(async move {
        let translate = !is_english(&language);
        let text = if translate {
            translate_off_thread(translator.clone(), inbound, "en").await
        } else {
            inbound
        };
        let outcome = engine.process_message(&turn_user, &text).await;
        let message = if translate {
            translate_off_thread(translator, outcome.reply.text.clone(), &language).await
        } else {
            outcome.reply.text.clone()
        };
        (outcome, message)
    })
    .await
    .map_err(|e| ApiError::internal(e, state.debug))?;

    state
        .sessions
        .append(&session_id, &user_id, &user_message, &message);

    let crisis = outcome.context.crisis_mode;
    Ok(Json(ChatResponse {
        message,
        context: ContextView::from(&outcome.context),
        priority: crisis.then_some("urgent"),
        resources: crisis.then(CrisisResources::standard),
    }))
}

fn missing(field: &'static str) -> ApiError {
    ApiError::Input {
        field,
        reason: "is required".to_string(),
    }
}

/// Tradutores podem bloquear (rede), então rodam no pool bloqueante.
async fn translate_off_thread(
    translator: Arc<dyn Translator>,
    text: String,
    target_lang: &str,
) -> String {
    let fallback = text.clone();
    let target = target_lang.to_string();
    tokio::task::spawn_blocking(move || translate_or_pass(translator.as_ref(), &text, &target))
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Tradução abortou, mantendo o texto original");
            fallback
        })
}

/// POST `/api/session`: cria uma sessão com id gerado pelo servidor.
pub async fn create_session(
    State(state): State<AppState>,
    payload: Option<Json<SessionRequest>>,
) -> Json<SessionCreated> {
    let req = payload.map(|Json(r)| r).unwrap_or_default();
    let session_id = state.sessions.create(req.user_id.as_deref());
    Json(SessionCreated { session_id })
}

/// GET `/api/session/{id}/history`: transcrição; vazia para ids desconhecidos.
pub async fn session_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<Exchange>>, ApiError> {
    if !is_valid_session_id(&session_id) {
        return Err(ApiError::Session);
    }
    Ok(Json(state.sessions.history(&session_id)))
}
