//! # Módulo Web — A Superfície HTTP do Chat
//!
//! Camada construída com **Axum** + **Maud**, sobre o [`ChatEngine`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Browser / cliente JSON                                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Axum Router (este módulo, CORS permissivo)                  │
//! │  ├── GET  /                          → página de chat       │
//! │  ├── GET  /status                    → JSON: modelos prontos│
//! │  ├── POST /api/chat                  → turno de conversa    │
//! │  ├── POST /api/session               → nova sessão          │
//! │  └── GET  /api/session/{id}/history  → transcrição          │
//! ├─────────────────────────────────────────────────────────────┤
//! │ ChatEngine (tokio::spawn; modelos no pool bloqueante)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Módulo | Responsabilidade |
//! |--------|------------------|
//! | [`state`] | Estado compartilhado (`AppState`) |
//! | [`error`] | `ApiError` → 400 / 401 / 500 |
//! | [`handlers`] | Handlers Axum para cada rota |
//! | [`templates`] | Template Maud da página |
//!
//! [`ChatEngine`]: crate::orchestrator::ChatEngine

pub mod error;
pub mod handlers;
pub mod state;
pub mod templates;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/status", get(handlers::model_status))
        .route("/api/chat", post(handlers::chat))
        .route("/api/session", post(handlers::create_session))
        .route("/api/session/{id}/history", get(handlers::session_history))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
