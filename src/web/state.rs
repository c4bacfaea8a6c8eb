//! # Estado da Aplicação Web
//!
//! ## Inicialização em Duas Fases
//!
//! ```text
//! Fase 1 (imediata):        Fase 2 (background):
//! ┌──────────────────┐      ┌──────────────────┐
//! │ AppState         │      │ Models           │
//! │  ├── engine ✓    │      │  ├── embedder    │
//! │  ├── sessions ✓  │      │  ├── sentiment   │
//! │  └── models: ∅   │←─────│  └── zero_shot   │
//! └──────────────────┘      │ (set via OnceLock)│
//!     ↓ regras apenas       └──────────────────┘
//!   servidor disponível          ↓ fallbacks semânticos ativos
//! ```
//!
//! O engine atende desde o primeiro request; os modelos só ampliam o que
//! ele consegue classificar.

use std::sync::Arc;

use crate::orchestrator::ChatEngine;
use crate::store::SessionLog;
use crate::translate::{PassThrough, Translator};

/// Estado compartilhado da aplicação Axum.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChatEngine>,
    /// Transcrições por sessão.
    pub sessions: Arc<SessionLog>,
    pub translator: Arc<dyn Translator>,
    /// Inclui o detalhe do erro interno nas respostas 500.
    pub debug: bool,
}

impl AppState {
    pub fn new(engine: Arc<ChatEngine>, debug: bool) -> Self {
        Self {
            engine,
            sessions: Arc::new(SessionLog::new()),
            translator: Arc::new(PassThrough),
            debug,
        }
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }
}
