#![allow(dead_code)]
#![allow(rustdoc::broken_intra_doc_links)]
//! # Mindful Chat — Backend de Apoio Emocional
//!
//! **Ponto de entrada** do serviço. Inicialização em duas fases:
//!
//! 1. **Fase imediata**: o servidor axum aceita conexões logo após o bind.
//!    O [`ChatEngine`](orchestrator::ChatEngine) já atende em modo só-regras
//!    (detector de crise, padrões, temas por palavra-chave).
//! 2. **Fase background**: o embedder BERT é carregado via
//!    `tokio::task::spawn_blocking` e publicado num `OnceLock`; a partir daí
//!    sentimento, temas semânticos e zero-shot passam a valer.
//!
//! ```text
//! main()
//!   ├── Configura tracing/logging (RUST_LOG)
//!   ├── ChatConfig::from_env (MINDFUL_*)
//!   ├── Escolhe o store (JSON em disco ou memória)
//!   ├── Monta ChatEngine, AppState e Router
//!   ├── Bind TCP
//!   └── Spawn background:
//!       ├── BertEmbedder::load (HuggingFace Hub)
//!       ├── Models::from_embedder (protótipos de sentimento, hipóteses)
//!       ├── Publica no OnceLock
//!       └── engine.warm_up (vetores de temas e respostas)
//! ```
//!
//! ```bash
//! RUST_LOG=debug MINDFUL_STORE_PATH=data/contexts.json cargo run
//! ```

mod config;
mod core;
mod crisis;
mod nlu;
mod orchestrator;
mod reply;
mod store;
mod translate;
mod web;

use std::sync::{Arc, OnceLock};

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::ChatConfig;
use crate::nlu::embedder::BertEmbedder;
use crate::nlu::{ModelSlot, Models};
use crate::orchestrator::ChatEngine;
use crate::store::{ContextStore, JsonFileStore, MemoryStore};
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ChatConfig::from_env();
    tracing::info!(addr = %config.addr, max_contexts = config.max_contexts, "Mindful Chat starting");

    let store: Arc<dyn ContextStore> = match &config.store_path {
        Some(path) => Arc::new(JsonFileStore::open(path)?),
        None => {
            tracing::info!("Usando store de contextos em memória");
            Arc::new(MemoryStore::new())
        }
    };

    let models: ModelSlot = Arc::new(OnceLock::new());
    let engine = Arc::new(ChatEngine::new(&config, models.clone(), store));
    let state = AppState::new(engine.clone(), config.debug);
    let app = web::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    tracing::info!(addr = %config.addr, "Server running (rules-only until models load)");

    let repo = config.model_repo.clone();
    tokio::task::spawn_blocking(move || {
        tracing::info!(repo = %repo, "Loading sentence embedder...");
        let embedder = match BertEmbedder::load(&repo) {
            Ok(e) => Arc::new(e),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load embedder, staying in rules-only mode");
                return;
            }
        };

        let loaded = match Models::from_embedder(embedder) {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build models, staying in rules-only mode");
                return;
            }
        };

        let _ = models.set(loaded);
        match engine.warm_up() {
            Ok(()) => tracing::info!("Models ready"),
            Err(e) => tracing::warn!(error = %e, "Warm-up failed, caches will fill lazily"),
        }
    });

    axum::serve(listener, app).await?;

    Ok(())
}
