//! # Armazenamento de Contextos
//!
//! O [`ContextStore`] é a fronteira com o backend de persistência. O motor
//! recebe o store por injeção (`Arc<dyn ContextStore>`), nunca via estado
//! global.
//!
//! | Backend | Durável | Uso |
//! |---------|---------|-----|
//! | [`MemoryStore`] | não | padrão, testes |
//! | [`JsonFileStore`] | sim (documento JSON) | `MINDFUL_STORE_PATH` definido |
//!
//! Cada leitura e escrita é independente: última escrita vence. A
//! serialização por usuário é responsabilidade do motor.
//!
//! ## Evicção
//!
//! Acima do teto, remove os contextos com menor `interaction_count`
//! (empate: `last_active` mais antigo primeiro) até voltar ao teto.

pub mod json_file;
pub mod session;

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::core::UserContext;

pub use json_file::JsonFileStore;
pub use session::{is_valid_session_id, Exchange, Session, SessionLog};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("falha de I/O no store: {0}")]
    Io(#[from] std::io::Error),
    #[error("falha de serialização no store: {0}")]
    Serde(#[from] serde_json::Error),
}

pub trait ContextStore: Send + Sync {
    fn get(&self, user_id: &str) -> Result<Option<UserContext>, StoreError>;

    /// Upsert: substitui o registro do `user_id` do contexto.
    fn put(&self, ctx: UserContext) -> Result<(), StoreError>;

    /// Remove contextos até `len() <= ceiling`; retorna os ids removidos.
    ///
    /// `keep` é o usuário do turno corrente e nunca entra na lista.
    fn evict_over(&self, ceiling: usize, keep: &str) -> Result<Vec<String>, StoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Contexto do usuário, ou um novo com valores padrão.
    ///
    /// Falha de leitura é registrada e tratada como ausência.
    fn get_context(&self, user_id: &str) -> UserContext {
        match self.get(user_id) {
            Ok(Some(ctx)) => ctx,
            Ok(None) => UserContext::new(user_id),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Falha ao ler contexto, usando um novo");
                UserContext::new(user_id)
            }
        }
    }
}

/// Ids a remover para que restem no máximo `ceiling` contextos, sem `keep`.
pub(crate) fn eviction_victims<'a>(
    contexts: impl Iterator<Item = &'a UserContext>,
    ceiling: usize,
    keep: &str,
) -> Vec<String> {
    let mut all: Vec<&UserContext> = contexts.collect();
    if all.len() <= ceiling {
        return Vec::new();
    }
    let excess = all.len() - ceiling;
    all.retain(|c| c.user_id != keep);
    all.sort_by(|a, b| {
        a.interaction_count
            .cmp(&b.interaction_count)
            .then_with(|| a.last_active.cmp(&b.last_active))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    all.into_iter()
        .take(excess)
        .map(|c| c.user_id.clone())
        .collect()
}

#[derive(Default)]
pub struct MemoryStore {
    contexts: RwLock<HashMap<String, UserContext>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextStore for MemoryStore {
    fn get(&self, user_id: &str) -> Result<Option<UserContext>, StoreError> {
        Ok(self.contexts.read().get(user_id).cloned())
    }

    fn put(&self, ctx: UserContext) -> Result<(), StoreError> {
        self.contexts.write().insert(ctx.user_id.clone(), ctx);
        Ok(())
    }

    fn evict_over(&self, ceiling: usize, keep: &str) -> Result<Vec<String>, StoreError> {
        let mut contexts = self.contexts.write();
        let victims = eviction_victims(contexts.values(), ceiling, keep);
        for id in &victims {
            contexts.remove(id);
        }
        if !victims.is_empty() {
            tracing::info!(evicted = victims.len(), ceiling, "Contextos removidos por evicção");
        }
        Ok(victims)
    }

    fn len(&self) -> usize {
        self.contexts.read().len()
    }
}
