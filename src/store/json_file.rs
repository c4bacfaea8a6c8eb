//! # Store em Documento JSON
//!
//! Todos os contextos num único arquivo JSON pretty-printed, para facilitar
//! inspeção manual. Carregado na inicialização, regravado após cada `put`
//! e cada evicção.
//!
//! A escrita vai para `<arquivo>.tmp` e depois é renomeada, então um crash
//! no meio da escrita não corrompe o documento anterior. Um arquivo
//! corrompido na leitura inicial é registrado e o store começa vazio.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::core::UserContext;

use super::{eviction_victims, ContextStore, StoreError};

pub struct JsonFileStore {
    path: PathBuf,
    contexts: RwLock<BTreeMap<String, UserContext>>,
}

impl JsonFileStore {
    /// Abre (ou inicia vazio) o documento em `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let contexts = if path.exists() {
            let json = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<BTreeMap<String, UserContext>>(&json) {
                Ok(map) => {
                    tracing::info!(path = %path.display(), users = map.len(), "Contextos carregados");
                    map
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Documento de contextos corrompido, iniciando vazio");
                    BTreeMap::new()
                }
            }
        } else {
            tracing::info!(path = %path.display(), "Nenhum documento de contextos, iniciando vazio");
            BTreeMap::new()
        };
        Ok(Self {
            path,
            contexts: RwLock::new(contexts),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, contexts: &BTreeMap<String, UserContext>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(contexts)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ContextStore for JsonFileStore {
    fn get(&self, user_id: &str) -> Result<Option<UserContext>, StoreError> {
        Ok(self.contexts.read().get(user_id).cloned())
    }

    fn put(&self, ctx: UserContext) -> Result<(), StoreError> {
        let mut contexts = self.contexts.write();
        contexts.insert(ctx.user_id.clone(), ctx);
        self.save(&contexts)
    }

    fn evict_over(&self, ceiling: usize, keep: &str) -> Result<Vec<String>, StoreError> {
        let mut contexts = self.contexts.write();
        let victims = eviction_victims(contexts.values(), ceiling, keep);
        if victims.is_empty() {
            return Ok(victims);
        }
        for id in &victims {
            contexts.remove(id);
        }
        tracing::info!(evicted = victims.len(), ceiling, "Contextos removidos por evicção");
        self.save(&contexts)?;
        Ok(victims)
    }

    fn len(&self) -> usize {
        self.contexts.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("mindful-{}-{}", name, uuid::Uuid::new_v4()))
            .join("contexts.json")
    }

    #[test]
    fn contexts_survive_reopening() {
        let path = temp_path("reopen");
        {
            let store = JsonFileStore::open(&path).unwrap();
            let mut ctx = UserContext::new("u1");
            ctx.interaction_count = 4;
            ctx.identified_themes.insert("sleep".into());
            store.put(ctx).unwrap();
        }
        let store = JsonFileStore::open(&path).unwrap();
        let ctx = store.get_context("u1");
        assert_eq!(ctx.interaction_count, 4);
        assert!(ctx.identified_themes.contains("sleep"));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw["u1"]["identified_themes"].is_array());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn corrupt_document_starts_empty() {
        let path = temp_path("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ definitely not json").unwrap();
        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.is_empty());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn eviction_is_persisted() {
        let path = temp_path("evict");
        let store = JsonFileStore::open(&path).unwrap();
        for (id, count) in [("a", 1), ("b", 2), ("c", 3)] {
            let mut ctx = UserContext::new(id);
            ctx.interaction_count = count;
            store.put(ctx).unwrap();
        }
        assert_eq!(store.evict_over(2, "c").unwrap(), vec!["a"]);
        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened.get("a").unwrap().is_none());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
