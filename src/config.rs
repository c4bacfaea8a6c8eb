//! Configuração do serviço: valores padrão sobrepostos por variáveis
//! de ambiente `MINDFUL_*`.
//!
//! | Variável | Padrão |
//! |----------|--------|
//! | `MINDFUL_ADDR` | `0.0.0.0:3000` |
//! | `MINDFUL_DEBUG` | `false` |
//! | `MINDFUL_MAX_CONTEXTS` | `1000` |
//! | `MINDFUL_ORACLE_TIMEOUT_MS` | `2000` |
//! | `MINDFUL_MAX_MODEL_CALLS` | `4` |
//! | `MINDFUL_STORE_PATH` | — (store em memória) |
//! | `MINDFUL_MODEL_REPO` | `sentence-transformers/all-MiniLM-L6-v2` |
//! | `MINDFUL_SEED` | — (RNG por entropia) |
//!
//! Valor que não faz parse cai no padrão com um `warn`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::nlu::embedder::DEFAULT_MODEL_REPO;

const ENV_PREFIX: &str = "MINDFUL_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    pub addr: String,
    /// Expõe detalhes de erro interno nas respostas 500.
    pub debug: bool,
    /// Teto de contextos antes da evicção.
    pub max_contexts: usize,
    pub oracle_timeout_ms: u64,
    /// Chamadas de modelo simultâneas no pool bloqueante.
    pub max_model_calls: usize,
    pub store_path: Option<PathBuf>,
    pub model_repo: String,
    pub seed: Option<u64>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:3000".to_string(),
            debug: false,
            max_contexts: 1000,
            oracle_timeout_ms: 2000,
            max_model_calls: 4,
            store_path: None,
            model_repo: DEFAULT_MODEL_REPO.to_string(),
            seed: None,
        }
    }
}

impl ChatConfig {
    pub fn from_env() -> Self {
        let map: HashMap<String, String> = std::env::vars()
            .filter_map(|(k, v)| {
                k.strip_prefix(ENV_PREFIX)
                    .map(|key| (key.to_ascii_lowercase(), v))
            })
            .collect();
        Self::from_map(&map)
    }

    /// Chaves sem prefixo, em minúsculas (`"max_contexts"`).
    pub fn from_map(m: &HashMap<String, String>) -> Self {
        let d = Self::default();
        Self {
            addr: m.get("addr").cloned().unwrap_or(d.addr),
            debug: get_or(m, "debug", d.debug),
            max_contexts: get_or(m, "max_contexts", d.max_contexts),
            oracle_timeout_ms: get_or(m, "oracle_timeout_ms", d.oracle_timeout_ms),
            max_model_calls: get_or(m, "max_model_calls", d.max_model_calls).max(1),
            store_path: m
                .get("store_path")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            model_repo: m.get("model_repo").cloned().unwrap_or(d.model_repo),
            seed: m.get("seed").and_then(|v| parse_or_warn("seed", v)),
        }
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key = %key, value = %value, "Valor de configuração inválido, usando padrão");
            None
        }
    }
}

fn get_or<T: std::str::FromStr>(m: &HashMap<String, String>, key: &str, default: T) -> T {
    m.get(key)
        .and_then(|v| parse_or_warn(key, v))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_documented_values() {
        let c = ChatConfig::from_map(&HashMap::new());
        assert_eq!(c, ChatConfig::default());
        assert_eq!(c.max_contexts, 1000);
        assert_eq!(c.oracle_timeout(), Duration::from_secs(2));
        assert!(c.store_path.is_none());
        assert_eq!(c.max_model_calls, 4);
    }

    #[test]
    fn overrides_are_applied() {
        let c = ChatConfig::from_map(&map(&[
            ("addr", "127.0.0.1:8080"),
            ("debug", "true"),
            ("max_contexts", "5"),
            ("store_path", "/tmp/ctx.json"),
            ("seed", "42"),
            ("max_model_calls", "0"),
        ]));
        assert_eq!(c.addr, "127.0.0.1:8080");
        assert!(c.debug);
        assert_eq!(c.max_contexts, 5);
        assert_eq!(c.store_path, Some(PathBuf::from("/tmp/ctx.json")));
        assert_eq!(c.seed, Some(42));
        // zero vagas travaria todo turno com modelos
        assert_eq!(c.max_model_calls, 1);
    }

    #[test]
    fn unparseable_values_fall_back() {
        let c = ChatConfig::from_map(&map(&[("max_contexts", "lots"), ("debug", "yes"), ("seed", "x")]));
        assert_eq!(c.max_contexts, 1000);
        assert!(!c.debug);
        assert_eq!(c.seed, None);
    }
}
