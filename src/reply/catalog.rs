//! # Catálogo de Respostas — Duas Fontes
//!
//! ```text
//! PatternRule.responses (embutidas no binário) ─┐
//!                                               ├──► pool por Intent
//! data/responses.json (include_str!)  ──────────┘
//! ```
//!
//! O JSON é lido uma vez na inicialização e anexado aos pools dos padrões.
//! Chave de intent desconhecida é registrada e ignorada; um JSON malformado
//! é registrado e descartado por inteiro; os pools dos padrões seguem
//! funcionando sozinhos.

use std::collections::BTreeMap;

use crate::core::{render, Details, Intent, ResponseTemplate};
use crate::nlu::patterns::PatternRule;

/// Catálogo JSON embutido no binário.
pub const EMBEDDED_CATALOG: &str = include_str!("../../data/responses.json");

#[derive(Debug, Default)]
pub struct ResponseCatalog {
    pools: BTreeMap<Intent, Vec<ResponseTemplate>>,
}

impl ResponseCatalog {
    /// Pools dos padrões + catálogo embutido.
    pub fn build(rules: &[PatternRule]) -> Self {
        Self::from_sources(rules, EMBEDDED_CATALOG)
    }

    pub fn from_sources(rules: &[PatternRule], json: &str) -> Self {
        let mut pools: BTreeMap<Intent, Vec<ResponseTemplate>> = BTreeMap::new();
        for rule in rules {
            pools
                .entry(rule.intent)
                .or_default()
                .extend(rule.responses.iter().cloned());
        }

        match serde_json::from_str::<BTreeMap<String, Vec<ResponseTemplate>>>(json) {
            Ok(entries) => {
                for (key, templates) in entries {
                    match Intent::from_label(&key) {
                        Some(intent) => pools.entry(intent).or_default().extend(templates),
                        None => tracing::warn!(key = %key, "Intent desconhecido no catálogo, ignorado"),
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "Catálogo JSON malformado, usando só os padrões"),
        }

        let catalog = Self { pools };
        tracing::info!(
            intents = catalog.pools.len(),
            responses = catalog.len(),
            "Catálogo de respostas carregado"
        );
        catalog
    }

    pub fn from_pools(pools: BTreeMap<Intent, Vec<ResponseTemplate>>) -> Self {
        Self { pools }
    }

    /// Pool do intent; vazio se não houver.
    pub fn pool(&self, intent: Intent) -> &[ResponseTemplate] {
        self.pools.get(&intent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Textos de exemplo por intent, com placeholders removidos.
    pub fn samples(&self) -> Vec<(Intent, String)> {
        let empty = Details::default();
        self.pools
            .iter()
            .flat_map(|(intent, pool)| {
                pool.iter().map(|t| {
                    let text = render(t.message(), &empty).unwrap_or_else(|_| t.message().to_string());
                    (*intent, text)
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pools.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
