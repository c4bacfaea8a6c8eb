//! # Classificador de Intenção em Camadas
//!
//! O [`IntentClassifier`] decide o [`Intent`] de uma mensagem e extrai os
//! detalhes específicos daquele intent.
//!
//! ## Estratégia em Camadas
//!
//! ```text
//! Mensagem
//!   ├── 1. Padrões literais (PatternRule, ordem = prioridade)
//!   │   → match: retorna imediatamente
//!   ├── 2. Zero-shot sobre o conjunto fechado de labels
//!   │   ├── 3. Tema da mensagem mapeia para um intent no top-3? → override
//!   │   └── top-1 com probabilidade ≥ 0.5 → aceita
//!   ├── 4. Similaridade com respostas-exemplo de cada intent
//!   │   → melhor cosseno > 0.5 → aceita
//!   └── Unknown
//! ```
//!
//! Os padrões não custam forward pass; as camadas 2 e 4 só rodam com os
//! modelos carregados e sempre dentro do tempo limite configurado.
//!
//! ## Falhas
//!
//! Erro de modelo nunca sobe: a camada é pulada com `warn`. Se alguma
//! camada falhou e nenhuma outra decidiu, o resultado é `Unknown` com
//! detalhes vazios.

use std::sync::{Arc, OnceLock};

use chrono::Utc;
use serde::Serialize;

use crate::core::{cosine_similarity, Details, Intent, IntentObservation, UserContext};

use super::extractor::DetailExtractor;
use super::models::{ModelGate, ModelSlot, OracleError, TextEmbedder};
use super::patterns::{match_intent, PatternRule};
use super::themes::theme_intent;

/// Probabilidade mínima para aceitar o top-1 do zero-shot.
pub const ZERO_SHOT_CONFIDENCE: f32 = 0.5;

/// Similaridade mínima com uma resposta-exemplo.
pub const SEMANTIC_THRESHOLD: f32 = 0.5;

/// Quantas posições do ranking um tema pode "puxar" para o topo.
const THEME_OVERRIDE_WINDOW: usize = 3;

type SampleVectors = Vec<(Intent, Vec<f32>)>;

/// Qual camada decidiu o intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Pattern,
    ZeroShot,
    Theme,
    Semantic,
    Fallback,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    pub details: Details,
    pub source: Source,
}

pub struct IntentClassifier {
    rules: Arc<Vec<PatternRule>>,
    extractor: DetailExtractor,
    models: ModelSlot,
    gate: ModelGate,
    samples: Arc<Vec<(Intent, String)>>,
    sample_vectors: Arc<OnceLock<SampleVectors>>,
}

impl IntentClassifier {
    /// `samples` são os textos de resposta do catálogo, usados pela camada 4.
    pub fn new(
        rules: Arc<Vec<PatternRule>>,
        samples: Vec<(Intent, String)>,
        models: ModelSlot,
        gate: ModelGate,
    ) -> Self {
        let samples = samples
            .into_iter()
            .filter(|(i, _)| *i != Intent::Crisis && *i != Intent::Unknown)
            .collect();
        Self {
            rules,
            extractor: DetailExtractor::new(),
            models,
            gate,
            samples: Arc::new(samples),
            sample_vectors: Arc::new(OnceLock::new()),
        }
    }

    /// Classifica a mensagem no contexto do usuário.
    ///
    /// Registra `(mensagem, intent)` no histórico de intents do contexto e,
    /// se o intent repete o anterior, anexa a sugestão da técnica preferida.
    pub async fn classify(
        &self,
        text: &str,
        themes: &[String],
        intensity: f32,
        ctx: &mut UserContext,
    ) -> Classification {
        let (intent, source, degraded) = self.decide(text, themes).await;

        let mut details = if degraded && intent == Intent::Unknown {
            Details::default()
        } else {
            self.extractor.extract(intent, text, intensity, themes)
        };

        if ctx.previous_intent == Some(intent) && intent.is_emotional() {
            details.suggestion = Some(format!(
                "Last time we talked about this, {} was your go-to. It might be worth trying it again.",
                ctx.preferences.preferred_technique
            ));
        }

        ctx.intent_history.push(IntentObservation {
            message: text.to_string(),
            intent,
            timestamp: Utc::now(),
        });

        tracing::debug!(intent = %intent, ?source, "Intent classificado");
        Classification {
            intent,
            details,
            source,
        }
    }

    /// Técnica de enfrentamento que a mensagem endossa, se houver.
    pub fn preferred_technique(&self, text: &str) -> Option<String> {
        self.extractor.preferred_technique(text)
    }

    async fn decide(&self, text: &str, themes: &[String]) -> (Intent, Source, bool) {
        if let Some(intent) = match_intent(&self.rules, text) {
            return (intent, Source::Pattern, false);
        }

        let mut degraded = false;

        match self.zero_shot(text).await {
            Ok(ranked) => {
                if let Some(intent) = theme_override(&ranked, themes) {
                    return (intent, Source::Theme, false);
                }
                if let Some((intent, p)) = ranked.first() {
                    if *p >= ZERO_SHOT_CONFIDENCE {
                        return (*intent, Source::ZeroShot, false);
                    }
                }
            }
            Err(OracleError::NotLoaded) => {}
            Err(e) => {
                degraded = true;
                tracing::warn!(error = %e, "Zero-shot falhou, seguindo para similaridade");
            }
        }

        match self.semantic(text).await {
            Ok(Some(intent)) => return (intent, Source::Semantic, false),
            Ok(None) | Err(OracleError::NotLoaded) => {}
            Err(e) => {
                degraded = true;
                tracing::warn!(error = %e, "Fallback semântico de intent falhou");
            }
        }

        (Intent::Unknown, Source::Fallback, degraded)
    }

    async fn zero_shot(&self, text: &str) -> Result<Vec<(Intent, f32)>, OracleError> {
        let models = self.models.get().ok_or(OracleError::NotLoaded)?;
        let zero_shot = models.zero_shot.clone().ok_or(OracleError::NotLoaded)?;
        let labels: Vec<Intent> = Intent::ALL
            .iter()
            .copied()
            .filter(|i| i.description().is_some())
            .collect();
        let text = text.to_string();
        self.gate.run(move || zero_shot.rank(&text, &labels)).await
    }

    async fn semantic(&self, text: &str) -> Result<Option<Intent>, OracleError> {
        let models = self.models.get().ok_or(OracleError::NotLoaded)?;
        let embedder = models.embedder.clone();
        let cache = self.sample_vectors.clone();
        let samples = self.samples.clone();
        let text = text.to_string();

        self.gate
            .run(move || {
                let vectors = sample_vectors(&cache, &samples, embedder.as_ref())?;
                let message = embedder.embed(&text)?;
                let best = vectors
                    .iter()
                    .map(|(intent, v)| (*intent, cosine_similarity(&message, v)))
                    .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
                Ok(best.filter(|(_, s)| *s > SEMANTIC_THRESHOLD).map(|(i, _)| i))
            })
            .await
    }

    /// Pré-computa os embeddings das respostas-exemplo.
    pub fn warm_up(&self) -> Result<(), OracleError> {
        let models = self.models.get().ok_or(OracleError::NotLoaded)?;
        sample_vectors(&self.sample_vectors, &self.samples, models.embedder.as_ref()).map(|_| ())
    }
}

/// Intent mapeado por algum tema que aparece entre os primeiros do ranking.
fn theme_override(ranked: &[(Intent, f32)], themes: &[String]) -> Option<Intent> {
    let mapped: Vec<Intent> = themes.iter().filter_map(|t| theme_intent(t)).collect();
    ranked
        .iter()
        .take(THEME_OVERRIDE_WINDOW)
        .map(|(i, _)| *i)
        .find(|i| mapped.contains(i))
}

fn sample_vectors<'a>(
    cache: &'a OnceLock<SampleVectors>,
    samples: &[(Intent, String)],
    embedder: &dyn TextEmbedder,
) -> Result<&'a SampleVectors, OracleError> {
    if let Some(v) = cache.get() {
        return Ok(v);
    }
    let texts: Vec<String> = samples.iter().map(|(_, t)| t.clone()).collect();
    let vectors = embedder.embed_batch(&texts)?;
    let computed = samples.iter().map(|(i, _)| *i).zip(vectors).collect();
    Ok(cache.get_or_init(|| computed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::nlu::models::fakes::*;
    use crate::nlu::models::Models;
    use crate::nlu::patterns::compile_rules;

    fn rules() -> Arc<Vec<PatternRule>> {
        Arc::new(compile_rules())
    }

    fn gate(ms: u64) -> ModelGate {
        ModelGate::new(4, Duration::from_millis(ms))
    }

    fn unloaded() -> ModelSlot {
        Arc::new(OnceLock::new())
    }

    fn samples() -> Vec<(Intent, String)> {
        vec![
            (Intent::Sleep, "insomnia keeps me awake at night".to_string()),
            (Intent::Greeting, "hello there friend".to_string()),
        ]
    }

    fn with_zero_shot(ranking: Vec<(Intent, f32)>) -> ModelSlot {
        let mut models = hashing_models();
        models.zero_shot = Some(Arc::new(ScriptedZeroShot(ranking)));
        slot(models)
    }

    #[tokio::test]
    async fn pattern_layer_wins_and_extracts_details() {
        let c = IntentClassifier::new(rules(), samples(), unloaded(), gate(100));
        let mut ctx = UserContext::new("u");
        let r = c
            .classify(
                "I feel very anxious about work lately",
                &["anxiety".into(), "work".into()],
                2.0,
                &mut ctx,
            )
            .await;
        assert_eq!(r.intent, Intent::Anxiety);
        assert_eq!(r.source, Source::Pattern);
        assert_eq!(r.details.timeframe.as_deref(), Some("lately"));
        assert_eq!(ctx.intent_history.len(), 1);
    }

    #[tokio::test]
    async fn rules_only_mode_falls_back_to_unknown() {
        let c = IntentClassifier::new(rules(), samples(), unloaded(), gate(100));
        let r = c.classify("the weather is strange", &[], 0.0, &mut UserContext::new("u")).await;
        assert_eq!(r.intent, Intent::Unknown);
        assert_eq!(r.source, Source::Fallback);
    }

    #[tokio::test]
    async fn confident_zero_shot_is_accepted() {
        let slot = with_zero_shot(vec![(Intent::Motivation, 0.8), (Intent::Stress, 0.1)]);
        let c = IntentClassifier::new(rules(), samples(), slot, gate(1000));
        let r = c.classify("everything feels pointless", &[], 0.0, &mut UserContext::new("u")).await;
        assert_eq!((r.intent, r.source), (Intent::Motivation, Source::ZeroShot));
    }

    #[tokio::test]
    async fn theme_in_top_three_overrides_zero_shot() {
        let slot = with_zero_shot(vec![
            (Intent::Stress, 0.6),
            (Intent::General, 0.2),
            (Intent::WorkStress, 0.1),
            (Intent::Family, 0.05),
        ]);
        let c = IntentClassifier::new(rules(), samples(), slot, gate(1000));
        let r = c.classify("the office drains me", &["work".into()], 0.0, &mut UserContext::new("u")).await;
        assert_eq!((r.intent, r.source), (Intent::WorkStress, Source::Theme));

        // fora do top-3 não sobrepõe
        let r = c.classify("the office drains me", &["family".into()], 0.0, &mut UserContext::new("u")).await;
        assert_eq!(r.intent, Intent::Stress);
    }

    #[tokio::test]
    async fn inconclusive_zero_shot_uses_semantic_similarity() {
        let slot = with_zero_shot(vec![(Intent::Stress, 0.3), (Intent::General, 0.25)]);
        let c = IntentClassifier::new(rules(), samples(), slot, gate(1000));
        c.warm_up().unwrap();
        let r = c.classify("wide awake at night", &[], 0.0, &mut UserContext::new("u")).await;
        assert_eq!((r.intent, r.source), (Intent::Sleep, Source::Semantic));
    }

    #[tokio::test]
    async fn model_failures_degrade_to_unknown_with_empty_details() {
        let mut models = hashing_models();
        models.embedder = Arc::new(FailingEmbedder);
        models.zero_shot = Some(Arc::new(FailingZeroShot));
        let c = IntentClassifier::new(rules(), samples(), slot(models), gate(1000));
        let r = c.classify("the weather is strange", &["hope".into()], 3.0, &mut UserContext::new("u")).await;
        assert_eq!(r.intent, Intent::Unknown);
        assert_eq!(r.details, Details::default());
    }

    #[tokio::test]
    async fn repeated_emotional_intent_carries_a_suggestion() {
        let c = IntentClassifier::new(rules(), samples(), unloaded(), gate(100));
        let mut ctx = UserContext::new("u");
        ctx.preferences.preferred_technique = "journaling".into();
        let first = c.classify("I can't sleep", &[], 0.0, &mut ctx).await;
        assert!(first.details.suggestion.is_none());
        ctx.previous_intent = Some(first.intent);
        let second = c.classify("I can't sleep again", &[], 0.0, &mut ctx).await;
        assert!(second.details.suggestion.unwrap().contains("journaling"));
    }
}
