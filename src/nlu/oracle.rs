//! # Oráculo de Temas e Sentimento
//!
//! Fronteira única com os modelos opacos. Para cada mensagem produz:
//!
//! ```text
//! texto ──► sentimento (modelo, limitado por timeout)  ──► NEUTRAL/0.0 se falhar
//!       ├─► intensidade (soma dos modificadores, teto 5.0)
//!       └─► temas: palavras-chave ──(< 2 temas)──► similaridade de embeddings > 0.6
//! ```
//!
//! No fallback semântico cada palavra-chave tem seu próprio vetor; um tema
//! entra quando a melhor similaridade entre a mensagem e suas palavras-chave
//! passa do limiar.
//!
//! Nenhuma falha de modelo atravessa esta fronteira: erro ou timeout viram o
//! fallback documentado e um `warn` no log.

use std::sync::{Arc, OnceLock};

use chrono::Utc;

use crate::core::{cosine_similarity, History, ThemeObservation};

use super::models::{ModelGate, ModelSlot, OracleError, Sentiment, TextEmbedder};
use super::themes::{intensity_of, ThemeMatcher, THEME_KEYWORDS};

/// Similaridade mínima para o fallback semântico adicionar um tema.
pub const THEME_SIMILARITY_THRESHOLD: f32 = 0.6;

/// Abaixo desse número de temas por palavra-chave, tenta o fallback semântico.
const MIN_KEYWORD_THEMES: usize = 2;

/// Vetores de cada palavra-chave, agrupados por tema.
type ThemeVectors = Vec<(&'static str, Vec<Vec<f32>>)>;

#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    pub sentiment: Sentiment,
    pub intensity: f32,
    /// Ordenados e sem repetição.
    pub themes: Vec<String>,
}

pub struct Oracle {
    matcher: ThemeMatcher,
    models: ModelSlot,
    gate: ModelGate,
    theme_vectors: Arc<OnceLock<ThemeVectors>>,
}

impl Oracle {
    pub fn new(models: ModelSlot, gate: ModelGate) -> Self {
        Self {
            matcher: ThemeMatcher::new(),
            models,
            gate,
            theme_vectors: Arc::new(OnceLock::new()),
        }
    }

    /// Analisa a mensagem e registra os temas no histórico do usuário.
    pub async fn analyze(&self, text: &str, history: &mut History<ThemeObservation>) -> Analysis {
        let sentiment = self.sentiment(text).await;
        let intensity = intensity_of(text);

        let mut themes = self.matcher.matches(text);
        if themes.len() < MIN_KEYWORD_THEMES {
            match self.semantic_themes(text).await {
                Ok(extra) => themes.extend(extra),
                Err(OracleError::NotLoaded) => {}
                Err(e) => tracing::warn!(error = %e, "Fallback semântico de temas indisponível"),
            }
        }
        themes.sort();
        themes.dedup();

        history.push(ThemeObservation {
            message: text.to_string(),
            themes: themes.clone(),
            timestamp: Utc::now(),
        });

        tracing::debug!(?themes, intensity, label = ?sentiment.label, "Mensagem analisada");
        Analysis {
            sentiment,
            intensity,
            themes,
        }
    }

    async fn sentiment(&self, text: &str) -> Sentiment {
        let Some(models) = self.models.get() else {
            return Sentiment::neutral();
        };
        let classifier = models.sentiment.clone();
        let text = text.to_string();
        match self.gate.run(move || classifier.classify(&text)).await {
            Ok(s) => Sentiment {
                label: s.label,
                score: s.score.clamp(0.0, 1.0),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Classificador de sentimento falhou, usando NEUTRAL");
                Sentiment::neutral()
            }
        }
    }

    async fn semantic_themes(&self, text: &str) -> Result<Vec<String>, OracleError> {
        let models = self.models.get().ok_or(OracleError::NotLoaded)?;
        let embedder = models.embedder.clone();
        let cache = self.theme_vectors.clone();
        let text = text.to_string();

        self.gate
            .run(move || {
                let vectors = theme_vectors(&cache, embedder.as_ref())?;
                let message = embedder.embed(&text)?;
                Ok(vectors
                    .iter()
                    .filter(|(_, keywords)| {
                        best_similarity(&message, keywords) > THEME_SIMILARITY_THRESHOLD
                    })
                    .map(|(theme, _)| theme.to_string())
                    .collect())
            })
            .await
    }

    /// Pré-computa os vetores dos temas assim que os modelos carregam.
    pub fn warm_up(&self) -> Result<(), OracleError> {
        let models = self.models.get().ok_or(OracleError::NotLoaded)?;
        theme_vectors(&self.theme_vectors, models.embedder.as_ref()).map(|_| ())
    }

    pub fn models_ready(&self) -> bool {
        self.models.get().is_some()
    }
}

fn theme_vectors<'a>(
    cache: &'a OnceLock<ThemeVectors>,
    embedder: &dyn TextEmbedder,
) -> Result<&'a ThemeVectors, OracleError> {
    if let Some(v) = cache.get() {
        return Ok(v);
    }
    let texts: Vec<String> = THEME_KEYWORDS
        .iter()
        .flat_map(|(_, keywords)| keywords.iter().map(|k| k.to_string()))
        .collect();
    let mut vectors = embedder.embed_batch(&texts)?.into_iter();
    let computed = THEME_KEYWORDS
        .iter()
        .map(|(theme, keywords)| (*theme, vectors.by_ref().take(keywords.len()).collect()))
        .collect();
    // outra thread pode ter preenchido antes; qualquer um dos dois serve
    Ok(cache.get_or_init(|| computed))
}

fn best_similarity(message: &[f32], keywords: &[Vec<f32>]) -> f32 {
    keywords
        .iter()
        .map(|k| cosine_similarity(message, k))
        .fold(f32::MIN, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::nlu::models::fakes::*;
    use crate::nlu::models::{Models, SentimentLabel};

    /// Embedder que só distingue textos sobre "teto às 3h" (insônia) do resto.
    struct CeilingEmbedder;

    impl TextEmbedder for CeilingEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, OracleError> {
            if text.contains("ceiling") || text.contains("insomnia") {
                Ok(vec![1.0, 0.0])
            } else {
                Ok(vec![0.0, 1.0])
            }
        }
    }

    /// Só a palavra-chave isolada "insomnia" fica perto de "ceiling";
    /// qualquer texto maior que a contenha não.
    struct SingleKeywordEmbedder;

    impl TextEmbedder for SingleKeywordEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, OracleError> {
            if text == "insomnia" || text.contains("ceiling") {
                Ok(vec![1.0, 0.0])
            } else {
                Ok(vec![0.0, 1.0])
            }
        }
    }

    fn unloaded() -> ModelSlot {
        Arc::new(OnceLock::new())
    }

    fn gate(ms: u64) -> ModelGate {
        ModelGate::new(4, Duration::from_millis(ms))
    }

    fn ceiling_models(embedder: Arc<dyn TextEmbedder>) -> Models {
        Models {
            embedder,
            sentiment: Arc::new(FixedSentiment(Sentiment::neutral())),
            zero_shot: None,
        }
    }

    #[tokio::test]
    async fn rules_only_mode_is_neutral_and_keyword_driven() {
        let oracle = Oracle::new(unloaded(), gate(100));
        let mut history = History::default();
        let a = oracle
            .analyze("I feel very anxious about work lately", &mut history)
            .await;
        assert_eq!(a.sentiment, Sentiment::neutral());
        assert_eq!(a.intensity, 2.0);
        assert_eq!(a.themes, vec!["anxiety", "work"]);
        assert_eq!(history.len(), 1);
        assert_eq!(history.last().unwrap().themes, a.themes);
    }

    #[tokio::test]
    async fn failing_classifier_falls_back_to_neutral() {
        let mut models = hashing_models();
        models.sentiment = Arc::new(FailingSentiment);
        let oracle = Oracle::new(slot(models), gate(200));
        let a = oracle.analyze("I am sad", &mut History::default()).await;
        assert_eq!(a.sentiment.label, SentimentLabel::Neutral);
        assert_eq!(a.sentiment.score, 0.0);
    }

    #[tokio::test]
    async fn slow_classifier_times_out_to_neutral() {
        let mut models = hashing_models();
        models.sentiment = Arc::new(SlowSentiment(Duration::from_millis(500)));
        let oracle = Oracle::new(slot(models), gate(20));
        let a = oracle.analyze("hello", &mut History::default()).await;
        assert_eq!(a.sentiment, Sentiment::neutral());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn saturated_models_degrade_without_piling_up_calls() {
        let counting = Arc::new(CountingSentiment::new(Duration::from_millis(100)));
        let mut models = hashing_models();
        models.sentiment = counting.clone();
        let oracle = Arc::new(Oracle::new(slot(models), ModelGate::new(2, Duration::from_millis(15))));

        let mut handles = Vec::new();
        for i in 0..12 {
            let oracle = oracle.clone();
            handles.push(tokio::spawn(async move {
                oracle
                    .analyze(&format!("message {i}"), &mut History::default())
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().sentiment, Sentiment::neutral());
        }
        assert!(counting.peak.load(std::sync::atomic::Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn semantic_fallback_adds_close_themes() {
        let oracle = Oracle::new(slot(ceiling_models(Arc::new(CeilingEmbedder))), gate(1000));
        oracle.warm_up().unwrap();
        let a = oracle
            .analyze("staring at the ceiling every night", &mut History::default())
            .await;
        assert_eq!(a.themes, vec!["sleep"]);
    }

    #[tokio::test]
    async fn one_close_keyword_is_enough_for_a_theme() {
        let oracle = Oracle::new(
            slot(ceiling_models(Arc::new(SingleKeywordEmbedder))),
            gate(1000),
        );
        let a = oracle
            .analyze("staring at the ceiling every night", &mut History::default())
            .await;
        assert_eq!(a.themes, vec!["sleep"]);
    }

    #[tokio::test]
    async fn failing_embedder_keeps_keyword_themes() {
        let mut models = hashing_models();
        models.embedder = Arc::new(FailingEmbedder);
        let oracle = Oracle::new(slot(models), gate(1000));
        let a = oracle.analyze("I feel lonely", &mut History::default()).await;
        assert_eq!(a.themes, vec!["loneliness"]);
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let oracle = Oracle::new(unloaded(), gate(50));
        let mut history = History::default();
        for i in 0..15 {
            oracle.analyze(&format!("message {}", i), &mut history).await;
        }
        assert_eq!(history.len(), crate::core::HISTORY_CAP);
    }
}
