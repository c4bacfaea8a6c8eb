//! # Fronteira dos Modelos — O Oráculo Opaco
//!
//! Os modelos de ML são tratados como caixas-pretas atrás de três traits:
//!
//! | Trait | Contrato | Backend de produção |
//! |-------|----------|---------------------|
//! | [`TextEmbedder`] | texto → vetor L2-normalizado | BERT via candle ([`super::embedder`]) |
//! | [`SentimentClassifier`] | texto → (label, score) | [`PrototypeSentiment`] |
//! | [`ZeroShotClassifier`] | texto + labels → ranking | [`HypothesisZeroShot`] |
//!
//! ## Carregamento em Background
//!
//! O [`Models`] é publicado num `OnceLock` ([`ModelSlot`]) quando o modelo
//! termina de carregar. Antes disso o pipeline roda só com regras: sentimento
//! NEUTRAL, fallbacks por embedding desligados.
//!
//! ## Tempo Limitado
//!
//! Toda chamada de modelo passa pela [`ModelGate`]: um `Semaphore` do tokio
//! limita quantas rodam ao mesmo tempo no pool bloqueante e
//! `tokio::time::timeout` limita quanto o turno espera (fila + execução).
//! Se estourar, o chamador usa o fallback documentado. A chamada abandonada
//! termina no pool segurando sua vaga, então o número de forward passes em
//! andamento nunca passa do limite.

use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;

use crate::core::{cosine_similarity, softmax, Intent};

/// Margem mínima entre similaridade positiva e negativa para sair de NEUTRAL.
pub const NEUTRAL_MARGIN: f32 = 0.05;

/// Temperatura do softmax sobre similaridades cosseno.
const SIMILARITY_TEMPERATURE: f32 = 0.05;

const POSITIVE_PROTOTYPES: &[&str] = &[
    "I feel great and happy today",
    "things are going really well for me",
    "I am grateful and hopeful",
    "I feel calm, relaxed and at peace",
    "thank you, that really helped me",
];

const NEGATIVE_PROTOTYPES: &[&str] = &[
    "I feel terrible and miserable",
    "everything is going wrong for me",
    "I am scared, anxious and overwhelmed",
    "I feel sad, empty and hopeless",
    "I am so angry and frustrated",
];

#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    #[error("modelos ainda não carregados")]
    NotLoaded,
    #[error("falha no modelo: {0}")]
    Model(String),
    #[error("tempo limite de {0:?} excedido")]
    Timeout(Duration),
}

impl From<anyhow::Error> for OracleError {
    fn from(e: anyhow::Error) -> Self {
        OracleError::Model(e.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    /// Confiança em `[0, 1]`.
    pub score: f32,
}

impl Sentiment {
    /// Valor de fallback quando o classificador falha.
    pub fn neutral() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            score: 0.0,
        }
    }
}

pub trait TextEmbedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, OracleError>;

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, OracleError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

pub trait SentimentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<Sentiment, OracleError>;
}

pub trait ZeroShotClassifier: Send + Sync {
    /// Ranking dos `labels` por probabilidade decrescente.
    fn rank(&self, text: &str, labels: &[Intent]) -> Result<Vec<(Intent, f32)>, OracleError>;
}

/// Conjunto de modelos publicado pelo carregamento em background.
#[derive(Clone)]
pub struct Models {
    pub embedder: Arc<dyn TextEmbedder>,
    pub sentiment: Arc<dyn SentimentClassifier>,
    pub zero_shot: Option<Arc<dyn ZeroShotClassifier>>,
}

/// Slot compartilhado: vazio até o modelo carregar.
pub type ModelSlot = Arc<OnceLock<Models>>;

impl Models {
    /// Monta os classificadores de produção sobre um único embedder.
    ///
    /// Pré-computa os embeddings dos protótipos e das hipóteses; depois
    /// disso cada classificação custa um único forward pass.
    pub fn from_embedder(embedder: Arc<dyn TextEmbedder>) -> Result<Self, OracleError> {
        let sentiment = PrototypeSentiment::new(embedder.clone())?;
        let zero_shot = HypothesisZeroShot::new(embedder.clone())?;
        Ok(Self {
            embedder,
            sentiment: Arc::new(sentiment),
            zero_shot: Some(Arc::new(zero_shot)),
        })
    }
}

/// Limite de concorrência e de tempo para chamadas de modelo.
#[derive(Clone)]
pub struct ModelGate {
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl ModelGate {
    pub fn new(max_in_flight: usize, timeout: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Vagas livres agora.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Executa `f` no pool bloqueante do tokio, esperando no máximo `timeout`.
    ///
    /// Pânico dentro de `f` vira [`OracleError::Model`].
    pub fn run<T, F>(&self, f: F) -> impl Future<Output = Result<T, OracleError>> + Send + 'static
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, OracleError> + Send + 'static,
    {
        let permits = self.permits.clone();
        let timeout = self.timeout;
        async move {
            let call = async move {
                let permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|_| OracleError::Model("porta de modelos fechada".into()))?;
                let handle = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    f()
                });
                handle
                    .await
                    .map_err(|e| OracleError::Model(format!("chamada de modelo abortou: {e}")))?
            };
            match tokio::time::timeout(timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(OracleError::Timeout(timeout)),
            }
        }
    }
}

fn owned(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|s| s.to_string()).collect()
}

fn max_similarity(vector: &[f32], prototypes: &[Vec<f32>]) -> f32 {
    prototypes
        .iter()
        .map(|p| cosine_similarity(vector, p))
        .fold(f32::MIN, f32::max)
}

/// Sentimento por similaridade com frases-protótipo positivas e negativas.
pub struct PrototypeSentiment {
    embedder: Arc<dyn TextEmbedder>,
    positive: Vec<Vec<f32>>,
    negative: Vec<Vec<f32>>,
}

impl PrototypeSentiment {
    pub fn new(embedder: Arc<dyn TextEmbedder>) -> Result<Self, OracleError> {
        let positive = embedder.embed_batch(&owned(POSITIVE_PROTOTYPES))?;
        let negative = embedder.embed_batch(&owned(NEGATIVE_PROTOTYPES))?;
        Ok(Self {
            embedder,
            positive,
            negative,
        })
    }
}

impl SentimentClassifier for PrototypeSentiment {
    fn classify(&self, text: &str) -> Result<Sentiment, OracleError> {
        let v = self.embedder.embed(text)?;
        let pos = max_similarity(&v, &self.positive);
        let neg = max_similarity(&v, &self.negative);

        if (pos - neg).abs() < NEUTRAL_MARGIN {
            return Ok(Sentiment {
                label: SentimentLabel::Neutral,
                score: 1.0 - (pos - neg).abs() / NEUTRAL_MARGIN * 0.5,
            });
        }
        let probs = softmax(&[pos, neg], SIMILARITY_TEMPERATURE);
        Ok(if pos > neg {
            Sentiment {
                label: SentimentLabel::Positive,
                score: probs[0],
            }
        } else {
            Sentiment {
                label: SentimentLabel::Negative,
                score: probs[1],
            }
        })
    }
}

/// Zero-shot por hipóteses: "This message is about ..." para cada intent.
pub struct HypothesisZeroShot {
    embedder: Arc<dyn TextEmbedder>,
    hypotheses: Vec<(Intent, Vec<f32>)>,
}

impl HypothesisZeroShot {
    pub fn new(embedder: Arc<dyn TextEmbedder>) -> Result<Self, OracleError> {
        let labelled: Vec<(Intent, String)> = Intent::ALL
            .iter()
            .filter_map(|i| {
                i.description()
                    .map(|d| (*i, format!("This message is about {}", d)))
            })
            .collect();
        let texts: Vec<String> = labelled.iter().map(|(_, t)| t.clone()).collect();
        let vectors = embedder.embed_batch(&texts)?;
        let hypotheses = labelled
            .into_iter()
            .map(|(i, _)| i)
            .zip(vectors)
            .collect();
        Ok(Self {
            embedder,
            hypotheses,
        })
    }
}

impl ZeroShotClassifier for HypothesisZeroShot {
    fn rank(&self, text: &str, labels: &[Intent]) -> Result<Vec<(Intent, f32)>, OracleError> {
        let v = self.embedder.embed(text)?;
        let candidates: Vec<(Intent, f32)> = self
            .hypotheses
            .iter()
            .filter(|(i, _)| labels.contains(i))
            .map(|(i, h)| (*i, cosine_similarity(&v, h)))
            .collect();
        let scores: Vec<f32> = candidates.iter().map(|(_, s)| *s).collect();
        let probs = softmax(&scores, SIMILARITY_TEMPERATURE);
        let mut ranked: Vec<(Intent, f32)> = candidates
            .into_iter()
            .map(|(i, _)| i)
            .zip(probs)
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(ranked)
    }
}
