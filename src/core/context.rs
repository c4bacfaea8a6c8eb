//! # UserContext — Estado Conversacional por Usuário
//!
//! Existe exatamente um [`UserContext`] por `user_id`. O contexto acumula
//! temas, conta interações, guarda a preferência de técnica de enfrentamento
//! e o estágio emocional da conversa.
//!
//! ## Estágios Emocionais
//!
//! ```text
//! Validation ──► Exploration ──► Coping ──► Coping (saturado)
//! ```
//!
//! A transição acontece uma vez por turno não-crise que produziu resposta.
//! Não há regressão.

use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Details, Intent};

/// Capacidade dos históricos rolantes (temas e intents).
pub const HISTORY_CAP: usize = 10;

/// Técnica de enfrentamento assumida antes de o usuário expressar preferência.
pub const DEFAULT_TECHNIQUE: &str = "breathing";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalStage {
    /// Acolher e reconhecer o sentimento.
    #[default]
    Validation,
    /// Perguntar mais, entender o contexto.
    Exploration,
    /// Oferecer técnicas de enfrentamento.
    Coping,
}

impl EmotionalStage {
    /// Próximo estágio; `Coping` é terminal.
    pub fn next(self) -> Self {
        match self {
            EmotionalStage::Validation => EmotionalStage::Exploration,
            EmotionalStage::Exploration | EmotionalStage::Coping => EmotionalStage::Coping,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionalStage::Validation => "validation",
            EmotionalStage::Exploration => "exploration",
            EmotionalStage::Coping => "coping",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub preferred_technique: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            preferred_technique: DEFAULT_TECHNIQUE.to_string(),
        }
    }
}

/// Histórico rolante limitado a [`HISTORY_CAP`] entradas (a mais antiga sai).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History<T>(VecDeque<T>);

impl<T> Default for History<T> {
    fn default() -> Self {
        Self(VecDeque::new())
    }
}

impl<T> History<T> {
    pub fn push(&mut self, entry: T) {
        while self.0.len() >= HISTORY_CAP {
            self.0.pop_front();
        }
        self.0.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&T> {
        self.0.back()
    }
}

/// Registro de temas detectados pelo oráculo em uma mensagem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThemeObservation {
    pub message: String,
    pub themes: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Registro de intent classificado para uma mensagem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentObservation {
    pub message: String,
    pub intent: Intent,
    pub timestamp: DateTime<Utc>,
}

/// Estado conversacional de um usuário.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    /// Monotônico: +1 por turno processado (crise inclusive).
    pub interaction_count: u64,
    /// Conjunto acumulado, serializado como lista ordenada.
    pub identified_themes: BTreeSet<String>,
    /// Valor do último turno apenas (não acumula).
    pub crisis_mode: bool,
    pub previous_intent: Option<Intent>,
    pub preferences: Preferences,
    pub emotional_stage: EmotionalStage,
    /// Fingerprints das respostas já emitidas para este usuário.
    #[serde(default)]
    pub used_responses: BTreeSet<Uuid>,
    #[serde(default)]
    pub last_details: Details,
    #[serde(default)]
    pub theme_history: History<ThemeObservation>,
    #[serde(default)]
    pub intent_history: History<IntentObservation>,
    /// `None` até o primeiro turno gravado.
    #[serde(default)]
    pub last_active: Option<DateTime<Utc>>,
}

/// Upsert de um turno: substitui os campos de estado do contexto.
#[derive(Clone, Debug)]
pub struct ContextUpdate {
    pub intent: Intent,
    pub interaction_count: u64,
    /// Temas deste turno; são mesclados ao conjunto acumulado.
    pub themes: Vec<String>,
    pub crisis_mode: bool,
    pub details: Details,
    pub preferences: Preferences,
    pub emotional_stage: EmotionalStage,
}

impl UserContext {
    /// Contexto novo com valores padrão (estágio `Validation`, contagem 0).
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            interaction_count: 0,
            identified_themes: BTreeSet::new(),
            crisis_mode: false,
            previous_intent: None,
            preferences: Preferences::default(),
            emotional_stage: EmotionalStage::Validation,
            used_responses: BTreeSet::new(),
            last_details: Details::default(),
            theme_history: History::default(),
            intent_history: History::default(),
            last_active: None,
        }
    }

    pub fn update(&mut self, update: ContextUpdate) {
        self.previous_intent = Some(update.intent);
        self.interaction_count = update.interaction_count;
        self.identified_themes.extend(update.themes);
        self.crisis_mode = update.crisis_mode;
        self.last_details = update.details;
        self.preferences = update.preferences;
        self.emotional_stage = update.emotional_stage;
        self.touch();
    }

    /// Turno de crise: só `crisis_mode` e a contagem mudam.
    pub fn mark_crisis(&mut self) {
        self.crisis_mode = true;
        self.interaction_count += 1;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_active = Some(Utc::now());
    }
}
