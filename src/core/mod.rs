//! # Módulo Core — Tipos Fundamentais do Domínio
//!
//! Tipos compartilhados por todas as camadas do chat de apoio emocional:
//!
//! - [`Intent`]: classificação fechada do assunto da mensagem
//! - [`UserContext`]: estado conversacional acumulado por usuário
//! - [`EmotionalStage`]: progressão validação → exploração → enfrentamento
//! - [`Details`]: campos estruturados extraídos da mensagem
//! - [`ResponseTemplate`]: resposta simples ou estruturada (followup, técnicas, recursos)
//!
//! Nenhum destes tipos conhece o modelo de ML nem a camada HTTP.

pub mod context;
pub mod details;
pub mod intent;
pub mod template;
pub mod vector;

pub use context::{
    ContextUpdate, EmotionalStage, History, IntentObservation, Preferences, ThemeObservation,
    UserContext, HISTORY_CAP,
};
pub use details::Details;
pub use intent::Intent;
pub use template::{fingerprint_text, render, ResponseTemplate, TemplateError};
pub use vector::{cosine_similarity, softmax};
