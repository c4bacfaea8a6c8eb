//! # Intent — O Que a Mensagem Quer Dizer
//!
//! Enumeração fechada: definida uma única vez, nunca estendida em runtime.
//! A representação serializada (`snake_case`) é a mesma usada no JSON da API
//! e nas chaves do catálogo de respostas.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Intenção classificada a partir da mensagem do usuário.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Crisis,
    Anxiety,
    Depression,
    Stress,
    Loneliness,
    Anger,
    SelfCare,
    Relationship,
    Grief,
    Sleep,
    Motivation,
    WorkStress,
    Family,
    Trauma,
    SelfEsteem,
    Greeting,
    Farewell,
    Gratitude,
    General,
    /// Nenhuma camada de classificação teve confiança suficiente.
    Unknown,
}

impl Intent {
    /// Todas as variantes, na ordem de declaração.
    pub const ALL: [Intent; 20] = [
        Intent::Crisis,
        Intent::Anxiety,
        Intent::Depression,
        Intent::Stress,
        Intent::Loneliness,
        Intent::Anger,
        Intent::SelfCare,
        Intent::Relationship,
        Intent::Grief,
        Intent::Sleep,
        Intent::Motivation,
        Intent::WorkStress,
        Intent::Family,
        Intent::Trauma,
        Intent::SelfEsteem,
        Intent::Greeting,
        Intent::Farewell,
        Intent::Gratitude,
        Intent::General,
        Intent::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Crisis => "crisis",
            Intent::Anxiety => "anxiety",
            Intent::Depression => "depression",
            Intent::Stress => "stress",
            Intent::Loneliness => "loneliness",
            Intent::Anger => "anger",
            Intent::SelfCare => "self_care",
            Intent::Relationship => "relationship",
            Intent::Grief => "grief",
            Intent::Sleep => "sleep",
            Intent::Motivation => "motivation",
            Intent::WorkStress => "work_stress",
            Intent::Family => "family",
            Intent::Trauma => "trauma",
            Intent::SelfEsteem => "self_esteem",
            Intent::Greeting => "greeting",
            Intent::Farewell => "farewell",
            Intent::Gratitude => "gratitude",
            Intent::General => "general",
            Intent::Unknown => "unknown",
        }
    }

    /// Converte o label textual (`"work_stress"`) de volta para a variante.
    pub fn from_label(label: &str) -> Option<Intent> {
        let label = label.trim();
        Intent::ALL
            .iter()
            .copied()
            .find(|i| i.as_str().eq_ignore_ascii_case(label))
    }

    /// Hipótese em linguagem natural usada pelo classificador zero-shot.
    ///
    /// `Unknown` não tem hipótese, nunca é candidato do zero-shot.
    pub fn description(&self) -> Option<&'static str> {
        let text = match self {
            Intent::Crisis => "wanting to die, suicide or hurting oneself",
            Intent::Anxiety => "feeling anxious, nervous, worried or panicking",
            Intent::Depression => "feeling sad, depressed, empty or hopeless",
            Intent::Stress => "feeling stressed, pressured or overwhelmed",
            Intent::Loneliness => "feeling lonely, isolated or left out",
            Intent::Anger => "feeling angry, furious or irritated",
            Intent::SelfCare => "looking for ways to relax and take care of oneself",
            Intent::Relationship => "problems with a partner, breakup or a friendship",
            Intent::Grief => "grieving the death or loss of someone",
            Intent::Sleep => "trouble sleeping, insomnia or exhaustion",
            Intent::Motivation => "lacking motivation, energy or purpose",
            Intent::WorkStress => "stress about a job, boss, deadlines or workload",
            Intent::Family => "conflict or worries involving parents or family",
            Intent::Trauma => "a traumatic experience, abuse or flashbacks",
            Intent::SelfEsteem => "feeling worthless, not good enough or a failure",
            Intent::Greeting => "saying hello and greeting someone",
            Intent::Farewell => "saying goodbye and ending the conversation",
            Intent::Gratitude => "thanking someone and expressing gratitude",
            Intent::General => "a general question or small talk",
            Intent::Unknown => return None,
        };
        Some(text)
    }

    /// Intents de conteúdo emocional (os que participam de técnicas e sugestões).
    pub fn is_emotional(&self) -> bool {
        !matches!(
            self,
            Intent::Greeting
                | Intent::Farewell
                | Intent::Gratitude
                | Intent::General
                | Intent::Unknown
                | Intent::Crisis
        )
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_from_label() {
        for intent in Intent::ALL {
            assert_eq!(Intent::from_label(intent.as_str()), Some(intent));
        }
        assert_eq!(Intent::from_label("nonsense"), None);
    }

    #[test]
    fn serde_uses_snake_case_labels() {
        let json = serde_json::to_string(&Intent::WorkStress).unwrap();
        assert_eq!(json, "\"work_stress\"");
        let back: Intent = serde_json::from_str("\"self_esteem\"").unwrap();
        assert_eq!(back, Intent::SelfEsteem);
    }

    #[test]
    fn unknown_has_no_zero_shot_hypothesis() {
        assert!(Intent::Unknown.description().is_none());
        assert!(Intent::Anxiety.description().is_some());
    }
}
