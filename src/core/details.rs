//! # Details — Campos Extraídos da Mensagem
//!
//! Resultado da extração específica por intent. Campos opcionais ausentes
//! ficam `None`, nunca são inventados. A intensidade e os temas vêm do
//! oráculo e estão sempre presentes.

use serde::{Deserialize, Serialize};

/// Detalhes estruturados de uma mensagem, usados para preencher templates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Details {
    /// Intensidade emocional calculada pelo oráculo (0.0 a 5.0).
    pub intensity: f32,
    /// Temas identificados nesta mensagem (ordenados).
    #[serde(default)]
    pub themes: Vec<String>,
    /// Qualificadores de intensidade encontrados ("very", "really so").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity_words: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
    /// O que desencadeou o sentimento ("work", "my exams").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anger_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_talk: Option<String>,
    /// Lembrete ad-hoc anexado ao final da resposta (ex: técnica preferida).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Details {
    /// Detalhes mínimos: só o que o oráculo sempre fornece.
    pub fn base(intensity: f32, themes: &[String]) -> Self {
        Self {
            intensity,
            themes: themes.to_vec(),
            ..Self::default()
        }
    }

    /// Resolve um placeholder de template pelo nome.
    ///
    /// Além dos campos diretos, expõe formas derivadas prontas para frase:
    /// `trigger_phrase` → `" about work"`, `timeframe_phrase` → `" lately"`.
    pub fn placeholder(&self, name: &str) -> Option<String> {
        match name {
            "intensity" => Some(format!("{:.1}", self.intensity)),
            "intensity_words" => self.intensity_words.clone(),
            "timeframe" => self.timeframe.clone(),
            "timeframe_phrase" => self.timeframe.as_ref().map(|t| format!(" {}", t)),
            "trigger" => self.trigger.clone(),
            "trigger_phrase" => self.trigger.as_ref().map(|t| format!(" about {}", t)),
            "relationship" => self.relationship.clone(),
            "loss" => self.loss.clone(),
            "work_issue" => self.work_issue.clone(),
            "sleep_issue" => self.sleep_issue.clone(),
            "anger_target" => self.anger_target.clone(),
            "self_talk" => self.self_talk.clone(),
            "themes" if !self.themes.is_empty() => Some(self.themes.join(", ")),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_phrases_only_exist_when_field_is_present() {
        let mut d = Details::base(2.0, &["anxiety".into()]);
        assert_eq!(d.placeholder("trigger_phrase"), None);
        d.trigger = Some("work".into());
        assert_eq!(d.placeholder("trigger_phrase").as_deref(), Some(" about work"));
        assert_eq!(d.placeholder("themes").as_deref(), Some("anxiety"));
        assert_eq!(d.placeholder("no_such_field"), None);
    }

    #[test]
    fn absent_fields_are_not_serialized() {
        let d = Details::base(0.0, &[]);
        let json = serde_json::to_value(&d).unwrap();
        assert!(json.get("trigger").is_none());
        assert!(json.get("intensity").is_some());
    }
}
