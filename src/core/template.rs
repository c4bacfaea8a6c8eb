//! # Templates de Resposta
//!
//! Uma resposta do catálogo é **texto simples** ou um **registro estruturado**:
//!
//! ```json
//! "Hello! How are you feeling today?"
//! { "message": "I hear you're feeling {intensity_words} anxious{trigger_phrase}.",
//!   "followup": "What has been triggering this?",
//!   "techniques": ["deep breathing", "grounding exercises"] }
//! ```
//!
//! O mesmo enum desserializa as duas formas (`#[serde(untagged)]`).
//!
//! ## Placeholders
//!
//! `{nome}` é resolvido via [`Details::placeholder()`]. Nome desconhecido ou
//! campo ausente vira string vazia; chaves desbalanceadas são um
//! [`TemplateError`] e o chamador decide o fallback.
//!
//! Campos nominais (`{loss}`, `{work_issue}`, ...) não têm forma vazia
//! aceitável na frase: um template que os usa só é elegível quando o campo
//! foi extraído ([`ResponseTemplate::fits()`]).

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Details, Intent};

/// Namespace dos fingerprints de resposta (UUID v5).
const FINGERPRINT_NAMESPACE: Uuid = Uuid::NAMESPACE_OID;

/// Placeholders sem os quais a frase não se sustenta.
const REQUIRED_FIELDS: &[&str] = &[
    "trigger",
    "relationship",
    "loss",
    "work_issue",
    "sleep_issue",
    "anger_target",
    "self_talk",
];

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\s*([a-z_]+)\s*\}").unwrap());
static MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+([.,!?;:])").unwrap());

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseTemplate {
    PlainText(String),
    Templated {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        followup: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        techniques: Vec<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        resources: BTreeMap<String, String>,
    },
}

impl ResponseTemplate {
    pub fn message(&self) -> &str {
        match self {
            ResponseTemplate::PlainText(text) => text,
            ResponseTemplate::Templated { message, .. } => message,
        }
    }

    pub fn followup(&self) -> Option<&str> {
        match self {
            ResponseTemplate::PlainText(_) => None,
            ResponseTemplate::Templated { followup, .. } => followup.as_deref(),
        }
    }

    pub fn techniques(&self) -> &[String] {
        match self {
            ResponseTemplate::PlainText(_) => &[],
            ResponseTemplate::Templated { techniques, .. } => techniques,
        }
    }

    /// `true` se todos os campos nominais usados estão presentes nos detalhes.
    pub fn fits(&self, details: &Details) -> bool {
        let texts = std::iter::once(self.message()).chain(self.followup());
        texts
            .flat_map(|t| PLACEHOLDER.captures_iter(t))
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|name| REQUIRED_FIELDS.contains(name))
            .all(|name| details.placeholder(name).is_some())
    }

    /// Identidade de conteúdo estável entre reinícios (UUID v5 de `intent:mensagem`).
    pub fn fingerprint(&self, intent: Intent) -> Uuid {
        fingerprint_text(intent, self.message())
    }
}

/// Fingerprint para textos fora do catálogo (ex: mensagem de crise).
pub fn fingerprint_text(intent: Intent, text: &str) -> Uuid {
    Uuid::new_v5(
        &FINGERPRINT_NAMESPACE,
        format!("{}:{}", intent.as_str(), text).as_bytes(),
    )
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("placeholder aberto e não fechado na posição {0}")]
    Unclosed(usize),
    #[error("'}}' sem '{{' correspondente na posição {0}")]
    Unopened(usize),
}

/// Substitui `{placeholders}` com os detalhes extraídos.
pub fn render(template: &str, details: &Details) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for (_, n) in chars.by_ref() {
                    match n {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => return Err(TemplateError::Unclosed(pos)),
                        _ => name.push(n),
                    }
                }
                if !closed {
                    return Err(TemplateError::Unclosed(pos));
                }
                if let Some(value) = details.placeholder(name.trim()) {
                    out.push_str(&value);
                }
            }
            '}' => return Err(TemplateError::Unopened(pos)),
            _ => out.push(c),
        }
    }

    let collapsed = MULTI_SPACE.replace_all(&out, " ");
    let tidy = SPACE_BEFORE_PUNCT.replace_all(&collapsed, "$1");
    Ok(tidy.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anxious_details() -> Details {
        let mut d = Details::base(2.0, &["anxiety".into()]);
        d.intensity_words = Some("very".into());
        d.trigger = Some("work".into());
        d
    }

    #[test]
    fn renders_known_placeholders() {
        let text = render(
            "I hear you're feeling {intensity_words} anxious{trigger_phrase}.",
            &anxious_details(),
        )
        .unwrap();
        assert_eq!(text, "I hear you're feeling very anxious about work.");
    }

    #[test]
    fn missing_placeholders_render_empty_and_spacing_is_tidied() {
        let text = render(
            "I hear you're feeling {intensity_words} anxious{trigger_phrase}.",
            &Details::default(),
        )
        .unwrap();
        assert_eq!(text, "I hear you're feeling anxious.");
        assert_eq!(render("Hi {nobody}!", &Details::default()).unwrap(), "Hi!");
    }

    #[test]
    fn unbalanced_braces_are_errors() {
        assert_eq!(
            render("broken {trigger", &Details::default()),
            Err(TemplateError::Unclosed(7))
        );
        assert_eq!(
            render("broken } here", &Details::default()),
            Err(TemplateError::Unopened(7))
        );
    }

    #[test]
    fn untagged_serde_accepts_both_shapes() {
        let plain: ResponseTemplate = serde_json::from_str("\"Hello!\"").unwrap();
        assert_eq!(plain.message(), "Hello!");
        assert!(plain.techniques().is_empty());

        let rich: ResponseTemplate = serde_json::from_str(
            r#"{"message": "m", "followup": "f", "techniques": ["journaling"]}"#,
        )
        .unwrap();
        assert_eq!(rich.followup(), Some("f"));
        assert_eq!(rich.techniques(), ["journaling".to_string()]);
    }

    #[test]
    fn nominal_placeholders_gate_eligibility() {
        let t = ResponseTemplate::PlainText("I'm so sorry about your {loss}.".into());
        assert!(!t.fits(&Details::default()));
        let mut d = Details::default();
        d.loss = Some("dog".into());
        assert!(t.fits(&d));
        // formas derivadas podem sumir sem quebrar a frase
        let soft = ResponseTemplate::PlainText("Feeling anxious{trigger_phrase}.".into());
        assert!(soft.fits(&Details::default()));
    }

    #[test]
    fn fingerprint_depends_on_intent_and_text() {
        let t = ResponseTemplate::PlainText("same".into());
        assert_eq!(t.fingerprint(Intent::Greeting), t.fingerprint(Intent::Greeting));
        assert_ne!(t.fingerprint(Intent::Greeting), t.fingerprint(Intent::General));
    }
}
