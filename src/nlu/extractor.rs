//! # Extrator de Detalhes — Campos Específicos por Intent
//!
//! Depois que o intent é conhecido, o [`DetailExtractor`] roda um pequeno
//! conjunto de regexes secundárias para preencher os campos de [`Details`]
//! que os templates personalizados usam.
//!
//! | Intent | Campos extraídos |
//! |--------|------------------|
//! | todos os emocionais | `intensity_words`, `timeframe`, `trigger` |
//! | relationship, family | `relationship` |
//! | grief | `loss` |
//! | work_stress | `work_issue` |
//! | sleep | `sleep_issue` |
//! | anger | `anger_target` |
//! | self_esteem | `self_talk` |
//!
//! Intents não-emocionais (greeting, farewell, ...) recebem só a base:
//! intensidade e temas do oráculo. Campo sem match fica `None`.
//!
//! O extrator também reconhece quando o usuário diz que uma técnica
//! funciona ("breathing helps", "I like journaling"), alimentando
//! `preferences.preferred_technique`.

use regex::Regex;

use crate::core::{Details, Intent};

use super::themes::INTENSITY_MODIFIERS;

/// Técnicas reconhecidas e a forma canônica gravada nas preferências.
const TECHNIQUES: &[(&str, &str)] = &[
    ("breathing", "breathing"),
    ("breathe", "breathing"),
    ("meditation", "meditation"),
    ("meditating", "meditation"),
    ("meditate", "meditation"),
    ("journaling", "journaling"),
    ("journal", "journaling"),
    ("writing", "journaling"),
    ("grounding", "grounding"),
    ("mindfulness", "mindfulness"),
    ("exercise", "exercise"),
    ("exercising", "exercise"),
    ("running", "exercise"),
    ("walking", "walking"),
    ("walks", "walking"),
    ("music", "music"),
    ("relaxation", "relaxation"),
    ("visualization", "visualization"),
];

pub struct DetailExtractor {
    modifiers_re: Regex,
    timeframe_re: Regex,
    trigger_re: Regex,
    relationship_re: Regex,
    loss_re: Regex,
    work_re: Regex,
    sleep_re: Regex,
    anger_target_re: Regex,
    self_talk_re: Regex,
    technique_re: Regex,
    endorsement_re: Regex,
}

impl DetailExtractor {
    pub fn new() -> Self {
        let modifiers: Vec<String> = INTENSITY_MODIFIERS
            .iter()
            .map(|(m, _)| regex::escape(m).replace(' ', r"\s+"))
            .collect();
        let techniques: Vec<&str> = TECHNIQUES.iter().map(|(t, _)| *t).collect();

        Self {
            modifiers_re: Regex::new(&format!(r"(?i)\b(?:{})\b", modifiers.join("|"))).unwrap(),
            timeframe_re: Regex::new(
                r"(?i)\b(today|tonight|lately|recently|this week|this month|for (?:a )?while|all the time|for (?:days|weeks|months|years))\b",
            )
            .unwrap(),
            // "about work lately" → "work"; o gatilho termina em marcador de tempo ou pontuação
            trigger_re: Regex::new(
                r"(?i)\b(?:about|because of|due to|over)\s+((?:my\s+|the\s+)?[a-z][a-z'\s]*?)\s*(?:\b(?:lately|recently|today|tonight|this week|for a while|all the time|again)\b|[.,!?;]|$)",
            )
            .unwrap(),
            relationship_re: Regex::new(
                r"(?i)\bmy\s+(boyfriend|girlfriend|partner|husband|wife|ex|fiance|fiancee|mom|mother|dad|father|parents|brother|sister|son|daughter|family|best friend|friend)\b",
            )
            .unwrap(),
            loss_re: Regex::new(
                r"(?i)\b(?:lost|losing|death of|miss)\s+my\s+((?:best\s+|little\s+|older\s+|younger\s+)?[a-z]+)|\bmy\s+([a-z]+)\s+(?:passed away|died)\b",
            )
            .unwrap(),
            work_re: Regex::new(
                r"(?i)\b(boss|manager|deadlines?|workload|coworkers?|colleagues?|overtime|got fired|laid off|promotion|meetings?)\b",
            )
            .unwrap(),
            sleep_re: Regex::new(
                r"(?i)\b(can'?t sleep|insomnia|nightmares|trouble sleeping|trouble falling asleep|waking up|awake all night|sleeping too much)\b",
            )
            .unwrap(),
            anger_target_re: Regex::new(
                r"(?i)\b(?:angry|mad|furious|pissed off|irritated|frustrated)\s+(?:at|with)\s+((?:my\s+)?[a-z]+)",
            )
            .unwrap(),
            self_talk_re: Regex::new(
                r"(?i)\b(i'?m\s+(?:a failure|worthless|useless|stupid|ugly|not good enough)|hate myself|not good enough)\b",
            )
            .unwrap(),
            technique_re: Regex::new(&format!(r"(?i)\b({})\b", techniques.join("|"))).unwrap(),
            endorsement_re: Regex::new(
                r"(?i)\b(?:helps?|helped|helping|works?|worked|is helpful|calms? me|i (?:really )?(?:like|love|enjoy|prefer))\b",
            )
            .unwrap(),
        }
    }

    /// Monta os detalhes de uma mensagem já classificada.
    pub fn extract(&self, intent: Intent, text: &str, intensity: f32, themes: &[String]) -> Details {
        let mut details = Details::base(intensity, themes);
        if !intent.is_emotional() {
            return details;
        }

        details.intensity_words = self.intensity_words(text);
        details.timeframe = first_capture(&self.timeframe_re, text).map(|t| t.to_lowercase());
        details.trigger = first_capture(&self.trigger_re, text)
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());

        match intent {
            Intent::Relationship | Intent::Family => {
                details.relationship = first_capture(&self.relationship_re, text).map(|r| r.to_lowercase());
            }
            Intent::Grief => details.loss = first_capture(&self.loss_re, text).map(|l| l.to_lowercase()),
            Intent::WorkStress => {
                details.work_issue = first_capture(&self.work_re, text).map(|w| w.to_lowercase());
            }
            Intent::Sleep => {
                details.sleep_issue = first_capture(&self.sleep_re, text).map(|s| s.to_lowercase());
            }
            Intent::Anger => {
                details.anger_target = first_capture(&self.anger_target_re, text).map(|a| a.to_lowercase());
            }
            Intent::SelfEsteem => {
                details.self_talk = first_capture(&self.self_talk_re, text).map(|s| s.to_lowercase());
            }
            _ => {}
        }
        details
    }

    /// Qualificadores na ordem em que aparecem ("really so").
    fn intensity_words(&self, text: &str) -> Option<String> {
        let words: Vec<String> = self
            .modifiers_re
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect();
        (!words.is_empty()).then(|| words.join(" "))
    }

    /// Técnica que o usuário diz funcionar, na forma canônica.
    pub fn preferred_technique(&self, text: &str) -> Option<String> {
        if !self.endorsement_re.is_match(text) {
            return None;
        }
        let found = first_capture(&self.technique_re, text)?.to_lowercase();
        TECHNIQUES
            .iter()
            .find(|(alias, _)| *alias == found)
            .map(|(_, canonical)| canonical.to_string())
    }
}

impl Default for DetailExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Primeiro grupo de captura não-vazio do primeiro match.
fn first_capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)?
        .iter()
        .skip(1)
        .flatten()
        .map(|m| m.as_str())
        .find(|s| !s.is_empty())
}
