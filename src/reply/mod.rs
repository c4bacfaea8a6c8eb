//! # Seletor de Respostas — Máquina de Estágios Emocionais
//!
//! Dado o intent, os detalhes e o contexto do usuário, escolhe e formata a
//! resposta do turno.
//!
//! ## Algoritmo
//!
//! ```text
//! crise? ──sim──► mensagem fixa de crise (sem estágio, sem sorteio)
//!   │
//!   não
//!   ▼
//! pool do intent ──vazio──► fallback por tema (anxiety > depression > loneliness > grief)
//!   │
//!   ▼
//! filtro de estágio            validation  → marcadores de acolhimento
//!   (vazio → pool inteiro)     exploration → tem followup
//!                              coping      → tem técnicas (preferida primeiro)
//!   ▼
//! remove já usadas (esgotou → zera os fingerprints deste pool)
//!   ▼
//! sorteio uniforme → placeholders → técnica → followup → sugestão
//!   ▼
//! registra fingerprint, avança estágio
//! ```
//!
//! O RNG é injetado: produção usa um `StdRng` compartilhado, testes usam
//! `StdRng::seed_from_u64`.

pub mod catalog;

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::core::{
    fingerprint_text, render, Details, EmotionalStage, Intent, ResponseTemplate, UserContext,
};
use crate::crisis::{CRISIS_MESSAGE, CRISIS_THEME};

pub use catalog::ResponseCatalog;

/// Marcadores léxicos de acolhimento (estágio `validation`).
const VALIDATION_MARKERS: &[&str] = &[
    "sorry",
    "hear",
    "understand",
    "sounds",
    "must be",
    "not alone",
    "okay",
    "difficult",
    "tough",
    "hard",
];

pub const GENERIC_FALLBACK: &str =
    "I'm here to listen. Can you tell me more about what you're experiencing?";

/// Fallbacks por tema, em ordem de prioridade.
const THEME_FALLBACKS: &[(&str, &str)] = &[
    (
        "anxiety",
        "It sounds like you're feeling anxious. Would you like to try a calming breathing exercise together?",
    ),
    (
        "depression",
        "I'm sorry you're feeling down. I'm here to listen whenever you want to talk.",
    ),
    (
        "loneliness",
        "Feeling lonely is really hard. You're not alone right now, I'm here with you.",
    ),
    (
        "grief",
        "I'm so sorry for your loss. Would you like to tell me about them?",
    ),
];

/// Resposta de um turno.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reply {
    pub text: String,
    /// Fingerprint registrado; `None` para fallbacks fora do catálogo.
    pub fingerprint: Option<Uuid>,
    /// Estágio em que a resposta foi escolhida.
    pub stage: EmotionalStage,
    pub crisis: bool,
}

pub struct ResponseSelector {
    catalog: Arc<ResponseCatalog>,
}

impl ResponseSelector {
    pub fn new(catalog: Arc<ResponseCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ResponseCatalog {
        &self.catalog
    }

    /// Escolhe e formata a resposta, atualizando `used_responses` e o estágio.
    pub fn select<R: Rng + ?Sized>(
        &self,
        intent: Intent,
        details: &Details,
        ctx: &mut UserContext,
        rng: &mut R,
    ) -> Reply {
        if intent == Intent::Crisis || details.themes.iter().any(|t| t == CRISIS_THEME) {
            return crisis_reply(ctx);
        }

        let stage = ctx.emotional_stage;
        let pool = self.catalog.pool(intent);

        let reply = if pool.is_empty() {
            Reply {
                text: theme_fallback(&details.themes).to_string(),
                fingerprint: None,
                stage,
                crisis: false,
            }
        } else {
            self.from_pool(intent, pool, details, ctx, rng)
        };

        ctx.emotional_stage = stage.next();
        tracing::debug!(
            user_id = %ctx.user_id,
            intent = %intent,
            stage = stage.as_str(),
            next = ctx.emotional_stage.as_str(),
            "Resposta selecionada"
        );
        reply
    }

    fn from_pool<R: Rng + ?Sized>(
        &self,
        intent: Intent,
        pool: &[ResponseTemplate],
        details: &Details,
        ctx: &mut UserContext,
        rng: &mut R,
    ) -> Reply {
        let stage = ctx.emotional_stage;
        let preferred = ctx.preferences.preferred_technique.to_lowercase();

        let eligible: Vec<&ResponseTemplate> = {
            let fitting: Vec<&ResponseTemplate> = pool.iter().filter(|t| t.fits(details)).collect();
            if fitting.is_empty() {
                pool.iter().collect()
            } else {
                fitting
            }
        };

        let mut candidates = stage_filter(stage, &eligible, &preferred);
        if candidates.is_empty() {
            candidates = eligible.clone();
        }

        let mut unused: Vec<&ResponseTemplate> = candidates
            .iter()
            .copied()
            .filter(|t| !ctx.used_responses.contains(&t.fingerprint(intent)))
            .collect();
        if unused.is_empty() {
            tracing::debug!(intent = %intent, "Pool esgotado, liberando repetição");
            for t in pool {
                ctx.used_responses.remove(&t.fingerprint(intent));
            }
            unused = candidates;
        }

        let Some(chosen) = unused.choose(rng).copied() else {
            return Reply {
                text: GENERIC_FALLBACK.to_string(),
                fingerprint: None,
                stage,
                crisis: false,
            };
        };

        let text = compose(chosen, details, &preferred, rng);
        let fingerprint = chosen.fingerprint(intent);
        ctx.used_responses.insert(fingerprint);

        Reply {
            text,
            fingerprint: Some(fingerprint),
            stage,
            crisis: false,
        }
    }
}

/// Turno de crise: mensagem fixa, registrada como usada, estágio intocado.
pub fn crisis_reply(ctx: &mut UserContext) -> Reply {
    let fingerprint = fingerprint_text(Intent::Crisis, CRISIS_MESSAGE);
    ctx.used_responses.insert(fingerprint);
    Reply {
        text: CRISIS_MESSAGE.to_string(),
        fingerprint: Some(fingerprint),
        stage: ctx.emotional_stage,
        crisis: true,
    }
}

fn stage_filter<'a>(
    stage: EmotionalStage,
    pool: &[&'a ResponseTemplate],
    preferred: &str,
) -> Vec<&'a ResponseTemplate> {
    match stage {
        EmotionalStage::Validation => pool
            .iter()
            .copied()
            .filter(|t| {
                let text = t.message().to_lowercase();
                VALIDATION_MARKERS.iter().any(|m| text.contains(m))
            })
            .collect(),
        EmotionalStage::Exploration => pool
            .iter()
            .copied()
            .filter(|t| t.followup().is_some())
            .collect(),
        EmotionalStage::Coping => {
            let with_techniques: Vec<&ResponseTemplate> = pool
                .iter()
                .copied()
                .filter(|t| !t.techniques().is_empty())
                .collect();
            let matching: Vec<&ResponseTemplate> = with_techniques
                .iter()
                .copied()
                .filter(|t| t.techniques().iter().any(|x| x.to_lowercase().contains(preferred)))
                .collect();
            if matching.is_empty() {
                with_techniques
            } else {
                matching
            }
        }
    }
}

/// Mensagem formatada + linha de técnica + followup + sugestão.
fn compose<R: Rng + ?Sized>(
    template: &ResponseTemplate,
    details: &Details,
    preferred: &str,
    rng: &mut R,
) -> String {
    let mut text = render_or_raw(template.message(), details);

    let techniques = template.techniques();
    let matching: Vec<&String> = techniques
        .iter()
        .filter(|t| t.to_lowercase().contains(preferred))
        .collect();
    let technique = if matching.is_empty() {
        techniques.choose(rng)
    } else {
        matching.choose(rng).copied()
    };
    if let Some(technique) = technique {
        text.push_str(&format!("\n\nSomething that might help: {}.", technique));
    }

    if let Some(followup) = template.followup() {
        text.push_str("\n\n");
        text.push_str(&render_or_raw(followup, details));
    }

    if let Some(suggestion) = &details.suggestion {
        text.push_str("\n\n");
        text.push_str(suggestion);
    }
    text
}

fn render_or_raw(template: &str, details: &Details) -> String {
    render(template, details).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Template malformado, usando texto cru");
        template.to_string()
    })
}

fn theme_fallback(themes: &[String]) -> &'static str {
    THEME_FALLBACKS
        .iter()
        .find(|(theme, _)| themes.iter().any(|t| t == theme))
        .map(|(_, text)| *text)
        .unwrap_or(GENERIC_FALLBACK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashSet};

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::nlu::patterns::compile_rules;

    fn plain(text: &str) -> ResponseTemplate {
        ResponseTemplate::PlainText(text.to_string())
    }

    fn guided(message: &str, followup: Option<&str>, techniques: &[&str]) -> ResponseTemplate {
        ResponseTemplate::Templated {
            message: message.to_string(),
            followup: followup.map(str::to_string),
            techniques: techniques.iter().map(|t| t.to_string()).collect(),
            resources: BTreeMap::new(),
        }
    }

    fn selector(intent: Intent, pool: Vec<ResponseTemplate>) -> ResponseSelector {
        let mut pools = BTreeMap::new();
        pools.insert(intent, pool);
        ResponseSelector::new(Arc::new(ResponseCatalog::from_pools(pools)))
    }

    fn full_selector() -> ResponseSelector {
        ResponseSelector::new(Arc::new(ResponseCatalog::build(&compile_rules())))
    }

    #[test]
    fn crisis_bypasses_pools_and_stage() {
        let s = full_selector();
        let mut ctx = UserContext::new("u");
        ctx.emotional_stage = EmotionalStage::Exploration;
        let r = s.select(Intent::Crisis, &Details::default(), &mut ctx, &mut StdRng::seed_from_u64(1));
        assert!(r.crisis);
        assert_eq!(r.text, CRISIS_MESSAGE);
        assert_eq!(ctx.emotional_stage, EmotionalStage::Exploration);
        assert!(ctx.used_responses.contains(&r.fingerprint.unwrap()));

        let d = Details::base(0.0, &["crisis".into()]);
        let r = s.select(Intent::Sleep, &d, &mut ctx, &mut StdRng::seed_from_u64(1));
        assert!(r.crisis);
    }

    #[test]
    fn stages_advance_and_filter_candidates() {
        let s = selector(
            Intent::Stress,
            vec![
                plain("I'm sorry, that sounds hard."),
                guided("Tell me more.", Some("What happened?"), &[]),
                guided("Try this.", None, &["box breathing"]),
            ],
        );
        let mut ctx = UserContext::new("u");
        let mut rng = StdRng::seed_from_u64(7);

        let r1 = s.select(Intent::Stress, &Details::default(), &mut ctx, &mut rng);
        assert_eq!(r1.stage, EmotionalStage::Validation);
        assert_eq!(r1.text, "I'm sorry, that sounds hard.");

        let r2 = s.select(Intent::Stress, &Details::default(), &mut ctx, &mut rng);
        assert_eq!(r2.stage, EmotionalStage::Exploration);
        assert_eq!(r2.text, "Tell me more.\n\nWhat happened?");

        let r3 = s.select(Intent::Stress, &Details::default(), &mut ctx, &mut rng);
        assert_eq!(r3.stage, EmotionalStage::Coping);
        assert_eq!(r3.text, "Try this.\n\nSomething that might help: box breathing.");
        assert_eq!(ctx.emotional_stage, EmotionalStage::Coping);
    }

    #[test]
    fn empty_stage_filter_uses_whole_pool() {
        let s = selector(Intent::Greeting, vec![plain("Hello!")]);
        let mut ctx = UserContext::new("u");
        let r = s.select(Intent::Greeting, &Details::default(), &mut ctx, &mut StdRng::seed_from_u64(3));
        assert_eq!(r.text, "Hello!");
        assert_eq!(ctx.emotional_stage, EmotionalStage::Exploration);
    }

    #[test]
    fn no_repeats_until_pool_is_exhausted() {
        let pool: Vec<ResponseTemplate> = (0..4).map(|i| plain(&format!("Reply {}", i))).collect();
        let s = selector(Intent::General, pool);
        let mut ctx = UserContext::new("u");
        let mut rng = StdRng::seed_from_u64(42);

        let mut seen = HashSet::new();
        for _ in 0..4 {
            let r = s.select(Intent::General, &Details::default(), &mut ctx, &mut rng);
            assert!(seen.insert(r.text), "repeated before exhaustion");
        }
        // esgotado: a quinta escolha reutiliza
        let r = s.select(Intent::General, &Details::default(), &mut ctx, &mut rng);
        assert!(seen.contains(&r.text));
        assert_eq!(ctx.used_responses.len(), 1);
    }

    #[test]
    fn coping_prefers_the_preferred_technique() {
        let s = selector(
            Intent::Anxiety,
            vec![
                guided("Option A.", None, &["deep breathing"]),
                guided("Option B.", None, &["journaling"]),
            ],
        );
        for seed in 0..5 {
            let mut ctx = UserContext::new("u");
            ctx.emotional_stage = EmotionalStage::Coping;
            ctx.preferences.preferred_technique = "journaling".into();
            let r = s.select(Intent::Anxiety, &Details::default(), &mut ctx, &mut StdRng::seed_from_u64(seed));
            assert!(r.text.starts_with("Option B."));
        }
    }

    #[test]
    fn placeholders_and_suggestion_are_rendered() {
        let s = selector(
            Intent::Anxiety,
            vec![plain("I hear you're feeling {intensity_words} anxious{trigger_phrase}.")],
        );
        let mut details = Details::base(2.0, &["anxiety".into()]);
        details.intensity_words = Some("very".into());
        details.trigger = Some("work".into());
        details.suggestion = Some("Breathing helped before.".into());
        let mut ctx = UserContext::new("u");
        let r = s.select(Intent::Anxiety, &details, &mut ctx, &mut StdRng::seed_from_u64(0));
        assert_eq!(
            r.text,
            "I hear you're feeling very anxious about work.\n\nBreathing helped before."
        );
    }

    #[test]
    fn malformed_template_falls_back_to_raw_text() {
        let s = selector(Intent::Anger, vec![plain("That sounds {hard")]);
        let r = s.select(Intent::Anger, &Details::default(), &mut UserContext::new("u"), &mut StdRng::seed_from_u64(0));
        assert_eq!(r.text, "That sounds {hard");
    }

    #[test]
    fn personalised_templates_need_their_fields() {
        let s = selector(
            Intent::Grief,
            vec![plain("I'm so sorry about your {loss}."), plain("I'm so sorry for your loss.")],
        );
        for seed in 0..5 {
            let r = s.select(Intent::Grief, &Details::default(), &mut UserContext::new("u"), &mut StdRng::seed_from_u64(seed));
            assert_eq!(r.text, "I'm so sorry for your loss.");
        }
    }

    #[test]
    fn missing_pool_uses_theme_fallbacks() {
        let s = selector(Intent::General, vec![]);
        let mut ctx = UserContext::new("u");
        let mut rng = StdRng::seed_from_u64(0);
        let d = Details::base(0.0, &["grief".into(), "loneliness".into()]);
        let r = s.select(Intent::Unknown, &d, &mut ctx, &mut rng);
        assert!(r.text.starts_with("Feeling lonely"));
        assert!(r.fingerprint.is_none());

        let r = s.select(Intent::Unknown, &Details::default(), &mut ctx, &mut rng);
        assert_eq!(r.text, GENERIC_FALLBACK);
    }
}
