//! # Tabelas de Padrões — Primeira Camada de Classificação
//!
//! Cada [`PatternRule`] liga um [`Intent`] a uma lista ordenada de regexes
//! literais e ao pool de respostas embutido daquele intent.
//!
//! ## Prioridade
//!
//! A ordem de declaração em [`RULES`] **é** a prioridade: a primeira regra
//! com algum padrão casando vence. Crise vem primeiro; catch-alls como
//! greeting e general vêm por último, então "hi, I feel anxious" é ansiedade.
//!
//! ```text
//! crisis > trauma > grief > depression > anxiety > work_stress > stress
//!        > loneliness > anger > relationship > family > self_esteem > sleep
//!        > motivation > self_care > gratitude > farewell > greeting > general
//! ```
//!
//! `Unknown` não tem regra: é o fallback terminal do classificador.

use rayon::prelude::*;
use regex::Regex;

use crate::core::{Intent, ResponseTemplate};

/// Resposta embutida, antes da conversão para [`ResponseTemplate`].
pub enum Seed {
    Plain(&'static str),
    Guided {
        message: &'static str,
        followup: Option<&'static str>,
        techniques: &'static [&'static str],
    },
}

pub struct RuleDef {
    pub intent: Intent,
    pub patterns: &'static [&'static str],
    pub replies: &'static [Seed],
}

/// Regra compilada, imutável após a inicialização.
#[derive(Debug)]
pub struct PatternRule {
    pub intent: Intent,
    pub patterns: Vec<Regex>,
    pub responses: Vec<ResponseTemplate>,
}

impl PatternRule {
    /// Primeiro padrão que casa com o texto.
    pub fn first_match(&self, text: &str) -> Option<&Regex> {
        self.patterns.iter().find(|re| re.is_match(text))
    }
}

use Seed::{Guided, Plain};

pub const RULES: &[RuleDef] = &[
    RuleDef {
        intent: Intent::Crisis,
        patterns: &[
            r"suicid(?:e|al)",
            r"\bkill(?:ing)?\s*my\s*self\b",
            r"\bwant(?:s|ed)?\s+to\s+die\b",
            r"\bend\s+(?:it\s+all|my\s+life)\b",
            r"\bcan'?t\s+go\s+on\b",
        ],
        replies: &[],
    },
    RuleDef {
        intent: Intent::Trauma,
        patterns: &[
            r"\b(?:trauma|traumatic|traumatized)\b",
            r"\bflashbacks?\b",
            r"\bptsd\b",
            r"\b(?:abused|assaulted|molested)\b",
        ],
        replies: &[
            Plain("I'm so sorry you went through that. What happened was not your fault."),
            Plain("Thank you for trusting me with something so painful. Your reactions make sense after what you experienced."),
            Guided {
                message: "Traumatic memories can feel like they're happening all over again.",
                followup: Some("Would you like to share what tends to bring these memories back?"),
                techniques: &[],
            },
            Guided {
                message: "When a flashback hits, bringing your attention to the present can help.",
                followup: None,
                techniques: &["grounding (name 5 things you can see)", "slow breathing", "holding something cold"],
            },
        ],
    },
    RuleDef {
        intent: Intent::Grief,
        patterns: &[
            r"\bpassed\s+away\b",
            r"\b(?:died|death\s+of)\b",
            r"\blost\s+my\s+\w+",
            r"\b(?:grieving|grief|mourning|funeral)\b",
        ],
        replies: &[
            Plain("I'm so sorry for your loss. Grief can be incredibly painful."),
            Plain("Losing someone is one of the hardest things we go through. I understand it can feel overwhelming."),
            Guided {
                message: "Grief doesn't follow a schedule, and there's no right way to feel.",
                followup: Some("Would you like to tell me about them?"),
                techniques: &[],
            },
            Guided {
                message: "Honoring your loss in small ways can help you carry it.",
                followup: None,
                techniques: &["journaling a letter to them", "sharing memories with someone you trust", "gentle walking outdoors"],
            },
        ],
    },
    RuleDef {
        intent: Intent::Depression,
        patterns: &[
            r"\b(?:depressed|depression|hopeless)\b",
            r"\bfeel(?:ing)?\s+(?:so\s+|very\s+|really\s+)?(?:sad|empty|numb|down|worthless)\b",
            r"\bnothing\s+matters\b",
        ],
        replies: &[
            Plain("I'm sorry you're feeling this way. Depression can make everything feel so much harder."),
            Plain("It sounds like you're carrying a lot right now. You're not alone in this."),
            Guided {
                message: "Thank you for telling me how you feel.",
                followup: Some("How long have you been feeling like this?"),
                techniques: &[],
            },
            Guided {
                message: "Small steps can make a difference when everything feels heavy.",
                followup: Some("Is there one small thing you could do for yourself today?"),
                techniques: &["a short walking break", "listening to music you love", "reaching out to a friend"],
            },
        ],
    },
    RuleDef {
        intent: Intent::Anxiety,
        patterns: &[
            r"(feel(?:ing)?|am)\s+(very|really|so|extremely)?\s*(anxious|nervous|worried)",
            r"\b(?:anxiety|panic\s+attacks?|panicking)\b",
            r"\bworried\s+about\b",
        ],
        replies: &[
            Plain("I hear that you're feeling anxious. That can be really difficult to deal with."),
            Plain("It's understandable to feel anxious. Let's work through this together."),
            Guided {
                message: "Anxiety can feel overwhelming.",
                followup: Some("What do you notice in your body when the anxiety shows up?"),
                techniques: &[],
            },
            Guided {
                message: "When anxiety rises, slowing the body down can calm the mind.",
                followup: None,
                techniques: &["deep breathing (4-7-8)", "grounding exercises", "progressive muscle relaxation"],
            },
        ],
    },
    RuleDef {
        intent: Intent::WorkStress,
        patterns: &[
            r"\bmy\s+(?:boss|job|manager|coworkers?|colleagues?)\b",
            r"\bat\s+work\b",
            r"\b(?:workload|deadlines?|overtime)\b",
            r"\b(?:got\s+fired|laid\s+off)\b",
        ],
        replies: &[
            Plain("Work pressure can be exhausting. I'm sorry it's weighing on you."),
            Guided {
                message: "It sounds like work has been really demanding.",
                followup: Some("What part of work feels the hardest right now?"),
                techniques: &[],
            },
            Guided {
                message: "Protecting a bit of space from work can help you recharge.",
                followup: None,
                techniques: &["short breathing breaks between tasks", "writing a prioritized to-do list", "a walking break at lunch"],
            },
        ],
    },
    RuleDef {
        intent: Intent::Stress,
        patterns: &[
            r"\b(?:stressed|stressful|overwhelmed|burn(?:ed|t)\s+out)\b",
            r"\bunder\s+(?:a\s+lot\s+of\s+)?pressure\b",
            r"\btoo\s+much\s+(?:going\s+on|to\s+handle)\b",
        ],
        replies: &[
            Plain("It sounds like you're under a lot of pressure. That must be difficult."),
            Guided {
                message: "Stress can pile up quickly.",
                followup: Some("What's been taking up most of your energy lately?"),
                techniques: &[],
            },
            Guided {
                message: "Let's find a way to release some of that tension.",
                followup: None,
                techniques: &["box breathing", "a short mindfulness pause", "light exercise"],
            },
        ],
    },
    RuleDef {
        intent: Intent::Loneliness,
        patterns: &[
            r"\b(?:lonely|loneliness|isolated)\b",
            r"\b(?:all\s+)?alone\b",
            r"\bno\s+(?:friends|one\s+to\s+talk\s+to)\b",
        ],
        replies: &[
            Plain("I'm sorry you're feeling lonely. You're not alone in this conversation."),
            Plain("Feeling isolated is really hard. I hear you."),
            Guided {
                message: "Loneliness can show up even when people are around.",
                followup: Some("When do you feel it the most?"),
                techniques: &[],
            },
            Guided {
                message: "Small moments of connection can help.",
                followup: None,
                techniques: &["sending a message to an old friend", "joining a group activity", "journaling your thoughts"],
            },
        ],
    },
    RuleDef {
        intent: Intent::Anger,
        patterns: &[
            r"\b(?:angry|furious|enraged|irritated)\b",
            r"\bso\s+mad\b",
            r"\bpissed\s+off\b",
        ],
        replies: &[
            Plain("It sounds like you're really frustrated. Those feelings are valid."),
            Guided {
                message: "Anger often tells us something important.",
                followup: Some("What happened that made you feel this way?"),
                techniques: &[],
            },
            Guided {
                message: "Let's give that energy somewhere safe to go.",
                followup: None,
                techniques: &["counting breathing to ten", "vigorous exercise", "writing it out in a journal"],
            },
        ],
    },
    RuleDef {
        intent: Intent::Relationship,
        patterns: &[
            r"\bmy\s+(?:boyfriend|girlfriend|partner|husband|wife|ex)\b",
            r"\b(?:broke\s+up|breakup|divorce|cheated)\b",
        ],
        replies: &[
            Plain("Relationship troubles can hurt so much. I'm sorry you're going through this."),
            Guided {
                message: "Relationships can bring up a lot of difficult feelings.",
                followup: Some("How are things between you two right now?"),
                techniques: &[],
            },
            Guided {
                message: "Taking care of yourself matters while things are uncertain.",
                followup: None,
                techniques: &["journaling what you need", "talking with a trusted friend", "mindfulness before difficult conversations"],
            },
        ],
    },
    RuleDef {
        intent: Intent::Family,
        patterns: &[
            r"\bmy\s+(?:mom|mother|dad|father|parents|family|brother|sister|son|daughter)\b",
            r"\bfamily\s+(?:problems|issues|drama)\b",
        ],
        replies: &[
            Plain("Family situations can be really tough. I understand why this is weighing on you."),
            Guided {
                message: "Family can be complicated.",
                followup: Some("What's been happening at home?"),
                techniques: &[],
            },
            Guided {
                message: "Some breathing room can make family tension easier to handle.",
                followup: None,
                techniques: &["taking a walking break", "setting one small boundary", "breathing before responding"],
            },
        ],
    },
    RuleDef {
        intent: Intent::SelfEsteem,
        patterns: &[
            r"\bnot\s+good\s+enough\b",
            r"\bhate\s+myself\b",
            r"\bi'?m\s+(?:a\s+failure|worthless|useless|stupid|ugly)\b",
            r"\bno\s+(?:self[-\s]?)?confidence\b",
        ],
        replies: &[
            Plain("I'm sorry you're being so hard on yourself. You deserve kindness, including from yourself."),
            Guided {
                message: "That inner critic can be really loud.",
                followup: Some("Where do you think that voice comes from?"),
                techniques: &[],
            },
            Guided {
                message: "Let's practice treating yourself like you would a friend.",
                followup: None,
                techniques: &["journaling three things you did well", "self-compassion meditation", "challenging one negative thought"],
            },
        ],
    },
    RuleDef {
        intent: Intent::Sleep,
        patterns: &[
            r"\bcan'?t\s+sleep\b",
            r"\b(?:insomnia|nightmares)\b",
            r"\btrouble\s+(?:sleeping|falling\s+asleep)\b",
            r"\bawake\s+all\s+night\b",
        ],
        replies: &[
            Plain("I'm sorry you're struggling with sleep. It's hard when rest won't come."),
            Guided {
                message: "Sleep problems can affect everything else.",
                followup: Some("What usually keeps you up at night?"),
                techniques: &[],
            },
            Guided {
                message: "A calmer wind-down routine may help your body settle.",
                followup: None,
                techniques: &["slow breathing in bed", "a body-scan meditation", "putting screens away an hour before bed"],
            },
        ],
    },
    RuleDef {
        intent: Intent::Motivation,
        patterns: &[
            r"\b(?:no|zero|lost\s+my)\s+motivation\b",
            r"\bunmotivated\b",
            r"\bprocrastinat\w*\b",
            r"\bcan'?t\s+get\s+(?:started|anything\s+done)\b",
        ],
        replies: &[
            Plain("It's okay to feel stuck sometimes. Low motivation is really common."),
            Guided {
                message: "Motivation comes and goes.",
                followup: Some("What would you like to be able to do if you had the energy?"),
                techniques: &[],
            },
            Guided {
                message: "Starting tiny is often easier than starting big.",
                followup: None,
                techniques: &["the five-minute rule", "a short walking break to reset", "music that energizes you"],
            },
        ],
    },
    RuleDef {
        intent: Intent::SelfCare,
        patterns: &[
            r"\bself[-\s]?care\b",
            r"\btake\s+(?:better\s+)?care\s+of\s+myself\b",
            r"\bhow\s+(?:can|do)\s+i\s+(?:relax|calm\s+down|unwind)\b",
        ],
        replies: &[
            Guided {
                message: "Taking care of yourself is important.",
                followup: Some("What usually helps you feel recharged?"),
                techniques: &[],
            },
            Guided {
                message: "Here are a few ways to care for yourself today.",
                followup: None,
                techniques: &["a mindfulness meditation", "a warm bath or shower", "a walking break outside", "relaxation with calming music"],
            },
        ],
    },
    RuleDef {
        intent: Intent::Gratitude,
        patterns: &[
            r"\bthank(?:s|\s+you)\b",
            r"\b(?:grateful|appreciate\s+(?:it|you|this))\b",
        ],
        replies: &[
            Plain("You're welcome! I'm glad I could help."),
            Plain("Thank you for sharing with me. I'm here whenever you need to talk."),
        ],
    },
    RuleDef {
        intent: Intent::Farewell,
        patterns: &[
            r"\b(?:bye|goodbye|farewell)\b",
            r"\bsee\s+you\b",
            r"\b(?:good\s+night|talk\s+(?:to\s+you\s+)?later|take\s+care)\b",
        ],
        replies: &[
            Plain("Take care of yourself. I'm here whenever you need to talk."),
            Plain("Goodbye for now. Remember to be gentle with yourself."),
        ],
    },
    RuleDef {
        intent: Intent::Greeting,
        patterns: &[
            r"\b(?:hi|hello|hey|howdy|greetings)\b",
            r"\bgood\s+(?:morning|afternoon|evening)\b",
        ],
        replies: &[
            Plain("Hello! How are you feeling today?"),
            Plain("Hi there! I'm here to listen. What's on your mind?"),
            Guided {
                message: "Hey! It's good to hear from you.",
                followup: Some("How has your day been so far?"),
                techniques: &[],
            },
        ],
    },
    RuleDef {
        intent: Intent::General,
        patterns: &[
            r"\bhow\s+are\s+you\b",
            r"\bwho\s+are\s+you\b",
            r"\bwhat\s+(?:can|do)\s+you\s+do\b",
        ],
        replies: &[
            Plain("I'm here to listen and support you. How are you feeling?"),
            Guided {
                message: "I'm a supportive listener you can talk to about how you feel.",
                followup: Some("Is there something on your mind today?"),
                techniques: &[],
            },
        ],
    },
];

impl Seed {
    fn to_template(&self) -> ResponseTemplate {
        match self {
            Plain(text) => ResponseTemplate::PlainText(text.to_string()),
            Guided {
                message,
                followup,
                techniques,
            } => ResponseTemplate::Templated {
                message: message.to_string(),
                followup: followup.map(str::to_string),
                techniques: techniques.iter().map(|t| t.to_string()).collect(),
                resources: Default::default(),
            },
        }
    }
}

fn compile(def: &RuleDef) -> PatternRule {
    let patterns = def
        .patterns
        .iter()
        .filter_map(|p| match Regex::new(&format!("(?i){}", p)) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!(intent = %def.intent, pattern = %p, error = %e, "Padrão inválido ignorado");
                None
            }
        })
        .collect();
    PatternRule {
        intent: def.intent,
        patterns,
        responses: def.replies.iter().map(Seed::to_template).collect(),
    }
}

/// Compila todas as regras em paralelo, preservando a ordem de prioridade.
pub fn compile_rules() -> Vec<PatternRule> {
    let rules: Vec<PatternRule> = RULES.par_iter().map(compile).collect();
    let patterns: usize = rules.iter().map(|r| r.patterns.len()).sum();
    tracing::info!(rules = rules.len(), patterns, "Tabelas de padrões compiladas");
    rules
}

/// Primeira regra (em ordem de prioridade) com algum padrão casando.
pub fn match_intent(rules: &[PatternRule], text: &str) -> Option<Intent> {
    rules
        .iter()
        .find(|rule| rule.first_match(text).is_some())
        .map(|rule| rule.intent)
}
