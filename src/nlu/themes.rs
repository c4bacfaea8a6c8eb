//! # Vocabulário de Temas
//!
//! Tabela curada tema → palavras-chave, usada pelo oráculo no primeiro
//! estágio de detecção de temas. Cada tema vira uma única regex
//! `\b(?:kw1|kw2|...)\b` case-insensitive.
//!
//! Também ficam aqui a tabela de modificadores de intensidade e o mapeamento
//! tema → intent usado pelo classificador para refinar a escolha do NLP.

use regex::Regex;

use crate::core::Intent;

/// Teto da intensidade somada.
pub const MAX_INTENSITY: f32 = 5.0;

pub const THEME_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "anxiety",
        &[
            "anxious", "anxiety", "nervous", "worried", "worry", "worrying", "panic",
            "panicking", "on edge", "restless", "uneasy", "overthinking",
        ],
    ),
    (
        "depression",
        &[
            "depressed", "depression", "sad", "hopeless", "empty", "numb", "miserable",
            "down", "worthless", "crying", "unhappy",
        ],
    ),
    (
        "stress",
        &[
            "stressed", "stress", "stressful", "overwhelmed", "pressure", "burned out",
            "burnout", "too much", "tense",
        ],
    ),
    (
        "loneliness",
        &[
            "lonely", "alone", "isolated", "no friends", "left out", "nobody", "no one",
            "disconnected",
        ],
    ),
    (
        "anger",
        &[
            "angry", "anger", "furious", "mad", "rage", "irritated", "annoyed", "frustrated",
            "pissed",
        ],
    ),
    (
        "grief",
        &[
            "grief", "grieving", "passed away", "died", "death", "lost my", "funeral",
            "mourning", "miss him", "miss her",
        ],
    ),
    (
        "crisis",
        &[
            "suicide", "suicidal", "kill myself", "end my life", "want to die",
            "self harm", "self-harm", "hurt myself",
        ],
    ),
    (
        "sleep",
        &[
            "sleep", "insomnia", "can't sleep", "awake", "nightmares", "tired", "exhausted",
            "restless nights",
        ],
    ),
    (
        "trauma",
        &[
            "trauma", "traumatic", "abuse", "abused", "flashback", "flashbacks", "ptsd",
            "assault", "triggered",
        ],
    ),
    (
        "self_esteem",
        &[
            "not good enough", "failure", "ugly", "stupid", "hate myself", "useless",
            "insecure", "confidence",
        ],
    ),
    (
        "relationships",
        &[
            "boyfriend", "girlfriend", "partner", "husband", "wife", "breakup", "broke up",
            "divorce", "relationship", "dating", "friend",
        ],
    ),
    (
        "family",
        &[
            "family", "mom", "mother", "dad", "father", "parents", "brother", "sister",
            "kids", "children",
        ],
    ),
    (
        "work",
        &[
            "work", "job", "boss", "coworker", "colleague", "deadline", "deadlines", "office",
            "career", "fired", "workload",
        ],
    ),
    (
        "motivation",
        &[
            "unmotivated", "motivation", "lazy", "procrastinating", "procrastination",
            "no energy", "pointless", "stuck",
        ],
    ),
    (
        "self_care",
        &[
            "self care", "self-care", "relax", "relaxing", "take care of myself", "routine",
            "healthy habits",
        ],
    ),
    (
        "health",
        &["sick", "illness", "pain", "doctor", "hospital", "diagnosis", "headache", "health"],
    ),
    ("fear", &["afraid", "scared", "fear", "terrified", "frightened", "phobia"]),
    ("guilt", &["guilty", "guilt", "my fault", "regret", "blame myself", "sorry for"]),
    ("shame", &["ashamed", "shame", "embarrassed", "humiliated", "disgrace"]),
    ("hope", &["hope", "hopeful", "better", "optimistic", "looking forward", "improving"]),
    (
        "gratitude",
        &["thank", "thanks", "grateful", "thankful", "appreciate", "appreciated"],
    ),
    (
        "school",
        &["school", "exam", "exams", "test", "grades", "homework", "college", "university", "class"],
    ),
    (
        "finances",
        &["money", "debt", "bills", "rent", "broke", "loan", "afford", "finances", "salary"],
    ),
];

/// Pesos dos qualificadores de intensidade.
pub const INTENSITY_MODIFIERS: &[(&str, f32)] = &[
    ("extremely", 3.0),
    ("incredibly", 3.0),
    ("absolutely", 2.0),
    ("very", 2.0),
    ("really", 1.5),
    ("so", 1.5),
    ("totally", 2.0),
    ("completely", 2.5),
    ("super", 1.5),
    ("quite", 1.0),
    ("pretty", 1.0),
    ("somewhat", 0.75),
    ("slightly", 0.5),
    ("a bit", 0.5),
    ("a little", 0.5),
];

/// Intent para o qual um tema aponta, se houver.
pub fn theme_intent(theme: &str) -> Option<Intent> {
    let intent = match theme {
        "anxiety" => Intent::Anxiety,
        "depression" => Intent::Depression,
        "stress" => Intent::Stress,
        "loneliness" => Intent::Loneliness,
        "anger" => Intent::Anger,
        "grief" => Intent::Grief,
        "sleep" => Intent::Sleep,
        "trauma" => Intent::Trauma,
        "self_esteem" => Intent::SelfEsteem,
        "relationships" => Intent::Relationship,
        "family" => Intent::Family,
        "work" => Intent::WorkStress,
        "motivation" => Intent::Motivation,
        "self_care" => Intent::SelfCare,
        "gratitude" => Intent::Gratitude,
        "crisis" => Intent::Crisis,
        _ => return None,
    };
    Some(intent)
}

/// Soma dos pesos dos modificadores presentes, limitada a [`MAX_INTENSITY`].
///
/// Cada ocorrência conta: "very very anxious" pesa 4.0.
pub fn intensity_of(text: &str) -> f32 {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .collect();

    let mut total = 0.0f32;
    for (modifier, weight) in INTENSITY_MODIFIERS {
        let parts: Vec<&str> = modifier.split(' ').collect();
        let hits = words.windows(parts.len()).filter(|w| *w == parts.as_slice()).count();
        total += hits as f32 * weight;
    }
    total.min(MAX_INTENSITY)
}

/// Uma regex compilada por tema.
pub struct ThemeMatcher {
    rules: Vec<(&'static str, Regex)>,
}

impl ThemeMatcher {
    pub fn new() -> Self {
        let rules = THEME_KEYWORDS
            .iter()
            .filter_map(|(theme, keywords)| {
                let alternatives: Vec<String> = keywords.iter().map(|k| regex::escape(k)).collect();
                let pattern = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
                match Regex::new(&pattern) {
                    Ok(re) => Some((*theme, re)),
                    Err(e) => {
                        tracing::error!(theme = %theme, error = %e, "Regex de tema inválida");
                        None
                    }
                }
            })
            .collect();
        Self { rules }
    }

    /// Temas cujas palavras-chave aparecem no texto, em ordem de tabela.
    pub fn matches(&self, text: &str) -> Vec<String> {
        self.rules
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(theme, _)| theme.to_string())
            .collect()
    }

    pub fn theme_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for ThemeMatcher {
    fn default() -> Self {
        Self::new()
    }
}
