//! # Detector de Crise — Prioridade Absoluta
//!
//! Verificação literal e rápida que curto-circuita todo o resto do pipeline.
//! Falsos negativos são a falha crítica; falsos positivos são toleráveis,
//! por isso não há nenhuma etapa de ML aqui.
//!
//! ```text
//! mensagem ──► padrões de alto risco? ──sim──► resposta fixa com recursos
//!          └─► tema "crisis" presente? ─sim──┘
//! ```
//!
//! Um padrão que não compila é registrado no log e ignorado: vale como
//! "sem match" para aquele padrão, nunca como falha do detector.

use regex::Regex;
use serde::Serialize;

/// Tema que, quando presente, também dispara o modo crise.
pub const CRISIS_THEME: &str = "crisis";

/// Mensagem fixa, não randomizada, emitida em todo turno de crise.
pub const CRISIS_MESSAGE: &str = "I'm very concerned about what you're saying. Your life has value \
and there are people who want to help. Please reach out to a crisis counselor right now:\n\n\
Crisis Line: call or text 988 (Suicide & Crisis Lifeline)\n\
Crisis Text: Text HOME to 741741\n\
Emergency: 911";

/// Padrões literais de alto risco (ideação suicida, autolesão).
const HIGH_RISK_PATTERNS: &[&str] = &[
    r"suicid(?:e|al)",
    r"\bkill(?:ing)?\s*my\s*self\b",
    r"\bwant(?:s|ed)?\s+to\s+die\b",
    r"\bwish\s+i\s+(?:was|were)\s+dead\b",
    r"\bbetter\s+off\s+dead\b",
    r"\bend\s+(?:it\s+all|my\s+life|things)\b",
    r"\bcan(?:'|’)?t\s+go\s+on\b",
    r"\bno\s+reason\s+to\s+live\b",
    r"\bself[\s-]?harm",
    r"\b(?:hurt|hurting|cut|cutting|harm|harming)\s+myself\b",
    r"\btake\s+my\s+(?:own\s+)?life\b",
    r"\bdon(?:'|’)?t\s+want\s+to\s+(?:live|be\s+alive|wake\s+up)\b",
];

/// Recursos anexados à resposta HTTP quando `crisis_mode` é verdadeiro.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CrisisResources {
    pub crisis_line: &'static str,
    pub crisis_text: &'static str,
    pub emergency: &'static str,
}

impl CrisisResources {
    pub fn standard() -> Self {
        Self {
            crisis_line: "988",
            crisis_text: "Text HOME to 741741",
            emergency: "911",
        }
    }
}

/// Predicado puro sobre a mensagem e o conjunto de temas.
pub struct CrisisDetector {
    patterns: Vec<Regex>,
}

impl CrisisDetector {
    pub fn new() -> Self {
        Self::from_patterns(HIGH_RISK_PATTERNS)
    }

    /// Compila os padrões ignorando (com log) os que não compilam.
    pub fn from_patterns(patterns: &[&str]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| match Regex::new(&format!("(?i){}", p)) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::error!(pattern = %p, error = %e, "Padrão de crise inválido ignorado");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    /// `true` se algum padrão casa com o texto ou se o tema `crisis` está presente.
    pub fn is_crisis(&self, message: &str, themes: &[String]) -> bool {
        if let Some(re) = self.patterns.iter().find(|re| re.is_match(message)) {
            tracing::warn!(pattern = %re.as_str(), "Crise detectada por padrão literal");
            return true;
        }
        if themes.iter().any(|t| t == CRISIS_THEME) {
            tracing::warn!("Crise detectada pelo tema identificado");
            return true;
        }
        false
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

impl Default for CrisisDetector {
    fn default() -> Self {
        Self::new()
    }
}
