//! # NLU — Compreensão das Mensagens
//!
//! Tudo o que transforma texto cru em sinais para o seletor de respostas.
//!
//! ## Fluxo por Turno
//!
//! ```text
//! Mensagem do usuário
//!   ├── 1. NFC normalize + trim (normalize)
//!   ├── 2. Oráculo: sentimento, intensidade, temas (oracle)
//!   ├── 3. Classificador: padrões → zero-shot → temas → similaridade (intent)
//!   └── 4. Extração de detalhes específicos do intent (extractor)
//! ```
//!
//! ## Sub-módulos
//!
//! | Módulo | Responsabilidade |
//! |--------|-----------------|
//! | [`models`] | Traits da fronteira de ML, slot de modelos, porta de chamadas (vagas + timeout) |
//! | [`embedder`] | Sentence embedder BERT via candle |
//! | [`themes`] | Vocabulário de temas e modificadores de intensidade |
//! | [`oracle`] | Sentimento + intensidade + temas |
//! | [`patterns`] | Tabelas de padrões literais e pools embutidos |
//! | [`extractor`] | Detalhes por intent e preferência de técnica |
//! | [`intent`] | Classificador em camadas |

pub mod embedder;
pub mod extractor;
pub mod intent;
pub mod models;
pub mod oracle;
pub mod patterns;
pub mod themes;

use unicode_normalization::UnicodeNormalization;

pub use intent::{Classification, IntentClassifier, Source};
pub use models::{ModelGate, ModelSlot, Models, OracleError, Sentiment, SentimentLabel};
pub use oracle::{Analysis, Oracle};

/// Forma canônica do texto de entrada: NFC e sem espaços nas pontas.
///
/// Apóstrofos tipográficos viram `'` para que os padrões literais
/// (`can't`, `don't`) casem independente do teclado do usuário.
pub fn normalize(text: &str) -> String {
    text.nfc()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_composes_and_trims() {
        // "e" + acento combinante → "é"
        assert_eq!(normalize("  caf\u{0065}\u{0301}  "), "caf\u{00e9}");
        assert_eq!(normalize("I can\u{2019}t sleep"), "I can't sleep");
    }
}
