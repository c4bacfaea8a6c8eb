//! Fronteira de tradução. Chamada só quando `language != "en"`: uma vez na
//! entrada (para inglês) e uma vez na saída (de volta ao idioma pedido).
//! Qualquer falha devolve o texto original.

#[derive(Debug, thiserror::Error)]
#[error("tradução para '{target}' falhou: {reason}")]
pub struct TranslateError {
    pub target: String,
    pub reason: String,
}

pub trait Translator: Send + Sync {
    fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslateError>;
}

/// Tradutor padrão: devolve o texto sem alteração.
pub struct PassThrough;

impl Translator for PassThrough {
    fn translate(&self, text: &str, _target_lang: &str) -> Result<String, TranslateError> {
        Ok(text.to_string())
    }
}

pub fn is_english(language: &str) -> bool {
    language.trim().is_empty() || language.trim().eq_ignore_ascii_case("en")
}

/// Traduz, ou devolve o texto original se a tradução falhar.
pub fn translate_or_pass(translator: &dyn Translator, text: &str, target_lang: &str) -> String {
    translator.translate(text, target_lang).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Tradução falhou, seguindo com o texto original");
        text.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl Translator for Broken {
        fn translate(&self, _text: &str, target_lang: &str) -> Result<String, TranslateError> {
            Err(TranslateError {
                target: target_lang.to_string(),
                reason: "offline".into(),
            })
        }
    }

    #[test]
    fn failures_pass_text_through() {
        assert_eq!(translate_or_pass(&Broken, "hola", "en"), "hola");
        assert_eq!(translate_or_pass(&PassThrough, "hola", "en"), "hola");
    }

    #[test]
    fn english_detection() {
        assert!(is_english("en"));
        assert!(is_english("EN"));
        assert!(is_english(""));
        assert!(!is_english("es"));
    }
}
