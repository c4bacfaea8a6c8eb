//! # Orquestrador — O Turno de Conversa
//!
//! O [`ChatEngine`] amarra os componentes num turno completo, serializado
//! por usuário:
//!
//! ```text
//! Mensagem
//!   ├── 0. normaliza (NFC) e trava o lock do user_id
//!   ├── 1. crise literal?                       ──sim──► turno de crise
//!   ├── 2. oráculo: sentimento, intensidade, temas
//!   ├── 3. crise pelos temas?                   ──sim──► turno de crise
//!   ├── 4. classifica intent + detalhes         ──crisis─► turno de crise
//!   ├── 5. aprende técnica preferida ("breathing helps")
//!   ├── 6. seleciona resposta (estágio, dedup, sorteio)
//!   ├── 7. upsert do contexto (count+1, temas, crisis_mode=false)
//!   └── 8. grava no store e aplica evicção (nunca sobre o usuário do turno)
//! ```
//!
//! ## Turno de Crise
//!
//! Resposta fixa com recursos. No contexto só mudam `crisis_mode = true`,
//! a contagem e o fingerprint da mensagem de crise; estágio e
//! `previous_intent` ficam como estavam.
//!
//! ## Concorrência
//!
//! Turnos do mesmo usuário passam por um `tokio::sync::Mutex` próprio daquele
//! `user_id`, segurado através dos awaits das chamadas de modelo; usuários
//! diferentes não competem entre si. O RNG é compartilhado atrás de um
//! `Mutex` curto que nunca atravessa um await.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Mutex as TurnLock;

use crate::config::ChatConfig;
use crate::core::{ContextUpdate, Intent, UserContext};
use crate::crisis::CrisisDetector;
use crate::nlu::patterns::compile_rules;
use crate::nlu::{
    normalize, Analysis, IntentClassifier, ModelGate, ModelSlot, Oracle, OracleError, Source,
};
use crate::reply::{crisis_reply, Reply, ResponseCatalog, ResponseSelector};
use crate::store::ContextStore;

/// Resultado de um turno processado.
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    pub reply: Reply,
    pub intent: Intent,
    /// Camada que decidiu o intent; `None` em crise literal.
    pub source: Option<Source>,
    pub analysis: Option<Analysis>,
    /// Contexto já atualizado e gravado.
    pub context: UserContext,
}

pub struct ChatEngine {
    crisis: CrisisDetector,
    oracle: Oracle,
    classifier: IntentClassifier,
    selector: ResponseSelector,
    store: Arc<dyn ContextStore>,
    user_locks: Mutex<HashMap<String, Arc<TurnLock<()>>>>,
    rng: Mutex<StdRng>,
    max_contexts: usize,
}

impl ChatEngine {
    pub fn new(config: &ChatConfig, models: ModelSlot, store: Arc<dyn ContextStore>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // oráculo e classificador dividem as mesmas vagas de modelo
        let gate = ModelGate::new(config.max_model_calls, config.oracle_timeout());
        let rules = Arc::new(compile_rules());
        let catalog = Arc::new(ResponseCatalog::build(&rules));
        let classifier =
            IntentClassifier::new(rules, catalog.samples(), models.clone(), gate.clone());

        Self {
            crisis: CrisisDetector::new(),
            oracle: Oracle::new(models, gate),
            classifier,
            selector: ResponseSelector::new(catalog),
            store,
            user_locks: Mutex::new(HashMap::new()),
            rng: Mutex::new(rng),
            max_contexts: config.max_contexts,
        }
    }

    /// Processa um turno do usuário. Nunca falha: toda degradação é interna.
    pub async fn process_message(&self, user_id: &str, text: &str) -> TurnOutcome {
        let text = normalize(text);
        let lock = self.user_lock(user_id);
        let _turn = lock.lock().await;

        let mut ctx = self.store.get_context(user_id);

        if self.crisis.is_crisis(&text, &[]) {
            return self.crisis_turn(ctx, None, None);
        }

        let analysis = self.oracle.analyze(&text, &mut ctx.theme_history).await;
        if self.crisis.is_crisis(&text, &analysis.themes) {
            return self.crisis_turn(ctx, Some(analysis), None);
        }

        let classification = self
            .classifier
            .classify(&text, &analysis.themes, analysis.intensity, &mut ctx)
            .await;
        if classification.intent == Intent::Crisis {
            return self.crisis_turn(ctx, Some(analysis), Some(classification.source));
        }

        if let Some(technique) = self.classifier.preferred_technique(&text) {
            tracing::debug!(user_id = %user_id, technique = %technique, "Técnica preferida aprendida");
            ctx.preferences.preferred_technique = technique;
        }

        let reply = {
            let mut rng = self.rng.lock();
            self.selector
                .select(classification.intent, &classification.details, &mut ctx, &mut *rng)
        };

        let update = ContextUpdate {
            intent: classification.intent,
            interaction_count: ctx.interaction_count + 1,
            themes: analysis.themes.clone(),
            crisis_mode: false,
            details: classification.details,
            preferences: ctx.preferences.clone(),
            emotional_stage: ctx.emotional_stage,
        };
        ctx.update(update);

        tracing::debug!(
            user_id = %user_id,
            intent = %classification.intent,
            stage = reply.stage.as_str(),
            count = ctx.interaction_count,
            "Turno processado"
        );

        self.persist(&ctx);
        TurnOutcome {
            reply,
            intent: classification.intent,
            source: Some(classification.source),
            analysis: Some(analysis),
            context: ctx,
        }
    }

    fn crisis_turn(
        &self,
        mut ctx: UserContext,
        analysis: Option<Analysis>,
        source: Option<Source>,
    ) -> TurnOutcome {
        let reply = crisis_reply(&mut ctx);
        ctx.mark_crisis();
        tracing::warn!(user_id = %ctx.user_id, count = ctx.interaction_count, "Turno de crise");
        self.persist(&ctx);
        TurnOutcome {
            reply,
            intent: Intent::Crisis,
            source,
            analysis,
            context: ctx,
        }
    }

    fn persist(&self, ctx: &UserContext) {
        if let Err(e) = self.store.put(ctx.clone()) {
            tracing::warn!(user_id = %ctx.user_id, error = %e, "Falha ao gravar contexto");
        }
        match self.store.evict_over(self.max_contexts, &ctx.user_id) {
            Ok(evicted) if !evicted.is_empty() => {
                let mut locks = self.user_locks.lock();
                for id in &evicted {
                    // lock em uso por outro turno fica até o turno terminar
                    if locks.get(id).is_some_and(|l| Arc::strong_count(l) == 1) {
                        locks.remove(id);
                    }
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Falha na evicção de contextos"),
        }
    }

    fn user_lock(&self, user_id: &str) -> Arc<TurnLock<()>> {
        self.user_locks
            .lock()
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(TurnLock::new(())))
            .clone()
    }

    /// Contexto atual do usuário (novo se ausente).
    pub fn context(&self, user_id: &str) -> UserContext {
        self.store.get_context(user_id)
    }

    pub fn models_ready(&self) -> bool {
        self.oracle.models_ready()
    }

    /// Pré-computa os vetores de temas e de respostas-exemplo.
    pub fn warm_up(&self) -> Result<(), OracleError> {
        self.oracle.warm_up()?;
        self.classifier.warm_up()
    }

    pub fn tracked_users(&self) -> usize {
        self.store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    use crate::core::EmotionalStage;
    use crate::nlu::models::fakes::*;
    use crate::nlu::Models;
    use crate::store::MemoryStore;

    fn config(max_contexts: usize) -> ChatConfig {
        ChatConfig {
            seed: Some(11),
            max_contexts,
            oracle_timeout_ms: 200,
            ..ChatConfig::default()
        }
    }

    fn engine_with(max_contexts: usize) -> ChatEngine {
        ChatEngine::new(&config(max_contexts), Arc::new(OnceLock::new()), Arc::new(MemoryStore::new()))
    }

    fn engine() -> ChatEngine {
        engine_with(1000)
    }

    #[tokio::test]
    async fn crisis_message_returns_resources_and_flags_context() {
        let e = engine();
        let out = e.process_message("u1", "I want to kill myself").await;
        assert!(out.reply.crisis);
        for needle in ["988", "741741", "911"] {
            assert!(out.reply.text.contains(needle));
        }
        assert!(out.context.crisis_mode);
        assert_eq!(out.context.interaction_count, 1);
        assert_eq!(out.context.emotional_stage, EmotionalStage::Validation);
        assert_eq!(out.context.previous_intent, None);
        assert!(e.context("u1").crisis_mode);
    }

    #[tokio::test]
    async fn crisis_overrides_any_prior_stage() {
        let e = engine();
        e.process_message("u1", "hello").await;
        e.process_message("u1", "I feel so stressed").await;
        let out = e.process_message("u1", "I just want to die").await;
        assert!(out.reply.crisis);
        assert_eq!(out.context.emotional_stage, EmotionalStage::Coping);
        assert_eq!(out.context.previous_intent, Some(Intent::Stress));

        // o turno seguinte limpa o modo crise
        let out = e.process_message("u1", "thank you").await;
        assert!(!out.context.crisis_mode);
        assert_eq!(out.context.interaction_count, 4);
    }

    #[tokio::test]
    async fn hello_is_a_greeting_answered_in_validation() {
        let e = engine();
        let out = e.process_message("u1", "hello").await;
        assert_eq!(out.intent, Intent::Greeting);
        assert_eq!(out.reply.stage, EmotionalStage::Validation);
        assert_eq!(out.context.emotional_stage, EmotionalStage::Exploration);
        assert!(!out.reply.text.is_empty());
    }

    #[tokio::test]
    async fn anxious_about_work_extracts_details() {
        let e = engine();
        let out = e
            .process_message("u1", "I feel very anxious about work lately")
            .await;
        assert_eq!(out.intent, Intent::Anxiety);
        let d = &out.context.last_details;
        assert!(d.intensity >= 1.0);
        assert_eq!(d.timeframe.as_deref(), Some("lately"));
        assert!(d.trigger.as_deref().is_some_and(|t| t.contains("work")));
        assert!(out.context.identified_themes.contains("anxiety"));
    }

    #[tokio::test]
    async fn consecutive_turns_count_and_advance() {
        let e = engine();
        assert_eq!(e.context("u1").interaction_count, 0);
        let first = e.process_message("u1", "hello").await;
        let second = e.process_message("u1", "I can't sleep").await;
        assert_eq!(first.context.interaction_count, 1);
        assert_eq!(second.context.interaction_count, 2);
        assert_eq!(first.reply.stage, EmotionalStage::Validation);
        assert_eq!(second.reply.stage, EmotionalStage::Exploration);

        let third = e.process_message("u1", "still awake all night").await;
        assert_eq!(third.reply.stage, EmotionalStage::Coping);
        let fourth = e.process_message("u1", "bye").await;
        assert_eq!(fourth.reply.stage, EmotionalStage::Coping);
    }

    #[tokio::test]
    async fn users_are_independent() {
        let e = engine();
        e.process_message("a", "hello").await;
        e.process_message("a", "hello again").await;
        let b = e.process_message("b", "hello").await;
        assert_eq!(b.context.interaction_count, 1);
        assert_eq!(b.reply.stage, EmotionalStage::Validation);
    }

    #[tokio::test]
    async fn learns_preferred_technique() {
        let e = engine();
        let out = e.process_message("u1", "journaling really helps me").await;
        assert_eq!(out.context.preferences.preferred_technique, "journaling");
    }

    #[tokio::test]
    async fn crisis_by_classification_does_not_learn_preferences() {
        let models = Models {
            embedder: Arc::new(FailingEmbedder),
            sentiment: Arc::new(FixedSentiment(crate::nlu::Sentiment::neutral())),
            zero_shot: Some(Arc::new(ScriptedZeroShot(vec![(Intent::Crisis, 0.9)]))),
        };
        let e = ChatEngine::new(&config(1000), slot(models), Arc::new(MemoryStore::new()));
        let before = e.context("u1").preferences.preferred_technique;

        let out = e
            .process_message("u1", "even journaling only helps for a minute before it all comes back")
            .await;
        assert!(out.reply.crisis);
        assert_eq!(out.source, Some(Source::ZeroShot));
        assert_eq!(out.context.preferences.preferred_technique, before);
        assert_eq!(e.context("u1").preferences.preferred_technique, before);
    }

    #[tokio::test]
    async fn evicts_over_the_ceiling() {
        let e = engine_with(2);
        e.process_message("busy", "hello").await;
        e.process_message("busy", "hello").await;
        e.process_message("quiet", "hello").await;
        e.process_message("zeta", "hello").await;
        e.process_message("zeta", "hello").await;
        assert_eq!(e.tracked_users(), 2);
        assert_eq!(e.context("quiet").interaction_count, 0);
        assert_eq!(e.context("busy").interaction_count, 2);
    }

    #[tokio::test]
    async fn newcomer_at_a_full_store_keeps_its_context() {
        let e = engine_with(2);
        for _ in 0..3 {
            e.process_message("a", "hello").await;
            e.process_message("b", "hello").await;
        }

        let first = e.process_message("c", "hello").await;
        assert_eq!(first.context.interaction_count, 1);
        assert_eq!(e.context("c").interaction_count, 1);

        let second = e.process_message("c", "I can't sleep").await;
        assert_eq!(second.context.interaction_count, 2);
        assert_eq!(second.reply.stage, EmotionalStage::Exploration);
        assert_eq!(e.context("c").interaction_count, 2);
        assert_eq!(e.tracked_users(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_turns_for_one_user_are_serialized() {
        let e = Arc::new(engine());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let e = e.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..5 {
                    e.process_message("shared", "I feel lonely").await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(e.context("shared").interaction_count, 40);
    }

    #[tokio::test]
    async fn unknown_messages_still_get_a_reply() {
        let e = engine();
        let out = e.process_message("u1", "the weather is strange").await;
        assert_eq!(out.intent, Intent::Unknown);
        assert!(!out.reply.text.is_empty());
        assert_eq!(out.context.previous_intent, Some(Intent::Unknown));
    }
}
