use std::sync::Arc;

use itertools::Itertools;
use log::{debug, info, warn};

use crate::configurations::{NluVersionInfo, TrainingOptions};
use crate::context_diff::select_contexts_to_train;
use crate::entity_parser::{normalize_entities, EntityCache, NormalizedEntities};
use crate::errors::*;
use crate::hashing::{compute_list_entity_hash, compute_model_hash};
use crate::merge::merge_models;
use crate::models::{
    EntityDefinition, Intent, IntentDefinition, ListEntityModel, Model, TrainInput, TrainOutput,
    TrainingSession,
};
use crate::pipeline::{IntentProcessor, NluPipelines, PredictInput, PredictOutput, PredictPipeline, Trainer};
use crate::predictors::compile_predictors;
use crate::state::{LanguageLocks, LanguageStateStore};
use crate::toolkit::Tools;
use crate::utils::{BotId, ContextName, LanguageCode};

/// NLU engine of a single bot. It trains models, keeps one loaded model and
/// its compiled predictors per language, and runs predictions against them.
pub struct NluEngine {
    bot_id: BotId,
    default_language: LanguageCode,
    version: NluVersionInfo,
    tools: Arc<Tools>,
    pipelines: NluPipelines,
    state: LanguageStateStore,
    training_locks: LanguageLocks,
}

pub struct NluEngineBuilder {
    bot_id: BotId,
    default_language: LanguageCode,
    version: NluVersionInfo,
    tools: Option<Arc<Tools>>,
    pipelines: NluPipelines,
}

impl NluEngineBuilder {
    pub fn version(mut self, version: NluVersionInfo) -> Self {
        self.version = version;
        self
    }

    pub fn tools(mut self, tools: Arc<Tools>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn trainer<T: Trainer + 'static>(mut self, trainer: T) -> Self {
        self.pipelines.trainer = Arc::new(trainer);
        self
    }

    pub fn intent_processor<P: IntentProcessor + 'static>(mut self, processor: P) -> Self {
        self.pipelines.intent_processor = Arc::new(processor);
        self
    }

    pub fn predict_pipeline<P: PredictPipeline + 'static>(mut self, pipeline: P) -> Self {
        self.pipelines.predict_pipeline = Arc::new(pipeline);
        self
    }

    pub fn build(self) -> NluEngine {
        NluEngine {
            bot_id: self.bot_id,
            default_language: self.default_language,
            version: self.version,
            tools: self.tools.unwrap_or_else(|| Arc::new(Tools::default())),
            pipelines: self.pipelines,
            state: LanguageStateStore::default(),
            training_locks: LanguageLocks::default(),
        }
    }
}

impl NluEngine {
    pub fn builder<B: Into<String>, L: Into<String>>(bot_id: B, default_language: L) -> NluEngineBuilder {
        NluEngineBuilder {
            bot_id: bot_id.into(),
            default_language: default_language.into(),
            version: NluVersionInfo::default(),
            tools: None,
            pipelines: NluPipelines::default(),
        }
    }

    pub fn bot_id(&self) -> &str {
        &self.bot_id
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    pub fn tools(&self) -> &Arc<Tools> {
        &self.tools
    }

    /// Trains a model for `language_code`, retraining only the contexts whose
    /// intents changed since the currently loaded model unless
    /// `options.force_train` is set.
    ///
    /// A training failure reported by the trainer is returned as a model with
    /// `success` set to false.
    pub fn train(
        &self,
        intent_defs: &[IntentDefinition],
        entity_defs: &[EntityDefinition],
        language_code: &str,
        training_session: Option<&TrainingSession>,
        options: TrainingOptions,
    ) -> Result<Model> {
        info!("[{}] Started {} training", self.bot_id, language_code);

        let NormalizedEntities {
            list_entities,
            pattern_entities,
        } = normalize_entities(entity_defs);

        // Contexts do not depend on the language
        let contexts: Vec<ContextName> = intent_defs
            .iter()
            .flat_map(|intent| intent.contexts.iter().cloned())
            .unique()
            .collect();

        let intents: Vec<Intent> = intent_defs
            .iter()
            .filter_map(|intent| {
                intent.utterances.get(language_code).map(|utterances| Intent {
                    name: intent.name.clone(),
                    contexts: intent.contexts.clone(),
                    utterances: utterances.clone(),
                    slot_definitions: intent.slots.clone(),
                })
            })
            .collect();

        let previous_model = self.state.model(language_code)?;
        let selection = select_contexts_to_train(
            previous_model
                .as_ref()
                .map(|model| model.data.input.intents.as_slice()),
            &intents,
            &contexts,
            options.force_train,
        )?;
        if selection.train_all {
            info!("[{}] Training all contexts", self.bot_id);
        } else {
            info!(
                "[{}] Retraining only contexts: [{}]",
                self.bot_id,
                selection.ctx_to_train.join(", ")
            );
        }

        let input = TrainInput {
            bot_id: self.bot_id.clone(),
            language_code: language_code.to_string(),
            list_entities,
            pattern_entities,
            contexts,
            intents,
            ctx_to_train: selection.ctx_to_train,
        };
        let mut model = self.pipelines.trainer.train(&input, &self.tools)?;

        if !selection.train_all {
            if let Some(previous_model) = previous_model.as_ref() {
                model = merge_models(previous_model, model);
            }
        }

        model.hash = compute_model_hash(intent_defs, entity_defs, &self.version, language_code)?;

        if model.success {
            info!("[{}] Successfully finished {} training", self.bot_id, language_code);
            if let Some(session) = training_session {
                self.tools.progress_reporter.report_training_progress(
                    &self.bot_id,
                    "Training complete",
                    &session.completed(),
                );
            }
        } else {
            warn!("[{}] Training of {} model failed", self.bot_id, language_code);
        }
        Ok(model)
    }

    /// Makes `model` the active model of its language. Loading a model whose
    /// hash matches the active one is a no-op.
    pub fn load_model(&self, mut model: Model) -> Result<()> {
        if self.is_model_loaded(&model)? {
            debug!(
                "[{}] Model {} already loaded for language '{}'",
                self.bot_id, model.hash, model.language_code
            );
            return Ok(());
        }

        if model.data.output.is_none() {
            debug!("[{}] Processing intents of '{}' model", self.bot_id, model.language_code);
            let list_entities: &[ListEntityModel] = model
                .data
                .artefacts
                .as_ref()
                .map(|artefacts| artefacts.list_entities.as_slice())
                .unwrap_or(&[]);
            let intents = self.pipelines.intent_processor.process_intents(
                &model.data.input.intents,
                &model.language_code,
                list_entities,
                &self.tools,
            )?;
            model.data.output = Some(TrainOutput { intents });
        }

        if let Some(artefacts) = model.data.artefacts.as_mut() {
            self.warm_entities_caches(&mut artefacts.list_entities)?;
        }

        let predictors = compile_predictors(&model, &self.tools)?;
        info!(
            "[{}] Loaded model {} for language '{}'",
            self.bot_id, model.hash, model.language_code
        );
        self.state.replace(model, predictors)
    }

    fn warm_entities_caches(&self, list_entities: &mut [ListEntityModel]) -> Result<()> {
        let cache_manager = &self.tools.cache_manager;
        for entity in list_entities.iter_mut() {
            let entity_hash = compute_list_entity_hash(entity)?;
            let cache = match entity.cache.take() {
                Some(cache) => cache,
                None => EntityCache::Live(cache_manager.get_or_create_cache(
                    &entity.entity_name,
                    &entity_hash,
                    &self.bot_id,
                )?),
            };
            let cache = if cache_manager.is_cache_dump(&cache) {
                match cache {
                    EntityCache::Dump(dump) => {
                        info!(
                            "[{}] Repairing dumped cache of entity '{}'",
                            self.bot_id, entity.entity_name
                        );
                        EntityCache::Live(cache_manager.load_cache_from_data(
                            &dump,
                            &entity.entity_name,
                            &entity_hash,
                            &self.bot_id,
                        )?)
                    }
                    live => live,
                }
            } else {
                cache
            };
            entity.cache = Some(cache);
        }
        Ok(())
    }

    /// Whether a model with the same hash is already active for its language
    pub fn is_model_loaded(&self, model: &Model) -> Result<bool> {
        Ok(self
            .state
            .model(&model.language_code)?
            .map_or(false, |loaded| loaded.has_same_hash(model)))
    }

    pub fn loaded_model(&self, language_code: &str) -> Result<Option<Arc<Model>>> {
        self.state.model(language_code)
    }

    pub fn loaded_languages(&self) -> Result<Vec<LanguageCode>> {
        self.state.languages()
    }

    pub fn unload_model(&self, language_code: &str) -> Result<bool> {
        let unloaded = self.state.remove(language_code)?;
        if unloaded {
            info!("[{}] Unloaded '{}' model", self.bot_id, language_code);
        }
        Ok(unloaded)
    }

    /// Trains then loads a model while holding the exclusive section of the
    /// language. Unsuccessful models are returned without being loaded.
    pub fn train_and_load(
        &self,
        intent_defs: &[IntentDefinition],
        entity_defs: &[EntityDefinition],
        language_code: &str,
        training_session: Option<&TrainingSession>,
        options: TrainingOptions,
    ) -> Result<Model> {
        let lock = self.training_locks.lock_for(language_code)?;
        let _guard = lock
            .lock()
            .map_err(|e| NluError::PoisonedLock(format!("{}", e)))?;
        let model = self.train(intent_defs, entity_defs, language_code, training_session, options)?;
        if model.success {
            self.load_model(model.clone())?;
        }
        Ok(model)
    }

    pub fn predict(&self, sentence: &str, included_contexts: &[ContextName]) -> Result<PredictOutput> {
        let input = PredictInput {
            default_language: self.default_language.clone(),
            sentence: sentence.to_string(),
            included_contexts: included_contexts.to_vec(),
        };
        let predictors = self.state.predictors_by_lang()?;
        self.pipelines
            .predict_pipeline
            .predict(&input, &self.tools, &predictors)
    }
}
