use std::collections::HashMap;
use std::sync::Arc;

use failure::ResultExt;
use log::debug;

use crate::errors::*;
use crate::models::{ListEntityModel, Model, PatternEntity, ProcessedIntent};
use crate::toolkit::{Classifier, ClusterTable, SlotTagger, Tools};
use crate::utils::{ContextName, LanguageCode};

pub type PredictorsByLang = HashMap<LanguageCode, Arc<Predictors>>;

/// Runtime objects needed to run predictions in a single language
pub struct Predictors {
    pub ctx_classifier: Option<Box<dyn Classifier>>,
    pub intent_classifier_per_ctx: HashMap<ContextName, Box<dyn Classifier>>,
    pub oos_classifier_per_ctx: HashMap<ContextName, Box<dyn Classifier>>,
    pub slot_tagger: Option<Box<dyn SlotTagger>>,
    pub kmeans: Option<ClusterTable>,
    pub list_entities: Vec<ListEntityModel>,
    pub pattern_entities: Vec<PatternEntity>,
    pub intents: Vec<ProcessedIntent>,
    pub contexts: Vec<ContextName>,
}

impl Predictors {
    /// Predictors of a model without any utterance, which can only extract
    /// entities
    pub fn entities_only(
        list_entities: Vec<ListEntityModel>,
        pattern_entities: Vec<PatternEntity>,
    ) -> Self {
        Self {
            ctx_classifier: None,
            intent_classifier_per_ctx: HashMap::new(),
            oos_classifier_per_ctx: HashMap::new(),
            slot_tagger: None,
            kmeans: None,
            list_entities,
            pattern_entities,
            intents: vec![],
            contexts: vec![],
        }
    }

    pub fn is_entities_only(&self) -> bool {
        self.intents.is_empty() && self.intent_classifier_per_ctx.is_empty()
    }
}

/// Builds the predictors of a model. Corrupted artefacts make the whole
/// compilation fail.
pub fn compile_predictors(model: &Model, tools: &Tools) -> Result<Predictors> {
    let input = &model.data.input;
    let list_entities = model
        .data
        .artefacts
        .as_ref()
        .map(|artefacts| artefacts.list_entities.clone())
        .unwrap_or_default();

    if input.utterances_count() == 0 {
        debug!(
            "Model of language '{}' has no utterance, only entities will be extracted",
            model.language_code
        );
        return Ok(Predictors::entities_only(
            list_entities,
            input.pattern_entities.clone(),
        ));
    }

    let artefacts = model
        .data
        .artefacts
        .as_ref()
        .ok_or_else(|| NluError::MissingArtefacts(model.language_code.clone()))?;
    let output = model.data.output.as_ref().ok_or_else(|| {
        NluError::InternalError("intents must be processed before compiling predictors".to_string())
    })?;
    let factory = &tools.classifier_factory;

    let ctx_classifier = match artefacts.ctx_model.as_ref() {
        Some(ctx_model) => Some(
            factory
                .load(ctx_model)
                .with_context(|_| "Cannot load context classifier".to_string())?,
        ),
        None => None,
    };

    let mut intent_classifier_per_ctx = HashMap::new();
    for (context, classifier_model) in artefacts.intent_model_by_ctx.iter() {
        let classifier = factory.load(classifier_model).with_context(|_| {
            format!("Cannot load intent classifier of context '{}'", context)
        })?;
        intent_classifier_per_ctx.insert(context.clone(), classifier);
    }

    let mut oos_classifier_per_ctx = HashMap::new();
    for (context, classifier_model) in artefacts.oos_model.iter() {
        let classifier = factory.load(classifier_model).with_context(|_| {
            format!("Cannot load out of scope classifier of context '{}'", context)
        })?;
        oos_classifier_per_ctx.insert(context.clone(), classifier);
    }

    let slot_tagger = tools
        .slot_tagger_factory
        .load(&artefacts.slots_model)
        .with_context(|_| "Cannot load slot tagger".to_string())?;
    let kmeans = tools.clusterer.compute_clusters(&output.intents)?;

    Ok(Predictors {
        ctx_classifier,
        intent_classifier_per_ctx,
        oos_classifier_per_ctx,
        slot_tagger: Some(slot_tagger),
        kmeans: Some(kmeans),
        list_entities,
        pattern_entities: input.pattern_entities.clone(),
        intents: output.intents.clone(),
        contexts: input.contexts.clone(),
    })
}
