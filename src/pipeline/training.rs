use std::collections::BTreeMap;

use itertools::Itertools;
use log::{debug, info, warn};

use crate::errors::*;
use crate::models::{
    ClassifierModel, ListEntity, ListEntityModel, Model, ModelData, ProcessedIntent,
    TrainArtefacts, TrainInput, TrainOutput,
};
use crate::pipeline::{IntentProcessor, Trainer, UtteranceProcessor};
use crate::toolkit::{Tools, TrainingSample};
use crate::utils::{tokenize_light, ContextName};

pub const IN_SCOPE_LABEL: &str = "in";
pub const OUT_OF_SCOPE_LABEL: &str = "out";

/// Trains a context classifier over every context, and an intent classifier
/// plus an out-of-scope classifier for each context to train
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextualTrainer {
    processor: UtteranceProcessor,
}

impl Trainer for ContextualTrainer {
    fn train(&self, input: &TrainInput, tools: &Tools) -> Result<Model> {
        let list_entities: Vec<ListEntityModel> =
            input.list_entities.iter().map(build_list_entity_model).collect();
        let intents = self.processor.process_intents(
            &input.intents,
            &input.language_code,
            &list_entities,
            tools,
        )?;

        let ctx_model = train_context_classifier(&intents, &input.contexts, tools)?;
        let mut has_intents_to_train = false;
        let mut intent_model_by_ctx = BTreeMap::new();
        let mut oos_model = BTreeMap::new();
        for context in input.ctx_to_train.iter() {
            let (in_scope, out_of_scope): (Vec<&ProcessedIntent>, Vec<&ProcessedIntent>) =
                intents.iter().partition(|intent| intent.belongs_to(context));
            has_intents_to_train |= !in_scope.is_empty();
            let intent_samples = samples(&in_scope, |intent| intent.name.clone());
            if intent_samples.is_empty() {
                if !in_scope.is_empty() {
                    warn!("Context '{}' has no utterance to train on", context);
                }
                continue;
            }
            debug!(
                "Training intent classifier of context '{}' on {} utterances",
                context,
                intent_samples.len()
            );
            intent_model_by_ctx.insert(
                context.clone(),
                tools.classifier_factory.train(&intent_samples)?,
            );

            let mut oos_samples = samples(&in_scope, |_| IN_SCOPE_LABEL.to_string());
            let nb_in_scope = oos_samples.len();
            oos_samples.extend(samples(&out_of_scope, |_| OUT_OF_SCOPE_LABEL.to_string()));
            if oos_samples.len() > nb_in_scope {
                oos_model.insert(context.clone(), tools.classifier_factory.train(&oos_samples)?);
            }
        }
        let slots_model = tools.slot_tagger_factory.train(&intents)?;
        let success = !has_intents_to_train || !intent_model_by_ctx.is_empty();
        info!(
            "Trained {} contexts of language '{}'",
            intent_model_by_ctx.len(),
            input.language_code
        );
        Ok(Model {
            language_code: input.language_code.clone(),
            success,
            hash: String::new(),
            data: ModelData {
                input: input.clone(),
                output: Some(TrainOutput { intents }),
                artefacts: Some(TrainArtefacts {
                    list_entities,
                    ctx_model,
                    intent_model_by_ctx,
                    oos_model,
                    slots_model,
                }),
            },
        })
    }
}

fn train_context_classifier(
    intents: &[ProcessedIntent],
    contexts: &[ContextName],
    tools: &Tools,
) -> Result<Option<ClassifierModel>> {
    let samples: Vec<TrainingSample> = contexts
        .iter()
        .flat_map(move |context| {
            intents
                .iter()
                .filter(move |intent| intent.belongs_to(context))
                .flat_map(|intent| intent.utterances.iter())
                .map(move |utterance| TrainingSample::new(utterance.token_values(), context.clone()))
        })
        .collect();
    let nb_trained_contexts = samples.iter().map(|sample| &sample.label).unique().count();
    if nb_trained_contexts < 2 {
        return Ok(None);
    }
    debug!(
        "Training context classifier on {} contexts",
        nb_trained_contexts
    );
    Ok(Some(tools.classifier_factory.train(&samples)?))
}

fn samples<F>(intents: &[&ProcessedIntent], label: F) -> Vec<TrainingSample>
where
    F: Fn(&ProcessedIntent) -> String,
{
    intents
        .iter()
        .flat_map(|&intent| {
            let label = label(intent);
            intent
                .utterances
                .iter()
                .map(move |utterance| TrainingSample::new(utterance.token_values(), label.clone()))
        })
        .collect()
}

pub fn build_list_entity_model(entity: &ListEntity) -> ListEntityModel {
    let mappings_tokens = entity
        .synonyms
        .iter()
        .map(|(value, synonyms)| {
            let tokenized: Vec<Vec<String>> = Some(value)
                .into_iter()
                .chain(synonyms.iter())
                .map(|synonym| tokenize_light(synonym))
                .filter(|tokens| !tokens.is_empty())
                .unique()
                .collect();
            (value.clone(), tokenized)
        })
        .collect();
    ListEntityModel {
        entity_name: entity.name.clone(),
        fuzzy_tolerance: entity.fuzzy_tolerance,
        sensitive: entity.sensitive,
        mappings_tokens,
        cache: None,
    }
}
