use std::cmp::Ordering;
use std::collections::HashMap;
use std::ops::Range;

use itertools::Itertools;
use log::debug;
use serde::Serialize;

use crate::entity_parser::{extract_list_entities, extract_pattern_entities, ExtractedEntity};
use crate::errors::*;
use crate::pipeline::{PredictPipeline, OUT_OF_SCOPE_LABEL};
use crate::predictors::{Predictors, PredictorsByLang};
use crate::toolkit::Tools;
use crate::utils::{
    substring_with_char_range, tokenize, ContextName, IntentName, LanguageCode, SlotName, Token,
};

#[derive(Debug, Clone, PartialEq)]
pub struct PredictInput {
    pub default_language: LanguageCode,
    pub sentence: String,
    /// When empty, every context is considered
    pub included_contexts: Vec<ContextName>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentPrediction {
    pub name: IntentName,
    pub context: ContextName,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotPrediction {
    pub name: SlotName,
    pub source: String,
    pub char_range: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictOutput {
    pub language: LanguageCode,
    pub detected_language: LanguageCode,
    pub included_contexts: Vec<ContextName>,
    pub intent: Option<IntentPrediction>,
    pub intents: Vec<IntentPrediction>,
    pub entities: Vec<ExtractedEntity>,
    pub slots: Vec<SlotPrediction>,
    pub cluster: Option<usize>,
}

/// Scores every intent as the product of its context probability, its
/// in-context probability and the probability of not being out of scope
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextualPredictPipeline;

impl PredictPipeline for ContextualPredictPipeline {
    fn predict(
        &self,
        input: &PredictInput,
        _tools: &Tools,
        predictors: &PredictorsByLang,
    ) -> Result<PredictOutput> {
        let tokens = tokenize(&input.sentence);
        let token_values: Vec<String> = tokens.iter().map(|token| token.value.clone()).collect();
        let (language, detected_language) =
            select_language(&input.default_language, &token_values, predictors)?;
        let language_predictors = predictors
            .get(&language)
            .ok_or_else(|| NluError::NoPredictors(language.clone()))?;
        debug!("Predicting '{}' with '{}' predictors", input.sentence, language);

        let mut entities = extract_pattern_entities(&input.sentence, &language_predictors.pattern_entities)?;
        entities.extend(extract_list_entities(&input.sentence, &language_predictors.list_entities)?);

        let included_contexts: Vec<ContextName> = if input.included_contexts.is_empty() {
            language_predictors.contexts.clone()
        } else {
            language_predictors
                .contexts
                .iter()
                .filter(|context| input.included_contexts.contains(context))
                .cloned()
                .collect()
        };
        let cluster = language_predictors
            .kmeans
            .as_ref()
            .and_then(|kmeans| kmeans.nearest(&token_values));

        let intents = predict_intents(language_predictors, &token_values, &included_contexts)?;
        let intent = intents.first().cloned();
        let slots = match (intent.as_ref(), language_predictors.slot_tagger.as_ref()) {
            (Some(intent), Some(tagger)) => {
                let tags = tagger.tag(&intent.name, &token_values)?;
                group_slots(&input.sentence, &tokens, tags)
            }
            _ => vec![],
        };

        Ok(PredictOutput {
            language,
            detected_language,
            included_contexts,
            intent,
            intents,
            entities,
            slots,
            cluster,
        })
    }
}

/// Returns the language to predict with along with the detected one. The
/// detected language wins only when it covers strictly more tokens than the
/// default language.
fn select_language(
    default_language: &str,
    tokens: &[String],
    predictors: &PredictorsByLang,
) -> Result<(LanguageCode, LanguageCode)> {
    let mut detected: Option<(&LanguageCode, usize)> = None;
    for language in predictors.keys().sorted() {
        let language_coverage = vocabulary_coverage(&predictors[language], tokens);
        if detected.map_or(true, |(_, best)| language_coverage > best) {
            detected = Some((language, language_coverage));
        }
    }
    let (detected_language, detected_coverage) =
        detected.ok_or_else(|| NluError::NoPredictors(default_language.to_string()))?;
    let language = match predictors.get(default_language) {
        Some(default_predictors)
            if vocabulary_coverage(default_predictors, tokens) >= detected_coverage =>
        {
            default_language.to_string()
        }
        _ => detected_language.clone(),
    };
    Ok((language, detected_language.clone()))
}

fn vocabulary_coverage(predictors: &Predictors, tokens: &[String]) -> usize {
    predictors
        .kmeans
        .as_ref()
        .map(|kmeans| kmeans.vocabulary_coverage(tokens))
        .unwrap_or(0)
}

fn predict_intents(
    predictors: &Predictors,
    tokens: &[String],
    contexts: &[ContextName],
) -> Result<Vec<IntentPrediction>> {
    let mut predictions = vec![];
    for (context, context_confidence) in context_confidences(predictors, tokens, contexts)? {
        let classifier = match predictors.intent_classifier_per_ctx.get(&context) {
            Some(classifier) => classifier,
            None => continue,
        };
        let oos_confidence = match predictors.oos_classifier_per_ctx.get(&context) {
            Some(oos_classifier) => oos_classifier
                .predict(tokens)?
                .into_iter()
                .find(|label| label.label == OUT_OF_SCOPE_LABEL)
                .map(|label| label.confidence)
                .unwrap_or(0.),
            None => 0.,
        };
        for label in classifier.predict(tokens)? {
            predictions.push(IntentPrediction {
                name: label.label,
                context: context.clone(),
                confidence: context_confidence * label.confidence * (1. - oos_confidence),
            });
        }
    }
    predictions.sort_by(|lhs, rhs| {
        rhs.confidence
            .partial_cmp(&lhs.confidence)
            .unwrap_or(Ordering::Equal)
    });
    Ok(predictions)
}

/// Context probabilities, normalized over the included contexts
fn context_confidences(
    predictors: &Predictors,
    tokens: &[String],
    contexts: &[ContextName],
) -> Result<Vec<(ContextName, f32)>> {
    let raw_confidences: Vec<f32> = match predictors.ctx_classifier.as_ref() {
        Some(ctx_classifier) => {
            let confidences: HashMap<String, f32> = ctx_classifier
                .predict(tokens)?
                .into_iter()
                .map(|label| (label.label, label.confidence))
                .collect();
            contexts
                .iter()
                .map(|context| confidences.get(context).cloned().unwrap_or(0.))
                .collect()
        }
        None => vec![1.; contexts.len()],
    };
    let total: f32 = raw_confidences.iter().sum();
    Ok(contexts
        .iter()
        .cloned()
        .zip(raw_confidences.into_iter())
        .map(|(context, confidence)| {
            if total > 0. {
                (context, confidence / total)
            } else {
                (context, 1. / contexts.len() as f32)
            }
        })
        .collect())
}

/// Merges consecutive tokens tagged with the same slot
fn group_slots(sentence: &str, tokens: &[Token], tags: Vec<Option<SlotName>>) -> Vec<SlotPrediction> {
    let mut slots: Vec<SlotPrediction> = vec![];
    let mut previous_tag: Option<SlotName> = None;
    for (token, tag) in tokens.iter().zip(tags.into_iter()) {
        if let Some(slot_name) = tag.as_ref() {
            let extends_previous = previous_tag.as_ref() == Some(slot_name);
            match slots.last_mut() {
                Some(slot) if extends_previous => {
                    slot.char_range.end = token.char_range.end;
                    slot.source = substring_with_char_range(sentence, &slot.char_range);
                }
                _ => slots.push(SlotPrediction {
                    name: slot_name.clone(),
                    source: substring_with_char_range(sentence, &token.char_range),
                    char_range: token.char_range.clone(),
                }),
            }
        }
        previous_tag = tag;
    }
    slots
}
