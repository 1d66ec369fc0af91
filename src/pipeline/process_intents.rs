use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::*;
use crate::models::{Intent, ListEntityModel, ProcessedIntent, ProcessedUtterance, TaggedToken};
use crate::pipeline::IntentProcessor;
use crate::toolkit::Tools;
use crate::utils::{tokenize_light, SlotName};

lazy_static! {
    static ref SLOT_MARKUP_REGEX: Regex = Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap();
}

/// Turns raw utterances, where slots are annotated as `[text](slot)`, into
/// tagged token sequences
#[derive(Debug, Clone, Copy, Default)]
pub struct UtteranceProcessor;

impl IntentProcessor for UtteranceProcessor {
    fn process_intents(
        &self,
        intents: &[Intent],
        _language_code: &str,
        _list_entities: &[ListEntityModel],
        _tools: &Tools,
    ) -> Result<Vec<ProcessedIntent>> {
        Ok(intents
            .iter()
            .map(|intent| ProcessedIntent {
                name: intent.name.clone(),
                contexts: intent.contexts.clone(),
                slot_definitions: intent.slot_definitions.clone(),
                utterances: intent
                    .utterances
                    .iter()
                    .map(|utterance| process_utterance(utterance))
                    .collect(),
            })
            .collect())
    }
}

pub fn process_utterance(utterance: &str) -> ProcessedUtterance {
    let mut text = String::with_capacity(utterance.len());
    let mut tokens = vec![];
    let mut last_end = 0;
    for captures in SLOT_MARKUP_REGEX.captures_iter(utterance) {
        let (whole, slot_text, slot_name) = match (captures.get(0), captures.get(1), captures.get(2)) {
            (Some(whole), Some(slot_text), Some(slot_name)) => (whole, slot_text, slot_name),
            _ => continue,
        };
        push_segment(&utterance[last_end..whole.start()], None, &mut text, &mut tokens);
        push_segment(
            slot_text.as_str(),
            Some(slot_name.as_str().trim().to_string()),
            &mut text,
            &mut tokens,
        );
        last_end = whole.end();
    }
    push_segment(&utterance[last_end..], None, &mut text, &mut tokens);
    ProcessedUtterance { text, tokens }
}

fn push_segment(
    segment: &str,
    slot: Option<SlotName>,
    text: &mut String,
    tokens: &mut Vec<TaggedToken>,
) {
    text.push_str(segment);
    tokens.extend(tokenize_light(segment).into_iter().map(|value| TaggedToken {
        value,
        slot: slot.clone(),
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::intent;

    fn tagged(value: &str, slot: Option<&str>) -> TaggedToken {
        TaggedToken {
            value: value.to_string(),
            slot: slot.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_process_utterance_extracts_slots() {
        // When
        let processed = process_utterance("Fly to [New York](destination) tomorrow");

        // Then
        assert_eq!("Fly to New York tomorrow", processed.text);
        let expected_tokens = vec![
            tagged("fly", None),
            tagged("to", None),
            tagged("new", Some("destination")),
            tagged("york", Some("destination")),
            tagged("tomorrow", None),
        ];
        assert_eq!(expected_tokens, processed.tokens);
    }

    #[test]
    fn test_process_intents_keeps_intent_metadata() {
        // Given
        let intents = vec![intent("greet", &["global"], &["hello", "hi there"])];

        // When
        let processed = UtteranceProcessor
            .process_intents(&intents, "en", &[], &Tools::default())
            .unwrap();

        // Then
        assert_eq!(1, processed.len());
        assert_eq!("greet", processed[0].name);
        assert_eq!(vec!["global".to_string()], processed[0].contexts);
        assert_eq!(vec!["hi", "there"], processed[0].utterances[1].token_values());
    }
}
