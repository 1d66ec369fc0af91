use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::definitions::SlotDefinition;
use crate::utils::{BotId, ContextName, EntityName, IntentName, LanguageCode};

/// An intent restricted to the utterances of a single language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub name: IntentName,
    pub contexts: Vec<ContextName>,
    pub utterances: Vec<String>,
    #[serde(default)]
    pub slot_definitions: Vec<SlotDefinition>,
}

impl Intent {
    pub fn belongs_to(&self, context: &str) -> bool {
        self.contexts.iter().any(|ctx| ctx == context)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListEntity {
    pub name: EntityName,
    pub fuzzy_tolerance: f32,
    pub sensitive: bool,
    pub synonyms: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEntity {
    pub name: EntityName,
    pub pattern: String,
    #[serde(default)]
    pub examples: Vec<String>,
    pub match_case: bool,
    pub sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainInput {
    pub bot_id: BotId,
    pub language_code: LanguageCode,
    pub list_entities: Vec<ListEntity>,
    pub pattern_entities: Vec<PatternEntity>,
    pub contexts: Vec<ContextName>,
    pub intents: Vec<Intent>,
    pub ctx_to_train: Vec<ContextName>,
}

impl TrainInput {
    pub fn utterances_count(&self) -> usize {
        self.intents
            .iter()
            .map(|intent| intent.utterances.len())
            .sum()
    }
}
