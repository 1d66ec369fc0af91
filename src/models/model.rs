use serde::{Deserialize, Serialize};

use super::artefacts::TrainArtefacts;
use super::definitions::SlotDefinition;
use super::train_input::TrainInput;
use crate::utils::{ContextName, IntentName, LanguageCode, SlotName};

/// Unit of persistence and of loading. Two models are interchangeable as
/// soon as their hashes are equal, whatever their content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub language_code: LanguageCode,
    pub success: bool,
    #[serde(default)]
    pub hash: String,
    pub data: ModelData,
}

impl Model {
    pub fn has_same_hash(&self, other: &Model) -> bool {
        !self.hash.is_empty() && !other.hash.is_empty() && self.hash == other.hash
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelData {
    pub input: TrainInput,
    #[serde(default)]
    pub output: Option<TrainOutput>,
    #[serde(default)]
    pub artefacts: Option<TrainArtefacts>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainOutput {
    pub intents: Vec<ProcessedIntent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedIntent {
    pub name: IntentName,
    pub contexts: Vec<ContextName>,
    #[serde(default)]
    pub slot_definitions: Vec<SlotDefinition>,
    pub utterances: Vec<ProcessedUtterance>,
}

impl ProcessedIntent {
    pub fn belongs_to(&self, context: &str) -> bool {
        self.contexts.iter().any(|ctx| ctx == context)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedUtterance {
    pub text: String,
    pub tokens: Vec<TaggedToken>,
}

impl ProcessedUtterance {
    pub fn token_values(&self) -> Vec<String> {
        self.tokens.iter().map(|token| token.value.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedToken {
    pub value: String,
    #[serde(default)]
    pub slot: Option<SlotName>,
}
