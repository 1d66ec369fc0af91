use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::utils::{ContextName, EntityName, IntentName, LanguageCode, SlotName};

/// Raw intent definition as authored, with utterances for every language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDefinition {
    pub name: IntentName,
    pub contexts: Vec<ContextName>,
    #[serde(default)]
    pub utterances: BTreeMap<LanguageCode, Vec<String>>,
    #[serde(default)]
    pub slots: Vec<SlotDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotDefinition {
    pub name: SlotName,
    #[serde(default)]
    pub entities: Vec<EntityName>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    System,
    List,
    Pattern,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: EntityName,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub fuzzy: f32,
    #[serde(default)]
    pub match_case: bool,
    #[serde(default)]
    pub occurrences: Vec<EntityOccurrence>,
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityOccurrence {
    pub name: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_definitions() {
        // Given
        let intent_data = r#"{
            "name": "book_flight",
            "contexts": ["travel"],
            "utterances": { "en": ["book a flight to [paris](destination)"] },
            "slots": [{ "name": "destination", "entities": ["city"] }]
        }"#;
        let entity_data = r#"{
            "name": "city",
            "type": "list",
            "fuzzy": 0.8,
            "occurrences": [{ "name": "paris", "synonyms": ["ville lumière"] }]
        }"#;

        // When
        let intent: IntentDefinition = serde_json::from_str(intent_data).unwrap();
        let entity: EntityDefinition = serde_json::from_str(entity_data).unwrap();

        // Then
        assert_eq!(vec!["travel".to_string()], intent.contexts);
        assert_eq!(1, intent.utterances["en"].len());
        assert_eq!("destination", intent.slots[0].name);
        assert_eq!(EntityType::List, entity.entity_type);
        assert!(!entity.match_case);
        assert_eq!(None, entity.pattern);
        assert_eq!(vec!["ville lumière".to_string()], entity.occurrences[0].synonyms);
    }
}
