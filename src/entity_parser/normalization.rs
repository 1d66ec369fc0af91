use std::collections::BTreeMap;

use log::debug;

use super::patterns::is_pattern_valid;
use crate::models::{EntityDefinition, EntityType, ListEntity, PatternEntity};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedEntities {
    pub list_entities: Vec<ListEntity>,
    pub pattern_entities: Vec<PatternEntity>,
}

pub fn normalize_entities(entity_defs: &[EntityDefinition]) -> NormalizedEntities {
    NormalizedEntities {
        list_entities: normalize_list_entities(entity_defs),
        pattern_entities: normalize_pattern_entities(entity_defs),
    }
}

pub fn normalize_list_entities(entity_defs: &[EntityDefinition]) -> Vec<ListEntity> {
    entity_defs
        .iter()
        .filter(|def| def.entity_type == EntityType::List)
        .map(|def| ListEntity {
            name: def.name.clone(),
            fuzzy_tolerance: def.fuzzy,
            sensitive: def.sensitive,
            synonyms: def
                .occurrences
                .iter()
                .map(|occurrence| (occurrence.name.clone(), occurrence.synonyms.clone()))
                .collect::<BTreeMap<_, _>>(),
        })
        .collect()
}

/// Invalid patterns are dropped silently
pub fn normalize_pattern_entities(entity_defs: &[EntityDefinition]) -> Vec<PatternEntity> {
    entity_defs
        .iter()
        .filter(|def| def.entity_type == EntityType::Pattern)
        .filter_map(|def| match def.pattern.as_ref() {
            Some(pattern) if is_pattern_valid(pattern) => Some(PatternEntity {
                name: def.name.clone(),
                pattern: pattern.clone(),
                // TODO: fill once EntityDefinition carries pattern examples
                examples: vec![],
                match_case: def.match_case,
                sensitive: def.sensitive,
            }),
            _ => {
                debug!("Skipping pattern entity '{}' with an invalid pattern", def.name);
                None
            }
        })
        .collect()
}
