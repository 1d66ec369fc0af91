use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::configurations::NluVersionInfo;
use crate::errors::*;
use crate::models::{EntityDefinition, Intent, IntentDefinition, ListEntityModel};

#[derive(Serialize)]
struct ModelHashInput<'a> {
    intents: &'a [IntentDefinition],
    entities: &'a [EntityDefinition],
    version: &'a NluVersionInfo,
    language_code: &'a str,
}

/// Identity of a model: digest of the raw definitions it was trained from,
/// of the platform version and of the language
pub fn compute_model_hash(
    intent_defs: &[IntentDefinition],
    entity_defs: &[EntityDefinition],
    version: &NluVersionInfo,
    language_code: &str,
) -> Result<String> {
    sha256_hex(&ModelHashInput {
        intents: intent_defs,
        entities: entity_defs,
        version,
        language_code,
    })
}

pub fn compute_context_hash(intents: &[Intent], context: &str) -> Result<String> {
    let intents_of_ctx: Vec<&Intent> = intents
        .iter()
        .filter(|intent| intent.belongs_to(context))
        .collect();
    sha256_hex(&intents_of_ctx)
}

#[derive(Serialize)]
struct ListEntityHashInput<'a> {
    mappings_tokens: &'a BTreeMap<String, Vec<Vec<String>>>,
    fuzzy_tolerance: f32,
}

/// Digest of everything that decides which occurrences a list entity matches
pub fn compute_list_entity_hash(entity: &ListEntityModel) -> Result<String> {
    sha256_hex(&ListEntityHashInput {
        mappings_tokens: &entity.mappings_tokens,
        fuzzy_tolerance: entity.fuzzy_tolerance,
    })
}

fn sha256_hex<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let bytes = serde_json::to_vec(value)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{intent, intent_def};

    #[test]
    fn test_model_hash_is_stable_across_processes() {
        // Given
        let intent_defs = vec![intent_def("greet", &["global"], vec![("en", vec!["hi", "hello"])])];

        // When
        let hash = compute_model_hash(&intent_defs, &[], &NluVersionInfo::default(), "en").unwrap();

        // Then
        assert_eq!(
            "99af4fee841440f205263c11b8a8d8b27da5c36ebeb42e267e04818412220ee3",
            hash
        );
    }

    #[test]
    fn test_model_hash_depends_on_language_and_version() {
        // Given
        let intent_defs = vec![intent_def(
            "greet",
            &["global"],
            vec![("en", vec!["hi"]), ("fr", vec!["salut"])],
        )];
        let version = NluVersionInfo::default();
        let mut other_version = NluVersionInfo::default();
        other_version.lang_server_info.dim = 300;

        // When
        let en_hash = compute_model_hash(&intent_defs, &[], &version, "en").unwrap();
        let en_hash_again = compute_model_hash(&intent_defs, &[], &version, "en").unwrap();
        let fr_hash = compute_model_hash(&intent_defs, &[], &version, "fr").unwrap();
        let other_version_hash = compute_model_hash(&intent_defs, &[], &other_version, "en").unwrap();

        // Then
        assert_eq!(en_hash, en_hash_again);
        assert_ne!(en_hash, fr_hash);
        assert_ne!(en_hash, other_version_hash);
    }

    #[test]
    fn test_context_hash_only_covers_intents_of_context() {
        // Given
        let intents = vec![
            intent("greet", &["global"], &["hi"]),
            intent("book", &["travel"], &["book a flight"]),
        ];
        let edited_intents = vec![
            intent("greet", &["global"], &["hi"]),
            intent("book", &["travel"], &["book a train"]),
        ];

        // When / Then
        assert_eq!(
            compute_context_hash(&intents, "global").unwrap(),
            compute_context_hash(&edited_intents, "global").unwrap()
        );
        assert_ne!(
            compute_context_hash(&intents, "travel").unwrap(),
            compute_context_hash(&edited_intents, "travel").unwrap()
        );
        assert_ne!(
            compute_context_hash(&intents, "travel").unwrap(),
            compute_context_hash(&[], "travel").unwrap()
        );
    }

    #[test]
    fn test_list_entity_hash_follows_matching_content() {
        // Given
        let entity = ListEntityModel {
            entity_name: "city".to_string(),
            fuzzy_tolerance: 0.8,
            sensitive: false,
            mappings_tokens: maplit::btreemap! {
                "Paris".to_string() => vec![vec!["paris".to_string()]],
            },
            cache: None,
        };
        let mut sensitive = entity.clone();
        sensitive.sensitive = true;
        let mut with_synonym = entity.clone();
        with_synonym
            .mappings_tokens
            .insert("Lyon".to_string(), vec![vec!["lyon".to_string()]]);
        let mut stricter = entity.clone();
        stricter.fuzzy_tolerance = 1.0;

        // When
        let hash = compute_list_entity_hash(&entity).unwrap();

        // Then
        assert_eq!(hash, compute_list_entity_hash(&sensitive).unwrap());
        assert_ne!(hash, compute_list_entity_hash(&with_synonym).unwrap());
        assert_ne!(hash, compute_list_entity_hash(&stricter).unwrap());
    }
}
