use std::cmp::min;
use std::ops::Range;

use serde::Serialize;

use super::cache::{EntityCache, EntityMatch};
use super::patterns::build_pattern_regex;
use crate::errors::*;
use crate::models::{ListEntityModel, PatternEntity};
use crate::utils::{deduplicate_overlapping_items, ranges_overlap, tokenize, EntityName, Token};

const MIN_FUZZY_LENGTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedEntity {
    pub entity_name: EntityName,
    pub value: String,
    pub source: String,
    pub char_range: Range<usize>,
    pub confidence: f32,
    pub sensitive: bool,
}

pub fn extract_pattern_entities(
    sentence: &str,
    pattern_entities: &[PatternEntity],
) -> Result<Vec<ExtractedEntity>> {
    let mut extracted = vec![];
    for entity in pattern_entities {
        let regex = build_pattern_regex(entity)?;
        for matched in regex.find_iter(sentence) {
            if matched.as_str().is_empty() {
                continue;
            }
            let start = sentence[..matched.start()].chars().count();
            let end = start + matched.as_str().chars().count();
            extracted.push(ExtractedEntity {
                entity_name: entity.name.clone(),
                value: matched.as_str().to_string(),
                source: matched.as_str().to_string(),
                char_range: start..end,
                confidence: 1.0,
                sensitive: entity.sensitive,
            });
        }
    }
    Ok(extracted)
}

/// Finds list entity values in the sentence, reusing the entity occurrence
/// cache when the model carries a live one
pub fn extract_list_entities(
    sentence: &str,
    list_entities: &[ListEntityModel],
) -> Result<Vec<ExtractedEntity>> {
    let mut extracted = vec![];
    for entity in list_entities {
        let matches = match entity.cache.as_ref() {
            Some(EntityCache::Live(cache)) => {
                cache.try_cache(sentence, |_| Ok(find_occurrences(sentence, entity)))?
            }
            _ => find_occurrences(sentence, entity),
        };
        extracted.extend(matches.into_iter().map(|entity_match| ExtractedEntity {
            entity_name: entity.entity_name.clone(),
            value: entity_match.value,
            source: entity_match.source,
            char_range: entity_match.char_range,
            confidence: entity_match.confidence,
            sensitive: entity.sensitive,
        }));
    }
    Ok(extracted)
}

fn find_occurrences(sentence: &str, entity: &ListEntityModel) -> Vec<EntityMatch> {
    let tokens = tokenize(sentence);
    let mut candidates = vec![];
    for (value, synonyms) in entity.mappings_tokens.iter() {
        for synonym in synonyms.iter().filter(|synonym| !synonym.is_empty()) {
            if synonym.len() > tokens.len() {
                continue;
            }
            for window in tokens.windows(synonym.len()) {
                if let Some(confidence) =
                    match_confidence(window, synonym, entity.fuzzy_tolerance)
                {
                    let char_range = window[0].char_range.start..window[window.len() - 1].char_range.end;
                    candidates.push(EntityMatch {
                        value: value.clone(),
                        source: sentence
                            .chars()
                            .skip(char_range.start)
                            .take(char_range.end - char_range.start)
                            .collect(),
                        char_range,
                        confidence,
                    });
                }
            }
        }
    }
    let overlap = |lhs: &EntityMatch, rhs: &EntityMatch| ranges_overlap(&lhs.char_range, &rhs.char_range);
    // Longest, then most confident matches first
    let sort_key = |candidate: &EntityMatch| {
        (
            -(candidate.char_range.clone().count() as i64),
            -((candidate.confidence * 1000.) as i64),
        )
    };
    let mut matches = deduplicate_overlapping_items(candidates, overlap, sort_key);
    matches.sort_by_key(|entity_match| entity_match.char_range.start);
    matches
}

fn match_confidence(window: &[Token], synonym: &[String], fuzzy_tolerance: f32) -> Option<f32> {
    let candidate = window.iter().map(|token| token.value.as_str()).collect::<Vec<_>>().join(" ");
    let reference = synonym.join(" ");
    if candidate == reference {
        return Some(1.0);
    }
    if fuzzy_tolerance >= 1.0 || reference.chars().count() < MIN_FUZZY_LENGTH {
        return None;
    }
    let max_len = candidate.chars().count().max(reference.chars().count());
    let similarity = 1.0 - levenshtein_distance(&candidate, &reference) as f32 / max_len as f32;
    if similarity >= fuzzy_tolerance {
        Some(similarity)
    } else {
        None
    }
}

fn levenshtein_distance(lhs: &str, rhs: &str) -> usize {
    let rhs_chars: Vec<char> = rhs.chars().collect();
    let mut previous_row: Vec<usize> = (0..=rhs_chars.len()).collect();
    for (i, lhs_char) in lhs.chars().enumerate() {
        let mut current_row = vec![i + 1; rhs_chars.len() + 1];
        for (j, rhs_char) in rhs_chars.iter().enumerate() {
            let cost = if lhs_char == *rhs_char { 0 } else { 1 };
            current_row[j + 1] = min(
                min(previous_row[j + 1] + 1, current_row[j] + 1),
                previous_row[j] + cost,
            );
        }
        previous_row = current_row;
    }
    previous_row[rhs_chars.len()]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use maplit::btreemap;

    use super::*;
    use crate::entity_parser::cache::OccurrenceCache;

    fn city_entity(fuzzy_tolerance: f32) -> ListEntityModel {
        ListEntityModel {
            entity_name: "city".to_string(),
            fuzzy_tolerance,
            sensitive: false,
            mappings_tokens: btreemap! {
                "new york".to_string() => vec![
                    vec!["new".to_string(), "york".to_string()],
                    vec!["nyc".to_string()],
                ],
                "paris".to_string() => vec![vec!["paris".to_string()]],
            },
            cache: None,
        }
    }

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(0, levenshtein_distance("paris", "paris"));
        assert_eq!(1, levenshtein_distance("pariss", "paris"));
        assert_eq!(3, levenshtein_distance("kitten", "sitting"));
        assert_eq!(4, levenshtein_distance("", "york"));
    }

    #[test]
    fn test_extract_list_entities_exact_and_synonyms() {
        // Given
        let entities = vec![city_entity(1.0)];

        // When
        let extracted = extract_list_entities("From NYC to Paris", &entities).unwrap();

        // Then
        let expected = vec![
            ExtractedEntity {
                entity_name: "city".to_string(),
                value: "new york".to_string(),
                source: "NYC".to_string(),
                char_range: 5..8,
                confidence: 1.0,
                sensitive: false,
            },
            ExtractedEntity {
                entity_name: "city".to_string(),
                value: "paris".to_string(),
                source: "Paris".to_string(),
                char_range: 12..17,
                confidence: 1.0,
                sensitive: false,
            },
        ];
        assert_eq!(expected, extracted);
    }

    #[test]
    fn test_extract_list_entities_fuzzy() {
        // Given
        let strict = vec![city_entity(1.0)];
        let fuzzy = vec![city_entity(0.8)];

        // When
        let strict_extracted = extract_list_entities("fly to pariss", &strict).unwrap();
        let fuzzy_extracted = extract_list_entities("fly to pariss", &fuzzy).unwrap();

        // Then
        assert!(strict_extracted.is_empty());
        assert_eq!(1, fuzzy_extracted.len());
        assert_eq!("paris", fuzzy_extracted[0].value);
        assert!(fuzzy_extracted[0].confidence < 1.0);
    }

    #[test]
    fn test_extract_list_entities_fills_live_cache() {
        // Given
        let live = Arc::new(OccurrenceCache::new("city", "bot", 10));
        let mut entity = city_entity(1.0);
        entity.cache = Some(EntityCache::Live(live.clone()));

        // When
        extract_list_entities("to paris", &[entity]).unwrap();

        // Then
        assert_eq!(1, live.len());
    }

    #[test]
    fn test_cached_matches_keep_the_casing_of_each_sentence() {
        // Given
        let live = Arc::new(OccurrenceCache::new("city", "bot", 10));
        let mut entity = city_entity(1.0);
        entity.cache = Some(EntityCache::Live(live.clone()));
        let entities = vec![entity];

        // When
        let upper = extract_list_entities("fly to NYC", &entities).unwrap();
        let lower = extract_list_entities("fly to nyc", &entities).unwrap();
        let upper_again = extract_list_entities("fly to NYC", &entities).unwrap();

        // Then
        assert_eq!("NYC", upper[0].source);
        assert_eq!("nyc", lower[0].source);
        assert_eq!(upper, upper_again);
        assert_eq!("new york", lower[0].value);
        assert_eq!(2, live.len());
    }

    #[test]
    fn test_extract_pattern_entities() {
        // Given
        let entities = vec![PatternEntity {
            name: "ticket".to_string(),
            pattern: r"TCK-\d+".to_string(),
            examples: vec![],
            match_case: false,
            sensitive: true,
        }];

        // When
        let extracted = extract_pattern_entities("é tck-42 and TCK-7", &entities).unwrap();

        // Then
        let ranges: Vec<Range<usize>> = extracted.iter().map(|e| e.char_range.clone()).collect();
        assert_eq!(vec![2..8, 13..18], ranges);
        assert!(extracted.iter().all(|entity| entity.sensitive));
    }
}
