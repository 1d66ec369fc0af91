use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;

pub type IntentName = String;
pub type SlotName = String;
pub type EntityName = String;
pub type ContextName = String;
pub type LanguageCode = String;
pub type BotId = String;

lazy_static! {
    static ref TOKEN_REGEX: Regex = Regex::new(r"\w+|[^\w\s]").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub value: String,
    pub char_range: Range<usize>,
}

/// Splits `input` into lowercased word and punctuation tokens, keeping the
/// character range of each token in the original string
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = vec![];
    let mut last_byte = 0;
    let mut last_char = 0;
    for matched in TOKEN_REGEX.find_iter(input) {
        let start = last_char + input[last_byte..matched.start()].chars().count();
        let end = start + matched.as_str().chars().count();
        tokens.push(Token {
            value: matched.as_str().to_lowercase(),
            char_range: start..end,
        });
        last_byte = matched.end();
        last_char = end;
    }
    tokens
}

pub fn tokenize_light(input: &str) -> Vec<String> {
    tokenize(input).into_iter().map(|token| token.value).collect()
}

pub fn substring_with_char_range(text: &str, range: &Range<usize>) -> String {
    text.chars()
        .skip(range.start)
        .take(range.end.saturating_sub(range.start))
        .collect()
}

pub fn ranges_overlap(lhs: &Range<usize>, rhs: &Range<usize>) -> bool {
    lhs.start < rhs.end && rhs.start < lhs.end
}

pub fn deduplicate_overlapping_items<I, O, S, K>(
    items: Vec<I>,
    overlap: O,
    sort_key_fn: S,
) -> Vec<I>
where
    O: Fn(&I, &I) -> bool,
    S: FnMut(&I) -> K,
    K: Ord,
{
    let mut sorted_items = items;
    sorted_items.sort_by_key(sort_key_fn);
    let mut deduplicated_items: Vec<I> = Vec::with_capacity(sorted_items.len());
    for item in sorted_items {
        if !deduplicated_items
            .iter()
            .any(|dedup_item| overlap(dedup_item, &item))
        {
            deduplicated_items.push(item);
        }
    }
    deduplicated_items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_keeps_char_ranges() {
        // Given
        let input = "Héllo, wörld!";

        // When
        let tokens = tokenize(input);

        // Then
        let expected_tokens = vec![
            Token {
                value: "héllo".to_string(),
                char_range: 0..5,
            },
            Token {
                value: ",".to_string(),
                char_range: 5..6,
            },
            Token {
                value: "wörld".to_string(),
                char_range: 7..12,
            },
            Token {
                value: "!".to_string(),
                char_range: 12..13,
            },
        ];
        assert_eq!(expected_tokens, tokens);
    }

    #[test]
    fn test_substring_with_char_range() {
        assert_eq!("wörld", substring_with_char_range("héllo wörld", &(6..11)));
    }

    #[test]
    fn test_deduplicate_items_works() {
        // Given
        let items = vec![0..3, 4..8, 0..8, 9..13];

        fn sort_key(rng: &Range<usize>) -> i32 {
            -(rng.clone().count() as i32)
        }

        // When
        let mut dedup_items = deduplicate_overlapping_items(items, ranges_overlap, sort_key);
        dedup_items.sort_by_key(|item| item.start);

        // Then
        let expected_items = vec![0..8, 9..13];
        assert_eq!(expected_items, dedup_items);
    }
}
