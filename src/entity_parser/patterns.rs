use regex::{Regex, RegexBuilder};

use crate::errors::*;
use crate::models::PatternEntity;

/// A pattern is usable when it is non-empty and compiles
pub fn is_pattern_valid(pattern: &str) -> bool {
    !pattern.is_empty() && Regex::new(pattern).is_ok()
}

pub fn build_pattern_regex(entity: &PatternEntity) -> Result<Regex> {
    Ok(RegexBuilder::new(&entity.pattern)
        .case_insensitive(!entity.match_case)
        .build()?)
}
