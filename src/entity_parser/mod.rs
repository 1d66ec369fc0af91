pub mod cache;
pub mod extraction;
pub mod normalization;
pub mod patterns;

pub use self::cache::{EntityCache, EntityCacheDump, EntityMatch, OccurrenceCache, SharedEntityCache};
pub use self::extraction::{extract_list_entities, extract_pattern_entities, ExtractedEntity};
pub use self::normalization::{normalize_entities, NormalizedEntities};
pub use self::patterns::is_pattern_valid;
