pub mod configurations;
mod context_diff;
pub mod entity_parser;
pub mod errors;
mod hashing;
mod merge;
pub mod models;
mod nlu_engine;
pub mod pipeline;
mod predictors;
mod state;
#[cfg(test)]
mod testutils;
pub mod toolkit;
mod utils;

pub const MODEL_VERSION: &str = "1.0.0";

pub use crate::configurations::*;
pub use crate::context_diff::{select_contexts_to_train, ContextSelection};
pub use crate::errors::*;
pub use crate::hashing::{compute_context_hash, compute_list_entity_hash, compute_model_hash};
pub use crate::merge::merge_models;
pub use crate::models::*;
pub use crate::nlu_engine::{NluEngine, NluEngineBuilder};
pub use crate::predictors::{compile_predictors, Predictors, PredictorsByLang};
pub use crate::state::{LanguageLocks, LanguageState, LanguageStateStore};
pub use crate::toolkit::Tools;
pub use crate::utils::{
    tokenize, tokenize_light, BotId, ContextName, EntityName, IntentName, LanguageCode, SlotName,
    Token,
};
