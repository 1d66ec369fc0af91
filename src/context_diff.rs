use crate::errors::*;
use crate::hashing::compute_context_hash;
use crate::models::Intent;
use crate::utils::ContextName;

#[derive(Debug, Clone, PartialEq)]
pub struct ContextSelection {
    pub train_all: bool,
    pub ctx_to_train: Vec<ContextName>,
}

impl ContextSelection {
    fn all(contexts: &[ContextName]) -> Self {
        Self {
            train_all: true,
            ctx_to_train: contexts.to_vec(),
        }
    }
}

/// Decides which contexts must be retrained by comparing, context by context,
/// the digest of the intents it contains before and after the edition
pub fn select_contexts_to_train(
    previous_intents: Option<&[Intent]>,
    current_intents: &[Intent],
    contexts: &[ContextName],
    force_train: bool,
) -> Result<ContextSelection> {
    let previous_intents = match previous_intents {
        Some(intents) if !force_train => intents,
        _ => return Ok(ContextSelection::all(contexts)),
    };

    let mut modified_contexts = vec![];
    for context in contexts {
        if context_has_changed(previous_intents, current_intents, context)? {
            modified_contexts.push(context.clone());
        }
    }

    if modified_contexts.len() == contexts.len() {
        Ok(ContextSelection::all(contexts))
    } else {
        Ok(ContextSelection {
            train_all: false,
            ctx_to_train: modified_contexts,
        })
    }
}

pub fn context_has_changed(
    previous_intents: &[Intent],
    current_intents: &[Intent],
    context: &str,
) -> Result<bool> {
    Ok(compute_context_hash(previous_intents, context)?
        != compute_context_hash(current_intents, context)?)
}
