use std::collections::BTreeMap;

use crate::models::{ListEntityModel, Model, TrainArtefacts};
use crate::utils::ContextName;

/// Overlays the artefacts of a partial training over those of the previous
/// model. The incoming model provides input and output, and wins on every
/// context it retrained.
pub fn merge_models(previous: &Model, incoming: Model) -> Model {
    let mut merged = incoming;
    match (previous.data.artefacts.as_ref(), merged.data.artefacts.take()) {
        (Some(previous_artefacts), Some(incoming_artefacts)) => {
            merged.data.artefacts = Some(merge_artefacts(previous_artefacts, incoming_artefacts));
            merged
        }
        _ => previous.clone(),
    }
}

pub fn merge_artefacts(previous: &TrainArtefacts, incoming: TrainArtefacts) -> TrainArtefacts {
    let TrainArtefacts {
        list_entities,
        ctx_model,
        intent_model_by_ctx,
        oos_model,
        slots_model,
    } = incoming;
    TrainArtefacts {
        list_entities: merge_list_entities(&previous.list_entities, list_entities),
        ctx_model: ctx_model.or_else(|| previous.ctx_model.clone()),
        intent_model_by_ctx: overlay(&previous.intent_model_by_ctx, intent_model_by_ctx),
        oos_model: overlay(&previous.oos_model, oos_model),
        // Binary blob, replaced as a whole
        slots_model,
    }
}

fn overlay<V: Clone>(
    base: &BTreeMap<ContextName, V>,
    top: BTreeMap<ContextName, V>,
) -> BTreeMap<ContextName, V> {
    let mut merged = base.clone();
    merged.extend(top);
    merged
}

/// List entities are rebuilt from the whole entity set on every training, so
/// the incoming list is authoritative. An unchanged entity keeps the cache it
/// had already warmed.
fn merge_list_entities(
    previous: &[ListEntityModel],
    incoming: Vec<ListEntityModel>,
) -> Vec<ListEntityModel> {
    incoming
        .into_iter()
        .map(|mut entity| {
            if entity.cache.is_none() {
                entity.cache = previous
                    .iter()
                    .find(|prev| {
                        prev.entity_name == entity.entity_name
                            && prev.mappings_tokens == entity.mappings_tokens
                            && prev.fuzzy_tolerance == entity.fuzzy_tolerance
                    })
                    .and_then(|prev| prev.cache.clone());
            }
            entity
        })
        .collect()
}
