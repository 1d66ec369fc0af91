use std::collections::BTreeMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::entity_parser::cache::EntityCache;
use crate::utils::{ContextName, EntityName};

/// Trained objects of a model. Classifier payloads are opaque serialized
/// strings shared behind an `Arc`, so untouched contexts keep pointing to
/// the very same payload after a partial retrain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainArtefacts {
    #[serde(default)]
    pub list_entities: Vec<ListEntityModel>,
    #[serde(default)]
    pub ctx_model: Option<ClassifierModel>,
    #[serde(default)]
    pub intent_model_by_ctx: BTreeMap<ContextName, ClassifierModel>,
    #[serde(default)]
    pub oos_model: BTreeMap<ContextName, ClassifierModel>,
    #[serde(default)]
    pub slots_model: SlotsModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassifierModel(Arc<str>);

impl ClassifierModel {
    pub fn new<S: Into<String>>(payload: S) -> Self {
        ClassifierModel(Arc::from(payload.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether both handles point to the same payload allocation
    pub fn ptr_eq(&self, other: &ClassifierModel) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Binary weights of the slot tagger. This is an atomic value: it is only
/// ever replaced as a whole, never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotsModel(Vec<u8>);

impl SlotsModel {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        SlotsModel(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SlotsModel {
    fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for SlotsModel {
    fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(SlotsModel)
            .map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEntityModel {
    pub entity_name: EntityName,
    pub fuzzy_tolerance: f32,
    pub sensitive: bool,
    /// Tokenized synonyms of each canonical value, the value itself included
    pub mappings_tokens: BTreeMap<String, Vec<Vec<String>>>,
    #[serde(default)]
    pub cache: Option<EntityCache>,
}
