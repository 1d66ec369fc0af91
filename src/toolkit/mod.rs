//! Pluggable machine learning collaborators used by the engine, along with
//! reference implementations of each of them

pub mod cache_manager;
pub mod featurizer;
pub mod kmeans;
pub mod logreg;
pub mod progress;
pub mod slot_tagger;

use std::sync::Arc;

use serde::Serialize;

use crate::configurations::{EntityCacheConfig, KMeansConfig, LogRegConfig};
use crate::errors::*;
use crate::models::{ClassifierModel, ProcessedIntent, SlotsModel};
use crate::utils::SlotName;

pub use self::cache_manager::{CacheManager, InMemoryCacheManager};
pub use self::kmeans::{ClusterTable, KMeansClusterer};
pub use self::logreg::LogRegClassifierFactory;
pub use self::progress::{LogProgressReporter, ProgressReporter};
pub use self::slot_tagger::DictionarySlotTaggerFactory;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Label {
    pub label: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub tokens: Vec<String>,
    pub label: String,
}

impl TrainingSample {
    pub fn new<S: Into<String>>(tokens: Vec<String>, label: S) -> Self {
        Self {
            tokens,
            label: label.into(),
        }
    }
}

pub trait Classifier: Send + Sync {
    /// Labels sorted by decreasing confidence
    fn predict(&self, tokens: &[String]) -> Result<Vec<Label>>;
}

pub trait ClassifierFactory: Send + Sync {
    fn train(&self, samples: &[TrainingSample]) -> Result<ClassifierModel>;
    fn load(&self, model: &ClassifierModel) -> Result<Box<dyn Classifier>>;
}

pub trait SlotTagger: Send + Sync {
    /// Returns one optional slot per token
    fn tag(&self, intent: &str, tokens: &[String]) -> Result<Vec<Option<SlotName>>>;
}

pub trait SlotTaggerFactory: Send + Sync {
    fn train(&self, intents: &[ProcessedIntent]) -> Result<SlotsModel>;
    fn load(&self, model: &SlotsModel) -> Result<Box<dyn SlotTagger>>;
}

pub trait Clusterer: Send + Sync {
    fn compute_clusters(&self, intents: &[ProcessedIntent]) -> Result<ClusterTable>;
}

/// Shared toolset handed to every engine operation
pub struct Tools {
    pub classifier_factory: Arc<dyn ClassifierFactory>,
    pub slot_tagger_factory: Arc<dyn SlotTaggerFactory>,
    pub clusterer: Arc<dyn Clusterer>,
    pub cache_manager: Arc<dyn CacheManager>,
    pub progress_reporter: Arc<dyn ProgressReporter>,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            classifier_factory: Arc::new(LogRegClassifierFactory::new(LogRegConfig::default())),
            slot_tagger_factory: Arc::new(DictionarySlotTaggerFactory),
            clusterer: Arc::new(KMeansClusterer::new(KMeansConfig::default())),
            cache_manager: Arc::new(InMemoryCacheManager::new(EntityCacheConfig::default())),
            progress_reporter: Arc::new(LogProgressReporter),
        }
    }
}

impl Tools {
    pub fn classifier_factory<F: ClassifierFactory + 'static>(mut self, factory: F) -> Self {
        self.classifier_factory = Arc::new(factory);
        self
    }

    pub fn slot_tagger_factory<F: SlotTaggerFactory + 'static>(mut self, factory: F) -> Self {
        self.slot_tagger_factory = Arc::new(factory);
        self
    }

    pub fn clusterer<C: Clusterer + 'static>(mut self, clusterer: C) -> Self {
        self.clusterer = Arc::new(clusterer);
        self
    }

    pub fn cache_manager<C: CacheManager + 'static>(mut self, cache_manager: C) -> Self {
        self.cache_manager = Arc::new(cache_manager);
        self
    }

    pub fn progress_reporter<P: ProgressReporter + 'static>(mut self, reporter: P) -> Self {
        self.progress_reporter = Arc::new(reporter);
        self
    }
}
