//! Training and prediction pipelines plugged into the engine

pub mod predict;
pub mod process_intents;
pub mod training;

use std::sync::Arc;

use crate::errors::*;
use crate::models::{Intent, ListEntityModel, Model, ProcessedIntent, TrainInput};
use crate::predictors::PredictorsByLang;
use crate::toolkit::Tools;

pub use self::predict::{
    ContextualPredictPipeline, IntentPrediction, PredictInput, PredictOutput, SlotPrediction,
};
pub use self::process_intents::UtteranceProcessor;
pub use self::training::{ContextualTrainer, IN_SCOPE_LABEL, OUT_OF_SCOPE_LABEL};

pub trait Trainer: Send + Sync {
    /// Trains the contexts listed in `input.ctx_to_train`. The returned model
    /// is not hashed yet.
    fn train(&self, input: &TrainInput, tools: &Tools) -> Result<Model>;
}

pub trait IntentProcessor: Send + Sync {
    fn process_intents(
        &self,
        intents: &[Intent],
        language_code: &str,
        list_entities: &[ListEntityModel],
        tools: &Tools,
    ) -> Result<Vec<ProcessedIntent>>;
}

pub trait PredictPipeline: Send + Sync {
    fn predict(
        &self,
        input: &PredictInput,
        tools: &Tools,
        predictors: &PredictorsByLang,
    ) -> Result<PredictOutput>;
}

pub struct NluPipelines {
    pub trainer: Arc<dyn Trainer>,
    pub intent_processor: Arc<dyn IntentProcessor>,
    pub predict_pipeline: Arc<dyn PredictPipeline>,
}

impl Default for NluPipelines {
    fn default() -> Self {
        Self {
            trainer: Arc::new(ContextualTrainer::default()),
            intent_processor: Arc::new(UtteranceProcessor),
            predict_pipeline: Arc::new(ContextualPredictPipeline),
        }
    }
}
