use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use itertools::Itertools;
use ndarray::prelude::*;

use crate::errors::*;
use crate::models::*;
use crate::pipeline::{ContextualTrainer, Trainer};
use crate::toolkit::{
    Classifier, ClassifierFactory, LogRegClassifierFactory, ProgressReporter, Tools,
    TrainingSample,
};

pub fn assert_epsilon_eq_array1(a: &Array1<f32>, b: &Array1<f32>, epsilon: f32) {
    assert_eq!(a.dim(), b.dim());
    for (index, elem_a) in a.indexed_iter() {
        assert!(epsilon_eq(*elem_a, b[index], epsilon))
    }
}

pub fn epsilon_eq(a: f32, b: f32, epsilon: f32) -> bool {
    let diff = a - b;
    diff < epsilon && diff > -epsilon
}

pub fn tokens(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub fn intent(name: &str, contexts: &[&str], utterances: &[&str]) -> Intent {
    Intent {
        name: name.to_string(),
        contexts: tokens(contexts),
        utterances: tokens(utterances),
        slot_definitions: vec![],
    }
}

pub fn intent_def(
    name: &str,
    contexts: &[&str],
    utterances: Vec<(&str, Vec<&str>)>,
) -> IntentDefinition {
    IntentDefinition {
        name: name.to_string(),
        contexts: tokens(contexts),
        utterances: utterances
            .into_iter()
            .map(|(language, utterances)| (language.to_string(), tokens(&utterances)))
            .collect::<BTreeMap<_, _>>(),
        slots: vec![],
    }
}

pub fn list_entity_def(name: &str, occurrences: Vec<(&str, Vec<&str>)>) -> EntityDefinition {
    EntityDefinition {
        name: name.to_string(),
        entity_type: EntityType::List,
        sensitive: false,
        fuzzy: 0.8,
        match_case: false,
        occurrences: occurrences
            .into_iter()
            .map(|(value, synonyms)| EntityOccurrence {
                name: value.to_string(),
                synonyms: tokens(&synonyms),
            })
            .collect(),
        pattern: None,
    }
}

pub fn pattern_entity_def(name: &str, pattern: &str) -> EntityDefinition {
    EntityDefinition {
        name: name.to_string(),
        entity_type: EntityType::Pattern,
        sensitive: false,
        fuzzy: 0.,
        match_case: false,
        occurrences: vec![],
        pattern: Some(pattern.to_string()),
    }
}

/// Training input of a single language where every context gets trained
pub fn train_input(language: &str, intents: Vec<Intent>) -> TrainInput {
    let contexts: Vec<String> = intents
        .iter()
        .flat_map(|intent| intent.contexts.iter().cloned())
        .unique()
        .collect();
    TrainInput {
        bot_id: "bot".to_string(),
        language_code: language.to_string(),
        list_entities: vec![],
        pattern_entities: vec![],
        contexts: contexts.clone(),
        intents,
        ctx_to_train: contexts,
    }
}

pub fn empty_model(language: &str) -> Model {
    Model {
        language_code: language.to_string(),
        success: true,
        hash: String::new(),
        data: ModelData {
            input: train_input(language, vec![]),
            output: None,
            artefacts: None,
        },
    }
}

/// Logistic regression factory counting how many classifiers it trains and
/// loads
#[derive(Default)]
pub struct CountingClassifierFactory {
    inner: LogRegClassifierFactory,
    pub trainings: Arc<AtomicUsize>,
    pub loads: Arc<AtomicUsize>,
}

impl ClassifierFactory for CountingClassifierFactory {
    fn train(&self, samples: &[TrainingSample]) -> Result<ClassifierModel> {
        self.trainings.fetch_add(1, Ordering::SeqCst);
        self.inner.train(samples)
    }

    fn load(&self, model: &ClassifierModel) -> Result<Box<dyn Classifier>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(model)
    }
}

/// Trainer recording its inputs and producing one distinct placeholder
/// payload per trained context
pub struct MockTrainer {
    success: bool,
    pub inputs: Arc<Mutex<Vec<TrainInput>>>,
}

impl MockTrainer {
    pub fn new(success: bool) -> Self {
        Self {
            success,
            inputs: Arc::new(Mutex::new(vec![])),
        }
    }
}

impl Trainer for MockTrainer {
    fn train(&self, input: &TrainInput, _tools: &Tools) -> Result<Model> {
        let mut inputs = self
            .inputs
            .lock()
            .map_err(|e| NluError::PoisonedLock(format!("{}", e)))?;
        inputs.push(input.clone());
        let run = inputs.len();
        let payloads = |kind: &str| {
            input
                .ctx_to_train
                .iter()
                .map(|ctx| {
                    (
                        ctx.clone(),
                        ClassifierModel::new(format!("{}-{}-{}", kind, ctx, run)),
                    )
                })
                .collect::<BTreeMap<_, _>>()
        };
        Ok(Model {
            language_code: input.language_code.clone(),
            success: self.success,
            hash: String::new(),
            data: ModelData {
                input: input.clone(),
                output: None,
                artefacts: Some(TrainArtefacts {
                    list_entities: vec![],
                    ctx_model: None,
                    intent_model_by_ctx: payloads("intent"),
                    oos_model: payloads("oos"),
                    slots_model: SlotsModel::from_bytes(vec![run as u8]),
                }),
            },
        })
    }
}

/// Contextual trainer slowed down so that overlapping trainings get
/// noticed. It records the highest number of trainings seen running at once.
#[derive(Default)]
pub struct OverlapRecordingTrainer {
    inner: ContextualTrainer,
    running: AtomicUsize,
    pub trainings: Arc<AtomicUsize>,
    pub max_running: Arc<AtomicUsize>,
}

impl Trainer for OverlapRecordingTrainer {
    fn train(&self, input: &TrainInput, tools: &Tools) -> Result<Model> {
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(running, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        let model = self.inner.train(input, tools);
        self.trainings.fetch_add(1, Ordering::SeqCst);
        self.running.fetch_sub(1, Ordering::SeqCst);
        model
    }
}

#[derive(Default)]
pub struct RecordingProgressReporter {
    pub reports: Arc<Mutex<Vec<(String, String, TrainingSession)>>>,
}

impl ProgressReporter for RecordingProgressReporter {
    fn report_training_progress(&self, bot_id: &str, message: &str, session: &TrainingSession) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push((bot_id.to_string(), message.to_string(), session.clone()));
        }
    }
}
