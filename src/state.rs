use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::errors::*;
use crate::models::Model;
use crate::predictors::{Predictors, PredictorsByLang};
use crate::utils::LanguageCode;

/// Loaded model of a language together with the predictors compiled from it.
/// Both are always swapped together.
pub struct LanguageState {
    pub model: Arc<Model>,
    pub predictors: Arc<Predictors>,
}

/// Per-language state of an engine. Entries are immutable snapshots which
/// are replaced as a whole, so readers always see a consistent pair.
#[derive(Default)]
pub struct LanguageStateStore {
    states: RwLock<HashMap<LanguageCode, Arc<LanguageState>>>,
}

impl LanguageStateStore {
    pub fn get(&self, language: &str) -> Result<Option<Arc<LanguageState>>> {
        Ok(self
            .states
            .read()
            .map_err(|e| NluError::PoisonedLock(format!("{}", e)))?
            .get(language)
            .cloned())
    }

    pub fn model(&self, language: &str) -> Result<Option<Arc<Model>>> {
        Ok(self.get(language)?.map(|state| state.model.clone()))
    }

    pub fn replace(&self, model: Model, predictors: Predictors) -> Result<()> {
        let language = model.language_code.clone();
        let state = Arc::new(LanguageState {
            model: Arc::new(model),
            predictors: Arc::new(predictors),
        });
        self.states
            .write()
            .map_err(|e| NluError::PoisonedLock(format!("{}", e)))?
            .insert(language, state);
        Ok(())
    }

    pub fn remove(&self, language: &str) -> Result<bool> {
        Ok(self
            .states
            .write()
            .map_err(|e| NluError::PoisonedLock(format!("{}", e)))?
            .remove(language)
            .is_some())
    }

    pub fn languages(&self) -> Result<Vec<LanguageCode>> {
        let mut languages: Vec<LanguageCode> = self
            .states
            .read()
            .map_err(|e| NluError::PoisonedLock(format!("{}", e)))?
            .keys()
            .cloned()
            .collect();
        languages.sort();
        Ok(languages)
    }

    pub fn predictors_by_lang(&self) -> Result<PredictorsByLang> {
        Ok(self
            .states
            .read()
            .map_err(|e| NluError::PoisonedLock(format!("{}", e)))?
            .iter()
            .map(|(language, state)| (language.clone(), state.predictors.clone()))
            .collect())
    }
}

#[cfg(test)]
impl LanguageStateStore {
    /// Leaves the store with a poisoned lock, as a panicking writer would
    pub fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _states = self.states.write().unwrap();
            panic!("writer panicked");
        }));
    }
}

/// One exclusive section per language, guarding train-then-load sequences
#[derive(Default)]
pub struct LanguageLocks {
    locks: Mutex<HashMap<LanguageCode, Arc<Mutex<()>>>>,
}

impl LanguageLocks {
    pub fn lock_for(&self, language: &str) -> Result<Arc<Mutex<()>>> {
        Ok(self
            .locks
            .lock()
            .map_err(|e| NluError::PoisonedLock(format!("{}", e)))?
            .entry(language.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }
}
