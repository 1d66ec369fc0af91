use serde::{Deserialize, Serialize};

use crate::utils::LanguageCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    Idle,
    Training,
    Done,
    Canceled,
    Errored,
}

/// Progress handle owned by the caller of a training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSession {
    pub key: String,
    pub language: LanguageCode,
    pub status: TrainingStatus,
    pub progress: f32,
}

impl TrainingSession {
    pub fn new<K: Into<String>, L: Into<String>>(key: K, language: L) -> Self {
        Self {
            key: key.into(),
            language: language.into(),
            status: TrainingStatus::Training,
            progress: 0.0,
        }
    }

    pub fn completed(&self) -> Self {
        Self {
            status: TrainingStatus::Done,
            progress: 1.0,
            ..self.clone()
        }
    }
}
