use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NluVersionInfo {
    pub nlu_version: String,
    #[serde(default)]
    pub lang_server_info: LanguageServerInfo,
}

impl Default for NluVersionInfo {
    fn default() -> Self {
        Self {
            nlu_version: crate::MODEL_VERSION.to_string(),
            lang_server_info: LanguageServerInfo::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageServerInfo {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub dim: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct TrainingOptions {
    #[serde(default)]
    pub force_train: bool,
}

impl TrainingOptions {
    pub fn force() -> Self {
        Self { force_train: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogRegConfig {
    pub epochs: usize,
    pub learning_rate: f32,
    pub l2_penalty: f32,
    pub sublinear_tf: bool,
}

impl Default for LogRegConfig {
    fn default() -> Self {
        Self {
            epochs: 300,
            learning_rate: 0.5,
            l2_penalty: 1e-3,
            sublinear_tf: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    pub max_clusters: usize,
    pub max_iterations: usize,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            max_clusters: 8,
            max_iterations: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct EntityCacheConfig {
    pub capacity: usize,
}

impl Default for EntityCacheConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}
