use std::collections::{BTreeMap, HashSet};

use failure::bail;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizerModel {
    pub vocab: BTreeMap<String, usize>,
    pub idf_diag: Vec<f32>,
    #[serde(default)]
    pub sublinear_tf: bool,
}

pub struct TfidfVectorizer {
    vocabulary: BTreeMap<String, usize>,
    idf_diag: Vec<f32>,
    sublinear_tf: bool,
}

impl TfidfVectorizer {
    pub fn new(model: TfidfVectorizerModel) -> Result<Self> {
        if model.vocab.len() != model.idf_diag.len() {
            bail!(NluError::MalformedArtefact(format!(
                "vocabulary has {} words but idf diagonal has {} values",
                model.vocab.len(),
                model.idf_diag.len()
            )));
        }
        if model.vocab.values().any(|index| *index >= model.idf_diag.len()) {
            bail!(NluError::MalformedArtefact(
                "vocabulary index out of bounds".to_string()
            ));
        }
        Ok(Self {
            vocabulary: model.vocab,
            idf_diag: model.idf_diag,
            sublinear_tf: model.sublinear_tf,
        })
    }

    /// Builds the vocabulary of the documents along with smoothed idf weights
    pub fn fit(documents: &[Vec<String>], sublinear_tf: bool) -> Self {
        let mut document_frequencies: BTreeMap<String, usize> = BTreeMap::new();
        for document in documents {
            let unique_tokens: HashSet<&String> = document.iter().collect();
            for token in unique_tokens {
                *document_frequencies.entry(token.clone()).or_insert(0) += 1;
            }
        }
        let nb_documents = documents.len() as f32;
        let mut vocabulary = BTreeMap::new();
        let mut idf_diag = Vec::with_capacity(document_frequencies.len());
        for (index, (token, frequency)) in document_frequencies.into_iter().enumerate() {
            vocabulary.insert(token, index);
            idf_diag.push(((1. + nb_documents) / (1. + frequency as f32)).ln() + 1.);
        }
        Self {
            vocabulary,
            idf_diag,
            sublinear_tf,
        }
    }

    pub fn model(&self) -> TfidfVectorizerModel {
        TfidfVectorizerModel {
            vocab: self.vocabulary.clone(),
            idf_diag: self.idf_diag.clone(),
            sublinear_tf: self.sublinear_tf,
        }
    }

    pub fn nb_features(&self) -> usize {
        self.idf_diag.len()
    }

    /// L2-normalized tf-idf vector of the tokens, unknown tokens are ignored
    pub fn transform(&self, tokens: &[String]) -> Array1<f32> {
        let mut features = Array1::<f32>::zeros(self.nb_features());
        for token in tokens {
            if let Some(index) = self.vocabulary.get(token) {
                features[*index] += 1.;
            }
        }
        if self.sublinear_tf {
            features.mapv_inplace(|tf| if tf > 0. { 1. + tf.ln() } else { 0. });
        }
        for (index, idf) in self.idf_diag.iter().enumerate() {
            features[index] *= *idf;
        }
        let norm = features.dot(&features).sqrt();
        if norm > 0. {
            features /= norm;
        }
        features
    }
}
