use std::cmp::Ordering;
use std::collections::BTreeMap;

use failure::{bail, ResultExt};
use log::debug;
use ndarray::prelude::*;
use ndarray::concatenate;
use serde::{Deserialize, Serialize};

use crate::configurations::LogRegConfig;
use crate::errors::*;
use crate::models::ClassifierModel;
use crate::toolkit::featurizer::{TfidfVectorizer, TfidfVectorizerModel};
use crate::toolkit::{Classifier, ClassifierFactory, Label, TrainingSample};

/// The multiclass probability estimates are derived from binary (one-vs.-rest)
/// estimates by simple normalization
pub struct MulticlassLogisticRegression {
    /// matrix with shape (f + 1, c), the first row being the intercept
    /// ------------------------
    ///
    /// - f = number of features
    /// - c = number of classes
    weights: Array2<f32>,
}

impl MulticlassLogisticRegression {
    fn nb_features(&self) -> usize {
        // without intercept
        self.weights.dim().0 - 1
    }

    fn nb_classes(&self) -> usize {
        self.weights.dim().1
    }

    fn is_binary(&self) -> bool {
        self.nb_classes() == 1
    }
}

impl MulticlassLogisticRegression {
    pub fn new(intercept: Array1<f32>, weights: Array2<f32>) -> Result<Self> {
        let nb_classes = intercept.dim();
        let reshaped_intercept = intercept.into_shape((1, nb_classes))?;
        let weights_with_intercept =
            concatenate(Axis(0), &[reshaped_intercept.view(), weights.view()])?;
        Ok(Self {
            weights: weights_with_intercept,
        })
    }

    /// Fits one binary classifier per class with batch gradient descent
    ///
    /// `features` has shape (n, f) and `labels` holds one class index per row
    pub fn fit(
        features: &Array2<f32>,
        labels: &[usize],
        nb_classes: usize,
        config: &LogRegConfig,
    ) -> Result<Self> {
        let (nb_samples, nb_features) = features.dim();
        if nb_samples != labels.len() {
            bail!(NluError::InternalError(format!(
                "{} samples but {} labels",
                nb_samples,
                labels.len()
            )));
        }
        if let Some(label) = labels.iter().find(|label| **label >= nb_classes) {
            bail!(NluError::InternalError(format!(
                "label index {} out of bounds",
                label
            )));
        }
        let with_bias = concatenate(
            Axis(1),
            &[Array2::<f32>::ones((nb_samples, 1)).view(), features.view()],
        )?;
        let mut targets = Array2::<f32>::zeros((nb_samples, nb_classes));
        for (row, label) in labels.iter().enumerate() {
            targets[[row, *label]] = 1.;
        }

        let mut weights = Array2::<f32>::zeros((nb_features + 1, nb_classes));
        let scale = 1. / nb_samples.max(1) as f32;
        for _ in 0..config.epochs {
            let mut errors = with_bias.dot(&weights);
            errors.mapv_inplace(logit);
            errors -= &targets;
            let mut gradient = with_bias.t().dot(&errors) * scale;
            let mut penalty = &weights * config.l2_penalty;
            penalty.row_mut(0).fill(0.);
            gradient += &penalty;
            weights.scaled_add(-config.learning_rate, &gradient);
        }
        Ok(Self { weights })
    }

    pub fn intercept(&self) -> Array1<f32> {
        self.weights.row(0).to_owned()
    }

    /// Coefficients with shape (c, f)
    pub fn coefficients(&self) -> Array2<f32> {
        self.weights.slice(s![1.., ..]).t().to_owned()
    }

    pub fn run(
        &self,
        features: &ArrayView1<f32>,
        filtered_out_indexes: Option<Vec<usize>>,
    ) -> Result<Array1<f32>> {
        if features.dim() != self.nb_features() {
            bail!(NluError::MalformedArtefact(format!(
                "expected {} features but got {}",
                self.nb_features(),
                features.dim()
            )));
        }
        let mut with_bias = Array1::<f32>::ones(self.nb_features() + 1);
        with_bias.slice_mut(s![1..]).assign(features);
        let mut result = with_bias.dot(&self.weights);
        result.mapv_inplace(logit);
        if self.is_binary() {
            return Ok(arr1(&[1.0 - result[0], result[0]]));
        }
        if let Some(indexes) = filtered_out_indexes {
            if !indexes.is_empty() {
                for index in indexes {
                    result[index] = 0.0;
                }
                let divider = result.sum();
                result /= divider;
            }
        }
        Ok(result)
    }
}

fn logit(x: f32) -> f32 {
    1. / (1. + (-x).exp())
}

/// Serialized payload of a `ClassifierModel` produced by `LogRegClassifierFactory`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRegClassifierModel {
    pub labels: Vec<String>,
    pub vectorizer: Option<TfidfVectorizerModel>,
    pub intercept: Option<Vec<f32>>,
    /// matrix with shape (c, f)
    pub coeffs: Option<Vec<Vec<f32>>>,
}

pub struct LogRegClassifier {
    labels: Vec<String>,
    featurizer: Option<TfidfVectorizer>,
    logreg: Option<MulticlassLogisticRegression>,
}

impl LogRegClassifier {
    pub fn from_model(model: LogRegClassifierModel) -> Result<Self> {
        if model.labels.len() < 2 {
            return Ok(Self {
                labels: model.labels,
                featurizer: None,
                logreg: None,
            });
        }
        let (vectorizer, intercept, coeffs) = match (model.vectorizer, model.intercept, model.coeffs)
        {
            (Some(vectorizer), Some(intercept), Some(coeffs)) => (vectorizer, intercept, coeffs),
            _ => bail!(NluError::MalformedArtefact(format!(
                "classifier with labels {:?} has no weights",
                model.labels
            ))),
        };
        let featurizer = TfidfVectorizer::new(vectorizer)?;
        let nb_classes = intercept.len();
        let expected_classes = if nb_classes == 1 { 2 } else { nb_classes };
        if expected_classes != model.labels.len() || coeffs.len() != nb_classes {
            bail!(NluError::MalformedArtefact(format!(
                "{} labels do not match {} classes",
                model.labels.len(),
                nb_classes
            )));
        }
        if coeffs.iter().any(|row| row.len() != featurizer.nb_features()) {
            bail!(NluError::MalformedArtefact(
                "coefficients do not match the vectorizer vocabulary".to_string()
            ));
        }
        let flat_coeffs: Vec<f32> = coeffs.into_iter().flatten().collect();
        // weights are stored transposed
        let weights = Array2::from_shape_vec((nb_classes, featurizer.nb_features()), flat_coeffs)?
            .reversed_axes();
        let logreg = MulticlassLogisticRegression::new(Array1::from(intercept), weights)?;
        Ok(Self {
            labels: model.labels,
            featurizer: Some(featurizer),
            logreg: Some(logreg),
        })
    }
}

impl Classifier for LogRegClassifier {
    fn predict(&self, tokens: &[String]) -> Result<Vec<Label>> {
        let (featurizer, logreg) = match (self.featurizer.as_ref(), self.logreg.as_ref()) {
            (Some(featurizer), Some(logreg)) => (featurizer, logreg),
            _ => {
                return Ok(self
                    .labels
                    .iter()
                    .map(|label| Label {
                        label: label.clone(),
                        confidence: 1.0,
                    })
                    .collect())
            }
        };
        let features = featurizer.transform(tokens);
        let probabilities = logreg.run(&features.view(), None)?;
        let total = probabilities.sum();
        let mut labels: Vec<Label> = self
            .labels
            .iter()
            .zip(probabilities.iter())
            .map(|(label, proba)| Label {
                label: label.clone(),
                confidence: if total > 0. { *proba / total } else { 0. },
            })
            .collect();
        labels.sort_by(|lhs, rhs| {
            rhs.confidence
                .partial_cmp(&lhs.confidence)
                .unwrap_or(Ordering::Equal)
        });
        Ok(labels)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogRegClassifierFactory {
    config: LogRegConfig,
}

impl LogRegClassifierFactory {
    pub fn new(config: LogRegConfig) -> Self {
        Self { config }
    }
}

impl ClassifierFactory for LogRegClassifierFactory {
    fn train(&self, samples: &[TrainingSample]) -> Result<ClassifierModel> {
        let labels: Vec<String> = samples
            .iter()
            .map(|sample| sample.label.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        debug!(
            "Training logistic regression on {} samples with labels {:?}",
            samples.len(),
            labels
        );
        let model = if labels.len() < 2 {
            LogRegClassifierModel {
                labels,
                vectorizer: None,
                intercept: None,
                coeffs: None,
            }
        } else {
            let label_indexes: BTreeMap<&String, usize> = labels
                .iter()
                .enumerate()
                .map(|(index, label)| (label, index))
                .collect();
            let documents: Vec<Vec<String>> =
                samples.iter().map(|sample| sample.tokens.clone()).collect();
            let featurizer = TfidfVectorizer::fit(&documents, self.config.sublinear_tf);
            let mut features = Array2::<f32>::zeros((documents.len(), featurizer.nb_features()));
            for (row, document) in documents.iter().enumerate() {
                features.row_mut(row).assign(&featurizer.transform(document));
            }
            let targets: Vec<usize> = samples
                .iter()
                .map(|sample| label_indexes[&sample.label])
                .collect();
            let logreg =
                MulticlassLogisticRegression::fit(&features, &targets, labels.len(), &self.config)?;
            LogRegClassifierModel {
                labels,
                vectorizer: Some(featurizer.model()),
                intercept: Some(logreg.intercept().to_vec()),
                coeffs: Some(
                    logreg
                        .coefficients()
                        .outer_iter()
                        .map(|row| row.to_vec())
                        .collect(),
                ),
            }
        };
        Ok(ClassifierModel::new(serde_json::to_string(&model)?))
    }

    fn load(&self, model: &ClassifierModel) -> Result<Box<dyn Classifier>> {
        let model: LogRegClassifierModel = serde_json::from_str(model.as_str())
            .with_context(|_| NluError::MalformedArtefact("invalid classifier model".to_string()))?;
        Ok(Box::new(LogRegClassifier::from_model(model)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use crate::testutils::{assert_epsilon_eq_array1, tokens};
    use ndarray::array;

    #[test]
    fn multiclass_logistic_regression_works() {
        // Given
        let intercept = array![0.98, 0.32, -0.76];
        let weights = array![
            [2.5, -0.6, 0.5],
            [1.2, 1.2, -2.7],
            [1.5, 0.1, -3.2],
            [-0.9, 1.4, 1.8]
        ];

        let features = array![0.4, -2.3, 1.9, 1.3];
        let regression = MulticlassLogisticRegression::new(intercept, weights).unwrap();

        // When
        let predictions = regression.run(&features.view(), None).unwrap();

        // Then
        let expected_predictions = array![0.7109495, 0.3384968, 0.8710191];
        assert_epsilon_eq_array1(&predictions, &expected_predictions, 1e-06);
    }

    #[test]
    fn multiclass_logistic_regression_works_when_binary() {
        // Given
        let intercept = array![0.98];
        let weights = array![[2.5], [1.2], [1.5], [-0.9]];

        let features = array![0.4, -2.3, 1.9, 1.3];
        let regression = MulticlassLogisticRegression::new(intercept, weights).unwrap();

        // When
        let predictions = regression.run(&features.view(), None).unwrap();

        // Then
        let expected_predictions = array![0.2890504, 0.7109495];
        assert_epsilon_eq_array1(&predictions, &expected_predictions, 1e-06);
    }

    #[test]
    fn multiclass_logistic_regression_works_with_filtered_out_indexes() {
        // Given
        let intercept = array![0.98, 0.32, -0.76];
        let weights = array![
            [2.5, -0.6, 0.5],
            [1.2, 1.2, -2.7],
            [1.5, 0.1, -3.2],
            [-0.9, 1.4, 1.8]
        ];

        let features = array![0.4, -2.3, 1.9, 1.3];

        let filtered_out_indexes = Some(vec![2]);
        let regression = MulticlassLogisticRegression::new(intercept, weights).unwrap();

        // When
        let predictions = regression
            .run(&features.view(), filtered_out_indexes)
            .unwrap();

        // Then
        let expected_predictions = array![0.67745198, 0.32254802, 0.0];
        assert_epsilon_eq_array1(&predictions, &expected_predictions, 1e-06);
    }

    #[test]
    fn multiclass_logistic_regression_rejects_wrong_feature_count() {
        // Given
        let regression =
            MulticlassLogisticRegression::new(array![0.98], array![[2.5], [1.2]]).unwrap();

        // When
        let predictions = regression.run(&array![0.4, -2.3, 1.9].view(), None);

        // Then
        assert!(predictions.is_err());
    }

    #[test]
    fn factory_trains_separable_classifier() {
        // Given
        let factory = LogRegClassifierFactory::default();
        let samples = vec![
            TrainingSample::new(tokens(&["hello", "there"]), "greet"),
            TrainingSample::new(tokens(&["hi"]), "greet"),
            TrainingSample::new(tokens(&["bye", "now"]), "leave"),
            TrainingSample::new(tokens(&["goodbye"]), "leave"),
        ];

        // When
        let model = factory.train(&samples).unwrap();
        let classifier = factory.load(&model).unwrap();
        let greet_predictions = classifier.predict(&tokens(&["hello"])).unwrap();
        let leave_predictions = classifier.predict(&tokens(&["bye"])).unwrap();

        // Then
        assert_eq!(
            vec!["greet", "leave"],
            greet_predictions.iter().map(|label| label.label.as_str()).sorted().collect::<Vec<_>>()
        );
        assert_eq!("greet", greet_predictions[0].label);
        assert_eq!("leave", leave_predictions[0].label);
        assert!(greet_predictions[0].confidence > 0.5);
    }

    #[test]
    fn factory_trains_single_label_classifier() {
        // Given
        let factory = LogRegClassifierFactory::default();
        let samples = vec![TrainingSample::new(tokens(&["hello"]), "greet")];

        // When
        let model = factory.train(&samples).unwrap();
        let predictions = factory
            .load(&model)
            .unwrap()
            .predict(&tokens(&["anything"]))
            .unwrap();

        // Then
        assert_eq!(
            vec![Label {
                label: "greet".to_string(),
                confidence: 1.0
            }],
            predictions
        );
    }

    #[test]
    fn factory_rejects_malformed_model() {
        // Given
        let factory = LogRegClassifierFactory::default();
        let model = ClassifierModel::new(
            r#"{"labels": ["a", "b"], "vectorizer": null, "intercept": null, "coeffs": null}"#,
        );

        // When
        let classifier = factory.load(&model);

        // Then
        assert!(classifier.is_err());
    }
}
