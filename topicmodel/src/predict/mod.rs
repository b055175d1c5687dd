//Copyright 2024 Felix Engl
//
//Licensed under the Apache License, Version 2.0 (the "License");
//you may not use this file except in compliance with the License.
//You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
//Unless required by applicable law or agreed to in writing, software
//distributed under the License is distributed on an "AS IS" BASIS,
//WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//See the License for the specific language governing permissions and
//limitations under the License.

//! Topic distributions for documents unseen during training.

mod fold_in;
mod dot;

use std::io::Write;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use crate::error::{LdaError, LdaResult, PredictWarning};
use crate::gibbs::CancellationToken;
use crate::matrix::dense::uniform;
use crate::matrix::{CountMatrix, DocumentTo, Probability, TopicTo};
use crate::model::{write_distributions, BasicTopicModel, TopicModel, TopicModelWithVocabulary};

/// How the topic distribution of a new document is inferred.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PredictMethod {
    /// A Gibbs chain over the new documents with phi fixed to the trained values.
    #[default]
    Gibbs,
    /// The term frequencies of a document projected onto phi, no sampling.
    Dot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_builder::Builder)]
#[serde(default, deny_unknown_fields)]
#[builder(default, build_fn(private, name = "build_unvalidated"))]
pub struct PredictConfig {
    pub method: PredictMethod,
    /// Number of sweeps, required by [PredictMethod::Gibbs].
    #[builder(setter(strip_option))]
    pub iterations: Option<usize>,
    /// Same meaning as the burnin of the training, absent or negative uses the last sweep.
    #[builder(setter(strip_option))]
    pub burnin: Option<isize>,
    #[builder(setter(strip_option))]
    pub seed: Option<u64>,
    pub workers: usize,
}

impl Default for PredictConfig {
    fn default() -> Self {
        Self {
            method: PredictMethod::Gibbs,
            iterations: None,
            burnin: None,
            seed: None,
            workers: 1,
        }
    }
}

impl PredictConfigBuilder {
    /// Builds and validates the config.
    pub fn build(&self) -> LdaResult<PredictConfig> {
        let config = self.build_unvalidated()?;
        config.validate()?;
        Ok(config)
    }
}

impl PredictConfig {
    pub fn builder() -> PredictConfigBuilder {
        PredictConfigBuilder::default()
    }

    /// The projection, it needs no further settings.
    pub fn dot() -> Self {
        Self { method: PredictMethod::Dot, ..Self::default() }
    }

    pub fn gibbs(iterations: usize, burnin: isize) -> Self {
        Self { method: PredictMethod::Gibbs, iterations: Some(iterations), burnin: Some(burnin), ..Self::default() }
    }

    pub fn validate(&self) -> LdaResult<()> {
        if self.workers == 0 {
            return Err(LdaError::invalid_config("workers", "At least one worker is needed."))
        }
        if self.method == PredictMethod::Dot {
            return Ok(())
        }
        let iterations = match self.iterations {
            None | Some(0) => return Err(LdaError::invalid_config("iterations", "The gibbs method needs at least one sweep.")),
            Some(iterations) => iterations
        };
        match self.averaging_start() {
            Some(start) if start >= iterations => Err(LdaError::invalid_config(
                "burnin",
                format!("A burnin of {start} leaves none of the {iterations} sweeps for averaging.")
            )),
            _ => Ok(())
        }
    }

    pub fn averaging_start(&self) -> Option<usize> {
        self.burnin.and_then(|burnin| usize::try_from(burnin).ok())
    }
}

/// The inferred distributions of a batch of documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// The ids of the predicted documents, in the order of the input rows.
    pub documents: Vec<String>,
    /// One topic distribution per document.
    pub theta: DocumentTo<TopicTo<Probability>>,
    /// The documents that got a substitute distribution.
    pub warnings: Vec<PredictWarning>,
}

impl Prediction {
    pub fn write_csv(&self, out: impl Write) -> LdaResult<()> {
        write_distributions(out, &self.documents, &self.theta)
    }
}

/// Applies a trained [TopicModel] to new documents.
#[derive(Debug, Clone)]
pub struct Predictor<'a> {
    model: &'a TopicModel,
    cancellation: CancellationToken,
}

impl<'a> Predictor<'a> {
    pub fn new(model: &'a TopicModel) -> Self {
        Self { model, cancellation: CancellationToken::default() }
    }

    /// Allows to stop the chain of [PredictMethod::Gibbs] between two sweeps.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Infers the topic distributions of the rows of `matrix`.
    ///
    /// The terms of `matrix` are matched by name with the vocabulary of the model, unknown terms are ignored.
    /// A row without any known term gets a uniform distribution and a [PredictWarning],
    /// the other rows are not affected by it.
    pub fn predict(&self, matrix: &CountMatrix, config: &PredictConfig) -> LdaResult<Prediction> {
        config.validate()?;
        let (aligned, shared) = matrix.align_to(self.model.vocabulary())?;
        log::info!(
            "Predict {} documents by {}, {shared} of {} terms are known to the model.",
            aligned.document_count(),
            config.method,
            matrix.term_count()
        );

        let empty_rows = aligned
            .document_lengths()
            .iter()
            .positions(|&length| length == 0)
            .collect_vec();
        let warnings = empty_rows
            .iter()
            .map(|&row| PredictWarning::EmptyIntersection { row, document: aligned.documents().as_ref()[row].clone() })
            .collect_vec();
        for warning in &warnings {
            log::warn!("{warning}");
        }

        let mut theta = match config.method {
            PredictMethod::Gibbs => fold_in::fold_in(self.model, &aligned, config, &self.cancellation),
            PredictMethod::Dot => dot::project_documents(&aligned, self.model.phi()),
        };
        for row in empty_rows {
            theta[row] = uniform(self.model.topic_count());
        }

        Ok(Prediction {
            documents: aligned.documents().as_ref().to_vec(),
            theta,
            warnings
        })
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use crate::error::{LdaError, PredictWarning};
    use crate::model::test::create_test_data;
    use crate::predict::{PredictConfig, PredictMethod};
    use crate::matrix::CountMatrix;

    #[test]
    fn gibbs_needs_iterations(){
        assert!(matches!(PredictConfig::builder().build(), Err(LdaError::InvalidConfig { name: "iterations", .. })));
        assert!(matches!(PredictConfig::gibbs(5, 5).validate(), Err(LdaError::InvalidConfig { name: "burnin", .. })));
        assert!(PredictConfig::gibbs(5, -1).validate().is_ok());
        let config = PredictConfig::builder().method(PredictMethod::Dot).build().unwrap();
        assert_eq!(PredictConfig::dot(), config);
    }

    #[test]
    fn empty_intersection_does_not_fail_the_batch(){
        let model = create_test_data();
        let matrix = CountMatrix::from_dense(
            &[vec![0.0, 4.0], vec![3.0, 0.0]],
            vec!["known".to_string(), "unknown".to_string()],
            vec!["car".to_string(), "deck".to_string()]
        ).unwrap();
        for config in [PredictConfig::dot(), PredictConfig { seed: Some(3), ..PredictConfig::gibbs(50, 10) }] {
            let prediction = model.predictor().predict(&matrix, &config).unwrap();
            assert_eq!(
                vec![PredictWarning::EmptyIntersection { row: 1, document: "unknown".to_string() }],
                prediction.warnings
            );
            assert_eq!(vec![0.5, 0.5], prediction.theta[1]);
            assert_relative_eq!(1.0, prediction.theta[0].iter().sum::<f64>(), epsilon = 1e-9);
            assert!(prediction.theta[0][1] > prediction.theta[0][0], "{}", config.method);
        }
    }

    #[test]
    fn writes_predictions(){
        let model = create_test_data();
        let matrix = CountMatrix::from_dense(
            &[vec![1.0]],
            vec!["x".to_string()],
            vec!["foil".to_string()]
        ).unwrap();
        let prediction = model.predictor().predict(&matrix, &PredictConfig::dot()).unwrap();
        let mut out = Vec::new();
        prediction.write_csv(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("document,topic_0,topic_1\nx,"));
    }
}
