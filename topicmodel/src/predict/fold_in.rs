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

use crate::gibbs::{seed_or_random, CancellationToken, GibbsSampler};
use crate::matrix::{CountMatrix, DocumentTo, Probability, TopicTo};
use crate::model::TopicModel;
use crate::posterior::{Posterior, PosteriorEstimator};
use crate::predict::PredictConfig;

/// Samples the topics of the tokens in `matrix` while phi stays at the trained values.
/// `matrix` has to be aligned to the vocabulary of `model`.
pub(super) fn fold_in(
    model: &TopicModel,
    matrix: &CountMatrix,
    config: &PredictConfig,
    cancellation: &CancellationToken
) -> DocumentTo<TopicTo<Probability>> {
    let iterations = config.iterations.unwrap_or_default();
    let seed = seed_or_random(config.seed, "fold-in");
    let mut sampler = GibbsSampler::fixed(matrix, model.alpha().to_vec(), model.phi(), seed, config.workers);
    if matrix.total_tokens() == 0 {
        log::debug!("No known token in the documents, skip the chain.");
        return sampler.theta()
    }
    let mut estimator = PosteriorEstimator::new(config.averaging_start(), false);
    let completed = sampler.infer(iterations, &mut estimator, cancellation);
    log::debug!("Fold-in finished after {completed} sweeps with {} averaged states.", estimator.snapshot_count());
    estimator.finalize(|| Posterior { theta: sampler.theta(), phi: None }).theta
}

#[cfg(test)]
mod test {
    use crate::matrix::CountMatrix;
    use crate::model::TopicModel;
    use crate::predict::PredictConfig;
    use crate::voc;
    use crate::vocabulary::Vocabulary;

    fn separated_model() -> TopicModel {
        let vocabulary: Vocabulary<String> = voc!["a", "b", "c", "d"];
        let documents: Vocabulary<String> = voc!["x", "y"];
        TopicModel::new(
            vec![vec![0.49, 0.49, 0.01, 0.01], vec![0.01, 0.01, 0.49, 0.49]],
            vec![vec![0.9, 0.1], vec![0.1, 0.9]],
            vec![0.1, 0.1],
            vec![0.01; 4],
            vocabulary,
            documents,
            vec![20, 20],
            vec![10, 10, 10, 10],
        ).unwrap()
    }

    #[test]
    fn assigns_the_matching_topic(){
        let model = separated_model();
        let matrix = CountMatrix::from_dense(
            &[vec![5.0, 5.0, 0.0, 0.0], vec![0.0, 0.0, 4.0, 6.0]],
            vec!["first".to_string(), "second".to_string()],
            vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()],
        ).unwrap();
        let config = PredictConfig { seed: Some(11), workers: 2, ..PredictConfig::gibbs(50, 10) };
        let prediction = model.predictor().predict(&matrix, &config).unwrap();
        assert!(prediction.theta[0][0] > 0.8, "{:?}", prediction.theta);
        assert!(prediction.theta[1][1] > 0.8, "{:?}", prediction.theta);
        assert!(prediction.warnings.is_empty());

        let again = model.predictor().predict(&matrix, &config).unwrap();
        assert_eq!(prediction, again);
    }

    #[test]
    fn columns_are_matched_by_name(){
        let model = separated_model();
        let matrix = CountMatrix::from_dense(
            &[vec![3.0, 7.0, 2.0]],
            vec!["reordered".to_string()],
            vec!["d".to_string(), "c".to_string(), "unknown".to_string()],
        ).unwrap();
        let config = PredictConfig { seed: Some(5), ..PredictConfig::gibbs(30, 5) };
        let prediction = model.predictor().predict(&matrix, &config).unwrap();
        assert!(prediction.theta[0][1] > 0.8, "{:?}", prediction.theta);
    }
}
