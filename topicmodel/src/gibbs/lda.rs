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

use crate::config::LdaConfig;
use crate::diagnostics::DiagnosticsCalculator;
use crate::error::LdaResult;
use crate::gibbs::{seed_or_random, CancellationToken, GibbsSampler, SweepObserver};
use crate::matrix::CountMatrix;
use crate::model::TopicModel;
use crate::optimize::AlphaOptimizer;
use crate::posterior::{phi_from_counts, Posterior, PosteriorEstimator};

/// Fits a [TopicModel] with the collapsed Gibbs sampler.
///
/// ```
/// use gibbslda_topicmodel::{CountMatrix, GibbsLda, LdaConfig};
///
/// let matrix = CountMatrix::from_counts(&[vec![3, 1, 0, 0], vec![0, 0, 2, 4], vec![2, 2, 0, 1]]).unwrap();
/// let config = LdaConfig::builder().k(2).iterations(20).seed(7).build().unwrap();
/// let model = GibbsLda::new(config).unwrap().fit(&matrix).unwrap();
/// assert_eq!(3, model.theta().len());
/// ```
pub struct GibbsLda {
    config: LdaConfig,
    cancellation: CancellationToken,
    observers: Vec<Box<dyn SweepObserver>>,
}

impl GibbsLda {
    pub fn new(config: LdaConfig) -> LdaResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancellation: CancellationToken::default(),
            observers: Vec::new(),
        })
    }

    pub fn config(&self) -> &LdaConfig {
        &self.config
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Adds an observer, it runs after the alpha refit and the likelihood trace.
    pub fn with_observer(mut self, observer: impl SweepObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// A token to stop the training from another thread.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Trains on `matrix`. A cancelled training returns the model of the last finished sweep.
    pub fn fit(mut self, matrix: &CountMatrix) -> LdaResult<TopicModel> {
        matrix.validate_for_training()?;
        let alpha = self.config.resolve_alpha()?;
        let beta = self.config.resolve_beta(matrix.term_count())?;
        let seed = seed_or_random(self.config.seed, "training");
        log::info!(
            "Fit {} topics to {} documents with {} terms and {} tokens, {} sweeps on {} workers.",
            self.config.k,
            matrix.document_count(),
            matrix.term_count(),
            matrix.total_tokens(),
            self.config.iterations,
            self.config.workers
        );

        let mut sampler = GibbsSampler::collapsed(matrix, alpha, beta, seed, self.config.workers);
        let mut estimator = PosteriorEstimator::new(self.config.averaging_start(), true);
        let calculator = DiagnosticsCalculator::new(matrix, &self.config);
        let mut optimizer = self.config.optimize_alpha.then(AlphaOptimizer::default);
        let mut tracer = calculator.likelihood_tracer();

        let mut observers: Vec<&mut dyn SweepObserver> = Vec::with_capacity(self.observers.len() + 2);
        if let Some(optimizer) = optimizer.as_mut() {
            observers.push(optimizer);
        }
        if let Some(tracer) = tracer.as_mut() {
            observers.push(tracer);
        }
        for observer in self.observers.iter_mut() {
            observers.push(observer.as_mut());
        }
        let completed = sampler.train(self.config.iterations, &mut estimator, &mut observers, &self.cancellation);
        drop(observers);

        if estimator.snapshot_count() > 0 {
            log::info!("Averaged the states of {} sweeps.", estimator.snapshot_count());
        }
        let Posterior { theta, phi } = estimator.finalize(|| sampler.posterior());
        let phi = match phi {
            Some(phi) => phi,
            None => phi_from_counts(sampler.weights().table(), sampler.weights().beta())
        };
        let diagnostics = calculator.finish(tracer, &theta, &phi);
        for warning in &diagnostics.warnings {
            log::warn!("{warning}");
        }

        let model = TopicModel::new(
            phi,
            theta,
            sampler.alpha().to_vec(),
            sampler.weights().beta().to_vec(),
            matrix.terms().clone(),
            matrix.documents().clone(),
            matrix.document_lengths(),
            matrix.term_frequencies(),
        )?;
        Ok(model.with_training_info(completed, diagnostics))
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use crate::config::LdaConfig;
    use crate::error::LdaError;
    use crate::gibbs::{CancellationToken, ChainState, GibbsLda, ObserverAction, SweepObserver};
    use crate::model::BasicTopicModel;
    use crate::test_data::{init_logging, tiny, two_clusters};

    #[test]
    fn recovers_separated_topics(){
        init_logging();
        let matrix = two_clusters(20, 5);
        let config = LdaConfig::builder().k(2).iterations(200).seed(42).workers(2).build().unwrap();
        let model = GibbsLda::new(config).unwrap().fit(&matrix).unwrap();
        let mut clusters = Vec::new();
        for topic in model.phi() {
            let first: f64 = topic[..5].iter().sum();
            let second: f64 = topic[5..].iter().sum();
            assert!(first.max(second) >= 0.9, "{first} {second}");
            clusters.push(first > second);
        }
        assert_ne!(clusters[0], clusters[1]);
        assert_eq!(200, model.iterations());
    }

    #[test]
    fn same_seed_same_model(){
        let matrix = two_clusters(6, 3);
        let config = LdaConfig::builder().k(3).iterations(25).burnin(10).seed(9).workers(3).build().unwrap();
        let first = GibbsLda::new(config.clone()).unwrap().fit(&matrix).unwrap();
        let second = GibbsLda::new(config).unwrap().fit(&matrix).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn optimized_alpha_stays_positive(){
        let matrix = two_clusters(10, 4);
        let config = LdaConfig::builder().k(4).iterations(60).optimize_alpha(true).seed(1).build().unwrap();
        let model = GibbsLda::new(config).unwrap().fit(&matrix).unwrap();
        assert!(model.alpha().iter().all(|value| value.is_finite() && *value > 0.0), "{:?}", model.alpha());
        assert_ne!(vec![0.1; 4], model.alpha());
    }

    #[test]
    fn likelihood_is_traced_every_ten_sweeps(){
        let matrix = two_clusters(5, 3);
        let config = LdaConfig::builder().k(2).iterations(30).calc_likelihood(true).seed(3).build().unwrap();
        let model = GibbsLda::new(config).unwrap().fit(&matrix).unwrap();
        let trace = model.diagnostics().log_likelihood.as_ref().unwrap();
        assert_eq!(vec![10, 20, 30], trace.iter().map(|(iteration, _)| *iteration).collect::<Vec<_>>());
        assert!(trace.iter().all(|(_, value)| value.is_finite() && *value < 0.0));
    }

    #[test]
    fn diagnostics_do_not_change_the_chain(){
        let matrix = two_clusters(5, 3);
        let plain = LdaConfig::builder().k(2).iterations(30).seed(5).build().unwrap();
        let observed = LdaConfig {
            calc_likelihood: true,
            calc_coherence: true,
            calc_r2: true,
            ..plain.clone()
        };
        let plain = GibbsLda::new(plain).unwrap().fit(&matrix).unwrap();
        let observed = GibbsLda::new(observed).unwrap().fit(&matrix).unwrap();
        assert_eq!(plain.phi(), observed.phi());
        assert_eq!(plain.theta(), observed.theta());
        assert!(observed.diagnostics().r2.is_some());
        assert_eq!(2, observed.diagnostics().coherence.as_ref().unwrap().len());
    }

    #[test]
    fn cancelled_training_keeps_the_current_state(){
        let matrix = tiny();
        let token = CancellationToken::new();
        token.cancel();
        let config = LdaConfig::builder().k(2).iterations(50).burnin(10).seed(2).build().unwrap();
        let model = GibbsLda::new(config).unwrap().with_cancellation(token).fit(&matrix).unwrap();
        assert_eq!(0, model.iterations());
        for topic in model.phi() {
            assert_relative_eq!(1.0, topic.iter().sum::<f64>(), epsilon = 1e-9);
        }
    }

    #[test]
    fn observers_can_stop_the_training(){
        struct StopAfter(usize);
        impl SweepObserver for StopAfter {
            fn interval(&self) -> usize { 1 }
            fn after_sweep(&mut self, state: &mut ChainState) -> ObserverAction {
                if state.iteration >= self.0 { ObserverAction::Stop } else { ObserverAction::Continue }
            }
        }
        let config = LdaConfig::builder().k(2).iterations(50).seed(2).build().unwrap();
        let model = GibbsLda::new(config).unwrap().with_observer(StopAfter(5)).fit(&tiny()).unwrap();
        assert_eq!(5, model.iterations());
        assert_eq!(2, model.topic_count());
    }

    #[test]
    fn invalid_configs_are_rejected(){
        let config = LdaConfig { k: 1, ..LdaConfig::default() };
        assert!(matches!(GibbsLda::new(config), Err(LdaError::InvalidConfig { name: "k", .. })));
        let config = LdaConfig::builder().k(2).beta(vec![0.1, 0.1]).build().unwrap();
        assert!(matches!(GibbsLda::new(config).unwrap().fit(&tiny()), Err(LdaError::InvalidConfig { name: "beta", .. })));
    }
}
