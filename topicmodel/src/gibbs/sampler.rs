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

use rayon::prelude::*;
use crate::gibbs::observer::{ChainState, ObserverAction, SweepObserver, SIDE_STEP_INTERVAL};
use crate::gibbs::shard::{derive_seed, Shard};
use crate::gibbs::weights::{CollapsedCounts, FixedTopics, TermWeights};
use crate::gibbs::CancellationToken;
use crate::matrix::{CountMatrix, DocumentTo, TopicTo};
use crate::posterior::{phi_from_counts, theta_from_counts, Posterior, PosteriorEstimator};

/// A collapsed Gibbs sampler over the documents of a [CountMatrix].
///
/// The documents are split into contiguous shards which are swept in parallel.
/// Every shard reads the topic-term weights as of the start of the sweep plus its own changes,
/// the changes of all shards are merged in shard order after the sweep.
/// A fixed `(seed, workers)` pair always produces the same chain.
pub struct GibbsSampler<W> {
    alpha: Vec<f64>,
    doc_topic: DocumentTo<TopicTo<u32>>,
    shards: Vec<Shard>,
    shard_size: usize,
    weights: W,
    completed: usize,
}

impl<W> GibbsSampler<W> where W: TermWeights + Send {
    fn with_weights(matrix: &CountMatrix, alpha: Vec<f64>, weights: W, seed: u64, workers: usize) -> Self {
        let k = alpha.len();
        let documents = matrix.document_count();
        let shard_size = documents.div_ceil(workers.max(1)).max(1);
        let shards: Vec<Shard> = (0..documents)
            .step_by(shard_size)
            .enumerate()
            .map(|(index, first)| {
                let len = shard_size.min(documents - first);
                Shard::new(matrix, first, len, k, derive_seed(seed, index))
            })
            .collect();
        log::debug!("Split {documents} documents into {} shards of up to {shard_size} documents.", shards.len());

        let mut sampler = Self {
            doc_topic: vec![vec![0; k]; documents],
            alpha,
            shards,
            shard_size,
            weights,
            completed: 0,
        };
        sampler.doc_topic
            .par_chunks_mut(shard_size)
            .zip(sampler.shards.par_iter_mut())
            .for_each(|(rows, shard)| shard.initialize(rows, k, W::TRACKS_DELTA));
        sampler.merge_deltas();
        sampler
    }

    fn merge_deltas(&mut self) {
        if W::TRACKS_DELTA {
            for shard in self.shards.iter() {
                self.weights.merge(shard.delta());
            }
        }
    }

    /// One pass over every token followed by the merge of the shard deltas.
    pub fn sweep(&mut self) {
        let weights = &self.weights;
        let alpha = self.alpha.as_slice();
        self.doc_topic
            .par_chunks_mut(self.shard_size)
            .zip(self.shards.par_iter_mut())
            .for_each(|(rows, shard)| shard.sweep(rows, weights, alpha));
        self.merge_deltas();
        self.completed += 1;
    }

    /// Runs up to `iterations` sweeps. `after_sweep` is called with the number of the finished sweep.
    /// Cancellation and stop requests are honored between sweeps.
    /// Returns the number of completed sweeps.
    pub(crate) fn run_with<F>(&mut self, iterations: usize, cancellation: &CancellationToken, mut after_sweep: F) -> usize
    where
        F: FnMut(&mut Self, usize) -> ObserverAction
    {
        let started = self.completed;
        for iteration in 1..=iterations {
            if cancellation.is_cancelled() {
                log::warn!("Cancelled after {} of {iterations} sweeps.", iteration - 1);
                break
            }
            self.sweep();
            if iteration % SIDE_STEP_INTERVAL == 0 || iteration == iterations {
                log::info!("Finished sweep {iteration} of {iterations}.");
            }
            if after_sweep(self, iteration) == ObserverAction::Stop {
                log::info!("Stopped by an observer after sweep {iteration}.");
                break
            }
        }
        self.completed - started
    }

    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    pub fn doc_topic(&self) -> &[Vec<u32>] {
        &self.doc_topic
    }

    pub fn weights(&self) -> &W {
        &self.weights
    }

    pub fn completed_sweeps(&self) -> usize {
        self.completed
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// The smoothed document-topic distributions of the current state.
    pub fn theta(&self) -> Vec<Vec<f64>> {
        theta_from_counts(&self.doc_topic, &self.alpha)
    }
}

impl GibbsSampler<CollapsedCounts> {
    /// Creates a training chain with a random initial assignment.
    pub fn collapsed(matrix: &CountMatrix, alpha: Vec<f64>, beta: Vec<f64>, seed: u64, workers: usize) -> Self {
        let weights = CollapsedCounts::new(alpha.len(), beta);
        Self::with_weights(matrix, alpha, weights, seed, workers)
    }

    pub(crate) fn chain_state(&mut self, iteration: usize) -> ChainState<'_> {
        ChainState {
            iteration,
            alpha: &mut self.alpha,
            beta: &self.weights.beta,
            doc_topic: &self.doc_topic,
            topic_term: &self.weights.table,
        }
    }

    /// The smoothed estimates of the current state.
    pub fn posterior(&self) -> Posterior {
        Posterior {
            theta: self.theta(),
            phi: Some(phi_from_counts(&self.weights.table, &self.weights.beta)),
        }
    }

    /// Runs the training chain. Sweeps accepted by `estimator` are accumulated before the
    /// observers run, an observer runs if its interval divides the sweep number.
    pub fn train(
        &mut self,
        iterations: usize,
        estimator: &mut PosteriorEstimator,
        observers: &mut [&mut dyn SweepObserver],
        cancellation: &CancellationToken
    ) -> usize {
        self.run_with(iterations, cancellation, |sampler, iteration| {
            if estimator.accepts(iteration) {
                estimator.accumulate(sampler.posterior());
            }
            let mut state = sampler.chain_state(iteration);
            let mut action = ObserverAction::Continue;
            for observer in observers.iter_mut() {
                if iteration % observer.interval().max(1) == 0 && observer.after_sweep(&mut state) == ObserverAction::Stop {
                    action = ObserverAction::Stop;
                }
            }
            action
        })
    }
}

impl GibbsSampler<FixedTopics> {
    /// Creates a fold-in chain, only the document-topic counts are sampled.
    pub fn fixed(matrix: &CountMatrix, alpha: Vec<f64>, phi: &[Vec<f64>], seed: u64, workers: usize) -> Self {
        Self::with_weights(matrix, alpha, FixedTopics::new(phi), seed, workers)
    }

    /// Runs the fold-in chain, accepted sweeps are accumulated in `estimator`.
    pub fn infer(&mut self, iterations: usize, estimator: &mut PosteriorEstimator, cancellation: &CancellationToken) -> usize {
        self.run_with(iterations, cancellation, |sampler, iteration| {
            if estimator.accepts(iteration) {
                estimator.accumulate(Posterior { theta: sampler.theta(), phi: None });
            }
            ObserverAction::Continue
        })
    }
}
