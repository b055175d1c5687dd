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

use crate::gibbs::counts::{TopicTermDelta, TopicTermTable};
use crate::matrix::dense::transpose;
use crate::matrix::{Probability, TopicTo, WordId, WordTo};

/// Provides the term dependent factor of the topic conditional for a token.
pub trait TermWeights: Sync {
    /// If true the shards record their changes and [TermWeights::merge] receives them.
    const TRACKS_DELTA: bool;

    /// Writes the weight of every topic for `term` to `out`.
    /// `delta` contains the not yet merged changes of the calling shard.
    fn term_weights(&self, term: WordId, delta: &TopicTermDelta, out: &mut [f64]);

    /// Called with the delta of every shard after a sweep, in shard order.
    fn merge(&mut self, _delta: &TopicTermDelta) {}
}

/// The collapsed conditional `(n_kv + beta_v) / (n_k + sum(beta))` of training.
#[derive(Debug, Clone)]
pub struct CollapsedCounts {
    pub(crate) table: TopicTermTable,
    pub(crate) beta: Vec<f64>,
    beta_sum: f64,
}

impl CollapsedCounts {
    pub fn new(k: usize, beta: Vec<f64>) -> Self {
        Self {
            table: TopicTermTable::new(k, beta.len()),
            beta_sum: beta.iter().sum(),
            beta,
        }
    }

    pub fn table(&self) -> &TopicTermTable {
        &self.table
    }

    pub fn beta(&self) -> &[f64] {
        &self.beta
    }
}

impl TermWeights for CollapsedCounts {
    const TRACKS_DELTA: bool = true;

    #[inline]
    fn term_weights(&self, term: WordId, delta: &TopicTermDelta, out: &mut [f64]) {
        let counts = self.table.term_row(term);
        let totals = self.table.topic_totals();
        let beta = self.beta[term];
        match delta.term(term) {
            None => {
                for (topic, weight) in out.iter_mut().enumerate() {
                    let total = totals[topic] as i64 + delta.totals()[topic];
                    *weight = (counts[topic] as f64 + beta) / (total as f64 + self.beta_sum);
                }
            }
            Some(changes) => {
                for (topic, weight) in out.iter_mut().enumerate() {
                    let count = counts[topic] as i64 + changes[topic];
                    let total = totals[topic] as i64 + delta.totals()[topic];
                    *weight = (count as f64 + beta) / (total as f64 + self.beta_sum);
                }
            }
        }
    }

    fn merge(&mut self, delta: &TopicTermDelta) {
        self.table.apply(delta);
    }
}

/// Fixed topic-term probabilities, used to fold new documents into a trained model.
#[derive(Debug, Clone)]
pub struct FixedTopics {
    by_term: WordTo<TopicTo<Probability>>,
}

impl FixedTopics {
    /// `phi` is the trained `k x vocabulary_size` matrix.
    pub fn new(phi: &[Vec<f64>]) -> Self {
        Self { by_term: transpose(phi) }
    }
}

impl TermWeights for FixedTopics {
    const TRACKS_DELTA: bool = false;

    #[inline]
    fn term_weights(&self, term: WordId, _delta: &TopicTermDelta, out: &mut [f64]) {
        out.copy_from_slice(&self.by_term[term]);
    }
}
