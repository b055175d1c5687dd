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

use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::gibbs::counts::TopicTermDelta;
use crate::gibbs::weights::TermWeights;
use crate::matrix::{CountMatrix, TopicId, WordId};

/// The seed of the random stream of shard `shard`, a splitmix64 step over the chain seed.
pub fn derive_seed(seed: u64, shard: usize) -> u64 {
    let mut z = seed.wrapping_add((shard as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// The tokens of one document, every occurrence of a term is a token.
#[derive(Debug, Clone)]
struct DocumentTokens {
    terms: Vec<WordId>,
    topics: Vec<TopicId>,
}

/// A contiguous block of documents sampled by one worker.
///
/// A shard owns the topic assignments of its tokens and its random stream.
/// Changes to the shared topic-term counts are only collected in `delta`.
#[derive(Debug, Clone)]
pub(crate) struct Shard {
    documents: Vec<DocumentTokens>,
    rng: StdRng,
    delta: TopicTermDelta,
}

impl Shard {
    /// Expands the documents `first_document..first_document+len` of `matrix` into tokens.
    pub fn new(matrix: &CountMatrix, first_document: usize, len: usize, k: usize, seed: u64) -> Self {
        let documents = (first_document..first_document + len)
            .map(|document| {
                let terms = matrix
                    .row(document)
                    .map(|row| {
                        row.iter()
                            .flat_map(|(term, &count)| std::iter::repeat(term).take(count as usize))
                            .collect_vec()
                    })
                    .unwrap_or_default();
                DocumentTokens {
                    topics: vec![0; terms.len()],
                    terms,
                }
            })
            .collect();
        Self {
            documents,
            rng: StdRng::seed_from_u64(seed),
            delta: TopicTermDelta::new(k),
        }
    }

    pub fn delta(&self) -> &TopicTermDelta {
        &self.delta
    }

    /// Assigns a uniformly drawn topic to every token.
    pub fn initialize(&mut self, doc_topic: &mut [Vec<u32>], k: usize, track_delta: bool) {
        self.delta.clear();
        for (document, row) in self.documents.iter_mut().zip_eq(doc_topic.iter_mut()) {
            for (&term, topic) in document.terms.iter().zip_eq(document.topics.iter_mut()) {
                let drawn = self.rng.random_range(0..k);
                *topic = drawn;
                row[drawn] += 1;
                if track_delta {
                    self.delta.add(drawn, term, 1);
                }
            }
        }
    }

    /// One pass over every token of the shard.
    ///
    /// Every token is removed from the counts, a new topic is drawn from
    /// `weights(term) * (doc_topic + alpha)` and the token is added again.
    pub fn sweep<W: TermWeights>(&mut self, doc_topic: &mut [Vec<u32>], weights: &W, alpha: &[f64]) {
        let k = alpha.len();
        let mut term_weights = vec![0.0; k];
        let mut cumulative = vec![0.0; k];
        self.delta.clear();
        for (document, row) in self.documents.iter_mut().zip_eq(doc_topic.iter_mut()) {
            for (&term, topic) in document.terms.iter().zip_eq(document.topics.iter_mut()) {
                let old = *topic;
                row[old] -= 1;
                if W::TRACKS_DELTA {
                    self.delta.add(old, term, -1);
                }

                weights.term_weights(term, &self.delta, &mut term_weights);
                let mut total = 0.0;
                for topic_id in 0..k {
                    total += term_weights[topic_id] * (row[topic_id] as f64 + alpha[topic_id]);
                    cumulative[topic_id] = total;
                }
                let target = self.rng.random::<f64>() * total;
                let new = cumulative.iter().position(|&bound| target < bound).unwrap_or(k - 1);

                *topic = new;
                row[new] += 1;
                if W::TRACKS_DELTA {
                    self.delta.add(new, term, 1);
                }
            }
        }
    }
}
