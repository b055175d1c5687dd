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

//! Turns the counts of a chain into phi and theta.

use itertools::Itertools;
use rayon::prelude::*;
use crate::gibbs::TopicTermTable;
use crate::matrix::dense::normalize_in_place;
use crate::matrix::{DocumentLength, DocumentTo, Probability, TopicTo, WordTo};

/// The estimates of one state of a chain, or the average of several states.
#[derive(Debug, Clone, PartialEq)]
pub struct Posterior {
    /// Document-topic distributions, `documents x k`.
    pub theta: DocumentTo<TopicTo<Probability>>,
    /// Topic-term distributions, `k x vocabulary_size`. Absent when folding in.
    pub phi: Option<TopicTo<WordTo<Probability>>>,
}

/// `(n_dk + alpha_k) / (n_d + sum(alpha))` for every document.
pub fn theta_from_counts(doc_topic: &[Vec<u32>], alpha: &[f64]) -> DocumentTo<TopicTo<Probability>> {
    let alpha_sum: f64 = alpha.iter().sum();
    doc_topic
        .iter()
        .map(|row| {
            let length: u64 = row.iter().map(|&count| count as u64).sum();
            let norm = length as f64 + alpha_sum;
            row.iter().zip_eq(alpha).map(|(&count, &prior)| (count as f64 + prior) / norm).collect()
        })
        .collect()
}

/// `(n_kv + beta_v) / (n_k + sum(beta))` for every topic.
pub fn phi_from_counts(table: &TopicTermTable, beta: &[f64]) -> TopicTo<WordTo<Probability>> {
    let beta_sum: f64 = beta.iter().sum();
    table.topic_totals()
        .par_iter()
        .enumerate()
        .map(|(topic, &total)| {
            let norm = total as f64 + beta_sum;
            beta.iter()
                .enumerate()
                .map(|(term, &prior)| (table.get(topic, term) as f64 + prior) / norm)
                .collect()
        })
        .collect()
}

/// `P(topic | term)` by Bayes' rule from `phi` and the topic prior of the corpus,
/// which weights theta by the document lengths. Every column sums to 1.
pub fn gamma(
    phi: &[Vec<f64>],
    theta: &[Vec<f64>],
    document_lengths: &[DocumentLength]
) -> TopicTo<WordTo<Probability>> {
    let k = phi.len();
    let mut topic_prior = vec![0.0; k];
    for (row, &length) in theta.iter().zip_eq(document_lengths) {
        for (prior, value) in topic_prior.iter_mut().zip_eq(row) {
            *prior += value * length as f64;
        }
    }
    if !normalize_in_place(&mut topic_prior) {
        topic_prior = vec![1.0 / k as f64; k];
    }

    let terms = phi.first().map_or(0, |row| row.len());
    let mut gamma = phi
        .iter()
        .zip_eq(&topic_prior)
        .map(|(row, prior)| row.iter().map(|value| value * prior).collect_vec())
        .collect_vec();
    for term in 0..terms {
        let column_sum: f64 = gamma.iter().map(|row| row[term]).sum();
        if column_sum > 0.0 {
            gamma.iter_mut().for_each(|row| row[term] /= column_sum);
        }
    }
    gamma
}

/// Collects the posterior of a chain.
///
/// With an averaging start the snapshots of every later sweep are averaged,
/// otherwise the state after the last sweep is used.
#[derive(Debug, Clone)]
pub struct PosteriorEstimator {
    averaging_start: Option<usize>,
    estimate_phi: bool,
    theta_sum: Option<Vec<Vec<f64>>>,
    phi_sum: Option<Vec<Vec<f64>>>,
    snapshots: usize,
}

impl PosteriorEstimator {
    pub fn new(averaging_start: Option<usize>, estimate_phi: bool) -> Self {
        Self {
            averaging_start,
            estimate_phi,
            theta_sum: None,
            phi_sum: None,
            snapshots: 0,
        }
    }

    /// True if the snapshot of sweep `iteration` (starting at 1) belongs to the average.
    pub fn accepts(&self, iteration: usize) -> bool {
        matches!(self.averaging_start, Some(start) if iteration > start)
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots
    }

    pub fn accumulate(&mut self, snapshot: Posterior) {
        add_to(&mut self.theta_sum, snapshot.theta);
        if self.estimate_phi {
            if let Some(phi) = snapshot.phi {
                add_to(&mut self.phi_sum, phi);
            }
        }
        self.snapshots += 1;
    }

    /// The averaged snapshots, or `last` if nothing was accumulated.
    pub fn finalize(self, last: impl FnOnce() -> Posterior) -> Posterior {
        if self.snapshots == 0 {
            if let Some(start) = self.averaging_start {
                log::warn!("No sweep after the burnin of {start} was completed, using the last state instead of an average.");
            }
            let mut posterior = last();
            if !self.estimate_phi {
                posterior.phi = None;
            }
            return posterior
        }
        log::debug!("Averaging {} snapshots.", self.snapshots);
        let count = self.snapshots as f64;
        Posterior {
            theta: divide(self.theta_sum.unwrap_or_default(), count),
            phi: self.phi_sum.map(|phi| divide(phi, count)),
        }
    }
}

fn add_to(target: &mut Option<Vec<Vec<f64>>>, value: Vec<Vec<f64>>) {
    match target {
        None => {
            *target = Some(value);
        }
        Some(sum) => {
            for (sum_row, row) in sum.iter_mut().zip_eq(value) {
                for (s, v) in sum_row.iter_mut().zip_eq(row) {
                    *s += v;
                }
            }
        }
    }
}

fn divide(mut matrix: Vec<Vec<f64>>, count: f64) -> Vec<Vec<f64>> {
    matrix.iter_mut().flatten().for_each(|value| *value /= count);
    matrix
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use crate::gibbs::{TopicTermDelta, TopicTermTable};
    use crate::posterior::{gamma, phi_from_counts, theta_from_counts, Posterior, PosteriorEstimator};

    fn table(k: usize, counts: &[(usize, usize, i64)], terms: usize) -> TopicTermTable {
        let mut table = TopicTermTable::new(k, terms);
        let mut delta = TopicTermDelta::new(k);
        for &(topic, term, count) in counts {
            delta.add(topic, term, count);
        }
        table.apply(&delta);
        table
    }

    #[test]
    fn rows_sum_to_one(){
        let theta = theta_from_counts(&[vec![3, 0, 1], vec![0, 0, 0]], &[0.1, 0.2, 0.3]);
        for row in &theta {
            assert_relative_eq!(1.0, row.iter().sum::<f64>(), epsilon = 1e-12);
        }
        assert_relative_eq!(3.1 / 4.6, theta[0][0]);
        assert_relative_eq!(0.3 / 0.6, theta[1][2]);

        let phi = phi_from_counts(&table(2, &[(0, 0, 4), (1, 2, 2)], 3), &[0.05, 0.05, 0.05]);
        for row in &phi {
            assert!(row.iter().all(|&value| value > 0.0));
            assert_relative_eq!(1.0, row.iter().sum::<f64>(), epsilon = 1e-12);
        }
    }

    #[test]
    fn a_single_topic_is_certain(){
        let theta = theta_from_counts(&[vec![3]], &[0.1]);
        assert_eq!(vec![vec![1.0]], theta);
        let phi = phi_from_counts(&table(1, &[(0, 0, 2), (0, 1, 1)], 3), &[0.5, 0.5, 0.5]);
        assert_relative_eq!(2.5 / 4.5, phi[0][0]);
        assert_relative_eq!(1.5 / 4.5, phi[0][1]);
        assert_relative_eq!(0.5 / 4.5, phi[0][2]);
    }

    #[test]
    fn averages_accepted_snapshots(){
        let mut estimator = PosteriorEstimator::new(Some(1), true);
        assert!(!estimator.accepts(1));
        assert!(estimator.accepts(2));
        estimator.accumulate(Posterior { theta: vec![vec![0.2, 0.8]], phi: Some(vec![vec![1.0], vec![1.0]]) });
        estimator.accumulate(Posterior { theta: vec![vec![0.4, 0.6]], phi: Some(vec![vec![1.0], vec![1.0]]) });
        assert_eq!(2, estimator.snapshot_count());
        let result = estimator.finalize(|| unreachable!());
        assert_relative_eq!(0.3, result.theta[0][0]);
        assert_relative_eq!(0.7, result.theta[0][1]);
        assert_eq!(Some(vec![vec![1.0], vec![1.0]]), result.phi);
    }

    #[test]
    fn falls_back_to_the_last_state(){
        let estimator = PosteriorEstimator::new(None, false);
        assert!(!estimator.accepts(100));
        let result = estimator.finalize(|| Posterior { theta: vec![vec![0.5, 0.5]], phi: Some(vec![]) });
        assert_eq!(vec![vec![0.5, 0.5]], result.theta);
        assert_eq!(None, result.phi);
    }

    #[test]
    fn gamma_columns_sum_to_one(){
        let phi = vec![vec![0.7, 0.2, 0.1], vec![0.1, 0.1, 0.8]];
        let theta = vec![vec![0.9, 0.1], vec![0.3, 0.7]];
        let gamma = gamma(&phi, &theta, &[10, 30]);
        for term in 0..3 {
            assert_relative_eq!(1.0, gamma[0][term] + gamma[1][term], epsilon = 1e-12);
        }
        // prior = (9 + 9, 1 + 21) / 40
        let prior = [18.0 / 40.0, 22.0 / 40.0];
        assert_relative_eq!(0.7 * prior[0] / (0.7 * prior[0] + 0.1 * prior[1]), gamma[0][0], epsilon = 1e-12);
    }
}
