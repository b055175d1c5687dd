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
use statrs::function::gamma::digamma;
use crate::gibbs::{ChainState, ObserverAction, SweepObserver};

/// Refits the asymmetric document-topic prior with Minka's fixed point iteration:
///
/// `alpha_k <- alpha_k * sum_d[psi(n_dk + alpha_k) - psi(alpha_k)] / sum_d[psi(n_d + A) - psi(A)]`
/// with `A = sum(alpha)`.
#[derive(Debug, Copy, Clone)]
pub struct AlphaOptimizer {
    max_steps: usize,
    tolerance: f64,
    floor: f64,
}

impl Default for AlphaOptimizer {
    fn default() -> Self {
        Self {
            max_steps: 20,
            tolerance: 1e-5,
            floor: 1e-6,
        }
    }
}

impl AlphaOptimizer {
    pub fn new(max_steps: usize, tolerance: f64, floor: f64) -> Self {
        Self { max_steps, tolerance, floor }
    }

    /// Returns the refitted prior. Every value is finite and at least the floor.
    pub fn refit(&self, alpha: &[f64], doc_topic: &[Vec<u32>]) -> Vec<f64> {
        let lengths = doc_topic
            .iter()
            .map(|row| row.iter().map(|&count| count as u64).sum::<u64>())
            .filter(|&length| length > 0)
            .collect_vec();
        let mut alpha = alpha.to_vec();
        for step in 0..self.max_steps {
            let alpha_sum: f64 = alpha.iter().sum();
            let psi_sum = digamma(alpha_sum);
            let denominator: f64 = lengths.iter().map(|&length| digamma(length as f64 + alpha_sum) - psi_sum).sum();
            if !denominator.is_finite() || denominator <= 0.0 {
                log::debug!("The alpha update has no usable denominator ({denominator}), keeping the prior.");
                break
            }

            let mut max_change: f64 = 0.0;
            for (topic, value) in alpha.iter_mut().enumerate() {
                let psi_value = digamma(*value);
                let numerator: f64 = doc_topic
                    .iter()
                    .filter(|row| row[topic] > 0)
                    .map(|row| digamma(row[topic] as f64 + *value) - psi_value)
                    .sum();
                let candidate = *value * numerator / denominator;
                if candidate.is_finite() {
                    let next = candidate.max(self.floor);
                    max_change = max_change.max((next - *value).abs());
                    *value = next;
                }
            }
            log::debug!("Alpha step {step}: max change {max_change}");
            if max_change < self.tolerance {
                break
            }
        }
        alpha
    }
}

impl SweepObserver for AlphaOptimizer {
    fn after_sweep(&mut self, state: &mut ChainState) -> ObserverAction {
        let refitted = self.refit(state.alpha.as_slice(), state.doc_topic);
        log::debug!("Refitted alpha after sweep {}: sum {}", state.iteration, refitted.iter().sum::<f64>());
        *state.alpha = refitted;
        ObserverAction::Continue
    }
}
