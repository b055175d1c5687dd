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
use crate::error::{DiagnosticKind, DiagnosticWarning};
use crate::gibbs::{ChainState, ObserverAction, SweepObserver};
use crate::matrix::dense::dot_column;
use crate::matrix::CountMatrix;
use crate::posterior::{phi_from_counts, theta_from_counts};

/// `sum count(d, v) * ln(theta_d . phi[:, v])` over the nonzero cells of `matrix`.
///
/// The documents are evaluated in parallel and summed in document order.
pub fn log_likelihood(matrix: &CountMatrix, theta: &[Vec<f64>], phi: &[Vec<f64>]) -> f64 {
    let per_document: Vec<f64> = (0..matrix.document_count())
        .into_par_iter()
        .map(|document| {
            matrix.row(document).map_or(0.0, |row| {
                row.iter()
                    .map(|(term, &count)| count as f64 * dot_column(&theta[document], phi, term).ln())
                    .sum()
            })
        })
        .collect();
    per_document.iter().sum()
}

/// Records the log-likelihood of the current point estimates between sweeps.
/// Never changes the chain.
#[derive(Debug)]
pub struct LikelihoodTracer<'a> {
    matrix: &'a CountMatrix,
    trace: Vec<(usize, f64)>,
}

impl<'a> LikelihoodTracer<'a> {
    pub fn new(matrix: &'a CountMatrix) -> Self {
        Self { matrix, trace: Vec::new() }
    }

    /// The trace and a warning for every value that is not finite.
    pub fn finish(self) -> (Vec<(usize, f64)>, Vec<DiagnosticWarning>) {
        let warnings = self.trace
            .iter()
            .filter(|(_, value)| !value.is_finite())
            .map(|(iteration, value)| {
                DiagnosticWarning::new(
                    DiagnosticKind::LogLikelihood,
                    format!("The log-likelihood after sweep {iteration} is {value}.")
                )
            })
            .collect();
        (self.trace, warnings)
    }
}

impl SweepObserver for LikelihoodTracer<'_> {
    fn after_sweep(&mut self, state: &mut ChainState) -> ObserverAction {
        let theta = theta_from_counts(state.doc_topic, state.alpha.as_slice());
        let phi = phi_from_counts(state.topic_term, state.beta);
        let value = log_likelihood(self.matrix, &theta, &phi);
        log::info!("Log-likelihood after sweep {}: {value}", state.iteration);
        self.trace.push((state.iteration, value));
        ObserverAction::Continue
    }
}
