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

//! Diagnostics of a fitted model. None of them influences the sampler.

mod likelihood;
mod coherence;
mod r2;

pub use likelihood::*;
pub use coherence::*;
pub use r2::*;

use serde::{Deserialize, Serialize};
use crate::config::LdaConfig;
use crate::error::DiagnosticWarning;
use crate::matrix::CountMatrix;

/// The requested diagnostics of a training run, absent if not requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// `(sweep, log-likelihood)` every few sweeps.
    #[serde(with = "gibbslda_toolkit::lenient_float::option_indexed")]
    pub log_likelihood: Option<Vec<(usize, f64)>>,
    /// One value per topic.
    #[serde(with = "gibbslda_toolkit::lenient_float::option_vec")]
    pub coherence: Option<Vec<f64>>,
    #[serde(with = "gibbslda_toolkit::lenient_float::option")]
    pub r2: Option<f64>,
    pub warnings: Vec<DiagnosticWarning>,
}

/// Computes the diagnostics enabled in a [LdaConfig] for a training matrix.
#[derive(Debug, Copy, Clone)]
pub struct DiagnosticsCalculator<'a> {
    matrix: &'a CountMatrix,
    likelihood: bool,
    coherence: Option<(usize, CoherenceMeasure)>,
    r2: bool,
}

impl<'a> DiagnosticsCalculator<'a> {
    pub fn new(matrix: &'a CountMatrix, config: &LdaConfig) -> Self {
        Self {
            matrix,
            likelihood: config.calc_likelihood,
            coherence: config.calc_coherence.then_some((config.coherence_top_n, config.coherence_measure)),
            r2: config.calc_r2,
        }
    }

    /// The observer recording the likelihood trace, if enabled.
    pub fn likelihood_tracer(&self) -> Option<LikelihoodTracer<'a>> {
        self.likelihood.then(|| LikelihoodTracer::new(self.matrix))
    }

    /// Computes the post training diagnostics and adds the trace of `tracer`.
    pub fn finish(&self, tracer: Option<LikelihoodTracer<'a>>, theta: &[Vec<f64>], phi: &[Vec<f64>]) -> Diagnostics {
        let mut diagnostics = Diagnostics::default();
        if let Some(tracer) = tracer {
            let (trace, warnings) = tracer.finish();
            diagnostics.log_likelihood = Some(trace);
            diagnostics.warnings.extend(warnings);
        }
        if let Some((top_n, measure)) = self.coherence {
            let (values, warnings) = coherence(self.matrix, phi, top_n, measure);
            log::info!("Coherence ({measure}, top {top_n}): {values:?}");
            diagnostics.coherence = Some(values);
            diagnostics.warnings.extend(warnings);
        }
        if self.r2 {
            let (value, warning) = r_squared(self.matrix, theta, phi);
            log::info!("R2: {value}");
            diagnostics.r2 = Some(value);
            diagnostics.warnings.extend(warning);
        }
        diagnostics
    }
}
