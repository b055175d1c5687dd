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
use crate::matrix::CountMatrix;

/// The coefficient of determination `1 - SSE / SST` of the model for `matrix`.
///
/// The expected count of a cell is `n_d * (theta_d . phi)_v`, the total sum of squares is
/// taken around the mean count of every term. Only the nonzero cells are visited, the
/// zero cells are accounted for by the full sums of the expectations and means.
pub fn r_squared(matrix: &CountMatrix, theta: &[Vec<f64>], phi: &[Vec<f64>]) -> (f64, Option<DiagnosticWarning>) {
    let documents = matrix.document_count();
    if documents == 0 {
        return degenerate("The matrix has no documents.")
    }
    let terms = matrix.term_count();
    let means: Vec<f64> = matrix.term_frequencies().iter().map(|&frequency| frequency as f64 / documents as f64).collect();
    let mean_squares: f64 = means.iter().map(|mean| mean * mean).sum();
    let lengths = matrix.document_lengths();

    let per_document: Vec<(f64, f64)> = (0..documents)
        .into_par_iter()
        .map(|document| {
            let mut expected = vec![0.0; terms];
            for (weight, topic) in theta[document].iter().zip(phi) {
                let weight = weight * lengths[document] as f64;
                for (value, probability) in expected.iter_mut().zip(topic) {
                    *value += weight * probability;
                }
            }
            let mut sse: f64 = expected.iter().map(|value| value * value).sum();
            let mut sst = mean_squares;
            if let Some(row) = matrix.row(document) {
                for (term, &count) in row.iter() {
                    let count = count as f64;
                    sse += (count - expected[term]).powi(2) - expected[term].powi(2);
                    sst += (count - means[term]).powi(2) - means[term].powi(2);
                }
            }
            (sse, sst)
        })
        .collect();

    let (sse, sst) = per_document.iter().fold((0.0, 0.0), |(sse, sst), (a, b)| (sse + a, sst + b));
    if !sst.is_finite() || sst <= 0.0 {
        return degenerate(format!("The total sum of squares is {sst}, the counts have no variance."))
    }
    let value = 1.0 - sse / sst;
    if !value.is_finite() {
        return degenerate(format!("The residual sum of squares is {sse}."))
    }
    (value, None)
}

fn degenerate(explanation: impl Into<String>) -> (f64, Option<DiagnosticWarning>) {
    let warning = DiagnosticWarning::new(DiagnosticKind::R2, explanation);
    log::warn!("{warning}");
    (f64::NAN, Some(warning))
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use crate::diagnostics::r2::r_squared;
    use crate::matrix::CountMatrix;
    use crate::test_data::tiny;

    #[test]
    fn a_perfect_model_explains_everything(){
        let matrix = CountMatrix::from_counts(&[vec![2, 0], vec![0, 3]]).unwrap();
        let (value, warning) = r_squared(&matrix, &[vec![1.0, 0.0], vec![0.0, 1.0]], &[vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert!(warning.is_none());
        assert_relative_eq!(1.0, value, epsilon = 1e-12);
    }

    #[test]
    fn matches_the_dense_definition(){
        let matrix = tiny();
        let theta = vec![vec![0.5, 0.5], vec![0.2, 0.8], vec![0.9, 0.1]];
        let phi = vec![vec![0.4, 0.3, 0.2, 0.1], vec![0.1, 0.2, 0.3, 0.4]];
        let dense = matrix.to_dense();
        let means: Vec<f64> = (0..4).map(|v| dense.iter().map(|row| row[v] as f64).sum::<f64>() / 3.0).collect();
        let (mut sse, mut sst) = (0.0, 0.0);
        for (d, row) in dense.iter().enumerate() {
            let length: f64 = row.iter().map(|&c| c as f64).sum();
            for (v, &count) in row.iter().enumerate() {
                let expected = length * (0..2).map(|k| theta[d][k] * phi[k][v]).sum::<f64>();
                sse += (count as f64 - expected).powi(2);
                sst += (count as f64 - means[v]).powi(2);
            }
        }
        let (value, _) = r_squared(&matrix, &theta, &phi);
        assert_relative_eq!(1.0 - sse / sst, value, epsilon = 1e-12);
    }

    #[test]
    fn no_variance_is_degenerate(){
        let matrix = CountMatrix::from_counts(&[vec![1, 2]]).unwrap();
        let (value, warning) = r_squared(&matrix, &[vec![0.5, 0.5]], &[vec![0.5, 0.5], vec![0.5, 0.5]]);
        assert!(value.is_nan());
        assert!(warning.is_some());
    }
}
