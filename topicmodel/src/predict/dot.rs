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
use rayon::prelude::*;
use crate::matrix::dense::{normalize_in_place, project, uniform};
use crate::matrix::{CountMatrix, DocumentTo, Probability, TopicTo};

/// Normalizes every row of `matrix` to term frequencies, multiplies it with the transposed `phi`
/// and normalizes the result. `matrix` has to be aligned to the columns of `phi`.
///
/// An approximation of the posterior, phi is treated as a linear map.
pub(super) fn project_documents(matrix: &CountMatrix, phi: &[Vec<f64>]) -> DocumentTo<TopicTo<Probability>> {
    let k = phi.len();
    let rows = matrix.rows().collect_vec();
    rows.par_iter()
        .map(|row| {
            let length: f64 = row.data().iter().map(|&count| count as f64).sum();
            if length <= 0.0 {
                return uniform(k)
            }
            let frequencies = row.iter().map(|(term, &count)| (term, count as f64 / length)).collect_vec();
            let mut projected = project(&frequencies, phi);
            if normalize_in_place(&mut projected) {
                projected
            } else {
                uniform(k)
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use itertools::Itertools;
    use crate::error::PredictWarning;
    use crate::matrix::dense::{dot, normalized};
    use crate::matrix::CountMatrix;
    use crate::model::test::create_test_data;
    use crate::predict::PredictConfig;

    #[test]
    fn equals_the_normalized_product(){
        let model = create_test_data();
        let matrix = CountMatrix::from_dense(
            &[vec![2.0, 1.0, 5.0], vec![0.0, 0.0, 3.0], vec![1.0, 3.0, 0.0]],
            vec!["d1".to_string(), "d2".to_string(), "d3".to_string()],
            vec!["wing".to_string(), "plane".to_string(), "unknown".to_string()]
        ).unwrap();
        let prediction = model.predictor().predict(&matrix, &PredictConfig::dot()).unwrap();

        // wing and plane are the terms 2 and 0 of the model
        let restricted_phi = model.phi().iter().map(|topic| [topic[2], topic[0]]).collect_vec();
        for (row, counts) in [(0, vec![2.0, 1.0]), (2, vec![1.0, 3.0])] {
            let frequencies = normalized(&counts);
            let expected = normalized(&restricted_phi.iter().map(|topic| dot(&frequencies, topic)).collect_vec());
            for (expected, actual) in expected.iter().zip_eq(&prediction.theta[row]) {
                assert_relative_eq!(*expected, *actual, epsilon = 1e-12);
            }
        }
        assert_eq!(vec![0.5, 0.5], prediction.theta[1]);
        assert_eq!(
            vec![PredictWarning::EmptyIntersection { row: 1, document: "d2".to_string() }],
            prediction.warnings
        );
    }
}
