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

//! Helpers for the dense row-major matrices (`Vec<Vec<f64>>`) used for phi, theta and gamma.

use itertools::Itertools;
use gibbslda_toolkit::normal_number::IsNormalNumber;

/// Divides every entry by the row sum.
/// Returns false and leaves the row untouched if the sum is not positive and finite.
pub fn normalize_in_place(row: &mut [f64]) -> bool {
    let sum: f64 = row.iter().sum();
    if !sum.is_positive_finite() {
        return false
    }
    row.iter_mut().for_each(|value| *value /= sum);
    true
}

/// A normalized copy of `row`, a degenerated row becomes uniform.
pub fn normalized(row: &[f64]) -> Vec<f64> {
    let mut target = row.to_vec();
    if !normalize_in_place(&mut target) {
        return uniform(row.len())
    }
    target
}

pub fn uniform(len: usize) -> Vec<f64> {
    vec![1.0 / len as f64; len]
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip_eq(b).map(|(x, y)| x * y).sum()
}

/// `row · matrix[:, column]` for a row-major `matrix`.
pub fn dot_column(row: &[f64], matrix: &[Vec<f64>], column: usize) -> f64 {
    row.iter().zip_eq(matrix).map(|(x, matrix_row)| x * matrix_row[column]).sum()
}

/// `matrix · weights` for sparse `weights` given as `(column, value)` pairs.
/// The result has one entry per row of `matrix`.
pub fn project(weights: &[(usize, f64)], matrix: &[Vec<f64>]) -> Vec<f64> {
    matrix
        .iter()
        .map(|matrix_row| weights.iter().map(|&(column, value)| value * matrix_row[column]).sum())
        .collect()
}

pub fn transpose(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let columns = matrix.first().map_or(0, |row| row.len());
    (0..columns)
        .map(|column| matrix.iter().map(|row| row[column]).collect())
        .collect()
}

/// The `n` column ids with the highest values, ties are resolved by the lower id.
pub fn top_n(row: &[f64], n: usize) -> Vec<usize> {
    row.iter()
        .enumerate()
        .sorted_by(|(a_id, a), (b_id, b)| b.total_cmp(a).then(a_id.cmp(b_id)))
        .take(n)
        .map(|(id, _)| id)
        .collect()
}
