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

use std::collections::HashMap;
use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use crate::error::{DiagnosticKind, DiagnosticWarning};
use crate::matrix::dense::top_n;
use crate::matrix::{CountMatrix, DocumentId, WordId};

/// How the co-occurrence of the top terms of a topic is scored.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CoherenceMeasure {
    /// Mean over ranked pairs `i > j` of `ln((D(w_i, w_j) + 1) / D(w_j))`.
    #[default]
    LogConditional,
    /// Mean normalized pointwise mutual information of all pairs, in `[-1, 1]`.
    Npmi,
}

/// The sorted documents containing each of a set of terms.
struct DocumentIndex {
    documents: usize,
    by_term: HashMap<WordId, Vec<DocumentId>>,
}

impl DocumentIndex {
    fn new(matrix: &CountMatrix, terms: impl IntoIterator<Item=WordId>) -> Self {
        let mut by_term: HashMap<WordId, Vec<DocumentId>> = terms.into_iter().map(|term| (term, Vec::new())).collect();
        for (document, row) in matrix.rows().enumerate() {
            for (term, &count) in row.iter() {
                if count > 0 {
                    if let Some(documents) = by_term.get_mut(&term) {
                        documents.push(document);
                    }
                }
            }
        }
        Self { documents: matrix.document_count(), by_term }
    }

    fn count(&self, term: WordId) -> usize {
        self.by_term.get(&term).map_or(0, |documents| documents.len())
    }

    fn co_count(&self, a: WordId, b: WordId) -> usize {
        let (Some(a), Some(b)) = (self.by_term.get(&a), self.by_term.get(&b)) else {
            return 0
        };
        let (mut i, mut j, mut shared) = (0, 0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    shared += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        shared
    }
}

/// The coherence of every topic of `phi` by the document co-occurrence of its `top_n` terms in `matrix`.
///
/// A topic that can not be scored gets NaN and a warning.
pub fn coherence(
    matrix: &CountMatrix,
    phi: &[Vec<f64>],
    top_n_terms: usize,
    measure: CoherenceMeasure
) -> (Vec<f64>, Vec<DiagnosticWarning>) {
    let top_terms = phi.iter().map(|topic| top_n(topic, top_n_terms)).collect_vec();
    let index = DocumentIndex::new(matrix, top_terms.iter().flatten().copied().unique());

    let scored: Vec<(f64, Option<DiagnosticWarning>)> = top_terms
        .par_iter()
        .enumerate()
        .map(|(topic, terms)| {
            if terms.len() < 2 {
                return (f64::NAN, Some(DiagnosticWarning::for_topic(
                    DiagnosticKind::Coherence,
                    topic,
                    format!("Only {} terms are available, at least 2 are needed.", terms.len())
                )))
            }
            let value = match measure {
                CoherenceMeasure::LogConditional => log_conditional(&index, terms),
                CoherenceMeasure::Npmi => npmi(&index, terms),
            };
            if value.is_finite() {
                (value, None)
            } else {
                (f64::NAN, Some(DiagnosticWarning::for_topic(
                    DiagnosticKind::Coherence,
                    topic,
                    "A top term does not occur in any document."
                )))
            }
        })
        .collect();

    let mut warnings = Vec::new();
    let values = scored.into_iter().map(|(value, warning)| {
        if let Some(warning) = warning {
            log::warn!("{warning}");
            warnings.push(warning);
        }
        value
    }).collect();
    (values, warnings)
}

fn log_conditional(index: &DocumentIndex, terms: &[WordId]) -> f64 {
    let mut sum = 0.0;
    let mut pairs = 0usize;
    for i in 1..terms.len() {
        for j in 0..i {
            let conditioning = index.count(terms[j]);
            if conditioning == 0 {
                return f64::NAN
            }
            sum += ((index.co_count(terms[i], terms[j]) as f64 + 1.0) / conditioning as f64).ln();
            pairs += 1;
        }
    }
    sum / pairs as f64
}

fn npmi(index: &DocumentIndex, terms: &[WordId]) -> f64 {
    let documents = index.documents as f64;
    let mut sum = 0.0;
    let mut pairs = 0usize;
    for i in 1..terms.len() {
        for j in 0..i {
            let (count_i, count_j) = (index.count(terms[i]), index.count(terms[j]));
            if count_i == 0 || count_j == 0 {
                return f64::NAN
            }
            let joint = index.co_count(terms[i], terms[j]);
            let value = if joint == 0 {
                -1.0
            } else if joint == index.documents {
                1.0
            } else {
                let p_joint = joint as f64 / documents;
                let pmi = (p_joint / ((count_i as f64 / documents) * (count_j as f64 / documents))).ln();
                pmi / -p_joint.ln()
            };
            sum += value;
            pairs += 1;
        }
    }
    sum / pairs as f64
}

#[cfg(test)]
mod test {
    use std::str::FromStr;
    use approx::assert_relative_eq;
    use crate::diagnostics::coherence::{coherence, CoherenceMeasure};
    use crate::matrix::CountMatrix;

    // a: d0 d1 d2, b: d0 d1, c: d3
    fn corpus() -> CountMatrix {
        CountMatrix::from_counts(&[
            vec![1, 2, 0],
            vec![3, 1, 0],
            vec![1, 0, 0],
            vec![0, 0, 4],
        ]).unwrap()
    }

    #[test]
    fn log_conditional_over_ranked_pairs(){
        let phi = vec![vec![0.5, 0.3, 0.2], vec![0.1, 0.1, 0.8]];
        let (values, warnings) = coherence(&corpus(), &phi, 3, CoherenceMeasure::LogConditional);
        assert!(warnings.is_empty());
        // ranks a, b, c
        let expected = (0.0 + (1.0f64 / 3.0).ln() + (1.0f64 / 2.0).ln()) / 3.0;
        assert_relative_eq!(expected, values[0], epsilon = 1e-12);
        // ranks c, a, b
        let expected = ((1.0f64 / 1.0).ln() + (1.0f64 / 1.0).ln() + (3.0f64 / 3.0).ln()) / 3.0;
        assert_relative_eq!(expected, values[1], epsilon = 1e-12);
    }

    #[test]
    fn npmi_of_a_pair(){
        let phi = vec![vec![0.6, 0.3, 0.1], vec![0.1, 0.1, 0.8]];
        let (values, _) = coherence(&corpus(), &phi, 2, CoherenceMeasure::Npmi);
        assert_relative_eq!((4.0f64 / 3.0).ln() / 2.0f64.ln(), values[0], epsilon = 1e-12);
        // c and a never share a document
        assert_relative_eq!(-1.0, values[1]);
    }

    #[test]
    fn too_few_terms_degrade_to_nan(){
        let matrix = CountMatrix::from_counts(&[vec![1], vec![2]]).unwrap();
        let (values, warnings) = coherence(&matrix, &[vec![1.0]], 5, CoherenceMeasure::LogConditional);
        assert!(values[0].is_nan());
        assert_eq!(Some(0), warnings[0].topic);
    }

    #[test]
    fn measures_parse_from_strings(){
        assert_eq!(CoherenceMeasure::Npmi, CoherenceMeasure::from_str("npmi").unwrap());
        assert_eq!(CoherenceMeasure::LogConditional, CoherenceMeasure::from_str("log_conditional").unwrap());
        assert_eq!("log_conditional", CoherenceMeasure::default().to_string());
    }
}
