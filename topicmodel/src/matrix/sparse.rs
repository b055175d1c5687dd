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
use sprs::{CsMat, CsVecView, TriMat};
use crate::error::{LdaError, LdaResult};
use crate::matrix::{DocumentLength, WordFrequency};
use crate::vocabulary::{BasicVocabulary, SearchableVocabulary, Vocabulary};

/// A sparse document-term count matrix.
/// Rows are documents, columns are terms, both are named.
#[derive(Debug, Clone)]
pub struct CountMatrix {
    // always CSR
    counts: CsMat<u32>,
    documents: Vocabulary<String>,
    terms: Vocabulary<String>,
}

impl CountMatrix {
    /// Wraps `counts`, a CSC matrix is converted to CSR.
    /// The names have to be unique and fit the shape of `counts`.
    pub fn new(counts: CsMat<u32>, documents: Vec<String>, terms: Vec<String>) -> LdaResult<Self> {
        if counts.rows() != documents.len() {
            return Err(LdaError::invalid_input(format!(
                "The matrix has {} rows but {} document ids were given!",
                counts.rows(),
                documents.len()
            )))
        }
        if counts.cols() != terms.len() {
            return Err(LdaError::invalid_input(format!(
                "The matrix has {} columns but {} terms were given!",
                counts.cols(),
                terms.len()
            )))
        }
        let documents = Vocabulary::try_from_unique(documents)
            .map_err(|duplicate| LdaError::invalid_input(format!("The document id {duplicate:?} is used twice!")))?;
        let terms = Vocabulary::try_from_unique(terms)
            .map_err(|duplicate| LdaError::invalid_input(format!("The term {duplicate:?} is used twice!")))?;
        let counts = if counts.is_csr() {
            counts
        } else {
            counts.to_other_storage()
        };
        Ok(Self { counts, documents, terms })
    }

    /// Creates a matrix from `(row, column, value)` triplets. Duplicated cells are summed up.
    /// Every value has to be a nonnegative integer.
    pub fn from_triplets<I>(documents: Vec<String>, terms: Vec<String>, triplets: I) -> LdaResult<Self>
    where
        I: IntoIterator<Item=(usize, usize, f64)>
    {
        let mut builder = TriMat::new((documents.len(), terms.len()));
        for (row, column, value) in triplets {
            if row >= documents.len() || column >= terms.len() {
                return Err(LdaError::invalid_input(format!(
                    "The cell ({row}, {column}) is outside of the {}x{} matrix!",
                    documents.len(),
                    terms.len()
                )))
            }
            let count = to_count(value, row, column)?;
            if count > 0 {
                builder.add_triplet(row, column, count);
            }
        }
        let counts: CsMat<u32> = builder.to_csr();
        Self::new(counts, documents, terms)
    }

    /// Creates a matrix from dense rows of real values, they have to be nonnegative integers.
    pub fn from_dense(rows: &[Vec<f64>], documents: Vec<String>, terms: Vec<String>) -> LdaResult<Self> {
        if let Some((row, _)) = rows.iter().find_position(|row| row.len() != terms.len()) {
            return Err(LdaError::invalid_input(format!(
                "The row {row} has {} columns, but there are {} terms!",
                rows[row].len(),
                terms.len()
            )))
        }
        let triplets = rows
            .iter()
            .enumerate()
            .flat_map(|(row, values)| values.iter().enumerate().map(move |(column, value)| (row, column, *value)))
            .filter(|(_, _, value)| *value != 0.0)
            .collect_vec();
        Self::from_triplets(documents, terms, triplets)
    }

    /// Creates a matrix from dense integer rows, documents are named `doc_{i}` and terms `term_{j}`.
    pub fn from_counts(rows: &[Vec<u32>]) -> LdaResult<Self> {
        let width = rows.first().map_or(0, |row| row.len());
        if let Some((row, _)) = rows.iter().find_position(|row| row.len() != width) {
            return Err(LdaError::invalid_input(format!("The row {row} has not the expected {width} columns!")))
        }
        let triplets = rows
            .iter()
            .enumerate()
            .flat_map(|(row, values)| values.iter().enumerate().map(move |(column, value)| (row, column, *value as f64)))
            .filter(|(_, _, value)| *value != 0.0)
            .collect_vec();
        Self::from_triplets(
            (0..rows.len()).map(|i| format!("doc_{i}")).collect(),
            (0..width).map(|j| format!("term_{j}")).collect(),
            triplets
        )
    }

    pub fn document_count(&self) -> usize {
        self.counts.rows()
    }

    pub fn term_count(&self) -> usize {
        self.counts.cols()
    }

    /// The number of stored cells.
    pub fn nnz(&self) -> usize {
        self.counts.nnz()
    }

    pub fn documents(&self) -> &Vocabulary<String> {
        &self.documents
    }

    pub fn terms(&self) -> &Vocabulary<String> {
        &self.terms
    }

    pub fn counts(&self) -> &CsMat<u32> {
        &self.counts
    }

    pub fn row(&self, document: usize) -> Option<CsVecView<'_, u32>> {
        self.counts.outer_view(document)
    }

    /// Iterates the documents in row order.
    pub fn rows(&self) -> impl Iterator<Item=CsVecView<'_, u32>> + '_ {
        self.counts.outer_iterator()
    }

    /// The number of tokens per document.
    pub fn document_lengths(&self) -> Vec<DocumentLength> {
        self.rows().map(|row| row.iter().map(|(_, &count)| count as u64).sum()).collect()
    }

    /// The number of occurrences of every term.
    pub fn term_frequencies(&self) -> Vec<WordFrequency> {
        let mut frequencies = vec![0u64; self.term_count()];
        for (&term, &count) in self.counts.indices().iter().zip_eq(self.counts.data()) {
            frequencies[term] += count as u64;
        }
        frequencies
    }

    pub fn total_tokens(&self) -> u64 {
        self.counts.data().iter().map(|&count| count as u64).sum()
    }

    /// Fails if a document or term has no occurrence at all, the sampler can not work on those.
    pub fn validate_for_training(&self) -> LdaResult<()> {
        if self.document_count() == 0 || self.term_count() == 0 {
            return Err(LdaError::invalid_input(format!(
                "The matrix is empty ({}x{})!",
                self.document_count(),
                self.term_count()
            )))
        }
        let empty_documents = self.document_lengths()
            .iter()
            .positions(|&length| length == 0)
            .collect_vec();
        if !empty_documents.is_empty() {
            return Err(LdaError::invalid_input(format!(
                "{} documents have no tokens, e.g. {}",
                empty_documents.len(),
                self.describe(&self.documents, &empty_documents)
            )))
        }
        let empty_terms = self.term_frequencies()
            .iter()
            .positions(|&frequency| frequency == 0)
            .collect_vec();
        if !empty_terms.is_empty() {
            return Err(LdaError::invalid_input(format!(
                "{} terms never occur, e.g. {}",
                empty_terms.len(),
                self.describe(&self.terms, &empty_terms)
            )))
        }
        Ok(())
    }

    fn describe(&self, names: &Vocabulary<String>, ids: &[usize]) -> String {
        ids.iter()
            .take(5)
            .filter_map(|&id| names.get_value_by_id(id))
            .map(|name| format!("{name:?}"))
            .join(", ")
    }

    /// Drops every document without tokens and every term without occurrences.
    pub fn prune_empty(&self) -> LdaResult<Self> {
        let kept_documents = self.document_lengths().iter().positions(|&length| length > 0).collect_vec();
        let kept_terms = self.term_frequencies().iter().positions(|&frequency| frequency > 0).collect_vec();
        let mut term_mapping = vec![None; self.term_count()];
        for (new_id, &old_id) in kept_terms.iter().enumerate() {
            term_mapping[old_id] = Some(new_id);
        }
        let mut triplets = Vec::with_capacity(self.nnz());
        for (new_row, &old_row) in kept_documents.iter().enumerate() {
            if let Some(row) = self.row(old_row) {
                for (term, &count) in row.iter() {
                    if let Some(column) = term_mapping[term] {
                        triplets.push((new_row, column, count as f64));
                    }
                }
            }
        }
        if kept_documents.len() != self.document_count() || kept_terms.len() != self.term_count() {
            log::info!(
                "Pruned {} empty documents and {} unused terms.",
                self.document_count() - kept_documents.len(),
                self.term_count() - kept_terms.len()
            );
        }
        Self::from_triplets(
            kept_documents.iter().map(|&id| self.documents.as_ref()[id].clone()).collect(),
            kept_terms.iter().map(|&id| self.terms.as_ref()[id].clone()).collect(),
            triplets
        )
    }

    /// Re-indexes the columns to `vocabulary`. Terms unknown to `vocabulary` are dropped,
    /// terms of `vocabulary` missing here become empty columns.
    /// Returns the aligned matrix and the number of shared terms.
    pub fn align_to(&self, vocabulary: &Vocabulary<String>) -> LdaResult<(Self, usize)> {
        let mapping = self.terms.iter().map(|term| vocabulary.get_id(term.as_str())).collect_vec();
        let shared = mapping.iter().flatten().count();
        let mut triplets = Vec::with_capacity(self.nnz());
        for (document, row) in self.rows().enumerate() {
            for (term, &count) in row.iter() {
                if let Some(column) = mapping[term] {
                    triplets.push((document, column, count as f64));
                }
            }
        }
        let aligned = Self::from_triplets(
            self.documents.as_ref().to_vec(),
            vocabulary.as_ref().to_vec(),
            triplets
        )?;
        Ok((aligned, shared))
    }

    pub fn to_dense(&self) -> Vec<Vec<u32>> {
        self.rows().map(|row| {
            let mut dense = vec![0u32; self.term_count()];
            for (term, &count) in row.iter() {
                dense[term] = count;
            }
            dense
        }).collect()
    }
}

fn to_count(value: f64, row: usize, column: usize) -> LdaResult<u32> {
    if value.is_nan() || value < 0.0 {
        return Err(LdaError::invalid_input(format!("The value {value} at ({row}, {column}) is negative or NaN!")))
    }
    if value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(LdaError::invalid_input(format!("The value {value} at ({row}, {column}) is not an integer count!")))
    }
    Ok(value as u32)
}
