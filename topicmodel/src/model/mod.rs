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

mod traits;
mod io;
mod summary;

pub use traits::*;
pub use io::*;
pub use summary::*;

use std::borrow::Borrow;
use std::fmt::{Display, Formatter};
use std::hash::Hash;
use std::io::Write;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use crate::diagnostics::Diagnostics;
use crate::error::{LdaError, LdaResult};
use crate::matrix::{DocumentLength, DocumentTo, Probability, TopicTo, WordFrequency, WordTo};
use crate::posterior::gamma;
use crate::predict::Predictor;
use crate::vocabulary::{BasicVocabulary, SearchableVocabulary, Vocabulary};

/// A trained topic model. Read only, new documents are handled by a [Predictor].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicModel {
    // Row = Topic
    // Col = Word
    phi: TopicTo<WordTo<Probability>>,
    // Row = Document
    // Col = Topic
    theta: DocumentTo<TopicTo<Probability>>,
    // P(topic | word), every column sums to 1
    gamma: TopicTo<WordTo<Probability>>,
    alpha: TopicTo<f64>,
    beta: WordTo<f64>,
    vocabulary: Vocabulary<String>,
    documents: Vocabulary<String>,
    document_lengths: DocumentTo<DocumentLength>,
    used_vocab_frequency: WordTo<WordFrequency>,
    iterations: usize,
    diagnostics: Diagnostics,
}

impl TopicModel {
    /// Creates a model from its distributions, gamma is derived from phi and theta.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        phi: TopicTo<WordTo<Probability>>,
        theta: DocumentTo<TopicTo<Probability>>,
        alpha: TopicTo<f64>,
        beta: WordTo<f64>,
        vocabulary: Vocabulary<String>,
        documents: Vocabulary<String>,
        document_lengths: DocumentTo<DocumentLength>,
        used_vocab_frequency: WordTo<WordFrequency>,
    ) -> LdaResult<Self> {
        check_shapes(
            &phi,
            &theta,
            &alpha,
            &beta,
            vocabulary.len(),
            documents.len(),
            &document_lengths,
            &used_vocab_frequency
        )?;
        Ok(Self {
            gamma: gamma(&phi, &theta, &document_lengths),
            phi,
            theta,
            alpha,
            beta,
            vocabulary,
            documents,
            document_lengths,
            used_vocab_frequency,
            iterations: 0,
            diagnostics: Diagnostics::default(),
        })
    }

    /// Checks a model that was not built by [TopicModel::new], e.g. one read from a file.
    pub(crate) fn validate(&self) -> LdaResult<()> {
        check_shapes(
            &self.phi,
            &self.theta,
            &self.alpha,
            &self.beta,
            self.vocabulary.len(),
            self.documents.len(),
            &self.document_lengths,
            &self.used_vocab_frequency
        )?;
        let terms = self.vocabulary.len();
        if self.gamma.len() != self.phi.len() || self.gamma.iter().any(|row| row.len() != terms) {
            return Err(LdaError::invalid_input("gamma does not match the shape of phi!"))
        }
        Ok(())
    }

    pub(crate) fn with_training_info(mut self, iterations: usize, diagnostics: Diagnostics) -> Self {
        self.iterations = iterations;
        self.diagnostics = diagnostics;
        self
    }

    pub fn phi(&self) -> &TopicTo<WordTo<Probability>> {
        &self.phi
    }

    pub fn theta(&self) -> &DocumentTo<TopicTo<Probability>> {
        &self.theta
    }

    pub fn gamma(&self) -> &TopicTo<WordTo<Probability>> {
        &self.gamma
    }

    /// The document-topic prior, refitted if the training optimized it.
    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    pub fn beta(&self) -> &[f64] {
        &self.beta
    }

    pub fn documents(&self) -> &Vocabulary<String> {
        &self.documents
    }

    /// The number of completed sweeps.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn predictor(&self) -> Predictor<'_> {
        Predictor::new(self)
    }

    /// The `n` most probable terms of every topic with their probability.
    pub fn top_terms(&self, n: usize) -> TopicTo<Vec<(&str, Probability)>> {
        self.get_n_best_for_topics(n)
            .into_iter()
            .zip_eq(&self.phi)
            .map(|(word_ids, topic)| {
                word_ids
                    .into_iter()
                    .filter_map(|word_id| Some((self.get_word(word_id)?.as_str(), topic[word_id])))
                    .collect()
            })
            .collect()
    }

    /// The share of all training tokens assigned to every topic in percent.
    pub fn prevalence(&self) -> TopicTo<f64> {
        let mut prevalence = vec![0.0; self.topic_count()];
        for (row, &length) in self.doc_topic_distributions().iter().zip_eq(self.document_lengths()) {
            for (value, probability) in prevalence.iter_mut().zip_eq(row) {
                *value += probability * length as f64;
            }
        }
        let total: f64 = prevalence.iter().sum();
        if total > 0.0 {
            prevalence.iter_mut().for_each(|value| *value = *value / total * 100.0);
        }
        prevalence
    }

    /// Writes the `n` most probable terms of every topic.
    pub fn write_topics(&self, n: usize, out: &mut impl Write) -> std::io::Result<()> {
        for (topic_id, entries) in self.top_terms(n).iter().enumerate() {
            if topic_id != 0 {
                out.write_all(b"\n")?;
            }
            write!(out, "Topic({topic_id}):")?;
            for (word, probability) in entries {
                write!(out, "\n    {word}: {probability}")?;
            }
        }
        Ok(())
    }
}

/// Fails if the parts of a model do not agree on K, the vocabulary or the documents.
#[allow(clippy::too_many_arguments)]
fn check_shapes(
    phi: &[Vec<Probability>],
    theta: &[Vec<Probability>],
    alpha: &[f64],
    beta: &[f64],
    terms: usize,
    documents: usize,
    document_lengths: &[DocumentLength],
    used_vocab_frequency: &[WordFrequency],
) -> LdaResult<()> {
    let k = phi.len();
    if k == 0 || alpha.len() != k {
        return Err(LdaError::invalid_input(format!("Got {k} topics but {} alpha values!", alpha.len())))
    }
    if let Some((topic, row)) = phi.iter().find_position(|row| row.len() != terms) {
        return Err(LdaError::invalid_input(format!("The topic {topic} has {} values for {terms} terms!", row.len())))
    }
    if beta.len() != terms || used_vocab_frequency.len() != terms {
        return Err(LdaError::invalid_input(format!(
            "Expected {terms} beta values and word frequencies, got {} and {}!",
            beta.len(),
            used_vocab_frequency.len()
        )))
    }
    if theta.len() != documents || document_lengths.len() != documents {
        return Err(LdaError::invalid_input(format!(
            "Expected {} document distributions and lengths, got {} and {}!",
            documents,
            theta.len(),
            document_lengths.len()
        )))
    }
    if let Some((document, row)) = theta.iter().find_position(|row| row.len() != k) {
        return Err(LdaError::invalid_input(format!("The document {document} has {} values for {k} topics!", row.len())))
    }
    Ok(())
}

impl BasicTopicModel for TopicModel {
    fn topic_count(&self) -> usize {
        self.phi.len()
    }

    fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    fn topics(&self) -> &TopicTo<WordTo<Probability>> {
        &self.phi
    }

    fn used_vocab_frequency(&self) -> &WordTo<WordFrequency> {
        &self.used_vocab_frequency
    }
}

impl TopicModelWithDocumentStats for TopicModel {
    fn document_count(&self) -> usize {
        self.document_lengths.len()
    }

    fn doc_topic_distributions(&self) -> &DocumentTo<TopicTo<Probability>> {
        &self.theta
    }

    fn document_lengths(&self) -> &DocumentTo<DocumentLength> {
        &self.document_lengths
    }
}

impl TopicModelWithVocabulary<String, Vocabulary<String>> for TopicModel {
    fn vocabulary(&self) -> &Vocabulary<String> {
        &self.vocabulary
    }

    delegate::delegate! {
        to self.vocabulary {
            fn get_id<Q: ?Sized>(&self, word: &Q) -> Option<usize> where String: Borrow<Q>, Q: Hash + Eq;

            #[call(contains_value)]
            fn contains<Q: ?Sized>(&self, word: &Q) -> bool where String: Borrow<Q>, Q: Hash + Eq;
        }
    }
}

impl Display for TopicModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Topic Model: {} topics, {} terms, {} documents, {} tokens, {} sweeps",
            self.topic_count(),
            self.vocabulary_size(),
            self.document_count(),
            self.token_count(),
            self.iterations
        )?;
        for (topic_id, entries) in self.top_terms(10).iter().enumerate() {
            write!(f, "\n    Topic({topic_id}): {}", entries.iter().map(|(word, _)| word).join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test {
    use approx::assert_relative_eq;
    use crate::model::{BasicTopicModel, TopicModel, TopicModelWithVocabulary};
    use crate::voc;
    use crate::vocabulary::Vocabulary;

    pub fn create_test_data() -> TopicModel {
        let vocabulary: Vocabulary<String> = voc!["plane", "aircraft", "wing", "deck", "foil"];
        let documents: Vocabulary<String> = voc!["a", "b"];
        TopicModel::new(
            vec![
                vec![0.4, 0.3, 0.2, 0.05, 0.05],
                vec![0.05, 0.05, 0.1, 0.4, 0.4],
            ],
            vec![
                vec![0.8, 0.2],
                vec![0.25, 0.75],
            ],
            vec![0.1, 0.1],
            vec![0.05; 5],
            vocabulary,
            documents,
            vec![10, 30],
            vec![10, 6, 6, 9, 9],
        ).unwrap()
    }

    #[test]
    fn shapes_are_checked(){
        let result = TopicModel::new(
            vec![vec![0.5, 0.5]],
            vec![vec![1.0]],
            vec![0.1, 0.1],
            vec![0.05; 2],
            voc!["a", "b"],
            voc!["d"],
            vec![2],
            vec![1, 1],
        );
        assert!(result.is_err());
    }

    #[test]
    fn top_terms_and_prevalence(){
        let model = create_test_data();
        assert_eq!(vec![("plane", 0.4), ("aircraft", 0.3)], model.top_terms(2)[0]);
        assert_eq!(vec![("deck", 0.4), ("foil", 0.4)], model.top_terms(2)[1]);
        let prevalence = model.prevalence();
        assert_relative_eq!(100.0, prevalence.iter().sum::<f64>(), epsilon = 1e-9);
        assert_relative_eq!((8.0 + 7.5) / 40.0 * 100.0, prevalence[0], epsilon = 1e-9);
        assert_eq!(Some(&0.2), model.get_probability_by_word(0, "wing"));
        assert!(model.contains("foil"));
        assert_eq!(2, model.k());
        assert_eq!(40, model.token_count());
    }

    #[test]
    fn writes_topics(){
        let model = create_test_data();
        let mut out = Vec::new();
        model.write_topics(1, &mut out).unwrap();
        assert_eq!("Topic(0):\n    plane: 0.4\nTopic(1):\n    deck: 0.4", String::from_utf8(out).unwrap());
    }
}
