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

use std::borrow::Borrow;
use std::hash::Hash;
use crate::matrix::dense::top_n;
use crate::matrix::{DocumentLength, DocumentTo, Probability, TopicId, TopicTo, WordFrequency, WordId, WordTo};
use crate::vocabulary::BasicVocabulary;

/// Read access to the topic-term side of a model.
pub trait BasicTopicModel: Send + Sync {
    /// The number of topics (K).
    fn topic_count(&self) -> usize;

    #[inline]
    fn k(&self) -> usize {
        self.topic_count()
    }

    /// The number of terms known to the model.
    fn vocabulary_size(&self) -> usize;

    /// phi, one row per topic.
    fn topics(&self) -> &TopicTo<WordTo<Probability>>;

    /// How often every term occurred in the training matrix.
    fn used_vocab_frequency(&self) -> &WordTo<WordFrequency>;

    /// The number of tokens seen during training.
    fn token_count(&self) -> u64 {
        self.used_vocab_frequency().iter().sum()
    }

    fn get_probability(&self, topic_id: TopicId, word_id: WordId) -> Option<&Probability> {
        self.topics().get(topic_id)?.get(word_id)
    }

    /// The ids of the `n` most probable terms per topic, ties are broken by the lower id.
    fn get_n_best_for_topics(&self, n: usize) -> TopicTo<Vec<WordId>> {
        self.topics().iter().map(|topic| top_n(topic, n)).collect()
    }
}

/// Read access to the training documents of a model.
pub trait TopicModelWithDocumentStats {
    fn document_count(&self) -> usize;

    /// theta, one row per document.
    fn doc_topic_distributions(&self) -> &DocumentTo<TopicTo<Probability>>;

    fn document_lengths(&self) -> &DocumentTo<DocumentLength>;
}

/// A model whose term ids resolve to entries of type `T`.
pub trait TopicModelWithVocabulary<T, Voc>: BasicTopicModel where Voc: BasicVocabulary<T>, T: Hash + Eq {
    fn vocabulary(&self) -> &Voc;

    #[inline]
    fn get_word<'a>(&'a self, word_id: WordId) -> Option<&'a T> where Voc: 'a {
        self.vocabulary().get_value_by_id(word_id)
    }

    fn get_id<Q: ?Sized>(&self, word: &Q) -> Option<WordId> where T: Borrow<Q>, Q: Hash + Eq;

    fn contains<Q: ?Sized>(&self, word: &Q) -> bool where T: Borrow<Q>, Q: Hash + Eq;

    #[inline]
    fn get_probability_by_word<Q: ?Sized>(&self, topic_id: TopicId, word: &Q) -> Option<&Probability> where T: Borrow<Q>, Q: Hash + Eq {
        self.get_probability(topic_id, self.get_id(word)?)
    }
}
