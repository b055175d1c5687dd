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
use crate::matrix::{TopicId, WordId};

/// The topic-term counts and the per topic totals shared by all shards.
///
/// Stored term major (`term * k + topic`), the sampler reads all topics of one term per token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicTermTable {
    k: usize,
    term_topic: Vec<u64>,
    topic_total: Vec<u64>,
}

impl TopicTermTable {
    pub fn new(k: usize, vocabulary_size: usize) -> Self {
        Self {
            k,
            term_topic: vec![0; k * vocabulary_size],
            topic_total: vec![0; k],
        }
    }

    pub fn topic_count(&self) -> usize {
        self.k
    }

    pub fn term_count(&self) -> usize {
        if self.k == 0 { 0 } else { self.term_topic.len() / self.k }
    }

    #[inline]
    pub fn get(&self, topic: TopicId, term: WordId) -> u64 {
        self.term_topic[term * self.k + topic]
    }

    /// The counts of every topic for `term`.
    #[inline]
    pub fn term_row(&self, term: WordId) -> &[u64] {
        &self.term_topic[term * self.k..(term + 1) * self.k]
    }

    #[inline]
    pub fn topic_totals(&self) -> &[u64] {
        &self.topic_total
    }

    /// Adds the changes of one shard.
    ///
    /// A shard only removes tokens it counted before, so no count can drop below zero.
    pub fn apply(&mut self, delta: &TopicTermDelta) {
        for (&term, changes) in delta.by_term.iter() {
            let row = &mut self.term_topic[term * self.k..(term + 1) * self.k];
            for (count, &change) in row.iter_mut().zip(changes) {
                debug_assert!(count.checked_add_signed(change).is_some(), "count of term {term} out of range");
                *count = count.saturating_add_signed(change);
            }
        }
        for (total, &change) in self.topic_total.iter_mut().zip(&delta.totals) {
            *total = total.saturating_add_signed(change);
        }
    }
}

/// The changes a shard made to the [TopicTermTable] during the current sweep.
#[derive(Debug, Clone, Default)]
pub struct TopicTermDelta {
    k: usize,
    by_term: HashMap<WordId, Vec<i64>>,
    totals: Vec<i64>,
}

impl TopicTermDelta {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            by_term: HashMap::new(),
            totals: vec![0; k],
        }
    }

    pub fn clear(&mut self) {
        self.by_term.clear();
        self.totals.iter_mut().for_each(|value| *value = 0);
    }

    #[inline]
    pub fn term(&self, term: WordId) -> Option<&[i64]> {
        self.by_term.get(&term).map(|value| value.as_slice())
    }

    #[inline]
    pub fn totals(&self) -> &[i64] {
        &self.totals
    }

    #[inline]
    pub fn add(&mut self, topic: TopicId, term: WordId, change: i64) {
        let k = self.k;
        self.by_term.entry(term).or_insert_with(|| vec![0; k])[topic] += change;
        self.totals[topic] += change;
    }

    pub fn is_empty(&self) -> bool {
        self.by_term.values().all(|changes| changes.iter().all(|&value| value == 0))
    }
}
