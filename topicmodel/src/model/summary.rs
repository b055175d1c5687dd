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

use std::fmt::{Display, Formatter};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use crate::matrix::dense::top_n;
use crate::matrix::{Probability, TopicId};
use crate::model::{TopicModel, TopicModelWithVocabulary};

/// One row of a topic summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub topic: TopicId,
    /// Share of the training tokens in percent.
    pub prevalence: f64,
    /// Present if the model was trained with coherence.
    pub coherence: Option<f64>,
    /// The most probable terms of the topic.
    pub top_terms: Vec<(String, Probability)>,
    /// The terms with the highest `P(topic | term)`.
    pub distinctive_terms: Vec<(String, Probability)>,
}

impl Display for TopicSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Topic({}) {:.2}%", self.topic, self.prevalence)?;
        if let Some(coherence) = self.coherence {
            write!(f, " coherence {coherence:.4}")?;
        }
        write!(f, ": {}", self.top_terms.iter().map(|(word, _)| word).join(", "))?;
        write!(f, " | {}", self.distinctive_terms.iter().map(|(word, _)| word).join(", "))
    }
}

impl TopicModel {
    /// Summarizes every topic with its `n` best terms.
    pub fn summary(&self, n: usize) -> Vec<TopicSummary> {
        let prevalence = self.prevalence();
        let coherence = self.diagnostics().coherence.as_ref();
        self.top_terms(n)
            .into_iter()
            .zip_eq(self.gamma())
            .enumerate()
            .map(|(topic, (top_terms, gamma))| {
                TopicSummary {
                    topic,
                    prevalence: prevalence[topic],
                    coherence: coherence.and_then(|values| values.get(topic).copied()),
                    top_terms: top_terms.into_iter().map(|(word, probability)| (word.to_string(), probability)).collect(),
                    distinctive_terms: top_n(gamma, n)
                        .into_iter()
                        .filter_map(|word_id| Some((self.get_word(word_id)?.clone(), gamma[word_id])))
                        .collect(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use crate::model::test::create_test_data;

    #[test]
    fn summarizes_every_topic(){
        let model = create_test_data();
        let summary = model.summary(2);
        assert_eq!(2, summary.len());
        assert_eq!("plane", summary[0].top_terms[0].0);
        assert_eq!(None, summary[0].coherence);
        assert_relative_eq!(100.0, summary.iter().map(|row| row.prevalence).sum::<f64>(), epsilon = 1e-9);
        // plane is far more probable in topic 0 than in topic 1
        assert_eq!("plane", summary[0].distinctive_terms[0].0);
        assert!(summary[1].to_string().starts_with("Topic(1) "));
    }
}
