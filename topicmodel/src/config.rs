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

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use serde::{Deserialize, Serialize};
use gibbslda_toolkit::normal_number::IsNormalNumber;
use gibbslda_toolkit::single_or_vec::SingleOrVec;
use crate::diagnostics::CoherenceMeasure;
use crate::error::{LdaError, LdaResult};

/// The configuration of a training run.
///
/// Can be created by the [LdaConfigBuilder] or read from json. Missing keys fall back to the
/// defaults, unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_builder::Builder)]
#[serde(default, deny_unknown_fields)]
#[builder(default, build_fn(private, name = "build_unvalidated"))]
pub struct LdaConfig {
    /// Number of topics, at least 2.
    pub k: usize,
    /// Number of sweeps over all tokens.
    pub iterations: usize,
    /// Sweeps up to and including `burnin` are discarded, later sweeps are averaged.
    /// A negative value disables the averaging, the last sweep is used.
    pub burnin: isize,
    /// Document-topic prior, a single value or one per topic.
    #[builder(setter(into))]
    pub alpha: SingleOrVec<f64>,
    /// Topic-term prior, a single value or one per term.
    #[builder(setter(into))]
    pub beta: SingleOrVec<f64>,
    pub optimize_alpha: bool,
    pub calc_likelihood: bool,
    pub calc_coherence: bool,
    pub calc_r2: bool,
    pub coherence_top_n: usize,
    pub coherence_measure: CoherenceMeasure,
    /// Seed of the random number generators, drawn from the OS if absent.
    #[builder(setter(strip_option))]
    pub seed: Option<u64>,
    /// Number of document shards sampled in parallel.
    pub workers: usize,
}

impl Default for LdaConfig {
    fn default() -> Self {
        Self {
            k: 10,
            iterations: 200,
            burnin: -1,
            alpha: SingleOrVec::Single(0.1),
            beta: SingleOrVec::Single(0.05),
            optimize_alpha: false,
            calc_likelihood: false,
            calc_coherence: false,
            calc_r2: false,
            coherence_top_n: 5,
            coherence_measure: CoherenceMeasure::default(),
            seed: None,
            workers: 1,
        }
    }
}

impl LdaConfigBuilder {
    /// Builds and validates the config.
    pub fn build(&self) -> LdaResult<LdaConfig> {
        let config = self.build_unvalidated()?;
        config.validate()?;
        Ok(config)
    }
}

impl LdaConfig {
    pub fn builder() -> LdaConfigBuilder {
        LdaConfigBuilder::default()
    }

    /// Reads and validates a json config.
    pub fn load_json(path: impl AsRef<Path>) -> LdaResult<Self> {
        let config: Self = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks everything that can be checked without knowing the vocabulary.
    pub fn validate(&self) -> LdaResult<()> {
        if self.k < 2 {
            return Err(LdaError::invalid_config("k", format!("At least 2 topics are needed, got {}.", self.k)))
        }
        if self.iterations == 0 {
            return Err(LdaError::invalid_config("iterations", "At least one sweep is needed."))
        }
        if self.workers == 0 {
            return Err(LdaError::invalid_config("workers", "At least one worker is needed."))
        }
        if let Some(start) = self.averaging_start() {
            if start >= self.iterations {
                return Err(LdaError::invalid_config(
                    "burnin",
                    format!("A burnin of {start} leaves none of the {} sweeps for averaging.", self.iterations)
                ))
            }
        }
        if self.calc_coherence && self.coherence_top_n < 2 {
            return Err(LdaError::invalid_config("coherence_top_n", "Coherence needs at least 2 terms per topic."))
        }
        check_prior("alpha", &self.alpha)?;
        check_prior("beta", &self.beta)?;
        self.resolve_alpha()?;
        Ok(())
    }

    /// The index of the last discarded sweep, if the sweeps are averaged.
    pub fn averaging_start(&self) -> Option<usize> {
        usize::try_from(self.burnin).ok()
    }

    /// The document-topic prior with one value per topic.
    pub fn resolve_alpha(&self) -> LdaResult<Vec<f64>> {
        self.alpha.broadcast(self.k).map_err(|error| LdaError::invalid_config("alpha", error.to_string()))
    }

    /// The topic-term prior with one value per term of a vocabulary of `vocabulary_size`.
    pub fn resolve_beta(&self, vocabulary_size: usize) -> LdaResult<Vec<f64>> {
        self.beta.broadcast(vocabulary_size).map_err(|error| LdaError::invalid_config("beta", error.to_string()))
    }
}

fn check_prior(name: &'static str, prior: &SingleOrVec<f64>) -> LdaResult<()> {
    if prior.as_ref().is_empty() {
        return Err(LdaError::invalid_config(name, "The prior is empty."))
    }
    match prior.iter().position(|value| !value.is_positive_finite()) {
        None => Ok(()),
        Some(position) => Err(LdaError::invalid_config(
            name,
            format!("Every value has to be positive and finite, but value {position} is {}.", prior.as_ref()[position])
        ))
    }
}

#[cfg(test)]
mod test {
    use crate::config::LdaConfig;
    use crate::diagnostics::CoherenceMeasure;
    use crate::error::LdaError;

    #[test]
    fn defaults_are_valid(){
        let config = LdaConfig::builder().build().unwrap();
        assert_eq!(LdaConfig::default(), config);
        assert_eq!(None, config.averaging_start());
        assert_eq!(vec![0.1; 10], config.resolve_alpha().unwrap());
        assert_eq!(vec![0.05; 3], config.resolve_beta(3).unwrap());
    }

    #[test]
    fn rejects_invalid_values(){
        assert!(matches!(LdaConfig::builder().k(1).build(), Err(LdaError::InvalidConfig { name: "k", .. })));
        assert!(matches!(LdaConfig::builder().iterations(0).build(), Err(LdaError::InvalidConfig { name: "iterations", .. })));
        assert!(matches!(LdaConfig::builder().workers(0).build(), Err(LdaError::InvalidConfig { name: "workers", .. })));
        assert!(matches!(
            LdaConfig::builder().iterations(5).burnin(5).build(),
            Err(LdaError::InvalidConfig { name: "burnin", .. })
        ));
        assert!(matches!(LdaConfig::builder().alpha(0.0).build(), Err(LdaError::InvalidConfig { name: "alpha", .. })));
        assert!(matches!(LdaConfig::builder().beta(f64::NAN).build(), Err(LdaError::InvalidConfig { name: "beta", .. })));
        assert!(matches!(
            LdaConfig::builder().k(3).alpha(vec![0.1, 0.2]).build(),
            Err(LdaError::InvalidConfig { name: "alpha", .. })
        ));
        assert!(matches!(
            LdaConfig::builder().calc_coherence(true).coherence_top_n(1).build(),
            Err(LdaError::InvalidConfig { name: "coherence_top_n", .. })
        ));
    }

    #[test]
    fn beta_length_is_checked_against_the_vocabulary(){
        let config = LdaConfig::builder().beta(vec![0.1, 0.1]).build().unwrap();
        assert!(config.resolve_beta(2).is_ok());
        assert!(matches!(config.resolve_beta(3), Err(LdaError::InvalidConfig { name: "beta", .. })));
    }

    #[test]
    fn reads_partial_json(){
        let config: LdaConfig = serde_json::from_str(
            r#"{"k": 4, "burnin": 10, "alpha": [0.1, 0.2, 0.3, 0.4], "coherence_measure": "npmi"}"#
        ).unwrap();
        config.validate().unwrap();
        assert_eq!(4, config.k);
        assert_eq!(Some(10), config.averaging_start());
        assert_eq!(CoherenceMeasure::Npmi, config.coherence_measure);
        assert_eq!(200, config.iterations);

        let unknown = serde_json::from_str::<LdaConfig>(r#"{"topics": 4}"#);
        assert!(unknown.is_err());
    }
}
