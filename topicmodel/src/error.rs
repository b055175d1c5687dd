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

use std::num::ParseFloatError;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use thiserror::Error;
use gibbslda_toolkit::from_str_ex::ParseErrorEx;
use crate::config::LdaConfigBuilderError;
use crate::predict::PredictConfigBuilderError;

pub type LdaResult<T> = Result<T, LdaError>;

/// The errors of fitting, persisting and applying a topic model.
#[derive(Debug, Error)]
pub enum LdaError {
    #[error("The parameter {name} is invalid: {explanation}")]
    InvalidConfig {
        name: &'static str,
        explanation: String,
    },
    #[error("The count matrix is invalid: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Bincode(#[from] bincode::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    ParseCount(#[from] ParseErrorEx<ParseFloatError>),
    #[error("The file {0} does not contain a known model format!")]
    UnknownModelFormat(PathBuf),
}

impl LdaError {
    pub fn invalid_config(name: &'static str, explanation: impl Into<String>) -> Self {
        Self::InvalidConfig { name, explanation: explanation.into() }
    }

    pub fn invalid_input(explanation: impl Into<String>) -> Self {
        Self::InvalidInput(explanation.into())
    }
}

impl From<LdaConfigBuilderError> for LdaError {
    fn from(value: LdaConfigBuilderError) -> Self {
        Self::invalid_config("config", value.to_string())
    }
}

impl From<PredictConfigBuilderError> for LdaError {
    fn from(value: PredictConfigBuilderError) -> Self {
        Self::invalid_config("predict config", value.to_string())
    }
}

/// The diagnostic that degraded.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, AsRefStr, Display)]
pub enum DiagnosticKind {
    LogLikelihood,
    Coherence,
    R2,
}

/// A diagnostic that could not be calculated and was replaced by NaN.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[error("{kind} degraded to NaN: {explanation}")]
pub struct DiagnosticWarning {
    pub kind: DiagnosticKind,
    /// The topic, if the warning is specific to one.
    pub topic: Option<usize>,
    pub explanation: String,
}

impl DiagnosticWarning {
    pub fn new(kind: DiagnosticKind, explanation: impl Into<String>) -> Self {
        Self { kind, topic: None, explanation: explanation.into() }
    }

    pub fn for_topic(kind: DiagnosticKind, topic: usize, explanation: impl Into<String>) -> Self {
        Self { kind, topic: Some(topic), explanation: explanation.into() }
    }
}

/// A problem with a single document during prediction, the rest of the batch is unaffected.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictWarning {
    #[error("The document {document} (row {row}) shares no term with the model, it gets a uniform topic distribution.")]
    EmptyIntersection {
        row: usize,
        document: String,
    }
}
