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

//! Latent Dirichlet Allocation fitted by collapsed Gibbs sampling on sparse count matrices.
//!
//! The usual path is
//! [`CountMatrix`](matrix::CountMatrix) → [`GibbsLda::fit`](gibbs::GibbsLda::fit) →
//! [`TopicModel`](model::TopicModel) → [`Predictor`](predict::Predictor).

pub mod config;
pub mod error;
pub mod vocabulary;
pub mod matrix;
pub mod gibbs;
pub mod optimize;
pub mod posterior;
pub mod diagnostics;
pub mod predict;
pub mod model;

pub use config::{LdaConfig, LdaConfigBuilder};
pub use error::{LdaError, LdaResult};
pub use gibbs::{CancellationToken, GibbsLda};
pub use matrix::CountMatrix;
pub use model::TopicModel;
pub use predict::{Prediction, PredictConfig, PredictMethod, Predictor};
