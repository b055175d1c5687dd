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

use std::path::PathBuf;
use anyhow::Context;
use clap::Args;
use gibbslda_topicmodel::{PredictConfig, PredictMethod, TopicModel};
use crate::commands::{open_output, MatrixArgs};

#[derive(Debug, Args)]
pub struct PredictArgs {
    /// A model saved by train
    pub model: PathBuf,

    #[command(flatten)]
    pub matrix: MatrixArgs,

    #[arg(long, default_value_t = PredictMethod::Gibbs)]
    pub method: PredictMethod,

    /// Sweeps of the gibbs method
    #[arg(long)]
    pub iterations: Option<usize>,

    #[arg(long, allow_negative_numbers = true)]
    pub burnin: Option<isize>,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// The csv file for the distributions, stdout if absent
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl PredictArgs {
    pub fn config(&self) -> anyhow::Result<PredictConfig> {
        let config = PredictConfig {
            method: self.method,
            iterations: self.iterations,
            burnin: self.burnin,
            seed: self.seed,
            workers: self.workers,
        };
        config.validate()?;
        Ok(config)
    }
}

pub fn execute(args: PredictArgs) -> anyhow::Result<()> {
    let config = args.config()?;
    let model = TopicModel::load(&args.model)
        .with_context(|| format!("Failed to load the model {}", args.model.display()))?;
    let matrix = args.matrix.read()?;
    let prediction = model.predictor().predict(&matrix, &config)?;
    if !prediction.warnings.is_empty() {
        log::warn!("{} of {} documents share no term with the model.", prediction.warnings.len(), prediction.documents.len());
    }
    prediction.write_csv(open_output(args.output.as_deref())?)?;
    Ok(())
}
