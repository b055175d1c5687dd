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

use std::io::Write;
use std::path::PathBuf;
use anyhow::Context;
use clap::Args;
use gibbslda_topicmodel::diagnostics::CoherenceMeasure;
use gibbslda_topicmodel::model::ModelFormat;
use gibbslda_topicmodel::{GibbsLda, LdaConfig};
use crate::commands::{open_output, MatrixArgs};

#[derive(Debug, Args)]
pub struct TrainArgs {
    #[command(flatten)]
    pub matrix: MatrixArgs,

    /// Where to save the model
    #[arg(long)]
    pub model: PathBuf,

    #[arg(long, default_value_t = ModelFormat::Json)]
    pub format: ModelFormat,

    /// A json config, the flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of topics
    #[arg(short, long)]
    pub k: Option<usize>,

    #[arg(long)]
    pub iterations: Option<usize>,

    /// Sweeps discarded before averaging, negative uses the last sweep
    #[arg(long, allow_negative_numbers = true)]
    pub burnin: Option<isize>,

    /// Symmetric document-topic prior
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Symmetric topic-term prior
    #[arg(long)]
    pub beta: Option<f64>,

    #[arg(long)]
    pub optimize_alpha: bool,

    /// Trace the log-likelihood every 10 sweeps
    #[arg(long)]
    pub likelihood: bool,

    #[arg(long)]
    pub coherence: bool,

    #[arg(long)]
    pub coherence_measure: Option<CoherenceMeasure>,

    /// Number of top terms per topic scored by the coherence
    #[arg(long)]
    pub coherence_top_n: Option<usize>,

    #[arg(long)]
    pub r2: bool,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub workers: Option<usize>,

    /// Drop documents and terms without counts instead of failing
    #[arg(long)]
    pub prune: bool,

    /// Write the document-topic distributions as csv
    #[arg(long)]
    pub theta: Option<PathBuf>,

    /// Print the given number of terms per topic
    #[arg(long, default_value_t = 10)]
    pub top_n: usize,
}

impl TrainArgs {
    /// The json config or the default, with the flags applied.
    pub fn config(&self) -> anyhow::Result<LdaConfig> {
        let mut config = match &self.config {
            None => LdaConfig::default(),
            Some(path) => LdaConfig::load_json(path)
                .with_context(|| format!("Failed to load the config {}", path.display()))?,
        };
        if let Some(k) = self.k {
            config.k = k;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(burnin) = self.burnin {
            config.burnin = burnin;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha.into();
        }
        if let Some(beta) = self.beta {
            config.beta = beta.into();
        }
        config.optimize_alpha |= self.optimize_alpha;
        config.calc_likelihood |= self.likelihood;
        config.calc_coherence |= self.coherence;
        config.calc_r2 |= self.r2;
        if let Some(measure) = self.coherence_measure {
            config.coherence_measure = measure;
        }
        if let Some(top_n) = self.coherence_top_n {
            config.coherence_top_n = top_n;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        config.validate()?;
        Ok(config)
    }
}

pub fn execute(args: TrainArgs) -> anyhow::Result<()> {
    let config = args.config()?;
    let mut matrix = args.matrix.read()?;
    if args.prune {
        let pruned = matrix.prune_empty()?;
        log::info!(
            "Pruned {} documents and {} terms without counts.",
            matrix.document_count() - pruned.document_count(),
            matrix.term_count() - pruned.term_count()
        );
        matrix = pruned;
    }

    let model = GibbsLda::new(config)?.fit(&matrix)?;
    model.save(&args.model, args.format)?;
    if let Some(path) = &args.theta {
        model.write_theta(open_output(Some(path))?)?;
    }

    let mut out = open_output(None)?;
    model.write_topics(args.top_n, &mut out)?;
    writeln!(out)?;
    if !model.diagnostics().warnings.is_empty() {
        log::warn!("The training finished with {} diagnostic warnings.", model.diagnostics().warnings.len());
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use clap::Parser;
    use gibbslda_topicmodel::diagnostics::CoherenceMeasure;
    use crate::commands::{Cli, Command};

    #[test]
    fn flags_override_the_config_file(){
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.json");
        std::fs::write(&config, r#"{"k": 7, "iterations": 50, "alpha": 0.5, "calc_r2": true}"#).unwrap();
        let cli = Cli::try_parse_from([
            "gibbslda", "train", "in.csv", "--model", "out.json",
            "--config", config.to_str().unwrap(),
            "--iterations", "80", "--coherence", "--coherence-measure", "npmi", "--coherence-top-n", "15", "--alpha", "0.3",
        ]).unwrap();
        let Command::Train(args) = cli.command else { panic!("Expected train") };
        let config = args.config().unwrap();
        assert_eq!(7, config.k);
        assert_eq!(80, config.iterations);
        assert_eq!(vec![0.3; 7], config.resolve_alpha().unwrap());
        assert!(config.calc_r2);
        assert!(config.calc_coherence);
        assert_eq!(CoherenceMeasure::Npmi, config.coherence_measure);
        assert_eq!(15, config.coherence_top_n);
    }
}
