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

pub mod train;
pub mod predict;
pub mod show;

use std::fs::File;
use std::io::{stdout, BufWriter, Write};
use std::path::{Path, PathBuf};
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use gibbslda_topicmodel::matrix::triplets::TripletReader;
use gibbslda_topicmodel::CountMatrix;

/// Latent Dirichlet Allocation by collapsed Gibbs sampling.
#[derive(Debug, Parser)]
#[command(name = "gibbslda", author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// More log output, repeat for trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a model to a count matrix
    Train(train::TrainArgs),
    /// Infer the topics of new documents
    Predict(predict::PredictArgs),
    /// Print the topics of a model
    Show(show::ShowArgs),
}

impl Command {
    pub fn execute(self) -> anyhow::Result<()> {
        match self {
            Command::Train(args) => train::execute(args),
            Command::Predict(args) => predict::execute(args),
            Command::Show(args) => show::execute(args),
        }
    }
}

/// A count matrix as `document,term,count` lines.
#[derive(Debug, Args)]
pub struct MatrixArgs {
    /// The triplet file
    pub input: PathBuf,

    /// The field delimiter of the triplet file
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    /// Skip the first line of the triplet file
    #[arg(long)]
    pub headers: bool,
}

impl MatrixArgs {
    pub fn read(&self) -> anyhow::Result<CountMatrix> {
        if !self.delimiter.is_ascii() {
            bail!("The delimiter {:?} is not an ascii character.", self.delimiter)
        }
        TripletReader::new()
            .with_delimiter(self.delimiter as u8)
            .with_headers(self.headers)
            .read_path(&self.input)
            .with_context(|| format!("Failed to read the count matrix {}", self.input.display()))
    }
}

/// The file at `path` or stdout.
pub(crate) fn open_output(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match path {
        None => Box::new(stdout().lock()),
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?
        )),
    })
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::Path;
    use clap::Parser;
    use gibbslda_topicmodel::TopicModel;
    use crate::commands::{Cli, Command};

    fn write_corpus(dir: &Path) {
        let mut lines = String::new();
        for doc in 0..8 {
            let terms = if doc % 2 == 0 { ["engine", "wing", "pilot"] } else { ["goal", "ball", "keeper"] };
            for (position, term) in terms.iter().enumerate() {
                lines.push_str(&format!("doc{doc},{term},{}\n", 1 + (doc + position) % 3));
            }
        }
        fs::write(dir.join("train.csv"), lines).unwrap();
        fs::write(dir.join("new.csv"), "n1,ball,3\nn1,goal,1\nn2,unknown,2\n").unwrap();
    }

    fn run(args: &[&str]) {
        Cli::try_parse_from(args).unwrap().command.execute().unwrap();
    }

    #[test]
    fn train_predict_and_show(){
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path());
        let path = |name: &str| dir.path().join(name).to_string_lossy().into_owned();

        run(&[
            "gibbslda", "train", &path("train.csv"),
            "--model", &path("model.bin"), "--format", "binary",
            "-k", "2", "--iterations", "40", "--burnin", "20", "--seed", "4",
            "--likelihood", "--r2",
            "--theta", &path("theta.csv"),
        ]);
        let model = TopicModel::load(path("model.bin")).unwrap();
        assert_eq!(40, model.iterations());
        assert!(model.diagnostics().r2.is_some());
        assert!(fs::read_to_string(path("theta.csv")).unwrap().starts_with("document,topic_0,topic_1\ndoc0,"));

        run(&[
            "gibbslda", "predict", &path("model.bin"), &path("new.csv"),
            "--method", "dot", "--output", &path("predicted.csv"),
        ]);
        let predicted = fs::read_to_string(path("predicted.csv")).unwrap();
        assert_eq!(3, predicted.lines().count());
        assert!(predicted.contains("n2,0.5,0.5"));

        run(&["gibbslda", "show", &path("model.bin"), "--top-n", "3", "--summary"]);
    }

    #[test]
    fn negative_burnin_is_an_argument(){
        let cli = Cli::try_parse_from(["gibbslda", "train", "in.csv", "--model", "m.json", "--burnin", "-1"]).unwrap();
        match cli.command {
            Command::Train(args) => assert_eq!(Some(-1), args.burnin),
            other => panic!("Unexpected {other:?}"),
        }
        assert!(Cli::try_parse_from(["gibbslda", "predict", "m.json", "in.csv", "--method", "magic"]).is_err());
    }
}
