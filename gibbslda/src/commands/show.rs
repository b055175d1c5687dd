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
use gibbslda_topicmodel::model::BasicTopicModel;
use gibbslda_topicmodel::TopicModel;
use crate::commands::open_output;

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub model: PathBuf,

    #[arg(long, default_value_t = 10)]
    pub top_n: usize,

    /// Add prevalence, coherence and the distinctive terms of every topic
    #[arg(long)]
    pub summary: bool,

    /// Print the diagnostics of the training as json
    #[arg(long)]
    pub diagnostics: bool,
}

pub fn execute(args: ShowArgs) -> anyhow::Result<()> {
    let model = TopicModel::load(&args.model)
        .with_context(|| format!("Failed to load the model {}", args.model.display()))?;
    let mut out = open_output(None)?;
    if args.summary {
        writeln!(out, "{} topics, {} sweeps", model.topic_count(), model.iterations())?;
        for topic in model.summary(args.top_n) {
            writeln!(out, "{topic}")?;
        }
    } else {
        model.write_topics(args.top_n, &mut out)?;
        writeln!(out)?;
    }
    if args.diagnostics {
        serde_json::to_writer_pretty(&mut out, model.diagnostics())?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}
