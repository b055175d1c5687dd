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

use crate::gibbs::counts::TopicTermTable;

/// The sweeps between two runs of the built-in side steps.
pub const SIDE_STEP_INTERVAL: usize = 10;

/// The state of the chain between two sweeps.
pub struct ChainState<'a> {
    /// The number of the sweep that just finished, starting at 1.
    pub iteration: usize,
    /// The document-topic prior, observers may refit it.
    pub alpha: &'a mut Vec<f64>,
    pub beta: &'a [f64],
    pub doc_topic: &'a [Vec<u32>],
    pub topic_term: &'a TopicTermTable,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ObserverAction {
    Continue,
    /// Ends the chain after the current sweep.
    Stop,
}

/// Runs between sweeps, every [SweepObserver::interval] sweeps.
pub trait SweepObserver {
    fn interval(&self) -> usize {
        SIDE_STEP_INTERVAL
    }

    fn after_sweep(&mut self, state: &mut ChainState) -> ObserverAction;
}

impl<F> SweepObserver for F where F: FnMut(&mut ChainState) -> ObserverAction {
    fn after_sweep(&mut self, state: &mut ChainState) -> ObserverAction {
        self(state)
    }
}

/// Calls `observer` with an interval of 1.
pub struct EverySweep<O>(pub O);

impl<O> SweepObserver for EverySweep<O> where O: SweepObserver {
    fn interval(&self) -> usize {
        1
    }

    fn after_sweep(&mut self, state: &mut ChainState) -> ObserverAction {
        self.0.after_sweep(state)
    }
}
