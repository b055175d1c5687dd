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

mod counts;
mod shard;
mod weights;
mod sampler;
mod observer;
mod lda;

pub use counts::*;
pub use weights::*;
pub use sampler::*;
pub use observer::*;
pub use lda::*;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Requests the end of a running chain, checked between two sweeps.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Returns `seed` or draws one from the OS. A drawn seed is logged to allow a rerun.
pub(crate) fn seed_or_random(seed: Option<u64>, purpose: &str) -> u64 {
    seed.unwrap_or_else(|| {
        let seed: u64 = rand::Rng::random(&mut rand::rng());
        log::info!("No seed for the {purpose} configured, drew {seed}.");
        seed
    })
}
