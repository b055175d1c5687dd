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

mod sparse;
pub mod dense;
pub mod triplets;

pub use sparse::*;

pub type TopicTo<T> = Vec<T>;
pub type WordTo<T> = Vec<T>;
pub type DocumentTo<T> = Vec<T>;
pub type Probability = f64;
pub type WordId = usize;
pub type TopicId = usize;
pub type DocumentId = usize;
pub type WordFrequency = u64;
pub type DocumentLength = u64;
