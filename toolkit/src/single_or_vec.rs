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

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Either a single value, that is broadcast to any requested length, or an explicit vector.
///
/// Serialized untagged, so a config can contain `0.1` as well as `[0.1, 0.2]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SingleOrVec<T> {
    Single(#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))] T),
    Vec(#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))] Vec<T>),
}

/// Raised when a [SingleOrVec::Vec] does not have the requested length.
#[derive(Debug, Copy, Clone, Error, PartialEq, Eq)]
#[error("Expected a single value or a vector of length {expected} but got a vector of length {actual}!")]
pub struct BroadcastError {
    pub expected: usize,
    pub actual: usize,
}

impl<T> SingleOrVec<T> {
    /// Iterates over every contained value, a single value is returned once.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_ref().iter()
    }
}

impl<T> SingleOrVec<T> where T: Clone {
    /// Creates a vector of exactly `len` elements.
    /// A single value is repeated, a vector has to have the length `len`.
    pub fn broadcast(&self, len: usize) -> Result<Vec<T>, BroadcastError> {
        match self {
            SingleOrVec::Single(value) => {
                Ok(vec![value.clone(); len])
            }
            SingleOrVec::Vec(values) if values.len() == len => {
                Ok(values.clone())
            }
            SingleOrVec::Vec(values) => {
                Err(BroadcastError { expected: len, actual: values.len() })
            }
        }
    }
}

impl<T> AsRef<[T]> for SingleOrVec<T> {
    fn as_ref(&self) -> &[T] {
        match self {
            SingleOrVec::Single(value) => {
                std::slice::from_ref(value)
            }
            SingleOrVec::Vec(values) => {
                values.as_slice()
            }
        }
    }
}

impl<T> From<Vec<T>> for SingleOrVec<T> {
    fn from(value: Vec<T>) -> Self {
        Self::Vec(value)
    }
}

impl<T> From<T> for SingleOrVec<T> {
    fn from(value: T) -> Self {
        Self::Single(value)
    }
}

#[cfg(test)]
mod test {
    use crate::single_or_vec::{BroadcastError, SingleOrVec};

    #[test]
    fn single_values_are_broadcast(){
        let value: SingleOrVec<f64> = 0.5.into();
        assert_eq!(vec![0.5, 0.5, 0.5], value.broadcast(3).unwrap());
    }

    #[test]
    fn vectors_have_to_match(){
        let value: SingleOrVec<f64> = vec![0.1, 0.2].into();
        assert_eq!(vec![0.1, 0.2], value.broadcast(2).unwrap());
        assert_eq!(Err(BroadcastError { expected: 3, actual: 2 }), value.broadcast(3));
    }

    #[test]
    fn can_be_read_untagged(){
        let single: SingleOrVec<f64> = serde_json::from_str("0.25").unwrap();
        assert_eq!(SingleOrVec::Single(0.25), single);
        let multiple: SingleOrVec<f64> = serde_json::from_str("[0.25, 1.0]").unwrap();
        assert_eq!(vec![0.25, 1.0], multiple.iter().copied().collect::<Vec<_>>());
        assert_eq!(SingleOrVec::Vec(vec![0.25, 1.0]), multiple);
    }
}
