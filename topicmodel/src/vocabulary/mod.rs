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

mod traits;

pub use traits::*;
use std::borrow::Borrow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::hash::Hash;
use std::slice::Iter;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

#[macro_export]
macro_rules! voc {
    () => {
        $crate::vocabulary::Vocabulary::default()
    };
    ($($value: expr),+ $(,)?) => {
        {
            let mut __voc = $crate::vocabulary::Vocabulary::default();
            $(
                $crate::vocabulary::VocabularyMut::add_value(&mut __voc, $value.into());
            )+
            __voc
        }
    };
}

/// A vocabulary mapping between an usize id and a specific object (term or document id).
/// Serialized as the plain list of entries in id order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(
    from = "Vec<T>",
    into = "Vec<T>",
    bound(serialize = "T: Serialize + Clone", deserialize = "T: Deserialize<'de> + Eq + Hash + Clone")
)]
pub struct Vocabulary<T> {
    id2entry: Vec<T>,
    entry2id: HashMap<T, usize>,
}

impl<T> Vocabulary<T> {
    /// Create a new empty vocabulary but sets the [capacity] of the mappings.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id2entry: Vec::with_capacity(capacity),
            entry2id: HashMap::with_capacity(capacity),
        }
    }
}

impl<T> Vocabulary<T> where T: Eq + Hash + Clone {
    /// Creates a vocabulary where every entry has to be unique.
    /// Returns the first duplicate as error.
    pub fn try_from_unique(entries: Vec<T>) -> Result<Self, T> {
        let mut entry2id = HashMap::with_capacity(entries.len());
        for (id, entry) in entries.iter().enumerate() {
            if entry2id.insert(entry.clone(), id).is_some() {
                return Err(entry.clone())
            }
        }
        Ok(Self { id2entry: entries, entry2id })
    }
}

impl<T> Default for Vocabulary<T> {
    fn default() -> Self {
        Self {
            id2entry: Vec::new(),
            entry2id: HashMap::new(),
        }
    }
}

impl<T> BasicVocabulary<T> for Vocabulary<T> {
    fn len(&self) -> usize {
        self.id2entry.len()
    }

    fn iter(&self) -> Iter<T> {
        self.id2entry.iter()
    }

    fn get_value_by_id(&self, id: usize) -> Option<&T> {
        self.id2entry.get(id)
    }
}

impl<T> SearchableVocabulary<T> for Vocabulary<T> where T: Eq + Hash {
    fn get_id<Q: ?Sized>(&self, q: &Q) -> Option<usize>
    where
        T: Borrow<Q>,
        Q: Hash + Eq
    {
        self.entry2id.get(q).copied()
    }
}

impl<T> VocabularyMut<T> for Vocabulary<T> where T: Eq + Hash + Clone {
    fn add_value(&mut self, value: T) -> usize {
        match self.entry2id.entry(value) {
            Entry::Occupied(entry) => {
                *entry.get()
            }
            Entry::Vacant(entry) => {
                let id = self.id2entry.len();
                self.id2entry.push(entry.key().clone());
                entry.insert(id);
                id
            }
        }
    }
}

impl<T> AsRef<[T]> for Vocabulary<T> {
    fn as_ref(&self) -> &[T] {
        &self.id2entry
    }
}

/// Keeps the first occurrence of duplicated entries.
impl<T> From<Vec<T>> for Vocabulary<T> where T: Eq + Hash + Clone {
    fn from(value: Vec<T>) -> Self {
        let mut voc = Self::with_capacity(value.len());
        for entry in value {
            voc.add_value(entry);
        }
        voc
    }
}

impl<T> From<Vocabulary<T>> for Vec<T> {
    fn from(value: Vocabulary<T>) -> Self {
        value.id2entry
    }
}

impl<T> PartialEq for Vocabulary<T> where T: PartialEq {
    fn eq(&self, other: &Self) -> bool {
        self.id2entry == other.id2entry
    }
}

impl<T: Display> Display for Vocabulary<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Vocabulary<{}>:\n", self.id2entry.len())?;
        write!(f, "{}", self.id2entry.iter().enumerate().map(|(id, value)| format!("    {id}: {value}")).join("\n"))
    }
}

#[cfg(test)]
mod test {
    use crate::vocabulary::{BasicVocabulary, SearchableVocabulary, Vocabulary, VocabularyMut};

    #[test]
    fn ids_are_stable(){
        let mut voc: Vocabulary<String> = voc!["plane", "wing"];
        assert_eq!(1, voc.add("wing"));
        assert_eq!(2, voc.add("deck"));
        assert_eq!(Some(2), voc.get_id("deck"));
        assert_eq!(Some(&"plane".to_string()), voc.get_value_by_id(0));
        assert!(!voc.contains_value("foil"));
    }

    #[test]
    fn detects_duplicates(){
        let err = Vocabulary::try_from_unique(vec!["a".to_string(), "b".to_string(), "a".to_string()]).unwrap_err();
        assert_eq!("a", err);
    }

    #[test]
    fn serializes_as_list(){
        let voc: Vocabulary<String> = voc!["plane", "wing"];
        let ser = serde_json::to_string(&voc).unwrap();
        assert_eq!(r#"["plane","wing"]"#, ser);
        let de: Vocabulary<String> = serde_json::from_str(&ser).unwrap();
        assert_eq!(voc, de);
        assert_eq!(Some(1), de.get_id("wing"));
    }
}
