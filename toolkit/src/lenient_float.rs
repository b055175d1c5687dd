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

//! Serde support for floats that may be NaN or infinite.
//!
//! Human readable formats (json) can not represent these values, so they are written as
//! `"NaN"`, `"inf"` and `"-inf"`. Binary formats keep the plain float.

use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A float that survives a round trip through json even if it is not finite.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Default)]
#[repr(transparent)]
pub struct LenientFloat(pub f64);

fn name_of(value: f64) -> &'static str {
    if value.is_nan() {
        "NaN"
    } else if value.is_sign_positive() {
        "inf"
    } else {
        "-inf"
    }
}

fn parse_name(name: &str) -> Option<f64> {
    match name {
        "NaN" | "nan" => Some(f64::NAN),
        "inf" | "Infinity" => Some(f64::INFINITY),
        "-inf" | "-Infinity" => Some(f64::NEG_INFINITY),
        _ => None
    }
}

impl Serialize for LenientFloat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer
    {
        if serializer.is_human_readable() && !self.0.is_finite() {
            serializer.serialize_str(name_of(self.0))
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for LenientFloat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Name(String),
        }

        if deserializer.is_human_readable() {
            match Repr::deserialize(deserializer)? {
                Repr::Number(value) => Ok(Self(value)),
                Repr::Name(name) => parse_name(&name)
                    .map(Self)
                    .ok_or_else(|| D::Error::custom(format!("{name:?} is not a float!")))
            }
        } else {
            f64::deserialize(deserializer).map(Self)
        }
    }
}

/// For `#[serde(with = "...")]` on `Option<f64>`.
pub mod option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use super::LenientFloat;

    pub fn serialize<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer
    {
        value.map(LenientFloat).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>
    {
        Ok(Option::<LenientFloat>::deserialize(deserializer)?.map(|value| value.0))
    }
}

/// For `#[serde(with = "...")]` on `Option<Vec<f64>>`.
pub mod option_vec {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use super::LenientFloat;

    pub fn serialize<S>(value: &Option<Vec<f64>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer
    {
        value
            .as_ref()
            .map(|values| values.iter().copied().map(LenientFloat).collect::<Vec<_>>())
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error>
    where
        D: Deserializer<'de>
    {
        Ok(
            Option::<Vec<LenientFloat>>::deserialize(deserializer)?
                .map(|values| values.into_iter().map(|value| value.0).collect())
        )
    }
}

/// For `#[serde(with = "...")]` on `Option<Vec<(usize, f64)>>`.
pub mod option_indexed {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use super::LenientFloat;

    pub fn serialize<S>(value: &Option<Vec<(usize, f64)>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer
    {
        value
            .as_ref()
            .map(|values| values.iter().map(|&(index, value)| (index, LenientFloat(value))).collect::<Vec<_>>())
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<(usize, f64)>>, D::Error>
    where
        D: Deserializer<'de>
    {
        Ok(
            Option::<Vec<(usize, LenientFloat)>>::deserialize(deserializer)?
                .map(|values| values.into_iter().map(|(index, value)| (index, value.0)).collect())
        )
    }
}

#[cfg(test)]
mod test {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "crate::lenient_float::option_vec")]
        values: Option<Vec<f64>>,
        #[serde(with = "crate::lenient_float::option")]
        single: Option<f64>,
    }

    #[test]
    fn non_finite_values_survive_json(){
        let holder = Holder { values: Some(vec![1.5, f64::NAN, f64::NEG_INFINITY]), single: Some(f64::NAN) };
        let json = serde_json::to_string(&holder).unwrap();
        assert_eq!(r#"{"values":[1.5,"NaN","-inf"],"single":"NaN"}"#, json);
        let back: Holder = serde_json::from_str(&json).unwrap();
        let values = back.values.unwrap();
        assert_eq!(1.5, values[0]);
        assert!(values[1].is_nan());
        assert_eq!(f64::NEG_INFINITY, values[2]);
        assert!(back.single.unwrap().is_nan());

        let empty: Holder = serde_json::from_str(r#"{"values":null,"single":null}"#).unwrap();
        assert!(empty.values.is_none());
        assert!(empty.single.is_none());
        assert!(serde_json::from_str::<Holder>(r#"{"values":["many"],"single":null}"#).is_err());
    }
}
