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

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use sealed::sealed;
use thiserror::Error;

/// The location of a value in a line based input.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct InputLocation {
    /// One based line number.
    pub line: usize,
    /// Zero based column (field) index.
    pub column: usize,
}

impl Display for InputLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A parse error that remembers what was parsed, what it was meant to be and where it came from.
#[derive(Debug, Error)]
#[error(
    "{}{}Failed parsing of {parse_target:?}.\nCause: {source}",
    .location.map(|v| format!("[{v}] ")).unwrap_or_default(),
    .tag.map(|v| format!("{v}: ")).unwrap_or_default()
)]
pub struct ParseErrorEx<E> {
    parse_target: String,
    tag: Option<&'static str>,
    location: Option<InputLocation>,
    #[source]
    source: E
}

impl<E> ParseErrorEx<E> {
    pub fn new(parse_target: String, tag: Option<&'static str>, source: E) -> Self {
        Self { parse_target, tag, location: None, source }
    }

    pub fn with_tag(parse_target: &str, tag: &'static str, source: E) -> Self {
        Self::new(parse_target.to_string(), Some(tag), source)
    }

    /// Attaches the location in the input to the error.
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.location = Some(InputLocation { line, column });
        self
    }

    pub fn location(&self) -> Option<InputLocation> {
        self.location
    }
}

#[sealed]
pub trait ParseEx {
    /// Parses like [str::parse] but keeps the input in the error.
    fn parse_ex<F: FromStr>(&self) -> Result<F, ParseErrorEx<F::Err>>;

    /// Parses like [str::parse] but keeps the input and `tag` in the error.
    fn parse_ex_tagged<F: FromStr>(&self, tag: &'static str) -> Result<F, ParseErrorEx<F::Err>>;

    /// Parses a field of a line based input, the error knows the location.
    fn parse_field<F: FromStr>(&self, tag: &'static str, line: usize, column: usize) -> Result<F, ParseErrorEx<F::Err>> {
        self.parse_ex_tagged(tag).map_err(|err| err.at(line, column))
    }
}

#[sealed]
impl ParseEx for str {
    fn parse_ex<F: FromStr>(&self) -> Result<F, ParseErrorEx<F::Err>> {
        F::from_str(self).map_err(|e| ParseErrorEx::new(self.to_string(), None, e))
    }

    fn parse_ex_tagged<F: FromStr>(&self, tag: &'static str) -> Result<F, ParseErrorEx<F::Err>> {
        F::from_str(self).map_err(|e| ParseErrorEx::with_tag(self, tag, e))
    }
}

#[cfg(test)]
mod test {
    use crate::from_str_ex::{InputLocation, ParseEx};

    #[test]
    fn errors_carry_the_tag(){
        let err = "abc".parse_ex_tagged::<u32>("count").unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("count: "), "{message}");
        assert!(message.contains("\"abc\""), "{message}");
        assert_eq!(7u32, "7".parse_ex::<u32>().unwrap());
    }

    #[test]
    fn fields_know_their_location(){
        let err = "1.5x".parse_field::<f64>("count", 3, 2).unwrap_err();
        assert_eq!(Some(InputLocation { line: 3, column: 2 }), err.location());
        assert!(err.to_string().starts_with("[3:2] count: "));
    }
}
