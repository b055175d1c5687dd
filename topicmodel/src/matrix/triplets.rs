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

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use csv::{ReaderBuilder, Trim};
use gibbslda_toolkit::from_str_ex::ParseEx;
use crate::error::{LdaError, LdaResult};
use crate::matrix::CountMatrix;
use crate::vocabulary::{Vocabulary, VocabularyMut};

/// Reads a count matrix from `document,term,count` lines.
///
/// Documents and terms get their ids in order of their first appearance,
/// repeated `(document, term)` pairs are summed up. Lines starting with `#` are skipped.
#[derive(Debug, Copy, Clone)]
pub struct TripletReader {
    delimiter: u8,
    has_headers: bool,
}

impl Default for TripletReader {
    fn default() -> Self {
        Self { delimiter: b',', has_headers: false }
    }
}

impl TripletReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    pub fn read_path(&self, path: impl AsRef<Path>) -> LdaResult<CountMatrix> {
        log::info!("Read count triplets from {}", path.as_ref().display());
        self.read(BufReader::new(File::open(path)?))
    }

    pub fn read(&self, reader: impl Read) -> LdaResult<CountMatrix> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(self.has_headers)
            .flexible(true)
            .trim(Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let mut documents: Vocabulary<String> = Vocabulary::default();
        let mut terms: Vocabulary<String> = Vocabulary::default();
        let mut triplets = Vec::new();
        for (record_no, record) in reader.records().enumerate() {
            let record = record?;
            let line = record.position().map_or(record_no + 1, |position| position.line() as usize);
            if record.len() != 3 {
                return Err(LdaError::invalid_input(format!(
                    "Line {line} has {} fields, expected document, term and count!",
                    record.len()
                )))
            }
            let count: f64 = record[2].parse_field("count", line, 2)?;
            let document = documents.add(&record[0]);
            let term = terms.add(&record[1]);
            triplets.push((document, term, count));
        }
        log::debug!("Read {} triplets for {} documents and {} terms.", triplets.len(), documents.as_ref().len(), terms.as_ref().len());
        CountMatrix::from_triplets(documents.into(), terms.into(), triplets)
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;
    use crate::error::LdaError;
    use crate::matrix::triplets::TripletReader;
    use crate::vocabulary::SearchableVocabulary;

    #[test]
    fn reads_and_sums_triplets(){
        let input = "# comment\nd1,plane,2\nd2,wing,1\nd1,wing,3\nd1,plane,1\n";
        let matrix = TripletReader::new().read(input.as_bytes()).unwrap();
        assert_eq!(2, matrix.document_count());
        assert_eq!(Some(1), matrix.terms().get_id("wing"));
        assert_eq!(vec![vec![3, 3], vec![0, 1]], matrix.to_dense());
    }

    #[test]
    fn reads_with_headers_and_tabs(){
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "document\tterm\tcount\na\tx\t4\n").unwrap();
        let matrix = TripletReader::new()
            .with_delimiter(b'\t')
            .with_headers(true)
            .read_path(file.path())
            .unwrap();
        assert_eq!(vec![vec![4]], matrix.to_dense());
    }

    #[test]
    fn rejects_bad_counts(){
        let fractional = TripletReader::new().read("d,t,1.5\n".as_bytes());
        assert!(matches!(fractional, Err(LdaError::InvalidInput(_))));
        let negative = TripletReader::new().read("d,t,-2\n".as_bytes());
        assert!(matches!(negative, Err(LdaError::InvalidInput(_))));
        let garbage = TripletReader::new().read("d,t,many\n".as_bytes());
        assert!(matches!(garbage, Err(LdaError::ParseCount(_))));
        let short = TripletReader::new().read("d,t\n".as_bytes());
        assert!(matches!(short, Err(LdaError::InvalidInput(_))));
    }
}
