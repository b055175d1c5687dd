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
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use crate::error::{LdaError, LdaResult};
use crate::model::TopicModel;

/// Marks a deflated bincode model.
const BINARY_MAGIC: &[u8; 5] = b"GLDA\x01";

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelFormat {
    /// Pretty printed json.
    #[default]
    Json,
    /// Deflated bincode behind a magic tag.
    Binary,
}

impl TopicModel {
    /// Saves the model to `path`, an existing file is replaced.
    pub fn save(&self, path: impl AsRef<Path>, format: ModelFormat) -> LdaResult<()> {
        log::info!("Save model as {format} to {}", path.as_ref().display());
        let mut writer = BufWriter::new(File::create(path)?);
        match format {
            ModelFormat::Json => {
                serde_json::to_writer_pretty(&mut writer, self)?;
            }
            ModelFormat::Binary => {
                writer.write_all(BINARY_MAGIC)?;
                let mut encoder = DeflateEncoder::new(&mut writer, Compression::default());
                bincode::serialize_into(&mut encoder, self)?;
                encoder.finish()?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Loads a model saved by [TopicModel::save], the format is detected from the content.
    pub fn load(path: impl AsRef<Path>) -> LdaResult<Self> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);
        let mut head = Vec::with_capacity(BINARY_MAGIC.len());
        (&mut reader).take(BINARY_MAGIC.len() as u64).read_to_end(&mut head)?;
        let model: TopicModel = if head.as_slice() == BINARY_MAGIC {
            log::debug!("Load binary model from {}", path.display());
            bincode::deserialize_from(DeflateDecoder::new(reader))?
        } else {
            match head.iter().find(|value| !value.is_ascii_whitespace()) {
                Some(b'{') => {
                    log::debug!("Load json model from {}", path.display());
                    serde_json::from_reader(head.as_slice().chain(reader))?
                }
                _ => return Err(LdaError::UnknownModelFormat(path.to_path_buf()))
            }
        };
        model.validate()?;
        Ok(model)
    }

    /// Writes theta as csv, see [write_distributions].
    pub fn write_theta(&self, out: impl Write) -> LdaResult<()> {
        write_distributions(out, self.documents.as_ref(), &self.theta)
    }
}

/// Writes row distributions as csv: a `document` column followed by one column per topic.
pub fn write_distributions<W: Write>(
    out: W,
    documents: impl IntoIterator<Item=impl AsRef<str>>,
    rows: &[Vec<f64>]
) -> LdaResult<()> {
    let mut writer = csv::Writer::from_writer(out);
    let k = rows.first().map_or(0, |row| row.len());
    let mut header = Vec::with_capacity(k + 1);
    header.push("document".to_string());
    header.extend((0..k).map(|topic| format!("topic_{topic}")));
    writer.write_record(&header)?;
    for (document, row) in documents.into_iter().zip(rows) {
        let mut record = Vec::with_capacity(k + 1);
        record.push(document.as_ref().to_string());
        record.extend(row.iter().map(|value| value.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use std::io::Write;
    use crate::error::LdaError;
    use crate::model::io::{write_distributions, ModelFormat};
    use crate::model::test::create_test_data;
    use crate::model::TopicModel;
    use crate::test_data::two_clusters;
    use crate::{GibbsLda, LdaConfig};

    #[test]
    fn round_trips_both_formats(){
        let model = create_test_data();
        let dir = tempfile::tempdir().unwrap();
        for format in [ModelFormat::Json, ModelFormat::Binary] {
            let path = dir.path().join(format!("model.{format}"));
            model.save(&path, format).unwrap();
            let loaded = TopicModel::load(&path).unwrap();
            assert_eq!(model, loaded, "{format}");
        }
    }

    #[test]
    fn trained_models_survive_json_bit_for_bit(){
        let matrix = two_clusters(10, 6);
        let config = LdaConfig::builder()
            .k(3)
            .iterations(30)
            .burnin(10)
            .optimize_alpha(true)
            .calc_likelihood(true)
            .calc_r2(true)
            .seed(17)
            .build()
            .unwrap();
        let model = GibbsLda::new(config).unwrap().fit(&matrix).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trained.json");
        model.save(&path, ModelFormat::Json).unwrap();
        let loaded = TopicModel::load(&path).unwrap();
        let bits = |rows: &[Vec<f64>]| rows.iter().flatten().map(|value| value.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(model.phi()), bits(loaded.phi()));
        assert_eq!(bits(model.theta()), bits(loaded.theta()));
        assert_eq!(bits(model.gamma()), bits(loaded.gamma()));
        assert_eq!(model, loaded);
    }

    #[test]
    fn rejects_unknown_files(){
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "phi,theta").unwrap();
        assert!(matches!(TopicModel::load(file.path()), Err(LdaError::UnknownModelFormat(_))));
    }

    #[test]
    fn rejects_models_with_broken_shapes(){
        let model = create_test_data();
        let mut value = serde_json::to_value(&model).unwrap();
        value["phi"][1].as_array_mut().unwrap().pop();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();
        assert!(matches!(TopicModel::load(&path), Err(LdaError::InvalidInput(_))));

        let mut value = serde_json::to_value(&model).unwrap();
        value["gamma"].as_array_mut().unwrap().pop();
        std::fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();
        assert!(matches!(TopicModel::load(&path), Err(LdaError::InvalidInput(_))));
    }

    #[test]
    fn writes_csv_rows(){
        let mut out = Vec::new();
        write_distributions(&mut out, ["a", "b"], &[vec![0.25, 0.75], vec![1.0, 0.0]]).unwrap();
        assert_eq!("document,topic_0,topic_1\na,0.25,0.75\nb,1,0\n", String::from_utf8(out).unwrap());
    }
}
