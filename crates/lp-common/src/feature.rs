use std::collections::HashMap;
use std::fs;
use std::path::Path;

use encoding_rs::SHIFT_JIS;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::release::SourceFormat;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed attribute table: {0}")]
    Dbf(String),
    #[error("malformed feature collection: {0}")]
    GeoJson(#[from] serde_json::Error),
}

/// 1地点分のフラットな属性マップ。ジオメトリは持たない（読み飛ばす）。
///
/// Shapefile / GeoJSON どちらの配布形態でも、値はすべて文字列として
/// 揃える（GeoJSON の数値・真偽値は文字列化、null と空セルは欠損扱い）。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feature {
    attributes: HashMap<String, String>,
}

impl Feature {
    pub fn from_attributes<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            attributes: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

#[derive(Debug, Default)]
pub struct FeatureCollection {
    features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn from_features(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }
}

/// 配布ファイルを読み込んで属性のみのコレクションに落とす。
///
/// Shapefile 指定時はジオメトリ本体（.shp）には触れず、
/// 属性テーブルのサイドカー（.dbf）だけを開く。
pub fn read_source(path: &Path, format: SourceFormat) -> Result<FeatureCollection, SourceError> {
    match format {
        SourceFormat::GeoJson => {
            let bytes = read_bytes(path)?;
            parse_geojson(&bytes)
        }
        SourceFormat::Shapefile => {
            let dbf_path = path.with_extension("dbf");
            let bytes = read_bytes(&dbf_path)?;
            parse_dbf(&bytes)
        }
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, SourceError> {
    fs::read(path).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[derive(Deserialize)]
struct GeoJsonDoc {
    #[serde(default)]
    features: Vec<GeoJsonFeature>,
}

// geometry はフィールドごと宣言しないことで読み飛ばす
#[derive(Deserialize)]
struct GeoJsonFeature {
    #[serde(default)]
    properties: serde_json::Map<String, Value>,
}

pub fn parse_geojson(bytes: &[u8]) -> Result<FeatureCollection, SourceError> {
    let doc: GeoJsonDoc = serde_json::from_slice(bytes)?;

    let features = doc
        .features
        .into_iter()
        .map(|feature| Feature {
            attributes: feature
                .properties
                .into_iter()
                .filter_map(|(key, value)| value_to_string(value).map(|v| (key, v)))
                .collect(),
        })
        .collect();

    Ok(FeatureCollection { features })
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

const DBF_HEADER_LEN: usize = 32;
const DBF_DESCRIPTOR_LEN: usize = 32;
const DBF_DESCRIPTOR_TERMINATOR: u8 = 0x0D;

struct DbfField {
    name: String,
    len: usize,
}

/// dBASE III 属性テーブルのパース。文字セルは Shift_JIS として復号する。
///
/// レコード先頭バイトが `*` の行は削除済みレコードなので読み飛ばす。
pub fn parse_dbf(bytes: &[u8]) -> Result<FeatureCollection, SourceError> {
    if bytes.len() < DBF_HEADER_LEN {
        return Err(SourceError::Dbf("header truncated".into()));
    }

    let record_count =
        u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let record_len = u16::from_le_bytes([bytes[10], bytes[11]]) as usize;

    if header_len < DBF_HEADER_LEN + 1 || header_len > bytes.len() {
        return Err(SourceError::Dbf(format!("implausible header length {header_len}")));
    }

    let mut fields = Vec::new();
    let mut offset = DBF_HEADER_LEN;
    while offset + DBF_DESCRIPTOR_LEN <= header_len
        && bytes[offset] != DBF_DESCRIPTOR_TERMINATOR
    {
        let descriptor = &bytes[offset..offset + DBF_DESCRIPTOR_LEN];
        let name_end = descriptor[..11]
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(11);
        let name = String::from_utf8_lossy(&descriptor[..name_end])
            .trim()
            .to_string();
        fields.push(DbfField {
            name,
            len: descriptor[16] as usize,
        });
        offset += DBF_DESCRIPTOR_LEN;
    }

    if fields.is_empty() {
        return Err(SourceError::Dbf("no field descriptors".into()));
    }

    let declared_width = 1 + fields.iter().map(|f| f.len).sum::<usize>();
    if declared_width != record_len {
        return Err(SourceError::Dbf(format!(
            "record width {declared_width} does not match declared length {record_len}"
        )));
    }

    let mut features = Vec::with_capacity(record_count);
    for index in 0..record_count {
        let start = header_len + index * record_len;
        let Some(raw) = bytes.get(start..start + record_len) else {
            return Err(SourceError::Dbf(format!("record {index} out of bounds")));
        };
        if raw[0] == b'*' {
            continue;
        }

        let mut attributes = HashMap::with_capacity(fields.len());
        let mut pos = 1;
        for field in &fields {
            let cell = &raw[pos..pos + field.len];
            pos += field.len;

            let (decoded, _, _) = SHIFT_JIS.decode(cell);
            let text = decoded
                .trim_matches(|c: char| c == '\0' || c.is_whitespace())
                .to_string();
            if !text.is_empty() {
                attributes.insert(field.name.clone(), text);
            }
        }
        features.push(Feature { attributes });
    }

    Ok(FeatureCollection { features })
}
