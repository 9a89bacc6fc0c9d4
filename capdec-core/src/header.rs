//! Container header parsing.
//!
//! The header entry is a UTF-8 JSON document carrying the `configurations`
//! section (one channel list per stream) and the global `recordCount`.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// Key of the configuration section in the header document.
pub const CONFIGURATIONS_KEY: &str = "configurations";

/// Key of the global record count in the header document.
pub const RECORD_COUNT_KEY: &str = "recordCount";

/// Errors that can occur while reading the header entry.
#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("Header entry is empty")]
    EmptyHeader,

    #[error("Header is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Header must be a JSON object")]
    NotAnObject,

    #[error("Header has no 'configurations' section")]
    MissingConfigurationSection,

    #[error("Invalid configuration '{key}': {source}")]
    InvalidConfiguration {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One declared channel of a stream configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelSpec {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
}

/// One entry of the `configurations` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConfigurationSpec {
    #[serde(default)]
    pub channels: Option<Vec<ChannelSpec>>,
}

/// Parsed container header.
#[derive(Debug, Clone)]
pub struct Header {
    raw: Value,
    configurations: Vec<(String, ConfigurationSpec)>,
    record_count: Option<u64>,
}

impl Header {
    /// Parses the header from the raw bytes of the header entry.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.iter().all(|b| b.is_ascii_whitespace() || *b == 0) {
            return Err(HeaderError::EmptyHeader);
        }
        // Fixed-length string datasets are often NUL padded.
        let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        let raw: Value = serde_json::from_slice(&bytes[..end])?;
        Self::from_value(raw)
    }

    /// Builds a header from an already parsed JSON document.
    pub fn from_value(raw: Value) -> Result<Self, HeaderError> {
        let object = match &raw {
            Value::Null => return Err(HeaderError::EmptyHeader),
            Value::Object(map) if map.is_empty() => return Err(HeaderError::EmptyHeader),
            Value::Object(map) => map,
            _ => return Err(HeaderError::NotAnObject),
        };

        let section = object
            .get(CONFIGURATIONS_KEY)
            .ok_or(HeaderError::MissingConfigurationSection)?;
        let configurations = parse_configurations(section)?;
        let record_count = object.get(RECORD_COUNT_KEY).and_then(parse_record_count);

        Ok(Self {
            raw,
            configurations,
            record_count,
        })
    }

    /// The full header document.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    /// Configurations in declaration order.
    pub fn configurations(&self) -> &[(String, ConfigurationSpec)] {
        &self.configurations
    }

    /// Global record count shared by every blob stream, if declared.
    pub fn record_count(&self) -> Option<u64> {
        self.record_count
    }
}

fn parse_configurations(section: &Value) -> Result<Vec<(String, ConfigurationSpec)>, HeaderError> {
    let map: &Map<String, Value> = match section {
        Value::Object(map) => map,
        _ => return Err(HeaderError::MissingConfigurationSection),
    };

    map.iter()
        .map(|(key, value)| {
            let spec = ConfigurationSpec::deserialize(value).map_err(|source| {
                HeaderError::InvalidConfiguration {
                    key: key.clone(),
                    source,
                }
            })?;
            Ok((key.clone(), spec))
        })
        .collect()
}

/// Accepts a non-negative integer, an integral float, or a numeric string.
///
/// Anything else counts as absent, so only blob streams are affected.
fn parse_record_count(value: &Value) -> Option<u64> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Null => return None,
        _ => None,
    };
    if parsed.is_none() {
        warn!("Ignoring invalid '{RECORD_COUNT_KEY}' value {value}");
    }
    parsed
}
