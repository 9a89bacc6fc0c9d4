//! Compilation of stream configurations into fixed-width record layouts.
//!
//! Each configuration in the header declares an ordered channel list. The
//! compiler assigns every supported channel a byte offset inside the record
//! and accumulates the total record width. Records are packed little-endian
//! with no padding.

use crate::header::ConfigurationSpec;
use crate::types::TypeTag;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that abort layout compilation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Configuration '{key}' has no channel list")]
    MissingChannelList { key: String },

    #[error("Configuration '{key}' has no decodable channels")]
    EmptyChannelList { key: String },

    #[error("Configuration '{key}': channel {index} lacks a name or type")]
    MalformedChannel { key: String, index: usize },

    #[error("Configuration '{key}': channel '{field}' has unsupported type '{type_name}'")]
    UnsupportedFieldType {
        key: String,
        field: String,
        type_name: String,
    },
}

/// Options controlling layout compilation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Reject unknown type tags instead of skipping the field.
    pub strict_field_types: bool,
}

/// A channel that was left out of its layout because its type is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedField {
    pub key: String,
    pub field: String,
    pub type_name: String,
}

/// One field of a compiled record layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub tag: TypeTag,
    /// Byte offset of the field inside one record
    pub offset: usize,
}

impl FieldDescriptor {
    #[inline]
    pub fn width(&self) -> usize {
        self.tag.width()
    }
}

/// Fixed-width record layout of one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamLayout {
    key: String,
    fields: Vec<FieldDescriptor>,
    record_width: usize,
}

impl StreamLayout {
    /// Builds a layout from `(name, tag)` pairs in record order.
    ///
    /// Fails with [`LayoutError::EmptyChannelList`] when `fields` is empty.
    pub fn new<I, S>(key: impl Into<String>, fields: I) -> Result<Self, LayoutError>
    where
        I: IntoIterator<Item = (S, TypeTag)>,
        S: Into<String>,
    {
        let key = key.into();
        let mut offset = 0;
        let fields: Vec<FieldDescriptor> = fields
            .into_iter()
            .map(|(name, tag)| {
                let field = FieldDescriptor {
                    name: name.into(),
                    tag,
                    offset,
                };
                offset += tag.width();
                field
            })
            .collect();

        if fields.is_empty() {
            return Err(LayoutError::EmptyChannelList { key });
        }

        Ok(Self {
            key,
            fields,
            record_width: offset,
        })
    }

    /// Configuration key this layout was compiled from.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Size of one record in bytes.
    pub fn record_width(&self) -> usize {
        self.record_width
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Expected blob size for `record_count` records, `None` on overflow.
    pub fn expected_len(&self, record_count: usize) -> Option<usize> {
        self.record_width.checked_mul(record_count)
    }
}

/// All compiled stream layouts of a container, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationCatalog {
    layouts: Vec<StreamLayout>,
}

impl ConfigurationCatalog {
    pub fn new(layouts: Vec<StreamLayout>) -> Self {
        Self { layouts }
    }

    /// Looks up a layout by its exact configuration key.
    pub fn get(&self, key: &str) -> Option<&StreamLayout> {
        self.layouts.iter().find(|l| l.key == key)
    }

    pub fn layouts(&self) -> &[StreamLayout] {
        &self.layouts
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

/// A compiled catalog together with the fields that were skipped.
#[derive(Debug, Clone, Default)]
pub struct CompiledCatalog {
    pub catalog: ConfigurationCatalog,
    pub skipped: Vec<SkippedField>,
}

/// Compiles every configuration of the header into a record layout.
pub fn compile_catalog(
    configurations: &[(String, ConfigurationSpec)],
    options: &CompileOptions,
) -> Result<CompiledCatalog, LayoutError> {
    let mut compiled = CompiledCatalog::default();
    let mut layouts = Vec::with_capacity(configurations.len());

    for (key, spec) in configurations {
        let layout = compile_layout(key, spec, options, &mut compiled.skipped)?;
        debug!(
            key = %key,
            fields = layout.fields().len(),
            record_width = layout.record_width(),
            "compiled stream layout"
        );
        layouts.push(layout);
    }

    compiled.catalog = ConfigurationCatalog::new(layouts);
    Ok(compiled)
}

fn compile_layout(
    key: &str,
    spec: &ConfigurationSpec,
    options: &CompileOptions,
    skipped: &mut Vec<SkippedField>,
) -> Result<StreamLayout, LayoutError> {
    let channels = spec
        .channels
        .as_ref()
        .ok_or_else(|| LayoutError::MissingChannelList {
            key: key.to_string(),
        })?;

    let mut fields = Vec::with_capacity(channels.len());
    for (index, channel) in channels.iter().enumerate() {
        let (name, type_name) = match (&channel.name, &channel.type_name) {
            (Some(name), Some(type_name)) => (name, type_name),
            _ => {
                return Err(LayoutError::MalformedChannel {
                    key: key.to_string(),
                    index,
                })
            }
        };

        match TypeTag::from_name(type_name) {
            Some(tag) => fields.push((name.clone(), tag)),
            None if options.strict_field_types => {
                return Err(LayoutError::UnsupportedFieldType {
                    key: key.to_string(),
                    field: name.clone(),
                    type_name: type_name.clone(),
                })
            }
            None => {
                warn!(
                    key = %key,
                    field = %name,
                    type_name = %type_name,
                    "skipping channel with unsupported type"
                );
                skipped.push(SkippedField {
                    key: key.to_string(),
                    field: name.clone(),
                    type_name: type_name.clone(),
                });
            }
        }
    }

    StreamLayout::new(key, fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::ChannelSpec;

    fn channel(name: &str, type_name: &str) -> ChannelSpec {
        ChannelSpec {
            name: Some(name.to_string()),
            type_name: Some(type_name.to_string()),
        }
    }

    fn config(key: &str, channels: Vec<ChannelSpec>) -> (String, ConfigurationSpec) {
        (
            key.to_string(),
            ConfigurationSpec {
                channels: Some(channels),
            },
        )
    }

    #[test]
    fn test_offsets_and_width() {
        let configs = vec![config(
            "gpsConfiguration",
            vec![
                channel("lat", "double"),
                channel("lon", "double"),
                channel("flag", "uint8"),
                channel("speed", "float"),
            ],
        )];
        let compiled = compile_catalog(&configs, &CompileOptions::default()).unwrap();
        let layout = compiled.catalog.get("gpsConfiguration").unwrap();

        assert_eq!(layout.record_width(), 21);
        let offsets: Vec<usize> = layout.fields().iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 8, 16, 17]);
        assert_eq!(layout.field_names(), vec!["lat", "lon", "flag", "speed"]);
        assert!(compiled.skipped.is_empty());
    }

    #[test]
    fn test_unknown_type_is_skipped() {
        let configs = vec![config(
            "canConfiguration",
            vec![
                channel("id", "uint32"),
                channel("payload", "bytes"),
                channel("dlc", "uchar"),
            ],
        )];
        let compiled = compile_catalog(&configs, &CompileOptions::default()).unwrap();
        let layout = compiled.catalog.get("canConfiguration").unwrap();

        assert_eq!(layout.record_width(), 5);
        assert_eq!(layout.field_names(), vec!["id", "dlc"]);
        assert_eq!(
            compiled.skipped,
            vec![SkippedField {
                key: "canConfiguration".to_string(),
                field: "payload".to_string(),
                type_name: "bytes".to_string(),
            }]
        );
    }

    #[test]
    fn test_unknown_type_strict() {
        let configs = vec![config("canConfiguration", vec![channel("payload", "bytes")])];
        let options = CompileOptions {
            strict_field_types: true,
        };
        assert!(matches!(
            compile_catalog(&configs, &options),
            Err(LayoutError::UnsupportedFieldType { .. })
        ));
    }

    #[test]
    fn test_missing_and_empty_channels() {
        let missing = vec![(
            "imuConfiguration".to_string(),
            ConfigurationSpec { channels: None },
        )];
        assert_eq!(
            compile_catalog(&missing, &CompileOptions::default()).unwrap_err(),
            LayoutError::MissingChannelList {
                key: "imuConfiguration".to_string()
            }
        );

        let empty = vec![config("imuConfiguration", vec![])];
        assert!(matches!(
            compile_catalog(&empty, &CompileOptions::default()),
            Err(LayoutError::EmptyChannelList { .. })
        ));

        let all_unknown = vec![config("imuConfiguration", vec![channel("q", "quat")])];
        assert!(matches!(
            compile_catalog(&all_unknown, &CompileOptions::default()),
            Err(LayoutError::EmptyChannelList { .. })
        ));
    }

    #[test]
    fn test_malformed_channel() {
        let configs = vec![config(
            "imuConfiguration",
            vec![
                channel("ax", "float"),
                ChannelSpec {
                    name: Some("ay".to_string()),
                    type_name: None,
                },
            ],
        )];
        assert_eq!(
            compile_catalog(&configs, &CompileOptions::default()).unwrap_err(),
            LayoutError::MalformedChannel {
                key: "imuConfiguration".to_string(),
                index: 1
            }
        );
    }

    #[test]
    fn test_catalog_keeps_declaration_order() {
        let configs = vec![
            config("zConfiguration", vec![channel("a", "int16")]),
            config("aConfiguration", vec![channel("b", "int64")]),
        ];
        let compiled = compile_catalog(&configs, &CompileOptions::default()).unwrap();
        let keys: Vec<&str> = compiled.catalog.layouts().iter().map(|l| l.key()).collect();
        assert_eq!(keys, vec!["zConfiguration", "aConfiguration"]);
    }
}
