//! The result of decoding one container.

use crate::decoder::RecordError;
use crate::types::{DecodedTable, NumericArray};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Non-fatal conditions met while decoding a container.
///
/// Each one affects a single field or stream; the rest of the container is
/// still decoded.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Diagnostic {
    #[error("Configuration '{key}': channel '{field}' has unsupported type '{type_name}' and was skipped")]
    UnsupportedFieldType {
        key: String,
        field: String,
        type_name: String,
    },

    #[error("Stream '{stream}' matches several configurations {candidates:?}, using '{chosen}'")]
    AmbiguousBinding {
        stream: String,
        chosen: String,
        candidates: Vec<String>,
    },

    #[error("Stream '{stream}' has no matching configuration and was skipped")]
    UnboundStream { stream: String },

    #[error("Stream '{stream}' has unrecognized entry type '{kind}' and was skipped")]
    UnrecognizedStreamType { stream: String, kind: String },

    #[error("Stream '{stream}' could not be read and was skipped: {reason}")]
    UnreadableEntry { stream: String, reason: String },

    #[error("Stream '{stream}' needs a record count but the header declares none")]
    MissingRecordCount { stream: String },

    #[error("Stream '{stream}': {error}")]
    Record { stream: String, error: RecordError },

    #[error("Stream '{stream}' has {actual} columns but '{key}' declares {expected} fields; no labeled table built")]
    ColumnCountMismatch {
        stream: String,
        key: String,
        expected: usize,
        actual: usize,
    },
}

impl Diagnostic {
    /// Name of the stream this diagnostic is about, if any.
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::UnsupportedFieldType { .. } => None,
            Self::AmbiguousBinding { stream, .. }
            | Self::UnboundStream { stream }
            | Self::UnrecognizedStreamType { stream, .. }
            | Self::UnreadableEntry { stream, .. }
            | Self::MissingRecordCount { stream }
            | Self::Record { stream, .. }
            | Self::ColumnCountMismatch { stream, .. } => Some(stream),
        }
    }
}

/// Borrowed `{header, data}` view of a [`ResultAggregate`].
#[derive(Debug, Clone, Copy)]
pub struct DataView<'a> {
    pub header: &'a Value,
    pub data: &'a BTreeMap<String, NumericArray>,
}

/// Decoded content of one container.
///
/// `data` holds every stream as a homogeneous `f64` array. `tables` holds the
/// streams that could be paired with a configuration, as named columns.
#[derive(Debug, Clone)]
pub struct ResultAggregate {
    header: Value,
    data: BTreeMap<String, NumericArray>,
    tables: BTreeMap<String, DecodedTable>,
    diagnostics: Vec<Diagnostic>,
}

impl ResultAggregate {
    pub(crate) fn new(
        header: Value,
        data: BTreeMap<String, NumericArray>,
        tables: BTreeMap<String, DecodedTable>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        Self {
            header,
            data,
            tables,
            diagnostics,
        }
    }

    /// The `{header, data}` view.
    pub fn data_view(&self) -> DataView<'_> {
        DataView {
            header: &self.header,
            data: &self.data,
        }
    }

    pub fn header(&self) -> &Value {
        &self.header
    }

    pub fn data(&self) -> &BTreeMap<String, NumericArray> {
        &self.data
    }

    /// Per-stream labeled tables.
    pub fn tables(&self) -> &BTreeMap<String, DecodedTable> {
        &self.tables
    }

    pub fn table(&self, stream: &str) -> Option<&DecodedTable> {
        self.tables.get(stream)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Names of all decoded streams.
    pub fn stream_names(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }
}
