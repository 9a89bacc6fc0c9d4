//! End-to-end decoding of a container.
//!
//! The steps run in a fixed order, each producing an immutable value for the
//! next: header, configuration catalog, stream bindings, then one dispatch per
//! entry. Header-level failures abort the parse; per-stream failures end up in
//! the aggregate's diagnostics.

use crate::aggregate::{Diagnostic, ResultAggregate};
use crate::container::{ContainerError, DirContainer, EntrySource, RawStreamEntry};
use crate::dispatch::{StreamBindings, StreamDispatcher};
use crate::header::{Header, HeaderError};
use crate::layout::{compile_catalog, CompileOptions, LayoutError};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Name of the header entry in a container.
pub const DEFAULT_HEADER_ENTRY: &str = "header";

/// Errors that abort decoding of a whole container.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Container has no '{0}' entry")]
    MissingHeader(String),

    #[error("Header entry '{0}' is not a byte entry")]
    HeaderNotBytes(String),

    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),
}

impl ParseError {
    /// True when the container could not be read, as opposed to its header
    /// content being invalid.
    pub fn is_container_failure(&self) -> bool {
        matches!(self, Self::MissingHeader(_) | Self::Container(_))
    }
}

/// Options for [`parse_container`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Entry holding the JSON header
    pub header_entry: String,
    /// Fail on unknown channel types instead of skipping them
    pub strict_field_types: bool,
    /// Record count to use instead of the header's `recordCount`
    pub record_count_override: Option<u64>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            header_entry: DEFAULT_HEADER_ENTRY.to_string(),
            strict_field_types: false,
            record_count_override: None,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header_entry(mut self, name: impl Into<String>) -> Self {
        self.header_entry = name.into();
        self
    }

    pub fn strict_field_types(mut self, strict: bool) -> Self {
        self.strict_field_types = strict;
        self
    }

    pub fn record_count(mut self, count: Option<u64>) -> Self {
        self.record_count_override = count;
        self
    }

    fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            strict_field_types: self.strict_field_types,
        }
    }
}

/// Reads the header entry of `source`.
pub fn read_header<S: EntrySource>(
    source: &S,
    options: &ParseOptions,
) -> Result<Header, ParseError> {
    let names = source.entry_names()?;
    if !names.iter().any(|n| *n == options.header_entry) {
        return Err(ParseError::MissingHeader(options.header_entry.clone()));
    }

    match source.read_entry(&options.header_entry)? {
        RawStreamEntry::Blob(bytes) => Ok(Header::from_bytes(&bytes)?),
        _ => Err(ParseError::HeaderNotBytes(options.header_entry.clone())),
    }
}

/// Decodes every stream of a container.
pub fn parse_container<S: EntrySource>(
    source: &S,
    options: &ParseOptions,
) -> Result<ResultAggregate, ParseError> {
    let header = read_header(source, options)?;

    let compiled = compile_catalog(header.configurations(), &options.compile_options())?;
    let mut diagnostics: Vec<Diagnostic> = compiled
        .skipped
        .into_iter()
        .map(|s| Diagnostic::UnsupportedFieldType {
            key: s.key,
            field: s.field,
            type_name: s.type_name,
        })
        .collect();
    let catalog = compiled.catalog;

    let streams: Vec<String> = source
        .entry_names()?
        .into_iter()
        .filter(|n| *n != options.header_entry)
        .collect();

    let (bindings, binding_diagnostics) =
        StreamBindings::resolve(&catalog, streams.iter().map(String::as_str));
    diagnostics.extend(binding_diagnostics);

    let record_count = options.record_count_override.or(header.record_count());
    let dispatcher = StreamDispatcher::new(&catalog, &bindings, record_count);
    debug!(
        layouts = catalog.len(),
        streams = streams.len(),
        record_count = ?record_count,
        "dispatching container streams"
    );

    let mut data = BTreeMap::new();
    let mut tables = BTreeMap::new();
    for name in streams {
        let entry = match source.read_entry(&name) {
            Ok(entry) => entry,
            Err(error) if error.is_malformed_entry() => {
                let diagnostic = Diagnostic::UnreadableEntry {
                    stream: name,
                    reason: error.to_string(),
                };
                warn!("{diagnostic}");
                diagnostics.push(diagnostic);
                continue;
            }
            Err(error) => return Err(error.into()),
        };
        let outcome = dispatcher.dispatch(&name, entry);
        if let Some(array) = outcome.data {
            data.insert(name.clone(), array);
        }
        if let Some(table) = outcome.table {
            tables.insert(name.clone(), table);
        }
        diagnostics.extend(outcome.diagnostics);
    }

    info!(
        streams = data.len(),
        tables = tables.len(),
        diagnostics = diagnostics.len(),
        "decoded container"
    );

    Ok(ResultAggregate::new(header.into_raw(), data, tables, diagnostics))
}

/// Decodes a container unpacked into a directory.
pub fn parse_dir<P: AsRef<Path>>(
    path: P,
    options: &ParseOptions,
) -> Result<ResultAggregate, ParseError> {
    let container = DirContainer::open(path)?.with_header_entry(&options.header_entry);
    parse_container(&container, options)
}
