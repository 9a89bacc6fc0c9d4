//! Routing of raw container entries to the right decode path.
//!
//! Streams are tied to configurations by name: a stream `gps` belongs to the
//! configuration `gpsConfiguration`. All bindings are resolved up front, before
//! any entry is decoded, so every stream sees the same catalog view.

use crate::aggregate::Diagnostic;
use crate::container::RawStreamEntry;
use crate::decoder::decode_records;
use crate::layout::{ConfigurationCatalog, StreamLayout};
use crate::types::{DecodedTable, NumericArray};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Suffix joining a stream name to its configuration key.
pub const CONFIGURATION_SUFFIX: &str = "Configuration";

/// How a stream was matched to layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// First layout in declaration order whose key contains the stream name
    pub layout: usize,
    /// Layout whose key is exactly `<stream>Configuration`
    pub exact: Option<usize>,
}

/// Stream name to layout associations for one container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamBindings {
    bindings: BTreeMap<String, Binding>,
}

impl StreamBindings {
    /// Binds every stream name to layouts of `catalog`.
    ///
    /// Blobs decode with the first key in declaration order containing `name`.
    /// Arrays are labeled only through the key `<name>Configuration`. When
    /// several keys contain the name, an [`Diagnostic::AmbiguousBinding`] is
    /// reported. Names with no match are left unbound.
    pub fn resolve<'a, I>(catalog: &ConfigurationCatalog, names: I) -> (Self, Vec<Diagnostic>)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let layouts = catalog.layouts();
        let mut bindings = BTreeMap::new();
        let mut diagnostics = Vec::new();

        for name in names {
            let exact_key = format!("{name}{CONFIGURATION_SUFFIX}");
            let candidates: Vec<usize> = layouts
                .iter()
                .enumerate()
                .filter(|(_, l)| l.key().contains(name))
                .map(|(i, _)| i)
                .collect();

            let Some(&first) = candidates.first() else {
                continue;
            };
            if candidates.len() > 1 {
                let diagnostic = Diagnostic::AmbiguousBinding {
                    stream: name.to_string(),
                    chosen: layouts[first].key().to_string(),
                    candidates: candidates
                        .iter()
                        .map(|&i| layouts[i].key().to_string())
                        .collect(),
                };
                warn!("{diagnostic}");
                diagnostics.push(diagnostic);
            }

            let exact = candidates
                .iter()
                .copied()
                .find(|&i| layouts[i].key() == exact_key);
            bindings.insert(
                name.to_string(),
                Binding {
                    layout: first,
                    exact,
                },
            );
        }

        (Self { bindings }, diagnostics)
    }

    pub fn get(&self, stream: &str) -> Option<Binding> {
        self.bindings.get(stream).copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// What dispatching one entry produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamOutcome {
    pub data: Option<NumericArray>,
    pub table: Option<DecodedTable>,
    pub diagnostics: Vec<Diagnostic>,
}

impl StreamOutcome {
    fn skipped(diagnostic: Diagnostic) -> Self {
        warn!("{diagnostic}");
        Self {
            diagnostics: vec![diagnostic],
            ..Self::default()
        }
    }
}

/// Routes entries to direct storage or to the record decoder.
#[derive(Debug, Clone, Copy)]
pub struct StreamDispatcher<'a> {
    catalog: &'a ConfigurationCatalog,
    bindings: &'a StreamBindings,
    record_count: Option<u64>,
}

impl<'a> StreamDispatcher<'a> {
    pub fn new(
        catalog: &'a ConfigurationCatalog,
        bindings: &'a StreamBindings,
        record_count: Option<u64>,
    ) -> Self {
        Self {
            catalog,
            bindings,
            record_count,
        }
    }

    fn layout(&self, index: usize) -> Option<&'a StreamLayout> {
        self.catalog.layouts().get(index)
    }

    /// Dispatches one non-header entry.
    pub fn dispatch(&self, name: &str, entry: RawStreamEntry) -> StreamOutcome {
        match entry {
            RawStreamEntry::Array(array) => self.dispatch_array(name, array),
            RawStreamEntry::Blob(bytes) => self.dispatch_blob(name, &bytes),
            RawStreamEntry::Other { kind } => {
                StreamOutcome::skipped(Diagnostic::UnrecognizedStreamType {
                    stream: name.to_string(),
                    kind,
                })
            }
        }
    }

    /// Pre-shaped arrays are stored as is. Only an exact configuration match
    /// labels their columns.
    fn dispatch_array(&self, name: &str, array: NumericArray) -> StreamOutcome {
        let mut outcome = StreamOutcome::default();

        let layout = self
            .bindings
            .get(name)
            .and_then(|b| b.exact)
            .and_then(|i| self.layout(i));

        if let Some(layout) = layout {
            match array.to_table(&layout.field_names()) {
                Some(table) => outcome.table = Some(table),
                None => {
                    let diagnostic = Diagnostic::ColumnCountMismatch {
                        stream: name.to_string(),
                        key: layout.key().to_string(),
                        expected: layout.fields().len(),
                        actual: array.cols,
                    };
                    warn!("{diagnostic}");
                    outcome.diagnostics.push(diagnostic);
                }
            }
        }

        debug!(
            stream = %name,
            rows = array.rows,
            cols = array.cols,
            labeled = outcome.table.is_some(),
            "stored array stream"
        );
        outcome.data = Some(array);
        outcome
    }

    fn dispatch_blob(&self, name: &str, bytes: &[u8]) -> StreamOutcome {
        let Some(layout) = self.bindings.get(name).and_then(|b| self.layout(b.layout)) else {
            return StreamOutcome::skipped(Diagnostic::UnboundStream {
                stream: name.to_string(),
            });
        };

        let Some(record_count) = self.record_count else {
            return StreamOutcome::skipped(Diagnostic::MissingRecordCount {
                stream: name.to_string(),
            });
        };
        let record_count = usize::try_from(record_count).unwrap_or(usize::MAX);

        match decode_records(layout, record_count, bytes) {
            Ok(table) => {
                debug!(
                    stream = %name,
                    key = %layout.key(),
                    records = record_count,
                    "decoded record stream"
                );
                StreamOutcome {
                    data: Some(table.to_array()),
                    table: Some(table),
                    diagnostics: Vec::new(),
                }
            }
            Err(error) => StreamOutcome::skipped(Diagnostic::Record {
                stream: name.to_string(),
                error,
            }),
        }
    }
}
