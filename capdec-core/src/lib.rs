//! Decoder library for sensor-capture containers.
//!
//! A capture container bundles a JSON header with raw data streams (GPS, IMU,
//! CAN, ...). The header's `configurations` section describes, per stream, an
//! ordered list of typed channels. This crate compiles those descriptions into
//! fixed-width record layouts and decodes each record blob into named columns.
//!
//! # Example
//!
//! ```no_run
//! use capdec_core::{parse_dir, ParseOptions};
//!
//! let result = parse_dir("capture/", &ParseOptions::default()).unwrap();
//!
//! for (name, table) in result.tables() {
//!     println!("{}: {} rows, columns {:?}", name, table.row_count, table.column_names());
//! }
//! ```
//!
//! Decoding a single blob without a container:
//!
//! ```
//! use capdec_core::{decode_records, StreamLayout, TypeTag};
//!
//! let layout = StreamLayout::new("imuConfiguration", [("ax", TypeTag::Float32)]).unwrap();
//! let blob: Vec<u8> = [1.0f32, 2.0].iter().flat_map(|v| v.to_le_bytes()).collect();
//! let table = decode_records(&layout, 2, &blob).unwrap();
//! assert_eq!(table.row_count, 2);
//! ```
//!
//! # Features
//!
//! - Little-endian fixed-width records with ten scalar types
//! - Columns keep their native type, with a widened `f64` view per stream
//! - Pre-shaped array entries labeled from their configuration
//! - Per-stream failures reported as diagnostics instead of aborting

pub mod aggregate;
pub mod container;
pub mod decoder;
pub mod dispatch;
pub mod header;
pub mod layout;
pub mod pipeline;
pub mod types;

// Re-export commonly used types
pub use aggregate::{DataView, Diagnostic, ResultAggregate};
pub use container::{ContainerError, DirContainer, EntrySource, MemoryContainer, RawStreamEntry};
pub use decoder::{decode_records, encode_records, RecordError};
pub use dispatch::{StreamBindings, StreamDispatcher};
pub use header::{Header, HeaderError};
pub use layout::{compile_catalog, CompileOptions, ConfigurationCatalog, LayoutError, StreamLayout};
pub use pipeline::{parse_container, parse_dir, ParseError, ParseOptions};
pub use types::{Column, ColumnData, DecodedTable, NumericArray, TypeTag};
