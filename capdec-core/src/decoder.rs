//! Record block decoding.
//!
//! A record blob is `record_count` consecutive fixed-width records laid out
//! according to a [`StreamLayout`]. Decoding walks the blob record by record
//! and de-interleaves every field into its own column.

use crate::layout::StreamLayout;
use crate::types::{Column, ColumnData, DecodedTable, TypeTag};
use thiserror::Error;

/// Errors that can occur while decoding or encoding a record blob.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Record count mismatch: expected {expected} bytes ({record_count} records of {record_width} bytes), got {actual}")]
    RecordCountMismatch {
        record_count: usize,
        record_width: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Record count {record_count} overflows the addressable size for {record_width}-byte records")]
    SizeOverflow {
        record_count: usize,
        record_width: usize,
    },

    #[error("Column '{column}' is {actual}, layout expects {expected}")]
    ColumnTypeMismatch {
        column: String,
        expected: TypeTag,
        actual: TypeTag,
    },

    #[error("Table has {actual} columns, layout expects {expected}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("Column '{column}' has {actual} rows, table declares {expected}")]
    RaggedColumns {
        column: String,
        expected: usize,
        actual: usize,
    },
}

/// Decodes `record_count` records from `buffer` into a column table.
///
/// The buffer length must be exactly `layout.record_width() * record_count`.
/// Columns come back in the layout's field order, each keeping the native
/// type of its field.
pub fn decode_records(
    layout: &StreamLayout,
    record_count: usize,
    buffer: &[u8],
) -> Result<DecodedTable, RecordError> {
    let record_width = layout.record_width();
    let expected = layout
        .expected_len(record_count)
        .ok_or(RecordError::SizeOverflow {
            record_count,
            record_width,
        })?;

    if buffer.len() != expected {
        return Err(RecordError::RecordCountMismatch {
            record_count,
            record_width,
            expected,
            actual: buffer.len(),
        });
    }

    let mut data: Vec<ColumnData> = layout
        .fields()
        .iter()
        .map(|f| ColumnData::with_capacity(f.tag, record_count))
        .collect();

    for record in buffer.chunks_exact(record_width) {
        for (field, column) in layout.fields().iter().zip(data.iter_mut()) {
            column.push_le(&record[field.offset..field.offset + field.width()]);
        }
    }

    let columns = layout
        .fields()
        .iter()
        .zip(data)
        .map(|(field, data)| Column::new(field.name.clone(), data))
        .collect();

    Ok(DecodedTable {
        columns,
        row_count: record_count,
    })
}

/// Packs a column table into a record blob for `layout`.
///
/// The table must have one column per layout field, in field order, with
/// matching types and `row_count` values each.
pub fn encode_records(layout: &StreamLayout, table: &DecodedTable) -> Result<Vec<u8>, RecordError> {
    let fields = layout.fields();
    if table.columns.len() != fields.len() {
        return Err(RecordError::ColumnCountMismatch {
            expected: fields.len(),
            actual: table.columns.len(),
        });
    }

    for (field, column) in fields.iter().zip(&table.columns) {
        if column.data.tag() != field.tag {
            return Err(RecordError::ColumnTypeMismatch {
                column: column.name.clone(),
                expected: field.tag,
                actual: column.data.tag(),
            });
        }
        if column.data.len() != table.row_count {
            return Err(RecordError::RaggedColumns {
                column: column.name.clone(),
                expected: table.row_count,
                actual: column.data.len(),
            });
        }
    }

    let record_width = layout.record_width();
    let len = layout
        .expected_len(table.row_count)
        .ok_or(RecordError::SizeOverflow {
            record_count: table.row_count,
            record_width,
        })?;

    let mut buffer = vec![0u8; len];
    for (row, record) in buffer.chunks_exact_mut(record_width).enumerate() {
        for (field, column) in fields.iter().zip(&table.columns) {
            column
                .data
                .write_le(row, &mut record[field.offset..field.offset + field.width()]);
        }
    }

    Ok(buffer)
}
