//! Core types for decoded capture data.
//!
//! This module defines the scalar type catalog used by stream configurations
//! and the table structures produced by the record decoder.

use byteorder::{ByteOrder, LittleEndian};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a channel declares a type name outside the catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported field type: {0}")]
pub struct UnsupportedFieldType(pub String);

/// Scalar field types that may appear in a stream configuration.
///
/// Each tag has a fixed byte width. Records are packed little-endian with no
/// padding between fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// IEEE 754 single precision (`float32`, `float`)
    Float32,
    /// IEEE 754 double precision (`double`)
    Double,
    /// Signed 16-bit integer (`int16`)
    Int16,
    /// Unsigned 16-bit integer (`uint16`)
    UInt16,
    /// Signed 32-bit integer (`int32`)
    Int32,
    /// Unsigned 32-bit integer (`uint32`)
    UInt32,
    /// Signed 64-bit integer (`int64`)
    Int64,
    /// Unsigned 64-bit integer (`uint64`)
    UInt64,
    /// Raw byte, signed interpretation (`char`)
    Char,
    /// Unsigned byte (`uchar`, `uint8`)
    UChar,
}

impl TypeTag {
    /// All tags, in catalog order.
    pub const ALL: [TypeTag; 10] = [
        Self::Float32,
        Self::Double,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
        Self::Char,
        Self::UChar,
    ];

    /// Looks up a tag by its configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "float32" | "float" => Some(Self::Float32),
            "double" => Some(Self::Double),
            "int16" => Some(Self::Int16),
            "uint16" => Some(Self::UInt16),
            "int32" => Some(Self::Int32),
            "uint32" => Some(Self::UInt32),
            "int64" => Some(Self::Int64),
            "uint64" => Some(Self::UInt64),
            "char" => Some(Self::Char),
            "uchar" | "uint8" => Some(Self::UChar),
            _ => None,
        }
    }

    /// Canonical configuration name of the tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Double => "double",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Char => "char",
            Self::UChar => "uchar",
        }
    }

    /// Width of one value in bytes.
    #[inline]
    pub fn width(&self) -> usize {
        match self {
            Self::Char | Self::UChar => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Float32 | Self::Int32 | Self::UInt32 => 4,
            Self::Double | Self::Int64 | Self::UInt64 => 8,
        }
    }

    /// Decodes a single little-endian value, widened to `f64`.
    ///
    /// `bytes` must hold at least [`TypeTag::width`] bytes.
    #[inline]
    pub fn decode_one(&self, bytes: &[u8]) -> f64 {
        match self {
            Self::Float32 => LittleEndian::read_f32(bytes) as f64,
            Self::Double => LittleEndian::read_f64(bytes),
            Self::Int16 => LittleEndian::read_i16(bytes) as f64,
            Self::UInt16 => LittleEndian::read_u16(bytes) as f64,
            Self::Int32 => LittleEndian::read_i32(bytes) as f64,
            Self::UInt32 => LittleEndian::read_u32(bytes) as f64,
            Self::Int64 => LittleEndian::read_i64(bytes) as f64,
            Self::UInt64 => LittleEndian::read_u64(bytes) as f64,
            Self::Char => bytes[0] as i8 as f64,
            Self::UChar => bytes[0] as f64,
        }
    }
}

impl FromStr for TypeTag {
    type Err = UnsupportedFieldType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnsupportedFieldType(s.to_string()))
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column storage that keeps the native decoded type of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Float32(Vec<f32>),
    Double(Vec<f64>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Char(Vec<i8>),
    UChar(Vec<u8>),
}

impl ColumnData {
    /// Creates empty storage for `tag` with room for `capacity` values.
    pub fn with_capacity(tag: TypeTag, capacity: usize) -> Self {
        match tag {
            TypeTag::Float32 => Self::Float32(Vec::with_capacity(capacity)),
            TypeTag::Double => Self::Double(Vec::with_capacity(capacity)),
            TypeTag::Int16 => Self::Int16(Vec::with_capacity(capacity)),
            TypeTag::UInt16 => Self::UInt16(Vec::with_capacity(capacity)),
            TypeTag::Int32 => Self::Int32(Vec::with_capacity(capacity)),
            TypeTag::UInt32 => Self::UInt32(Vec::with_capacity(capacity)),
            TypeTag::Int64 => Self::Int64(Vec::with_capacity(capacity)),
            TypeTag::UInt64 => Self::UInt64(Vec::with_capacity(capacity)),
            TypeTag::Char => Self::Char(Vec::with_capacity(capacity)),
            TypeTag::UChar => Self::UChar(Vec::with_capacity(capacity)),
        }
    }

    /// Type tag matching this storage.
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::Float32(_) => TypeTag::Float32,
            Self::Double(_) => TypeTag::Double,
            Self::Int16(_) => TypeTag::Int16,
            Self::UInt16(_) => TypeTag::UInt16,
            Self::Int32(_) => TypeTag::Int32,
            Self::UInt32(_) => TypeTag::UInt32,
            Self::Int64(_) => TypeTag::Int64,
            Self::UInt64(_) => TypeTag::UInt64,
            Self::Char(_) => TypeTag::Char,
            Self::UChar(_) => TypeTag::UChar,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Float32(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::UInt16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::UInt32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::UInt64(v) => v.len(),
            Self::Char(v) => v.len(),
            Self::UChar(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads one little-endian value from `bytes` and appends it.
    #[inline]
    pub(crate) fn push_le(&mut self, bytes: &[u8]) {
        match self {
            Self::Float32(v) => v.push(LittleEndian::read_f32(bytes)),
            Self::Double(v) => v.push(LittleEndian::read_f64(bytes)),
            Self::Int16(v) => v.push(LittleEndian::read_i16(bytes)),
            Self::UInt16(v) => v.push(LittleEndian::read_u16(bytes)),
            Self::Int32(v) => v.push(LittleEndian::read_i32(bytes)),
            Self::UInt32(v) => v.push(LittleEndian::read_u32(bytes)),
            Self::Int64(v) => v.push(LittleEndian::read_i64(bytes)),
            Self::UInt64(v) => v.push(LittleEndian::read_u64(bytes)),
            Self::Char(v) => v.push(bytes[0] as i8),
            Self::UChar(v) => v.push(bytes[0]),
        }
    }

    /// Writes the value at `row` little-endian into `out`.
    #[inline]
    pub(crate) fn write_le(&self, row: usize, out: &mut [u8]) {
        match self {
            Self::Float32(v) => LittleEndian::write_f32(out, v[row]),
            Self::Double(v) => LittleEndian::write_f64(out, v[row]),
            Self::Int16(v) => LittleEndian::write_i16(out, v[row]),
            Self::UInt16(v) => LittleEndian::write_u16(out, v[row]),
            Self::Int32(v) => LittleEndian::write_i32(out, v[row]),
            Self::UInt32(v) => LittleEndian::write_u32(out, v[row]),
            Self::Int64(v) => LittleEndian::write_i64(out, v[row]),
            Self::UInt64(v) => LittleEndian::write_u64(out, v[row]),
            Self::Char(v) => out[0] = v[row] as u8,
            Self::UChar(v) => out[0] = v[row],
        }
    }

    /// Value at `row` widened to `f64`, or `None` past the end.
    pub fn get_f64(&self, row: usize) -> Option<f64> {
        match self {
            Self::Float32(v) => v.get(row).map(|&x| x as f64),
            Self::Double(v) => v.get(row).copied(),
            Self::Int16(v) => v.get(row).map(|&x| x as f64),
            Self::UInt16(v) => v.get(row).map(|&x| x as f64),
            Self::Int32(v) => v.get(row).map(|&x| x as f64),
            Self::UInt32(v) => v.get(row).map(|&x| x as f64),
            Self::Int64(v) => v.get(row).map(|&x| x as f64),
            Self::UInt64(v) => v.get(row).map(|&x| x as f64),
            Self::Char(v) => v.get(row).map(|&x| x as f64),
            Self::UChar(v) => v.get(row).map(|&x| x as f64),
        }
    }
}

/// A named column of a decoded table.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// A column-oriented table with one column per configured field.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTable {
    /// Columns in declared field order
    pub columns: Vec<Column>,
    /// Number of values in every column
    pub row_count: usize,
}

impl DecodedTable {
    /// Looks up a column by field name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in table order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Widens the table into a row-major `f64` array.
    pub fn to_array(&self) -> NumericArray {
        let cols = self.columns.len();
        let mut values = Vec::with_capacity(self.row_count * cols);
        for row in 0..self.row_count {
            for column in &self.columns {
                values.push(column.data.get_f64(row).unwrap_or(f64::NAN));
            }
        }
        NumericArray {
            rows: self.row_count,
            cols,
            values,
        }
    }
}

/// A homogeneous 2D numeric table, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    pub rows: usize,
    pub cols: usize,
    pub values: Vec<f64>,
}

impl NumericArray {
    /// Builds an array from equal-length rows. Returns `None` for ragged input.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        let cols = rows.first().map_or(0, |r| r.len());
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let n = rows.len();
        Some(Self {
            rows: n,
            cols,
            values: rows.into_iter().flatten().collect(),
        })
    }

    /// Row `i` as a slice.
    pub fn row(&self, i: usize) -> Option<&[f64]> {
        if i >= self.rows {
            return None;
        }
        Some(&self.values[i * self.cols..(i + 1) * self.cols])
    }

    /// Column `j` copied out in row order.
    pub fn column(&self, j: usize) -> Option<Vec<f64>> {
        if j >= self.cols {
            return None;
        }
        Some(self.values.iter().skip(j).step_by(self.cols).copied().collect())
    }

    /// Pairs each column with a field name to form a labeled table.
    ///
    /// Returns `None` when the number of names differs from the column count.
    pub fn to_table(&self, names: &[&str]) -> Option<DecodedTable> {
        if names.len() != self.cols {
            return None;
        }
        let columns = names
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let data = self.column(j).unwrap_or_default();
                Column::new(*name, ColumnData::Double(data))
            })
            .collect();
        Some(DecodedTable {
            columns,
            row_count: self.rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tag_lookup() {
        assert_eq!(TypeTag::from_name("float32"), Some(TypeTag::Float32));
        assert_eq!(TypeTag::from_name("float"), Some(TypeTag::Float32));
        assert_eq!(TypeTag::from_name("uint8"), Some(TypeTag::UChar));
        assert_eq!(TypeTag::from_name("uchar"), Some(TypeTag::UChar));
        assert_eq!(TypeTag::from_name("bool"), None);
        assert_eq!(
            "string".parse::<TypeTag>(),
            Err(UnsupportedFieldType("string".to_string()))
        );
    }

    #[test]
    fn test_type_tag_widths() {
        let widths: Vec<usize> = TypeTag::ALL.iter().map(|t| t.width()).collect();
        assert_eq!(widths, vec![4, 8, 2, 2, 4, 4, 8, 8, 1, 1]);
    }

    #[test]
    fn test_decode_one_signedness() {
        assert_eq!(TypeTag::Char.decode_one(&[0xFF]), -1.0);
        assert_eq!(TypeTag::UChar.decode_one(&[0xFF]), 255.0);
        assert_eq!(TypeTag::Int16.decode_one(&(-2i16).to_le_bytes()), -2.0);
        assert_eq!(TypeTag::UInt16.decode_one(&[0xFE, 0xFF]), 65534.0);
        assert_eq!(TypeTag::Double.decode_one(&1.5f64.to_le_bytes()), 1.5);
    }

    #[test]
    fn test_numeric_array_columns() {
        let array = NumericArray::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(array.row(1), Some(&[3.0, 4.0][..]));
        assert_eq!(array.column(0), Some(vec![1.0, 3.0]));
        assert!(array.column(2).is_none());
        assert!(NumericArray::from_rows(vec![vec![1.0], vec![1.0, 2.0]]).is_none());
    }

    #[test]
    fn test_array_to_table_requires_matching_names() {
        let array = NumericArray::from_rows(vec![vec![1.0, 2.0]]).unwrap();
        assert!(array.to_table(&["x"]).is_none());

        let table = array.to_table(&["x", "y"]).unwrap();
        assert_eq!(table.column_names(), vec!["x", "y"]);
        assert_eq!(table.row_count, 1);
        assert_eq!(table.column("y").unwrap().data, ColumnData::Double(vec![2.0]));
    }
}
