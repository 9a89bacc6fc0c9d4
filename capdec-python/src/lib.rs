//! Python bindings for the capture decoder with numpy output.
//!
//! This module exposes decoded streams as numpy arrays: every stream as a 2D
//! float64 array, and labeled streams additionally as a dict of natively typed
//! 1D columns.

use capdec_core::{
    decode_records, parse_dir, ColumnData, DecodedTable, NumericArray, ParseError, ParseOptions,
    ResultAggregate, StreamLayout, TypeTag,
};
use numpy::ndarray::Array2;
use numpy::{IntoPyArray, PyArray2};
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use serde_json::Value;

/// Decoded content of one capture container.
#[pyclass]
pub struct Capture {
    result: ResultAggregate,
}

#[pymethods]
impl Capture {
    /// Returns the number of decoded streams.
    fn __len__(&self) -> usize {
        self.result.data().len()
    }

    /// Returns a string representation.
    fn __repr__(&self) -> String {
        format!(
            "Capture(streams={}, tables={}, diagnostics={})",
            self.result.data().len(),
            self.result.tables().len(),
            self.result.diagnostics().len()
        )
    }

    /// Returns the header document as a dict.
    #[getter]
    fn header(&self, py: Python<'_>) -> PyResult<PyObject> {
        json_to_py(py, self.result.header())
    }

    /// Returns every stream as a 2D float64 numpy array.
    #[getter]
    fn data(&self, py: Python<'_>) -> PyResult<PyObject> {
        let dict = PyDict::new(py);
        for (name, array) in self.result.data() {
            dict.set_item(name, array_to_py(py, array)?)?;
        }
        Ok(dict.into())
    }

    /// Returns labeled streams as dicts of column name to numpy array.
    ///
    /// Columns keep their decoded type (uint8, int16, float32, ...).
    #[getter]
    fn tables(&self, py: Python<'_>) -> PyResult<PyObject> {
        let dict = PyDict::new(py);
        for (name, table) in self.result.tables() {
            dict.set_item(name, table_to_py(py, table)?)?;
        }
        Ok(dict.into())
    }

    /// Returns the names of all decoded streams.
    #[getter]
    fn streams(&self) -> Vec<String> {
        self.result.stream_names().map(str::to_string).collect()
    }

    /// Returns non-fatal problems found while decoding, as messages.
    #[getter]
    fn diagnostics(&self) -> Vec<String> {
        self.result
            .diagnostics()
            .iter()
            .map(|d| d.to_string())
            .collect()
    }

    /// Returns `{"header": ..., "data": ...}`.
    fn to_dict(&self, py: Python<'_>) -> PyResult<PyObject> {
        let dict = PyDict::new(py);
        dict.set_item("header", self.header(py)?)?;
        dict.set_item("data", self.data(py)?)?;
        Ok(dict.into())
    }
}

fn array_to_py<'py>(py: Python<'py>, array: &NumericArray) -> PyResult<&'py PyArray2<f64>> {
    let matrix = Array2::from_shape_vec((array.rows, array.cols), array.values.clone())
        .map_err(|e| PyValueError::new_err(format!("Invalid array shape: {}", e)))?;
    Ok(matrix.into_pyarray(py))
}

fn table_to_py(py: Python<'_>, table: &DecodedTable) -> PyResult<PyObject> {
    let dict = PyDict::new(py);
    for column in &table.columns {
        let name = column.name.as_str();
        match &column.data {
            ColumnData::Float32(v) => dict.set_item(name, v.clone().into_pyarray(py))?,
            ColumnData::Double(v) => dict.set_item(name, v.clone().into_pyarray(py))?,
            ColumnData::Int16(v) => dict.set_item(name, v.clone().into_pyarray(py))?,
            ColumnData::UInt16(v) => dict.set_item(name, v.clone().into_pyarray(py))?,
            ColumnData::Int32(v) => dict.set_item(name, v.clone().into_pyarray(py))?,
            ColumnData::UInt32(v) => dict.set_item(name, v.clone().into_pyarray(py))?,
            ColumnData::Int64(v) => dict.set_item(name, v.clone().into_pyarray(py))?,
            ColumnData::UInt64(v) => dict.set_item(name, v.clone().into_pyarray(py))?,
            ColumnData::Char(v) => dict.set_item(name, v.clone().into_pyarray(py))?,
            ColumnData::UChar(v) => dict.set_item(name, v.clone().into_pyarray(py))?,
        }
    }
    Ok(dict.into())
}

fn json_to_py(py: Python<'_>, value: &Value) -> PyResult<PyObject> {
    Ok(match value {
        Value::Null => py.None(),
        Value::Bool(b) => b.to_object(py),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_object(py)
            } else if let Some(u) = n.as_u64() {
                u.to_object(py)
            } else {
                n.as_f64().unwrap_or(f64::NAN).to_object(py)
            }
        }
        Value::String(s) => s.to_object(py),
        Value::Array(items) => {
            let list = PyList::empty(py);
            for item in items {
                list.append(json_to_py(py, item)?)?;
            }
            list.into()
        }
        Value::Object(map) => {
            let dict = PyDict::new(py);
            for (key, item) in map {
                dict.set_item(key, json_to_py(py, item)?)?;
            }
            dict.into()
        }
    })
}

/// Unreadable containers raise `IOError`, invalid header content `ValueError`.
fn parse_error_to_py(error: ParseError) -> PyErr {
    let message = format!("Failed to decode container: {}", error);
    if error.is_container_failure() {
        PyIOError::new_err(message)
    } else {
        PyValueError::new_err(message)
    }
}

/// Decodes a capture container unpacked into a directory.
///
/// Args:
///     path: Directory holding header.json, <stream>.bin and <stream>.json files
///     strict_types: Fail on unsupported channel types instead of skipping them
///     record_count: Record count to use instead of the header's recordCount
///     header: Name of the header entry
///
/// Returns:
///     Capture: header, data, tables and diagnostics of the container
///
/// Raises:
///     IOError: The directory or its header entry cannot be read
///     ValueError: The header or a configuration is invalid
///
/// Example:
///     >>> import capdec
///     >>> capture = capdec.decode_dir("capture/")
///     >>> gps = capture.tables["gps"]
///     >>> lat = gps["lat"]  # numpy array
#[pyfunction]
#[pyo3(signature = (path, strict_types=false, record_count=None, header="header"))]
fn decode_dir(
    py: Python<'_>,
    path: &str,
    strict_types: bool,
    record_count: Option<u64>,
    header: &str,
) -> PyResult<Py<Capture>> {
    let options = ParseOptions::new()
        .header_entry(header)
        .strict_field_types(strict_types)
        .record_count(record_count);

    let result = parse_dir(path, &options).map_err(parse_error_to_py)?;

    Py::new(py, Capture { result })
}

/// Decodes a single record blob.
///
/// This is useful when the blob has already been read from the container.
///
/// Args:
///     channels: List of (name, type) pairs in record order
///     record_count: Number of records in the blob
///     data: Raw little-endian record bytes
///
/// Returns:
///     dict: Column name to numpy array
#[pyfunction]
fn decode_bytes(
    py: Python<'_>,
    channels: Vec<(String, String)>,
    record_count: usize,
    data: &[u8],
) -> PyResult<PyObject> {
    let fields = channels
        .into_iter()
        .map(|(name, type_name)| {
            type_name
                .parse::<TypeTag>()
                .map(|tag| (name, tag))
                .map_err(|e| PyValueError::new_err(e.to_string()))
        })
        .collect::<PyResult<Vec<_>>>()?;

    let layout = StreamLayout::new("bytes", fields)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    let table = decode_records(&layout, record_count, data)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;

    table_to_py(py, &table)
}

/// Capture container decoder module for Python.
#[pymodule]
fn _capdec(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(decode_dir, m)?)?;
    m.add_function(wrap_pyfunction!(decode_bytes, m)?)?;
    m.add_class::<Capture>()?;
    Ok(())
}
