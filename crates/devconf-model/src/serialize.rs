//! Bounded, NUL-terminated serialization of the outbound document.
//!
//! The output buffer is sized from [`estimate_size`] plus [`SIZE_MARGIN`].
//! Writing past the bound is an error, and the terminated result is checked
//! against the bound once more before it is handed out.

use std::io;

use devconf_types::ConfigError;
use serde_json::Value;

/// Extra bytes reserved on top of the estimate.
pub const SIZE_MARGIN: usize = 64;

/// A serialized document followed by a single NUL byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedState {
    text: String,
}

impl SerializedState {
    /// The document text, without the terminator.
    pub fn as_str(&self) -> &str {
        &self.text[..self.text.len() - 1]
    }

    /// The document text including the trailing NUL.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        self.text.as_bytes()
    }

    /// Length without the terminator.
    pub fn len(&self) -> usize {
        self.text.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Upper bound on the compact JSON length of `value`.
///
/// Strings are counted as if every byte needed a six-byte `\u` escape.
pub fn estimate_size(value: &Value) -> usize {
    fn string_size(s: &str) -> usize {
        2 + 6 * s.len()
    }

    match value {
        Value::Null => 4,
        Value::Bool(_) => 5,
        Value::Number(n) => n.to_string().len(),
        Value::String(s) => string_size(s),
        Value::Array(items) => 2 + items.iter().map(|v| estimate_size(v) + 1).sum::<usize>(),
        Value::Object(fields) => {
            2 + fields
                .iter()
                .map(|(k, v)| string_size(k) + 1 + estimate_size(v) + 1)
                .sum::<usize>()
        }
    }
}

/// Serialize `value` within `estimate_size(value) + SIZE_MARGIN` bytes.
pub fn serialize_bounded(value: &Value) -> Result<SerializedState, ConfigError> {
    serialize_within(value, estimate_size(value) + SIZE_MARGIN)
}

/// Serialize `value` into at most `bound` bytes, terminator included.
pub fn serialize_within(value: &Value, bound: usize) -> Result<SerializedState, ConfigError> {
    let mut writer = BoundedWriter {
        buf: Vec::with_capacity(bound),
        limit: bound,
    };
    serde_json::to_writer(&mut writer, value)
        .map_err(|e| ConfigError::Serialization(e.to_string()))?;
    writer.buf.push(0);

    let mut buf = writer.buf;
    if buf.len() > bound || buf.last() != Some(&0) {
        return Err(ConfigError::Serialization(format!(
            "terminated output of {} bytes exceeds bound {bound}",
            buf.len()
        )));
    }
    buf.shrink_to_fit();
    let text = String::from_utf8(buf).map_err(|e| ConfigError::Serialization(e.to_string()))?;
    Ok(SerializedState { text })
}

struct BoundedWriter {
    buf: Vec<u8>,
    limit: usize,
}

impl io::Write for BoundedWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        // One byte stays reserved for the terminator.
        if self.buf.len() + data.len() >= self.limit {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "serialization bound exceeded",
            ));
        }
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
