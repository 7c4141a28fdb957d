//! JSON response helpers.
//!
//! Standard output carries exactly one JSON document per invocation, so
//! everything else (logs, diagnostics) must go to stderr.

use std::io::{self, Write};

use serde::Serialize;

/// Writes `value` as a single line of JSON to `writer`.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_json<W: Write, T: Serialize + ?Sized>(mut writer: W, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes `value` as a single line of JSON to stdout.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    write_json(io::stdout().lock(), value)
}
