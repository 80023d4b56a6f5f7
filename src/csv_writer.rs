//! CSV writer that produces CmdStan-style output
//!
//! The header is a comma separated list of column names, rows are formatted
//! with a fixed number of decimal places, and messages become comment lines.
//! This keeps the output readable by existing Stan analysis tools.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use itertools::Itertools;

use crate::writer::{TableShape, Writer};

/// Writes messages, header and rows as CSV to any `io::Write`.
pub struct CsvWriter<W: Write> {
    writer: W,
    /// Number of decimal places for floating point values
    precision: usize,
    comment_prefix: String,
    shape: TableShape,
}

impl CsvWriter<BufWriter<File>> {
    /// Create a buffered CSV file at `path`, creating parent directories as needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {:?}", dir))?;
        }
        let file =
            File::create(path).with_context(|| format!("Failed to create CSV file: {:?}", path))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> CsvWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            precision: 6,
            comment_prefix: "# ".to_string(),
            shape: TableShape::default(),
        }
    }

    /// Set the precision (number of decimal places) for floating point values.
    ///
    /// Default is 6 decimal places.
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Set the prefix of message lines. Default is `"# "`.
    pub fn with_comment_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.comment_prefix = prefix.into();
        self
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush().context("Failed to flush CSV output")?;
        Ok(self.writer)
    }

    fn format_value(&self, value: f64) -> String {
        if value.is_nan() {
            "NA".to_string()
        } else if value.is_infinite() {
            if value > 0.0 { "Inf" } else { "-Inf" }.to_string()
        } else {
            format!("{:.prec$}", value, prec = self.precision)
        }
    }
}

impl<W: Write> Writer for CsvWriter<W> {
    fn message(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            writeln!(self.writer, "{}", self.comment_prefix.trim_end())?;
            return Ok(());
        }
        for line in text.lines() {
            writeln!(self.writer, "{}{}", self.comment_prefix, line)?;
        }
        Ok(())
    }

    fn header(&mut self, names: &[String]) -> Result<()> {
        self.shape.set_header(names)?;
        writeln!(self.writer, "{}", names.join(","))?;
        Ok(())
    }

    fn row(&mut self, values: &[f64]) -> Result<()> {
        self.shape.check_row(values)?;
        let row = values.iter().map(|&v| self.format_value(v)).join(",");
        writeln!(self.writer, "{}", row)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush CSV output")
    }
}
