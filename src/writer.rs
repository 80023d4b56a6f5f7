//! Output writers for messages and tabular draws.
//!
//! A [`Writer`] has three independent channels: free text messages, a
//! header, and rows of values. The header is written exactly once before
//! any row, and every row has as many values as the header has names.

use anyhow::Result;

use crate::WriterError;

/// Destination for the output of a fit.
pub trait Writer {
    /// Write a line of free text.
    fn message(&mut self, text: &str) -> Result<()>;

    /// Write the column names. Called once, before any row.
    fn header(&mut self, names: &[String]) -> Result<()>;

    /// Write one row of values, matching the header.
    fn row(&mut self, values: &[f64]) -> Result<()>;

    /// Flush any buffered data.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<W: Writer + ?Sized> Writer for &mut W {
    fn message(&mut self, text: &str) -> Result<()> {
        (**self).message(text)
    }

    fn header(&mut self, names: &[String]) -> Result<()> {
        (**self).header(names)
    }

    fn row(&mut self, values: &[f64]) -> Result<()> {
        (**self).row(values)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Tracks the header/row contract for writers that store tables.
#[derive(Debug, Default, Clone)]
pub(crate) struct TableShape {
    columns: Option<usize>,
}

impl TableShape {
    pub(crate) fn set_header(&mut self, names: &[String]) -> Result<(), WriterError> {
        if self.columns.is_some() {
            return Err(WriterError::DuplicateHeader);
        }
        self.columns = Some(names.len());
        Ok(())
    }

    pub(crate) fn check_row(&self, values: &[f64]) -> Result<(), WriterError> {
        match self.columns {
            None => Err(WriterError::RowBeforeHeader),
            Some(expected) if expected != values.len() => Err(WriterError::ArityMismatch {
                expected,
                found: values.len(),
            }),
            Some(_) => Ok(()),
        }
    }
}

/// A writer that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWriter;

impl Writer for NullWriter {
    fn message(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn header(&mut self, _names: &[String]) -> Result<()> {
        Ok(())
    }

    fn row(&mut self, _values: &[f64]) -> Result<()> {
        Ok(())
    }
}

/// One call received by a [`BufferWriter`].
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Message(String),
    Header(Vec<String>),
    Row(Vec<f64>),
}

/// Keeps everything that was written in memory, in order.
#[derive(Debug, Default, Clone)]
pub struct BufferWriter {
    records: Vec<Record>,
    shape: TableShape,
}

impl BufferWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn messages(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter_map(|record| match record {
                Record::Message(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn header_names(&self) -> Option<&[String]> {
        self.records.iter().find_map(|record| match record {
            Record::Header(names) => Some(names.as_slice()),
            _ => None,
        })
    }

    pub fn rows(&self) -> Vec<&[f64]> {
        self.records
            .iter()
            .filter_map(|record| match record {
                Record::Row(values) => Some(values.as_slice()),
                _ => None,
            })
            .collect()
    }
}

impl Writer for BufferWriter {
    fn message(&mut self, text: &str) -> Result<()> {
        self.records.push(Record::Message(text.to_string()));
        Ok(())
    }

    fn header(&mut self, names: &[String]) -> Result<()> {
        self.shape.set_header(names)?;
        self.records.push(Record::Header(names.to_vec()));
        Ok(())
    }

    fn row(&mut self, values: &[f64]) -> Result<()> {
        self.shape.check_row(values)?;
        self.records.push(Record::Row(values.to_vec()));
        Ok(())
    }
}

/// Forwards messages to the `log` facade.
///
/// Messages are logged at info level, header and rows at debug level.
#[derive(Debug, Clone)]
pub struct LogWriter {
    target: &'static str,
}

impl LogWriter {
    pub fn new(target: &'static str) -> Self {
        Self { target }
    }
}

impl Default for LogWriter {
    fn default() -> Self {
        Self::new(module_path!())
    }
}

impl Writer for LogWriter {
    fn message(&mut self, text: &str) -> Result<()> {
        log::info!(target: self.target, "{text}");
        Ok(())
    }

    fn header(&mut self, names: &[String]) -> Result<()> {
        log::debug!(target: self.target, "header: {}", names.join(","));
        Ok(())
    }

    fn row(&mut self, values: &[f64]) -> Result<()> {
        log::debug!(target: self.target, "row: {values:?}");
        Ok(())
    }
}
