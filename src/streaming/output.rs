//! Route document output.
//!
//! Records are written as the exact bytes they were read as; the writer only
//! adds the fixed document envelope around them.

use crate::config::DEFAULT_OUTPUT_BUFFER;
use crate::routes::{Record, Result, TripGroup};
use std::io::{BufWriter, Write};

/// Opening envelope. Downstream SUMO tooling expects this declaration
/// byte-for-byte.
pub const ROUTES_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>

<!-- Generated with SUMO Activity-Based Mobility Generator [https://github.com/lcodeca/SUMOActivityGen] -->

<routes xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:noNamespaceSchemaLocation="http://sumo.dlr.de/xsd/routes_file.xsd">
    "#;

/// Closing envelope.
pub const ROUTES_FOOTER: &str = "</routes>";

/// Buffered route document writer.
pub struct RouteWriter<W: Write> {
    writer: BufWriter<W>,
    bytes_written: u64,
}

impl<W: Write> RouteWriter<W> {
    /// Create a new RouteWriter with the default 2MB buffer.
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_OUTPUT_BUFFER, output)
    }

    /// Create a new RouteWriter with specified buffer size.
    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            bytes_written: 0,
        }
    }

    /// Write the opening envelope.
    pub fn write_header(&mut self) -> Result<()> {
        self.write_bytes(ROUTES_HEADER.as_bytes())
    }

    /// Write one record verbatim.
    #[inline]
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        self.write_bytes(record.as_bytes())
    }

    /// Write a trip group: its vehicles in stored order, then the person.
    ///
    /// The group is consumed; each record is freed as soon as it is written.
    pub fn write_group(&mut self, group: TripGroup) -> Result<()> {
        let TripGroup {
            person, vehicles, ..
        } = group;
        for vehicle in vehicles {
            self.write_record(&vehicle)?;
        }
        self.write_record(&person)
    }

    /// Write a complete document: header, every group in arrival order,
    /// footer. Stops at the first error.
    pub fn write_document<I>(mut self, groups: I) -> Result<u64>
    where
        I: IntoIterator<Item = Result<TripGroup>>,
    {
        self.write_header()?;
        for group in groups {
            self.write_group(group?)?;
        }
        self.finish()
    }

    /// Write the closing envelope and flush. Returns total bytes written.
    pub fn finish(mut self) -> Result<u64> {
        self.write_bytes(ROUTES_FOOTER.as_bytes())?;
        self.writer.flush()?;
        Ok(self.bytes_written)
    }

    /// Bytes written so far, including buffered ones.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }
}
