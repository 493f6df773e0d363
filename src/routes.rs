//! Streaming SUMO route file parser.
//!
//! A route file is read as a sequence of trip groups: every `<person>`
//! element together with the `<vehicle>` elements that appeared between it
//! and the previous person. Records are kept as raw bytes and copied
//! through verbatim; only the tag name and the person's `depart` attribute
//! are ever looked at.

use crate::config::{DEFAULT_INPUT_BUFFER, DEFAULT_RECORD_BUFFER};
use crate::streaming::parsing::{find_attribute, parse_depart, tag_name};
use crate::streaming::scanner::{TokenKind, XmlScanner};
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while reading, merging or writing route files.
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cannot open input '{input}': {source}")]
    InputUnavailable { input: String, source: io::Error },

    #[error("cannot read input '{input}': {source}")]
    InputUnreadable { input: String, source: io::Error },

    #[error("cannot create output '{output}': {source}")]
    OutputUnavailable { output: String, source: io::Error },

    #[error("malformed person {person} in '{input}': {message}")]
    MalformedRecord {
        input: String,
        person: String,
        message: String,
    },

    #[error("syntax error in '{input}' at byte {offset}: {message}")]
    Syntax {
        input: String,
        offset: u64,
        message: String,
    },

    #[error("'{input}' not sorted: person {person} departs at {depart} after {previous}")]
    OutOfOrder {
        input: String,
        person: String,
        depart: f64,
        previous: f64,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, RouteError>;

/// The two element kinds the merge cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Vehicle,
    Person,
}

impl RecordKind {
    /// Classify an element by its tag name. Anything else is ignored.
    #[inline]
    pub fn from_tag(name: &[u8]) -> Option<Self> {
        match name {
            b"vehicle" => Some(Self::Vehicle),
            b"person" => Some(Self::Person),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vehicle => "vehicle",
            Self::Person => "person",
        }
    }
}

/// One `<vehicle>` or `<person>` element as it appeared in the input,
/// including nested children and the text trailing it up to the next tag.
#[derive(Clone, PartialEq, Eq)]
pub struct Record {
    kind: RecordKind,
    raw: Box<[u8]>,
}

impl Record {
    pub fn new(kind: RecordKind, raw: impl Into<Box<[u8]>>) -> Self {
        Self {
            kind,
            raw: raw.into(),
        }
    }

    #[inline]
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Raw bytes, copied through unchanged on output.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Look up an attribute of the element's start tag.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        find_attribute(&self.raw, name.as_bytes()).and_then(|v| std::str::from_utf8(v).ok())
    }

    /// The element's `id` attribute, if any.
    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("kind", &self.kind)
            .field("raw", &String::from_utf8_lossy(&self.raw))
            .finish()
    }
}

/// A person record plus the vehicle records that immediately preceded it.
#[derive(Debug, Clone, PartialEq)]
pub struct TripGroup {
    /// Sort key, the person's `depart` attribute.
    pub depart: f64,
    pub person: Record,
    /// Vehicles in source order.
    pub vehicles: Vec<Record>,
}

/// Human-readable reference to a person for diagnostics: its id when it has
/// one, otherwise its 1-based position in the input.
pub(crate) fn person_label(person: &Record, ordinal: usize) -> String {
    match person.id() {
        Some(id) => format!("'{}' (#{})", id, ordinal),
        None => format!("#{}", ordinal),
    }
}

/// A streaming route file reader.
///
/// Holds at most one pending vehicle group in memory; the input itself is
/// consumed strictly forward through a buffered reader.
pub struct TripReader<R: BufRead> {
    scanner: XmlScanner<R>,
    pending: Vec<Record>,
    scratch: Vec<u8>,
    persons_read: usize,
    vehicles_read: usize,
    vehicles_dropped: usize,
    // Elements opened but not yet closed outside captured records.
    open_elements: usize,
    finished: bool,
}

impl TripReader<BufReader<File>> {
    /// Open a route file from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_path_with_capacity(path, DEFAULT_INPUT_BUFFER)
    }

    /// Open a route file with a custom input buffer capacity.
    pub fn from_path_with_capacity<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Self> {
        let path = path.as_ref();
        let input = path.display().to_string();
        let file = File::open(path).map_err(|source| RouteError::InputUnavailable {
            input: input.clone(),
            source,
        })?;
        debug!(input = %input, "opened route source");
        Ok(Self::new(BufReader::with_capacity(capacity, file), input))
    }
}

impl<R: BufRead> TripReader<R> {
    /// Create a reader over any buffered source. `input` names the source
    /// in diagnostics.
    pub fn new(reader: R, input: impl Into<String>) -> Self {
        Self {
            scanner: XmlScanner::new(reader, input),
            pending: Vec::new(),
            scratch: Vec::with_capacity(DEFAULT_RECORD_BUFFER),
            persons_read: 0,
            vehicles_read: 0,
            vehicles_dropped: 0,
            open_elements: 0,
            finished: false,
        }
    }

    /// Name of the input, as given at construction.
    pub fn input(&self) -> &str {
        self.scanner.input()
    }

    pub fn persons_read(&self) -> usize {
        self.persons_read
    }

    pub fn vehicles_read(&self) -> usize {
        self.vehicles_read
    }

    /// Vehicles discarded because no person followed them before end of input.
    pub fn vehicles_dropped(&self) -> usize {
        self.vehicles_dropped
    }

    /// Read the next trip group, or `None` once the input is exhausted.
    pub fn read_group(&mut self) -> Result<Option<TripGroup>> {
        if self.finished {
            return Ok(None);
        }

        loop {
            self.scratch.clear();
            let self_closing = match self.scanner.next_token(&mut self.scratch)? {
                Some(TokenKind::StartTag { self_closing }) => self_closing,
                Some(TokenKind::EndTag) => {
                    self.open_elements = self.open_elements.saturating_sub(1);
                    continue;
                }
                Some(_) => continue,
                None => return self.finish().map(|()| None),
            };
            let Some(kind) = RecordKind::from_tag(tag_name(&self.scratch)) else {
                if !self_closing {
                    self.open_elements += 1;
                }
                continue;
            };

            let record = self.capture(kind, self_closing)?;
            match kind {
                RecordKind::Vehicle => {
                    self.vehicles_read += 1;
                    self.pending.push(record);
                }
                RecordKind::Person => {
                    self.persons_read += 1;
                    let depart = self.depart_of(&record)?;
                    return Ok(Some(TripGroup {
                        depart,
                        person: record,
                        vehicles: std::mem::take(&mut self.pending),
                    }));
                }
            }
        }
    }

    /// Read the rest of an element whose start tag sits in `scratch`, plus
    /// its tail text, and turn it into a record.
    fn capture(&mut self, kind: RecordKind, self_closing: bool) -> Result<Record> {
        let start_offset = self.scanner.offset() - self.scratch.len() as u64;
        let mut depth = usize::from(!self_closing);

        while depth > 0 {
            match self.scanner.next_token(&mut self.scratch)? {
                Some(TokenKind::StartTag {
                    self_closing: false,
                }) => depth += 1,
                Some(TokenKind::EndTag) => depth -= 1,
                Some(_) => {}
                None => {
                    return Err(RouteError::Syntax {
                        input: self.input().to_string(),
                        offset: start_offset,
                        message: format!("unterminated <{}> element", kind.as_str()),
                    })
                }
            }
        }

        self.scanner.read_text(&mut self.scratch)?;
        Ok(Record::new(kind, self.scratch.as_slice()))
    }

    fn depart_of(&self, person: &Record) -> Result<f64> {
        let malformed = |message: String| RouteError::MalformedRecord {
            input: self.input().to_string(),
            person: person_label(person, self.persons_read),
            message,
        };

        let raw = find_attribute(person.as_bytes(), b"depart")
            .ok_or_else(|| malformed("missing 'depart' attribute".to_string()))?;
        parse_depart(raw).ok_or_else(|| {
            malformed(format!(
                "'depart' is not a number: '{}'",
                String::from_utf8_lossy(raw)
            ))
        })
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        if self.open_elements > 0 {
            return Err(RouteError::Syntax {
                input: self.input().to_string(),
                offset: self.scanner.offset(),
                message: format!(
                    "unexpected end of input with {} unclosed element(s)",
                    self.open_elements
                ),
            });
        }
        if !self.pending.is_empty() {
            warn!(
                input = %self.input(),
                dropped = self.pending.len(),
                "discarding trailing vehicles with no following person"
            );
            self.vehicles_dropped += self.pending.len();
            self.pending = Vec::new();
        }
        Ok(())
    }

    /// Get an iterator over all trip groups.
    pub fn groups(self) -> TripIter<R> {
        TripIter { reader: self }
    }
}

/// Iterator over trip groups.
pub struct TripIter<R: BufRead> {
    reader: TripReader<R>,
}

impl<R: BufRead> TripIter<R> {
    /// Access the underlying reader (e.g. for its counters).
    pub fn reader(&self) -> &TripReader<R> {
        &self.reader
    }
}

impl<R: BufRead> Iterator for TripIter<R> {
    type Item = Result<TripGroup>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_group() {
            Ok(Some(group)) => Some(Ok(group)),
            Ok(None) => None,
            Err(e) => {
                self.reader.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Read all trip groups from a route file.
pub fn read_groups<P: AsRef<Path>>(path: P) -> Result<Vec<TripGroup>> {
    TripReader::from_path(path)?.groups().collect()
}

/// Parse trip groups from an in-memory route document.
pub fn parse_groups(content: &str) -> Result<Vec<TripGroup>> {
    TripReader::new(content.as_bytes(), "<memory>")
        .groups()
        .collect()
}
