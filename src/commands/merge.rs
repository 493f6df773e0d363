//! Streaming k-way merge of route files by person departure time.
//!
//! Memory complexity: O(k) where k = number of inputs. Each input holds
//! exactly one pending trip group (its current head) in a min-heap plus the
//! vehicle accumulator of its reader; inputs are never loaded whole.
//!
//! # Algorithm
//!
//! 1. Pull the first trip group from every input; empty inputs drop out
//! 2. Pop the group with the smallest departure time and emit it
//!    (ties: the input given first wins)
//! 3. Pull the next group from the input that provided it, or retire that
//!    input for good when it has none left
//! 4. Repeat until no inputs remain
//!
//! REQUIREMENT: every input must list persons by non-decreasing departure
//! time. Use `--check-sorted` to have this enforced while merging.

use crate::config::{input_buffer_size, output_buffer_size};
use crate::routes::{Result, RouteError, TripGroup, TripReader};
use crate::streaming::{DepartOrderValidator, RouteWriter};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::debug;

/// A source's current head, ordered for a min-heap on (depart, source).
#[derive(Debug)]
struct HeapEntry {
    depart: f64,
    source_idx: usize,
    group: TripGroup,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap. Departures are never NaN.
        other
            .depart
            .partial_cmp(&self.depart)
            .unwrap_or(Ordering::Equal)
            .then(other.source_idx.cmp(&self.source_idx))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

/// Statistics from a merge.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MergeStats {
    /// Number of inputs registered
    pub sources: usize,
    /// Inputs that produced no trip group at all
    pub sources_empty: usize,
    /// Trip groups emitted
    pub groups: usize,
    /// Vehicles emitted inside those groups
    pub vehicles: usize,
    /// Trailing vehicles discarded by the readers
    pub vehicles_dropped: usize,
    /// Output size, envelope included
    pub bytes_written: u64,
}

impl fmt::Display for MergeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sources: {} ({} empty), Persons: {}, Vehicles: {}, Dropped vehicles: {}, Bytes: {}",
            self.sources,
            self.sources_empty,
            self.groups,
            self.vehicles,
            self.vehicles_dropped,
            self.bytes_written
        )
    }
}

/// Lazy merged sequence of trip groups over several readers.
///
/// Yields groups in non-descending departure order. The first error from
/// any reader is yielded once and ends the sequence.
pub struct MergedTrips<R: BufRead> {
    /// `None` once a source is exhausted; indices stay stable.
    sources: Vec<Option<TripReader<R>>>,
    validators: Option<Vec<DepartOrderValidator>>,
    heap: BinaryHeap<HeapEntry>,
    /// Source whose head was emitted last and still has to be refilled.
    refill: Option<usize>,
    primed: bool,
    done: bool,
    stats: MergeStats,
}

impl<R: BufRead> MergedTrips<R> {
    /// Merge `readers`; their order is the tie-break order.
    pub fn new(readers: Vec<TripReader<R>>) -> Self {
        let stats = MergeStats {
            sources: readers.len(),
            ..MergeStats::default()
        };
        Self {
            heap: BinaryHeap::with_capacity(readers.len()),
            sources: readers.into_iter().map(Some).collect(),
            validators: None,
            refill: None,
            primed: false,
            done: false,
            stats,
        }
    }

    /// Fail with `OutOfOrder` if any input's departures decrease (builder pattern).
    pub fn with_check_sorted(mut self, check_sorted: bool) -> Self {
        self.validators = check_sorted.then(|| {
            (0..self.sources.len())
                .map(|_| DepartOrderValidator::new())
                .collect()
        });
        self
    }

    /// Counters so far; complete once the sequence has ended.
    pub fn stats(&self) -> &MergeStats {
        &self.stats
    }

    /// Number of inputs not yet exhausted.
    pub fn active_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.is_some()).count()
    }

    /// Pull the next group from source `idx` into the heap, or retire the
    /// source if it has none left.
    fn advance(&mut self, idx: usize) -> Result<bool> {
        let Some(reader) = self.sources[idx].as_mut() else {
            return Ok(false);
        };

        match reader.read_group()? {
            Some(group) => {
                if let Some(validators) = self.validators.as_mut() {
                    validators[idx].validate(reader.input(), &group)?;
                }
                self.heap.push(HeapEntry {
                    depart: group.depart,
                    source_idx: idx,
                    group,
                });
                Ok(true)
            }
            None => {
                debug!(
                    input = %reader.input(),
                    persons = reader.persons_read(),
                    "route source exhausted"
                );
                self.stats.vehicles_dropped += reader.vehicles_dropped();
                self.sources[idx] = None;
                Ok(false)
            }
        }
    }

    fn step(&mut self) -> Result<Option<TripGroup>> {
        if !self.primed {
            self.primed = true;
            for idx in 0..self.sources.len() {
                if !self.advance(idx)? {
                    self.stats.sources_empty += 1;
                }
            }
        }

        if let Some(idx) = self.refill.take() {
            self.advance(idx)?;
        }

        let Some(entry) = self.heap.pop() else {
            return Ok(None);
        };
        self.refill = Some(entry.source_idx);
        self.stats.groups += 1;
        self.stats.vehicles += entry.group.vehicles.len();
        Ok(Some(entry.group))
    }
}

impl<R: BufRead> Iterator for MergedTrips<R> {
    type Item = Result<TripGroup>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(group)) => Some(Ok(group)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Streaming merge command configuration.
#[derive(Debug, Clone, Default)]
pub struct MergeCommand {
    /// Fail if any input's departure times decrease
    pub check_sorted: bool,
    /// Use smaller I/O buffers
    pub low_memory: bool,
}

impl MergeCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set check_sorted flag (builder pattern).
    pub fn with_check_sorted(mut self, check_sorted: bool) -> Self {
        self.check_sorted = check_sorted;
        self
    }

    /// Set low_memory flag (builder pattern).
    pub fn with_low_memory(mut self, low_memory: bool) -> Self {
        self.low_memory = low_memory;
        self
    }

    /// Open every input up front, then merge them into `output`.
    ///
    /// `-` reads standard input and may appear at most once. An input that
    /// cannot be opened fails the run before anything is written.
    pub fn run<P: AsRef<Path>, W: Write>(&self, inputs: &[P], output: W) -> Result<MergeStats> {
        let readers = self.open_inputs(inputs)?;
        self.run_readers(readers, output)
    }

    /// Merge already-open readers into `output`.
    pub fn run_readers<R: BufRead, W: Write>(
        &self,
        readers: Vec<TripReader<R>>,
        output: W,
    ) -> Result<MergeStats> {
        let mut merged = MergedTrips::new(readers).with_check_sorted(self.check_sorted);
        let writer = RouteWriter::with_capacity(output_buffer_size(self.low_memory), output);
        let bytes_written = writer.write_document(merged.by_ref())?;

        let mut stats = merged.stats().clone();
        stats.bytes_written = bytes_written;
        Ok(stats)
    }

    /// Open every input for merging. `-` opens standard input.
    pub fn open_inputs<P: AsRef<Path>>(
        &self,
        inputs: &[P],
    ) -> Result<Vec<TripReader<Box<dyn BufRead>>>> {
        let capacity = input_buffer_size(self.low_memory);
        let mut readers = Vec::with_capacity(inputs.len());
        let mut stdin_used = false;

        for path in inputs {
            let path = path.as_ref();
            let reader: TripReader<Box<dyn BufRead>> = if path.as_os_str() == "-" {
                if stdin_used {
                    return Err(RouteError::InvalidArgument(
                        "standard input ('-') can only be merged once".to_string(),
                    ));
                }
                stdin_used = true;
                debug!("reading route source from stdin");
                let stdin: Box<dyn BufRead> = Box::new(io::stdin().lock());
                TripReader::new(stdin, "<stdin>")
            } else {
                let file = std::fs::File::open(path).map_err(|source| {
                    RouteError::InputUnavailable {
                        input: path.display().to_string(),
                        source,
                    }
                })?;
                debug!(input = %path.display(), "opened route source");
                let file: Box<dyn BufRead> = Box::new(io::BufReader::with_capacity(capacity, file));
                TripReader::new(file, path.display().to_string())
            };
            readers.push(reader);
        }

        Ok(readers)
    }
}
