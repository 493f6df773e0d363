//! Departure-order validation for route inputs.
//!
//! The merge assumes every input lists its persons by non-decreasing
//! departure time. This module checks that assumption, either inline while
//! merging (`merge --check-sorted`) or as a separate pass (`verify`).

use crate::routes::{person_label, Result, RouteError, TripGroup, TripReader};
use std::fmt;
use std::io::BufRead;
use std::path::Path;

/// Inline departure-order validator for one source.
#[derive(Debug, Default)]
pub struct DepartOrderValidator {
    previous: Option<f64>,
    group_count: usize,
}

impl DepartOrderValidator {
    /// Create a new validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate that `group` does not depart before the previous one.
    #[inline]
    pub fn validate(&mut self, input: &str, group: &TripGroup) -> Result<()> {
        self.group_count += 1;

        if let Some(previous) = self.previous {
            if group.depart < previous {
                return Err(RouteError::OutOfOrder {
                    input: input.to_string(),
                    person: person_label(&group.person, self.group_count),
                    depart: group.depart,
                    previous,
                });
            }
        }

        self.previous = Some(group.depart);
        Ok(())
    }

    /// Get the number of groups validated.
    pub fn group_count(&self) -> usize {
        self.group_count
    }
}

/// Summary of a verified route input.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VerifyReport {
    pub persons: usize,
    pub vehicles: usize,
    /// Trailing vehicles with no following person.
    pub vehicles_dropped: usize,
    pub first_depart: Option<f64>,
    pub last_depart: Option<f64>,
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "persons: {}, vehicles: {}, dropped vehicles: {}",
            self.persons, self.vehicles, self.vehicles_dropped
        )?;
        if let (Some(first), Some(last)) = (self.first_depart, self.last_depart) {
            write!(f, ", departures: {}..{}", first, last)?;
        }
        Ok(())
    }
}

/// Verify that a route file lists persons by non-decreasing departure time.
///
/// # Example
///
/// ```rust,no_run
/// use tripmerge::streaming::verify_sorted;
///
/// let report = verify_sorted("persons.rou.xml").expect("File must be sorted");
/// println!("{}", report);
/// ```
pub fn verify_sorted<P: AsRef<Path>>(path: P) -> Result<VerifyReport> {
    verify_sorted_reader(TripReader::from_path(path)?)
}

/// Verify an already-open route reader, consuming it.
pub fn verify_sorted_reader<R: BufRead>(mut reader: TripReader<R>) -> Result<VerifyReport> {
    let mut validator = DepartOrderValidator::new();
    let mut report = VerifyReport::default();

    while let Some(group) = reader.read_group()? {
        validator.validate(reader.input(), &group)?;
        report.first_depart.get_or_insert(group.depart);
        report.last_depart = Some(group.depart);
    }

    report.persons = reader.persons_read();
    report.vehicles = reader.vehicles_read();
    report.vehicles_dropped = reader.vehicles_dropped();
    Ok(report)
}
