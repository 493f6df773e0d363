//! Command implementations for tripmerge.

pub mod generate;
pub mod merge;

pub use crate::streaming::{verify_sorted, verify_sorted_reader, VerifyReport};
pub use generate::{GenerateCommand, GenerateConfig, GenerateStats, SizeSpec};
pub use merge::{MergeCommand, MergeStats, MergedTrips};
