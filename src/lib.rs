// Clippy allows for the whole crate
#![allow(clippy::should_implement_trait)]

//! tripmerge: streaming merge of SUMO route files
//!
//! This library merges route files holding `<vehicle>` and `<person>`
//! elements into one document ordered by person departure time.
//!
//! # Features
//!
//! - **Streaming I/O**: inputs are read incrementally, one trip group per
//!   input in memory at a time
//! - **Verbatim records**: elements are copied through byte-for-byte
//! - **Deterministic**: equal departures keep the order inputs were given in
//!
//! # Example
//!
//! ```rust,no_run
//! use tripmerge::commands::MergeCommand;
//!
//! let stdout = std::io::stdout();
//! let stats = MergeCommand::new()
//!     .run(&["walks.rou.xml", "rides.rou.xml"], stdout.lock())
//!     .unwrap();
//! eprintln!("{}", stats);
//! ```

pub mod commands;
pub mod config;
pub mod routes;
pub mod streaming;

// Re-export commonly used types
pub use routes::{
    parse_groups, read_groups, Record, RecordKind, RouteError, TripGroup, TripReader,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::commands::{GenerateCommand, MergeCommand, MergedTrips};
    pub use crate::routes::{
        parse_groups, read_groups, Record, RecordKind, RouteError, TripGroup, TripReader,
    };
    pub use crate::streaming::{verify_sorted, RouteWriter};
}
