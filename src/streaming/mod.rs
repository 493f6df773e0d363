//! Streaming building blocks shared by all commands.
//!
//! This module provides:
//! - An incremental markup tokenizer over buffered readers
//! - Zero-allocation start-tag inspection
//! - Departure-order validation
//! - Verbatim route document output
//!
//! Nothing here holds more than one record's worth of input in memory.

pub mod output;
pub mod parsing;
pub mod scanner;
pub mod validation;

pub use output::{RouteWriter, ROUTES_FOOTER, ROUTES_HEADER};
pub use parsing::{find_attribute, parse_depart, tag_name};
pub use scanner::{TokenKind, XmlScanner};
pub use validation::{verify_sorted, verify_sorted_reader, DepartOrderValidator, VerifyReport};
