//! Parsers for the request table.
//!
//! - [`csv_parser`]: turn raw table rows into [`ObservationRequest`](crate::models::ObservationRequest)s
//!
//! # Example
//!
//! ```
//! use colibri_scheduler::parsing::csv_parser::parse_request_rows;
//!
//! let rows = ["M42,3,83.82,-5.39,,,2024-02-28T01:00:00Z,2024-02-28T05:00:00Z,30,60,1,2,0"];
//! let parsed = parse_request_rows(rows);
//! assert_eq!(parsed.requests.len(), 1);
//! ```

pub mod csv_parser;


pub use csv_parser::{columns, parse_request_row, parse_request_rows, ParsedRows};
