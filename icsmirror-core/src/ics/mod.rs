//! ICS feed parsing and generation.
//!
//! This module turns fetched feed bytes into `EventRecord`s and renders the
//! store back into an RFC 5545 calendar.

mod generate;
mod parse;

pub use generate::{PRODID, render_feed};
pub use parse::parse_feed;
