//! Terminal presentation of quotes and settings.

pub mod report;
