//! Aggregation of normalized visits and tests into the report tables.
//!
//! [`aggregate::aggregate`] builds every table in one pass over the inputs;
//! [`verify::verify`] then reconciles the tables against those same inputs
//! before anything is exported.

pub mod aggregate;
pub mod types;
pub mod utility;
pub mod verify;
