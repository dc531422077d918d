//! # Input/Output for hivdr.
//!
//! Reading report records and reference tables from disk, and writing
//! score and observation tables as CSV (optionally gzipped) or JSON.
//!
pub mod consts;
pub mod error;
pub mod records;
pub mod tables;
pub mod writer;

// re-expose core functions
pub use consts::*;
pub use error::*;
pub use records::*;
pub use tables::*;
pub use writer::*;
