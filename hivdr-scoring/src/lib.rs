//! # hivdr-scoring
//!
//! Turns per-test mutation lists into per-drug resistance scores:
//!
//! 1. [history]: accumulate each patient's lists over time
//! 2. [melt]: expand cumulative lists into atomic observations
//! 3. [simple]: join observations onto single-position penalties
//! 4. [complex]: evaluate conjunctive multi-position rules
//! 5. [aggregate]: combine both into a total score and category
//!
//! [pipeline] runs the whole chain per patient in parallel.
pub mod aggregate;
pub mod comments;
pub mod complex;
pub mod consts;
pub mod history;
pub mod melt;
pub mod pipeline;
pub mod simple;
pub mod table;

// re-exports
pub use aggregate::*;
pub use comments::*;
pub use complex::*;
pub use history::*;
pub use melt::*;
pub use pipeline::*;
pub use simple::*;
pub use table::*;
