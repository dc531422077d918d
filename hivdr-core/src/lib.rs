//! # Core models for hivdr
//!
//! Types shared by every hivdr crate: genomic loci, the mutation-token
//! parser, report records as handed over by the report extractor,
//! atomic observations, the drug catalog and resistance categories.
//!
//! ```
//! use hivdr_core::models::{MutationToken, Residue};
//!
//! let token: MutationToken = "Q58Q/E".parse().unwrap();
//! assert_eq!(token.position(), Some(58));
//! assert_eq!(token.residues(), vec![Residue::AminoAcid('Q'), Residue::AminoAcid('E')]);
//! ```
pub mod errors;
pub mod models;
pub mod utils;
