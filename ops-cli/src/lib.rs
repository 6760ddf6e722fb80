//! Operations CLI for clinic pricing
//!
//! Runs the pricing engine from a terminal against a YAML reference-data
//! catalog, without a database.
//!
//! # Example Usage
//!
//! ```bash
//! # Cost waterfall and margin for a procedure at a price
//! clinic-pricing --catalog catalog.yaml margin --procedure <uuid> --price 500
//!
//! # Minimum price for a 35% margin
//! clinic-pricing suggest-price --procedure <uuid> --target 35
//!
//! # Net receivable and guard decision for 1000 with 200 down in 3x
//! clinic-pricing simulate --clinic <uuid> --total 1000 --down-payment 200 --installments 3
//!
//! # Create tables in PostgreSQL
//! clinic-pricing init-db --database-url postgres://localhost/clinic
//! ```

pub mod catalog;
pub mod commands;

pub use catalog::*;
pub use commands::*;
