//! Common error handling utilities for the clinic pricing engine
//!
//! Every crate in the workspace keeps its own `thiserror` enum, but all of
//! them classify into the same small taxonomy so that callers (UI handlers,
//! the operations CLI) can decide how to present a failure without matching
//! on crate-specific variants.
//!
//! # Error Categories
//!
//! - **ReferenceDataMissing**: a procedure, profile or rule could not be resolved
//! - **PolicyViolation**: the approval guard refused a loss-making approval
//! - **PersistenceFailure**: the external store rejected a write
//! - **Validation**: malformed input (negative values, zero installments...)
//!
//! Low margins are not errors: they surface as `warn!` lines and audit
//! events, never through this taxonomy.
//!
//! # Example
//!
//! ```rust
//! use error_common::{ClassifiedError, ErrorCategory};
//!
//! fn present<E: ClassifiedError>(err: &E) -> String {
//!     match err.category() {
//!         ErrorCategory::PersistenceFailure => "Please try again".to_string(),
//!         _ => err.user_message(),
//!     }
//! }
//! ```

pub mod types;
pub mod context;
pub mod codes;
pub mod reporting;

pub use types::*;
pub use context::*;
pub use reporting::*;
