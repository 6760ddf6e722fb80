//! Logging setup with PII redaction for the clinic pricing engine
//!
//! Pricing decisions are logged and audited with patient and staff
//! identifiers attached. Before any of that leaves the process, free text is
//! scrubbed of personal data and identifier fields in structured payloads are
//! replaced by short correlation hashes.
//!
//! # Detected Data Types
//!
//! - **Email Addresses**: `ana@clinic.com` → `EMAIL[...]`
//! - **Phone Numbers**: `(11) 98765-4321` → `PHONE[...]`
//! - **CPF**: `123.456.789-09` → `CPF[...]`
//! - **Card Numbers**: `4111 1111 1111 1111` → `CARD[...]`
//!
//! # Example
//!
//! ```rust
//! use logger_redacted::{PiiRedactor, RedactionConfig};
//!
//! let redactor = PiiRedactor::new(RedactionConfig::default());
//! let clean = redactor.redact("patient cpf 123.456.789-09");
//! assert!(!clean.contains("123.456.789-09"));
//! ```

pub mod config;
pub mod init;
pub mod redactor;

pub use config::*;
pub use init::*;
pub use redactor::*;
