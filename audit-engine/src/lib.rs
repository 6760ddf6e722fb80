//! Audit event shaping for clinic pricing decisions
//!
//! The pricing core never formats or stores an audit trail itself. It builds
//! an [`AuditEvent`] describing what happened (action kind, entity, before and
//! after values, a human-readable summary) and hands it to an [`AuditSink`]
//! supplied by the host application.
//!
//! # Example
//!
//! ```rust
//! use audit_engine::{AuditAction, AuditEvent, AuditSink, InMemoryAuditSink};
//! use serde_json::json;
//! use uuid::Uuid;
//!
//! # tokio_test::block_on(async {
//! let sink = InMemoryAuditSink::new();
//! let event = AuditEvent::new(
//!     AuditAction::ApprovalBlocked,
//!     "budget",
//!     Uuid::new_v4(),
//!     "Approval blocked: net value -10.00",
//! )
//! .with_after(json!({ "net_value": "-10.00" }));
//!
//! sink.record(event).await.unwrap();
//! assert_eq!(sink.events().len(), 1);
//! # });
//! ```

pub mod entry;
pub mod sink;
pub mod error;

pub use entry::*;
pub use sink::*;
pub use error::*;
