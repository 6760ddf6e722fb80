//! Pricing, margin guard and receivables engine for clinical budgets
//!
//! Provides:
//! - Per-item cost waterfall (time, materials, lab, tax, card fee, commissions)
//! - Item and budget cost-based margins with traffic-light status
//! - Minimum price suggestion for a target margin
//! - Net receivable simulation for a payment plan
//! - The approval guard that blocks loss-making plans and audits low margins
//! - Installment schedule generation and atomic approval commit
//!
//! Storage, audit and configuration are collaborators passed in explicitly:
//! see [`ReferenceDataRepository`], [`BudgetRepository`],
//! [`audit_engine::AuditSink`] and [`config_engine::PricingConfig`].

pub mod budget;
pub mod cost;
pub mod error;
pub mod guard;
pub mod installments;
pub mod margin;
pub mod models;
pub mod money;
pub mod receivables;
pub mod repository;
pub mod service;

pub use cost::*;
pub use error::*;
pub use guard::*;
pub use installments::*;
pub use margin::*;
pub use models::*;
pub use receivables::*;
pub use repository::*;
pub use service::*;
