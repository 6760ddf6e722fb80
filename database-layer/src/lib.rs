//! PostgreSQL storage for the clinic pricing engine
//!
//! Implements [`pricing_service::ReferenceDataRepository`] and
//! [`pricing_service::BudgetRepository`] on top of `sqlx`.
//!
//! # Key Features
//!
//! - **Atomic approval**: the budget status flip and the installment batch are
//!   written in one transaction, guarded by `status IN ('DRAFT', 'SENT')`
//! - **Approved budgets are frozen**: upserts never overwrite an approved row
//! - **Schema bootstrap**: [`DatabasePool::apply_schema`] creates missing tables
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use database_layer::{DatabasePool, PostgresPricingRepository};
//! use pricing_service::BudgetRepository;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = DatabasePool::new("postgresql://localhost/clinic").await?;
//!     pool.apply_schema().await?;
//!
//!     let repo = PostgresPricingRepository::from_pool(&pool);
//!     let budget = repo.find_budget(Uuid::new_v4()).await?;
//!     assert!(budget.is_none());
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod error;
pub mod repository;
pub mod rows;
pub mod schema;

pub use connection::*;
pub use error::*;
pub use repository::*;
