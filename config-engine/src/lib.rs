//! Configuration for the clinic pricing engine
//!
//! Values are layered, later sources overriding earlier ones:
//!
//! 1. Built-in defaults ([`EngineConfig::default`])
//! 2. An optional YAML file
//! 3. Environment variables prefixed with `CLINIC_`, nested keys separated by
//!    `__` (for example `CLINIC_PRICING__CLINIC_TAX_RATE_PERCENT=6`)
//!
//! The pricing functions never read configuration themselves; the host loads
//! an [`EngineConfig`] once and passes the pricing section down explicitly.
//!
//! # Example
//!
//! ```yaml
//! pricing:
//!   cost_per_minute: 2.50
//!   item_tax_rate_percent: 5
//!   clinic_tax_rate_percent: 6
//!   card_fee_rate_percent: 3
//!   thresholds:
//!     excellent: 30
//!     good: 20
//!     warning: 15
//! logging:
//!   log_level: debug
//!   format: json
//! ```

pub mod engine;
pub mod error;

pub use engine::*;
pub use error::*;
