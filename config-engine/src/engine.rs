use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use logger_redacted::LoggerConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const ENV_PREFIX: &str = "CLINIC_";

/// Margin status boundaries, all lower-inclusive percentages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginThresholds {
    pub excellent: Decimal,
    pub good: Decimal,
    pub warning: Decimal,
    /// Items under this cost-based margin are listed as low-margin
    pub low_margin_alert: Decimal,
    /// Net receivable margin under which approval is audited as low-margin
    pub approval_warning: Decimal,
}

impl Default for MarginThresholds {
    fn default() -> Self {
        Self {
            excellent: dec!(30),
            good: dec!(20),
            warning: dec!(15),
            low_margin_alert: dec!(20),
            approval_warning: dec!(20),
        }
    }
}

/// Clinic-wide pricing defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub cost_per_minute: Decimal,
    /// Tax applied per line in the cost waterfall
    pub item_tax_rate_percent: Decimal,
    /// Tax applied on the whole receivable at approval time
    pub clinic_tax_rate_percent: Decimal,
    /// Card fee assumed per line in the cost waterfall
    pub card_fee_rate_percent: Decimal,
    pub target_margin_percent: Decimal,
    pub thresholds: MarginThresholds,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            cost_per_minute: Decimal::ZERO,
            item_tax_rate_percent: Decimal::ZERO,
            clinic_tax_rate_percent: Decimal::ZERO,
            card_fee_rate_percent: Decimal::ZERO,
            target_margin_percent: dec!(30),
            thresholds: MarginThresholds::default(),
        }
    }
}

impl PricingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cost_per_minute < Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "cost_per_minute cannot be negative".to_string(),
            ));
        }

        let rates = [
            ("item_tax_rate_percent", self.item_tax_rate_percent),
            ("clinic_tax_rate_percent", self.clinic_tax_rate_percent),
            ("card_fee_rate_percent", self.card_fee_rate_percent),
            ("target_margin_percent", self.target_margin_percent),
        ];
        for (name, value) in rates {
            if value < Decimal::ZERO || value > dec!(100) {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be between 0 and 100, got {}",
                    name, value
                )));
            }
        }

        let t = &self.thresholds;
        if !(t.excellent >= t.good && t.good >= t.warning && t.warning >= Decimal::ZERO) {
            return Err(ConfigError::ValidationError(format!(
                "margin thresholds must descend: excellent {} >= good {} >= warning {} >= 0",
                t.excellent, t.good, t.warning
            )));
        }

        Ok(())
    }

    /// Apply a clinic's stored rates on top of the configured defaults.
    ///
    /// Clinic rows carry rates only, so margin thresholds always come from
    /// `defaults`. The merged result is validated before use.
    pub fn overlay_on(self, defaults: &PricingConfig) -> Result<PricingConfig> {
        let merged = PricingConfig {
            thresholds: defaults.thresholds.clone(),
            ..self
        };
        merged.validate()?;
        Ok(merged)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pricing: PricingConfig,
    pub logging: LoggerConfig,
    pub database_url: Option<String>,
}

/// Load configuration from defaults, an optional YAML file and the environment
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::SourceNotFound(path.display().to_string()));
        }
        debug!(path = %path.display(), "Loading configuration file");
        figment = figment.merge(Yaml::file(path));
    }

    let config: EngineConfig = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.pricing.validate()?;
    Ok(config)
}
