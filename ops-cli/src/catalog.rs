//! YAML catalog of clinic reference data used by the CLI.
//!
//! ```yaml
//! procedures:
//!   - id: 6f0c7c8e-0d0a-4b8e-9d55-0a1e4f3b2c10
//!     name: Implant
//!     duration_minutes: 60
//!     estimated_lab_cost: "20"
//!     commission: { type: PERCENTAGE, value: "30" }
//!     recipe:
//!       - inventory_item_id: 1b2f0d8c-7d7e-4d9f-8a51-5c3e2b1a0f99
//!         item_name: Surgical kit
//!         quantity: "2"
//!         average_unit_cost: "25"
//! card_profiles: []
//! sales_rules: []
//! clinics: []
//! ```

use config_engine::PricingConfig;
use pricing_service::{CardMachineProfile, InMemoryPricingRepository, Procedure, RecipeLine, SalesCommissionRule};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Cannot read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogProcedure {
    #[serde(flatten)]
    pub procedure: Procedure,
    #[serde(default)]
    pub recipe: Vec<RecipeLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicSettings {
    pub clinic_id: Uuid,
    pub pricing: PricingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub procedures: Vec<CatalogProcedure>,
    pub sales_rules: Vec<SalesCommissionRule>,
    pub card_profiles: Vec<CardMachineProfile>,
    pub clinics: Vec<ClinicSettings>,
}

impl Catalog {
    pub fn from_yaml(source: &str) -> Result<Self, CatalogError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let source = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&source)
    }

    pub fn into_repository(self) -> Arc<InMemoryPricingRepository> {
        let repo = InMemoryPricingRepository::shared();
        for entry in self.procedures {
            repo.insert_recipe(entry.procedure.id, entry.recipe);
            repo.insert_procedure(entry.procedure);
        }
        for rule in self.sales_rules {
            repo.insert_sales_rule(rule);
        }
        for profile in self.card_profiles {
            repo.insert_card_profile(profile);
        }
        for clinic in self.clinics {
            repo.insert_clinic_pricing(clinic.clinic_id, clinic.pricing);
        }
        repo
    }
}
