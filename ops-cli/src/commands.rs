use crate::catalog::Catalog;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use config_engine::{EngineConfig, PricingConfig};
use database_layer::DatabasePool;
use pricing_service::{
    evaluate, CostCalculator, CostRates, GuardDecision, InMemoryPricingRepository, ItemMargin, MarginAnalyzer,
    MarginStatus, PaymentPlan, ReceivablesSimulator, ReferenceDataRepository, SalesContext,
};
use rust_decimal::Decimal;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "clinic-pricing")]
#[command(about = "Procedure costing, margin checks and approval simulations")]
#[command(version)]
pub struct Cli {
    /// Configuration file (YAML); CLINIC_* environment variables override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Reference data catalog (YAML)
    #[arg(long, global = true, default_value = "catalog.yaml")]
    pub catalog: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Cost waterfall and margin for one procedure at a price
    Margin {
        #[arg(long)]
        procedure: Uuid,
        #[arg(long)]
        price: Decimal,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        #[arg(long)]
        clinic: Option<Uuid>,
        #[arg(long)]
        sales_rep: Option<Uuid>,
    },

    /// Minimum price reaching the target margin
    SuggestPrice {
        #[arg(long)]
        procedure: Uuid,
        #[arg(long)]
        clinic: Option<Uuid>,
        /// Target margin percent; defaults to the configured one
        #[arg(long)]
        target: Option<Decimal>,
    },

    /// Net receivable and guard decision for a payment plan
    Simulate {
        #[arg(long)]
        clinic: Uuid,
        #[arg(long)]
        total: Decimal,
        #[arg(long, default_value = "0")]
        down_payment: Decimal,
        #[arg(long, default_value_t = 1)]
        installments: u32,
        #[arg(long)]
        card_profile: Option<Uuid>,
    },

    /// Create the pricing tables in PostgreSQL
    InitDb {
        /// Overrides `database_url` from the configuration
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },
}

/// Execute a parsed command and return what should be printed
pub async fn run(cli: Cli, config: EngineConfig) -> Result<String> {
    match cli.command {
        Command::InitDb { database_url } => {
            let url = database_url
                .or(config.database_url)
                .ok_or_else(|| anyhow!("no database url configured"))?;
            let pool = DatabasePool::new(&url).await?;
            pool.apply_schema().await?;
            pool.close().await;
            Ok("Schema applied".to_string())
        }
        command => {
            let repo = Catalog::load(&cli.catalog)
                .with_context(|| format!("loading {}", cli.catalog.display()))?
                .into_repository();
            run_with_catalog(command, repo, &config.pricing, cli.json).await
        }
    }
}

async fn pricing_for(
    repo: &InMemoryPricingRepository,
    clinic: Option<Uuid>,
    defaults: &PricingConfig,
) -> Result<PricingConfig> {
    let stored = match clinic {
        Some(clinic_id) => repo.clinic_pricing(clinic_id).await?,
        None => None,
    };
    match stored {
        Some(pricing) => Ok(pricing.overlay_on(defaults)?),
        None => Ok(defaults.clone()),
    }
}

pub async fn run_with_catalog(
    command: Command,
    repo: Arc<InMemoryPricingRepository>,
    defaults: &PricingConfig,
    as_json: bool,
) -> Result<String> {
    match command {
        Command::Margin { procedure, price, quantity, clinic, sales_rep } => {
            let pricing = pricing_for(&repo, clinic, defaults).await?;
            let calculator = CostCalculator::new(repo.clone());
            let sales = SalesContext { sales_rep_id: sales_rep, clinic_id: clinic, category_id: None };

            let margin = MarginAnalyzer::new(calculator)
                .compute_item_margin(procedure, price, quantity, &pricing, &sales)
                .await?;
            info!(procedure_id = %procedure, margin_percent = %margin.margin_percent, "Computed margin");

            if as_json {
                return Ok(serde_json::to_string_pretty(&margin)?);
            }
            Ok(render_margin(&margin, &CostRates::from(&pricing)))
        }
        Command::SuggestPrice { procedure, clinic, target } => {
            let pricing = pricing_for(&repo, clinic, defaults).await?;
            let found = repo
                .find_procedure(procedure)
                .await?
                .ok_or_else(|| anyhow!("procedure {} is not in the catalog", procedure))?;
            let recipe = repo.material_recipe(procedure).await?;
            let target = target.unwrap_or(pricing.target_margin_percent);

            let price = pricing_service::suggest_minimum_price(
                &found,
                &recipe,
                pricing.cost_per_minute,
                target,
                pricing.item_tax_rate_percent,
                pricing.card_fee_rate_percent,
            );

            if as_json {
                return Ok(serde_json::to_string_pretty(&json!({
                    "procedure_id": procedure,
                    "target_margin_percent": target,
                    "minimum_price": price,
                }))?);
            }
            Ok(format!("{} at {}% margin: minimum price {}", found.name, target, price.to_string().bold()))
        }
        Command::Simulate { clinic, total, down_payment, installments, card_profile } => {
            let pricing = pricing_for(&repo, Some(clinic), defaults).await?;
            let plan = PaymentPlan {
                total_value: total,
                installments,
                card_profile_id: card_profile,
                down_payment,
                clinic_id: clinic,
            };
            let simulation = ReceivablesSimulator::new(repo)
                .simulate_approval(&plan, pricing.clinic_tax_rate_percent)
                .await?;
            let decision = evaluate(&simulation, pricing.thresholds.approval_warning);

            if as_json {
                return Ok(serde_json::to_string_pretty(&json!({
                    "simulation": simulation,
                    "decision": decision,
                }))?);
            }
            Ok(render_simulation(&simulation, &decision))
        }
        Command::InitDb { .. } => Err(anyhow!("init-db does not use the catalog")),
    }
}

fn render_margin(margin: &ItemMargin, rates: &CostRates) -> String {
    let costs = &margin.costs;
    let status = match margin.status {
        MarginStatus::Excellent => "excellent".green(),
        MarginStatus::Good => "good".cyan(),
        MarginStatus::Warning => "warning".yellow(),
        MarginStatus::Danger => "danger".red(),
    };
    let mut out = String::new();
    out.push_str(&format!("price           {}\n", margin.price));
    out.push_str(&format!("time            {}\n", costs.time_cost));
    out.push_str(&format!("materials       {}\n", costs.material_cost));
    out.push_str(&format!("lab             {}\n", costs.lab_cost));
    out.push_str(&format!("tax ({}%)        {}\n", rates.tax_rate_percent, costs.tax_cost));
    out.push_str(&format!("card fee ({}%)   {}\n", rates.card_fee_rate_percent, costs.card_fee));
    out.push_str(&format!("professional    {}\n", costs.professional_cost));
    out.push_str(&format!("sales           {}\n", costs.sales_commission_cost));
    out.push_str(&format!("total cost      {}\n", costs.total_cost));
    out.push_str(&format!("profit          {}\n", margin.profit));
    out.push_str(&format!("margin          {}% ({})", margin.margin_percent.round_dp(2), status));
    if costs.degraded {
        out.push_str(&format!("\n{}", "procedure not found, costs are zero".yellow()));
    }
    out
}

fn render_simulation(simulation: &pricing_service::ApprovalSimulationResult, decision: &GuardDecision) -> String {
    let verdict = match decision {
        GuardDecision::Pass => "pass".green(),
        GuardDecision::Warn { .. } => "low margin, approval will be audited".yellow(),
        GuardDecision::Blocked { shortfall } => format!("blocked, loses {}", shortfall).red(),
    };
    format!(
        "gross       {}\ncard fee    {} ({}% x{})\ntax         {} ({}%)\nnet         {}\nnet margin  {}%\ndecision    {}",
        simulation.gross_value,
        simulation.card_fee_amount,
        simulation.rates.card_rate_percent,
        simulation.rates.installments,
        simulation.tax_amount,
        simulation.rates.clinic_tax_rate_percent,
        simulation.net_value,
        simulation.net_margin_percent.round_dp(2),
        verdict,
    )
}
