//! Tables backing the Postgres repository.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS procedures (
    id                  UUID PRIMARY KEY,
    name                TEXT NOT NULL,
    category_id         UUID,
    duration_minutes    INTEGER NOT NULL DEFAULT 0 CHECK (duration_minutes >= 0),
    estimated_lab_cost  NUMERIC(12, 2) NOT NULL DEFAULT 0,
    commission_type     TEXT NOT NULL DEFAULT 'PERCENTAGE',
    commission_value    NUMERIC(12, 4) NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS inventory_items (
    id                  UUID PRIMARY KEY,
    name                TEXT NOT NULL,
    average_unit_cost   NUMERIC(12, 4) NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS procedure_materials (
    procedure_id        UUID NOT NULL REFERENCES procedures (id) ON DELETE CASCADE,
    inventory_item_id   UUID NOT NULL REFERENCES inventory_items (id),
    quantity            NUMERIC(12, 4) NOT NULL,
    PRIMARY KEY (procedure_id, inventory_item_id)
);

CREATE TABLE IF NOT EXISTS sales_commission_rules (
    id                    UUID PRIMARY KEY,
    user_id               UUID NOT NULL,
    clinic_id             UUID NOT NULL,
    category_id           UUID,
    commission_type       TEXT NOT NULL,
    value                 NUMERIC(12, 4) NOT NULL,
    minimum_budget_value  NUMERIC(12, 2) NOT NULL DEFAULT 0,
    is_active             BOOLEAN NOT NULL DEFAULT TRUE
);
CREATE INDEX IF NOT EXISTS idx_sales_rules_user_clinic
    ON sales_commission_rules (user_id, clinic_id);

CREATE TABLE IF NOT EXISTS card_machine_profiles (
    id          UUID PRIMARY KEY,
    clinic_id   UUID NOT NULL,
    name        TEXT NOT NULL,
    debit_rate  NUMERIC(8, 4) NOT NULL DEFAULT 0,
    is_default  BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE TABLE IF NOT EXISTS card_machine_rates (
    profile_id    UUID NOT NULL REFERENCES card_machine_profiles (id) ON DELETE CASCADE,
    installments  INTEGER NOT NULL CHECK (installments > 0),
    rate          NUMERIC(8, 4) NOT NULL,
    PRIMARY KEY (profile_id, installments)
);

CREATE TABLE IF NOT EXISTS clinic_pricing_settings (
    clinic_id                 UUID PRIMARY KEY,
    cost_per_minute           NUMERIC(12, 4) NOT NULL,
    item_tax_rate_percent     NUMERIC(8, 4) NOT NULL,
    clinic_tax_rate_percent   NUMERIC(8, 4) NOT NULL,
    card_fee_rate_percent     NUMERIC(8, 4) NOT NULL,
    target_margin_percent     NUMERIC(8, 4) NOT NULL DEFAULT 30
);

CREATE TABLE IF NOT EXISTS budgets (
    id               UUID PRIMARY KEY,
    clinic_id        UUID NOT NULL,
    patient_id       UUID NOT NULL,
    professional_id  UUID NOT NULL,
    sales_rep_id     UUID,
    discount_value   NUMERIC(12, 2) NOT NULL DEFAULT 0,
    total_value      NUMERIC(12, 2) NOT NULL DEFAULT 0,
    final_value      NUMERIC(12, 2) NOT NULL DEFAULT 0,
    status           TEXT NOT NULL DEFAULT 'DRAFT',
    created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    approved_at      TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS budget_items (
    id                UUID PRIMARY KEY,
    budget_id         UUID NOT NULL REFERENCES budgets (id) ON DELETE CASCADE,
    position          INTEGER NOT NULL,
    procedure_id      UUID NOT NULL,
    quantity          INTEGER NOT NULL CHECK (quantity > 0),
    unit_price        NUMERIC(12, 2) NOT NULL,
    discount_percent  NUMERIC(8, 4) NOT NULL DEFAULT 0,
    total             NUMERIC(12, 2) NOT NULL
);

CREATE TABLE IF NOT EXISTS installments (
    id               UUID PRIMARY KEY,
    budget_id        UUID NOT NULL REFERENCES budgets (id),
    clinic_id        UUID NOT NULL,
    patient_id       UUID NOT NULL,
    sequence         INTEGER NOT NULL,
    is_down_payment  BOOLEAN NOT NULL DEFAULT FALSE,
    due_date         DATE NOT NULL,
    amount           NUMERIC(12, 2) NOT NULL,
    status           TEXT NOT NULL DEFAULT 'pending',
    UNIQUE (budget_id, sequence)
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let creates = SCHEMA.matches("CREATE TABLE").count();
        let guarded = SCHEMA.matches("CREATE TABLE IF NOT EXISTS").count();
        assert_eq!(creates, guarded);
        assert!(SCHEMA.contains("UNIQUE (budget_id, sequence)"));
    }
}
