// Stable error codes surfaced to API consumers and audit trails

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_1001";
    pub const INVALID_TRANSITION: &str = "VALIDATION_1003";
}

pub mod reference_data {
    pub const BUDGET_NOT_FOUND: &str = "REFDATA_2002";
    pub const CARD_PROFILE_NOT_FOUND: &str = "REFDATA_2003";
    pub const LOOKUP_FAILED: &str = "REFDATA_2004";
}

pub mod policy {
    pub const APPROVAL_BLOCKED: &str = "POLICY_3001";
}

pub mod persistence {
    pub const WRITE_FAILED: &str = "DB_4001";
    pub const APPROVAL_COMMIT_FAILED: &str = "DB_4002";
}
