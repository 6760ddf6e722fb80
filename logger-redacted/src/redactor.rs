use crate::config::LoggerConfig;
use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
        .expect("static regex");
    static ref CARD_REGEX: Regex = Regex::new(r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b")
        .expect("static regex");
    static ref CPF_REGEX: Regex = Regex::new(r"\b\d{3}\.\d{3}\.\d{3}-\d{2}\b")
        .expect("static regex");
    static ref PHONE_REGEX: Regex = Regex::new(r"\(?\b\d{2}\)?[\s-]?9?\d{4}[-\s]?\d{4}\b")
        .expect("static regex");
}

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub redact_cpf: bool,
    pub redact_card_numbers: bool,
    pub hash_for_correlation: bool,
    /// JSON keys whose values are replaced by a correlation hash
    pub identifier_fields: Vec<String>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            redact_cpf: true,
            redact_card_numbers: true,
            hash_for_correlation: true,
            identifier_fields: vec![
                "patient_id".to_string(),
                "patient_name".to_string(),
                "patient_document".to_string(),
            ],
        }
    }
}

impl RedactionConfig {
    /// Every detector off; identifiers and free text pass through
    pub fn disabled() -> Self {
        Self {
            redact_emails: false,
            redact_phones: false,
            redact_cpf: false,
            redact_card_numbers: false,
            hash_for_correlation: false,
            identifier_fields: Vec::new(),
        }
    }
}

impl From<&LoggerConfig> for RedactionConfig {
    fn from(config: &LoggerConfig) -> Self {
        if config.redaction_enabled {
            Self::default()
        } else {
            Self::disabled()
        }
    }
}

/// PII redactor for log messages and audit payloads
#[derive(Debug, Clone)]
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl Default for PiiRedactor {
    fn default() -> Self {
        Self::new(RedactionConfig::default())
    }
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn from_logger_config(config: &LoggerConfig) -> Self {
        Self::new(RedactionConfig::from(config))
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_emails {
            result = self.replace(&EMAIL_REGEX, &result, "EMAIL", "***@***");
        }

        // Card numbers and CPF run before phones so the phone pattern
        // cannot consume part of a longer number.
        if self.config.redact_card_numbers {
            result = self.replace(&CARD_REGEX, &result, "CARD", "****-****-****-****");
        }

        if self.config.redact_cpf {
            result = self.replace(&CPF_REGEX, &result, "CPF", "***.***.***-**");
        }

        if self.config.redact_phones {
            result = self.replace(&PHONE_REGEX, &result, "PHONE", "(**) *****-****");
        }

        result
    }

    /// Redact a structured payload in place of its identifier fields and
    /// free-text strings. Numbers and booleans pass through untouched.
    pub fn redact_json(&self, value: Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| {
                        if self.config.identifier_fields.iter().any(|f| f == &key) {
                            let raw = match &value {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            };
                            (key, Value::String(format!("ID[{}]", self.hash_value(&raw))))
                        } else {
                            (key, self.redact_json(value))
                        }
                    })
                    .collect(),
            ),
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|v| self.redact_json(v)).collect())
            }
            Value::String(s) => Value::String(self.redact(&s)),
            other => other,
        }
    }

    fn replace(&self, pattern: &Regex, text: &str, label: &str, mask: &str) -> String {
        pattern
            .replace_all(text, |caps: &regex::Captures| {
                if self.config.hash_for_correlation {
                    format!("{}[{}]", label, self.hash_value(&caps[0]))
                } else {
                    mask.to_string()
                }
            })
            .to_string()
    }

    fn hash_value(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        let result = hasher.finalize();
        general_purpose::STANDARD.encode(&result[..8]) // first 8 bytes keep it short
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn masking_redactor() -> PiiRedactor {
        PiiRedactor::new(RedactionConfig {
            hash_for_correlation: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_email_redaction() {
        let redacted = masking_redactor().redact("Budget sent to ana.souza@example.com");
        assert!(redacted.contains("***@***"));
        assert!(!redacted.contains("ana.souza"));
    }

    #[test]
    fn test_phone_redaction() {
        let redacted = masking_redactor().redact("Call (11) 98765-4321 to confirm");
        assert!(redacted.contains("(**) *****-****"));
    }

    #[test]
    fn test_cpf_redaction() {
        let redacted = masking_redactor().redact("CPF 123.456.789-09 on file");
        assert_eq!(redacted, "CPF ***.***.***-** on file");
    }

    #[test]
    fn test_amounts_survive() {
        let text = "Approval blocked: gross 1000.00, net -10.00";
        assert_eq!(masking_redactor().redact(text), text);
    }

    #[test]
    fn test_json_identifier_fields_are_hashed() {
        let redactor = PiiRedactor::default();
        let payload = json!({
            "patient_id": "0b5e3c1a-7f43-4c1e-9a55-2d8c6f1e0a11",
            "net_value": "948.00",
            "notes": ["contact ana@clinic.com"],
        });

        let redacted = redactor.redact_json(payload);
        let patient = redacted["patient_id"].as_str().unwrap();
        assert!(patient.starts_with("ID["));
        assert_eq!(redacted["net_value"], "948.00");
        assert!(redacted["notes"][0].as_str().unwrap().starts_with("contact EMAIL["));
    }

    #[test]
    fn test_logger_flag_disables_redaction() {
        let config = LoggerConfig {
            redaction_enabled: false,
            ..LoggerConfig::default()
        };
        let redactor = PiiRedactor::from_logger_config(&config);

        let text = "CPF 123.456.789-09, ana@clinic.com";
        assert_eq!(redactor.redact(text), text);
        let payload = json!({ "patient_id": "p-1" });
        assert_eq!(redactor.redact_json(payload.clone()), payload);
    }

    #[test]
    fn test_logger_flag_enabled_by_default() {
        let redactor = PiiRedactor::from_logger_config(&LoggerConfig::default());
        assert!(!redactor.redact("CPF 123.456.789-09").contains("123.456.789-09"));
    }

    #[test]
    fn test_hash_is_stable_for_correlation() {
        let redactor = PiiRedactor::default();
        let a = redactor.redact_json(json!({"patient_id": "p-1"}));
        let b = redactor.redact_json(json!({"patient_id": "p-1"}));
        assert_eq!(a, b);
    }
}
