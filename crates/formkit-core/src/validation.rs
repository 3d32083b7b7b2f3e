//! Validation rule engine
//!
//! Every rule is checked independently; a value collects one violation per
//! failed rule, in rule order. Derived fields are never validated.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{FieldDefinition, FormInput, FormValue, ValidationError, ValidationRule, ValidationType};

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex"));

/// Minimum password length for `customPassword`
pub const PASSWORD_MIN_LEN: usize = 8;

/// A failed rule, not yet attributed to a field
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleViolation {
    pub rule: ValidationType,
    pub message: String,
}

/// Length as the browser counts it (UTF-16 code units)
fn text_len(s: &str) -> usize {
    s.encode_utf16().count()
}

fn violates(rule: &ValidationRule, value: &FormValue) -> bool {
    match rule.rule_type {
        ValidationType::Required | ValidationType::NotEmpty => value.is_blank(),
        ValidationType::MinLength => match (value.as_str(), rule.value.as_ref().and_then(|v| v.threshold())) {
            (Some(s), Some(min)) => (text_len(s) as f64) < min,
            _ => false,
        },
        ValidationType::MaxLength => match (value.as_str(), rule.value.as_ref().and_then(|v| v.threshold())) {
            (Some(s), Some(max)) => (text_len(s) as f64) > max,
            _ => false,
        },
        ValidationType::Email => match value.as_str() {
            Some(s) if !s.is_empty() => !EMAIL.is_match(s),
            _ => false,
        },
        ValidationType::CustomPassword => match value.as_str() {
            Some(s) if !s.is_empty() => {
                text_len(s) < PASSWORD_MIN_LEN || !s.chars().any(|c| c.is_ascii_digit())
            }
            _ => false,
        },
    }
}

/// Check one value against its rules
pub fn validate_field(value: &FormValue, rules: &[ValidationRule]) -> Vec<RuleViolation> {
    rules
        .iter()
        .filter(|rule| violates(rule, value))
        .map(|rule| RuleViolation { rule: rule.rule_type, message: rule.message.clone() })
        .collect()
}

/// Errors for every non-derived field, in field order. Missing values count as null.
pub fn validate_form(input: &FormInput, fields: &[FieldDefinition]) -> Vec<ValidationError> {
    let null = FormValue::Null;
    fields
        .iter()
        .filter(|field| !field.is_derived)
        .flat_map(|field| {
            let value = input.get(&field.id).unwrap_or(&null);
            validate_field(value, &field.validation_rules)
                .into_iter()
                .map(|v| ValidationError { field_id: field.id.clone(), message: v.message })
        })
        .collect()
}

/// First message recorded for `field_id`, or `""`
pub fn first_error_for<'a>(errors: &'a [ValidationError], field_id: &str) -> &'a str {
    errors
        .iter()
        .find(|e| e.field_id == field_id)
        .map(|e| e.message.as_str())
        .unwrap_or("")
}
