//! Field factory helpers used by the form builder

use std::collections::BTreeMap;

use crate::domain::{FieldDefinition, FieldType, FormValue, RuleValue, ValidationRule, ValidationType};

/// New field of `field_type` with builder defaults and a fresh id
pub fn create_default_field(field_type: FieldType) -> FieldDefinition {
    let default_value = match field_type {
        FieldType::Checkbox => FormValue::List(vec![]),
        _ => FormValue::Text(String::new()),
    };
    FieldDefinition::new(uuid::Uuid::new_v4().to_string(), field_type, "New Field").with_default(default_value)
}

/// Rule of `rule_type` with its default message; length rules start at 1
pub fn default_validation_rule(rule_type: ValidationType) -> ValidationRule {
    ValidationRule {
        rule_type,
        value: rule_type.needs_value().then_some(RuleValue::Number(1.0)),
        message: rule_type.default_message().to_string(),
    }
}

pub fn needs_options(field_type: FieldType) -> bool {
    field_type.needs_options()
}

pub fn needs_validation_value(rule_type: ValidationType) -> bool {
    rule_type.needs_value()
}

/// Number of fields per type
pub fn field_type_counts(fields: &[FieldDefinition]) -> BTreeMap<FieldType, usize> {
    let mut counts = BTreeMap::new();
    for field in fields {
        *counts.entry(field.field_type).or_insert(0) += 1;
    }
    counts
}

/// Fields a derived field may use as parents: every non-derived field, as `(id, label)`
pub fn derived_parent_candidates(fields: &[FieldDefinition]) -> Vec<(&str, &str)> {
    fields
        .iter()
        .filter(|f| !f.is_derived)
        .map(|f| (f.id.as_str(), f.label.as_str()))
        .collect()
}
