//! Form value objects
//!
//! Field definitions, validation rules and the loosely typed values a user
//! enters. Serialized field names follow the browser representation
//! (`isDerived`, `validationRules`, ...) so saved schemas stay portable.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Current values of a form, keyed by field id
pub type FormInput = HashMap<String, FormValue>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Date,
    Email,
}

impl FieldType {
    pub const ALL: [FieldType; 8] = [
        FieldType::Text,
        FieldType::Number,
        FieldType::Textarea,
        FieldType::Select,
        FieldType::Radio,
        FieldType::Checkbox,
        FieldType::Date,
        FieldType::Email,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Textarea => "textarea",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
            FieldType::Email => "email",
        }
    }

    /// Select, radio and checkbox carry an option list
    pub fn needs_options(&self) -> bool {
        matches!(self, FieldType::Select | FieldType::Radio | FieldType::Checkbox)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationType {
    Required,
    NotEmpty,
    MinLength,
    MaxLength,
    Email,
    CustomPassword,
}

impl ValidationType {
    pub const ALL: [ValidationType; 6] = [
        ValidationType::Required,
        ValidationType::NotEmpty,
        ValidationType::MinLength,
        ValidationType::MaxLength,
        ValidationType::Email,
        ValidationType::CustomPassword,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationType::Required => "required",
            ValidationType::NotEmpty => "notEmpty",
            ValidationType::MinLength => "minLength",
            ValidationType::MaxLength => "maxLength",
            ValidationType::Email => "email",
            ValidationType::CustomPassword => "customPassword",
        }
    }

    /// Message used when a rule is created without one
    pub fn default_message(&self) -> &'static str {
        match self {
            ValidationType::Required => "This field is required",
            ValidationType::NotEmpty => "This field cannot be empty",
            ValidationType::MinLength => "Minimum length not met",
            ValidationType::MaxLength => "Maximum length exceeded",
            ValidationType::Email => "Please enter a valid email address",
            ValidationType::CustomPassword => {
                "Password must be at least 8 characters and contain a number"
            }
        }
    }

    /// Only the length rules take a numeric threshold
    pub fn needs_value(&self) -> bool {
        matches!(self, ValidationType::MinLength | ValidationType::MaxLength)
    }
}

impl fmt::Display for ValidationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold attached to a length rule.
///
/// Saved schemas may carry it as a number or as a numeric string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Number(#[serde(serialize_with = "serialize_number")] f64),
    Text(String),
}

impl RuleValue {
    /// Usable threshold; zero, empty and non-numeric thresholds disable the rule
    pub fn threshold(&self) -> Option<f64> {
        let n = match self {
            RuleValue::Number(n) => *n,
            RuleValue::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        (n != 0.0 && !n.is_nan()).then_some(n)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(rename = "type")]
    pub rule_type: ValidationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<RuleValue>,
    pub message: String,
}

impl ValidationRule {
    pub fn new(rule_type: ValidationType, message: impl Into<String>) -> Self {
        Self { rule_type, value: None, message: message.into() }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(RuleValue::Number(value));
        self
    }

    pub fn required(message: impl Into<String>) -> Self {
        Self::new(ValidationType::Required, message)
    }

    pub fn min_length(len: usize, message: impl Into<String>) -> Self {
        Self::new(ValidationType::MinLength, message).with_value(len as f64)
    }

    pub fn max_length(len: usize, message: impl Into<String>) -> Self {
        Self::new(ValidationType::MaxLength, message).with_value(len as f64)
    }
}

/// One field of a form schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<FormValue>,
    #[serde(default)]
    pub validation_rules: Vec<ValidationRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub is_derived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_formula: Option<String>,
}

impl FieldDefinition {
    /// Plain user-editable field
    pub fn new(id: impl Into<String>, field_type: FieldType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            field_type,
            label: label.into(),
            required: false,
            default_value: None,
            validation_rules: Vec::new(),
            options: field_type.needs_options().then(Vec::new),
            is_derived: false,
            parent_fields: None,
            derived_formula: None,
        }
    }

    /// Computed field reading from `parents`
    pub fn derived(
        id: impl Into<String>,
        label: impl Into<String>,
        parents: &[&str],
        formula: impl Into<String>,
    ) -> Self {
        let mut field = Self::new(id, FieldType::Text, label);
        field.is_derived = true;
        field.parent_fields = Some(parents.iter().map(|p| p.to_string()).collect());
        field.derived_formula = Some(formula.into());
        field
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.validation_rules.push(rule);
        self
    }

    pub fn with_default(mut self, value: FormValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Key under which this field's value is visible to formulas
    pub fn substitution_key(&self) -> String {
        substitution_key(&self.label)
    }
}

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Lower-cased label with whitespace runs collapsed to `_`
pub fn substitution_key(label: &str) -> String {
    WHITESPACE_RUN.replace_all(&label.to_lowercase(), "_").into_owned()
}

/// A value held by a form field
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    #[default]
    Null,
    Bool(bool),
    Number(#[serde(serialize_with = "serialize_number")] f64),
    Text(String),
    List(Vec<String>),
}

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:Infinity|\d+\.?\d*(?:[eE][+-]?\d+)?|\.\d+(?:[eE][+-]?\d+)?)")
        .expect("static regex")
});

/// Parse the longest numeric prefix of `s`, ignoring leading whitespace.
///
/// `"12abc"` gives 12, `"abc"` gives `None`.
pub fn parse_leading_number(s: &str) -> Option<f64> {
    let m = LEADING_NUMBER.find(s.trim_start())?;
    let text = m.as_str();
    match text.trim_start_matches(&['+', '-'][..]) {
        "Infinity" if text.starts_with('-') => Some(f64::NEG_INFINITY),
        "Infinity" => Some(f64::INFINITY),
        _ => text.parse().ok(),
    }
}

/// Render a number the way the form displays it: integers without a
/// fractional part, everything else in shortest form.
/// Largest magnitude below which every whole f64 is an exact integer
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Whole numbers as JSON integers (`1`, not `1.0`), the way browsers write them
fn serialize_number<S: Serializer>(n: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        serializer.serialize_i64(*n as i64)
    } else {
        serializer.serialize_f64(*n)
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

impl FormValue {
    pub fn text(s: impl Into<String>) -> Self {
        FormValue::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FormValue::Null)
    }

    /// Loose truthiness: null, false, 0, NaN and "" are falsy; lists are truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            FormValue::Null => false,
            FormValue::Bool(b) => *b,
            FormValue::Number(n) => *n != 0.0 && !n.is_nan(),
            FormValue::Text(s) => !s.is_empty(),
            FormValue::List(_) => true,
        }
    }

    /// Nothing meaningful entered: falsy, an empty list, or whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            FormValue::List(items) => items.is_empty(),
            FormValue::Text(s) => s.trim().is_empty(),
            other => !other.is_truthy(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FormValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric reading of the value (leading-prefix parse for text)
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormValue::Number(n) if n.is_nan() => None,
            FormValue::Number(n) => Some(*n),
            FormValue::Text(s) => parse_leading_number(s),
            FormValue::List(items) => parse_leading_number(&items.join(",")),
            FormValue::Null | FormValue::Bool(_) => None,
        }
    }

    /// Text spliced into arithmetic formulas
    pub fn to_formula_text(&self) -> String {
        match self {
            FormValue::Null => String::new(),
            FormValue::Bool(b) => b.to_string(),
            FormValue::Number(n) => format_number(*n),
            FormValue::Text(s) => s.clone(),
            FormValue::List(items) => items.join(","),
        }
    }
}

impl fmt::Display for FormValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_formula_text())
    }
}

impl From<&str> for FormValue {
    fn from(s: &str) -> Self {
        FormValue::Text(s.to_string())
    }
}

impl From<String> for FormValue {
    fn from(s: String) -> Self {
        FormValue::Text(s)
    }
}

impl From<f64> for FormValue {
    fn from(n: f64) -> Self {
        FormValue::Number(n)
    }
}

impl From<i64> for FormValue {
    fn from(n: i64) -> Self {
        FormValue::Number(n as f64)
    }
}

impl From<bool> for FormValue {
    fn from(b: bool) -> Self {
        FormValue::Bool(b)
    }
}

impl From<Vec<String>> for FormValue {
    fn from(items: Vec<String>) -> Self {
        FormValue::List(items)
    }
}

/// A rule violation attributed to a field
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub field_id: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitution_key() {
        assert_eq!(substitution_key("Date of Birth"), "date_of_birth");
        assert_eq!(substitution_key("First   Name"), "first_name");
        assert_eq!(substitution_key("DOB"), "dob");
    }

    #[test]
    fn test_whole_numbers_serialize_as_integers() {
        let rule: ValidationRule =
            serde_json::from_str(r#"{"type":"minLength","value":1,"message":"m"}"#).unwrap();
        assert_eq!(serde_json::to_string(&rule).unwrap(), r#"{"type":"minLength","value":1,"message":"m"}"#);

        assert_eq!(serde_json::to_string(&FormValue::Number(42.0)).unwrap(), "42");
        assert_eq!(serde_json::to_string(&FormValue::Number(-3.0)).unwrap(), "-3");
        assert_eq!(serde_json::to_string(&FormValue::Number(2.5)).unwrap(), "2.5");
        assert_eq!(serde_json::to_string(&RuleValue::Number(1e300)).unwrap(), "1e300");
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(parse_leading_number("12abc"), Some(12.0));
        assert_eq!(parse_leading_number("  -3.5"), Some(-3.5));
        assert_eq!(parse_leading_number(".5"), Some(0.5));
        assert_eq!(parse_leading_number("1e3x"), Some(1000.0));
        assert_eq!(parse_leading_number("x"), None);
        assert_eq!(parse_leading_number(""), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(11.0), "11");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[test]
    fn test_truthiness() {
        assert!(!FormValue::Null.is_truthy());
        assert!(!FormValue::Number(0.0).is_truthy());
        assert!(!FormValue::text("").is_truthy());
        assert!(FormValue::List(vec![]).is_truthy());
        assert!(FormValue::List(vec![]).is_blank());
        assert!(FormValue::text("   ").is_blank());
        assert!(!FormValue::Number(3.0).is_blank());
    }

    #[test]
    fn test_field_json_shape() {
        let field = FieldDefinition::derived("age", "Age", &["dob"], "age_from_dob");
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["isDerived"], true);
        assert_eq!(json["parentFields"][0], "dob");
        assert_eq!(json["derivedFormula"], "age_from_dob");
        assert!(json.get("options").is_none());
    }

    #[test]
    fn test_rule_threshold() {
        assert_eq!(RuleValue::Number(3.0).threshold(), Some(3.0));
        assert_eq!(RuleValue::Number(0.0).threshold(), None);
        assert_eq!(RuleValue::Text("5".into()).threshold(), Some(5.0));
        assert_eq!(RuleValue::Text("abc".into()).threshold(), None);
    }

    #[test]
    fn test_form_value_untagged() {
        let input: FormInput = serde_json::from_str(
            r#"{"a": null, "b": true, "c": 4, "d": "x", "e": ["1", "2"]}"#,
        )
        .unwrap();
        assert_eq!(input["a"], FormValue::Null);
        assert_eq!(input["b"], FormValue::Bool(true));
        assert_eq!(input["c"], FormValue::Number(4.0));
        assert_eq!(input["d"], FormValue::text("x"));
        assert_eq!(input["e"], FormValue::List(vec!["1".into(), "2".into()]));
    }
}
