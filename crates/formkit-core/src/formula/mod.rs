//! Derived-field formulas
//!
//! A formula is either one of the registered named computations
//! (`age_from_dob`, `full_name`, `total`/`sum`, `average`) or a restricted
//! arithmetic expression over the parent values. Evaluation is total: any
//! failure is logged at debug level and yields an empty text value so a bad
//! formula never breaks the form.
//!
//! Parent values are keyed by the parent's label, lower-cased with runs of
//! whitespace replaced by `_` (`"Date of Birth"` → `date_of_birth`).

pub mod expr;
mod named;

pub use expr::{evaluate_arithmetic, BinaryOp, Expr};
pub use named::parse_date;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

use crate::clock::{Clock, SystemClock};
use crate::domain::{substitution_key, FieldDefinition, FormInput, FormValue};
use crate::error::FormulaError;

/// Formats tried for dates of birth after RFC 3339 and ISO date-time
pub const DEFAULT_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

static ARITHMETIC_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9+\-*/().\s]+$").expect("static regex"));

/// Parent values in parent declaration order.
///
/// Inserting an existing key replaces its value in place (last write wins,
/// first position kept).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParentValues {
    entries: Vec<(String, FormValue)>,
}

impl ParentValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FormValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FormValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn values(&self) -> impl Iterator<Item = &FormValue> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<FormValue>> FromIterator<(K, V)> for ParentValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = ParentValues::new();
        for (k, v) in iter {
            values.insert(k, v.into());
        }
        values
    }
}

/// Named formula kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormulaKind {
    AgeFromDob,
    FullName,
    Total,
    Average,
}

type FormulaFn = fn(&ParentValues, &EvalContext<'_>) -> Result<FormValue, FormulaError>;

/// Registry entry: the names a kind answers to and its implementation
pub struct FormulaSpec {
    pub kind: FormulaKind,
    pub names: &'static [&'static str],
    pub label: &'static str,
    func: FormulaFn,
}

static REGISTRY: [FormulaSpec; 4] = [
    FormulaSpec {
        kind: FormulaKind::AgeFromDob,
        names: &["age_from_dob"],
        label: "Calculate Age from Date of Birth",
        func: named::age_from_dob,
    },
    FormulaSpec {
        kind: FormulaKind::FullName,
        names: &["full_name"],
        label: "Concatenate First and Last Name",
        func: named::full_name,
    },
    FormulaSpec {
        kind: FormulaKind::Total,
        names: &["total", "sum"],
        label: "Sum of Selected Fields",
        func: named::total,
    },
    FormulaSpec {
        kind: FormulaKind::Average,
        names: &["average"],
        label: "Average of Selected Fields",
        func: named::average,
    },
];

impl FormulaKind {
    /// Case-insensitive lookup of a trimmed formula name
    pub fn lookup(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        REGISTRY
            .iter()
            .find(|spec| spec.names.contains(&name.as_str()))
            .map(|spec| spec.kind)
    }

    pub fn spec(&self) -> &'static FormulaSpec {
        // every kind has exactly one registry entry
        match self {
            FormulaKind::AgeFromDob => &REGISTRY[0],
            FormulaKind::FullName => &REGISTRY[1],
            FormulaKind::Total => &REGISTRY[2],
            FormulaKind::Average => &REGISTRY[3],
        }
    }

    /// Canonical name
    pub fn name(&self) -> &'static str {
        self.spec().names[0]
    }
}

/// `(name, label)` for every named formula, in registry order
pub fn catalogue() -> impl Iterator<Item = (&'static str, &'static str)> {
    REGISTRY.iter().map(|spec| (spec.names[0], spec.label))
}

/// A formula after dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    Named(FormulaKind),
    Expression(String),
}

impl Formula {
    pub fn parse(source: &str) -> Self {
        match FormulaKind::lookup(source) {
            Some(kind) => Formula::Named(kind),
            None => Formula::Expression(source.to_string()),
        }
    }
}

/// Inputs a formula may read besides its parents
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub today: NaiveDate,
    pub date_formats: &'a [String],
}

/// Formula evaluator bound to a clock
#[derive(Debug, Clone)]
pub struct FormulaEvaluator<C: Clock = SystemClock> {
    clock: C,
    date_formats: Vec<String>,
}

impl FormulaEvaluator<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for FormulaEvaluator<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> FormulaEvaluator<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn with_date_formats(mut self, formats: Vec<String>) -> Self {
        self.date_formats = formats;
        self
    }

    /// Evaluate `formula` against `parents`. Never fails; errors give `""`.
    pub fn evaluate(&self, formula: &str, parents: &ParentValues) -> FormValue {
        match self.try_evaluate(formula, parents) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(formula, error = %e, "formula evaluation failed");
                FormValue::Text(String::new())
            }
        }
    }

    /// Evaluate and surface the failure instead of collapsing it
    pub fn try_evaluate(&self, formula: &str, parents: &ParentValues) -> Result<FormValue, FormulaError> {
        let ctx = EvalContext { today: self.clock.today(), date_formats: &self.date_formats };
        match Formula::parse(formula) {
            Formula::Named(kind) => (kind.spec().func)(parents, &ctx),
            Formula::Expression(source) => {
                let expression = substitute(&source, parents)?;
                if !ARITHMETIC_ONLY.is_match(&expression) {
                    return Err(FormulaError::DisallowedCharacters(expression));
                }
                evaluate_arithmetic(&expression).map(FormValue::Number)
            }
        }
    }

    /// Value of one derived field given the whole form.
    ///
    /// Non-derived fields and derived fields without parents or formula get `""`.
    pub fn compute_derived_value(
        &self,
        field: &FieldDefinition,
        input: &FormInput,
        fields: &[FieldDefinition],
    ) -> FormValue {
        let formula = match (&field.parent_fields, &field.derived_formula) {
            (Some(_), Some(formula)) if field.is_derived && !formula.is_empty() => formula,
            _ => return FormValue::Text(String::new()),
        };
        self.evaluate(formula, &parent_values(field, input, fields))
    }
}

/// Collect a derived field's parent values keyed by substitution key.
///
/// Parent ids that match no field are skipped; falsy values become `""`.
pub fn parent_values(field: &FieldDefinition, input: &FormInput, fields: &[FieldDefinition]) -> ParentValues {
    let mut values = ParentValues::new();
    for parent_id in field.parent_fields.iter().flatten() {
        let Some(parent) = fields.iter().find(|f| &f.id == parent_id) else {
            tracing::debug!(field = %field.id, parent = %parent_id, "parent field not in form");
            continue;
        };
        let value = input
            .get(parent_id)
            .filter(|v| v.is_truthy())
            .cloned()
            .unwrap_or_else(|| FormValue::Text(String::new()));
        values.insert(substitution_key(&parent.label), value);
    }
    values
}

/// Replace every whole-word occurrence of each key with its value's text,
/// in parent order. Falsy values are spliced in as `0`.
pub fn substitute(formula: &str, parents: &ParentValues) -> Result<String, FormulaError> {
    let mut expression = formula.to_string();
    for (key, value) in parents.iter().filter(|(k, _)| !k.is_empty()) {
        let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(key)))
            .map_err(|_| FormulaError::InvalidSubstitutionKey(key.to_string()))?;
        let replacement = if value.is_truthy() { value.to_formula_text() } else { "0".to_string() };
        expression = pattern.replace_all(&expression, NoExpand(&replacement)).into_owned();
    }
    Ok(expression)
}

/// Evaluate with the system clock and default date formats
pub fn evaluate(formula: &str, parents: &ParentValues) -> FormValue {
    FormulaEvaluator::new().evaluate(formula, parents)
}
