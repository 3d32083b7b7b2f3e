//! Built-in named formulas

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use super::{EvalContext, ParentValues};
use crate::domain::FormValue;
use crate::error::FormulaError;

/// Whole years between the `date_of_birth`/`dob` parent and today.
///
/// No date of birth, or one that does not parse, gives 0.
pub(super) fn age_from_dob(parents: &ParentValues, ctx: &EvalContext<'_>) -> Result<FormValue, FormulaError> {
    let Some(dob) = ["date_of_birth", "dob"]
        .iter()
        .filter_map(|key| parents.get(key))
        .find(|v| v.is_truthy())
    else {
        return Ok(FormValue::Number(0.0));
    };

    let birth = match parse_date(dob, ctx.date_formats) {
        Ok(date) => date,
        Err(e) => {
            tracing::debug!(error = %e, "age_from_dob: treating date of birth as absent");
            return Ok(FormValue::Number(0.0));
        }
    };

    let today = ctx.today;
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    Ok(FormValue::Number(age as f64))
}

/// `first_name` and `last_name` joined by a space, trimmed
pub(super) fn full_name(parents: &ParentValues, _ctx: &EvalContext<'_>) -> Result<FormValue, FormulaError> {
    let part = |key: &str| {
        parents
            .get(key)
            .filter(|v| v.is_truthy())
            .map(FormValue::to_formula_text)
            .unwrap_or_default()
    };
    let joined = format!("{} {}", part("first_name"), part("last_name"));
    Ok(FormValue::Text(joined.trim().to_string()))
}

/// Sum of every parent, non-numeric values counting as 0
pub(super) fn total(parents: &ParentValues, _ctx: &EvalContext<'_>) -> Result<FormValue, FormulaError> {
    let sum = parents
        .values()
        .map(|v| v.as_number().unwrap_or(0.0))
        .sum::<f64>();
    Ok(FormValue::Number(sum))
}

/// Mean of the numeric parents as a two-decimal string; 0 when none are numeric
pub(super) fn average(parents: &ParentValues, _ctx: &EvalContext<'_>) -> Result<FormValue, FormulaError> {
    let numbers: Vec<f64> = parents.values().filter_map(FormValue::as_number).collect();
    if numbers.is_empty() {
        return Ok(FormValue::Number(0.0));
    }
    let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
    Ok(FormValue::Text(format!("{:.2}", mean)))
}

/// Calendar date from a form value: RFC 3339, ISO date-time, then the
/// configured formats. Numbers are epoch milliseconds.
pub fn parse_date(value: &FormValue, formats: &[String]) -> Result<NaiveDate, FormulaError> {
    if let FormValue::Number(ms) = value {
        return DateTime::from_timestamp_millis(*ms as i64)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| FormulaError::InvalidDate(value.to_formula_text()));
    }

    let text = value.to_formula_text();
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.date());
    }
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .ok_or_else(|| FormulaError::InvalidDate(text.to_string()))
}
