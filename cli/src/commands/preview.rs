//! Preview command: fill in a saved form and show what the user would see

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::Tabled;

use formkit_core::{
    first_error_for, Clock, FixedClock, FormInput, FormValue, FormkitConfig, SavedForm, SystemClock, ValidationError,
};
use formkit_store::{FormRepository, KeyValueStore};

use crate::output::OutputFormat;

pub struct PreviewRequest {
    pub id: String,
    pub sets: Vec<String>,
    pub input: Option<PathBuf>,
    pub today: Option<String>,
}

#[derive(Debug, Serialize)]
struct FieldValue {
    id: String,
    label: String,
    value: FormValue,
    derived: bool,
}

#[derive(Debug, Serialize)]
struct PreviewReport {
    form_id: String,
    name: String,
    today: NaiveDate,
    values: Vec<FieldValue>,
    errors: Vec<ValidationError>,
    valid: bool,
}

#[derive(Tabled)]
struct PreviewRow {
    field: String,
    label: String,
    value: String,
    derived: String,
    error: String,
}

impl PreviewReport {
    fn build(form: &SavedForm, today: NaiveDate, input: &FormInput, errors: Vec<ValidationError>) -> Self {
        let values = form
            .fields
            .iter()
            .map(|field| FieldValue {
                id: field.id.clone(),
                label: field.label.clone(),
                value: input.get(&field.id).cloned().unwrap_or_default(),
                derived: field.is_derived,
            })
            .collect();
        Self {
            form_id: form.id.clone(),
            name: form.name.clone(),
            today,
            values,
            valid: errors.is_empty(),
            errors,
        }
    }

    fn rows(&self) -> Vec<PreviewRow> {
        self.values
            .iter()
            .map(|v| PreviewRow {
                field: v.id.clone(),
                label: v.label.clone(),
                value: v.value.to_string(),
                derived: if v.derived { "yes".into() } else { String::new() },
                error: first_error_for(&self.errors, &v.id).to_string(),
            })
            .collect()
    }
}

pub fn handle<S: KeyValueStore>(
    request: PreviewRequest,
    repo: &FormRepository<S>,
    config: &FormkitConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let form = repo
        .form_by_id(&request.id)?
        .with_context(|| format!("form not found: {}", request.id))?;

    let today = match request.today.as_deref() {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid --today: {}", s))?,
        None => SystemClock.today(),
    };
    let initial = match &request.input {
        Some(path) => read_input(path)?,
        None => FormInput::new(),
    };
    let assignments = request
        .sets
        .iter()
        .map(|s| parse_assignment(s))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let (input, errors) = run_preview(&form, config, FixedClock(today), &initial, assignments)?;
    let report = PreviewReport::build(&form, today, &input, errors);

    format.print(&report, report.rows())?;
    if let OutputFormat::Table = format {
        if report.valid {
            println!("{}", "✓ valid".green());
        } else {
            println!("{}", format!("✗ {} error(s)", report.errors.len()).red());
        }
    }
    Ok(())
}

/// Start from defaults, apply each assignment as a user edit, then validate
fn run_preview<C: Clock>(
    form: &SavedForm,
    config: &FormkitConfig,
    clock: C,
    initial: &FormInput,
    assignments: Vec<(String, FormValue)>,
) -> anyhow::Result<(FormInput, Vec<ValidationError>)> {
    let reconciler = config.reconciler(clock);
    let fields = &form.fields;

    let mut input = reconciler.initial_input(initial, fields);
    for (field_id, value) in assignments {
        let field = fields
            .iter()
            .find(|f| f.id == field_id)
            .ok_or_else(|| anyhow!("form {} has no field {}", form.id, field_id))?;
        if field.is_derived {
            tracing::warn!(field = %field_id, "value for derived field will be recomputed");
        }
        input = reconciler.apply_change(&input, fields, &field_id, value).input;
    }
    let errors = reconciler.validate_form(&input, fields);
    Ok((input, errors))
}

/// `<field-id>=<value>`; the value is JSON if it parses, else text
fn parse_assignment(raw: &str) -> anyhow::Result<(String, FormValue)> {
    let (field_id, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected <field-id>=<value>, got {:?}", raw))?;
    let field_id = field_id.trim();
    if field_id.is_empty() {
        return Err(anyhow!("missing field id in {:?}", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| FormValue::text(value));
    Ok((field_id.to_string(), value))
}

fn read_input(path: &Path) -> anyhow::Result<FormInput> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not a JSON object of field values", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use formkit_core::{DerivedPass, FieldDefinition, FieldType, FormSchema, ValidationRule};

    fn order_form() -> SavedForm {
        let mut form = FormSchema::create("Order");
        form.add_field(FieldDefinition::new("name", FieldType::Text, "Name").with_rule(ValidationRule::required("Name required")))
            .unwrap();
        form.add_field(FieldDefinition::new("dob", FieldType::Date, "DOB")).unwrap();
        form.add_field(FieldDefinition::new("price", FieldType::Number, "Price")).unwrap();
        form.add_field(FieldDefinition::new("qty", FieldType::Number, "Quantity")).unwrap();
        form.add_field(FieldDefinition::derived("age", "Age", &["dob"], "age_from_dob")).unwrap();
        form.add_field(FieldDefinition::derived("cost", "Cost", &["price", "qty"], "price * quantity")).unwrap();
        form.to_saved()
    }

    fn clock() -> FixedClock {
        FixedClock::ymd(2024, 6, 15).unwrap()
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("qty=3").unwrap(), ("qty".into(), FormValue::Number(3.0)));
        assert_eq!(parse_assignment("name=Ada").unwrap(), ("name".into(), FormValue::text("Ada")));
        assert_eq!(parse_assignment("note=a=b").unwrap(), ("note".into(), FormValue::text("a=b")));
        assert_eq!(
            parse_assignment("tags=[\"x\"]").unwrap(),
            ("tags".into(), FormValue::List(vec!["x".into()]))
        );
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=3").is_err());
    }

    #[test]
    fn test_preview_computes_and_validates() {
        let form = order_form();
        let assignments = vec![
            ("dob".to_string(), FormValue::text("2000-06-16")),
            ("price".to_string(), FormValue::Number(2.5)),
            ("qty".to_string(), FormValue::Number(4.0)),
        ];
        let (input, errors) =
            run_preview(&form, &FormkitConfig::default(), clock(), &FormInput::new(), assignments).unwrap();

        assert_eq!(input["age"], FormValue::Number(23.0));
        assert_eq!(input["cost"], FormValue::Number(10.0));
        assert_eq!(errors.len(), 1);
        assert_eq!(first_error_for(&errors, "name"), "Name required");

        let report = PreviewReport::build(&form, clock().0, &input, errors);
        assert!(!report.valid);
        assert_eq!(report.rows()[0].error, "Name required");
        assert_eq!(report.rows()[5].value, "10");
    }

    #[test]
    fn test_preview_rejects_unknown_field() {
        let form = order_form();
        let assignments = vec![("missing".to_string(), FormValue::text("x"))];
        assert!(run_preview(&form, &FormkitConfig::default(), clock(), &FormInput::new(), assignments).is_err());
    }

    #[test]
    fn test_preview_honours_configured_pass() {
        let mut form = FormSchema::create("Chain");
        form.add_field(FieldDefinition::derived("a", "A", &["b"], "b + 1")).unwrap();
        form.add_field(FieldDefinition::derived("b", "B", &["a"], "a * 2")).unwrap();
        let form = form.to_saved();
        let initial: FormInput =
            [("a".to_string(), FormValue::Number(1.0)), ("b".to_string(), FormValue::Number(10.0))].into_iter().collect();

        let mut config = FormkitConfig::default();
        let (input, _) = run_preview(&form, &config, clock(), &initial, vec![]).unwrap();
        assert_eq!(input["b"], FormValue::Number(22.0));

        config.derived_pass = DerivedPass::Snapshot;
        let (input, _) = run_preview(&form, &config, clock(), &initial, vec![]).unwrap();
        assert_eq!(input["b"], FormValue::Number(2.0));
    }
}
