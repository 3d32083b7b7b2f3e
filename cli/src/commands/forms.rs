//! Form commands

use anyhow::{bail, Context};
use colored::Colorize;
use std::fs;
use tabled::Tabled;

use formkit_core::{FieldDefinition, SavedForm};
use formkit_store::{FormRepository, KeyValueStore};

use crate::{output::OutputFormat, FormCommands};

#[derive(Tabled)]
struct FormRow {
    id: String,
    name: String,
    fields: usize,
    derived: usize,
    created: String,
}

impl From<&SavedForm> for FormRow {
    fn from(form: &SavedForm) -> Self {
        Self {
            id: form.id.clone(),
            name: form.name.clone(),
            fields: form.fields.len(),
            derived: form.fields.iter().filter(|f| f.is_derived).count(),
            created: form.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Tabled)]
struct FieldRow {
    id: String,
    #[tabled(rename = "type")]
    field_type: String,
    label: String,
    required: bool,
    rules: String,
    formula: String,
}

impl From<&FieldDefinition> for FieldRow {
    fn from(field: &FieldDefinition) -> Self {
        let formula = match (&field.derived_formula, &field.parent_fields) {
            (Some(formula), Some(parents)) if field.is_derived => format!("{} ({})", formula, parents.join(", ")),
            _ => String::new(),
        };
        Self {
            id: field.id.clone(),
            field_type: field.field_type.to_string(),
            label: field.label.clone(),
            required: field.required,
            rules: field
                .validation_rules
                .iter()
                .map(|r| r.rule_type.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            formula,
        }
    }
}

pub fn handle<S: KeyValueStore>(action: FormCommands, repo: &FormRepository<S>, format: OutputFormat) -> anyhow::Result<()> {
    match action {
        FormCommands::List => {
            let forms = repo.saved_forms()?;
            format.print(&forms, forms.iter().map(FormRow::from))?;
        }
        FormCommands::Show { id } => {
            let form = repo.form_by_id(&id)?.with_context(|| format!("form not found: {}", id))?;
            if let OutputFormat::Table = format {
                println!("{} ({})", form.name.bold(), form.id);
            }
            format.print(&form, form.fields.iter().map(FieldRow::from))?;
        }
        FormCommands::Delete { id } => {
            if !repo.delete_form(&id)? {
                bail!("form not found: {}", id);
            }
            println!("{} Deleted form {}", "✓".green(), id);
        }
        FormCommands::Clear => {
            repo.clear_all()?;
            println!("{} Cleared all saved forms", "✓".green());
        }
        FormCommands::Import { file } => {
            let content = fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let forms = parse_forms(&content).with_context(|| format!("parsing {}", file.display()))?;
            let count = forms.len();
            for form in forms {
                tracing::info!(form_id = %form.id, name = %form.name, "importing form");
                repo.save_saved(form)?;
            }
            println!("{} Imported {} form(s)", "✓".green(), count);
        }
    }
    Ok(())
}

/// One saved form or an array of them
fn parse_forms(content: &str) -> serde_json::Result<Vec<SavedForm>> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|form| vec![form])
    }
}
