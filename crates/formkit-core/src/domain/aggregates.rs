//! Form Aggregate
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::events::FormEvent;
use crate::domain::value_objects::{FieldDefinition, FieldType, FormValue, ValidationRule};
use crate::error::{FormError, Result};

/// A form under construction: name plus the ordered field sequence
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    id: String,
    name: String,
    fields: Vec<FieldDefinition>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<FormEvent>,
}

/// Persisted form record. Holds the schema only, never entered values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedForm {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub fields: Vec<FieldDefinition>,
}

/// Partial update applied by [`FormSchema::update_field`]; `None` leaves the
/// attribute untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPatch {
    #[serde(rename = "type")]
    pub field_type: Option<FieldType>,
    pub label: Option<String>,
    pub required: Option<bool>,
    pub default_value: Option<FormValue>,
    pub validation_rules: Option<Vec<ValidationRule>>,
    pub options: Option<Vec<String>>,
    pub is_derived: Option<bool>,
    pub parent_fields: Option<Vec<String>>,
    pub derived_formula: Option<String>,
}

impl FieldPatch {
    fn apply(self, field: &mut FieldDefinition) {
        if let Some(t) = self.field_type { field.field_type = t; }
        if let Some(l) = self.label { field.label = l; }
        if let Some(r) = self.required { field.required = r; }
        if let Some(v) = self.default_value { field.default_value = Some(v); }
        if let Some(rules) = self.validation_rules { field.validation_rules = rules; }
        if let Some(o) = self.options { field.options = Some(o); }
        if let Some(d) = self.is_derived { field.is_derived = d; }
        if let Some(p) = self.parent_fields { field.parent_fields = Some(p); }
        if let Some(f) = self.derived_formula { field.derived_formula = Some(f); }
    }
}

impl FormSchema {
    pub fn create(name: impl Into<String>) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        Self {
            events: vec![FormEvent::Created { form_id: id.clone() }],
            id,
            name: name.into(),
            fields: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a schema from its persisted record for further editing
    pub fn from_saved(saved: SavedForm) -> Self {
        Self {
            id: saved.id,
            name: saved.name,
            fields: saved.fields,
            created_at: saved.created_at,
            updated_at: Utc::now(),
            events: vec![],
        }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn fields(&self) -> &[FieldDefinition] { &self.fields }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn field(&self, field_id: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.id == field_id)
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.record(FormEvent::Renamed { form_id: self.id.clone(), name: self.name.clone() });
    }

    /// Append a field; ids must stay unique within the form
    pub fn add_field(&mut self, field: FieldDefinition) -> Result<()> {
        if self.field(&field.id).is_some() {
            return Err(FormError::DuplicateField(field.id));
        }
        let field_id = field.id.clone();
        self.fields.push(field);
        self.record(FormEvent::FieldAdded { form_id: self.id.clone(), field_id });
        Ok(())
    }

    pub fn update_field(&mut self, field_id: &str, patch: FieldPatch) -> Result<()> {
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.id == field_id)
            .ok_or_else(|| FormError::FieldNotFound(field_id.to_string()))?;
        patch.apply(field);
        self.record(FormEvent::FieldUpdated {
            form_id: self.id.clone(),
            field_id: field_id.to_string(),
        });
        Ok(())
    }

    /// Remove a field. Unknown ids are ignored.
    pub fn delete_field(&mut self, field_id: &str) {
        let before = self.fields.len();
        self.fields.retain(|f| f.id != field_id);
        if self.fields.len() != before {
            self.record(FormEvent::FieldRemoved {
                form_id: self.id.clone(),
                field_id: field_id.to_string(),
            });
        }
    }

    /// Move the field at `from` to position `to`. `to` past the end appends.
    pub fn reorder_fields(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.fields.len();
        if from >= len {
            return Err(FormError::IndexOutOfRange { index: from, len });
        }
        let field = self.fields.remove(from);
        let to = to.min(self.fields.len());
        self.fields.insert(to, field);
        self.record(FormEvent::FieldsReordered { form_id: self.id.clone(), from, to });
        Ok(())
    }

    pub fn to_saved(&self) -> SavedForm {
        SavedForm {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            fields: self.fields.clone(),
        }
    }

    pub fn take_events(&mut self) -> Vec<FormEvent> { std::mem::take(&mut self.events) }

    fn record(&mut self, event: FormEvent) {
        self.updated_at = Utc::now();
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact_form() -> FormSchema {
        let mut f = FormSchema::create("Contact Form");
        f.add_field(FieldDefinition::new("name", FieldType::Text, "Name")).unwrap();
        f.add_field(FieldDefinition::new("email", FieldType::Email, "Email")).unwrap();
        f.add_field(FieldDefinition::new("topic", FieldType::Select, "Topic")).unwrap();
        f
    }

    #[test]
    fn test_form_lifecycle_events() {
        let mut f = contact_form();
        f.rename("Support");
        f.delete_field("email");
        let events = f.take_events();
        assert_eq!(events.len(), 6);
        assert!(matches!(events[0], FormEvent::Created { .. }));
        assert!(matches!(events.last(), Some(FormEvent::FieldRemoved { field_id, .. }) if field_id == "email"));
        assert!(f.take_events().is_empty());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut f = contact_form();
        let err = f.add_field(FieldDefinition::new("name", FieldType::Text, "Again")).unwrap_err();
        assert!(matches!(err, FormError::DuplicateField(id) if id == "name"));
    }

    #[test]
    fn test_update_field_patch() {
        let mut f = contact_form();
        f.update_field("name", FieldPatch { label: Some("Full Name".into()), required: Some(true), ..Default::default() })
            .unwrap();
        let field = f.field("name").unwrap();
        assert_eq!(field.label, "Full Name");
        assert!(field.required);
        assert_eq!(field.field_type, FieldType::Text);

        assert!(matches!(f.update_field("missing", FieldPatch::default()), Err(FormError::FieldNotFound(_))));
    }

    #[test]
    fn test_reorder_fields() {
        let mut f = contact_form();
        f.reorder_fields(2, 0).unwrap();
        let ids: Vec<_> = f.fields().iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["topic", "name", "email"]);

        f.reorder_fields(0, 99).unwrap();
        let ids: Vec<_> = f.fields().iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["name", "email", "topic"]);

        assert!(matches!(f.reorder_fields(3, 0), Err(FormError::IndexOutOfRange { index: 3, len: 3 })));
    }

    #[test]
    fn test_saved_form_is_schema_only() {
        let f = contact_form();
        let saved = f.to_saved();
        let json = serde_json::to_value(&saved).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 4);
        assert!(json.get("updatedAt").is_none());
        assert_eq!(FormSchema::from_saved(saved).fields(), f.fields());
    }
}
