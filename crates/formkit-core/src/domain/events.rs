//! Form builder events
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FormEvent {
    Created { form_id: String },
    Renamed { form_id: String, name: String },
    FieldAdded { form_id: String, field_id: String },
    FieldUpdated { form_id: String, field_id: String },
    FieldRemoved { form_id: String, field_id: String },
    FieldsReordered { form_id: String, from: usize, to: usize },
}
