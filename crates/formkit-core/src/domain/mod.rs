//! Form schema domain model
//!
//! - **Value Objects**: `FieldDefinition`, `ValidationRule`, `FormValue`
//! - **Aggregates**: `FormSchema` (the form being built), `SavedForm` (what is persisted)
//! - **Events**: `FormEvent`, recorded on every schema mutation

pub mod value_objects;
pub mod aggregates;
pub mod events;

pub use value_objects::*;
pub use aggregates::*;
pub use events::*;
