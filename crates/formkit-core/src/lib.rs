//! Formkit core
//!
//! Form schema model with derived (computed) fields and per-field validation.
//!
//! ## Features
//! - Named formulas: `age_from_dob`, `full_name`, `total`/`sum`, `average`
//! - Restricted arithmetic over parent values (`price * quantity`)
//! - Derived-field pass run on every change
//! - Validation rules: required, notEmpty, minLength, maxLength, email, customPassword
//! - Form schema aggregate with change events

pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod fields;
pub mod formula;
pub mod reconciler;
pub mod validation;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::FormkitConfig;
pub use domain::{
    FieldDefinition, FieldPatch, FieldType, FormEvent, FormInput, FormSchema, FormValue, RuleValue, SavedForm,
    ValidationError, ValidationRule, ValidationType,
};
pub use error::{FormError, FormulaError, Result};
pub use formula::{evaluate, FormulaEvaluator, ParentValues};
pub use reconciler::{update_derived_fields, validate_form, DerivedPass, FormReconciler, Reconciled};
pub use validation::{first_error_for, validate_field};
