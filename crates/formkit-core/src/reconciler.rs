//! Form data reconciler
//!
//! Runs on every field change: recompute derived fields, then revalidate.
//!
//! The derived pass is a single forward walk over the field sequence, not a
//! fixed point. With [`DerivedPass::Sequential`] a derived field sees the
//! values of derived fields declared *before* it as computed in this pass,
//! and the previous values of those declared after it. Form authors who
//! chain derived fields must declare a field after the derived fields it
//! reads. Cycles are not rejected; a field reading its own value sees the
//! last known one.

use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::domain::{FieldDefinition, FieldType, FormInput, FormValue, ValidationError};
use crate::formula::FormulaEvaluator;
use crate::validation;

/// Which input a derived field reads during one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivedPass {
    /// Read the input as updated so far in this pass
    #[default]
    Sequential,
    /// Read the input as it was before the pass started. Matches the browser
    /// form builder's `updateDerivedFields`, which computes every derived
    /// field from the incoming `formData` rather than the `updatedData` it is
    /// building, so saved forms that chain derived fields behave as they did
    /// there.
    Snapshot,
}

/// Input after a change, with the errors it produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciled {
    pub input: FormInput,
    pub errors: Vec<ValidationError>,
}

pub struct FormReconciler<C: Clock = SystemClock> {
    evaluator: FormulaEvaluator<C>,
    pass: DerivedPass,
}

impl FormReconciler<SystemClock> {
    pub fn new() -> Self {
        Self::with_evaluator(FormulaEvaluator::new())
    }
}

impl Default for FormReconciler<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> FormReconciler<C> {
    pub fn with_evaluator(evaluator: FormulaEvaluator<C>) -> Self {
        Self { evaluator, pass: DerivedPass::default() }
    }

    pub fn with_pass(mut self, pass: DerivedPass) -> Self {
        self.pass = pass;
        self
    }

    pub fn pass(&self) -> DerivedPass {
        self.pass
    }

    pub fn evaluator(&self) -> &FormulaEvaluator<C> {
        &self.evaluator
    }

    /// Recompute every derived field in declaration order
    pub fn update_derived_fields(&self, input: &FormInput, fields: &[FieldDefinition]) -> FormInput {
        let mut updated = input.clone();
        for field in fields.iter().filter(|f| f.is_derived) {
            let source = match self.pass {
                DerivedPass::Sequential => &updated,
                DerivedPass::Snapshot => input,
            };
            let value = self.evaluator.compute_derived_value(field, source, fields);
            tracing::trace!(field = %field.id, value = %value, "derived field recomputed");
            updated.insert(field.id.clone(), value);
        }
        updated
    }

    pub fn validate_form(&self, input: &FormInput, fields: &[FieldDefinition]) -> Vec<ValidationError> {
        validation::validate_form(input, fields)
    }

    /// Apply one user edit. Edits to derived fields are overwritten by the pass.
    pub fn apply_change(
        &self,
        input: &FormInput,
        fields: &[FieldDefinition],
        field_id: &str,
        value: FormValue,
    ) -> Reconciled {
        let mut edited = input.clone();
        edited.insert(field_id.to_string(), value);
        self.reconcile(&edited, fields)
    }

    /// Derived values and errors for `input` as it stands
    pub fn reconcile(&self, input: &FormInput, fields: &[FieldDefinition]) -> Reconciled {
        let input = self.update_derived_fields(input, fields);
        let errors = self.validate_form(&input, fields);
        Reconciled { input, errors }
    }

    /// Input a freshly loaded form starts from: `initial` with missing or
    /// null entries filled from defaults, then one derived pass
    pub fn initial_input(&self, initial: &FormInput, fields: &[FieldDefinition]) -> FormInput {
        self.update_derived_fields(&fill_defaults(initial, fields), fields)
    }
}

/// Fill missing or null entries of `initial` with each field's default value.
///
/// Without a (truthy) default: checkboxes start as an empty list, numbers as
/// 0, radios and selects as their first option, everything else as `""`.
pub fn fill_defaults(initial: &FormInput, fields: &[FieldDefinition]) -> FormInput {
    let mut input = initial.clone();
    for field in fields {
        if input.get(&field.id).is_some_and(|v| !v.is_null()) {
            continue;
        }
        input.insert(field.id.clone(), default_value(field));
    }
    input
}

fn default_value(field: &FieldDefinition) -> FormValue {
    if let Some(value) = field.default_value.as_ref().filter(|v| v.is_truthy()) {
        return value.clone();
    }
    match field.field_type {
        FieldType::Checkbox => FormValue::List(vec![]),
        FieldType::Number => FormValue::Number(0.0),
        FieldType::Radio | FieldType::Select => field
            .options
            .as_ref()
            .and_then(|options| options.first())
            .map(|first| FormValue::Text(first.clone()))
            .unwrap_or_else(|| FormValue::Text(String::new())),
        _ => FormValue::Text(String::new()),
    }
}

/// Recompute derived fields with the system clock, sequential pass
pub fn update_derived_fields(input: &FormInput, fields: &[FieldDefinition]) -> FormInput {
    FormReconciler::new().update_derived_fields(input, fields)
}

/// Recompute validation errors for every non-derived field
pub fn validate_form(input: &FormInput, fields: &[FieldDefinition]) -> Vec<ValidationError> {
    validation::validate_form(input, fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::domain::ValidationRule;

    fn reconciler(pass: DerivedPass) -> FormReconciler<FixedClock> {
        FormReconciler::with_evaluator(FormulaEvaluator::with_clock(FixedClock::ymd(2024, 6, 15).unwrap()))
            .with_pass(pass)
    }

    fn num(n: f64) -> FormValue {
        FormValue::Number(n)
    }

    /// A = b + 1, B = a * 2, declared A then B
    fn mutual_fields() -> Vec<FieldDefinition> {
        vec![
            FieldDefinition::derived("A", "A", &["B"], "b + 1"),
            FieldDefinition::derived("B", "B", &["A"], "a * 2"),
        ]
    }

    fn mutual_input() -> FormInput {
        [("A".to_string(), num(1.0)), ("B".to_string(), num(10.0))].into_iter().collect()
    }

    #[test]
    fn test_sequential_pass_sees_earlier_results() {
        let out = reconciler(DerivedPass::Sequential).update_derived_fields(&mutual_input(), &mutual_fields());
        assert_eq!(out["A"], num(11.0));
        assert_eq!(out["B"], num(22.0));
    }

    #[test]
    fn test_snapshot_pass_reads_pre_pass_values() {
        let out = reconciler(DerivedPass::Snapshot).update_derived_fields(&mutual_input(), &mutual_fields());
        assert_eq!(out["A"], num(11.0));
        assert_eq!(out["B"], num(2.0));
    }

    #[test]
    fn test_pass_is_not_a_fixed_point() {
        let r = reconciler(DerivedPass::Sequential);
        let once = r.update_derived_fields(&mutual_input(), &mutual_fields());
        let twice = r.update_derived_fields(&once, &mutual_fields());
        assert_eq!(twice["A"], num(23.0));
        assert_ne!(once, twice);
    }

    #[test]
    fn test_declaration_order_matters() {
        let fields = vec![
            FieldDefinition::new("price", FieldType::Number, "Price"),
            FieldDefinition::derived("double", "Double", &["price"], "price * 2"),
            FieldDefinition::derived("quad", "Quad", &["double"], "double * 2"),
        ];
        let r = reconciler(DerivedPass::Sequential);
        let input: FormInput = [("price".to_string(), num(3.0))].into_iter().collect();
        let out = r.update_derived_fields(&input, &fields);
        assert_eq!(out["quad"], num(12.0));

        let reversed = vec![fields[0].clone(), fields[2].clone(), fields[1].clone()];
        let out = r.update_derived_fields(&input, &reversed);
        // quad ran before double existed
        assert_eq!(out["quad"], num(0.0));
        assert_eq!(out["double"], num(6.0));
    }

    #[test]
    fn test_apply_change_recomputes_and_validates() {
        let fields = vec![
            FieldDefinition::new("first", FieldType::Text, "First Name").with_rule(ValidationRule::required("First name required")),
            FieldDefinition::new("last", FieldType::Text, "Last Name"),
            FieldDefinition::derived("full", "Full Name", &["first", "last"], "full_name"),
        ];
        let r = reconciler(DerivedPass::Sequential);
        let start = r.initial_input(&FormInput::new(), &fields);
        assert_eq!(start["full"], FormValue::text(""));
        assert_eq!(r.validate_form(&start, &fields).len(), 1);

        let step = r.apply_change(&start, &fields, "last", FormValue::text("Lovelace"));
        assert_eq!(step.input["full"], FormValue::text("Lovelace"));
        assert_eq!(step.errors[0].field_id, "first");

        let step = r.apply_change(&step.input, &fields, "first", FormValue::text("Ada"));
        assert_eq!(step.input["full"], FormValue::text("Ada Lovelace"));
        assert!(step.errors.is_empty());

        let step = r.apply_change(&step.input, &fields, "full", FormValue::text("manual"));
        assert_eq!(step.input["full"], FormValue::text("Ada Lovelace"));
    }

    #[test]
    fn test_fill_defaults() {
        let mut select = FieldDefinition::new("s", FieldType::Select, "S");
        select.options = Some(vec!["red".into(), "blue".into()]);
        let fields = vec![
            FieldDefinition::new("c", FieldType::Checkbox, "C"),
            FieldDefinition::new("n", FieldType::Number, "N"),
            FieldDefinition::new("m", FieldType::Number, "M").with_default(num(4.0)),
            select,
            FieldDefinition::new("t", FieldType::Text, "T"),
            FieldDefinition::new("kept", FieldType::Text, "Kept"),
        ];
        let initial: FormInput = [
            ("kept".to_string(), FormValue::text("typed")),
            ("t".to_string(), FormValue::Null),
        ]
        .into_iter()
        .collect();

        let input = fill_defaults(&initial, &fields);
        assert_eq!(input["c"], FormValue::List(vec![]));
        assert_eq!(input["n"], num(0.0));
        assert_eq!(input["m"], num(4.0));
        assert_eq!(input["s"], FormValue::text("red"));
        assert_eq!(input["t"], FormValue::text(""));
        assert_eq!(input["kept"], FormValue::text("typed"));
    }
}
