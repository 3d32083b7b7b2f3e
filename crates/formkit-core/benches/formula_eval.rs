//! Formula evaluation benchmark
//!
//! The derived pass runs on every keystroke; one pass over a typical form
//! should stay well under a millisecond.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use formkit_core::{FieldDefinition, FieldType, FixedClock, FormInput, FormReconciler, FormValue, FormulaEvaluator, ParentValues};

fn formula_benchmark(c: &mut Criterion) {
    let evaluator = FormulaEvaluator::with_clock(FixedClock::ymd(2024, 6, 15).unwrap());
    let mut group = c.benchmark_group("formula");

    let parents: ParentValues = [("price", 12.5), ("quantity", 3.0), ("discount", 2.0)].into_iter().collect();
    group.bench_function("arithmetic", |b| {
        b.iter(|| evaluator.evaluate(black_box("(price * quantity) - discount / 2"), black_box(&parents)))
    });

    let dob: ParentValues = [("date_of_birth", "1990-03-21")].into_iter().collect();
    group.bench_function("age_from_dob", |b| {
        b.iter(|| evaluator.evaluate(black_box("age_from_dob"), black_box(&dob)))
    });

    group.bench_function("total", |b| b.iter(|| evaluator.evaluate(black_box("total"), black_box(&parents))));

    group.finish();
}

fn derived_pass_benchmark(c: &mut Criterion) {
    let reconciler = FormReconciler::with_evaluator(FormulaEvaluator::with_clock(FixedClock::ymd(2024, 6, 15).unwrap()));
    let mut group = c.benchmark_group("derived_pass");

    for size in [10usize, 50, 200].iter() {
        let mut fields = Vec::with_capacity(size * 2);
        let mut input = FormInput::new();
        for i in 0..*size {
            let id = format!("n{}", i);
            fields.push(FieldDefinition::new(id.clone(), FieldType::Number, format!("Value {}", i)));
            fields.push(FieldDefinition::derived(format!("d{}", i), format!("Double {}", i), &[id.as_str()], format!("value_{} * 2", i)));
            input.insert(id, FormValue::Number(i as f64));
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| reconciler.update_derived_fields(black_box(&input), black_box(&fields)))
        });
    }

    group.finish();
}

criterion_group!(benches, formula_benchmark, derived_pass_benchmark);
criterion_main!(benches);
