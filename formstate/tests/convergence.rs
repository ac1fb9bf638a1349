use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use formstate::prelude::*;
use serde_json::Value;

fn counting_validator(runs: &Arc<AtomicUsize>) -> Validator<Value> {
    let runs = Arc::clone(runs);
    Validator::new(move |_: &Value| {
        runs.fetch_add(1, Ordering::SeqCst);
        None
    })
}

fn three_fields() -> [Field<i32>; 3] {
    [Field::new(1), Field::new(2), Field::new(3)]
}

fn composed(fields: &[Field<i32>; 3], runs: &Arc<AtomicUsize>) -> Form {
    Form::keyed([
        ("a", fields[0].clone()),
        ("b", fields[1].clone()),
        ("c", fields[2].clone()),
    ])
    .validators([counting_validator(runs)])
    .compose()
    .unwrap()
}

// =============================================================================
// Barrier
// =============================================================================

#[tokio::test]
async fn test_barrier_fires_after_last_child_in_any_order() {
    let orders = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    for order in orders {
        let runs = Arc::new(AtomicUsize::new(0));
        let fields = three_fields();
        let form = composed(&fields, &runs);

        for (step, &index) in order.iter().enumerate() {
            fields[index].validate().await.unwrap();
            let expected = if step == 2 { 1 } else { 0 };
            assert_eq!(runs.load(Ordering::SeqCst), expected, "order {order:?}, step {step}");
        }

        assert_eq!(form.validated_children(), 3);
        assert!(!form.is_validating());
    }
}

#[tokio::test]
async fn test_repeated_pass_of_same_child_does_not_converge() {
    let runs = Arc::new(AtomicUsize::new(0));
    let fields = three_fields();
    let form = composed(&fields, &runs);

    for _ in 0..3 {
        fields[0].validate().await.unwrap();
    }

    assert_eq!(form.validated_children(), 1);
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_field_error_blocks_convergence() {
    let runs = Arc::new(AtomicUsize::new(0));
    let a = Field::new(String::new()).validators([rules::required("A is required")]);
    let b = Field::new(1);
    let c = Field::new(2);
    let form = Form::keyed([("a", Node::from(a.clone())), ("b", b.clone().into()), ("c", c.clone().into())])
        .validators([counting_validator(&runs)])
        .compose()
        .unwrap();

    b.validate().await.unwrap();
    c.validate().await.unwrap();
    a.validate().await.unwrap();

    assert_eq!(runs.load(Ordering::SeqCst), 0);
    assert!(form.has_error());
    assert_eq!(form.error().as_deref(), Some("A is required"));

    a.on_change("x".to_string());
    a.validate().await.unwrap();

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(!form.has_error());
}

#[tokio::test]
async fn test_error_set_on_sibling_blocks_convergence() {
    let runs = Arc::new(AtomicUsize::new(0));
    let fields = three_fields();
    let _form = composed(&fields, &runs);

    fields[0].validate().await.unwrap();
    fields[1].validate().await.unwrap();
    fields[0].set_error(Some("server says no".into()));
    fields[2].validate().await.unwrap();

    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_reset_child_leaves_barrier() {
    let runs = Arc::new(AtomicUsize::new(0));
    let fields = three_fields();
    let form = composed(&fields, &runs);

    fields[0].validate().await.unwrap();
    fields[1].validate().await.unwrap();
    fields[0].reset();
    assert_eq!(form.validated_children(), 1);

    fields[2].validate().await.unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    fields[0].validate().await.unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_form_reset_clears_barrier() {
    let runs = Arc::new(AtomicUsize::new(0));
    let fields = three_fields();
    let form = composed(&fields, &runs);

    for field in &fields {
        field.validate().await.unwrap();
    }
    form.reset();

    assert_eq!(form.validated_children(), 0);
}

#[tokio::test]
async fn test_passing_child_clears_stale_form_error() {
    let runs = Arc::new(AtomicUsize::new(0));
    let fields = three_fields();
    let form = composed(&fields, &runs);
    form.set_form_error(Some("stale".into()));

    fields[1].validate().await.unwrap();

    assert!(!form.has_form_error());
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_converged_form_error_is_recorded() {
    let fields = three_fields();
    let form = Form::keyed([("a", fields[0].clone()), ("b", fields[1].clone()), ("c", fields[2].clone())])
        .validators([Validator::new(|values: &Value| {
            (values["a"].as_i64() != Some(10)).then(|| "a must be 10".to_string())
        })])
        .compose()
        .unwrap();

    for field in &fields {
        field.validate().await.unwrap();
    }

    assert_eq!(form.form_error().as_deref(), Some("a must be 10"));
    assert!(form.show_form_error());
}

// =============================================================================
// Nesting
// =============================================================================

#[tokio::test]
async fn test_nested_form_converges_into_parent() {
    let inner_runs = Arc::new(AtomicUsize::new(0));
    let outer_runs = Arc::new(AtomicUsize::new(0));

    let x = Field::new("x".to_string());
    let y = Field::new("y".to_string());

    let inner = Form::keyed([("x", x.clone())])
        .validators([counting_validator(&inner_runs)])
        .compose()
        .unwrap();
    let outer = Form::keyed([("inner", Node::from(inner.clone())), ("y", y.clone().into())])
        .validators([counting_validator(&outer_runs)])
        .compose()
        .unwrap();

    x.validate().await.unwrap();
    assert_eq!(inner_runs.load(Ordering::SeqCst), 1);
    assert_eq!(outer.validated_children(), 1);
    assert_eq!(outer_runs.load(Ordering::SeqCst), 0);

    y.validate().await.unwrap();
    assert_eq!(outer_runs.load(Ordering::SeqCst), 1);
    // the outer run validates the nested form again
    assert_eq!(inner_runs.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_nested_reset_leaves_parent_barrier() {
    let x = Field::new(1);
    let y = Field::new(2);
    let inner = Form::keyed([("x", x.clone())]).compose().unwrap();
    let outer = Form::keyed([("inner", Node::from(inner.clone())), ("y", y.clone().into())])
        .compose()
        .unwrap();

    x.validate().await.unwrap();
    assert_eq!(outer.validated_children(), 1);

    inner.reset();
    assert_eq!(outer.validated_children(), 0);
}

// =============================================================================
// Misuse and faults
// =============================================================================

#[test]
fn test_compose_twice_is_rejected() {
    let form = Form::keyed([("a", Field::new(1))]).compose().unwrap();
    let again = form.clone().compose();
    assert!(matches!(again, Err(FormError::AlreadyComposed { .. })));
    assert!(form.is_composed());
}

#[test]
fn test_field_in_two_forms_is_rejected() {
    let shared = Field::new(1);
    let _first = Form::keyed([("shared", shared.clone())]).compose().unwrap();

    let err = Form::keyed([("other", shared.clone())]).compose().unwrap_err();

    assert!(matches!(err, FormError::AlreadyComposed { .. }));
    assert_eq!(err.key(), "other");
}

#[tokio::test]
async fn test_fault_on_convergence_path_is_not_propagated() {
    let a = Field::new(1);
    let form = Form::keyed([("a", a.clone())])
        .validators([Validator::try_async(|_: Value| async {
            Err(ValidatorFault::new("backend down"))
        })])
        .compose()
        .unwrap();

    let result = a.validate().await;

    assert!(result.unwrap().is_valid());
    assert!(!form.is_validating());
}

#[tokio::test]
async fn test_fault_on_explicit_validate_propagates() {
    let form = Form::keyed([("a", Field::new(1))]).validators([Validator::try_async(|_: Value| async {
        Err(ValidatorFault::new("backend down"))
    })]);

    let err = form.validate().await.unwrap_err();

    assert!(matches!(err, ValidationError::Fault { index: 0, .. }));
    assert!(!form.is_validating());
}

#[tokio::test]
async fn test_child_fault_propagates_through_form() {
    let faulty = Field::new(1).validators([Validator::try_async(|_: i32| async {
        Err(ValidatorFault::new("lookup failed"))
    })]);
    let form = Form::keyed([("faulty", faulty)]);

    assert!(form.validate().await.is_err());
}
