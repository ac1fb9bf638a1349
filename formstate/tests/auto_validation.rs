use std::sync::{Arc, Mutex};
use std::time::Duration;

use formstate::prelude::*;
use serde_json::Value;

/// Validator that records every value it sees and always passes.
fn recording(seen: &Arc<Mutex<Vec<String>>>) -> Validator<String> {
    let seen = Arc::clone(seen);
    Validator::new(move |value: &String| {
        seen.lock().unwrap().push(value.clone());
        None
    })
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(500)).await;
}

#[tokio::test(start_paused = true)]
async fn test_changes_within_window_validate_once() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let field = Field::new(String::new())
        .validators([recording(&seen)])
        .auto_validation_default(true);

    field.on_change("a".into());
    tokio::time::sleep(Duration::from_millis(50)).await;
    field.on_change("b".into());
    tokio::time::sleep(Duration::from_millis(50)).await;
    field.on_change("c".into());

    settle().await;

    assert_eq!(*seen.lock().unwrap(), vec!["c".to_string()]);
    assert!(field.has_been_validated());
}

#[tokio::test(start_paused = true)]
async fn test_queued_validation_reads_value_at_fire_time() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let field = Field::new(String::new()).validators([recording(&seen)]);

    field.on_change("1".into());
    field.queue_validation();
    field.on_change("2".into());
    field.queue_validation();
    field.queue_validation();
    field.on_change("3".into());

    settle().await;

    assert_eq!(*seen.lock().unwrap(), vec!["3".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_auto_validation_never_queues() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let field = Field::new(String::new()).validators([recording(&seen)]);

    field.on_change("a".into());
    settle().await;

    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reset_skips_pending_validation() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let field = Field::new(String::new())
        .validators([recording(&seen)])
        .auto_validation_default(true);

    field.on_change("a".into());
    field.reset();
    settle().await;

    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(field.value(), "");
}

#[tokio::test(start_paused = true)]
async fn test_change_after_reset_reopens_gate() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let field = Field::new(String::new())
        .validators([recording(&seen)])
        .auto_validation_default(true);

    field.on_change("a".into());
    field.reset();
    field.on_change("b".into());
    settle().await;

    assert_eq!(*seen.lock().unwrap(), vec!["b".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_custom_debounce_delay() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let field = Field::new(String::new())
        .validators([recording(&seen)])
        .auto_validation_default(true)
        .auto_validation_debounce(Duration::from_millis(1000));

    field.on_change("a".into());
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(seen.lock().unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_debounce_validates_every_change() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let field = Field::new(String::new())
        .validators([recording(&seen)])
        .auto_validation_default(true)
        .auto_validation_debounce(Duration::ZERO);

    field.on_change("a".into());
    tokio::time::sleep(Duration::from_millis(1)).await;
    field.on_change("b".into());
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert_eq!(*seen.lock().unwrap(), vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_stale_validation_does_not_overwrite_newer_outcome() {
    let field = Field::new(String::new()).validators([Validator::from_async(|value: String| async move {
        if value == "slow" {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Some("slow value rejected".to_string())
        } else {
            None
        }
    })]);

    field.on_change("slow".into());
    let first = {
        let field = field.clone();
        tokio::spawn(async move { field.validate().await.unwrap() })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(field.is_validating());

    field.on_change("fast".into());
    let second = field.validate().await.unwrap();
    assert!(second.is_valid());

    let first = first.await.unwrap();
    assert_eq!(first.error(), Some("slow value rejected"));
    assert_eq!(field.error(), None);
    assert_eq!(field.safe_value(), "fast");
    assert!(!field.is_validating());
}

#[tokio::test(start_paused = true)]
async fn test_auto_validated_fields_converge_form() {
    let runs = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&runs);

    let first = Field::new(String::new()).validators([rules::required("first is required")]);
    let last = Field::new(String::new()).validators([rules::required("last is required")]);
    let form = Form::keyed([("first", first.clone()), ("last", last.clone())])
        .validators([Validator::new(move |values: &Value| {
            recorded.lock().unwrap().push(values.clone());
            None
        })])
        .compose()
        .unwrap();
    form.enable_auto_validation();

    first.on_change("Ada".into());
    last.on_change("Lovelace".into());
    settle().await;

    assert_eq!(
        *runs.lock().unwrap(),
        vec![serde_json::json!({"first": "Ada", "last": "Lovelace"})]
    );
    assert!(!form.has_error());
}
