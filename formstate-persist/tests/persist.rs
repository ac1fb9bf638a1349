use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use formstate::{Field, Form};
use formstate_persist::{InMemoryStore, KeyValueStore, PersistConfig, PersistError, persist};
use serde_json::{Value, json};

fn signup() -> Form {
    Form::keyed([
        ("name", formstate::Node::from(Field::new(String::new()))),
        ("age", Field::new(0u32).into()),
    ])
}

async fn stored(store: &InMemoryStore, key: &str) -> Option<Value> {
    let text = store.get(key).await.unwrap()?;
    Some(serde_json::from_str(&text).unwrap())
}

/// Store that counts writes.
#[derive(Default)]
struct CountingStore {
    inner: InMemoryStore,
    writes: AtomicUsize,
}

#[async_trait]
impl KeyValueStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), PersistError> {
        self.inner.remove(key).await
    }

    async fn clear(&self) -> Result<(), PersistError> {
        self.inner.clear().await
    }
}

// =============================================================================
// Saving
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_change_is_saved_after_delay() {
    let store = Arc::new(InMemoryStore::new());
    let persisted = persist(signup(), store.clone(), PersistConfig::new("signup"))
        .await
        .unwrap();

    persisted.field::<String>("name").unwrap().on_change("Ada".into());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(stored(&store, "signup").await, None);
    assert!(persisted.is_save_pending());

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(stored(&store, "signup").await, Some(json!({"name": "Ada", "age": 0})));
    assert!(!persisted.is_save_pending());
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_changes_saves_once() {
    let store = Arc::new(CountingStore::default());
    let persisted = persist(signup(), store.clone(), PersistConfig::new("signup"))
        .await
        .unwrap();
    let name = persisted.field::<String>("name").unwrap();

    for value in ["A", "Ad", "Ada"] {
        name.on_change(value.into());
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    persisted.change(json!({"age": 36})).unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    let text = store.get("signup").await.unwrap().unwrap();
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"name": "Ada", "age": 36}));
}

#[tokio::test(start_paused = true)]
async fn test_flush_saves_immediately() {
    let store = Arc::new(CountingStore::default());
    let persisted = persist(signup(), store.clone(), PersistConfig::new("signup"))
        .await
        .unwrap();

    persisted.change(json!({"name": "Grace"})).unwrap();
    persisted.flush().await.unwrap();

    assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    assert!(!persisted.is_save_pending());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reset_is_saved() {
    let store = Arc::new(InMemoryStore::new());
    let persisted = persist(signup(), store.clone(), PersistConfig::new("signup"))
        .await
        .unwrap();

    persisted.change(json!({"name": "Ada", "age": 36})).unwrap();
    persisted.flush().await.unwrap();

    persisted.reset();
    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert_eq!(stored(&store, "signup").await, Some(json!({"name": "", "age": 0})));
}

#[tokio::test(start_paused = true)]
async fn test_field_reset_to_is_saved() {
    let store = Arc::new(InMemoryStore::new());
    let persisted = persist(signup(), store.clone(), PersistConfig::new("signup"))
        .await
        .unwrap();
    let age = persisted.field::<u32>("age").unwrap();

    age.reset_to(18);
    assert!(persisted.is_save_pending());
    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert_eq!(stored(&store, "signup").await, Some(json!({"name": "", "age": 18})));
    assert_eq!(age.field().init_value(), 18);
}

#[tokio::test(start_paused = true)]
async fn test_reset_with_is_saved() {
    let store = Arc::new(InMemoryStore::new());
    let persisted = persist(
        signup(),
        store.clone(),
        PersistConfig::new("signup").with_delay(Duration::from_millis(50)),
    )
    .await
    .unwrap();

    persisted.reset_with(json!({"age": 40})).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(stored(&store, "signup").await, Some(json!({"name": "", "age": 40})));
}

#[tokio::test]
async fn test_unknown_key_is_rejected_without_save() {
    let store = Arc::new(InMemoryStore::new());
    let persisted = persist(signup(), store.clone(), PersistConfig::new("signup"))
        .await
        .unwrap();

    let err = persisted.change(json!({"nickname": "ada"})).unwrap_err();

    assert!(matches!(err, PersistError::Form(_)));
    assert!(!persisted.is_save_pending());
}

// =============================================================================
// Seeding
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_saved_values_seed_fresh_form() {
    let store = Arc::new(InMemoryStore::new());
    let first = persist(signup(), store.clone(), PersistConfig::new("signup"))
        .await
        .unwrap();
    first.change(json!({"name": "Ada", "age": 36})).unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    drop(first);

    let reloaded = persist(signup(), store.clone(), PersistConfig::new("signup"))
        .await
        .unwrap();

    let form = reloaded.form();
    assert_eq!(form.field::<String>("name").unwrap().value(), "Ada");
    assert_eq!(form.field::<u32>("age").unwrap().value(), 36);
}

#[tokio::test]
async fn test_empty_store_leaves_defaults() {
    let store = Arc::new(InMemoryStore::new());
    let persisted = persist(signup(), store.clone(), PersistConfig::new("signup"))
        .await
        .unwrap();

    assert_eq!(persisted.form().values().unwrap(), json!({"name": "", "age": 0}));
    assert!(!persisted.form().is_changed());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_null_and_unknown_entries_are_skipped() {
    let store = Arc::new(InMemoryStore::new());
    store
        .set("signup", r#"{"name":null,"age":21,"legacy":"x"}"#)
        .await
        .unwrap();

    let persisted = persist(signup(), store, PersistConfig::new("signup")).await.unwrap();

    assert_eq!(persisted.form().values().unwrap(), json!({"name": "", "age": 21}));
}

#[tokio::test]
async fn test_corrupt_json_is_treated_as_absent() {
    let store = Arc::new(InMemoryStore::new());
    store.set("signup", "{not json").await.unwrap();

    let persisted = persist(signup(), store, PersistConfig::new("signup")).await.unwrap();

    assert_eq!(persisted.form().values().unwrap(), json!({"name": "", "age": 0}));
}

#[tokio::test]
async fn test_mistyped_entry_is_skipped() {
    let store = Arc::new(InMemoryStore::new());
    store.set("signup", r#"{"name":"Ada","age":"old"}"#).await.unwrap();

    let persisted = persist(signup(), store, PersistConfig::new("signup")).await.unwrap();

    assert_eq!(persisted.form().values().unwrap(), json!({"name": "Ada", "age": 0}));
}

#[tokio::test]
async fn test_list_form_seeds_by_position() {
    let store = Arc::new(InMemoryStore::new());
    store.set("tags", r#"["rust", null]"#).await.unwrap();

    let form = Form::list([Field::new("a".to_string()), Field::new("b".to_string())]);
    let persisted = persist(form, store, PersistConfig::new("tags")).await.unwrap();

    assert_eq!(persisted.form().values().unwrap(), json!(["rust", "b"]));
}
