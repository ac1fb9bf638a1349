//! Sign-up form walkthrough.
//!
//! Builds a composed sign-up form, drives it the way a UI would, and keeps a
//! draft of it in a store.
//!
//! Environment:
//! - `FORMSTATE_LOG`: log level (`error`, `warn`, `info`, `debug`, `trace`), default `info`
//! - `FORMSTATE_LOG_FILE`: write the log to this file instead of the terminal
//! - `FORMSTATE_DB`: keep the draft in this SQLite file instead of memory

use std::env;
use std::fs::File;
use std::sync::Arc;
use std::time::Duration;

use formstate::error::{FormError, ValidationError};
use formstate::validation::{Validator, rules};
use formstate::{Field, Form, Node};
use formstate_persist::{InMemoryStore, KeyValueStore, PersistConfig, PersistError, SqliteStore, persist};
use log::LevelFilter;
use serde_json::{Value, json};
use simplelog::{Config, SimpleLogger, WriteLogger};
use thiserror::Error;

#[derive(Debug, Error)]
enum DemoError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] formstate::validation::rules::PatternError),
}

fn init_logging() {
    let level = env::var("FORMSTATE_LOG")
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Info);

    match env::var("FORMSTATE_LOG_FILE") {
        Ok(path) => {
            if let Ok(log_file) = File::create(path) {
                let _ = WriteLogger::init(level, Config::default(), log_file);
            }
        }
        Err(_) => {
            let _ = SimpleLogger::init(level, Config::default());
        }
    }
}

async fn open_store() -> Result<Arc<dyn KeyValueStore>, PersistError> {
    match env::var("FORMSTATE_DB") {
        Ok(path) => Ok(Arc::new(SqliteStore::open(path).await?)),
        Err(_) => Ok(Arc::new(InMemoryStore::new())),
    }
}

fn signup_form() -> Result<Form, DemoError> {
    let username = Field::new(String::new())
        .label("Username")
        .validators([
            rules::not_blank("Username is required"),
            rules::pattern("^[a-z0-9_]+$", "Only lowercase letters, digits and _")?,
        ]);
    let email = Field::new(String::new())
        .label("Email")
        .validators([rules::required("Email is required"), rules::email("Not an email address")]);
    let password = Field::new(String::new())
        .label("Password")
        .validators([rules::min_length(8, "At least 8 characters")]);
    let confirm = Field::new(String::new()).label("Confirm password");
    let age = Field::new(None::<u32>)
        .label("Age")
        .validators([Validator::new(|age: &Option<u32>| match age {
            Some(age) if *age < 13 => Some("Must be 13 or older".to_string()),
            _ => None,
        })]);

    let form = Form::keyed([
        ("username", Node::from(username)),
        ("email", email.into()),
        ("password", password.into()),
        ("confirm", confirm.into()),
        ("age", age.into()),
    ])
    .validators([Validator::new(|values: &Value| {
        (values["password"] != values["confirm"]).then(|| "Passwords do not match".to_string())
    })]);

    Ok(form.compose()?)
}

fn report(form: &Form) {
    for (path, field) in form.fields() {
        match field.error() {
            Some(error) => println!("  {path:<10} {error}"),
            None => println!("  {path:<10} ok"),
        }
    }
    if let (true, Some(error)) = (form.show_form_error(), form.form_error()) {
        println!("  form       {error}");
    }
}

async fn run() -> Result<(), DemoError> {
    let store = open_store().await?;
    let config = PersistConfig::new("signup").with_delay(Duration::from_millis(300));
    let persisted = persist(signup_form()?, Arc::clone(&store), config).await?;
    let form = persisted.form().clone();

    println!("draft: {}", form.values()?);

    println!("\nsubmitting an empty form:");
    form.validate().await?;
    report(&form);

    println!("\ntyping as the user would, with auto-validation on:");
    form.enable_auto_validation();
    let username = persisted.field::<String>("username")?;
    for partial in ["A", "Ad", "Ada"] {
        username.on_change(partial.to_string());
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    tokio::time::sleep(Duration::from_millis(300)).await;
    report(&form);

    println!("\nfixing the remaining fields:");
    persisted.change(json!({
        "username": "ada",
        "email": "ada@example.com",
        "password": "analytical",
        "confirm": "analytical-engine",
        "age": 36,
    }))?;
    tokio::time::sleep(Duration::from_millis(300)).await;
    report(&form);

    println!("\nconfirming the password:");
    persisted.field::<String>("confirm")?.on_change("analytical".to_string());
    tokio::time::sleep(Duration::from_millis(300)).await;
    report(&form);
    println!("  has error: {}", form.has_error());

    persisted.flush().await?;
    println!("\nstored draft: {}", store.get("signup").await?.unwrap_or_default());

    Ok(())
}

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
    }
}
