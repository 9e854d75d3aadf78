//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::{AppConfig, NamingPolicy};
use crate::domain::error::ConfigError;
use crate::domain::recording::Duration;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

/// Levels accepted for `log_level`
const VALID_LOG_LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;
    let value = normalize_config_value(key, value)?;

    let mut config = store.load().await?;
    *field_mut(&mut config, key) = Some(value.clone());

    store.save(&config).await?;
    presenter.success(&format!("{} = {}", key, value));
    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let mut config = store.load().await?;
    let value = field_mut(&mut config, key).take();
    presenter.output(value.as_deref().unwrap_or(NOT_SET));
    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let mut config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        let value = field_mut(&mut config, key).take();
        presenter.key_value(key, value.as_deref().unwrap_or(NOT_SET));
    }
    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        key: key.to_string(),
        message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
    })
}

/// The config field behind a validated key
fn field_mut<'a>(config: &'a mut AppConfig, key: &str) -> &'a mut Option<String> {
    match key {
        "storage_dir" => &mut config.storage_dir,
        "file_stem" => &mut config.file_stem,
        "naming" => &mut config.naming,
        "max_duration" => &mut config.max_duration,
        _ => &mut config.log_level,
    }
}

/// Validate a config value and return the form to store
fn normalize_config_value(key: &str, value: &str) -> Result<String, ConfigError> {
    let invalid = |message: String| ConfigError::ValidationError {
        key: key.to_string(),
        message,
    };

    match key {
        "max_duration" => value
            .parse::<Duration>()
            .map(|d| d.to_string())
            .map_err(|e| invalid(e.to_string())),
        "naming" => value
            .parse::<NamingPolicy>()
            .map(|p| p.to_string())
            .map_err(|e| invalid(e.to_string())),
        "file_stem" => {
            let stem = value.trim();
            let separator = stem.contains(['/', '\\']);
            if stem.is_empty() || separator || stem.starts_with('.') {
                return Err(invalid(
                    "Value must be a plain file name without extension".to_string(),
                ));
            }
            Ok(stem.to_string())
        }
        "log_level" => {
            let level = value.trim().to_lowercase();
            if !VALID_LOG_LEVELS.contains(&level.as_str()) {
                return Err(invalid(format!(
                    "Invalid value '{}'. Valid options: {}",
                    value,
                    VALID_LOG_LEVELS.join(", ")
                )));
            }
            Ok(level)
        }
        _ => {
            if value.trim().is_empty() {
                return Err(invalid("Value must not be empty".to_string()));
            }
            Ok(value.to_string())
        }
    }
}
