//! Integration tests for ConfigManager and preferences handling
//!
//! These tests verify:
//! - Preferences loading and saving
//! - Defaults for a missing or partial file
//! - Environment overrides
//! - Preferences driving the provider registry

use camino::Utf8PathBuf;
use context_actions::io::{Messages, ProviderCode, ProviderRegistry, WritabilityStatus, YamlProvider};
use context_actions::models::{Action, ImportMode, ObjectItem, Profile};
use context_actions::{ConfigManager, Preferences};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

fn no_env() -> Option<config::Map<String, String>> {
    Some(config::Map::new())
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert_eq!(manager.config_dir(), &config_path);
    assert_eq!(
        manager.preferences_path(),
        &config_path.join("preferences.yaml")
    );
}

#[test]
fn test_partial_preferences_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join("preferences.yaml"),
        "providers:\n  order: [io-yaml]\n  flags:\n    io-yaml:\n      writable: false\n",
    )
    .unwrap();

    let manager = ConfigManager::new(&config_path).unwrap();
    let prefs = manager.load_preferences_with_env(no_env()).unwrap();

    assert_eq!(prefs.providers.order, vec!["io-yaml".to_string()]);
    let flags = prefs.provider_flags("io-yaml");
    assert!(!flags.writable);
    assert!(flags.read_at_startup, "unset fields keep their default");
    assert_eq!(prefs.import.mode, ImportMode::NoImport);
}

#[test]
fn test_invalid_preferences_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(config_path.join("preferences.yaml"), "import:\n  mode: sometimes\n").unwrap();

    let manager = ConfigManager::new(&config_path).unwrap();
    assert!(manager.load_preferences_with_env(no_env()).is_err());
}

#[test]
fn test_round_trip() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let mut prefs = Preferences::default();
    prefs.locks.configuration_locked = true;
    prefs.logging.debug = true;
    prefs.export.default_format = "DesktopEntry".to_string();
    manager.save_preferences(&prefs).unwrap();

    let loaded = manager.load_preferences_with_env(no_env()).unwrap();
    assert!(loaded.locks.configuration_locked);
    assert!(loaded.logging.debug);
    assert_eq!(loaded.export.default_format, "DesktopEntry");
}

#[test]
fn test_environment_list_override() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let mut env = config::Map::new();
    env.insert(
        "CONTEXT_ACTIONS__PROVIDERS__ORDER".to_string(),
        "second,first".to_string(),
    );
    let prefs = manager.load_preferences_with_env(Some(env)).unwrap();
    assert_eq!(
        prefs.providers.order,
        vec!["second".to_string(), "first".to_string()]
    );
}

#[test]
fn test_configuration_lock_blocks_yaml_writes() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let mut env = config::Map::new();
    env.insert(
        "CONTEXT_ACTIONS__LOCKS__CONFIGURATION_LOCKED".to_string(),
        "true".to_string(),
    );
    let prefs = manager.load_preferences_with_env(Some(env)).unwrap();

    let mut registry = ProviderRegistry::new(prefs);
    registry.register_provider(Arc::new(YamlProvider::new(manager.items_dir())));

    let mut action = Action::new("locked");
    let mut profile = Profile::new("profile-main");
    profile.path = "/bin/true".to_string();
    action.profiles.push(profile);
    let mut item: ObjectItem = action.into();

    assert_eq!(
        registry.writability(&item),
        WritabilityStatus::ConfigurationLockedByAdmin
    );
    let mut messages = Messages::new();
    assert_eq!(
        registry.write_item(&mut item, &mut messages),
        ProviderCode::NotWillingToRun
    );
    assert!(!manager.items_dir().join("locked.yaml").exists());
}
