use crate::models::{LoggingPreferences, Preferences};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// Prefix of the environment variables overriding preferences, e.g.
/// `CONTEXT_ACTIONS__LOCKS__CONFIGURATION_LOCKED=true`.
pub const ENV_PREFIX: &str = "CONTEXT_ACTIONS";

const PREFERENCES_FILE: &str = "preferences.yaml";
const ITEMS_DIR: &str = "items";

/// Configuration manager for loading and saving the preferences file.
///
/// The configuration directory holds:
/// - `preferences.yaml`: provider order and flags, locks, import/export options
/// - `items/`: default directory of the YAML I/O provider
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    preferences_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager, creating `config_dir` if needed.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            preferences_path: config_dir.join(PREFERENCES_FILE),
            config_dir,
        })
    }

    /// Load preferences, overridden by the process environment.
    ///
    /// A missing file yields the defaults.
    pub fn load_preferences(&self) -> Result<Preferences> {
        self.load_preferences_with_env(None)
    }

    /// Load preferences with an explicit environment instead of the process
    /// one. `None` reads the process environment.
    pub fn load_preferences_with_env(
        &self,
        env: Option<config::Map<String, String>>,
    ) -> Result<Preferences> {
        if !self.preferences_path.exists() {
            tracing::warn!(
                "Preferences file not found at {}, using defaults",
                self.preferences_path
            );
        }

        let environment = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("providers.order")
            .try_parsing(true)
            .source(env);

        let preferences: Preferences = Config::builder()
            .add_source(
                File::from(self.preferences_path.as_std_path())
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to read preferences: {}", self.preferences_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse preferences: {}", self.preferences_path))?;

        tracing::info!("Loaded preferences from {}", self.preferences_path);
        Ok(preferences)
    }

    pub fn save_preferences(&self, preferences: &Preferences) -> Result<()> {
        let yaml_string = serde_yaml_ng::to_string(preferences)
            .context("Failed to serialize preferences to YAML")?;

        fs::write(&self.preferences_path, yaml_string).with_context(|| {
            format!("Failed to write preferences: {}", self.preferences_path)
        })?;

        tracing::info!("Saved preferences to {}", self.preferences_path);
        Ok(())
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn preferences_path(&self) -> &Utf8Path {
        &self.preferences_path
    }

    /// Default directory of the YAML I/O provider.
    pub fn items_dir(&self) -> Utf8PathBuf {
        self.config_dir.join(ITEMS_DIR)
    }

    /// Logging preferences with a relative log directory resolved against
    /// the configuration directory.
    pub fn logging_preferences(&self, preferences: &Preferences) -> LoggingPreferences {
        let mut logging = preferences.logging.clone();
        let directory = Utf8Path::new(&logging.directory);
        if directory.is_relative() {
            logging.directory = self.config_dir.join(directory).into_string();
        }
        logging
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImportMode;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_dir = Utf8PathBuf::from_path_buf(temp_dir.path().join("config")).unwrap();
        let manager = ConfigManager::new(&config_dir).unwrap();
        (manager, temp_dir)
    }

    #[test]
    fn test_create_config_manager() {
        let (manager, _temp_dir) = create_test_config_manager();
        assert!(manager.config_dir().exists());
        assert_eq!(manager.items_dir(), manager.config_dir().join("items"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();
        let prefs = manager
            .load_preferences_with_env(Some(config::Map::new()))
            .unwrap();
        assert!(!prefs.locks.configuration_locked);
        assert_eq!(prefs.import.mode, ImportMode::NoImport);
        assert!(prefs.providers.order.is_empty());
    }

    #[test]
    fn test_load_save_preferences() {
        let (manager, _temp_dir) = create_test_config_manager();

        let mut prefs = Preferences::default();
        prefs.import.mode = ImportMode::Renumber;
        prefs.providers.order = vec!["io-yaml".to_string()];
        manager.save_preferences(&prefs).unwrap();

        let loaded = manager
            .load_preferences_with_env(Some(config::Map::new()))
            .unwrap();
        assert_eq!(loaded.import.mode, ImportMode::Renumber);
        assert_eq!(loaded.providers.order, vec!["io-yaml".to_string()]);
    }

    #[test]
    fn test_log_directory_resolved_against_config_dir() {
        let (manager, temp_dir) = create_test_config_manager();

        let mut prefs = Preferences::default();
        let logging = manager.logging_preferences(&prefs);
        assert_eq!(
            Utf8PathBuf::from(logging.directory),
            manager.config_dir().join("logs")
        );

        let absolute = Utf8PathBuf::from_path_buf(temp_dir.path().join("elsewhere")).unwrap();
        prefs.logging.directory = absolute.to_string();
        assert_eq!(
            manager.logging_preferences(&prefs).directory,
            absolute.as_str()
        );
    }

    #[test]
    fn test_environment_overrides_file() {
        let (manager, _temp_dir) = create_test_config_manager();
        manager.save_preferences(&Preferences::default()).unwrap();

        let mut env = config::Map::new();
        env.insert(
            "CONTEXT_ACTIONS__LOCKS__CONFIGURATION_LOCKED".to_string(),
            "true".to_string(),
        );
        env.insert(
            "CONTEXT_ACTIONS__IMPORT__MODE".to_string(),
            "override".to_string(),
        );

        let prefs = manager.load_preferences_with_env(Some(env)).unwrap();
        assert!(prefs.locks.configuration_locked);
        assert_eq!(prefs.import.mode, ImportMode::Override);
    }
}
