use std::{collections::HashMap, path::PathBuf, time::Duration};

use config::{Config, ConfigError, Environment, File, FileFormat};
use log::debug;
use serde::Deserialize;

use crate::install::InstallOptions;

const CONFIG_FILE: &str = ".repofetch/config.toml";

pub struct RepofetchConfig {
    pub timeout: Option<Duration>,
    pub install_dir: Option<PathBuf>,
    pub options: InstallOptions,
}

impl RepofetchConfig {
    /// Loads `$HOME/.repofetch/config.toml` if present, overridden by
    /// `REPOFETCH_*` environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let file = home::home_dir().map(|home| home.join(CONFIG_FILE));
        let raw_config = RawConfig::load(file, None)?;
        debug!("Loaded configuration {:?}", raw_config);
        Ok(raw_config.into())
    }
}

impl From<RawConfig> for RepofetchConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = InstallOptions::default();
        RepofetchConfig {
            timeout: raw.fetch.timeout.map(Duration::from_secs),
            install_dir: raw.install.dir,
            options: InstallOptions {
                staging: raw.install.staging.unwrap_or(defaults.staging),
                lock: raw.install.lock.unwrap_or(defaults.lock),
                retries: raw.fetch.retries.unwrap_or(defaults.retries),
                backoff: raw
                    .fetch
                    .backoff
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.backoff),
            },
        }
    }
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RawConfig {
    #[serde(default)]
    fetch: FetchConfig,
    #[serde(default)]
    install: InstallConfig,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct FetchConfig {
    /// Seconds.
    timeout: Option<u64>,
    retries: Option<u32>,
    /// Milliseconds.
    backoff: Option<u64>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct InstallConfig {
    dir: Option<PathBuf>,
    staging: Option<bool>,
    lock: Option<bool>,
}

impl RawConfig {
    fn load(
        file: Option<PathBuf>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(
                File::from(file)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }
        builder
            .add_source(
                Environment::with_prefix("REPOFETCH")
                    .separator("_")
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn load_empty() {
        let env = HashMap::from([]);
        let config = RawConfig::load(None, Some(env)).unwrap();
        assert_eq!(config, RawConfig::default());

        let config = RepofetchConfig::from(config);
        assert_eq!(config.timeout, None);
        assert_eq!(config.options, InstallOptions::default());
    }

    #[test]
    fn load_environment() {
        let env = HashMap::from([
            ("REPOFETCH_FETCH_TIMEOUT".to_owned(), "30".to_owned()),
            ("REPOFETCH_FETCH_RETRIES".to_owned(), "2".to_owned()),
            ("REPOFETCH_INSTALL_DIR".to_owned(), "/opt/checkouts".to_owned()),
            ("REPOFETCH_INSTALL_LOCK".to_owned(), "true".to_owned()),
        ]);
        let config = RawConfig::load(None, Some(env)).unwrap();
        assert_eq!(
            config,
            RawConfig {
                fetch: FetchConfig {
                    timeout: Some(30),
                    retries: Some(2),
                    backoff: None,
                },
                install: InstallConfig {
                    dir: Some("/opt/checkouts".into()),
                    staging: None,
                    lock: Some(true),
                },
            }
        )
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(
            &file,
            r#"
                [fetch]
                retries = 5
                backoff = 250

                [install]
                staging = false
            "#,
        )
        .unwrap();
        let env = HashMap::from([("REPOFETCH_FETCH_RETRIES".to_owned(), "1".to_owned())]);

        let config = RepofetchConfig::from(RawConfig::load(Some(file), Some(env)).unwrap());

        assert_eq!(
            config.options,
            InstallOptions {
                staging: false,
                lock: false,
                retries: 1,
                backoff: Duration::from_millis(250),
            }
        );
    }

    #[test]
    fn missing_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let config = RawConfig::load(Some(dir.path().join("absent.toml")), Some(HashMap::new()));
        assert_eq!(config.unwrap(), RawConfig::default());
    }
}
