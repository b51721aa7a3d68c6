//! Configuration module for MonitorUP.
//!
//! Configuration is read from a TOML file with a `[manager]` and a
//! `[logging]` section; both are optional.

pub mod methods;
pub mod types;

pub use types::{Config, ManagerConfig, ManagerConfigBuilder};

use std::{env, fmt, fs, path};

use crate::error::{MonitorError, Result};

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// `$XDG_CONFIG_HOME/monitorup/config.toml`, or under `$HOME/.config`
pub fn default_config_path() -> Result<path::PathBuf> {
    let base = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Ok(home) = env::var("HOME") {
        path::PathBuf::from(home).join(".config")
    } else {
        return Err(MonitorError::Config("no configuration directory available".into()));
    };

    Ok(base.join("monitorup/config.toml"))
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|err| MonitorError::Config(err.to_string()))?;
        config.manager.validate()?;
        Ok(config)
    }

    /// Read the configuration at `path`, which must exist
    pub fn from_path(path: impl AsRef<path::Path>) -> Result<Self> {
        let path = normalize_toml_path(path.as_ref());
        let raw = fs::read_to_string(&path)
            .map_err(|err| MonitorError::Config(format!("{}: {err}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Read the configuration at `path` or the default location, writing
    /// the defaults there first when no file exists.
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self> {
        let config_path = match optional_path {
            Some(path) => normalize_toml_path(path.as_ref()),
            None => default_config_path()?,
        };

        if config_path.exists() {
            Self::from_path(&config_path)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write the configuration to `path`
    pub fn write_config(&self, path: &path::Path) -> Result<()> {
        let raw = toml::to_string_pretty(self).map_err(|err| MonitorError::Config(err.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| MonitorError::Config(err.to_string()))?;
        }

        fs::write(path, raw).map_err(|err| MonitorError::Config(err.to_string()))
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let manager = &self.manager;

        writeln!(f, "Current Monitor Configuration:")?;
        write_title_1(f, "Manager")?;
        write_1(f, "Active Only", &manager.active_only)?;
        write_1(f, "Tolerance", &manager.tolerance)?;
        write_1(f, "Criteria", &if manager.criteria.is_some() { "set" } else { "none" })?;
        write_1(
            f,
            "Nearby Precision",
            &format!("{}..={}", manager.nearby.min_precision, manager.nearby.max_precision),
        )?;
        write_1(f, "Nearby Min Results", &manager.nearby.min_results)?;
        write_1(f, "Nearby Recurse", &manager.nearby.recurse)?;
        write_title_1(f, "Logging")?;
        write_1(f, "Level", &self.logging.level)?;
        write_1(f, "Format", &format!("{:?}", self.logging.format))?;

        Ok(())
    }
}
