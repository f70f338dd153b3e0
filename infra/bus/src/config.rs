use crate::error::{ConfigError, ConfigErrorExt};
use crate::signal::{Level, Signal};
use crate::sink::FamilyLevels;
use config::{Config, Environment, File};
use fxhash::FxHashMap;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const ENV_PREFIX: &str = "SBUS";
const DEFAULT_MAX_FILES: usize = 10;

/// Top-level daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub log: LogConfig,
    pub levels: LevelConfig,
}

/// Where and how log output is written.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub console: bool,
    /// Directory for rolling log files; no file output when unset.
    pub path: Option<PathBuf>,
    pub json: bool,
    pub max_files: usize,
    /// Extra `tracing` directives, e.g. `sbus=trace`.
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { console: true, path: None, json: false, max_files: DEFAULT_MAX_FILES, filter: None }
    }
}

/// Signal verbosity thresholds.
///
/// ```toml
/// [levels]
/// default = 1
///
/// [levels.families]
/// knl = 2
/// net = -1
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub default: Level,
    /// Per-family overrides; audit signal names select the wildcard family.
    ///
    /// When several keys select the wildcard, `any` wins, otherwise the
    /// audit name with the highest tag does.
    pub families: FxHashMap<Signal, Level>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self { default: Level::CTRL, families: FxHashMap::default() }
    }
}

impl LevelConfig {
    #[must_use]
    pub fn family_levels(&self) -> FamilyLevels {
        let mut overrides: Vec<_> = self.families.iter().map(|(&s, &l)| (s, l)).collect();
        overrides.sort_unstable_by_key(|&(signal, _)| (signal == Signal::Any, signal));

        let wildcard = overrides.iter().filter(|(s, _)| s.family() == Signal::Any).count();
        if wildcard > 1 {
            warn!(keys = wildcard, "Several level overrides select the wildcard family");
        }

        overrides
            .into_iter()
            .fold(FamilyLevels::uniform(self.default), |levels, (signal, level)| {
                levels.with(signal, level)
            })
    }
}

/// Loads configuration from a file, overlaid with `SBUS__`-prefixed environment variables.
///
/// Nested keys use a double underscore: `SBUS__LEVELS__DEFAULT=3` sets
/// `levels.default`. Without a `path` the optional `sbusd` file in the
/// working directory is tried.
///
/// # Errors
/// Returns [`ConfigError::Config`] if an explicitly given file is missing or
/// the merged sources do not deserialize into `T`.
///
/// # Example
/// ```rust
/// use sbus::config::{DaemonConfig, load_config};
///
/// let cfg: DaemonConfig = load_config(None::<&str>).unwrap_or_default();
/// assert!(cfg.log.console);
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let required = path.is_some();
    let effective_path = path.map_or_else(|| PathBuf::from("sbusd"), |p| p.as_ref().to_path_buf());

    let builder = Config::builder()
        .add_source(File::from(effective_path.as_path()).required(required))
        .add_source(
            Environment::with_prefix(ENV_PREFIX).separator("__").convert_case(config::Case::Snake),
        );

    info!(path = %effective_path.display(), required, "Loading config");

    let config = builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    #[serial]
    fn test_defaults() {
        let cfg = DaemonConfig::default();
        assert!(cfg.log.console);
        assert_eq!(cfg.log.max_files, DEFAULT_MAX_FILES);
        assert_eq!(cfg.levels.default, Level::CTRL);
        assert!(cfg.levels.families.is_empty());
    }

    #[test]
    #[serial]
    fn test_load_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let file = dir.path().join("daemon.toml");
        fs::write(
            &file,
            r#"
            [log]
            console = false
            json = true

            [levels]
            default = 2

            [levels.families]
            knl = 4
            NET = -1
            "#,
        )?;

        let cfg: DaemonConfig = load_config(Some(&file))?;
        assert!(!cfg.log.console);
        assert!(cfg.log.json);
        assert_eq!(cfg.levels.default, Level::CTRLMORE);
        assert_eq!(cfg.levels.families.get(&Signal::Knl), Some(&Level::PRIVATE));
        assert_eq!(cfg.levels.families.get(&Signal::Net), Some(&Level::Silent));

        let levels = cfg.levels.family_levels();
        assert_eq!(levels.get(Signal::Knl), Level::PRIVATE);
        assert_eq!(levels.get(Signal::Net), Level::Silent);
        assert_eq!(levels.get(Signal::Cfg), Level::CTRLMORE);
        Ok(())
    }

    #[test]
    #[serial]
    fn test_wildcard_overrides_resolve_in_fixed_order() {
        let mut levels = LevelConfig::default();
        levels.families.insert(Signal::IkeUpStart, Level::AUDIT);
        levels.families.insert(Signal::ChildDownFailed, Level::CTRLMORE);
        levels.families.insert(Signal::Knl, Level::RAW);
        assert_eq!(levels.family_levels().get(Signal::Any), Level::CTRLMORE);

        levels.families.insert(Signal::Any, Level::RAW);
        for _ in 0..8 {
            let resolved = levels.family_levels();
            assert_eq!(resolved.get(Signal::Any), Level::RAW);
            assert_eq!(resolved.get(Signal::IkeUpStart), Level::RAW);
            assert_eq!(resolved.get(Signal::Knl), Level::RAW);
            assert_eq!(resolved.get(Signal::Cfg), Level::CTRL);
        }
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let result = load_config::<DaemonConfig>(Some(dir.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::Config { context: Some(_), .. })));
    }

    #[test]
    #[serial]
    fn test_unknown_level_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let file = dir.path().join("bad.toml");
        fs::write(&file, "[levels]\ndefault = 9\n")?;
        assert!(load_config::<DaemonConfig>(Some(&file)).is_err());
        Ok(())
    }
}
