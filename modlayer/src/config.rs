//! INI configuration file.
//!
//! Default location is `~/.modlayer/config.ini`:
//!
//! ```ini
//! [paths]
//! mods_dir = ~/.modlayer/mods
//! content_root = ~/.modlayer/content
//! base_manifest = manifest.json      ; relative to content_root
//! cache_dir = ~/.modlayer/cache
//!
//! [loader]
//! search_subdirectories = false
//! blocked_mods = OldLasers, Debug
//! ignore_missing_mods = LegacyCore
//! game_version = 1.9.1
//!
//! [content]
//! owned_packs = urban, heavy         ; omit when ownership is unknown
//!
//! [logging]
//! level = info
//! directory = ~/.modlayer/logs
//! ```
//!
//! Missing keys fall back to defaults. Malformed values are errors.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ini::Ini;
use semver::Version;
use thiserror::Error;

use crate::catalog::OwnershipState;

/// Name of the configuration directory below the home directory.
pub const CONFIG_DIR_NAME: &str = ".modlayer";

/// Name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "config.ini";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Errors reading or writing the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("failed to write config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value for {section}.{key}: '{value}' ({reason})")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// `[paths]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsSettings {
    /// Folder scanned for mods.
    pub mods_dir: PathBuf,

    /// Root of the default content.
    pub content_root: PathBuf,

    /// Base manifest; relative paths are taken from `content_root`.
    pub base_manifest: PathBuf,

    /// Merge cache and load-order state.
    pub cache_dir: PathBuf,
}

impl PathsSettings {
    /// Absolute location of the base manifest.
    pub fn base_manifest_path(&self) -> PathBuf {
        self.content_root.join(&self.base_manifest)
    }
}

/// `[loader]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderSettings {
    pub search_subdirectories: bool,
    pub blocked_mods: Vec<String>,

    /// Dependencies that are dropped instead of excluding the dependent.
    pub ignore_missing_mods: Vec<String>,

    /// Running game version; no version checks when unset.
    pub game_version: Option<Version>,
}

impl LoaderSettings {
    pub fn ignore_missing_set(&self) -> HashSet<String> {
        self.ignore_missing_mods.iter().cloned().collect()
    }
}

/// `[content]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentSettings {
    /// Owned content packs; `None` means ownership is unknown.
    pub owned_packs: Option<Vec<String>>,
}

impl ContentSettings {
    /// Ownership state for catalog filtering.
    pub fn ownership(&self) -> OwnershipState {
        match &self.owned_packs {
            Some(packs) => OwnershipState::owned(packs.iter().cloned()),
            None => OwnershipState::Unknown,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Default filter level, overridden by `RUST_LOG`.
    pub level: String,

    /// Directory for daily log files.
    pub directory: PathBuf,
}

/// Complete configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub paths: PathsSettings,
    pub loader: LoaderSettings,
    pub content: ContentSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let root = config_directory();
        Self {
            paths: PathsSettings {
                mods_dir: root.join("mods"),
                content_root: root.join("content"),
                base_manifest: PathBuf::from("manifest.json"),
                cache_dir: root.join("cache"),
            },
            loader: LoaderSettings::default(),
            content: ContentSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
                directory: root.join("logs"),
            },
        }
    }
}

/// The configuration directory, `~/.modlayer`.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// The default configuration file path.
pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

impl ConfigFile {
    /// Load from the default path; a missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ini(&ini)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse from an INI document, applying defaults for missing keys.
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |section: &str, key: &str| -> Option<String> {
            ini.section(Some(section))
                .and_then(|s| s.get(key))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get("paths", "mods_dir") {
            config.paths.mods_dir = expand_tilde(&v);
        }
        if let Some(v) = get("paths", "content_root") {
            config.paths.content_root = expand_tilde(&v);
        }
        if let Some(v) = get("paths", "base_manifest") {
            config.paths.base_manifest = expand_tilde(&v);
        }
        if let Some(v) = get("paths", "cache_dir") {
            config.paths.cache_dir = expand_tilde(&v);
        }

        if let Some(v) = get("loader", "search_subdirectories") {
            config.loader.search_subdirectories = parse_bool("loader", "search_subdirectories", &v)?;
        }
        if let Some(v) = get("loader", "blocked_mods") {
            config.loader.blocked_mods = parse_list(&v);
        }
        if let Some(v) = get("loader", "ignore_missing_mods") {
            config.loader.ignore_missing_mods = parse_list(&v);
        }
        if let Some(v) = get("loader", "game_version") {
            let version = Version::parse(&v).map_err(|e| ConfigError::InvalidValue {
                section: "loader",
                key: "game_version",
                value: v.clone(),
                reason: e.to_string(),
            })?;
            config.loader.game_version = Some(version);
        }

        // An explicitly empty list means "owns nothing", so read it raw.
        if let Some(v) = ini.section(Some("content")).and_then(|s| s.get("owned_packs")) {
            config.content.owned_packs = Some(parse_list(v));
        }

        if let Some(v) = get("logging", "level") {
            let level = v.to_ascii_lowercase();
            if !LOG_LEVELS.contains(&level.as_str()) {
                return Err(ConfigError::InvalidValue {
                    section: "logging",
                    key: "level",
                    value: v,
                    reason: format!("expected one of {}", LOG_LEVELS.join(", ")),
                });
            }
            config.logging.level = level;
        }
        if let Some(v) = get("logging", "directory") {
            config.logging.directory = expand_tilde(&v);
        }

        Ok(config)
    }

    /// Render as an INI document.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some("paths"))
            .set("mods_dir", self.paths.mods_dir.to_string_lossy())
            .set("content_root", self.paths.content_root.to_string_lossy())
            .set("base_manifest", self.paths.base_manifest.to_string_lossy())
            .set("cache_dir", self.paths.cache_dir.to_string_lossy());

        let game_version = self
            .loader
            .game_version
            .as_ref()
            .map(Version::to_string)
            .unwrap_or_default();
        ini.with_section(Some("loader"))
            .set("search_subdirectories", self.loader.search_subdirectories.to_string())
            .set("blocked_mods", self.loader.blocked_mods.join(", "))
            .set("ignore_missing_mods", self.loader.ignore_missing_mods.join(", "))
            .set("game_version", game_version);

        if let Some(packs) = &self.content.owned_packs {
            ini.with_section(Some("content"))
                .set("owned_packs", packs.join(", "));
        }

        ini.with_section(Some("logging"))
            .set("level", self.logging.level.as_str())
            .set("directory", self.logging.directory.to_string_lossy());
        ini
    }

    /// Save to the default path.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        self.to_ini().write_to_file(path).map_err(write_err)?;
        tracing::info!(path = %path.display(), "Saved configuration");
        Ok(())
    }
}

fn expand_tilde(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(value),
        },
        None if value == "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(value)),
        None => PathBuf::from(value),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(section: &'static str, key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            section,
            key,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(text: &str) -> Result<ConfigFile, ConfigError> {
        ConfigFile::from_ini(&Ini::load_from_str(text).unwrap())
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.content.ownership(), OwnershipState::Unknown);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_full_file() {
        let config = parse(
            "[paths]\n\
             mods_dir = /games/mods\n\
             content_root = /games/content\n\
             base_manifest = base.json\n\
             cache_dir = /games/cache\n\
             [loader]\n\
             search_subdirectories = yes\n\
             blocked_mods = Old, Debug\n\
             ignore_missing_mods = Legacy\n\
             game_version = 1.9.1\n\
             [content]\n\
             owned_packs = urban, heavy\n\
             [logging]\n\
             level = DEBUG\n",
        )
        .unwrap();

        assert_eq!(config.paths.mods_dir, PathBuf::from("/games/mods"));
        assert_eq!(
            config.paths.base_manifest_path(),
            PathBuf::from("/games/content/base.json")
        );
        assert!(config.loader.search_subdirectories);
        assert_eq!(config.loader.blocked_mods, vec!["Old", "Debug"]);
        assert!(config.loader.ignore_missing_set().contains("Legacy"));
        assert_eq!(config.loader.game_version, Some(Version::new(1, 9, 1)));
        assert_eq!(
            config.content.ownership(),
            OwnershipState::owned(["urban", "heavy"])
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_absolute_base_manifest_wins() {
        let config = parse("[paths]\ncontent_root = /c\nbase_manifest = /elsewhere/m.json\n").unwrap();
        assert_eq!(config.paths.base_manifest_path(), PathBuf::from("/elsewhere/m.json"));
    }

    #[test]
    fn test_empty_owned_packs_owns_nothing() {
        let config = parse("[content]\nowned_packs =\n").unwrap();
        assert_eq!(config.content.owned_packs, Some(Vec::new()));
        assert!(!config.content.ownership().is_owned("urban"));
    }

    #[test]
    fn test_invalid_values() {
        let err = parse("[loader]\nsearch_subdirectories = maybe\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "search_subdirectories", .. }));

        let err = parse("[loader]\ngame_version = latest\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "game_version", .. }));

        let err = parse("[logging]\nlevel = loud\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "level", .. }));
    }

    #[test]
    fn test_tilde_expansion() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/mods"), home.join("mods"));
        }
        assert_eq!(expand_tilde("/abs"), PathBuf::from("/abs"));
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = ConfigFile::default();
        config.paths.mods_dir = temp.path().join("mods");
        config.loader.blocked_mods = vec!["Old".to_string()];
        config.loader.game_version = Some(Version::new(1, 2, 3));
        config.content.owned_packs = Some(vec!["urban".to_string()]);
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let temp = TempDir::new().unwrap();
        let err = ConfigFile::load_from(&temp.path().join("nope.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
