//! Context configuration for faceid command-line tools.
//!
//! Configuration is stored in ~/.faceid/{app_name}/config.yaml as a set of
//! named contexts, one of which is current.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::paths::{DEFAULT_BASE_DIR, DEFAULT_CONFIG_FILE};

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Application name (not serialized).
    #[serde(skip)]
    pub app_name: String,

    /// Name of the currently active context.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_context: String,

    /// Map of context name to context configuration.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contexts: BTreeMap<String, Context>,

    /// Path to the config file (not serialized).
    #[serde(skip)]
    config_path: PathBuf,
}

/// Which storage engine a context keeps its gallery in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Nothing survives the process.
    Memory,
    /// A single redb database file.
    #[default]
    Redb,
    /// One directory per identity.
    Dir,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreKind::Memory => "memory",
            StoreKind::Redb => "redb",
            StoreKind::Dir => "dir",
        })
    }
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "redb" => Ok(StoreKind::Redb),
            "dir" => Ok(StoreKind::Dir),
            other => anyhow::bail!("unknown store kind '{}' (want memory, redb or dir)", other),
        }
    }
}

/// A single gallery context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Context {
    /// Context name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Storage engine.
    #[serde(default)]
    pub store: StoreKind,

    /// Database file or root directory. Defaults to the app data dir.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub store_path: String,

    /// Embedding service root URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub extractor_url: String,

    /// Extractor request timeout in seconds (optional).
    #[serde(default, skip_serializing_if = "is_zero")]
    pub timeout: u64,

    /// Embedding dimensionality (optional, extractor default if zero).
    #[serde(default, skip_serializing_if = "is_zero_usize")]
    pub dimension: usize,

    /// Match threshold (optional, gallery default if zero).
    #[serde(default, skip_serializing_if = "is_zero_f32")]
    pub threshold: f32,

    /// Enroll underivable paths as "unknown" instead of failing.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unknown_fallback: bool,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

fn is_zero_usize(n: &usize) -> bool {
    *n == 0
}

fn is_zero_f32(n: &f32) -> bool {
    *n == 0.0
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Config {
    /// Gets the default config directory.
    pub fn default_config_dir(app_name: &str) -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join(app_name))
    }

    /// Gets the default config file path.
    pub fn default_config_path(app_name: &str) -> Option<PathBuf> {
        Self::default_config_dir(app_name).map(|dir| dir.join(DEFAULT_CONFIG_FILE))
    }

    /// Returns the config file path.
    pub fn path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Saves the configuration to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// Adds or replaces a context. The first context added becomes current.
    pub fn add_context(&mut self, name: &str, mut ctx: Context) -> anyhow::Result<()> {
        if name.is_empty() {
            anyhow::bail!("context name is empty");
        }
        ctx.name = name.to_string();
        self.contexts.insert(name.to_string(), ctx);
        if self.current_context.is_empty() {
            self.current_context = name.to_string();
        }
        self.save()
    }

    /// Deletes a context.
    pub fn delete_context(&mut self, name: &str) -> anyhow::Result<()> {
        if self.contexts.remove(name).is_none() {
            anyhow::bail!("context '{}' not found", name);
        }
        if self.current_context == name {
            self.current_context.clear();
        }
        self.save()
    }

    /// Sets the current context.
    pub fn use_context(&mut self, name: &str) -> anyhow::Result<()> {
        if !self.contexts.contains_key(name) {
            anyhow::bail!("context '{}' not found", name);
        }
        self.current_context = name.to_string();
        self.save()
    }

    /// Gets a specific context.
    pub fn get_context(&self, name: &str) -> Option<&Context> {
        self.contexts.get(name)
    }

    /// Gets the current context.
    pub fn get_current_context(&self) -> Option<&Context> {
        if self.current_context.is_empty() {
            return None;
        }
        self.contexts.get(&self.current_context)
    }

    /// Resolves the context by name, or current context if name is empty.
    pub fn resolve_context(&self, name: Option<&str>) -> Option<&Context> {
        match name {
            Some(n) if !n.is_empty() => self.get_context(n),
            _ => self.get_current_context(),
        }
    }

    /// Lists all context names, sorted.
    pub fn list_contexts(&self) -> Vec<&str> {
        self.contexts.keys().map(|s| s.as_str()).collect()
    }
}

impl Context {
    /// Where this context's gallery lives, or `None` for the memory store.
    ///
    /// An empty `store_path` falls back to `{data_dir}/{name}.redb` or
    /// `{data_dir}/{name}/`.
    pub fn store_location(&self, data_dir: &Path) -> Option<PathBuf> {
        if self.store == StoreKind::Memory {
            return None;
        }
        if !self.store_path.is_empty() {
            return Some(PathBuf::from(&self.store_path));
        }
        let name = if self.name.is_empty() { "default" } else { self.name.as_str() };
        Some(match self.store {
            StoreKind::Redb => data_dir.join(format!("{name}.redb")),
            _ => data_dir.join(name),
        })
    }
}

/// Loads configuration for the specified app, creating an empty file if
/// none exists yet.
pub fn load_config(app_name: &str, custom_path: Option<&str>) -> anyhow::Result<Config> {
    let config_path = match custom_path {
        Some(p) => PathBuf::from(p),
        None => Config::default_config_path(app_name)
            .ok_or_else(|| anyhow::anyhow!("cannot determine config path"))?,
    };

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut cfg = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        serde_yaml::from_str(&content)?
    } else {
        let cfg = Config::default();
        let content = serde_yaml::to_string(&cfg)?;
        std::fs::write(&config_path, content)?;
        cfg
    };

    cfg.app_name = app_name.to_string();
    cfg.config_path = config_path;

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_in(dir: &Path) -> Config {
        let path = dir.join("config.yaml");
        load_config("faceid", Some(path.to_str().unwrap())).unwrap()
    }

    #[test]
    fn test_load_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_in(dir.path());
        assert!(cfg.path().exists());
        assert!(cfg.contexts.is_empty());
        assert!(cfg.get_current_context().is_none());
    }

    #[test]
    fn test_context_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = load_in(dir.path());

        let ctx = Context {
            store: StoreKind::Dir,
            store_path: "/srv/faces".into(),
            extractor_url: "http://127.0.0.1:8080".into(),
            threshold: 0.4,
            ..Default::default()
        };
        cfg.add_context("lab", ctx).unwrap();
        cfg.add_context("prod", Context::default()).unwrap();
        assert_eq!(cfg.current_context, "lab");
        assert_eq!(cfg.list_contexts(), vec!["lab", "prod"]);

        cfg.use_context("prod").unwrap();
        assert!(cfg.use_context("missing").is_err());

        let cfg = load_in(dir.path());
        assert_eq!(cfg.current_context, "prod");
        let lab = cfg.get_context("lab").unwrap();
        assert_eq!(lab.name, "lab");
        assert_eq!(lab.store, StoreKind::Dir);
        assert_eq!(lab.threshold, 0.4);

        let mut cfg = cfg;
        cfg.delete_context("prod").unwrap();
        assert!(cfg.current_context.is_empty());
        assert!(cfg.delete_context("prod").is_err());
        assert_eq!(cfg.resolve_context(Some("lab")).unwrap().name, "lab");
        assert!(cfg.resolve_context(None).is_none());
    }

    #[test]
    fn test_store_kind_parse() {
        assert_eq!("REDB".parse::<StoreKind>().unwrap(), StoreKind::Redb);
        assert_eq!("dir".parse::<StoreKind>().unwrap(), StoreKind::Dir);
        assert!("sqlite".parse::<StoreKind>().is_err());
        assert_eq!(StoreKind::Memory.to_string(), "memory");
    }

    #[test]
    fn test_store_location() {
        let data = Path::new("/data");
        let mut ctx = Context {
            name: "lab".into(),
            ..Default::default()
        };
        assert_eq!(ctx.store_location(data), Some(data.join("lab.redb")));

        ctx.store = StoreKind::Dir;
        assert_eq!(ctx.store_location(data), Some(data.join("lab")));

        ctx.store_path = "/srv/faces".into();
        assert_eq!(ctx.store_location(data), Some(PathBuf::from("/srv/faces")));

        ctx.store = StoreKind::Memory;
        assert_eq!(ctx.store_location(data), None);
    }

    #[test]
    fn test_yaml_omits_defaults() {
        let ctx = Context {
            name: "x".into(),
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&ctx).unwrap();
        assert!(yaml.contains("store: redb"));
        assert!(!yaml.contains("threshold"));
        assert!(!yaml.contains("unknown_fallback"));
    }
}
