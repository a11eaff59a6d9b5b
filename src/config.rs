use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::generator::GeneratorOptions;

/// Assets pre-cached when the offline worker installs.
pub const DEFAULT_MANIFEST: &[&str] = &[
  "/",
  "/index.html",
  "/manifest.json",
  "/icons/icon-192x192.png",
  "/icons/icon-512x512.png",
  "/src/index.css",
  "/src/main.tsx",
];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub backend: BackendConfig,
  /// Origin serving the application shell assets
  pub origin: String,
  /// Custom title for the header (defaults to the web manifest name)
  pub title: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub capabilities: Capabilities,
  #[serde(default)]
  pub sync: SyncConfig,
  #[serde(default)]
  pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
  pub url: String,
  /// Prefilled on the sign-in form
  pub email: Option<String>,
  #[serde(default = "default_table")]
  pub table: String,
}

fn default_table() -> String {
  "password_entries".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Version token; bumping it replaces the whole asset cache
  #[serde(default = "default_cache_version")]
  pub version: String,
  #[serde(default = "default_cache_prefix")]
  pub prefix: String,
  #[serde(default = "default_manifest")]
  pub manifest: Vec<String>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      version: default_cache_version(),
      prefix: default_cache_prefix(),
      manifest: default_manifest(),
    }
  }
}

fn default_cache_version() -> String {
  "v1".to_string()
}

fn default_cache_prefix() -> String {
  "pocket-secrets".to_string()
}

fn default_manifest() -> Vec<String> {
  DEFAULT_MANIFEST.iter().map(|s| s.to_string()).collect()
}

/// What the host environment supports. Handed to the install controller
/// instead of probing at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Capabilities {
  #[serde(default = "enabled")]
  pub offline_cache: bool,
  #[serde(default = "enabled")]
  pub push: bool,
  #[serde(default = "enabled")]
  pub background_sync: bool,
}

impl Default for Capabilities {
  fn default() -> Self {
    Self {
      offline_cache: true,
      push: true,
      background_sync: true,
    }
  }
}

fn enabled() -> bool {
  true
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
  /// Queue mutations that fail because the backend is unreachable
  #[serde(default = "enabled")]
  pub enabled: bool,
  #[serde(default = "default_sync_interval")]
  pub interval_secs: u64,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      interval_secs: default_sync_interval(),
    }
  }
}

fn default_sync_interval() -> u64 {
  30
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
  #[serde(default = "default_length")]
  pub length: usize,
  #[serde(default = "enabled")]
  pub uppercase: bool,
  #[serde(default = "enabled")]
  pub digits: bool,
  #[serde(default = "enabled")]
  pub symbols: bool,
}

impl Default for GeneratorConfig {
  fn default() -> Self {
    Self {
      length: default_length(),
      uppercase: true,
      digits: true,
      symbols: true,
    }
  }
}

fn default_length() -> usize {
  16
}

impl From<&GeneratorConfig> for GeneratorOptions {
  fn from(config: &GeneratorConfig) -> Self {
    GeneratorOptions {
      length: config.length,
      uppercase: config.uppercase,
      digits: config.digits,
      symbols: config.symbols,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./pocket-secrets.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/pocket-secrets/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/pocket-secrets/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("pocket-secrets.yaml");
    if local.exists() {
      return Some(local);
    }

    dirs::config_dir()
      .map(|dir| dir.join("pocket-secrets").join("config.yaml"))
      .filter(|p| p.exists())
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub(crate) fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    url::Url::parse(&config.origin).map_err(|e| eyre!("Invalid origin {}: {}", config.origin, e))?;
    Ok(config)
  }

  /// Host of the backend API; requests to it are never cached.
  pub fn api_host(&self) -> Result<String> {
    url::Url::parse(&self.backend.url)
      .ok()
      .and_then(|u| u.host_str().map(String::from))
      .ok_or_else(|| eyre!("Backend URL has no host: {}", self.backend.url))
  }

  /// Get the backend's public (anon) API key from the environment.
  ///
  /// Checks POCKET_SECRETS_ANON_KEY first, then SUPABASE_ANON_KEY as fallback.
  pub fn get_anon_key() -> Result<String> {
    std::env::var("POCKET_SECRETS_ANON_KEY")
      .or_else(|_| std::env::var("SUPABASE_ANON_KEY"))
      .map_err(|_| {
        eyre!("Backend API key not found. Set POCKET_SECRETS_ANON_KEY or SUPABASE_ANON_KEY.")
      })
  }

  /// Account password for automatic sign-in, if set.
  pub fn get_password() -> Option<String> {
    std::env::var("POCKET_SECRETS_PASSWORD").ok()
  }

  /// Directory holding the state database and logs.
  pub fn data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("pocket-secrets"))
  }
}
