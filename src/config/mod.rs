use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    pub base_url: Option<String>,
    pub page_size: Option<usize>,
    pub timeout: Option<u64>,
    pub rate: Option<u32>,
    pub proxy: Option<String>,
    #[serde(alias = "bulk_policy")]
    pub policy: Option<String>,
    pub no_color: Option<bool>,
    pub offline_records: Option<u64>,
}

/// Overrides the directory that holds `config.yml`.
pub const HOME_ENV: &str = "LAZYPICK_HOME";

fn home_dir() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .into_iter()
        .find_map(|var| env::var_os(var).filter(|v| !v.is_empty()))
        .map(PathBuf::from)
}

/// `$LAZYPICK_HOME` when set, otherwise `~/.lazypick`.
pub fn config_dir() -> Option<PathBuf> {
    match env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        Some(dir) => Some(PathBuf::from(dir)),
        None => Some(home_dir()?.join(".lazypick")),
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(config_dir()?.join("config.yml"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    resolve_home(path, home_dir().as_deref())
}

// Only a leading `~` or `~/` is expanded; `~user` is left alone.
fn resolve_home(path: &str, home: Option<&Path>) -> PathBuf {
    let (Some(rest), Some(home)) = (path.strip_prefix('~'), home) else {
        return PathBuf::from(path);
    };
    if rest.is_empty() {
        return home.to_path_buf();
    }
    match rest.strip_prefix(['/', '\\']) {
        Some(rest) => home.join(rest),
        None => PathBuf::from(path),
    }
}

pub fn load_config(path: &PathBuf, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

pub fn parse_config(contents: &str) -> Result<ConfigFile, serde_yaml::Error> {
    if contents.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str::<ConfigFile>(contents)
}

pub fn default_config_yaml() -> String {
    r#"# lazypick config
#
# Location (default):
#   ~/.lazypick/config.yml, or $LAZYPICK_HOME/config.yml

# Remote source
base_url: https://api.artic.edu/api/v1/artworks
# proxy: http://127.0.0.1:8080
timeout: 10
# Page fetches per second
rate: 5

# Rows per page
page_size: 12

# What a new bulk count does to rows you toggled by hand:
#   reset - forget every manual toggle
#   merge - keep toggles, apply the bulk count to each page as it loads
policy: reset

# Browse generated records instead of the remote source
# offline_records: 100

no_color: false
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &PathBuf) -> Result<bool, String> {
    if path.exists() {
        return Ok(false);
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    std::fs::write(path, default_config_yaml())
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(true)
}
