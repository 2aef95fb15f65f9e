//! Shared credentials / config file parsing.
//!
//! Both files are INI: `[section]` headers followed by `key = value` lines.
//! The credentials file names sections after the profile; the config file
//! uses `[profile name]`, except for `[default]`.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{AthenaError, Result};

/// One `[section]` of an INI file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniSection {
    pub name: String,
    pub entries: HashMap<String, String>,
}

impl IniSection {
    /// Returns the value of a key, if present and non-empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Parses INI content into sections, in file order.
///
/// Lines before the first section header and lines without `=` are ignored.
pub fn parse_ini(content: &str) -> Vec<IniSection> {
    let mut sections: Vec<IniSection> = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            sections.push(IniSection {
                name: name.trim().to_string(),
                entries: HashMap::new(),
            });
            continue;
        }

        if let (Some(section), Some((key, value))) = (sections.last_mut(), line.split_once('=')) {
            section
                .entries
                .insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }

    sections
}

/// Returns the shared credentials file path.
///
/// Honors `AWS_SHARED_CREDENTIALS_FILE`, otherwise `~/.aws/credentials`.
pub fn default_credentials_path() -> Option<PathBuf> {
    std::env::var_os("AWS_SHARED_CREDENTIALS_FILE")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".aws").join("credentials")))
}

/// Returns the shared config file path.
///
/// Honors `AWS_CONFIG_FILE`, otherwise `~/.aws/config`.
pub fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("AWS_CONFIG_FILE")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".aws").join("config")))
}

/// Reads and parses an INI file. A missing file yields no sections.
pub fn read_ini(path: &Path) -> Result<Vec<IniSection>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path).map_err(|e| {
        AthenaError::credentials(format!("Failed to read {}: {e}", path.display()))
    })?;
    Ok(parse_ini(&content))
}

/// Lists profile names found in the credentials and config files, sorted.
pub fn list_profiles(credentials_path: Option<&Path>, config_path: Option<&Path>) -> Result<Vec<String>> {
    let mut names = BTreeSet::new();

    if let Some(path) = credentials_path {
        names.extend(read_ini(path)?.into_iter().map(|s| s.name));
    }

    if let Some(path) = config_path {
        for section in read_ini(path)? {
            if section.name == "default" {
                names.insert(section.name);
            } else if let Some(name) = section.name.strip_prefix("profile ") {
                names.insert(name.trim().to_string());
            }
        }
    }

    Ok(names.into_iter().collect())
}
