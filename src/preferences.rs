//! Per-hostname auto mode preference

use crate::error::{OverlayError, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Storage key of the auto mode flag for `hostname`
pub fn auto_mode_key(hostname: &str) -> String {
    format!("auto_mode_{}", STANDARD.encode(hostname))
}

/// Boolean settings persisted across page loads
pub trait PreferenceStore: Send {
    fn get(&self, key: &str) -> Result<Option<bool>>;
    fn set(&mut self, key: &str, value: bool) -> Result<()>;

    /// Auto mode for a hostname, off unless stored otherwise
    fn auto_mode(&self, hostname: &str) -> Result<bool> {
        Ok(self.get(&auto_mode_key(hostname))?.unwrap_or(false))
    }

    fn set_auto_mode(&mut self, hostname: &str, enabled: bool) -> Result<()> {
        self.set(&auto_mode_key(hostname), enabled)
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryPreferences {
    values: BTreeMap<String, bool>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.values.get(key).copied())
    }

    fn set(&mut self, key: &str, value: bool) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Preferences kept in a JSON object on disk, rewritten on every change
#[derive(Debug)]
pub struct JsonFilePreferences {
    path: PathBuf,
    values: BTreeMap<String, bool>,
}

impl JsonFilePreferences {
    /// Load preferences from `path`; a missing file starts empty
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                OverlayError::Preferences(format!("Failed to parse {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(OverlayError::Preferences(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.values)
            .map_err(|e| OverlayError::Preferences(format!("Failed to serialize preferences: {}", e)))?;
        fs::write(&self.path, json)
            .map_err(|e| OverlayError::Preferences(format!("Failed to write {}: {}", self.path.display(), e)))
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.values.get(key).copied())
    }

    fn set(&mut self, key: &str, value: bool) -> Result<()> {
        self.values.insert(key.to_string(), value);
        self.save()
    }
}
