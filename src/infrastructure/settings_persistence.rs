use crate::config::SinkSettings;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Reads and writes the sink toggle file
pub struct SettingsPersistence {
    file_path: PathBuf,
}

impl SettingsPersistence {
    pub fn new(file_path: impl AsRef<Path>) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn load(&self) -> Result<Option<SinkSettings>> {
        if !self.file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.file_path)
            .with_context(|| format!("Failed to read sink settings {:?}", self.file_path))?;
        let settings: SinkSettings =
            serde_json::from_str(&content).context("Failed to parse sink settings JSON")?;

        info!("Loaded sink settings from {:?}", self.file_path);
        Ok(Some(settings))
    }

    pub fn save(&self, settings: &SinkSettings) -> Result<()> {
        let content =
            serde_json::to_string_pretty(settings).context("Failed to serialize sink settings")?;

        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }

        // Atomic write: write to temp file then rename
        let temp_path = self.file_path.with_extension("tmp");
        fs::write(&temp_path, content).context("Failed to write temp settings file")?;
        fs::rename(&temp_path, &self.file_path).context("Failed to rename settings file")?;

        info!("Saved sink settings to {:?}", self.file_path);
        Ok(())
    }
}
