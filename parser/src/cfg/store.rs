use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use super::*;

/// Destination for the rule set after every edit made through the engine.
pub trait ConfigStore: Send {
    fn save(&mut self, cfg: &RemapConfig) -> Result<()>;
}

/// Writes the configuration back to a JSON file. The file is replaced atomically so a crash
/// mid-write never leaves a truncated configuration behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> CfgError {
        CfgError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl ConfigStore for JsonFileStore {
    fn save(&mut self, cfg: &RemapConfig) -> Result<()> {
        let text = cfg.to_json()?;
        let tmp = self.path.with_extension("json.tmp");
        let mut f = std::fs::File::create(&tmp).map_err(|e| self.io_err(e))?;
        f.write_all(text.as_bytes()).map_err(|e| self.io_err(e))?;
        f.sync_all().map_err(|e| self.io_err(e))?;
        drop(f);
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        log::debug!("saved configuration to {}", self.path.display());
        Ok(())
    }
}

/// Keeps every saved snapshot in memory. Clones share the same history, so a caller can keep
/// one handle while the engine owns the other.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    saved: Arc<Mutex<Vec<RemapConfig>>>,
}

impl MemoryStore {
    pub fn save_count(&self) -> usize {
        self.saved.lock().len()
    }

    pub fn last_saved(&self) -> Option<RemapConfig> {
        self.saved.lock().last().cloned()
    }
}

impl ConfigStore for MemoryStore {
    fn save(&mut self, cfg: &RemapConfig) -> Result<()> {
        self.saved.lock().push(cfg.clone());
        Ok(())
    }
}
