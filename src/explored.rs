use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::catalog::Coord;

/// Coordinates already attempted, persisted as a JSON array of `"x,y"` strings.
/// The file is rewritten in full after every change.
#[derive(Debug)]
pub struct ExploredSet {
    path: PathBuf,
    keys: Vec<String>,
    index: HashSet<String>,
}

impl ExploredSet {
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        ExploredSet {
            path: path.into(),
            keys: Vec::new(),
            index: HashSet::new(),
        }
    }

    /// Read the set from `path`. A missing file is an empty set; a broken one
    /// is logged and also treated as empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if !path.exists() {
            return Self::empty(path);
        }
        match read_keys(&path) {
            Ok(keys) => {
                let mut set = Self::empty(path);
                for key in keys {
                    if set.index.insert(key.clone()) {
                        set.keys.push(key);
                    }
                }
                set
            }
            Err(e) => {
                tracing::warn!("error loading explored ruins: {e:#}");
                Self::empty(path)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, coord: Coord) -> bool {
        self.index.contains(&coord.key())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in the order they were added.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Add `coord` and rewrite the file. The in-memory set is updated even if
    /// the write fails.
    pub fn mark(&mut self, coord: Coord) -> Result<()> {
        let key = coord.key();
        if self.index.insert(key.clone()) {
            self.keys.push(key);
        }
        self.save()
    }

    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let json = serde_json::to_string_pretty(&self.keys).context("failed to serialize explored ruins")?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
        tmp.write_all(json.as_bytes())
            .context("failed to write explored ruins")?;
        tmp.persist(&self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

fn read_keys(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("invalid JSON in {}", path.display()))
}
