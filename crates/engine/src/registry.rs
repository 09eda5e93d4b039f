// Path registry: sole arbiter of logical-path resolution and the only
// component allowed to touch the managed document tree.
//
// Everything else depends on the `DocumentTree` trait, so no alternate
// filesystem access path can link against the raw tree. Unsafe paths
// fail closed as "does not exist", never as a distinguishable error.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use folio_common::path::normalize_path;

/// The only filesystem interface the rest of the core sees.
pub trait DocumentTree: Send + Sync {
    /// Resolve a logical path to a verified real path, or `None`.
    fn resolve(&self, logical: &str) -> Option<PathBuf>;

    /// Read a document. `Ok(None)` for missing and unsafe paths alike.
    fn read(&self, logical: &str) -> Result<Option<String>>;

    /// Write a document at a verified location inside the managed root.
    fn write(&self, logical: &str, content: &str) -> Result<()>;

    /// Walk the managed tree and return every document's logical path.
    fn scan(&self) -> Result<Vec<String>>;

    /// Is this logical path in the authoritative existence catalogue?
    fn exists(&self, logical: &str) -> bool;

    /// Replace the existence catalogue wholesale (index rebuild only).
    fn install_catalog(&self, paths: BTreeSet<String>);

    /// The managed root (git working directory).
    fn root(&self) -> &Path;
}

pub struct PathRegistry {
    root: PathBuf,
    catalog: RwLock<BTreeSet<String>>,
}

impl PathRegistry {
    /// Open a registry over an existing directory. The root is
    /// canonicalized once; all later prefix checks compare against it.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let root = root
            .canonicalize()
            .with_context(|| format!("managed root `{}` is not accessible", root.display()))?;
        Ok(Self { root, catalog: RwLock::new(BTreeSet::new()) })
    }

    /// Normalize and join below the root. No filesystem checks yet.
    fn candidate(&self, logical: &str) -> Option<PathBuf> {
        let normalized = normalize_path(logical).ok()?;
        Some(self.root.join(normalized))
    }

    /// True when `real` is strictly inside the canonical root.
    fn within_root(&self, real: &Path) -> bool {
        real != self.root && real.starts_with(&self.root)
    }

    fn visit(&self, dir: &Path, found: &mut Vec<String>) -> Result<()> {
        let entries = fs::read_dir(dir)
            .with_context(|| format!("failed to list `{}`", dir.display()))?;
        for entry in entries {
            let entry = entry.context("failed to read directory entry")?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') {
                continue;
            }

            let path = entry.path();
            if path.is_dir() {
                self.visit(&path, found)?;
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some("md") {
                continue;
            }

            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            let logical = relative.to_string_lossy().replace('\\', "/");
            // Re-verify through resolution so symlinks pointing outside
            // the root never enter the catalogue.
            if self.resolve(&logical).is_some() {
                found.push(logical);
            } else {
                warn!(%logical, "skipping unresolvable entry during scan");
            }
        }
        Ok(())
    }
}

impl DocumentTree for PathRegistry {
    fn resolve(&self, logical: &str) -> Option<PathBuf> {
        let candidate = self.candidate(logical)?;
        let real = candidate.canonicalize().ok()?;
        if !real.is_file() || !self.within_root(&real) {
            return None;
        }
        Some(real)
    }

    fn read(&self, logical: &str) -> Result<Option<String>> {
        let Some(real) = self.resolve(logical) else {
            return Ok(None);
        };
        let text = fs::read_to_string(&real)
            .with_context(|| format!("failed to read `{}`", real.display()))?;
        Ok(Some(text))
    }

    fn write(&self, logical: &str, content: &str) -> Result<()> {
        let candidate = self
            .candidate(logical)
            .ok_or_else(|| anyhow::anyhow!("document does not exist: {logical}"))?;

        // For an existing file, canonicalize the file itself so a symlink
        // can never redirect the write outside the root. For a new file,
        // the parent directory must already exist inside the root.
        let target = if candidate.exists() {
            let real = candidate
                .canonicalize()
                .with_context(|| format!("failed to resolve `{}`", candidate.display()))?;
            if !self.within_root(&real) {
                anyhow::bail!("document does not exist: {logical}");
            }
            real
        } else {
            let parent = candidate
                .parent()
                .ok_or_else(|| anyhow::anyhow!("document does not exist: {logical}"))?;
            let real_parent = parent
                .canonicalize()
                .map_err(|_| anyhow::anyhow!("document does not exist: {logical}"))?;
            if real_parent != self.root && !self.within_root(&real_parent) {
                anyhow::bail!("document does not exist: {logical}");
            }
            real_parent.join(candidate.file_name().expect("normalized path has a file name"))
        };

        fs::write(&target, content)
            .with_context(|| format!("failed to write `{}`", target.display()))?;
        debug!(%logical, bytes = content.len(), "document written");
        Ok(())
    }

    fn scan(&self) -> Result<Vec<String>> {
        let mut found = Vec::new();
        self.visit(&self.root.clone(), &mut found)?;
        found.sort();
        Ok(found)
    }

    fn exists(&self, logical: &str) -> bool {
        let Ok(normalized) = normalize_path(logical) else {
            return false;
        };
        self.catalog.read().expect("catalog lock poisoned").contains(&normalized)
    }

    fn install_catalog(&self, paths: BTreeSet<String>) {
        let mut catalog = self.catalog.write().expect("catalog lock poisoned");
        *catalog = paths;
    }

    fn root(&self) -> &Path {
        &self.root
    }
}
