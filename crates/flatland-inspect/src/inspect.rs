//! Envelope inspection over a content directory
//!
//! Works on raw envelopes only, so it needs none of the game's asset types.

use anyhow::{bail, Context, Result};
use flatland_asset::{
    short_type_name, AssetPath, DirFileSystem, EntryKind, Envelope, ReadFileSystem, StoreConfig,
    WalkControl,
};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

/// One envelope's header
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EntrySummary {
    pub(crate) path: AssetPath,
    pub(crate) type_name: String,
    pub(crate) parent: Option<AssetPath>,
}

impl EntrySummary {
    fn new(path: AssetPath, envelope: &Envelope) -> Self {
        Self {
            path,
            type_name: envelope.type_name.clone(),
            parent: envelope.parent.clone(),
        }
    }
}

impl fmt::Display for EntrySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.path, self.type_name)?;
        if let Some(parent) = &self.parent {
            write!(f, "\t<- {parent}")?;
        }
        Ok(())
    }
}

/// A file that failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Problem {
    pub(crate) path: AssetPath,
    pub(crate) message: String,
}

pub(crate) struct Inspector {
    fs: DirFileSystem,
    config: StoreConfig,
}

impl Inspector {
    pub(crate) fn new(root: impl Into<PathBuf>, config: StoreConfig) -> Self {
        Self {
            fs: DirFileSystem::new(root),
            config,
        }
    }

    /// Every file the store would treat as an asset, in walk order
    pub(crate) fn asset_files(&self) -> Result<Vec<AssetPath>> {
        let mut files = Vec::new();
        self.fs
            .walk(&mut |path, kind| {
                if kind == EntryKind::File && self.config.is_asset_file(path) {
                    files.push(path.clone());
                }
                WalkControl::Continue
            })
            .with_context(|| format!("walking {}", self.fs.root().display()))?;
        debug!(count = files.len(), "asset files found");
        Ok(files)
    }

    pub(crate) fn envelope(&self, path: &AssetPath) -> Result<Envelope> {
        let bytes = self
            .fs
            .read(path)
            .with_context(|| format!("reading {path}"))?;
        Envelope::decode(&bytes).with_context(|| format!("decoding {path}"))
    }

    /// Headers of every decodable envelope, optionally of one type
    ///
    /// The filter matches either the full type path or its last segment.
    pub(crate) fn list(&self, type_filter: Option<&str>) -> Result<Vec<EntrySummary>> {
        let mut entries = Vec::new();
        for path in self.asset_files()? {
            let envelope = match self.envelope(&path) {
                Ok(envelope) => envelope,
                Err(err) => {
                    warn!(%path, error = %format!("{err:#}"), "skipping undecodable file");
                    continue;
                }
            };
            let wanted = type_filter.map_or(true, |name| {
                envelope.type_name == name || short_type_name(&envelope.type_name) == name
            });
            if wanted {
                entries.push(EntrySummary::new(path, &envelope));
            }
        }
        Ok(entries)
    }

    /// `path` followed by its ancestors, nearest first
    pub(crate) fn chain(&self, path: &AssetPath) -> Result<Vec<EntrySummary>> {
        let mut seen = HashSet::new();
        let mut chain = Vec::new();
        let mut next = Some(path.clone());
        while let Some(path) = next {
            if !seen.insert(path.clone()) {
                bail!("parent chain loops back to {path}");
            }
            let envelope = self.envelope(&path)?;
            next = envelope.parent.clone();
            chain.push(EntrySummary::new(path, &envelope));
        }
        Ok(chain)
    }

    /// Decode every envelope and resolve every parent chain
    pub(crate) fn validate(&self) -> Result<Vec<Problem>> {
        let mut problems = Vec::new();
        for path in self.asset_files()? {
            if let Err(err) = self.chain(&path) {
                problems.push(Problem {
                    path,
                    message: format!("{err:#}"),
                });
            }
        }
        Ok(problems)
    }
}
