//! Layered filesystems
//!
//! Reads go through an ordered list of [`ReadFileSystem`] layers (lower
//! priority value is tried first); writes go to a single optional
//! [`WritableFileSystem`] sink.

use flatland_format::AssetPath;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Debug, Formatter};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Kind of entry reported by a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// Walk callback verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkControl {
    /// Keep going
    #[default]
    Continue,
    /// Do not descend into this directory
    SkipDir,
    /// Abort this walk and every remaining layer
    Stop,
}

/// Callback invoked for each entry of a walk
pub type WalkVisitor<'a> = dyn FnMut(&AssetPath, EntryKind) -> WalkControl + 'a;

/// Read side of a filesystem layer
pub trait ReadFileSystem: Send + Sync {
    /// Whole contents of a file
    ///
    /// # Errors
    /// `io::ErrorKind::NotFound` when the layer does not hold the path.
    fn read(&self, path: &AssetPath) -> io::Result<Vec<u8>>;

    /// Visit every entry below the root in a stable order
    ///
    /// Returns [`WalkControl::Stop`] if the visitor stopped the walk.
    ///
    /// # Errors
    /// Propagates errors listing directories.
    fn walk(&self, visit: &mut WalkVisitor<'_>) -> io::Result<WalkControl>;
}

/// Write side of a filesystem layer
pub trait WritableFileSystem: Send + Sync {
    /// Replace the contents of a file, creating it if needed
    ///
    /// # Errors
    /// Propagates the underlying write failure.
    fn write(&self, path: &AssetPath, data: &[u8]) -> io::Result<()>;
}

/// Filesystem rooted at a host directory
#[derive(Debug, Clone)]
pub struct DirFileSystem {
    root: PathBuf,
}

impl DirFileSystem {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &AssetPath) -> io::Result<PathBuf> {
        let relative = Path::new(path.as_str());
        if path.is_empty()
            || !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid asset path: '{path}'"),
            ));
        }
        Ok(self.root.join(relative))
    }

    fn walk_dir(
        &self,
        dir: &Path,
        prefix: &str,
        visit: &mut WalkVisitor<'_>,
    ) -> io::Result<WalkControl> {
        let mut entries = std::fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
        entries.sort_by_key(std::fs::DirEntry::file_name);

        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = AssetPath::new(format!("{prefix}{name}"));
            let kind = if entry.file_type()?.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::File
            };

            match visit(&path, kind) {
                WalkControl::Stop => return Ok(WalkControl::Stop),
                WalkControl::SkipDir => continue,
                WalkControl::Continue => {}
            }
            if kind == EntryKind::Dir
                && self.walk_dir(&entry.path(), &format!("{path}/"), visit)? == WalkControl::Stop
            {
                return Ok(WalkControl::Stop);
            }
        }
        Ok(WalkControl::Continue)
    }
}

impl ReadFileSystem for DirFileSystem {
    fn read(&self, path: &AssetPath) -> io::Result<Vec<u8>> {
        std::fs::read(self.resolve(path)?)
    }

    fn walk(&self, visit: &mut WalkVisitor<'_>) -> io::Result<WalkControl> {
        self.walk_dir(&self.root, "", visit)
    }
}

impl WritableFileSystem for DirFileSystem {
    fn write(&self, path: &AssetPath, data: &[u8]) -> io::Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(full, data)
    }
}

/// In-memory filesystem; clones share the same files
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: Arc<RwLock<BTreeMap<AssetPath, Vec<u8>>>>,
}

impl MemoryFileSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file (builder pattern)
    #[must_use]
    pub fn with_file(self, path: impl Into<AssetPath>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }

    /// Add or replace a file
    pub fn insert(&self, path: impl Into<AssetPath>, data: impl Into<Vec<u8>>) {
        self.files.write().insert(path.into(), data.into());
    }

    /// Copy of a file's contents
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files.read().get(path).cloned()
    }

    /// Stored paths in sorted order
    #[must_use]
    pub fn paths(&self) -> Vec<AssetPath> {
        self.files.read().keys().cloned().collect()
    }
}

impl ReadFileSystem for MemoryFileSystem {
    fn read(&self, path: &AssetPath) -> io::Result<Vec<u8>> {
        self.files.read().get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such file: '{path}'"))
        })
    }

    fn walk(&self, visit: &mut WalkVisitor<'_>) -> io::Result<WalkControl> {
        // snapshot so the visitor may write to this filesystem
        let paths = self.paths();
        let mut seen_dirs = BTreeSet::new();
        let mut skipped: Vec<String> = Vec::new();

        'files: for path in paths {
            let segments: Vec<&str> = path.segments().collect();
            let Some((_, dirs)) = segments.split_last() else {
                continue;
            };

            let mut prefix = String::new();
            for dir in dirs {
                prefix.push_str(dir);
                prefix.push('/');
                if skipped.iter().any(|s| prefix.starts_with(s.as_str())) {
                    continue 'files;
                }
                if seen_dirs.insert(prefix.clone()) {
                    let dir_path = AssetPath::new(prefix.trim_end_matches('/'));
                    match visit(&dir_path, EntryKind::Dir) {
                        WalkControl::Stop => return Ok(WalkControl::Stop),
                        WalkControl::SkipDir => {
                            skipped.push(prefix.clone());
                            continue 'files;
                        }
                        WalkControl::Continue => {}
                    }
                }
            }

            if visit(&path, EntryKind::File) == WalkControl::Stop {
                return Ok(WalkControl::Stop);
            }
        }
        Ok(WalkControl::Continue)
    }
}

impl WritableFileSystem for MemoryFileSystem {
    fn write(&self, path: &AssetPath, data: &[u8]) -> io::Result<()> {
        self.insert(path.clone(), data.to_vec());
        Ok(())
    }
}

/// Ordered read layers plus an optional write sink
#[derive(Clone, Default)]
pub struct FileSystemOverlay {
    layers: Vec<(i32, Arc<dyn ReadFileSystem>)>,
    sink: Option<Arc<dyn WritableFileSystem>>,
}

impl FileSystemOverlay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a read layer; lower priority values are consulted first
    pub fn add_layer(&mut self, layer: Arc<dyn ReadFileSystem>, priority: i32) {
        self.layers.push((priority, layer));
        // stable sort keeps registration order among equal priorities
        self.layers.sort_by_key(|(priority, _)| *priority);
    }

    /// Replace the write sink
    pub fn set_sink(&mut self, sink: Arc<dyn WritableFileSystem>) {
        self.sink = Some(sink);
    }

    #[inline]
    #[must_use]
    pub fn sink(&self) -> Option<&Arc<dyn WritableFileSystem>> {
        self.sink.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Contents from the first layer that holds `path`
    ///
    /// # Errors
    /// `io::ErrorKind::NotFound` when no layer holds it.
    pub fn read(&self, path: &AssetPath) -> io::Result<Vec<u8>> {
        for (priority, layer) in &self.layers {
            match layer.read(path) {
                Ok(bytes) => return Ok(bytes),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    tracing::debug!(%path, priority, error = %err, "layer read failed, trying next");
                }
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("'{path}' not found in any layer"),
        ))
    }

    /// Walk every layer in priority order
    ///
    /// A [`WalkControl::Stop`] from the visitor ends the whole walk.
    ///
    /// # Errors
    /// Propagates the first layer error.
    pub fn walk(&self, visit: &mut WalkVisitor<'_>) -> io::Result<()> {
        for (_, layer) in &self.layers {
            if layer.walk(visit)? == WalkControl::Stop {
                break;
            }
        }
        Ok(())
    }
}

impl Debug for FileSystemOverlay {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystemOverlay")
            .field("priorities", &self.layers.iter().map(|(p, _)| *p).collect::<Vec<_>>())
            .field("writable", &self.sink.is_some())
            .finish()
    }
}
