//! Filesystem access boundary.
//!
//! Every scanner performs its I/O through [`FileSystemPort`], a narrow
//! read/list/stat/watch interface with two adapters: [`RealFileSystem`]
//! backed by `tokio::fs` and `notify`, and [`MemoryFileSystem`] for tests.
//! Scanners hold no mutable state and may be invoked concurrently for
//! different project roots.

use anyhow::{Context, Result};
use async_trait::async_trait;
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use tokio::sync::mpsc::UnboundedSender;

/// What kind of entry a directory listing returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Other,
}

/// One entry of a directory listing.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Minimal stat result used by the scanners.
#[derive(Debug, Clone, Copy)]
pub struct FileStat {
    pub is_file: bool,
    pub is_dir: bool,
    pub modified: Option<SystemTime>,
}

/// Live filesystem watch. Dropping the handle stops the watch.
pub trait WatchHandle: Send {}

/// Narrow filesystem interface the scanners depend on.
///
/// Directory listings are returned in the underlying enumeration order;
/// callers must not assume any particular sort.
#[async_trait]
pub trait FileSystemPort: Send + Sync {
    async fn read_to_string(&self, path: &Path) -> Result<String>;
    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;
    async fn stat(&self, path: &Path) -> Result<FileStat>;

    /// Write a new file, used only by the rule create flow.
    async fn write_file(&self, path: &Path, contents: &str) -> Result<()>;
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Watch a directory for changes, delivering changed paths on `events`.
    fn watch(
        &self,
        path: &Path,
        recursive: bool,
        events: UnboundedSender<PathBuf>,
    ) -> Result<Box<dyn WatchHandle>>;
}

/// Recursively enumerate all regular files under `root`, in enumeration
/// order (parents before children). Errors from the initial listing
/// propagate; per-subdirectory listing errors are skipped.
pub async fn walk_files(fs: &dyn FileSystemPort, root: &Path) -> Result<Vec<DirEntry>> {
    let mut files = Vec::new();
    let mut queue = vec![root.to_path_buf()];
    let mut first = true;
    while let Some(dir) = queue.pop() {
        let entries = match fs.list_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if first => return Err(e),
            Err(_) => continue,
        };
        first = false;
        for entry in entries {
            match entry.kind {
                EntryKind::File => files.push(entry),
                EntryKind::Dir => queue.push(entry.path),
                EntryKind::Other => {}
            }
        }
    }
    Ok(files)
}

/// Expand the invoking user's home directory.
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

// ═══════════════════════════════════════════════════════════════════════
// Real adapter
// ═══════════════════════════════════════════════════════════════════════

/// Production adapter over `tokio::fs` and a `notify` watcher.
#[derive(Debug, Default, Clone)]
pub struct RealFileSystem;

#[async_trait]
impl FileSystemPort for RealFileSystem {
    async fn read_to_string(&self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let mut rd = tokio::fs::read_dir(path)
            .await
            .with_context(|| format!("Failed to list {}", path.display()))?;
        let mut entries = Vec::new();
        while let Some(entry) = rd.next_entry().await? {
            let file_type = entry.file_type().await?;
            let kind = if file_type.is_file() {
                EntryKind::File
            } else if file_type.is_dir() {
                EntryKind::Dir
            } else {
                EntryKind::Other
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                path: entry.path(),
                kind,
            });
        }
        Ok(entries)
    }

    async fn stat(&self, path: &Path) -> Result<FileStat> {
        let meta = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        Ok(FileStat {
            is_file: meta.is_file(),
            is_dir: meta.is_dir(),
            modified: meta.modified().ok(),
        })
    }

    async fn write_file(&self, path: &Path, contents: &str) -> Result<()> {
        tokio::fs::write(path, contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))
    }

    fn watch(
        &self,
        path: &Path,
        recursive: bool,
        events: UnboundedSender<PathBuf>,
    ) -> Result<Box<dyn WatchHandle>> {
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                if let Ok(event) = res {
                    for changed in event.paths {
                        let _ = events.send(changed);
                    }
                }
            },
            NotifyConfig::default(),
        )?;
        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(path, mode)
            .with_context(|| format!("Failed to watch {}", path.display()))?;
        Ok(Box::new(NotifyHandle { _watcher: watcher }))
    }
}

/// Keeps the notify watcher alive; dropping it stops event delivery.
struct NotifyHandle {
    _watcher: RecommendedWatcher,
}

impl WatchHandle for NotifyHandle {}

// ═══════════════════════════════════════════════════════════════════════
// In-memory adapter
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
    unreadable_files: BTreeSet<PathBuf>,
    denied_dirs: BTreeSet<PathBuf>,
}

/// In-memory filesystem for tests. Populate with [`MemoryFileSystem::add_file`]
/// and friends, then hand it to the scanners behind an `Arc`.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    state: Mutex<MemoryState>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file, implicitly creating its ancestor directories.
    pub fn add_file(&self, path: impl Into<PathBuf>, contents: impl Into<String>) -> &Self {
        let path = path.into();
        let mut state = self.state.lock().unwrap();
        add_ancestors(&mut state.dirs, &path);
        state.files.insert(path, contents.into());
        self
    }

    /// Register an empty directory.
    pub fn add_dir(&self, path: impl Into<PathBuf>) -> &Self {
        let path = path.into();
        let mut state = self.state.lock().unwrap();
        add_ancestors(&mut state.dirs, &path);
        state.dirs.insert(path);
        self
    }

    /// Make a file discoverable but fail on read, simulating a permission
    /// error on the file itself.
    pub fn add_unreadable_file(&self, path: impl Into<PathBuf>) -> &Self {
        let path = path.into();
        let mut state = self.state.lock().unwrap();
        add_ancestors(&mut state.dirs, &path);
        state.files.insert(path.clone(), String::new());
        state.unreadable_files.insert(path);
        self
    }

    /// Make a directory fail on listing, simulating a permission error on
    /// the directory.
    pub fn deny_dir(&self, path: impl Into<PathBuf>) -> &Self {
        let path = path.into();
        let mut state = self.state.lock().unwrap();
        add_ancestors(&mut state.dirs, &path);
        state.dirs.insert(path.clone());
        state.denied_dirs.insert(path);
        self
    }
}

fn add_ancestors(dirs: &mut BTreeSet<PathBuf>, path: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir.as_os_str().is_empty() {
            break;
        }
        dirs.insert(dir.to_path_buf());
        current = dir.parent();
    }
}

#[async_trait]
impl FileSystemPort for MemoryFileSystem {
    async fn read_to_string(&self, path: &Path) -> Result<String> {
        let state = self.state.lock().unwrap();
        if state.unreadable_files.contains(path) {
            anyhow::bail!("permission denied: {}", path.display());
        }
        state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such file: {}", path.display()))
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let state = self.state.lock().unwrap();
        if state.denied_dirs.contains(path) {
            anyhow::bail!("permission denied: {}", path.display());
        }
        if !state.dirs.contains(path) {
            anyhow::bail!("no such directory: {}", path.display());
        }
        let mut entries = Vec::new();
        for dir in &state.dirs {
            if dir.parent() == Some(path) {
                entries.push(DirEntry {
                    name: dir
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default(),
                    path: dir.clone(),
                    kind: EntryKind::Dir,
                });
            }
        }
        for file in state.files.keys() {
            if file.parent() == Some(path) {
                entries.push(DirEntry {
                    name: file
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default(),
                    path: file.clone(),
                    kind: EntryKind::File,
                });
            }
        }
        Ok(entries)
    }

    async fn stat(&self, path: &Path) -> Result<FileStat> {
        let state = self.state.lock().unwrap();
        if state.files.contains_key(path) {
            return Ok(FileStat {
                is_file: true,
                is_dir: false,
                modified: None,
            });
        }
        if state.dirs.contains(path) {
            return Ok(FileStat {
                is_file: false,
                is_dir: true,
                modified: None,
            });
        }
        anyhow::bail!("no such path: {}", path.display())
    }

    async fn write_file(&self, path: &Path, contents: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        add_ancestors(&mut state.dirs, path);
        state.files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        add_ancestors(&mut state.dirs, path);
        state.dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn watch(
        &self,
        _path: &Path,
        _recursive: bool,
        _events: UnboundedSender<PathBuf>,
    ) -> Result<Box<dyn WatchHandle>> {
        Ok(Box::new(NoopHandle))
    }
}

struct NoopHandle;

impl WatchHandle for NoopHandle {}
