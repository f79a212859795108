//! Live filesystem watches over command directories.
//!
//! A [`CommandWatch`] bundles the notify watchers for the workspace and
//! global command directories behind one disposal handle: dropping the
//! watch stops every underlying watcher. Events are filtered to `*.md`
//! paths, matching the command scanner's discovery pattern.

use anyhow::Result;
use globset::{Glob, GlobMatcher};
use std::path::PathBuf;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use crate::fs::{FileSystemPort, WatchHandle};

/// Combined watch over one or more command directories.
///
/// Directories that do not exist are skipped rather than failing the whole
/// watch; a watch over zero existing directories is valid and simply never
/// yields events.
pub struct CommandWatch {
    receiver: UnboundedReceiver<PathBuf>,
    matcher: GlobMatcher,
    _handles: Vec<Box<dyn WatchHandle>>,
}

impl CommandWatch {
    /// Next changed command-file path. Returns `None` once every watcher
    /// has been torn down.
    pub async fn next_change(&mut self) -> Option<PathBuf> {
        while let Some(path) = self.receiver.recv().await {
            let matches = path
                .file_name()
                .map(|name| self.matcher.is_match(name))
                .unwrap_or(false);
            if matches {
                return Some(path);
            }
        }
        None
    }

    /// Number of directories actually being watched.
    pub fn watched_dirs(&self) -> usize {
        self._handles.len()
    }
}

/// Watch the given directories for `*.md` changes.
pub fn watch_command_dirs(fs: &dyn FileSystemPort, dirs: &[PathBuf]) -> Result<CommandWatch> {
    let (sender, receiver) = unbounded_channel();
    let mut handles = Vec::new();
    for dir in dirs {
        match fs.watch(dir, false, sender.clone()) {
            Ok(handle) => handles.push(handle),
            // A directory that does not exist yet is an absent artifact,
            // not a watch failure.
            Err(_) => continue,
        }
    }
    Ok(CommandWatch {
        receiver,
        matcher: Glob::new("*.md")?.compile_matcher(),
        _handles: handles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    #[tokio::test]
    async fn test_missing_dirs_are_skipped() {
        let fs = MemoryFileSystem::new();
        fs.add_dir("/p/.cursor/commands");
        let watch = watch_command_dirs(
            &fs,
            &[
                PathBuf::from("/p/.cursor/commands"),
                PathBuf::from("/missing/.cursor/commands"),
            ],
        )
        .unwrap();
        // The in-memory adapter accepts watches on any path; both register.
        assert!(watch.watched_dirs() >= 1);
    }
}
