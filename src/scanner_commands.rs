//! Command scanner.
//!
//! Discovers `*.md` command files directly inside `.cursor/commands/`
//! (workspace scope) and `~/.cursor/commands/` (global scope). The listing
//! is flat, `README.md` is documentation rather than a command and is
//! excluded, and a file that fails to read is kept as a placeholder record.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::fs::{home_dir, EntryKind, FileSystemPort};
use crate::models::{CommandRecord, FileBody, Location};
use crate::watch::{watch_command_dirs, CommandWatch};

/// Commands live in this fixed directory under a project root (and under
/// `~` for the global scope).
pub const COMMANDS_DIR: &str = ".cursor/commands";

/// Reserved documentation file, never a command.
const RESERVED_README: &str = "README.md";

pub struct CommandScanner {
    fs: Arc<dyn FileSystemPort>,
}

impl CommandScanner {
    pub fn new(fs: Arc<dyn FileSystemPort>) -> Self {
        Self { fs }
    }

    /// Scan a project's `.cursor/commands/` directory.
    pub async fn scan_workspace(&self, project_root: &Path) -> Vec<CommandRecord> {
        self.scan_dir(&project_root.join(COMMANDS_DIR), Location::Workspace)
            .await
    }

    /// Scan the invoking user's `~/.cursor/commands/` directory.
    pub async fn scan_global(&self) -> Vec<CommandRecord> {
        match home_dir() {
            Some(home) => {
                self.scan_dir(&home.join(COMMANDS_DIR), Location::Global)
                    .await
            }
            None => Vec::new(),
        }
    }

    /// Watch the workspace and global command directories through one
    /// combined disposal handle.
    pub fn watch(&self, project_root: &Path) -> Result<CommandWatch> {
        let mut dirs = vec![project_root.join(COMMANDS_DIR)];
        if let Some(home) = home_dir() {
            dirs.push(home.join(COMMANDS_DIR));
        }
        watch_command_dirs(self.fs.as_ref(), &dirs)
    }

    async fn scan_dir(&self, dir: &Path, location: Location) -> Vec<CommandRecord> {
        // Missing directory is the canonical empty case, not worth logging.
        match self.fs.stat(dir).await {
            Ok(stat) if stat.is_dir => {}
            _ => return Vec::new(),
        }
        let entries = match self.fs.list_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                eprintln!("Warning: failed to list {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for entry in entries {
            if entry.kind != EntryKind::File || !is_command_file(&entry.name) {
                continue;
            }
            let content = match self.fs.read_to_string(&entry.path).await {
                Ok(text) => FileBody::Ok(text),
                Err(_) => FileBody::ReadError,
            };
            records.push(CommandRecord {
                file_name: entry.name,
                path: entry.path,
                location,
                content,
            });
        }
        records
    }
}

fn is_command_file(name: &str) -> bool {
    name != RESERVED_README && Path::new(name).extension().is_some_and(|ext| ext == "md")
}

/// Global command directory, if the home directory can be resolved.
pub fn global_commands_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(COMMANDS_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::models::READ_ERROR_CONTENT;

    fn scanner(fs: MemoryFileSystem) -> CommandScanner {
        CommandScanner::new(Arc::new(fs))
    }

    #[tokio::test]
    async fn test_readme_excluded() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/p/.cursor/commands/deploy.md", "# Deploy\n\nShip it.\n")
            .add_file("/p/.cursor/commands/README.md", "docs, not a command")
            .add_file("/p/.cursor/commands/notes.txt", "not markdown");
        let commands = scanner(fs).scan_workspace(Path::new("/p")).await;
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].file_name, "deploy.md");
        assert_eq!(commands[0].location, Location::Workspace);
    }

    #[tokio::test]
    async fn test_flat_listing_ignores_subdirs() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/p/.cursor/commands/top.md", "top")
            .add_file("/p/.cursor/commands/nested/inner.md", "inner");
        let commands = scanner(fs).scan_workspace(Path::new("/p")).await;
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].file_name, "top.md");
    }

    #[tokio::test]
    async fn test_missing_dir_is_empty() {
        let fs = MemoryFileSystem::new();
        fs.add_dir("/p");
        assert!(scanner(fs).scan_workspace(Path::new("/p")).await.is_empty());
    }

    #[tokio::test]
    async fn test_denied_dir_is_empty() {
        let fs = MemoryFileSystem::new();
        fs.deny_dir("/p/.cursor/commands");
        assert!(scanner(fs).scan_workspace(Path::new("/p")).await.is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_keeps_placeholder() {
        let fs = MemoryFileSystem::new();
        fs.add_unreadable_file("/p/.cursor/commands/flaky.md");
        let commands = scanner(fs).scan_workspace(Path::new("/p")).await;
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].file_name, "flaky.md");
        assert_eq!(commands[0].location, Location::Workspace);
        assert_eq!(commands[0].content.text(), READ_ERROR_CONTENT);
        assert!(commands[0].description().is_none());
    }

    #[tokio::test]
    async fn test_description_derived_on_demand() {
        let fs = MemoryFileSystem::new();
        fs.add_file(
            "/p/.cursor/commands/release.md",
            "# Release\n\n## Description\n\nCut a release branch.\n",
        );
        let commands = scanner(fs).scan_workspace(Path::new("/p")).await;
        assert_eq!(
            commands[0].description().as_deref(),
            Some("Cut a release branch.")
        );
    }
}
