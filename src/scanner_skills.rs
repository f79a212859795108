//! Skill scanner.
//!
//! A skill is a `SKILL.md` file inside a subdirectory of `.cursor/skills/`
//! (workspace scope) or `~/.cursor/skills/` (global scope). The record is
//! named after the containing directory, not the file. Subdirectories
//! without a `SKILL.md` are silently skipped.
//!
//! Metadata precedence: structured YAML frontmatter when it carries any
//! keys, then a title derived from the first `#` heading, then nothing.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use crate::fs::{home_dir, EntryKind, FileSystemPort};
use crate::markdown::{first_h1_title, split_frontmatter};
use crate::models::{FileBody, Location, SkillMetadata, SkillRecord};

/// Skills live under this fixed directory (project root or `~`).
pub const SKILLS_DIR: &str = ".cursor/skills";

/// The well-known file name looked for inside each skill directory.
pub const SKILL_FILE: &str = "SKILL.md";

/// Recognized frontmatter keys; anything else is dropped.
#[derive(Debug, Default, Deserialize)]
struct SkillFrontmatter {
    title: Option<String>,
    overview: Option<String>,
    #[serde(default)]
    prerequisites: Vec<String>,
    #[serde(default)]
    steps: Vec<String>,
    #[serde(default)]
    tools: Vec<String>,
    guidance: Option<serde_yaml::Value>,
}

pub struct SkillScanner {
    fs: Arc<dyn FileSystemPort>,
}

impl SkillScanner {
    pub fn new(fs: Arc<dyn FileSystemPort>) -> Self {
        Self { fs }
    }

    /// Scan a project's `.cursor/skills/` subdirectories.
    pub async fn scan_workspace(&self, project_root: &Path) -> Vec<SkillRecord> {
        self.scan_dir(&project_root.join(SKILLS_DIR), Location::Workspace)
            .await
    }

    /// Scan the invoking user's `~/.cursor/skills/` subdirectories.
    pub async fn scan_global(&self) -> Vec<SkillRecord> {
        match home_dir() {
            Some(home) => {
                self.scan_dir(&home.join(SKILLS_DIR), Location::Global)
                    .await
            }
            None => Vec::new(),
        }
    }

    async fn scan_dir(&self, parent: &Path, location: Location) -> Vec<SkillRecord> {
        // Missing directory is the canonical empty case, not worth logging.
        match self.fs.stat(parent).await {
            Ok(stat) if stat.is_dir => {}
            _ => return Vec::new(),
        }
        let entries = match self.fs.list_dir(parent).await {
            Ok(entries) => entries,
            Err(e) => {
                eprintln!("Warning: failed to list {}: {}", parent.display(), e);
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for entry in entries {
            if entry.kind != EntryKind::Dir {
                continue;
            }
            let skill_path = entry.path.join(SKILL_FILE);
            // No SKILL.md: not an error, not a placeholder.
            let Ok(stat) = self.fs.stat(&skill_path).await else {
                continue;
            };
            if !stat.is_file {
                continue;
            }
            let record = match self.fs.read_to_string(&skill_path).await {
                Ok(text) => SkillRecord {
                    name: entry.name,
                    path: skill_path,
                    location,
                    metadata: parse_skill_metadata(&text),
                    content: FileBody::Ok(text),
                },
                Err(_) => SkillRecord {
                    name: entry.name,
                    path: skill_path,
                    location,
                    metadata: None,
                    content: FileBody::ReadError,
                },
            };
            records.push(record);
        }
        records
    }
}

/// Parse skill metadata with the documented precedence.
fn parse_skill_metadata(text: &str) -> Option<SkillMetadata> {
    if let Some((front, _body)) = split_frontmatter(text) {
        if let Ok(serde_yaml::Value::Mapping(mapping)) =
            serde_yaml::from_str::<serde_yaml::Value>(front)
        {
            if !mapping.is_empty() {
                let parsed: SkillFrontmatter =
                    serde_yaml::from_value(serde_yaml::Value::Mapping(mapping))
                        .unwrap_or_default();
                return Some(SkillMetadata {
                    title: parsed.title,
                    overview: parsed.overview,
                    prerequisites: parsed.prerequisites,
                    steps: parsed.steps,
                    tools: parsed.tools,
                    guidance: parsed
                        .guidance
                        .and_then(|value| serde_json::to_value(value).ok()),
                });
            }
        }
    }

    // Fallback: title from the first top-level heading.
    first_h1_title(text).map(|title| SkillMetadata {
        title: Some(title),
        ..SkillMetadata::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::models::READ_ERROR_CONTENT;

    fn scanner(fs: MemoryFileSystem) -> SkillScanner {
        SkillScanner::new(Arc::new(fs))
    }

    #[tokio::test]
    async fn test_skill_named_after_directory() {
        let fs = MemoryFileSystem::new();
        fs.add_file(
            "/p/.cursor/skills/code-review/SKILL.md",
            "---\ntitle: Code Review\noverview: Review changes carefully\nsteps:\n  - Read the diff\n  - Leave comments\n---\nBody\n",
        );
        let skills = scanner(fs).scan_workspace(Path::new("/p")).await;
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].name, "code-review");
        let meta = skills[0].metadata.as_ref().unwrap();
        assert_eq!(meta.title.as_deref(), Some("Code Review"));
        assert_eq!(meta.steps, vec!["Read the diff", "Leave comments"]);
    }

    #[tokio::test]
    async fn test_subdir_without_skill_file_skipped() {
        let fs = MemoryFileSystem::new();
        fs.add_dir("/p/.cursor/skills/empty-dir")
            .add_file("/p/.cursor/skills/real/SKILL.md", "# Real Skill\n");
        let skills = scanner(fs).scan_workspace(Path::new("/p")).await;
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].name, "real");
    }

    #[tokio::test]
    async fn test_heading_title_fallback() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/p/.cursor/skills/tidy/SKILL.md", "# Tidy Up\n\nSweep.\n");
        let skills = scanner(fs).scan_workspace(Path::new("/p")).await;
        let meta = skills[0].metadata.as_ref().unwrap();
        assert_eq!(meta.title.as_deref(), Some("Tidy Up"));
        assert!(meta.overview.is_none());
    }

    #[tokio::test]
    async fn test_no_frontmatter_no_heading_no_metadata() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/p/.cursor/skills/bare/SKILL.md", "just prose\n");
        let skills = scanner(fs).scan_workspace(Path::new("/p")).await;
        assert!(skills[0].metadata.is_none());
    }

    #[tokio::test]
    async fn test_unrecognized_keys_dropped_guidance_kept() {
        let fs = MemoryFileSystem::new();
        fs.add_file(
            "/p/.cursor/skills/g/SKILL.md",
            "---\ntitle: G\nfavorite_color: blue\nguidance:\n  tone: strict\n---\n",
        );
        let skills = scanner(fs).scan_workspace(Path::new("/p")).await;
        let meta = skills[0].metadata.as_ref().unwrap();
        assert_eq!(meta.title.as_deref(), Some("G"));
        assert_eq!(
            meta.guidance,
            Some(serde_json::json!({ "tone": "strict" }))
        );
    }

    #[tokio::test]
    async fn test_read_failure_placeholder_keyed_by_dir() {
        let fs = MemoryFileSystem::new();
        fs.add_unreadable_file("/p/.cursor/skills/locked/SKILL.md");
        let skills = scanner(fs).scan_workspace(Path::new("/p")).await;
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].name, "locked");
        assert_eq!(skills[0].content.text(), READ_ERROR_CONTENT);
        assert!(skills[0].metadata.is_none());
    }

    #[tokio::test]
    async fn test_missing_skills_dir_is_empty() {
        let fs = MemoryFileSystem::new();
        fs.add_dir("/p");
        assert!(scanner(fs).scan_workspace(Path::new("/p")).await.is_empty());
    }
}
