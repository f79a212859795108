//! Rule scanner.
//!
//! Discovers `.mdc`/`.md` files under `.cursor/rules/` (recursively), parses
//! each file's `---`-delimited frontmatter into [`RuleMetadata`], and returns
//! one [`RuleRecord`] per discovered file. A file that fails to read is
//! represented by a placeholder record, never dropped; a missing or
//! unlistable rules directory yields an empty result, never an error.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::fs::{walk_files, FileSystemPort};
use crate::markdown::split_frontmatter;
use crate::models::{FileBody, RuleMetadata, RuleRecord};

/// Rules live in this fixed directory under a project root.
pub const RULES_DIR: &str = ".cursor/rules";

const RULE_PATTERNS: &[&str] = &["*.mdc", "*.md"];

pub struct RuleScanner {
    fs: Arc<dyn FileSystemPort>,
}

impl RuleScanner {
    pub fn new(fs: Arc<dyn FileSystemPort>) -> Self {
        Self { fs }
    }

    /// Scan a project root for rule files, in filesystem enumeration order.
    pub async fn scan(&self, project_root: &Path) -> Vec<RuleRecord> {
        let rules_dir = project_root.join(RULES_DIR);
        match self.fs.stat(&rules_dir).await {
            Ok(stat) if stat.is_dir => {}
            // Artifact-absent: canonical empty result.
            _ => return Vec::new(),
        }

        let matcher = rule_matcher();
        let files = match walk_files(self.fs.as_ref(), &rules_dir).await {
            Ok(files) => files,
            Err(e) => {
                eprintln!("Warning: could not enumerate {}: {}", rules_dir.display(), e);
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for entry in files {
            if !matcher.is_match(&entry.name) {
                continue;
            }
            let record = match self.fs.read_to_string(&entry.path).await {
                Ok(text) => parse_rule(entry.name, entry.path, &text),
                Err(_) => RuleRecord::placeholder(entry.name, entry.path),
            };
            records.push(record);
        }
        records
    }

    /// Create a new rule file for the editor-facing create flow.
    ///
    /// Writes `.cursor/rules/<name>.mdc` with a frontmatter template,
    /// creating the directory if needed. Refuses to overwrite.
    pub async fn create_rule(
        &self,
        project_root: &Path,
        name: &str,
        options: &NewRuleOptions,
    ) -> Result<PathBuf> {
        let file_name = if Path::new(name).extension().is_some() {
            name.to_string()
        } else {
            format!("{}.mdc", name)
        };
        let rules_dir = project_root.join(RULES_DIR);
        let path = rules_dir.join(&file_name);

        if self.fs.stat(&path).await.is_ok() {
            anyhow::bail!("rule already exists: {}", path.display());
        }

        self.fs.create_dir_all(&rules_dir).await?;
        self.fs
            .write_file(&path, &options.render(name))
            .await?;
        Ok(path)
    }
}

/// Options for [`RuleScanner::create_rule`].
#[derive(Debug, Default)]
pub struct NewRuleOptions {
    pub description: Option<String>,
    pub globs: Vec<String>,
    pub always_apply: bool,
}

impl NewRuleOptions {
    fn render(&self, name: &str) -> String {
        let mut out = String::from("---\n");
        out.push_str(&format!(
            "description: {}\n",
            self.description.as_deref().unwrap_or("")
        ));
        if !self.globs.is_empty() {
            out.push_str(&format!("globs: [{}]\n", self.globs.join(", ")));
        }
        out.push_str(&format!("alwaysApply: {}\n", self.always_apply));
        out.push_str("---\n\n");
        out.push_str(&format!("# {}\n", name));
        out
    }
}

fn rule_matcher() -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in RULE_PATTERNS {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
}

/// Parse a rule file into a record. A file without frontmatter yields
/// default metadata and its full text as content.
fn parse_rule(file_name: String, path: PathBuf, text: &str) -> RuleRecord {
    let (metadata, body) = match split_frontmatter(text) {
        Some((front, body)) => (parse_rule_frontmatter(front), body),
        None => (RuleMetadata::default(), text),
    };
    RuleRecord {
        file_name,
        path,
        metadata,
        content: FileBody::Ok(body.to_string()),
    }
}

/// Line-oriented `key: value` parse of the rule frontmatter block.
///
/// This format is close to YAML but not valid YAML (`globs: [*.ts]` would be
/// an alias error), so it is parsed directly.
fn parse_rule_frontmatter(front: &str) -> RuleMetadata {
    let mut metadata = RuleMetadata::default();
    for line in front.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "description" => metadata.description = value.to_string(),
            "alwaysApply" => {
                if value.eq_ignore_ascii_case("true") {
                    metadata.always_apply = true;
                } else if value.eq_ignore_ascii_case("false") {
                    metadata.always_apply = false;
                }
            }
            "globs" => metadata.globs = Some(parse_glob_list(value)),
            _ => {}
        }
    }
    metadata
}

/// Parse a bracket-delimited glob list, stripping quotes from each element.
fn parse_glob_list(value: &str) -> Vec<String> {
    let inner = value
        .trim()
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .unwrap_or(value);
    inner
        .split(',')
        .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::models::{RuleKind, PARSE_ERROR_DESCRIPTION, READ_ERROR_CONTENT};

    fn scanner(fs: MemoryFileSystem) -> RuleScanner {
        RuleScanner::new(Arc::new(fs))
    }

    #[tokio::test]
    async fn test_scan_valid_rule() {
        let fs = MemoryFileSystem::new();
        fs.add_file(
            "/p/.cursor/rules/valid-rule.mdc",
            "---\ndescription: Valid rule\nglobs: [*.js, *.ts]\nalwaysApply: false\n---\nBody text\n",
        );
        let rules = scanner(fs).scan(Path::new("/p")).await;
        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert_eq!(rule.metadata.description, "Valid rule");
        assert_eq!(
            rule.metadata.globs.as_deref(),
            Some(&["*.js".to_string(), "*.ts".to_string()][..])
        );
        assert!(!rule.metadata.always_apply);
        assert_eq!(rule.kind(), RuleKind::Glob);
        assert_eq!(rule.content.text(), "Body text\n");
    }

    #[tokio::test]
    async fn test_scan_missing_dir_is_empty() {
        let fs = MemoryFileSystem::new();
        fs.add_dir("/p");
        let rules = scanner(fs).scan(Path::new("/p")).await;
        assert!(rules.is_empty());
    }

    #[tokio::test]
    async fn test_scan_recurses_and_filters_extensions() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/p/.cursor/rules/a.mdc", "alpha")
            .add_file("/p/.cursor/rules/nested/b.md", "beta")
            .add_file("/p/.cursor/rules/nested/notes.txt", "ignored");
        let rules = scanner(fs).scan(Path::new("/p")).await;
        assert_eq!(rules.len(), 2);
        assert!(rules.iter().all(|r| r.file_name != "notes.txt"));
    }

    #[tokio::test]
    async fn test_unreadable_file_becomes_placeholder() {
        let fs = MemoryFileSystem::new();
        fs.add_unreadable_file("/p/.cursor/rules/broken.mdc");
        let rules = scanner(fs).scan(Path::new("/p")).await;
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].file_name, "broken.mdc");
        assert_eq!(rules[0].metadata.description, PARSE_ERROR_DESCRIPTION);
        assert_eq!(rules[0].content.text(), READ_ERROR_CONTENT);
    }

    #[tokio::test]
    async fn test_always_apply_case_insensitive() {
        let fs = MemoryFileSystem::new();
        fs.add_file(
            "/p/.cursor/rules/a.mdc",
            "---\nalwaysApply: TRUE\n---\nbody",
        );
        let rules = scanner(fs).scan(Path::new("/p")).await;
        assert_eq!(rules[0].kind(), RuleKind::Always);
    }

    #[tokio::test]
    async fn test_no_frontmatter_defaults() {
        let fs = MemoryFileSystem::new();
        fs.add_file("/p/.cursor/rules/plain.md", "just the body");
        let rules = scanner(fs).scan(Path::new("/p")).await;
        assert_eq!(rules[0].metadata, RuleMetadata::default());
        assert_eq!(rules[0].content.text(), "just the body");
        assert_eq!(rules[0].kind(), RuleKind::Manual);
    }

    #[tokio::test]
    async fn test_quoted_globs_stripped() {
        assert_eq!(
            parse_glob_list(r#"["src/**/*.rs", '*.toml']"#),
            vec!["src/**/*.rs".to_string(), "*.toml".to_string()]
        );
        assert!(parse_glob_list("[]").is_empty());
    }

    #[tokio::test]
    async fn test_create_rule_writes_template() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.add_dir("/p");
        let scanner = RuleScanner::new(fs.clone());
        let options = NewRuleOptions {
            description: Some("My rule".into()),
            globs: vec!["*.rs".into()],
            always_apply: false,
        };
        let path = scanner
            .create_rule(Path::new("/p"), "my-rule", &options)
            .await
            .unwrap();
        assert_eq!(path, PathBuf::from("/p/.cursor/rules/my-rule.mdc"));

        let written = fs.read_to_string(&path).await.unwrap();
        assert!(written.contains("description: My rule"));
        assert!(written.contains("globs: [*.rs]"));
        assert!(written.contains("alwaysApply: false"));

        // Second create with the same name fails.
        assert!(scanner
            .create_rule(Path::new("/p"), "my-rule", &options)
            .await
            .is_err());
    }
}
