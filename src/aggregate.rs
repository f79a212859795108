//! Per-project orchestration.
//!
//! The [`ContextAggregator`] owns one instance of each scanner behind a
//! shared [`FileSystemPort`] and fans out concurrently: the four scans of a
//! single project run under one `tokio::join!`, and multiple projects run
//! as independent tasks. Global commands and skills are scanned once per
//! refresh and shared by reference across every project entry.
//!
//! Nothing is cached between calls; every invocation re-scans from disk.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::fs::FileSystemPort;
use crate::models::{CommandRecord, FileBody, ProjectArtifacts, RuleRecord, SkillRecord};
use crate::scanner_artifacts::ProjectArtifactScanner;
use crate::scanner_commands::CommandScanner;
use crate::scanner_rules::RuleScanner;
use crate::scanner_skills::SkillScanner;

/// Everything scanned for one project root, plus the shared global slices.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectContext {
    pub root: PathBuf,
    pub rules: Vec<RuleRecord>,
    pub workspace_commands: Vec<CommandRecord>,
    pub global_commands: Arc<Vec<CommandRecord>>,
    pub workspace_skills: Vec<SkillRecord>,
    pub global_skills: Arc<Vec<SkillRecord>>,
    pub artifacts: ProjectArtifacts,
}

impl ProjectContext {
    /// All-empty placeholder used when a project's scan fails outright.
    pub fn empty(root: PathBuf) -> Self {
        Self {
            root,
            rules: Vec::new(),
            workspace_commands: Vec::new(),
            global_commands: Arc::new(Vec::new()),
            workspace_skills: Vec::new(),
            global_skills: Arc::new(Vec::new()),
            artifacts: ProjectArtifacts::default(),
        }
    }

    /// Workspace commands followed by global ones.
    pub fn all_commands(&self) -> impl Iterator<Item = &CommandRecord> {
        self.workspace_commands
            .iter()
            .chain(self.global_commands.iter())
    }

    /// Workspace skills followed by global ones.
    pub fn all_skills(&self) -> impl Iterator<Item = &SkillRecord> {
        self.workspace_skills
            .iter()
            .chain(self.global_skills.iter())
    }
}

/// Map from project identity (root path, as displayed) to its scan result.
pub type ContextMap = BTreeMap<String, ProjectContext>;

/// Explicitly constructed scanning session: one filesystem port, one
/// instance of each scanner, no module-level state.
#[derive(Clone)]
pub struct ContextAggregator {
    fs: Arc<dyn FileSystemPort>,
    rules: Arc<RuleScanner>,
    commands: Arc<CommandScanner>,
    skills: Arc<SkillScanner>,
    artifacts: Arc<ProjectArtifactScanner>,
}

impl ContextAggregator {
    pub fn new(fs: Arc<dyn FileSystemPort>) -> Self {
        Self {
            rules: Arc::new(RuleScanner::new(fs.clone())),
            commands: Arc::new(CommandScanner::new(fs.clone())),
            skills: Arc::new(SkillScanner::new(fs.clone())),
            artifacts: Arc::new(ProjectArtifactScanner::new(fs.clone())),
            fs,
        }
    }

    /// On-demand read of a discovered artifact path, for consumers serving
    /// bodies the scan does not retain. Failures degrade to the read-error
    /// body like any scanner read.
    pub async fn read_artifact(&self, path: &Path) -> FileBody {
        match self.fs.read_to_string(path).await {
            Ok(text) => FileBody::Ok(text),
            Err(e) => {
                eprintln!("Warning: could not read {}: {}", path.display(), e);
                FileBody::ReadError
            }
        }
    }

    pub fn rule_scanner(&self) -> &RuleScanner {
        &self.rules
    }

    pub fn command_scanner(&self) -> &CommandScanner {
        &self.commands
    }

    /// Scan one project root, sharing previously scanned global slices.
    pub async fn scan_project_with_globals(
        &self,
        root: &Path,
        global_commands: Arc<Vec<CommandRecord>>,
        global_skills: Arc<Vec<SkillRecord>>,
    ) -> ProjectContext {
        let (rules, workspace_commands, workspace_skills, artifacts) = tokio::join!(
            self.rules.scan(root),
            self.commands.scan_workspace(root),
            self.skills.scan_workspace(root),
            self.artifacts.scan_all(root),
        );
        ProjectContext {
            root: root.to_path_buf(),
            rules,
            workspace_commands,
            global_commands,
            workspace_skills,
            global_skills,
            artifacts,
        }
    }

    /// Scan one project root, including a fresh global scan.
    pub async fn scan_project(&self, root: &Path) -> ProjectContext {
        let (global_commands, global_skills) =
            tokio::join!(self.commands.scan_global(), self.skills.scan_global());
        self.scan_project_with_globals(root, Arc::new(global_commands), Arc::new(global_skills))
            .await
    }

    /// Scan every project root into one map.
    ///
    /// Global scopes are scanned exactly once and shared by reference. Each
    /// project runs as its own task; a project whose task fails is entered
    /// as an all-empty placeholder and the rest are unaffected.
    pub async fn scan_projects(&self, roots: &[PathBuf]) -> ContextMap {
        let (global_commands, global_skills) =
            tokio::join!(self.commands.scan_global(), self.skills.scan_global());
        let global_commands = Arc::new(global_commands);
        let global_skills = Arc::new(global_skills);

        let mut tasks = Vec::with_capacity(roots.len());
        for root in roots {
            let aggregator = self.clone();
            let root = root.clone();
            let commands = global_commands.clone();
            let skills = global_skills.clone();
            tasks.push((
                root.clone(),
                tokio::spawn(async move {
                    aggregator
                        .scan_project_with_globals(&root, commands, skills)
                        .await
                }),
            ));
        }

        let mut map = ContextMap::new();
        for (root, task) in tasks {
            let key = root.display().to_string();
            let context = match task.await {
                Ok(context) => context,
                Err(e) => {
                    eprintln!("Warning: scan of project {} failed: {}", key, e);
                    ProjectContext::empty(root)
                }
            };
            map.insert(key, context);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::models::Location;

    fn fixture() -> Arc<MemoryFileSystem> {
        let fs = MemoryFileSystem::new();
        fs.add_file(
            "/p/.cursor/rules/style.mdc",
            "---\ndescription: Style rules\nalwaysApply: true\n---\nUse rustfmt.\n",
        )
        .add_file("/p/.cursor/commands/deploy.md", "# Deploy\n\nShip it.\n")
        .add_file("/p/.cursor/skills/review/SKILL.md", "# Review\n")
        .add_file("/p/AGENTS.md", "# Acme\n")
        .add_dir("/q");
        Arc::new(fs)
    }

    #[tokio::test]
    async fn test_scan_project_merges_all_scanners() {
        let aggregator = ContextAggregator::new(fixture());
        let context = aggregator.scan_project(Path::new("/p")).await;

        assert_eq!(context.rules.len(), 1);
        assert_eq!(context.workspace_commands.len(), 1);
        assert_eq!(context.workspace_skills.len(), 1);
        assert!(context.artifacts.constitution.exists);
        assert!(context.artifacts.has_any_artifacts);
    }

    #[tokio::test]
    async fn test_empty_workspace_yields_empty_context() {
        let aggregator = ContextAggregator::new(fixture());
        let context = aggregator.scan_project(Path::new("/q")).await;

        assert!(context.rules.is_empty());
        assert!(context.workspace_commands.is_empty());
        assert!(context.workspace_skills.is_empty());
        assert!(!context.artifacts.has_any_artifacts);
    }

    #[tokio::test]
    async fn test_scan_projects_shares_globals_by_reference() {
        let aggregator = ContextAggregator::new(fixture());
        let map = aggregator
            .scan_projects(&[PathBuf::from("/p"), PathBuf::from("/q")])
            .await;

        assert_eq!(map.len(), 2);
        let p = &map["/p"];
        let q = &map["/q"];
        assert!(Arc::ptr_eq(&p.global_commands, &q.global_commands));
        assert!(Arc::ptr_eq(&p.global_skills, &q.global_skills));
    }

    #[tokio::test]
    async fn test_idempotent_rescan() {
        let aggregator = ContextAggregator::new(fixture());
        let first = aggregator.scan_project(Path::new("/p")).await;
        let second = aggregator.scan_project(Path::new("/p")).await;
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_read_artifact_degrades_on_failure() {
        let aggregator = ContextAggregator::new(fixture());
        let body = aggregator.read_artifact(Path::new("/p/AGENTS.md")).await;
        assert_eq!(body, FileBody::Ok("# Acme\n".into()));
        let body = aggregator.read_artifact(Path::new("/p/missing.md")).await;
        assert!(body.is_read_error());
    }

    #[tokio::test]
    async fn test_all_commands_order() {
        let fs = fixture();
        let aggregator = ContextAggregator::new(fs);
        let mut context = aggregator.scan_project(Path::new("/p")).await;
        context.global_commands = Arc::new(vec![CommandRecord {
            file_name: "global.md".into(),
            path: PathBuf::from("/home/u/.cursor/commands/global.md"),
            location: Location::Global,
            content: crate::models::FileBody::Ok(String::new()),
        }]);
        let locations: Vec<Location> = context.all_commands().map(|c| c.location).collect();
        assert_eq!(locations, vec![Location::Workspace, Location::Global]);
    }
}
