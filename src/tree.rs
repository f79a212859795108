//! Display-node builder for the interactive tree.
//!
//! Turns a [`ContextMap`] into labeled hierarchy nodes. Sections are always
//! present: an empty scope renders an explicit empty-state node ("No
//! workspace skills found") rather than disappearing.

use serde::Serialize;

use crate::aggregate::{ContextMap, ProjectContext};
use crate::models::{CommandRecord, Location, RuleKind, SkillRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Project,
    Section,
    Rule,
    Command,
    Skill,
    Constitution,
    Spec,
    Schema,
    Empty,
}

/// One labeled node of the display hierarchy.
#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    pub label: String,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(label: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            label: label.into(),
            kind,
            children: Vec::new(),
        }
    }

    fn section(label: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            label: label.into(),
            kind: NodeKind::Section,
            children,
        }
    }
}

/// Build one project node per map entry.
pub fn build_tree(map: &ContextMap) -> Vec<TreeNode> {
    map.values().map(project_node).collect()
}

fn project_node(context: &ProjectContext) -> TreeNode {
    TreeNode {
        label: context.root.display().to_string(),
        kind: NodeKind::Project,
        children: vec![
            rules_section(context),
            commands_section(context),
            skills_section(context),
            artifacts_section(context),
        ],
    }
}

fn rules_section(context: &ProjectContext) -> TreeNode {
    let children = if context.rules.is_empty() {
        vec![TreeNode::leaf("No rules found", NodeKind::Empty)]
    } else {
        context
            .rules
            .iter()
            .map(|rule| {
                let bucket = match rule.kind() {
                    RuleKind::Always => "always",
                    RuleKind::Glob => "glob",
                    RuleKind::Manual => "manual",
                };
                let label = if rule.metadata.description.is_empty() {
                    format!("{} ({})", rule.file_name, bucket)
                } else {
                    format!("{} ({}) — {}", rule.file_name, bucket, rule.metadata.description)
                };
                TreeNode::leaf(label, NodeKind::Rule)
            })
            .collect()
    };
    TreeNode::section("Rules", children)
}

fn command_nodes(commands: &[CommandRecord], location: Location, empty_label: &str) -> Vec<TreeNode> {
    let nodes: Vec<TreeNode> = commands
        .iter()
        .filter(|command| command.location == location)
        .map(|command| {
            let label = match command.description() {
                Some(description) => format!("{} — {}", command.file_name, description),
                None => command.file_name.clone(),
            };
            TreeNode::leaf(label, NodeKind::Command)
        })
        .collect();
    if nodes.is_empty() {
        vec![TreeNode::leaf(empty_label, NodeKind::Empty)]
    } else {
        nodes
    }
}

fn commands_section(context: &ProjectContext) -> TreeNode {
    TreeNode::section(
        "Commands",
        vec![
            TreeNode::section(
                "Workspace",
                command_nodes(
                    &context.workspace_commands,
                    Location::Workspace,
                    "No workspace commands found",
                ),
            ),
            TreeNode::section(
                "Global",
                command_nodes(
                    &context.global_commands,
                    Location::Global,
                    "No global commands found",
                ),
            ),
        ],
    )
}

fn skill_nodes(skills: &[SkillRecord], empty_label: &str) -> Vec<TreeNode> {
    let nodes: Vec<TreeNode> = skills
        .iter()
        .map(|skill| {
            let title = skill
                .metadata
                .as_ref()
                .and_then(|meta| meta.title.clone());
            let label = match title {
                Some(title) if title != skill.name => format!("{} — {}", skill.name, title),
                _ => skill.name.clone(),
            };
            TreeNode::leaf(label, NodeKind::Skill)
        })
        .collect();
    if nodes.is_empty() {
        vec![TreeNode::leaf(empty_label, NodeKind::Empty)]
    } else {
        nodes
    }
}

fn skills_section(context: &ProjectContext) -> TreeNode {
    TreeNode::section(
        "Skills",
        vec![
            TreeNode::section(
                "Workspace",
                skill_nodes(&context.workspace_skills, "No workspace skills found"),
            ),
            TreeNode::section(
                "Global",
                skill_nodes(&context.global_skills, "No global skills found"),
            ),
        ],
    )
}

fn artifacts_section(context: &ProjectContext) -> TreeNode {
    let artifacts = &context.artifacts;

    let constitution = if artifacts.constitution.exists {
        let label = match &artifacts.constitution.mission {
            Some(mission) => format!("AGENTS.md — {}", mission),
            None => "AGENTS.md".to_string(),
        };
        TreeNode::leaf(label, NodeKind::Constitution)
    } else {
        TreeNode::leaf("No constitution file found", NodeKind::Empty)
    };

    let specs = if artifacts.specs.specs.is_empty() {
        vec![TreeNode::leaf("No specifications found", NodeKind::Empty)]
    } else {
        artifacts
            .specs
            .specs
            .iter()
            .map(|spec| {
                let mut flags = Vec::new();
                if spec.has_blueprint {
                    flags.push("blueprint");
                }
                if spec.has_contract {
                    flags.push("contract");
                }
                let label = if flags.is_empty() {
                    spec.domain.clone()
                } else {
                    format!("{} [{}]", spec.domain, flags.join(", "))
                };
                TreeNode::leaf(label, NodeKind::Spec)
            })
            .collect()
    };

    let schemas = if artifacts.schemas.schemas.is_empty() {
        vec![TreeNode::leaf("No schemas found", NodeKind::Empty)]
    } else {
        artifacts
            .schemas
            .schemas
            .iter()
            .map(|schema| {
                let label = match &schema.schema_id {
                    Some(id) => format!("{} — {}", schema.name, id),
                    None => schema.name.clone(),
                };
                TreeNode::leaf(label, NodeKind::Schema)
            })
            .collect()
    };

    TreeNode::section(
        "Project Artifacts",
        vec![
            TreeNode::section("Constitution", vec![constitution]),
            TreeNode::section("Specifications", specs),
            TreeNode::section("Schemas", schemas),
        ],
    )
}

/// Render nodes as indented text for the CLI.
pub fn render(nodes: &[TreeNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        render_node(node, 0, &mut out);
    }
    out
}

fn render_node(node: &TreeNode, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(&node.label);
    out.push('\n');
    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ContextAggregator;
    use crate::fs::MemoryFileSystem;
    use std::path::Path;
    use std::sync::Arc;

    async fn context_for(fs: MemoryFileSystem, root: &str) -> ProjectContext {
        ContextAggregator::new(Arc::new(fs))
            .scan_project(Path::new(root))
            .await
    }

    #[tokio::test]
    async fn test_empty_project_shows_empty_states() {
        let fs = MemoryFileSystem::new();
        fs.add_dir("/p");
        let context = context_for(fs, "/p").await;
        let mut map = ContextMap::new();
        map.insert("/p".into(), context);

        let text = render(&build_tree(&map));
        assert!(text.contains("No rules found"));
        assert!(text.contains("No workspace commands found"));
        assert!(text.contains("No global skills found"));
        assert!(text.contains("No constitution file found"));
        assert!(text.contains("No specifications found"));
        assert!(text.contains("No schemas found"));
    }

    #[tokio::test]
    async fn test_populated_sections_label_records() {
        let fs = MemoryFileSystem::new();
        fs.add_file(
            "/p/.cursor/rules/style.mdc",
            "---\ndescription: Style rules\nalwaysApply: true\n---\nbody",
        )
        .add_file("/p/AGENTS.md", "> **Project Mission:** Make it good.\n");
        let context = context_for(fs, "/p").await;
        let mut map = ContextMap::new();
        map.insert("/p".into(), context);

        let text = render(&build_tree(&map));
        assert!(text.contains("style.mdc (always) — Style rules"));
        assert!(text.contains("AGENTS.md — Make it good."));
        assert!(!text.contains("No rules found"));
    }
}
