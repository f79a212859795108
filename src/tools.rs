//! Query tools exposed to external agents.
//!
//! Each tool is a stateless named operation over a fresh scan: nothing is
//! cached between calls, so results never go stale. Tools are registered in
//! a [`ToolRegistry`] and dispatched by the HTTP server and the MCP bridge
//! through the same [`Tool`] trait.
//!
//! Every "get by name" tool matches case-insensitively and
//! extension-agnostically against the record name, falling back to a
//! substring match on the source path, and returns JSON `null` (inside the
//! normal result envelope) when nothing matches.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use crate::aggregate::{ContextAggregator, ProjectContext};
use crate::models::{CommandRecord, RuleRecord, SkillRecord};

/// A named query operation agents can discover and call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name: a lowercase identifier with underscores.
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// Whether this tool ships with the server. Defaults to `false` for
    /// custom registrations.
    fn is_builtin(&self) -> bool {
        false
    }

    /// JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute with JSON parameters (always an object).
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

/// Context bridge for tool execution: the scanning session plus the root
/// used when a call does not name a project.
pub struct ToolContext {
    aggregator: ContextAggregator,
    default_root: PathBuf,
}

impl ToolContext {
    pub fn new(aggregator: ContextAggregator, default_root: PathBuf) -> Self {
        Self {
            aggregator,
            default_root,
        }
    }

    /// The project root a call targets: its `project` parameter, or the
    /// current workspace.
    pub fn resolve_root(&self, params: &Value) -> PathBuf {
        params["project"]
            .as_str()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.default_root.clone())
    }

    /// Fresh scan of one project (workspace + global scopes).
    pub async fn scan(&self, root: &Path) -> ProjectContext {
        self.aggregator.scan_project(root).await
    }

    pub fn aggregator(&self) -> &ContextAggregator {
        &self.aggregator
    }
}

/// Schema fragment shared by every tool: the optional project path.
fn project_param_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "project": {
                "type": "string",
                "description": "Project root path; defaults to the current workspace"
            }
        }
    })
}

/// Schema for tools that also take a required name.
fn named_param_schema(what: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string", "description": format!("{} name; case-insensitive, extension optional", what) },
            "project": {
                "type": "string",
                "description": "Project root path; defaults to the current workspace"
            }
        },
        "required": ["name"]
    })
}

fn require_name(params: &Value) -> Result<&str> {
    let name = params["name"].as_str().unwrap_or("");
    if name.trim().is_empty() {
        anyhow::bail!("name must not be empty");
    }
    Ok(name)
}

/// Case-insensitive, extension-agnostic name comparison.
fn name_matches(candidate: &str, query: &str) -> bool {
    let strip = |s: &str| {
        Path::new(s)
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| s.to_lowercase())
    };
    candidate.eq_ignore_ascii_case(query) || strip(candidate) == strip(query)
}

/// Name match first, then case-insensitive substring match on the path.
fn find_by_name<'a, T>(
    items: &'a [T],
    query: &str,
    name_of: impl Fn(&T) -> &str,
    path_of: impl Fn(&T) -> &Path,
) -> Option<&'a T> {
    items
        .iter()
        .find(|item| name_matches(name_of(item), query))
        .or_else(|| {
            let needle = query.to_lowercase();
            items.iter().find(|item| {
                path_of(item)
                    .to_string_lossy()
                    .to_lowercase()
                    .contains(&needle)
            })
        })
}

fn rule_json(rule: &RuleRecord) -> Value {
    let mut value = json!(rule);
    value["kind"] = json!(rule.kind());
    value
}

fn command_json(command: &CommandRecord) -> Value {
    let mut value = json!(command);
    value["description"] = json!(command.description());
    value
}

fn skill_json(skill: &SkillRecord) -> Value {
    json!(skill)
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in tools
// ═══════════════════════════════════════════════════════════════════════

pub struct ListRulesTool;

#[async_trait]
impl Tool for ListRulesTool {
    fn name(&self) -> &str {
        "list_rules"
    }

    fn description(&self) -> &str {
        "List rule files with their metadata and activation kind"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        project_param_schema()
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let root = ctx.resolve_root(&params);
        let context = ctx.scan(&root).await;
        Ok(json!({ "rules": context.rules.iter().map(rule_json).collect::<Vec<_>>() }))
    }
}

pub struct GetRuleTool;

#[async_trait]
impl Tool for GetRuleTool {
    fn name(&self) -> &str {
        "get_rule"
    }

    fn description(&self) -> &str {
        "Get one rule by name, including its full content"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        named_param_schema("Rule")
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let name = require_name(&params)?;
        let root = ctx.resolve_root(&params);
        let context = ctx.scan(&root).await;
        let found = find_by_name(&context.rules, name, |r| &r.file_name, |r| &r.path);
        Ok(json!({ "rule": found.map(rule_json) }))
    }
}

pub struct ListCommandsTool;

#[async_trait]
impl Tool for ListCommandsTool {
    fn name(&self) -> &str {
        "list_commands"
    }

    fn description(&self) -> &str {
        "List workspace and global command files"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        project_param_schema()
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let root = ctx.resolve_root(&params);
        let context = ctx.scan(&root).await;
        let commands: Vec<Value> = context.all_commands().map(command_json).collect();
        Ok(json!({ "commands": commands }))
    }
}

pub struct GetCommandTool;

#[async_trait]
impl Tool for GetCommandTool {
    fn name(&self) -> &str {
        "get_command"
    }

    fn description(&self) -> &str {
        "Get one command by name, including its full content"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        named_param_schema("Command")
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let name = require_name(&params)?;
        let root = ctx.resolve_root(&params);
        let context = ctx.scan(&root).await;
        let all: Vec<&CommandRecord> = context.all_commands().collect();
        let found = all
            .iter()
            .find(|c| name_matches(&c.file_name, name))
            .or_else(|| {
                let needle = name.to_lowercase();
                all.iter()
                    .find(|c| c.path.to_string_lossy().to_lowercase().contains(&needle))
            });
        Ok(json!({ "command": found.map(|c| command_json(c)) }))
    }
}

pub struct ListSkillsTool;

#[async_trait]
impl Tool for ListSkillsTool {
    fn name(&self) -> &str {
        "list_skills"
    }

    fn description(&self) -> &str {
        "List workspace and global skills"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        project_param_schema()
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let root = ctx.resolve_root(&params);
        let context = ctx.scan(&root).await;
        let skills: Vec<Value> = context.all_skills().map(skill_json).collect();
        Ok(json!({ "skills": skills }))
    }
}

pub struct GetSkillTool;

#[async_trait]
impl Tool for GetSkillTool {
    fn name(&self) -> &str {
        "get_skill"
    }

    fn description(&self) -> &str {
        "Get one skill by name, including its full content"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        named_param_schema("Skill")
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let name = require_name(&params)?;
        let root = ctx.resolve_root(&params);
        let context = ctx.scan(&root).await;
        let all: Vec<&SkillRecord> = context.all_skills().collect();
        let found = all
            .iter()
            .find(|s| name_matches(&s.name, name))
            .or_else(|| {
                let needle = name.to_lowercase();
                all.iter()
                    .find(|s| s.path.to_string_lossy().to_lowercase().contains(&needle))
            });
        Ok(json!({ "skill": found.map(|s| skill_json(s)) }))
    }
}

pub struct GetProjectArtifactsTool;

#[async_trait]
impl Tool for GetProjectArtifactsTool {
    fn name(&self) -> &str {
        "get_project_artifacts"
    }

    fn description(&self) -> &str {
        "Get the constitution + specifications + schemas bundle"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        project_param_schema()
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let root = ctx.resolve_root(&params);
        let context = ctx.scan(&root).await;
        Ok(json!({ "artifacts": context.artifacts }))
    }
}

pub struct ListSpecsTool;

#[async_trait]
impl Tool for ListSpecsTool {
    fn name(&self) -> &str {
        "list_specs"
    }

    fn description(&self) -> &str {
        "List per-feature specification documents"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        project_param_schema()
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let root = ctx.resolve_root(&params);
        let context = ctx.scan(&root).await;
        Ok(json!({ "specs": context.artifacts.specs }))
    }
}

pub struct GetProjectContextTool;

#[async_trait]
impl Tool for GetProjectContextTool {
    fn name(&self) -> &str {
        "get_project_context"
    }

    fn description(&self) -> &str {
        "Get the combined project context: rules, commands, skills, and artifacts"
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn parameters_schema(&self) -> Value {
        project_param_schema()
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let root = ctx.resolve_root(&params);
        let context = ctx.scan(&root).await;
        Ok(json!({ "context": context }))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Registry of query tools, dispatched by name.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry pre-loaded with the nine built-in query tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ListRulesTool));
        registry.register(Box::new(GetRuleTool));
        registry.register(Box::new(ListCommandsTool));
        registry.register(Box::new(GetCommandTool));
        registry.register(Box::new(ListSkillsTool));
        registry.register(Box::new(GetSkillTool));
        registry.register(Box::new(GetProjectArtifactsTool));
        registry.register(Box::new(ListSpecsTool));
        registry.register(Box::new(GetProjectContextTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|tool| tool.name() == name)
            .map(|tool| tool.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use std::sync::Arc;

    fn context() -> ToolContext {
        let fs = MemoryFileSystem::new();
        fs.add_file(
            "/p/.cursor/rules/react-style.mdc",
            "---\ndescription: React conventions\nglobs: [*.tsx]\nalwaysApply: false\n---\nPrefer hooks.\n",
        )
        .add_file("/p/.cursor/commands/deploy.md", "# Deploy\n\nShip it.\n")
        .add_file("/p/.cursor/skills/review/SKILL.md", "# Review\n")
        .add_file("/p/specs/auth/spec.md", "## Blueprint\n\n## Contract\n");
        ToolContext::new(
            ContextAggregator::new(Arc::new(fs)),
            PathBuf::from("/p"),
        )
    }

    #[tokio::test]
    async fn test_registry_has_nine_builtins() {
        let registry = ToolRegistry::with_builtins();
        assert_eq!(registry.len(), 9);
        assert!(registry.find("get_project_context").is_some());
        assert!(registry.find("nope").is_none());
        assert!(registry.tools().iter().all(|t| t.is_builtin()));
    }

    #[tokio::test]
    async fn test_list_rules_includes_kind() {
        let ctx = context();
        let result = ListRulesTool.execute(json!({}), &ctx).await.unwrap();
        let rules = result["rules"].as_array().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0]["kind"], "glob");
        assert_eq!(rules[0]["metadata"]["description"], "React conventions");
    }

    #[tokio::test]
    async fn test_get_rule_extension_agnostic() {
        let ctx = context();
        let result = GetRuleTool
            .execute(json!({ "name": "REACT-STYLE" }), &ctx)
            .await
            .unwrap();
        assert_eq!(result["rule"]["fileName"], "react-style.mdc");
    }

    #[tokio::test]
    async fn test_get_rule_partial_path_fallback() {
        let ctx = context();
        let result = GetRuleTool
            .execute(json!({ "name": "rules/react" }), &ctx)
            .await
            .unwrap();
        assert_eq!(result["rule"]["fileName"], "react-style.mdc");
    }

    #[tokio::test]
    async fn test_get_rule_not_found_is_null() {
        let ctx = context();
        let result = GetRuleTool
            .execute(json!({ "name": "missing" }), &ctx)
            .await
            .unwrap();
        assert!(result["rule"].is_null());
    }

    #[tokio::test]
    async fn test_get_command_by_bare_name() {
        let ctx = context();
        let result = GetCommandTool
            .execute(json!({ "name": "deploy" }), &ctx)
            .await
            .unwrap();
        assert_eq!(result["command"]["fileName"], "deploy.md");
        assert_eq!(result["command"]["description"], "Ship it.");
    }

    #[tokio::test]
    async fn test_get_skill_by_directory_name() {
        let ctx = context();
        let result = GetSkillTool
            .execute(json!({ "name": "Review" }), &ctx)
            .await
            .unwrap();
        assert_eq!(result["skill"]["name"], "review");
    }

    #[tokio::test]
    async fn test_list_specs_and_artifacts() {
        let ctx = context();
        let result = ListSpecsTool.execute(json!({}), &ctx).await.unwrap();
        assert_eq!(result["specs"]["specs"][0]["domain"], "auth");
        assert_eq!(result["specs"]["specs"][0]["hasBlueprint"], true);

        let result = GetProjectArtifactsTool
            .execute(json!({}), &ctx)
            .await
            .unwrap();
        assert_eq!(result["artifacts"]["hasAnyArtifacts"], true);
        assert_eq!(result["artifacts"]["constitution"]["exists"], false);
    }

    #[tokio::test]
    async fn test_missing_name_is_error() {
        let ctx = context();
        assert!(GetRuleTool.execute(json!({}), &ctx).await.is_err());
    }

    #[tokio::test]
    async fn test_project_param_overrides_default() {
        let ctx = context();
        let result = ListRulesTool
            .execute(json!({ "project": "/elsewhere" }), &ctx)
            .await
            .unwrap();
        assert!(result["rules"].as_array().unwrap().is_empty());
    }
}
