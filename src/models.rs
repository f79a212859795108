//! Core record types produced by the scanners.
//!
//! Every type here is a read snapshot: constructed fresh on each scan,
//! never mutated, never persisted by the scanning subsystem. Serialized
//! shapes use camelCase field names to match the query surface.

use serde::{Serialize, Serializer};
use std::path::PathBuf;

use crate::markdown::Section;

/// Sentinel description for a rule file that could not be read.
pub const PARSE_ERROR_DESCRIPTION: &str = "Error parsing file";
/// Sentinel body text for any artifact file that could not be read.
pub const READ_ERROR_CONTENT: &str = "Error reading file content";

/// Raw file content with the read failure case as a first-class variant.
///
/// A record whose file failed to read still appears in scan results; this
/// variant lets consumers distinguish that from a file whose text happens to
/// equal the sentinel. On the wire `ReadError` serializes as the sentinel
/// string, so external consumers see the historical shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileBody {
    Ok(String),
    ReadError,
}

impl FileBody {
    /// The content text, with the sentinel substituted for read failures.
    pub fn text(&self) -> &str {
        match self {
            FileBody::Ok(text) => text,
            FileBody::ReadError => READ_ERROR_CONTENT,
        }
    }

    pub fn is_read_error(&self) -> bool {
        matches!(self, FileBody::ReadError)
    }
}

impl Serialize for FileBody {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.text())
    }
}

/// Where a command or skill was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Workspace,
    Global,
}

/// Mutually exclusive rule activation buckets derived from frontmatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// `alwaysApply: true`, regardless of globs.
    Always,
    /// Not always-apply, but a non-empty glob list.
    Glob,
    /// Neither: attached manually.
    Manual,
}

/// Frontmatter metadata of one rule file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleMetadata {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub globs: Option<Vec<String>>,
    pub always_apply: bool,
}

/// One discovered rule file under `.cursor/rules/`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRecord {
    pub file_name: String,
    pub path: PathBuf,
    pub metadata: RuleMetadata,
    pub content: FileBody,
}

impl RuleRecord {
    /// Classify into exactly one of the three activation buckets.
    pub fn kind(&self) -> RuleKind {
        if self.metadata.always_apply {
            RuleKind::Always
        } else if self
            .metadata
            .globs
            .as_ref()
            .is_some_and(|globs| !globs.is_empty())
        {
            RuleKind::Glob
        } else {
            RuleKind::Manual
        }
    }

    /// Placeholder for a discovered rule file that could not be read.
    pub fn placeholder(file_name: String, path: PathBuf) -> Self {
        Self {
            file_name,
            path,
            metadata: RuleMetadata {
                description: PARSE_ERROR_DESCRIPTION.to_string(),
                globs: None,
                always_apply: false,
            },
            content: FileBody::ReadError,
        }
    }
}

/// One discovered command file under `.cursor/commands/`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRecord {
    pub file_name: String,
    pub path: PathBuf,
    pub location: Location,
    pub content: FileBody,
}

impl CommandRecord {
    /// Description derived on demand from the command body; not stored.
    pub fn description(&self) -> Option<String> {
        match &self.content {
            FileBody::Ok(text) => crate::markdown::derive_description(text),
            FileBody::ReadError => None,
        }
    }
}

/// Nested guidance block inside skill frontmatter, carried verbatim.
pub type SkillGuidance = serde_json::Value;

/// Structured metadata parsed from a skill's frontmatter (or, as a fallback,
/// a title from the first `#` heading).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<SkillGuidance>,
}

/// One discovered skill: a `SKILL.md` inside a subdirectory of
/// `.cursor/skills/`. Identity is the containing directory's name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillRecord {
    pub name: String,
    pub path: PathBuf,
    pub location: Location,
    pub content: FileBody,
    /// Entirely absent when neither frontmatter nor a title heading exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SkillMetadata>,
}

/// Tech-stack bag extracted from the constitution file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechStack {
    pub languages: Vec<String>,
    pub frameworks: Vec<String>,
    pub build_tools: Vec<String>,
    pub testing: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<String>,
}

impl TechStack {
    /// True when no keyword bullet matched at all.
    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
            && self.frameworks.is_empty()
            && self.build_tools.is_empty()
            && self.testing.is_empty()
            && self.package_manager.is_none()
    }
}

/// The three fixed operational tiers of the constitution file.
///
/// A tier holds an empty list when its heading was found but no items
/// matched; the whole struct is absent when the boundaries heading is
/// missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationalBoundaries {
    pub tier1_always: Vec<String>,
    pub tier2_ask: Vec<String>,
    pub tier3_never: Vec<String>,
}

/// Parsed view of the single constitution file (`AGENTS.md`) at a project
/// root. `exists` is the discriminant: when false every optional field is
/// absent and `sections` is empty.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstitutionInfo {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core_philosophy: Option<String>,
    pub sections: Vec<Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tech_stack: Option<TechStack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operational_boundaries: Option<OperationalBoundaries>,
}

impl ConstitutionInfo {
    /// The canonical "no constitution file" shape.
    pub fn absent() -> Self {
        Self::default()
    }
}

/// One per-feature specification directory under `specs/`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecRecord {
    pub domain: String,
    pub path: PathBuf,
    pub has_blueprint: bool,
    pub has_contract: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

/// One `.json` file under `schemas/`. `schema_id` is absent when the file is
/// not valid JSON or carries no self-identifying field; neither is an error.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaRecord {
    pub name: String,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
}

/// Scan outcome for the `specs/` directory.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecsInfo {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub specs: Vec<SpecRecord>,
}

/// Scan outcome for the `schemas/` directory.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemasInfo {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub schemas: Vec<SchemaRecord>,
}

/// Merged constitution + specs + schemas result for one project root.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectArtifacts {
    pub constitution: ConstitutionInfo,
    pub specs: SpecsInfo,
    pub schemas: SchemasInfo,
    pub has_any_artifacts: bool,
}

impl ProjectArtifacts {
    /// Compose the aggregate and derive `has_any_artifacts` as a pure OR of
    /// the three `exists` flags.
    pub fn new(constitution: ConstitutionInfo, specs: SpecsInfo, schemas: SchemasInfo) -> Self {
        let has_any_artifacts = constitution.exists || specs.exists || schemas.exists;
        Self {
            constitution,
            specs,
            schemas,
            has_any_artifacts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(always_apply: bool, globs: Option<Vec<&str>>) -> RuleRecord {
        RuleRecord {
            file_name: "r.mdc".into(),
            path: PathBuf::from("/p/.cursor/rules/r.mdc"),
            metadata: RuleMetadata {
                description: String::new(),
                globs: globs.map(|g| g.into_iter().map(String::from).collect()),
                always_apply,
            },
            content: FileBody::Ok(String::new()),
        }
    }

    #[test]
    fn test_always_wins_over_globs() {
        assert_eq!(rule(true, Some(vec!["*.ts"])).kind(), RuleKind::Always);
        assert_eq!(rule(true, None).kind(), RuleKind::Always);
    }

    #[test]
    fn test_glob_requires_nonempty_list() {
        assert_eq!(rule(false, Some(vec!["*.ts"])).kind(), RuleKind::Glob);
        assert_eq!(rule(false, Some(vec![])).kind(), RuleKind::Manual);
        assert_eq!(rule(false, None).kind(), RuleKind::Manual);
    }

    #[test]
    fn test_placeholder_carries_sentinels() {
        let r = RuleRecord::placeholder("broken.mdc".into(), PathBuf::from("/x/broken.mdc"));
        assert_eq!(r.metadata.description, PARSE_ERROR_DESCRIPTION);
        assert_eq!(r.content.text(), READ_ERROR_CONTENT);
        assert!(r.content.is_read_error());
        assert_eq!(r.file_name, "broken.mdc");
    }

    #[test]
    fn test_file_body_serializes_sentinel() {
        let v = serde_json::to_value(FileBody::ReadError).unwrap();
        assert_eq!(v, serde_json::json!(READ_ERROR_CONTENT));
        let v = serde_json::to_value(FileBody::Ok("hello".into())).unwrap();
        assert_eq!(v, serde_json::json!("hello"));
    }

    #[test]
    fn test_has_any_artifacts_is_or_of_exists() {
        let a = ProjectArtifacts::new(
            ConstitutionInfo::absent(),
            SpecsInfo::default(),
            SchemasInfo::default(),
        );
        assert!(!a.has_any_artifacts);

        let a = ProjectArtifacts::new(
            ConstitutionInfo::absent(),
            SpecsInfo {
                exists: true,
                path: Some(PathBuf::from("/p/specs")),
                specs: vec![],
            },
            SchemasInfo::default(),
        );
        assert!(a.has_any_artifacts);
    }
}
