//! Project artifact scanner: constitution, specifications, and schemas.
//!
//! Three independent sub-scans share one scanner:
//!
//! * `AGENTS.md` at the project root — headings, pull-quote key facts,
//!   tech stack, and the three-tier operational boundaries.
//! * `specs/*/spec.md` — per-feature-domain documents checked for
//!   `## Blueprint` and `## Contract` sections.
//! * `schemas/*.json` — JSON files checked for a self-identifying field.
//!
//! `scan_all` runs the three concurrently and merges them into one
//! [`ProjectArtifacts`]. Missing files and directories resolve to the
//! canonical `exists: false` shapes; malformed files degrade to partial
//! records. Nothing here returns an error to the caller.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;

use crate::fs::{EntryKind, FileSystemPort};
use crate::markdown::{blockquote_label, bold_bullet, content_bounds, headings, lines_in_range, sections, Heading};
use crate::models::{
    ConstitutionInfo, OperationalBoundaries, ProjectArtifacts, SchemaRecord, SchemasInfo,
    SpecRecord, SpecsInfo, TechStack,
};

/// The single well-known constitution file at a project root.
pub const CONSTITUTION_FILE: &str = "AGENTS.md";
/// Per-feature specification directories live here.
pub const SPECS_DIR: &str = "specs";
/// The well-known file inside each specification directory.
pub const SPEC_FILE: &str = "spec.md";
/// JSON schema files live here (non-recursive).
pub const SCHEMAS_DIR: &str = "schemas";

const MISSION_LABEL: &str = "Project Mission";
const PHILOSOPHY_LABEL: &str = "Core Philosophy";

/// `(tier keyword, tier name, bullet label)` for the three fixed tiers.
const TIERS: [(&str, &str, &str); 3] = [
    ("tier 1", "always", "ALWAYS"),
    ("tier 2", "ask", "ASK"),
    ("tier 3", "never", "NEVER"),
];

pub struct ProjectArtifactScanner {
    fs: Arc<dyn FileSystemPort>,
}

impl ProjectArtifactScanner {
    pub fn new(fs: Arc<dyn FileSystemPort>) -> Self {
        Self { fs }
    }

    /// Run the three sub-scans concurrently and merge the results.
    pub async fn scan_all(&self, project_root: &Path) -> ProjectArtifacts {
        let (constitution, specs, schemas) = tokio::join!(
            self.scan_constitution(project_root),
            self.scan_specs(project_root),
            self.scan_schemas(project_root),
        );
        ProjectArtifacts::new(constitution, specs, schemas)
    }

    /// Parse the constitution file, or return the canonical empty shape.
    pub async fn scan_constitution(&self, project_root: &Path) -> ConstitutionInfo {
        let path = project_root.join(CONSTITUTION_FILE);
        match self.fs.stat(&path).await {
            Ok(stat) if stat.is_file => {}
            _ => return ConstitutionInfo::absent(),
        }
        let text = match self.fs.read_to_string(&path).await {
            Ok(text) => text,
            // The file exists but cannot be read: keep the existence
            // signal, degrade every parsed field.
            Err(e) => {
                eprintln!("Warning: could not read {}: {}", path.display(), e);
                return ConstitutionInfo {
                    exists: true,
                    path: Some(path),
                    ..ConstitutionInfo::absent()
                };
            }
        };

        ConstitutionInfo {
            exists: true,
            path: Some(path),
            mission: blockquote_label(&text, MISSION_LABEL),
            core_philosophy: blockquote_label(&text, PHILOSOPHY_LABEL),
            sections: sections(&text),
            tech_stack: extract_tech_stack(&text),
            operational_boundaries: extract_boundaries(&text),
        }
    }

    /// Scan `specs/*/spec.md`, or return the canonical empty shape.
    pub async fn scan_specs(&self, project_root: &Path) -> SpecsInfo {
        let dir = project_root.join(SPECS_DIR);
        match self.fs.stat(&dir).await {
            Ok(stat) if stat.is_dir => {}
            _ => return SpecsInfo::default(),
        }
        let entries = match self.fs.list_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                eprintln!("Warning: could not enumerate {}: {}", dir.display(), e);
                return SpecsInfo {
                    exists: true,
                    path: Some(dir),
                    specs: Vec::new(),
                };
            }
        };

        let mut specs = Vec::new();
        for entry in entries {
            if entry.kind != EntryKind::Dir {
                continue;
            }
            let spec_path = entry.path.join(SPEC_FILE);
            // Domains without a spec.md contribute zero records.
            let Ok(stat) = self.fs.stat(&spec_path).await else {
                continue;
            };
            if !stat.is_file {
                continue;
            }
            let last_modified = stat
                .modified
                .map(|time| DateTime::<Utc>::from(time).to_rfc3339());
            let (has_blueprint, has_contract) = match self.fs.read_to_string(&spec_path).await {
                Ok(text) => (
                    has_level2_heading(&text, "blueprint"),
                    has_level2_heading(&text, "contract"),
                ),
                Err(_) => (false, false),
            };
            specs.push(SpecRecord {
                domain: entry.name,
                path: spec_path,
                has_blueprint,
                has_contract,
                last_modified,
            });
        }
        SpecsInfo {
            exists: true,
            path: Some(dir),
            specs,
        }
    }

    /// Scan `schemas/*.json`, or return the canonical empty shape.
    pub async fn scan_schemas(&self, project_root: &Path) -> SchemasInfo {
        let dir = project_root.join(SCHEMAS_DIR);
        match self.fs.stat(&dir).await {
            Ok(stat) if stat.is_dir => {}
            _ => return SchemasInfo::default(),
        }
        let entries = match self.fs.list_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                eprintln!("Warning: could not enumerate {}: {}", dir.display(), e);
                return SchemasInfo {
                    exists: true,
                    path: Some(dir),
                    schemas: Vec::new(),
                };
            }
        };

        let mut schemas = Vec::new();
        for entry in entries {
            if entry.kind != EntryKind::File {
                continue;
            }
            let is_json = Path::new(&entry.name)
                .extension()
                .is_some_and(|ext| ext == "json");
            if !is_json {
                continue;
            }
            let name = Path::new(&entry.name)
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| entry.name.clone());
            // Invalid JSON or a missing id field only means the optional
            // field stays absent; the record is still included.
            let schema_id = match self.fs.read_to_string(&entry.path).await {
                Ok(text) => extract_schema_id(&text),
                Err(_) => None,
            };
            schemas.push(SchemaRecord {
                name,
                path: entry.path,
                schema_id,
            });
        }
        SchemasInfo {
            exists: true,
            path: Some(dir),
            schemas,
        }
    }
}

/// True when the text has a `## <title>` heading, case-insensitive and
/// anchored to the start of a line.
fn has_level2_heading(text: &str, title: &str) -> bool {
    text.lines().any(|line| {
        line.strip_prefix("## ")
            .is_some_and(|rest| rest.trim().eq_ignore_ascii_case(title))
    })
}

/// Self-identifying field of a JSON schema document: `$id`, then `id`.
fn extract_schema_id(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let object = value.as_object()?;
    object
        .get("$id")
        .or_else(|| object.get("id"))
        .and_then(|id| id.as_str())
        .map(String::from)
}

/// Find the first heading whose lowercased title contains any of the given
/// substrings, optionally restricted to a 1-based line range.
fn find_heading(
    hs: &[Heading],
    needles: &[&str],
    range: Option<(usize, usize)>,
) -> Option<usize> {
    hs.iter().position(|h| {
        let in_range = range.map_or(true, |(start, end)| h.line >= start && h.line <= end);
        let title = h.title.to_lowercase();
        in_range && needles.iter().any(|needle| title.contains(needle))
    })
}

/// Extract the tech-stack bag from the *Tech Stack* / *Technology* section.
/// Absent entirely when no matching heading exists.
fn extract_tech_stack(text: &str) -> Option<TechStack> {
    let hs = headings(text);
    let total = text.lines().count();
    let idx = find_heading(&hs, &["tech stack", "technology"], None)?;
    // Bound to the next sibling heading so nested subsections stay inside.
    let (start, end) = content_bounds(&hs, idx, hs[idx].level, total);

    let mut stack = TechStack::default();
    for line in lines_in_range(text, start, end) {
        let Some((label, value)) = bold_bullet(line) else {
            continue;
        };
        let label = label.trim_end_matches(':').to_lowercase();
        if label.contains("package manager") {
            stack.package_manager = Some(value);
        } else if label.contains("language") {
            stack.languages.extend(split_list(&value));
        } else if label.contains("framework") {
            stack.frameworks.extend(split_list(&value));
        } else if label.contains("build") {
            stack.build_tools.extend(split_list(&value));
        } else if label.contains("testing") {
            stack.testing.extend(split_list(&value));
        }
    }
    Some(stack)
}

/// Extract the three operational tiers. Absent entirely when the
/// *Operational Boundaries* heading is missing; a found tier with no
/// matching items yields an empty list.
fn extract_boundaries(text: &str) -> Option<OperationalBoundaries> {
    let hs = headings(text);
    let total = text.lines().count();
    let idx = find_heading(&hs, &["operational boundaries"], None)?;
    let bounds = content_bounds(&hs, idx, hs[idx].level, total);

    let mut tiers: [Vec<String>; 3] = Default::default();
    for (slot, (tier_keyword, tier_name, bullet_label)) in tiers.iter_mut().zip(TIERS) {
        let Some(tier_idx) = find_heading(&hs, &[tier_keyword, tier_name], Some(bounds)) else {
            continue;
        };
        // Tier content runs to the next ##/### heading.
        let (start, end) = content_bounds(&hs, tier_idx, 3, total);
        let end = end.min(bounds.1);
        for line in lines_in_range(text, start, end) {
            if let Some((label, item)) = bold_bullet(line) {
                if label == bullet_label {
                    slot.push(item);
                }
            }
        }
    }

    let [tier1_always, tier2_ask, tier3_never] = tiers;
    Some(OperationalBoundaries {
        tier1_always,
        tier2_ask,
        tier3_never,
    })
}

/// Split a comma-separated value into trimmed, non-empty entries.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}
