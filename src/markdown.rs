//! Generic Markdown parsing utilities.
//!
//! These helpers know nothing about any specific artifact type. They split a
//! document into a frontmatter block plus body, tokenize headings in a single
//! pass, bound section content by heading level, and pull out the small
//! bullet/blockquote patterns the scanners share.
//!
//! Heading and section line numbers are 1-based throughout.

/// The `---` marker that delimits a leading frontmatter block.
const FRONTMATTER_DELIMITER: &str = "---";

/// A heading event produced by [`headings`]: level (1–6), trimmed title,
/// and the 1-based line it appears on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub title: String,
    pub line: usize,
}

/// A heading plus the line range it governs, as built by [`sections`].
///
/// `end_line` is the line before the next heading of any level, or the last
/// line of the document for the final section.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub level: u8,
    pub title: String,
    pub start_line: usize,
    pub end_line: usize,
}

/// Split a document into `(frontmatter, body)` when it opens with a
/// `---`-delimited block.
///
/// The frontmatter is returned without its delimiter lines. Returns `None`
/// when the document does not start with a delimiter line or the closing
/// delimiter is missing.
pub fn split_frontmatter(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix(FRONTMATTER_DELIMITER)?;
    let rest = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n"))?;

    // Find the closing delimiter on its own line.
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONTMATTER_DELIMITER {
            let front = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((front, body));
        }
        offset += line.len();
    }
    None
}

/// Tokenize every ATX heading (`#` through `######`) in a single pass.
pub fn headings(text: &str) -> Vec<Heading> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if let Some((level, title)) = parse_heading(line) {
            out.push(Heading {
                level,
                title,
                line: idx + 1,
            });
        }
    }
    out
}

/// Parse one line as an ATX heading: a run of 1–6 `#` characters followed by
/// whitespace and a non-empty title.
fn parse_heading(line: &str) -> Option<(u8, String)> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    let title = rest.trim();
    if title.is_empty() {
        return None;
    }
    Some((hashes as u8, title.to_string()))
}

/// Build the flat ordered section list for a document by folding over its
/// heading events. Nesting is not resolved here; callers compare `level`.
pub fn sections(text: &str) -> Vec<Section> {
    let total = text.lines().count();
    let hs = headings(text);
    let mut out = Vec::with_capacity(hs.len());
    for (i, h) in hs.iter().enumerate() {
        let end_line = hs
            .get(i + 1)
            .map(|next| next.line.saturating_sub(1))
            .unwrap_or(total);
        out.push(Section {
            level: h.level,
            title: h.title.clone(),
            start_line: h.line,
            end_line,
        });
    }
    out
}

/// Bound a heading's content: from the line after `headings[idx]` up to the
/// line before the next heading with `level <= max_level`, or end of file.
///
/// Returns an inclusive 1-based `(start, end)` line range; `start > end`
/// means the heading has no content lines.
pub fn content_bounds(
    headings: &[Heading],
    idx: usize,
    max_level: u8,
    total_lines: usize,
) -> (usize, usize) {
    let start = headings[idx].line + 1;
    let end = headings[idx + 1..]
        .iter()
        .find(|h| h.level <= max_level)
        .map(|h| h.line.saturating_sub(1))
        .unwrap_or(total_lines);
    (start, end)
}

/// Slice the lines of `text` inside an inclusive 1-based range.
pub fn lines_in_range(text: &str, start: usize, end: usize) -> Vec<&str> {
    if start > end {
        return Vec::new();
    }
    text.lines()
        .enumerate()
        .filter(|(idx, _)| (idx + 1) >= start && (idx + 1) <= end)
        .map(|(_, line)| line)
        .collect()
}

/// Extract the payload of a `> **Label:** text` blockquote, matched once per
/// label (first match wins). The label comparison is case-insensitive.
pub fn blockquote_label(text: &str, label: &str) -> Option<String> {
    for line in text.lines() {
        let trimmed = line.trim_start();
        let Some(quoted) = trimmed.strip_prefix('>') else {
            continue;
        };
        if let Some((found, rest)) = parse_bold_prefix(quoted.trim_start()) {
            let found = found.trim_end_matches(':');
            if found.eq_ignore_ascii_case(label) {
                return Some(rest.trim().to_string());
            }
        }
    }
    None
}

/// Parse a `- **Label** rest` or `* **Label:** rest` bullet into
/// `(label, rest)`. The trailing colon, when present, stays on the label so
/// callers can distinguish `**ALWAYS**` keywords from `**Languages:**` pairs.
pub fn bold_bullet(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim_start();
    let rest = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))?;
    parse_bold_prefix(rest.trim_start())
}

/// Split a `**Label** remainder` prefix. A colon immediately after the
/// closing marker (the `**Label:**` vs `**Label**:` variants) is folded onto
/// the label.
fn parse_bold_prefix(text: &str) -> Option<(String, String)> {
    let inner = text.strip_prefix("**")?;
    let close = inner.find("**")?;
    let mut label = inner[..close].trim().to_string();
    let mut rest = &inner[close + 2..];
    if let Some(stripped) = rest.strip_prefix(':') {
        label.push(':');
        rest = stripped;
    }
    Some((label, rest.trim().to_string()))
}

/// Title of the first `#`-level heading, if any.
pub fn first_h1_title(text: &str) -> Option<String> {
    headings(text)
        .into_iter()
        .find(|h| h.level == 1)
        .map(|h| h.title)
}

/// Derive a short description from a Markdown body.
///
/// Preference order: the first paragraph under a heading titled
/// `Description` (any level, case-insensitive), then the first non-heading
/// paragraph of the body. Frontmatter, if present, is skipped.
pub fn derive_description(text: &str) -> Option<String> {
    let body = split_frontmatter(text).map(|(_, b)| b).unwrap_or(text);

    let hs = headings(body);
    if let Some(idx) = hs
        .iter()
        .position(|h| h.title.eq_ignore_ascii_case("description"))
    {
        let total = body.lines().count();
        let (start, end) = content_bounds(&hs, idx, hs[idx].level, total);
        let section_lines = lines_in_range(body, start, end);
        if let Some(paragraph) = first_paragraph(&section_lines) {
            return Some(paragraph);
        }
    }

    let all_lines: Vec<&str> = body.lines().collect();
    first_paragraph(&all_lines)
}

/// First run of consecutive non-blank, non-heading lines, joined by spaces.
fn first_paragraph(lines: &[&str]) -> Option<String> {
    let mut collected: Vec<&str> = Vec::new();
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || parse_heading(line).is_some() {
            if collected.is_empty() {
                continue;
            }
            break;
        }
        collected.push(trimmed);
    }
    if collected.is_empty() {
        None
    } else {
        Some(collected.join(" "))
    }
}
