use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// An ordered fallback group read from the rule file. Declaration order is
/// the fill priority: first concept is most preferred and names the merged
/// row (`<first>_merged`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeGroup {
    /// 1-based line number in the rule file, for diagnostics.
    pub line: usize,
    pub concepts: Vec<String>,
}

impl MergeGroup {
    pub fn merged_concept(&self) -> String {
        format!("{}_merged", self.concepts[0])
    }
}

/// Parse a merge rule file: one group per line, whitespace-separated concept
/// names, blank lines and `#` comments ignored. A line with a single concept
/// is a configuration error — there is nothing to merge.
pub fn parse_rules(path: &Path) -> Result<Vec<MergeGroup>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading merge rules {}", path.display()))?;

    let mut groups = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let concepts: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if concepts.len() < 2 {
            bail!(
                "merge group on line {} of {} has a single concept",
                i + 1,
                path.display()
            );
        }
        groups.push(MergeGroup {
            line: i + 1,
            concepts,
        });
    }
    Ok(groups)
}

/// Reject rule sets where a concept appears in more than one group (or twice
/// in the same group). Which group such a concept should feed is ambiguous,
/// so the configuration is refused up front rather than resolved silently.
pub fn validate_rules(groups: &[MergeGroup]) -> Result<()> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for group in groups {
        for concept in &group.concepts {
            if let Some(&first_line) = seen.get(concept.as_str()) {
                bail!(
                    "concept '{}' appears in merge groups on lines {} and {}",
                    concept,
                    first_line,
                    group.line
                );
            }
            seen.insert(concept, group.line);
        }
    }
    Ok(())
}
