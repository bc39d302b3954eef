//! Report building: aggregate a resolution result and its issues into
//! the one structure external collaborators consume.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::checker::{Issue, IssueKind, Severity};
use crate::error::Error;
use crate::resolver::ResolutionResult;
use crate::types::MissingDependency;

/// Per-category totals, mirroring the four resolution sets.
#[derive(Debug, serde::Serialize)]
pub struct Counts {
    /// Dependency files in the closure (seeds excluded).
    pub total_dependencies: usize,
    /// Meta files for seeds and dependencies.
    pub total_meta_files: usize,
    /// Unresolved identifiers.
    pub total_missing: usize,
    /// Seed files as supplied.
    pub total_original: usize,
}

/// The run's complete output: the four resolution sets, counts, and
/// the issue list grouped by kind. Serializable as-is; `render` gives
/// the human form.
#[derive(Debug, serde::Serialize)]
pub struct Report {
    /// False when the run was cancelled before the closure finished.
    pub complete: bool,
    /// Per-category totals.
    pub counts: Counts,
    /// Closure minus seeds, sorted.
    pub dependency_files: Vec<PathBuf>,
    /// Flat issue list, sorted by kind.
    pub issues: Vec<Issue>,
    /// Issue count per kind.
    pub kind_counts: BTreeMap<IssueKind, usize>,
    /// Meta files for everything in the closure.
    pub meta_files: Vec<PathBuf>,
    /// Unresolved identifiers with their referencing files.
    pub missing: Vec<MissingDependency>,
    /// Echo of the seed set.
    pub original_files: Vec<PathBuf>,
    /// True when any index came from a degraded directory-only scan.
    pub partial_index: bool,
}

impl Report {
    /// Assemble a report. Consumes the resolution result; nothing is
    /// recomputed, only grouped and counted.
    pub fn build(result: ResolutionResult, issues: Vec<Issue>, partial_index: bool) -> Self {
        let mut kind_counts: BTreeMap<IssueKind, usize> = BTreeMap::new();
        for issue in &issues {
            let counter = kind_counts.entry(issue.kind).or_insert(0);
            *counter = counter.saturating_add(1);
        }

        return Report {
            complete: result.complete,
            counts: Counts {
                total_dependencies: result.dependency_files.len(),
                total_meta_files: result.meta_files.len(),
                total_missing: result.missing.len(),
                total_original: result.original_files.len(),
            },
            dependency_files: result.dependency_files,
            issues,
            kind_counts,
            meta_files: result.meta_files,
            missing: result.missing,
            original_files: result.original_files,
            partial_index,
        };
    }

    /// Exit-code contract for the CLI: 2 when anything critical exists,
    /// 1 for actionable (non-info) issues, a partial index, or an
    /// incomplete run, 0 when clean.
    pub fn exit_status(&self) -> u8 {
        if self.has_critical() {
            return 2;
        }
        let actionable = self
            .issues
            .iter()
            .any(|i| return i.severity != Severity::Info);
        if actionable || self.partial_index || !self.complete {
            return 1;
        }
        return 0;
    }

    /// True if any issue carries critical severity.
    pub fn has_critical(&self) -> bool {
        return self.issues.iter().any(|i| return i.severity == Severity::Critical);
    }

    /// Render as markdown for terminal output. Headings start with `#`
    /// so the printer can bold them.
    pub fn render(&self) -> String {
        let mut out = String::from("# Dependency Report\n\n");
        let _ = writeln!(
            out,
            "{} original, {} dependencies, {} meta files, {} missing",
            self.counts.total_original,
            self.counts.total_dependencies,
            self.counts.total_meta_files,
            self.counts.total_missing,
        );

        if !self.complete {
            out.push_str("\nRun was cancelled; this report is incomplete.\n");
        }
        if self.partial_index {
            out.push_str("\nNo repository marker found; the index covers only the seed directories and may be incomplete.\n");
        }

        render_path_section(&mut out, "Original files", &self.original_files);
        render_path_section(&mut out, "Dependency files", &self.dependency_files);
        render_path_section(&mut out, "Meta files", &self.meta_files);

        if !self.missing.is_empty() {
            out.push_str("\n## Missing\n\n");
            for entry in &self.missing {
                let _ = writeln!(out, "- {}", entry.guid);
                for path in &entry.referenced_by {
                    let _ = writeln!(out, "  referenced by {}", path.display());
                }
            }
        }

        out.push_str(&self.render_issues());
        return out;
    }

    /// Serialize the whole report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, Error> {
        return Ok(serde_json::to_string_pretty(self)?);
    }

    /// Render only the issue list grouped by kind with per-kind counts.
    pub fn render_issues(&self) -> String {
        if self.issues.is_empty() {
            return String::from("\nNo issues found.\n");
        }

        let mut out = String::from("\n# Issues\n");
        for (kind, count) in &self.kind_counts {
            let _ = write!(out, "\n## {kind} ({count})\n\n");
            for issue in self.issues.iter().filter(|i| return i.kind == *kind) {
                let _ = writeln!(out, "- {}", issue.message);
            }
        }
        return out;
    }
}

/// Append one `## heading` block listing paths, skipped when empty.
fn render_path_section(out: &mut String, heading: &str, paths: &[PathBuf]) {
    if paths.is_empty() {
        return;
    }
    let _ = write!(out, "\n## {heading}\n\n");
    for path in paths {
        let _ = writeln!(out, "- {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::Report;
    use crate::checker::{Issue, IssueKind, Severity};
    use crate::resolver::ResolutionResult;
    use crate::types::{Guid, MissingDependency};

    fn result_with_missing() -> ResolutionResult {
        return ResolutionResult {
            complete: true,
            dependency_files: vec![PathBuf::from("b.mat")],
            meta_files: vec![PathBuf::from("a.prefab.meta"), PathBuf::from("b.mat.meta")],
            missing: vec![MissingDependency {
                guid: Guid::parse("cccccccccccccccccccccccccccccccc").unwrap(),
                referenced_by: vec![PathBuf::from("a.prefab")],
            }],
            original_files: vec![PathBuf::from("a.prefab")],
            referenced_files: vec![PathBuf::from("b.mat")],
        };
    }

    fn critical_issue() -> Issue {
        return Issue {
            guids: vec![Guid::parse("cccccccccccccccccccccccccccccccc").unwrap()],
            kind: IssueKind::MissingExternal,
            message: "cccccccccccccccccccccccccccccccc resolves nowhere".to_string(),
            paths: vec![PathBuf::from("a.prefab")],
            severity: Severity::Critical,
        };
    }

    #[test]
    fn counts_mirror_the_result_sets() {
        let report = Report::build(result_with_missing(), Vec::new(), false);
        assert_eq!(report.counts.total_original, 1);
        assert_eq!(report.counts.total_dependencies, 1);
        assert_eq!(report.counts.total_meta_files, 2);
        assert_eq!(report.counts.total_missing, 1);
    }

    #[test]
    fn critical_issue_drives_exit_status_two() {
        let report = Report::build(result_with_missing(), vec![critical_issue()], false);
        assert!(report.has_critical());
        assert_eq!(report.exit_status(), 2);
    }

    #[test]
    fn info_only_issues_exit_clean() {
        let info = Issue {
            guids: Vec::new(),
            kind: IssueKind::OrphanCandidate,
            message: "loose.png unreferenced".to_string(),
            paths: vec![PathBuf::from("loose.png")],
            severity: Severity::Info,
        };
        let report = Report::build(result_with_missing(), vec![info], false);
        assert_eq!(report.exit_status(), 0);
    }

    #[test]
    fn partial_index_forces_nonzero_exit() {
        let report = Report::build(result_with_missing(), Vec::new(), true);
        assert_eq!(report.exit_status(), 1);
    }

    #[test]
    fn kind_counts_group_the_flat_list() {
        let issues = vec![critical_issue(), critical_issue()];
        let report = Report::build(result_with_missing(), issues, false);
        assert_eq!(report.kind_counts.get(&IssueKind::MissingExternal), Some(&2));
        assert_eq!(report.issues.len(), 2);
    }

    #[test]
    fn render_names_every_section() {
        let report = Report::build(result_with_missing(), vec![critical_issue()], false);
        let text = report.render();
        assert!(text.contains("## Original files"));
        assert!(text.contains("## Dependency files"));
        assert!(text.contains("## Missing"));
        assert!(text.contains("## missing_external (1)"));
    }

    #[test]
    fn json_roundtrips_counts() {
        let report = Report::build(result_with_missing(), Vec::new(), false);
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["counts"]["total_original"], 1);
        assert_eq!(value["complete"], true);
    }
}
