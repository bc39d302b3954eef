//! Consistency checking: classify every unresolved or conflicting
//! identifier into a fixed issue taxonomy.

use std::path::PathBuf;

use crate::config::BuiltinTable;
use crate::index::GuidIndex;
use crate::resolver::ResolutionResult;
use crate::types::Guid;

/// Extensions that are conventionally referenced by other assets; one
/// of these arriving in a seed set with no referrer is worth flagging.
const REFERENCED_TYPES: [&str; 6] = ["jpeg", "jpg", "mat", "mesh", "png", "tga"];

/// A single classified anomaly. Immutable value; the full set for a run
/// is deterministic regardless of filesystem iteration order.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Issue {
    /// Identifiers involved in the anomaly.
    pub guids: Vec<Guid>,
    /// Taxonomy bucket.
    pub kind: IssueKind,
    /// Human-readable description.
    pub message: String,
    /// Affected file paths, sorted.
    pub paths: Vec<PathBuf>,
    /// Severity derived from the kind.
    pub severity: Severity,
}

/// The fixed anomaly taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Resolved by the mirror tree but absent from the primary.
    AvailableInMirror,
    /// Reference to a well-known builtin resource.
    BuiltinReference,
    /// Same identifier declared by multiple assets in one tree.
    DuplicateGuid,
    /// Same asset path carries different identifiers in the two trees.
    GuidMismatch,
    /// Neither tree has a meta file for a shared asset path.
    MetaMissingBoth,
    /// The mirror tree lacks a meta file the primary has.
    MetaMissingMirror,
    /// The primary tree lacks a meta file the mirror has.
    MetaMissingPrimary,
    /// Resolved by no index and not builtin: a real external gap.
    MissingExternal,
    /// A conventionally-referenced seed that nothing references.
    OrphanCandidate,
}

impl IssueKind {
    /// Stable wire name, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        return match self {
            IssueKind::AvailableInMirror => "available_in_mirror",
            IssueKind::BuiltinReference => "builtin_reference",
            IssueKind::DuplicateGuid => "duplicate_guid",
            IssueKind::GuidMismatch => "guid_mismatch",
            IssueKind::MetaMissingBoth => "meta_missing_both",
            IssueKind::MetaMissingMirror => "meta_missing_mirror",
            IssueKind::MetaMissingPrimary => "meta_missing_primary",
            IssueKind::MissingExternal => "missing_external",
            IssueKind::OrphanCandidate => "orphan_candidate",
        };
    }

    /// The severity this kind always carries.
    pub fn severity(self) -> Severity {
        return match self {
            IssueKind::AvailableInMirror | IssueKind::BuiltinReference | IssueKind::OrphanCandidate => {
                Severity::Info
            },
            IssueKind::DuplicateGuid | IssueKind::GuidMismatch => Severity::High,
            IssueKind::MetaMissingBoth | IssueKind::MetaMissingMirror | IssueKind::MetaMissingPrimary => {
                Severity::Warning
            },
            IssueKind::MissingExternal => Severity::Critical,
        };
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f.write_str(self.as_str());
    }
}

/// How urgently an issue needs a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Blocks the seed set from being self-contained.
    Critical,
    /// A divergence that will corrupt references if left alone.
    High,
    /// Expected or informational; no action required.
    Info,
    /// Worth fixing, does not block.
    Warning,
}

/// Consistency checker. Holds the builtin table for one run; all
/// classification is pure over its inputs.
pub struct Checker {
    builtins: BuiltinTable,
}

impl Checker {
    /// Classify everything: the resolution's missing set, cross-tree
    /// divergence against the mirror (when supplied), duplicate
    /// identifiers per index, and orphan candidates in the seed set.
    /// Issues come back sorted by (kind, paths, guids).
    pub fn check(
        &self,
        result: &ResolutionResult,
        indexes: &[&GuidIndex],
        mirror: Option<&GuidIndex>,
    ) -> Vec<Issue> {
        let mut issues = Vec::new();

        self.classify_missing(result, mirror, &mut issues);
        if let (Some(primary), Some(mirror)) = (indexes.first(), mirror) {
            compare_trees(primary, mirror, &mut issues);
        }
        for index in indexes {
            collect_duplicates(index, &mut issues);
        }
        if let Some(mirror) = mirror {
            collect_duplicates(mirror, &mut issues);
        }
        collect_orphans(result, &mut issues);

        issues.sort_by(|a, b| {
            return (a.kind, &a.paths, &a.guids).cmp(&(b.kind, &b.paths, &b.guids));
        });
        return issues;
    }

    /// Build a checker around an explicit builtin table.
    pub fn new(builtins: BuiltinTable) -> Self {
        return Checker { builtins };
    }

    /// Sort the missing set into builtin (info), available-in-mirror
    /// (info), and genuinely missing-external (critical).
    fn classify_missing(
        &self,
        result: &ResolutionResult,
        mirror: Option<&GuidIndex>,
        issues: &mut Vec<Issue>,
    ) {
        for entry in &result.missing {
            if self.builtins.contains(&entry.guid) || entry.guid.is_reserved() {
                let label = self.builtins.label(&entry.guid).unwrap_or("reserved range");
                issues.push(Issue {
                    guids: vec![entry.guid.clone()],
                    kind: IssueKind::BuiltinReference,
                    message: format!("reference to builtin resource `{label}` ({})", entry.guid),
                    paths: entry.referenced_by.clone(),
                    severity: IssueKind::BuiltinReference.severity(),
                });
                continue;
            }

            if let Some(path) = mirror.and_then(|m| return m.get(&entry.guid)) {
                issues.push(Issue {
                    guids: vec![entry.guid.clone()],
                    kind: IssueKind::AvailableInMirror,
                    message: format!(
                        "{} is absent from the primary tree but resolved by the mirror: {}",
                        entry.guid,
                        path.display()
                    ),
                    paths: entry.referenced_by.clone(),
                    severity: IssueKind::AvailableInMirror.severity(),
                });
                continue;
            }

            let referencing = entry
                .referenced_by
                .iter()
                .map(|p| return p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            issues.push(Issue {
                guids: vec![entry.guid.clone()],
                kind: IssueKind::MissingExternal,
                message: format!(
                    "{} resolves nowhere; referenced by: {referencing}",
                    entry.guid
                ),
                paths: entry.referenced_by.clone(),
                severity: IssueKind::MissingExternal.severity(),
            });
        }
    }
}

/// Emit one duplicate-identifier issue per conflicting guid in an index.
fn collect_duplicates(index: &GuidIndex, issues: &mut Vec<Issue>) {
    for (guid, paths) in index.duplicates() {
        let mut sorted = paths.clone();
        sorted.sort();
        let listing = sorted
            .iter()
            .map(|p| return p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        issues.push(Issue {
            guids: vec![guid.clone()],
            kind: IssueKind::DuplicateGuid,
            message: format!(
                "{guid} is declared by {} assets under {}: {listing}",
                sorted.len(),
                index.root().display()
            ),
            paths: sorted,
            severity: IssueKind::DuplicateGuid.severity(),
        });
    }
}

/// Flag seeds of conventionally-referenced types that nothing in the
/// closure references.
fn collect_orphans(result: &ResolutionResult, issues: &mut Vec<Issue>) {
    for seed in &result.original_files {
        let is_referenced_type = seed.extension().is_some_and(|ext| {
            return REFERENCED_TYPES
                .iter()
                .any(|t| return ext.eq_ignore_ascii_case(t));
        });
        if !is_referenced_type || result.referenced_files.contains(seed) {
            continue;
        }
        issues.push(Issue {
            guids: Vec::new(),
            kind: IssueKind::OrphanCandidate,
            message: format!(
                "{} is a conventionally-referenced asset but nothing in this set references it",
                seed.display()
            ),
            paths: vec![seed.clone()],
            severity: IssueKind::OrphanCandidate.severity(),
        });
    }
}

/// Compare two indexes over the same logical tree, path by path.
fn compare_trees(primary: &GuidIndex, mirror: &GuidIndex, issues: &mut Vec<Issue>) {
    for (relative, primary_guid) in primary.assets() {
        let Some(mirror_guid) = mirror.assets().get(relative) else {
            continue;
        };
        let paths = vec![primary.root().join(relative), mirror.root().join(relative)];

        match (primary_guid, mirror_guid) {
            (None, None) => issues.push(Issue {
                guids: Vec::new(),
                kind: IssueKind::MetaMissingBoth,
                message: format!("{} has no meta file in either tree", relative.display()),
                paths,
                severity: IssueKind::MetaMissingBoth.severity(),
            }),
            (None, Some(theirs)) => issues.push(Issue {
                guids: vec![theirs.clone()],
                kind: IssueKind::MetaMissingPrimary,
                message: format!(
                    "{} has a meta file only in the mirror tree ({theirs})",
                    relative.display()
                ),
                paths,
                severity: IssueKind::MetaMissingPrimary.severity(),
            }),
            (Some(ours), None) => issues.push(Issue {
                guids: vec![ours.clone()],
                kind: IssueKind::MetaMissingMirror,
                message: format!(
                    "{} has a meta file only in the primary tree ({ours})",
                    relative.display()
                ),
                paths,
                severity: IssueKind::MetaMissingMirror.severity(),
            }),
            (Some(ours), Some(theirs)) if ours != theirs => issues.push(Issue {
                guids: vec![ours.clone(), theirs.clone()],
                kind: IssueKind::GuidMismatch,
                message: format!(
                    "{} diverges: primary {ours}, mirror {theirs}",
                    relative.display()
                ),
                paths,
                severity: IssueKind::GuidMismatch.severity(),
            }),
            (Some(_), Some(_)) => {},
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{Checker, IssueKind, Severity};
    use crate::config::{BuiltinTable, Config};
    use crate::index::GuidIndex;
    use crate::meta::MetaParser;
    use crate::resolver::ResolutionResult;
    use crate::types::{Guid, MissingDependency};

    fn write_asset(dir: &Path, name: &str, guid: Option<&str>) -> PathBuf {
        let asset = dir.join(name);
        std::fs::write(&asset, "content").unwrap();
        if let Some(guid) = guid {
            std::fs::write(
                dir.join(format!("{name}.meta")),
                format!("fileFormatVersion: 2\nguid: {guid}\n"),
            )
            .unwrap();
        }
        return asset;
    }

    fn index_of(dir: &Path) -> GuidIndex {
        let config = Config::load(dir).unwrap();
        return GuidIndex::build(dir, &config, &MetaParser::new()).unwrap();
    }

    fn empty_result() -> ResolutionResult {
        return ResolutionResult {
            complete: true,
            dependency_files: Vec::new(),
            meta_files: Vec::new(),
            missing: Vec::new(),
            original_files: Vec::new(),
            referenced_files: Vec::new(),
        };
    }

    #[test]
    fn missing_external_is_critical_and_names_referrers() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_of(dir.path());
        let seed = PathBuf::from("seed.prefab");
        let mut result = empty_result();
        result.missing.push(MissingDependency {
            guid: Guid::parse("cccccccccccccccccccccccccccccccc").unwrap(),
            referenced_by: vec![seed.clone()],
        });

        let checker = Checker::new(BuiltinTable::defaults());
        let issues = checker.check(&result, &[&index], None);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::MissingExternal);
        assert_eq!(issues[0].severity, Severity::Critical);
        assert_eq!(issues[0].paths, vec![seed]);
    }

    #[test]
    fn builtin_reference_is_informational() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_of(dir.path());
        let mut result = empty_result();
        result.missing.push(MissingDependency {
            guid: Guid::parse("00000000000000001000000000000000").unwrap(),
            referenced_by: vec![PathBuf::from("seed.mat")],
        });

        let checker = Checker::new(BuiltinTable::defaults());
        let issues = checker.check(&result, &[&index], None);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::BuiltinReference);
        assert_eq!(issues[0].severity, Severity::Info);
        assert!(issues[0].message.contains("Standard"));
    }

    #[test]
    fn mirror_resolution_downgrades_missing_to_info() {
        let primary_dir = tempfile::tempdir().unwrap();
        let mirror_dir = tempfile::tempdir().unwrap();
        write_asset(mirror_dir.path(), "tex.png", Some("dddddddddddddddddddddddddddddddd"));

        let primary = index_of(primary_dir.path());
        let mirror = index_of(mirror_dir.path());
        let mut result = empty_result();
        result.missing.push(MissingDependency {
            guid: Guid::parse("dddddddddddddddddddddddddddddddd").unwrap(),
            referenced_by: vec![PathBuf::from("seed.mat")],
        });

        let checker = Checker::new(BuiltinTable::defaults());
        let issues = checker.check(&result, &[&primary], Some(&mirror));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::AvailableInMirror);
    }

    #[test]
    fn mismatched_guids_across_trees_flagged_high() {
        let primary_dir = tempfile::tempdir().unwrap();
        let mirror_dir = tempfile::tempdir().unwrap();
        write_asset(primary_dir.path(), "x.mat", Some("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1"));
        write_asset(mirror_dir.path(), "x.mat", Some("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb1"));

        let primary = index_of(primary_dir.path());
        let mirror = index_of(mirror_dir.path());
        let checker = Checker::new(BuiltinTable::defaults());
        let issues = checker.check(&empty_result(), &[&primary], Some(&mirror));

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::GuidMismatch);
        assert_eq!(issues[0].severity, Severity::High);
        assert_eq!(issues[0].guids.len(), 2);
    }

    #[test]
    fn one_sided_meta_is_direction_specific() {
        let primary_dir = tempfile::tempdir().unwrap();
        let mirror_dir = tempfile::tempdir().unwrap();
        write_asset(primary_dir.path(), "x.mat", Some("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1"));
        write_asset(mirror_dir.path(), "x.mat", None);
        write_asset(primary_dir.path(), "y.mat", None);
        write_asset(mirror_dir.path(), "y.mat", None);

        let primary = index_of(primary_dir.path());
        let mirror = index_of(mirror_dir.path());
        let checker = Checker::new(BuiltinTable::defaults());
        let issues = checker.check(&empty_result(), &[&primary], Some(&mirror));

        let kinds: Vec<IssueKind> = issues.iter().map(|i| return i.kind).collect();
        assert!(kinds.contains(&IssueKind::MetaMissingMirror));
        assert!(kinds.contains(&IssueKind::MetaMissingBoth));
    }

    #[test]
    fn duplicate_guid_yields_one_issue_naming_every_path() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_asset(dir.path(), "a.mat", Some("11111111111111111111111111111111"));
        let b = write_asset(dir.path(), "b.mat", Some("11111111111111111111111111111111"));

        let index = index_of(dir.path());
        let checker = Checker::new(BuiltinTable::defaults());
        let issues = checker.check(&empty_result(), &[&index], None);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::DuplicateGuid);
        assert_eq!(issues[0].paths, vec![a, b]);
    }

    #[test]
    fn unreferenced_texture_seed_is_an_orphan_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_of(dir.path());
        let mut result = empty_result();
        result.original_files.push(PathBuf::from("loose.png"));
        result.original_files.push(PathBuf::from("entry.prefab"));

        let checker = Checker::new(BuiltinTable::defaults());
        let issues = checker.check(&result, &[&index], None);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::OrphanCandidate);
        assert_eq!(issues[0].paths, vec![PathBuf::from("loose.png")]);
    }

    #[test]
    fn clean_inputs_yield_no_issues() {
        let dir = tempfile::tempdir().unwrap();
        write_asset(dir.path(), "a.prefab", Some("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1"));
        let index = index_of(dir.path());
        let checker = Checker::new(BuiltinTable::defaults());
        assert!(checker.check(&empty_result(), &[&index], None).is_empty());
    }
}
