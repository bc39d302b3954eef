//! Dependency resolution: closure computation over the reference graph.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::BuiltinTable;
use crate::error::Error;
use crate::extract::Extractor;
use crate::index::GuidIndex;
use crate::meta::{self, MetaParser};
use crate::types::{Guid, MissingDependency};

/// Cooperative cancellation handle. A long closure loop checks it
/// between file operations and returns a partial result instead of
/// blocking the caller indefinitely.
#[derive(Clone)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Request cancellation. Safe to call from another thread.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// True once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        return self.flag.load(Ordering::Relaxed);
    }

    /// A fresh, uncancelled flag.
    pub fn new() -> Self {
        return CancelFlag { flag: Arc::new(AtomicBool::new(false)) };
    }
}

/// Output of one resolution run. Fully materialized before being handed
/// to the report builder; never mutated afterwards. The four path
/// categories are disjoint and canonically sorted.
#[derive(Debug, serde::Serialize)]
pub struct ResolutionResult {
    /// False when the run was cancelled and the closure is incomplete.
    pub complete: bool,
    /// Closure minus seeds.
    pub dependency_files: Vec<PathBuf>,
    /// Meta files for every seed and dependency that has one.
    pub meta_files: Vec<PathBuf>,
    /// Identifiers resolved by no supplied index, deduplicated by guid.
    pub missing: Vec<MissingDependency>,
    /// Echo of the seed set, input order, deduplicated.
    pub original_files: Vec<PathBuf>,
    /// Every path some closure member referenced (resolved targets),
    /// whether or not it was newly enqueued. Lets the checker spot
    /// seeds that nothing references.
    pub referenced_files: Vec<PathBuf>,
}

/// Dependency resolver. Holds the builtin table and the compiled
/// extraction patterns for one run; construct per run with the
/// configuration that run should use.
pub struct Resolver {
    builtins: BuiltinTable,
    extractor: Extractor,
    meta_parser: MetaParser,
}

impl Resolver {
    /// Build a resolver around an explicit builtin table.
    pub fn new(builtins: BuiltinTable) -> Self {
        return Resolver {
            builtins,
            extractor: Extractor::new(),
            meta_parser: MetaParser::new(),
        };
    }

    /// Extract the references of one file, using the material-aware
    /// scan for material assets. Unreadable content yields no
    /// references; non-UTF-8 content is decoded lossily.
    fn references_of(&self, path: &Path) -> BTreeSet<Guid> {
        let Ok(bytes) = std::fs::read(path) else {
            return BTreeSet::new();
        };
        let content = String::from_utf8_lossy(&bytes);

        let is_material = path
            .extension()
            .is_some_and(|ext| return ext.eq_ignore_ascii_case("mat"));
        if is_material {
            return self.extractor.extract_material(&content);
        }
        return self.extractor.extract(&content);
    }

    /// Compute the transitive dependency closure of `seeds` against the
    /// supplied indexes, first index winning on ambiguity.
    ///
    /// The visited set guarantees termination on cyclic references; a
    /// file is never processed twice. Unreadable files contribute no
    /// references and the run continues.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoSeeds` for an empty seed list and
    /// `Error::SeedNotFound` if any seed does not exist on disk.
    pub fn resolve(
        &self,
        seeds: &[PathBuf],
        indexes: &[&GuidIndex],
        cancel: &CancelFlag,
    ) -> Result<ResolutionResult, Error> {
        if seeds.is_empty() {
            return Err(Error::NoSeeds);
        }
        for seed in seeds {
            if !seed.is_file() {
                return Err(Error::SeedNotFound { path: seed.clone() });
            }
        }

        // Seeds arrive in CLI spelling while the index hands back
        // root-joined paths, so both sides are normalized to one
        // lexical form before any membership check.
        let mut original_files: Vec<PathBuf> = Vec::new();
        let mut visited: BTreeSet<PathBuf> = BTreeSet::new();
        let mut queue: VecDeque<PathBuf> = VecDeque::new();
        for seed in seeds {
            let seed = normalize(seed);
            if visited.insert(seed.clone()) {
                original_files.push(seed.clone());
                queue.push_back(seed);
            }
        }
        let seed_set: BTreeSet<PathBuf> = original_files.iter().cloned().collect();

        let mut dependency_files: BTreeSet<PathBuf> = BTreeSet::new();
        let mut meta_files: BTreeSet<PathBuf> = BTreeSet::new();
        let mut missing: BTreeMap<Guid, BTreeSet<PathBuf>> = BTreeMap::new();
        let mut referenced_files: BTreeSet<PathBuf> = BTreeSet::new();
        let mut complete = true;

        while let Some(path) = queue.pop_front() {
            if cancel.is_cancelled() {
                complete = false;
                break;
            }

            // A file handed in or pulled into the closure needs its
            // identity preserved even if nothing references it.
            let meta_path = meta::meta_path_for(&path);
            if meta_path.is_file() {
                meta_files.insert(meta_path.clone());
            }
            let own_guid = self.meta_parser.parse(&meta_path);

            for guid in self.references_of(&path) {
                if self.builtins.contains(&guid) || guid.is_reserved() {
                    continue;
                }
                if Some(&guid) == own_guid.as_ref() {
                    // Self-reference; a file never depends on itself.
                    continue;
                }

                match lookup(indexes, &guid) {
                    None => {
                        missing.entry(guid).or_default().insert(path.clone());
                    },
                    Some(resolved) => {
                        let resolved = normalize(resolved);
                        referenced_files.insert(resolved.clone());
                        if visited.insert(resolved.clone()) {
                            if !seed_set.contains(&resolved) {
                                dependency_files.insert(resolved.clone());
                            }
                            queue.push_back(resolved);
                        }
                    },
                }
            }
        }

        let missing: Vec<MissingDependency> = missing
            .into_iter()
            .map(|(guid, referenced_by)| {
                return MissingDependency {
                    guid,
                    referenced_by: referenced_by.into_iter().collect(),
                };
            })
            .collect();

        return Ok(ResolutionResult {
            complete,
            dependency_files: dependency_files.into_iter().collect(),
            meta_files: meta_files.into_iter().collect(),
            missing,
            original_files,
            referenced_files: referenced_files.into_iter().collect(),
        });
    }

}

/// Look an identifier up across indexes in priority order.
fn lookup<'a>(indexes: &[&'a GuidIndex], guid: &Guid) -> Option<&'a Path> {
    for index in indexes {
        if let Some(path) = index.get(guid) {
            return Some(path);
        }
    }
    return None;
}

/// Lexically normalize a path so the same file spelled through
/// different prefixes compares equal (`./a.prefab` vs `a.prefab`).
/// Purely textual; never touches the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                if matches!(parts.last(), Some(Component::Normal(_))) {
                    parts.pop();
                } else {
                    parts.push(component);
                }
            },
            Component::Normal(_) | Component::Prefix(_) | Component::RootDir => {
                parts.push(component);
            },
        }
    }
    return parts.iter().collect();
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{CancelFlag, Resolver, normalize};
    use crate::config::{BuiltinTable, Config};
    use crate::index::GuidIndex;
    use crate::meta::MetaParser;
    use crate::types::Guid;

    const GUID_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const GUID_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const GUID_C: &str = "cccccccccccccccccccccccccccccccc";

    /// Write an asset with a meta declaring `guid` and a body
    /// referencing each of `refs`.
    fn write_asset(dir: &Path, name: &str, guid: &str, refs: &[&str]) -> PathBuf {
        let mut body = String::from("%YAML 1.1\n");
        for r in refs {
            body.push_str(&format!("  m_Material: {{fileID: 2100000, guid: {r}, type: 2}}\n"));
        }
        let asset = dir.join(name);
        std::fs::write(&asset, body).unwrap();
        std::fs::write(
            dir.join(format!("{name}.meta")),
            format!("fileFormatVersion: 2\nguid: {guid}\n"),
        )
        .unwrap();
        return asset;
    }

    fn index_of(dir: &Path) -> GuidIndex {
        let config = Config::load(dir).unwrap();
        return GuidIndex::build(dir, &config, &MetaParser::new()).unwrap();
    }

    #[test]
    fn closure_is_transitive() {
        let dir = tempfile::tempdir().unwrap();
        let seed = write_asset(dir.path(), "a.prefab", GUID_A, &[GUID_B]);
        let b = write_asset(dir.path(), "b.mat", GUID_B, &[GUID_C]);
        let c = write_asset(dir.path(), "c.png", GUID_C, &[]);

        let index = index_of(dir.path());
        let resolver = Resolver::new(BuiltinTable::defaults());
        let result = resolver
            .resolve(&[seed], &[&index], &CancelFlag::new())
            .unwrap();

        assert_eq!(result.dependency_files, vec![b.clone(), c.clone()]);
        assert!(result.meta_files.contains(&dir.path().join("a.prefab.meta")));
        assert!(result.meta_files.contains(&dir.path().join("b.mat.meta")));
        assert!(result.meta_files.contains(&dir.path().join("c.png.meta")));
        assert!(result.missing.is_empty());
        assert!(result.complete);
    }

    #[test]
    fn cycle_terminates_with_single_dependency() {
        let dir = tempfile::tempdir().unwrap();
        let seed = write_asset(dir.path(), "a.prefab", GUID_A, &[GUID_B]);
        let b = write_asset(dir.path(), "b.prefab", GUID_B, &[GUID_A]);

        let index = index_of(dir.path());
        let resolver = Resolver::new(BuiltinTable::defaults());
        let result = resolver
            .resolve(&[seed], &[&index], &CancelFlag::new())
            .unwrap();

        assert_eq!(result.dependency_files, vec![b]);
    }

    #[test]
    fn self_reference_is_not_a_dependency() {
        let dir = tempfile::tempdir().unwrap();
        let seed = write_asset(dir.path(), "a.prefab", GUID_A, &[GUID_A]);

        let index = index_of(dir.path());
        let resolver = Resolver::new(BuiltinTable::defaults());
        let result = resolver
            .resolve(&[seed], &[&index], &CancelFlag::new())
            .unwrap();

        assert!(result.dependency_files.is_empty());
        assert!(result.missing.is_empty());
    }

    #[test]
    fn builtin_and_reserved_references_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let seed = write_asset(
            dir.path(),
            "a.mat",
            GUID_A,
            &[
                "00000000000000001000000000000000", // Standard shader
                "00000000000000beef00000000000000", // reserved range
            ],
        );

        let index = index_of(dir.path());
        let resolver = Resolver::new(BuiltinTable::defaults());
        let result = resolver
            .resolve(&[seed], &[&index], &CancelFlag::new())
            .unwrap();

        assert!(result.missing.is_empty());
        assert!(result.dependency_files.is_empty());
    }

    #[test]
    fn unresolved_reference_lands_in_missing() {
        let dir = tempfile::tempdir().unwrap();
        let seed = write_asset(dir.path(), "a.prefab", GUID_A, &[GUID_C]);

        let index = index_of(dir.path());
        let resolver = Resolver::new(BuiltinTable::defaults());
        let result = resolver
            .resolve(&[seed.clone()], &[&index], &CancelFlag::new())
            .unwrap();

        assert_eq!(result.missing.len(), 1);
        assert_eq!(result.missing[0].guid, Guid::parse(GUID_C).unwrap());
        assert_eq!(result.missing[0].referenced_by, vec![seed]);
    }

    #[test]
    fn first_index_wins_on_ambiguity() {
        let dir1 = tempfile::tempdir().unwrap();
        let dir2 = tempfile::tempdir().unwrap();
        let seed = write_asset(dir1.path(), "a.prefab", GUID_A, &[GUID_B]);
        let primary_b = write_asset(dir1.path(), "b.mat", GUID_B, &[]);
        let _mirror_b = write_asset(dir2.path(), "b.mat", GUID_B, &[]);

        let first = index_of(dir1.path());
        let second = index_of(dir2.path());
        let resolver = Resolver::new(BuiltinTable::defaults());
        let result = resolver
            .resolve(&[seed], &[&first, &second], &CancelFlag::new())
            .unwrap();

        assert_eq!(result.dependency_files, vec![primary_b]);
    }

    #[test]
    fn cancelled_run_is_marked_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let seed = write_asset(dir.path(), "a.prefab", GUID_A, &[GUID_B]);
        write_asset(dir.path(), "b.mat", GUID_B, &[]);

        let index = index_of(dir.path());
        let resolver = Resolver::new(BuiltinTable::defaults());
        let cancel = CancelFlag::new();
        cancel.cancel();
        let result = resolver.resolve(&[seed], &[&index], &cancel).unwrap();

        assert!(!result.complete);
        assert!(result.dependency_files.is_empty());
    }

    #[test]
    fn resolution_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let seed = write_asset(dir.path(), "a.prefab", GUID_A, &[GUID_B, GUID_C]);
        write_asset(dir.path(), "b.mat", GUID_B, &[]);

        let index = index_of(dir.path());
        let resolver = Resolver::new(BuiltinTable::defaults());
        let first = resolver
            .resolve(&[seed.clone()], &[&index], &CancelFlag::new())
            .unwrap();
        let second = resolver
            .resolve(&[seed], &[&index], &CancelFlag::new())
            .unwrap();

        assert_eq!(first.dependency_files, second.dependency_files);
        assert_eq!(first.meta_files, second.meta_files);
        assert_eq!(first.original_files, second.original_files);
        assert_eq!(
            first.missing.iter().map(|m| return m.guid.clone()).collect::<Vec<_>>(),
            second.missing.iter().map(|m| return m.guid.clone()).collect::<Vec<_>>(),
        );
    }

    #[test]
    fn dot_prefixed_paths_normalize_to_plain_form() {
        assert_eq!(normalize(Path::new("./a.prefab")), PathBuf::from("a.prefab"));
        assert_eq!(normalize(Path::new("Assets/./b.mat")), PathBuf::from("Assets/b.mat"));
        assert_eq!(normalize(Path::new("Assets/../b.mat")), PathBuf::from("b.mat"));
        assert_eq!(normalize(Path::new("../b.mat")), PathBuf::from("../b.mat"));
    }

    #[test]
    fn empty_seed_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let index = index_of(dir.path());
        let resolver = Resolver::new(BuiltinTable::defaults());
        assert!(resolver.resolve(&[], &[&index], &CancelFlag::new()).is_err());
    }
}
