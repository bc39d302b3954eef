//! Tree indexing: walk a root directory and map every declared GUID to
//! the asset that owns it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;
use crate::meta::{self, MetaParser};
use crate::types::Guid;

/// Identifier index over one scanned root. Built once per resolution
/// run and read-only afterwards; a later run rebuilds from scratch
/// since the filesystem may have changed underneath.
pub struct GuidIndex {
    /// Every non-meta file seen during the walk, keyed by root-relative
    /// path, with its declared identifier when a meta file exists.
    assets: BTreeMap<PathBuf, Option<Guid>>,
    /// First-writer-wins mapping from identifier to absolute asset path.
    by_guid: BTreeMap<Guid, PathBuf>,
    /// Identifiers declared by more than one meta file, with every
    /// conflicting asset path. Never collapsed into `by_guid`.
    duplicates: BTreeMap<Guid, Vec<PathBuf>>,
    /// True when root auto-discovery degraded to the seed's immediate
    /// directory, so the index may be incomplete.
    partial: bool,
    root: PathBuf,
}

impl GuidIndex {
    /// The asset table: root-relative path to declared identifier.
    pub fn assets(&self) -> &BTreeMap<PathBuf, Option<Guid>> {
        return &self.assets;
    }

    /// Walk `root` recursively and build the index.
    ///
    /// Unreadable files and directories are skipped; a meta file that
    /// yields no identifier contributes nothing. The walk visits
    /// entries in sorted order so first-writer-wins is deterministic.
    ///
    /// # Errors
    ///
    /// Returns `Error::RootNotFound` if `root` is not a directory.
    pub fn build(root: &Path, config: &Config, parser: &MetaParser) -> Result<Self, Error> {
        if !root.is_dir() {
            return Err(Error::RootNotFound { path: root.to_path_buf() });
        }

        let mut index = GuidIndex {
            assets: BTreeMap::new(),
            by_guid: BTreeMap::new(),
            duplicates: BTreeMap::new(),
            partial: false,
            root: root.to_path_buf(),
        };

        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| return e.file_type().is_file())
        {
            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            if !config.should_walk(&relative.to_string_lossy()) {
                continue;
            }
            index.record(path, relative, parser);
        }

        return Ok(index);
    }

    /// Build an index for a seed file with no explicit root: climb for
    /// a repository marker, or degrade to the seed's own directory and
    /// mark the index partial.
    ///
    /// # Errors
    ///
    /// Returns `Error::RootNotFound` if the seed has no usable parent
    /// directory at all.
    pub fn build_for_seed(seed: &Path, config: &Config, parser: &MetaParser) -> Result<Self, Error> {
        if let Some(root) = discover_root(seed) {
            return Self::build(&root, config, parser);
        }

        let Some(parent) = seed.parent().filter(|p| return p.is_dir()) else {
            return Err(Error::RootNotFound { path: seed.to_path_buf() });
        };
        let mut index = Self::build(parent, config, parser)?;
        index.partial = true;
        return Ok(index);
    }

    /// Identifiers declared by more than one meta file in this tree.
    pub fn duplicates(&self) -> &BTreeMap<Guid, Vec<PathBuf>> {
        return &self.duplicates;
    }

    /// Look up the asset path owning an identifier.
    pub fn get(&self, guid: &Guid) -> Option<&Path> {
        return self.by_guid.get(guid).map(PathBuf::as_path);
    }

    /// True if the walk found no identifiers at all.
    pub fn is_empty(&self) -> bool {
        return self.by_guid.is_empty();
    }

    /// Number of distinct identifiers in the index.
    pub fn len(&self) -> usize {
        return self.by_guid.len();
    }

    /// True when the index was built from a degraded (directory-only)
    /// scan and may be incomplete.
    pub fn partial(&self) -> bool {
        return self.partial;
    }

    /// Record one walked file: meta files feed the identifier map,
    /// everything else lands in the asset table.
    fn record(&mut self, path: &Path, relative: &Path, parser: &MetaParser) {
        if !meta::is_meta_file(path) {
            self.assets.entry(relative.to_path_buf()).or_insert(None);
            return;
        }

        let Some(guid) = parser.parse(path) else {
            return;
        };
        let Some(asset_abs) = meta::asset_path_for(path) else {
            return;
        };
        let Some(asset_rel) = meta::asset_path_for(relative) else {
            return;
        };

        self.assets.insert(asset_rel, Some(guid.clone()));

        if let Some(existing) = self.by_guid.get(&guid) {
            // Collision: keep the first writer, remember every path.
            let conflict = self
                .duplicates
                .entry(guid)
                .or_insert_with(|| return vec![existing.clone()]);
            conflict.push(asset_abs);
            return;
        }
        self.by_guid.insert(guid, asset_abs);
    }

    /// The root directory this index was built over.
    pub fn root(&self) -> &Path {
        return &self.root;
    }
}

/// Climb parent directories from a seed file looking for a repository
/// marker (`.svn` or `.git`). Returns the first directory that carries
/// one, or `None` if the climb reaches the filesystem root.
pub fn discover_root(seed: &Path) -> Option<PathBuf> {
    for ancestor in seed.ancestors().skip(1) {
        if ancestor.join(".svn").is_dir() || ancestor.join(".git").is_dir() {
            return Some(ancestor.to_path_buf());
        }
    }
    return None;
}
