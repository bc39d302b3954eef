//! Meta file handling: the sidecar descriptor that declares an asset's
//! identity. An asset `foo.mat` is paired with `foo.mat.meta`; the meta
//! file declares exactly one GUID.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::types::Guid;

/// Parser for meta file content. One instance per run; patterns are
/// compiled once.
pub struct MetaParser {
    json_guid: Regex,
    tagged_guid: Regex,
}

impl MetaParser {
    /// Compile the meta field patterns.
    ///
    /// # Panics
    ///
    /// Panics if a hardcoded pattern is invalid (compile-time invariant).
    pub fn new() -> Self {
        return MetaParser {
            json_guid: Regex::new(r#"(?i)"m_GUID":\s*"([0-9a-f]{32})""#).expect("valid regex"),
            tagged_guid: Regex::new(r"(?i)guid:\s*([0-9a-f]{32})").expect("valid regex"),
        };
    }

    /// Read a meta file and extract the identifier it declares.
    ///
    /// Returns `None` if the file is unreadable, empty, or contains no
    /// recognizable field — never fatal to the caller. Content that is
    /// not valid UTF-8 is decoded lossily before matching.
    pub fn parse(&self, meta_path: &Path) -> Option<Guid> {
        let bytes = std::fs::read(meta_path).ok()?;
        let content = String::from_utf8_lossy(&bytes);
        return self.parse_content(&content);
    }

    /// Extract the declared identifier from meta content.
    /// Tag-based `guid:` is tried first, then the object-notation
    /// quoted `"m_GUID"` string form.
    pub fn parse_content(&self, content: &str) -> Option<Guid> {
        if let Some(cap) = self.tagged_guid.captures(content) {
            return cap.get(1).and_then(|m| return Guid::parse(m.as_str()));
        }
        if let Some(cap) = self.json_guid.captures(content) {
            return cap.get(1).and_then(|m| return Guid::parse(m.as_str()));
        }
        return None;
    }
}

/// The asset path paired with a meta file (`foo.mat.meta` -> `foo.mat`).
/// Returns `None` for paths that aren't meta files.
pub fn asset_path_for(meta_path: &Path) -> Option<PathBuf> {
    if !is_meta_file(meta_path) {
        return None;
    }
    let name = meta_path.file_name()?.to_str()?;
    let stripped = name.strip_suffix(".meta")?;
    if stripped.is_empty() {
        return None;
    }
    return Some(meta_path.with_file_name(stripped));
}

/// True if the path names a meta file.
pub fn is_meta_file(path: &Path) -> bool {
    return path.extension().is_some_and(|ext| return ext.eq_ignore_ascii_case("meta"));
}

/// The meta file paired with an asset (`foo.mat` -> `foo.mat.meta`).
pub fn meta_path_for(asset_path: &Path) -> PathBuf {
    let mut name = OsString::from(asset_path.as_os_str());
    name.push(".meta");
    return PathBuf::from(name);
}
