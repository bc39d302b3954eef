/// Core domain types for assetdep identifiers and resolution output.
use std::path::PathBuf;

/// Structural dialect of an asset file's content, decided once before
/// extraction so format sniffing doesn't spread across call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetFormat {
    /// No recognized header — scanned with the generic patterns.
    Generic,
    /// Object notation: first non-whitespace character is `{`.
    Json,
    /// Tag-based markup: content begins with a `%YAML` header token.
    Tagged,
}

impl AssetFormat {
    /// Classify content by structure. Pure; never fails.
    pub fn classify(content: &str) -> Self {
        if content.trim_start().starts_with('{') {
            return AssetFormat::Json;
        }
        if content.starts_with("%YAML") {
            return AssetFormat::Tagged;
        }
        return AssetFormat::Generic;
    }
}

/// A canonical asset identifier — 32 hex chars, always lowercase.
/// Newtype prevents mixing with arbitrary strings; constructed only
/// through `Guid::parse`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct Guid(String);

impl Guid {
    /// The canonical lowercase hex form.
    pub fn as_str(&self) -> &str {
        return &self.0;
    }

    /// True for identifiers in the editor-reserved range (14 leading
    /// zeros), which name built-in resources and are never expected in
    /// a user-maintained index.
    pub fn is_reserved(&self) -> bool {
        return self.0.starts_with("00000000000000");
    }

    /// Parse a candidate identifier. Accepts the bare 32-hex form and
    /// the hyphenated 8-4-4-4-12 form, in any case; canonicalizes to
    /// lowercase. Returns `None` for anything else.
    pub fn parse(input: &str) -> Option<Self> {
        let compact: String = input.chars().filter(|c| return *c != '-').collect();
        if compact.len() != 32 {
            return None;
        }
        if !compact.chars().all(|c| return c.is_ascii_hexdigit()) {
            return None;
        }
        return Some(Guid(compact.to_ascii_lowercase()));
    }
}

impl std::fmt::Display for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f.write_str(&self.0);
    }
}

/// An identifier referenced somewhere in the closure but resolved by
/// no supplied index. Deduplicated by guid; `referenced_by` collects
/// every file that mentioned it, sorted.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MissingDependency {
    /// The unresolved identifier.
    pub guid: Guid,
    /// Files whose content references the identifier.
    pub referenced_by: Vec<PathBuf>,
}
