//! Identifier extraction: pull referenced GUIDs out of raw asset text.

use std::collections::BTreeSet;

use regex::Regex;

use crate::types::{AssetFormat, Guid};

/// Format-aware reference extractor. Compiles every pattern once at
/// construction; a resolution run builds one and reuses it per file.
pub struct Extractor {
    generic_bare: Regex,
    generic_hyphenated: Regex,
    json_guid: Regex,
    tagged_guid: Regex,
    tagged_m_guid: Regex,
    texture_json: Regex,
    texture_tagged: Regex,
}

impl Extractor {
    /// Extract every referenced identifier from asset content.
    ///
    /// Classifies the content by structure once, then applies the
    /// format's patterns. Pure; malformed input yields an empty set,
    /// never an error.
    pub fn extract(&self, content: &str) -> BTreeSet<Guid> {
        return match AssetFormat::classify(content) {
            AssetFormat::Generic => self.scan_generic(content),
            AssetFormat::Json => self.scan_json(content),
            AssetFormat::Tagged => self.scan_tagged(content),
        };
    }

    /// Extract references from material-like content.
    ///
    /// Materials nest texture references one block deeper than other
    /// assets, so on top of the regular format scan this matches
    /// `texture:` / `m_Texture:` / `texture2D:` substructures in both
    /// dialects. When neither scan finds anything it falls back to the
    /// generic full-document scan.
    pub fn extract_material(&self, content: &str) -> BTreeSet<Guid> {
        let mut refs = self.extract(content);
        let textures = self.scan_textures(content);
        if refs.is_empty() && textures.is_empty() {
            return self.scan_generic(content);
        }
        refs.extend(textures);
        return refs;
    }

    /// Compile the extraction patterns.
    ///
    /// # Panics
    ///
    /// Panics if a hardcoded pattern is invalid (compile-time invariant).
    pub fn new() -> Self {
        return Extractor {
            generic_bare: Regex::new(r"(?i)([0-9a-f]{32})").expect("valid regex"),
            generic_hyphenated: Regex::new(
                r#"(?i)"([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})""#,
            )
            .expect("valid regex"),
            json_guid: Regex::new(r#"(?i)"m_GUID":\s*"([0-9a-f]{32})""#).expect("valid regex"),
            tagged_guid: Regex::new(r"(?i)guid:\s*([0-9a-f]{32})").expect("valid regex"),
            tagged_m_guid: Regex::new(r"(?i)m_GUID:\s*([0-9a-f]{32})").expect("valid regex"),
            texture_json: Regex::new(
                r#"(?i)"(?:texture|m_Texture)":\s*\{[^}]*"(?:guid|m_GUID)":\s*"([0-9a-f]{32})""#,
            )
            .expect("valid regex"),
            texture_tagged: Regex::new(
                r"(?is)(?:texture|m_Texture|texture2D):\s*\{.*?(?:guid|m_GUID):\s*([0-9a-f]{32})",
            )
            .expect("valid regex"),
        };
    }

    /// Generic scan: fully qualified 32-hex tokens, plus hyphenated
    /// 8-4-4-4-12 forms canonicalized by stripping the hyphens.
    fn scan_generic(&self, content: &str) -> BTreeSet<Guid> {
        let mut refs = BTreeSet::new();
        for cap in self.generic_bare.captures_iter(content) {
            if let Some(guid) = cap.get(1).and_then(|m| return Guid::parse(m.as_str())) {
                refs.insert(guid);
            }
        }
        for cap in self.generic_hyphenated.captures_iter(content) {
            if let Some(guid) = cap.get(1).and_then(|m| return Guid::parse(m.as_str())) {
                refs.insert(guid);
            }
        }
        return refs;
    }

    /// Object-notation scan: quoted `"m_GUID"` string fields only.
    /// The object form of the field (`"m_GUID": { "data[0]": ... }`)
    /// is deliberately not matched.
    fn scan_json(&self, content: &str) -> BTreeSet<Guid> {
        let mut refs = BTreeSet::new();
        for cap in self.json_guid.captures_iter(content) {
            if let Some(guid) = cap.get(1).and_then(|m| return Guid::parse(m.as_str())) {
                refs.insert(guid);
            }
        }
        return refs;
    }

    /// Tag-based scan: bare `guid:` and `m_GUID:` fields, no quoting.
    fn scan_tagged(&self, content: &str) -> BTreeSet<Guid> {
        let mut refs = BTreeSet::new();
        for pattern in [&self.tagged_guid, &self.tagged_m_guid] {
            for cap in pattern.captures_iter(content) {
                if let Some(guid) = cap.get(1).and_then(|m| return Guid::parse(m.as_str())) {
                    refs.insert(guid);
                }
            }
        }
        return refs;
    }

    /// Texture-reference substructures in both dialects.
    fn scan_textures(&self, content: &str) -> BTreeSet<Guid> {
        let mut refs = BTreeSet::new();
        for pattern in [&self.texture_tagged, &self.texture_json] {
            for cap in pattern.captures_iter(content) {
                if let Some(guid) = cap.get(1).and_then(|m| return Guid::parse(m.as_str())) {
                    refs.insert(guid);
                }
            }
        }
        return refs;
    }
}
