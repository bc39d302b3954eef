use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::types::Guid;

/// Well-known identifiers that name editor-shipped resources. These are
/// expected to be absent from every user-maintained tree and must never
/// be classified as missing.
#[derive(Debug, Clone)]
pub struct BuiltinTable {
    labels: BTreeMap<Guid, String>,
}

impl BuiltinTable {
    /// True if the identifier names a known builtin resource.
    pub fn contains(&self, guid: &Guid) -> bool {
        return self.labels.contains_key(guid);
    }

    /// The stock table: default shaders plus the editor's builtin
    /// resource bundles.
    pub fn defaults() -> Self {
        let entries = [
            ("00000000000000001000000000000000", "Standard"),
            ("00000000000000002000000000000000", "UI/Default"),
            ("00000000000000003000000000000000", "Sprites/Default"),
            ("0000000000000000e000000000000000", "Built-in Shader"),
            ("0000000000000000f000000000000000", "Built-in Extra"),
        ];
        let mut labels = BTreeMap::new();
        for (guid, label) in entries {
            if let Some(parsed) = Guid::parse(guid) {
                labels.insert(parsed, label.to_string());
            }
        }
        return BuiltinTable { labels };
    }

    /// Register an identifier as builtin. Later inserts win on conflict
    /// so user config can relabel a stock entry.
    pub fn insert(&mut self, guid: Guid, label: String) {
        self.labels.insert(guid, label);
    }

    /// The human label for a builtin identifier, if known.
    pub fn label(&self, guid: &Guid) -> Option<&str> {
        return self.labels.get(guid).map(String::as_str);
    }
}

/// Project configuration loaded from `.assetdep.toml`.
/// Exclude patterns are path prefixes applied to files relative to an
/// index root; `builtin` entries extend the stock builtin table.
pub struct Config {
    builtin: BTreeMap<String, String>,
    exclude: Vec<String>,
    mirror: Option<PathBuf>,
    roots: Vec<PathBuf>,
}

/// Raw TOML structure for `.assetdep.toml`.
#[derive(serde::Deserialize)]
struct AssetdepTomlConfig {
    #[serde(default)]
    builtin: BTreeMap<String, String>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    mirror: Option<PathBuf>,
    #[serde(default)]
    roots: Vec<PathBuf>,
}

impl Config {
    /// The stock builtin table extended with the config's `[builtin]`
    /// entries.
    ///
    /// # Errors
    ///
    /// Returns `Error::GuidInvalid` if a configured key is not a valid
    /// 32-hex identifier — a typo here would silently re-enable missing
    /// reports for the resource it was meant to cover.
    pub fn builtin_table(&self) -> Result<BuiltinTable, Error> {
        let mut table = BuiltinTable::defaults();
        for (key, label) in &self.builtin {
            let Some(guid) = Guid::parse(key) else {
                return Err(Error::GuidInvalid { input: key.clone() });
            };
            table.insert(guid, label.clone());
        }
        return Ok(table);
    }

    /// Load config from `.assetdep.toml` in the given directory.
    /// Returns defaults if the file doesn't exist. Returns an error if
    /// the file exists but is malformed — never silently falls back to
    /// defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(dir: &Path) -> Result<Self, Error> {
        let path = dir.join(".assetdep.toml");
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default_config()),
            Err(e) => return Err(Error::Io(e)),
        };

        let raw: AssetdepTomlConfig = toml::from_str(&content)?;
        return Ok(Config {
            builtin: raw.builtin,
            exclude: raw.exclude,
            mirror: raw.mirror,
            roots: raw.roots,
        });
    }

    /// The configured mirror tree, if any.
    pub fn mirror(&self) -> Option<&Path> {
        return self.mirror.as_deref();
    }

    /// The configured index roots, possibly empty.
    pub fn roots(&self) -> &[PathBuf] {
        return &self.roots;
    }

    /// Check whether a root-relative path should be visited by the
    /// index walk. A path is skipped if it starts with any exclude
    /// prefix.
    pub fn should_walk(&self, relative_path: &str) -> bool {
        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }

    /// Config used when no `.assetdep.toml` exists: no roots (auto
    /// discovery applies), no mirror, walk everything.
    fn default_config() -> Self {
        return Config {
            builtin: BTreeMap::new(),
            exclude: Vec::new(),
            mirror: None,
            roots: Vec::new(),
        };
    }
}
