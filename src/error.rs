/// Crate-level error types for assetdep.
use std::path::PathBuf;

/// Hard failures only. Per-file trouble during a walk or a resolution run
/// (unreadable content, malformed meta files) is absorbed locally and
/// reported as an issue, never raised through this type.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A user-supplied identifier is not a valid 32-hex GUID.
    #[error("invalid identifier: `{input}` (expected 32 hex characters)")]
    GuidInvalid {
        /// The rejected input string.
        input: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of the report failed.
    #[error("json serialize: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// No seed files were supplied to a resolution run.
    #[error("no seed files supplied")]
    NoSeeds,

    /// An index root was supplied but does not exist or is not a directory.
    /// Surfaced instead of returning an empty index, which would silently
    /// report every reference as missing.
    #[error("index root not found: {}", path.display())]
    RootNotFound {
        /// Path to the missing root directory.
        path: PathBuf,
    },

    /// A seed file handed to the resolver does not exist on disk.
    #[error("seed file not found: {}", path.display())]
    SeedNotFound {
        /// Path to the missing seed file.
        path: PathBuf,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),
}
