use thiserror::Error;

/// Errors surfaced by a manifest lookup.
///
/// Archives that cannot be opened or read are reported as "no manifest"
/// instead; only a situation the caller cannot default through is an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// Several entries compete for the manifest and none can be chosen.
    #[error("Multiple {file_name} files were found.")]
    Ambiguous { file_name: String },
}
