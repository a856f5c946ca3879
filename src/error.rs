use std::path::PathBuf;

use thiserror::Error;

/// Every way the core can fail, grounded in §7 of the design document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("not a git repository (or any parent up to mount point): {0}")]
    NotARepository(PathBuf),

    #[error("unsupported repositoryformatversion: {0:?}")]
    UnsupportedFormat(Option<String>),

    #[error("path exists and is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("malformed object {sha}: {reason}")]
    MalformedObject { sha: String, reason: String },

    #[error("unknown object type {kind:?} for object {sha}")]
    UnknownObjectType { sha: String, kind: String },

    #[error("malformed tree entry: mode length must be 5 or 6, was {0}")]
    MalformedTreeEntry(usize),

    #[error("malformed commit/tag data: {0}")]
    MalformedKvlm(String),

    #[error("malformed index file: {0}")]
    MalformedIndex(String),

    #[error("malformed repository config: {0}")]
    MalformedConfig(String),

    #[error("no such reference {0}")]
    NoSuchReference(String),

    #[error("ambiguous reference {name}: candidates are:\n - {}", candidates.join("\n - "))]
    AmbiguousReference { name: String, candidates: Vec<String> },

    #[error("bad revision {0:?}")]
    BadRevision(String),

    #[error("not empty: {0}")]
    NotEmptyDirectory(PathBuf),

    #[error("this function requires a path relative to the repository's root, got {0}")]
    AbsolutePathRejected(PathBuf),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Attaches path context to a raw `io::Error`, in the style the example corpus uses
/// throughout its `object`/`repo` modules.
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
