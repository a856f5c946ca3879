//! The four Git object kinds, their framing/hashing/storage pipeline, and dispatch.
//!
//! `GitObject` is a closed sum type (Design Note 9): dispatch happens by matching on
//! the variant, never through a trait-object + downcast.

mod blob;
mod commit;
mod tag;
mod tree;

pub use blob::Blob;
pub use commit::Commit;
pub use tag::Tag;
pub use tree::{Tree, TreeEntry};

use std::fs::File;
use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use sha1::{Digest, Sha1};

use crate::error::{Error, IoResultExt, Result};
use crate::repository::Repository;

/// The kind tag stored in an object's header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Blob,
    Commit,
    Tree,
    Tag,
}

impl Kind {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Kind::Blob => b"blob",
            Kind::Commit => b"commit",
            Kind::Tree => b"tree",
            Kind::Tag => b"tag",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Blob => "blob",
            Kind::Commit => "commit",
            Kind::Tree => "tree",
            Kind::Tag => "tag",
        }
    }

    fn parse(raw: &[u8], sha: &str) -> Result<Kind> {
        match raw {
            b"blob" => Ok(Kind::Blob),
            b"commit" => Ok(Kind::Commit),
            b"tree" => Ok(Kind::Tree),
            b"tag" => Ok(Kind::Tag),
            other => Err(Error::UnknownObjectType {
                sha: sha.to_string(),
                kind: String::from_utf8_lossy(other).into_owned(),
            }),
        }
    }
}

/// A decoded Git object: one of blob, commit, tree, or tag.
pub enum GitObject {
    Blob(Blob),
    Commit(Commit),
    Tree(Tree),
    Tag(Tag),
}

impl GitObject {
    pub fn kind(&self) -> Kind {
        match self {
            GitObject::Blob(_) => Kind::Blob,
            GitObject::Commit(_) => Kind::Commit,
            GitObject::Tree(_) => Kind::Tree,
            GitObject::Tag(_) => Kind::Tag,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            GitObject::Blob(b) => b.serialize(),
            GitObject::Commit(c) => c.serialize(),
            GitObject::Tree(t) => t.serialize(),
            GitObject::Tag(t) => t.serialize(),
        }
    }

    fn deserialize(kind: Kind, data: &[u8]) -> Result<GitObject> {
        Ok(match kind {
            Kind::Blob => GitObject::Blob(Blob::deserialize(data)),
            Kind::Commit => GitObject::Commit(Commit::deserialize(data)?),
            Kind::Tree => GitObject::Tree(Tree::deserialize(data)?),
            Kind::Tag => GitObject::Tag(Tag::deserialize(data)?),
        })
    }

    pub fn as_commit(&self) -> Option<&Commit> {
        match self {
            GitObject::Commit(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            GitObject::Tree(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            GitObject::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            GitObject::Tag(t) => Some(t),
            _ => None,
        }
    }
}

fn shard_path(repo: &Repository, sha: &str, make: bool) -> Result<std::path::PathBuf> {
    repo.file(&["objects", &sha[0..2], &sha[2..]], make)
}

/// Reads and decodes the object named `sha` from `repo`.
pub fn read(repo: &Repository, sha: &str) -> Result<GitObject> {
    log::debug!("retrieving file for object '{}'", sha);
    let path = shard_path(repo, sha, false)?;

    let f = File::open(&path).with_path(&path)?;
    let mut raw = Vec::new();
    ZlibDecoder::new(f)
        .read_to_end(&mut raw)
        .with_path(&path)?;

    let space = raw
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| Error::MalformedObject {
            sha: sha.to_string(),
            reason: "missing header separator".into(),
        })?;
    let kind = Kind::parse(&raw[..space], sha)?;

    let nul = raw[space..]
        .iter()
        .position(|&b| b == 0)
        .map(|i| i + space)
        .ok_or_else(|| Error::MalformedObject {
            sha: sha.to_string(),
            reason: "missing NUL after size".into(),
        })?;
    let size: usize = std::str::from_utf8(&raw[space + 1..nul])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::MalformedObject {
            sha: sha.to_string(),
            reason: "invalid size field".into(),
        })?;

    let body = &raw[nul + 1..];
    if size != body.len() {
        return Err(Error::MalformedObject {
            sha: sha.to_string(),
            reason: "bad length".into(),
        });
    }

    log::debug!("object '{}' is a {} of {} bytes", sha, kind.as_str(), size);
    GitObject::deserialize(kind, body)
}

fn envelope(kind: Kind, payload: &[u8]) -> Vec<u8> {
    let mut envelope = Vec::with_capacity(payload.len() + 32);
    envelope.extend_from_slice(kind.as_bytes());
    envelope.push(b' ');
    envelope.extend_from_slice(payload.len().to_string().as_bytes());
    envelope.push(0);
    envelope.extend_from_slice(payload);
    envelope
}

/// Computes the SHA-1 name for `(kind, payload)` without touching the filesystem.
pub fn hash_of(kind: Kind, payload: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(envelope(kind, payload));
    hex::encode(hasher.finalize())
}

/// Serializes `object`, computes its SHA-1 name, and — if `repo` is given and no
/// object with that name already exists — writes the zlib-compressed envelope.
/// Returns the SHA-1 name either way (write-once, read-many; §3).
pub fn write(repo: Option<&Repository>, object: &GitObject) -> Result<String> {
    let payload = object.serialize();
    let envelope = envelope(object.kind(), &payload);
    let sha = hash_of(object.kind(), &payload);

    if let Some(repo) = repo {
        let path = shard_path(repo, &sha, true)?;
        if !path.exists() {
            let f = File::create(&path).with_path(&path)?;
            let mut encoder = ZlibEncoder::new(f, Compression::default());
            encoder.write_all(&envelope).with_path(&path)?;
            log::debug!("wrote object '{}' ({} bytes)", sha, payload.len());
        }
    }

    Ok(sha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn hash_object_matches_known_git_sha() {
        // `printf 'hello\n' | git hash-object --stdin` => ce013625030ba8dba906f756967f9e9ca394464a
        let sha = hash_of(Kind::Blob, b"hello\n");
        assert_eq!(sha, "ce013625030ba8dba906f756967f9e9ca394464a");
    }

    #[test]
    fn write_then_read_round_trips_blob() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let blob = GitObject::Blob(Blob::new(b"hello\n".to_vec()));
        let sha = write(Some(&repo), &blob).unwrap();
        assert_eq!(sha, "ce013625030ba8dba906f756967f9e9ca394464a");

        let path = repo
            .gitdir()
            .join("objects")
            .join(&sha[0..2])
            .join(&sha[2..]);
        assert!(path.exists());

        let read_back = read(&repo, &sha).unwrap();
        assert_eq!(read_back.as_blob().unwrap().data(), b"hello\n");
    }

    #[test]
    fn write_is_idempotent_on_existing_object() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let blob = GitObject::Blob(Blob::new(b"same content".to_vec()));
        let sha1 = write(Some(&repo), &blob).unwrap();
        let sha2 = write(Some(&repo), &blob).unwrap();
        assert_eq!(sha1, sha2);
    }

    #[test]
    fn write_without_repo_only_hashes() {
        let blob = GitObject::Blob(Blob::new(b"no repo".to_vec()));
        let sha = write(None, &blob).unwrap();
        assert_eq!(sha, hash_of(Kind::Blob, b"no repo"));
    }
}
