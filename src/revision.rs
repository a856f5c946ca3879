//! Resolves user-supplied revision names (short hashes, tags, branches, `HEAD`) to
//! object SHA-1s, and follows tag/commit indirection to a target object kind.

use std::fs;

use regex::Regex;

use crate::error::{Error, Result};
use crate::objects::{self, Kind};
use crate::refs;
use crate::repository::Repository;

/// Returned by `resolve_name` for `HEAD` on a repository with no commits yet: the
/// indirect ref exists but its target doesn't. Never an empty candidate set.
pub const UNRESOLVED: &str = "unresolved";

/// Returned by `find_object` when the chain of tag/commit indirection can't reach
/// `target` (and, if `follow` was false, as soon as the first kind check fails).
pub const NONE: &str = "none";

fn short_hash_re() -> Regex {
    Regex::new(r"^[0-9A-Fa-f]{4,40}$").unwrap()
}

fn full_hash_re() -> Regex {
    Regex::new(r"^[0-9A-Fa-f]{40}$").unwrap()
}

/// Returns every object SHA-1 that `name` could plausibly refer to. Empty means no
/// match, a single element means an unambiguous match, more than one means `name` is
/// an ambiguous short hash. `HEAD` is non-ambiguous by construction: it always
/// resolves to exactly one candidate, which is `UNRESOLVED` on a brand-new repo with
/// no commits rather than an empty set.
pub fn resolve_name(repo: &Repository, name: &str) -> Result<Vec<String>> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(Vec::new());
    }

    let mut candidates = Vec::new();

    if name == "HEAD" {
        let head = refs::resolve(repo, "HEAD")?.unwrap_or_else(|| UNRESOLVED.to_string());
        candidates.push(head);
        return Ok(candidates);
    }

    if full_hash_re().is_match(name) {
        let lower = name.to_lowercase();
        let path = repo.gitdir().join("objects").join(&lower[0..2]).join(&lower[2..]);
        if path.is_file() {
            candidates.push(lower);
        }
    } else if short_hash_re().is_match(name) {
        let lower = name.to_lowercase();
        let shard_dir = repo.gitdir().join("objects").join(&lower[0..2]);
        if shard_dir.is_dir() {
            let rest = &lower[2..];
            for entry in fs::read_dir(&shard_dir).map_err(|source| Error::Io {
                path: shard_dir.clone(),
                source,
            })? {
                let entry = entry.map_err(|source| Error::Io {
                    path: shard_dir.clone(),
                    source,
                })?;
                let fname = entry.file_name().to_string_lossy().into_owned();
                if fname.starts_with(rest) {
                    candidates.push(format!("{}{}", &lower[0..2], fname));
                }
            }
        }
    }

    if let Some(sha) = refs::resolve(repo, &format!("refs/tags/{}", name))? {
        candidates.push(sha);
    }
    if let Some(sha) = refs::resolve(repo, &format!("refs/heads/{}", name))? {
        candidates.push(sha);
    }
    if let Some(sha) = refs::resolve(repo, &format!("refs/remotes/{}/HEAD", name))? {
        candidates.push(sha);
    }

    Ok(candidates)
}

/// Resolves `name` to exactly one SHA-1, erroring on no match or ambiguity.
pub fn resolve_unique(repo: &Repository, name: &str) -> Result<String> {
    let mut candidates = resolve_name(repo, name)?;
    match candidates.len() {
        0 => Err(Error::NoSuchReference(name.to_string())),
        1 => Ok(candidates.remove(0)),
        _ => Err(Error::AmbiguousReference {
            name: name.to_string(),
            candidates,
        }),
    }
}

/// Resolves `name`, then — if `target` is given — follows tag and commit
/// indirection until an object of `target` kind is reached (tag -> its object,
/// commit -> its tree), iteratively. Each follow step strictly reduces the kind
/// lattice (tag -> commit -> tree), so the loop always terminates.
///
/// If `target` is `None`, the single candidate is returned as-is (possibly
/// `revision::UNRESOLVED`, never read as an object). If `target` is given and the
/// chain can't reach it — either because `follow` is false and the first object's
/// kind doesn't already match, or because indirection bottoms out before reaching
/// it — returns `revision::NONE` rather than failing.
pub fn find_object(
    repo: &Repository,
    name: &str,
    target: Option<Kind>,
    follow: bool,
) -> Result<String> {
    let mut sha = resolve_unique(repo, name)?;

    let target = match target {
        Some(target) => target,
        None => return Ok(sha),
    };

    loop {
        let object = objects::read(repo, &sha)?;
        if object.kind() == target {
            return Ok(sha);
        }

        if !follow {
            return Ok(NONE.to_string());
        }

        sha = match &object {
            crate::objects::GitObject::Tag(tag) => match tag.object() {
                Some(target_sha) => target_sha.to_string(),
                None => return Ok(NONE.to_string()),
            },
            crate::objects::GitObject::Commit(commit) if target == Kind::Tree => {
                match commit.tree() {
                    Some(tree_sha) => tree_sha.to_string(),
                    None => return Ok(NONE.to_string()),
                }
            }
            _ => return Ok(NONE.to_string()),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Blob, GitObject};
    use tempfile::tempdir;

    #[test]
    fn resolves_head_through_indirection() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let blob = GitObject::Blob(Blob::new(b"x".to_vec()));
        let sha = objects::write(Some(&repo), &blob).unwrap();
        refs::create(&repo, "heads/master", &sha).unwrap();

        let resolved = resolve_unique(&repo, "HEAD").unwrap();
        assert_eq!(resolved, sha);
    }

    #[test]
    fn unknown_name_has_no_candidates() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let candidates = resolve_name(&repo, "nonexistent").unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn short_hash_resolves_uniquely() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let blob = GitObject::Blob(Blob::new(b"hello\n".to_vec()));
        let sha = objects::write(Some(&repo), &blob).unwrap();

        let short = &sha[0..8];
        let resolved = resolve_unique(&repo, short).unwrap();
        assert_eq!(resolved, sha);
    }

    #[test]
    fn head_on_fresh_repo_is_a_singleton_unresolved_candidate() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let candidates = resolve_name(&repo, "HEAD").unwrap();
        assert_eq!(candidates, vec![UNRESOLVED.to_string()]);

        // resolve_unique must not error just because HEAD is unresolved.
        let resolved = resolve_unique(&repo, "HEAD").unwrap();
        assert_eq!(resolved, UNRESOLVED);
    }

    #[test]
    fn find_object_with_no_target_surfaces_unresolved_head() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let sha = find_object(&repo, "HEAD", None, true).unwrap();
        assert_eq!(sha, UNRESOLVED);
    }

    #[test]
    fn find_object_without_follow_stops_at_first_mismatch() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let blob = GitObject::Blob(Blob::new(b"hello\n".to_vec()));
        let sha = objects::write(Some(&repo), &blob).unwrap();

        let result = find_object(&repo, &sha, Some(Kind::Commit), false).unwrap();
        assert_eq!(result, NONE);
    }

    #[test]
    fn find_object_follows_tag_to_its_target_commit() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let commit_raw = b"tree deadbeef\nauthor A <a@x> 1 +0000\n\nmsg\n";
        let commit = crate::objects::Commit::deserialize(commit_raw).unwrap();
        let commit_sha = objects::write(Some(&repo), &GitObject::Commit(commit)).unwrap();

        let tag = crate::objects::Tag::annotated("v1.0", &commit_sha);
        let tag_sha = objects::write(Some(&repo), &GitObject::Tag(tag)).unwrap();

        let resolved = find_object(&repo, &tag_sha, Some(Kind::Commit), true).unwrap();
        assert_eq!(resolved, commit_sha);
    }
}
