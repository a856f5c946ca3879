//! Reference storage: loose refs under `.git/refs` and `.git/HEAD`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{IoResultExt, Result};
use crate::repository::Repository;

/// A resolved reference tree: either a single SHA-1, or a nested directory of refs,
/// keyed by basename in sorted order (`BTreeMap` gives us that for free).
#[derive(Debug, Clone)]
pub enum RefValue {
    Direct(String),
    Nested(BTreeMap<String, RefValue>),
}

/// Resolves the reference file at `gitdir/<path>`, following `ref: <other>` indirection
/// iteratively (§9) until a raw 40-hex-digit SHA-1 is reached. Returns `None` if the
/// reference does not exist (e.g. HEAD on a brand-new branch with no commits yet).
pub fn resolve(repo: &Repository, path: &str) -> Result<Option<String>> {
    let mut current = repo.gitdir().join(path);

    loop {
        if !current.is_file() {
            return Ok(None);
        }

        let data = fs::read_to_string(&current).with_path(&current)?;
        let data = data.trim_end_matches('\n');

        if let Some(target) = data.strip_prefix("ref: ") {
            current = repo.gitdir().join(target);
        } else {
            return Ok(Some(data.to_string()));
        }
    }
}

/// Writes `sha` as the direct target of `refs/<name>`, creating parent directories.
pub fn create(repo: &Repository, name: &str, sha: &str) -> Result<()> {
    let segments: Vec<&str> = name.split('/').collect();
    let mut path_segments = vec!["refs"];
    path_segments.extend(segments);

    let path = repo.file(&path_segments, true)?;
    fs::write(&path, format!("{}\n", sha)).with_path(&path)?;
    Ok(())
}

/// Recursively lists every reference under `gitdir/<dir>`, sorted by basename at each
/// level, following indirect refs to their final SHA-1.
pub fn list(repo: &Repository, dir: &Path) -> Result<BTreeMap<String, RefValue>> {
    let mut out = BTreeMap::new();

    let mut entries: Vec<_> = fs::read_dir(dir).with_path(dir)?.collect::<std::io::Result<_>>().with_path(dir)?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        if path.is_dir() {
            out.insert(name, RefValue::Nested(list(repo, &path)?));
        } else {
            let relative = path
                .strip_prefix(repo.gitdir())
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();
            if let Some(sha) = resolve(repo, &relative)? {
                out.insert(name, RefValue::Direct(sha));
            }
        }
    }

    Ok(out)
}

/// Lists every local reference (`refs/heads`, `refs/tags`, remotes, ...), grouped under
/// the top-level `refs` directory.
pub fn list_all(repo: &Repository) -> Result<BTreeMap<String, RefValue>> {
    list(repo, &repo.path(&["refs"]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn resolves_direct_ref() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        create(&repo, "heads/master", &"a".repeat(40)).unwrap();

        let resolved = resolve(&repo, "refs/heads/master").unwrap();
        assert_eq!(resolved, Some("a".repeat(40)));
    }

    #[test]
    fn follows_indirect_head() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        create(&repo, "heads/master", &"b".repeat(40)).unwrap();

        let resolved = resolve(&repo, "HEAD").unwrap();
        assert_eq!(resolved, Some("b".repeat(40)));
    }

    #[test]
    fn missing_ref_resolves_to_none() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let resolved = resolve(&repo, "refs/heads/master").unwrap();
        assert_eq!(resolved, None);
    }

    #[test]
    fn list_all_nests_by_directory() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        create(&repo, "heads/master", &"c".repeat(40)).unwrap();
        create(&repo, "tags/v1.0", &"d".repeat(40)).unwrap();

        let refs = list_all(&repo).unwrap();
        match refs.get("heads").unwrap() {
            RefValue::Nested(m) => {
                assert!(matches!(m.get("master"), Some(RefValue::Direct(_))));
            }
            _ => panic!("expected nested heads"),
        }
        match refs.get("tags").unwrap() {
            RefValue::Nested(m) => {
                assert!(matches!(m.get("v1.0"), Some(RefValue::Direct(_))));
            }
            _ => panic!("expected nested tags"),
        }
    }
}
