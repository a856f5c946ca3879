//! Materializes a tree object onto disk.

use std::fs;
use std::path::Path;

use crate::error::{Error, IoResultExt, Result};
use crate::objects::{self, GitObject, Tree};
use crate::repository::Repository;

/// Checks out `commit_or_tree` into `path`, which must either not exist yet or be an
/// empty directory.
pub fn checkout(repo: &Repository, commit_or_tree: &str, path: &Path) -> Result<()> {
    let object = objects::read(repo, commit_or_tree)?;

    let tree = match &object {
        GitObject::Commit(commit) => {
            let tree_sha = commit
                .tree()
                .ok_or_else(|| Error::BadRevision(commit_or_tree.to_string()))?
                .to_string();
            match objects::read(repo, &tree_sha)? {
                GitObject::Tree(tree) => tree,
                _ => return Err(Error::BadRevision(commit_or_tree.to_string())),
            }
        }
        GitObject::Tree(_) => match object {
            GitObject::Tree(tree) => tree,
            _ => unreachable!(),
        },
        _ => return Err(Error::BadRevision(commit_or_tree.to_string())),
    };

    if path.exists() {
        if !path.is_dir() {
            return Err(Error::NotADirectory(path.to_path_buf()));
        }
        if path.read_dir().with_path(path)?.next().is_some() {
            return Err(Error::NotEmptyDirectory(path.to_path_buf()));
        }
    } else {
        fs::create_dir_all(path).with_path(path)?;
    }

    checkout_tree(repo, &tree, path)
}

fn checkout_tree(repo: &Repository, tree: &Tree, path: &Path) -> Result<()> {
    for entry in &tree.entries {
        let dest = path.join(&entry.path);
        let object = objects::read(repo, &entry.sha)?;

        match object {
            GitObject::Tree(subtree) => {
                fs::create_dir(&dest).with_path(&dest)?;
                checkout_tree(repo, &subtree, &dest)?;
            }
            GitObject::Blob(blob) => {
                fs::write(&dest, blob.data()).with_path(&dest)?;
            }
            other => {
                log::warn!(
                    "skipping tree entry {:?}: unsupported object kind {:?}",
                    entry.path,
                    other.kind()
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Blob, GitObject, TreeEntry};
    use tempfile::tempdir;

    #[test]
    fn checks_out_nested_tree() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let blob_sha = objects::write(
            Some(&repo),
            &GitObject::Blob(Blob::new(b"contents\n".to_vec())),
        )
        .unwrap();

        let inner = Tree::new(vec![TreeEntry::new("100644", "file.txt", blob_sha.clone())]);
        let inner_sha = objects::write(Some(&repo), &GitObject::Tree(inner)).unwrap();

        let outer = Tree::new(vec![TreeEntry::new("40000", "sub", inner_sha)]);
        let outer_sha = objects::write(Some(&repo), &GitObject::Tree(outer)).unwrap();

        let dest = dir.path().join("out");
        checkout(&repo, &outer_sha, &dest).unwrap();

        let written = std::fs::read_to_string(dest.join("sub").join("file.txt")).unwrap();
        assert_eq!(written, "contents\n");
    }

    #[test]
    fn refuses_nonempty_destination() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let tree_sha =
            objects::write(Some(&repo), &GitObject::Tree(Tree::new(Vec::new()))).unwrap();

        let dest = dir.path().join("out");
        std::fs::create_dir(&dest).unwrap();
        std::fs::write(dest.join("existing"), b"x").unwrap();

        let err = checkout(&repo, &tree_sha, &dest).unwrap_err();
        assert!(matches!(err, Error::NotEmptyDirectory(_)));
    }
}
