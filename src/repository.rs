use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use configparser::ini::{Ini, IniDefault};

use crate::error::{Error, IoResultExt, Result};

/// A Git repository: a worktree paired with a `.git` directory and its config.
#[derive(Clone)]
pub struct Repository {
    worktree: PathBuf,
    gitdir: PathBuf,
    config: Ini,
}

impl Repository {
    pub fn worktree(&self) -> &Path {
        &self.worktree
    }

    pub fn gitdir(&self) -> &Path {
        &self.gitdir
    }

    /// Opens the repository rooted at `path`. Unless `force`, `path/.git` must already
    /// be a directory and `.git/config` must declare `repositoryformatversion = 0`.
    pub fn open(path: &Path, force: bool) -> Result<Repository> {
        let worktree = path.to_path_buf();
        let gitdir = worktree.join(".git");

        if !(force || gitdir.is_dir()) {
            return Err(Error::NotARepository(worktree));
        }

        let mut config = Ini::new();
        let config_path = gitdir.join("config");
        if config_path.exists() {
            config
                .load(&config_path)
                .map_err(Error::MalformedConfig)?;
        } else if !force {
            return Err(Error::NotARepository(worktree));
        }

        if !force {
            let version = config.get("core", "repositoryformatversion");
            if version.as_deref() != Some("0") {
                return Err(Error::UnsupportedFormat(version));
            }
        }

        log::debug!("opened repository at {:?}", worktree);

        Ok(Repository {
            worktree,
            gitdir,
            config,
        })
    }

    /// Walks from `start` upward looking for a `.git` directory, iteratively (§9: avoid
    /// recursion so pathologically deep trees can't blow the stack).
    pub fn find(start: &Path, required: bool) -> Result<Option<Repository>> {
        let mut current = start
            .canonicalize()
            .with_path(start)?;

        loop {
            if current.join(".git").is_dir() {
                return Ok(Some(Repository::open(&current, false)?));
            }

            match current.parent() {
                Some(parent) => {
                    let parent = parent.to_path_buf();
                    if parent == current {
                        // realpath(parent) == realpath(self): we've hit the root.
                        break;
                    }
                    current = parent;
                }
                None => break,
            }
        }

        if required {
            Err(Error::NotARepository(start.to_path_buf()))
        } else {
            Ok(None)
        }
    }

    fn default_config() -> Ini {
        let mut default = IniDefault::default();
        default.comment_symbols = vec!['#'];
        default.delimiters = vec!['='];
        default.case_sensitive = true;
        default.multiline = false;

        let mut config = Ini::new_from_defaults(default);
        config.setstr("core", "repositoryformatversion", Some("0"));
        config.setstr("core", "filemode", Some("false"));
        config.setstr("core", "bare", Some("false"));
        config
    }

    /// Creates a brand-new repository at `path`. `path` must either not exist, or exist
    /// as an empty directory.
    pub fn init(path: &Path) -> Result<Repository> {
        let worktree = path.to_path_buf();
        let gitdir = worktree.join(".git");

        if worktree.exists() {
            if !worktree.is_dir() {
                return Err(Error::NotADirectory(worktree));
            }
            if worktree.read_dir().with_path(&worktree)?.next().is_some() {
                return Err(Error::NotEmptyDirectory(worktree));
            }
        } else {
            create_dir_all(&worktree).with_path(&worktree)?;
        }

        let mut repo = Repository {
            worktree,
            gitdir,
            config: Ini::new(),
        };

        repo.ensure_dir(&["branches"], true)?;
        repo.ensure_dir(&["objects"], true)?;
        repo.ensure_dir(&["refs", "tags"], true)?;
        repo.ensure_dir(&["refs", "heads"], true)?;

        let description_path = repo.file(&["description"], false)?;
        let mut f = File::create(&description_path).with_path(&description_path)?;
        writeln!(
            f,
            "Unnamed repository; edit this file 'description' to name the repository."
        )
        .with_path(&description_path)?;

        let head_path = repo.file(&["HEAD"], false)?;
        let mut f = File::create(&head_path).with_path(&head_path)?;
        writeln!(f, "ref: refs/heads/master").with_path(&head_path)?;

        repo.config = Repository::default_config();
        let config_path = repo.file(&["config"], false)?;
        repo.config
            .write(&config_path)
            .map_err(|source| Error::Io {
                path: config_path.clone(),
                source,
            })?;

        log::info!("initialized empty repository at {:?}", repo.worktree);

        Ok(repo)
    }

    /// Computes a path under the repository's gitdir.
    pub fn path(&self, segments: &[&str]) -> PathBuf {
        let mut p = self.gitdir.clone();
        for segment in segments {
            p.push(segment);
        }
        p
    }

    /// Ensures the directory named by `segments` exists (creating it, and its parents,
    /// if `make` is set). Returns `None` when the directory is absent and `make` is false.
    pub fn ensure_dir(&self, segments: &[&str], make: bool) -> Result<Option<PathBuf>> {
        let dir = self.path(segments);

        if dir.exists() {
            if dir.is_dir() {
                return Ok(Some(dir));
            }
            return Err(Error::NotADirectory(dir));
        }

        if make {
            create_dir_all(&dir).with_path(&dir)?;
            Ok(Some(dir))
        } else {
            Ok(None)
        }
    }

    /// Same as `path`, but ensures `dirname(segments)` exists first. For example,
    /// `repo.file(&["refs", "remotes", "origin", "HEAD"], true)` creates
    /// `.git/refs/remotes/origin`.
    pub fn file(&self, segments: &[&str], make: bool) -> Result<PathBuf> {
        let (parent, _) = segments.split_at(segments.len() - 1);
        self.ensure_dir(parent, make)?;
        Ok(self.path(segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_creates_expected_layout() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        assert!(repo.gitdir().join("objects").is_dir());
        assert!(repo.gitdir().join("refs/heads").is_dir());
        assert!(repo.gitdir().join("refs/tags").is_dir());
        assert!(repo.gitdir().join("branches").is_dir());

        let head = std::fs::read_to_string(repo.gitdir().join("HEAD")).unwrap();
        assert_eq!(head, "ref: refs/heads/master\n");

        let config = std::fs::read_to_string(repo.gitdir().join("config")).unwrap();
        assert!(config.contains("repositoryformatversion"));
    }

    #[test]
    fn init_rejects_nonempty_directory() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("existing.txt"), b"hi").unwrap();

        let err = Repository::init(dir.path()).unwrap_err();
        assert!(matches!(err, Error::NotEmptyDirectory(_)));
    }

    #[test]
    fn find_walks_up_to_repo_root() {
        let dir = tempdir().unwrap();
        Repository::init(dir.path()).unwrap();

        let nested = dir.path().join("a/b/c");
        create_dir_all(&nested).unwrap();

        let found = Repository::find(&nested, true).unwrap().unwrap();
        assert_eq!(
            found.worktree().canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn find_without_repo_is_not_required_returns_none() {
        let dir = tempdir().unwrap();
        let found = Repository::find(dir.path(), false).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn open_rejects_unsupported_format_version() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let config_path = repo.gitdir().join("config");
        std::fs::write(
            &config_path,
            "[core]\nrepositoryformatversion = 1\nfilemode = false\nbare = false\n",
        )
        .unwrap();

        let err = Repository::open(dir.path(), false).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }
}
