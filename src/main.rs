use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use wyag::error::{IoResultExt, Result};
use wyag::index::Index;
use wyag::objects::{self, GitObject, Kind};
use wyag::refs::{self, RefValue};
use wyag::repository::Repository;
use wyag::revision;
use wyag::{checkout, ignore};

/// Finds the repository containing the current directory, or fails loudly.
fn find_repo() -> Result<Repository> {
    let cwd = std::env::current_dir().with_path(".")?;
    Repository::find(&cwd, true).map(|repo| repo.expect("find(required = true) never returns None"))
}

/// The stupid content tracker
#[derive(Parser, Debug)]
#[command(name = "wyag", version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new, empty repository
    Init {
        #[arg(default_value = ".")]
        directory: PathBuf,
    },
    /// Provide content of repository objects
    CatFile {
        #[arg(value_enum)]
        kind: ObjectKind,
        object: String,
    },
    /// Compute object ID and optionally creates a blob from a file
    HashObject {
        #[arg(short = 't', value_enum, default_value = "blob")]
        kind: ObjectKind,
        #[arg(short = 'w')]
        write: bool,
        path: PathBuf,
    },
    /// Display history of a given commit
    Log {
        #[arg(default_value = "HEAD")]
        commit: String,
    },
    /// Pretty-print a tree object
    LsTree {
        #[arg(short = 'r')]
        recursive: bool,
        tree: String,
    },
    /// Checkout a commit inside of a directory
    Checkout { commit: String, path: PathBuf },
    /// List references
    ShowRef,
    /// List and create tags
    Tag {
        #[arg(short = 'a')]
        annotate: bool,
        name: Option<String>,
        #[arg(default_value = "HEAD")]
        object: String,
    },
    /// Parse revision (or other objects) identifiers
    RevParse {
        #[arg(long = "wyag-type", value_enum)]
        kind: Option<ObjectKind>,
        name: String,
    },
    /// List all the stage files
    LsFiles {
        #[arg(long, short)]
        verbose: bool,
    },
    /// Check path(s) against ignore rules
    CheckIgnore { paths: Vec<PathBuf> },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum ObjectKind {
    Blob,
    Commit,
    Tag,
    Tree,
}

impl From<ObjectKind> for Kind {
    fn from(k: ObjectKind) -> Kind {
        match k {
            ObjectKind::Blob => Kind::Blob,
            ObjectKind::Commit => Kind::Commit,
            ObjectKind::Tag => Kind::Tag,
            ObjectKind::Tree => Kind::Tree,
        }
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(err) = run(args.command) {
        eprintln!("wyag: {}", err);
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Init { directory } => {
            Repository::init(&directory)?;
        }
        Command::CatFile { kind, object } => cmd_cat_file(kind, &object)?,
        Command::HashObject { kind, write, path } => cmd_hash_object(kind, write, &path)?,
        Command::Log { commit } => cmd_log(&commit)?,
        Command::LsTree { recursive, tree } => cmd_ls_tree(&tree, recursive)?,
        Command::Checkout { commit, path } => cmd_checkout(&commit, &path)?,
        Command::ShowRef => cmd_show_ref()?,
        Command::Tag {
            annotate,
            name,
            object,
        } => cmd_tag(annotate, name, &object)?,
        Command::RevParse { kind, name } => cmd_rev_parse(kind, &name)?,
        Command::LsFiles { verbose } => cmd_ls_files(verbose)?,
        Command::CheckIgnore { paths } => cmd_check_ignore(&paths)?,
    }
    Ok(())
}

fn cmd_cat_file(kind: ObjectKind, object: &str) -> Result<()> {
    let repo = find_repo()?;
    let sha = revision::find_object(&repo, object, Some(kind.into()), true)?;
    let obj = objects::read(&repo, &sha)?;
    std::io::stdout().write_all(&obj.serialize()).with_path("-")?;
    Ok(())
}

fn cmd_hash_object(kind: ObjectKind, write: bool, path: &std::path::Path) -> Result<()> {
    let repo = if write { Some(find_repo()?) } else { None };

    let mut data = Vec::new();
    std::fs::File::open(path)
        .with_path(path)?
        .read_to_end(&mut data)
        .with_path(path)?;

    let object = build_object(kind.into(), &data)?;
    let sha = objects::write(repo.as_ref(), &object)?;
    println!("{}", sha);
    Ok(())
}

fn build_object(kind: Kind, data: &[u8]) -> Result<GitObject> {
    Ok(match kind {
        Kind::Blob => GitObject::Blob(objects::Blob::new(data.to_vec())),
        Kind::Commit => GitObject::Commit(objects::Commit::deserialize(data)?),
        Kind::Tree => GitObject::Tree(objects::Tree::deserialize(data)?),
        Kind::Tag => GitObject::Tag(objects::Tag::deserialize(data)?),
    })
}

fn cmd_log(commit: &str) -> Result<()> {
    let repo = find_repo()?;
    let sha = revision::find_object(&repo, commit, None, true)?;

    println!("digraph wyaglog{{");
    println!("  node[shape=rect]");
    let mut seen = HashSet::new();
    log_graphviz(&repo, &sha, &mut seen)?;
    println!("}}");
    Ok(())
}

fn log_graphviz(repo: &Repository, sha: &str, seen: &mut HashSet<String>) -> Result<()> {
    if seen.contains(sha) {
        return Ok(());
    }
    seen.insert(sha.to_string());

    let object = objects::read(repo, sha)?;
    let commit = object
        .as_commit()
        .expect("log_graphviz only ever visits commits");

    let message = String::from_utf8_lossy(commit.message());
    let first_line = message.trim().lines().next().unwrap_or("");
    let escaped = first_line.replace('\\', "\\\\").replace('"', "\\\"");

    println!("  c_{} [label=\"{}: {}\"]", sha, &sha[0..7], escaped);

    for parent in commit.parents() {
        println!("  c_{} -> c_{};", sha, parent);
        log_graphviz(repo, &parent, seen)?;
    }
    Ok(())
}

fn cmd_ls_tree(tree: &str, recursive: bool) -> Result<()> {
    let repo = find_repo()?;
    let sha = revision::find_object(&repo, tree, Some(Kind::Tree), true)?;
    ls_tree(&repo, &sha, recursive, "")
}

fn ls_tree(repo: &Repository, sha: &str, recursive: bool, prefix: &str) -> Result<()> {
    let object = objects::read(repo, sha)?;
    let tree = object.as_tree().expect("ls_tree only ever visits trees");

    for entry in &tree.entries {
        let kind = match entry.mode_prefix() {
            "04" => "tree",
            "10" => "blob",
            "12" => "blob",
            "16" => "commit",
            other => {
                log::warn!("weird tree leaf mode prefix {:?}", other);
                "blob"
            }
        };

        let full_path = if prefix.is_empty() {
            entry.path.clone()
        } else {
            format!("{}/{}", prefix, entry.path)
        };

        if recursive && kind == "tree" {
            ls_tree(repo, &entry.sha, recursive, &full_path)?;
        } else {
            println!("{} {} {}\t{}", entry.mode, kind, entry.sha, full_path);
        }
    }
    Ok(())
}

fn cmd_checkout(commit: &str, path: &std::path::Path) -> Result<()> {
    let repo = find_repo()?;
    let sha = revision::find_object(&repo, commit, None, true)?;
    checkout::checkout(&repo, &sha, path)
}

fn cmd_show_ref() -> Result<()> {
    let repo = find_repo()?;
    let refs = refs::list_all(&repo)?;
    show_ref(&refs, true, "refs");
    Ok(())
}

fn show_ref(refs: &std::collections::BTreeMap<String, RefValue>, with_hash: bool, prefix: &str) {
    for (name, value) in refs {
        match value {
            RefValue::Direct(sha) => {
                if with_hash {
                    println!("{} {}/{}", sha, prefix, name);
                } else {
                    println!("{}/{}", prefix, name);
                }
            }
            RefValue::Nested(nested) => {
                show_ref(nested, with_hash, &format!("{} {}", prefix, name));
            }
        }
    }
}

fn cmd_tag(annotate: bool, name: Option<String>, object: &str) -> Result<()> {
    let repo = find_repo()?;

    match name {
        Some(name) => {
            let target = revision::find_object(&repo, object, None, true)?;
            if annotate {
                let tag = objects::Tag::annotated(&name, &target);
                let sha = objects::write(Some(&repo), &GitObject::Tag(tag))?;
                refs::create(&repo, &format!("tags/{}", name), &sha)?;
            } else {
                refs::create(&repo, &format!("tags/{}", name), &target)?;
            }
        }
        None => {
            let refs = refs::list_all(&repo)?;
            if let Some(RefValue::Nested(tags)) = refs.get("tags") {
                show_ref(tags, false, "refs tags");
            }
        }
    }
    Ok(())
}

fn cmd_rev_parse(kind: Option<ObjectKind>, name: &str) -> Result<()> {
    let repo = find_repo()?;
    let sha = revision::find_object(&repo, name, kind.map(Into::into), true)?;
    println!("{}", sha);
    Ok(())
}

fn cmd_ls_files(verbose: bool) -> Result<()> {
    let repo = find_repo()?;
    let index = Index::read(&repo)?;

    if verbose {
        println!(
            "Index file format v{}, containing {} entries.",
            index.version,
            index.entries.len()
        );
    }

    for entry in &index.entries {
        println!("{}", entry.name);
        if verbose {
            let entry_type = match entry.mode_type {
                wyag::index::ModeType::Regular => "regular file",
                wyag::index::ModeType::Symlink => "symlink",
                wyag::index::ModeType::Gitlink => "git link",
            };
            println!("  {} with perms: {:o}", entry_type, entry.mode_perms);
            println!("  on blob: {}", entry.sha);
            println!(
                "  created: {}.{}, modified: {}.{}",
                entry.ctime.0, entry.ctime.1, entry.mtime.0, entry.mtime.1
            );
            println!("  device: {}, inode: {}", entry.dev, entry.ino);
            println!("  user: {}  group: {}", entry.uid, entry.gid);
            println!(
                "  flags: stage={} assume_valid={}",
                entry.flag_stage, entry.flag_assume_valid
            );
        }
    }
    Ok(())
}

fn cmd_check_ignore(paths: &[PathBuf]) -> Result<()> {
    let repo = find_repo()?;
    let rules = ignore::read(&repo)?;

    for path in paths {
        let path_str = path.to_string_lossy();
        if ignore::check(&rules, &path_str)? {
            println!("{}", path_str);
        }
    }
    Ok(())
}
