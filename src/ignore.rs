//! `.gitignore` rule matching: absolute rule sets (`.git/info/exclude`, the XDG global
//! ignore file) and scoped rule sets (one per directory holding a `.gitignore` blob in
//! the index), with scoped rules taking precedence over absolute ones.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::{Error, Result};
use crate::index::Index;
use crate::objects;
use crate::repository::Repository;

/// A single parsed rule: `(pattern, is_match_meaning_ignore)`. Negated rules
/// (`!pattern`) carry `false`.
pub type Rule = (String, bool);

pub struct Ignore {
    pub absolute: Vec<Vec<Rule>>,
    pub scoped: HashMap<String, Vec<Rule>>,
}

fn parse_line(raw: &str) -> Option<Rule> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        None
    } else if let Some(rest) = raw.strip_prefix('!') {
        Some((rest.to_string(), false))
    } else if let Some(rest) = raw.strip_prefix('\\') {
        Some((rest.to_string(), true))
    } else {
        Some((raw.to_string(), true))
    }
}

fn parse_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<Rule> {
    lines.filter_map(parse_line).collect()
}

/// Gathers every rule set visible to `repo`: `.git/info/exclude`, the XDG global
/// ignore file, and every `.gitignore` blob tracked in the index.
pub fn read(repo: &Repository) -> Result<Ignore> {
    let mut ignore = Ignore {
        absolute: Vec::new(),
        scoped: HashMap::new(),
    };

    let exclude_path = repo.gitdir().join("info/exclude");
    if let Ok(contents) = fs::read_to_string(&exclude_path) {
        ignore.absolute.push(parse_lines(contents.lines()));
    }

    let config_home = env::var("XDG_CONFIG_HOME")
        .ok()
        .map(std::path::PathBuf::from)
        .or_else(|| env::var("HOME").ok().map(|h| Path::new(&h).join(".config")));
    if let Some(config_home) = config_home {
        let global_path = config_home.join("git/ignore");
        if let Ok(contents) = fs::read_to_string(&global_path) {
            ignore.absolute.push(parse_lines(contents.lines()));
        }
    }

    let index = Index::read(repo)?;
    for entry in &index.entries {
        if entry.name == ".gitignore" || entry.name.ends_with("/.gitignore") {
            let dir_name = match entry.name.rfind('/') {
                Some(i) => entry.name[..i].to_string(),
                None => String::new(),
            };
            let object = objects::read(repo, &entry.sha)?;
            let blob = object
                .as_blob()
                .ok_or_else(|| Error::MalformedIndex(format!("{} is not a blob", entry.name)))?;
            let text = String::from_utf8_lossy(blob.data()).into_owned();
            ignore.scoped.insert(dir_name, parse_lines(text.lines()));
        }
    }

    Ok(ignore)
}

/// Translates a gitignore glob pattern into an anchored regex, in the spirit of
/// Python's `fnmatch`: `*` matches any run of characters, `?` matches one.
fn glob_to_regex(pattern: &str) -> Regex {
    let mut out = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '.' | '+' | '(' | ')' | '|' | '^' | '$' | '{' | '}' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '[' => out.push('['),
            ']' => out.push(']'),
            other => out.push(other),
        }
    }
    out.push('$');
    Regex::new(&out).unwrap_or_else(|_| Regex::new("$^").unwrap())
}

fn check_rules(rules: &[Rule], path: &str) -> Option<bool> {
    let mut result = None;
    for (pattern, value) in rules {
        if glob_to_regex(pattern).is_match(path) {
            result = Some(*value);
        }
    }
    result
}

fn check_scoped(scoped: &HashMap<String, Vec<Rule>>, path: &str) -> Option<bool> {
    let mut parent = match path.rfind('/') {
        Some(i) => path[..i].to_string(),
        None => String::new(),
    };

    loop {
        if let Some(rules) = scoped.get(&parent) {
            if let Some(result) = check_rules(rules, path) {
                return Some(result);
            }
        }
        if parent.is_empty() {
            break;
        }
        parent = match parent.rfind('/') {
            Some(i) => parent[..i].to_string(),
            None => String::new(),
        };
    }
    None
}

fn check_absolute(absolute: &[Vec<Rule>], path: &str) -> bool {
    for rules in absolute {
        if let Some(result) = check_rules(rules, path) {
            return result;
        }
    }
    false
}

/// Tests whether `path` (relative to the repository root) is ignored, consulting the
/// nearest enclosing scoped rule set first, falling back to the absolute rule sets.
pub fn check(ignore: &Ignore, path: &str) -> Result<bool> {
    if Path::new(path).is_absolute() {
        return Err(Error::AbsolutePathRejected(path.into()));
    }

    if let Some(result) = check_scoped(&ignore.scoped, path) {
        return Ok(result);
    }

    Ok(check_absolute(&ignore.absolute, path))
}
