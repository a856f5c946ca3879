//! Reader for the binary `DIRC` (v2) staging index.

use std::fs;

use crate::error::{Error, Result};
use crate::repository::Repository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeType {
    Regular,
    Symlink,
    Gitlink,
}

impl ModeType {
    fn from_bits(bits: u16) -> Result<ModeType> {
        match bits {
            0b1000 => Ok(ModeType::Regular),
            0b1010 => Ok(ModeType::Symlink),
            0b1110 => Ok(ModeType::Gitlink),
            other => Err(Error::MalformedIndex(format!(
                "unrecognised mode type {:#06b}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub ctime: (u32, u32),
    pub mtime: (u32, u32),
    pub dev: u32,
    pub ino: u32,
    pub mode_type: ModeType,
    pub mode_perms: u16,
    pub uid: u32,
    pub gid: u32,
    pub fsize: u32,
    pub sha: String,
    pub flag_assume_valid: bool,
    pub flag_stage: u16,
    pub name: String,
}

pub struct Index {
    pub version: u32,
    pub entries: Vec<IndexEntry>,
}

impl Index {
    fn empty() -> Index {
        Index {
            version: 2,
            entries: Vec::new(),
        }
    }

    /// Reads `.git/index`, or returns an empty v2 index when the file is absent (a
    /// freshly-initialized repository has no index yet).
    pub fn read(repo: &Repository) -> Result<Index> {
        let path = repo.gitdir().join("index");
        if !path.is_file() {
            return Ok(Index::empty());
        }

        let raw = fs::read(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;

        if raw.len() < 12 || &raw[0..4] != b"DIRC" {
            return Err(Error::MalformedIndex("missing DIRC signature".into()));
        }

        let version = u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]);
        if version != 2 {
            return Err(Error::MalformedIndex(format!(
                "unsupported index version {}",
                version
            )));
        }

        let count = u32::from_be_bytes([raw[8], raw[9], raw[10], raw[11]]) as usize;
        let content = &raw[12..];

        let mut entries = Vec::with_capacity(count);
        let mut idx = 0usize;

        for _ in 0..count {
            entries.push(parse_entry(content, &mut idx)?);
        }

        Ok(Index { version, entries })
    }
}

fn be32(content: &[u8], at: usize) -> Result<u32> {
    content
        .get(at..at + 4)
        .map(|s| u32::from_be_bytes([s[0], s[1], s[2], s[3]]))
        .ok_or_else(|| Error::MalformedIndex("truncated entry".into()))
}

fn be16(content: &[u8], at: usize) -> Result<u16> {
    content
        .get(at..at + 2)
        .map(|s| u16::from_be_bytes([s[0], s[1]]))
        .ok_or_else(|| Error::MalformedIndex("truncated entry".into()))
}

fn parse_entry(content: &[u8], idx: &mut usize) -> Result<IndexEntry> {
    let start = *idx;

    let ctime_s = be32(content, start)?;
    let ctime_ns = be32(content, start + 4)?;
    let mtime_s = be32(content, start + 8)?;
    let mtime_ns = be32(content, start + 12)?;
    let dev = be32(content, start + 16)?;
    let ino = be32(content, start + 20)?;

    let unused = be16(content, start + 24)?;
    if unused != 0 {
        return Err(Error::MalformedIndex("reserved field is not zero".into()));
    }

    let mode = be16(content, start + 26)?;
    let mode_type = ModeType::from_bits(mode >> 12)?;
    let mode_perms = mode & 0b0000_0001_1111_1111;

    let uid = be32(content, start + 28)?;
    let gid = be32(content, start + 32)?;
    let fsize = be32(content, start + 36)?;

    let sha_bytes = content
        .get(start + 40..start + 60)
        .ok_or_else(|| Error::MalformedIndex("truncated sha".into()))?;
    let sha = hex::encode(sha_bytes);

    let flags = be16(content, start + 60)?;
    let flag_assume_valid = flags & 0b1000_0000_0000_0000 != 0;
    let flag_extended = flags & 0b0100_0000_0000_0000 != 0;
    if flag_extended {
        return Err(Error::MalformedIndex("extended flag entries are not supported".into()));
    }
    let flag_stage = flags & 0b0011_0000_0000_0000;
    let name_length = (flags & 0b0000_1111_1111_1111) as usize;

    let mut pos = start + 62;

    let name = if name_length < 0xFFF {
        let name_end = pos + name_length;
        if content.get(name_end) != Some(&0x00) {
            return Err(Error::MalformedIndex("name is not NUL-terminated".into()));
        }
        let name = std::str::from_utf8(&content[pos..name_end])
            .map_err(|_| Error::MalformedIndex("name is not valid utf8".into()))?
            .to_string();
        pos = name_end + 1;
        name
    } else {
        let search_from = pos + 0xFFF;
        let null_idx = content[search_from..]
            .iter()
            .position(|&b| b == 0)
            .map(|i| i + search_from)
            .ok_or_else(|| Error::MalformedIndex("unterminated long name".into()))?;
        let name = std::str::from_utf8(&content[pos..null_idx])
            .map_err(|_| Error::MalformedIndex("name is not valid utf8".into()))?
            .to_string();
        pos = null_idx + 1;
        name
    };

    *idx = 8 * ((pos + 7) / 8);

    Ok(IndexEntry {
        ctime: (ctime_s, ctime_ns),
        mtime: (mtime_s, mtime_ns),
        dev,
        ino,
        mode_type,
        mode_perms,
        uid,
        gid,
        fsize,
        sha,
        flag_assume_valid,
        flag_stage,
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_sample_index(path: &std::path::Path, name: &str, sha: &[u8; 20]) {
        let mut raw = Vec::new();
        raw.extend_from_slice(b"DIRC");
        raw.extend_from_slice(&2u32.to_be_bytes());
        raw.extend_from_slice(&1u32.to_be_bytes());

        raw.extend_from_slice(&0u32.to_be_bytes()); // ctime_s
        raw.extend_from_slice(&0u32.to_be_bytes()); // ctime_ns
        raw.extend_from_slice(&0u32.to_be_bytes()); // mtime_s
        raw.extend_from_slice(&0u32.to_be_bytes()); // mtime_ns
        raw.extend_from_slice(&0u32.to_be_bytes()); // dev
        raw.extend_from_slice(&0u32.to_be_bytes()); // ino
        raw.extend_from_slice(&0u16.to_be_bytes()); // unused
        raw.extend_from_slice(&0o100644u16.to_be_bytes()); // mode
        raw.extend_from_slice(&0u32.to_be_bytes()); // uid
        raw.extend_from_slice(&0u32.to_be_bytes()); // gid
        raw.extend_from_slice(&6u32.to_be_bytes()); // fsize
        raw.extend_from_slice(sha);

        let flags = name.len() as u16 & 0x0FFF;
        raw.extend_from_slice(&flags.to_be_bytes());
        raw.extend_from_slice(name.as_bytes());
        raw.push(0);
        while raw.len() % 8 != 0 {
            raw.push(0);
        }

        fs::write(path, raw).unwrap();
    }

    #[test]
    fn reads_single_entry() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let index_path = repo.gitdir().join("index");
        write_sample_index(&index_path, "hello.txt", &[0xab; 20]);

        let index = Index::read(&repo).unwrap();
        assert_eq!(index.entries.len(), 1);
        assert_eq!(index.entries[0].name, "hello.txt");
        assert_eq!(index.entries[0].mode_type, ModeType::Regular);
        assert_eq!(index.entries[0].fsize, 6);
        assert_eq!(index.entries[0].sha, "ab".repeat(20));
    }

    #[test]
    fn missing_index_reads_as_empty() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let index = Index::read(&repo).unwrap();
        assert!(index.entries.is_empty());
        assert_eq!(index.version, 2);
    }
}
