use crate::error::Result;
use crate::kvlm::Kvlm;

/// A commit: a KVLM conventionally carrying `tree`, `parent` (0..n), `author`,
/// `committer`, and a free-form message.
pub struct Commit {
    kvlm: Kvlm,
}

impl Commit {
    pub fn new(kvlm: Kvlm) -> Self {
        Commit { kvlm }
    }

    pub fn kvlm(&self) -> &Kvlm {
        &self.kvlm
    }

    pub fn tree(&self) -> Option<&str> {
        self.kvlm
            .get_one(b"tree")
            .and_then(|v| std::str::from_utf8(v).ok())
    }

    pub fn parents(&self) -> Vec<String> {
        self.kvlm
            .get_all(b"parent")
            .iter()
            .filter_map(|v| std::str::from_utf8(v).ok())
            .map(str::to_string)
            .collect()
    }

    pub fn has_parent(&self) -> bool {
        !self.kvlm.get_all(b"parent").is_empty()
    }

    pub fn message(&self) -> &[u8] {
        &self.kvlm.message
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.kvlm.serialize()
    }

    pub fn deserialize(data: &[u8]) -> Result<Commit> {
        Ok(Commit::new(Kvlm::parse(data)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tree_and_parents() {
        let raw = b"tree deadbeef\nparent aaaa\nparent bbbb\nauthor A <a@x> 1 +0000\n\nmsg";
        let commit = Commit::deserialize(raw).unwrap();
        assert_eq!(commit.tree(), Some("deadbeef"));
        assert_eq!(commit.parents(), vec!["aaaa".to_string(), "bbbb".to_string()]);
        assert!(commit.has_parent());
        assert_eq!(commit.message(), b"msg");
    }

    #[test]
    fn root_commit_has_no_parent() {
        let raw = b"tree deadbeef\nauthor A <a@x> 1 +0000\n\ninitial commit";
        let commit = Commit::deserialize(raw).unwrap();
        assert!(!commit.has_parent());
    }

    #[test]
    fn round_trips_through_serialize() {
        let raw: &[u8] = b"tree deadbeef\nparent aaaa\n\nmsg\n";
        let commit = Commit::deserialize(raw).unwrap();
        assert_eq!(commit.serialize(), raw);
    }
}
