use crate::error::Result;
use crate::kvlm::Kvlm;

/// An annotated tag: byte-compatible with a commit's KVLM, conventionally carrying
/// `object`, `type`, `tag`, `tagger`.
pub struct Tag {
    kvlm: Kvlm,
}

impl Tag {
    pub fn new(kvlm: Kvlm) -> Self {
        Tag { kvlm }
    }

    pub fn kvlm(&self) -> &Kvlm {
        &self.kvlm
    }

    pub fn object(&self) -> Option<&str> {
        self.kvlm
            .get_one(b"object")
            .and_then(|v| std::str::from_utf8(v).ok())
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.kvlm.serialize()
    }

    pub fn deserialize(data: &[u8]) -> Result<Tag> {
        Ok(Tag::new(Kvlm::parse(data)?))
    }

    /// Builds the fixed-shape annotated-tag KVLM the tutorial's `tag -a` produces:
    /// `object`, `type=commit`, `tag=<name>`, a constant `tagger`, and a constant message.
    pub fn annotated(name: &str, target_sha: &str) -> Tag {
        let mut kvlm = Kvlm::new();
        kvlm.push("object", target_sha.as_bytes().to_vec());
        kvlm.push("type", b"commit".to_vec());
        kvlm.push("tag", name.as_bytes().to_vec());
        kvlm.push("tagger", b"Wyag <wyag@example.com>".to_vec());
        kvlm.message =
            b"A tag generated by wyag, which won't let you customize the message!\n".to_vec();
        Tag::new(kvlm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotated_tag_carries_object_and_type() {
        let tag = Tag::annotated("v1.0", "deadbeef");
        assert_eq!(tag.object(), Some("deadbeef"));
        assert_eq!(tag.kvlm().get_one(b"type"), Some(&b"commit"[..]));
        assert_eq!(tag.kvlm().get_one(b"tag"), Some(&b"v1.0"[..]));
    }

    #[test]
    fn round_trips_through_serialize() {
        let tag = Tag::annotated("v1.0", "deadbeef");
        let raw = tag.serialize();
        let parsed = Tag::deserialize(&raw).unwrap();
        assert_eq!(parsed.serialize(), raw);
    }
}
