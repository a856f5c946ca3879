//! Key-Value List with Message: the textual format shared by commit and tag objects.
//!
//! A KVLM is an ordered sequence of `key SP value NUL`-free lines (repeated keys keep
//! their relative order), a blank line, and a free-form message.

use crate::error::{Error, Result};

/// An ordered, duplicate-key-preserving key/value list, plus the trailing message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Kvlm {
    /// Insertion-ordered list of `(key, values)`; `values` preserves the order the
    /// key's repeated occurrences appeared in.
    fields: Vec<(Vec<u8>, Vec<Vec<u8>>)>,
    pub message: Vec<u8>,
}

impl Kvlm {
    pub fn new() -> Self {
        Kvlm::default()
    }

    /// All values stored under `key`, in original order. Empty if the key is absent.
    pub fn get_all(&self, key: &[u8]) -> &[Vec<u8>] {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    /// The single value stored under `key`, or an error if it is absent or repeated.
    pub fn get_one(&self, key: &[u8]) -> Option<&[u8]> {
        match self.get_all(key) {
            [v] => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Appends a value for `key`, preserving prior values and order.
    pub fn push(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        let key = key.into();
        let value = value.into();
        if let Some((_, values)) = self.fields.iter_mut().find(|(k, _)| k == &key) {
            values.push(value);
        } else {
            self.fields.push((key, vec![value]));
        }
    }

    /// Parses a KVLM byte string. Iterative (§9): no self-recursion, so a pathologically
    /// long commit message can't blow the stack.
    pub fn parse(raw: &[u8]) -> Result<Kvlm> {
        let mut kvlm = Kvlm::new();
        let mut start = 0usize;

        loop {
            let space = find(raw, b' ', start);
            let newline = find(raw, b'\n', start);

            let is_message_boundary = match (space, newline) {
                (None, _) => true,
                (Some(sp), Some(nl)) => nl < sp,
                (Some(_), None) => false,
            };

            if is_message_boundary {
                let newline = newline.ok_or_else(|| {
                    Error::MalformedKvlm("missing blank line before message".into())
                })?;
                if newline != start {
                    return Err(Error::MalformedKvlm(
                        "expected blank line to start the message".into(),
                    ));
                }
                kvlm.message = raw[start + 1..].to_vec();
                return Ok(kvlm);
            }

            let space = space.unwrap();
            let key = raw[start..space].to_vec();

            // Advance past newlines until we find one not followed by a continuation space.
            let mut end = start;
            loop {
                let next = find(raw, b'\n', end + 1);
                let next = next.ok_or_else(|| {
                    Error::MalformedKvlm(format!(
                        "unterminated value for key {:?}",
                        String::from_utf8_lossy(&key)
                    ))
                })?;
                end = next;
                if raw.get(end + 1) != Some(&b' ') {
                    break;
                }
            }

            let raw_value = &raw[space + 1..end];
            let value = unfold(raw_value);
            kvlm.push(key, value);

            start = end + 1;
        }
    }

    /// Serializes back to the exact KVLM wire format. `serialize(parse(x)) == x` for
    /// well-formed `x` (§8 #3).
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (key, values) in &self.fields {
            for value in values {
                out.extend_from_slice(key);
                out.push(b' ');
                out.extend_from_slice(&fold(value));
                out.push(b'\n');
            }
        }
        out.push(b'\n');
        out.extend_from_slice(&self.message);
        out
    }
}

fn find(haystack: &[u8], needle: u8, from: usize) -> Option<usize> {
    haystack[from..]
        .iter()
        .position(|&b| b == needle)
        .map(|i| i + from)
}

/// `\n ` -> `\n` (drop the leading space git prefixes continuation lines with).
fn unfold(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    let mut i = 0;
    while i < value.len() {
        if value[i] == b'\n' && value.get(i + 1) == Some(&b' ') {
            out.push(b'\n');
            i += 2;
        } else {
            out.push(value[i]);
            i += 1;
        }
    }
    out
}

/// `\n` -> `\n ` (inverse of `unfold`).
fn fold(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for &b in value {
        out.push(b);
        if b == b'\n' {
            out.push(b' ');
        }
    }
    out
}
