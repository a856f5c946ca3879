/// A blob's serialized form is its payload, unchanged.
pub struct Blob {
    data: Vec<u8>,
}

impl Blob {
    pub fn new(data: Vec<u8>) -> Self {
        Blob { data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.data.clone()
    }

    pub fn deserialize(data: &[u8]) -> Blob {
        Blob {
            data: data.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_serialize_is_identity() {
        let blob = Blob::new(b"arbitrary bytes \x00\x01\x02".to_vec());
        assert_eq!(blob.serialize(), blob.data());
    }
}
