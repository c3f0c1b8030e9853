use crate::{Error, Result};
use sha1::{Digest, Sha1};
use std::fmt;

pub const ID_SIZE: usize = 20;
pub const HEX_ID_SIZE: usize = ID_SIZE * 2;

/// SHA-1 identifier of a framed object.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; ID_SIZE]);

impl ObjectId {
    pub fn hash(framed: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(framed);
        Self(hasher.finalize().into())
    }

    pub fn from_hex(hex_id: &str) -> Result<Self> {
        if hex_id.len() != HEX_ID_SIZE {
            return Err(Error::codec(format!(
                "object id must be {HEX_ID_SIZE} hex characters: {hex_id}"
            )));
        }
        let bytes = hex::decode(hex_id)
            .map_err(|_| Error::codec(format!("object id is not hex: {hex_id}")))?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; ID_SIZE] = bytes
            .try_into()
            .map_err(|_| Error::codec("object id must be 20 bytes long"))?;
        Ok(Self(raw))
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; ID_SIZE]> for ObjectId {
    fn from(raw: [u8; ID_SIZE]) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_round_trips_hex() {
        let hex_id = "e88f7a929cd70b0274c4ea33b209c97fa845fdbc";
        let id = ObjectId::from_hex(hex_id).unwrap();
        assert_eq!(id.to_hex(), hex_id);
        assert_eq!(format!("{id}"), hex_id);
    }

    #[test]
    fn it_rejects_wrong_length() {
        assert!(ObjectId::from_hex("abc123").is_err());
        assert!(ObjectId::from_bytes(&[0u8; 19]).is_err());
    }

    #[test]
    fn it_rejects_non_hex() {
        let bad = "zz8f7a929cd70b0274c4ea33b209c97fa845fdbc";
        assert!(ObjectId::from_hex(bad).is_err());
    }

    #[test]
    fn it_hashes_the_empty_blob_frame() {
        let id = ObjectId::hash(b"blob 0\0");
        assert_eq!(id.to_hex(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    }
}
