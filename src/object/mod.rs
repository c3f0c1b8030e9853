pub mod commit;
pub mod tree;

use crate::{Error, Result};
use bytes::Bytes;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }

    pub fn from_str(kind: &str) -> Result<Self> {
        match kind {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            "tag" => Ok(Self::Tag),
            _ => Err(Error::codec(format!("unknown object kind: {kind}"))),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `"<kind> <decimal-size>\0<payload>"`. Identifiers and compression are
/// both computed over this form.
pub fn frame(kind: ObjectKind, payload: &[u8]) -> Vec<u8> {
    let mut framed = format!("{} {}\0", kind.as_str(), payload.len()).into_bytes();
    framed.extend_from_slice(payload);
    framed
}

pub fn unframe(framed: &[u8]) -> Result<(ObjectKind, Bytes)> {
    let zero_pos = framed
        .iter()
        .position(|&b| b == b'\0')
        .ok_or_else(|| Error::codec("object header is missing \\0"))?;
    let header = std::str::from_utf8(&framed[..zero_pos])
        .map_err(|_| Error::codec("object header is not valid UTF-8"))?;
    let (kind, size) = header
        .split_once(' ')
        .ok_or_else(|| Error::codec(format!("malformed object header: {header}")))?;
    let kind = ObjectKind::from_str(kind)?;
    let size: usize = size
        .parse()
        .map_err(|_| Error::codec(format!("malformed object size: {size}")))?;

    let payload = &framed[zero_pos + 1..];
    if payload.len() != size {
        return Err(Error::codec(format!(
            "object header declares {size} bytes but payload has {}",
            payload.len()
        )));
    }
    Ok((kind, Bytes::copy_from_slice(payload)))
}
