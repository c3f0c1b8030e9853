use crate::{Error, Result};
use std::fmt;

/// One smart-protocol frame. `0000` flushes; `0001`/`0002` are the
/// delimiter and response-end markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PktLine {
    Data(Vec<u8>),
    Flush,
    Delimiter,
    ResponseEnd,
}

impl PktLine {
    pub fn text(line: &str) -> Self {
        Self::Data(line.as_bytes().to_vec())
    }
}

impl fmt::Display for PktLine {
    // Wire rendering, used to assemble request bodies.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(payload) => write!(
                f,
                "{:04x}{}",
                payload.len() + 4,
                String::from_utf8_lossy(payload)
            ),
            Self::Flush => f.write_str("0000"),
            Self::Delimiter => f.write_str("0001"),
            Self::ResponseEnd => f.write_str("0002"),
        }
    }
}

/// Iterator over the frames of a fully-buffered response body.
#[derive(Debug, Clone)]
pub struct PktLines<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PktLines<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed as frames.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}

impl Iterator for PktLines<'_> {
    type Item = Result<PktLine>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos == self.buf.len() {
            return None;
        }
        let rest = self.rest();
        if rest.len() < 4 {
            self.pos = self.buf.len();
            return Some(Err(Error::codec("truncated pkt-line length")));
        }

        let len = std::str::from_utf8(&rest[..4])
            .ok()
            .and_then(|digits| usize::from_str_radix(digits, 16).ok());
        let Some(len) = len else {
            self.pos = self.buf.len();
            return Some(Err(Error::codec("pkt-line length is not hex")));
        };

        match len {
            0 => {
                self.pos += 4;
                Some(Ok(PktLine::Flush))
            }
            1 => {
                self.pos += 4;
                Some(Ok(PktLine::Delimiter))
            }
            2 => {
                self.pos += 4;
                Some(Ok(PktLine::ResponseEnd))
            }
            3 => {
                self.pos = self.buf.len();
                Some(Err(Error::codec("reserved pkt-line length 0003")))
            }
            _ if rest.len() < len => {
                self.pos = self.buf.len();
                Some(Err(Error::codec("pkt-line payload is truncated")))
            }
            _ => {
                let payload = rest[4..len].to_vec();
                self.pos += len;
                Some(Ok(PktLine::Data(payload)))
            }
        }
    }
}
