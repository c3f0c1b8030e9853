use super::{has_continuation, read_byte, MASK_LOW_7};
use crate::{Error, Result};
use std::io::{Cursor, Read};

const COPY_ZERO_SIZE: usize = 0x10000;

/// Parsed delta payload: declared sizes plus the copy/insert program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    source_size: usize,
    target_size: usize,
    instructions: Vec<Instruction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Instruction {
    Copy { offset: usize, size: usize },
    Insert(Vec<u8>),
}

impl Delta {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let source_size = read_size(&mut cursor)?;
        let target_size = read_size(&mut cursor)?;

        let mut instructions = Vec::new();
        let mut buf = [0u8; 1];
        loop {
            match cursor.read(&mut buf) {
                Ok(0) => break,
                Ok(_) => instructions.push(Instruction::parse(buf[0], &mut cursor)?),
                Err(err) => return Err(Error::codec(format!("cannot read delta: {err}"))),
            }
        }

        Ok(Self {
            source_size,
            target_size,
            instructions,
        })
    }

    /// Replays the program against `base`; the output length must match the
    /// declared target size.
    pub fn apply(&self, base: &[u8]) -> Result<Vec<u8>> {
        if base.len() != self.source_size {
            return Err(Error::pack(format!(
                "delta declares a {}-byte base but got {}",
                self.source_size,
                base.len()
            )));
        }

        let mut target = Vec::with_capacity(self.target_size);
        for instruction in &self.instructions {
            match instruction {
                Instruction::Copy { offset, size } => {
                    let end = offset
                        .checked_add(*size)
                        .filter(|&end| end <= base.len())
                        .ok_or_else(|| Error::pack("delta copy range exceeds the base"))?;
                    target.extend_from_slice(&base[*offset..end]);
                }
                Instruction::Insert(bytes) => target.extend_from_slice(bytes),
            }
        }

        if target.len() != self.target_size {
            return Err(Error::pack(format!(
                "delta produced {} bytes, declared {}",
                target.len(),
                self.target_size
            )));
        }
        Ok(target)
    }
}

impl Instruction {
    fn parse<R: Read>(cmd: u8, r: &mut R) -> Result<Self> {
        if cmd == 0 {
            return Err(Error::pack("reserved delta instruction 0x00"));
        }

        if !has_continuation(cmd) {
            // Insert: cmd itself is the literal length, 1..=127.
            let mut bytes = vec![0u8; cmd as usize];
            r.read_exact(&mut bytes)
                .map_err(|_| Error::codec("delta insert data is truncated"))?;
            return Ok(Self::Insert(bytes));
        }

        // Copy: low bits select which offset/size bytes are present, LE.
        let mut offset = 0usize;
        for (shift, flag) in [0x01u8, 0x02, 0x04, 0x08].into_iter().enumerate() {
            if cmd & flag != 0 {
                offset |= (read_byte(r)? as usize) << (8 * shift);
            }
        }
        let mut size = 0usize;
        for (shift, flag) in [0x10u8, 0x20, 0x40].into_iter().enumerate() {
            if cmd & flag != 0 {
                size |= (read_byte(r)? as usize) << (8 * shift);
            }
        }
        if size == 0 {
            size = COPY_ZERO_SIZE;
        }
        Ok(Self::Copy { offset, size })
    }
}

// Little-endian 7-bits-per-byte size, used for the two delta header sizes.
fn read_size<R: Read>(r: &mut R) -> Result<usize> {
    let mut byte = read_byte(r)?;
    let mut size = (byte & MASK_LOW_7) as usize;
    let mut shift = 7;
    while has_continuation(byte) {
        byte = read_byte(r)?;
        size |= ((byte & MASK_LOW_7) as usize) << shift;
        shift += 7;
    }
    Ok(size)
}
