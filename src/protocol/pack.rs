use super::delta::Delta;
use super::{has_continuation, read_byte, MASK_LOW_7};
use crate::id::{ObjectId, ID_SIZE};
use crate::object::{frame, ObjectKind};
use crate::repo::Repository;
use crate::{Error, Result};
use bytes::Bytes;
use flate2::read::ZlibDecoder;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, SeekFrom};

const PACK_MAGIC: [u8; 4] = *b"PACK";
const PACK_VERSION: u32 = 2;
const MASK_TYPE: u8 = 0b01110000;
const MASK_LOW_4: u8 = 0b00001111;

/// Ingests a packfile: parses every entry, resolves deltas to full objects
/// and persists each one as a loose object. Returns the object count.
pub fn unpack(repo: &Repository, bytes: &[u8]) -> Result<usize> {
    verify_trailer(bytes)?;
    let entries = read_entries(&bytes[..bytes.len() - ID_SIZE])?;
    resolve(repo, entries)
}

// The trailing 20 bytes are the SHA-1 of everything before them.
fn verify_trailer(bytes: &[u8]) -> Result<()> {
    if bytes.len() < ID_SIZE {
        return Err(Error::pack("pack is shorter than its trailer"));
    }
    let (body, trailer) = bytes.split_at(bytes.len() - ID_SIZE);
    if ObjectId::hash(body).as_bytes() != trailer {
        return Err(Error::pack("pack trailer digest mismatch"));
    }
    Ok(())
}

#[derive(Debug)]
enum PackEntry {
    Full {
        offset: usize,
        kind: ObjectKind,
        data: Vec<u8>,
    },
    Delta {
        offset: usize,
        base: BaseRef,
        delta: Delta,
    },
}

#[derive(Debug)]
enum BaseRef {
    Offset(usize),
    Id(ObjectId),
}

fn read_entries(body: &[u8]) -> Result<Vec<PackEntry>> {
    let mut cursor = Cursor::new(body);

    let mut magic = [0u8; 4];
    read_exact(&mut cursor, &mut magic)?;
    if magic != PACK_MAGIC {
        return Err(Error::pack("missing PACK magic"));
    }
    let version = read_u32(&mut cursor)?;
    if version != PACK_VERSION {
        return Err(Error::pack(format!("unsupported pack version {version}")));
    }
    let count = read_u32(&mut cursor)?;

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let offset = cursor.position() as usize;
        let (kind_code, size) = read_entry_header(&mut cursor)?;
        let entry = match kind_code {
            1..=4 => PackEntry::Full {
                offset,
                kind: object_kind(kind_code),
                data: inflate_entry(&mut cursor, size)?,
            },
            6 => {
                let distance = read_base_distance(&mut cursor)?;
                if distance == 0 || distance > offset {
                    return Err(Error::pack(format!(
                        "ofs-delta at {offset} has invalid base distance {distance}"
                    )));
                }
                PackEntry::Delta {
                    offset,
                    base: BaseRef::Offset(offset - distance),
                    delta: Delta::parse(&inflate_entry(&mut cursor, size)?)?,
                }
            }
            7 => {
                let mut raw_id = [0u8; ID_SIZE];
                read_exact(&mut cursor, &mut raw_id)?;
                PackEntry::Delta {
                    offset,
                    base: BaseRef::Id(ObjectId::from(raw_id)),
                    delta: Delta::parse(&inflate_entry(&mut cursor, size)?)?,
                }
            }
            code => return Err(Error::pack(format!("unknown pack entry type {code}"))),
        };
        entries.push(entry);
    }
    Ok(entries)
}

/// Non-delta objects are framed, hashed and persisted first; then deltas
/// are resolved to a fixed point against `by_off`/`by_id`. Deltas left
/// after a no-progress pass have no base in the pack and are fatal.
fn resolve(repo: &Repository, entries: Vec<PackEntry>) -> Result<usize> {
    let mut by_off: HashMap<usize, ObjectId> = HashMap::new();
    let mut by_id: HashMap<ObjectId, (ObjectKind, Bytes)> = HashMap::new();
    let mut written = 0usize;

    let mut pending = Vec::new();
    for entry in entries {
        match entry {
            PackEntry::Full { offset, kind, data } => {
                let framed = frame(kind, &data);
                let id = ObjectId::hash(&framed);
                repo.put_framed(&framed, id)?;
                by_off.insert(offset, id);
                by_id.insert(id, (kind, Bytes::from(data)));
                written += 1;
            }
            PackEntry::Delta { offset, base, delta } => pending.push((offset, base, delta)),
        }
    }

    while !pending.is_empty() {
        let before = pending.len();
        let mut unresolved = Vec::new();

        for (offset, base, delta) in pending {
            let found = match &base {
                BaseRef::Offset(base_off) => by_off.get(base_off).and_then(|id| by_id.get(id)),
                BaseRef::Id(base_id) => by_id.get(base_id),
            };
            let Some((kind, base_data)) = found else {
                unresolved.push((offset, base, delta));
                continue;
            };

            let kind = *kind;
            let data = delta.apply(base_data)?;
            let framed = frame(kind, &data);
            let id = ObjectId::hash(&framed);
            repo.put_framed(&framed, id)?;
            by_off.insert(offset, id);
            by_id.insert(id, (kind, Bytes::from(data)));
            written += 1;
        }

        if unresolved.len() == before {
            return Err(Error::pack(format!(
                "{} deltas have no base in the pack",
                unresolved.len()
            )));
        }
        pending = unresolved;
    }

    Ok(written)
}

fn object_kind(code: u8) -> ObjectKind {
    match code {
        1 => ObjectKind::Commit,
        2 => ObjectKind::Tree,
        4 => ObjectKind::Tag,
        _ => ObjectKind::Blob,
    }
}

// First byte: continuation | type (3 bits) | low 4 size bits; then 7 size
// bits per continuation byte, little-endian.
fn read_entry_header(cursor: &mut Cursor<&[u8]>) -> Result<(u8, usize)> {
    let mut byte = read_byte(cursor)?;
    let kind_code = (byte & MASK_TYPE) >> 4;
    let mut size = (byte & MASK_LOW_4) as usize;
    let mut shift = 4;
    while has_continuation(byte) {
        byte = read_byte(cursor)?;
        size |= ((byte & MASK_LOW_7) as usize) << shift;
        shift += 7;
    }
    Ok((kind_code, size))
}

// ofs-delta distance: big-endian 7-bit groups with a +1 applied before
// each shift after the first byte.
fn read_base_distance(cursor: &mut Cursor<&[u8]>) -> Result<usize> {
    let mut byte = read_byte(cursor)?;
    let mut distance = (byte & MASK_LOW_7) as usize;
    while has_continuation(byte) {
        byte = read_byte(cursor)?;
        distance = ((distance + 1) << 7) | (byte & MASK_LOW_7) as usize;
    }
    Ok(distance)
}

/// Inflates exactly one zlib stream at the cursor, leaving the cursor on
/// the first byte past it. The advertised size is validated against the
/// inflated length.
fn inflate_entry(cursor: &mut Cursor<&[u8]>, expected: usize) -> Result<Vec<u8>> {
    let start = cursor.position();
    let (data, consumed) = {
        let mut decoder = ZlibDecoder::new(&mut *cursor);
        let mut data = Vec::with_capacity(expected);
        decoder
            .read_to_end(&mut data)
            .map_err(|err| Error::codec(format!("zlib inflate failed in pack: {err}")))?;
        (data, decoder.total_in())
    };
    if data.len() != expected {
        return Err(Error::pack(format!(
            "pack entry declares {expected} bytes but inflated to {}",
            data.len()
        )));
    }
    cursor.seek(SeekFrom::Start(start + consumed))?;
    Ok(data)
}

fn read_exact(cursor: &mut Cursor<&[u8]>, buf: &mut [u8]) -> Result<()> {
    cursor
        .read_exact(buf)
        .map_err(|_| Error::pack("pack ended unexpectedly"))
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32> {
    let mut word = [0u8; 4];
    read_exact(cursor, &mut word)?;
    Ok(u32::from_be_bytes(word))
}
