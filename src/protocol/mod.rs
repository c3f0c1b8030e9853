pub mod delta;
pub mod http;
pub mod pack;
pub mod pkt_line;

use crate::{Error, Result};
use std::io::Read;

const MASK_LOW_7: u8 = 0b01111111;
const MASK_CONTINUE: u8 = 0b10000000;

fn read_byte<R: Read>(r: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)
        .map_err(|_| Error::codec("input ended inside a variable-length field"))?;
    let [byte] = buf;
    Ok(byte)
}

fn has_continuation(byte: u8) -> bool {
    byte & MASK_CONTINUE == MASK_CONTINUE
}
