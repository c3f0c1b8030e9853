use crate::id::ObjectId;
use crate::repo::Repository;
use crate::Result;
use std::io::{self, Write};

pub(crate) fn run(id: &str) -> Result<()> {
    let repo = Repository::open(".");
    let (_, payload) = repo.get(&ObjectId::from_hex(id)?)?;
    io::stdout().write_all(&payload)?;
    Ok(())
}
