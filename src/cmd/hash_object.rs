use crate::object::ObjectKind;
use crate::repo::Repository;
use crate::Result;
use std::fs;

pub(crate) fn run(path: &str) -> Result<()> {
    let repo = Repository::open(".");
    let payload = fs::read(path)?;
    let id = repo.put(ObjectKind::Blob, &payload)?;
    println!("{id}");
    Ok(())
}
