use crate::id::ObjectId;
use crate::object::tree::Tree;
use crate::object::ObjectKind;
use crate::repo::Repository;
use crate::{Error, Result};

pub(crate) fn run(id: &str) -> Result<()> {
    let repo = Repository::open(".");
    let (kind, payload) = repo.get(&ObjectId::from_hex(id)?)?;
    if kind != ObjectKind::Tree {
        return Err(Error::codec(format!("{id} is a {kind}, expected a tree")));
    }
    for entry in Tree::decode(&payload)?.entries() {
        println!("{}", entry.name);
    }
    Ok(())
}
