use crate::object::tree;
use crate::repo::Repository;
use crate::Result;
use std::path::Path;

pub(crate) fn run() -> Result<()> {
    let repo = Repository::open(".");
    let id = tree::snapshot(&repo, Path::new("."))?;
    println!("{id}");
    Ok(())
}
