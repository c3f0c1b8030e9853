use crate::id::ObjectId;
use crate::object::commit::Commit;
use crate::object::tree::{EntryMode, Tree};
use crate::object::ObjectKind;
use crate::repo::Repository;
use crate::{Error, Result};
use std::fs;
use std::path::Path;

/// Materializes the working tree of `commit_id` under the repository root.
/// Existing files are overwritten.
pub fn checkout_commit(repo: &Repository, commit_id: ObjectId) -> Result<()> {
    let payload = read_kind(repo, commit_id, ObjectKind::Commit)?;
    let commit = Commit::parse(&payload)?;
    materialize_tree(repo, commit.tree(), repo.root())
}

fn materialize_tree(repo: &Repository, tree_id: ObjectId, dir: &Path) -> Result<()> {
    let payload = read_kind(repo, tree_id, ObjectKind::Tree)?;
    let tree = Tree::decode(&payload)?;

    for entry in tree.entries() {
        let path = dir.join(&entry.name);
        match entry.mode {
            EntryMode::Directory => {
                fs::create_dir_all(&path)?;
                materialize_tree(repo, entry.id, &path)?;
            }
            EntryMode::Regular => {
                let blob = read_kind(repo, entry.id, ObjectKind::Blob)?;
                fs::write(&path, &blob)?;
            }
        }
    }
    Ok(())
}

fn read_kind(repo: &Repository, id: ObjectId, expected: ObjectKind) -> Result<bytes::Bytes> {
    let (kind, payload) = repo.get(&id)?;
    if kind != expected {
        return Err(Error::codec(format!("{id} is a {kind}, expected a {expected}")));
    }
    Ok(payload)
}
