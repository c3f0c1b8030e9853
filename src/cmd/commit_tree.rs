use crate::id::ObjectId;
use crate::object::commit::Commit;
use crate::object::ObjectKind;
use crate::repo::Repository;
use crate::Result;

pub(crate) fn run(tree: &str, parent: Option<&str>, message: &str) -> Result<()> {
    let repo = Repository::open(".");
    let tree = ObjectId::from_hex(tree)?;
    let parents = parent
        .map(ObjectId::from_hex)
        .transpose()?
        .into_iter()
        .collect();

    let commit = Commit::new(tree, parents, message.to_string());
    let id = repo.put(ObjectKind::Commit, &commit.serialize())?;
    println!("{id}");
    Ok(())
}
