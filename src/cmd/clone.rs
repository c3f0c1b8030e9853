use crate::checkout;
use crate::protocol::http::{select_target, Remote};
use crate::protocol::pack;
use crate::repo::Repository;
use crate::Result;

pub(crate) async fn run(url: &str, dir: &str) -> Result<()> {
    let remote = Remote::new(url);

    let refs = remote.discover_refs().await?;
    let (target, branch) = select_target(&refs)?;
    eprintln!("Cloning {target} ({branch}) into {dir}");

    let repo = Repository::init(dir, &branch)?;
    let pack_bytes = remote.fetch_pack(target).await?;
    let count = pack::unpack(&repo, &pack_bytes)?;
    eprintln!("Unpacked {count} objects");

    checkout::checkout_commit(&repo, target)?;
    eprintln!("Checked out {branch}");
    Ok(())
}
