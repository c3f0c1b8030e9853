use crate::repo::Repository;
use crate::{Result, DEFAULT_BRANCH};

pub(crate) fn run() -> Result<()> {
    Repository::init(".", DEFAULT_BRANCH)?;
    println!("Initialized git directory");
    Ok(())
}
