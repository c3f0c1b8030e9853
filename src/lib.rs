mod args;
mod checkout;
mod cmd;
mod error;
mod id;
mod object;
mod protocol;
mod repo;

const GIT_DIR: &str = ".git";
const DEFAULT_BRANCH: &str = "main";

pub use cmd::Command;
pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
