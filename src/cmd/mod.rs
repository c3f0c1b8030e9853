mod cat_file;
mod clone;
mod commit_tree;
mod hash_object;
mod init;
mod ls_tree;
mod write_tree;

use crate::args::Args;
use crate::{Error, Result};

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Init,
    CatFile {
        id: String,
    },
    HashObject {
        path: String,
    },
    LsTree {
        id: String,
    },
    WriteTree,
    CommitTree {
        tree: String,
        parent: Option<String>,
        message: String,
    },
    Clone {
        url: String,
        dir: String,
    },
}

impl Command {
    pub fn new(args: &[String]) -> Result<Self> {
        let (name, rest) = args
            .split_first()
            .ok_or_else(|| Error::InvalidArgs("no command given".into()))?;

        match name.as_str() {
            "init" => Ok(Self::Init),
            "cat-file" => {
                let args = Args::spec().flag("-p").positional("id").parse(rest);
                if !args.flag("-p") {
                    return Err(Error::InvalidArgs("cat-file requires -p".into()));
                }
                let id = required(&args, "id", "cat-file requires an object id")?;
                Ok(Self::CatFile { id })
            }
            "hash-object" => {
                let args = Args::spec().flag("-w").positional("path").parse(rest);
                if !args.flag("-w") {
                    return Err(Error::InvalidArgs("hash-object requires -w".into()));
                }
                let path = required(&args, "path", "hash-object requires a file path")?;
                Ok(Self::HashObject { path })
            }
            "ls-tree" => {
                let args = Args::spec().flag("--name-only").positional("id").parse(rest);
                if !args.flag("--name-only") {
                    return Err(Error::InvalidArgs("ls-tree requires --name-only".into()));
                }
                let id = required(&args, "id", "ls-tree requires a tree id")?;
                Ok(Self::LsTree { id })
            }
            "write-tree" => Ok(Self::WriteTree),
            "commit-tree" => {
                let args = Args::spec()
                    .positional("tree")
                    .valued("-p")
                    .valued("-m")
                    .parse(rest);
                let tree = required(&args, "tree", "commit-tree requires a tree id")?;
                let message = required(&args, "-m", "commit-tree requires -m <message>")?;
                Ok(Self::CommitTree {
                    tree,
                    parent: args.value("-p").map(String::from),
                    message,
                })
            }
            "clone" => {
                let args = Args::spec().positional("url").positional("dir").parse(rest);
                let url = required(&args, "url", "clone requires a repository url")?;
                let dir = required(&args, "dir", "clone requires a target directory")?;
                Ok(Self::Clone { url, dir })
            }
            other => Err(Error::InvalidArgs(format!("unknown command: {other}"))),
        }
    }

    pub async fn run(self) -> Result<()> {
        match self {
            Self::Init => init::run(),
            Self::CatFile { id } => cat_file::run(&id),
            Self::HashObject { path } => hash_object::run(&path),
            Self::LsTree { id } => ls_tree::run(&id),
            Self::WriteTree => write_tree::run(),
            Self::CommitTree {
                tree,
                parent,
                message,
            } => commit_tree::run(&tree, parent.as_deref(), &message),
            Self::Clone { url, dir } => clone::run(&url, &dir).await,
        }
    }
}

fn required(args: &Args, name: &str, message: &str) -> Result<String> {
    args.value(name)
        .map(String::from)
        .ok_or_else(|| Error::InvalidArgs(message.into()))
}
