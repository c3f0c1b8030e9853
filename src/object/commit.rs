use crate::id::ObjectId;
use crate::{Error, Result};
use regex::Regex;
use std::env;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

const DEFAULT_NAME: &str = "Rustic Git";
const DEFAULT_EMAIL: &str = "rustic-git@example.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    name: String,
    email: String,
    timestamp: u64,
    timezone: String,
}

impl Signature {
    pub fn parse(text: &str) -> Result<Self> {
        let re = Regex::new(r"(?<name>.+) <(?<email>.*)> (?<timestamp>\d+) (?<timezone>\S+)")
            .expect("signature pattern is valid");
        let caps = re
            .captures(text)
            .ok_or_else(|| Error::codec(format!("malformed signature line: {text}")))?;
        Ok(Self {
            name: caps["name"].to_string(),
            email: caps["email"].to_string(),
            timestamp: caps["timestamp"]
                .parse()
                .map_err(|_| Error::codec(format!("signature timestamp out of range: {text}")))?,
            timezone: caps["timezone"].to_string(),
        })
    }

    pub fn author() -> Self {
        Self {
            name: env::var("GIT_AUTHOR_NAME").unwrap_or_else(|_| DEFAULT_NAME.into()),
            email: env::var("GIT_AUTHOR_EMAIL").unwrap_or_else(|_| DEFAULT_EMAIL.into()),
            timestamp: unix_now(),
            timezone: "+0000".into(),
        }
    }

    pub fn committer() -> Self {
        let mut committer = Self::author();
        if let Ok(name) = env::var("GIT_COMMITTER_NAME") {
            committer.name = name;
        }
        if let Ok(email) = env::var("GIT_COMMITTER_EMAIL") {
            committer.email = email;
        }
        committer
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <{}> {} {}",
            self.name, self.email, self.timestamp, self.timezone
        )
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    tree: ObjectId,
    parents: Vec<ObjectId>,
    author: Signature,
    committer: Signature,
    message: String,
}

impl Commit {
    pub fn new(tree: ObjectId, parents: Vec<ObjectId>, message: String) -> Self {
        Self {
            tree,
            parents,
            author: Signature::author(),
            committer: Signature::committer(),
            message,
        }
    }

    pub fn tree(&self) -> ObjectId {
        self.tree
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut text = format!("tree {}\n", self.tree);
        for parent in &self.parents {
            text.push_str(&format!("parent {parent}\n"));
        }
        text.push_str(&format!("author {}\n", self.author));
        text.push_str(&format!("committer {}\n", self.committer));
        text.push('\n');
        text.push_str(&self.message);
        text.push('\n');
        text.into_bytes()
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| Error::codec("commit payload is not valid UTF-8"))?;
        let (header, message) = text
            .split_once("\n\n")
            .ok_or_else(|| Error::codec("commit payload has no blank separator line"))?;

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;
        for line in header.lines() {
            if let Some(rest) = line.strip_prefix("tree ") {
                tree = Some(ObjectId::from_hex(rest)?);
            } else if let Some(rest) = line.strip_prefix("parent ") {
                parents.push(ObjectId::from_hex(rest)?);
            } else if let Some(rest) = line.strip_prefix("author ") {
                author = Some(Signature::parse(rest)?);
            } else if let Some(rest) = line.strip_prefix("committer ") {
                committer = Some(Signature::parse(rest)?);
            }
        }

        Ok(Self {
            tree: tree.ok_or_else(|| Error::codec("commit has no tree header"))?,
            parents,
            author: author.ok_or_else(|| Error::codec("commit has no author header"))?,
            committer: committer.ok_or_else(|| Error::codec("commit has no committer header"))?,
            message: message.strip_suffix('\n').unwrap_or(message).to_string(),
        })
    }
}
