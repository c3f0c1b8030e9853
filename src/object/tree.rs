use super::ObjectKind;
use crate::id::{ObjectId, ID_SIZE};
use crate::repo::Repository;
use crate::{Error, Result, GIT_DIR};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;

const MODE_FILE: &str = "100644";
const MODE_DIR: &str = "40000";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryMode {
    Regular,
    Directory,
}

impl EntryMode {
    fn from_ascii(mode: &str) -> Result<Self> {
        match mode {
            MODE_FILE => Ok(Self::Regular),
            MODE_DIR => Ok(Self::Directory),
            _ => Err(Error::codec(format!("unknown tree entry mode: {mode}"))),
        }
    }

    pub fn as_ascii(self) -> &'static str {
        match self {
            Self::Regular => MODE_FILE,
            Self::Directory => MODE_DIR,
        }
    }

    pub fn is_dir(self) -> bool {
        self == Self::Directory
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: EntryMode,
    pub name: String,
    pub id: ObjectId,
}

impl TreeEntry {
    /// Parses one `<mode> <name>\0<20 raw bytes>` record off the front of
    /// `bytes`, returning it with the number of bytes consumed.
    fn parse(bytes: &[u8]) -> Result<(Self, usize)> {
        let space_pos = bytes
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| Error::codec("tree entry is missing the mode separator"))?;
        let zero_pos = bytes[space_pos..]
            .iter()
            .position(|&b| b == b'\0')
            .map(|pos| space_pos + pos)
            .ok_or_else(|| Error::codec("tree entry is missing the name terminator"))?;

        let mode = std::str::from_utf8(&bytes[..space_pos])
            .map_err(|_| Error::codec("tree entry mode is not ASCII"))
            .and_then(EntryMode::from_ascii)?;
        let name = String::from_utf8(bytes[space_pos + 1..zero_pos].to_vec())
            .map_err(|_| Error::codec("tree entry name is not valid UTF-8"))?;
        if name.is_empty() || name.contains('/') {
            return Err(Error::codec(format!("invalid tree entry name: {name}")));
        }

        let consumed = zero_pos + 1 + ID_SIZE;
        if bytes.len() < consumed {
            return Err(Error::codec("tree entry is truncated"));
        }
        let id = ObjectId::from_bytes(&bytes[zero_pos + 1..consumed])?;

        Ok((Self { mode, name, id }, consumed))
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut record = format!("{} {}\0", self.mode.as_ascii(), self.name).into_bytes();
        record.extend_from_slice(self.id.as_bytes());
        record
    }

    // Directories sort as if their name ended with "/".
    fn sort_key(&self) -> Vec<u8> {
        let mut key = self.name.clone().into_bytes();
        if self.mode.is_dir() {
            key.push(b'/');
        }
        key
    }
}

impl PartialOrd for TreeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TreeEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tree(Vec<TreeEntry>);

impl Tree {
    /// Sorts into canonical order; duplicate names are rejected.
    pub fn from_entries(mut entries: Vec<TreeEntry>) -> Result<Self> {
        entries.sort();
        for pair in entries.windows(2) {
            if pair[0].name == pair[1].name {
                return Err(Error::codec(format!(
                    "duplicate tree entry name: {}",
                    pair[0].name
                )));
            }
        }
        Ok(Self(entries))
    }

    /// Decodes entries in stored order. The payload must end exactly on an
    /// entry boundary.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut entries = Vec::new();
        let mut rest = bytes;
        while !rest.is_empty() {
            let (entry, consumed) = TreeEntry::parse(rest)?;
            entries.push(entry);
            rest = &rest[consumed..];
        }
        Ok(Self(entries))
    }

    pub fn encode(&self) -> Vec<u8> {
        self.0.iter().flat_map(TreeEntry::serialize).collect()
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.0
    }
}

/// Recursively snapshots `dir` into blob and tree objects, post-order, and
/// returns the root tree id. Entries named `.git` are skipped.
pub fn snapshot(repo: &Repository, dir: &Path) -> Result<ObjectId> {
    let mut entries = Vec::new();

    for dirent in fs::read_dir(dir)? {
        let dirent = dirent?;
        let name = dirent.file_name().to_string_lossy().to_string();
        if name == GIT_DIR {
            continue;
        }

        let path = dirent.path();
        let entry = if path.is_dir() {
            TreeEntry {
                mode: EntryMode::Directory,
                name,
                id: snapshot(repo, &path)?,
            }
        } else if path.is_file() {
            let payload = fs::read(&path)?;
            TreeEntry {
                mode: EntryMode::Regular,
                name,
                id: repo.put(ObjectKind::Blob, &payload)?,
            }
        } else {
            return Err(Error::codec(format!(
                "{} is neither a regular file nor a directory",
                path.display()
            )));
        };
        entries.push(entry);
    }

    let tree = Tree::from_entries(entries)?;
    repo.put(ObjectKind::Tree, &tree.encode())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(mode: EntryMode, name: &str, fill: u8) -> TreeEntry {
        TreeEntry {
            mode,
            name: name.into(),
            id: ObjectId::from([fill; ID_SIZE]),
        }
    }

    #[test]
    fn it_parses_a_file_entry() {
        let bytes = b"100644 file1\x0011111111111111111111";
        let (parsed, consumed) = TreeEntry::parse(bytes).unwrap();
        assert_eq!(parsed, entry(EntryMode::Regular, "file1", b'1'));
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn it_parses_a_directory_entry() {
        let bytes = b"40000 dir1\x0099999999999999999999";
        let (parsed, _) = TreeEntry::parse(bytes).unwrap();
        assert_eq!(parsed, entry(EntryMode::Directory, "dir1", b'9'));
    }

    #[test]
    fn it_decodes_consecutive_entries() {
        let bytes = b"100644 file1\x001111111111111111111140000 dir1\x0099999999999999999999";
        let tree = Tree::decode(bytes).unwrap();
        assert_eq!(
            tree.entries(),
            [
                entry(EntryMode::Regular, "file1", b'1'),
                entry(EntryMode::Directory, "dir1", b'9'),
            ]
        );
    }

    #[test]
    fn it_rejects_a_payload_cut_mid_entry() {
        let bytes = b"100644 file1\x0011111";
        assert!(Tree::decode(bytes).is_err());

        let mut bytes = b"100644 file1\x0011111111111111111111".to_vec();
        bytes.extend_from_slice(b"100644 f");
        assert!(Tree::decode(&bytes).is_err());
    }

    #[test]
    fn it_rejects_unknown_modes() {
        let bytes = b"120000 link\x0011111111111111111111";
        assert!(Tree::decode(bytes).is_err());
    }

    #[test]
    fn it_sorts_directories_as_if_slash_terminated() {
        let tree = Tree::from_entries(vec![
            entry(EntryMode::Directory, "a", b'3'),
            entry(EntryMode::Regular, "a.c", b'2'),
            entry(EntryMode::Regular, "a", b'1'),
        ])
        .unwrap();
        let names: Vec<(&str, EntryMode)> = tree
            .entries()
            .iter()
            .map(|e| (e.name.as_str(), e.mode))
            .collect();
        assert_eq!(
            names,
            [
                ("a", EntryMode::Regular),
                ("a.c", EntryMode::Regular),
                ("a", EntryMode::Directory),
            ]
        );
    }

    #[test]
    fn it_rejects_duplicate_names() {
        let result = Tree::from_entries(vec![
            entry(EntryMode::Regular, "same", b'1'),
            entry(EntryMode::Regular, "same", b'2'),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn it_round_trips_encode_and_decode() {
        let tree = Tree::from_entries(vec![
            entry(EntryMode::Regular, "main.rs", b'1'),
            entry(EntryMode::Directory, "src", b'2'),
        ])
        .unwrap();
        assert_eq!(Tree::decode(&tree.encode()).unwrap(), tree);
    }

    #[test]
    fn it_snapshots_deterministically() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("a.txt"), "alpha\n").unwrap();
        fs::write(dir.path().join("sub/b.txt"), "beta\n").unwrap();
        fs::write(dir.path().join(".git/ignored"), "never hashed").unwrap();

        let repo = Repository::init(dir.path(), "main").unwrap();
        let first = snapshot(&repo, dir.path()).unwrap();
        let second = snapshot(&repo, dir.path()).unwrap();
        assert_eq!(first, second);

        let (kind, payload) = repo.get(&first).unwrap();
        assert_eq!(kind, ObjectKind::Tree);
        let decoded = Tree::decode(&payload).unwrap();
        let names: Vec<&str> = decoded
            .entries()
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, ["a.txt", "sub"]);
    }

    #[test]
    fn it_writes_the_empty_tree_for_an_empty_directory() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path(), "main").unwrap();
        let id = snapshot(&repo, dir.path()).unwrap();
        assert_eq!(id.to_hex(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    }
}
