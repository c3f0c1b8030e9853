use crate::id::ObjectId;
use crate::object::{frame, unframe, ObjectKind};
use crate::{Error, Result, GIT_DIR};
use bytes::Bytes;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

const OBJECTS_DIR: &str = "objects";
const REFS_DIR: &str = "refs";
const HEAD_FILE: &str = "HEAD";

/// Handle on a repository root. All store paths are derived from it; the
/// command layer decides which directory that is.
#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
}

impl Repository {
    pub fn open<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().into(),
        }
    }

    /// Creates `.git/objects`, `.git/refs` and points HEAD at `branch`.
    pub fn init<P: AsRef<Path>>(root: P, branch: &str) -> Result<Self> {
        let repo = Self::open(root);
        fs::create_dir_all(repo.git_dir().join(OBJECTS_DIR))?;
        fs::create_dir_all(repo.git_dir().join(REFS_DIR))?;
        fs::write(
            repo.git_dir().join(HEAD_FILE),
            format!("ref: refs/heads/{branch}\n"),
        )?;
        Ok(repo)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn git_dir(&self) -> PathBuf {
        self.root.join(GIT_DIR)
    }

    fn object_path(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.git_dir()
            .join(OBJECTS_DIR)
            .join(&hex[..2])
            .join(&hex[2..])
    }

    /// Frames, hashes, compresses and writes. Skips the write when the
    /// object already exists.
    pub fn put(&self, kind: ObjectKind, payload: &[u8]) -> Result<ObjectId> {
        let framed = frame(kind, payload);
        let id = ObjectId::hash(&framed);
        self.put_framed(&framed, id)?;
        Ok(id)
    }

    /// Stores an already-framed buffer under its precomputed id; the
    /// packfile engine hashes before it persists.
    pub fn put_framed(&self, framed: &[u8], id: ObjectId) -> Result<()> {
        debug_assert_eq!(ObjectId::hash(framed), id);

        let path = self.object_path(&id);
        if path.exists() {
            return Ok(());
        }

        let hex = id.to_hex();
        let dir = self.git_dir().join(OBJECTS_DIR).join(&hex[..2]);
        fs::create_dir_all(&dir)?;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(framed)?;
        let compressed = encoder.finish()?;

        // Write-then-rename so readers never observe a truncated object.
        let tmp = dir.join(format!(".tmp-{}", &hex[2..]));
        fs::write(&tmp, &compressed)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Reads, inflates and unframes a loose object.
    pub fn get(&self, id: &ObjectId) -> Result<(ObjectKind, Bytes)> {
        let path = self.object_path(id);
        let file = fs::File::open(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => Error::ObjectMissing(id.to_hex()),
            _ => Error::Io(err),
        })?;

        let mut decoder = ZlibDecoder::new(file);
        let mut framed = Vec::new();
        decoder
            .read_to_end(&mut framed)
            .map_err(|err| Error::codec(format!("cannot inflate object {id}: {err}")))?;
        unframe(&framed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn it_lays_out_the_git_directory() {
        let dir = tempdir().unwrap();
        Repository::init(dir.path(), "main").unwrap();
        assert!(dir.path().join(".git/objects").is_dir());
        assert!(dir.path().join(".git/refs").is_dir());
        let head = fs::read_to_string(dir.path().join(".git/HEAD")).unwrap();
        assert_eq!(head, "ref: refs/heads/main\n");
    }

    #[test]
    fn it_records_the_clone_branch_in_head() {
        let dir = tempdir().unwrap();
        Repository::init(dir.path(), "master").unwrap();
        let head = fs::read_to_string(dir.path().join(".git/HEAD")).unwrap();
        assert_eq!(head, "ref: refs/heads/master\n");
    }

    #[test]
    fn it_round_trips_every_object_kind() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path(), "main").unwrap();
        for kind in [
            ObjectKind::Blob,
            ObjectKind::Tree,
            ObjectKind::Commit,
            ObjectKind::Tag,
        ] {
            let id = repo.put(kind, b"payload bytes").unwrap();
            let (got_kind, payload) = repo.get(&id).unwrap();
            assert_eq!(got_kind, kind);
            assert_eq!(payload.as_ref(), b"payload bytes");
        }
    }

    #[test]
    fn it_stores_under_the_fanout_path() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path(), "main").unwrap();
        let id = repo.put(ObjectKind::Blob, b"hello\n").unwrap();
        assert_eq!(id.to_hex(), "ce013625030ba8dba906f756967f9e9ca394464a");
        assert!(dir
            .path()
            .join(".git/objects/ce/013625030ba8dba906f756967f9e9ca394464a")
            .is_file());
    }

    #[test]
    fn it_hashes_the_well_known_empty_objects() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path(), "main").unwrap();
        let blob = repo.put(ObjectKind::Blob, b"").unwrap();
        assert_eq!(blob.to_hex(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
        let tree = repo.put(ObjectKind::Tree, b"").unwrap();
        assert_eq!(tree.to_hex(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    }

    #[test]
    fn it_is_idempotent_on_repeated_puts() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path(), "main").unwrap();
        let first = repo.put(ObjectKind::Blob, b"same content").unwrap();
        let second = repo.put(ObjectKind::Blob, b"same content").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn it_reports_missing_objects() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path(), "main").unwrap();
        let absent = ObjectId::from_hex("e69de29bb2d1d6434b8b29ae775ad8c2e48c5391").unwrap();
        assert!(matches!(
            repo.get(&absent),
            Err(Error::ObjectMissing(hex)) if hex == absent.to_hex()
        ));
    }

    #[test]
    fn it_rejects_an_object_with_a_corrupt_header() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path(), "main").unwrap();

        let framed = b"blob 999\0short";
        let id = ObjectId::hash(framed);
        let hex = id.to_hex();
        let obj_dir = dir.path().join(".git/objects").join(&hex[..2]);
        fs::create_dir_all(&obj_dir).unwrap();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(framed).unwrap();
        fs::write(obj_dir.join(&hex[2..]), encoder.finish().unwrap()).unwrap();

        assert!(matches!(repo.get(&id), Err(Error::Codec(_))));
    }
}
