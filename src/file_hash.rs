// Copyright 2024 the Tectonic Project
// Licensed under the MIT License

//! Maps an absolute file path, or an archive-member path, to the content
//! digest of that file.
//!
//! Hashes a file once and caches the result for the lifetime of the build:
//! oracle entries are immutable once computed, so there's nothing to
//! refresh or invalidate against.

use digest::Digest as _;
use sha1::Sha1;
use std::{
    collections::HashMap,
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::digest::Sha1HashCode;
use crate::error::{Result, RuleKeyError};

/// Reads the content of an archive member.
///
/// Rule keying doesn't know how to parse jar/zip archives itself; it
/// depends on this trait so that a real archive reader can be plugged in,
/// and so tests can supply canned member content without touching the
/// filesystem at all.
pub trait ArchiveMemberReader: Send + Sync {
    fn read_member(&self, archive: &Path, member: &Path) -> io::Result<Vec<u8>>;
}

/// An [`ArchiveMemberReader`] that never finds anything; the default when no
/// real archive handling has been wired up.
#[derive(Debug, Default)]
pub struct NullArchiveMemberReader;

impl ArchiveMemberReader for NullArchiveMemberReader {
    fn read_member(&self, _archive: &Path, member: &Path) -> io::Result<Vec<u8>> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no archive reader configured for member `{}`", member.display()),
        ))
    }
}

fn digest_reader(mut r: impl Read) -> io::Result<Sha1HashCode> {
    let mut hasher = Sha1::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = r.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Sha1HashCode::from_raw(hasher.finalize()))
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum CacheKey {
    File(PathBuf),
    ArchiveMember(PathBuf, PathBuf),
}

/// Maps absolute paths (and archive-member paths) to content digests.
///
/// Referentially transparent for the lifetime of a build: once an entry is
/// computed it is never recomputed. Shared across the embarrassingly
/// parallel rule-keying workload via `Arc`, internally synchronized with a
/// single `Mutex`. The cache does not outlive a build, and is explicitly
/// constructed per build rather than kept as an ambient singleton.
pub struct FileHashOracle {
    cache: Mutex<HashMap<CacheKey, Sha1HashCode>>,
    archive_reader: Box<dyn ArchiveMemberReader>,
}

impl Default for FileHashOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl FileHashOracle {
    /// Creates an oracle with no archive-member support; `digest_archive_member`
    /// will fail with [`RuleKeyError::MissingFileHash`] on any input.
    pub fn new() -> Self {
        FileHashOracle {
            cache: Mutex::new(HashMap::new()),
            archive_reader: Box::new(NullArchiveMemberReader),
        }
    }

    /// Creates an oracle backed by a real archive-member reader.
    pub fn with_archive_reader(reader: Box<dyn ArchiveMemberReader>) -> Self {
        FileHashOracle {
            cache: Mutex::new(HashMap::new()),
            archive_reader: reader,
        }
    }

    /// Returns the content digest of a file at an absolute path.
    ///
    /// A missing file (or any I/O failure reading it) is fatal.
    pub fn digest_file(&self, absolute_path: &Path) -> Result<Sha1HashCode> {
        let key = CacheKey::File(absolute_path.to_path_buf());

        if let Some(hit) = self.cache.lock().unwrap().get(&key) {
            return Ok(hit.clone());
        }

        let digest = fs::File::open(absolute_path)
            .and_then(digest_reader)
            .map_err(|e| RuleKeyError::MissingFileHash {
                field: String::new(),
                path: format!("{}: {e}", absolute_path.display()),
            })?;

        self.cache.lock().unwrap().insert(key, digest.clone());
        Ok(digest)
    }

    /// Returns the content digest of an archive member.
    pub fn digest_archive_member(&self, archive: &Path, member: &Path) -> Result<Sha1HashCode> {
        let key = CacheKey::ArchiveMember(archive.to_path_buf(), member.to_path_buf());

        if let Some(hit) = self.cache.lock().unwrap().get(&key) {
            return Ok(hit.clone());
        }

        let bytes = self
            .archive_reader
            .read_member(archive, member)
            .map_err(|e| RuleKeyError::MissingFileHash {
                field: String::new(),
                path: format!("{}!{}: {e}", archive.display(), member.display()),
            })?;

        let digest = digest_reader(io::Cursor::new(bytes)).expect("hashing an in-memory buffer cannot fail");

        self.cache.lock().unwrap().insert(key, digest.clone());
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn hashes_and_caches_a_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();

        let oracle = FileHashOracle::new();
        let d1 = oracle.digest_file(f.path()).unwrap();
        assert_eq!(format!("{d1:x}"), "f572d396fae9206628714fb2ce00f72e94f2258f");

        // Second call is served from cache; same file, same answer.
        let d2 = oracle.digest_file(f.path()).unwrap();
        assert_eq!(d1.as_bytes(), d2.as_bytes());
    }

    #[test]
    fn missing_file_is_fatal() {
        let oracle = FileHashOracle::new();
        let err = oracle.digest_file(Path::new("/does/not/exist/at/all")).unwrap_err();
        assert!(matches!(err, RuleKeyError::MissingFileHash { .. }));
    }

    struct FakeArchiveReader;

    impl ArchiveMemberReader for FakeArchiveReader {
        fn read_member(&self, _archive: &Path, member: &Path) -> io::Result<Vec<u8>> {
            if member == Path::new("a/b.txt") {
                Ok(b"hello\n".to_vec())
            } else {
                Err(io::Error::new(io::ErrorKind::NotFound, "no such member"))
            }
        }
    }

    #[test]
    fn hashes_archive_members_via_injected_reader() {
        let oracle = FileHashOracle::with_archive_reader(Box::new(FakeArchiveReader));
        let digest = oracle
            .digest_archive_member(Path::new("/archives/foo.jar"), Path::new("a/b.txt"))
            .unwrap();
        assert_eq!(format!("{digest:x}"), "f572d396fae9206628714fb2ce00f72e94f2258f");
    }

    #[test]
    fn missing_archive_member_is_fatal() {
        let oracle = FileHashOracle::with_archive_reader(Box::new(FakeArchiveReader));
        let err = oracle
            .digest_archive_member(Path::new("/archives/foo.jar"), Path::new("missing.txt"))
            .unwrap_err();
        assert!(matches!(err, RuleKeyError::MissingFileHash { .. }));
    }
}
