use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::backend::StoreBackend;
use crate::error::{GalleryError, Result};
use crate::record::{EnrollmentRecord, IdentityEntry};

const RECORD_EXT: &str = "rec";
const STAGING_PREFIX: &str = ".staging-";
const TRASH_PREFIX: &str = ".trash-";

fn io_err(path: &Path, e: io::Error) -> GalleryError {
    GalleryError::Storage(format!("{}: {e}", path.display()))
}

/// File-tree [`StoreBackend`]: one directory per identity, one msgpack file
/// per record.
///
/// ```text
/// root/
///   alice/
///     000000.rec
///     000001.rec
///   bob/
///     000000.rec
/// ```
///
/// An identity is replaced by writing a sibling `.staging-{identity}`
/// directory and renaming it into place; the previous directory is first
/// renamed to `.trash-{identity}`. [`DirBackend::open`] finishes or rolls
/// back any swap interrupted by a crash, so after recovery each identity
/// holds either its old or its new record set.
pub struct DirBackend {
    root: PathBuf,
}

impl DirBackend {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
        let backend = Self { root };
        backend.recover()?;
        Ok(backend)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn live_dir(&self, identity: &str) -> PathBuf {
        self.root.join(identity)
    }

    fn staging_dir(&self, identity: &str) -> PathBuf {
        self.root.join(format!("{STAGING_PREFIX}{identity}"))
    }

    fn trash_dir(&self, identity: &str) -> PathBuf {
        self.root.join(format!("{TRASH_PREFIX}{identity}"))
    }

    fn recover(&self) -> Result<()> {
        for item in fs::read_dir(&self.root).map_err(|e| io_err(&self.root, e))? {
            let item = item.map_err(|e| io_err(&self.root, e))?;
            let name = item.file_name().to_string_lossy().into_owned();
            let path = item.path();

            if name.starts_with(STAGING_PREFIX) {
                warn!(path = %path.display(), "discarding incomplete staging directory");
                fs::remove_dir_all(&path).map_err(|e| io_err(&path, e))?;
            } else if let Some(identity) = name.strip_prefix(TRASH_PREFIX) {
                let live = self.live_dir(identity);
                if live.exists() {
                    fs::remove_dir_all(&path).map_err(|e| io_err(&path, e))?;
                } else {
                    warn!(identity, "restoring identity from interrupted replace");
                    fs::rename(&path, &live).map_err(|e| io_err(&live, e))?;
                }
            }
        }
        Ok(())
    }

    fn read_identity(&self, identity: &str, dir: &Path) -> Result<IdentityEntry> {
        let mut files: Vec<PathBuf> = Vec::new();
        for item in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
            let path = item.map_err(|e| io_err(dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXT) {
                files.push(path);
            }
        }
        files.sort();

        let mut records = Vec::with_capacity(files.len());
        for path in &files {
            let data = fs::read(path).map_err(|e| io_err(path, e))?;
            let rec: EnrollmentRecord = rmp_serde::from_slice(&data)
                .map_err(|e| GalleryError::Storage(format!("{}: {e}", path.display())))?;
            records.push(rec);
        }
        IdentityEntry::new(identity, records)
            .map_err(|e| GalleryError::Storage(format!("{}: {e}", dir.display())))
    }

    fn count_records(dir: &Path) -> Result<usize> {
        let mut n = 0;
        for item in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
            let path = item.map_err(|e| io_err(dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXT) {
                n += 1;
            }
        }
        Ok(n)
    }

    fn write_staging(&self, entry: &IdentityEntry, staging: &Path) -> Result<()> {
        for (i, rec) in entry.records().iter().enumerate() {
            let data = rmp_serde::to_vec_named(rec)
                .map_err(|e| GalleryError::Storage(e.to_string()))?;
            write_file(&staging.join(format!("{i:06}.{RECORD_EXT}")), &data)?;
        }
        Ok(())
    }

    fn swap_in(&self, identity: &str, staging: &Path) -> Result<()> {
        let live = self.live_dir(identity);
        let trash = self.trash_dir(identity);
        let had_previous = live.exists();
        if had_previous {
            self.clear_trash(&trash)?;
            fs::rename(&live, &trash).map_err(|e| io_err(&live, e))?;
        }
        if let Err(e) = fs::rename(staging, &live) {
            if had_previous {
                if let Err(e) = fs::rename(&trash, &live) {
                    warn!(identity, error = %e, "failed to restore identity after aborted replace");
                }
            }
            return Err(io_err(&live, e));
        }
        self.sync_root()?;
        if had_previous {
            fs::remove_dir_all(&trash).map_err(|e| io_err(&trash, e))?;
        }
        Ok(())
    }

    /// A trash directory left by an earlier failed cleanup holds a
    /// superseded record set; the live directory is authoritative.
    fn clear_trash(&self, trash: &Path) -> Result<()> {
        if trash.exists() {
            warn!(path = %trash.display(), "removing stale trash directory");
            fs::remove_dir_all(trash).map_err(|e| io_err(trash, e))?;
        }
        Ok(())
    }

    fn sync_root(&self) -> Result<()> {
        fs::File::open(&self.root)
            .and_then(|d| d.sync_all())
            .map_err(|e| io_err(&self.root, e))
    }
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    let mut f = fs::File::create(path).map_err(|e| io_err(path, e))?;
    f.write_all(data).map_err(|e| io_err(path, e))?;
    f.sync_all().map_err(|e| io_err(path, e))
}

impl StoreBackend for DirBackend {
    fn load(&self) -> Result<Vec<IdentityEntry>> {
        let mut names = Vec::new();
        for item in fs::read_dir(&self.root).map_err(|e| io_err(&self.root, e))? {
            let item = item.map_err(|e| io_err(&self.root, e))?;
            let is_dir = item
                .file_type()
                .map_err(|e| io_err(&item.path(), e))?
                .is_dir();
            let name = item.file_name().to_string_lossy().into_owned();
            if is_dir && !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let dir = self.live_dir(&name);
            if Self::count_records(&dir)? == 0 {
                // Empty identities are treated as absent.
                continue;
            }
            entries.push(self.read_identity(&name, &dir)?);
        }
        Ok(entries)
    }

    fn replace(&self, entry: &IdentityEntry) -> Result<()> {
        let identity = entry.identity();
        let staging = self.staging_dir(identity);
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| io_err(&staging, e))?;
        }
        fs::create_dir(&staging).map_err(|e| io_err(&staging, e))?;

        let result = self
            .write_staging(entry, &staging)
            .and_then(|()| self.swap_in(identity, &staging));
        if result.is_err() && staging.exists() {
            if let Err(e) = fs::remove_dir_all(&staging) {
                warn!(path = %staging.display(), error = %e, "failed to discard staging directory");
            }
        }
        result
    }

    fn remove(&self, identity: &str) -> Result<usize> {
        let live = self.live_dir(identity);
        if !live.exists() {
            return Ok(0);
        }
        let count = Self::count_records(&live)?;
        let trash = self.trash_dir(identity);
        self.clear_trash(&trash)?;
        fs::rename(&live, &trash).map_err(|e| io_err(&live, e))?;
        self.sync_root()?;
        fs::remove_dir_all(&trash).map_err(|e| io_err(&trash, e))?;
        Ok(count)
    }
}
