use crate::ZoneSnapshot;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not access snapshot cache {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot cache {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Flat json file holding the raw snapshots of the last collection run.
#[derive(Clone, Debug)]
pub struct SnapshotCache {
    path: PathBuf,
}

impl SnapshotCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn load(&self) -> Result<Vec<ZoneSnapshot>, Error> {
        let file = File::open(&self.path).map_err(|source| self.io_error(source))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, snapshots: &[ZoneSnapshot]) -> Result<(), Error> {
        self.replace_with(|writer| serde_json::to_writer_pretty(writer, snapshots))
    }

    /// Writes the new content next to the cache and moves it in place only once
    /// complete, so a failed write leaves any previous cache untouched and never
    /// leaves a truncated file behind.
    fn replace_with<F>(&self, write: F) -> Result<(), Error>
    where
        F: FnOnce(&mut dyn Write) -> Result<(), serde_json::Error>,
    {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staging = NamedTempFile::new_in(dir).map_err(|source| self.io_error(source))?;

        {
            let mut writer = BufWriter::new(staging.as_file_mut());
            write(&mut writer).map_err(|source| Error::Malformed {
                path: self.path.clone(),
                source,
            })?;
            writer.flush().map_err(|source| self.io_error(source))?;
        }
        staging
            .as_file()
            .sync_all()
            .map_err(|source| self.io_error(source))?;

        staging
            .persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> Error {
        Error::Io {
            path: self.path.clone(),
            source,
        }
    }
}
