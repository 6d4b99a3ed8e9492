//! Manifest
//!
//! Durable record of which SSTable file ids currently make up the live
//! table set, oldest first — matching the in-memory list order and
//! ascending creation_time. Persisted with a write-temp, rename,
//! fsync-parent-directory sequence so a crash mid-write can never leave
//! a torn manifest on disk — grounded in the teacher pack's `aeternusdb`
//! manifest checkpoint routine (`write_snapshot`/`fsync_dir`).
//!
//! ## Format
//! ```text
//! [count: i32]
//! count repetitions of [file_id: i64]
//! ```
//! All integers are big-endian. File ids are stored oldest first.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{AtlasError, Result};

const MANIFEST_FILENAME: &str = "sst_manifest";
const MANIFEST_TMP_FILENAME: &str = "sst_manifest.tmp";

/// The set of live SSTable file ids, oldest first.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    file_ids: Vec<u64>,
}

impl Manifest {
    pub fn new() -> Self {
        Self { file_ids: Vec::new() }
    }

    /// Load the manifest from `dir`, or return an empty manifest if none
    /// exists yet (fresh data directory).
    pub fn load(dir: &Path) -> Result<Self> {
        let path = manifest_path(dir);
        if !path.exists() {
            return Ok(Self::new());
        }

        let mut file = File::open(&path)?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;

        if buf.len() < 4 {
            return Err(AtlasError::Corrupt("manifest file shorter than its header".into()));
        }
        let count = i32::from_be_bytes(buf[0..4].try_into().unwrap());
        if count < 0 {
            return Err(AtlasError::Corrupt("negative entry count in manifest".into()));
        }
        let count = count as usize;

        let expected_len = 4 + count * 8;
        if buf.len() != expected_len {
            return Err(AtlasError::Corrupt(format!(
                "manifest length mismatch: header declares {count} entries but file holds {} bytes",
                buf.len()
            )));
        }

        let mut file_ids = Vec::with_capacity(count);
        for i in 0..count {
            let start = 4 + i * 8;
            let id = i64::from_be_bytes(buf[start..start + 8].try_into().unwrap()) as u64;
            file_ids.push(id);
        }

        Ok(Self { file_ids })
    }

    pub fn file_ids(&self) -> &[u64] {
        &self.file_ids
    }

    pub fn is_empty(&self) -> bool {
        self.file_ids.is_empty()
    }

    /// Append a file id at the back (it is the newest table).
    pub fn push_back(&mut self, file_id: u64) {
        self.file_ids.push(file_id);
    }

    /// Replace the manifest's contents wholesale, oldest-first (used after
    /// compaction or merge replaces several tables with new ones).
    pub fn set(&mut self, file_ids: Vec<u64>) {
        self.file_ids = file_ids;
    }

    /// Persist this manifest to `dir`: write to a temp file, fsync it,
    /// rename over the live manifest, then fsync the directory so the
    /// rename itself is durable.
    pub fn persist(&self, dir: &Path) -> Result<()> {
        let tmp_path = dir.join(MANIFEST_TMP_FILENAME);
        let final_path = manifest_path(dir);

        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            file.write_all(&(self.file_ids.len() as i32).to_be_bytes())?;
            for id in &self.file_ids {
                file.write_all(&(*id as i64).to_be_bytes())?;
            }
            file.flush()?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, &final_path)?;
        fsync_dir(dir)?;

        Ok(())
    }
}

fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILENAME)
}

fn fsync_dir(dir: &Path) -> Result<()> {
    let dir_file = File::open(dir)?;
    dir_file.sync_all()?;
    Ok(())
}
