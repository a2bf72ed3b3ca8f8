//! Bootstrap handle for an empty part structure.
//!
//! A never-touched kind gets its on-disk structure through a three-step
//! sequence: create empty, mark populated, close the bootstrap handle.
//! Only then is the file opened as a live store. A crash between create
//! and mark leaves the state byte at bootstrapping, and such a file is
//! refused at open instead of silently treated as an empty part.

use crate::format::{PartHeader, PART_STATE_OFFSET, PART_STATE_POPULATED};
use chronidx_core::{IndexError, Result, TemporalKind};
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Handle over a part structure being bootstrapped.
#[derive(Debug)]
pub struct PartBootstrap {
    file: std::fs::File,
    path: PathBuf,
    kind: TemporalKind,
}

impl PartBootstrap {
    /// Create an empty part structure at `path`.
    ///
    /// Fails if the file already exists — bootstrap is only for
    /// never-touched kinds.
    pub fn create_empty(path: &Path, kind: TemporalKind, index_uuid: Uuid) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(path)
            .map_err(|e| IndexError::unavailable(format!("create {kind} part file"), e))?;

        let header = PartHeader::new(kind, *index_uuid.as_bytes());
        file.write_all(&header.to_bytes())
            .map_err(|e| IndexError::unavailable(format!("write {kind} part header"), e))?;

        debug!(kind = %kind, path = %path.display(), "bootstrapped empty part structure");
        Ok(PartBootstrap {
            file,
            path: path.to_path_buf(),
            kind,
        })
    }

    /// Flip the state byte to populated, making the file openable.
    pub fn mark_populated(&mut self) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(PART_STATE_OFFSET))
            .and_then(|_| self.file.write_all(&[PART_STATE_POPULATED]))
            .map_err(|e| {
                IndexError::unavailable(format!("mark {} part populated", self.kind), e)
            })
    }

    /// Sync and release the bootstrap handle.
    pub fn close(self) -> Result<()> {
        self.file
            .sync_all()
            .map_err(|e| IndexError::unavailable(format!("sync {} part bootstrap", self.kind), e))?;
        debug!(kind = %self.kind, path = %self.path.display(), "bootstrap handle closed");
        Ok(())
    }
}
