//! Part file naming and discovery
//!
//! One physical file per partition kind, deterministically named by kind,
//! co-located under the index's directory. Absence of a kind's file is the
//! valid "no data of this kind yet" state, not corruption.

use chronidx_core::TemporalKind;
use std::path::{Path, PathBuf};

/// Maps partition kinds to their on-disk files under one index directory.
#[derive(Debug, Clone)]
pub struct PartitionLayout {
    dir: PathBuf,
}

impl PartitionLayout {
    /// Layout rooted at the index's directory
    pub fn new(dir: &Path) -> Self {
        PartitionLayout {
            dir: dir.to_path_buf(),
        }
    }

    /// The index directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the kind's part file
    pub fn part_path(&self, kind: TemporalKind) -> PathBuf {
        self.dir.join(format!("{}.part", kind.file_stem()))
    }

    /// Kinds whose part file already exists, in canonical kind order
    pub fn existing_kinds(&self) -> Vec<TemporalKind> {
        TemporalKind::ALL
            .into_iter()
            .filter(|kind| self.part_path(*kind).exists())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_paths_are_deterministic() {
        let layout = PartitionLayout::new(Path::new("/idx/7"));
        assert_eq!(
            layout.part_path(TemporalKind::Date),
            PathBuf::from("/idx/7/date.part")
        );
        assert_eq!(
            layout.part_path(TemporalKind::ZonedDateTime),
            PathBuf::from("/idx/7/zoned-datetime.part")
        );
    }

    #[test]
    fn test_existing_kinds_in_canonical_order() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PartitionLayout::new(dir.path());
        assert!(layout.existing_kinds().is_empty());

        // Touch files out of order; discovery must come back ordered
        std::fs::write(layout.part_path(TemporalKind::Duration), b"").unwrap();
        std::fs::write(layout.part_path(TemporalKind::Date), b"").unwrap();
        std::fs::write(layout.part_path(TemporalKind::LocalTime), b"").unwrap();

        assert_eq!(
            layout.existing_kinds(),
            vec![
                TemporalKind::Date,
                TemporalKind::LocalTime,
                TemporalKind::Duration
            ]
        );
    }

    #[test]
    fn test_unrelated_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PartitionLayout::new(dir.path());
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("date.part.bak"), b"x").unwrap();
        assert!(layout.existing_kinds().is_empty());
    }
}
