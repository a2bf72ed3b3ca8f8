//! On-disk byte format for part files.
//!
//! Each partition kind owns one file named `<kind>.part`.
//!
//! # File Layout
//!
//! ```text
//! ┌────────────────────────────────────┐
//! │ Part Header (28 bytes)             │
//! ├────────────────────────────────────┤
//! │ Record 1                           │
//! ├────────────────────────────────────┤
//! │ Record 2                           │
//! ├────────────────────────────────────┤
//! │ ...                                │
//! └────────────────────────────────────┘
//! ```
//!
//! # Record Layout
//!
//! ```text
//! ┌──────────────────┬──────────────┬─────────────────────────┐
//! │ Length (4 bytes) │ CRC32 (4)    │ Payload (variable)      │
//! └──────────────────┴──────────────┴─────────────────────────┘
//! ```
//!
//! The payload is a bincode-encoded [`PartRecord`]. The CRC covers the
//! payload only; a mismatch means the tail of the file is damaged and
//! replay stops there.

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use chronidx_core::{EntityId, IndexError, OrderKey, PartWrite, Result, TemporalKind};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Magic bytes identifying a part file: "CRNX"
pub const PART_MAGIC: [u8; 4] = *b"CRNX";

/// Current part file format version
pub const PART_FORMAT_VERSION: u16 = 1;

/// Size of the part header in bytes
pub const PART_HEADER_SIZE: usize = 24;

/// Byte offset of the state byte within the header
pub const PART_STATE_OFFSET: u64 = 7;

/// Header state: structure created but population not yet confirmed
pub const PART_STATE_BOOTSTRAPPING: u8 = 0;

/// Header state: structure is complete and usable
pub const PART_STATE_POPULATED: u8 = 1;

/// Maximum accepted record payload length; anything larger is damage
const MAX_RECORD_LEN: u32 = 1 << 20;

/// Part file header (24 bytes).
///
/// Layout: magic (4) | format version (2) | kind id (1) | state (1) |
/// index UUID (16).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartHeader {
    /// Magic bytes: "CRNX"
    pub magic: [u8; 4],

    /// Format version for forward compatibility
    pub format_version: u16,

    /// Stable id of the kind stored in this part
    pub kind_id: u8,

    /// Bootstrap state byte
    pub state: u8,

    /// Identity of the owning index
    pub index_uuid: [u8; 16],
}

impl PartHeader {
    /// Create a header for a freshly bootstrapped part
    pub fn new(kind: TemporalKind, index_uuid: [u8; 16]) -> Self {
        PartHeader {
            magic: PART_MAGIC,
            format_version: PART_FORMAT_VERSION,
            kind_id: kind.kind_id(),
            state: PART_STATE_BOOTSTRAPPING,
            index_uuid,
        }
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> [u8; PART_HEADER_SIZE] {
        let mut bytes = [0u8; PART_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        BigEndian::write_u16(&mut bytes[4..6], self.format_version);
        bytes[6] = self.kind_id;
        bytes[7] = self.state;
        bytes[8..24].copy_from_slice(&self.index_uuid);
        bytes
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8; PART_HEADER_SIZE]) -> Self {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        let mut index_uuid = [0u8; 16];
        index_uuid.copy_from_slice(&bytes[8..24]);
        PartHeader {
            magic,
            format_version: BigEndian::read_u16(&bytes[4..6]),
            kind_id: bytes[6],
            state: bytes[7],
            index_uuid,
        }
    }

    /// Validate the header against the opening context.
    ///
    /// A file that fails any of these checks is refused, not repaired.
    pub fn validate(&self, kind: TemporalKind, index_uuid: [u8; 16]) -> Result<()> {
        if self.magic != PART_MAGIC {
            return Err(IndexError::Corrupted(format!(
                "bad magic in {} part file",
                kind
            )));
        }
        if self.format_version != PART_FORMAT_VERSION {
            return Err(IndexError::Corrupted(format!(
                "unsupported part format version {}",
                self.format_version
            )));
        }
        if self.kind_id != kind.kind_id() {
            return Err(IndexError::Corrupted(format!(
                "part file holds kind id {} but {} was expected",
                self.kind_id, kind
            )));
        }
        if self.index_uuid != index_uuid {
            return Err(IndexError::Corrupted(format!(
                "{} part file belongs to a different index",
                kind
            )));
        }
        if self.state != PART_STATE_POPULATED {
            return Err(IndexError::Corrupted(format!(
                "{} part file bootstrap never completed",
                kind
            )));
        }
        Ok(())
    }
}

/// One logged write in a part file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartRecord {
    /// Entity indexed under key
    Add {
        /// Order key
        key: OrderKey,
        /// Indexed entity
        entity: EntityId,
    },
    /// Entity removed from under key
    Remove {
        /// Order key
        key: OrderKey,
        /// Removed entity
        entity: EntityId,
    },
    /// Entity moved between keys
    Change {
        /// Previous key
        before: OrderKey,
        /// New key
        after: OrderKey,
        /// Moved entity
        entity: EntityId,
    },
}

impl From<PartWrite> for PartRecord {
    fn from(op: PartWrite) -> Self {
        match op {
            PartWrite::Add { key, entity } => PartRecord::Add { key, entity },
            PartWrite::Remove { key, entity } => PartRecord::Remove { key, entity },
            PartWrite::Change {
                before,
                after,
                entity,
            } => PartRecord::Change {
                before,
                after,
                entity,
            },
        }
    }
}

/// Encode a record into its framed on-disk form
pub fn encode_record(record: &PartRecord) -> Result<Vec<u8>> {
    let payload = bincode::serialize(record)?;
    let mut hasher = Hasher::new();
    hasher.update(&payload);
    let crc = hasher.finalize();

    let mut frame = vec![0u8; 8];
    BigEndian::write_u32(&mut frame[0..4], payload.len() as u32);
    BigEndian::write_u32(&mut frame[4..8], crc);
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Streaming reader over framed records.
///
/// Stops cleanly at end of input; a short frame or checksum mismatch is
/// surfaced as `Corrupted` so the caller can record the damage.
pub struct RecordReader<R: Read> {
    input: R,
}

impl<R: Read> RecordReader<R> {
    /// Wrap an input positioned just past the part header
    pub fn new(input: R) -> Self {
        RecordReader { input }
    }

    /// Next record, `None` at clean end of input
    pub fn read_next(&mut self) -> Result<Option<PartRecord>> {
        let len = match self.input.read_u32::<BigEndian>() {
            Ok(len) => len,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(IndexError::unavailable("read record frame", e)),
        };
        if len > MAX_RECORD_LEN {
            return Err(IndexError::Corrupted(format!(
                "record length {len} exceeds limit"
            )));
        }
        let expected_crc = self
            .input
            .read_u32::<BigEndian>()
            .map_err(|_| IndexError::Corrupted("torn record frame".to_string()))?;

        let mut payload = vec![0u8; len as usize];
        self.input
            .read_exact(&mut payload)
            .map_err(|_| IndexError::Corrupted("torn record payload".to_string()))?;

        let mut hasher = Hasher::new();
        hasher.update(&payload);
        if hasher.finalize() != expected_crc {
            return Err(IndexError::Corrupted("record checksum mismatch".to_string()));
        }

        let record = bincode::deserialize(&payload)
            .map_err(|e| IndexError::Corrupted(format!("undecodable record: {e}")))?;
        Ok(Some(record))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chronidx_core::TemporalValue;
    use std::io::Cursor;

    fn sample_key(days: i64) -> OrderKey {
        TemporalValue::Date { epoch_days: days }.order_key()
    }

    #[test]
    fn test_header_roundtrip() {
        let header = PartHeader::new(TemporalKind::ZonedTime, [7u8; 16]);
        let restored = PartHeader::from_bytes(&header.to_bytes());
        assert_eq!(header, restored);
    }

    #[test]
    fn test_header_validate_accepts_populated() {
        let mut header = PartHeader::new(TemporalKind::Date, [1u8; 16]);
        header.state = PART_STATE_POPULATED;
        assert!(header.validate(TemporalKind::Date, [1u8; 16]).is_ok());
    }

    #[test]
    fn test_header_validate_rejects_wrong_kind() {
        let mut header = PartHeader::new(TemporalKind::Date, [1u8; 16]);
        header.state = PART_STATE_POPULATED;
        let err = header.validate(TemporalKind::Duration, [1u8; 16]).unwrap_err();
        assert!(matches!(err, IndexError::Corrupted(_)));
    }

    #[test]
    fn test_header_validate_rejects_foreign_index() {
        let mut header = PartHeader::new(TemporalKind::Date, [1u8; 16]);
        header.state = PART_STATE_POPULATED;
        let err = header.validate(TemporalKind::Date, [2u8; 16]).unwrap_err();
        assert!(matches!(err, IndexError::Corrupted(_)));
    }

    #[test]
    fn test_header_validate_rejects_incomplete_bootstrap() {
        let header = PartHeader::new(TemporalKind::Date, [1u8; 16]);
        assert_eq!(header.state, PART_STATE_BOOTSTRAPPING);
        let err = header.validate(TemporalKind::Date, [1u8; 16]).unwrap_err();
        assert!(matches!(err, IndexError::Corrupted(_)));
    }

    #[test]
    fn test_state_offset_matches_layout() {
        let mut header = PartHeader::new(TemporalKind::Date, [0u8; 16]);
        header.state = PART_STATE_POPULATED;
        let bytes = header.to_bytes();
        assert_eq!(bytes[PART_STATE_OFFSET as usize], PART_STATE_POPULATED);
    }

    #[test]
    fn test_record_encode_decode_roundtrip() {
        let records = vec![
            PartRecord::Add {
                key: sample_key(1),
                entity: EntityId(10),
            },
            PartRecord::Remove {
                key: sample_key(1),
                entity: EntityId(10),
            },
            PartRecord::Change {
                before: sample_key(1),
                after: sample_key(2),
                entity: EntityId(11),
            },
        ];

        let mut bytes = Vec::new();
        for r in &records {
            bytes.extend(encode_record(r).unwrap());
        }

        let mut reader = RecordReader::new(Cursor::new(bytes));
        let mut restored = Vec::new();
        while let Some(r) = reader.read_next().unwrap() {
            restored.push(r);
        }
        assert_eq!(restored, records);
    }

    #[test]
    fn test_record_reader_detects_corruption() {
        let record = PartRecord::Add {
            key: sample_key(5),
            entity: EntityId(1),
        };
        let mut bytes = encode_record(&record).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        let mut reader = RecordReader::new(Cursor::new(bytes));
        let err = reader.read_next().unwrap_err();
        assert!(matches!(err, IndexError::Corrupted(_)));
    }

    #[test]
    fn test_record_reader_detects_torn_frame() {
        let record = PartRecord::Add {
            key: sample_key(5),
            entity: EntityId(1),
        };
        let mut bytes = encode_record(&record).unwrap();
        bytes.truncate(bytes.len() - 3);

        let mut reader = RecordReader::new(Cursor::new(bytes));
        let err = reader.read_next().unwrap_err();
        assert!(matches!(err, IndexError::Corrupted(_)));
    }

    #[test]
    fn test_record_from_part_write() {
        let op = PartWrite::Add {
            key: sample_key(3),
            entity: EntityId(9),
        };
        assert_eq!(
            PartRecord::from(op),
            PartRecord::Add {
                key: sample_key(3),
                entity: EntityId(9)
            }
        );
    }
}
