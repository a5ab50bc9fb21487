//! Per-lane generator parameter table.
//!
//! The table is a flat binary file of 16-byte records, one per hardware
//! lane, each holding the dynamically created Mersenne Twister parameters
//! `{matrix_a, mask_b, mask_c, seed}` as little-endian `u32`s. It is read
//! once at session start.
//!
//! Tables shorter than the lane ceiling are reused: on end-of-file the
//! reader seeks back to the start once and continues. Running out a second
//! time is fatal.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use bytemuck::{Pod, Zeroable};

use crate::error::{Result, SweepError};

/// Size of one on-disk record in bytes.
pub const RECORD_SIZE: usize = std::mem::size_of::<ParameterRecord>();

/// Generator parameters of one lane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct ParameterRecord {
    /// Twist matrix coefficient.
    pub matrix_a: u32,
    /// First tempering mask.
    pub mask_b: u32,
    /// Second tempering mask.
    pub mask_c: u32,
    /// Per-generator seed carried by the table.
    pub seed: u32,
}

impl ParameterRecord {
    /// Decode a record from its on-disk representation.
    pub fn from_le_bytes(bytes: [u8; RECORD_SIZE]) -> Self {
        bytemuck::pod_read_unaligned::<Self>(&bytes).swap_le()
    }

    /// Encode a record in its on-disk representation.
    pub fn to_le_bytes(&self) -> [u8; RECORD_SIZE] {
        bytemuck::cast(self.swap_le())
    }

    /// Convert between native and little-endian word order (an involution).
    fn swap_le(self) -> Self {
        Self {
            matrix_a: self.matrix_a.to_le(),
            mask_b: self.mask_b.to_le(),
            mask_c: self.mask_c.to_le(),
            seed: self.seed.to_le(),
        }
    }
}

/// Immutable parameter table holding exactly one record per hardware lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterTable {
    records: Vec<ParameterRecord>,
    /// Little-endian image of `records` as uploaded to the device.
    upload: Vec<u8>,
    wrapped: bool,
}

impl ParameterTable {
    /// Build a table directly from records.
    pub fn from_records(records: Vec<ParameterRecord>) -> Self {
        Self::with_wrapped(records, false)
    }

    fn with_wrapped(records: Vec<ParameterRecord>, wrapped: bool) -> Self {
        let upload = records.iter().flat_map(ParameterRecord::to_le_bytes).collect();
        Self {
            records,
            upload,
            wrapped,
        }
    }

    /// Open and read `lane_ceiling` records from a file.
    pub fn open(path: impl AsRef<Path>, lane_ceiling: u32) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SweepError::ParameterLoadFailed {
            record: 0,
            reason: format!("cannot open {}: {}", path.display(), e),
        })?;
        Self::load(BufReader::new(file), lane_ceiling)
    }

    /// Read `lane_ceiling` records from `source`, wrapping around at most once.
    pub fn load<R: Read + Seek>(mut source: R, lane_ceiling: u32) -> Result<Self> {
        let wanted = lane_ceiling as usize;
        let mut records = Vec::with_capacity(wanted);
        let mut wrapped = false;

        while records.len() < wanted {
            let index = records.len();
            match read_record(&mut source, index)? {
                Some(record) => records.push(record),
                None if !wrapped && index > 0 => {
                    tracing::warn!(
                        records_read = index,
                        lane_ceiling,
                        "Parameter table shorter than lane ceiling, reusing from start"
                    );
                    source
                        .seek(SeekFrom::Start(0))
                        .map_err(|e| SweepError::ParameterLoadFailed {
                            record: index,
                            reason: format!("seek to start failed: {}", e),
                        })?;
                    wrapped = true;
                }
                None => {
                    return Err(SweepError::ParameterLoadFailed {
                        record: index,
                        reason: if wrapped {
                            "end of table reached again after wrapping around".to_string()
                        } else {
                            "parameter table is empty".to_string()
                        },
                    });
                }
            }
        }

        tracing::debug!(records = records.len(), wrapped, "Loaded parameter table");

        Ok(Self::with_wrapped(records, wrapped))
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether loading had to wrap around to the start of the source.
    pub fn wrapped(&self) -> bool {
        self.wrapped
    }

    /// All records in lane order.
    pub fn records(&self) -> &[ParameterRecord] {
        &self.records
    }

    /// Record used by a logical lane (`lane % len`).
    pub fn for_lane(&self, lane: usize) -> Option<&ParameterRecord> {
        if self.records.is_empty() {
            return None;
        }
        self.records.get(lane % self.records.len())
    }

    /// Little-endian byte image for device upload, matching the file layout.
    pub fn as_bytes(&self) -> &[u8] {
        &self.upload
    }
}

/// Read one record. `Ok(None)` signals end of file, including a truncated tail.
fn read_record<R: Read>(source: &mut R, index: usize) -> Result<Option<ParameterRecord>> {
    let mut buf = [0u8; RECORD_SIZE];
    match source.read_exact(&mut buf) {
        Ok(()) => Ok(Some(ParameterRecord::from_le_bytes(buf))),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(SweepError::ParameterLoadFailed {
            record: index,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn record(i: u32) -> ParameterRecord {
        ParameterRecord {
            matrix_a: 0x9908_0000 | i,
            mask_b: 0x9D2C_5680 ^ i,
            mask_c: 0xEFC6_0000,
            seed: i,
        }
    }

    fn table_bytes(count: u32) -> Vec<u8> {
        (0..count).flat_map(|i| record(i).to_le_bytes()).collect()
    }

    #[test]
    fn test_record_size() {
        assert_eq!(RECORD_SIZE, 16);
    }

    #[test]
    fn test_record_encoding() {
        let rec = record(3);
        assert_eq!(ParameterRecord::from_le_bytes(rec.to_le_bytes()), rec);
        assert_eq!(&rec.to_le_bytes()[12..], &[3, 0, 0, 0]);
    }

    #[test]
    fn test_load_exact() {
        let table = ParameterTable::load(Cursor::new(table_bytes(8)), 8).unwrap();
        assert_eq!(table.len(), 8);
        assert!(!table.wrapped());
        assert_eq!(table.records()[5], record(5));
    }

    #[test]
    fn test_load_longer_source_reads_prefix() {
        let table = ParameterTable::load(Cursor::new(table_bytes(100)), 4).unwrap();
        assert_eq!(table.records(), &[record(0), record(1), record(2), record(3)]);
    }

    #[test]
    fn test_load_wraps_once() {
        let table = ParameterTable::load(Cursor::new(table_bytes(5)), 8).unwrap();
        assert_eq!(table.len(), 8);
        assert!(table.wrapped());
        assert_eq!(table.records()[5], record(0));
        assert_eq!(table.records()[7], record(2));
    }

    #[test]
    fn test_second_shortfall_is_fatal() {
        let err = ParameterTable::load(Cursor::new(table_bytes(3)), 8).unwrap_err();
        match err {
            SweepError::ParameterLoadFailed { record, .. } => assert_eq!(record, 6),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_truncated_tail_counts_as_end() {
        let mut bytes = table_bytes(3);
        bytes.extend_from_slice(&[1, 2, 3]);
        let table = ParameterTable::load(Cursor::new(bytes), 5).unwrap();
        assert!(table.wrapped());
        assert_eq!(table.records()[3], record(0));
    }

    #[test]
    fn test_empty_source_fails() {
        assert!(matches!(
            ParameterTable::load(Cursor::new(Vec::new()), 4),
            Err(SweepError::ParameterLoadFailed { record: 0, .. })
        ));
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(matches!(
            ParameterTable::open("/nonexistent/MersenneTwister.dat", 4),
            Err(SweepError::ParameterLoadFailed { .. })
        ));
    }

    #[test]
    fn test_for_lane_wraps() {
        let table = ParameterTable::from_records(vec![record(0), record(1)]);
        assert_eq!(table.for_lane(5), Some(&record(1)));
        assert_eq!(ParameterTable::from_records(Vec::new()).for_lane(0), None);
    }

    #[test]
    fn test_byte_view() {
        let table = ParameterTable::from_records(vec![record(1), record(2)]);
        assert_eq!(table.as_bytes().len(), 2 * RECORD_SIZE);
    }

    #[test]
    fn test_upload_matches_file_layout() {
        let bytes = table_bytes(6);
        let table = ParameterTable::load(Cursor::new(bytes.clone()), 6).unwrap();
        assert_eq!(table.as_bytes(), &bytes[..], "upload must be byte-identical to the file");
        assert_eq!(&table.as_bytes()[..4], &[0x00, 0x00, 0x08, 0x99], "matrix_a little-endian");
    }

    #[test]
    fn test_record_decodes_little_endian() {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[..4].copy_from_slice(&[0xDF, 0xB0, 0x08, 0x99]);
        bytes[12] = 7;
        let rec = ParameterRecord::from_le_bytes(bytes);
        assert_eq!(rec.matrix_a, 0x9908_B0DF);
        assert_eq!(rec.seed, 7);
    }
}
