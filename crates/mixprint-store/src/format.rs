//! On-disk layout of the `.mps` descriptor store
//!
//! The file is a fixed header followed by an append-only sequence of
//! records. Every record carries its own CRC-64 so a partially written
//! tail can be told apart from committed data.

use crate::error::StoreError;
use crc::{Crc, CRC_64_ECMA_182};

/// Magic bytes: "MIXP"
pub const MAGIC: [u8; 4] = [0x4D, 0x49, 0x58, 0x50];

/// Current format version
pub const FORMAT_VERSION: u16 = 1;

pub const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);

/// Store header
///
/// The descriptor dimension and descriptor version are pinned here for the
/// whole file: one store never mixes feature configurations.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreHeader {
    pub version: u16,
    pub flags: u16,
    /// Descriptor dimension of every record in the file
    pub dim: u32,
    /// Feature-configuration tag that produced every descriptor in the file
    pub descriptor_version: String,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

impl StoreHeader {
    pub fn new(dim: u32, descriptor_version: &str) -> Self {
        Self {
            version: FORMAT_VERSION,
            flags: 0,
            dim,
            descriptor_version: descriptor_version.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC);
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.flags.to_le_bytes());
        buf.extend_from_slice(&self.dim.to_le_bytes());
        write_str(&mut buf, &self.descriptor_version);
        write_str(&mut buf, &self.created_at);
        buf
    }

    /// Decode the header from the start of the file.
    ///
    /// Returns the header and the offset of the first record.
    pub fn decode(bytes: &[u8]) -> Result<(Self, u64), StoreError> {
        let mut cur = Cursor::new(bytes);
        let magic = cur.take(4)?;
        if magic != MAGIC {
            return Err(StoreError::BadMagic);
        }
        let version = cur.read_u16()?;
        if version != FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion(version));
        }
        let flags = cur.read_u16()?;
        let dim = cur.read_u32()?;
        let descriptor_version = cur.read_str()?;
        let created_at = cur.read_str()?;
        Ok((
            Self {
                version,
                flags,
                dim,
                descriptor_version,
                created_at,
            },
            cur.pos as u64,
        ))
    }
}

/// One stored descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub category: String,
    pub track_id: String,
    pub values: Vec<f64>,
}

impl Record {
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        write_str(&mut body, &self.category);
        write_str(&mut body, &self.track_id);
        body.extend_from_slice(&(self.values.len() as u32).to_le_bytes());
        for v in &self.values {
            body.extend_from_slice(&v.to_le_bytes());
        }
        let crc = CRC64.checksum(&body);
        body.extend_from_slice(&crc.to_le_bytes());
        body
    }

    /// Decode one record starting at `offset`.
    ///
    /// Returns the record and the offset just past it. `Truncated` means the
    /// file ends before the record does, which is only legitimate for the
    /// final record of a file interrupted mid-append. The record extent is
    /// computed from on-disk length fields, so those are validated against
    /// `expected_dim` before a short read may be classified as a torn tail:
    /// an interrupted append is a byte prefix of a valid record and still
    /// carries the pinned dimension, so any other value is corruption and
    /// must not drop committed records behind it. The CRC is verified before
    /// any field is interpreted.
    pub fn decode(
        bytes: &[u8],
        offset: u64,
        expected_dim: u32,
    ) -> Result<(Self, u64), RecordReadError> {
        let start = offset as usize;
        let rest = bytes.get(start..).ok_or(RecordReadError::Truncated)?;

        // Walk the length fields to find the record extent
        let cat_len = read_u16_at(rest, 0).ok_or(RecordReadError::Truncated)? as usize;
        let id_off = 2 + cat_len;
        let id_len = read_u16_at(rest, id_off).ok_or(RecordReadError::Truncated)? as usize;
        let dim_off = id_off + 2 + id_len;
        let dim = read_u32_at(rest, dim_off).ok_or(RecordReadError::Truncated)?;
        if dim != expected_dim {
            return Err(RecordReadError::WrongDimension { got: dim });
        }
        let dim = dim as usize;
        let body_len = dim_off + 4 + dim * 8;
        if body_len + 8 > rest.len() {
            return Err(RecordReadError::Truncated);
        }

        let stored_crc = u64::from_le_bytes(rest[body_len..body_len + 8].try_into().unwrap());
        if stored_crc != CRC64.checksum(&rest[..body_len]) {
            return Err(RecordReadError::BadChecksum);
        }

        let category = String::from_utf8(rest[2..2 + cat_len].to_vec())
            .map_err(|_| RecordReadError::BadChecksum)?;
        let track_id = String::from_utf8(rest[id_off + 2..id_off + 2 + id_len].to_vec())
            .map_err(|_| RecordReadError::BadChecksum)?;
        let values: Vec<f64> = rest[dim_off + 4..body_len]
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
            .collect();

        Ok((
            Self {
                category,
                track_id,
                values,
            },
            offset + (body_len + 8) as u64,
        ))
    }
}

/// Why a record could not be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordReadError {
    /// File ends inside the record
    Truncated,
    /// Record is complete but its CRC does not match
    BadChecksum,
    /// The record's dimension field disagrees with the header
    WrongDimension { got: u32 },
}

fn read_u16_at(bytes: &[u8], at: usize) -> Option<u16> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32_at(bytes: &[u8], at: usize) -> Option<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn write_str(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    buf.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
    buf.extend_from_slice(bytes);
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], StoreError> {
        if self.pos + n > self.bytes.len() {
            return Err(StoreError::Corrupt {
                offset: self.pos as u64,
                reason: "unexpected end of data".to_string(),
            });
        }
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_u16(&mut self) -> Result<u16, StoreError> {
        Ok(u16::from_le_bytes(
            self.take(2)?.try_into().unwrap_or([0u8; 2]),
        ))
    }

    fn read_u32(&mut self) -> Result<u32, StoreError> {
        Ok(u32::from_le_bytes(
            self.take(4)?.try_into().unwrap_or([0u8; 4]),
        ))
    }

    fn read_str(&mut self) -> Result<String, StoreError> {
        let len = self.read_u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| StoreError::Corrupt {
            offset: self.pos as u64,
            reason: "invalid utf-8 in key".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let header = StoreHeader::new(833, "combined-v1");
        let bytes = header.encode();
        let (decoded, first_record) = StoreHeader::decode(&bytes).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(first_record, bytes.len() as u64);
    }

    #[test]
    fn record_round_trip() {
        let record = Record {
            category: "house".to_string(),
            track_id: "track_01".to_string(),
            values: vec![0.5, -1.25, 3.0],
        };
        let bytes = record.encode();
        let (decoded, next) = Record::decode(&bytes, 0, 3).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(next, bytes.len() as u64);
    }

    #[test]
    fn truncated_record_is_detected() {
        let record = Record {
            category: "house".to_string(),
            track_id: "t".to_string(),
            values: vec![1.0, 2.0],
        };
        let bytes = record.encode();
        let err = Record::decode(&bytes[..bytes.len() - 3], 0, 2).unwrap_err();
        assert_eq!(err, RecordReadError::Truncated);
    }

    #[test]
    fn corrupted_record_fails_checksum() {
        let record = Record {
            category: "house".to_string(),
            track_id: "t".to_string(),
            values: vec![1.0, 2.0],
        };
        let mut bytes = record.encode();
        // Flip a bit inside a value, leaving the length fields intact
        let mid = bytes.len() - 12;
        bytes[mid] ^= 0x40;
        let err = Record::decode(&bytes, 0, 2).unwrap_err();
        assert_eq!(err, RecordReadError::BadChecksum);
    }

    #[test]
    fn corrupted_dim_field_is_not_a_truncation() {
        let record = Record {
            category: "house".to_string(),
            track_id: "t".to_string(),
            values: vec![1.0, 2.0],
        };
        let mut bytes = record.encode();
        // Set a high byte of the dim field so the declared extent runs far
        // past the end of the buffer
        let dim_off = 2 + "house".len() + 2 + "t".len();
        bytes[dim_off + 3] |= 0x40;
        let err = Record::decode(&bytes, 0, 2).unwrap_err();
        assert!(matches!(err, RecordReadError::WrongDimension { .. }));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = StoreHeader::new(4, "v1").encode();
        bytes[0] = b'X';
        assert!(matches!(
            StoreHeader::decode(&bytes),
            Err(StoreError::BadMagic)
        ));
    }
}
