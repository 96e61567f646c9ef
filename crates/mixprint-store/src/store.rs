//! Persistent descriptor store
//!
//! An append-only keyed container mapping `(category, track_id)` to one
//! descriptor vector. Keys are never overwritten: a repeated `put` is a
//! no-op reported as [`PutOutcome::AlreadyExists`], which is what makes
//! interrupted corpus scans resumable.

use crate::error::StoreError;
use crate::format::{Record, RecordReadError, StoreHeader};
use memmap2::Mmap;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Result of a `put`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Stored,
    /// The key was already present; the stored value is untouched.
    AlreadyExists,
}

struct State {
    file: File,
    /// (category, track_id) -> record offset
    index: HashMap<(String, String), u64>,
    /// Keys in commit order; this is the enumeration order exposed to
    /// callers and must stay stable across reopen.
    order: Vec<(String, String)>,
    /// Offset just past the last committed record
    end: u64,
    /// A torn tail was found on open and must be cut before appending
    needs_truncate: bool,
}

pub struct FeatureStore {
    path: PathBuf,
    header: StoreHeader,
    state: Mutex<State>,
}

impl FeatureStore {
    /// Create a new store file pinned to one descriptor dimension and
    /// feature-configuration version.
    pub fn create(
        path: impl AsRef<Path>,
        dim: usize,
        descriptor_version: &str,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;
        let header = StoreHeader::new(dim as u32, descriptor_version);
        let bytes = header.encode();
        file.write_all(&bytes)?;
        file.sync_data()?;
        Ok(Self {
            path,
            state: Mutex::new(State {
                file,
                index: HashMap::new(),
                order: Vec::new(),
                end: bytes.len() as u64,
                needs_truncate: false,
            }),
            header,
        })
    }

    /// Open an existing store and index its committed records.
    ///
    /// An incomplete final record (crash mid-append) is dropped with a
    /// warning; a checksum failure on any complete record, or a record
    /// whose dimension field disagrees with the header, is fatal.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let (header, first_record) = StoreHeader::decode(&mmap)?;

        let mut index = HashMap::new();
        let mut order = Vec::new();
        let mut offset = first_record;
        let mut needs_truncate = false;
        while offset < mmap.len() as u64 {
            match Record::decode(&mmap, offset, header.dim) {
                Ok((record, next)) => {
                    let key = (record.category, record.track_id);
                    if index.contains_key(&key) {
                        return Err(StoreError::Corrupt {
                            offset,
                            reason: format!("duplicate key {}/{}", key.0, key.1),
                        });
                    }
                    index.insert(key.clone(), offset);
                    order.push(key);
                    offset = next;
                }
                Err(RecordReadError::Truncated) => {
                    // Only possible for the final record: it extends past
                    // EOF. Committed records before it are intact.
                    log::warn!(
                        "{}: dropping incomplete record at offset {} (interrupted write)",
                        path.display(),
                        offset
                    );
                    needs_truncate = true;
                    break;
                }
                Err(RecordReadError::BadChecksum) => {
                    return Err(StoreError::Corrupt {
                        offset,
                        reason: "record checksum mismatch".to_string(),
                    });
                }
                Err(RecordReadError::WrongDimension { got }) => {
                    return Err(StoreError::Corrupt {
                        offset,
                        reason: format!(
                            "record dimension {} does not match header dimension {}",
                            got, header.dim
                        ),
                    });
                }
            }
        }

        log::info!(
            "opened store {} ({} descriptors, dim {}, version {:?})",
            path.display(),
            index.len(),
            header.dim,
            header.descriptor_version
        );

        Ok(Self {
            path,
            state: Mutex::new(State {
                file,
                index,
                order,
                end: offset,
                needs_truncate,
            }),
            header,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Descriptor dimension every record in this store must have
    pub fn dim(&self) -> usize {
        self.header.dim as usize
    }

    /// Feature-configuration tag this store is pinned to
    pub fn descriptor_version(&self) -> &str {
        &self.header.descriptor_version
    }

    pub fn created_at(&self) -> &str {
        &self.header.created_at
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("store lock poisoned").index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has(&self, category: &str, track_id: &str) -> bool {
        let state = self.state.lock().expect("store lock poisoned");
        state
            .index
            .contains_key(&(category.to_string(), track_id.to_string()))
    }

    /// Read one descriptor without scanning the rest of the file.
    pub fn get(&self, category: &str, track_id: &str) -> Result<Vec<f64>, StoreError> {
        let offset = {
            let state = self.state.lock().expect("store lock poisoned");
            state
                .index
                .get(&(category.to_string(), track_id.to_string()))
                .copied()
                .ok_or_else(|| StoreError::NotFound {
                    category: category.to_string(),
                    track_id: track_id.to_string(),
                })?
        };
        let file = File::open(&self.path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let (record, _) =
            Record::decode(&mmap, offset, self.header.dim).map_err(|e| StoreError::Corrupt {
                offset,
                reason: format!("{:?}", e),
            })?;
        Ok(record.values)
    }

    /// Append a descriptor. An existing key is left untouched and reported
    /// as [`PutOutcome::AlreadyExists`].
    pub fn put(
        &self,
        category: &str,
        track_id: &str,
        values: &[f64],
    ) -> Result<PutOutcome, StoreError> {
        if values.len() != self.header.dim as usize {
            return Err(StoreError::DimensionMismatch {
                expected: self.header.dim as usize,
                got: values.len(),
            });
        }

        let mut state = self.state.lock().expect("store lock poisoned");
        let key = (category.to_string(), track_id.to_string());
        if state.index.contains_key(&key) {
            log::debug!("{}/{} already stored, keeping existing descriptor", category, track_id);
            return Ok(PutOutcome::AlreadyExists);
        }

        if state.needs_truncate {
            let end = state.end;
            state.file.set_len(end)?;
            state.needs_truncate = false;
        }

        let record = Record {
            category: category.to_string(),
            track_id: track_id.to_string(),
            values: values.to_vec(),
        };
        let bytes = record.encode();
        let offset = state.end;
        use std::io::Seek;
        state.file.seek(std::io::SeekFrom::Start(offset))?;
        state.file.write_all(&bytes)?;
        state.file.sync_data()?;
        state.end = offset + bytes.len() as u64;
        state.index.insert(key.clone(), offset);
        state.order.push(key);
        Ok(PutOutcome::Stored)
    }

    /// Track ids stored under a category, in commit order.
    pub fn list(&self, category: &str) -> Vec<String> {
        let state = self.state.lock().expect("store lock poisoned");
        state
            .order
            .iter()
            .filter(|(c, _)| c == category)
            .map(|(_, t)| t.clone())
            .collect()
    }

    /// Categories present, in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        let state = self.state.lock().expect("store lock poisoned");
        let mut seen = Vec::new();
        for (c, _) in &state.order {
            if !seen.contains(c) {
                seen.push(c.clone());
            }
        }
        seen
    }

    /// Snapshot every stored descriptor in commit order.
    ///
    /// This is the read-only snapshot a matching run works from; the commit
    /// order doubles as the tie-break enumeration order downstream.
    pub fn iter_all(&self) -> Result<Vec<StoredDescriptor>, StoreError> {
        let (offsets, version) = {
            let state = self.state.lock().expect("store lock poisoned");
            let offsets: Vec<u64> = state
                .order
                .iter()
                .map(|key| state.index[key])
                .collect();
            (offsets, self.header.descriptor_version.clone())
        };
        let file = File::open(&self.path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let mut out = Vec::with_capacity(offsets.len());
        for offset in offsets {
            let (record, _) =
                Record::decode(&mmap, offset, self.header.dim).map_err(|e| StoreError::Corrupt {
                    offset,
                    reason: format!("{:?}", e),
                })?;
            out.push(StoredDescriptor {
                category: record.category,
                track_id: record.track_id,
                version: version.clone(),
                values: record.values,
            });
        }
        Ok(out)
    }

    /// Dump the whole store as pretty JSON for inspection.
    pub fn export_json(&self, writer: impl Write) -> Result<(), StoreError> {
        #[derive(Serialize)]
        struct Export<'a> {
            descriptor_version: &'a str,
            dim: usize,
            created_at: &'a str,
            descriptors: Vec<StoredDescriptor>,
        }
        let export = Export {
            descriptor_version: &self.header.descriptor_version,
            dim: self.header.dim as usize,
            created_at: &self.header.created_at,
            descriptors: self.iter_all()?,
        };
        serde_json::to_writer_pretty(writer, &export)
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?;
        Ok(())
    }
}

/// One descriptor as read back from the store
#[derive(Debug, Clone, Serialize)]
pub struct StoredDescriptor {
    pub category: String,
    pub track_id: String,
    pub version: String,
    pub values: Vec<f64>,
}
